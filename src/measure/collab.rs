//! Contracts between the measurement session and the host that embeds it.
//!
//! The session never touches rendering, input or tracking directly. It talks
//! to these traits, which the app implements with bevy resources and tests
//! implement with plain collections.

use bevy::prelude::*;

use crate::units::DistanceUnit;

/// Opaque key for a segment's visual, issued by a [`RenderingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub u64);

/// Supplies the world position under the view center once per tick.
pub trait TrackingSource {
    /// `None` means there is no usable fix yet. That is not an error.
    fn sample_world_position(&mut self) -> Option<Vec3>;
}

/// Draws segment visuals on behalf of the session.
///
/// Implementations own whatever backs a [`VisualId`]. Destroying an unknown
/// or already destroyed id must be a no-op.
pub trait RenderingSink {
    fn create_visual(&mut self, at: Vec3) -> VisualId;
    /// Redraw the line to `to` and move the length label to the new midpoint.
    fn update_visual(&mut self, id: VisualId, to: Vec3, label: &str);
    fn destroy_visual(&mut self, id: VisualId);
}

/// Notifications pushed by the session as its state changes.
pub trait HostNotifications {
    /// A measurement was finalized with the given distance label.
    fn on_measure_committed(&mut self, label: &str);
    /// The committed list changed; drives reset affordance visibility.
    fn on_committed_list_changed(&mut self, is_empty: bool);
    /// The first segment of the session appeared; unit display can be shown.
    fn on_units_revealed(&mut self);
}

/// Per-session policy supplied by the host. Fixed for the session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct HostPolicy {
    /// If false, starting a measurement clears every committed one first.
    pub allow_multiple: bool,
    pub unit: DistanceUnit,
    /// Suffix appended to every distance label.
    pub unit_label: String,
}

impl Default for HostPolicy {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            unit: DistanceUnit::Centimeter,
            unit_label: DistanceUnit::Centimeter.to_string(),
        }
    }
}

/// Notification as a value, so it can be queued and replayed as a bevy message.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MeasureCommitted { label: String },
    CommittedListChanged { is_empty: bool },
    UnitsRevealed,
}

impl HostNotifications for Vec<SessionEvent> {
    fn on_measure_committed(&mut self, label: &str) {
        self.push(SessionEvent::MeasureCommitted { label: label.to_string() });
    }

    fn on_committed_list_changed(&mut self, is_empty: bool) {
        self.push(SessionEvent::CommittedListChanged { is_empty });
    }

    fn on_units_revealed(&mut self) {
        self.push(SessionEvent::UnitsRevealed);
    }
}

