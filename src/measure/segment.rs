use bevy::prelude::*;
use chrono::{DateTime, Local};

use super::collab::{RenderingSink, VisualId};
use crate::units::{format_distance, DistanceUnit};

/// One two-point measurement, in progress or committed.
#[derive(Debug)]
pub struct Segment {
    start: Vec3,
    end: Vec3,
    unit: DistanceUnit,
    unit_label: String,
    visual: VisualId,
    /// Whether the visual is still alive in the sink
    visual_live: bool,
    /// Set once a real tracking sample has been applied
    has_sample: bool,
    committed_at: Option<DateTime<Local>>,
}

impl Segment {
    /// Start a segment at `start`. The end collapses onto the start until updated.
    pub fn create(
        start: Vec3,
        unit: DistanceUnit,
        unit_label: impl Into<String>,
        sink: &mut impl RenderingSink,
    ) -> Self {
        let visual = sink.create_visual(start);
        Self {
            start,
            end: start,
            unit,
            unit_label: unit_label.into(),
            visual,
            visual_live: true,
            has_sample: false,
            committed_at: None,
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn end(&self) -> Vec3 {
        self.end
    }

    pub fn visual(&self) -> VisualId {
        self.visual
    }

    pub fn has_sample(&self) -> bool {
        self.has_sample
    }

    pub fn is_committed(&self) -> bool {
        self.committed_at.is_some()
    }

    /// Local time the segment was committed, if it has been.
    pub fn committed_at(&self) -> Option<DateTime<Local>> {
        self.committed_at
    }

    /// Move the end point and redraw. Ignored once the segment is committed.
    pub fn update(&mut self, to: Vec3, sink: &mut impl RenderingSink) {
        if self.is_committed() {
            debug_assert!(false, "update called on a committed segment");
            warn!("Ignoring update on committed segment {:?}", self.visual);
            return;
        }

        self.end = to;
        self.has_sample = true;
        if self.visual_live {
            let label = self.distance_label();
            sink.update_visual(self.visual, to, &label);
        }
    }

    /// Euclidean distance between the endpoints, in meters.
    pub fn distance(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn distance_label(&self) -> String {
        format_distance(self.distance(), self.unit, &self.unit_label)
    }

    /// Freeze the segment. Further updates are rejected.
    pub(crate) fn commit(&mut self) {
        if self.committed_at.is_none() {
            self.committed_at = Some(Local::now());
        }
    }

    /// Release the visual. Safe to call more than once.
    pub fn discard(&mut self, sink: &mut impl RenderingSink) {
        if self.visual_live {
            sink.destroy_visual(self.visual);
            self.visual_live = false;
        }
    }
}
