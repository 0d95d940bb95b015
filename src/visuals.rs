use std::collections::BTreeMap;

use bevy::math::Isometry3d;
use bevy::prelude::*;

use crate::measure::{MeasurementSession, RenderingSink, VisualId};

/// Radius of the endpoint markers, in meters.
const ENDPOINT_RADIUS: f32 = 0.015;
/// Lift above the ground so lines don't z-fight with the grid.
const LINE_LIFT: f32 = 0.002;

const LIVE_COLOR: Color = Color::srgb(0.2, 1.0, 0.3);
const COMMITTED_COLOR: Color = Color::srgb(1.0, 0.85, 0.1);

/// What the renderer knows about one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentVisual {
    pub start: Vec3,
    pub end: Vec3,
    /// Length label drawn at the midpoint; empty until the first update
    pub label: String,
}

impl SegmentVisual {
    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }
}

/// Arena of segment visuals keyed by opaque ids.
///
/// Ids are never reused, so a stale id can only miss.
#[derive(Resource, Debug, Default)]
pub struct VisualArena {
    next_id: u64,
    visuals: BTreeMap<VisualId, SegmentVisual>,
}

impl VisualArena {
    pub fn iter(&self) -> impl Iterator<Item = (VisualId, &SegmentVisual)> {
        self.visuals.iter().map(|(id, v)| (*id, v))
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }
}

impl RenderingSink for VisualArena {
    fn create_visual(&mut self, at: Vec3) -> VisualId {
        let id = VisualId(self.next_id);
        self.next_id += 1;
        self.visuals.insert(
            id,
            SegmentVisual {
                start: at,
                end: at,
                label: String::new(),
            },
        );
        id
    }

    fn update_visual(&mut self, id: VisualId, to: Vec3, label: &str) {
        let Some(visual) = self.visuals.get_mut(&id) else {
            debug!("update for released visual {:?}", id);
            return;
        };
        visual.end = to;
        if visual.label != label {
            visual.label.clear();
            visual.label.push_str(label);
        }
    }

    fn destroy_visual(&mut self, id: VisualId) {
        self.visuals.remove(&id);
    }
}

/// Draw every live segment as a gizmo line with endpoint markers.
pub fn draw_segment_visuals(
    arena: Res<VisualArena>,
    session: Res<MeasurementSession>,
    mut gizmos: Gizmos,
) {
    let live_id = session.current().map(|s| s.visual());
    let lift = Vec3::Y * LINE_LIFT;

    for (id, visual) in arena.iter() {
        let color = if Some(id) == live_id {
            LIVE_COLOR
        } else {
            COMMITTED_COLOR
        };
        let start = visual.start + lift;
        let end = visual.end + lift;

        gizmos.line(start, end, color);
        gizmos.sphere(Isometry3d::from_translation(start), ENDPOINT_RADIUS, color);
        gizmos.sphere(Isometry3d::from_translation(end), ENDPOINT_RADIUS, color);
    }
}
