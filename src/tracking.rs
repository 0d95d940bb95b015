//! Stand-in for AR world tracking.
//!
//! Each frame a ray is cast from the handheld camera through the center of
//! the viewport. The nearest hit on the floor plane or on any
//! [`TrackedSurface`] within range becomes the frame's tracking fix.

use bevy::math::bounding::{Aabb3d, RayCast3d};
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowFocused};

use crate::camera::HandheldCamera;
use crate::config::AppConfig;
use crate::input::MeasureInput;
use crate::measure::TrackingSource;

/// Axis-aligned box the center ray can land on, e.g. a table top.
#[derive(Component, Debug, Clone, Copy)]
pub struct TrackedSurface {
    pub half_size: Vec3,
}

/// Latest fix, consumed by the session once per tick.
#[derive(Resource, Debug, Default)]
pub struct TrackingFix {
    position: Option<Vec3>,
}

impl TrackingFix {
    pub fn set(&mut self, position: Option<Vec3>) {
        self.position = position;
    }
}

impl TrackingSource for TrackingFix {
    fn sample_world_position(&mut self) -> Option<Vec3> {
        self.position.take()
    }
}

/// Session-level interruption reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Interrupted,
    Ended,
}

#[derive(Resource, Debug, Default)]
pub struct TrackingStatus {
    /// At least one fix has been seen since startup
    pub detected: bool,
    /// Whether the last frame produced a fix
    pub has_fix: bool,
    pub interruption: Option<Interruption>,
    /// Why the last frame could not track, cleared by the next good ray
    pub error: Option<String>,
}

/// Floor plane plus surfaces, tested along one ray.
pub struct CenterRayTracker<'a> {
    pub floor_height: f32,
    pub max_range: f32,
    pub surfaces: &'a [(Vec3, TrackedSurface)],
}

impl CenterRayTracker<'_> {
    /// Nearest hit along `ray`, if any lies within range.
    pub fn hit(&self, ray: Ray3d) -> Option<Vec3> {
        let floor = ray
            .intersect_plane(Vec3::Y * self.floor_height, InfinitePlane3d::new(Vec3::Y))
            .filter(|d| *d <= self.max_range);

        let cast = RayCast3d::from_ray(ray, self.max_range);
        let surface = self
            .surfaces
            .iter()
            .filter_map(|(center, surface)| {
                cast.aabb_intersection_at(&Aabb3d::new(*center, surface.half_size))
            })
            .fold(None, |best: Option<f32>, d| Some(best.map_or(d, |b| b.min(d))));

        let nearest = match (floor, surface) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }?;
        Some(ray.get_point(nearest))
    }
}

pub(crate) struct TrackingPlugin;

impl Plugin for TrackingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrackingFix>()
            .init_resource::<TrackingStatus>()
            .add_systems(Update, (track_view_center, track_interruptions));
    }
}

pub(crate) fn track_view_center(
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<HandheldCamera>>,
    surface_query: Query<(&GlobalTransform, &TrackedSurface)>,
    config: Res<AppConfig>,
    mut fix: ResMut<TrackingFix>,
    mut status: ResMut<TrackingStatus>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    let center = window.size() / 2.0;
    let ray = match camera.viewport_to_world(camera_transform, center) {
        Ok(ray) => ray,
        Err(err) => {
            if status.error.is_none() {
                error!("Tracking failed: {}", err);
            }
            status.error = Some(err.to_string());
            status.has_fix = false;
            fix.set(None);
            return;
        }
    };
    status.error = None;

    let surfaces: Vec<(Vec3, TrackedSurface)> = surface_query
        .iter()
        .map(|(transform, surface)| (transform.translation(), *surface))
        .collect();
    let tracker = CenterRayTracker {
        floor_height: 0.0,
        max_range: config.camera.max_range,
        surfaces: &surfaces,
    };

    let position = tracker.hit(ray);
    if position.is_some() && !status.detected {
        status.detected = true;
        info!("World detected");
    }
    status.has_fix = position.is_some();
    fix.set(position);
}

/// Losing window focus stands in for an interrupted AR session.
fn track_interruptions(
    mut focus_events: MessageReader<WindowFocused>,
    mut inputs: MessageReader<MeasureInput>,
    mut status: ResMut<TrackingStatus>,
) {
    for event in focus_events.read() {
        status.interruption = if event.focused {
            status.interruption.map(|_| Interruption::Ended)
        } else {
            warn!("Tracking interrupted");
            Some(Interruption::Interrupted)
        };
    }

    // a new measurement replaces the "ended" notice
    if inputs.read().any(|input| *input == MeasureInput::Begin)
        && status.interruption == Some(Interruption::Ended)
    {
        status.interruption = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_from(origin: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::NEG_Y)
    }

    #[test]
    fn ray_hits_floor() {
        let tracker = CenterRayTracker {
            floor_height: 0.0,
            max_range: 5.0,
            surfaces: &[],
        };
        let hit = tracker.hit(down_from(Vec3::new(1.0, 1.5, -2.0))).unwrap();
        assert!((hit - Vec3::new(1.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn floor_out_of_range_is_no_fix() {
        let tracker = CenterRayTracker {
            floor_height: 0.0,
            max_range: 1.0,
            surfaces: &[],
        };
        assert_eq!(tracker.hit(down_from(Vec3::new(0.0, 2.0, 0.0))), None);
    }

    #[test]
    fn looking_up_is_no_fix() {
        let tracker = CenterRayTracker {
            floor_height: 0.0,
            max_range: 100.0,
            surfaces: &[],
        };
        assert_eq!(tracker.hit(Ray3d::new(Vec3::Y, Dir3::Y)), None);
    }

    #[test]
    fn surface_in_front_of_floor_wins() {
        let surfaces = [(
            Vec3::new(0.0, 0.375, 0.0),
            TrackedSurface {
                half_size: Vec3::new(0.6, 0.375, 0.3),
            },
        )];
        let tracker = CenterRayTracker {
            floor_height: 0.0,
            max_range: 5.0,
            surfaces: &surfaces,
        };
        let hit = tracker.hit(down_from(Vec3::new(0.1, 2.0, 0.1))).unwrap();
        assert!((hit.y - 0.75).abs() < 1e-5);
    }

    fn interruption_app() -> App {
        let mut app = App::new();
        app.add_message::<WindowFocused>()
            .add_message::<MeasureInput>()
            .init_resource::<TrackingStatus>()
            .add_systems(Update, track_interruptions);
        app
    }

    fn focus(app: &mut App, focused: bool) {
        app.world_mut().write_message(WindowFocused {
            window: Entity::PLACEHOLDER,
            focused,
        });
        app.update();
    }

    fn interruption(app: &App) -> Option<Interruption> {
        app.world().resource::<TrackingStatus>().interruption
    }

    #[test]
    fn focus_loss_interrupts_and_regain_ends() {
        let mut app = interruption_app();
        focus(&mut app, true);
        assert_eq!(interruption(&app), None);

        focus(&mut app, false);
        assert_eq!(interruption(&app), Some(Interruption::Interrupted));

        focus(&mut app, true);
        assert_eq!(interruption(&app), Some(Interruption::Ended));
    }

    #[test]
    fn begin_clears_ended_notice() {
        let mut app = interruption_app();
        focus(&mut app, false);

        app.world_mut().write_message(MeasureInput::Begin);
        app.update();
        assert_eq!(interruption(&app), Some(Interruption::Interrupted));

        focus(&mut app, true);
        app.world_mut().write_message(MeasureInput::End);
        app.update();
        assert_eq!(interruption(&app), Some(Interruption::Ended));

        app.world_mut().write_message(MeasureInput::Begin);
        app.update();
        assert_eq!(interruption(&app), None);
    }

    #[test]
    fn camera_without_viewport_reports_error() {
        let mut app = App::new();
        app.init_resource::<AppConfig>()
            .init_resource::<TrackingFix>()
            .init_resource::<TrackingStatus>()
            .add_systems(Update, track_view_center);
        app.world_mut().spawn((Window::default(), PrimaryWindow));
        app.world_mut()
            .spawn((Camera::default(), GlobalTransform::default(), HandheldCamera));

        app.world_mut().resource_mut::<TrackingFix>().set(Some(Vec3::X));
        app.update();

        let status = app.world().resource::<TrackingStatus>();
        assert!(status.error.is_some());
        assert!(!status.has_fix);
        assert_eq!(
            app.world_mut().resource_mut::<TrackingFix>().sample_world_position(),
            None
        );
    }

    #[test]
    fn fix_is_consumed_once() {
        let mut fix = TrackingFix::default();
        fix.set(Some(Vec3::X));
        assert_eq!(fix.sample_world_position(), Some(Vec3::X));
        assert_eq!(fix.sample_world_position(), None);
    }
}
