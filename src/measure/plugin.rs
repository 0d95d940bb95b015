use bevy::prelude::*;

use super::{MeasurementSession, SessionEvent};
use crate::config::AppConfig;
use crate::input::{emit_measure_input, MeasureInput};
use crate::tracking::{track_view_center, TrackingFix};
use crate::visuals::{draw_segment_visuals, VisualArena};

pub struct MeasurePlugin;

impl Plugin for MeasurePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SessionEvent>()
            .init_resource::<VisualArena>()
            .init_resource::<MeasurementSession>()
            .add_systems(Startup, configure_session)
            .add_systems(
                Update,
                drive_session
                    .after(emit_measure_input)
                    .after(track_view_center),
            )
            .add_systems(Update, draw_segment_visuals.after(drive_session));
    }
}

/// Rebuild the session with the host policy from config.
fn configure_session(config: Res<AppConfig>, mut session: ResMut<MeasurementSession>) {
    let policy = config.host_policy();
    info!(
        "Measuring in {} (label {:?}, multiple: {})",
        policy.unit, policy.unit_label, policy.allow_multiple
    );
    *session = MeasurementSession::new(policy);
}

/// Apply this frame's commands, then feed the frame's tracking sample.
pub(crate) fn drive_session(
    mut inputs: MessageReader<MeasureInput>,
    mut session: ResMut<MeasurementSession>,
    mut arena: ResMut<VisualArena>,
    mut fix: ResMut<TrackingFix>,
    mut notifications: MessageWriter<SessionEvent>,
) {
    let mut events = Vec::new();

    for input in inputs.read() {
        match input {
            MeasureInput::Begin => session.activate(&mut *arena, &mut events),
            MeasureInput::End => session.deactivate(&mut *arena, &mut events),
            MeasureInput::ResetAll => session.reset_all(&mut *arena, &mut events),
        }
    }

    session.tick(&mut *fix, &mut *arena, &mut events);

    for event in events {
        notifications.write(event);
    }
}
