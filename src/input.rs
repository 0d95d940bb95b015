use bevy::input::touch::Touches;
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::config::{AppConfig, Gesture};
use crate::measure::MeasurementSession;

/// Explicit session commands produced from raw pointer and key input.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureInput {
    Begin,
    End,
    ResetAll,
}

/// Whether egui claimed this frame's pointer or keyboard input.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EguiCapture {
    pub pointer: bool,
    pub keyboard: bool,
}

// =============================================================================
// Plugin
// =============================================================================

pub(crate) struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<MeasureInput>()
            .init_resource::<EguiCapture>()
            .add_systems(
                Update,
                (
                    track_egui_capture,
                    (emit_measure_input, handle_close_shortcut),
                )
                    .chain(),
            );
    }
}

/// Translate one frame's press/release into session commands, in order.
///
/// Tap toggles on press. Hold begins on press and ends on release; a press
/// and release inside one frame finishes the gesture right away.
pub fn gesture_command(
    gesture: Gesture,
    measuring: bool,
    pressed: bool,
    released: bool,
) -> &'static [MeasureInput] {
    match gesture {
        Gesture::Tap if pressed && measuring => &[MeasureInput::End],
        Gesture::Tap if pressed => &[MeasureInput::Begin],
        Gesture::Tap => &[],
        Gesture::Hold if pressed && released && !measuring => {
            &[MeasureInput::Begin, MeasureInput::End]
        }
        Gesture::Hold if pressed && !measuring => &[MeasureInput::Begin],
        Gesture::Hold if released && measuring => &[MeasureInput::End],
        Gesture::Hold => &[],
    }
}

fn track_egui_capture(mut contexts: EguiContexts, mut capture: ResMut<EguiCapture>) {
    let next = contexts
        .ctx_mut()
        .map(|ctx| EguiCapture {
            pointer: ctx.wants_pointer_input() || ctx.is_pointer_over_area(),
            keyboard: ctx.wants_keyboard_input(),
        })
        .unwrap_or_default();
    if *capture != next {
        *capture = next;
    }
}

pub(crate) fn emit_measure_input(
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    touches: Res<Touches>,
    capture: Res<EguiCapture>,
    config: Res<AppConfig>,
    session: Res<MeasurementSession>,
    mut commands_out: MessageWriter<MeasureInput>,
) {
    let mut measuring = session.is_measuring();

    if !capture.keyboard && keyboard.just_pressed(KeyCode::KeyR) {
        debug!("Measure input: {:?}", MeasureInput::ResetAll);
        commands_out.write(MeasureInput::ResetAll);
        measuring = false;
    }

    let mut pressed = false;
    let mut released = false;
    if !capture.pointer {
        pressed |= mouse_button.just_pressed(MouseButton::Left) || touches.any_just_pressed();
        released |= mouse_button.just_released(MouseButton::Left) || touches.any_just_released();
    }
    if !capture.keyboard {
        pressed |= keyboard.just_pressed(KeyCode::Space);
        released |= keyboard.just_released(KeyCode::Space);
    }

    for command in gesture_command(config.input.gesture, measuring, pressed, released) {
        debug!("Measure input: {:?}", command);
        commands_out.write(*command);
    }
}

/// Escape closes the measuring screen.
fn handle_close_shortcut(
    keyboard: Res<ButtonInput<KeyCode>>,
    capture: Res<EguiCapture>,
    mut exit: MessageWriter<AppExit>,
) {
    if capture.keyboard {
        return;
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        info!("Closing measure view");
        exit.write(AppExit::Success);
    }
}
