//! Measuring screen overlay.
//!
//! The HUD holds presentation state only. Visibility flags are flipped by
//! [`SessionEvent`]s; everything else is read from the session each frame
//! and rendered through [`render_hud_ui`], which has no bevy dependencies so
//! it can be exercised with `egui_kittest`.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use egui_phosphor::regular;

use crate::camera::HandheldCamera;
use crate::input::MeasureInput;
use crate::measure::{drive_session, MeasurementSession, SessionEvent};
use crate::tracking::{Interruption, TrackingStatus};
use crate::visuals::VisualArena;

const DETECTING_MESSAGE: &str = "Detecting the world…";
const AIM_HINT: &str = "Hold screen & move your phone…";
const INTERRUPTED_MESSAGE: &str = "Interrupted";
const INTERRUPTION_ENDED_MESSAGE: &str = "Interruption ended";
const ERROR_MESSAGE: &str = "Error occurred";

const RETICLE_RADIUS: f32 = 14.0;
const MESSAGE_FONT_SIZE: f32 = 20.0;
const ICON_FONT_SIZE: f32 = 22.0;

/// Flags driven by session notifications.
#[derive(Resource, Debug, Default)]
pub struct HudState {
    pub units_visible: bool,
    pub reset_visible: bool,
}

/// Everything the overlay draws in one frame.
#[derive(Debug, Clone, Default)]
pub struct HudView {
    pub message: String,
    pub show_spinner: bool,
    /// Reticle is hidden until tracking has produced a fix
    pub show_reticle: bool,
    /// Current frame has a fix; the reticle dims without one
    pub has_fix: bool,
    pub measuring: bool,
    pub units_visible: bool,
    pub unit_label: String,
    pub reset_visible: bool,
    /// Screen position of the view center
    pub center: egui::Pos2,
    /// Length labels anchored at segment midpoints, in screen space
    pub segment_labels: Vec<(u64, egui::Pos2, String)>,
    /// Committed measures as (label, commit time)
    pub measures: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudAction {
    Reset,
    Close,
}

pub(crate) struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HudState>()
            .add_systems(Update, apply_session_events.after(drive_session))
            .add_systems(EguiPrimaryContextPass, (install_icon_font, render_hud).chain());
    }
}

/// Host side of the session notifications.
pub(crate) fn apply_session_events(
    mut events: MessageReader<SessionEvent>,
    mut hud: ResMut<HudState>,
) {
    for event in events.read() {
        match event {
            SessionEvent::MeasureCommitted { label } => {
                info!("Measure updated: {}", label);
            }
            SessionEvent::CommittedListChanged { is_empty } => {
                hud.reset_visible = !is_empty;
            }
            SessionEvent::UnitsRevealed => {
                hud.units_visible = true;
            }
        }
    }
}

/// Status line text for the current tracking and session state.
pub fn status_message(status: &TrackingStatus, session: &MeasurementSession) -> String {
    if status.error.is_some() {
        return ERROR_MESSAGE.to_string();
    }
    if status.interruption == Some(Interruption::Interrupted) {
        return INTERRUPTED_MESSAGE.to_string();
    }
    if !status.detected {
        return DETECTING_MESSAGE.to_string();
    }
    if let Some(label) = session.current_distance_label() {
        return label;
    }
    if status.interruption == Some(Interruption::Ended) {
        return INTERRUPTION_ENDED_MESSAGE.to_string();
    }
    match session.committed().last() {
        Some(segment) => segment.distance_label(),
        None => AIM_HINT.to_string(),
    }
}

fn install_icon_font(mut contexts: EguiContexts, mut installed: Local<bool>) {
    if *installed {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
    ctx.set_fonts(fonts);
    *installed = true;
}

fn render_hud(
    mut contexts: EguiContexts,
    session: Res<MeasurementSession>,
    status: Res<TrackingStatus>,
    hud: Res<HudState>,
    arena: Res<VisualArena>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<HandheldCamera>>,
    mut commands_out: MessageWriter<MeasureInput>,
    mut exit: MessageWriter<AppExit>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };

    let segment_labels: Vec<(u64, egui::Pos2, String)> = camera_query
        .single()
        .map(|(camera, camera_transform)| {
            arena
                .iter()
                .filter(|(_, visual)| !visual.label.is_empty())
                .filter_map(|(id, visual)| {
                    let screen = camera.world_to_viewport(camera_transform, visual.midpoint()).ok()?;
                    Some((id.0, egui::pos2(screen.x, screen.y), visual.label.clone()))
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let measures: Vec<(String, String)> = session
        .committed()
        .iter()
        .map(|segment| {
            let time = segment
                .committed_at()
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default();
            (segment.distance_label(), time)
        })
        .collect();

    let view = HudView {
        message: status_message(&status, &session),
        show_spinner: !status.detected,
        show_reticle: status.detected,
        has_fix: status.has_fix,
        measuring: session.is_measuring(),
        units_visible: hud.units_visible,
        unit_label: session.policy().unit_label.clone(),
        reset_visible: hud.reset_visible,
        center: egui::pos2(window.width() / 2.0, window.height() / 2.0),
        segment_labels,
        measures,
    };

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    for action in render_hud_ui(ctx, &view) {
        match action {
            HudAction::Reset => {
                commands_out.write(MeasureInput::ResetAll);
            }
            HudAction::Close => {
                info!("Closing measure view");
                exit.write(AppExit::Success);
            }
        }
    }
}

/// Draw the overlay and return the buttons pressed this frame.
pub fn render_hud_ui(ctx: &egui::Context, view: &HudView) -> Vec<HudAction> {
    let mut actions = Vec::new();

    // -- Status line --
    egui::Area::new(egui::Id::new("measure_status"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 24.0))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if view.show_spinner {
                    ui.spinner();
                }
                ui.label(
                    egui::RichText::new(&view.message)
                        .size(MESSAGE_FONT_SIZE)
                        .color(egui::Color32::WHITE)
                        .strong(),
                );
            });
        });

    // -- Target reticle --
    if view.show_reticle {
        let color = match (view.measuring, view.has_fix) {
            (_, false) => egui::Color32::from_gray(140),
            (true, true) => egui::Color32::from_rgb(60, 230, 90),
            (false, true) => egui::Color32::WHITE,
        };
        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Foreground, "reticle".into()));
        painter.circle_stroke(view.center, RETICLE_RADIUS, egui::Stroke::new(2.0, color));
        painter.circle_filled(view.center, 2.5, color);
    }

    // -- Length labels at segment midpoints --
    for (id, pos, label) in &view.segment_labels {
        egui::Area::new(egui::Id::new(("segment_label", *id)))
            .fixed_pos(*pos)
            .pivot(egui::Align2::CENTER_CENTER)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .fill(egui::Color32::from_rgba_unmultiplied(30, 30, 30, 200))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(label).color(egui::Color32::WHITE));
                    });
            });
    }

    // -- Bottom bar: unit icon, reset, close --
    egui::Area::new(egui::Id::new("measure_controls"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if view.units_visible {
                    ui.label(egui::RichText::new(regular::RULER).size(ICON_FONT_SIZE));
                    ui.label(&view.unit_label);
                }
                if view.reset_visible {
                    ui.label(egui::RichText::new(regular::ARROW_COUNTER_CLOCKWISE).size(ICON_FONT_SIZE));
                    if ui.button("Reset").clicked() {
                        actions.push(HudAction::Reset);
                    }
                }
                ui.label(egui::RichText::new(regular::X).size(ICON_FONT_SIZE));
                if ui.button("Close").clicked() {
                    actions.push(HudAction::Close);
                }
            });
        });

    // -- Committed measures --
    if !view.measures.is_empty() {
        egui::Area::new(egui::Id::new("measure_list"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(egui::RichText::new("Measures").strong());
                    for (label, time) in &view.measures {
                        ui.horizontal(|ui| {
                            ui.label(label);
                            ui.label(egui::RichText::new(time).weak());
                        });
                    }
                });
            });
    }

    actions
}
