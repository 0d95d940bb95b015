use bevy::prelude::*;
use bevy_egui::EguiPlugin;

mod camera;
mod config;
mod hud;
mod input;
mod measure;
mod tracking;
mod units;
mod visuals;

use camera::CameraPlugin;
use config::ConfigPlugin;
use hud::HudPlugin;
use input::InputPlugin;
use measure::MeasurePlugin;
use tracking::TrackingPlugin;

// =============================================================================
// Constants
// =============================================================================

mod constants {
    pub const WINDOW_TITLE: &str = "AR Measure";
    pub const WINDOW_RESOLUTION: (u32, u32) = (1280, 720);
    pub const CLEAR_COLOR: (f32, f32, f32) = (0.08, 0.09, 0.11);
}

fn main() {
    let (r, g, b) = constants::CLEAR_COLOR;

    App::new()
        .add_plugins((
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    title: constants::WINDOW_TITLE.to_string(),
                    resolution: constants::WINDOW_RESOLUTION.into(),
                    ..default()
                }),
                ..default()
            }),
            EguiPlugin::default(),
            ConfigPlugin,
        ))
        .insert_resource(ClearColor(Color::srgb(r, g, b)))
        .add_plugins((
            CameraPlugin,
            TrackingPlugin,
            InputPlugin,
            MeasurePlugin,
            HudPlugin,
        ))
        .run();
}
