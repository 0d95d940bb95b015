use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::config::AppConfig;
use crate::tracking::TrackedSurface;

// =============================================================================
// Components and Resources
// =============================================================================

/// Marker for the camera standing in for the phone's view.
#[derive(Component)]
pub(crate) struct HandheldCamera;

/// Look angles of the handheld camera, radians.
#[derive(Component, Debug, Clone, Copy, Default)]
pub(crate) struct LookAngles {
    pub yaw: f32,
    pub pitch: f32,
}

const MIN_PITCH: f32 = -1.5;
const MAX_PITCH: f32 = 0.6;
const MIN_EYE_HEIGHT: f32 = 0.2;
const MAX_EYE_HEIGHT: f32 = 3.0;
/// Half extent of the floor, meters
const FLOOR_HALF_SIZE: f32 = 10.0;

// =============================================================================
// Plugin
// =============================================================================

pub(crate) struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene)
            .add_systems(Update, (look_handheld_camera, move_handheld_camera).chain());
    }
}

/// Spawn the camera, light, and a floor with a few objects worth measuring.
fn setup_scene(
    mut commands: Commands,
    config: Res<AppConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let angles = LookAngles {
        yaw: 0.0,
        pitch: -0.6,
    };
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, config.camera.eye_height, 2.0).with_rotation(angles.rotation()),
        HandheldCamera,
        angles,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(3.0, 6.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(FLOOR_HALF_SIZE * 2.0, FLOOR_HALF_SIZE * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.32, 0.30, 0.28))),
    ));

    // table, box, and a long bench
    let props = [
        (Vec3::new(1.2, 0.75, 0.6), Vec3::new(-0.8, 0.375, -0.5), Color::srgb(0.55, 0.38, 0.22)),
        (Vec3::new(0.3, 0.3, 0.3), Vec3::new(0.7, 0.15, -0.2), Color::srgb(0.2, 0.4, 0.7)),
        (Vec3::new(2.0, 0.45, 0.35), Vec3::new(0.2, 0.225, -1.6), Color::srgb(0.45, 0.45, 0.45)),
    ];
    for (size, center, color) in props {
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(materials.add(color)),
            Transform::from_translation(center),
            TrackedSurface { half_size: size / 2.0 },
        ));
    }
}

impl LookAngles {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Apply a drag delta in pixels.
    pub fn drag(&mut self, delta: Vec2, sensitivity: f32) {
        self.yaw -= delta.x * sensitivity;
        self.pitch = (self.pitch - delta.y * sensitivity).clamp(MIN_PITCH, MAX_PITCH);
    }
}

/// Right-drag to look around.
fn look_handheld_camera(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: MessageReader<MouseMotion>,
    config: Res<AppConfig>,
    mut contexts: EguiContexts,
    mut camera_query: Query<(&mut Transform, &mut LookAngles), With<HandheldCamera>>,
) {
    if !mouse_button.pressed(MouseButton::Right) {
        mouse_motion.clear();
        return;
    }

    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.is_pointer_over_area() {
            mouse_motion.clear();
            return;
        }
    }

    let Ok((mut transform, mut angles)) = camera_query.single_mut() else {
        return;
    };

    for event in mouse_motion.read() {
        angles.drag(event.delta, config.camera.look_sensitivity);
    }
    transform.rotation = angles.rotation();
}

/// WASD walks on the floor, Q/E lower and raise the camera.
fn move_handheld_camera(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    config: Res<AppConfig>,
    mut contexts: EguiContexts,
    mut camera_query: Query<(&mut Transform, &LookAngles), With<HandheldCamera>>,
) {
    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.wants_keyboard_input() {
            return;
        }
    }

    let Ok((mut transform, angles)) = camera_query.single_mut() else {
        return;
    };

    let forward = Vec3::new(-angles.yaw.sin(), 0.0, -angles.yaw.cos());
    let right = Vec3::new(angles.yaw.cos(), 0.0, -angles.yaw.sin());

    let mut walk = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        walk += forward;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        walk -= forward;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        walk += right;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        walk -= right;
    }
    if keyboard.pressed(KeyCode::KeyE) {
        walk += Vec3::Y;
    }
    if keyboard.pressed(KeyCode::KeyQ) {
        walk -= Vec3::Y;
    }

    if walk == Vec3::ZERO {
        return;
    }

    let step = walk.normalize() * config.camera.move_speed * time.delta_secs();
    let mut next = transform.translation + step;
    next.x = next.x.clamp(-FLOOR_HALF_SIZE, FLOOR_HALF_SIZE);
    next.z = next.z.clamp(-FLOOR_HALF_SIZE, FLOOR_HALF_SIZE);
    next.y = next.y.clamp(MIN_EYE_HEIGHT, MAX_EYE_HEIGHT);
    transform.translation = next;
}
