use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::measure::HostPolicy;
use crate::units::DistanceUnit;

const CONFIG_FILE: &str = "measure.toml";
const APP_DIR: &str = "ar-measure";

#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub measure: MeasureConfig,
    pub input: InputConfig,
    pub camera: CameraConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MeasureConfig {
    /// Keep earlier measurements when a new one starts
    pub allow_multiple: bool,
    /// "cm" for centimeters; anything else means inches
    pub unit: DistanceUnit,
    /// Suffix for distance labels. Defaults to the unit code.
    pub unit_label: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    /// One tap starts a measurement, the next one ends it
    #[default]
    Tap,
    /// Measure while the pointer is held down
    Hold,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub gesture: Gesture,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting height of the handheld camera, meters
    pub eye_height: f32,
    /// Walking speed, meters per second
    pub move_speed: f32,
    /// Radians per pixel of drag
    pub look_sensitivity: f32,
    /// Farthest ground hit that still counts as a fix, meters
    pub max_range: f32,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            unit: DistanceUnit::Centimeter,
            unit_label: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            gesture: Gesture::Tap,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye_height: 1.4,
            move_speed: 1.2,
            look_sensitivity: 0.004,
            max_range: 8.0,
        }
    }
}

impl AppConfig {
    /// Policy handed to the measurement session at startup.
    pub fn host_policy(&self) -> HostPolicy {
        let unit = self.measure.unit;
        HostPolicy {
            allow_multiple: self.measure.allow_multiple,
            unit,
            unit_label: self
                .measure
                .unit_label
                .clone()
                .unwrap_or_else(|| unit.to_string()),
        }
    }
}

/// Working-directory config wins; otherwise the per-user config dir.
fn config_path() -> PathBuf {
    let local = std::env::current_dir().unwrap_or_default().join(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(dir) if dir.join(APP_DIR).join(CONFIG_FILE).exists() => {
            dir.join(APP_DIR).join(CONFIG_FILE)
        }
        _ => local,
    }
}

pub fn read_config(path: &Path) -> Result<AppConfig, String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("read {:?}: {}", path, e))?;
    toml::from_str(&contents).map_err(|e| format!("parse {:?}: {}", path, e))
}

pub fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    let contents = toml::to_string_pretty(config).map_err(|e| e.to_string())?;
    fs::write(path, contents).map_err(|e| format!("write {:?}: {}", path, e))
}

pub fn load_config() -> AppConfig {
    let path = config_path();
    if path.exists() {
        match read_config(&path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                return config;
            }
            Err(e) => {
                warn!("Failed to load config: {}, using defaults", e);
                return AppConfig::default();
            }
        }
    }

    let config = AppConfig::default();
    match write_config(&path, &config) {
        Ok(()) => info!("Saved default config to {:?}", path),
        Err(e) => error!("Failed to write config: {}", e),
    }
    config
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(load_config());
    }
}
