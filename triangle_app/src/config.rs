//! Demo settings, read from `lights.toml` when present

use lights_engine::config::Config;
use lights_engine::core::config::ApplicationConfig;
use serde::{Deserialize, Serialize};

/// Everything the demo reads from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Window, renderer and logging settings
    pub application: ApplicationConfig,
    /// PNG for the quad; a checkerboard is generated when unset
    pub texture_path: Option<String>,
    /// Camera orbit speed in radians per second
    pub orbit_speed: f32,
    /// Distance from the camera to the scene centre
    pub orbit_radius: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            application: ApplicationConfig::new("Lights Please - Triangle"),
            texture_path: None,
            orbit_speed: 0.5,
            orbit_radius: 4.0,
        }
    }
}

impl Config for DemoConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Missing keys fall back to the defaults
    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: DemoConfig = load_from_toml("orbit_speed = 1.5\n");
        assert!((config.orbit_speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.texture_path, None);
        assert_eq!(config.application, DemoConfig::default().application);
    }

    fn load_from_toml(source: &str) -> DemoConfig {
        let dir = std::env::temp_dir().join(format!("triangle_app_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lights.toml");
        std::fs::write(&path, source).unwrap();
        let config = DemoConfig::load_from_file(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        config
    }
}
