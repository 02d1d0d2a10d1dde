//! Unified configuration for the renderer and the applications built on it.
//!
//! All structs are plain serde data with `with_*` builders and a `validate`
//! step. Nothing here parses command lines; validation defaults come from the
//! build profile.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::config::{Config, ConfigError};

/// Smallest and largest number of frames the renderer keeps in flight
pub const FRAMES_IN_FLIGHT_RANGE: std::ops::RangeInclusive<usize> = 2..=3;

/// Default descriptor sets per pool before the allocator grows a new one
pub const DEFAULT_DESCRIPTOR_SETS_PER_POOL: u32 = 1000;

/// # Window Configuration
///
/// Desired window size. The swapchain falls back to this size when the surface
/// leaves the extent up to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Desired framebuffer width in pixels
    pub width: u32,
    /// Desired framebuffer height in pixels
    pub height: u32,
}

impl WindowConfig {
    /// Create a window configuration
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
        }
    }

    /// Set the window size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("Window size must be non-zero, got {}x{}", self.width, self.height));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Lights Please", 800, 600)
    }
}

/// # Shader Configuration
///
/// Paths to precompiled SPIR-V for the default pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual output directories so the demo runs from either the
    /// workspace root or its own directory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = [
            "target/shaders/",
            "shaders/",
            "../target/shaders/",
            "resources/shaders/",
            "./",
        ];

        let find = |file: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{}{}", dir, file))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("shaders/{}", file))
        };

        Self {
            vertex_shader_path: find(base_vertex),
            fragment_shader_path: find(base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), String> {
        if !Path::new(&self.vertex_shader_path).exists() {
            return Err(format!("Vertex shader not found: {}", self.vertex_shader_path));
        }
        if !Path::new(&self.fragment_shader_path).exists() {
            return Err(format!("Fragment shader not found: {}", self.fragment_shader_path));
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("triangle.vert.spv", "triangle.frag.spv")
    }
}

/// # Vulkan Renderer Configuration
///
/// Settings consumed by [`crate::render::backends::vulkan::VulkanRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulkanRendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers (`None` follows the build profile)
    pub enable_validation: Option<bool>,
    /// Clear colour for the colour attachment (RGBA)
    pub clear_color: [f32; 4],
    /// Descriptor set capacity of each descriptor pool
    pub descriptor_sets_per_pool: u32,
    /// Swapchain image count to ask for; clamped to what the surface allows
    pub preferred_image_count: u32,
}

impl VulkanRendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            shaders: ShaderConfig::default(),
            max_frames_in_flight: 3,
            enable_validation: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            descriptor_sets_per_pool: DEFAULT_DESCRIPTOR_SETS_PER_POOL,
            preferred_image_count: 3,
        }
    }

    /// Set application version
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set maximum frames in flight, clamped to the supported range
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight =
            frames.clamp(*FRAMES_IN_FLIGHT_RANGE.start(), *FRAMES_IN_FLIGHT_RANGE.end());
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Set the clear colour
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the descriptor pool capacity
    pub fn with_descriptor_sets_per_pool(mut self, sets: u32) -> Self {
        self.descriptor_sets_per_pool = sets;
        self
    }

    /// Set the swapchain image count to request
    pub fn with_preferred_image_count(mut self, count: u32) -> Self {
        self.preferred_image_count = count;
        self
    }

    /// Whether validation layers should be enabled for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if !FRAMES_IN_FLIGHT_RANGE.contains(&self.max_frames_in_flight) {
            return Err(format!(
                "Max frames in flight must be within {:?}, got {}",
                FRAMES_IN_FLIGHT_RANGE, self.max_frames_in_flight
            ));
        }

        if self.descriptor_sets_per_pool == 0 {
            return Err("Descriptor pools need a capacity of at least one set".to_string());
        }

        self.shaders.validate()?;

        Ok(())
    }
}

impl Default for VulkanRendererConfig {
    fn default() -> Self {
        Self::new("Lights Please")
    }
}

/// # Engine Configuration
///
/// Process-wide settings that are not specific to the Vulkan backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default log filter handed to env_logger when `RUST_LOG` is unset
    pub log_level: String,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: if cfg!(debug_assertions) { "debug" } else { "info" }.to_string(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that applications load from disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Window configuration
    pub window: WindowConfig,
    /// Rendering system configuration
    pub renderer: VulkanRendererConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            engine: EngineConfig::default(),
            window: WindowConfig::default().with_title(app_name.clone()),
            renderer: VulkanRendererConfig::new(app_name),
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        self.window.validate()?;
        self.renderer.validate()?;
        Ok(())
    }
}

impl WindowConfig {
    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_in_flight_is_clamped() {
        assert_eq!(VulkanRendererConfig::default().with_max_frames_in_flight(0).max_frames_in_flight, 2);
        assert_eq!(VulkanRendererConfig::default().with_max_frames_in_flight(8).max_frames_in_flight, 3);
        assert_eq!(VulkanRendererConfig::default().with_max_frames_in_flight(2).max_frames_in_flight, 2);
    }

    /// Out-of-range values that bypass the builder are caught by validate
    #[test]
    fn test_validate_rejects_bad_frame_count() {
        let mut config = VulkanRendererConfig::default()
            .with_shaders(ShaderConfig::new(file!(), file!()));
        assert!(config.validate().is_ok() || !Path::new(file!()).exists());

        config.max_frames_in_flight = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_shader_fails_validation() {
        let shaders = ShaderConfig::new("no/such/vert.spv", "no/such/frag.spv");
        let err = shaders.validate().unwrap_err();
        assert!(err.contains("Vertex shader not found"));
    }

    #[test]
    fn test_validation_follows_build_profile_by_default() {
        let config = VulkanRendererConfig::default();
        assert_eq!(config.validation_enabled(), cfg!(debug_assertions));
        assert!(!config.with_validation(false).validation_enabled());
    }

    #[test]
    fn test_zero_window_size_is_invalid() {
        assert!(WindowConfig::default().with_size(0, 600).validate().is_err());
        assert!(WindowConfig::default().validate().is_ok());
    }

    #[test]
    fn test_application_config_toml_roundtrip() {
        let config = ApplicationConfig::new("Roundtrip");
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ApplicationConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.window.title, "Roundtrip");
    }
}
