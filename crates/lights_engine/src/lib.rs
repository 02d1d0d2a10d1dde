//! # Lights Engine
//!
//! The frame-rendering core of the Lights Please renderer: a Vulkan forward
//! renderer that owns the swapchain, paces frames in flight, hands out
//! descriptor sets from growable pools, keeps per-image camera uniforms and
//! records the registered drawables into one render pass per frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lights_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::new("Demo");
//!     let mut window = GlfwWindow::new(&config.window)?;
//!     let mut renderer = VulkanRenderer::new(&mut window, &config.renderer)?;
//!
//!     let pipeline = renderer.create_pipeline(&config.renderer.shaders)?;
//!     let material = renderer.create_material(pipeline, None, [1.0, 1.0, 1.0, 1.0])?;
//!     let mesh = renderer.create_mesh(&MeshData::triangle())?;
//!     renderer.add_drawable(mesh, material)?;
//!
//!     let camera = Camera::default();
//!     while !window.should_close() {
//!         window.poll_events();
//!         renderer.draw_frame(&camera)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Configuration
pub mod config;
pub mod core;

// Shared utilities
pub mod foundation;

// Windowing seam
pub mod platform;

// Rendering
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, Config, EngineConfig, ShaderConfig, VulkanRendererConfig, WindowConfig},
        foundation::math::{Mat4, Vec3},
        platform::{GlfwWindow, PresentationTarget, RawWindowTarget},
        render::{
            backends::vulkan::{VulkanError, VulkanRenderer, VulkanResult},
            camera::Camera,
            drawables::{DrawableId, MaterialHandle, MeshHandle, PipelineHandle, TextureHandle},
            frame::{FrameOutcome, FrameStats},
            primitives::{MeshData, Vertex},
        },
    };
}
