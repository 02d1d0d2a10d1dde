//! Rendering
//!
//! Backend-agnostic pieces (camera, mesh data, the drawable registry and the
//! frame loop) sit at this level; everything that talks to Vulkan lives
//! under [`backends::vulkan`].

pub mod backends;
pub mod camera;
pub mod drawables;
pub mod frame;
pub mod primitives;

pub use backends::vulkan::VulkanRenderer;
pub use camera::{Camera, CameraMatrices};
pub use drawables::{Drawable, DrawableId, DrawableRegistry, MaterialHandle, MeshHandle, PipelineHandle, TextureHandle};
pub use frame::{FrameBackend, FrameLoop, FrameOutcome, FrameStats};
pub use primitives::{BoundingBox, MeshData, Vertex};
