//! Vulkan resource management
//!
//! Descriptor layouts and pooled sets, per-image uniforms, and the GPU side
//! of meshes, textures and materials.

/// Growable descriptor pool list
pub mod descriptor_allocator;

/// Descriptor set layouts and batched writes
pub mod descriptor_set;

/// Materials and their descriptor sets
pub mod material;

/// Device-local mesh buffers
pub mod mesh;

/// Sampled textures
pub mod texture;

/// Per-swapchain-image global uniforms
pub mod uniform_store;

pub use descriptor_allocator::{DescriptorAllocator, DescriptorPoolBackend};
pub use descriptor_set::{
    DescriptorLayoutRegistry, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter, LayoutHandles,
};
pub use material::{Material, MaterialUniforms};
pub use mesh::Mesh;
pub use texture::Texture;
pub use uniform_store::{FrameUniformStore, GlobalUniforms};
