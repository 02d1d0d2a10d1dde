//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules,
//! tied together by [`VulkanRenderer`].

/// Vulkan initialization types (instance, device, surface, memory)
pub mod initialization;

/// Vulkan resource management (descriptors, uniforms, meshes, textures, materials)
pub mod resources;

/// Vulkan rendering operations (shaders, pipelines, render passes, commands)
pub mod rendering;

/// Vulkan state management (swapchain, layouts, synchronization)
pub mod state;

/// Main Vulkan renderer implementation
pub mod renderer;

// Re-export main renderer
pub use renderer::VulkanRenderer;

// Re-export core initialization types
pub use initialization::context::{DeviceContext, PhysicalDeviceInfo, VulkanError, VulkanResult};
pub use initialization::memory::{Buffer, Image, MappedMemory, MemoryLocation};
pub use initialization::surface::Surface;

// Re-export resource types
pub use resources::{
    DescriptorAllocator, DescriptorLayoutRegistry, FrameUniformStore, GlobalUniforms, LayoutHandles, Material, Mesh,
    Texture,
};

// Re-export rendering types
pub use rendering::command_recorder::{record_frame_pass, CommandSink, DrawResolver};
pub use rendering::commands::{CommandPool, RecordingCommandBuffer};
pub use rendering::render_pass::RenderPass;
pub use rendering::shader::{GraphicsPipeline, ShaderModule};

// Re-export state types
pub use state::swapchain::SwapchainManager;
pub use state::sync::{Fence, FrameSynchronizer, Semaphore};
