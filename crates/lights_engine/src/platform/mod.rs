//! Presentation targets
//!
//! The renderer never talks to a windowing library directly. Anything that
//! can name its required instance extensions, create a surface and report its
//! framebuffer size can be rendered to.

use ash::{vk, Entry, Instance};

use crate::render::backends::vulkan::VulkanResult;

/// GLFW window target
pub mod glfw_window;

/// Adapter for any window exposing raw handles
pub mod raw_window;

pub use glfw_window::GlfwWindow;
pub use raw_window::RawWindowTarget;

/// A window or view the renderer can present to
pub trait PresentationTarget {
    /// Instance extensions the surface needs, e.g. `VK_KHR_surface`
    fn required_instance_extensions(&self) -> VulkanResult<Vec<String>>;

    /// Create a surface on `instance`; the caller owns and destroys it
    fn create_surface(&mut self, entry: &Entry, instance: &Instance) -> VulkanResult<vk::SurfaceKHR>;

    /// Framebuffer size in pixels, `(0, 0)` while minimized
    fn framebuffer_size(&self) -> (u32, u32);

    /// Whether the user asked to close the target
    fn should_close(&self) -> bool;
}
