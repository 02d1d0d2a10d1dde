//! Presentation through `raw-window-handle`
//!
//! Wraps any window type from another windowing crate. Surface creation and
//! the extension list come from `ash-window`; size and close state are fed in
//! by the owner, since the raw handles carry neither.

use ash::{vk, Entry, Instance};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::ffi::CStr;

use super::PresentationTarget;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// A raw-handle window plus the state the renderer asks about
pub struct RawWindowTarget<W> {
    window: W,
    framebuffer_size: (u32, u32),
    close_requested: bool,
}

impl<W: HasRawDisplayHandle + HasRawWindowHandle> RawWindowTarget<W> {
    /// Wrap `window`, whose framebuffer is currently `width` x `height`
    pub fn new(window: W, width: u32, height: u32) -> Self {
        Self {
            window,
            framebuffer_size: (width, height),
            close_requested: false,
        }
    }

    /// Record a new framebuffer size from the window's resize event
    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.framebuffer_size = (width, height);
    }

    /// Mark the window as closing
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// The wrapped window
    pub fn window(&self) -> &W {
        &self.window
    }
}

impl<W: HasRawDisplayHandle + HasRawWindowHandle> PresentationTarget for RawWindowTarget<W> {
    fn required_instance_extensions(&self) -> VulkanResult<Vec<String>> {
        let names = ash_window::enumerate_required_extensions(self.window.raw_display_handle())
            .map_err(VulkanError::from)?;

        names
            .iter()
            .map(|&name| {
                unsafe { CStr::from_ptr(name) }
                    .to_str()
                    .map(str::to_owned)
                    .map_err(|e| VulkanError::InitializationFailed(format!("Extension name is not UTF-8: {}", e)))
            })
            .collect()
    }

    fn create_surface(&mut self, entry: &Entry, instance: &Instance) -> VulkanResult<vk::SurfaceKHR> {
        unsafe {
            ash_window::create_surface(
                entry,
                instance,
                self.window.raw_display_handle(),
                self.window.raw_window_handle(),
                None,
            )
        }
        .map_err(|e| VulkanError::InitializationFailed(format!("Failed to create Vulkan surface: {:?}", e)))
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.framebuffer_size
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }
}
