//! GLFW-based window for Vulkan rendering

use ash::{vk, Entry, Instance};

use super::PresentationTarget;
use crate::core::config::WindowConfig;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// GLFW window created without a client API, ready for a Vulkan surface
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Initialise GLFW and open a resizable window
    pub fn new(config: &WindowConfig) -> VulkanResult<Self> {
        config.validate().map_err(VulkanError::InitializationFailed)?;

        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| VulkanError::InitializationFailed(format!("GLFW initialization failed: {:?}", e)))?;

        if !glfw.vulkan_supported() {
            return Err(VulkanError::InitializationFailed(
                "GLFW reports no Vulkan loader".to_string(),
            ));
        }

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| VulkanError::InitializationFailed("Window creation failed".to_string()))?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Opened {}x{} window '{}'", config.width, config.height, config.title);

        Ok(Self { glfw, window, events })
    }

    /// Pump the platform event queue
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Events received since the last flush
    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Request or cancel closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Seconds since GLFW was initialised
    pub fn time(&self) -> f64 {
        self.glfw.get_time()
    }
}

impl PresentationTarget for GlfwWindow {
    fn required_instance_extensions(&self) -> VulkanResult<Vec<String>> {
        self.glfw.get_required_instance_extensions().ok_or_else(|| {
            VulkanError::InitializationFailed("GLFW could not report required instance extensions".to_string())
        })
    }

    fn create_surface(&mut self, _entry: &Entry, instance: &Instance) -> VulkanResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance.handle(), std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(VulkanError::InitializationFailed(format!(
                "Failed to create Vulkan surface: {:?}",
                result
            )))
        }
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn should_close(&self) -> bool {
        self.window.should_close()
    }
}
