//! Vulkan swapchain management
//!
//! Surface policy (format, present mode, image count, extent) is a set of pure
//! functions over the reported surface support, so it can be checked without a
//! device. Creation and recreation share one build path; recreation only adds
//! the retiring swapchain handle.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use super::layout::ImageLayoutTracker;
use crate::render::backends::vulkan::{DeviceContext, VulkanError, VulkanResult};
use crate::render::frame::{AcquireOutcome, PresentOutcome};

/// Fallback size when the surface leaves the extent to the application
pub const DEFAULT_EXTENT: vk::Extent2D = vk::Extent2D {
    width: 800,
    height: 600,
};

/// What the surface reports for a physical device
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    /// Surface capabilities
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query the surface of a device context
    pub fn query(context: &DeviceContext) -> VulkanResult<Self> {
        let physical_device = context.physical_device().device;
        let surface = context.surface();
        Ok(Self {
            capabilities: surface.capabilities(physical_device)?,
            formats: surface.formats(physical_device)?,
            present_modes: surface.present_modes(physical_device)?,
        })
    }
}

/// MAILBOX when available, otherwise FIFO (always supported)
pub fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// B8G8R8A8_SRGB / SRGB_NONLINEAR when available, otherwise the first reported format
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| available.first())
        .copied()
}

/// `min(max(surfaceMin + 1, desired), surfaceMax)`, where a surface max of 0 means unbounded
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, desired: u32) -> u32 {
    let count = (capabilities.min_image_count + 1).max(desired);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// The surface's current extent, or `desired` clamped to the supported range
///
/// `None` when the result has no area, which is what a minimized window reports.
/// No swapchain can be built until the surface grows again.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, desired: vk::Extent2D) -> Option<vk::Extent2D> {
    let extent = if capabilities.current_extent.width == u32::MAX {
        let desired = if desired.width == 0 || desired.height == 0 {
            DEFAULT_EXTENT
        } else {
            desired
        };

        vk::Extent2D {
            width: desired.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    } else {
        capabilities.current_extent
    };

    (extent.width > 0 && extent.height > 0).then_some(extent)
}

/// Every decision needed to build a swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainPlan {
    /// Image format and colour space
    pub format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Minimum image count requested from the driver
    pub image_count: u32,
    /// Image extent
    pub extent: vk::Extent2D,
    /// Surface transform to apply
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainPlan {
    /// Decide the swapchain parameters for the given surface support
    ///
    /// Returns `Ok(None)` while the surface has no area.
    pub fn choose(
        support: &SwapchainSupport,
        desired_extent: vk::Extent2D,
        desired_images: u32,
    ) -> VulkanResult<Option<Self>> {
        let format = choose_surface_format(&support.formats)
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?;

        let Some(extent) = choose_extent(&support.capabilities, desired_extent) else {
            return Ok(None);
        };

        Ok(Some(Self {
            format,
            present_mode: choose_present_mode(&support.present_modes),
            image_count: choose_image_count(&support.capabilities, desired_images),
            extent,
            pre_transform: support.capabilities.current_transform,
        }))
    }
}

/// What a swapchain rebuild against the current surface will do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreatePlan {
    /// Build a replacement from this plan
    Rebuild(SwapchainPlan),
    /// The surface has no area; keep the current swapchain and try again later
    Paused,
}

impl RecreatePlan {
    /// Plan a rebuild of a swapchain built from `current`
    ///
    /// The surface format must not change, since the render pass and
    /// pipelines were built against it.
    pub fn choose(
        current: &SwapchainPlan,
        support: &SwapchainSupport,
        desired_extent: vk::Extent2D,
        desired_images: u32,
    ) -> VulkanResult<Self> {
        let Some(plan) = SwapchainPlan::choose(support, desired_extent, desired_images)? else {
            return Ok(Self::Paused);
        };

        if plan.format != current.format {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "surface format changed from {:?} to {:?}",
                    current.format.format, plan.format.format
                ),
            });
        }
        Ok(Self::Rebuild(plan))
    }
}

/// Swapchain handle with its images and views
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    plan: SwapchainPlan,
}

impl Swapchain {
    /// Build a swapchain from a plan, retiring `old_swapchain` when it is not null
    pub fn build(
        context: &DeviceContext,
        plan: SwapchainPlan,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();
        let swapchain_loader = context.swapchain_loader().clone();
        let physical = context.physical_device();

        let queue_families = [physical.graphics_family, physical.present_family];
        let (sharing_mode, family_indices): (vk::SharingMode, &[u32]) =
            if physical.graphics_family == physical.present_family {
                (vk::SharingMode::EXCLUSIVE, &[])
            } else {
                (vk::SharingMode::CONCURRENT, &queue_families)
            };

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface().handle())
            .min_image_count(plan.image_count)
            .image_format(plan.format.format)
            .image_color_space(plan.format.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(family_indices)
            .pre_transform(plan.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(plan.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::from)?
        };

        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::from(e));
            }
        };

        // Views created so far are owned by the partially built value, so an error cleans them up
        let mut built = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::with_capacity(images.len()),
            image_views: Vec::with_capacity(images.len()),
            plan,
        };

        for &image in &images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(plan.format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe { built.device.create_image_view(&view_info, None).map_err(VulkanError::from)? };
            built.image_views.push(view);
        }
        built.images = images;

        log::info!(
            "Swapchain built: {}x{}, {} images, {:?}, {:?}",
            plan.extent.width,
            plan.extent.height,
            built.images.len(),
            plan.format.format,
            plan.present_mode
        );

        Ok(built)
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get the plan this swapchain was built from
    pub fn plan(&self) -> &SwapchainPlan {
        &self.plan
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.plan.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.plan.format
    }

    /// Get the presentable images
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of images actually created by the driver
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a new framebuffer
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::from)?
        };

        Ok(Self { device, framebuffer })
    }

    /// Get the framebuffer handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Swapchain, its framebuffers and the per-image layout tracker
///
/// Framebuffers are declared first so they drop before the image views they
/// reference.
pub struct SwapchainManager {
    framebuffers: Vec<Framebuffer>,
    swapchain: Swapchain,
    layouts: ImageLayoutTracker,
    desired_extent: vk::Extent2D,
    desired_images: u32,
}

impl SwapchainManager {
    /// Create the swapchain and a framebuffer per image for `render_pass`
    pub fn new(
        context: &DeviceContext,
        render_pass: vk::RenderPass,
        desired_extent: vk::Extent2D,
        desired_images: u32,
    ) -> VulkanResult<Self> {
        let support = SwapchainSupport::query(context)?;
        let plan = SwapchainPlan::choose(&support, desired_extent, desired_images)?.ok_or_else(|| {
            VulkanError::InitializationFailed("Surface has no area, cannot create a swapchain".to_string())
        })?;
        let swapchain = Swapchain::build(context, plan, vk::SwapchainKHR::null())?;
        let framebuffers = Self::create_framebuffers(context.device(), render_pass, &swapchain)?;
        let layouts = ImageLayoutTracker::new(swapchain.image_count());

        Ok(Self {
            framebuffers,
            swapchain,
            layouts,
            desired_extent,
            desired_images,
        })
    }

    /// Choose the surface format a render pass should target before the swapchain exists
    pub fn preferred_format(context: &DeviceContext) -> VulkanResult<vk::SurfaceFormatKHR> {
        let support = SwapchainSupport::query(context)?;
        choose_surface_format(&support.formats)
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))
    }

    fn create_framebuffers(
        device: &Device,
        render_pass: vk::RenderPass,
        swapchain: &Swapchain,
    ) -> VulkanResult<Vec<Framebuffer>> {
        swapchain
            .image_views()
            .iter()
            .map(|&view| Framebuffer::new(device.clone(), render_pass, &[view], swapchain.extent()))
            .collect()
    }

    /// Update the size used when the surface leaves the extent to the application
    pub fn set_desired_extent(&mut self, extent: vk::Extent2D) {
        self.desired_extent = extent;
    }

    /// Rebuild the swapchain, framebuffers and layout tracker
    ///
    /// Returns `false` and leaves everything as it was while the surface has
    /// no area. Otherwise waits for the device to go idle, builds the
    /// replacement and its framebuffers, and only then swaps them in.
    pub fn recreate(&mut self, context: &DeviceContext, render_pass: vk::RenderPass) -> VulkanResult<bool> {
        let support = SwapchainSupport::query(context)?;
        let next = RecreatePlan::choose(self.swapchain.plan(), &support, self.desired_extent, self.desired_images)?;
        let plan = match next {
            RecreatePlan::Rebuild(plan) => plan,
            RecreatePlan::Paused => {
                log::trace!("Surface has no area, keeping the current swapchain");
                return Ok(false);
            }
        };

        context.wait_idle()?;

        let swapchain = Swapchain::build(context, plan, self.swapchain.handle())?;
        let framebuffers = Self::create_framebuffers(context.device(), render_pass, &swapchain)?;

        // Old framebuffers go before the old swapchain whose views they reference
        self.framebuffers = framebuffers;
        self.swapchain = swapchain;
        self.layouts.reset(self.swapchain.image_count());

        Ok(true)
    }

    /// Acquire the next presentable image, signalling `semaphore` when it is ready
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> VulkanResult<AcquireOutcome> {
        let result = unsafe {
            self.swapchain.swapchain_loader.acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Ready {
                image_index: index as usize,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
            Err(e) => Err(VulkanError::from(e)),
        }
    }

    /// Queue `image_index` for presentation once `wait_semaphore` is signaled
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: usize,
        wait_semaphore: vk::Semaphore,
    ) -> VulkanResult<PresentOutcome> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain.handle()];
        let indices = [u32::try_from(image_index).map_err(|_| VulkanError::InvalidOperation {
            reason: format!("image index {} out of range", image_index),
        })?];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);

        match unsafe { self.swapchain.swapchain_loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(VulkanError::from(e)),
        }
    }

    /// The current swapchain
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Framebuffer for an image
    pub fn framebuffer(&self, image_index: usize) -> vk::Framebuffer {
        self.framebuffers[image_index].handle()
    }

    /// Swapchain image handle
    pub fn image(&self, image_index: usize) -> vk::Image {
        self.swapchain.images()[image_index]
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Per-image layout tracker
    pub fn layouts_mut(&mut self) -> &mut ImageLayoutTracker {
        &mut self.layouts
    }

    /// Per-image layout tracker, read only
    pub fn layouts(&self) -> &ImageLayoutTracker {
        &self.layouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    const UNDEFINED_EXTENT: vk::Extent2D = vk::Extent2D {
        width: u32::MAX,
        height: u32::MAX,
    };

    fn support(min: u32, max: u32, current: vk::Extent2D) -> SwapchainSupport {
        SwapchainSupport {
            capabilities: capabilities(min, max, current),
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    #[test]
    fn test_present_mode_prefers_mailbox() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_surface_format_falls_back_to_first() {
        let preferred = support(2, 3, UNDEFINED_EXTENT).formats;
        assert_eq!(choose_surface_format(&preferred).unwrap().format, vk::Format::B8G8R8A8_SRGB);

        let other = [vk::SurfaceFormatKHR {
            format: vk::Format::R16G16B16A16_SFLOAT,
            color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        }];
        assert_eq!(choose_surface_format(&other).unwrap().format, vk::Format::R16G16B16A16_SFLOAT);
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn test_image_count_policy() {
        let extent = UNDEFINED_EXTENT;
        // min + 1 wins over a smaller request
        assert_eq!(choose_image_count(&capabilities(2, 8, extent), 2), 3);
        // a larger request is honoured up to the maximum
        assert_eq!(choose_image_count(&capabilities(2, 8, extent), 5), 5);
        assert_eq!(choose_image_count(&capabilities(2, 4, extent), 6), 4);
        // zero maximum means unbounded
        assert_eq!(choose_image_count(&capabilities(2, 0, extent), 7), 7);
    }

    #[test]
    fn test_extent_uses_current_when_defined() {
        let current = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        let chosen = choose_extent(&capabilities(2, 3, current), vk::Extent2D { width: 10, height: 10 });
        assert_eq!(chosen, Some(current));
    }

    /// A minimized window reports a 0x0 current extent; nothing may be built from it
    #[test]
    fn test_zero_area_surface_has_no_plan() {
        let minimized = vk::Extent2D { width: 0, height: 0 };
        let desired = vk::Extent2D {
            width: 800,
            height: 600,
        };
        assert_eq!(choose_extent(&capabilities(2, 3, minimized), desired), None);
        assert_eq!(SwapchainPlan::choose(&support(2, 3, minimized), desired, 3).unwrap(), None);

        let collapsed = vk::Extent2D { width: 1280, height: 0 };
        assert_eq!(choose_extent(&capabilities(2, 3, collapsed), desired), None);
    }

    /// Rebuilding while minimized pauses; rebuilding after a restore plans the new size
    #[test]
    fn test_recreate_pauses_until_surface_has_area() {
        let current = SwapchainPlan::choose(
            &support(2, 3, vk::Extent2D { width: 640, height: 480 }),
            vk::Extent2D { width: 640, height: 480 },
            3,
        )
        .unwrap()
        .unwrap();

        let minimized = support(2, 3, vk::Extent2D { width: 0, height: 0 });
        assert_eq!(
            RecreatePlan::choose(&current, &minimized, current.extent, 3).unwrap(),
            RecreatePlan::Paused
        );

        let restored_extent = vk::Extent2D {
            width: 1024,
            height: 768,
        };
        let restored = support(2, 3, restored_extent);
        match RecreatePlan::choose(&current, &restored, current.extent, 3).unwrap() {
            RecreatePlan::Rebuild(plan) => assert_eq!(plan.extent, restored_extent),
            RecreatePlan::Paused => panic!("restored surface should rebuild"),
        }
    }

    /// Undefined current extent falls back to the desired size, then 800x600, clamped
    #[test]
    fn test_extent_clamps_desired() {
        let caps = capabilities(2, 3, UNDEFINED_EXTENT);
        assert_eq!(
            choose_extent(&caps, vk::Extent2D { width: 0, height: 0 }),
            Some(DEFAULT_EXTENT)
        );
        assert_eq!(
            choose_extent(&caps, vk::Extent2D { width: 10_000, height: 300 }),
            Some(vk::Extent2D {
                width: 4096,
                height: 300
            })
        );
    }

    /// Planning twice against an unchanged surface gives the same swapchain
    #[test]
    fn test_plan_is_idempotent() {
        let surface = support(2, 3, UNDEFINED_EXTENT);
        let desired = vk::Extent2D {
            width: 1024,
            height: 768,
        };

        let first = SwapchainPlan::choose(&surface, desired, 3).unwrap().unwrap();
        let second = SwapchainPlan::choose(&surface, desired, 3).unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.extent, desired);
        assert_eq!(first.format.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(first.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(first.image_count, 3);
    }

    /// Two rebuilds in a row against an unchanged surface plan the same swapchain
    /// as the one already built, and the layout tracker keeps its size
    #[test]
    fn test_repeated_recreate_is_stable() {
        let surface = support(2, 3, vk::Extent2D { width: 1280, height: 720 });
        let desired = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        let built = SwapchainPlan::choose(&surface, desired, 3).unwrap().unwrap();
        let mut layouts = ImageLayoutTracker::new(built.image_count as usize);

        let mut current = built;
        for _ in 0..2 {
            let RecreatePlan::Rebuild(plan) = RecreatePlan::choose(&current, &surface, desired, 3).unwrap() else {
                panic!("surface with area should rebuild");
            };
            assert_eq!(plan, built);
            layouts.reset(plan.image_count as usize);
            current = plan;
        }

        assert_eq!(current.image_count, 3);
        assert_eq!(current.extent, desired);
        assert_eq!(layouts.len(), 3);
    }

    #[test]
    fn test_recreate_rejects_format_change() {
        let desired = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let built = SwapchainPlan::choose(&support(2, 3, UNDEFINED_EXTENT), desired, 3)
            .unwrap()
            .unwrap();

        let mut changed = support(2, 3, UNDEFINED_EXTENT);
        changed.formats = vec![vk::SurfaceFormatKHR {
            format: vk::Format::R16G16B16A16_SFLOAT,
            color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        }];

        assert!(matches!(
            RecreatePlan::choose(&built, &changed, desired, 3),
            Err(VulkanError::InvalidOperation { .. })
        ));
    }
}
