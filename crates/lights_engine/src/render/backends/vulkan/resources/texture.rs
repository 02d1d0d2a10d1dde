//! Sampled RGBA8 textures
//!
//! Pixels are staged in a host-visible buffer and copied into a device-local
//! image with a one-shot command buffer. The image goes
//! UNDEFINED → TRANSFER_DST → SHADER_READ_ONLY during the upload and stays
//! read-only afterwards.

use ash::{vk, Device};
use std::sync::Arc;

use crate::render::backends::vulkan::initialization::{Buffer, Image};
use crate::render::backends::vulkan::rendering::{CommandPool, CommandSink};
use crate::render::backends::vulkan::state::ImageTransition;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Format every texture is uploaded in
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Check that `len` bytes hold exactly `width` x `height` RGBA8 pixels
pub fn validate_rgba8(width: u32, height: u32, len: usize) -> VulkanResult<()> {
    if width == 0 || height == 0 {
        return Err(VulkanError::InvalidOperation {
            reason: format!("texture extent {}x{} has no area", width, height),
        });
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4));
    if expected != Some(len) {
        return Err(VulkanError::InvalidOperation {
            reason: format!(
                "texture {}x{} needs {} bytes of RGBA8, got {}",
                width,
                height,
                expected.map_or_else(|| "too many".to_string(), |n| n.to_string()),
                len
            ),
        });
    }
    Ok(())
}

/// Image, view and sampler for a shader-readable texture
pub struct Texture {
    device: Device,
    sampler: vk::Sampler,
    view: vk::ImageView,
    image: Image,
}

impl Texture {
    /// Upload tightly packed RGBA8 pixels
    pub fn from_rgba8(
        device: &Device,
        allocator: &Arc<vk_mem::Allocator>,
        command_pool: &CommandPool,
        queue: vk::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> VulkanResult<Self> {
        validate_rgba8(width, height, pixels.len())?;

        let extent = vk::Extent2D { width, height };
        let image = Image::new_2d(
            allocator.clone(),
            extent,
            TEXTURE_FORMAT,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        )?;
        let staging = Buffer::with_data(allocator.clone(), pixels, vk::BufferUsageFlags::TRANSFER_SRC)?;

        let to_transfer = transition(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;
        let to_shader = transition(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        command_pool.submit_one_shot(queue, |cmd| {
            cmd.pipeline_barrier(image.handle(), &to_transfer);
            cmd.copy_buffer_to_image(staging.handle(), image.handle(), extent);
            cmd.pipeline_barrier(image.handle(), &to_shader);
        })?;

        let view = Self::create_view(device, image.handle())?;
        let sampler = match Self::create_sampler(device) {
            Ok(sampler) => sampler,
            Err(e) => {
                unsafe { device.destroy_image_view(view, None) };
                return Err(e);
            }
        };

        log::debug!("Uploaded {}x{} texture", width, height);

        Ok(Self {
            device: device.clone(),
            sampler,
            view,
            image,
        })
    }

    /// 1x1 opaque white, bound for materials without a texture
    pub fn default_white(
        device: &Device,
        allocator: &Arc<vk_mem::Allocator>,
        command_pool: &CommandPool,
        queue: vk::Queue,
    ) -> VulkanResult<Self> {
        Self::from_rgba8(device, allocator, command_pool, queue, 1, 1, &[255, 255, 255, 255])
    }

    fn create_view(device: &Device, image: vk::Image) -> VulkanResult<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            device
                .create_image_view(&view_info, None)
                .map_err(|e| VulkanError::InitializationFailed(format!("Failed to create image view: {:?}", e)))
        }
    }

    fn create_sampler(device: &Device) -> VulkanResult<vk::Sampler> {
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(0.0);

        unsafe {
            device
                .create_sampler(&sampler_info, None)
                .map_err(|e| VulkanError::InitializationFailed(format!("Failed to create sampler: {:?}", e)))
        }
    }

    /// Image view for descriptor writes
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Sampler for descriptor writes
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Texture size in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.view, None);
        }
    }
}

fn transition(old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> VulkanResult<ImageTransition> {
    ImageTransition::between(old_layout, new_layout).ok_or_else(|| VulkanError::InvalidOperation {
        reason: format!("no transition from {:?} to {:?}", old_layout, new_layout),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rgba8_accepts_exact_size() {
        assert!(validate_rgba8(1, 1, 4).is_ok());
        assert!(validate_rgba8(8, 4, 128).is_ok());
    }

    /// Short, long and empty pixel buffers are rejected before any GPU work
    #[test]
    fn test_validate_rgba8_rejects_mismatch() {
        assert!(validate_rgba8(2, 2, 15).is_err());
        assert!(validate_rgba8(2, 2, 17).is_err());
        assert!(validate_rgba8(0, 4, 0).is_err());
    }

    #[test]
    fn test_upload_transitions_exist() {
        let to_transfer = transition(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(to_transfer.dst_stage, vk::PipelineStageFlags::TRANSFER);
        let to_shader = transition(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_shader.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }
}
