//! Command pools and command buffer recording
//!
//! [`RecordingCommandBuffer`] is the device-backed [`CommandSink`]; the same
//! recording code drives it and the test sinks.

use ash::{vk, Device};

use super::command_recorder::CommandSink;
use crate::render::backends::vulkan::state::{Fence, FrameFence, ImageTransition};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Upper bound on a one-shot upload before the device is considered lost
const ONE_SHOT_TIMEOUT_NS: u64 = 5_000_000_000;

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::from)?
        };

        Ok(Self { device, command_pool })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&alloc_info).map_err(VulkanError::from) }
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Record with `record`, submit to `queue` and wait for completion
    ///
    /// Used for staging uploads; the command buffer is freed afterwards.
    pub fn submit_one_shot<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut RecordingCommandBuffer),
    {
        let buffers = self.allocate_command_buffers(1)?;
        let result = self.run_one_shot(buffers[0], queue, record);

        unsafe {
            self.device.free_command_buffers(self.command_pool, &buffers);
        }
        result
    }

    fn run_one_shot<F>(&self, command_buffer: vk::CommandBuffer, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut RecordingCommandBuffer),
    {
        let mut recording = RecordingCommandBuffer::begin(
            self.device.clone(),
            command_buffer,
            vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        )?;
        record(&mut recording);
        let command_buffer = recording.finish()?;

        let fence = Fence::new(self.device.clone(), false)?;
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();

        unsafe {
            self.device
                .queue_submit(queue, &[submit_info], fence.handle())
                .map_err(VulkanError::from)?;
        }
        fence.wait(ONE_SHOT_TIMEOUT_NS).map_err(|e| match e {
            VulkanError::Api(vk::Result::TIMEOUT) => VulkanError::DeviceLost,
            other => other,
        })
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// A command buffer in the recording state
pub struct RecordingCommandBuffer {
    device: Device,
    command_buffer: vk::CommandBuffer,
}

impl RecordingCommandBuffer {
    /// Reset `command_buffer` and begin recording into it
    pub fn begin(
        device: Device,
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VulkanResult<Self> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(flags);

        unsafe {
            device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::from)?;
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::from)?;
        }

        Ok(Self { device, command_buffer })
    }

    /// End recording and hand back the command buffer
    pub fn finish(self) -> VulkanResult<vk::CommandBuffer> {
        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::from)?;
        }
        Ok(self.command_buffer)
    }

    /// Copy a whole buffer region
    pub fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.device.cmd_copy_buffer(self.command_buffer, src, dst, &[region]);
        }
    }

    /// Copy tightly packed pixels into mip 0 of an image in TRANSFER_DST layout
    pub fn copy_buffer_to_image(&mut self, src: vk::Buffer, image: vk::Image, extent: vk::Extent2D) {
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .build();

        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                src,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }
}

impl CommandSink for RecordingCommandBuffer {
    fn pipeline_barrier(&mut self, image: vk::Image, transition: &ImageTransition) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                transition.src_stage,
                transition.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[transition.barrier(image)],
            );
        }
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    ) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear_color },
        }];
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    fn set_viewport_and_scissor(&mut self, extent: vk::Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        unsafe {
            self.device.cmd_set_viewport(self.command_buffer, 0, &[viewport]);
            self.device.cmd_set_scissor(self.command_buffer, 0, &[scissor]);
        }
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    fn bind_descriptor_sets(&mut self, layout: vk::PipelineLayout, sets: &[vk::DescriptorSet]) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                sets,
                &[],
            );
        }
    }

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer], &[0]);
        }
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.command_buffer, buffer, 0, vk::IndexType::UINT32);
        }
    }

    fn draw(&mut self, vertex_count: u32) {
        unsafe {
            self.device.cmd_draw(self.command_buffer, vertex_count, 1, 0, 0);
        }
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.device.cmd_draw_indexed(self.command_buffer, index_count, 1, 0, 0, 0);
        }
    }

    fn end_render_pass(&mut self) {
        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }
    }
}
