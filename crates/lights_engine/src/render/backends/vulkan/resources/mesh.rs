//! Device-local mesh buffers

use ash::vk;
use std::sync::Arc;

use crate::render::backends::vulkan::initialization::{Buffer, MemoryLocation};
use crate::render::backends::vulkan::rendering::{CommandPool, MeshDraw};
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::render::primitives::MeshData;

/// Vertex and optional index buffer for a [`MeshData`] uploaded to the GPU
pub struct Mesh {
    vertex_buffer: Buffer,
    vertex_count: u32,
    index_buffer: Option<(Buffer, u32)>,
}

impl Mesh {
    /// Validate `data` and upload it through staging buffers
    pub fn upload(
        allocator: &Arc<vk_mem::Allocator>,
        command_pool: &CommandPool,
        queue: vk::Queue,
        data: &MeshData,
    ) -> VulkanResult<Self> {
        data.validate()
            .map_err(|reason| VulkanError::InvalidOperation { reason })?;

        let vertex_count = count_u32(data.vertices.len())?;
        let vertex_buffer = upload_device_local(
            allocator,
            command_pool,
            queue,
            bytemuck::cast_slice(&data.vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        let index_buffer = if data.is_indexed() {
            let buffer = upload_device_local(
                allocator,
                command_pool,
                queue,
                bytemuck::cast_slice(&data.indices),
                vk::BufferUsageFlags::INDEX_BUFFER,
            )?;
            Some((buffer, count_u32(data.indices.len())?))
        } else {
            None
        };

        log::debug!(
            "Uploaded mesh with {} vertices and {} indices",
            vertex_count,
            data.indices.len()
        );

        Ok(Self {
            vertex_buffer,
            vertex_count,
            index_buffer,
        })
    }

    /// Buffers and counts for recording
    pub fn draw_info(&self) -> MeshDraw {
        MeshDraw {
            vertex_buffer: self.vertex_buffer.handle(),
            vertex_count: self.vertex_count,
            indices: self
                .index_buffer
                .as_ref()
                .map(|(buffer, count)| (buffer.handle(), *count)),
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices, zero for non-indexed meshes
    pub fn index_count(&self) -> u32 {
        self.index_buffer.as_ref().map_or(0, |(_, count)| *count)
    }
}

fn count_u32(len: usize) -> VulkanResult<u32> {
    u32::try_from(len).map_err(|_| VulkanError::InvalidOperation {
        reason: format!("mesh has {} elements, more than a draw can address", len),
    })
}

fn upload_device_local(
    allocator: &Arc<vk_mem::Allocator>,
    command_pool: &CommandPool,
    queue: vk::Queue,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> VulkanResult<Buffer> {
    let staging = Buffer::with_data(allocator.clone(), bytes, vk::BufferUsageFlags::TRANSFER_SRC)?;
    let buffer = Buffer::new(
        allocator.clone(),
        staging.size(),
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        MemoryLocation::GpuOnly,
    )?;

    command_pool.submit_one_shot(queue, |cmd| {
        cmd.copy_buffer(staging.handle(), buffer.handle(), staging.size());
    })?;

    Ok(buffer)
}
