//! GPU memory through vk-mem
//!
//! Buffers and images are allocated from the shared [`vk_mem::Allocator`] held
//! by the device context. Host-visible buffers are mapped once at creation and
//! stay mapped until they are dropped.

use ash::vk;
use std::sync::Arc;
use vk_mem::Alloc;

use super::context::{VulkanError, VulkanResult};

/// A byte region the CPU can write directly
///
/// Implemented by persistently mapped GPU buffers and by plain host memory.
pub trait MappedMemory {
    /// The mapped bytes
    fn bytes(&self) -> &[u8];

    /// The mapped bytes, writable
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Copy `data` into the region at `offset`
    ///
    /// # Panics
    /// Panics if the write would run past the end of the region.
    fn write_at(&mut self, offset: usize, data: &[u8]) {
        let region = self.bytes_mut();
        assert!(
            offset + data.len() <= region.len(),
            "write of {} bytes at offset {} overflows a {} byte region",
            data.len(),
            offset,
            region.len()
        );
        region[offset..offset + data.len()].copy_from_slice(data);
    }
}

impl MappedMemory for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self.as_slice()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

/// Where a buffer's memory should live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLocation {
    /// Device local, filled through a staging copy
    GpuOnly,
    /// Host visible and coherent, persistently mapped
    CpuToGpu,
}

/// Buffer allocated through vk-mem with RAII cleanup
pub struct Buffer {
    allocator: Arc<vk_mem::Allocator>,
    buffer: vk::Buffer,
    allocation: vk_mem::Allocation,
    size: vk::DeviceSize,
    mapped: Option<*mut u8>,
}

impl Buffer {
    /// Create a new buffer
    pub fn new(
        allocator: Arc<vk_mem::Allocator>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> VulkanResult<Self> {
        if size == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot create a zero-sized buffer".to_string(),
            });
        }

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let allocation_info = match location {
            MemoryLocation::GpuOnly => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferDevice,
                ..Default::default()
            },
            MemoryLocation::CpuToGpu => vk_mem::AllocationCreateInfo {
                usage: vk_mem::MemoryUsage::AutoPreferHost,
                flags: vk_mem::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE,
                required_flags: vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                ..Default::default()
            },
        };

        let (buffer, mut allocation) = unsafe { allocator.create_buffer(&buffer_info, &allocation_info) }
            .map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                    VulkanError::OutOfMemory {
                        requested: usize::try_from(size).unwrap_or(usize::MAX),
                    }
                }
                other => VulkanError::Allocation(format!("Buffer allocation failed: {:?}", other)),
            })?;

        let mapped = match location {
            MemoryLocation::GpuOnly => None,
            MemoryLocation::CpuToGpu => match unsafe { allocator.map_memory(&mut allocation) } {
                Ok(ptr) => Some(ptr),
                Err(e) => {
                    unsafe { allocator.destroy_buffer(buffer, &mut allocation) };
                    return Err(VulkanError::Allocation(format!("Failed to map buffer: {:?}", e)));
                }
            },
        };

        Ok(Self {
            allocator,
            buffer,
            allocation,
            size,
            mapped,
        })
    }

    /// Create a host-visible buffer already holding `data`
    pub fn with_data(
        allocator: Arc<vk_mem::Allocator>,
        data: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let mut buffer = Self::new(allocator, data.len() as vk::DeviceSize, usage, MemoryLocation::CpuToGpu)?;
        buffer.write_at(0, data);
        Ok(buffer)
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Whether the buffer is persistently mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    fn mapped_len(&self) -> usize {
        usize::try_from(self.size).unwrap_or(usize::MAX)
    }
}

impl MappedMemory for Buffer {
    fn bytes(&self) -> &[u8] {
        match self.mapped {
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr, self.mapped_len()) },
            None => &[],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self.mapped {
            Some(ptr) => unsafe { std::slice::from_raw_parts_mut(ptr, self.mapped_len()) },
            None => &mut [],
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.allocator.unmap_memory(&mut self.allocation);
            }
            self.allocator.destroy_buffer(self.buffer, &mut self.allocation);
        }
    }
}

/// 2D image allocated through vk-mem with RAII cleanup
pub struct Image {
    allocator: Arc<vk_mem::Allocator>,
    image: vk::Image,
    allocation: vk_mem::Allocation,
    extent: vk::Extent2D,
    format: vk::Format,
}

impl Image {
    /// Create a device-local, single-mip 2D image
    pub fn new_2d(
        allocator: Arc<vk_mem::Allocator>,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> VulkanResult<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let allocation_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        };

        let (image, allocation) = unsafe { allocator.create_image(&image_info, &allocation_info) }
            .map_err(|e| VulkanError::Allocation(format!("Image allocation failed: {:?}", e)))?;

        Ok(Self {
            allocator,
            image,
            allocation,
            extent,
            format,
        })
    }

    /// Get image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Get the image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get the image format
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.allocator.destroy_image(self.image, &mut self.allocation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_memory_write_at() {
        let mut memory = vec![0u8; 8];
        memory.write_at(2, &[1, 2, 3]);
        assert_eq!(memory.bytes(), &[0, 0, 1, 2, 3, 0, 0, 0]);
    }

    /// Writes past the end of the region are a programming error
    #[test]
    #[should_panic(expected = "overflows")]
    fn test_host_memory_overflow_panics() {
        let mut memory = vec![0u8; 4];
        memory.write_at(2, &[1, 2, 3]);
    }
}
