//! Per-image global uniforms
//!
//! One persistently mapped uniform buffer per swapchain image, rewritten with
//! the camera matrices every frame. The store is sized by the swapchain and is
//! rebuilt with it.
//!
//! This is the only place the projection is converted to Vulkan's Y-down clip
//! space: `projection[(1, 1)]` is negated on write.

use ash::vk;
use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::render::backends::vulkan::initialization::{Buffer, MappedMemory};
use crate::render::backends::vulkan::VulkanResult;

/// Contents of the set 0 uniform buffer
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalUniforms {
    /// Model matrix, column-major
    pub model: [[f32; 4]; 4],
    /// View matrix, column-major
    pub view: [[f32; 4]; 4],
    /// Projection matrix in Vulkan clip space, column-major
    pub projection: [[f32; 4]; 4],
}

// Three tightly packed mat4s, no padding
unsafe impl bytemuck::Pod for GlobalUniforms {}
unsafe impl bytemuck::Zeroable for GlobalUniforms {}

impl GlobalUniforms {
    /// Size of the uniform block in bytes
    pub const SIZE: vk::DeviceSize = std::mem::size_of::<Self>() as vk::DeviceSize;

    /// Identity model, given view, projection flipped into Vulkan clip space
    pub fn new(view: &Mat4, projection: &Mat4) -> Self {
        let mut clip = *projection;
        clip[(1, 1)] = -clip[(1, 1)];
        Self {
            model: Mat4::identity().into(),
            view: (*view).into(),
            projection: clip.into(),
        }
    }
}

/// One mapped uniform region per swapchain image
pub struct FrameUniformStore<M: MappedMemory> {
    regions: Vec<M>,
}

impl<M: MappedMemory> FrameUniformStore<M> {
    /// Wrap already mapped regions, one per swapchain image
    pub fn new(regions: Vec<M>) -> Self {
        for region in &regions {
            assert!(
                region.bytes().len() >= std::mem::size_of::<GlobalUniforms>(),
                "uniform region smaller than GlobalUniforms"
            );
        }
        Self { regions }
    }

    /// Write the uniforms read by `image_index`; the last write wins
    pub fn update(&mut self, image_index: usize, view: &Mat4, projection: &Mat4) {
        let uniforms = GlobalUniforms::new(view, projection);
        self.regions[image_index].write_at(0, bytemuck::bytes_of(&uniforms));
    }

    /// Read back what `image_index` currently holds
    pub fn read(&self, image_index: usize) -> GlobalUniforms {
        let bytes = &self.regions[image_index].bytes()[..std::mem::size_of::<GlobalUniforms>()];
        bytemuck::pod_read_unaligned(bytes)
    }

    /// Region backing `image_index`
    pub fn region(&self, image_index: usize) -> &M {
        &self.regions[image_index]
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the store holds no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Swap in regions for a rebuilt swapchain, returning the old ones
    pub fn replace(&mut self, regions: Vec<M>) -> Vec<M> {
        std::mem::replace(&mut self.regions, regions)
    }
}

impl FrameUniformStore<Buffer> {
    /// Allocate one host-visible uniform buffer per swapchain image
    pub fn allocate(allocator: &Arc<vk_mem::Allocator>, image_count: usize) -> VulkanResult<Self> {
        Ok(Self::new(Self::allocate_buffers(allocator, image_count)?))
    }

    /// Buffers for `image_count` images, identity-initialised
    pub fn allocate_buffers(allocator: &Arc<vk_mem::Allocator>, image_count: usize) -> VulkanResult<Vec<Buffer>> {
        let initial = GlobalUniforms::new(&Mat4::identity(), &Mat4::identity());
        (0..image_count)
            .map(|_| {
                Buffer::with_data(
                    Arc::clone(allocator),
                    bytemuck::bytes_of(&initial),
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                )
            })
            .collect()
    }

    /// Buffer handle for `image_index`
    pub fn buffer_handle(&self, image_index: usize) -> vk::Buffer {
        self.regions[image_index].handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn host_store(images: usize) -> FrameUniformStore<Vec<u8>> {
        FrameUniformStore::new(vec![vec![0u8; std::mem::size_of::<GlobalUniforms>()]; images])
    }

    #[test]
    fn test_layout_is_three_mat4s() {
        assert_eq!(std::mem::size_of::<GlobalUniforms>(), 192);
        assert_eq!(std::mem::align_of::<GlobalUniforms>(), 16);
    }

    /// Two writes to image 0: the second is what is read back
    #[test]
    fn test_last_write_wins() {
        let mut store = host_store(3);
        let first = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let second = Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0));

        store.update(0, &first, &Mat4::identity());
        store.update(0, &second, &Mat4::identity());

        let read = store.read(0);
        assert_eq!(read.view, <[[f32; 4]; 4]>::from(second));
        assert_eq!(store.read(1).view, [[0.0; 4]; 4]);
    }

    /// Only the Y scale of the projection changes sign
    #[test]
    fn test_projection_flip() {
        let mut store = host_store(1);
        let projection = Mat4::new_perspective(1.5, 1.0, 0.1, 10.0);
        store.update(0, &Mat4::identity(), &projection);

        let written = Mat4::from(store.read(0).projection);
        assert_relative_eq!(written[(1, 1)], -projection[(1, 1)]);
        assert_relative_eq!(written[(0, 0)], projection[(0, 0)]);
        assert_relative_eq!(written[(2, 3)], projection[(2, 3)]);
        assert_eq!(store.read(0).model, <[[f32; 4]; 4]>::from(Mat4::identity()));
    }

    #[test]
    fn test_replace_resizes() {
        let mut store = host_store(2);
        let old = store.replace(vec![vec![0u8; 192]; 4]);
        assert_eq!(old.len(), 2);
        assert_eq!(store.len(), 4);
    }

    #[test]
    #[should_panic(expected = "smaller than")]
    fn test_undersized_region_rejected() {
        FrameUniformStore::new(vec![vec![0u8; 64]]);
    }
}
