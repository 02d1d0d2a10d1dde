//! Materials: a pipeline, a base colour uniform and a texture
//!
//! Descriptor sets come from the pooled allocator and are invalidated when
//! the pools are reset, so a material can rebuild them on demand with
//! [`Material::allocate_sets`].

use ash::{vk, Device};
use std::sync::Arc;

use super::descriptor_allocator::DescriptorAllocator;
use super::descriptor_set::{DescriptorSetWriter, LayoutHandles};
use super::texture::Texture;
use crate::render::backends::vulkan::initialization::{Buffer, MappedMemory, MemoryLocation};
use crate::render::backends::vulkan::VulkanResult;
use crate::render::drawables::{PipelineHandle, TextureHandle};

/// Material uniform block, set 1 binding 0
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialUniforms {
    /// Linear RGBA multiplied with the texture sample
    pub base_colour: [f32; 4],
}

unsafe impl bytemuck::Pod for MaterialUniforms {}
unsafe impl bytemuck::Zeroable for MaterialUniforms {}

impl MaterialUniforms {
    /// Size of the block in bytes
    pub const SIZE: vk::DeviceSize = std::mem::size_of::<Self>() as vk::DeviceSize;
}

/// A pipeline plus the per-material descriptor state it draws with
pub struct Material {
    pipeline: PipelineHandle,
    texture: Option<TextureHandle>,
    uniforms: MaterialUniforms,
    uniform_buffer: Buffer,
    material_set: vk::DescriptorSet,
    texture_set: vk::DescriptorSet,
}

impl Material {
    /// Create the uniform buffer; sets are allocated separately
    pub fn new(
        allocator: &Arc<vk_mem::Allocator>,
        pipeline: PipelineHandle,
        texture: Option<TextureHandle>,
        base_colour: [f32; 4],
    ) -> VulkanResult<Self> {
        let mut uniform_buffer = Buffer::new(
            allocator.clone(),
            MaterialUniforms::SIZE,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryLocation::CpuToGpu,
        )?;
        let uniforms = MaterialUniforms { base_colour };
        uniform_buffer.write_at(0, bytemuck::bytes_of(&uniforms));

        Ok(Self {
            pipeline,
            texture,
            uniforms,
            uniform_buffer,
            material_set: vk::DescriptorSet::null(),
            texture_set: vk::DescriptorSet::null(),
        })
    }

    /// Allocate and write the material and texture sets
    ///
    /// `texture` is the resolved texture for this material, or the default
    /// white texture when it has none.
    pub fn allocate_sets(
        &mut self,
        device: &Device,
        descriptors: &mut DescriptorAllocator,
        layouts: &LayoutHandles,
        texture: &Texture,
    ) -> VulkanResult<()> {
        let material_set = descriptors.allocate(layouts.material)?;
        let texture_set = descriptors.allocate(layouts.texture)?;

        DescriptorSetWriter::new()
            .write_buffer(
                material_set,
                0,
                self.uniform_buffer.handle(),
                0,
                MaterialUniforms::SIZE,
            )
            .write_image(
                texture_set,
                0,
                texture.view(),
                texture.sampler(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
            .update(device);

        self.material_set = material_set;
        self.texture_set = texture_set;
        Ok(())
    }

    /// Current base colour
    pub fn base_colour(&self) -> [f32; 4] {
        self.uniforms.base_colour
    }

    /// Pipeline the material draws with
    pub fn pipeline(&self) -> PipelineHandle {
        self.pipeline
    }

    /// Texture bound at set 2, `None` for the default texture
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Set 1
    pub fn material_set(&self) -> vk::DescriptorSet {
        self.material_set
    }

    /// Set 2
    pub fn texture_set(&self) -> vk::DescriptorSet {
        self.texture_set
    }
}
