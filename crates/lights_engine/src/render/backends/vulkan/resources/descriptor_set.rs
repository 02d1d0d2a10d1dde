//! Descriptor set layouts and writes
//!
//! The three layouts every pipeline is built against live in
//! [`DescriptorLayoutRegistry`], owned by the renderer next to the device
//! context:
//!
//! | set | binding | contents               | stages            |
//! |-----|---------|------------------------|-------------------|
//! | 0   | 0       | global uniforms (MVP)  | vertex, fragment  |
//! | 1   | 0       | material uniforms      | fragment          |
//! | 2   | 0       | combined image sampler | fragment          |

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Descriptor set layout builder for creating reusable layouts
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add_binding(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add_binding(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    fn add_binding(mut self, binding: u32, ty: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(ty)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }.map_err(VulkanError::from)?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
            bindings: self.bindings,
        })
    }
}

impl Default for DescriptorSetLayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Get the bindings used in this layout
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Raw layout handles, cheap to copy into pipelines and materials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutHandles {
    /// Set 0: global uniforms
    pub global: vk::DescriptorSetLayout,
    /// Set 1: material uniforms
    pub material: vk::DescriptorSetLayout,
    /// Set 2: texture sampler
    pub texture: vk::DescriptorSetLayout,
}

impl LayoutHandles {
    /// Layouts in set order, as a pipeline layout expects them
    pub fn in_set_order(&self) -> [vk::DescriptorSetLayout; 3] {
        [self.global, self.material, self.texture]
    }
}

/// The descriptor set layouts shared by every pipeline
pub struct DescriptorLayoutRegistry {
    global: DescriptorSetLayout,
    material: DescriptorSetLayout,
    texture: DescriptorSetLayout,
}

impl DescriptorLayoutRegistry {
    /// Create the three standard layouts
    pub fn new(device: &Device) -> VulkanResult<Self> {
        let global = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;

        let material = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;

        let texture = DescriptorSetLayoutBuilder::new()
            .add_combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
            .build(device)?;

        log::debug!("Created global, material and texture descriptor set layouts");

        Ok(Self {
            global,
            material,
            texture,
        })
    }

    /// Handles of all three layouts
    pub fn handles(&self) -> LayoutHandles {
        LayoutHandles {
            global: self.global.handle(),
            material: self.material.handle(),
            texture: self.texture.handle(),
        }
    }
}

enum PendingWrite {
    Buffer {
        set: vk::DescriptorSet,
        binding: u32,
        info: vk::DescriptorBufferInfo,
    },
    Image {
        set: vk::DescriptorSet,
        binding: u32,
        info: vk::DescriptorImageInfo,
    },
}

/// Batches descriptor writes and submits them in one update
///
/// Buffer and image infos stay owned by the writer until [`update`](Self::update),
/// so the pointers inside each `vk::WriteDescriptorSet` are valid when Vulkan reads them.
#[derive(Default)]
pub struct DescriptorSetWriter {
    pending: Vec<PendingWrite>,
}

impl DescriptorSetWriter {
    /// Create a new descriptor set writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a uniform buffer range to a descriptor set
    pub fn write_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Self {
        self.pending.push(PendingWrite::Buffer {
            set,
            binding,
            info: vk::DescriptorBufferInfo { buffer, offset, range },
        });
        self
    }

    /// Write an image sampler to a descriptor set
    pub fn write_image(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) -> Self {
        self.pending.push(PendingWrite::Image {
            set,
            binding,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: layout,
            },
        });
        self
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Execute all write operations
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .pending
            .iter()
            .map(|write| match write {
                PendingWrite::Buffer { set, binding, info } => vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(std::slice::from_ref(info))
                    .build(),
                PendingWrite::Image { set, binding, info } => vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(std::slice::from_ref(info))
                    .build(),
            })
            .collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_queues_in_order() {
        let writer = DescriptorSetWriter::new()
            .write_buffer(vk::DescriptorSet::null(), 0, vk::Buffer::null(), 0, 192)
            .write_image(
                vk::DescriptorSet::null(),
                0,
                vk::ImageView::null(),
                vk::Sampler::null(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );

        assert_eq!(writer.len(), 2);
        assert!(matches!(writer.pending[0], PendingWrite::Buffer { info, .. } if info.range == 192));
        assert!(matches!(writer.pending[1], PendingWrite::Image { .. }));
    }

    #[test]
    fn test_layout_handles_set_order() {
        use ash::vk::Handle;
        let handles = LayoutHandles {
            global: vk::DescriptorSetLayout::from_raw(1),
            material: vk::DescriptorSetLayout::from_raw(2),
            texture: vk::DescriptorSetLayout::from_raw(3),
        };
        let raw: Vec<u64> = handles.in_set_order().iter().map(|h| h.as_raw()).collect();
        assert_eq!(raw, vec![1, 2, 3]);
    }
}
