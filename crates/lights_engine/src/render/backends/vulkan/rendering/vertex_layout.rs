//! Vulkan vertex input state for [`Vertex`]
//!
//! Kept next to the pipeline so the mesh types stay backend-agnostic.

use ash::vk;
use std::mem::{offset_of, size_of};

use crate::render::primitives::Vertex;

/// Vertex input description for the engine's `Vertex` type
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// Binding 0, advancing per vertex
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, colour, normal, uv at locations 0 to 3
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location: u32, format: vk::Format, offset: usize| vk::VertexInputAttributeDescription {
            binding: 0,
            location,
            format,
            offset: offset as u32,
        };

        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, colour)),
            attribute(2, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
            attribute(3, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
        ]
    }
}
