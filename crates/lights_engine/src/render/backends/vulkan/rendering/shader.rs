//! Shader modules and graphics pipeline creation
//!
//! SPIR-V is loaded from disk, checked, and wrapped in RAII modules. The one
//! pipeline shape the renderer needs draws filled triangle lists into the
//! forward pass with back-face culling, dynamic viewport and scissor, and a
//! layout built from the three registry descriptor set layouts.

use ash::{vk, Device};
use std::ffi::CStr;
use std::path::Path;

use super::vertex_layout::VulkanVertexLayout;
use crate::render::backends::vulkan::resources::LayoutHandles;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

const SPIRV_MAGIC: u32 = 0x0723_0203;
const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Decode SPIR-V bytes into words, rejecting truncated or foreign data
pub fn spirv_words(bytes: &[u8]) -> VulkanResult<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(VulkanError::InitializationFailed(format!(
            "SPIR-V length {} is not a non-zero multiple of 4",
            bytes.len()
        )));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(VulkanError::InitializationFailed(format!(
            "Bad SPIR-V magic number {:#010x}",
            words[0]
        )));
    }
    Ok(words)
}

/// SPIR-V shader module wrapper with automatic resource management
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from SPIR-V bytecode
    pub fn from_bytes(device: &Device, bytes: &[u8]) -> VulkanResult<Self> {
        let words = spirv_words(bytes)?;
        log::debug!("[SHADER] Creating shader module from {} words", words.len());

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);

        let module = unsafe {
            device.create_shader_module(&create_info, None).map_err(|e| {
                log::error!("[SHADER] vkCreateShaderModule failed: {:?}", e);
                VulkanError::InitializationFailed(format!("Shader module creation failed: {:?}", e))
            })?
        };

        Ok(Self {
            device: device.clone(),
            module,
        })
    }

    /// Load shader from SPIR-V file
    pub fn from_file<P: AsRef<Path>>(device: &Device, path: P) -> VulkanResult<Self> {
        let path = path.as_ref();
        log::debug!("[SHADER] Loading shader from: {:?}", path);

        let bytes = std::fs::read(path).map_err(|e| {
            log::error!("[SHADER] Failed to read shader file {:?}: {}", path, e);
            VulkanError::InitializationFailed(format!("Failed to read shader file {}: {}", path.display(), e))
        })?;

        Self::from_bytes(device, &bytes)
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Stage info with the `main` entry point
    pub fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Graphics pipeline and its layout, destroyed together
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build the forward pipeline from a vertex and fragment shader
    pub fn new(
        device: &Device,
        render_pass: vk::RenderPass,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        layouts: &LayoutHandles,
    ) -> VulkanResult<Self> {
        let shader_stages = [
            vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
            fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];

        let bindings = [VulkanVertexLayout::binding_description()];
        let attributes = VulkanVertexLayout::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Counts only; both are set per frame
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        // The Y flip in the projection mirrors winding, so CCW geometry arrives clockwise
        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();

        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let set_layouts = layouts.in_set_order();
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::from)? };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let created =
            unsafe { device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None) };

        let pipeline = match created {
            Ok(pipelines) => pipelines.first().copied(),
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                log::error!("[PIPELINE] Pipeline creation failed: {:?}", err);
                return Err(VulkanError::from(err));
            }
        };

        let Some(pipeline) = pipeline else {
            unsafe { device.destroy_pipeline_layout(layout, None) };
            return Err(VulkanError::InitializationFailed(
                "Driver returned no graphics pipeline".to_string(),
            ));
        };

        log::debug!("[PIPELINE] Created graphics pipeline {:?}", pipeline);

        Ok(Self {
            device: device.clone(),
            pipeline,
            layout,
        })
    }

    /// Load both shaders from disk and build the pipeline
    pub fn from_files(
        device: &Device,
        render_pass: vk::RenderPass,
        vertex_path: &str,
        fragment_path: &str,
        layouts: &LayoutHandles,
    ) -> VulkanResult<Self> {
        let vertex_shader = ShaderModule::from_file(device, vertex_path)?;
        let fragment_shader = ShaderModule::from_file(device, fragment_path)?;
        Self::new(device, render_pass, &vertex_shader, &fragment_shader, layouts)
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        log::debug!("[PIPELINE] Dropping GraphicsPipeline {:?}", self.pipeline);
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_spirv_words_accepts_valid_header() {
        let words = spirv_words(&module_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0])).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    /// A file whose length is not word aligned is an init failure
    #[test]
    fn test_spirv_words_rejects_misaligned() {
        let mut bytes = module_bytes(&[SPIRV_MAGIC, 0]);
        bytes.pop();
        assert!(matches!(spirv_words(&bytes), Err(VulkanError::InitializationFailed(_))));
        assert!(spirv_words(&[]).is_err());
    }

    #[test]
    fn test_spirv_words_rejects_wrong_magic() {
        let result = spirv_words(&module_bytes(&[0xdead_beef, 0]));
        assert!(matches!(result, Err(VulkanError::InitializationFailed(msg)) if msg.contains("magic")));
    }
}
