//! Frame command recording
//!
//! [`record_frame_pass`] writes one frame in a fixed order:
//!
//! 1. barrier `tracked -> COLOR_ATTACHMENT_OPTIMAL`
//! 2. render pass begin, viewport and scissor
//! 3. per drawable: pipeline (when it changes), descriptor sets, buffers, draw
//! 4. render pass end
//! 5. barrier `COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC`
//!
//! Recording targets a [`CommandSink`] and looks assets up through a
//! [`DrawResolver`], so the order can be checked without a device.

use ash::vk;

use crate::render::backends::vulkan::state::{ImageLayoutTracker, ImageTransition};
use crate::render::drawables::{DrawableRegistry, MaterialHandle, MeshHandle};

/// Destination for recorded commands
pub trait CommandSink {
    /// Image memory barrier for a layout transition
    fn pipeline_barrier(&mut self, image: vk::Image, transition: &ImageTransition);

    /// Begin the render pass, clearing the colour attachment
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    );

    /// Full-extent viewport and scissor
    fn set_viewport_and_scissor(&mut self, extent: vk::Extent2D);

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);

    /// Bind descriptor sets starting at set 0
    fn bind_descriptor_sets(&mut self, layout: vk::PipelineLayout, sets: &[vk::DescriptorSet]);

    /// Bind the vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer);

    /// Bind a u32 index buffer
    fn bind_index_buffer(&mut self, buffer: vk::Buffer);

    /// Non-indexed draw
    fn draw(&mut self, vertex_count: u32);

    /// Indexed draw
    fn draw_indexed(&mut self, index_count: u32);

    /// End the render pass
    fn end_render_pass(&mut self);
}

/// What recording needs from a GPU mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDraw {
    /// Vertex buffer
    pub vertex_buffer: vk::Buffer,
    /// Vertex count
    pub vertex_count: u32,
    /// Index buffer and index count, if the mesh is indexed
    pub indices: Option<(vk::Buffer, u32)>,
}

impl MeshDraw {
    /// Bind the mesh buffers and issue its draw
    pub fn record<S: CommandSink + ?Sized>(&self, sink: &mut S) {
        sink.bind_vertex_buffer(self.vertex_buffer);
        match self.indices {
            Some((index_buffer, index_count)) => {
                sink.bind_index_buffer(index_buffer);
                sink.draw_indexed(index_count);
            }
            None => sink.draw(self.vertex_count),
        }
    }
}

/// What recording needs from a material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialDraw {
    /// Pipeline the material renders with
    pub pipeline: vk::Pipeline,
    /// That pipeline's layout
    pub layout: vk::PipelineLayout,
    /// Set 1
    pub material_set: vk::DescriptorSet,
    /// Set 2
    pub texture_set: vk::DescriptorSet,
}

/// Looks up the GPU state behind drawable handles
pub trait DrawResolver {
    /// Mesh behind `handle`, `None` if it was destroyed
    fn mesh(&self, handle: MeshHandle) -> Option<MeshDraw>;

    /// Material behind `handle`, `None` if it was destroyed
    fn material(&self, handle: MaterialHandle) -> Option<MaterialDraw>;
}

/// Per-frame inputs to recording
#[derive(Debug, Clone, Copy)]
pub struct FramePassTarget {
    /// Acquired swapchain image
    pub image: vk::Image,
    /// Its index, used for layout tracking
    pub image_index: usize,
    /// Forward render pass
    pub render_pass: vk::RenderPass,
    /// Framebuffer for the image
    pub framebuffer: vk::Framebuffer,
    /// Swapchain extent
    pub extent: vk::Extent2D,
    /// Clear colour
    pub clear_color: [f32; 4],
    /// Set 0 for this image
    pub global_set: vk::DescriptorSet,
}

/// Record a full frame into `sink`
///
/// # Panics
/// Panics if a drawable refers to a destroyed mesh or material, or if the
/// tracked layout of the image is not one a frame can start from.
pub fn record_frame_pass<S, R>(
    sink: &mut S,
    layouts: &mut ImageLayoutTracker,
    target: &FramePassTarget,
    drawables: &DrawableRegistry,
    resolver: &R,
) where
    S: CommandSink + ?Sized,
    R: DrawResolver + ?Sized,
{
    let begin = layouts.begin_frame(target.image_index);
    sink.pipeline_barrier(target.image, &begin);

    sink.begin_render_pass(target.render_pass, target.framebuffer, target.extent, target.clear_color);
    sink.set_viewport_and_scissor(target.extent);

    let mut bound_pipeline = None;
    drawables.for_each(|id, drawable| {
        let material = resolver
            .material(drawable.material)
            .unwrap_or_else(|| panic!("drawable {:?} refers to a destroyed material", id));
        let mesh = resolver
            .mesh(drawable.mesh)
            .unwrap_or_else(|| panic!("drawable {:?} refers to a destroyed mesh", id));

        if bound_pipeline != Some(material.pipeline) {
            sink.bind_pipeline(material.pipeline);
            bound_pipeline = Some(material.pipeline);
        }
        sink.bind_descriptor_sets(
            material.layout,
            &[target.global_set, material.material_set, material.texture_set],
        );
        mesh.record(&mut *sink);
    });

    sink.end_render_pass();

    let end = layouts.end_frame(target.image_index);
    sink.pipeline_barrier(target.image, &end);
}
