//! Vulkan renderer facade
//!
//! Owns the device context and everything built on it, hands out handles to
//! meshes, textures, pipelines and materials, and drives frames through
//! [`FrameLoop`]. Fields are declared in reverse dependency order so they drop
//! assets first and the device context last.

use ash::vk;
use slotmap::{Key, SlotMap};

use super::initialization::{Buffer, DeviceContext};
use super::rendering::{
    record_frame_pass, CommandPool, DrawResolver, FramePassTarget, GraphicsPipeline, MaterialDraw, MeshDraw,
    RecordingCommandBuffer, RenderPass,
};
use super::resources::{
    DescriptorAllocator, DescriptorLayoutRegistry, DescriptorSetWriter, FrameUniformStore, GlobalUniforms,
    LayoutHandles, Material, Mesh, Texture,
};
use super::state::{Fence, FrameSlot, Semaphore, SwapchainManager};
use super::{VulkanError, VulkanResult};
use crate::core::config::{ShaderConfig, VulkanRendererConfig};
use crate::platform::PresentationTarget;
use crate::render::camera::{Camera, CameraMatrices};
use crate::render::drawables::{
    DrawableId, DrawableRegistry, MaterialHandle, MeshHandle, PipelineHandle, TextureHandle,
};
use crate::render::frame::{AcquireOutcome, FrameBackend, FrameLoop, FrameOutcome, FrameStats, PresentOutcome};
use crate::render::primitives::MeshData;

/// How long shutdown and asset destruction wait for in-flight frames
const FRAME_WAIT_TIMEOUT_NS: u64 = 5_000_000_000;

fn not_found<K: Key>(key: K) -> VulkanError {
    VulkanError::ResourceNotFound {
        id: key.data().as_ffi(),
    }
}

/// GPU assets addressed by handle
struct GpuAssets {
    materials: SlotMap<MaterialHandle, Material>,
    meshes: SlotMap<MeshHandle, Mesh>,
    pipelines: SlotMap<PipelineHandle, GraphicsPipeline>,
    textures: SlotMap<TextureHandle, Texture>,
    default_texture: Texture,
}

impl GpuAssets {
    fn new(default_texture: Texture) -> Self {
        Self {
            materials: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            default_texture,
        }
    }

    fn texture_or_default(&self, handle: Option<TextureHandle>) -> &Texture {
        handle
            .and_then(|handle| self.textures.get(handle))
            .unwrap_or(&self.default_texture)
    }

    /// Reallocate every material's sets after the descriptor pools were reset
    fn rebuild_material_sets(
        &mut self,
        device: &ash::Device,
        descriptors: &mut DescriptorAllocator,
        layouts: &LayoutHandles,
    ) -> VulkanResult<()> {
        let Self {
            materials,
            textures,
            default_texture,
            ..
        } = self;

        for material in materials.values_mut() {
            let texture = material
                .texture()
                .and_then(|handle| textures.get(handle))
                .unwrap_or(default_texture);
            material.allocate_sets(device, descriptors, layouts, texture)?;
        }
        Ok(())
    }
}

impl DrawResolver for GpuAssets {
    fn mesh(&self, handle: MeshHandle) -> Option<MeshDraw> {
        self.meshes.get(handle).map(Mesh::draw_info)
    }

    fn material(&self, handle: MaterialHandle) -> Option<MaterialDraw> {
        let material = self.materials.get(handle)?;
        let pipeline = self.pipelines.get(material.pipeline())?;
        Some(MaterialDraw {
            pipeline: pipeline.handle(),
            layout: pipeline.layout(),
            material_set: material.material_set(),
            texture_set: material.texture_set(),
        })
    }
}

/// Per-image uniforms and global sets, descriptor pools and per-slot command buffers
struct FrameResources {
    uniforms: FrameUniformStore<Buffer>,
    global_sets: Vec<vk::DescriptorSet>,
    descriptors: DescriptorAllocator,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
}

impl FrameResources {
    fn new(
        context: &DeviceContext,
        layouts: &LayoutHandles,
        image_count: usize,
        slot_count: usize,
        sets_per_pool: u32,
    ) -> VulkanResult<Self> {
        let command_pool = CommandPool::new(context.device().clone(), context.graphics_queue_family())?;
        let command_buffers = command_pool.allocate_command_buffers(slot_count as u32)?;

        let mut descriptors = DescriptorAllocator::init(context.device().clone(), image_count, sets_per_pool)?;
        let uniforms = FrameUniformStore::<Buffer>::allocate(context.allocator(), image_count)?;
        let global_sets = Self::write_global_sets(context.device(), &mut descriptors, layouts, &uniforms)?;

        Ok(Self {
            uniforms,
            global_sets,
            descriptors,
            command_buffers,
            command_pool,
        })
    }

    fn write_global_sets(
        device: &ash::Device,
        descriptors: &mut DescriptorAllocator,
        layouts: &LayoutHandles,
        uniforms: &FrameUniformStore<Buffer>,
    ) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let mut writer = DescriptorSetWriter::new();
        let mut sets = Vec::with_capacity(uniforms.len());

        for image_index in 0..uniforms.len() {
            let set = descriptors.allocate(layouts.global)?;
            writer = writer.write_buffer(set, 0, uniforms.buffer_handle(image_index), 0, GlobalUniforms::SIZE);
            sets.push(set);
        }

        writer.update(device);
        Ok(sets)
    }

    /// Resize the per-image state for a rebuilt swapchain
    ///
    /// Resets every descriptor pool, so material sets must be reallocated afterwards.
    fn rebuild(&mut self, context: &DeviceContext, layouts: &LayoutHandles, image_count: usize) -> VulkanResult<()> {
        self.descriptors.reset_all()?;
        self.global_sets.clear();

        let buffers = FrameUniformStore::<Buffer>::allocate_buffers(context.allocator(), image_count)?;
        drop(self.uniforms.replace(buffers));

        self.global_sets = Self::write_global_sets(context.device(), &mut self.descriptors, layouts, &self.uniforms)?;
        Ok(())
    }
}

/// The renderer's GPU objects, borrowed for one call into the frame loop
struct FrameContext<'a> {
    context: &'a DeviceContext,
    swapchain: &'a mut SwapchainManager,
    render_pass: &'a RenderPass,
    resources: &'a mut FrameResources,
    assets: &'a mut GpuAssets,
    layouts: LayoutHandles,
    clear_color: [f32; 4],
}

impl FrameBackend for FrameContext<'_> {
    type Fence = Fence;
    type Semaphore = Semaphore;

    fn acquire_next_image(&mut self, signal: &Semaphore) -> VulkanResult<AcquireOutcome> {
        self.swapchain.acquire_next_image(signal.handle())
    }

    fn update_uniforms(&mut self, image_index: usize, camera: &CameraMatrices) -> VulkanResult<()> {
        self.resources
            .uniforms
            .update(image_index, &camera.view, &camera.projection);
        Ok(())
    }

    fn record_frame(&mut self, slot: usize, image_index: usize, drawables: &DrawableRegistry) -> VulkanResult<()> {
        let target = FramePassTarget {
            image: self.swapchain.image(image_index),
            image_index,
            render_pass: self.render_pass.handle(),
            framebuffer: self.swapchain.framebuffer(image_index),
            extent: self.swapchain.extent(),
            clear_color: self.clear_color,
            global_set: self.resources.global_sets[image_index],
        };

        let mut cmd = RecordingCommandBuffer::begin(
            self.context.device().clone(),
            self.resources.command_buffers[slot],
            vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        )?;
        record_frame_pass(&mut cmd, self.swapchain.layouts_mut(), &target, drawables, &*self.assets);
        cmd.finish()?;
        Ok(())
    }

    fn submit(&mut self, slot: usize, frame: &FrameSlot<Fence, Semaphore>) -> VulkanResult<()> {
        let wait_semaphores = [frame.image_acquired.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.resources.command_buffers[slot]];
        let signal_semaphores = [frame.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context
                .device()
                .queue_submit(self.context.graphics_queue(), &[submit_info], frame.fence.handle())
                .map_err(VulkanError::from)
        }
    }

    fn present(&mut self, image_index: usize, wait: &Semaphore) -> VulkanResult<PresentOutcome> {
        self.swapchain
            .present(self.context.present_queue(), image_index, wait.handle())
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<Option<usize>> {
        if !self.swapchain.recreate(self.context, self.render_pass.handle())? {
            return Ok(None);
        }
        let image_count = self.swapchain.image_count();

        self.resources.rebuild(self.context, &self.layouts, image_count)?;
        self.assets
            .rebuild_material_sets(self.context.device(), &mut self.resources.descriptors, &self.layouts)?;

        log::info!(
            "Swapchain recreated: {}x{} with {} images",
            self.swapchain.extent().width,
            self.swapchain.extent().height,
            image_count
        );
        Ok(Some(image_count))
    }
}

/// Forward renderer for a single presentation target
pub struct VulkanRenderer {
    drawables: DrawableRegistry,
    assets: GpuAssets,
    resources: FrameResources,
    frame_loop: FrameLoop<Fence, Semaphore>,
    swapchain: SwapchainManager,
    render_pass: RenderPass,
    layouts: DescriptorLayoutRegistry,
    clear_color: [f32; 4],
    minimized: bool,
    context: DeviceContext,
}

impl VulkanRenderer {
    /// Create the device, swapchain and frame resources for `target`
    ///
    /// Fails with [`VulkanError::InitializationFailed`] if the surface has no
    /// area yet, as for a window created minimized.
    pub fn new<T: PresentationTarget + ?Sized>(target: &mut T, config: &VulkanRendererConfig) -> VulkanResult<Self> {
        config.validate().map_err(VulkanError::InitializationFailed)?;

        let context = DeviceContext::new(target, config)?;
        let surface_format = SwapchainManager::preferred_format(&context)?;
        let render_pass = RenderPass::new_forward_pass(context.device().clone(), surface_format.format)?;

        let (width, height) = target.framebuffer_size();
        let swapchain = SwapchainManager::new(
            &context,
            render_pass.handle(),
            vk::Extent2D { width, height },
            config.preferred_image_count,
        )?;
        let image_count = swapchain.image_count();

        let layouts = DescriptorLayoutRegistry::new(context.device())?;
        let resources = FrameResources::new(
            &context,
            &layouts.handles(),
            image_count,
            config.max_frames_in_flight,
            config.descriptor_sets_per_pool,
        )?;

        let slots = (0..config.max_frames_in_flight)
            .map(|_| FrameSlot::create(context.device()))
            .collect::<VulkanResult<Vec<_>>>()?;
        let frame_loop = FrameLoop::new(slots, image_count);

        let default_texture = Texture::default_white(
            context.device(),
            context.allocator(),
            &resources.command_pool,
            context.graphics_queue(),
        )?;

        log::info!(
            "Vulkan renderer ready on {} ({} swapchain images, {} frames in flight)",
            context.physical_device().name(),
            image_count,
            config.max_frames_in_flight
        );

        Ok(Self {
            drawables: DrawableRegistry::new(),
            assets: GpuAssets::new(default_texture),
            resources,
            frame_loop,
            swapchain,
            render_pass,
            layouts,
            clear_color: config.clear_color,
            minimized: width == 0 || height == 0,
            context,
        })
    }

    /// Upload mesh data to device-local buffers
    pub fn create_mesh(&mut self, data: &MeshData) -> VulkanResult<MeshHandle> {
        let mesh = Mesh::upload(
            self.context.allocator(),
            &self.resources.command_pool,
            self.context.graphics_queue(),
            data,
        )?;
        Ok(self.assets.meshes.insert(mesh))
    }

    /// Upload tightly packed RGBA8 pixels as a sampled texture
    pub fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> VulkanResult<TextureHandle> {
        let texture = Texture::from_rgba8(
            self.context.device(),
            self.context.allocator(),
            &self.resources.command_pool,
            self.context.graphics_queue(),
            width,
            height,
            pixels,
        )?;
        Ok(self.assets.textures.insert(texture))
    }

    /// Build a graphics pipeline from the SPIR-V files in `shaders`
    pub fn create_pipeline(&mut self, shaders: &ShaderConfig) -> VulkanResult<PipelineHandle> {
        let pipeline = GraphicsPipeline::from_files(
            self.context.device(),
            self.render_pass.handle(),
            &shaders.vertex_shader_path,
            &shaders.fragment_shader_path,
            &self.layouts.handles(),
        )?;
        Ok(self.assets.pipelines.insert(pipeline))
    }

    /// Create a material drawing with `pipeline`, sampling `texture` (or white) tinted by `base_colour`
    pub fn create_material(
        &mut self,
        pipeline: PipelineHandle,
        texture: Option<TextureHandle>,
        base_colour: [f32; 4],
    ) -> VulkanResult<MaterialHandle> {
        if !self.assets.pipelines.contains_key(pipeline) {
            return Err(not_found(pipeline));
        }
        if let Some(texture) = texture {
            if !self.assets.textures.contains_key(texture) {
                return Err(not_found(texture));
            }
        }

        let mut material = Material::new(self.context.allocator(), pipeline, texture, base_colour)?;
        let layouts = self.layouts.handles();
        material.allocate_sets(
            self.context.device(),
            &mut self.resources.descriptors,
            &layouts,
            self.assets.texture_or_default(texture),
        )?;
        Ok(self.assets.materials.insert(material))
    }

    /// Destroy a mesh and every drawable using it
    ///
    /// Waits for in-flight frames first, since they may still read the buffers.
    pub fn destroy_mesh(&mut self, handle: MeshHandle) -> VulkanResult<()> {
        self.frame_loop.wait_all(FRAME_WAIT_TIMEOUT_NS)?;
        self.assets.meshes.remove(handle).ok_or_else(|| not_found(handle))?;
        self.drawables.retain_valid(|drawable| drawable.mesh != handle);
        Ok(())
    }

    /// Destroy a material and every drawable using it
    pub fn destroy_material(&mut self, handle: MaterialHandle) -> VulkanResult<()> {
        self.frame_loop.wait_all(FRAME_WAIT_TIMEOUT_NS)?;
        self.assets.materials.remove(handle).ok_or_else(|| not_found(handle))?;
        self.drawables.retain_valid(|drawable| drawable.material != handle);
        Ok(())
    }

    /// Draw `mesh` with `material` every frame, after everything added before it
    pub fn add_drawable(&mut self, mesh: MeshHandle, material: MaterialHandle) -> VulkanResult<DrawableId> {
        if !self.assets.meshes.contains_key(mesh) {
            return Err(not_found(mesh));
        }
        if !self.assets.materials.contains_key(material) {
            return Err(not_found(material));
        }
        Ok(self.drawables.add(mesh, material))
    }

    /// Stop drawing a drawable
    pub fn remove_drawable(&mut self, id: DrawableId) -> bool {
        self.drawables.remove(id).is_some()
    }

    /// The current draw list
    pub fn drawables(&self) -> &DrawableRegistry {
        &self.drawables
    }

    /// Record a new framebuffer size; the swapchain is rebuilt before the next frame
    ///
    /// A zero-sized framebuffer pauses rendering until a non-zero size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.minimized = width == 0 || height == 0;
        if self.minimized {
            log::debug!("Framebuffer has no area, pausing rendering");
            return;
        }
        self.swapchain.set_desired_extent(vk::Extent2D { width, height });
        self.frame_loop.request_recreate();
    }

    /// Render and present one frame from `camera`
    pub fn draw_frame(&mut self, camera: &Camera) -> VulkanResult<FrameOutcome> {
        if self.minimized {
            self.frame_loop.skip_frame();
            return Ok(FrameOutcome::Skipped);
        }

        let matrices = camera.matrices();
        let mut backend = FrameContext {
            context: &self.context,
            swapchain: &mut self.swapchain,
            render_pass: &self.render_pass,
            resources: &mut self.resources,
            assets: &mut self.assets,
            layouts: self.layouts.handles(),
            clear_color: self.clear_color,
        };

        self.frame_loop.render_frame(&mut backend, &matrices, &self.drawables)
    }

    /// Wait for all in-flight frames, then for the device to go idle
    pub fn wait_idle(&mut self) -> VulkanResult<()> {
        self.frame_loop.wait_all(FRAME_WAIT_TIMEOUT_NS)?;
        self.context.wait_idle()
    }

    /// Frame counters so far
    pub fn frame_stats(&self) -> FrameStats {
        self.frame_loop.stats()
    }

    /// Current swapchain extent
    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Width over height of the swapchain, for the camera projection
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.swapchain.extent();
        if extent.height == 0 {
            1.0
        } else {
            extent.width as f32 / extent.height as f32
        }
    }

    /// Device context, for callers that need raw handles
    pub fn context(&self) -> &DeviceContext {
        &self.context
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            log::error!("Failed to wait for the device during shutdown: {}", e);
        }
        log::debug!("Destroying Vulkan renderer");
    }
}
