//! Swapchain image layout tracking
//!
//! The tracker mirrors, per swapchain image, the layout the GPU will have left
//! the image in once the last recorded command buffer touching it finishes.
//! Every barrier recorded against a swapchain image goes through
//! [`ImageLayoutTracker::transition`], so the declared old layout can never
//! drift from reality.

use ash::vk;

/// A recorded layout change with the stage and access masks for its barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    /// Layout the image is declared to be in
    pub old_layout: vk::ImageLayout,
    /// Layout the image moves to
    pub new_layout: vk::ImageLayout,
    /// Stages that must finish before the transition
    pub src_stage: vk::PipelineStageFlags,
    /// Stages that wait on the transition
    pub dst_stage: vk::PipelineStageFlags,
    /// Writes made available by the transition
    pub src_access: vk::AccessFlags,
    /// Accesses made visible after the transition
    pub dst_access: vk::AccessFlags,
}

impl ImageTransition {
    /// Masks for a supported layout pair, `None` for anything else
    pub fn between(old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Option<Self> {
        let (src_stage, src_access, dst_stage, dst_access) = match (old_layout, new_layout) {
            (
                vk::ImageLayout::UNDEFINED | vk::ImageLayout::PRESENT_SRC_KHR,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ) => (
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::AccessFlags::empty(),
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            ),
            (vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR) => (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::AccessFlags::MEMORY_READ,
            ),
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::AccessFlags::empty(),
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_WRITE,
            ),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
                vk::PipelineStageFlags::TRANSFER,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::AccessFlags::SHADER_READ,
            ),
            _ => return None,
        };

        Some(Self {
            old_layout,
            new_layout,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
        })
    }

    /// Image memory barrier for a single-mip colour image
    pub fn barrier(&self, image: vk::Image) -> vk::ImageMemoryBarrier {
        vk::ImageMemoryBarrier::builder()
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(self.src_access)
            .dst_access_mask(self.dst_access)
            .build()
    }
}

/// Tracked layout of every swapchain image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayoutTracker {
    layouts: Vec<vk::ImageLayout>,
}

impl ImageLayoutTracker {
    /// All images start out UNDEFINED
    pub fn new(image_count: usize) -> Self {
        Self {
            layouts: vec![vk::ImageLayout::UNDEFINED; image_count],
        }
    }

    /// Forget everything, used after the swapchain is rebuilt
    pub fn reset(&mut self, image_count: usize) {
        self.layouts.clear();
        self.layouts.resize(image_count, vk::ImageLayout::UNDEFINED);
    }

    /// Number of tracked images
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Whether no images are tracked
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Current tracked layout of an image
    pub fn current(&self, image_index: usize) -> vk::ImageLayout {
        self.layouts[image_index]
    }

    /// Record a transition and return its barrier description
    ///
    /// # Panics
    /// Panics if `declared_old` differs from the tracked layout or the pair is
    /// not a transition the frame protocol uses.
    pub fn transition(
        &mut self,
        image_index: usize,
        declared_old: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> ImageTransition {
        let tracked = self.layouts[image_index];
        assert_eq!(
            declared_old, tracked,
            "image {} declared in {:?} but tracked in {:?}",
            image_index, declared_old, tracked
        );

        let transition = ImageTransition::between(declared_old, new_layout).unwrap_or_else(|| {
            panic!(
                "unsupported swapchain image transition {:?} -> {:?}",
                declared_old, new_layout
            )
        });

        self.layouts[image_index] = new_layout;
        transition
    }

    /// Transition into the colour attachment layout at the start of a frame
    pub fn begin_frame(&mut self, image_index: usize) -> ImageTransition {
        let tracked = self.current(image_index);
        self.transition(image_index, tracked, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
    }

    /// Transition into the presentable layout at the end of a frame
    pub fn end_frame(&mut self, image_index: usize) -> ImageTransition {
        self.transition(
            image_index,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One frame walks UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC
    #[test]
    fn test_single_frame_sequence() {
        let mut tracker = ImageLayoutTracker::new(3);

        let begin = tracker.begin_frame(1);
        assert_eq!(begin.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(begin.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(begin.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(begin.src_access, vk::AccessFlags::empty());
        assert_eq!(begin.dst_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(begin.dst_access, vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
        assert_eq!(tracker.current(1), vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let end = tracker.end_frame(1);
        assert_eq!(end.src_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(end.src_access, vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
        assert_eq!(end.dst_stage, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
        assert_eq!(end.dst_access, vk::AccessFlags::MEMORY_READ);
        assert_eq!(tracker.current(1), vk::ImageLayout::PRESENT_SRC_KHR);

        // Untouched images stay undefined
        assert_eq!(tracker.current(0), vk::ImageLayout::UNDEFINED);
    }

    /// The next frame declares exactly what the previous frame left behind
    #[test]
    fn test_cross_frame_continuity() {
        let mut tracker = ImageLayoutTracker::new(2);
        tracker.begin_frame(0);
        tracker.end_frame(0);
        let final_layout = tracker.current(0);

        let next = tracker.begin_frame(0);
        assert_eq!(next.old_layout, final_layout);
        assert_eq!(next.old_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_reset_returns_images_to_undefined() {
        let mut tracker = ImageLayoutTracker::new(2);
        tracker.begin_frame(0);
        tracker.end_frame(0);

        tracker.reset(4);
        assert_eq!(tracker.len(), 4);
        assert!((0..4).all(|i| tracker.current(i) == vk::ImageLayout::UNDEFINED));
    }

    #[test]
    #[should_panic(expected = "tracked in")]
    fn test_mismatched_declaration_panics() {
        let mut tracker = ImageLayoutTracker::new(1);
        tracker.transition(
            0,
            vk::ImageLayout::PRESENT_SRC_KHR,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        );
    }

    /// Ending a frame that never began is caught as a mismatch
    #[test]
    #[should_panic]
    fn test_end_without_begin_panics() {
        let mut tracker = ImageLayoutTracker::new(1);
        tracker.end_frame(0);
    }

    #[test]
    fn test_barrier_carries_masks() {
        let transition = ImageTransition::between(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        let barrier = transition.barrier(vk::Image::null());

        assert_eq!(barrier.src_access_mask, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags::SHADER_READ);
        assert_eq!(barrier.subresource_range.level_count, 1);
    }
}
