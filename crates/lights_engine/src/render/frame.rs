//! Per-frame control flow
//!
//! [`FrameLoop`] drives one frame at a time: wait for the slot, acquire an
//! image, write uniforms, record, submit, present. Everything that touches the
//! GPU sits behind [`FrameBackend`], so the ordering rules here can be
//! exercised with a mock backend.
//!
//! A stale swapchain is an ordinary outcome. On an out-of-date acquire the
//! swapchain is rebuilt and the frame is skipped without submitting anything;
//! a suboptimal acquire still renders and presents, then rebuilds. While the
//! surface has no area the rebuild stays pending and every frame is skipped.

use crate::render::backends::vulkan::state::{FrameFence, FrameSlot, FrameSynchronizer};
use crate::render::backends::vulkan::VulkanResult;
use crate::render::camera::CameraMatrices;
use crate::render::drawables::DrawableRegistry;

/// Result of asking the swapchain for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired
    Ready {
        /// Index of the acquired swapchain image
        image_index: usize,
        /// The swapchain still works but no longer matches the surface exactly
        ///
        /// The frame is still rendered and presented, and the swapchain is
        /// rebuilt afterwards. Skipping here would leave the acquire semaphore
        /// signaled with nothing waiting on it.
        suboptimal: bool,
    },
    /// The swapchain is out of date and must be rebuilt before use
    Stale,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented against an up to date swapchain
    Presented,
    /// Presented (or dropped) against a swapchain that must be rebuilt
    Stale,
}

/// What happened to a requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was rendered and queued for presentation
    Presented {
        /// Swapchain image the frame went to
        image_index: usize,
    },
    /// Nothing was submitted; the swapchain was rebuilt or the surface has no area
    Skipped,
}

/// Counters for the frames driven so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames rendered and presented
    pub frames_presented: u64,
    /// Frames skipped without submission
    pub frames_skipped: u64,
    /// Number of swapchain rebuilds
    pub swapchain_recreations: u64,
}

/// GPU-side operations the frame loop sequences
pub trait FrameBackend {
    /// Fence type stored in each frame slot
    type Fence: FrameFence;
    /// Semaphore type stored in each frame slot
    type Semaphore;

    /// Acquire the next swapchain image, signalling `signal` when it is ready
    fn acquire_next_image(&mut self, signal: &Self::Semaphore) -> VulkanResult<AcquireOutcome>;

    /// Rewrite the uniforms read by `image_index`
    fn update_uniforms(&mut self, image_index: usize, camera: &CameraMatrices) -> VulkanResult<()>;

    /// Record the command buffer for `slot` targeting `image_index`
    fn record_frame(&mut self, slot: usize, image_index: usize, drawables: &DrawableRegistry) -> VulkanResult<()>;

    /// Submit the recorded command buffer for `slot` with that slot's sync objects
    fn submit(&mut self, slot: usize, frame: &FrameSlot<Self::Fence, Self::Semaphore>) -> VulkanResult<()>;

    /// Present `image_index` once `wait` is signaled
    fn present(&mut self, image_index: usize, wait: &Self::Semaphore) -> VulkanResult<PresentOutcome>;

    /// Rebuild the swapchain and everything sized by it; returns the new image count
    ///
    /// `None` means the surface has no area and nothing was rebuilt.
    fn recreate_swapchain(&mut self) -> VulkanResult<Option<usize>>;
}

/// Frame pacing state: slots, current slot and counters
pub struct FrameLoop<F, S> {
    sync: FrameSynchronizer<F, S>,
    current_slot: usize,
    recreate_requested: bool,
    stats: FrameStats,
}

impl<F: FrameFence, S> FrameLoop<F, S> {
    /// Create a frame loop over the given slots and swapchain image count
    pub fn new(slots: Vec<FrameSlot<F, S>>, image_count: usize) -> Self {
        Self {
            sync: FrameSynchronizer::new(slots, image_count),
            current_slot: 0,
            recreate_requested: false,
            stats: FrameStats::default(),
        }
    }

    /// Ask for a swapchain rebuild before the next frame (e.g. after a resize)
    pub fn request_recreate(&mut self) {
        self.recreate_requested = true;
    }

    /// Slot the next frame will use
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Counters so far
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Frame synchronizer, read only
    pub fn synchronizer(&self) -> &FrameSynchronizer<F, S> {
        &self.sync
    }

    /// Record that a frame was skipped before reaching the backend
    pub fn skip_frame(&mut self) {
        self.stats.frames_skipped += 1;
    }

    /// Drive one frame through `backend`
    pub fn render_frame<B>(
        &mut self,
        backend: &mut B,
        camera: &CameraMatrices,
        drawables: &DrawableRegistry,
    ) -> VulkanResult<FrameOutcome>
    where
        B: FrameBackend<Fence = F, Semaphore = S>,
    {
        if self.recreate_requested && !self.recreate(backend)? {
            self.stats.frames_skipped += 1;
            return Ok(FrameOutcome::Skipped);
        }

        let slot = self.current_slot;
        self.sync.wait_for_slot(slot)?;

        let (image_index, suboptimal) = match backend.acquire_next_image(&self.sync.slot(slot).image_acquired)? {
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::Stale => {
                log::debug!("Swapchain out of date on acquire, skipping frame");
                self.recreate(backend)?;
                self.stats.frames_skipped += 1;
                return Ok(FrameOutcome::Skipped);
            }
        };

        self.sync.claim_image(image_index, slot)?;
        backend.update_uniforms(image_index, camera)?;
        backend.record_frame(slot, image_index, drawables)?;
        backend.submit(slot, self.sync.slot(slot))?;
        self.sync.mark_submitted(slot);

        let presented = backend.present(image_index, &self.sync.slot(slot).render_finished)?;

        self.current_slot = (slot + 1) % self.sync.slot_count();
        self.stats.frames_presented += 1;

        if suboptimal || presented == PresentOutcome::Stale {
            log::debug!("Swapchain suboptimal or out of date after present, rebuilding");
            self.recreate(backend)?;
        }

        Ok(FrameOutcome::Presented { image_index })
    }

    /// Wait for all outstanding frames, treating a timeout as device loss
    pub fn wait_all(&mut self, timeout_ns: u64) -> VulkanResult<()> {
        self.sync.wait_all_bounded(timeout_ns)
    }

    /// Returns `false` when the surface has no area; the rebuild stays pending
    fn recreate<B>(&mut self, backend: &mut B) -> VulkanResult<bool>
    where
        B: FrameBackend<Fence = F, Semaphore = S>,
    {
        let Some(image_count) = backend.recreate_swapchain()? else {
            self.recreate_requested = true;
            return Ok(false);
        };

        self.sync.on_swapchain_recreated(image_count);
        self.recreate_requested = false;
        self.stats.swapchain_recreations += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::vulkan::VulkanError;
    use crate::foundation::math::Mat4;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Fence double counting submissions that have not been waited yet
    struct CountingFence {
        outstanding: Rc<Cell<u32>>,
        max_seen: Rc<Cell<u32>>,
    }

    impl FrameFence for CountingFence {
        fn wait(&self, _timeout: u64) -> VulkanResult<()> {
            self.max_seen.set(self.max_seen.get().max(self.outstanding.get()));
            self.outstanding.set(0);
            Ok(())
        }

        fn reset(&self) -> VulkanResult<()> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Submission {
        frame: usize,
        slot: usize,
        image: usize,
        descriptor_image_count: usize,
    }

    struct MockBackend {
        image_count: usize,
        next_image: usize,
        frame: usize,
        stale_on_frame: Option<usize>,
        suboptimal_on_frame: Option<usize>,
        stale_present_on_frame: Option<usize>,
        zero_area: bool,
        image_count_after_recreate: usize,
        descriptor_image_count: usize,
        acquired: Vec<usize>,
        uniform_writes: Vec<usize>,
        recorded: Option<(usize, usize)>,
        submissions: Vec<Submission>,
        presented: Vec<usize>,
        recreations: usize,
        recreate_attempts: usize,
        outstanding: Vec<Rc<Cell<u32>>>,
    }

    impl MockBackend {
        fn new(image_count: usize, outstanding: Vec<Rc<Cell<u32>>>) -> Self {
            Self {
                image_count,
                next_image: 0,
                frame: 0,
                stale_on_frame: None,
                suboptimal_on_frame: None,
                stale_present_on_frame: None,
                zero_area: false,
                image_count_after_recreate: image_count,
                descriptor_image_count: image_count,
                acquired: Vec::new(),
                uniform_writes: Vec::new(),
                recorded: None,
                submissions: Vec::new(),
                presented: Vec::new(),
                recreations: 0,
                recreate_attempts: 0,
                outstanding,
            }
        }
    }

    impl FrameBackend for MockBackend {
        type Fence = CountingFence;
        type Semaphore = ();

        fn acquire_next_image(&mut self, _signal: &()) -> VulkanResult<AcquireOutcome> {
            self.frame += 1;
            if self.stale_on_frame == Some(self.frame) {
                return Ok(AcquireOutcome::Stale);
            }
            let image_index = self.next_image % self.image_count;
            self.next_image += 1;
            self.acquired.push(image_index);
            Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal: self.suboptimal_on_frame == Some(self.frame),
            })
        }

        fn update_uniforms(&mut self, image_index: usize, _camera: &CameraMatrices) -> VulkanResult<()> {
            self.uniform_writes.push(image_index);
            Ok(())
        }

        fn record_frame(&mut self, slot: usize, image_index: usize, _drawables: &DrawableRegistry) -> VulkanResult<()> {
            assert!(
                image_index < self.descriptor_image_count,
                "recording against descriptor sets built for a different swapchain"
            );
            self.recorded = Some((slot, image_index));
            Ok(())
        }

        fn submit(&mut self, slot: usize, frame: &FrameSlot<CountingFence, ()>) -> VulkanResult<()> {
            let (recorded_slot, image) = self
                .recorded
                .take()
                .ok_or_else(|| VulkanError::InvalidOperation {
                    reason: "submit without recording".to_string(),
                })?;
            assert_eq!(recorded_slot, slot);
            frame.fence.outstanding.set(frame.fence.outstanding.get() + 1);
            self.submissions.push(Submission {
                frame: self.frame,
                slot,
                image,
                descriptor_image_count: self.descriptor_image_count,
            });
            Ok(())
        }

        fn present(&mut self, _image_index: usize, _wait: &()) -> VulkanResult<PresentOutcome> {
            self.presented.push(self.frame);
            if self.stale_present_on_frame == Some(self.frame) {
                Ok(PresentOutcome::Stale)
            } else {
                Ok(PresentOutcome::Presented)
            }
        }

        fn recreate_swapchain(&mut self) -> VulkanResult<Option<usize>> {
            self.recreate_attempts += 1;
            if self.zero_area {
                return Ok(None);
            }
            self.recreations += 1;
            self.image_count = self.image_count_after_recreate;
            self.next_image = 0;
            // Per-image descriptor sets follow the new image count
            self.descriptor_image_count = self.image_count;
            Ok(Some(self.image_count))
        }
    }

    fn setup(slots: usize, images: usize) -> (FrameLoop<CountingFence, ()>, MockBackend, Rc<Cell<u32>>) {
        let max_seen = Rc::new(Cell::new(0));
        let counters: Vec<Rc<Cell<u32>>> = (0..slots).map(|_| Rc::new(Cell::new(0))).collect();
        let frame_slots = counters
            .iter()
            .map(|outstanding| {
                FrameSlot::new(
                    CountingFence {
                        outstanding: Rc::clone(outstanding),
                        max_seen: Rc::clone(&max_seen),
                    },
                    (),
                    (),
                )
            })
            .collect();
        (FrameLoop::new(frame_slots, images), MockBackend::new(images, counters), max_seen)
    }

    fn camera() -> CameraMatrices {
        CameraMatrices {
            view: Mat4::identity(),
            projection: Mat4::identity(),
        }
    }

    /// Ten frames over three images and three slots cycle 0,1,2 with one submission per wait
    #[test]
    fn test_ten_frames_cycle_images() {
        let (mut frames, mut backend, max_seen) = setup(3, 3);
        let drawables = DrawableRegistry::new();

        for _ in 0..10 {
            let outcome = frames.render_frame(&mut backend, &camera(), &drawables).unwrap();
            assert!(matches!(outcome, FrameOutcome::Presented { .. }));
        }

        assert_eq!(backend.acquired, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(backend.uniform_writes, backend.acquired);
        let slots: Vec<usize> = backend.submissions.iter().map(|s| s.slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
        assert!(max_seen.get() <= 1);
        assert_eq!(frames.stats().frames_presented, 10);
        assert_eq!(backend.recreations, 0);
    }

    /// An out-of-date acquire on frame 5 rebuilds, submits nothing, and frame 6 uses the new sets
    #[test]
    fn test_stale_acquire_skips_frame() {
        let (mut frames, mut backend, max_seen) = setup(3, 3);
        backend.stale_on_frame = Some(5);
        backend.image_count_after_recreate = 4;
        let drawables = DrawableRegistry::new();

        let outcomes: Vec<FrameOutcome> = (0..6)
            .map(|_| frames.render_frame(&mut backend, &camera(), &drawables).unwrap())
            .collect();

        assert_eq!(outcomes[4], FrameOutcome::Skipped);
        assert_eq!(backend.recreations, 1);
        assert!(backend.submissions.iter().all(|s| s.frame != 5));

        let frame_six = backend.submissions.last().copied().unwrap();
        assert_eq!(frame_six.frame, 6);
        assert_eq!(frame_six.descriptor_image_count, 4);
        assert_eq!(frames.synchronizer().image_count(), 4);
        assert!(max_seen.get() <= 1);

        let stats = frames.stats();
        assert_eq!(stats.frames_presented, 5);
        assert_eq!(stats.frames_skipped, 1);
        assert_eq!(stats.swapchain_recreations, 1);
    }

    /// A skipped frame leaves its slot reusable without a stray wait
    #[test]
    fn test_skipped_frame_keeps_slot() {
        let (mut frames, mut backend, _max_seen) = setup(2, 3);
        backend.stale_on_frame = Some(1);
        let drawables = DrawableRegistry::new();

        assert_eq!(
            frames.render_frame(&mut backend, &camera(), &drawables).unwrap(),
            FrameOutcome::Skipped
        );
        assert_eq!(frames.current_slot(), 0);

        frames.render_frame(&mut backend, &camera(), &drawables).unwrap();
        assert_eq!(backend.submissions[0].slot, 0);
        assert_eq!(frames.current_slot(), 1);
    }

    #[test]
    fn test_requested_recreate_runs_before_next_frame() {
        let (mut frames, mut backend, _max_seen) = setup(2, 2);
        let drawables = DrawableRegistry::new();

        frames.request_recreate();
        frames.render_frame(&mut backend, &camera(), &drawables).unwrap();

        assert_eq!(backend.recreations, 1);
        assert_eq!(backend.submissions.len(), 1);
    }

    /// A suboptimal acquire on frame 3 is still submitted and presented, then rebuilt once
    #[test]
    fn test_suboptimal_acquire_renders_then_rebuilds() {
        let (mut frames, mut backend, max_seen) = setup(2, 3);
        backend.suboptimal_on_frame = Some(3);
        let drawables = DrawableRegistry::new();

        for frame in 1..=3 {
            let outcome = frames.render_frame(&mut backend, &camera(), &drawables).unwrap();
            assert!(matches!(outcome, FrameOutcome::Presented { .. }));
            assert_eq!(backend.recreations, usize::from(frame == 3));
        }

        assert_eq!(backend.submissions.last().unwrap().frame, 3);
        assert_eq!(backend.presented, vec![1, 2, 3]);
        assert_eq!(frames.current_slot(), 1);

        frames.render_frame(&mut backend, &camera(), &drawables).unwrap();
        assert_eq!(backend.recreations, 1);
        assert_eq!(backend.submissions.last().unwrap().slot, 1);
        assert!(max_seen.get() <= 1);
        assert_eq!(frames.stats().frames_presented, 4);
        assert_eq!(frames.stats().swapchain_recreations, 1);
    }

    /// A stale present on frame 2 keeps the frame, rebuilds once and moves to the next slot
    #[test]
    fn test_stale_present_rebuilds_after_frame() {
        let (mut frames, mut backend, _max_seen) = setup(2, 3);
        backend.stale_present_on_frame = Some(2);
        backend.image_count_after_recreate = 4;
        let drawables = DrawableRegistry::new();

        let outcomes: Vec<FrameOutcome> = (0..4)
            .map(|_| frames.render_frame(&mut backend, &camera(), &drawables).unwrap())
            .collect();

        assert!(outcomes.iter().all(|o| matches!(o, FrameOutcome::Presented { .. })));
        let submitted: Vec<usize> = backend.submissions.iter().map(|s| s.frame).collect();
        assert_eq!(submitted, vec![1, 2, 3, 4]);
        assert_eq!(backend.presented, vec![1, 2, 3, 4]);
        assert_eq!(backend.recreations, 1);

        let slots: Vec<usize> = backend.submissions.iter().map(|s| s.slot).collect();
        assert_eq!(slots, vec![0, 1, 0, 1]);
        assert_eq!(backend.submissions[2].descriptor_image_count, 4);
        assert_eq!(frames.synchronizer().image_count(), 4);
    }

    /// With no surface area the rebuild stays pending and frames are skipped until it succeeds
    #[test]
    fn test_zero_area_surface_pauses_frames() {
        let (mut frames, mut backend, _max_seen) = setup(2, 3);
        backend.stale_on_frame = Some(2);
        backend.zero_area = true;
        let drawables = DrawableRegistry::new();

        frames.render_frame(&mut backend, &camera(), &drawables).unwrap();
        for _ in 0..3 {
            assert_eq!(
                frames.render_frame(&mut backend, &camera(), &drawables).unwrap(),
                FrameOutcome::Skipped
            );
        }

        // Only the stale acquire reached the swapchain; later frames stop at the pending rebuild
        assert_eq!(backend.frame, 2);
        assert_eq!(backend.submissions.len(), 1);
        assert_eq!(backend.recreate_attempts, 3);
        assert_eq!(backend.recreations, 0);
        assert_eq!(frames.stats().frames_skipped, 3);
        assert_eq!(frames.stats().swapchain_recreations, 0);

        backend.zero_area = false;
        let outcome = frames.render_frame(&mut backend, &camera(), &drawables).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { .. }));
        assert_eq!(backend.recreations, 1);
        assert_eq!(backend.submissions.len(), 2);
        assert_eq!(backend.submissions[1].slot, 1);
    }
}
