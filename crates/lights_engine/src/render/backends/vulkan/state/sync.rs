//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! RAII semaphores and fences, plus the per-slot frame pacing state machine.
//!
//! ## Frame slots
//!
//! Each in-flight slot owns a fence and a semaphore pair and moves through
//! `Idle -> Submitted -> (fence signaled) -> Idle`. The fence is only waited
//! when the slot actually has work outstanding, which keeps a skipped frame
//! (stale swapchain) from leaving a reset fence that nothing will signal.
//!
//! Slots and swapchain images are counted independently, so the synchronizer
//! also remembers which slot last rendered each image. Before an image is
//! reused, any other slot still rendering to it is waited.

use ash::{vk, Device};

use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// GPU-GPU synchronization primitive with automatic resource management
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe { device.create_semaphore(&create_info, None).map_err(VulkanError::from)? };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe { device.create_fence(&create_info, None).map_err(VulkanError::from)? };

        Ok(Self { device, fence })
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// CPU-side view of a fence, implemented by [`Fence`] and by test doubles
pub trait FrameFence {
    /// Block until the fence is signaled or `timeout` nanoseconds pass
    fn wait(&self, timeout: u64) -> VulkanResult<()>;

    /// Return the fence to the unsignaled state
    fn reset(&self) -> VulkanResult<()>;
}

impl FrameFence for Fence {
    fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::from)
        }
    }

    fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_err(VulkanError::from) }
    }
}

/// Where a frame slot is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No outstanding GPU work; the fence is unsignaled and free to submit with
    Idle,
    /// Work was submitted and the fence has not been observed signaled yet
    Submitted,
}

/// Synchronization objects for one in-flight frame
pub struct FrameSlot<F, S> {
    /// Signaled by the GPU when this slot's submission completes
    pub fence: F,
    /// Signaled when the acquired swapchain image is ready
    pub image_acquired: S,
    /// Signaled when rendering finishes, waited by present
    pub render_finished: S,
    state: SlotState,
}

impl<F, S> FrameSlot<F, S> {
    /// Assemble a slot from an unsignaled fence and two semaphores
    pub fn new(fence: F, image_acquired: S, render_finished: S) -> Self {
        Self {
            fence,
            image_acquired,
            render_finished,
            state: SlotState::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SlotState {
        self.state
    }
}

impl FrameSlot<Fence, Semaphore> {
    /// Create the Vulkan objects for one slot
    pub fn create(device: &Device) -> VulkanResult<Self> {
        Ok(Self::new(
            Fence::new(device.clone(), false)?,
            Semaphore::new(device.clone())?,
            Semaphore::new(device.clone())?,
        ))
    }
}

/// Frame pacing across in-flight slots and swapchain images
pub struct FrameSynchronizer<F, S> {
    slots: Vec<FrameSlot<F, S>>,
    image_owners: Vec<Option<usize>>,
}

impl<F: FrameFence, S> FrameSynchronizer<F, S> {
    /// Create a synchronizer over `slots` for a swapchain of `image_count` images
    pub fn new(slots: Vec<FrameSlot<F, S>>, image_count: usize) -> Self {
        assert!(!slots.is_empty(), "at least one frame slot is required");
        Self {
            slots,
            image_owners: vec![None; image_count],
        }
    }

    /// Number of in-flight slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Access a slot
    pub fn slot(&self, slot: usize) -> &FrameSlot<F, S> {
        &self.slots[slot]
    }

    /// Make `slot` ready to record: wait for its previous submission, then reset the fence
    ///
    /// Returns immediately when the slot has nothing outstanding.
    pub fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        Self::retire(&mut self.slots[slot], u64::MAX)
    }

    /// Take `image_index` for `slot`, first waiting on any other slot still rendering to it
    pub fn claim_image(&mut self, image_index: usize, slot: usize) -> VulkanResult<()> {
        if let Some(owner) = self.image_owners[image_index] {
            if owner != slot && self.slots[owner].state == SlotState::Submitted {
                log::trace!("Image {} still in use by slot {}, waiting", image_index, owner);
                Self::retire(&mut self.slots[owner], u64::MAX)?;
            }
        }
        self.image_owners[image_index] = Some(slot);
        Ok(())
    }

    /// Record that `slot` has been submitted with its fence
    ///
    /// # Panics
    /// Panics if the slot already has outstanding work, i.e. it was not waited first.
    pub fn mark_submitted(&mut self, slot: usize) {
        let frame_slot = &mut self.slots[slot];
        assert_eq!(
            frame_slot.state,
            SlotState::Idle,
            "frame slot {} submitted without waiting for its previous submission",
            slot
        );
        frame_slot.state = SlotState::Submitted;
    }

    /// Forget image ownership after the swapchain was rebuilt
    pub fn on_swapchain_recreated(&mut self, image_count: usize) {
        self.image_owners.clear();
        self.image_owners.resize(image_count, None);
    }

    /// Number of tracked swapchain images
    pub fn image_count(&self) -> usize {
        self.image_owners.len()
    }

    /// Wait for every outstanding slot with a bounded timeout
    ///
    /// A timeout means the GPU stopped making progress and is reported as
    /// [`VulkanError::DeviceLost`].
    pub fn wait_all_bounded(&mut self, timeout_ns: u64) -> VulkanResult<()> {
        for slot in &mut self.slots {
            Self::retire(slot, timeout_ns).map_err(|e| match e {
                VulkanError::Api(vk::Result::TIMEOUT) => {
                    log::error!("Frame fence did not signal within {} ns", timeout_ns);
                    VulkanError::DeviceLost
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn retire(slot: &mut FrameSlot<F, S>, timeout: u64) -> VulkanResult<()> {
        if slot.state == SlotState::Submitted {
            slot.fence.wait(timeout)?;
            slot.fence.reset()?;
            slot.state = SlotState::Idle;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Event log shared by mock fences
    #[derive(Default)]
    pub(crate) struct FenceLog {
        pub events: RefCell<Vec<(usize, &'static str)>>,
    }

    /// Fence double that is signaled when waited unless told to hang
    pub(crate) struct MockFence {
        pub id: usize,
        pub log: Rc<FenceLog>,
        pub hang: Cell<bool>,
    }

    impl MockFence {
        pub fn new(id: usize, log: Rc<FenceLog>) -> Self {
            Self {
                id,
                log,
                hang: Cell::new(false),
            }
        }
    }

    impl FrameFence for MockFence {
        fn wait(&self, _timeout: u64) -> VulkanResult<()> {
            if self.hang.get() {
                return Err(VulkanError::Api(vk::Result::TIMEOUT));
            }
            self.log.events.borrow_mut().push((self.id, "wait"));
            Ok(())
        }

        fn reset(&self) -> VulkanResult<()> {
            self.log.events.borrow_mut().push((self.id, "reset"));
            Ok(())
        }
    }

    fn synchronizer(slots: usize, images: usize) -> (FrameSynchronizer<MockFence, ()>, Rc<FenceLog>) {
        let log = Rc::new(FenceLog::default());
        let slots = (0..slots)
            .map(|id| FrameSlot::new(MockFence::new(id, Rc::clone(&log)), (), ()))
            .collect();
        (FrameSynchronizer::new(slots, images), log)
    }

    /// Waiting a fresh slot does not touch its fence
    #[test]
    fn test_idle_slot_wait_is_noop() {
        let (mut sync, log) = synchronizer(2, 2);
        sync.wait_for_slot(0).unwrap();
        assert!(log.events.borrow().is_empty());
        assert_eq!(sync.slot(0).state(), SlotState::Idle);
    }

    /// After wait_for_slot, the previous submission for the slot has completed
    #[test]
    fn test_wait_retires_submission() {
        let (mut sync, log) = synchronizer(2, 2);
        sync.wait_for_slot(1).unwrap();
        sync.mark_submitted(1);
        assert_eq!(sync.slot(1).state(), SlotState::Submitted);

        sync.wait_for_slot(1).unwrap();
        assert_eq!(sync.slot(1).state(), SlotState::Idle);
        assert_eq!(*log.events.borrow(), vec![(1, "wait"), (1, "reset")]);
    }

    #[test]
    #[should_panic(expected = "without waiting")]
    fn test_double_submit_panics() {
        let (mut sync, _log) = synchronizer(2, 2);
        sync.mark_submitted(0);
        sync.mark_submitted(0);
    }

    /// An image still owned by another in-flight slot is waited before reuse
    #[test]
    fn test_claim_image_waits_for_previous_owner() {
        let (mut sync, log) = synchronizer(2, 3);
        sync.claim_image(2, 0).unwrap();
        sync.mark_submitted(0);

        sync.claim_image(2, 1).unwrap();
        assert_eq!(*log.events.borrow(), vec![(0, "wait"), (0, "reset")]);
        assert_eq!(sync.slot(0).state(), SlotState::Idle);

        // Slot 0 was retired early, so its own wait is now free
        sync.wait_for_slot(0).unwrap();
        assert_eq!(log.events.borrow().len(), 2);
    }

    #[test]
    fn test_recreate_clears_image_owners() {
        let (mut sync, log) = synchronizer(2, 2);
        sync.claim_image(0, 0).unwrap();
        sync.mark_submitted(0);

        sync.on_swapchain_recreated(4);
        assert_eq!(sync.image_count(), 4);
        sync.claim_image(0, 1).unwrap();
        assert!(log.events.borrow().is_empty());
    }

    /// A fence that never signals within the bound is reported as device loss
    #[test]
    fn test_bounded_wait_timeout_is_device_lost() {
        let (mut sync, _log) = synchronizer(2, 2);
        sync.mark_submitted(1);
        sync.slot(1).fence.hang.set(true);

        let result = sync.wait_all_bounded(1_000_000);
        assert!(matches!(result, Err(VulkanError::DeviceLost)));
    }
}
