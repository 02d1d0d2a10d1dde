//! Vulkan state management
//!
//! Swapchain lifecycle, image layout tracking and frame synchronization.

pub mod layout;
pub mod swapchain;
pub mod sync;

pub use layout::{ImageLayoutTracker, ImageTransition};
pub use swapchain::{Framebuffer, RecreatePlan, Swapchain, SwapchainManager, SwapchainPlan, SwapchainSupport};
pub use sync::{Fence, FrameFence, FrameSlot, FrameSynchronizer, Semaphore, SlotState};
