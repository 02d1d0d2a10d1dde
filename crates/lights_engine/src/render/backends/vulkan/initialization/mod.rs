//! Vulkan initialization: instance, surface, device and GPU memory

pub mod context;
pub mod memory;
pub mod surface;

pub use context::*;
pub use memory::{Buffer, Image, MappedMemory, MemoryLocation};
pub use surface::Surface;
