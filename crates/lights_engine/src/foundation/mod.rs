//! Foundation module - Core utilities and types
//!
//! Math aliases over nalgebra and logging setup shared by the renderer and
//! the applications built on it.

pub mod logging;
pub mod math;
