//! Core primitive types for rendering
//!
//! Backend-agnostic vertex and mesh data, plus generators for simple shapes.

pub mod mesh;

pub use mesh::{BoundingBox, MeshData, Vertex};
