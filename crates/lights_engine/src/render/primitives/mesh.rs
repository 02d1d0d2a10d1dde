//! CPU-side mesh data
//!
//! Vertices and indices as they will be uploaded to the GPU. Generated
//! primitives wind counter-clockwise when seen from outside in a right-handed,
//! Y-up world; the projection flip at upload time turns that into clockwise on
//! screen, which is what the pipeline treats as front facing.

use crate::foundation::math::{max_vec3, min_vec3, Vec3};

/// Vertex with position, colour, normal and texture coordinates
///
/// The `#[repr(C)]` layout is what the vertex input state in the Vulkan
/// backend describes: binding 0, locations 0 to 3 in field order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Vertex colour, multiplied with the material and texture
    pub colour: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates, (0, 0) at the top-left of the image
    pub uv: [f32; 2],
}

// Only f32 arrays, no padding
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], colour: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            colour,
            normal,
            uv,
        }
    }

    /// White vertex, for geometry coloured entirely by its material
    pub fn white(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self::new(position, [1.0, 1.0, 1.0], normal, uv)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingBox {
    /// Smallest box containing every vertex, `None` for an empty slice
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        let first = Vec3::from(vertices.first()?.position);
        let (min, max) = vertices.iter().fold((first, first), |(min, max), v| {
            let p = Vec3::from(v.position);
            (min_vec3(&min, &p), max_vec3(&max, &p))
        });
        Some(Self { min, max })
    }

    /// Centre of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Geometry ready for upload
///
/// An empty index list means the mesh is drawn non-indexed over its vertices.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices, may be empty
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create mesh data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Whether the mesh is drawn with an index buffer
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Bounding box of the vertices
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Check that every index refers to an existing vertex
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.is_empty() {
            return Err("Mesh has no vertices".to_string());
        }
        if self.indices.len() % 3 != 0 {
            return Err(format!("Index count {} is not a multiple of 3", self.indices.len()));
        }
        let count = self.vertices.len() as u32;
        if let Some(bad) = self.indices.iter().find(|&&i| i >= count) {
            return Err(format!("Index {} out of range for {} vertices", bad, count));
        }
        Ok(())
    }

    /// Single RGB triangle in the XY plane, non-indexed
    pub fn triangle() -> Self {
        let normal = [0.0, 0.0, 1.0];
        Self::new(
            vec![
                Vertex::new([0.0, 0.5, 0.0], [1.0, 0.0, 0.0], normal, [0.5, 0.0]),
                Vertex::new([-0.5, -0.5, 0.0], [0.0, 1.0, 0.0], normal, [0.0, 1.0]),
                Vertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], normal, [1.0, 1.0]),
            ],
            Vec::new(),
        )
    }

    /// Unit quad in the XY plane facing +Z
    pub fn quad() -> Self {
        let normal = [0.0, 0.0, 1.0];
        Self::new(
            vec![
                Vertex::white([-0.5, -0.5, 0.0], normal, [0.0, 1.0]),
                Vertex::white([0.5, -0.5, 0.0], normal, [1.0, 1.0]),
                Vertex::white([0.5, 0.5, 0.0], normal, [1.0, 0.0]),
                Vertex::white([-0.5, 0.5, 0.0], normal, [0.0, 0.0]),
            ],
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    /// Unit cube centred at the origin, four vertices per face
    pub fn cube() -> Self {
        // (normal, u axis, v axis) with u x v == normal
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in FACES {
            let base = vertices.len() as u32;
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            for (su, sv) in CORNERS {
                let position = (n + u * su + v * sv) * 0.5;
                let colour = n.map(|c| c.abs() * 0.5 + 0.5);
                vertices.push(Vertex::new(
                    position.into(),
                    colour.into(),
                    normal,
                    [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                ));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// UV sphere of radius 0.5 with `subdivisions` rings and twice as many segments
    pub fn sphere(subdivisions: u32) -> Self {
        let rings = subdivisions.max(2);
        let segments = rings * 2;

        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            for segment in 0..=segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                let normal = [phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos()];
                vertices.push(Vertex::white(
                    [normal[0] * 0.5, normal[1] * 0.5, normal[2] * 0.5],
                    normal,
                    [segment as f32 / segments as f32, ring as f32 / rings as f32],
                ));
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                let c = a + 1;
                let d = b + 1;
                indices.extend_from_slice(&[a, b, c, c, b, d]);
            }
        }

        Self::new(vertices, indices)
    }
}
