//! Geometry descriptors handed to the scene graph.
//!
//! A [`Geometry`] is plain CPU data: flat attribute arrays, an optional index
//! array and a primitive topology. Scene nodes upload it lazily through
//! [`RenderDevice::upload_geometry`](crate::RenderDevice::upload_geometry) the first
//! time they are drawn.
//!
//! # Vertex Layout
//!
//! Attributes are interleaved into [`Vertex`] on upload (48 bytes per vertex):
//!
//! | Attribute | Format    | Offset | Shader Location | Default when absent |
//! |-----------|-----------|--------|-----------------|---------------------|
//! | position  | Float32x3 | 0      | 0               | required            |
//! | normal    | Float32x3 | 12     | 1               | `(0, 0, 1)`         |
//! | uv        | Float32x2 | 24     | 2               | `(0, 0)`            |
//! | color     | Float32x4 | 32     | 3               | white               |

use glam::{Mat4, Vec3};

/// Primitive topology of a [`Geometry`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    Points,
}

impl Topology {
    pub fn is_strip(self) -> bool {
        matches!(self, Topology::TriangleStrip | Topology::LineStrip)
    }
}

impl From<Topology> for wgpu::PrimitiveTopology {
    fn from(t: Topology) -> Self {
        match t {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Points => wgpu::PrimitiveTopology::PointList,
        }
    }
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    /// The wgpu vertex buffer layout for [`Vertex`].
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Axis-aligned box around all eight corners after transforming by `m`.
    pub fn transformed(&self, m: Mat4) -> Self {
        let corners = self.corners().map(|c| m.transform_point3(c));
        // Eight corners always produce a box.
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// Geometry descriptor: flat attribute arrays plus an optional index array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    /// `x, y, z` triples.
    pub positions: Vec<f32>,
    /// `x, y, z` triples, one per vertex.
    pub normals: Option<Vec<f32>>,
    /// `u, v` pairs, one per vertex.
    pub uvs: Option<Vec<f32>>,
    /// `r, g, b, a` quads (or `r, g, b` triples), one per vertex.
    pub colors: Option<Vec<f32>>,
    pub indices: Option<Vec<u32>>,
    pub draw_mode: Topology,
}

impl Geometry {
    pub fn new(positions: Vec<f32>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn normals(mut self, normals: Vec<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn colors(mut self, colors: Vec<f32>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn draw_mode(mut self, mode: Topology) -> Self {
        self.draw_mode = mode;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    /// Number of elements a draw call submits: indices when indexed, vertices otherwise.
    pub fn element_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len(),
            None => self.vertex_count(),
        }
    }

    fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    /// Local-space bounds of all positions.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points((0..self.vertex_count()).map(|i| self.position(i)))
    }

    /// Interleave the attribute arrays, filling absent or short arrays with defaults.
    pub fn vertices(&self) -> Vec<Vertex> {
        let count = self.vertex_count();
        let color_stride = match &self.colors {
            Some(c) if count > 0 && c.len() == count * 3 => 3,
            _ => 4,
        };

        (0..count)
            .map(|i| {
                let normal = self
                    .normals
                    .as_ref()
                    .and_then(|n| n.get(i * 3..i * 3 + 3))
                    .map(|n| [n[0], n[1], n[2]])
                    .unwrap_or([0.0, 0.0, 1.0]);
                let uv = self
                    .uvs
                    .as_ref()
                    .and_then(|t| t.get(i * 2..i * 2 + 2))
                    .map(|t| [t[0], t[1]])
                    .unwrap_or([0.0, 0.0]);
                let color = self
                    .colors
                    .as_ref()
                    .and_then(|c| c.get(i * color_stride..i * color_stride + color_stride))
                    .map(|c| [c[0], c[1], c[2], if color_stride == 4 { c[3] } else { 1.0 }])
                    .unwrap_or([1.0; 4]);

                Vertex {
                    position: self.position(i).to_array(),
                    normal,
                    uv,
                    color,
                }
            })
            .collect()
    }

    /// A single triangle in the XY plane, non-indexed.
    pub fn triangle() -> Self {
        Geometry::new(vec![0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0])
            .normals(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0])
            .uvs(vec![0.5, 0.0, 0.0, 1.0, 1.0, 1.0])
    }

    /// A `size × size` plane on the XZ axis with normals pointing up.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        Geometry::new(vec![-h, 0.0, -h, h, 0.0, -h, h, 0.0, h, -h, 0.0, h])
            .normals([0.0f32, 1.0, 0.0].repeat(4))
            .uvs(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
            .indices(vec![0, 2, 1, 2, 0, 3])
    }

    /// A unit cube centered at the origin, four vertices per face.
    pub fn cube() -> Self {
        // (normal, tangent u, tangent v) per face
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ];

        let mut positions = Vec::with_capacity(72);
        let mut normals = Vec::with_capacity(72);
        let mut uvs = Vec::with_capacity(48);
        let mut indices = Vec::with_capacity(36);

        for (face, (n, u, v)) in faces.iter().enumerate() {
            let (n, u, v) = (Vec3::from(*n), Vec3::from(*u), Vec3::from(*v));
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (n + u * su + v * sv) * 0.5;
                positions.extend_from_slice(&p.to_array());
                normals.extend_from_slice(&n.to_array());
                uvs.extend_from_slice(&[(su + 1.0) * 0.5, (1.0 - sv) * 0.5]);
            }
            let base = face as u32 * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Geometry::new(positions)
            .normals(normals)
            .uvs(uvs)
            .indices(indices)
    }
}
