//! # Object Geometry
//!
//! Objects own meshes; a mesh owns a shared vertex list and the volumes
//! that partition its triangles.

use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// A mesh vertex.
///
/// The optional normal is curvature metadata: the subdivision engine bends
/// edges whose endpoints both carry one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: Option<DVec3>,
    pub color: Option<Color>,
}

impl Vertex {
    /// A bare vertex at `position`.
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            normal: None,
            color: None,
        }
    }

    /// Attaches a normal (normalized, dropped if degenerate).
    pub fn with_normal(mut self, normal: DVec3) -> Self {
        self.normal = normal.try_normalize();
        self
    }

    /// Attaches a surface color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Texture coordinates of one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TexMap {
    /// Index into the Document's textures.
    pub texture: usize,
    /// UV per triangle corner.
    pub uv: [DVec2; 3],
}

/// A triangle referencing three vertices of its mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [u32; 3],
    pub tex_map: Option<TexMap>,
}

impl Triangle {
    pub fn new(v0: u32, v1: u32, v2: u32) -> Self {
        Self {
            indices: [v0, v1, v2],
            tex_map: None,
        }
    }
}

/// A closed region of a mesh made of one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    /// Material index, `None` when unassigned.
    pub material: Option<usize>,
    /// Color override for the whole volume.
    pub color: Option<Color>,
    pub triangles: Vec<Triangle>,
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// Vertices shared by the volumes of one mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub volumes: Vec<Volume>,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex and returns its index.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Total triangles over all volumes.
    pub fn triangle_count(&self) -> usize {
        self.volumes.iter().map(Volume::triangle_count).sum()
    }

    /// True when the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    /// Corner positions of a triangle.
    pub fn corners(&self, triangle: &Triangle) -> [DVec3; 3] {
        triangle.indices.map(|i| self.vertices[i as usize].position)
    }

    /// Axis-aligned bounding box of the vertices, or `None` when empty.
    pub fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        let mut iter = self.vertices.iter().map(|v| v.position);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Checks every triangle index against the vertex list.
    pub fn validate(&self) -> bool {
        let count = self.vertices.len() as u32;
        self.volumes
            .iter()
            .flat_map(|v| &v.triangles)
            .all(|t| t.indices.iter().all(|&i| i < count))
    }

    /// Moves every vertex by `offset`.
    pub fn translate(&mut self, offset: DVec3) {
        for v in &mut self.vertices {
            v.position += offset;
        }
    }

    /// Applies a linear map to positions; normals use the inverse transpose.
    pub(crate) fn apply_linear(&mut self, matrix: DMat3) {
        let normal_matrix = matrix.inverse().transpose();
        for v in &mut self.vertices {
            v.position = matrix * v.position;
            if let Some(n) = v.normal {
                v.normal = (normal_matrix * n).try_normalize();
            }
        }
    }
}

/// A named printable part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    /// Bounding box over all meshes, or `None` when the object has no vertices.
    pub fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        self.meshes
            .iter()
            .filter_map(Mesh::bounding_box)
            .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
    }
}
