//! Triangle meshes.
//!
//! A [`Mesh`] is plain CPU data: vertices, faces, and per-face material
//! references. Meshes are shared between scene nodes through [`MeshRef`] and
//! are read-only while a frame renders.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::errors::{RasterError, Result};
use crate::resources::material::MaterialRef;

pub type MeshRef = Arc<Mesh>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    #[must_use]
    pub const fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position, normal, uv }
    }
}

/// Three vertex indices (counter-clockwise when seen from the front) and the
/// material they are shaded with.
#[derive(Debug, Clone)]
pub struct Face {
    pub indices: [u32; 3],
    pub material: MaterialRef,
}

impl Face {
    #[must_use]
    pub fn new(indices: [u32; 3], material: MaterialRef) -> Self {
        Self { indices, material }
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    /// Shade every face with its geometric normal instead of the vertex
    /// normals.
    pub flat_shading: bool,
}

impl Mesh {
    /// Builds a mesh, checking every face index against the vertex list.
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, faces: Vec<Face>) -> Result<Self> {
        validate(&vertices, &faces)?;
        Ok(Self {
            name: name.into(),
            vertices,
            faces,
            flat_shading: false,
        })
    }

    #[must_use]
    pub fn with_flat_shading(mut self, flat: bool) -> Self {
        self.flat_shading = flat;
        self
    }

    #[must_use]
    pub fn shared(self) -> MeshRef {
        Arc::new(self)
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Mutable vertex access. Indices cannot be broken through it.
    #[inline]
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// Replaces the faces after validating them.
    pub fn set_faces(&mut self, faces: Vec<Face>) -> Result<()> {
        validate(&self.vertices, &faces)?;
        self.faces = faces;
        Ok(())
    }

    /// Recomputes vertex normals as the area-weighted average of the
    /// adjacent face normals.
    pub fn recompute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for face in &self.faces {
            let [a, b, c] = face.indices.map(|i| i as usize);
            let pa = self.vertices[a].position;
            let n = (self.vertices[b].position - pa).cross(self.vertices[c].position - pa);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(acc) {
            vertex.normal = n.normalize_or_zero();
        }
    }
}

fn validate(vertices: &[Vertex], faces: &[Face]) -> Result<()> {
    for (face_index, face) in faces.iter().enumerate() {
        if let Some(&index) = face.indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RasterError::FaceIndexOutOfRange {
                face: face_index,
                index,
                vertex_count: vertices.len(),
            });
        }
    }
    Ok(())
}
