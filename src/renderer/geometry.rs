//! Geometry stage.
//!
//! Projects every visible mesh into screen space and splits its faces into
//! the opaque and transparent triangle lists the rasterizer consumes.

use glam::{Affine3A, Mat4, UVec2, Vec2, Vec3};

use crate::math::{perspective, project_point};
use crate::resources::material::MaterialRef;
use crate::scene::camera::Camera;
use crate::scene::{NodeHandle, Scene};

/// Camera parameters for one frame (or one shadow-map pass).
#[derive(Debug, Clone, Copy)]
pub struct FrameView {
    pub view_projection: Mat4,
    pub inverse_view_projection: Mat4,
    pub camera_position: Vec3,
    pub near: f32,
    pub far: f32,
    pub size: UVec2,
}

impl FrameView {
    /// `world` places the eye; it looks down its local `-Z`.
    #[must_use]
    pub fn new(world: &Affine3A, fov_y: f32, near: f32, far: f32, size: UVec2) -> Self {
        let view = Mat4::from(*world).inverse();
        let projection = perspective(fov_y, aspect_ratio(size), near, far);
        Self::from_matrices(&view, &projection, Vec3::from(world.translation), near, far, size)
    }

    /// Uses the view matrix the transform system cached on `camera`.
    #[must_use]
    pub fn from_camera(camera: &Camera, size: UVec2) -> Self {
        let projection = camera.projection_matrix(aspect_ratio(size));
        Self::from_matrices(camera.view_matrix(), &projection, camera.position(), camera.near, camera.far, size)
    }

    fn from_matrices(view: &Mat4, projection: &Mat4, camera_position: Vec3, near: f32, far: f32, size: UVec2) -> Self {
        let view_projection = *projection * *view;
        Self {
            view_projection,
            inverse_view_projection: view_projection.inverse(),
            camera_position,
            near,
            far,
            size,
        }
    }

    /// Screen-space `(ndc.x, ndc.y, w)` of a world point.
    #[inline]
    #[must_use]
    pub fn project(&self, point: Vec3) -> Vec3 {
        project_point(&self.view_projection, point)
    }

    /// World point on the far plane behind a pixel-space position.
    #[must_use]
    pub fn far_point(&self, pixel: Vec2) -> Vec3 {
        let ndc_x = pixel.x / self.size.x as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - pixel.y / self.size.y as f32 * 2.0;
        self.inverse_view_projection.project_point3(Vec3::new(ndc_x, ndc_y, 1.0))
    }

    /// Unit view ray through a pixel-space position.
    #[must_use]
    pub fn view_direction(&self, pixel: Vec2) -> Vec3 {
        (self.far_point(pixel) - self.camera_position).normalize_or_zero()
    }
}

fn aspect_ratio(size: UVec2) -> f32 {
    size.x.max(1) as f32 / size.y.max(1) as f32
}

/// A mesh vertex after the geometry stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectedVertex {
    /// `(ndc.x, ndc.y, w)`.
    pub screen: Vec3,
    pub world: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [ProjectedVertex; 3],
    pub material: MaterialRef,
    pub node: NodeHandle,
    pub face: usize,
    /// Screen-space winding; which winding is culled is decided later.
    pub clockwise: bool,
}

impl Triangle {
    #[inline]
    #[must_use]
    pub fn screen(&self, i: usize) -> Vec3 {
        self.vertices[i].screen
    }

    /// Mean linear depth of the three vertices.
    #[must_use]
    pub fn average_depth(&self) -> f32 {
        (self.vertices[0].screen.z + self.vertices[1].screen.z + self.vertices[2].screen.z) / 3.0
    }
}

#[derive(Debug, Clone)]
pub struct TransparentTriangle {
    pub triangle: Triangle,
    /// Sort key, see [`Triangle::average_depth`].
    pub depth: f32,
}

#[derive(Debug, Default)]
pub struct TriangleLists {
    pub opaque: Vec<Triangle>,
    pub transparent: Vec<TransparentTriangle>,
}

impl TriangleLists {
    /// Orders transparent triangles far to near.
    pub fn sort_transparent(&mut self) {
        self.transparent.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Screen winding of three `(ndc.x, ndc.y, _)` points (NDC y is up).
#[inline]
fn is_clockwise(a: Vec3, b: Vec3, c: Vec3) -> bool {
    let ab = b.truncate() - a.truncate();
    let ac = c.truncate() - a.truncate();
    ab.perp_dot(ac) < 0.0
}

/// Runs the geometry stage for every visible mesh in `scene`.
///
/// With `opaque_only` transparent faces are dropped (shadow passes).
#[must_use]
pub fn build_triangles(scene: &Scene, view: &FrameView, opaque_only: bool) -> TriangleLists {
    let mut lists = TriangleLists::default();
    let mut projected: Vec<ProjectedVertex> = Vec::new();

    for (node, mesh, transform) in scene.iter_meshes() {
        let world = transform.world_matrix();
        let rotation = transform.world_rotation();

        projected.clear();
        projected.extend(mesh.vertices().iter().map(|v| {
            let world_position = world.transform_point3(v.position);
            ProjectedVertex {
                screen: view.project(world_position),
                world: world_position,
                normal: rotation * v.normal,
                uv: v.uv,
            }
        }));

        for (face_index, face) in mesh.faces().iter().enumerate() {
            let transparent = face.material.is_transparent();
            if transparent && opaque_only {
                continue;
            }

            let [i0, i1, i2] = face.indices.map(|i| i as usize);
            let mut vertices = [projected[i0], projected[i1], projected[i2]];
            if mesh.flat_shading {
                let n = (vertices[1].world - vertices[0].world)
                    .cross(vertices[2].world - vertices[0].world)
                    .normalize_or_zero();
                for v in &mut vertices {
                    v.normal = n;
                }
            }

            let triangle = Triangle {
                clockwise: is_clockwise(vertices[0].screen, vertices[1].screen, vertices[2].screen),
                vertices,
                material: face.material.clone(),
                node,
                face: face_index,
            };

            if transparent {
                let depth = triangle.average_depth();
                lists.transparent.push(TransparentTriangle { triangle, depth });
            } else {
                lists.opaque.push(triangle);
            }
        }
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winding_follows_ndc_orientation() {
        let a = Vec3::new(0.0, 0.0, 1.0);
        let b = Vec3::new(1.0, 0.0, 1.0);
        let c = Vec3::new(0.0, 1.0, 1.0);
        assert!(!is_clockwise(a, b, c));
        assert!(is_clockwise(a, c, b));
    }

    #[test]
    fn far_point_reprojects_to_the_far_plane() {
        let view = FrameView::new(&Affine3A::IDENTITY, 1.0, 0.5, 50.0, UVec2::new(40, 20));
        let p = view.far_point(Vec2::new(10.0, 5.0));
        let s = view.project(p);
        assert!((s.z - 50.0).abs() < 1e-2);
        assert!((s.x + 0.5).abs() < 1e-4);
        assert!((s.y - 0.5).abs() < 1e-4);
    }
}
