//! Triangle rasterizer.
//!
//! Scan-converts one [`Triangle`] at a time with edge functions, walking the
//! bounding box in 2x2 pixel quads so each fragment gets UV derivatives
//! from its neighbours. Barycentric weights are normalised by the signed
//! area (so both windings work) and made perspective-correct by dividing
//! by each vertex's `w` and renormalising.
//!
//! What happens to a fragment that survives the depth test depends on the
//! [`RasterPass`]:
//!
//! | Pass        | Depth write | Color                                      |
//! |-------------|-------------|--------------------------------------------|
//! | `Immediate` | opaque only | shaded now, over the current framebuffer  |
//! | `Deferred`  | yes         | fragment stored in the gBuffer             |
//! | `Shadow`    | yes         | none                                       |
//!
//! Transparent triangles always go through `Immediate`.

use glam::{UVec2, Vec2, Vec3};

use crate::color::Color;
use crate::math::{edge_function, ndc_to_pixel};
use crate::renderer::fragment::Fragment;
use crate::renderer::geometry::{FrameView, Triangle};
use crate::renderer::shading::ShadingContext;
use crate::renderer::target::RenderTarget;
use crate::resources::material::Material;
use crate::resources::texture::UvSample;
use crate::scene::SceneSettings;

/// Fragments whose resolved base alpha is below this are discarded.
pub const ALPHA_CUTOFF: f32 = 0.5;

/// Sample offsets of a 2x2 quad: top-left, top-right, bottom-left,
/// bottom-right.
const QUAD: [UVec2; 4] = [UVec2::new(0, 0), UVec2::new(1, 0), UVec2::new(0, 1), UVec2::new(1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterPass {
    Immediate,
    Deferred,
    /// Depth only, front faces culled.
    Shadow,
}

/// Interpolated attributes of one quad sample.
#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    inside: bool,
    inv_depth: f32,
    weights: [f32; 3],
    uv: Vec2,
}

pub struct Rasterizer<'a> {
    pub pass: RasterPass,
    pub view: &'a FrameView,
    pub settings: &'a SceneSettings,
    /// Lighting for immediate shading. Without it fragments get their base
    /// color, as in full-bright mode.
    pub shading: Option<&'a ShadingContext<'a>>,
    /// Overlay color when wireframe is on.
    pub wireframe: Option<Color>,
}

impl<'a> Rasterizer<'a> {
    #[must_use]
    pub fn new(pass: RasterPass, view: &'a FrameView, settings: &'a SceneSettings) -> Self {
        Self { pass, view, settings, shading: None, wireframe: None }
    }

    #[must_use]
    pub fn with_shading(mut self, shading: &'a ShadingContext<'a>) -> Self {
        self.shading = Some(shading);
        self
    }

    #[must_use]
    pub fn with_wireframe(mut self, color: Color) -> Self {
        self.wireframe = Some(color);
        self
    }

    /// Whether culling removes `tri` in this pass.
    #[must_use]
    pub fn is_culled(&self, tri: &Triangle) -> bool {
        let material = &tri.material;
        if !self.settings.back_face_culling || material.is_transparent() || material.is_double_sided() {
            return false;
        }
        let back = self.settings.front_face.is_back(tri.clockwise);
        if self.pass == RasterPass::Shadow { !back } else { back }
    }

    /// Conservative reject: all three vertices outside one frustum plane.
    #[must_use]
    pub fn is_outside_frustum(&self, tri: &Triangle) -> bool {
        let s = [tri.screen(0), tri.screen(1), tri.screen(2)];
        let all = |outside: &dyn Fn(Vec3) -> bool| s.iter().all(|&v| outside(v));
        all(&|v| v.x < -1.0)
            || all(&|v| v.x > 1.0)
            || all(&|v| v.y < -1.0)
            || all(&|v| v.y > 1.0)
            || all(&|v| v.z < self.view.near)
            || all(&|v| v.z > self.view.far)
    }

    /// Rasterizes one triangle; returns how many fragments passed the depth
    /// test.
    pub fn rasterize(&self, tri: &Triangle, target: &mut RenderTarget) -> usize {
        if self.is_culled(tri) || self.is_outside_frustum(tri) {
            return 0;
        }

        let material: &Material = &tri.material;
        let size = target.size();
        let size_f = size.as_vec2();
        let p = [0, 1, 2].map(|i| ndc_to_pixel(tri.screen(i).truncate(), size_f));
        let w = [0, 1, 2].map(|i| tri.screen(i).z);

        if let Some(color) = self.wireframe.filter(|_| self.pass != RasterPass::Shadow) {
            target.push_line(p[0], p[1], color);
            target.push_line(p[1], p[2], color);
            target.push_line(p[2], p[0], color);
        }

        let area = edge_function(p[0], p[1], p[2]);
        if !(area.abs() > 0.0) {
            return 0;
        }
        let inv_area = 1.0 / area;

        let (tangent, bitangent) = if material.needs_tbn() {
            tangent_frame(tri)
        } else {
            (Vec3::ZERO, Vec3::ZERO)
        };

        let back_face = self.settings.front_face.is_back(tri.clockwise);
        let inv_near = 1.0 / self.view.near;
        let inv_far = 1.0 / self.view.far;

        let lo = p[0].min(p[1]).min(p[2]).floor().max(Vec2::ZERO);
        let hi = p[0].max(p[1]).max(p[2]).ceil().min(size_f - 1.0);
        let (x0, y0) = ((lo.x as u32) & !1, (lo.y as u32) & !1);
        let (x1, y1) = (hi.x as u32, hi.y as u32);

        let sample_at = |px: u32, py: u32| -> Sample {
            let c = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
            let (weights, inv_depth) = perspective_weights(&p, &w, inv_area, c);
            let uv = tri.vertices[0].uv * weights[0] + tri.vertices[1].uv * weights[1] + tri.vertices[2].uv * weights[2];
            Sample {
                inside: weights.iter().all(|&v| v >= 0.0),
                inv_depth,
                weights,
                uv,
            }
        };

        let mut written = 0;
        let mut y = y0;
        while y <= y1 {
            let mut x = x0;
            while x <= x1 {
                let samples = QUAD.map(|o| sample_at(x + o.x, y + o.y));
                let duv_dx = samples[1].uv - samples[0].uv;
                let duv_dy = samples[2].uv - samples[0].uv;

                for (offset, sample) in QUAD.iter().zip(&samples) {
                    let pixel = UVec2::new(x, y) + *offset;
                    if !sample.inside || pixel.x >= size.x || pixel.y >= size.y {
                        continue;
                    }
                    if !(sample.inv_depth >= inv_far && sample.inv_depth <= inv_near) {
                        continue;
                    }

                    let uv = UvSample { uv: sample.uv, duv_dx, duv_dy };
                    let fragment = Fragment {
                        pixel,
                        inv_depth: sample.inv_depth,
                        world_position: weighted(sample.weights, tri.vertices.map(|v| v.world)),
                        normal: weighted(sample.weights, tri.vertices.map(|v| v.normal)),
                        tangent,
                        bitangent,
                        uv,
                        base_color: Color::TRANSPARENT,
                        face: tri.face,
                        material: None,
                        back_face,
                        valid: true,
                    };
                    if self.write_fragment(fragment, tri, target) {
                        written += 1;
                    }
                }
                x += 2;
            }
            y += 2;
        }
        written
    }

    fn write_fragment(&self, mut fragment: Fragment, tri: &Triangle, target: &mut RenderTarget) -> bool {
        let material: &Material = &tri.material;
        let transparent = material.is_transparent();
        let cutout = material.is_alpha_cutout();

        let resolve = match self.pass {
            RasterPass::Immediate => true,
            RasterPass::Deferred | RasterPass::Shadow => cutout,
        };
        if resolve {
            fragment.base_color = material.base_color(&fragment.uv);
            if !(fragment.base_color.a >= ALPHA_CUTOFF) {
                return false;
            }
        }

        let index = target.index(fragment.pixel.x, fragment.pixel.y);
        if !(fragment.inv_depth > target.z_buffer[index]) {
            return false;
        }
        if !transparent {
            target.z_buffer[index] = fragment.inv_depth;
        }

        match self.pass {
            RasterPass::Shadow => {}
            RasterPass::Deferred => {
                fragment.material = Some(tri.material.clone());
                target.gbuffer[index] = fragment;
            }
            RasterPass::Immediate => {
                let previous = target.framebuffer[index];
                target.framebuffer[index] = match self.shading {
                    Some(ctx) if !self.settings.full_bright => material.shade(&fragment, previous, ctx),
                    _ => unlit(material, &fragment, previous),
                };
            }
        }
        true
    }
}

/// Full-bright output: the base color, alpha-blended when transparent.
pub(crate) fn unlit(material: &Material, fragment: &Fragment, previous: Color) -> Color {
    let base = fragment.base_color;
    if material.is_transparent() {
        previous.lerp(base, base.a).with_alpha(1.0)
    } else {
        base.with_alpha(1.0)
    }
}

/// Perspective-correct barycentric weights of pixel-space point `c` and the
/// interpolated inverse depth. `inv_area` is the reciprocal of the signed
/// doubled area, so either winding yields positive weights inside.
#[inline]
fn perspective_weights(p: &[Vec2; 3], w: &[f32; 3], inv_area: f32, c: Vec2) -> ([f32; 3], f32) {
    let b = [
        edge_function(p[1], p[2], c) * inv_area,
        edge_function(p[2], p[0], c) * inv_area,
        edge_function(p[0], p[1], c) * inv_area,
    ];
    let q = [b[0] / w[0], b[1] / w[1], b[2] / w[2]];
    let inv_depth = q[0] + q[1] + q[2];
    (q.map(|v| v / inv_depth), inv_depth)
}

#[inline]
fn weighted(weights: [f32; 3], values: [Vec3; 3]) -> Vec3 {
    values[0] * weights[0] + values[1] * weights[1] + values[2] * weights[2]
}

/// Triangle-constant tangent and bitangent from positions and UVs.
fn tangent_frame(tri: &Triangle) -> (Vec3, Vec3) {
    let [a, b, c] = &tri.vertices;
    let (e1, e2) = (b.world - a.world, c.world - a.world);
    let (d1, d2) = (b.uv - a.uv, c.uv - a.uv);

    let det = d1.x * d2.y - d2.x * d1.y;
    if !(det.abs() > f32::EPSILON) {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let r = 1.0 / det;
    let tangent = ((e1 * d2.y - e2 * d1.y) * r).normalize_or_zero();
    let bitangent = ((e2 * d1.x - e1 * d2.x) * r).normalize_or_zero();
    (tangent, bitangent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_partition(p: [Vec2; 3], w: [f32; 3]) {
        let inv_area = 1.0 / edge_function(p[0], p[1], p[2]);
        // Interior points as convex combinations of the corners.
        let mixes = [[0.2, 0.3, 0.5], [0.6, 0.2, 0.2], [0.1, 0.1, 0.8], [1.0 / 3.0; 3]];
        for m in mixes {
            let c = p[0] * m[0] + p[1] * m[1] + p[2] * m[2];
            let (weights, inv_depth) = perspective_weights(&p, &w, inv_area, c);
            assert!(weights.iter().all(|&v| (0.0..=1.0).contains(&v)), "{weights:?}");
            assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-5, "{weights:?}");
            assert!(inv_depth >= 1.0 / w[0].max(w[1]).max(w[2]) - 1e-6);
            assert!(inv_depth <= 1.0 / w[0].min(w[1]).min(w[2]) + 1e-6);
        }
    }

    #[test]
    fn perspective_weights_partition_unity() {
        let p = [Vec2::new(2.0, 3.0), Vec2::new(29.0, 7.0), Vec2::new(11.0, 26.0)];
        check_partition(p, [1.5, 9.0, 40.0]);
    }

    #[test]
    fn perspective_weights_ignore_winding() {
        let p = [Vec2::new(2.0, 3.0), Vec2::new(11.0, 26.0), Vec2::new(29.0, 7.0)];
        check_partition(p, [0.5, 3.0, 12.0]);
    }

    #[test]
    fn perspective_weights_hit_the_corners() {
        let p = [Vec2::new(0.0, 0.0), Vec2::new(16.0, 0.0), Vec2::new(0.0, 16.0)];
        let w = [2.0, 8.0, 4.0];
        let inv_area = 1.0 / edge_function(p[0], p[1], p[2]);
        for (i, &corner) in p.iter().enumerate() {
            let (weights, inv_depth) = perspective_weights(&p, &w, inv_area, corner);
            assert!((weights[i] - 1.0).abs() < 1e-5);
            assert!((inv_depth - 1.0 / w[i]).abs() < 1e-6);
        }
    }
}
