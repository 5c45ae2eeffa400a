//! Math helpers on top of `glam`.
//!
//! The rasterizer works with three coordinate spaces:
//!
//! | Space  | Description                                                     |
//! |--------|-----------------------------------------------------------------|
//! | World  | Right-handed, Y up. Cameras look down their local `-Z` axis.    |
//! | Screen | `(ndc.x, ndc.y, w)` where `w` is the linear camera-space depth. |
//! | Pixel  | `(0,0)` top-left, `y` grows downwards, samples at pixel centers.|
//!
//! Keeping `w` instead of a post-divide `z` means depth and the perspective
//! correction factor are the same number, which the rasterizer relies on.

use glam::{Affine3A, Mat4, Quat, Vec2, Vec3, Vec4};

/// Composes a scale → rotate → translate transform.
#[inline]
#[must_use]
pub fn compose_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Affine3A {
    Affine3A::from_scale_rotation_translation(scale, rotation, translation)
}

/// Right-handed perspective projection.
///
/// `fov_y` is the vertical field of view in radians. The resulting clip `w`
/// equals the positive distance in front of the camera.
#[inline]
#[must_use]
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y, aspect, near, far)
}

/// Projects a world-space point through `view_projection` into screen space.
///
/// Returns `(ndc.x, ndc.y, w)`. Points behind the camera get a negative `w`
/// and mirrored xy; callers reject those through the depth range check.
#[inline]
#[must_use]
pub fn project_point(view_projection: &Mat4, point: Vec3) -> Vec3 {
    let clip: Vec4 = *view_projection * point.extend(1.0);
    let inv_w = 1.0 / clip.w;
    Vec3::new(clip.x * inv_w, clip.y * inv_w, clip.w)
}

/// Maps NDC xy into pixel coordinates of a target of `size` pixels.
#[inline]
#[must_use]
pub fn ndc_to_pixel(ndc: Vec2, size: Vec2) -> Vec2 {
    Vec2::new((ndc.x + 1.0) * 0.5 * size.x, (1.0 - ndc.y) * 0.5 * size.y)
}

/// Signed doubled area of the parallelogram spanned by `(b - a)` and `(p - a)`.
///
/// Positive when `p` lies to the left of the directed edge `a → b` in a
/// y-up frame.
#[inline]
#[must_use]
pub fn edge_function(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Reflects `incident` about `normal` (`normal` must be unit length).
#[inline]
#[must_use]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * incident.dot(normal) * normal
}

/// Hermite smoothstep between `edge0` and `edge1`.
#[inline]
#[must_use]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Maps a unit direction onto equirectangular UV coordinates.
#[inline]
#[must_use]
pub fn direction_to_equirect(dir: Vec3) -> Vec2 {
    let u = 0.5 + dir.z.atan2(dir.x) / std::f32::consts::TAU;
    let v = 0.5 - dir.y.clamp(-1.0, 1.0).asin() / std::f32::consts::PI;
    Vec2::new(u, v)
}
