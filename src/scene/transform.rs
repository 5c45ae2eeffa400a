use glam::{Affine3A, EulerRot, Mat3, Mat4, Quat, Vec3};

use crate::math::compose_trs;

/// Transform component.
///
/// Holds a node's local position / rotation / scale (TRS) together with the
/// cached matrices derived from them and the dirty-check state used to skip
/// recomputation.
///
/// Two world transforms are cached: the full affine transform (for
/// positions) and the rotation-only part (for normals and light
/// directions, which must not pick up scale or translation).
#[derive(Debug, Clone)]
pub struct Transform {
    // === Public properties ===
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    // === Matrix cache ===
    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,
    pub(crate) world_rotation: Quat,

    // === Dirty-check state ===
    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,
            world_rotation: Quat::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: Vec3::ONE,
            force_update: true,
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::new() }
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Rebuilds the local matrix if position, rotation or scale changed.
    ///
    /// Returns whether the matrix was rebuilt.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix = compose_trs(self.position, self.rotation, self.scale);

            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    /// Composes the cached local transform with the parent's world
    /// transforms.
    pub(crate) fn update_world(&mut self, parent_world: &Affine3A, parent_rotation: Quat) {
        self.world_matrix = *parent_world * self.local_matrix;
        self.world_rotation = (parent_rotation * self.rotation).normalize();
    }

    // ========================================================================
    // Getters & Helpers
    // ========================================================================

    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    /// Current rotation as XYZ Euler angles.
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.world_matrix)
    }

    /// Rotation-only part of the world transform.
    #[inline]
    #[must_use]
    pub fn world_rotation(&self) -> Quat {
        self.world_rotation
    }

    #[inline]
    #[must_use]
    pub fn world_rotation_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.world_rotation)
    }

    /// World-space position of the node origin.
    #[inline]
    #[must_use]
    pub fn global_position(&self) -> Vec3 {
        Vec3::from(self.world_matrix.translation)
    }

    /// World-space direction the node faces (its local `-Z`).
    #[inline]
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.world_rotation * Vec3::NEG_Z
    }

    /// Orients the transform so its `-Z` axis points at `target`.
    ///
    /// `target` and `up` are in the parent's coordinate system.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();

        if forward.cross(up).length_squared() < 1e-4 {
            return;
        }

        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward).normalize();

        let rot_mat = Mat3::from_cols(right, new_up, -forward);
        self.rotation = Quat::from_mat3(&rot_mat);
    }

    /// Forces the next update to rebuild the matrices.
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
