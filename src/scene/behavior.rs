//! Per-node behaviors.
//!
//! Behaviors are the scriptable part of a node: they get a `pre_update`
//! call before the node's matrices are rebuilt (so they can move the node
//! this frame) and an `update` call afterwards (with fresh world matrices).

use std::fmt::Debug;

use bitflags::bitflags;
use glam::{EulerRot, Quat, Vec3};

use crate::scene::transform::Transform;

bitflags! {
    /// Logical keys a [`KeyboardControl`] reacts to. The window layer maps
    /// physical keys onto these.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Keys: u32 {
        const FORWARD    = 1 << 0;
        const BACK       = 1 << 1;
        const LEFT       = 1 << 2;
        const RIGHT      = 1 << 3;
        const UP         = 1 << 4;
        const DOWN       = 1 << 5;
        const TURN_LEFT  = 1 << 6;
        const TURN_RIGHT = 1 << 7;
    }
}

/// Input snapshot for the current frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub pressed: Keys,
}

impl InputState {
    #[inline]
    #[must_use]
    pub fn is_pressed(&self, keys: Keys) -> bool {
        self.pressed.contains(keys)
    }
}

/// Per-frame data handed to behaviors.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Seconds since the previous update.
    pub dt: f32,
    pub input: &'a InputState,
}

/// A behavior attached to a scene node.
pub trait Behavior: Debug + Send + Sync {
    /// Runs before the node's local and world matrices are rebuilt.
    fn pre_update(&mut self, _transform: &mut Transform, _ctx: &UpdateContext<'_>) {}

    /// Runs after the node's world matrices are up to date, before its
    /// children are visited.
    fn update(&mut self, _transform: &mut Transform, _ctx: &UpdateContext<'_>) {}
}

/// Spins a node at a constant angular velocity (XYZ Euler rates, rad/s).
#[derive(Debug, Clone)]
pub struct Rotator {
    pub angular_velocity: Vec3,
}

impl Rotator {
    #[must_use]
    pub fn new(angular_velocity: Vec3) -> Self {
        Self { angular_velocity }
    }
}

impl Behavior for Rotator {
    fn pre_update(&mut self, transform: &mut Transform, ctx: &UpdateContext<'_>) {
        let step = self.angular_velocity * ctx.dt;
        let delta = Quat::from_euler(EulerRot::XYZ, step.x, step.y, step.z);
        transform.rotation = (transform.rotation * delta).normalize();
    }
}

/// Moves a node in its own frame from the keys in [`InputState`].
#[derive(Debug, Clone)]
pub struct KeyboardControl {
    /// Units per second.
    pub speed: f32,
    /// Radians per second around world Y.
    pub turn_speed: f32,
}

impl Default for KeyboardControl {
    fn default() -> Self {
        Self { speed: 2.0, turn_speed: 1.5 }
    }
}

impl Behavior for KeyboardControl {
    fn pre_update(&mut self, transform: &mut Transform, ctx: &UpdateContext<'_>) {
        let input = ctx.input;
        let axis = |pos: Keys, neg: Keys| {
            f32::from(u8::from(input.is_pressed(pos))) - f32::from(u8::from(input.is_pressed(neg)))
        };

        let turn = axis(Keys::TURN_LEFT, Keys::TURN_RIGHT);
        if turn != 0.0 {
            let yaw = Quat::from_rotation_y(turn * self.turn_speed * ctx.dt);
            transform.rotation = (yaw * transform.rotation).normalize();
        }

        let local = Vec3::new(
            axis(Keys::RIGHT, Keys::LEFT),
            axis(Keys::UP, Keys::DOWN),
            axis(Keys::BACK, Keys::FORWARD),
        );
        if local != Vec3::ZERO {
            transform.position += transform.rotation * local.normalize() * self.speed * ctx.dt;
        }
    }
}
