//! First-person look control with pointer lock.
//!
//! [`LookControl`] owns the player's eye position and orientation. Mouse look
//! only applies while the control is locked (the cursor is captured), and
//! lock changes are queued as [`LockChange`] notifications so the session can
//! react to them (show the pause overlay, stop movement).
//!
//! Movement helpers are horizontal and yaw-relative: pitch never tilts a
//! step into the floor or the sky.
//!
//! # Example
//!
//! ```
//! use batikwalk::{LookControl, Vec3};
//!
//! let mut look = LookControl::new()
//!     .position(Vec3::new(0.0, 13.0, 0.0))
//!     .pitch(-0.3);
//!
//! look.lock();
//! look.move_forward(2.0);
//! assert!((look.position - Vec3::new(0.0, 13.0, -2.0)).length() < 1e-5);
//! ```

use glam::Vec3;

use crate::camera::Camera;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// A change of the pointer-lock state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockChange {
    /// The cursor was captured; look and movement are live.
    Locked,
    /// The cursor was released.
    Unlocked,
}

/// Yaw/pitch look control with pointer-lock state.
#[derive(Clone, Debug)]
pub struct LookControl {
    /// Eye position.
    pub position: Vec3,
    /// Horizontal angle in radians (yaw). 0 = looking toward -Z.
    pub yaw: f32,
    /// Vertical angle in radians (pitch). 0 = horizontal, positive = up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Mouse sensitivity in radians per pixel.
    pub sensitivity: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    locked: bool,
    changes: Vec<LockChange>,
}

impl Default for LookControl {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov: 75.0_f32.to_radians(),
            sensitivity: 0.002,
            near: 0.1,
            far: 2000.0,
            locked: false,
            changes: Vec::new(),
        }
    }
}

impl LookControl {
    /// Create an unlocked look control at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the eye position.
    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    /// Set the initial yaw in radians.
    pub fn yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    /// Set the initial pitch in radians.
    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self
    }

    /// Set the field of view in degrees.
    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    /// Set mouse sensitivity.
    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set near and far clipping planes.
    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Capture the pointer. Queues [`LockChange::Locked`] if it wasn't locked.
    pub fn lock(&mut self) {
        if !self.locked {
            self.locked = true;
            self.changes.push(LockChange::Locked);
        }
    }

    /// Release the pointer. Queues [`LockChange::Unlocked`] if it was locked.
    pub fn unlock(&mut self) {
        if self.locked {
            self.locked = false;
            self.changes.push(LockChange::Unlocked);
        }
    }

    /// Returns true while the pointer is captured.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Drain the queued lock notifications, oldest first.
    pub fn take_lock_changes(&mut self) -> Vec<LockChange> {
        std::mem::take(&mut self.changes)
    }

    /// Apply a raw mouse movement. Ignored while unlocked.
    pub fn apply_mouse_delta(&mut self, dx: f32, dy: f32) {
        if !self.locked {
            return;
        }
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Unit view direction from yaw and pitch.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
        .normalize_or_zero()
    }

    /// Horizontal forward direction, ignoring pitch.
    pub fn forward_horizontal(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Horizontal right direction.
    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Move along the horizontal view direction.
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.forward_horizontal() * distance;
    }

    /// Strafe along the horizontal right direction.
    pub fn move_right(&mut self, distance: f32) {
        self.position += self.right() * distance;
    }

    /// Get the current camera state.
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.position,
            forward: self.forward(),
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_changes_are_queued_once() {
        let mut look = LookControl::new();

        look.lock();
        look.lock();
        look.unlock();
        look.unlock();

        assert_eq!(look.take_lock_changes(), vec![LockChange::Locked, LockChange::Unlocked]);
        assert!(look.take_lock_changes().is_empty());
        assert!(!look.is_locked());
    }

    #[test]
    fn mouse_look_requires_lock() {
        let mut look = LookControl::new();

        look.apply_mouse_delta(100.0, 50.0);
        assert_eq!(look.yaw, 0.0);
        assert_eq!(look.pitch, 0.0);

        look.lock();
        look.apply_mouse_delta(100.0, 50.0);
        assert!((look.yaw - 0.2).abs() < 1e-6);
        assert!((look.pitch + 0.1).abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut look = LookControl::new();
        look.lock();
        look.apply_mouse_delta(0.0, -100_000.0);

        assert!(look.pitch < std::f32::consts::FRAC_PI_2);
        assert!(look.forward().y > 0.99);
    }

    #[test]
    fn movement_stays_horizontal_when_pitched() {
        let mut look = LookControl::new().pitch(-0.8).yaw(std::f32::consts::FRAC_PI_2);

        look.move_forward(3.0);
        look.move_right(1.0);

        assert!((look.position - Vec3::new(3.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn camera_looks_along_forward() {
        let look = LookControl::new().position(Vec3::new(1.0, 2.0, 3.0)).pitch(-0.3);
        let camera = look.camera();

        assert_eq!(camera.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((camera.forward.y - (-0.3_f32).sin()).abs() < 1e-6);
        assert!(camera.forward.z < 0.0);
    }
}
