use glam::{Mat4, Vec3};

/// A simple camera for 3D scenes.
///
/// Provides position, orientation, field of view and clip planes.
/// Produced each frame by [`LookControl::camera`](crate::LookControl::camera).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov: f32, // vertical, radians
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: 75.0_f32.to_radians(),
            near: 0.1,
            far: 2000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.forward = (target - self.position).normalize_or_zero();
        self
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// World-to-view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Perspective projection with `[0, 1]` depth, as wgpu expects.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect.max(f32::EPSILON), self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_is_positive_x_when_looking_down_negative_z() {
        let camera = Camera::new();
        assert!((camera.right() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn view_matrix_moves_forward_point_onto_negative_z() {
        let camera = Camera::new().at(Vec3::new(1.0, 2.0, 3.0)).looking_at(Vec3::new(1.0, 2.0, -7.0));
        let p = camera.view_matrix().transform_point3(Vec3::new(1.0, 2.0, -7.0));
        assert!((p - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-4);
    }
}
