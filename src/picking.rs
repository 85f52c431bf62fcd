//! Rays and triangle-mesh colliders.
//!
//! This module is the geometric half of the spatial queries used by the
//! walkthrough. It includes:
//!
//! - [`Ray`]: A 3D ray with origin and direction, with AABB and triangle tests
//! - [`TriangleMesh`]: World-space triangles of one scene mesh, with cached bounds
//! - [`TriangleHit`]: Distance and point of a ray-mesh intersection
//!
//! Scene-level queries (closest hit among many meshes, category filters) live
//! in [`probe`](crate::probe).
//!
//! # Example
//!
//! ```
//! use batikwalk::{Ray, TriangleMesh, Vec3};
//!
//! // A 10x10 floor at y = 0
//! let floor = TriangleMesh::quad(
//!     Vec3::new(-5.0, 0.0, -5.0),
//!     Vec3::new(5.0, 0.0, -5.0),
//!     Vec3::new(5.0, 0.0, 5.0),
//!     Vec3::new(-5.0, 0.0, 5.0),
//! );
//!
//! let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
//! let hit = floor.intersect(&ray, 100.0).unwrap();
//! assert_eq!(hit.point.y, 0.0);
//! ```

use crate::camera::Camera;
use glam::Vec3;

/// Below this determinant a ray is treated as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-9;

/// Padding added to mesh bounds so flat meshes still pass the AABB test.
const BOUNDS_PADDING: f32 = 1e-4;

/// A ray in 3D space, used for raycasting and picking.
///
/// A ray has an origin point and a normalized direction. It represents
/// an infinite line starting at the origin and extending in the direction.
///
/// # Example
///
/// ```
/// use batikwalk::{Ray, Vec3};
///
/// // Create a ray from the camera
/// let ray = Ray::new(
///     Vec3::new(0.0, 1.0, 5.0),   // origin (camera position)
///     Vec3::new(0.0, 0.0, -1.0),  // direction (forward)
/// );
///
/// // Get a point along the ray
/// let point_at_10_units = ray.point_at(10.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: Vec3,
    /// The normalized direction of the ray.
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray with the given origin and direction.
    ///
    /// The direction will be normalized automatically.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray through the exact centre of the camera's viewport.
    ///
    /// For a perspective camera this starts at the eye and follows the view
    /// direction, which is what the interaction targeter casts every frame.
    pub fn from_camera(camera: &Camera) -> Self {
        Self::new(camera.position, camera.forward)
    }

    /// Get a point along the ray at the given distance from the origin.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Compute the entry and exit distances of the ray through an AABB.
    ///
    /// Returns `(t_enter, t_exit)`; `t_enter` is negative when the origin is
    /// inside the box. Returns `None` if the ray misses the box or the box is
    /// entirely behind the origin.
    pub fn aabb_range(&self, min: Vec3, max: Vec3) -> Option<(f32, f32)> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            let origin = self.origin[i];
            let dir = self.direction[i];
            let box_min = min[i];
            let box_max = max[i];

            if dir.abs() < f32::EPSILON {
                // Ray is parallel to this axis
                if origin < box_min || origin > box_max {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (box_min - origin) * inv_dir;
                let mut t2 = (box_max - origin) * inv_dir;

                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }

                t_min = t_min.max(t1);
                t_max = t_max.min(t2);

                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_max < 0.0 { None } else { Some((t_min, t_max)) }
    }

    /// Test intersection with an axis-aligned bounding box (AABB).
    ///
    /// Returns the distance along the ray to the nearest intersection in
    /// front of the origin, or `None` if the ray doesn't intersect the box.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let (t_min, t_max) = self.aabb_range(min, max)?;
        if t_min > 0.0 { Some(t_min) } else { Some(t_max) }
    }

    /// Test intersection with a single triangle, from either side.
    ///
    /// Returns the distance along the ray and the hit point. The point is
    /// interpolated from the triangle's vertices rather than stepped along
    /// the ray, so a hit on a flat horizontal triangle reports that
    /// triangle's exact height.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<(f32, Vec3)> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);

        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        if t < 0.0 {
            return None;
        }

        Some((t, a + edge1 * u + edge2 * v))
    }
}

/// Result of intersecting a ray with a [`TriangleMesh`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// World-space position of the hit point.
    pub point: Vec3,
}

/// World-space triangle soup of one scene mesh.
///
/// Transforms are baked in at load time, so queries never touch node
/// hierarchies. Bounds are cached for a cheap rejection test.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    triangles: Vec<[Vec3; 3]>,
    min: Vec3,
    max: Vec3,
}

impl TriangleMesh {
    /// Build from a list of triangles.
    pub fn from_triangles(triangles: Vec<[Vec3; 3]>) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for tri in &triangles {
            for &p in tri {
                min = min.min(p);
                max = max.max(p);
            }
        }

        if triangles.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }

        Self {
            triangles,
            min: min - Vec3::splat(BOUNDS_PADDING),
            max: max + Vec3::splat(BOUNDS_PADDING),
        }
    }

    /// Build from indexed positions. Trailing indices that don't form a full
    /// triangle and out-of-range indices are skipped.
    pub fn from_indexed(positions: &[Vec3], indices: &[u32]) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .filter_map(|tri| {
                Some([
                    *positions.get(tri[0] as usize)?,
                    *positions.get(tri[1] as usize)?,
                    *positions.get(tri[2] as usize)?,
                ])
            })
            .collect();

        Self::from_triangles(triangles)
    }

    /// Build a quad from four corners in winding order.
    pub fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        Self::from_triangles(vec![[a, b, c], [c, d, a]])
    }

    /// Build an axis-aligned box from its minimum and maximum corners.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let corner = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };

        let faces = [
            // -X, +X
            [corner(false, false, false), corner(false, false, true), corner(false, true, true), corner(false, true, false)],
            [corner(true, false, false), corner(true, true, false), corner(true, true, true), corner(true, false, true)],
            // -Y, +Y
            [corner(false, false, false), corner(true, false, false), corner(true, false, true), corner(false, false, true)],
            [corner(false, true, false), corner(false, true, true), corner(true, true, true), corner(true, true, false)],
            // -Z, +Z
            [corner(false, false, false), corner(false, true, false), corner(true, true, false), corner(true, false, false)],
            [corner(false, false, true), corner(true, false, true), corner(true, true, true), corner(false, true, true)],
        ];

        let triangles = faces
            .iter()
            .flat_map(|[a, b, c, d]| [[*a, *b, *c], [*c, *d, *a]])
            .collect();

        Self::from_triangles(triangles)
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Padded bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.min, self.max)
    }

    /// Find the closest intersection no farther than `max_distance`.
    pub fn intersect(&self, ray: &Ray, max_distance: f32) -> Option<TriangleHit> {
        let (t_enter, _) = ray.aabb_range(self.min, self.max)?;
        if t_enter > max_distance {
            return None;
        }

        let mut best: Option<TriangleHit> = None;
        for [a, b, c] in &self.triangles {
            let Some((distance, point)) = ray.intersect_triangle(*a, *b, *c) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            if best.is_none_or(|hit| distance < hit.distance) {
                best = Some(TriangleHit { distance, point });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(size: f32, y: f32) -> TriangleMesh {
        TriangleMesh::quad(
            Vec3::new(-size, y, -size),
            Vec3::new(size, y, -size),
            Vec3::new(size, y, size),
            Vec3::new(-size, y, size),
        )
    }

    #[test]
    fn downward_ray_hits_floor_at_exact_height() {
        let mesh = floor(10.0, 2.5);
        let ray = Ray::new(Vec3::new(1.3, 17.1, -4.7), Vec3::NEG_Y);

        let hit = mesh.intersect(&ray, 100.0).unwrap();
        assert_eq!(hit.point.y, 2.5);
        assert!((hit.distance - 14.6).abs() < 1e-4);
    }

    #[test]
    fn triangle_is_hit_from_both_sides() {
        let mesh = floor(1.0, 0.0);

        let from_above = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);
        let from_below = Ray::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y);

        assert!(mesh.intersect(&from_above, 10.0).is_some());
        assert!(mesh.intersect(&from_below, 10.0).is_some());
    }

    #[test]
    fn max_distance_limits_hits() {
        let mesh = floor(1.0, 0.0);
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);

        assert!(mesh.intersect(&ray, 4.9).is_none());
        assert!(mesh.intersect(&ray, 5.1).is_some());
    }

    #[test]
    fn ray_pointing_away_misses() {
        let mesh = floor(1.0, 0.0);
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);

        assert!(mesh.intersect(&ray, 100.0).is_none());
    }

    #[test]
    fn cuboid_reports_nearest_face() {
        let mesh = TriangleMesh::cuboid(Vec3::new(2.0, -1.0, -1.0), Vec3::new(4.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        let hit = mesh.intersect(&ray, 10.0).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn origin_inside_bounds_still_tests_triangles() {
        let mesh = TriangleMesh::cuboid(Vec3::splat(-10.0), Vec3::splat(10.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        let hit = mesh.intersect(&ray, 20.0).unwrap();
        assert!((hit.distance - 10.0).abs() < 1e-5);
        assert!(mesh.intersect(&ray, 5.0).is_none());
    }

    #[test]
    fn from_indexed_skips_partial_triangles() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::Y];
        let mesh = TriangleMesh::from_indexed(&positions, &[0, 1, 2, 0, 9, 2, 3]);

        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn camera_ray_starts_at_eye() {
        let camera = Camera::new().at(Vec3::new(0.0, 1.0, 5.0)).looking_at(Vec3::new(0.0, 1.0, 0.0));

        let ray = Ray::from_camera(&camera);
        assert_eq!(ray.origin, Vec3::new(0.0, 1.0, 5.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);
    }
}
