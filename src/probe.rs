//! Directional ray queries against the scene's collidable surfaces.
//!
//! Locomotion asks two kinds of questions: "is there a surface within R
//! along D from P" for the horizontal ring, and "what is directly below P"
//! for the ground clamp. Interaction asks for the closest thing along the
//! view ray. All of them go through [`SpatialProbe`].

use crate::classify::SurfaceCategory;
use crate::picking::Ray;
use crate::scene::{Collider, SceneWorld};
use glam::Vec3;
use hecs::Entity;

/// Which surfaces a probe considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeFilter {
    /// Every collidable surface.
    All,
    /// Only surfaces classified as ground.
    Ground,
}

impl ProbeFilter {
    fn accepts(self, category: SurfaceCategory) -> bool {
        match self {
            ProbeFilter::All => true,
            ProbeFilter::Ground => category == SurfaceCategory::Ground,
        }
    }
}

/// Result of a successful probe.
#[derive(Clone, Copy, Debug)]
pub struct ProbeHit {
    /// The surface that was hit.
    pub entity: Entity,
    /// Distance from the probe origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// Category of the surface that was hit.
    pub category: SurfaceCategory,
}

/// Read-only ray queries against a fixed set of surfaces.
pub trait SpatialProbe {
    /// Closest surface accepted by `filter` along `direction` from `origin`,
    /// no farther than `max_distance`. `direction` is normalized internally.
    fn probe_direction(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: ProbeFilter,
    ) -> Option<ProbeHit>;

    /// True when there are no surfaces to query.
    fn is_empty(&self) -> bool;

    /// Closest hit along `ray`, against all surfaces.
    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<ProbeHit> {
        self.probe_direction(ray.origin, ray.direction, max_distance, ProbeFilter::All)
    }
}

impl SpatialProbe for SceneWorld {
    fn probe_direction(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: ProbeFilter,
    ) -> Option<ProbeHit> {
        let ray = Ray::new(origin, direction);
        if ray.direction == Vec3::ZERO {
            return None;
        }

        let mut closest: Option<ProbeHit> = None;
        for (entity, collider) in self.world().query::<&Collider>().iter() {
            if !filter.accepts(collider.category) {
                continue;
            }
            let limit = closest.map_or(max_distance, |hit| hit.distance);
            if let Some(hit) = collider.mesh.intersect(&ray, limit) {
                if closest.is_none_or(|c| hit.distance < c.distance) {
                    closest = Some(ProbeHit {
                        entity,
                        distance: hit.distance,
                        point: hit.point,
                        category: collider.category,
                    });
                }
            }
        }

        closest
    }

    fn is_empty(&self) -> bool {
        SceneWorld::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneMesh;
    use crate::scene::tests::{cuboid, floor, world_of};

    fn room() -> SceneWorld {
        world_of(vec![
            SceneMesh::new("Lantai_01", "", floor(20.0, 0.0)),
            SceneMesh::new("Meja", "", cuboid(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0))),
            SceneMesh::new("Dinding", "", cuboid(Vec3::new(5.0, 0.0, -20.0), Vec3::new(6.0, 10.0, 20.0))),
        ])
    }

    #[test]
    fn ground_filter_sees_through_obstacles() {
        let scene = room();
        let origin = Vec3::new(0.0, 15.0, 0.0);

        let any = scene.probe_direction(origin, Vec3::NEG_Y, 100.0, ProbeFilter::All).unwrap();
        let ground = scene.probe_direction(origin, Vec3::NEG_Y, 100.0, ProbeFilter::Ground).unwrap();

        assert_eq!(any.category, SurfaceCategory::Generic);
        assert!((any.point.y - 2.0).abs() < 1e-5);
        assert_eq!(ground.category, SurfaceCategory::Ground);
        assert_eq!(ground.point.y, 0.0);
    }

    #[test]
    fn max_distance_is_respected() {
        let scene = room();
        let origin = Vec3::new(3.5, 5.0, 0.0);

        assert!(scene.probe_direction(origin, Vec3::X, 1.0, ProbeFilter::All).is_none());
        let hit = scene.probe_direction(origin, Vec3::X, 1.6, ProbeFilter::All).unwrap();
        assert!((hit.distance - 1.5).abs() < 1e-5);
    }

    #[test]
    fn raycast_returns_the_closest_surface() {
        let scene = room();
        // Passes through the table before reaching the wall
        let ray = Ray::new(Vec3::new(-10.0, 1.0, 0.0), Vec3::X);

        let hit = scene.raycast(&ray, f32::INFINITY).unwrap();
        assert!((hit.distance - 9.0).abs() < 1e-4);
        assert_eq!(hit.category, SurfaceCategory::Generic);

        assert!(scene.raycast(&ray, 8.0).is_none());
    }

    #[test]
    fn empty_scene_finds_nothing() {
        let scene = SceneWorld::empty();
        assert!(SpatialProbe::is_empty(&scene));
        assert!(scene.probe_direction(Vec3::ZERO, Vec3::NEG_Y, 100.0, ProbeFilter::All).is_none());
    }

    #[test]
    fn zero_direction_finds_nothing() {
        let scene = room();
        assert!(scene.probe_direction(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 100.0, ProbeFilter::All).is_none());
    }
}
