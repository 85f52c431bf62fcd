//! Keyboard locomotion with ring collision and ground clamping.
//!
//! Each tick the [`Locomotion`] controller:
//!
//! 1. damps its velocity and accelerates along the held movement keys,
//! 2. moves the [`LookControl`] along its horizontal basis,
//! 3. probes a ring of eight horizontal directions around the new position
//!    and rolls back if any surface is closer than the player radius,
//! 4. under [`GroundPolicy::StrictGroundOnly`], casts down and snaps the eye
//!    to the ground height, rolling back if there is no walkable ground or
//!    an obstacle sits between the player and the ground.
//!
//! Rollback restores the pre-tick position exactly. Velocity is kept, so
//! holding a key against a wall keeps pushing without drifting.

use glam::{Quat, Vec2, Vec3};
use serde::Deserialize;

use crate::look_control::LookControl;
use crate::probe::{ProbeFilter, SpatialProbe};

/// Horizontal probe directions, in probing order.
const RING: [Vec3; 8] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(0.707, 0.0, 0.707),
    Vec3::new(-0.707, 0.0, 0.707),
    Vec3::new(0.707, 0.0, -0.707),
    Vec3::new(-0.707, 0.0, -0.707),
];

/// How the controller treats the ground under the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundPolicy {
    /// Only horizontal collision; height never changes.
    None,
    /// Stand on ground surfaces only; roll back when there is none below or
    /// an obstacle is in the way.
    #[default]
    StrictGroundOnly,
}

impl std::str::FromStr for GroundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(GroundPolicy::None),
            "strict" | "strict_ground_only" => Ok(GroundPolicy::StrictGroundOnly),
            other => Err(format!("unknown ground policy '{}'", other)),
        }
    }
}

/// Tuning for [`Locomotion`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Acceleration applied while a key is held.
    pub move_speed: f32,
    /// Velocity decay rate per second.
    pub damping: f32,
    /// Minimum horizontal clearance to any surface.
    pub player_radius: f32,
    /// Eye height above the ground.
    pub eye_height: f32,
    /// How far below the eye the ground probe reaches.
    pub ground_probe_distance: f32,
    /// Max gap between the closest surface below and the closest ground
    /// for the ground to count as stood on.
    pub ground_tolerance: f32,
    /// Ground handling strategy.
    pub ground_policy: GroundPolicy,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 160.0,
            damping: 10.0,
            player_radius: 1.5,
            eye_height: 13.0,
            ground_probe_distance: 100.0,
            ground_tolerance: 0.1,
            ground_policy: GroundPolicy::StrictGroundOnly,
        }
    }
}

/// Held state of the four movement keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementKeys {
    /// True if any key is held.
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// Normalized input direction: `x` is right, `y` is forward.
    pub fn direction(&self) -> Vec2 {
        let axis = |pos: bool, neg: bool| pos as i8 as f32 - neg as i8 as f32;
        Vec2::new(axis(self.right, self.left), axis(self.forward, self.backward)).normalize_or_zero()
    }
}

/// What happened to the player during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveOutcome {
    /// Look-lock is off; nothing was touched.
    Idle,
    /// The move was committed.
    Moved,
    /// A surface was within the player radius; rolled back.
    Blocked { distance: f32 },
    /// Nothing walkable below; rolled back.
    NoGround,
    /// Something other than ground is under the player; rolled back.
    Perched { gap: f32 },
}

impl MoveOutcome {
    /// True if the tick's movement was undone.
    pub fn rolled_back(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Blocked { .. } | MoveOutcome::NoGround | MoveOutcome::Perched { .. }
        )
    }
}

/// Result of probing the ground under a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroundCheck {
    /// Standing on ground; the eye belongs at `eye_y`.
    Valid { eye_y: f32 },
    /// No ground surface below.
    NoGround,
    /// The closest surface below isn't the ground.
    Perched { gap: f32 },
}

/// Probe straight down from `position` and decide where the eye belongs.
///
/// Pure: the same position against the same surfaces always gives the same
/// answer, so clamping twice is the same as clamping once.
pub fn check_ground(probe: &impl SpatialProbe, position: Vec3, config: &LocomotionConfig) -> GroundCheck {
    let reach = config.ground_probe_distance;
    let any = probe.probe_direction(position, Vec3::NEG_Y, reach, ProbeFilter::All);
    let ground = probe.probe_direction(position, Vec3::NEG_Y, reach, ProbeFilter::Ground);

    match (any, ground) {
        (_, None) => GroundCheck::NoGround,
        (Some(any), Some(ground)) => {
            let gap = (any.distance - ground.distance).abs();
            if gap < config.ground_tolerance {
                GroundCheck::Valid {
                    eye_y: ground.point.y + config.eye_height,
                }
            } else {
                GroundCheck::Perched { gap }
            }
        }
        // A ground hit is always an "any" hit, but keep the logic total.
        (None, Some(ground)) => GroundCheck::Valid {
            eye_y: ground.point.y + config.eye_height,
        },
    }
}

/// Velocity-based player movement.
#[derive(Clone, Debug)]
pub struct Locomotion {
    config: LocomotionConfig,
    velocity: Vec3,
    last: MoveOutcome,
}

impl Locomotion {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            velocity: Vec3::ZERO,
            last: MoveOutcome::Idle,
        }
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    /// Current velocity in the look control's local basis (x right, z back).
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Outcome of the most recent tick.
    pub fn last_outcome(&self) -> MoveOutcome {
        self.last
    }

    /// Advance one tick.
    pub fn tick(
        &mut self,
        dt: f32,
        keys: MovementKeys,
        look: &mut LookControl,
        probe: &impl SpatialProbe,
    ) -> MoveOutcome {
        if !look.is_locked() {
            self.last = MoveOutcome::Idle;
            return self.last;
        }

        let dt = dt.max(0.0);
        self.integrate_velocity(dt, keys);

        let snapshot = look.position;
        look.move_right(-self.velocity.x * dt);
        look.move_forward(-self.velocity.z * dt);

        let outcome = self.resolve(snapshot, look, probe);
        if outcome.rolled_back() {
            look.position = snapshot;
        }

        self.report(outcome, probe);
        self.last = outcome;
        outcome
    }

    fn integrate_velocity(&mut self, dt: f32, keys: MovementKeys) {
        let decay = (self.config.damping * dt).min(1.0);
        self.velocity -= self.velocity * decay;

        let direction = keys.direction();
        if keys.forward || keys.backward {
            self.velocity.z -= direction.y * self.config.move_speed * dt;
        }
        if keys.left || keys.right {
            self.velocity.x -= direction.x * self.config.move_speed * dt;
        }
    }

    fn resolve(&self, snapshot: Vec3, look: &mut LookControl, probe: &impl SpatialProbe) -> MoveOutcome {
        let position = look.position;
        let displacement = position - snapshot;

        if let Some(distance) = self.ring_blocked(probe, position, displacement) {
            return MoveOutcome::Blocked { distance };
        }

        match self.config.ground_policy {
            GroundPolicy::None => MoveOutcome::Moved,
            GroundPolicy::StrictGroundOnly => match check_ground(probe, position, &self.config) {
                GroundCheck::Valid { eye_y } => {
                    look.position.y = eye_y;
                    MoveOutcome::Moved
                }
                GroundCheck::NoGround => MoveOutcome::NoGround,
                GroundCheck::Perched { gap } => MoveOutcome::Perched { gap },
            },
        }
    }

    /// Distance to the first surface inside the player radius, if any.
    fn ring_blocked(&self, probe: &impl SpatialProbe, position: Vec3, displacement: Vec3) -> Option<f32> {
        if probe.is_empty() {
            return None;
        }

        let heading = displacement.x.atan2(displacement.z);
        let rotation = Quat::from_rotation_y(heading);
        let radius = self.config.player_radius;

        RING.iter().find_map(|dir| {
            probe
                .probe_direction(position, rotation * *dir, radius, ProbeFilter::All)
                .filter(|hit| hit.distance < radius)
                .map(|hit| hit.distance)
        })
    }

    fn report(&self, outcome: MoveOutcome, probe: &impl SpatialProbe) {
        let repeated = std::mem::discriminant(&outcome) == std::mem::discriminant(&self.last);
        match outcome {
            MoveOutcome::Blocked { distance } if !repeated => {
                log::debug!("Blocked by surface {:.2} away, rolled back", distance);
            }
            MoveOutcome::NoGround if !repeated && !probe.is_empty() => {
                log::warn!("No ground below, rolled back");
            }
            MoveOutcome::Perched { gap } if !repeated => {
                log::debug!("Obstacle {:.2} above the ground, rolled back", gap);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneMesh;
    use crate::scene::SceneWorld;
    use crate::scene::tests::{cuboid, floor, world_of};

    const DT: f32 = 1.0 / 60.0;

    fn forward() -> MovementKeys {
        MovementKeys {
            forward: true,
            ..Default::default()
        }
    }

    fn locked_at(position: Vec3) -> LookControl {
        let mut look = LookControl::new().position(position);
        look.lock();
        look
    }

    fn walkway() -> SceneWorld {
        world_of(vec![SceneMesh::new("Lantai_01", "", floor(20.0, 0.0))])
    }

    #[test]
    fn velocity_never_grows_without_keys() {
        let scene = walkway();
        let mut look = locked_at(Vec3::new(0.0, 13.0, 0.0));
        let mut loco = Locomotion::new(LocomotionConfig::default());

        for _ in 0..10 {
            loco.tick(DT, forward(), &mut look, &scene);
        }

        let mut previous = loco.velocity().length();
        assert!(previous > 0.0);
        for dt in [DT, 0.05, 0.5, 2.0, DT] {
            loco.tick(dt, MovementKeys::default(), &mut look, &scene);
            let speed = loco.velocity().length();
            assert!(speed <= previous);
            previous = speed;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn clamp_snaps_to_floor_exactly() {
        let scene = walkway();
        let mut look = locked_at(Vec3::new(2.0, 10.0, -3.0));
        let mut loco = Locomotion::new(LocomotionConfig::default());

        let outcome = loco.tick(DT, MovementKeys::default(), &mut look, &scene);

        assert_eq!(outcome, MoveOutcome::Moved);
        assert_eq!(look.position.y, 0.0 + 13.0);
        assert_eq!(look.position.x, 2.0);
        assert_eq!(look.position.z, -3.0);
    }

    #[test]
    fn clamp_is_idempotent() {
        let scene = walkway();
        let config = LocomotionConfig::default();
        let position = Vec3::new(1.5, 40.0, 7.25);

        let first = check_ground(&scene, position, &config);
        let GroundCheck::Valid { eye_y } = first else {
            panic!("expected ground, got {:?}", first);
        };
        let second = check_ground(&scene, Vec3::new(position.x, eye_y, position.z), &config);

        assert_eq!(second, GroundCheck::Valid { eye_y });
    }

    #[test]
    fn wall_inside_radius_blocks_and_rolls_back() {
        let scene = world_of(vec![
            SceneMesh::new("Lantai_01", "", floor(20.0, 0.0)),
            SceneMesh::new(
                "Dinding",
                "",
                cuboid(Vec3::new(-10.0, 0.0, -4.0), Vec3::new(10.0, 30.0, -1.0)),
            ),
        ]);
        let start = Vec3::new(0.0, 13.0, 0.0);
        let mut look = locked_at(start);
        let mut loco = Locomotion::new(LocomotionConfig::default());

        let outcome = loco.tick(DT, forward(), &mut look, &scene);

        let MoveOutcome::Blocked { distance } = outcome else {
            panic!("expected a block, got {:?}", outcome);
        };
        assert!(distance < 1.0);
        assert_eq!(look.position, start);
    }

    #[test]
    fn obstacle_between_player_and_ground_is_a_perch() {
        let scene = world_of(vec![
            SceneMesh::new("Lantai_01", "", floor(20.0, 0.0)),
            SceneMesh::new("Meja", "", cuboid(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0))),
        ]);
        let start = Vec3::new(0.0, 15.0, 0.0);
        let mut look = locked_at(start);
        let mut loco = Locomotion::new(LocomotionConfig::default());

        let outcome = loco.tick(DT, MovementKeys::default(), &mut look, &scene);

        assert!(matches!(outcome, MoveOutcome::Perched { gap } if (gap - 2.0).abs() < 1e-3));
        assert_eq!(look.position, start);
    }

    #[test]
    fn walking_off_the_floor_is_undone() {
        let scene = world_of(vec![SceneMesh::new("Lantai_01", "", floor(1.0, 0.0))]);
        let start = Vec3::new(0.0, 13.0, -0.999);
        let mut look = locked_at(start);
        let mut loco = Locomotion::new(LocomotionConfig::default());

        let mut outcome = MoveOutcome::Idle;
        for _ in 0..5 {
            outcome = loco.tick(DT, forward(), &mut look, &scene);
        }

        assert_eq!(outcome, MoveOutcome::NoGround);
        assert!(look.position.z >= -1.0);
    }

    #[test]
    fn strict_policy_holds_still_until_scene_loads() {
        let scene = SceneWorld::empty();
        let start = Vec3::new(-23.427, 19.0, 49.81);
        let mut look = locked_at(start);
        let mut loco = Locomotion::new(LocomotionConfig::default());

        for _ in 0..10 {
            assert_eq!(loco.tick(DT, forward(), &mut look, &scene), MoveOutcome::NoGround);
        }
        assert_eq!(look.position, start);
    }

    #[test]
    fn no_ground_policy_still_blocks_walls() {
        // No floor at all: only the ring can stop this move
        let scene = world_of(vec![SceneMesh::new(
            "Dinding",
            "",
            cuboid(Vec3::new(-10.0, 0.0, -4.0), Vec3::new(10.0, 30.0, -1.0)),
        )]);
        let start = Vec3::new(0.0, 19.0, 0.0);
        let mut look = locked_at(start);
        let mut loco = Locomotion::new(LocomotionConfig {
            ground_policy: GroundPolicy::None,
            ..Default::default()
        });

        let outcome = loco.tick(DT, forward(), &mut look, &scene);

        assert!(matches!(outcome, MoveOutcome::Blocked { .. }), "got {:?}", outcome);
        assert_eq!(look.position, start);
    }

    #[test]
    fn no_ground_policy_walks_freely_in_an_empty_scene() {
        let scene = SceneWorld::empty();
        let start = Vec3::new(0.0, 19.0, 0.0);
        let mut look = locked_at(start);
        let mut loco = Locomotion::new(LocomotionConfig {
            ground_policy: GroundPolicy::None,
            ..Default::default()
        });

        for _ in 0..10 {
            assert_eq!(loco.tick(DT, forward(), &mut look, &scene), MoveOutcome::Moved);
        }
        assert!(look.position.z < 0.0);
        assert_eq!(look.position.y, 19.0);
    }

    #[test]
    fn unlocked_player_does_not_move() {
        let scene = walkway();
        let start = Vec3::new(0.0, 5.0, 0.0);
        let mut look = LookControl::new().position(start);
        let mut loco = Locomotion::new(LocomotionConfig::default());

        assert_eq!(loco.tick(DT, forward(), &mut look, &scene), MoveOutcome::Idle);
        assert_eq!(look.position, start);
        assert_eq!(loco.velocity(), Vec3::ZERO);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let keys = MovementKeys {
            forward: true,
            right: true,
            ..Default::default()
        };
        let dir = keys.direction();
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(dir.x > 0.0 && dir.y > 0.0);

        let opposed = MovementKeys {
            forward: true,
            backward: true,
            ..Default::default()
        };
        assert_eq!(opposed.direction(), Vec2::ZERO);
    }

    #[test]
    fn ground_policy_parses_from_config_strings() {
        assert_eq!("none".parse::<GroundPolicy>(), Ok(GroundPolicy::None));
        assert_eq!("Strict".parse::<GroundPolicy>(), Ok(GroundPolicy::StrictGroundOnly));
        assert!("floaty".parse::<GroundPolicy>().is_err());
    }
}
