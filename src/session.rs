//! One walkthrough session: the player, the scene and the UI state.
//!
//! [`Session`] owns every piece of mutable walkthrough state and advances it
//! in a fixed order each tick:
//!
//! 1. drain queued [`Command`]s (keys, mouse, buttons),
//! 2. run [`Locomotion`],
//! 3. run the [`InteractionTargeter`] from the updated camera,
//! 4. turn lock changes into [`SessionEvent`]s.
//!
//! The scene starts empty and is swapped in whole by [`Session::publish_scene`]
//! once the background loader finishes.

use glam::Vec3;

use crate::camera::Camera;
use crate::canting::{CantingCanvas, CantingConfig, CantingModal};
use crate::command::{Command, CommandQueue, MoveKey, SessionEvent};
use crate::config::ViewerConfig;
use crate::interaction::{InteractionConfig, InteractionTargeter, UiVisibility};
use crate::locomotion::{Locomotion, LocomotionConfig, MoveOutcome, MovementKeys};
use crate::look_control::{LockChange, LookControl};
use crate::scene::SceneWorld;
use crate::texture::TextureLoader;

/// Seconds between periodic position logs.
const POSITION_LOG_INTERVAL: f32 = 2.0;

/// Full-screen overlay to show over the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overlay {
    /// Before the first lock: title and start hint.
    Welcome,
    /// Unlocked after having played.
    Paused,
    /// The canting modal is up.
    Canting,
    /// Walking around.
    None,
}

/// State of one walkthrough.
pub struct Session {
    look: LookControl,
    locomotion: Locomotion,
    targeter: InteractionTargeter,
    canting: CantingModal,
    scene: SceneWorld,
    ready: bool,
    keys: MovementKeys,
    commands: CommandQueue,
    events: Vec<SessionEvent>,
    started: bool,
    since_position_log: f32,
}

impl Session {
    pub fn new(
        look: LookControl,
        locomotion: LocomotionConfig,
        interaction: &InteractionConfig,
        canting: CantingConfig,
    ) -> Self {
        Self {
            look,
            locomotion: Locomotion::new(locomotion),
            targeter: InteractionTargeter::from_config(interaction),
            canting: CantingModal::new(canting),
            scene: SceneWorld::empty(),
            ready: false,
            keys: MovementKeys::default(),
            commands: CommandQueue::new(),
            events: Vec::new(),
            started: false,
            since_position_log: 0.0,
        }
    }

    /// Build a session at the configured spawn point.
    pub fn from_config(config: &ViewerConfig) -> Self {
        let look = LookControl::new()
            .position(config.scene.spawn_position())
            .yaw(config.scene.spawn_yaw)
            .pitch(config.scene.spawn_pitch)
            .fov(config.look.fov)
            .sensitivity(config.look.sensitivity)
            .clip_planes(config.look.near, config.look.far);

        Self::new(
            look,
            config.locomotion.clone(),
            &config.interaction,
            config.canting.clone(),
        )
    }

    /// Queue a command for the next tick.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Swap in the loaded scene. Collision and targeting use it from the next
    /// tick on.
    pub fn publish_scene(&mut self, scene: SceneWorld) {
        let (min, max) = scene.bounds();
        let center = (min + max) * 0.5;
        let position = self.look.position;
        log::info!(
            "Scene ready, camera at X:{:.3} Y:{:.3} Z:{:.3}, {:.2} from model center",
            position.x,
            position.y,
            position.z,
            position.distance(center)
        );

        let surfaces = scene.summary().total();
        self.scene = scene;
        self.ready = true;
        self.events.push(SessionEvent::SceneReady { surfaces });
    }

    /// Record a failed load. The session keeps running against an empty scene.
    pub fn scene_failed(&mut self, reason: String) {
        log::error!("Scene failed to load: {}", reason);
        self.events.push(SessionEvent::SceneFailed(reason));
    }

    /// Advance by `dt` seconds.
    pub fn tick(&mut self, dt: f32, textures: &mut dyn TextureLoader) {
        while let Some(command) = self.commands.pop() {
            self.apply(command, textures);
        }

        self.locomotion.tick(dt, self.keys, &mut self.look, &self.scene);

        let was_open = self.targeter.visibility().info_panel_open;
        let camera = self.look.camera();
        if self.targeter.update(&self.scene, &camera) {
            let target = self.targeter.target().map(|t| t.entity);
            self.events.push(SessionEvent::TargetChanged(target));
        }
        if was_open && !self.targeter.visibility().info_panel_open {
            self.events.push(SessionEvent::InfoPanel { open: false });
        }

        for change in self.look.take_lock_changes() {
            let locked = change == LockChange::Locked;
            if locked {
                self.started = true;
            }
            log::debug!("Pointer {}", if locked { "locked" } else { "unlocked" });
            self.events.push(SessionEvent::LockChanged { locked });
        }

        self.since_position_log += dt.max(0.0);
        if self.since_position_log >= POSITION_LOG_INTERVAL {
            let p = self.look.position;
            log::debug!(
                "Current camera: X:{:.3} Y:{:.3} Z:{:.3} Locked: {}",
                p.x,
                p.y,
                p.z,
                self.look.is_locked()
            );
            self.since_position_log = 0.0;
        }
    }

    fn apply(&mut self, command: Command, textures: &mut dyn TextureLoader) {
        match command {
            Command::Press(key) => self.set_key(key, true),
            Command::Release(key) => self.set_key(key, false),
            Command::Look { dx, dy } => self.look.apply_mouse_delta(dx, dy),
            Command::Lock => {
                if !self.canting.is_open() {
                    self.look.lock();
                }
            }
            Command::Unlock => self.look.unlock(),
            Command::ToggleInfo => {
                if self.targeter.toggle_info(self.look.is_locked()) {
                    let open = self.targeter.visibility().info_panel_open;
                    self.events.push(SessionEvent::InfoPanel { open });
                }
            }
            Command::OpenCanting => {
                if self.targeter.looking_at_special() && self.look.is_locked() && self.canting.open() {
                    self.look.unlock();
                    self.events.push(SessionEvent::Canting { open: true });
                }
            }
            Command::CloseCanting => self.close_canting(),
            Command::SelectMotif(index) => {
                if self.canting.is_open() {
                    self.canting.select_motif(index);
                }
            }
            Command::BackToMotifs => {
                if self.canting.is_open() {
                    self.canting.back();
                }
            }
            Command::FinishCanting => {
                if self.canting.is_open() {
                    self.finish_canting(textures);
                }
            }
            Command::CanvasPress { x, y } => {
                if let Some(canvas) = self.canvas_if_open() {
                    canvas.begin_stroke(x, y);
                }
            }
            Command::CanvasMove { x, y } => {
                if let Some(canvas) = self.canvas_if_open() {
                    canvas.drag(x, y);
                }
            }
            Command::CanvasRelease => {
                if let Some(canvas) = self.canvas_if_open() {
                    canvas.end_stroke();
                }
            }
        }
    }

    fn set_key(&mut self, key: MoveKey, down: bool) {
        match key {
            MoveKey::Forward => self.keys.forward = down,
            MoveKey::Backward => self.keys.backward = down,
            MoveKey::Left => self.keys.left = down,
            MoveKey::Right => self.keys.right = down,
        }
    }

    fn canvas_if_open(&mut self) -> Option<&mut CantingCanvas> {
        if self.canting.is_open() {
            self.canting.canvas_mut()
        } else {
            None
        }
    }

    fn close_canting(&mut self) {
        if self.canting.close() {
            self.look.lock();
            self.events.push(SessionEvent::Canting { open: false });
        }
    }

    fn finish_canting(&mut self, textures: &mut dyn TextureLoader) {
        match self.canting.finish(self.scene.special_object(), textures) {
            Ok((entity, texture)) => {
                if self.scene.apply_texture(entity, texture) {
                    log::info!("Motif applied to the special object");
                    self.events.push(SessionEvent::TextureApplied { entity, texture });
                }
                self.close_canting();
            }
            Err(err) => {
                log::error!("Cannot apply motif: {}", err);
                self.events.push(SessionEvent::CantingFailed(err.to_string()));
            }
        }
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn camera(&self) -> Camera {
        self.look.camera()
    }

    pub fn position(&self) -> Vec3 {
        self.look.position
    }

    pub fn look(&self) -> &LookControl {
        &self.look
    }

    pub fn is_locked(&self) -> bool {
        self.look.is_locked()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn scene(&self) -> &SceneWorld {
        &self.scene
    }

    pub fn targeter(&self) -> &InteractionTargeter {
        &self.targeter
    }

    pub fn canting(&self) -> &CantingModal {
        &self.canting
    }

    pub fn canting_mut(&mut self) -> &mut CantingModal {
        &mut self.canting
    }

    pub fn visibility(&self) -> UiVisibility {
        self.targeter.visibility()
    }

    pub fn last_outcome(&self) -> MoveOutcome {
        self.locomotion.last_outcome()
    }

    pub fn overlay(&self) -> Overlay {
        if self.canting.is_open() {
            Overlay::Canting
        } else if self.look.is_locked() {
            Overlay::None
        } else if self.started {
            Overlay::Paused
        } else {
            Overlay::Welcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneMesh;
    use crate::scene::tests::{cuboid, floor, world_of};
    use crate::texture::{TextureError, TextureId};
    use std::path::Path;

    struct Textures(usize);

    impl TextureLoader for Textures {
        fn load(&mut self, _path: &Path) -> Result<TextureId, TextureError> {
            self.0 += 1;
            Ok(TextureId(self.0))
        }
    }

    const DT: f32 = 1.0 / 60.0;

    /// A floor with the special object straight ahead, 10 units away at eye height.
    fn gallery() -> SceneWorld {
        world_of(vec![
            SceneMesh::new("Lantai_01", "", floor(50.0, 0.0)),
            SceneMesh::new(
                "Object_3_4",
                "",
                cuboid(Vec3::new(-2.0, 10.0, -14.0), Vec3::new(2.0, 16.0, -10.0)),
            ),
        ])
    }

    fn session() -> Session {
        let look = LookControl::new().position(Vec3::new(0.0, 13.0, 0.0));
        let mut session = Session::new(
            look,
            LocomotionConfig::default(),
            &InteractionConfig::default(),
            CantingConfig::default(),
        );
        session.publish_scene(gallery());
        session
    }

    #[test]
    fn overlay_follows_lock_state() {
        let mut session = session();
        let mut textures = Textures(0);
        assert_eq!(session.overlay(), Overlay::Welcome);

        session.push(Command::Lock);
        session.tick(DT, &mut textures);
        assert_eq!(session.overlay(), Overlay::None);

        session.push(Command::Unlock);
        session.tick(DT, &mut textures);
        assert_eq!(session.overlay(), Overlay::Paused);

        let events = session.take_events();
        assert!(events.contains(&SessionEvent::LockChanged { locked: true }));
        assert!(events.contains(&SessionEvent::LockChanged { locked: false }));
    }

    #[test]
    fn canting_round_trip_relocks_without_moving() {
        let mut session = session();
        let mut textures = Textures(0);

        session.push(Command::Lock);
        session.tick(DT, &mut textures);
        assert!(session.targeter().looking_at_special());
        let before = session.position();

        session.push(Command::OpenCanting);
        session.tick(DT, &mut textures);
        assert!(session.canting().is_open());
        assert!(!session.is_locked());
        assert_eq!(session.overlay(), Overlay::Canting);

        // Movement is locked out while the modal is up
        session.push(Command::Press(MoveKey::Forward));
        session.tick(DT, &mut textures);
        session.push(Command::Release(MoveKey::Forward));
        // Clicking the scene behind the modal doesn't grab the pointer
        session.push(Command::Lock);
        session.tick(DT, &mut textures);
        assert!(!session.is_locked());

        session.push(Command::CloseCanting);
        session.tick(DT, &mut textures);

        assert!(session.is_locked());
        assert!(!session.canting().is_open());
        assert_eq!(session.position(), before);
    }

    #[test]
    fn open_canting_requires_special_target_and_lock() {
        let mut session = session();
        let mut textures = Textures(0);

        // Not locked yet
        session.tick(DT, &mut textures);
        session.push(Command::OpenCanting);
        session.tick(DT, &mut textures);
        assert!(!session.canting().is_open());

        // Locked but looking away
        session.push(Command::Lock);
        session.push(Command::Look { dx: 1000.0, dy: 0.0 });
        session.tick(DT, &mut textures);
        assert!(!session.targeter().looking_at_special());
        session.push(Command::OpenCanting);
        session.tick(DT, &mut textures);
        assert!(!session.canting().is_open());
    }

    #[test]
    fn finishing_applies_motif_and_returns_to_walking() {
        let mut session = session();
        let mut textures = Textures(0);

        session.push(Command::Lock);
        session.tick(DT, &mut textures);
        session.push(Command::OpenCanting);
        session.tick(DT, &mut textures);

        // Finishing without a motif keeps the modal open
        session.push(Command::FinishCanting);
        session.tick(DT, &mut textures);
        assert!(session.canting().is_open());

        session.canting_mut().start_canvas("assets/megamendung.jpg", None);
        session.push(Command::CanvasPress { x: 300.0, y: 300.0 });
        session.push(Command::CanvasMove { x: 320.0, y: 300.0 });
        session.push(Command::CanvasRelease);
        session.tick(DT, &mut textures);
        assert_eq!(session.canting().canvas().unwrap().strokes().len(), 2);

        session.take_events();
        session.push(Command::FinishCanting);
        session.tick(DT, &mut textures);

        let special = session.scene().special_object().unwrap();
        assert_eq!(session.scene().appearance(special).unwrap().texture, Some(TextureId(1)));
        assert!(!session.canting().is_open());
        assert!(session.is_locked());

        let events = session.take_events();
        assert!(events.contains(&SessionEvent::TextureApplied {
            entity: special,
            texture: TextureId(1)
        }));
        assert!(events.contains(&SessionEvent::Canting { open: false }));
    }

    #[test]
    fn info_panel_toggles_and_reports() {
        let mut session = session();
        let mut textures = Textures(0);

        session.push(Command::Lock);
        session.tick(DT, &mut textures);
        session.take_events();

        session.push(Command::ToggleInfo);
        session.tick(DT, &mut textures);
        assert!(session.visibility().info_panel_open);
        assert_eq!(session.take_events(), vec![SessionEvent::InfoPanel { open: true }]);

        // Looking away force-closes it
        session.push(Command::Look { dx: 1000.0, dy: 0.0 });
        session.tick(DT, &mut textures);
        assert!(!session.visibility().info_panel_open);
        let events = session.take_events();
        assert!(events.contains(&SessionEvent::InfoPanel { open: false }));
        assert!(events.contains(&SessionEvent::TargetChanged(None)));
    }

    #[test]
    fn walking_forward_stays_on_the_floor() {
        let mut session = session();
        let mut textures = Textures(0);

        session.push(Command::Lock);
        session.push(Command::Press(MoveKey::Backward));
        for _ in 0..30 {
            session.tick(DT, &mut textures);
        }

        assert!(session.position().z > 0.0);
        assert_eq!(session.position().y, 13.0);
        assert_eq!(session.last_outcome(), MoveOutcome::Moved);
    }

    #[test]
    fn nothing_moves_before_the_scene_is_ready() {
        let look = LookControl::new().position(Vec3::new(0.0, 13.0, 0.0));
        let mut session = Session::new(
            look,
            LocomotionConfig::default(),
            &InteractionConfig::default(),
            CantingConfig::default(),
        );
        let mut textures = Textures(0);

        session.push(Command::Lock);
        session.push(Command::Press(MoveKey::Forward));
        for _ in 0..10 {
            session.tick(DT, &mut textures);
        }

        assert!(!session.is_ready());
        assert_eq!(session.position(), Vec3::new(0.0, 13.0, 0.0));
        assert_eq!(session.last_outcome(), MoveOutcome::NoGround);
        assert!(session.targeter().target().is_none());
    }
}
