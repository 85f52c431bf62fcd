//! # Batikwalk
//!
//! **A first-person walkthrough of a batik house, loaded from a single GLB.**
//!
//! The scene is classified into floors, walls and interactable batik pieces.
//! The player walks with WASD and mouse-look, is kept on the floor by a
//! downward probe and out of walls by an eight-ray collision ring. Looking at
//! a batik piece shows its details, and one special cloth can be decorated in
//! a small canting minigame.
//!
//! ## Running
//!
//! ```no_run
//! use batikwalk::ViewerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ViewerConfig::load(None)?;
//!     batikwalk::run(config)
//! }
//! ```
//!
//! ## Layout
//!
//! - [`Session`] owns the simulation: look, locomotion, targeting and the
//!   canting modal. It is driven purely by [`Command`]s and reports
//!   [`SessionEvent`]s, so it runs headless in tests.
//! - [`SceneWorld`] holds the classified scene as `hecs` entities and answers
//!   ray probes through [`SpatialProbe`].
//! - [`run`] opens the window and feeds input, the background loader and the
//!   renderer into the session every frame.

mod app;
mod assets;
mod camera;
mod canting;
mod classify;
mod command;
mod config;
mod draw2d;
mod geometry;
mod gpu;
mod hud;
mod input;
mod interaction;
mod loader;
mod locomotion;
mod look_control;
mod mesh;
mod mesh_pass;
mod picking;
mod probe;
mod scene;
mod session;
mod texture;

pub use app::run;
pub use assets::{AssetError, Assets, FontAtlas, FontId};
pub use camera::Camera;
pub use canting::{CantingCanvas, CantingConfig, CantingError, CantingModal, CantingScreen, Motif, Stroke};
pub use classify::{ClassificationRules, ObjectKind, SurfaceCategory};
pub use command::{Command, CommandQueue, MoveKey, SessionEvent};
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, LookConfig, SceneConfig, ViewerConfig, WindowConfig};
pub use draw2d::{Color, Draw2d, ImageId, Rect};
pub use geometry::{LoadedScene, RawGeometry, SceneLoadError, SceneMesh};
pub use gpu::{GpuContext, GpuError};
pub use hud::{Hud, ModalLayout, Pointer};
pub use input::{Input, InputContext};
pub use interaction::{InteractionConfig, InteractionTarget, InteractionTargeter, Prompt, TargetInfo, UiVisibility};
pub use loader::{SceneAsset, SceneLoader};
pub use locomotion::{GroundCheck, GroundPolicy, Locomotion, LocomotionConfig, MoveOutcome, MovementKeys};
pub use look_control::{LockChange, LookControl};
pub use mesh::{Mesh, Vertex3d};
pub use mesh_pass::MeshPass;
pub use picking::{Ray, TriangleHit, TriangleMesh};
pub use probe::{ProbeFilter, ProbeHit, SpatialProbe};
pub use scene::{Appearance, ClassificationSummary, Collider, MeshIndex, SceneObject, SceneWorld};
pub use session::{Overlay, Session};
pub use texture::{Texture, TextureError, TextureId, TextureLoader};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3};

// ECS handles
pub use hecs::{Entity, World};
