//! Commands into the session and events out of it.
//!
//! Input handling never touches session state directly. It pushes
//! [`Command`]s onto a [`CommandQueue`]; the session drains the queue at the
//! start of each tick and reports what changed as [`SessionEvent`]s for the
//! presentation layer.

use std::collections::VecDeque;

use hecs::Entity;

use crate::texture::TextureId;

/// One of the four movement keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveKey {
    Forward,
    Backward,
    Left,
    Right,
}

/// Something the player asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// A movement key went down.
    Press(MoveKey),
    /// A movement key came up.
    Release(MoveKey),
    /// Raw mouse motion in pixels.
    Look { dx: f32, dy: f32 },
    /// Capture the pointer (start button, pause screen click).
    Lock,
    /// Release the pointer (Escape, focus lost).
    Unlock,
    /// Flip the info panel.
    ToggleInfo,
    /// Open the canting minigame on the special object.
    OpenCanting,
    /// Close the canting minigame.
    CloseCanting,
    /// Pick a motif by index on the selection screen.
    SelectMotif(usize),
    /// Back from the canvas to the motif list.
    BackToMotifs,
    /// Apply the motif to the special object.
    FinishCanting,
    /// Pointer pressed on the canvas, in canvas pixels.
    CanvasPress { x: f32, y: f32 },
    /// Pointer moved over the canvas, in canvas pixels.
    CanvasMove { x: f32, y: f32 },
    /// Pointer released or left the canvas.
    CanvasRelease,
}

/// What changed during a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The scene finished loading and is now collidable.
    SceneReady { surfaces: usize },
    /// The scene failed to load; the session stays not ready.
    SceneFailed(String),
    /// Pointer lock was acquired or released.
    LockChanged { locked: bool },
    /// The looked-at interactable changed.
    TargetChanged(Option<Entity>),
    /// The info panel opened or closed.
    InfoPanel { open: bool },
    /// The canting modal opened or closed.
    Canting { open: bool },
    /// A motif texture was applied to an object.
    TextureApplied { entity: Entity, texture: TextureId },
    /// Finishing the canting minigame failed.
    CantingFailed(String),
}

/// FIFO of pending commands.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Extend<Command> for CommandQueue {
    fn extend<I: IntoIterator<Item = Command>>(&mut self, iter: I) {
        self.pending.extend(iter);
    }
}
