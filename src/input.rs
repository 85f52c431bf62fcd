use std::collections::HashSet;

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::command::{Command, MoveKey};

/// UI state that changes what a key means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputContext {
    pub locked: bool,
    pub canting_open: bool,
}

/// Map one key transition to a command.
///
/// Movement keys map on both press and release; everything else only on press.
pub fn key_command(key: KeyCode, pressed: bool, ctx: InputContext) -> Option<Command> {
    let movement = match key {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(MoveKey::Forward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(MoveKey::Backward),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(MoveKey::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(MoveKey::Right),
        _ => None,
    };
    if let Some(key) = movement {
        return Some(if pressed {
            Command::Press(key)
        } else {
            Command::Release(key)
        });
    }

    if !pressed {
        return None;
    }

    match key {
        KeyCode::KeyE => Some(Command::ToggleInfo),
        KeyCode::KeyQ => Some(Command::OpenCanting),
        KeyCode::Escape if ctx.canting_open => Some(Command::CloseCanting),
        KeyCode::Escape => Some(Command::Unlock),
        _ if ctx.canting_open => motif_digit(key).map(Command::SelectMotif),
        _ => None,
    }
}

/// Zero-based motif index for the digit keys 1 to 9.
fn motif_digit(key: KeyCode) -> Option<usize> {
    const DIGITS: [KeyCode; 9] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    DIGITS.iter().position(|d| *d == key)
}

/// Tracks input state for keyboard and mouse.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    key_transitions: Vec<(KeyCode, bool)>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_buttons_released: HashSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    raw_motion: Vec2,
    focus_lost: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.key_transitions.clear();
        self.mouse_buttons_pressed.clear();
        self.mouse_buttons_released.clear();
        self.mouse_delta = Vec2::ZERO;
        self.raw_motion = Vec2::ZERO;
        self.focus_lost = false;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    if !self.mouse_buttons_down.contains(button) {
                        self.mouse_buttons_pressed.insert(*button);
                    }
                    self.mouse_buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_down.remove(button);
                    self.mouse_buttons_released.insert(*button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                let new_pos = Vec2::new(position.x as f32, position.y as f32);
                self.mouse_delta += new_pos - self.mouse_position;
                self.mouse_position = new_pos;
            }
            WindowEvent::Focused(false) => self.lose_focus(),
            _ => {}
        }
    }

    /// Accumulate raw mouse motion, which keeps coming while the cursor is grabbed.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.raw_motion += Vec2::new(delta.0 as f32, delta.1 as f32);
        }
    }

    /// Key went down. Auto-repeat is ignored.
    pub(crate) fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.key_transitions.push((key, true));
        }
    }

    pub(crate) fn release_key(&mut self, key: KeyCode) {
        if self.keys_down.remove(&key) {
            self.key_transitions.push((key, false));
        }
    }

    /// Window lost focus: everything held is released.
    pub(crate) fn lose_focus(&mut self) {
        let held: Vec<KeyCode> = self.keys_down.iter().copied().collect();
        for key in held {
            self.release_key(key);
        }
        self.mouse_buttons_down.clear();
        self.focus_lost = true;
    }

    /// Commands for this frame's keyboard, mouse-look and focus changes.
    ///
    /// Pointer commands on HUD widgets are produced by the HUD, not here.
    pub fn commands(&self, ctx: InputContext) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .key_transitions
            .iter()
            .filter_map(|&(key, pressed)| key_command(key, pressed, ctx))
            .collect();

        if ctx.locked && self.raw_motion != Vec2::ZERO {
            commands.push(Command::Look {
                dx: self.raw_motion.x,
                dy: self.raw_motion.y,
            });
        }

        if self.focus_lost {
            commands.push(Command::Unlock);
        }

        commands
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Returns true if the mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Returns true if the mouse button was released this frame.
    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_buttons_released.contains(&button)
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor movement this frame, in window coordinates.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }
}
