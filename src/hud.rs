//! Heads-up display: crosshair, prompt, info panel, overlays and the canting
//! modal.
//!
//! Layout and pointer hit-testing are plain functions of the window size so
//! they can be checked without a GPU. [`Hud`] itself owns the GPU side: fonts,
//! motif thumbnails and the canvas texture, which is rewritten whenever the
//! canvas reports new strokes.

use glam::Vec2;
use winit::event::MouseButton;

use crate::assets::{Assets, FontId};
use crate::canting::{CantingCanvas, CantingScreen, Motif};
use crate::command::{Command, SessionEvent};
use crate::draw2d::{Color, Draw2d, ImageId, Rect};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::session::{Overlay, Session};
use crate::texture::Texture;

const BODY_SIZE: f32 = 16.0;
const TITLE_SIZE: f32 = 32.0;
const MESSAGE_SECONDS: f32 = 4.0;

const CARD_W: f32 = 160.0;
const CARD_H: f32 = 190.0;
const CARD_GAP: f32 = 20.0;
const BUTTON_W: f32 = 140.0;
const BUTTON_H: f32 = 44.0;

/// Mouse state for one frame, as the HUD needs it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    pub position: Vec2,
    pub pressed: bool,
    pub down: bool,
    pub released: bool,
    pub moved: bool,
}

impl Pointer {
    pub fn from_input(input: &Input) -> Self {
        Self {
            position: input.mouse_position(),
            pressed: input.mouse_pressed(MouseButton::Left),
            down: input.mouse_down(MouseButton::Left),
            released: input.mouse_released(MouseButton::Left),
            moved: input.mouse_delta() != Vec2::ZERO,
        }
    }
}

/// Where everything in the canting modal sits for a given window size.
#[derive(Clone, Debug, PartialEq)]
pub struct ModalLayout {
    pub panel: Rect,
    pub close: Rect,
    pub canvas: Rect,
    pub back: Rect,
    pub finish: Rect,
    pub cards: Vec<Rect>,
    canvas_size: u32,
}

impl ModalLayout {
    pub fn new(screen: Vec2, canvas_size: u32, motif_count: usize) -> Self {
        let side = (canvas_size as f32)
            .min(screen.y - 200.0)
            .min(screen.x - 120.0)
            .max(64.0);

        let panel = Rect::centered(screen * 0.5, side + 80.0, side + 180.0);
        let close = Rect::new(panel.x + panel.w - 44.0, panel.y + 12.0, 32.0, 32.0);
        let canvas = Rect::new(panel.center().x - side * 0.5, panel.y + 70.0, side, side);

        let buttons_y = canvas.y + canvas.h + 24.0;
        let back = Rect::new(panel.x + 40.0, buttons_y, BUTTON_W, BUTTON_H);
        let finish = Rect::new(panel.x + panel.w - 40.0 - BUTTON_W, buttons_y, BUTTON_W, BUTTON_H);

        let columns = (((side + CARD_GAP) / (CARD_W + CARD_GAP)).floor() as usize).max(1);
        let cards = (0..motif_count)
            .map(|i| {
                let (col, row) = ((i % columns) as f32, (i / columns) as f32);
                Rect::new(
                    canvas.x + col * (CARD_W + CARD_GAP),
                    canvas.y + row * (CARD_H + CARD_GAP),
                    CARD_W,
                    CARD_H,
                )
            })
            .collect();

        Self {
            panel,
            close,
            canvas,
            back,
            finish,
            cards,
            canvas_size,
        }
    }

    /// Window position to canvas pixels, if it lies on the canvas.
    pub fn canvas_point(&self, p: Vec2) -> Option<Vec2> {
        if !self.canvas.contains(p) {
            return None;
        }
        Some(self.canvas.local(p) * (self.canvas_size as f32 / self.canvas.w))
    }
}

/// Pointer commands for HUD widgets.
///
/// `drawing` is whether a canvas stroke is in progress.
pub fn pointer_commands(
    pointer: Pointer,
    overlay: Overlay,
    screen: CantingScreen,
    layout: &ModalLayout,
    drawing: bool,
) -> Vec<Command> {
    let mut commands = Vec::new();

    match overlay {
        Overlay::Welcome | Overlay::Paused => {
            if pointer.pressed {
                commands.push(Command::Lock);
            }
        }
        Overlay::None => {}
        Overlay::Canting => {
            if pointer.pressed {
                let p = pointer.position;
                if layout.close.contains(p) {
                    commands.push(Command::CloseCanting);
                    return commands;
                }
                match screen {
                    CantingScreen::MotifSelection => {
                        if let Some(i) = layout.cards.iter().position(|r| r.contains(p)) {
                            commands.push(Command::SelectMotif(i));
                        }
                    }
                    CantingScreen::Canvas => {
                        if layout.back.contains(p) {
                            commands.push(Command::BackToMotifs);
                        } else if layout.finish.contains(p) {
                            commands.push(Command::FinishCanting);
                        } else if let Some(c) = layout.canvas_point(p) {
                            commands.push(Command::CanvasPress { x: c.x, y: c.y });
                        }
                    }
                }
            } else if drawing && screen == CantingScreen::Canvas {
                if pointer.released {
                    commands.push(Command::CanvasRelease);
                } else if pointer.down && pointer.moved {
                    match layout.canvas_point(pointer.position) {
                        Some(c) => commands.push(Command::CanvasMove { x: c.x, y: c.y }),
                        None => commands.push(Command::CanvasRelease),
                    }
                }
            }
        }
    }

    commands
}

/// The canvas texture and its 2D handle.
struct CanvasImage {
    texture: Texture,
    image: ImageId,
}

/// Draws the HUD and turns clicks on it into commands.
pub struct Hud {
    body: Option<FontId>,
    title: Option<FontId>,
    thumbnails: Vec<Option<ImageId>>,
    canvas: Option<CanvasImage>,
    status: Option<String>,
    message: Option<(String, f32)>,
}

impl Hud {
    /// Load fonts and motif thumbnails. Missing files degrade the HUD instead
    /// of failing.
    pub fn new(gpu: &GpuContext, assets: &mut Assets, draw2d: &mut Draw2d, font: &std::path::Path, motifs: &[Motif]) -> Self {
        let (body, title) = match assets.load_font(gpu, font, BODY_SIZE) {
            Ok(body) => (Some(body), assets.load_font(gpu, font, TITLE_SIZE).ok()),
            Err(err) => {
                log::error!("{}; HUD text is disabled", err);
                (None, None)
            }
        };
        draw2d.update_font_bind_groups(gpu, assets);

        let thumbnails = motifs
            .iter()
            .map(|motif| match Texture::from_file(gpu, &motif.path) {
                Ok(texture) => Some(draw2d.register_image(gpu, &texture)),
                Err(err) => {
                    log::warn!("No thumbnail for motif '{}': {}", motif.name, err);
                    None
                }
            })
            .collect();

        Self {
            body,
            title,
            thumbnails,
            canvas: None,
            status: Some("Loading scene...".to_string()),
            message: None,
        }
    }

    /// React to session events.
    pub fn handle_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::SceneReady { .. } => self.status = None,
            SessionEvent::SceneFailed(reason) => self.status = Some(format!("Scene failed to load: {}", reason)),
            SessionEvent::CantingFailed(reason) => {
                self.message = Some((format!("Could not apply motif: {}", reason), MESSAGE_SECONDS))
            }
            SessionEvent::TextureApplied { .. } => {
                self.message = Some(("Motif applied".to_string(), MESSAGE_SECONDS))
            }
            _ => {}
        }
    }

    /// Age transient messages.
    pub fn update(&mut self, dt: f32) {
        if let Some((_, remaining)) = &mut self.message {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.message = None;
            }
        }
    }

    /// Keep the canvas texture in sync with the canvas pixels.
    pub fn sync_canvas(&mut self, gpu: &GpuContext, draw2d: &mut Draw2d, canvas: &mut CantingCanvas) {
        let size = canvas.size();
        let stale = self
            .canvas
            .as_ref()
            .is_none_or(|c| c.texture.width != size || c.texture.height != size);

        let dirty = canvas.take_dirty();

        if stale {
            let texture = Texture::from_rgba(gpu, canvas.composite(), size, size, "Canting Canvas");
            let image = draw2d.register_image(gpu, &texture);
            self.canvas = Some(CanvasImage { texture, image });
        } else if dirty {
            if let Some(c) = &self.canvas {
                c.texture.write(gpu, canvas.composite());
            }
        }
    }

    /// Batch this frame's HUD.
    pub fn draw(&self, draw2d: &mut Draw2d, assets: &Assets, screen: Vec2, session: &Session) {
        match session.overlay() {
            Overlay::None => self.draw_walking(draw2d, assets, screen, session),
            Overlay::Welcome => self.draw_blocker(
                draw2d,
                assets,
                screen,
                "Rumah Batik",
                &["Click to start", "WASD move  |  Mouse look  |  E info  |  Q canting  |  Esc pause"],
            ),
            Overlay::Paused => self.draw_blocker(draw2d, assets, screen, "Paused", &["Click to resume"]),
            Overlay::Canting => self.draw_canting(draw2d, assets, screen, session),
        }

        if let Some(status) = &self.status {
            self.banner(draw2d, assets, Vec2::new(16.0, 16.0), status);
        }
        if let Some((message, _)) = &self.message {
            let width = self.measure(assets, self.body, message);
            self.banner(draw2d, assets, Vec2::new((screen.x - width) * 0.5 - 12.0, screen.y - 64.0), message);
        }
    }

    fn draw_walking(&self, draw2d: &mut Draw2d, assets: &Assets, screen: Vec2, session: &Session) {
        let center = screen * 0.5;
        let white = Color::WHITE.with_alpha(0.8);
        draw2d.rect(Rect::centered(center, 16.0, 2.0), white);
        draw2d.rect(Rect::centered(center, 2.0, 16.0), white);

        let targeter = session.targeter();
        let visibility = session.visibility();

        if let (true, Some(prompt)) = (visibility.prompt_visible, targeter.prompt()) {
            let text = prompt.text();
            let width = self.measure(assets, self.body, text);
            let bar = Rect::centered(Vec2::new(center.x, screen.y * 0.75), width + 32.0, 36.0);
            draw2d.rect(bar, Color::BLACK.with_alpha(0.6));
            self.text(draw2d, assets, self.body, bar.x + 16.0, bar.y + 8.0, text, Color::WHITE);
        }

        if let (true, Some(info)) = (visibility.info_panel_open, targeter.info()) {
            let rows = info.rows();
            let line = self.line_height(assets, self.body) + 4.0;
            let panel = Rect::new(screen.x - 380.0, 40.0, 340.0, 56.0 + line * rows.len() as f32);
            draw2d.rect(panel, Color::BLACK.with_alpha(0.75));
            draw2d.outline(panel, 1.0, Color::hex(0xc8a060));
            self.text(draw2d, assets, self.body, panel.x + 16.0, panel.y + 12.0, "Object Info", Color::hex(0xf0d080));

            for (i, (label, value)) in rows.iter().enumerate() {
                let y = panel.y + 44.0 + line * i as f32;
                self.text(draw2d, assets, self.body, panel.x + 16.0, y, label, Color::hex(0xbbbbbb));
                self.text(draw2d, assets, self.body, panel.x + 120.0, y, value, Color::WHITE);
            }
        }
    }

    fn draw_blocker(&self, draw2d: &mut Draw2d, assets: &Assets, screen: Vec2, title: &str, lines: &[&str]) {
        draw2d.rect(Rect::new(0.0, 0.0, screen.x, screen.y), Color::BLACK.with_alpha(0.5));

        let mut y = screen.y * 0.4;
        self.centered_text(draw2d, assets, self.title, screen.x * 0.5, y, title, Color::WHITE);
        y += TITLE_SIZE + 24.0;
        for line in lines {
            self.centered_text(draw2d, assets, self.body, screen.x * 0.5, y, line, Color::WHITE);
            y += BODY_SIZE + 12.0;
        }
    }

    fn draw_canting(&self, draw2d: &mut Draw2d, assets: &Assets, screen: Vec2, session: &Session) {
        let modal = session.canting();
        let layout = ModalLayout::new(screen, canvas_size(session), modal.motifs().len());

        draw2d.rect(Rect::new(0.0, 0.0, screen.x, screen.y), Color::BLACK.with_alpha(0.6));
        draw2d.rect(layout.panel, Color::hex(0xf5efe0));
        draw2d.outline(layout.panel, 2.0, Color::hex(0x8b5a2b));
        draw2d.outline(layout.panel.inset(6.0), 1.0, Color::hex(0xc8a060));

        let title_y = layout.panel.y + 18.0;
        self.text(draw2d, assets, self.title, layout.panel.x + 40.0, title_y, "Canting", Color::hex(0x4a2c12));
        draw2d.rect(layout.close, Color::hex(0x8b5a2b));
        let close_center = layout.close.center();
        self.centered_text(draw2d, assets, self.body, close_center.x, close_center.y - 10.0, "X", Color::WHITE);

        match modal.screen() {
            CantingScreen::MotifSelection => {
                for (i, (motif, card)) in modal.motifs().iter().zip(&layout.cards).enumerate() {
                    draw2d.rect(*card, Color::WHITE);
                    draw2d.outline(*card, 1.0, Color::hex(0x8b5a2b));
                    let thumb = Rect::new(card.x + 10.0, card.y + 10.0, card.w - 20.0, card.w - 20.0);
                    match self.thumbnails.get(i).copied().flatten() {
                        Some(image) => draw2d.image(image, thumb, Color::WHITE),
                        None => draw2d.rect(thumb, Color::hex(0xdddddd)),
                    }
                    let label = format!("{}. {}", i + 1, motif.name);
                    let y = card.y + card.h - 34.0;
                    self.centered_text(draw2d, assets, self.body, card.center().x, y, &label, Color::hex(0x4a2c12));
                }
            }
            CantingScreen::Canvas => {
                match &self.canvas {
                    Some(canvas) => draw2d.image(canvas.image, layout.canvas, Color::WHITE),
                    None => draw2d.rect(layout.canvas, Color::WHITE),
                }
                draw2d.outline(layout.canvas, 1.0, Color::hex(0x8b5a2b));

                for (rect, label, fill) in [
                    (layout.back, "Back", Color::hex(0x9a9a9a)),
                    (layout.finish, "Finish", Color::hex(0x8b5a2b)),
                ] {
                    draw2d.rect(rect, fill);
                    let c = rect.center();
                    self.centered_text(draw2d, assets, self.body, c.x, c.y - 10.0, label, Color::WHITE);
                }
            }
        }
    }

    /// Text on a dark strip, readable over the scene and the overlays.
    fn banner(&self, draw2d: &mut Draw2d, assets: &Assets, at: Vec2, text: &str) {
        let width = self.measure(assets, self.body, text);
        draw2d.rect(Rect::new(at.x, at.y, width + 24.0, 32.0), Color::BLACK.with_alpha(0.7));
        self.text(draw2d, assets, self.body, at.x + 12.0, at.y + 7.0, text, Color::WHITE);
    }

    fn text(&self, draw2d: &mut Draw2d, assets: &Assets, font: Option<FontId>, x: f32, y: f32, text: &str, color: Color) {
        if let Some(font) = font {
            draw2d.text(assets, font, x, y, text, color);
        }
    }

    fn centered_text(&self, draw2d: &mut Draw2d, assets: &Assets, font: Option<FontId>, cx: f32, y: f32, text: &str, color: Color) {
        let width = self.measure(assets, font, text);
        self.text(draw2d, assets, font, cx - width * 0.5, y, text, color);
    }

    fn measure(&self, assets: &Assets, font: Option<FontId>, text: &str) -> f32 {
        font.and_then(|f| assets.font(f)).map_or(0.0, |f| f.measure(text))
    }

    fn line_height(&self, assets: &Assets, font: Option<FontId>) -> f32 {
        font.and_then(|f| assets.font(f)).map_or(BODY_SIZE, |f| f.line_height())
    }

    /// Clicks on HUD widgets this frame.
    pub fn commands(&self, pointer: Pointer, screen: Vec2, session: &Session) -> Vec<Command> {
        let modal = session.canting();
        let layout = ModalLayout::new(screen, canvas_size(session), modal.motifs().len());
        let drawing = modal.canvas().is_some_and(|c| c.is_drawing());
        pointer_commands(pointer, session.overlay(), modal.screen(), &layout, drawing)
    }
}

/// Pixel size of the current canvas, or the configured size before one exists.
fn canvas_size(session: &Session) -> u32 {
    session
        .canting()
        .canvas()
        .map_or(session.canting().canvas_size(), |c| c.size())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Vec2 = Vec2::new(1280.0, 900.0);

    fn click(at: Vec2) -> Pointer {
        Pointer {
            position: at,
            pressed: true,
            down: true,
            ..Default::default()
        }
    }

    fn layout() -> ModalLayout {
        ModalLayout::new(SCREEN, 600, 3)
    }

    #[test]
    fn layout_fits_canvas_and_centres_panel() {
        let l = layout();
        assert_eq!(l.canvas.w, 600.0);
        assert_eq!(l.panel.center(), SCREEN * 0.5);
        assert!(l.canvas.x > l.panel.x && l.canvas.x + l.canvas.w < l.panel.x + l.panel.w);
        assert!(l.back.y > l.canvas.y + l.canvas.h);
        assert_eq!(l.cards.len(), 3);
    }

    #[test]
    fn small_windows_scale_the_canvas() {
        let l = ModalLayout::new(Vec2::new(800.0, 500.0), 600, 1);
        assert_eq!(l.canvas.w, 300.0);

        let corner = Vec2::new(l.canvas.x + 150.0, l.canvas.y + 75.0);
        assert_eq!(l.canvas_point(corner), Some(Vec2::new(300.0, 150.0)));
        assert_eq!(l.canvas_point(Vec2::new(l.canvas.x - 1.0, l.canvas.y)), None);
    }

    #[test]
    fn clicking_the_blocker_locks() {
        let l = layout();
        for overlay in [Overlay::Welcome, Overlay::Paused] {
            let cmds = pointer_commands(click(Vec2::ZERO), overlay, CantingScreen::MotifSelection, &l, false);
            assert_eq!(cmds, vec![Command::Lock]);
        }
        let cmds = pointer_commands(click(Vec2::ZERO), Overlay::None, CantingScreen::MotifSelection, &l, false);
        assert!(cmds.is_empty());
    }

    #[test]
    fn modal_buttons_hit_test() {
        let l = layout();
        let at = |r: Rect| click(r.center());

        assert_eq!(
            pointer_commands(at(l.cards[1]), Overlay::Canting, CantingScreen::MotifSelection, &l, false),
            vec![Command::SelectMotif(1)]
        );
        assert_eq!(
            pointer_commands(at(l.close), Overlay::Canting, CantingScreen::Canvas, &l, false),
            vec![Command::CloseCanting]
        );
        assert_eq!(
            pointer_commands(at(l.back), Overlay::Canting, CantingScreen::Canvas, &l, false),
            vec![Command::BackToMotifs]
        );
        assert_eq!(
            pointer_commands(at(l.finish), Overlay::Canting, CantingScreen::Canvas, &l, false),
            vec![Command::FinishCanting]
        );
        // Back and Finish don't exist on the selection screen
        assert!(pointer_commands(at(l.finish), Overlay::Canting, CantingScreen::MotifSelection, &l, false).is_empty());
    }

    #[test]
    fn canvas_strokes_follow_the_pointer() {
        let l = layout();
        let start = Vec2::new(l.canvas.x + 10.0, l.canvas.y + 20.0);

        assert_eq!(
            pointer_commands(click(start), Overlay::Canting, CantingScreen::Canvas, &l, false),
            vec![Command::CanvasPress { x: 10.0, y: 20.0 }]
        );

        let drag = Pointer {
            position: start + Vec2::new(5.0, 0.0),
            down: true,
            moved: true,
            ..Default::default()
        };
        assert_eq!(
            pointer_commands(drag, Overlay::Canting, CantingScreen::Canvas, &l, true),
            vec![Command::CanvasMove { x: 15.0, y: 20.0 }]
        );

        let off_canvas = Pointer {
            position: Vec2::new(l.canvas.x - 5.0, l.canvas.y),
            ..drag
        };
        assert_eq!(
            pointer_commands(off_canvas, Overlay::Canting, CantingScreen::Canvas, &l, true),
            vec![Command::CanvasRelease]
        );

        let release = Pointer {
            released: true,
            ..Default::default()
        };
        assert_eq!(
            pointer_commands(release, Overlay::Canting, CantingScreen::Canvas, &l, true),
            vec![Command::CanvasRelease]
        );
    }
}
