//! The "virtual canting" minigame.
//!
//! A canting is the pen used to draw wax lines in batik. Here the player
//! picks a motif, then drags across a white sheet to reveal the motif
//! underneath in round strokes. Finishing paints the motif onto the special
//! object in the scene.
//!
//! The modal has two screens:
//!
//! - [`CantingScreen::MotifSelection`] lists the configured [`Motif`]s
//! - [`CantingScreen::Canvas`] shows a [`CantingCanvas`] being revealed
//!
//! Pointer lock is handled by the session: opening the modal releases the
//! cursor, closing it captures the cursor again.

use std::path::{Path, PathBuf};

use hecs::Entity;
use image::{Rgba, RgbaImage, imageops};
use serde::Deserialize;

use crate::texture::{TextureError, TextureId, TextureLoader, load_rgba};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A selectable motif image.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Motif {
    /// Display name.
    pub name: String,
    /// Image file drawn under the white sheet and applied on finish.
    pub path: PathBuf,
}

/// Tuning for the minigame.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CantingConfig {
    /// Canvas edge length in pixels.
    pub canvas_size: u32,
    /// Radius of one reveal stroke in canvas pixels.
    pub brush_radius: f32,
    /// Motifs offered on the selection screen.
    pub motifs: Vec<Motif>,
}

impl Default for CantingConfig {
    fn default() -> Self {
        Self {
            canvas_size: 600,
            brush_radius: 60.0,
            motifs: vec![Motif {
                name: "Megamendung".to_string(),
                path: PathBuf::from("assets/megamendung.jpg"),
            }],
        }
    }
}

/// Why finishing the minigame failed.
#[derive(Debug, thiserror::Error)]
pub enum CantingError {
    #[error("no object to paint")]
    NoTarget,
    #[error("no motif selected")]
    NoMotif,
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// One reveal circle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Stroke {
    fn covers(&self, px: u32, py: u32) -> bool {
        let dx = px as f32 + 0.5 - self.x;
        let dy = py as f32 + 0.5 - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// A square sheet that reveals a motif where the player has drawn.
pub struct CantingCanvas {
    size: u32,
    brush_radius: f32,
    motif_path: PathBuf,
    motif: Option<RgbaImage>,
    composite: RgbaImage,
    strokes: Vec<Stroke>,
    drawing: bool,
    dirty: bool,
}

impl CantingCanvas {
    /// Create a white canvas over `motif`, stretched to the canvas size.
    ///
    /// Without a motif image the canvas stays white whatever is drawn.
    pub fn new(size: u32, brush_radius: f32, motif_path: impl Into<PathBuf>, motif: Option<RgbaImage>) -> Self {
        let size = size.max(1);
        let motif = motif.map(|img| {
            if img.dimensions() == (size, size) {
                img
            } else {
                imageops::resize(&img, size, size, imageops::FilterType::Triangle)
            }
        });

        Self {
            size,
            brush_radius,
            motif_path: motif_path.into(),
            motif,
            composite: RgbaImage::from_pixel(size, size, WHITE),
            strokes: Vec::new(),
            drawing: false,
            dirty: true,
        }
    }

    /// Load the motif from disk. A failed load gives a plain white canvas.
    pub fn open(size: u32, brush_radius: f32, motif_path: &Path) -> Self {
        let motif = match load_rgba(motif_path) {
            Ok(img) => {
                log::info!("Loaded motif {}", motif_path.display());
                Some(img)
            }
            Err(err) => {
                log::error!("{}; showing a blank canvas", err);
                None
            }
        };
        Self::new(size, brush_radius, motif_path, motif)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn motif_path(&self) -> &Path {
        &self.motif_path
    }

    /// True if the motif image loaded.
    pub fn has_motif(&self) -> bool {
        self.motif.is_some()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Press on the canvas: start drawing and reveal under the pointer.
    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        self.drawing = true;
        self.drag(x, y);
    }

    /// Pointer moved. Reveals only while drawing.
    pub fn drag(&mut self, x: f32, y: f32) {
        if !self.drawing {
            return;
        }
        let stroke = Stroke {
            x,
            y,
            radius: self.brush_radius,
        };
        self.strokes.push(stroke);
        self.reveal(stroke);

        if self.strokes.len() % 10 == 1 {
            log::trace!("Canting stroke at ({:.0}, {:.0})", x, y);
        }
    }

    /// Release or pointer left the canvas.
    pub fn end_stroke(&mut self) {
        if self.drawing {
            log::debug!("Canting stroke ended, {} reveals so far", self.strokes.len());
        }
        self.drawing = false;
    }

    /// True if the pixel shows the motif rather than the white sheet.
    pub fn is_revealed(&self, px: u32, py: u32) -> bool {
        self.motif.is_some() && self.strokes.iter().any(|s| s.covers(px, py))
    }

    /// The current picture: motif inside strokes, white elsewhere.
    pub fn composite(&self) -> &RgbaImage {
        &self.composite
    }

    /// Take the "needs re-upload" flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Copy motif pixels under one stroke into the composite.
    fn reveal(&mut self, stroke: Stroke) {
        let Some(motif) = &self.motif else {
            return;
        };

        let max = self.size as f32;
        let x0 = (stroke.x - stroke.radius).floor().clamp(0.0, max) as u32;
        let x1 = (stroke.x + stroke.radius).ceil().clamp(0.0, max) as u32;
        let y0 = (stroke.y - stroke.radius).floor().clamp(0.0, max) as u32;
        let y1 = (stroke.y + stroke.radius).ceil().clamp(0.0, max) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                if stroke.covers(px, py) {
                    self.composite.put_pixel(px, py, *motif.get_pixel(px, py));
                }
            }
        }
        self.dirty = true;
    }
}

/// Which screen of the modal is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CantingScreen {
    MotifSelection,
    Canvas,
}

/// Modal state of the minigame.
pub struct CantingModal {
    config: CantingConfig,
    open: bool,
    canvas: Option<CantingCanvas>,
}

impl CantingModal {
    pub fn new(config: CantingConfig) -> Self {
        Self {
            config,
            open: false,
            canvas: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn screen(&self) -> CantingScreen {
        if self.canvas.is_some() {
            CantingScreen::Canvas
        } else {
            CantingScreen::MotifSelection
        }
    }

    pub fn motifs(&self) -> &[Motif] {
        &self.config.motifs
    }

    /// Side length of new canvases in pixels.
    pub fn canvas_size(&self) -> u32 {
        self.config.canvas_size
    }

    pub fn canvas(&self) -> Option<&CantingCanvas> {
        self.canvas.as_ref()
    }

    pub fn canvas_mut(&mut self) -> Option<&mut CantingCanvas> {
        self.canvas.as_mut()
    }

    /// Show the modal. Returns false if it was already open.
    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        log::info!("Canting opened");
        true
    }

    /// Hide the modal, keeping the current screen. Returns false if it was
    /// already closed.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        if let Some(canvas) = &mut self.canvas {
            canvas.end_stroke();
        }
        log::info!("Canting closed");
        true
    }

    /// Pick a configured motif by index and switch to the canvas.
    pub fn select_motif(&mut self, index: usize) -> bool {
        let Some(motif) = self.config.motifs.get(index) else {
            log::warn!("No motif at index {}", index);
            return false;
        };
        log::info!("Selected motif '{}'", motif.name);
        let canvas = CantingCanvas::open(self.config.canvas_size, self.config.brush_radius, &motif.path);
        self.canvas = Some(canvas);
        true
    }

    /// Switch to the canvas with an already decoded motif.
    pub fn start_canvas(&mut self, motif_path: impl Into<PathBuf>, motif: Option<RgbaImage>) {
        self.canvas = Some(CantingCanvas::new(
            self.config.canvas_size,
            self.config.brush_radius,
            motif_path,
            motif,
        ));
    }

    /// Return to the motif list, discarding the canvas.
    pub fn back(&mut self) {
        self.canvas = None;
    }

    /// Load the selected motif as a texture for `target`.
    ///
    /// On success the canvas is discarded so the next visit starts on the
    /// motif list. On failure nothing changes.
    pub fn finish(
        &mut self,
        target: Option<Entity>,
        loader: &mut dyn TextureLoader,
    ) -> Result<(Entity, TextureId), CantingError> {
        let target = target.ok_or(CantingError::NoTarget)?;
        let path = self
            .canvas
            .as_ref()
            .map(|c| c.motif_path().to_path_buf())
            .ok_or(CantingError::NoMotif)?;

        let texture = loader.load(&path)?;
        self.canvas = None;
        Ok((target, texture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([200, 10, 10, 255]))
    }

    struct FakeLoader {
        fail: bool,
        loaded: Vec<PathBuf>,
    }

    impl TextureLoader for FakeLoader {
        fn load(&mut self, path: &Path) -> Result<TextureId, TextureError> {
            if self.fail {
                return Err(TextureError::TooLarge {
                    path: path.display().to_string(),
                    width: 1,
                    height: 1,
                    max: 0,
                });
            }
            self.loaded.push(path.to_path_buf());
            Ok(TextureId(self.loaded.len() - 1))
        }
    }

    #[test]
    fn canvas_starts_white() {
        let canvas = CantingCanvas::new(64, 8.0, "m.jpg", Some(red(64)));

        assert!(canvas.composite().pixels().all(|p| *p == WHITE));
        assert!(!canvas.is_revealed(32, 32));
    }

    #[test]
    fn dragging_reveals_circles_only_while_drawing() {
        let mut canvas = CantingCanvas::new(64, 8.0, "m.jpg", Some(red(64)));

        canvas.drag(10.0, 10.0);
        assert!(canvas.strokes().is_empty());

        canvas.begin_stroke(32.0, 32.0);
        canvas.drag(40.0, 32.0);
        canvas.end_stroke();
        canvas.drag(5.0, 5.0);

        assert_eq!(canvas.strokes().len(), 2);
        assert_eq!(*canvas.composite().get_pixel(32, 32), Rgba([200, 10, 10, 255]));
        assert_eq!(*canvas.composite().get_pixel(46, 32), Rgba([200, 10, 10, 255]));
        assert_eq!(*canvas.composite().get_pixel(60, 32), WHITE);
        assert_eq!(*canvas.composite().get_pixel(5, 5), WHITE);
        assert!(canvas.is_revealed(32, 38));
        assert!(!canvas.is_revealed(32, 45));
    }

    #[test]
    fn strokes_near_the_edge_are_clipped() {
        let mut canvas = CantingCanvas::new(16, 8.0, "m.jpg", Some(red(16)));
        canvas.begin_stroke(0.0, 15.0);
        canvas.begin_stroke(-100.0, 300.0);

        assert_eq!(*canvas.composite().get_pixel(0, 15), Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn missing_motif_stays_white() {
        let mut canvas = CantingCanvas::open(32, 8.0, Path::new("no/such/motif.jpg"));
        canvas.begin_stroke(16.0, 16.0);

        assert!(!canvas.has_motif());
        assert!(canvas.composite().pixels().all(|p| *p == WHITE));
        assert!(!canvas.is_revealed(16, 16));
    }

    #[test]
    fn motif_is_stretched_to_canvas() {
        let canvas = CantingCanvas::new(32, 8.0, "m.jpg", Some(red(8)));
        assert!(canvas.has_motif());
        assert_eq!(canvas.composite().dimensions(), (32, 32));
    }

    #[test]
    fn finish_needs_target_and_motif() {
        let mut modal = CantingModal::new(CantingConfig::default());
        let mut loader = FakeLoader {
            fail: false,
            loaded: Vec::new(),
        };
        let mut world = hecs::World::new();
        let special = world.spawn((0u8,));

        assert!(matches!(modal.finish(None, &mut loader), Err(CantingError::NoTarget)));
        assert!(matches!(modal.finish(Some(special), &mut loader), Err(CantingError::NoMotif)));

        modal.start_canvas("assets/megamendung.jpg", Some(red(4)));
        assert_eq!(modal.screen(), CantingScreen::Canvas);

        let (entity, texture) = modal.finish(Some(special), &mut loader).unwrap();
        assert_eq!(entity, special);
        assert_eq!(texture, TextureId(0));
        assert_eq!(loader.loaded, vec![PathBuf::from("assets/megamendung.jpg")]);
        assert_eq!(modal.screen(), CantingScreen::MotifSelection);
    }

    #[test]
    fn failed_texture_load_keeps_canvas() {
        let mut modal = CantingModal::new(CantingConfig::default());
        let mut loader = FakeLoader {
            fail: true,
            loaded: Vec::new(),
        };
        let mut world = hecs::World::new();
        let special = world.spawn((0u8,));

        modal.start_canvas("assets/megamendung.jpg", None);
        assert!(matches!(
            modal.finish(Some(special), &mut loader),
            Err(CantingError::Texture(_))
        ));
        assert_eq!(modal.screen(), CantingScreen::Canvas);
    }

    #[test]
    fn open_close_and_back() {
        let mut modal = CantingModal::new(CantingConfig::default());

        assert!(modal.open());
        assert!(!modal.open());
        modal.start_canvas("m.jpg", None);
        modal.back();
        assert_eq!(modal.screen(), CantingScreen::MotifSelection);
        assert!(modal.close());
        assert!(!modal.close());
        assert!(!modal.select_motif(99));
    }
}
