use crate::gpu::GpuContext;
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Opaque identifier for a loaded font.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) usize);

/// Errors that can occur when loading a font.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font: {0}")]
    Font(&'static str),
}

/// Information about a single glyph in the font atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphInfo {
    /// UV coordinates in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the cursor position to where the glyph should be drawn.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the cursor after this glyph.
    pub advance: f32,
}

/// A rasterized glyph waiting to be packed.
struct RasterGlyph {
    ch: char,
    metrics: fontdue::Metrics,
    bitmap: Vec<u8>,
}

/// Single-channel atlas bitmap plus glyph placement.
struct PackedAtlas {
    width: u32,
    height: u32,
    data: Vec<u8>,
    glyphs: HashMap<char, GlyphInfo>,
}

const PADDING: u32 = 1;

/// Row-pack glyphs into the smallest power-of-two atlas (from 512x512) that
/// fits them all.
fn pack(rasterized: &[RasterGlyph]) -> PackedAtlas {
    let fits = |atlas_width: u32, atlas_height: u32| {
        let mut x = PADDING;
        let mut y = PADDING;
        let mut row_height = 0u32;
        for glyph in rasterized {
            let (w, h) = (glyph.metrics.width as u32, glyph.metrics.height as u32);
            if x + w + PADDING > atlas_width {
                x = PADDING;
                y += row_height + PADDING;
                row_height = 0;
            }
            if y + h + PADDING > atlas_height {
                return false;
            }
            x += w + PADDING;
            row_height = row_height.max(h);
        }
        true
    };

    let mut width = 512u32;
    let mut height = 512u32;
    while !fits(width, height) {
        // Double the smaller dimension
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    }

    let mut data = vec![0u8; (width * height) as usize];
    let mut glyphs = HashMap::new();
    let mut x = PADDING;
    let mut y = PADDING;
    let mut row_height = 0u32;

    for glyph in rasterized {
        let (w, h) = (glyph.metrics.width as u32, glyph.metrics.height as u32);
        if x + w + PADDING > width {
            x = PADDING;
            y += row_height + PADDING;
            row_height = 0;
        }

        for gy in 0..h {
            let src = (gy * w) as usize;
            let dst = ((y + gy) * width + x) as usize;
            data[dst..dst + w as usize].copy_from_slice(&glyph.bitmap[src..src + w as usize]);
        }

        glyphs.insert(
            glyph.ch,
            GlyphInfo {
                uv: [
                    x as f32 / width as f32,
                    y as f32 / height as f32,
                    w as f32 / width as f32,
                    h as f32 / height as f32,
                ],
                width: w,
                height: h,
                offset_x: glyph.metrics.xmin as f32,
                offset_y: glyph.metrics.ymin as f32,
                advance: glyph.metrics.advance_width,
            },
        );

        x += w + PADDING;
        row_height = row_height.max(h);
    }

    PackedAtlas {
        width,
        height,
        data,
        glyphs,
    }
}

/// A font atlas containing pre-rasterized printable ASCII.
pub struct FontAtlas {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
}

impl FontAtlas {
    /// Rasterize TTF/OTF data at `size` pixels and upload the atlas.
    pub fn new(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self, AssetError> {
        let font = Font::from_bytes(font_data, FontSettings::default()).map_err(AssetError::Font)?;

        let rasterized: Vec<RasterGlyph> = (32u8..=126u8)
            .map(|c| {
                let ch = c as char;
                let (metrics, bitmap) = font.rasterize(ch, size);
                RasterGlyph { ch, metrics, bitmap }
            })
            .collect();

        let atlas = pack(&rasterized);

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: wgpu::Extent3d {
                width: atlas.width,
                height: atlas.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas.width),
                rows_per_image: Some(atlas.height),
            },
            wgpu::Extent3d {
                width: atlas.width,
                height: atlas.height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let line_height = font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2);

        Ok(Self {
            view,
            sampler,
            glyphs: atlas.glyphs,
            size,
            line_height,
        })
    }

    /// Get glyph info for a character.
    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Get the font size this atlas was created with.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Get the line height for this font.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Measure the width of a string.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| self.glyphs.get(&c).map_or(self.size * 0.5, |g| g.advance))
            .sum()
    }
}

/// Loaded fonts.
#[derive(Default)]
pub struct Assets {
    pub(crate) fonts: Vec<Arc<FontAtlas>>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font from a file path.
    pub fn load_font(&mut self, gpu: &GpuContext, path: &Path, size: f32) -> Result<FontId, AssetError> {
        let data = std::fs::read(path).map_err(|source| AssetError::Read {
            path: path.display().to_string(),
            source,
        })?;
        self.load_font_bytes(gpu, &data, size)
    }

    /// Load a font from raw TTF/OTF bytes.
    pub fn load_font_bytes(&mut self, gpu: &GpuContext, data: &[u8], size: f32) -> Result<FontId, AssetError> {
        let atlas = FontAtlas::new(gpu, data, size)?;
        let id = FontId(self.fonts.len());
        self.fonts.push(Arc::new(atlas));
        Ok(id)
    }

    /// Get a font atlas by ID.
    pub fn font(&self, id: FontId) -> Option<Arc<FontAtlas>> {
        self.fonts.get(id.0).cloned()
    }
}
