//! Immediate-mode 2D drawing for the HUD.
//!
//! Rectangles, images and text are batched per frame and drawn in one pass
//! over the 3D scene, in that order: all rectangles, then images, then text.
//! Coordinates are window pixels with the origin at the top left.

use glam::Vec2;

use crate::assets::{Assets, FontId};
use crate::gpu::GpuContext;
use crate::texture::Texture;

/// An RGBA colour in linear space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Colour from a `0xRRGGBB` sRGB value, as written in stylesheets.
    pub fn hex(rgb: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((rgb >> shift) & 0xff) as f32 / 255.0);
        Self::rgba(channel(16), channel(8), channel(0), 1.0)
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Convert one sRGB channel to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// An axis-aligned rectangle in window pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// A `w` by `h` rectangle centred on `center`.
    pub fn centered(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w * 0.5, center.y - h * 0.5, w, h)
    }

    /// True if `p` lies inside. The right and bottom edges are exclusive.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// `p` relative to the top-left corner.
    pub fn local(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x - self.x, p.y - self.y)
    }

    /// Shrink by `by` on every side.
    pub fn inset(&self, by: f32) -> Self {
        Self::new(self.x + by, self.y + by, (self.w - by * 2.0).max(0.0), (self.h - by * 2.0).max(0.0))
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }
}

/// Handle to an image registered with [`Draw2d::register_image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub(crate) usize);

/// Vertex for 2D sprite/text rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Two triangles covering `rect` with the given UV corners.
fn quad(rect: Rect, uv0: [f32; 2], uv1: [f32; 2], color: Color) -> [Vertex2d; 6] {
    let c = color.to_array();
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.x + rect.w, rect.y + rect.h);
    let v = |x: f32, y: f32, u: f32, t: f32| Vertex2d {
        position: [x, y],
        uv: [u, t],
        color: c,
    };
    [
        v(x0, y0, uv0[0], uv0[1]),
        v(x1, y0, uv1[0], uv0[1]),
        v(x0, y1, uv0[0], uv1[1]),
        v(x1, y0, uv1[0], uv0[1]),
        v(x1, y1, uv1[0], uv1[1]),
        v(x0, y1, uv0[0], uv1[1]),
    ]
}

/// Uniforms for 2D rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 16384;

/// Batches rectangles, images and text for one frame.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,
    image_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    font_bind_groups: Vec<Option<wgpu::BindGroup>>,
    image_bind_groups: Vec<wgpu::BindGroup>,

    colored_vertices: Vec<Vertex2d>,
    image_batches: Vec<(ImageId, Vec<Vertex2d>)>,
    text_batches: Vec<(FontId, Vec<Vertex2d>)>,
    overflow_logged: bool,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Uniform bind group layout (group 0)
        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw2d Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Texture bind group layout (group 1), shared by fonts and images
        let texture_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw2d Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let colored_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw2d Colored Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let textured_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw2d Textured Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let make_pipeline = |label: &str, layout: &wgpu::PipelineLayout, fragment: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(blend_state),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let colored_pipeline = make_pipeline("Draw2d Colored Pipeline", &colored_pipeline_layout, "fs_colored");
        let text_pipeline = make_pipeline("Draw2d Text Pipeline", &textured_pipeline_layout, "fs_text");
        let image_pipeline = make_pipeline("Draw2d Image Pipeline", &textured_pipeline_layout, "fs_image");

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            colored_pipeline,
            text_pipeline,
            image_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_groups: Vec::new(),
            image_bind_groups: Vec::new(),
            colored_vertices: Vec::with_capacity(1024),
            image_batches: Vec::new(),
            text_batches: Vec::new(),
            overflow_logged: false,
        }
    }

    fn texture_bind_group(&self, gpu: &GpuContext, view: &wgpu::TextureView, sampler: &wgpu::Sampler) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Texture Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Make a texture drawable with [`image`](Self::image).
    ///
    /// The bind group keeps the texture alive, and later writes to it show up.
    pub fn register_image(&mut self, gpu: &GpuContext, texture: &Texture) -> ImageId {
        let bind_group = self.texture_bind_group(gpu, &texture.view, &texture.sampler);
        self.image_bind_groups.push(bind_group);
        ImageId(self.image_bind_groups.len() - 1)
    }

    /// Clear all draw calls for the new frame.
    pub fn clear(&mut self) {
        self.colored_vertices.clear();
        self.image_batches.clear();
        self.text_batches.clear();
    }

    /// Draw a filled rectangle.
    pub fn rect(&mut self, rect: Rect, color: Color) {
        self.colored_vertices.extend_from_slice(&quad(rect, [0.0, 0.0], [0.0, 0.0], color));
    }

    /// Draw a rectangle outline `width` pixels thick, inside `rect`.
    pub fn outline(&mut self, rect: Rect, width: f32, color: Color) {
        let w = width.min(rect.w * 0.5).min(rect.h * 0.5);
        self.rect(Rect::new(rect.x, rect.y, rect.w, w), color);
        self.rect(Rect::new(rect.x, rect.y + rect.h - w, rect.w, w), color);
        self.rect(Rect::new(rect.x, rect.y + w, w, rect.h - w * 2.0), color);
        self.rect(Rect::new(rect.x + rect.w - w, rect.y + w, w, rect.h - w * 2.0), color);
    }

    /// Draw a registered image stretched over `rect`.
    pub fn image(&mut self, image: ImageId, rect: Rect, tint: Color) {
        let vertices = quad(rect, [0.0, 0.0], [1.0, 1.0], tint);
        match self.image_batches.iter_mut().find(|(id, _)| *id == image) {
            Some((_, batch)) => batch.extend_from_slice(&vertices),
            None => self.image_batches.push((image, vertices.to_vec())),
        }
    }

    /// Draw text with its top-left corner at `(x, y)`.
    pub fn text(&mut self, assets: &Assets, font_id: FontId, x: f32, y: f32, text: &str, color: Color) {
        let Some(font) = assets.font(font_id) else {
            return;
        };

        let mut cursor_x = x;
        let baseline_y = y + font.size();

        let batch_idx = self
            .text_batches
            .iter()
            .position(|(id, _)| *id == font_id)
            .unwrap_or_else(|| {
                self.text_batches.push((font_id, Vec::new()));
                self.text_batches.len() - 1
            });

        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                cursor_x += font.size() * 0.5;
                continue;
            };

            if glyph.width > 0 && glyph.height > 0 {
                // fontdue's ymin is the distance from the baseline to the glyph bottom
                let gx = cursor_x + glyph.offset_x;
                let gy = baseline_y - glyph.offset_y - glyph.height as f32;
                let rect = Rect::new(gx, gy, glyph.width as f32, glyph.height as f32);

                let uv0 = [glyph.uv[0], glyph.uv[1]];
                let uv1 = [glyph.uv[0] + glyph.uv[2], glyph.uv[1] + glyph.uv[3]];
                self.text_batches[batch_idx].1.extend_from_slice(&quad(rect, uv0, uv1, color));
            }

            cursor_x += glyph.advance;
        }
    }

    /// Ensure we have bind groups for all loaded fonts.
    pub(crate) fn update_font_bind_groups(&mut self, gpu: &GpuContext, assets: &Assets) {
        while self.font_bind_groups.len() < assets.fonts.len() {
            self.font_bind_groups.push(None);
        }

        for (i, font) in assets.fonts.iter().enumerate() {
            if self.font_bind_groups[i].is_none() {
                self.font_bind_groups[i] = Some(self.texture_bind_group(gpu, &font.view, &font.sampler));
            }
        }
    }

    /// Render all batched draw calls.
    pub fn render(&mut self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass) {
        let uniforms = Draw2dUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        let mut offset = 0usize;

        if let Some(range) = self.upload(gpu, &mut offset, &self.colored_vertices) {
            render_pass.set_pipeline(&self.colored_pipeline);
            render_pass.draw(range, 0..1);
        }

        for (image, vertices) in &self.image_batches {
            let Some(bind_group) = self.image_bind_groups.get(image.0) else {
                continue;
            };
            if let Some(range) = self.upload(gpu, &mut offset, vertices) {
                render_pass.set_pipeline(&self.image_pipeline);
                render_pass.set_bind_group(1, bind_group, &[]);
                render_pass.draw(range, 0..1);
            }
        }

        for (font_id, vertices) in &self.text_batches {
            let Some(bind_group) = self.font_bind_groups.get(font_id.0).and_then(|bg| bg.as_ref()) else {
                continue;
            };
            if let Some(range) = self.upload(gpu, &mut offset, vertices) {
                render_pass.set_pipeline(&self.text_pipeline);
                render_pass.set_bind_group(1, bind_group, &[]);
                render_pass.draw(range, 0..1);
            }
        }

        if offset >= MAX_VERTICES && !self.overflow_logged {
            log::warn!("HUD exceeded {} vertices, some elements were dropped", MAX_VERTICES);
            self.overflow_logged = true;
        }
    }

    /// Copy `vertices` into the shared buffer at `offset`, clipped to capacity.
    fn upload(&self, gpu: &GpuContext, offset: &mut usize, vertices: &[Vertex2d]) -> Option<std::ops::Range<u32>> {
        let room = MAX_VERTICES.saturating_sub(*offset);
        // Whole triangles only
        let count = vertices.len().min(room) / 3 * 3;
        if count == 0 {
            return None;
        }

        gpu.queue.write_buffer(
            &self.vertex_buffer,
            (*offset * std::mem::size_of::<Vertex2d>()) as u64,
            bytemuck::cast_slice(&vertices[..count]),
        );

        let range = *offset as u32..(*offset + count) as u32;
        *offset += count;
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_are_linearized() {
        let white = Color::hex(0xffffff);
        assert!((white.r - 1.0).abs() < 1e-6);
        assert_eq!(white.a, 1.0);

        let grey = Color::hex(0xcccccc);
        assert!((grey.r - 0.6038).abs() < 1e-3);
        assert_eq!(grey.r, grey.b);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert!(r.contains(Vec2::new(10.0, 20.0)));
        assert!(r.contains(Vec2::new(109.9, 69.9)));
        assert!(!r.contains(Vec2::new(110.0, 30.0)));
        assert!(!r.contains(Vec2::new(50.0, 19.9)));
        assert_eq!(r.local(Vec2::new(15.0, 25.0)), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn centered_rect_and_inset() {
        let r = Rect::centered(Vec2::new(100.0, 100.0), 40.0, 20.0);
        assert_eq!(r, Rect::new(80.0, 90.0, 40.0, 20.0));
        assert_eq!(r.center(), Vec2::new(100.0, 100.0));
        assert_eq!(r.inset(5.0), Rect::new(85.0, 95.0, 30.0, 10.0));
        assert_eq!(r.inset(50.0).w, 0.0);
    }

    #[test]
    fn quad_covers_rect_with_uv_corners() {
        let q = quad(Rect::new(0.0, 0.0, 2.0, 3.0), [0.0, 0.0], [1.0, 1.0], Color::WHITE);
        assert_eq!(q[0].position, [0.0, 0.0]);
        assert_eq!(q[4].position, [2.0, 3.0]);
        assert_eq!(q[4].uv, [1.0, 1.0]);
        assert!(q.iter().all(|v| v.color == [1.0, 1.0, 1.0, 1.0]));
    }
}
