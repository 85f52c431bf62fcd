//! 3D scene rendering with depth testing, lighting and textures.
//!
//! [`MeshPass`] owns the GPU copy of the loaded scene: one [`Mesh`] per scene
//! mesh, indexed by the entity's [`MeshIndex`], plus every texture applied
//! at runtime. Each frame it reads [`Appearance`] from the ECS world, so a
//! texture applied to an entity shows up on the next draw.
//!
//! # Bind groups
//!
//! - **Group 0**: frame uniforms (view-projection, camera position, lights)
//! - **Group 1**: per-object uniforms (base colour)
//! - **Group 2**: texture and sampler, white when the object is untextured
//!
//! Single-sided objects are drawn with back-face culling, double-sided ones
//! with a second pipeline that culls nothing.

use std::path::Path;

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::geometry::LoadedScene;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use crate::scene::{Appearance, MeshIndex, SceneWorld};
use crate::texture::{Texture, TextureError, TextureId, TextureLoader};

/// Ambient light intensity.
const AMBIENT: f32 = 0.5;
/// Directional light intensity.
const SUN: f32 = 0.8;
/// The directional light shines from here toward the origin.
const SUN_POSITION: Vec3 = Vec3::new(5.0, 74.26, 7.48);

/// Per-frame uniforms.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    ambient: f32,
    light_dir: [f32; 3],
    sun: f32,
}

/// Per-object uniforms.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniforms {
    color: [f32; 4],
}

/// GPU resources for one scene mesh.
struct SceneDraw {
    mesh: Mesh,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A texture with its bind group.
struct BoundTexture {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// Renders the scene.
pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    double_sided_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    white: BoundTexture,
    textures: Vec<BoundTexture>,
    draws: Vec<SceneDraw>,
}

impl MeshPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        // Frame uniforms (group 0)
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_entry],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Object uniforms (group 1)
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[uniform_entry],
        });

        // Texture (group 2)
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Texture Bind Group Layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, cull_mode: Option<wgpu::Face>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode,
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipeline = make_pipeline("Scene Pipeline", Some(wgpu::Face::Back));
        let double_sided_pipeline = make_pipeline("Scene Double-Sided Pipeline", None);

        let white_texture = Texture::white(gpu);
        let white = BoundTexture {
            bind_group: Self::texture_bind_group(gpu, &texture_layout, &white_texture),
            texture: white_texture,
        };

        Self {
            pipeline,
            double_sided_pipeline,
            frame_buffer,
            frame_bind_group,
            object_layout,
            texture_layout,
            depth_view: Self::create_depth_view(gpu),
            depth_size: (gpu.width(), gpu.height()),
            white,
            textures: Vec::new(),
            draws: Vec::new(),
        }
    }

    fn texture_bind_group(gpu: &GpuContext, layout: &wgpu::BindGroupLayout, texture: &Texture) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreate the depth buffer if the surface was resized.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Depth attachment for the scene render pass.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Upload every mesh of a loaded scene, replacing any previous one.
    ///
    /// Draw `i` belongs to the entity carrying `MeshIndex(i)`.
    pub fn upload_scene(&mut self, gpu: &GpuContext, scene: &LoadedScene) {
        self.draws = scene
            .meshes
            .iter()
            .map(|mesh| {
                let uniforms = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Object Uniforms"),
                    contents: bytemuck::bytes_of(&ObjectUniforms { color: mesh.base_color }),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Object Bind Group"),
                    layout: &self.object_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    }],
                });
                SceneDraw {
                    mesh: mesh.geometry.upload(gpu),
                    uniforms,
                    bind_group,
                }
            })
            .collect();

        log::info!("Uploaded {} meshes to the GPU", self.draws.len());
    }

    /// Take ownership of a texture and return its handle.
    pub fn add_texture(&mut self, gpu: &GpuContext, texture: Texture) -> TextureId {
        let bind_group = Self::texture_bind_group(gpu, &self.texture_layout, &texture);
        self.textures.push(BoundTexture { texture, bind_group });
        TextureId(self.textures.len() - 1)
    }

    /// Draw every entity that has a mesh.
    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass, camera: &Camera, scene: &SceneWorld) {
        if self.draws.is_empty() {
            return;
        }

        let view_proj = camera.projection_matrix(gpu.aspect()) * camera.view_matrix();
        let frame = FrameUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            ambient: AMBIENT,
            light_dir: SUN_POSITION.normalize().to_array(),
            sun: SUN,
        };
        gpu.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for (_, (appearance, index)) in scene.world().query::<(&Appearance, &MeshIndex)>().iter() {
            let Some(draw) = self.draws.get(index.0) else {
                continue;
            };
            if draw.mesh.is_empty() {
                continue;
            }

            // Each object has its own buffer, so all writes land before the pass runs
            gpu.queue.write_buffer(
                &draw.uniforms,
                0,
                bytemuck::bytes_of(&ObjectUniforms {
                    color: appearance.color,
                }),
            );

            let texture = appearance
                .texture
                .and_then(|id| self.textures.get(id.0))
                .unwrap_or(&self.white);

            render_pass.set_pipeline(if appearance.double_sided {
                &self.double_sided_pipeline
            } else {
                &self.pipeline
            });
            render_pass.set_bind_group(1, &draw.bind_group, &[]);
            render_pass.set_bind_group(2, &texture.bind_group, &[]);
            render_pass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
    }
}

/// Loads image files straight into a [`MeshPass`].
pub struct TextureUploader<'a> {
    pub gpu: &'a GpuContext,
    pub pass: &'a mut MeshPass,
}

impl TextureLoader for TextureUploader<'_> {
    fn load(&mut self, path: &Path) -> Result<TextureId, TextureError> {
        let texture = Texture::from_file(self.gpu, path)?;
        let id = self.pass.add_texture(self.gpu, texture);
        log::info!("Uploaded texture {} as {:?}", path.display(), id);
        Ok(id)
    }
}
