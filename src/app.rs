//! Window, event loop and the per-frame driver.
//!
//! Each redraw polls the background loader, turns input into commands, ticks
//! the [`Session`] and renders the scene followed by the HUD.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::assets::Assets;
use crate::command::SessionEvent;
use crate::config::ViewerConfig;
use crate::draw2d::{Draw2d, srgb_to_linear};
use crate::gpu::GpuContext;
use crate::hud::{Hud, Pointer};
use crate::input::{Input, InputContext};
use crate::loader::SceneLoader;
use crate::mesh_pass::{MeshPass, TextureUploader};
use crate::session::Session;

/// Longest step a single frame may take. Stalls (window drags, loading
/// hitches) would otherwise launch the player through walls.
const MAX_FRAME_DT: f32 = 0.1;

/// Open the window and run the walkthrough until it is closed.
///
/// Blocks on the event loop. Returns an error if the window or GPU could not
/// be set up.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = BatikApp::Pending { config };
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app {
        BatikApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

enum BatikApp {
    Pending { config: ViewerConfig },
    Running(Box<Viewer>),
    Failed(anyhow::Error),
}

impl ApplicationHandler for BatikApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let BatikApp::Pending { config } = self {
            *self = match Viewer::new(event_loop, config) {
                Ok(viewer) => {
                    viewer.window.request_redraw();
                    BatikApp::Running(Box::new(viewer))
                }
                Err(err) => {
                    log::error!("{:#}", err);
                    event_loop.exit();
                    BatikApp::Failed(err)
                }
            };
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let BatikApp::Running(viewer) = self else {
            return;
        };

        viewer.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                viewer.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => viewer.frame(),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let BatikApp::Running(viewer) = self {
            viewer.input.handle_device_event(&event);
        }
    }
}

/// Everything that lives for as long as the window does.
struct Viewer {
    window: Arc<Window>,
    gpu: GpuContext,
    mesh_pass: MeshPass,
    draw2d: Draw2d,
    assets: Assets,
    hud: Hud,
    input: Input,
    session: Session,
    loader: SceneLoader,
    clear_color: wgpu::Color,
    last_frame: Instant,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig) -> anyhow::Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.window.width, config.window.height));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

        let gpu = GpuContext::new(window.clone()).context("failed to initialise the GPU")?;
        let mesh_pass = MeshPass::new(&gpu);
        let mut draw2d = Draw2d::new(&gpu);
        let mut assets = Assets::new();
        let hud = Hud::new(&gpu, &mut assets, &mut draw2d, &config.scene.font, &config.canting.motifs);

        let loader = SceneLoader::spawn(config.scene.path.clone(), config.classification.clone());

        // Configured in sRGB, the surface wants linear
        let [r, g, b] = config.scene.clear_color.map(|c| srgb_to_linear(c) as f64);

        Ok(Self {
            window,
            gpu,
            mesh_pass,
            draw2d,
            assets,
            hud,
            input: Input::new(),
            session: Session::from_config(config),
            loader,
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            last_frame: Instant::now(),
        })
    }

    fn frame(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32().min(MAX_FRAME_DT);
        self.last_frame = now;

        self.poll_loader();

        let screen = Vec2::new(self.gpu.width() as f32, self.gpu.height() as f32);
        let ctx = InputContext {
            locked: self.session.is_locked(),
            canting_open: self.session.canting().is_open(),
        };
        let pointer = Pointer::from_input(&self.input);
        let mut commands = self.input.commands(ctx);
        commands.extend(self.hud.commands(pointer, screen, &self.session));
        for command in commands {
            self.session.push(command);
        }

        self.session.tick(
            dt,
            &mut TextureUploader {
                gpu: &self.gpu,
                pass: &mut self.mesh_pass,
            },
        );

        for event in self.session.take_events() {
            if let SessionEvent::LockChanged { locked } = event {
                self.grab_cursor(locked);
            }
            self.hud.handle_event(&event);
        }

        self.hud.update(dt);
        if let Some(canvas) = self.session.canting_mut().canvas_mut() {
            self.hud.sync_canvas(&self.gpu, &mut self.draw2d, canvas);
        }

        self.render(screen);

        self.input.begin_frame();
        self.window.request_redraw();
    }

    /// Hand a finished load to the renderer and the session.
    fn poll_loader(&mut self) {
        match self.loader.poll() {
            Some(Ok(asset)) => {
                self.mesh_pass.upload_scene(&self.gpu, &asset.geometry);
                self.session.publish_scene(asset.world);
            }
            Some(Err(err)) => self.session.scene_failed(err.to_string()),
            None => {}
        }
    }

    /// Capture or release the pointer to match the session's lock.
    fn grab_cursor(&self, locked: bool) {
        if locked {
            // Not every platform can lock; confining still keeps it in the window
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(err) = grabbed {
                log::warn!("Could not grab the cursor: {}", err);
            }
        } else if let Err(err) = self.window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Could not release the cursor: {}", err);
        }
        self.window.set_cursor_visible(!locked);
    }

    fn render(&mut self, screen: Vec2) {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return;
            }
            Err(err) => {
                log::warn!("Skipping frame: {}", err);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.mesh_pass.ensure_depth_size(&self.gpu);
        self.draw2d.clear();
        self.hud.draw(&mut self.draw2d, &self.assets, screen, &self.session);

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.mesh_pass.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let camera = self.session.camera();
            self.mesh_pass
                .render(&self.gpu, &mut render_pass, &camera, self.session.scene());
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HUD Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.draw2d.render(&self.gpu, &mut render_pass);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
