use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use gridscape_audio::IdlePattern;
use gridscape_common::{GridSettings, SensorSensitivity};
use gridscape_input::{
    Attitude, GridAction, ManualSensor, ManualSensorControl, SensorHub, SyntheticGyro,
};
use gridscape_kernel::{AviationRig, FlightPhase, FrameTimer, GridEngine};
use gridscape_render::GridCamera;
use gridscape_render_wgpu::WgpuGridRenderer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "gridscape-desktop", about = "Gridscape desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML or JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tilt the grid with the mouse instead of the synthetic gyro
    #[arg(long)]
    mouse_tilt: bool,
}

/// Application state.
struct AppState {
    engine: GridEngine,
    camera: GridCamera,
    rig: AviationRig,
    rig_enabled: bool,
    hub: SensorHub,
    tilt: Option<ManualSensorControl>,
    tape: IdlePattern,
    show_panel: bool,
    sensitivity: SensorSensitivity,
    sensor_enabled: bool,
    last_frame: Instant,
    frames: FrameTimer,
    scroll: Vec2,
}

impl AppState {
    fn new(settings: &GridSettings, mouse_tilt: bool) -> Result<Self> {
        let (hub, tilt) = if mouse_tilt {
            let (source, control) = ManualSensor::pair();
            (SensorHub::new(source), Some(control))
        } else {
            (SensorHub::new(SyntheticGyro::default()), None)
        };
        let engine = GridEngine::from_settings(settings, Some(hub.clone()))
            .context("building grid engine")?;
        let sensitivity = settings.motion.sensor.unwrap_or_default();
        Ok(Self {
            rig: AviationRig::new(settings.grid.spacing),
            rig_enabled: false,
            sensor_enabled: settings.motion.sensor.is_some(),
            sensitivity,
            camera: GridCamera::new(settings.engine.viewport),
            engine,
            hub,
            tilt,
            tape: IdlePattern::new(),
            show_panel: true,
            last_frame: Instant::now(),
            frames: FrameTimer::new(120),
            scroll: settings.motion.phase,
        })
    }

    fn update(&mut self, now: Instant) {
        let elapsed = now - self.last_frame;
        self.frames.record(elapsed);
        let dt = elapsed.as_secs_f32().min(0.1);
        self.last_frame = now;
        self.tape.step(dt);
        if self.rig_enabled {
            if let Err(e) = self.rig.tick(&mut self.engine, dt) {
                tracing::warn!("rig tick failed: {e}");
            }
        } else {
            self.engine.tick(now);
        }
    }

    fn apply(&mut self, action: GridAction) {
        if let Err(e) = self.engine.apply(action) {
            tracing::warn!("action rejected: {e}");
        }
    }

    fn set_phase(&mut self, phase: FlightPhase) {
        if !self.rig_enabled {
            self.rig_enabled = true;
            if let Err(e) = self.rig.attach(&mut self.engine) {
                tracing::warn!("rig attach failed: {e}");
            }
        }
        self.rig.set_phase(&mut self.engine, phase);
    }

    fn resize(&mut self, logical: Vec2) {
        self.camera.resize(logical);
        self.engine.set_viewport(logical);
    }

    /// Map a cursor position to a tilt sample, centered on the window.
    fn cursor_tilt(&self, cursor: Vec2) {
        let Some(control) = &self.tilt else {
            return;
        };
        let half = self.camera.viewport * 0.5;
        let n = ((cursor - half) / half).clamp(Vec2::splat(-1.0), Vec2::ONE);
        control.push_attitude(Attitude {
            pitch: n.y * std::f32::consts::FRAC_PI_4,
            roll: -n.x * std::f32::consts::FRAC_PI_3,
            yaw: 0.0,
        });
    }

    /// Scrolling slides the grid through its phase offset.
    fn scroll_by(&mut self, delta: Vec2) {
        self.scroll += delta;
        self.apply(GridAction::SetPhase(self.scroll));
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::F1 => self.show_panel = !self.show_panel,
            KeyCode::KeyH => {
                let action = if self.engine.is_visible() {
                    GridAction::Hide
                } else {
                    GridAction::Show
                };
                self.apply(action);
            }
            KeyCode::Digit1 => self.set_phase(FlightPhase::Takeoff),
            KeyCode::Digit2 => self.set_phase(FlightPhase::Landing),
            KeyCode::Digit3 => self.set_phase(FlightPhase::Taxiing),
            KeyCode::Space => {
                self.rig_enabled = false;
                self.apply(GridAction::SetVelocity(Vec2::ZERO));
            }
            _ => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_panel {
            return;
        }

        let mut actions = Vec::new();
        egui::SidePanel::left("controls")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Gridscape");
                ui.separator();

                let config = *self.engine.config();
                let mut spacing = config.spacing;
                if ui
                    .add(egui::Slider::new(&mut spacing, 4.0..=64.0).text("spacing"))
                    .changed()
                {
                    self.rig_enabled = false;
                    self.rig = AviationRig::new(spacing);
                    actions.push(GridAction::SetSpacing(spacing));
                }
                let mut major = config.major_every;
                if ui
                    .add(egui::Slider::new(&mut major, 1..=10).text("major every"))
                    .changed()
                {
                    actions.push(GridAction::SetMajorEvery(major));
                }

                let mut velocity = self.engine.velocity();
                ui.label("Velocity (pt/s):");
                let vx = ui.add(egui::DragValue::new(&mut velocity.x).prefix("X: ").speed(0.5));
                let vy = ui.add(egui::DragValue::new(&mut velocity.y).prefix("Y: ").speed(0.5));
                if vx.changed() || vy.changed() {
                    self.rig_enabled = false;
                    actions.push(GridAction::SetVelocity(velocity));
                }

                ui.separator();
                ui.heading("Sensor");
                if ui.checkbox(&mut self.sensor_enabled, "orientation").changed() {
                    actions.push(if self.sensor_enabled {
                        GridAction::EnableSensor(self.sensitivity)
                    } else {
                        GridAction::DisableSensor
                    });
                }
                let mut gain_changed = false;
                gain_changed |= ui
                    .add(egui::Slider::new(&mut self.sensitivity.x, 0.0..=2.0).text("yaw gain"))
                    .changed();
                gain_changed |= ui
                    .add(egui::Slider::new(&mut self.sensitivity.y, 0.0..=2.0).text("pitch gain"))
                    .changed();
                gain_changed |= ui
                    .checkbox(&mut self.sensitivity.parallax_pan, "parallax pan")
                    .changed();
                if gain_changed && self.sensor_enabled {
                    actions.push(GridAction::EnableSensor(self.sensitivity));
                }
                ui.label(format!(
                    "active: {}  subscribers: {}",
                    self.engine.sensor_active(),
                    self.hub.ref_count()
                ));

                ui.separator();
                ui.heading("Flight");
                ui.horizontal(|ui| {
                    if ui.button("Takeoff (1)").clicked() {
                        self.set_phase(FlightPhase::Takeoff);
                    }
                    if ui.button("Landing (2)").clicked() {
                        self.set_phase(FlightPhase::Landing);
                    }
                    if ui.button("Taxi (3)").clicked() {
                        self.set_phase(FlightPhase::Taxiing);
                    }
                });

                ui.separator();
                let motion = self.engine.motion();
                let stats = self.engine.stats();
                ui.label(format!(
                    "offset: ({:.1}, {:.1})",
                    motion.position_offset.x, motion.position_offset.y
                ));
                ui.label(format!(
                    "pitch {:.1}  yaw {:.1}",
                    motion.camera_rotation.x.to_degrees(),
                    motion.camera_rotation.y.to_degrees()
                ));
                ui.label(format!(
                    "generation {}  rebuilds {}  skipped {}",
                    self.engine.generation(),
                    stats.rebuilds,
                    stats.skipped_ticks
                ));
                ui.label(format!(
                    "{:.0} fps  avg {:.2} ms  max {:.2} ms",
                    self.frames.fps(),
                    self.frames.average().as_secs_f32() * 1000.0,
                    self.frames.max().as_secs_f32() * 1000.0
                ));

                ui.separator();
                ui.label("Radio");
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(ui.available_width(), 28.0), egui::Sense::hover());
                let painter = ui.painter_at(rect);
                let bars = self.tape.bars();
                let step = rect.width() / bars.len().max(1) as f32;
                for (i, b) in bars.iter().enumerate() {
                    let x = rect.left() + i as f32 * step;
                    let h = b * rect.height() * 0.5;
                    painter.line_segment(
                        [
                            egui::pos2(x, rect.center().y - h),
                            egui::pos2(x, rect.center().y + h),
                        ],
                        egui::Stroke::new(2.0, egui::Color32::LIGHT_GRAY),
                    );
                }

                ui.separator();
                ui.small("F1: Panel | H: Show/Hide | 1-3: Flight | Space: Stop | Wheel: Scroll");
            });

        for action in actions {
            self.apply(action);
        }
    }
}

struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuGridRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("Gridscape")
            .with_inner_size(PhysicalSize::new(1280u32, 800));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("gridscape_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuGridRenderer::new(&device, surface_format);
        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Gpu {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn logical_size(gpu: &Gpu) -> Vec2 {
        let scale = gpu.window.scale_factor() as f32;
        Vec2::new(gpu.config.width as f32, gpu.config.height as f32) / scale.max(0.1)
    }

    fn redraw(&mut self) {
        self.state.update(Instant::now());

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.renderer.render(
            &gpu.device,
            &gpu.queue,
            &view,
            &self.state.engine,
            &self.state.camera,
        );

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => {
                self.state.resize(Self::logical_size(&gpu));
                self.gpu = Some(gpu);
                self.state.apply(GridAction::Show);
            }
            Err(e) => {
                tracing::error!("failed to initialize GPU: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.state.apply(GridAction::Hide);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = self.gpu.as_mut() {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.state.apply(GridAction::Hide);
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    let logical = Self::logical_size(gpu);
                    self.state.resize(logical);
                }
            }
            WindowEvent::Occluded(occluded) => {
                self.state.apply(if occluded {
                    GridAction::Hide
                } else {
                    GridAction::Show
                });
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.state.handle_key(key);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(gpu) = &self.gpu {
                    let scale = gpu.window.scale_factor() as f32;
                    let cursor = Vec2::new(position.x as f32, position.y as f32) / scale.max(0.1);
                    self.state.cursor_tilt(cursor);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(x, y) * 20.0,
                    MouseScrollDelta::PixelDelta(p) => Vec2::new(p.x as f32, p.y as f32),
                };
                self.state.scroll_by(delta);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("gridscape-desktop starting");

    let settings = match &cli.config {
        Some(path) => {
            GridSettings::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => GridSettings::default(),
    };
    let state = AppState::new(&settings, cli.mouse_tilt)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(state);
    event_loop.run_app(&mut app)?;

    Ok(())
}
