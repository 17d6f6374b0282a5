// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::Context as _;
use egui_wgpu::ScreenDescriptor;
use ribofluid::{
    capture_frame,
    config::{COLOR_DECAY_RANGE, ITERATIONS_RANGE, RADIUS_RANGE, SCALE_RANGE},
    geometry::normalize_pointer,
    save_capture, ColorMode, FluidConfig, FluidSimulation, FrameState, GpuContext, PointerId,
    Pointers, Timestep, Visualize,
};
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, TouchPhase, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

const RESOURCES_DIR: &str = "resources";
const GRADIENT_FILES: [&str; 3] = ["gradient.png", "gradient.jpg", "gradient.jpeg"];
const CAPTURE_DIR: &str = "captures";

#[derive(Default)]
struct PanelActions {
    reset: bool,
    capture: bool,
}

struct FluidApp {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    gpu: GpuContext,
    egui_renderer: egui_wgpu::Renderer,

    simulation: FluidSimulation,
    frame: FrameState,
    pointers: Pointers,
    cursor: [f32; 2],

    config: FluidConfig,
    last_saved_config: FluidConfig,
    settings_path: PathBuf,
    show_panel: bool,

    frame_count: u32,
    frame_time_sum: f32,
    last_frame: Instant,
    last_fps_update: Instant,
}

impl FluidApp {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::for_surface(&instance, &surface).await?;

        let caps = surface.get_capabilities(&gpu.adapter);
        // egui-wgpu expects a non-sRGB target.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let settings_path = FluidConfig::default_path();
        let config = match FluidConfig::load_from_disk(&settings_path) {
            Ok(config) => {
                log::info!("Loaded settings from {:?}", settings_path);
                config
            }
            Err(err) => {
                log::info!("Using default settings ({err})");
                FluidConfig::default()
            }
        };

        let simulation = FluidSimulation::new(
            &gpu,
            [surface_config.width, surface_config.height],
            &config,
        )?;
        let egui_renderer = egui_wgpu::Renderer::new(&gpu.device, format, None, 1, false);

        let now = Instant::now();
        let mut app = Self {
            window,
            surface,
            surface_config,
            gpu,
            egui_renderer,
            simulation,
            frame: FrameState::default(),
            pointers: Pointers::new(),
            cursor: [0.0; 2],
            last_saved_config: config.clone(),
            config,
            settings_path,
            show_panel: true,
            frame_count: 0,
            frame_time_sum: 0.0,
            last_frame: now,
            last_fps_update: now,
        };
        app.load_gradient();
        Ok(app)
    }

    fn load_gradient(&mut self) {
        for name in GRADIENT_FILES {
            let path = Path::new(RESOURCES_DIR).join(name);
            if !path.exists() {
                continue;
            }
            match image::open(&path) {
                Ok(ramp) => match self.simulation.set_gradient(&self.gpu, &ramp.to_rgba8()) {
                    Ok(()) => return,
                    Err(err) => log::warn!("Failed to upload {}: {err}", path.display()),
                },
                Err(err) => log::warn!("Failed to read {}: {err}", path.display()),
            }
        }
        log::info!("No gradient map found under {RESOURCES_DIR}/");
    }

    fn viewport(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.gpu.device, &self.surface_config);
        self.simulation.resize(self.viewport(), self.config.scale);
    }

    fn pointer_position(&self, position: [f32; 2]) -> [f32; 2] {
        normalize_pointer(position, self.viewport(), self.simulation.aspect())
    }

    fn on_cursor_moved(&mut self, position: [f32; 2]) {
        self.cursor = position;
        let position = self.pointer_position(position);
        self.pointers.move_to(PointerId::Mouse, position);
    }

    fn on_mouse_button(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                let position = self.pointer_position(self.cursor);
                self.pointers.press(PointerId::Mouse, position);
            }
            ElementState::Released => self.pointers.release(PointerId::Mouse),
        }
    }

    fn on_touch(&mut self, touch: winit::event::Touch) {
        let id = PointerId::Touch(touch.id);
        let position =
            self.pointer_position([touch.location.x as f32, touch.location.y as f32]);
        match touch.phase {
            TouchPhase::Started => self.pointers.press(id, position),
            TouchPhase::Moved => {
                self.pointers.move_to(id, position);
            }
            TouchPhase::Ended => self.pointers.release(id),
            TouchPhase::Cancelled => self.pointers.cancel(id),
        }
    }

    fn reset(&mut self) {
        match self.simulation.reset(&self.gpu) {
            Ok(frame) => self.frame = frame,
            Err(err) => log::error!("Reset failed: {err}"),
        }
    }

    fn capture(&mut self) {
        let viewport = self.viewport();
        let frame = pollster::block_on(capture_frame(
            &self.gpu,
            &mut self.simulation,
            &self.frame,
            &self.config,
            viewport,
        ));
        match frame.and_then(|image| save_capture(&image, Path::new(CAPTURE_DIR), "ribofluid")) {
            Ok(path) => log::info!("Saved capture to {}", path.display()),
            Err(err) => log::error!("Capture failed: {err}"),
        }
    }

    fn step(&mut self) {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.simulation.resize(self.viewport(), self.config.scale);
        let samples = self.pointers.samples();
        match self
            .simulation
            .step(&self.gpu, self.frame, &self.config, &samples)
        {
            Ok(frame) => self.frame = frame,
            Err(err) => log::error!("Fluid step failed: {err}"),
        }

        self.frame_count += 1;
        self.frame_time_sum += frame_time;
        if now.duration_since(self.last_fps_update).as_secs_f32() >= 1.0 {
            let avg_frame_time = self.frame_time_sum / self.frame_count as f32;
            let fps = 1.0 / avg_frame_time.max(f32::EPSILON);
            let [w, h] = self.simulation.resolution();
            self.window.set_title(&format!(
                "Ribofluid - {:.0} FPS ({:.2}ms) - {}x{}",
                fps,
                avg_frame_time * 1000.0,
                w,
                h
            ));
            self.frame_count = 0;
            self.frame_time_sum = 0.0;
            self.last_fps_update = now;
        }
    }

    fn draw_panel(&mut self, ctx: &egui::Context) -> PanelActions {
        let mut actions = PanelActions::default();
        if !self.show_panel {
            return actions;
        }

        egui::SidePanel::left("fluid_controls")
            .resizable(false)
            .default_width(230.0)
            .show(ctx, |ui| {
                ui.heading("Simulation");
                ui.add(egui::Slider::new(&mut self.config.scale, SCALE_RANGE).text("Scale"));
                ui.add(
                    egui::Slider::new(&mut self.config.iterations, ITERATIONS_RANGE)
                        .text("Iterations"),
                );
                ui.add(
                    egui::Slider::new(&mut self.config.color_decay, COLOR_DECAY_RANGE)
                        .text("Color decay"),
                );
                egui::ComboBox::from_label("Timestep")
                    .selected_text(self.config.timestep.label())
                    .show_ui(ui, |ui| {
                        for timestep in Timestep::ALL {
                            ui.selectable_value(&mut self.config.timestep, timestep, timestep.label());
                        }
                    });
                ui.checkbox(&mut self.config.simulate, "Simulate");
                ui.checkbox(&mut self.config.boundaries, "Boundaries");
                if ui.button("Reset").clicked() {
                    actions.reset = true;
                }

                ui.separator();
                ui.heading("Input");
                ui.add(egui::Slider::new(&mut self.config.radius, RADIUS_RANGE).text("Radius"));
                ui.checkbox(&mut self.config.add_color, "Add color");

                ui.separator();
                ui.heading("Visualize");
                ui.horizontal_wrapped(|ui| {
                    for visualize in Visualize::ALL {
                        ui.selectable_value(&mut self.config.visualize, visualize, visualize.label());
                    }
                });

                ui.heading("Mode");
                ui.horizontal_wrapped(|ui| {
                    for mode in ColorMode::ALL {
                        ui.selectable_value(&mut self.config.color_mode, mode, mode.label());
                    }
                });
                if self.config.color_mode == ColorMode::Gradient && !self.simulation.has_gradient() {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        "No gradient map loaded, showing Normal",
                    );
                }

                ui.separator();
                let [w, h] = self.simulation.resolution();
                ui.label(format!("Grid: {w}x{h}"));
                ui.label(format!("Contacts: {}", self.pointers.len()));
                if ui.button("Capture PNG").clicked() {
                    actions.capture = true;
                }

                ui.separator();
                ui.label("Controls:");
                ui.label("* Drag: stir and inject dye");
                ui.label("* H: hide panel");
                ui.label("* Space: pause / resume");
                ui.label("* R: reset");
                ui.label("* P: capture PNG");
            });

        actions
    }

    fn persist_settings_if_changed(&mut self) {
        let mut current = self.config.clone();
        current.sanitize();

        if current != self.last_saved_config {
            if let Err(err) = current.save_to_disk(&self.settings_path) {
                eprintln!(
                    "Warning: failed to write fluid settings to {:?}: {err:?}",
                    &self.settings_path
                );
            } else {
                self.last_saved_config = current;
            }
        }
    }

    fn render(
        &mut self,
        clipped_primitives: Vec<egui::ClippedPrimitive>,
        textures_delta: egui::TexturesDelta,
        screen_descriptor: ScreenDescriptor,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(err) = self.simulation.compose(
            &self.gpu,
            &self.frame,
            &self.config,
            &view,
            self.surface_config.format,
        ) {
            log::error!("Composition failed: {err}");
        }

        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui Encoder"),
        });

        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            device,
            queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // SAFETY: The render pass lives long enough for this call.
            // The lifetime requirement is overly restrictive in egui-wgpu 0.29.
            let rpass_static: &mut wgpu::RenderPass<'static> =
                unsafe { std::mem::transmute(&mut rpass) };
            self.egui_renderer
                .render(rpass_static, &clipped_primitives, &screen_descriptor);
        }

        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        event_loop.create_window(
            winit::window::WindowAttributes::default()
                .with_title("Ribofluid")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 720)),
        )?,
    );

    let mut app = pollster::block_on(FluidApp::new(window.clone()))?;

    let mut egui_state = egui_winit::State::new(
        egui::Context::default(),
        egui::ViewportId::ROOT,
        &window,
        None,
        None,
        None,
    );

    event_loop.run(move |event, target| match event {
        Event::WindowEvent { event, window_id } if window_id == window.id() => {
            // Let egui handle the event first
            let response = egui_state.on_window_event(&window, &event);

            // Releases always reach the simulation so contacts never stick.
            match &event {
                WindowEvent::MouseInput {
                    state: ElementState::Released,
                    button: MouseButton::Left,
                    ..
                } => app.on_mouse_button(ElementState::Released),
                WindowEvent::CursorMoved { position, .. } => {
                    app.on_cursor_moved([position.x as f32, position.y as f32]);
                }
                _ => {}
            }

            if response.consumed {
                return;
            }

            match event {
                WindowEvent::CloseRequested => {
                    app.persist_settings_if_changed();
                    target.exit();
                }
                WindowEvent::Resized(physical_size) => app.resize(physical_size),
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => app.on_mouse_button(ElementState::Pressed),
                WindowEvent::Touch(touch) => app.on_touch(touch),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key,
                            state: ElementState::Pressed,
                            repeat: false,
                            ..
                        },
                    ..
                } => match physical_key {
                    PhysicalKey::Code(KeyCode::KeyH) => app.show_panel = !app.show_panel,
                    PhysicalKey::Code(KeyCode::Space) => {
                        app.config.simulate = !app.config.simulate;
                    }
                    PhysicalKey::Code(KeyCode::KeyR) => app.reset(),
                    PhysicalKey::Code(KeyCode::KeyP) => app.capture(),
                    _ => {}
                },
                WindowEvent::RedrawRequested => {
                    app.step();

                    let raw_input = egui_state.take_egui_input(&window);
                    let ctx = egui_state.egui_ctx().clone();
                    let mut actions = PanelActions::default();
                    let full_output = ctx.run(raw_input, |ctx| {
                        actions = app.draw_panel(ctx);
                    });

                    egui_state.handle_platform_output(&window, full_output.platform_output);
                    app.persist_settings_if_changed();

                    if actions.reset {
                        app.reset();
                    }
                    if actions.capture {
                        app.capture();
                    }

                    let clipped_primitives =
                        ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
                    let screen_descriptor = ScreenDescriptor {
                        size_in_pixels: [app.surface_config.width, app.surface_config.height],
                        pixels_per_point: window.scale_factor() as f32,
                    };

                    match app.render(
                        clipped_primitives,
                        full_output.textures_delta,
                        screen_descriptor,
                    ) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => app.resize(window.inner_size()),
                        Err(wgpu::SurfaceError::Outdated) => {}
                        Err(wgpu::SurfaceError::OutOfMemory) => target.exit(),
                        Err(e) => eprintln!("{:?}", e),
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}
