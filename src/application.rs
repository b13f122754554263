use std::time::Instant;

use anyhow::Context;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop, EventLoopProxy, EventLoopWindowTarget},
    window::{Window, WindowBuilder},
};

#[derive(Debug)]
pub struct AppState {
    start_time: Instant,
    previous_time: Instant,
    delta_time: f32,
}

impl AppState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            previous_time: now,
            delta_time: 0.0,
        }
    }

    pub fn update(&mut self) {
        let current_time = Instant::now();
        self.delta_time = current_time
            .duration_since(self.previous_time)
            .as_secs_f32();
        self.previous_time = current_time;
    }

    /// Seconds since the application started.
    pub fn elapsed(&self) -> f32 {
        self.previous_time
            .duration_since(self.start_time)
            .as_secs_f32()
    }

    /// Seconds between the two most recent updates.
    pub fn delta(&self) -> f32 {
        self.delta_time
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Application<L: Layer + 'static> {
    layer: Option<L>,
    config: Option<L::Config>,
    screen: Screen,
    state: AppState,
}

impl<L: Layer + 'static> Application<L> {
    pub fn new(screen: Screen, config: L::Config) -> Self {
        Self {
            screen,
            layer: None,
            config: Some(config),
            state: AppState::new(),
        }
    }

    fn run(&mut self, event: Event<()>, control_flow: &mut ControlFlow) {
        if let Some(layer) = self.layer.as_mut() {
            layer.process_event(&event, &mut self.screen);
        }

        match event {
            Event::NewEvents(StartCause::Init) => {
                let Some(config) = self.config.take() else {
                    return;
                };
                match L::start(config, &mut self.screen, &self.state) {
                    Ok(layer) => self.layer = Some(layer),
                    Err(error) => {
                        tracing::error!("failed to start: {error:#}");
                        control_flow.set_exit_with_code(1);
                    }
                }
            }
            Event::UserEvent(()) => self.screen.window().request_redraw(),
            Event::WindowEvent {
                window_id,
                ref event,
            } if self.screen.window().id() == window_id => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => self.exit(control_flow),
                WindowEvent::Resized(physical_size) => {
                    self.screen.resize(*physical_size);
                    if let Some(layer) = self.layer.as_mut() {
                        layer.resize(*physical_size, &self.state, &mut self.screen);
                    }
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    self.screen.resize(**new_inner_size);
                    if let Some(layer) = self.layer.as_mut() {
                        layer.resize(**new_inner_size, &self.state, &mut self.screen);
                    }
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                self.state.update();
                match self.layer.as_ref() {
                    Some(layer) if layer.needs_redraw() => {
                        control_flow.set_poll();
                        self.screen.window().request_redraw();
                    }
                    _ => control_flow.set_wait(),
                }
            }
            Event::RedrawRequested(window_id) if self.screen.window().id() == window_id => {
                let Some(layer) = self.layer.as_mut() else {
                    return;
                };
                tracing::trace!(delta = self.state.delta(), "frame");
                layer.update(&self.state, &mut self.screen);

                match layer.render(&self.state, &mut self.screen) {
                    Ok(_) => {}
                    Err(SurfaceError::Lost) => self.screen.resize_to_current(),
                    Err(SurfaceError::OutOfMemory) => control_flow.set_exit_with_code(137),
                    Err(e) => tracing::error!("{:?}", e),
                }
            }
            _ => {}
        }
    }

    fn exit(&mut self, control_flow: &mut ControlFlow) {
        control_flow.set_exit_with_code(0);
        if let Some(layer) = self.layer.as_mut() {
            if let Err(error) = layer.shutdown(&self.state, &mut self.screen) {
                tracing::error!("shutdown failed: {error:#}");
                control_flow.set_exit_with_code(1);
            }
        }
    }

    pub async fn init(config: L::Config, window_size: PhysicalSize<u32>) -> anyhow::Result<()> {
        let event_loop = EventLoop::new();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let screen = Screen::new(&event_loop, &instance, window_size).await?;
        let mut application = Self::new(screen, config);
        event_loop.run(move |event, _event_loop, control_flow| {
            application.run(event, control_flow);
        })
    }
}

/// Render context handed to every layer callback.
pub struct Screen {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    proxy: EventLoopProxy<()>,
    window: Window,
}

impl Screen {
    pub async fn new(
        event_loop: &EventLoop<()>,
        instance: &wgpu::Instance,
        window_size: PhysicalSize<u32>,
    ) -> anyhow::Result<Self> {
        let target: &EventLoopWindowTarget<()> = event_loop;
        let window = WindowBuilder::new()
            .with_title("sphere tracer")
            .with_inner_size(window_size)
            .build(target)
            .context("failed to create window")?;

        // SAFETY:
        // The surface needs to live as long as the window that created it.
        // Screen owns the window so this should be safe.
        let surface =
            unsafe { instance.create_surface(&window) }.context("failed to create surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                    label: Some("sphere tracer device"),
                },
                None,
            )
            .await
            .context("failed to open graphics device")?;

        let size = window.inner_size();
        let mut config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .context("surface is not supported by the adapter")?;
        // The tracer writes display values directly, like the CPU snapshot.
        let capabilities = surface.get_capabilities(&adapter);
        if let Some(format) = capabilities.formats.iter().find(|f| !f.is_srgb()) {
            config.format = *format;
        }
        surface.configure(&device, &config);

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            format = ?config.format,
            "graphics context ready"
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            proxy: event_loop.create_proxy(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Handle that wakes the event loop from another thread.
    pub fn waker(&self) -> EventLoopProxy<()> {
        self.proxy.clone()
    }

    /// Resize the screen to new window size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Resize the screen to current window inner size.
    pub fn resize_to_current(&mut self) {
        self.resize(self.window.inner_size());
    }
}

pub trait Layer: Sized {
    type Config: 'static;
    type LayerErr: std::fmt::Display + 'static;

    fn start(config: Self::Config, screen: &mut Screen, app: &AppState)
        -> Result<Self, Self::LayerErr>;
    fn process_event(&mut self, event: &Event<()>, screen: &mut Screen);
    fn resize(&mut self, new_size: PhysicalSize<u32>, app: &AppState, screen: &mut Screen);
    fn update(&mut self, app: &AppState, screen: &mut Screen);
    fn render(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), SurfaceError>;
    /// Whether another frame should be scheduled after the current events.
    fn needs_redraw(&self) -> bool;
    fn shutdown(&mut self, app: &AppState, screen: &mut Screen) -> Result<(), Self::LayerErr>;
}
