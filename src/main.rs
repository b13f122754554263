use std::path::PathBuf;

use sphere_tracer_lib::{
    application::{AppState, Application, Layer, Screen},
    asset::{AssetHandle, AssetStatus},
    config::{Command, Options, SceneDescription, USAGE},
    controls::{LightController, ViewerState},
    gpu::{FrameUniforms, RayTracePipeline, SceneBindings},
    load_scene, render_to_file, resolve_scene,
    tracer::{Frame, RenderMode},
};
use tracing_subscriber::EnvFilter;
use wgpu::{
    CommandEncoderDescriptor, RenderPassColorAttachment, RenderPassDescriptor,
    TextureViewDescriptor,
};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
};

struct ViewerConfig {
    scene: Option<PathBuf>,
    mode: RenderMode,
    light_x: Option<f32>,
}

struct RayTracerViewer {
    pipeline: RayTracePipeline,
    scene_handle: AssetHandle<SceneDescription>,
    active: Option<(SceneDescription, SceneBindings)>,
    light_x: Option<f32>,
    viewer: ViewerState,
    controller: LightController,
    dirty: bool,
}

impl RayTracerViewer {
    /// Uploads the scene the first time the loader reports a result.
    fn poll_scene(&mut self, screen: &Screen) {
        if self.active.is_some() {
            return;
        }
        let description = match self.scene_handle.poll() {
            AssetStatus::Pending => return,
            AssetStatus::Ready(description) => description.clone(),
            AssetStatus::Failed => {
                tracing::warn!(asset = self.scene_handle.name(), "using the built-in scene");
                SceneDescription::default()
            }
        };

        self.viewer.light = description.light;
        if let Some(x) = self.light_x {
            self.viewer.set_light_x(x);
        }
        let bindings = self.pipeline.bind_scene(&screen.device, &description.scene);
        tracing::debug!(slots = bindings.sphere_slots(), "sphere buffer bound");
        self.active = Some((description, bindings));
        self.dirty = true;
    }

    fn snapshot(&self, screen: &Screen) {
        let Some((description, _)) = &self.active else {
            tracing::warn!("scene not loaded yet, snapshot skipped");
            return;
        };
        let output = PathBuf::from(format!(
            "snapshot-mode{}.png",
            self.viewer.mode as u32
        ));
        let size = (screen.config.width, screen.config.height);
        if let Err(error) =
            render_to_file(description, self.viewer.mode, self.viewer.light, size, &output)
        {
            tracing::error!("snapshot failed: {error:#}");
        }
    }
}

impl Layer for RayTracerViewer {
    type Config = ViewerConfig;
    type LayerErr = anyhow::Error;

    fn start(config: ViewerConfig, screen: &mut Screen, _app: &AppState) -> anyhow::Result<Self> {
        let pipeline = RayTracePipeline::new(&screen.device, screen.config.format)?;

        let waker = screen.waker();
        let scene_handle = load_scene(config.scene, move || {
            // Fails only when the event loop is already gone.
            let _ = waker.send_event(());
        });

        let mut viewer = ViewerState::new(config.mode, Default::default());
        if let Some(x) = config.light_x {
            viewer.set_light_x(x);
        }

        Ok(Self {
            pipeline,
            scene_handle,
            active: None,
            light_x: config.light_x,
            viewer,
            controller: LightController::new(0.5),
            dirty: true,
        })
    }

    fn process_event(&mut self, event: &Event<()>, screen: &mut Screen) {
        let Event::WindowEvent { event, .. } = event else {
            return;
        };
        if self
            .controller
            .process_events(&mut self.viewer, event, screen.config.width)
        {
            self.dirty = true;
        }

        if let WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(VirtualKeyCode::F5),
                    ..
                },
            ..
        } = event
        {
            self.snapshot(screen);
        }
    }

    fn resize(&mut self, _new_size: PhysicalSize<u32>, _app: &AppState, _screen: &mut Screen) {
        self.dirty = true;
    }

    fn update(&mut self, app: &AppState, screen: &mut Screen) {
        self.poll_scene(screen);
        self.viewer.animate(app.elapsed());
        screen.window().set_title(&self.viewer.title());

        if let Some((description, _)) = &self.active {
            let uniforms = FrameUniforms::new(
                Frame {
                    scene: &description.scene,
                    camera: &description.camera,
                    light: self.viewer.light,
                    mode: self.viewer.mode,
                },
                screen.config.width,
                screen.config.height,
            );
            self.pipeline.write_frame(&screen.queue, &uniforms);
        }
    }

    fn render(&mut self, _app: &AppState, screen: &mut Screen) -> Result<(), wgpu::SurfaceError> {
        let output = screen.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&TextureViewDescriptor::default());
        let mut encoder = screen
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Ray Trace Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            // Until the scene resolves only the clear runs.
            if let Some((_, bindings)) = &self.active {
                self.pipeline.draw(&mut render_pass, bindings);
            }
        }

        screen.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.dirty = false;
        Ok(())
    }

    fn needs_redraw(&self) -> bool {
        self.dirty || self.viewer.animating
    }

    fn shutdown(&mut self, _app: &AppState, _screen: &mut Screen) -> anyhow::Result<()> {
        tracing::info!("exiting");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = match Options::from_env() {
        Ok(options) => options,
        Err(error) => {
            tracing::error!("{error}");
            print!("{USAGE}");
            std::process::exit(2);
        }
    };
    if options.help {
        print!("{USAGE}");
        return Ok(());
    }

    match options.command {
        Command::View => {
            let config = ViewerConfig {
                scene: options.scene,
                mode: options.mode,
                light_x: options.light_x,
            };
            let window_size = PhysicalSize::new(options.width, options.height);
            pollster::block_on(Application::<RayTracerViewer>::init(config, window_size))
        }
        Command::Render { ref output } => {
            let mut handle = load_scene(options.scene.clone(), || {});
            let description = resolve_scene(&mut handle);
            let mut light = description.light;
            if let Some(x) = options.light_x {
                light.position.x = x;
            }
            render_to_file(
                &description,
                options.mode,
                light,
                (options.width, options.height),
                output,
            )
        }
    }
}
