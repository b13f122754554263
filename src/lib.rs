pub mod application;
pub mod asset;
pub mod camera;
pub mod config;
pub mod controls;
pub mod gpu;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod tracer;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::Context;

use asset::{AssetHandle, AssetStatus};
use config::SceneDescription;

/// Starts loading the scene description. Without a path the built-in scene
/// is ready immediately.
pub fn load_scene<W>(path: Option<PathBuf>, on_complete: W) -> AssetHandle<SceneDescription>
where
    W: FnOnce() + Send + 'static,
{
    match path {
        Some(path) => AssetHandle::spawn(
            "scene",
            move || SceneDescription::load(&path).map_err(anyhow::Error::from),
            on_complete,
        ),
        None => AssetHandle::ready("scene", SceneDescription::default()),
    }
}

/// Traces one frame on the CPU and writes it to `output`.
pub fn render_to_file(
    description: &SceneDescription,
    mode: tracer::RenderMode,
    light: tracer::Light,
    (width, height): (u32, u32),
    output: &Path,
) -> anyhow::Result<()> {
    let frame = tracer::Frame {
        scene: &description.scene,
        camera: &description.camera,
        light,
        mode,
    };
    let image = tracer::render_image(frame, width, height);
    image
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(
        path = %output.display(),
        width,
        height,
        mode = mode.label(),
        light_x = light.position.x,
        "frame written"
    );
    Ok(())
}

/// Blocks until the scene handle resolves. Load failures fall back to the
/// built-in scene.
pub fn resolve_scene(handle: &mut AssetHandle<SceneDescription>) -> SceneDescription {
    match handle.wait() {
        AssetStatus::Ready(description) => description.clone(),
        AssetStatus::Pending | AssetStatus::Failed => {
            tracing::warn!("using the built-in scene");
            SceneDescription::default()
        }
    }
}
