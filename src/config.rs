use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::camera::Camera;
use crate::scene::{Scene, Sphere};
use crate::tracer::{Light, RenderMode, RenderModeError};

/// Range of the light slider. The animation sweeps the same span.
pub const LIGHT_X_RANGE: std::ops::RangeInclusive<f32> = -10.0..=10.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read scene file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scene file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scene: {0}")]
    Invalid(String),
    #[error("invalid arguments: {0}")]
    Args(#[from] pico_args::Error),
    #[error(transparent)]
    Mode(#[from] RenderModeError),
    #[error("unrecognized command '{0}', expected 'view' or 'render'")]
    Command(String),
    #[error("unexpected arguments: {0:?}")]
    Unused(Vec<OsString>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SphereConfig {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub shininess: f32,
    #[serde(default)]
    pub reflectivity: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    #[serde(default = "default_fov")]
    pub fov: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SceneFile {
    #[serde(default = "default_ambient_strength")]
    pub ambient_strength: f32,
    pub camera: Option<CameraConfig>,
    /// Initial light position. `x` is later driven by the slider.
    pub light: Option<[f32; 3]>,
    pub spheres: Vec<SphereConfig>,
}

/// Validated scene, camera and light ready for either renderer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDescription {
    pub scene: Scene,
    pub camera: Camera,
    pub light: Light,
}

const fn default_ambient_strength() -> f32 {
    0.15
}

const fn default_fov() -> f32 {
    50.0
}

const fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

impl SceneDescription {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let description = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            spheres = description.scene.spheres.len(),
            "loaded scene file"
        );
        Ok(description)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: SceneFile = serde_json::from_str(raw)?;
        file.validate()?;
        Ok(file.into_description())
    }
}

impl SceneFile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spheres.is_empty() {
            return Err(invalid("scene must contain at least one sphere"));
        }
        if !self.ambient_strength.is_finite() || self.ambient_strength < 0.0 {
            return Err(invalid(format!(
                "ambientStrength must be finite and >= 0, got {}",
                self.ambient_strength
            )));
        }

        for (index, sphere) in self.spheres.iter().enumerate() {
            validate_finite(sphere.center, &format!("spheres[{index}].center"))?;
            if !sphere.radius.is_finite() || sphere.radius <= 0.0 {
                return Err(invalid(format!(
                    "spheres[{index}].radius must be > 0, got {}",
                    sphere.radius
                )));
            }
            if !sphere.color.iter().all(|c| (0.0..=1.0).contains(c)) {
                return Err(invalid(format!(
                    "spheres[{index}].color components must be in [0, 1], got {:?}",
                    sphere.color
                )));
            }
            if !sphere.shininess.is_finite() || sphere.shininess <= 0.0 {
                return Err(invalid(format!(
                    "spheres[{index}].shininess must be > 0, got {}",
                    sphere.shininess
                )));
            }
            if !(0.0..=1.0).contains(&sphere.reflectivity) {
                return Err(invalid(format!(
                    "spheres[{index}].reflectivity must be in [0, 1], got {}",
                    sphere.reflectivity
                )));
            }
        }

        if let Some(camera) = &self.camera {
            validate_finite(camera.position, "camera.position")?;
            validate_finite(camera.target, "camera.target")?;
            validate_finite(camera.up, "camera.up")?;
            let position = glam::Vec3::from(camera.position);
            let target = glam::Vec3::from(camera.target);
            let forward = target - position;
            if forward.length() < 0.0001 {
                return Err(invalid("camera.position must differ from camera.target"));
            }
            if forward.cross(glam::Vec3::from(camera.up)).length() < 0.0001 {
                return Err(invalid("camera.up must not be parallel to the view direction"));
            }
            if !(camera.fov > 0.0 && camera.fov < 180.0) {
                return Err(invalid(format!(
                    "camera.fov must be in (0, 180) degrees, got {}",
                    camera.fov
                )));
            }
        }

        if let Some(light) = self.light {
            validate_finite(light, "light")?;
        }

        Ok(())
    }

    fn into_description(self) -> SceneDescription {
        let spheres = self
            .spheres
            .into_iter()
            .map(|sphere| Sphere {
                center: sphere.center.into(),
                radius: sphere.radius,
                color: sphere.color.into(),
                shininess: sphere.shininess,
                reflectivity: sphere.reflectivity,
            })
            .collect();

        let camera = self
            .camera
            .map(|camera| Camera {
                eye: camera.position.into(),
                target: camera.target.into(),
                up: camera.up.into(),
                fov_y: camera.fov,
            })
            .unwrap_or_default();

        let light = self
            .light
            .map(|position| Light {
                position: position.into(),
            })
            .unwrap_or_default();

        SceneDescription {
            scene: Scene::new(spheres, self.ambient_strength),
            camera,
            light,
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn validate_finite(value: [f32; 3], field: &str) -> Result<(), ConfigError> {
    if value.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(invalid(format!("{field} components must be finite, got {value:?}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive window driven by the GPU renderer.
    View,
    /// Headless CPU render written to an image file.
    Render { output: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub help: bool,
    pub command: Command,
    pub scene: Option<PathBuf>,
    pub mode: RenderMode,
    pub light_x: Option<f32>,
    pub width: u32,
    pub height: u32,
}

pub const USAGE: &str = "\
Usage: sphere_tracer [view|render] [OPTIONS]

Commands:
  view               Open the interactive window (default)
  render             Trace one frame on the CPU and save it

Options:
  --scene FILE       Scene description (JSON); built-in scene if omitted
  --mode N           0 Phong, 1 +Reflection, 2 +Shadow, 3 +Shadow+Reflection
  --light X          Light x position in [-10, 10]
  --width W          Image width in pixels (default 800)
  --height H         Image height in pixels (default 800)
  --output FILE      Output image for 'render' (default frame.png)
  -h, --help         Print this message
";

impl Options {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(pico_args::Arguments::from_env())
    }

    pub fn parse(mut args: pico_args::Arguments) -> Result<Self, ConfigError> {
        let help = args.contains(["-h", "--help"]);
        let subcommand = args.subcommand()?;
        let scene = args.opt_value_from_os_str("--scene", |s| {
            Ok::<_, std::convert::Infallible>(PathBuf::from(s))
        })?;
        let mode = match args.opt_value_from_str::<_, u32>("--mode")? {
            Some(mode) => RenderMode::try_from(mode)?,
            None => RenderMode::default(),
        };
        let light_x = args
            .opt_value_from_str::<_, f32>("--light")?
            .map(|x| x.clamp(*LIGHT_X_RANGE.start(), *LIGHT_X_RANGE.end()));
        let width = args.opt_value_from_str("--width")?.unwrap_or(800);
        let height = args.opt_value_from_str("--height")?.unwrap_or(800);
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(
                "width and height must be positive".into(),
            ));
        }
        let output = args
            .opt_value_from_os_str("--output", |s| {
                Ok::<_, std::convert::Infallible>(PathBuf::from(s))
            })?
            .unwrap_or_else(|| PathBuf::from("frame.png"));

        let command = match subcommand.as_deref() {
            None | Some("view") => Command::View,
            Some("render") => Command::Render { output },
            Some(other) => return Err(ConfigError::Command(other.to_owned())),
        };

        let remaining = args.finish();
        if !remaining.is_empty() {
            return Err(ConfigError::Unused(remaining));
        }

        Ok(Self {
            help,
            command,
            scene,
            mode,
            light_x,
            width,
            height,
        })
    }
}
