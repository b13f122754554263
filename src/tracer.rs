//! CPU reference implementation of the per-pixel ray tracer.
//!
//! `asset/shader/raytrace.wgsl` runs the same steps on the GPU; both paths
//! agree on constants, the pixel to NDC mapping and the render mode flags.

use glam::{Vec2, Vec3};
use image::RgbaImage;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::scene::{HitInfo, Ray, Scene, EPSILON};
use crate::util::{color::to_rgba8, math::pixel_to_ndc};

/// Bounce budget when reflections are enabled.
pub const MAX_BOUNCES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum RenderMode {
    #[default]
    Phong = 0,
    PhongReflection = 1,
    PhongShadow = 2,
    PhongShadowReflection = 3,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("render mode must be in 0..=3, got {0}")]
pub struct RenderModeError(pub u32);

impl TryFrom<u32> for RenderMode {
    type Error = RenderModeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Phong),
            1 => Ok(Self::PhongReflection),
            2 => Ok(Self::PhongShadow),
            3 => Ok(Self::PhongShadowReflection),
            other => Err(RenderModeError(other)),
        }
    }
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [
        Self::Phong,
        Self::PhongReflection,
        Self::PhongShadow,
        Self::PhongShadowReflection,
    ];

    pub fn reflections(self) -> bool {
        matches!(self, Self::PhongReflection | Self::PhongShadowReflection)
    }

    pub fn shadows(self) -> bool {
        matches!(self, Self::PhongShadow | Self::PhongShadowReflection)
    }

    pub fn max_bounces(self) -> u32 {
        if self.reflections() {
            MAX_BOUNCES
        } else {
            1
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Phong => "Phong",
            Self::PhongReflection => "Phong+Reflection",
            Self::PhongShadow => "Phong+Shadow",
            Self::PhongShadowReflection => "Phong+Shadow+Reflection",
        }
    }
}

/// Point light. Only `position.x` changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 5.0),
        }
    }
}

/// Phong colour at `hit`. Ambient is unconditional; diffuse and specular are
/// dropped when `shadows` is set and the light is blocked.
pub fn shade(scene: &Scene, hit: &HitInfo, view_dir: Vec3, light: &Light, shadows: bool) -> Vec3 {
    let sphere = &scene.spheres[hit.sphere];
    let base = sphere.color;

    let mut color = base * scene.ambient_strength;

    let light_dir = (light.position - hit.point).normalize_or_zero();
    let in_shadow = shadows && scene.occluded(hit.point, light_dir, light.position);
    if !in_shadow {
        let diffuse = hit.normal.dot(light_dir).max(0.0);
        color += base * diffuse;

        let reflected = reflect(-light_dir, hit.normal);
        let specular = view_dir.dot(reflected).max(0.0).powf(sphere.shininess);
        color += Vec3::splat(specular);
    }

    color
}

/// Follows `ray` through at most `mode.max_bounces()` surfaces.
pub fn trace(scene: &Scene, mut ray: Ray, light: &Light, mode: RenderMode) -> Vec3 {
    let depth = mode.max_bounces();
    let mut color = Vec3::ZERO;
    let mut attenuation = Vec3::ONE;

    for bounce in 0..depth {
        let Some(hit) = scene.closest_hit(&ray) else {
            break;
        };

        let view_dir = (-ray.direction).normalize_or_zero();
        let local = shade(scene, &hit, view_dir, light, mode.shadows());

        let reflectivity = scene.spheres[hit.sphere].reflectivity;
        if mode.reflections() && bounce + 1 < depth && reflectivity > 0.0 {
            color += attenuation * (1.0 - reflectivity) * local;
            attenuation *= reflectivity;
            ray = Ray::new(
                hit.point + hit.normal * EPSILON,
                reflect(ray.direction, hit.normal),
            );
        } else {
            color += attenuation * local;
            break;
        }
    }

    color
}

/// Colour seen through `ndc` on a viewport with the given aspect ratio.
pub fn trace_ndc(
    scene: &Scene,
    camera: &Camera,
    light: &Light,
    mode: RenderMode,
    ndc: Vec2,
    aspect: f32,
) -> Vec3 {
    trace(scene, camera.ray(ndc, aspect), light, mode)
}

/// Everything needed to produce one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub light: Light,
    pub mode: RenderMode,
}

/// Renders a full image on the CPU, one scanline per rayon task.
pub fn render_image(frame: Frame<'_>, width: u32, height: u32) -> RgbaImage {
    let aspect = width as f32 / height.max(1) as f32;
    let mut image = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return image;
    }

    let row_len = width as usize * 4;
    image
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let ndc = pixel_to_ndc(x as u32, y as u32, width, height);
                let color = trace_ndc(
                    frame.scene,
                    frame.camera,
                    &frame.light,
                    frame.mode,
                    ndc,
                    aspect,
                );
                pixel.copy_from_slice(&to_rgba8(color));
            }
        });

    tracing::debug!(width, height, mode = frame.mode.label(), "cpu frame traced");
    image
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Sphere;
    use approx::assert_relative_eq;

    fn mirror_pair() -> Scene {
        Scene::new(
            vec![
                Sphere {
                    center: Vec3::new(0.0, 0.0, -3.0),
                    color: Vec3::new(1.0, 0.0, 0.0),
                    reflectivity: 0.5,
                    ..Default::default()
                },
                Sphere {
                    center: Vec3::new(0.0, 0.0, 3.0),
                    color: Vec3::new(0.0, 0.0, 1.0),
                    reflectivity: 0.0,
                    ..Default::default()
                },
            ],
            0.15,
        )
    }

    #[test]
    fn mode_selector_maps_to_flags() {
        let flags: Vec<_> = RenderMode::ALL
            .iter()
            .map(|mode| (mode.reflections(), mode.shadows(), mode.max_bounces()))
            .collect();
        assert_eq!(
            flags,
            vec![
                (false, false, 1),
                (true, false, 3),
                (false, true, 1),
                (true, true, 3)
            ]
        );
        for (index, mode) in RenderMode::ALL.iter().enumerate() {
            assert_eq!(RenderMode::try_from(index as u32), Ok(*mode));
        }
        assert_eq!(RenderMode::try_from(4), Err(RenderModeError(4)));
    }

    #[test]
    fn reflection_disabled_takes_a_single_bounce() {
        let scene = mirror_pair();
        let light = Light::default();
        // From the origin, looking at the reflective sphere.
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, -1.0));
        let hit = scene.closest_hit(&ray).unwrap();
        let local = shade(&scene, &hit, Vec3::Z, &light, false);

        let traced = trace(&scene, ray, &light, RenderMode::Phong);
        assert_eq!(traced, local);
    }

    #[test]
    fn reflection_blends_in_the_bounced_surface() {
        let scene = mirror_pair();
        let light = Light::default();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, -1.0));

        let plain = trace(&scene, ray, &light, RenderMode::Phong);
        let mirrored = trace(&scene, ray, &light, RenderMode::PhongReflection);
        assert_ne!(plain, mirrored);
        // The bounced ray reaches the blue sphere behind the camera.
        assert!(mirrored.z > plain.z);
    }

    #[test]
    fn facing_mirrors_stop_after_the_bounce_budget() {
        let tinted = |center: Vec3, color: Vec3| Sphere {
            center,
            color,
            reflectivity: 0.5,
            ..Default::default()
        };
        let scene = Scene::new(
            vec![
                tinted(Vec3::new(0.0, 0.0, -3.0), Vec3::new(1.0, 0.0, 0.0)),
                tinted(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, 1.0)),
            ],
            0.15,
        );
        let light = Light::default();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, -1.0));

        // The ray bounces along the z axis: far mirror, near mirror, far again.
        let local = |point: Vec3, normal: Vec3, sphere: usize| {
            let hit = HitInfo {
                t: 0.0,
                point,
                normal,
                sphere,
            };
            shade(&scene, &hit, normal, &light, false)
        };
        let l0 = local(Vec3::new(0.0, 0.0, -2.0), Vec3::Z, 0);
        let l1 = local(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z, 1);
        let l2 = l0;
        // Two blends at k = 0.5, then the last surface adds its full shade.
        let expected = 0.5 * l0 + 0.25 * l1 + 0.25 * l2;

        let traced = trace(&scene, ray, &light, RenderMode::PhongReflection);
        assert_relative_eq!(traced.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(traced.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(traced.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn non_reflective_surface_matches_reflection_disabled() {
        let scene = mirror_pair();
        let light = Light::default();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -0.5), Vec3::new(0.0, 0.0, 1.0));

        let plain = trace(&scene, ray, &light, RenderMode::Phong);
        let mirrored = trace(&scene, ray, &light, RenderMode::PhongReflection);
        assert_eq!(plain, mirrored);
    }

    #[test]
    fn miss_contributes_nothing() {
        let scene = mirror_pair();
        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::Y);
        for mode in RenderMode::ALL {
            assert_eq!(trace(&scene, ray, &Light::default(), mode), Vec3::ZERO);
        }
    }

    #[test]
    fn shading_keeps_ambient_when_light_is_behind_surface() {
        let scene = Scene::new(vec![Sphere::default()], 0.2);
        let light = Light {
            position: Vec3::new(0.0, 0.0, -10.0),
        };
        let hit = scene
            .closest_hit(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)))
            .unwrap();
        let color = shade(&scene, &hit, Vec3::Z, &light, false);
        assert_relative_eq!(color.x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(color.y, 0.2, epsilon = 1e-6);
        assert_relative_eq!(color.z, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn render_image_has_requested_size_and_opaque_alpha() {
        let scene = Scene::default();
        let camera = Camera::default();
        let frame = Frame {
            scene: &scene,
            camera: &camera,
            light: Light::default(),
            mode: RenderMode::PhongShadowReflection,
        };
        let image = render_image(frame, 16, 9);
        assert_eq!(image.dimensions(), (16, 9));
        assert!(image.pixels().all(|p| p.0[3] == 255));
    }
}
