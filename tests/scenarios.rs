use approx::assert_relative_eq;
use glam::{Vec2, Vec3};
use sphere_tracer_lib::{
    camera::Camera,
    config::SceneDescription,
    scene::{Ray, Scene, Sphere},
    tracer::{render_image, trace, trace_ndc, Frame, Light, RenderMode},
};

fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
    assert_relative_eq!(actual.x, expected.x, epsilon = 1e-5);
    assert_relative_eq!(actual.y, expected.y, epsilon = 1e-5);
    assert_relative_eq!(actual.z, expected.z, epsilon = 1e-5);
}

#[test]
fn center_pixel_is_phong_at_the_apex() {
    let color = Vec3::new(0.8, 0.3, 0.1);
    let shininess = 32.0;
    let ambient = 0.15;
    let scene = Scene::new(
        vec![Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
            color,
            shininess,
            reflectivity: 0.5,
        }],
        ambient,
    );
    let camera = Camera {
        eye: Vec3::new(0.0, 0.0, 5.0),
        target: Vec3::ZERO,
        up: Vec3::Y,
        fov_y: 50.0,
    };
    let light = Light {
        position: Vec3::new(0.0, 5.0, 5.0),
    };

    let traced = trace_ndc(&scene, &camera, &light, RenderMode::Phong, Vec2::ZERO, 1.0);

    // Apex (0, 0, 1): N = V = +z, L = (0, 5, 4) / sqrt(41).
    let n_dot_l = 4.0 / 41.0_f32.sqrt();
    let r_dot_v = 4.0 / 41.0_f32.sqrt();
    let expected = color * ambient + color * n_dot_l + Vec3::splat(r_dot_v.powf(shininess));
    assert_vec3_eq(traced, expected);
}

fn occlusion_scene() -> (Scene, Light, Ray) {
    let scene = Scene::new(
        vec![
            Sphere {
                center: Vec3::ZERO,
                color: Vec3::new(0.2, 0.4, 0.6),
                shininess: 16.0,
                ..Default::default()
            },
            // Sits on the segment from (1, 0, 0) to the light.
            Sphere {
                center: Vec3::new(5.0, 0.0, 0.0),
                color: Vec3::new(1.0, 1.0, 1.0),
                ..Default::default()
            },
        ],
        0.25,
    );
    let light = Light {
        position: Vec3::new(10.0, 0.0, 0.0),
    };
    // Starts between the spheres and hits the first one at (1, 0, 0).
    let ray = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
    (scene, light, ray)
}

#[test]
fn blocked_point_keeps_only_ambient_with_shadows() {
    let (scene, light, ray) = occlusion_scene();
    let base = scene.spheres[0].color;

    let shadowed = trace(&scene, ray, &light, RenderMode::PhongShadow);
    assert_vec3_eq(shadowed, base * 0.25);
}

#[test]
fn blocked_point_is_lit_without_shadows() {
    let (scene, light, ray) = occlusion_scene();
    let base = scene.spheres[0].color;

    // N = L = V = +x: full diffuse and a specular peak of 1.
    let lit = trace(&scene, ray, &light, RenderMode::Phong);
    assert_vec3_eq(lit, base * 0.25 + base + Vec3::ONE);
}

#[test]
fn reflection_mode_matches_plain_on_matte_surfaces() {
    let mut description = SceneDescription::default();
    for sphere in &mut description.scene.spheres {
        sphere.reflectivity = 0.0;
    }
    let frame = |mode| Frame {
        scene: &description.scene,
        camera: &description.camera,
        light: description.light,
        mode,
    };

    let plain = render_image(frame(RenderMode::Phong), 48, 32);
    let mirrored = render_image(frame(RenderMode::PhongReflection), 48, 32);
    assert_eq!(plain, mirrored);
}

#[test]
fn rerendering_is_bit_identical() {
    let description = SceneDescription::default();
    let frame = Frame {
        scene: &description.scene,
        camera: &description.camera,
        light: Light {
            position: Vec3::new(-4.0, 5.0, 5.0),
        },
        mode: RenderMode::PhongShadowReflection,
    };

    let first = render_image(frame, 64, 48);
    let second = render_image(frame, 64, 48);
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn default_scene_shows_spheres_on_black() {
    let description = SceneDescription::default();
    let frame = Frame {
        scene: &description.scene,
        camera: &description.camera,
        light: description.light,
        mode: RenderMode::Phong,
    };
    let image = render_image(frame, 64, 64);

    let black = image.pixels().filter(|p| p.0[..3] == [0, 0, 0]).count();
    assert!(black > 0, "background should be visible");
    assert!(black < 64 * 64, "spheres should be visible");
}
