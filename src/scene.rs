use glam::Vec3;

/// Offset applied to secondary ray origins and root comparisons so surfaces
/// never intersect themselves.
pub const EPSILON: f32 = 0.001;
/// Farthest distance a primary or reflected ray is followed.
pub const MAX_DIST: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Closest intersection found along a ray. A miss is represented by `None`
/// at the call sites, never by a flagged record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    pub t: f32,
    pub point: Vec3,
    /// Unit length, pointing out of the sphere.
    pub normal: Vec3,
    pub sphere: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,

    pub color: Vec3,
    /// Phong specular exponent.
    pub shininess: f32,
    /// Fraction of the shaded colour replaced by the reflected ray, in [0, 1].
    pub reflectivity: f32,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 1.0,
            color: Vec3::ONE,
            shininess: 32.0,
            reflectivity: 0.0,
        }
    }
}

impl Sphere {
    /// Distance along `ray` to the nearest root greater than [`EPSILON`].
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        // |o + t*d - c|^2 = r^2
        // (d.d)t^2 + 2(oc.d)t + (oc.oc - r^2) = 0
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(ray.direction);
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let s = discriminant.sqrt();
        let t0 = (-b - s) / (2.0 * a);
        let t1 = (-b + s) / (2.0 * a);
        if t0 > EPSILON {
            Some(t0)
        } else if t1 > EPSILON {
            Some(t1)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub ambient_strength: f32,
}

impl Default for Scene {
    fn default() -> Self {
        let sphere = |center: [f32; 3], color: [f32; 3], shininess: f32, reflectivity: f32| Sphere {
            center: Vec3::from(center),
            radius: 1.0,
            color: Vec3::from(color),
            shininess,
            reflectivity,
        };

        Self {
            spheres: vec![
                sphere([-1.0, 0.0, -2.0], [0.6, 0.2, 0.7], 32.0, 0.3),
                sphere([0.1, 2.5, -0.5], [0.3, 0.3, 1.0], 64.0, 0.4),
                sphere([1.5, 2.2, 0.8], [0.3, 0.7, 0.9], 128.0, 0.5),
                sphere([-1.5, 1.5, -0.5], [0.4, 0.15, 0.6], 16.0, 0.2),
                sphere([2.0, 0.7, 1.8], [0.3, 0.9, 0.9], 256.0, 0.6),
                sphere([-0.9, -1.0, 3.0], [0.2, 1.0, 0.2], 8.0, 0.25),
                sphere([0.9, -0.75, 2.5], [0.15, 0.6, 0.25], 48.0, 0.35),
            ],
            ambient_strength: 0.15,
        }
    }
}

impl Scene {
    pub fn new(spheres: Vec<Sphere>, ambient_strength: f32) -> Self {
        Self {
            spheres,
            ambient_strength,
        }
    }

    /// Nearest hit over all spheres. Exact ties go to the lower index.
    pub fn closest_hit(&self, ray: &Ray) -> Option<HitInfo> {
        let mut closest: Option<HitInfo> = None;
        let mut closest_t = MAX_DIST;

        for (index, sphere) in self.spheres.iter().enumerate() {
            let Some(t) = sphere.intersect(ray) else {
                continue;
            };
            if t < closest_t {
                closest_t = t;
                let point = ray.at(t);
                closest = Some(HitInfo {
                    t,
                    point,
                    normal: (point - sphere.center).normalize_or_zero(),
                    sphere: index,
                });
            }
        }

        closest
    }

    /// Whether any sphere sits between `point` and the light.
    ///
    /// `light_dir` must be the unit vector from `point` towards `light_position`.
    pub fn occluded(&self, point: Vec3, light_dir: Vec3, light_position: Vec3) -> bool {
        let shadow_ray = Ray::new(point + light_dir * EPSILON, light_dir);
        let light_distance = (light_position - point).length();

        self.spheres
            .iter()
            .filter_map(|sphere| sphere.intersect(&shadow_ray))
            .any(|t| t < light_distance)
    }
}
