use crate::scene::Ray;
use crate::util::math::degree_to_radian;

/// Pinhole camera looking from `eye` towards `target`. Fixed at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: glam::Vec3,
    pub target: glam::Vec3,
    pub up: glam::Vec3,
    pub fov_y: f32,
}

/// Orthonormal frame derived from a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: glam::Vec3,
    pub right: glam::Vec3,
    pub up: glam::Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: glam::Vec3::new(0.0, 3.5, 9.0),
            target: glam::Vec3::new(0.2, 0.0, 0.0),
            up: glam::Vec3::Y,
            fov_y: 50.0,
        }
    }
}

impl Camera {
    pub fn basis(&self) -> CameraBasis {
        let forward = (self.target - self.eye).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);
        CameraBasis { forward, right, up }
    }

    /// `tan(fov_y / 2)`, the half-height of the image plane at unit distance.
    pub fn fov_scale(&self) -> f32 {
        degree_to_radian(self.fov_y * 0.5).tan()
    }

    /// World-space ray through `ndc`, where both axes span [-1, 1] and y points up.
    pub fn ray(&self, ndc: glam::Vec2, aspect: f32) -> Ray {
        let basis = self.basis();
        let scale = self.fov_scale();
        let direction = (basis.right * (ndc.x * scale * aspect)
            + basis.up * (ndc.y * scale)
            + basis.forward)
            .normalize_or_zero();
        Ray::new(self.eye, direction)
    }
}
