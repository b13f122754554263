pub mod math {
    pub fn degree_to_radian(degree: f32) -> f32 {
        degree * std::f32::consts::PI / 180.0
    }

    /// Centre of pixel (`x`, `y`) in normalized device coordinates.
    ///
    /// Rows count downwards from the top of the image while NDC y points up,
    /// matching `@builtin(position)` in the fragment shader.
    pub fn pixel_to_ndc(x: u32, y: u32, width: u32, height: u32) -> glam::Vec2 {
        let u = (x as f32 + 0.5) / width as f32;
        let v = (y as f32 + 0.5) / height as f32;
        glam::Vec2::new(u * 2.0 - 1.0, 1.0 - v * 2.0)
    }
}

pub mod color {
    pub fn to_rgba8(color: glam::Vec3) -> [u8; 4] {
        let c = color.clamp(glam::Vec3::ZERO, glam::Vec3::ONE) * 255.0;
        [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8, 255]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_centres_map_inside_ndc() {
        let top_left = math::pixel_to_ndc(0, 0, 4, 2);
        assert_eq!(top_left, glam::Vec2::new(-0.75, 0.5));
        let bottom_right = math::pixel_to_ndc(3, 1, 4, 2);
        assert_eq!(bottom_right, glam::Vec2::new(0.75, -0.5));
    }

    #[test]
    fn colors_are_clamped_before_quantizing() {
        assert_eq!(
            color::to_rgba8(glam::Vec3::new(-1.0, 0.5, 3.0)),
            [0, 128, 255, 255]
        );
    }
}
