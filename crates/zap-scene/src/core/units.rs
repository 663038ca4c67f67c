use glam::Vec2;

/// Pixel ↔ meter conversion for a fixed scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    meters_per_pixel: f32,
}

impl Units {
    pub fn new(meters_per_pixel: f32) -> Self {
        Self { meters_per_pixel }
    }

    pub fn meters_per_pixel(&self) -> f32 {
        self.meters_per_pixel
    }

    pub fn to_physics(&self, pixels: f32) -> f32 {
        pixels * self.meters_per_pixel
    }

    pub fn to_pixels(&self, meters: f32) -> f32 {
        meters / self.meters_per_pixel
    }

    pub fn point_to_physics(&self, point: Vec2) -> Vec2 {
        point * self.meters_per_pixel
    }

    pub fn point_to_pixels(&self, point: Vec2) -> Vec2 {
        point / self.meters_per_pixel
    }
}
