use glam::Vec2;

use crate::api::types::Rect;

/// World-to-screen offset that tracks a followed body.
///
/// The offset is the map-pixel position of the top-left corner of the
/// viewport. It only changes when [`FollowCamera::follow`] or
/// [`FollowCamera::set_offset`] is called; with nothing to follow the camera
/// stays where it was.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FollowCamera {
    offset: Vec2,
}

impl FollowCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Center `target` (map pixels) in the viewport, then clamp each axis to
    /// `[map_origin, map_extent - viewport_size]`. When the map is narrower
    /// than the viewport the origin wins.
    pub fn follow(&mut self, target: Vec2, viewport_size: Vec2, map_origin: Vec2, map_extent: Vec2) {
        let wanted = target - viewport_size / 2.0;
        let max = (map_extent - viewport_size).max(map_origin);
        self.offset = wanted.clamp(map_origin, max);
    }

    /// The visible region in map pixels.
    pub fn visible_rect(&self, viewport_size: Vec2) -> Rect {
        Rect::new(self.offset.x, self.offset.y, viewport_size.x, viewport_size.y)
    }

    /// Convert a map-pixel point to a screen point inside `viewport`.
    pub fn to_screen(&self, point: Vec2, viewport: &Rect) -> Vec2 {
        viewport.origin() + point - self.offset
    }
}
