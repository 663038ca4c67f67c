use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unique identifier for a body in the scene.
/// Allocated by [`BodyIdGenerator`]; never reused within one generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub u64);

/// Hands out strictly increasing body ids, starting at 1.
/// Each Scene owns its own generator, so independent scenes never share state.
#[derive(Debug)]
pub struct BodyIdGenerator {
    next: u64,
}

impl BodyIdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> BodyId {
        let id = BodyId(self.next);
        self.next += 1;
        id
    }
}

impl Default for BodyIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies a texture owned by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureId(pub u32);

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }
}

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Outline color used for map objects in debug mode.
    pub const DEBUG_OBJECT: Color = Color::rgb(10, 0, 200);
    /// Outline color used for physics colliders in debug mode.
    pub const DEBUG_COLLIDER: Color = Color::rgb(0, 200, 40);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Mirroring applied when a texture is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flip {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Flip {
    pub const NONE: Flip = Flip { horizontal: false, vertical: false };

    pub const fn new(horizontal: bool, vertical: bool) -> Self {
        Self { horizontal, vertical }
    }

    /// Combine two flips: flipping twice along an axis cancels out.
    pub fn combine(self, other: Flip) -> Flip {
        Flip {
            horizontal: self.horizontal ^ other.horizontal,
            vertical: self.vertical ^ other.vertical,
        }
    }
}
