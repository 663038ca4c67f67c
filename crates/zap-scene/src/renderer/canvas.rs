//! Drawing surface the scene renders into.
//!
//! The windowing/GPU collaborator implements [`Canvas`]; the scene only issues
//! primitive commands in screen-space pixels. [`DrawList`] records those
//! commands and is what headless hosts and tests render into.

use glam::Vec2;

use crate::api::types::{Color, Flip, Rect, TextureId};

/// A textured quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDraw {
    pub texture: TextureId,
    /// Source rect within the texture. `None` draws the whole texture.
    pub src: Option<Rect>,
    /// Destination rect in screen pixels.
    pub dest: Rect,
    /// Rotation in radians around the destination center.
    pub angle: f32,
    pub flip: Flip,
}

/// Contract for render backends.
pub trait Canvas {
    /// Fill the whole target with a color.
    fn clear(&mut self, color: Color);

    fn draw_texture(&mut self, draw: &TextureDraw);

    /// Connected line strip through `points`.
    fn draw_lines(&mut self, points: &[Vec2], color: Color);

    /// Circle outline.
    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color);
}

/// A single recorded drawing command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Texture(TextureDraw),
    Lines { points: Vec<Vec2>, color: Color },
    Circle { center: Vec2, radius: f32, color: Color },
}

/// Canvas that records commands in submission order.
#[derive(Debug, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self {
            commands: Vec::with_capacity(512),
        }
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All recorded texture draws, in order.
    pub fn textures(&self) -> impl Iterator<Item = &TextureDraw> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Texture(draw) => Some(draw),
            _ => None,
        })
    }
}

impl Canvas for DrawList {
    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn draw_texture(&mut self, draw: &TextureDraw) {
        self.commands.push(DrawCommand::Texture(*draw));
    }

    fn draw_lines(&mut self, points: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Lines {
            points: points.to_vec(),
            color,
        });
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }
}
