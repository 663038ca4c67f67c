//! Graphics packs: frame-based sprite animations attached to body shapes.
//!
//! A pack is an ordered list of frames. Each frame has a duration, a visibility
//! flag and any number of sprites drawn together. Rendering advances through
//! visible frames by elapsed time and wraps around at the end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use glam::Vec2;

use crate::api::types::{Flip, Rect, TextureId};
use crate::renderer::canvas::{Canvas, TextureDraw};

/// Graphics pack shared between shapes. Rendering advances its frame state,
/// so access goes through a mutex.
pub type SharedGraphicsPack = Arc<Mutex<GraphicsPack>>;

/// A region of a texture drawn at a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub texture: TextureId,
    pub src: Rect,
    pub dest_size: Vec2,
}

impl Sprite {
    /// Sprite drawn at the size of its source rect.
    pub fn new(texture: TextureId, src: Rect) -> Self {
        Self {
            texture,
            src,
            dest_size: src.size(),
        }
    }

    pub fn with_dest_size(mut self, size: Vec2) -> Self {
        self.dest_size = size;
        self
    }
}

/// A texture sliced into a grid of equally sized sprites.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    texture: TextureId,
    rects: Vec<Rect>,
}

impl SpriteSheet {
    /// Slice `cols` × `rows` cells of `cell_size`, row-major.
    pub fn grid(
        texture: TextureId,
        cell_size: Vec2,
        cols: u32,
        rows: u32,
        margin: Vec2,
        spacing: Vec2,
    ) -> Self {
        let mut rects = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                rects.push(Rect::new(
                    margin.x + col as f32 * (cell_size.x + spacing.x),
                    margin.y + row as f32 * (cell_size.y + spacing.y),
                    cell_size.x,
                    cell_size.y,
                ));
            }
        }
        Self { texture, rects }
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_valid(&self) -> bool {
        !self.rects.is_empty()
    }
}

/// Placement of a sprite inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpriteOptions {
    /// Point inside the sprite that lands on the render position.
    pub anchor: Vec2,
    /// Rotation in radians.
    pub angle: f32,
    pub flip: Flip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOptions {
    pub duration: Duration,
    pub visible: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            duration: Duration::ZERO,
            visible: true,
        }
    }
}

/// Per-call options applied on top of each sprite's own placement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GraphicsRenderOptions {
    pub flip: Flip,
    pub angle: f32,
}

#[derive(Debug, Clone)]
struct PackSprite {
    sprite: Sprite,
    options: SpriteOptions,
}

#[derive(Debug, Clone)]
struct Frame {
    duration: Duration,
    visible: bool,
    sprites: Vec<PackSprite>,
}

impl Frame {
    fn new(options: FrameOptions) -> Self {
        Self {
            duration: options.duration,
            visible: options.visible,
            sprites: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphicsPack {
    frames: Vec<Frame>,
    current_frame: usize,
    current_frame_elapsed: Duration,
    /// Sum of the durations of visible frames only.
    total_duration: Duration,
}

impl GraphicsPack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the pack for sharing between shapes.
    pub fn shared(self) -> SharedGraphicsPack {
        Arc::new(Mutex::new(self))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn add_frame(&mut self, options: FrameOptions) -> usize {
        if options.visible {
            self.total_duration += options.duration;
        }
        self.frames.push(Frame::new(options));
        self.frames.len() - 1
    }

    /// Insert a frame before `index`. Returns `None` if `index` is past the end.
    pub fn insert_frame(&mut self, index: usize, options: FrameOptions) -> Option<usize> {
        if index > self.frames.len() {
            return None;
        }
        if options.visible {
            self.total_duration += options.duration;
        }
        let had_frames = !self.frames.is_empty();
        self.frames.insert(index, Frame::new(options));
        if had_frames && index <= self.current_frame {
            self.current_frame += 1;
        }
        Some(index)
    }

    pub fn remove_frame(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        let frame = self.frames.remove(index);
        if frame.visible {
            self.total_duration = self.total_duration.saturating_sub(frame.duration);
        }
        if index < self.current_frame {
            self.current_frame -= 1;
        } else if index == self.current_frame {
            self.current_frame_elapsed = Duration::ZERO;
        }
        if self.current_frame >= self.frames.len() {
            self.current_frame = 0;
            self.current_frame_elapsed = Duration::ZERO;
        }
        true
    }

    pub fn set_frame_visibility(&mut self, index: usize, visible: bool) -> bool {
        let Some(frame) = self.frames.get_mut(index) else {
            return false;
        };
        if frame.visible && !visible {
            self.total_duration = self.total_duration.saturating_sub(frame.duration);
        } else if !frame.visible && visible {
            self.total_duration += frame.duration;
        }
        frame.visible = visible;
        true
    }

    pub fn is_frame_visible(&self, index: usize) -> Option<bool> {
        self.frames.get(index).map(|frame| frame.visible)
    }

    pub fn set_frame_duration(&mut self, index: usize, duration: Duration) -> bool {
        let Some(frame) = self.frames.get_mut(index) else {
            return false;
        };
        if frame.visible {
            self.total_duration = self.total_duration.saturating_sub(frame.duration) + duration;
        }
        frame.duration = duration;
        true
    }

    pub fn frame_duration(&self, index: usize) -> Option<Duration> {
        self.frames.get(index).map(|frame| frame.duration)
    }

    /// Append a sprite to a frame. Returns the sprite index within the frame.
    pub fn add_sprite(&mut self, frame: usize, sprite: Sprite, options: SpriteOptions) -> Option<usize> {
        let frame = self.frames.get_mut(frame)?;
        frame.sprites.push(PackSprite { sprite, options });
        Some(frame.sprites.len() - 1)
    }

    /// Append one cell of a sprite sheet to a frame.
    pub fn add_sheet_sprite(
        &mut self,
        frame: usize,
        sheet: &SpriteSheet,
        sprite_index: usize,
        options: SpriteOptions,
    ) -> Option<usize> {
        if frame >= self.frames.len() || !sheet.is_valid() {
            return None;
        }
        let rect = *sheet.rects().get(sprite_index)?;
        self.add_sprite(frame, Sprite::new(sheet.texture(), rect), options)
    }

    /// Append several sheet cells to a frame. Nothing is added if any index is
    /// out of range. Returns the index of the last added sprite.
    pub fn add_sheet_sprites(
        &mut self,
        frame: usize,
        sheet: &SpriteSheet,
        sprite_indices: &[usize],
        options: SpriteOptions,
    ) -> Option<usize> {
        if frame >= self.frames.len() || !sheet.is_valid() {
            return None;
        }
        let rects = sheet.rects();
        if sprite_indices.iter().any(|&i| i >= rects.len()) {
            return None;
        }
        let sprites = &mut self.frames[frame].sprites;
        sprites.reserve(sprite_indices.len());
        for &i in sprite_indices {
            sprites.push(PackSprite {
                sprite: Sprite::new(sheet.texture(), rects[i]),
                options,
            });
        }
        sprites.len().checked_sub(1)
    }

    pub fn remove_sprite(&mut self, frame: usize, sprite: usize) -> bool {
        match self.frames.get_mut(frame) {
            Some(frame) if sprite < frame.sprites.len() => {
                frame.sprites.remove(sprite);
                true
            }
            _ => false,
        }
    }

    /// Advance the animation by `time_passed` and draw the current frame at `point`.
    pub fn render(
        &mut self,
        canvas: &mut dyn Canvas,
        point: Vec2,
        time_passed: Duration,
        options: &GraphicsRenderOptions,
    ) {
        if self.frames.is_empty() {
            return;
        }

        if self.total_duration.is_zero() {
            // Nothing to animate: show the current frame, or the first visible one.
            if !self.frames[self.current_frame].visible {
                match self.next_visible_frame() {
                    Some(index) => self.current_frame = index,
                    None => return,
                }
            }
            self.draw_current(canvas, point, options);
            return;
        }

        self.current_frame_elapsed += time_passed;
        if !self.frames[self.current_frame].visible {
            match self.next_visible_frame() {
                Some(index) => {
                    self.current_frame = index;
                    self.current_frame_elapsed = time_passed;
                }
                None => {
                    self.current_frame_elapsed = Duration::ZERO;
                    return;
                }
            }
        }

        // Whole cycles through the visible frames land on the same frame.
        if self.current_frame_elapsed > self.total_duration {
            let rem = self.current_frame_elapsed.as_nanos() % self.total_duration.as_nanos();
            self.current_frame_elapsed = Duration::from_nanos(rem as u64);
        }

        while self.frames[self.current_frame].duration < self.current_frame_elapsed {
            self.current_frame_elapsed -= self.frames[self.current_frame].duration;
            match self.next_visible_frame() {
                Some(index) => self.current_frame = index,
                None => break,
            }
        }

        self.draw_current(canvas, point, options);
    }

    /// The next visible frame after the current one, wrapping around, or the
    /// current frame itself if it is the only visible one.
    fn next_visible_frame(&self) -> Option<usize> {
        let count = self.frames.len();
        (1..=count)
            .map(|step| (self.current_frame + step) % count)
            .find(|&i| self.frames[i].visible)
    }

    fn draw_current(&self, canvas: &mut dyn Canvas, point: Vec2, options: &GraphicsRenderOptions) {
        let Some(frame) = self.frames.get(self.current_frame) else {
            return;
        };
        if !frame.visible {
            return;
        }
        for item in &frame.sprites {
            let sprite = &item.sprite;
            canvas.draw_texture(&TextureDraw {
                texture: sprite.texture,
                src: Some(sprite.src),
                dest: Rect::new(
                    point.x - item.options.anchor.x,
                    point.y - item.options.anchor.y,
                    sprite.dest_size.x,
                    sprite.dest_size.y,
                ),
                angle: item.options.angle + options.angle,
                flip: item.options.flip.combine(options.flip),
            });
        }
    }
}
