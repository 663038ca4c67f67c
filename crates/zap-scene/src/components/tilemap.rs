//! Tile map object graph consumed by the scene.
//!
//! A map is a tree of layers: tile grids, static images, object layers (debug
//! markers and body sources) and groups. Tile grids are stored in row-major
//! order: index = y * width + x.

use std::ops::Range;

use glam::Vec2;

use crate::api::types::{Color, Rect, TextureId};

/// A single tile: a region of a tileset texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub texture: TextureId,
    /// Source rect within the texture, in pixels.
    pub src: Rect,
}

impl Tile {
    pub fn new(texture: TextureId, src: Rect) -> Self {
        Self { texture, src }
    }
}

/// Grid of optional tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub width: u32,
    pub height: u32,
    tiles: Vec<Option<Tile>>,
}

impl TileLayer {
    /// Create an empty layer.
    pub fn new(width: u32, height: u32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            tiles: vec![None; count],
        }
    }

    /// Get a tile at grid position (x, y). Out-of-range positions are empty.
    pub fn get(&self, x: i64, y: i64) -> Option<&Tile> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        self.tiles[(y as usize) * (self.width as usize) + x as usize].as_ref()
    }

    /// Set a tile at grid position (x, y). Out-of-range positions are ignored.
    pub fn set(&mut self, x: u32, y: u32, tile: Option<Tile>) {
        if x < self.width && y < self.height {
            self.tiles[(y as usize) * (self.width as usize) + x as usize] = tile;
        }
    }

    /// Count of non-empty tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// Half-open column and row ranges of tiles intersecting `camera`
    /// (layer-local pixels), clamped to the grid.
    pub fn visible_range(&self, camera: Rect, tile_width: u32, tile_height: u32) -> (Range<u32>, Range<u32>) {
        if tile_width == 0 || tile_height == 0 {
            return (0..0, 0..0);
        }
        let (tw, th) = (tile_width as f32, tile_height as f32);
        let clamp = |v: f32, max: u32| -> u32 { v.max(0.0).min(max as f32) as u32 };

        let first_col = clamp((camera.x / tw).floor(), self.width);
        let first_row = clamp((camera.y / th).floor(), self.height);
        let last_col = clamp(((camera.x + camera.w) / tw).ceil(), self.width);
        let last_row = clamp(((camera.y + camera.h) / th).ceil(), self.height);

        (first_col..last_col.max(first_col), first_row..last_row.max(first_row))
    }
}

/// A whole texture drawn at the layer origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageLayer {
    pub texture: TextureId,
    /// Drawn size in pixels.
    pub size: Vec2,
}

/// Geometry of a map object, relative to the object position.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Point,
    Polygon(Vec<Vec2>),
    Polyline(Vec<Vec2>),
    Circle { radius: f32 },
}

/// A free-form object placed on an object layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMapObject {
    pub id: u32,
    pub name: String,
    pub class: String,
    /// Position in map pixels.
    pub x: f32,
    pub y: f32,
    pub visible: bool,
    pub kind: ObjectKind,
}

impl TileMapObject {
    pub fn new(id: u32, kind: ObjectKind) -> Self {
        Self {
            id,
            name: String::new(),
            class: String::new(),
            x: 0.0,
            y: 0.0,
            visible: true,
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectLayer {
    pub objects: Vec<TileMapObject>,
}

/// Layer payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Tile(TileLayer),
    Image(ImageLayer),
    Object(ObjectLayer),
    Group(Vec<Layer>),
}

/// A named, ordered drawable unit of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: u32,
    pub name: String,
    /// A hidden layer hides its whole subtree.
    pub visible: bool,
    pub kind: LayerKind,
}

impl Layer {
    pub fn new(id: u32, name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            kind,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A loaded tile map.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    /// Map origin in tiles.
    pub x: i32,
    pub y: i32,
    /// Map size in tiles.
    pub width: u32,
    pub height: u32,
    /// Tile size in pixels.
    pub tile_width: u32,
    pub tile_height: u32,
    pub background_color: Color,
    pub layers: Vec<Layer>,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            tile_width,
            tile_height,
            background_color: Color::BLACK,
            layers: Vec::new(),
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Top-left corner in pixels.
    pub fn pixel_origin(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 * self.tile_width as f32,
            self.y as f32 * self.tile_height as f32,
        )
    }

    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.tile_width as f32,
            self.height as f32 * self.tile_height as f32,
        )
    }

    /// Bottom-right corner in pixels.
    pub fn pixel_extent(&self) -> Vec2 {
        self.pixel_origin() + self.pixel_size()
    }

    /// Every object of every object layer, depth-first in layer order.
    pub fn objects(&self) -> Vec<&TileMapObject> {
        fn collect<'a>(layers: &'a [Layer], out: &mut Vec<&'a TileMapObject>) {
            for layer in layers {
                match &layer.kind {
                    LayerKind::Object(objects) => out.extend(objects.objects.iter()),
                    LayerKind::Group(children) => collect(children, out),
                    LayerKind::Tile(_) | LayerKind::Image(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.layers, &mut out);
        out
    }

    pub fn object_by_id(&self, id: u32) -> Option<&TileMapObject> {
        self.objects().into_iter().find(|object| object.id == id)
    }

    /// First object with the given name.
    pub fn object_by_name(&self, name: &str) -> Option<&TileMapObject> {
        self.objects().into_iter().find(|object| object.name == name)
    }

    /// First layer with the given name, searching groups depth-first.
    pub fn find_layer(&self, name: &str) -> Option<&Layer> {
        fn find<'a>(layers: &'a [Layer], name: &str) -> Option<&'a Layer> {
            for layer in layers {
                if layer.name == name {
                    return Some(layer);
                }
                if let LayerKind::Group(children) = &layer.kind {
                    if let Some(found) = find(children, name) {
                        return Some(found);
                    }
                }
            }
            None
        }
        find(&self.layers, name)
    }
}
