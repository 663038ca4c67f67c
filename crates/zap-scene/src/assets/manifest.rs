use serde::{Deserialize, Serialize};

use crate::api::types::Color;

/// JSON tile-map document, as written by map editors' JSON export.
/// Converted into a [`TileMap`](crate::TileMap) by the JSON loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDocument {
    /// Map origin in tiles.
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Map size in tiles.
    pub width: u32,
    pub height: u32,
    /// Tile size in pixels.
    pub tile_width: u32,
    pub tile_height: u32,
    #[serde(default)]
    pub background_color: Option<Color>,
    #[serde(default)]
    pub tilesets: Vec<TilesetDescriptor>,
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

/// A tileset image sliced into a grid. Global tile ids (GIDs) from
/// `first_gid` to `first_gid + tile_count - 1` refer to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilesetDescriptor {
    pub first_gid: u32,
    /// Texture key, resolved through the loader's texture registry.
    pub image: String,
    pub columns: u32,
    pub tile_count: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDescriptor {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(flatten)]
    pub kind: LayerKindDescriptor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKindDescriptor {
    /// Row-major GIDs; 0 is an empty cell.
    Tile { width: u32, height: u32, data: Vec<u32> },
    Image { image: String, width: f32, height: f32 },
    Object {
        #[serde(default)]
        objects: Vec<ObjectDescriptor>,
    },
    Group {
        #[serde(default)]
        layers: Vec<LayerDescriptor>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: String,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(flatten)]
    pub shape: ObjectShapeDescriptor,
}

/// Object geometry; points are relative to the object position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObjectShapeDescriptor {
    Point,
    Polygon { points: Vec<[f32; 2]> },
    Polyline { points: Vec<[f32; 2]> },
    Circle { radius: f32 },
}

fn default_visible() -> bool {
    true
}

impl MapDocument {
    /// Parse a map document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
