//! Tile-map loading collaborators.

use std::fs;
use std::path::Path;

use glam::Vec2;

use crate::api::types::{Color, Rect};
use crate::assets::manifest::{
    LayerDescriptor, LayerKindDescriptor, MapDocument, ObjectDescriptor, ObjectShapeDescriptor, TilesetDescriptor,
};
use crate::assets::registry::TextureRegistry;
use crate::components::tilemap::{
    ImageLayer, Layer, LayerKind, ObjectKind, ObjectLayer, Tile, TileLayer, TileMap, TileMapObject,
};
use crate::error::MapLoadError;

/// GID bits used by map editors for tile flips.
const GID_FLAG_MASK: u32 = 0xE000_0000;

/// Turns a map file into a validated [`TileMap`].
pub trait TileMapLoader {
    fn load(&mut self, path: &Path) -> Result<TileMap, MapLoadError>;
}

/// Loads maps in the [`MapDocument`] JSON format.
#[derive(Default)]
pub struct JsonTileMapLoader {
    textures: TextureRegistry,
}

impl JsonTileMapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_textures(textures: TextureRegistry) -> Self {
        Self { textures }
    }

    /// Textures referenced by loaded maps.
    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureRegistry {
        &mut self.textures
    }

    /// Parse and convert a JSON document. `path` is only used in errors.
    pub fn load_str(&mut self, path: &Path, json: &str) -> Result<TileMap, MapLoadError> {
        let doc = MapDocument::from_json(json).map_err(|source| MapLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        self.convert(path, doc)
    }

    fn convert(&mut self, path: &Path, doc: MapDocument) -> Result<TileMap, MapLoadError> {
        let invalid = |message: String| MapLoadError::InvalidMap {
            path: path.to_path_buf(),
            message,
        };
        if doc.tile_width == 0 || doc.tile_height == 0 {
            return Err(invalid(format!(
                "tile size {}x{} must be positive",
                doc.tile_width, doc.tile_height
            )));
        }
        if doc.layers.is_empty() {
            return Err(MapLoadError::Empty {
                path: path.to_path_buf(),
            });
        }

        let mut tilesets = doc.tilesets;
        tilesets.sort_by_key(|set| set.first_gid);
        for set in &tilesets {
            if set.first_gid == 0 || set.columns == 0 || set.tile_width == 0 || set.tile_height == 0 {
                return Err(invalid(format!("tileset {} has an invalid grid", set.image)));
            }
        }

        let layers = self
            .convert_layers(&doc.layers, &tilesets)
            .map_err(invalid)?;

        Ok(TileMap {
            x: doc.x,
            y: doc.y,
            width: doc.width,
            height: doc.height,
            tile_width: doc.tile_width,
            tile_height: doc.tile_height,
            background_color: doc.background_color.unwrap_or(Color::BLACK),
            layers,
        })
    }

    fn convert_layers(
        &mut self,
        layers: &[LayerDescriptor],
        tilesets: &[TilesetDescriptor],
    ) -> Result<Vec<Layer>, String> {
        let mut out = Vec::with_capacity(layers.len());
        for layer in layers {
            let kind = match &layer.kind {
                LayerKindDescriptor::Tile { width, height, data } => {
                    LayerKind::Tile(self.convert_tiles(&layer.name, *width, *height, data, tilesets)?)
                }
                LayerKindDescriptor::Image { image, width, height } => LayerKind::Image(ImageLayer {
                    texture: self.textures.resolve(image),
                    size: Vec2::new(*width, *height),
                }),
                LayerKindDescriptor::Object { objects } => LayerKind::Object(ObjectLayer {
                    objects: objects.iter().map(convert_object).collect(),
                }),
                LayerKindDescriptor::Group { layers } => LayerKind::Group(self.convert_layers(layers, tilesets)?),
            };
            out.push(Layer {
                id: layer.id,
                name: layer.name.clone(),
                visible: layer.visible,
                kind,
            });
        }
        Ok(out)
    }

    fn convert_tiles(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
        data: &[u32],
        tilesets: &[TilesetDescriptor],
    ) -> Result<TileLayer, String> {
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(format!(
                "layer {} has {} tiles, expected {}x{}",
                name,
                data.len(),
                width,
                height
            ));
        }

        let mut layer = TileLayer::new(width, height);
        for (index, raw) in data.iter().enumerate() {
            let gid = raw & !GID_FLAG_MASK;
            if gid == 0 {
                continue;
            }
            let Some(set) = tilesets.iter().rev().find(|set| set.first_gid <= gid) else {
                return Err(format!("layer {} references unknown tile {}", name, gid));
            };
            let local = gid - set.first_gid;
            if local >= set.tile_count {
                return Err(format!("layer {} references unknown tile {}", name, gid));
            }
            let offset = |cell: u32, size: u32| {
                size.checked_add(set.spacing)
                    .and_then(|stride| cell.checked_mul(stride))
                    .and_then(|at| at.checked_add(set.margin))
            };
            let (Some(x), Some(y)) = (
                offset(local % set.columns, set.tile_width),
                offset(local / set.columns, set.tile_height),
            ) else {
                return Err(format!("tileset {} grid overflows at tile {}", set.image, gid));
            };
            let src = Rect::new(x as f32, y as f32, set.tile_width as f32, set.tile_height as f32);
            let tile = Tile::new(self.textures.resolve(&set.image), src);
            layer.set(index as u32 % width, index as u32 / width, Some(tile));
        }
        Ok(layer)
    }
}

fn convert_object(object: &ObjectDescriptor) -> TileMapObject {
    let points = |points: &[[f32; 2]]| -> Vec<Vec2> { points.iter().map(|[x, y]| Vec2::new(*x, *y)).collect() };
    let kind = match &object.shape {
        ObjectShapeDescriptor::Point => ObjectKind::Point,
        ObjectShapeDescriptor::Polygon { points: p } => ObjectKind::Polygon(points(p)),
        ObjectShapeDescriptor::Polyline { points: p } => ObjectKind::Polyline(points(p)),
        ObjectShapeDescriptor::Circle { radius } => ObjectKind::Circle { radius: *radius },
    };
    TileMapObject {
        id: object.id,
        name: object.name.clone(),
        class: object.class.clone(),
        x: object.x,
        y: object.y,
        visible: object.visible,
        kind,
    }
}

impl TileMapLoader for JsonTileMapLoader {
    fn load(&mut self, path: &Path) -> Result<TileMap, MapLoadError> {
        let json = fs::read_to_string(path).map_err(|source| MapLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = self.load_str(path, &json)?;
        log::info!("Loaded tile map {} ({}x{} tiles)", path.display(), map.width, map.height);
        Ok(map)
    }
}
