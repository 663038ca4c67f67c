use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};

use crate::api::types::{BodyId, Flip};
use crate::components::graphics::SharedGraphicsPack;

/// Placement of a graphic relative to its body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyShapeGraphicsOptions {
    /// Offset from the body position in pixels.
    pub offset: Vec2,
    pub flip: Flip,
}

/// A graphics pack attached to a shape. The pack itself may be shared.
#[derive(Debug, Clone)]
pub struct BodyShapeGraphics {
    pub pack: SharedGraphicsPack,
    pub options: BodyShapeGraphicsOptions,
}

impl BodyShapeGraphics {
    pub fn new(pack: SharedGraphicsPack) -> Self {
        Self {
            pack,
            options: BodyShapeGraphicsOptions::default(),
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.options.offset = offset;
        self
    }

    pub fn with_flip(mut self, flip: Flip) -> Self {
        self.options.flip = flip;
        self
    }
}

/// A named shape of a body, backed one-to-one by a physics collider.
#[derive(Debug)]
pub struct BodyShape {
    key: String,
    tile_map_object_id: Option<u32>,
    collider: ColliderHandle,
    graphics: HashMap<String, BodyShapeGraphics>,
    /// Key into `graphics`; at most one graphic is active.
    current_graphic: Option<String>,
}

impl BodyShape {
    pub fn new(key: impl Into<String>, tile_map_object_id: Option<u32>, collider: ColliderHandle) -> Self {
        Self {
            key: key.into(),
            tile_map_object_id,
            collider,
            graphics: HashMap::new(),
            current_graphic: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Id of the map object this shape was created from, if any.
    pub fn tile_map_object_id(&self) -> Option<u32> {
        self.tile_map_object_id
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    /// Add or replace a graphic. Replacing the active graphic keeps it active.
    pub fn add_graphic(&mut self, key: impl Into<String>, graphic: BodyShapeGraphics) {
        self.graphics.insert(key.into(), graphic);
    }

    pub fn graphic(&self, key: &str) -> Option<&BodyShapeGraphics> {
        self.graphics.get(key)
    }

    /// Select the active graphic. Unknown keys leave the selection unchanged.
    pub fn set_current_graphic(&mut self, key: &str) -> bool {
        if !self.graphics.contains_key(key) {
            return false;
        }
        self.current_graphic = Some(key.to_owned());
        true
    }

    pub fn current_graphic_key(&self) -> Option<&str> {
        self.current_graphic.as_deref()
    }

    pub fn current_graphic(&self) -> Option<&BodyShapeGraphics> {
        self.current_graphic.as_ref().and_then(|key| self.graphics.get(key))
    }

    pub fn flip_graphic(&mut self, key: &str, horizontal: bool, vertical: bool) -> bool {
        match self.graphics.get_mut(key) {
            Some(graphic) => {
                graphic.options.flip = Flip::new(horizontal, vertical);
                true
            }
            None => false,
        }
    }
}

/// Live bodies by id, iterated in id order.
pub type BodyMap = BTreeMap<BodyId, Body>;

/// A game entity with named shapes, backed one-to-one by a physics body.
#[derive(Debug)]
pub struct Body {
    id: BodyId,
    handle: RigidBodyHandle,
    /// Map layer this body is drawn after. `None` draws after all layers.
    layer: Option<String>,
    /// Multimap by key: several shapes may share a key.
    shapes: Vec<BodyShape>,
}

impl Body {
    pub fn new(id: BodyId, handle: RigidBodyHandle) -> Self {
        Self {
            id,
            handle,
            layer: None,
            shapes: Vec::new(),
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub fn set_layer(&mut self, layer: impl Into<String>) {
        self.layer = Some(layer.into());
    }

    /// Add a shape and return its index within the body.
    pub fn push_shape(&mut self, shape: BodyShape) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    pub fn shapes(&self) -> &[BodyShape] {
        &self.shapes
    }

    pub fn shape(&self, index: usize) -> Option<&BodyShape> {
        self.shapes.get(index)
    }

    /// First shape stored under `key`.
    pub fn find_shape(&self, key: &str) -> Option<&BodyShape> {
        self.shapes.iter().find(|shape| shape.key == key)
    }

    pub fn find_shape_mut(&mut self, key: &str) -> Option<&mut BodyShape> {
        self.shapes.iter_mut().find(|shape| shape.key == key)
    }

    /// All shapes stored under `key`.
    pub fn shapes_with_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a BodyShape> + 'a {
        self.shapes.iter().filter(move |shape| shape.key == key)
    }
}
