pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod assets;
pub mod error;

// Re-export key types at crate root for convenience
pub use api::config::{SceneOptions, StepMode};
pub use api::types::{BodyId, BodyIdGenerator, Color, Flip, Rect, TextureId};
pub use assets::loader::{JsonTileMapLoader, TileMapLoader};
pub use assets::manifest::MapDocument;
pub use assets::registry::TextureRegistry;
pub use components::body::{Body, BodyShape, BodyShapeGraphics, BodyShapeGraphicsOptions};
pub use components::graphics::{
    FrameOptions, GraphicsPack, GraphicsRenderOptions, SharedGraphicsPack, Sprite, SpriteOptions, SpriteSheet,
};
pub use components::prototype::{
    BodyOptions, BodyPhysics, BodyPrototype, BodyShapeOptions, BodyType, ShapeGeometry, ShapePhysics, ShapePrototype,
};
pub use components::tilemap::{
    ImageLayer, Layer, LayerKind, ObjectKind, ObjectLayer, Tile, TileLayer, TileMap, TileMapObject,
};
pub use core::contact::{Contact, ContactCallbacks, ContactObserver, ContactSide, PreSolveContact, SensorContact, SubscriptionId};
pub use core::scene::{RenderState, Scene};
pub use core::time::FixedTimestep;
pub use core::units::Units;
pub use error::{MapLoadError, SceneError};
pub use renderer::camera::FollowCamera;
pub use renderer::canvas::{Canvas, DrawCommand, DrawList, TextureDraw};
