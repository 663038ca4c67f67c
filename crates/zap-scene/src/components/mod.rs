pub mod body;
pub mod graphics;
pub mod prototype;
pub mod tilemap;
