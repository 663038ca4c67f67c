pub mod camera;
pub mod canvas;

// Re-export key types for convenient access
pub use canvas::{Canvas, DrawCommand, DrawList, TextureDraw};
