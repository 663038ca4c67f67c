pub mod render;
pub mod pathfinding;
pub mod debug;
