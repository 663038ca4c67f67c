use glam::Vec2;
use serde::{Deserialize, Serialize};

/// How elapsed frame time is turned into physics steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepMode {
    /// One step per frame with the elapsed time as delta.
    #[default]
    Variable,
    /// Accumulate elapsed time and run whole steps of `dt` seconds.
    Fixed { dt: f32 },
}

/// Configuration for a [`Scene`](crate::Scene).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    /// Pixel to meter scale factor (default: 0.01, i.e. 100 px per meter).
    pub meters_per_pixel: f32,
    /// Gravity in physics units (m/s²). Positive Y points down.
    pub gravity: Vec2,
    /// Draw object layers and collider outlines.
    pub debug_rendering: bool,
    /// Solver iterations per physics step (default: 4).
    pub solver_iterations: usize,
    pub step_mode: StepMode,
    /// Extra grid cells searched around the start/goal bounding box.
    pub path_search_margin: u32,
    /// Maximum number of grid cells a single path search may cover.
    pub path_max_nodes: usize,
    /// Grid cell size in pixels for bodies that have no shapes.
    pub default_cell_size: f32,
}

impl SceneOptions {
    pub const DEFAULT_METERS_PER_PIXEL: f32 = 0.01;

    /// Parse options from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Scale factor with non-positive values replaced by the default.
    pub fn effective_meters_per_pixel(&self) -> f32 {
        if self.meters_per_pixel > 0.0 && self.meters_per_pixel.is_finite() {
            self.meters_per_pixel
        } else {
            Self::DEFAULT_METERS_PER_PIXEL
        }
    }
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            meters_per_pixel: Self::DEFAULT_METERS_PER_PIXEL,
            gravity: Vec2::ZERO,
            debug_rendering: false,
            solver_iterations: 4,
            step_mode: StepMode::Variable,
            path_search_margin: 16,
            path_max_nodes: 65_536,
            default_cell_size: 32.0,
        }
    }
}
