//! Body templates supplied by callers when spawning bodies.
//!
//! Prototypes are position-independent and read-only while a body is
//! instantiated from them; the scene never mutates a prototype.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::types::Rect;
use crate::components::body::BodyShapeGraphics;

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    #[default]
    Static,
    Dynamic,
    Kinematic,
}

/// Per-body simulation properties, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyPhysics {
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub fixed_rotation: bool,
}

impl Default for BodyPhysics {
    fn default() -> Self {
        Self {
            linear_damping: 0.0,
            angular_damping: 0.0,
            fixed_rotation: false,
        }
    }
}

/// Per-shape simulation flags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapePhysics {
    /// Detects overlap without collision response.
    pub is_sensor: bool,
    /// Ask contact observers before each contact is resolved.
    pub is_pre_solve_enabled: bool,
    /// Only used for dynamic bodies.
    pub density: f32,
}

impl Default for ShapePhysics {
    fn default() -> Self {
        Self {
            is_sensor: false,
            is_pre_solve_enabled: false,
            density: 1.0,
        }
    }
}

/// Shape geometry in pixels, relative to the body origin.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Convex polygon; needs 3..=MAX_POLYGON_VERTICES points.
    Polygon(Vec<Vec2>),
    Rect(Rect),
    Circle { center: Vec2, radius: f32 },
}

/// Template for one named shape of a body.
#[derive(Debug, Clone)]
pub struct ShapePrototype {
    pub geometry: ShapeGeometry,
    pub physics: ShapePhysics,
    /// Named graphics available to the shape, in insertion order.
    pub graphics: Vec<(String, BodyShapeGraphics)>,
}

impl ShapePrototype {
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            physics: ShapePhysics::default(),
            graphics: Vec::new(),
        }
    }

    pub fn polygon(points: Vec<Vec2>) -> Self {
        Self::new(ShapeGeometry::Polygon(points))
    }

    pub fn rect(rect: Rect) -> Self {
        Self::new(ShapeGeometry::Rect(rect))
    }

    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::new(ShapeGeometry::Circle { center, radius })
    }

    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.physics.is_sensor = is_sensor;
        self
    }

    pub fn with_pre_solve(mut self, enabled: bool) -> Self {
        self.physics.is_pre_solve_enabled = enabled;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.physics.density = density;
        self
    }

    pub fn with_graphic(mut self, key: impl Into<String>, graphic: BodyShapeGraphics) -> Self {
        self.graphics.push((key.into(), graphic));
        self
    }
}

/// Template for a body: type, physics properties and named shapes.
#[derive(Debug, Clone, Default)]
pub struct BodyPrototype {
    pub body_type: BodyType,
    pub physics: BodyPhysics,
    pub shapes: Vec<(String, ShapePrototype)>,
}

impl BodyPrototype {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            ..Default::default()
        }
    }

    pub fn with_physics(mut self, physics: BodyPhysics) -> Self {
        self.physics = physics;
        self
    }

    /// Add a shape. Several shapes may share a key.
    pub fn with_shape(mut self, key: impl Into<String>, shape: ShapePrototype) -> Self {
        self.shapes.push((key.into(), shape));
        self
    }
}

/// Body settings for bulk creation from map objects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyOptions {
    pub body_type: BodyType,
    pub physics: BodyPhysics,
}

/// Shape settings for bulk creation from map objects.
pub type BodyShapeOptions = ShapePhysics;
