use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use rapier2d::prelude::*;

use crate::api::types::BodyId;
use crate::components::prototype::{BodyPhysics, BodyType, ShapePhysics};

/// Largest polygon accepted as a collider.
pub const MAX_POLYGON_VERTICES: usize = 8;

// ---------------------------------------------------------------------------
// Conversion helpers (private): glam to nalgebra and back
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn na_to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Kinematic => RigidBodyType::KinematicVelocityBased,
        }
    }
}

/// Identifies the scene-level owner of a collider.
/// Packed into the collider's `user_data`: body id in the high 64 bits,
/// shape index in the low 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeTag {
    pub body: BodyId,
    pub shape: usize,
}

impl ShapeTag {
    pub fn encode(self) -> u128 {
        ((self.body.0 as u128) << 64) | self.shape as u128
    }

    pub fn decode(data: u128) -> Self {
        Self {
            body: BodyId((data >> 64) as u64),
            shape: (data & u64::MAX as u128) as usize,
        }
    }
}

/// Collider geometry in meters, relative to the body origin.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Polygon(Vec<Vec2>),
    Cuboid { center: Vec2, half_extents: Vec2 },
    Ball { center: Vec2, radius: f32 },
}

impl ColliderShape {
    /// Build the rapier collider, or `None` for degenerate geometry.
    fn build_collider(&self) -> Option<ColliderBuilder> {
        match self {
            ColliderShape::Polygon(points) => {
                if points.len() < 3 || points.len() > MAX_POLYGON_VERTICES {
                    return None;
                }
                let points: Vec<Point<Real>> = points.iter().map(|p| point![p.x, p.y]).collect();
                ColliderBuilder::convex_hull(&points)
            }
            ColliderShape::Cuboid { center, half_extents } => {
                if half_extents.x <= 0.0 || half_extents.y <= 0.0 {
                    return None;
                }
                Some(ColliderBuilder::cuboid(half_extents.x, half_extents.y).translation(vec2_to_na(*center)))
            }
            ColliderShape::Ball { center, radius } => {
                if *radius <= 0.0 {
                    return None;
                }
                Some(ColliderBuilder::ball(*radius).translation(vec2_to_na(*center)))
            }
        }
    }
}

/// Collider outline data for debug drawing, in world meters.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderOutline {
    Polygon(Vec<Vec2>),
    Circle { center: Vec2, radius: f32 },
}

/// Which event stream a shape-pair event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairEventKind {
    Contact,
    /// `a` is the sensor, `b` the visitor.
    Sensor,
}

/// A begin/end touch between two tagged colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapePairEvent {
    pub kind: PairEventKind,
    pub started: bool,
    pub a: ShapeTag,
    pub b: ShapeTag,
}

// ---------------------------------------------------------------------------
// Event collector (no crossbeam)
// ---------------------------------------------------------------------------

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        std::mem::take(&mut *self.collisions.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
        // Contact forces are not reported to observers.
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns the rapier simulation. All lengths are in meters.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2, solver_iterations: usize) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.num_solver_iterations =
            NonZeroUsize::new(solver_iterations).unwrap_or(NonZeroUsize::MIN);
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        na_to_vec2(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = vec2_to_na(gravity);
    }

    /// Create a rigid body without colliders. The body id is stored in the
    /// body's `user_data`.
    pub fn create_body(
        &mut self,
        id: BodyId,
        position: Vec2,
        body_type: BodyType,
        physics: &BodyPhysics,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::new(body_type.to_rapier())
            .translation(vec2_to_na(position))
            .linear_damping(physics.linear_damping)
            .angular_damping(physics.angular_damping)
            .locked_axes(if physics.fixed_rotation {
                LockedAxes::ROTATION_LOCKED
            } else {
                LockedAxes::empty()
            })
            .user_data(id.0 as u128)
            .build();
        self.bodies.insert(rb)
    }

    /// Attach a collider to a body. Returns `None` (and creates nothing) if the
    /// geometry is degenerate or the body does not exist.
    pub fn attach_collider(
        &mut self,
        body: RigidBodyHandle,
        tag: ShapeTag,
        shape: &ColliderShape,
        flags: &ShapePhysics,
    ) -> Option<ColliderHandle> {
        let is_dynamic = self.bodies.get(body)?.is_dynamic();
        let mut builder = shape
            .build_collider()?
            .sensor(flags.is_sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(tag.encode());
        if is_dynamic {
            builder = builder.density(flags.density);
        }
        if flags.is_pre_solve_enabled {
            builder = builder.active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS);
        }
        Some(
            self.colliders
                .insert_with_parent(builder.build(), body, &mut self.bodies),
        )
    }

    /// Remove a body and all its colliders from the simulation.
    pub fn remove_body(&mut self, body: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Advance the simulation by `dt` seconds and collect touch events.
    /// Events whose colliders no longer exist are dropped.
    pub fn step(&mut self, dt: f32, hooks: &dyn PhysicsHooks, events: &mut Vec<ShapePairEvent>) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            hooks,
            &self.event_collector,
        );

        for event in self.event_collector.drain_collisions() {
            let (h1, h2) = (event.collider1(), event.collider2());
            let (kind, first, second) = if event.sensor() {
                let h1_is_sensor = self.colliders.get(h1).is_some_and(|c| c.is_sensor());
                if h1_is_sensor {
                    (PairEventKind::Sensor, h1, h2)
                } else {
                    (PairEventKind::Sensor, h2, h1)
                }
            } else {
                (PairEventKind::Contact, h1, h2)
            };
            if let (Some(a), Some(b)) = (self.collider_tag(first), self.collider_tag(second)) {
                events.push(ShapePairEvent {
                    kind,
                    started: event.started(),
                    a,
                    b,
                });
            }
        }
    }

    /// Apply a force for the next step.
    pub fn apply_force(&mut self, body: RigidBodyHandle, force: Vec2) -> bool {
        match self.bodies.get_mut(body) {
            Some(rb) => {
                rb.add_force(vec2_to_na(force), true);
                true
            }
            None => false,
        }
    }

    /// Rapier keeps user forces between steps; clear them once applied.
    pub fn reset_forces(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.bodies.get_mut(body) {
            rb.reset_forces(false);
        }
    }

    /// Teleport a body, keeping its rotation.
    pub fn set_position(&mut self, body: RigidBodyHandle, position: Vec2) -> bool {
        match self.bodies.get_mut(body) {
            Some(rb) => {
                rb.set_translation(vec2_to_na(position), true);
                true
            }
            None => false,
        }
    }

    pub fn position(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(body).map(|rb| na_to_vec2(rb.translation()))
    }

    pub fn velocity(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(body).map(|rb| na_to_vec2(rb.linvel()))
    }

    /// Number of rigid bodies in the simulation.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of colliders in the simulation.
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn collider_tag(&self, collider: ColliderHandle) -> Option<ShapeTag> {
        self.colliders
            .get(collider)
            .map(|c| ShapeTag::decode(c.user_data))
    }

    /// World-space bounds of all colliders attached to a body, as (min, max).
    pub fn body_bounds(&self, body: RigidBodyHandle) -> Option<(Vec2, Vec2)> {
        let rb = self.bodies.get(body)?;
        let mut bounds: Option<(Vec2, Vec2)> = None;
        for handle in rb.colliders() {
            let Some(collider) = self.colliders.get(*handle) else {
                continue;
            };
            let aabb = collider.compute_aabb();
            let min = Vec2::new(aabb.mins.x, aabb.mins.y);
            let max = Vec2::new(aabb.maxs.x, aabb.maxs.y);
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(min), hi.max(max)),
                None => (min, max),
            });
        }
        bounds
    }

    /// World-space outline of every collider, for debug overlays.
    pub fn collider_outlines(&self) -> Vec<ColliderOutline> {
        let mut outlines = Vec::with_capacity(self.colliders.len());
        for (_, collider) in self.colliders.iter() {
            let iso = collider.position();
            let shape = collider.shape();
            if let Some(ball) = shape.as_ball() {
                outlines.push(ColliderOutline::Circle {
                    center: na_to_vec2(&iso.translation.vector),
                    radius: ball.radius,
                });
            } else if let Some(cuboid) = shape.as_cuboid() {
                let he = cuboid.half_extents;
                let corners = [
                    point![-he.x, -he.y],
                    point![he.x, -he.y],
                    point![he.x, he.y],
                    point![-he.x, he.y],
                ];
                outlines.push(ColliderOutline::Polygon(
                    corners
                        .iter()
                        .map(|p| {
                            let w = iso * p;
                            Vec2::new(w.x, w.y)
                        })
                        .collect(),
                ));
            } else if let Some(polygon) = shape.as_convex_polygon() {
                outlines.push(ColliderOutline::Polygon(
                    polygon
                        .points()
                        .iter()
                        .map(|p| {
                            let w = iso * p;
                            Vec2::new(w.x, w.y)
                        })
                        .collect(),
                ));
            }
        }
        outlines
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
