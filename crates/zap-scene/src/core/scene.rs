//! The scene: a tile map, the bodies living on it, and the physics world
//! that moves them. Rendering one frame is the only place the world steps.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use glam::Vec2;

use crate::api::config::{SceneOptions, StepMode};
use crate::api::types::{BodyId, BodyIdGenerator, Color, Rect};
use crate::assets::loader::TileMapLoader;
use crate::components::body::{Body, BodyMap, BodyShape};
use crate::components::graphics::GraphicsRenderOptions;
use crate::components::prototype::{BodyOptions, BodyPrototype, BodyShapeOptions, ShapeGeometry, ShapePrototype};
use crate::components::tilemap::{ObjectKind, TileMap, TileMapObject};
use crate::core::contact::{dispatch_events, ContactObserver, ObserverRegistry, PreSolveHooks};
use crate::core::deferred::{DeferredAction, DeferredQueue};
use crate::core::physics::{ColliderShape, PhysicsWorld, ShapeTag, MAX_POLYGON_VERTICES};
use crate::core::time::FixedTimestep;
use crate::core::units::Units;
use crate::error::SceneError;
use crate::renderer::camera::FollowCamera;
use crate::renderer::canvas::Canvas;
use crate::systems::debug::draw_colliders;
use crate::systems::pathfinding::{find_grid_path, PathOptions, PhysicsOccupancy};
use crate::systems::render::LayerWalker;

/// Per-frame input to [`Scene::render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Screen rect the scene is drawn into.
    pub viewport: Rect,
    /// Wall-clock time since the previous frame.
    pub time_passed: Duration,
}

impl RenderState {
    pub fn new(viewport: Rect, time_passed: Duration) -> Self {
        Self { viewport, time_passed }
    }
}

/// A physics-backed tile-map scene.
///
/// Positions, destinations and path points are map pixels. Forces and
/// gravity are physics units (newtons, m/s²); `units()` converts between
/// the two using `meters_per_pixel`.
pub struct Scene {
    options: SceneOptions,
    units: Units,
    physics: PhysicsWorld,
    bodies: BodyMap,
    ids: BodyIdGenerator,
    deferred: DeferredQueue,
    observers: ObserverRegistry,
    tile_map: Option<TileMap>,
    camera: FollowCamera,
    followed: Option<BodyId>,
    timestep: Option<FixedTimestep>,
    /// Bodies that received a force this frame.
    forced: BTreeSet<BodyId>,
}

impl Scene {
    pub fn new(options: SceneOptions) -> Self {
        let units = Units::new(options.effective_meters_per_pixel());
        let physics = PhysicsWorld::new(options.gravity, options.solver_iterations);
        let timestep = match options.step_mode {
            StepMode::Variable => None,
            StepMode::Fixed { dt } => Some(FixedTimestep::new(dt)),
        };
        Self {
            options,
            units,
            physics,
            bodies: BodyMap::new(),
            ids: BodyIdGenerator::new(),
            deferred: DeferredQueue::new(),
            observers: ObserverRegistry::new(),
            tile_map: None,
            camera: FollowCamera::new(),
            followed: None,
            timestep,
            forced: BTreeSet::new(),
        }
    }

    pub fn options(&self) -> &SceneOptions {
        &self.options
    }

    pub fn units(&self) -> Units {
        self.units
    }

    // -- Tile map -----------------------------------------------------------

    /// Replace the current map with the one at `path`.
    ///
    /// Existing bodies and map state are torn down first, so on failure the
    /// scene is left without a map.
    pub fn load_tile_map(&mut self, path: &Path, loader: &mut dyn TileMapLoader) -> Result<(), SceneError> {
        self.teardown();
        match loader.load(path) {
            Ok(map) => {
                self.tile_map = Some(map);
                Ok(())
            }
            Err(err) => {
                log::warn!("{}", err);
                Err(err.into())
            }
        }
    }

    /// Install an already built map, tearing down the current one.
    pub fn set_tile_map(&mut self, map: TileMap) {
        self.teardown();
        self.tile_map = Some(map);
    }

    pub fn tile_map(&self) -> Option<&TileMap> {
        self.tile_map.as_ref()
    }

    pub fn tile_map_object_by_id(&self, id: u32) -> Option<&TileMapObject> {
        self.tile_map.as_ref()?.object_by_id(id)
    }

    pub fn tile_map_object_by_name(&self, name: &str) -> Option<&TileMapObject> {
        self.tile_map.as_ref()?.object_by_name(name)
    }

    fn teardown(&mut self) {
        if !self.bodies.is_empty() || self.tile_map.is_some() {
            log::info!("Tearing down scene: {} bodies", self.bodies.len());
        }
        self.bodies.clear();
        self.forced.clear();
        self.deferred.clear();
        self.followed = None;
        self.tile_map = None;
        self.camera = FollowCamera::new();
        self.physics = PhysicsWorld::new(self.physics.gravity(), self.options.solver_iterations);
        if let Some(timestep) = &mut self.timestep {
            timestep.reset();
        }
    }

    // -- Bodies -------------------------------------------------------------

    /// Create a body at `position` (pixels) from a prototype.
    ///
    /// Shapes with degenerate geometry are skipped; the body is created with
    /// the remaining ones.
    pub fn create_body(&mut self, position: Vec2, prototype: &BodyPrototype) -> BodyId {
        let id = self.ids.next_id();
        let handle = self.physics.create_body(
            id,
            self.units.point_to_physics(position),
            prototype.body_type,
            &prototype.physics,
        );
        let mut body = Body::new(id, handle);
        for (key, shape) in &prototype.shapes {
            self.attach_prototype_shape(&mut body, key, shape);
        }
        log::debug!(
            "Created body {:?} with {}/{} shapes",
            id,
            body.shapes().len(),
            prototype.shapes.len()
        );
        self.bodies.insert(id, body);
        id
    }

    fn attach_prototype_shape(&mut self, body: &mut Body, key: &str, shape: &ShapePrototype) {
        let Some(collider_shape) = collider_shape(self.units, &shape.geometry) else {
            log::warn!("Skipping shape {:?} of body {:?}: degenerate geometry", key, body.id());
            return;
        };
        let tag = ShapeTag {
            body: body.id(),
            shape: body.shapes().len(),
        };
        let Some(collider) = self
            .physics
            .attach_collider(body.handle(), tag, &collider_shape, &shape.physics)
        else {
            log::warn!("Skipping shape {:?} of body {:?}: collider rejected", key, body.id());
            return;
        };
        let mut body_shape = BodyShape::new(key, None, collider);
        for (graphic_key, graphic) in &shape.graphics {
            body_shape.add_graphic(graphic_key.clone(), graphic.clone());
        }
        body.push_shape(body_shape);
    }

    /// Create one body per map object of class `class`, using the object's
    /// polygon or circle as the body's single shape (keyed by the class).
    /// Returns the number of bodies created.
    pub fn create_bodies_from_map_objects(
        &mut self,
        class: &str,
        body_options: &BodyOptions,
        shape_options: &BodyShapeOptions,
    ) -> Result<usize, SceneError> {
        let map = self.tile_map.as_ref().ok_or(SceneError::NoTileMap)?;
        let objects: Vec<TileMapObject> = map
            .objects()
            .into_iter()
            .filter(|object| object.class == class)
            .cloned()
            .collect();

        let mut created = 0;
        for object in &objects {
            let geometry = match &object.kind {
                ObjectKind::Polygon(points) => ShapeGeometry::Polygon(points.clone()),
                ObjectKind::Circle { radius } => ShapeGeometry::Circle {
                    center: Vec2::ZERO,
                    radius: *radius,
                },
                ObjectKind::Point | ObjectKind::Polyline(_) => {
                    log::warn!("Map object {} of class {:?} has no area; skipped", object.id, class);
                    continue;
                }
            };

            let id = self.ids.next_id();
            let handle = self.physics.create_body(
                id,
                self.units.point_to_physics(object.position()),
                body_options.body_type,
                &body_options.physics,
            );
            let mut body = Body::new(id, handle);
            match collider_shape(self.units, &geometry) {
                Some(shape) => {
                    let tag = ShapeTag { body: id, shape: 0 };
                    if let Some(collider) = self.physics.attach_collider(handle, tag, &shape, shape_options) {
                        body.push_shape(BodyShape::new(class, Some(object.id), collider));
                    }
                }
                None => log::warn!("Map object {} has degenerate geometry; body {:?} has no shape", object.id, id),
            }
            self.bodies.insert(id, body);
            created += 1;
        }
        log::debug!("Created {} bodies from map objects of class {:?}", created, class);
        Ok(created)
    }

    /// Remove a body and its colliders. Returns false for unknown ids.
    pub fn destroy_body(&mut self, id: BodyId) -> bool {
        let Some(body) = self.bodies.remove(&id) else {
            return false;
        };
        self.physics.remove_body(body.handle());
        self.forced.remove(&id);
        if self.followed == Some(id) {
            self.followed = None;
        }
        log::debug!("Destroyed body {:?}", id);
        true
    }

    pub fn contains_body(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Current position in pixels.
    pub fn body_position(&self, id: BodyId) -> Option<Vec2> {
        let body = self.bodies.get(&id)?;
        self.physics
            .position(body.handle())
            .map(|p| self.units.point_to_pixels(p))
    }

    /// Queue a force (physics units) for the next step.
    pub fn apply_force(&mut self, id: BodyId, force: Vec2) {
        self.deferred.push(DeferredAction::ApplyForce { body: id, force });
    }

    /// Queue a teleport to `position` (pixels).
    pub fn set_body_position(&mut self, id: BodyId, position: Vec2) {
        self.deferred.push(DeferredAction::SetPosition { body: id, position });
    }

    /// Queue a gravity change (physics units).
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.deferred.push(DeferredAction::SetGravity(gravity));
    }

    pub fn gravity(&self) -> Vec2 {
        self.physics.gravity()
    }

    /// Number of world mutations waiting for the next frame.
    pub fn pending_actions(&self) -> usize {
        self.deferred.len()
    }

    pub fn set_body_layer(&mut self, id: BodyId, layer: &str) -> bool {
        match self.bodies.get_mut(&id) {
            Some(body) => {
                body.set_layer(layer);
                true
            }
            None => false,
        }
    }

    pub fn set_body_shape_current_graphic(&mut self, id: BodyId, shape_key: &str, graphic_key: &str) -> bool {
        self.bodies
            .get_mut(&id)
            .and_then(|body| body.find_shape_mut(shape_key))
            .is_some_and(|shape| shape.set_current_graphic(graphic_key))
    }

    pub fn flip_body_shape_graphic(
        &mut self,
        id: BodyId,
        shape_key: &str,
        graphic_key: &str,
        horizontal: bool,
        vertical: bool,
    ) -> bool {
        self.bodies
            .get_mut(&id)
            .and_then(|body| body.find_shape_mut(shape_key))
            .is_some_and(|shape| shape.flip_graphic(graphic_key, horizontal, vertical))
    }

    // -- Camera -------------------------------------------------------------

    /// Keep `id` centered in the viewport on every frame.
    pub fn set_followed_body(&mut self, id: BodyId) -> bool {
        if !self.bodies.contains_key(&id) {
            return false;
        }
        self.followed = Some(id);
        true
    }

    /// Stop following; the camera stays where it is.
    pub fn reset_followed_body(&mut self) {
        self.followed = None;
    }

    pub fn followed_body(&self) -> Option<BodyId> {
        self.followed
    }

    /// Top-left corner of the visible part of the world, in pixels.
    pub fn world_offset(&self) -> Vec2 {
        self.camera.offset()
    }

    // -- Contacts -----------------------------------------------------------

    /// Register an observer. The scene keeps only a weak reference; the
    /// caller owns the observer. Returns false if already registered.
    pub fn add_contact_observer(&mut self, observer: &Arc<dyn ContactObserver>) -> bool {
        self.observers.add(observer)
    }

    pub fn remove_contact_observer(&mut self, observer: &Arc<dyn ContactObserver>) -> bool {
        self.observers.remove(observer)
    }

    // -- Pathfinding --------------------------------------------------------

    /// Find a route for a body to `destination` (pixels), treating other
    /// colliders as obstacles. Sensors are obstacles only when
    /// `avoid_sensors` is set.
    ///
    /// Returns `Ok(None)` when the destination is blocked or unreachable.
    pub fn find_path(
        &self,
        id: BodyId,
        destination: Vec2,
        allow_diagonal_steps: bool,
        avoid_sensors: bool,
    ) -> Result<Option<Vec<Vec2>>, SceneError> {
        let body = self.bodies.get(&id).ok_or(SceneError::UnknownBody(id))?;
        let start = self
            .physics
            .position(body.handle())
            .map(|p| self.units.point_to_pixels(p))
            .ok_or(SceneError::UnknownBody(id))?;
        let (occupancy, cell_size) = PhysicsOccupancy::for_body(
            &self.physics,
            self.units,
            body.handle(),
            avoid_sensors,
            self.options.default_cell_size,
        );
        let options = PathOptions {
            allow_diagonal_steps,
            cell_size,
            margin: self.options.path_search_margin,
            max_cells: self.options.path_max_nodes,
        };
        let path = find_grid_path(&occupancy, start, destination, &options);
        if path.is_none() {
            log::debug!("No path for body {:?} to {:?}", id, destination);
        }
        Ok(path)
    }

    // -- Frame --------------------------------------------------------------

    /// Run one frame: apply deferred mutations, step physics, deliver contact
    /// events, move the camera and draw the map with its bodies.
    ///
    /// Without a map the world still steps, but nothing is drawn.
    pub fn render(&mut self, canvas: &mut dyn Canvas, state: &RenderState) {
        self.flush_deferred();
        self.step(state.time_passed);

        let Some(map) = &self.tile_map else {
            return;
        };

        if let Some(id) = self.followed {
            if let Some(position) = self.body_position(id) {
                self.camera.follow(position, state.viewport.size(), map.pixel_origin(), map.pixel_extent());
            }
        }

        canvas.clear(map.background_color);

        let walker = LayerWalker::new(map, &self.camera, state.viewport, self.options.debug_rendering);
        let mut remaining: BTreeSet<BodyId> = self.bodies.keys().copied().collect();
        let mut draw_body = |canvas: &mut dyn Canvas, id: BodyId| {
            if let Some(body) = self.bodies.get(&id) {
                self.draw_body(canvas, body, state);
            }
        };
        walker.walk(canvas, &self.bodies, &mut remaining, &mut draw_body);
        walker.finish(canvas, &self.bodies, &mut remaining, &mut draw_body);

        if self.options.debug_rendering {
            draw_colliders(
                canvas,
                &self.physics,
                self.units,
                &self.camera,
                &state.viewport,
                Color::DEBUG_COLLIDER,
            );
        }
    }

    fn flush_deferred(&mut self) {
        let Self {
            deferred,
            physics,
            bodies,
            units,
            forced,
            ..
        } = self;
        deferred.flush(|action| match action {
            DeferredAction::SetGravity(gravity) => physics.set_gravity(gravity),
            DeferredAction::ApplyForce { body, force } => {
                let applied = bodies
                    .get(&body)
                    .is_some_and(|b| physics.apply_force(b.handle(), force));
                if applied {
                    forced.insert(body);
                } else {
                    log::debug!("Dropping force for unknown body {:?}", body);
                }
            }
            DeferredAction::SetPosition { body, position } => {
                let moved = bodies
                    .get(&body)
                    .is_some_and(|b| physics.set_position(b.handle(), units.point_to_physics(position)));
                if !moved {
                    log::debug!("Dropping move for unknown body {:?}", body);
                }
            }
        });
    }

    fn step(&mut self, elapsed: Duration) {
        let (steps, dt) = match &mut self.timestep {
            Some(timestep) => (timestep.accumulate(elapsed), timestep.dt()),
            None => (1, elapsed.as_secs_f32()),
        };
        if steps == 0 || dt <= 0.0 {
            return;
        }

        let observers = self.observers.snapshot();
        let mut events = Vec::new();
        {
            let hooks = PreSolveHooks {
                observers: &observers,
                bodies: &self.bodies,
            };
            for _ in 0..steps {
                self.physics.step(dt, &hooks, &mut events);
            }
        }

        for id in std::mem::take(&mut self.forced) {
            if let Some(body) = self.bodies.get(&id) {
                self.physics.reset_forces(body.handle());
            }
        }

        dispatch_events(&observers, &self.bodies, &events);
    }

    fn draw_body(&self, canvas: &mut dyn Canvas, body: &Body, state: &RenderState) {
        let Some(position) = self.physics.position(body.handle()) else {
            return;
        };
        let screen = self
            .camera
            .to_screen(self.units.point_to_pixels(position), &state.viewport);
        for shape in body.shapes() {
            let Some(graphic) = shape.current_graphic() else {
                continue;
            };
            let options = GraphicsRenderOptions {
                flip: graphic.options.flip,
                angle: 0.0,
            };
            let mut pack = graphic.pack.lock().unwrap_or_else(PoisonError::into_inner);
            pack.render(canvas, screen + graphic.options.offset, state.time_passed, &options);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneOptions::default())
    }
}

/// Convert pixel-space prototype geometry into a collider shape in meters.
fn collider_shape(units: Units, geometry: &ShapeGeometry) -> Option<ColliderShape> {
    match geometry {
        ShapeGeometry::Polygon(points) => {
            if points.len() < 3 || points.len() > MAX_POLYGON_VERTICES {
                return None;
            }
            Some(ColliderShape::Polygon(
                points.iter().map(|p| units.point_to_physics(*p)).collect(),
            ))
        }
        ShapeGeometry::Rect(rect) => {
            if rect.w <= 0.0 || rect.h <= 0.0 {
                return None;
            }
            let half = rect.size() / 2.0;
            Some(ColliderShape::Cuboid {
                center: units.point_to_physics(rect.origin() + half),
                half_extents: units.point_to_physics(half),
            })
        }
        ShapeGeometry::Circle { center, radius } => {
            if *radius <= 0.0 {
                return None;
            }
            Some(ColliderShape::Ball {
                center: units.point_to_physics(*center),
                radius: units.to_physics(*radius),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Flip, TextureId};
    use crate::components::body::BodyShapeGraphics;
    use crate::components::graphics::{FrameOptions, GraphicsPack, Sprite, SpriteOptions};
    use crate::components::prototype::{BodyPhysics, BodyType};
    use crate::components::tilemap::{Layer, LayerKind, ObjectLayer, Tile, TileLayer};
    use crate::renderer::canvas::{DrawCommand, DrawList, TextureDraw};

    fn frame(ms: u64) -> RenderState {
        RenderState::new(Rect::new(0.0, 0.0, 320.0, 240.0), Duration::from_millis(ms))
    }

    fn square(size: f32) -> ShapePrototype {
        ShapePrototype::rect(Rect::new(-size / 2.0, -size / 2.0, size, size))
    }

    #[test]
    fn collider_shape_rejects_degenerate_geometry() {
        let units = Units::new(0.01);
        assert!(collider_shape(units, &ShapeGeometry::Polygon(vec![Vec2::ZERO, Vec2::X])).is_none());
        assert!(collider_shape(units, &ShapeGeometry::Polygon(vec![Vec2::ZERO; 9])).is_none());
        assert!(collider_shape(units, &ShapeGeometry::Rect(Rect::new(0.0, 0.0, 0.0, 5.0))).is_none());
        assert!(collider_shape(
            units,
            &ShapeGeometry::Circle {
                center: Vec2::ZERO,
                radius: 0.0
            }
        )
        .is_none());
    }

    #[test]
    fn rect_becomes_centered_cuboid() {
        let units = Units::new(0.01);
        let shape = collider_shape(units, &ShapeGeometry::Rect(Rect::new(0.0, 0.0, 20.0, 10.0))).unwrap();
        match shape {
            ColliderShape::Cuboid { center, half_extents } => {
                assert!((center - Vec2::new(0.1, 0.05)).length() < 1e-6);
                assert!((half_extents - Vec2::new(0.1, 0.05)).length() < 1e-6);
            }
            other => panic!("expected cuboid, got {:?}", other),
        }
    }

    #[test]
    fn deferred_actions_apply_on_render() {
        let mut scene = Scene::default();
        let prototype = BodyPrototype::new(BodyType::Kinematic).with_shape("s", square(4.0));
        let id = scene.create_body(Vec2::new(10.0, 10.0), &prototype);
        scene.set_body_position(id, Vec2::new(50.0, 60.0));
        scene.set_gravity(Vec2::new(0.0, 9.8));
        assert_eq!(scene.pending_actions(), 2);
        assert!((scene.body_position(id).unwrap() - Vec2::new(10.0, 10.0)).length() < 1e-3);

        scene.render(&mut DrawList::new(), &frame(16));
        assert_eq!(scene.pending_actions(), 0);
        assert!((scene.body_position(id).unwrap() - Vec2::new(50.0, 60.0)).length() < 1e-3);
        assert_eq!(scene.gravity(), Vec2::new(0.0, 9.8));
    }

    #[test]
    fn force_applies_for_one_frame_only() {
        let mut scene = Scene::default();
        let prototype = BodyPrototype::new(BodyType::Dynamic)
            .with_physics(BodyPhysics {
                linear_damping: 0.0,
                angular_damping: 0.0,
                fixed_rotation: true,
            })
            .with_shape("s", square(10.0));
        let id = scene.create_body(Vec2::ZERO, &prototype);
        scene.apply_force(id, Vec2::new(1.0, 0.0));
        scene.render(&mut DrawList::new(), &frame(16));
        let handle = scene.body(id).unwrap().handle();
        let v1 = scene.physics.velocity(handle).unwrap();
        assert!(v1.x > 0.0);

        scene.render(&mut DrawList::new(), &frame(16));
        let v2 = scene.physics.velocity(handle).unwrap();
        assert!((v2.x - v1.x).abs() < 1e-4);
    }

    #[test]
    fn fixed_step_mode_accumulates() {
        let mut scene = Scene::new(SceneOptions {
            gravity: Vec2::new(0.0, 10.0),
            step_mode: StepMode::Fixed { dt: 0.01 },
            ..SceneOptions::default()
        });
        let prototype = BodyPrototype::new(BodyType::Dynamic)
            .with_physics(BodyPhysics {
                linear_damping: 0.0,
                angular_damping: 0.0,
                fixed_rotation: true,
            })
            .with_shape("s", square(10.0));
        let id = scene.create_body(Vec2::ZERO, &prototype);

        // Less than one step: nothing moves.
        scene.render(&mut DrawList::new(), &frame(5));
        assert!(scene.body_position(id).unwrap().length() < 1e-4);

        scene.render(&mut DrawList::new(), &frame(30));
        assert!(scene.body_position(id).unwrap().y > 0.0);
    }

    #[test]
    fn positions_are_pixels_and_gravity_is_physical() {
        let mut scene = Scene::default();
        let prototype = BodyPrototype::new(BodyType::Kinematic).with_shape("s", square(4.0));
        let id = scene.create_body(Vec2::new(100.0, 50.0), &prototype);
        let handle = scene.body(id).unwrap().handle();
        let meters = scene.physics.position(handle).unwrap();
        assert!((meters - Vec2::new(1.0, 0.5)).length() < 1e-5);
        assert!((scene.units().point_to_pixels(meters) - Vec2::new(100.0, 50.0)).length() < 1e-3);

        scene.set_gravity(Vec2::new(0.0, 9.8));
        scene.render(&mut DrawList::new(), &frame(16));
        assert_eq!(scene.physics.gravity(), Vec2::new(0.0, 9.8));
    }

    #[test]
    fn map_reload_drops_pending_actions() {
        let mut scene = Scene::default();
        scene.set_tile_map(TileMap::new(1, 1, 8, 8));
        let prototype = BodyPrototype::new(BodyType::Dynamic).with_shape("s", square(4.0));
        let id = scene.create_body(Vec2::ZERO, &prototype);
        scene.apply_force(id, Vec2::new(5.0, 0.0));
        scene.set_body_position(id, Vec2::new(40.0, 40.0));
        scene.set_gravity(Vec2::new(0.0, 3.0));
        assert_eq!(scene.pending_actions(), 3);

        scene.set_tile_map(TileMap::new(2, 2, 8, 8));
        assert_eq!(scene.pending_actions(), 0);
        scene.render(&mut DrawList::new(), &frame(16));
        assert_eq!(scene.gravity(), Vec2::ZERO);
        assert_eq!(scene.body_count(), 0);
    }

    #[test]
    fn render_without_map_draws_nothing() {
        let mut scene = Scene::default();
        scene.create_body(Vec2::ZERO, &BodyPrototype::new(BodyType::Static));
        let mut canvas = DrawList::new();
        scene.render(&mut canvas, &frame(16));
        assert!(canvas.is_empty());
    }

    #[test]
    fn bodies_drawn_after_their_layer() {
        let mut scene = Scene::default();
        let mut ground = TileLayer::new(1, 1);
        ground.set(0, 0, Some(Tile::new(TextureId(1), Rect::new(0.0, 0.0, 32.0, 32.0))));
        let map = TileMap::new(1, 1, 32, 32)
            .with_background(Color::rgb(1, 2, 3))
            .with_layer(Layer::new(1, "ground", LayerKind::Tile(ground)))
            .with_layer(Layer::new(2, "top", LayerKind::Object(ObjectLayer::default())));
        scene.set_tile_map(map);

        let mut pack = GraphicsPack::new();
        pack.add_frame(FrameOptions::default());
        pack.add_sprite(0, Sprite::new(TextureId(9), Rect::new(0.0, 0.0, 8.0, 8.0)), SpriteOptions::default());
        let graphic = BodyShapeGraphics::new(pack.shared())
            .with_offset(Vec2::new(2.0, 3.0))
            .with_flip(Flip::new(true, false));
        let prototype = BodyPrototype::new(BodyType::Static).with_shape("s", square(4.0).with_graphic("idle", graphic));

        let layered = scene.create_body(Vec2::new(10.0, 10.0), &prototype);
        let loose = scene.create_body(Vec2::new(20.0, 20.0), &prototype);
        let lost = scene.create_body(Vec2::new(30.0, 30.0), &prototype);
        for id in [layered, loose, lost] {
            assert!(scene.set_body_shape_current_graphic(id, "s", "idle"));
        }
        assert!(scene.set_body_layer(layered, "ground"));
        assert!(scene.set_body_layer(lost, "missing"));

        let mut canvas = DrawList::new();
        scene.render(&mut canvas, &frame(16));

        assert_eq!(canvas.commands[0], DrawCommand::Clear(Color::rgb(1, 2, 3)));
        let textures: Vec<&TextureDraw> = canvas.textures().collect();
        // Tile, layered body, then the body without a layer.
        assert_eq!(textures.len(), 3);
        assert_eq!(textures[0].texture, TextureId(1));
        assert_eq!(textures[1].texture, TextureId(9));
        assert!((textures[1].dest.origin() - Vec2::new(12.0, 13.0)).length() < 1e-3);
        assert!(textures[1].flip.horizontal);
        assert!((textures[2].dest.origin() - Vec2::new(22.0, 23.0)).length() < 1e-3);
    }

    #[test]
    fn load_failure_tears_down() {
        struct Failing;
        impl TileMapLoader for Failing {
            fn load(&mut self, path: &Path) -> Result<TileMap, crate::error::MapLoadError> {
                Err(crate::error::MapLoadError::Empty {
                    path: path.to_path_buf(),
                })
            }
        }

        let mut scene = Scene::default();
        scene.set_tile_map(TileMap::new(1, 1, 8, 8));
        let id = scene.create_body(Vec2::ZERO, &BodyPrototype::new(BodyType::Static));
        assert!(scene.set_followed_body(id));

        let err = scene.load_tile_map(Path::new("broken.json"), &mut Failing).unwrap_err();
        assert!(matches!(err, SceneError::MapLoad(_)));
        assert!(scene.tile_map().is_none());
        assert_eq!(scene.body_count(), 0);
        assert_eq!(scene.followed_body(), None);
    }

    #[test]
    fn map_objects_become_bodies() {
        let mut scene = Scene::default();
        assert!(matches!(
            scene.create_bodies_from_map_objects("wall", &BodyOptions::default(), &BodyShapeOptions::default()),
            Err(SceneError::NoTileMap)
        ));

        let objects = ObjectLayer {
            objects: vec![
                TileMapObject::new(1, ObjectKind::Polygon(vec![Vec2::ZERO, Vec2::new(32.0, 0.0), Vec2::new(32.0, 32.0)]))
                    .with_class("wall")
                    .at(64.0, 64.0),
                TileMapObject::new(2, ObjectKind::Circle { radius: 8.0 }).with_class("wall").at(10.0, 10.0),
                TileMapObject::new(3, ObjectKind::Point).with_class("wall"),
                TileMapObject::new(4, ObjectKind::Circle { radius: 8.0 }).with_class("coin"),
                TileMapObject::new(5, ObjectKind::Polygon(vec![Vec2::ZERO, Vec2::X])).with_class("wall"),
            ],
        };
        scene.set_tile_map(TileMap::new(4, 4, 32, 32).with_layer(Layer::new(1, "objects", LayerKind::Object(objects))));

        let created = scene
            .create_bodies_from_map_objects("wall", &BodyOptions::default(), &BodyShapeOptions::default())
            .unwrap();
        assert_eq!(created, 3);
        assert_eq!(scene.body_count(), 3);

        let shaped: Vec<&Body> = scene.bodies.values().filter(|b| !b.shapes().is_empty()).collect();
        assert_eq!(shaped.len(), 2);
        let first = shaped[0];
        assert_eq!(first.shapes()[0].key(), "wall");
        assert_eq!(first.shapes()[0].tile_map_object_id(), Some(1));
        assert!((scene.body_position(first.id()).unwrap() - Vec2::new(64.0, 64.0)).length() < 1e-3);
    }
}
