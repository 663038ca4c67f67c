//! End-to-end scene scenarios driven through the public API and a recording
//! canvas.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use glam::Vec2;
use zap_scene::{
    BodyId, BodyPhysics, BodyPrototype, BodyShapeGraphics, BodyType, Color, Contact, ContactCallbacks,
    ContactObserver, DrawList, GraphicsPack, JsonTileMapLoader, Layer, LayerKind, MapLoadError, PreSolveContact,
    Rect, RenderState, Scene, SceneError, SceneOptions, SensorContact, ShapePrototype, TextureId, TileLayer,
    TileMap,
};

// ============================================================================
// Helpers
// ============================================================================

fn frame(viewport: Rect) -> RenderState {
    RenderState::new(viewport, Duration::from_millis(16))
}

fn run(scene: &mut Scene, frames: usize) {
    let viewport = Rect::new(0.0, 0.0, 320.0, 240.0);
    for _ in 0..frames {
        scene.render(&mut DrawList::new(), &frame(viewport));
    }
}

fn boxed(body_type: BodyType, width: f32, height: f32) -> BodyPrototype {
    BodyPrototype::new(body_type)
        .with_physics(BodyPhysics {
            linear_damping: 0.0,
            angular_damping: 0.0,
            fixed_rotation: true,
        })
        .with_shape(
            "box",
            ShapePrototype::rect(Rect::new(-width / 2.0, -height / 2.0, width, height)),
        )
}

/// 20x20 map of 32px tiles with a single empty tile layer.
fn empty_map() -> TileMap {
    TileMap::new(20, 20, 32, 32).with_layer(Layer::new(1, "ground", LayerKind::Tile(TileLayer::new(20, 20))))
}

// ============================================================================
// Body lifecycle
// ============================================================================

#[test]
fn body_ids_increase_and_positions_round_trip() {
    let mut scene = Scene::default();
    let points = [Vec2::new(12.5, 40.0), Vec2::new(-300.0, 7.25), Vec2::new(1024.0, 768.0)];

    let mut last = BodyId(0);
    for point in points {
        let id = scene.create_body(point, &boxed(BodyType::Static, 8.0, 8.0));
        assert!(id > last, "{:?} not after {:?}", id, last);
        last = id;

        let position = scene.body_position(id).unwrap();
        assert!((position - point).length() < 1e-3, "{:?} != {:?}", position, point);
    }
    assert_eq!(scene.body_count(), 3);
}

#[test]
fn destroyed_body_is_not_found_everywhere() {
    let mut scene = Scene::default();
    scene.set_tile_map(empty_map());
    let id = scene.create_body(Vec2::new(50.0, 50.0), &boxed(BodyType::Dynamic, 8.0, 8.0));
    scene.apply_force(id, Vec2::new(1.0, 0.0));

    assert!(scene.destroy_body(id));
    assert!(!scene.destroy_body(id));
    assert!(!scene.contains_body(id));
    assert_eq!(scene.body_position(id), None);
    assert!(!scene.set_followed_body(id));
    assert!(!scene.set_body_layer(id, "ground"));
    assert!(!scene.set_body_shape_current_graphic(id, "box", "idle"));
    assert!(!scene.flip_body_shape_graphic(id, "box", "idle", true, false));
    assert!(matches!(
        scene.find_path(id, Vec2::ZERO, true, false),
        Err(SceneError::UnknownBody(missing)) if missing == id
    ));

    // The queued force targets a dead body; the frame must still run.
    scene.set_body_position(id, Vec2::ZERO);
    run(&mut scene, 1);
    assert_eq!(scene.pending_actions(), 0);
}

#[test]
fn degenerate_polygon_is_skipped_but_body_is_created() {
    let mut scene = Scene::default();
    let prototype = BodyPrototype::new(BodyType::Dynamic)
        .with_shape("edge", ShapePrototype::polygon(vec![Vec2::ZERO, Vec2::new(10.0, 0.0)]))
        .with_shape("core", ShapePrototype::circle(Vec2::ZERO, 6.0));

    let id = scene.create_body(Vec2::new(10.0, 10.0), &prototype);
    let body = scene.body(id).unwrap();
    assert_eq!(body.shapes().len(), 1);
    assert_eq!(body.shapes()[0].key(), "core");
    assert!(body.find_shape("edge").is_none());
}

#[test]
fn unknown_graphic_key_keeps_selection() {
    let mut scene = Scene::default();
    let pack = GraphicsPack::new().shared();
    let prototype = BodyPrototype::new(BodyType::Static).with_shape(
        "hero",
        ShapePrototype::circle(Vec2::ZERO, 4.0)
            .with_graphic("idle", BodyShapeGraphics::new(pack.clone()))
            .with_graphic("walk", BodyShapeGraphics::new(pack)),
    );
    let id = scene.create_body(Vec2::ZERO, &prototype);

    assert!(scene.set_body_shape_current_graphic(id, "hero", "idle"));
    assert!(!scene.set_body_shape_current_graphic(id, "hero", "run"));
    assert!(!scene.set_body_shape_current_graphic(id, "villain", "walk"));
    let shape = scene.body(id).unwrap().find_shape("hero").unwrap();
    assert_eq!(shape.current_graphic_key(), Some("idle"));

    assert!(scene.flip_body_shape_graphic(id, "hero", "walk", true, true));
    assert!(!scene.flip_body_shape_graphic(id, "hero", "run", true, true));
    let shape = scene.body(id).unwrap().find_shape("hero").unwrap();
    assert!(shape.graphic("walk").unwrap().options.flip.vertical);
}

#[test]
fn deferred_queue_is_empty_after_render() {
    let mut scene = Scene::default();
    let id = scene.create_body(Vec2::ZERO, &boxed(BodyType::Dynamic, 8.0, 8.0));
    for i in 0..50 {
        scene.apply_force(id, Vec2::new(i as f32, 0.0));
        scene.set_body_position(id, Vec2::new(i as f32, 0.0));
    }
    scene.set_gravity(Vec2::new(0.0, 1.0));
    assert_eq!(scene.pending_actions(), 101);

    run(&mut scene, 1);
    assert_eq!(scene.pending_actions(), 0);
    assert_eq!(scene.gravity(), Vec2::new(0.0, 1.0));
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn followed_camera_stays_inside_map() {
    let mut scene = Scene::default();
    scene.set_tile_map(empty_map());
    let id = scene.create_body(Vec2::new(100.0, 100.0), &boxed(BodyType::Kinematic, 8.0, 8.0));
    assert!(scene.set_followed_body(id));

    let viewport = Rect::new(0.0, 0.0, 320.0, 240.0);
    let max = Vec2::new(640.0 - 320.0, 640.0 - 240.0);
    let targets = [
        Vec2::new(-500.0, -500.0),
        Vec2::new(5000.0, 5000.0),
        Vec2::new(320.0, -20.0),
        Vec2::new(700.0, 300.0),
    ];
    for target in targets {
        scene.set_body_position(id, target);
        scene.render(&mut DrawList::new(), &frame(viewport));
        let offset = scene.world_offset();
        assert!(offset.x >= 0.0 && offset.y >= 0.0, "{:?}", offset);
        assert!(offset.x <= max.x && offset.y <= max.y, "{:?}", offset);
    }

    scene.set_body_position(id, Vec2::new(5000.0, 5000.0));
    scene.render(&mut DrawList::new(), &frame(viewport));
    assert_eq!(scene.world_offset(), max);

    scene.set_body_position(id, Vec2::new(320.0, 320.0));
    scene.render(&mut DrawList::new(), &frame(viewport));
    assert!((scene.world_offset() - Vec2::new(160.0, 200.0)).length() < 1e-3);
}

#[test]
fn destroying_followed_body_freezes_camera() {
    let mut scene = Scene::default();
    scene.set_tile_map(empty_map());
    let id = scene.create_body(Vec2::new(400.0, 400.0), &boxed(BodyType::Kinematic, 8.0, 8.0));
    assert!(scene.set_followed_body(id));

    run(&mut scene, 1);
    let offset = scene.world_offset();
    assert!((offset - Vec2::new(240.0, 280.0)).length() < 1e-3);

    assert!(scene.destroy_body(id));
    assert_eq!(scene.followed_body(), None);
    run(&mut scene, 3);
    assert_eq!(scene.world_offset(), offset);
}

// ============================================================================
// Contacts
// ============================================================================

struct Veto(bool);

impl ContactObserver for Veto {
    fn pre_solve_contact(&self, _contact: &PreSolveContact) -> bool {
        self.0
    }
}

#[derive(Default)]
struct Counter {
    begins: AtomicUsize,
    pre_solves: AtomicUsize,
    keys: Mutex<Vec<(String, String)>>,
}

impl ContactObserver for Counter {
    fn begin_contact(&self, contact: &Contact) {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let mut keys = self.keys.lock().unwrap();
        keys.push((contact.side_a.shape_key.clone(), contact.side_b.shape_key.clone()));
    }

    fn pre_solve_contact(&self, _contact: &PreSolveContact) -> bool {
        self.pre_solves.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// A box dropped onto a pre-solve enabled floor. Returns the box's final y.
fn drop_box(scene: &mut Scene) -> f32 {
    let floor = BodyPrototype::new(BodyType::Static).with_shape(
        "floor",
        ShapePrototype::rect(Rect::new(-200.0, -10.0, 400.0, 20.0)).with_pre_solve(true),
    );
    scene.create_body(Vec2::new(0.0, 300.0), &floor);
    let falling = scene.create_body(Vec2::new(0.0, 200.0), &boxed(BodyType::Dynamic, 20.0, 20.0));
    run(scene, 120);
    scene.body_position(falling).unwrap().y
}

fn falling_scene() -> Scene {
    Scene::new(SceneOptions {
        gravity: Vec2::new(0.0, 10.0),
        ..SceneOptions::default()
    })
}

#[test]
fn contact_without_veto_is_reported() {
    let mut scene = falling_scene();
    let counter = Arc::new(Counter::default());
    let observer: Arc<dyn ContactObserver> = counter.clone();
    assert!(scene.add_contact_observer(&observer));
    assert!(!scene.add_contact_observer(&observer));

    let y = drop_box(&mut scene);
    assert!(y < 300.0, "box fell through the floor: {}", y);
    assert!(counter.begins.load(Ordering::SeqCst) >= 1);
    assert!(counter.pre_solves.load(Ordering::SeqCst) >= 1);
    let keys = counter.keys.lock().unwrap();
    assert!(keys
        .iter()
        .all(|(a, b)| (a == "floor" && b == "box") || (a == "box" && b == "floor")));
}

#[test]
fn one_vetoing_observer_blocks_contact() {
    let mut scene = falling_scene();
    let counter = Arc::new(Counter::default());
    let observers: Vec<Arc<dyn ContactObserver>> = vec![
        counter.clone() as Arc<dyn ContactObserver>,
        Arc::new(Veto(true)),
        Arc::new(Veto(false)),
    ];
    for observer in &observers {
        assert!(scene.add_contact_observer(observer));
    }

    let y = drop_box(&mut scene);
    assert!(y > 320.0, "box should pass through the floor: {}", y);
    assert_eq!(counter.begins.load(Ordering::SeqCst), 0);
}

#[test]
fn removed_observer_receives_nothing() {
    let mut scene = falling_scene();
    let counter = Arc::new(Counter::default());
    let observer: Arc<dyn ContactObserver> = counter.clone();
    assert!(scene.add_contact_observer(&observer));
    assert!(scene.remove_contact_observer(&observer));
    assert!(!scene.remove_contact_observer(&observer));

    drop_box(&mut scene);
    assert_eq!(counter.begins.load(Ordering::SeqCst), 0);
}

#[test]
fn sensor_callbacks_see_sensor_first() {
    let mut scene = falling_scene();
    let callbacks = Arc::new(ContactCallbacks::new());
    let seen: Arc<Mutex<Vec<SensorContact>>> = Arc::default();
    let sink = seen.clone();
    callbacks.subscribe_begin_sensor_contact(move |contact| sink.lock().unwrap().push(contact.clone()));
    let observer: Arc<dyn ContactObserver> = callbacks.clone();
    scene.add_contact_observer(&observer);

    let trigger = BodyPrototype::new(BodyType::Static).with_shape(
        "trigger",
        ShapePrototype::rect(Rect::new(-100.0, -10.0, 200.0, 20.0)).with_sensor(true),
    );
    let trigger_id = scene.create_body(Vec2::new(0.0, 250.0), &trigger);
    let falling = scene.create_body(Vec2::new(0.0, 200.0), &boxed(BodyType::Dynamic, 10.0, 10.0));
    run(&mut scene, 60);

    // Sensors do not stop the body.
    assert!(scene.body_position(falling).unwrap().y > 260.0);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].sensor.body_id, trigger_id);
    assert_eq!(seen[0].sensor.shape_key, "trigger");
    assert_eq!(seen[0].visitor.body_id, falling);
}

// ============================================================================
// Pathfinding
// ============================================================================

#[test]
fn path_through_open_field_ends_at_destination() {
    let mut scene = Scene::default();
    let walker = scene.create_body(Vec2::new(100.0, 100.0), &boxed(BodyType::Kinematic, 10.0, 10.0));
    let destination = Vec2::new(263.0, 171.0);

    for diagonal in [false, true] {
        let path = scene.find_path(walker, destination, diagonal, false).unwrap().unwrap();
        assert!(!path.is_empty());
        assert!((path[0] - Vec2::new(100.0, 100.0)).length() <= 10.0 * 2f32.sqrt());
        assert_eq!(*path.last().unwrap(), destination);
    }
}

#[test]
fn blocked_destination_has_no_path() {
    let mut scene = Scene::default();
    let walker = scene.create_body(Vec2::new(100.0, 100.0), &boxed(BodyType::Kinematic, 10.0, 10.0));
    scene.create_body(Vec2::new(300.0, 300.0), &boxed(BodyType::Static, 100.0, 100.0));

    assert_eq!(scene.find_path(walker, Vec2::new(300.0, 300.0), true, false).unwrap(), None);
    assert!(scene.find_path(walker, Vec2::new(200.0, 200.0), true, false).unwrap().is_some());
}

#[test]
fn sensors_block_only_when_avoided() {
    let mut scene = Scene::default();
    let walker = scene.create_body(Vec2::new(100.0, 100.0), &boxed(BodyType::Kinematic, 10.0, 10.0));
    let zone = BodyPrototype::new(BodyType::Static).with_shape(
        "zone",
        ShapePrototype::rect(Rect::new(-50.0, -50.0, 100.0, 100.0)).with_sensor(true),
    );
    scene.create_body(Vec2::new(300.0, 100.0), &zone);

    let target = Vec2::new(300.0, 100.0);
    assert!(scene.find_path(walker, target, false, false).unwrap().is_some());
    assert_eq!(scene.find_path(walker, target, false, true).unwrap(), None);
}

#[test]
fn path_for_unknown_body_is_an_error() {
    let scene = Scene::default();
    let err = scene.find_path(BodyId(42), Vec2::ZERO, true, false).unwrap_err();
    assert!(matches!(err, SceneError::UnknownBody(BodyId(42))));
}

// ============================================================================
// Map loading and rendering
// ============================================================================

fn write_map(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn ten_by_ten_map() -> String {
    let data = vec!["1"; 100].join(",");
    format!(
        r#"{{
            "width": 10, "height": 10, "tile_width": 32, "tile_height": 32,
            "background_color": {{ "r": 5, "g": 6, "b": 7, "a": 255 }},
            "tilesets": [
                {{ "first_gid": 1, "image": "grass.png", "columns": 1, "tile_count": 1,
                   "tile_width": 32, "tile_height": 32 }}
            ],
            "layers": [
                {{ "id": 1, "type": "tile", "name": "ground", "width": 10, "height": 10,
                   "data": [{data}] }},
                {{ "id": 2, "type": "object", "name": "markers", "objects": [
                    {{ "id": 7, "name": "spawn", "class": "marker", "x": 48, "y": 80, "shape": "point" }}
                ] }}
            ]
        }}"#
    )
}

#[test]
fn renders_each_visible_tile_once() {
    let file = write_map(&ten_by_ten_map());
    let mut loader = JsonTileMapLoader::new();
    loader.textures_mut().register("grass.png", TextureId(3));

    let mut scene = Scene::default();
    scene.load_tile_map(file.path(), &mut loader).unwrap();
    assert_eq!(scene.tile_map_object_by_name("spawn").unwrap().id, 7);
    assert_eq!(scene.tile_map_object_by_id(7).unwrap().position(), Vec2::new(48.0, 80.0));

    let mut canvas = DrawList::new();
    scene.render(&mut canvas, &frame(Rect::new(0.0, 0.0, 320.0, 320.0)));
    assert_eq!(scene.world_offset(), Vec2::ZERO);
    assert_eq!(canvas.commands[0], zap_scene::DrawCommand::Clear(Color::rgba(5, 6, 7, 255)));

    let mut visited = HashSet::new();
    for draw in canvas.textures() {
        assert_eq!(draw.texture, TextureId(3));
        let col = (draw.dest.x / 32.0).round() as i32;
        let row = (draw.dest.y / 32.0).round() as i32;
        assert!((0..10).contains(&col) && (0..10).contains(&row), "out of range: {:?}", draw.dest);
        assert!(visited.insert((col, row)), "tile ({}, {}) drawn twice", col, row);
    }
    assert_eq!(visited.len(), 100);
}

#[test]
fn reloading_map_tears_down_bodies() {
    let file = write_map(&ten_by_ten_map());
    let mut loader = JsonTileMapLoader::new();
    let mut scene = Scene::default();
    scene.load_tile_map(file.path(), &mut loader).unwrap();
    let old = scene.create_body(Vec2::new(10.0, 10.0), &boxed(BodyType::Static, 8.0, 8.0));

    scene.load_tile_map(file.path(), &mut loader).unwrap();
    assert_eq!(scene.body_count(), 0);
    assert!(!scene.contains_body(old));

    // Ids are never reused after a reload.
    let new = scene.create_body(Vec2::new(10.0, 10.0), &boxed(BodyType::Static, 8.0, 8.0));
    assert!(new > old);
}

#[test]
fn missing_map_file_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = Scene::default();
    let err = scene
        .load_tile_map(&dir.path().join("nowhere.json"), &mut JsonTileMapLoader::new())
        .unwrap_err();
    assert!(matches!(err, SceneError::MapLoad(MapLoadError::Io { .. })));
    assert!(scene.tile_map().is_none());
}
