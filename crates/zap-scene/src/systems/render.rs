use std::collections::BTreeSet;

use glam::Vec2;

use crate::api::types::{BodyId, Color, Flip, Rect};
use crate::components::body::BodyMap;
use crate::components::tilemap::{ImageLayer, Layer, LayerKind, ObjectKind, ObjectLayer, TileLayer, TileMap};
use crate::renderer::camera::FollowCamera;
use crate::renderer::canvas::{Canvas, TextureDraw};

/// Depth-first walk over a map's layer tree that interleaves bodies with
/// layers: a body is drawn right after the layer whose name equals the
/// body's layer. Each body is drawn at most once per walk.
pub struct LayerWalker<'a> {
    map: &'a TileMap,
    camera: &'a FollowCamera,
    /// Screen rect the map is drawn into.
    viewport: Rect,
    /// Draw object layers as outlines.
    debug: bool,
}

impl<'a> LayerWalker<'a> {
    pub fn new(map: &'a TileMap, camera: &'a FollowCamera, viewport: Rect, debug: bool) -> Self {
        Self {
            map,
            camera,
            viewport,
            debug,
        }
    }

    /// Walk every layer. `remaining` holds the bodies not drawn yet; bodies
    /// matched to a layer are removed from it and handed to `draw_body`.
    pub fn walk<F>(&self, canvas: &mut dyn Canvas, bodies: &BodyMap, remaining: &mut BTreeSet<BodyId>, draw_body: &mut F)
    where
        F: FnMut(&mut dyn Canvas, BodyId),
    {
        self.walk_layers(&self.map.layers, canvas, bodies, remaining, draw_body);
    }

    /// Draw the remaining bodies that have no layer at all. Bodies naming a
    /// layer the map doesn't have stay undrawn.
    pub fn finish<F>(&self, canvas: &mut dyn Canvas, bodies: &BodyMap, remaining: &mut BTreeSet<BodyId>, draw_body: &mut F)
    where
        F: FnMut(&mut dyn Canvas, BodyId),
    {
        let unlayered: Vec<BodyId> = remaining
            .iter()
            .copied()
            .filter(|id| bodies.get(id).is_some_and(|body| body.layer().is_none()))
            .collect();
        for id in unlayered {
            remaining.remove(&id);
            draw_body(canvas, id);
        }
    }

    fn walk_layers<F>(
        &self,
        layers: &[Layer],
        canvas: &mut dyn Canvas,
        bodies: &BodyMap,
        remaining: &mut BTreeSet<BodyId>,
        draw_body: &mut F,
    ) where
        F: FnMut(&mut dyn Canvas, BodyId),
    {
        for layer in layers {
            if !layer.visible {
                continue;
            }
            match &layer.kind {
                LayerKind::Tile(tiles) => self.draw_tile_layer(tiles, canvas),
                LayerKind::Image(image) => self.draw_image_layer(image, canvas),
                LayerKind::Object(objects) => {
                    if self.debug {
                        self.draw_object_layer(objects, canvas);
                    }
                }
                LayerKind::Group(children) => self.walk_layers(children, canvas, bodies, remaining, draw_body),
            }

            let on_layer: Vec<BodyId> = remaining
                .iter()
                .copied()
                .filter(|id| bodies.get(id).and_then(|body| body.layer()) == Some(layer.name.as_str()))
                .collect();
            for id in on_layer {
                remaining.remove(&id);
                draw_body(canvas, id);
            }
        }
    }

    fn to_screen(&self, point: Vec2) -> Vec2 {
        self.camera.to_screen(point, &self.viewport)
    }

    fn draw_tile_layer(&self, layer: &TileLayer, canvas: &mut dyn Canvas) {
        let (tw, th) = (self.map.tile_width, self.map.tile_height);
        let origin = self.map.pixel_origin();
        let mut camera = self.camera.visible_rect(self.viewport.size());
        camera.x -= origin.x;
        camera.y -= origin.y;

        let (cols, rows) = layer.visible_range(camera, tw, th);
        for row in rows {
            for col in cols.clone() {
                let Some(tile) = layer.get(col as i64, row as i64) else {
                    continue;
                };
                let pos = self.to_screen(origin + Vec2::new((col * tw) as f32, (row * th) as f32));
                canvas.draw_texture(&TextureDraw {
                    texture: tile.texture,
                    src: Some(tile.src),
                    dest: Rect::new(pos.x, pos.y, tw as f32, th as f32),
                    angle: 0.0,
                    flip: Flip::NONE,
                });
            }
        }
    }

    fn draw_image_layer(&self, layer: &ImageLayer, canvas: &mut dyn Canvas) {
        let pos = self.to_screen(self.map.pixel_origin());
        canvas.draw_texture(&TextureDraw {
            texture: layer.texture,
            src: None,
            dest: Rect::new(pos.x, pos.y, layer.size.x, layer.size.y),
            angle: 0.0,
            flip: Flip::NONE,
        });
    }

    fn draw_object_layer(&self, layer: &ObjectLayer, canvas: &mut dyn Canvas) {
        for object in layer.objects.iter().filter(|object| object.visible) {
            let base = self.to_screen(object.position());
            match &object.kind {
                ObjectKind::Polygon(points) | ObjectKind::Polyline(points) => {
                    if points.len() < 2 {
                        continue;
                    }
                    let mut line: Vec<Vec2> = points.iter().map(|p| base + *p).collect();
                    if matches!(object.kind, ObjectKind::Polygon(_)) {
                        line.push(line[0]);
                    }
                    canvas.draw_lines(&line, Color::DEBUG_OBJECT);
                }
                ObjectKind::Circle { radius } => canvas.draw_circle(base, *radius, Color::DEBUG_OBJECT),
                ObjectKind::Point => {}
            }
        }
    }
}
