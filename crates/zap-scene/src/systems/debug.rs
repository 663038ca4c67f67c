//! Debug rendering: collider outlines drawn over the scene.

use glam::Vec2;

use crate::api::types::{Color, Rect};
use crate::core::physics::{ColliderOutline, PhysicsWorld};
use crate::core::units::Units;
use crate::renderer::camera::FollowCamera;
use crate::renderer::canvas::Canvas;

/// Draw an outline for every collider in the world, in screen space.
pub fn draw_colliders(
    canvas: &mut dyn Canvas,
    physics: &PhysicsWorld,
    units: Units,
    camera: &FollowCamera,
    viewport: &Rect,
    color: Color,
) {
    for outline in physics.collider_outlines() {
        match outline {
            ColliderOutline::Circle { center, radius } => {
                let center = camera.to_screen(units.point_to_pixels(center), viewport);
                canvas.draw_circle(center, units.to_pixels(radius), color);
            }
            ColliderOutline::Polygon(points) => {
                let line = closed_outline(&points, |p| camera.to_screen(units.point_to_pixels(p), viewport));
                if !line.is_empty() {
                    canvas.draw_lines(&line, color);
                }
            }
        }
    }
}

/// Map the points and repeat the first one at the end.
fn closed_outline(points: &[Vec2], map: impl Fn(Vec2) -> Vec2) -> Vec<Vec2> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut line: Vec<Vec2> = points.iter().map(|p| map(*p)).collect();
    line.push(line[0]);
    line
}
