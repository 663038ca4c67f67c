//! Grid A* over physics-world occupancy.
//!
//! The grid is anchored at the start point: cell (0, 0) is centered on the
//! start, neighbouring cells are `cell_size` pixels apart. Walkability is
//! queried lazily per cell, so only cells the search touches are tested.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::Vec2;
use rapier2d::parry::bounding_volume::{Aabb, BoundingVolume};
use rapier2d::parry::query::intersection_test;
use rapier2d::parry::shape::Cuboid;
use rapier2d::prelude::{nalgebra, point, vector, Isometry, RigidBodyHandle};

use crate::core::physics::PhysicsWorld;
use crate::core::units::Units;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;
/// Query boxes are slightly smaller than a cell so flush neighbours don't touch.
const CELL_SHRINK: f32 = 0.98;

/// Answers whether a body-sized box centered on a point (pixels) is free.
pub trait Walkability {
    fn is_walkable(&self, point: Vec2) -> bool;
}

impl<F: Fn(Vec2) -> bool> Walkability for F {
    fn is_walkable(&self, point: Vec2) -> bool {
        self(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOptions {
    pub allow_diagonal_steps: bool,
    /// Distance between neighbouring cell centers, in pixels.
    pub cell_size: f32,
    /// Extra cells searched around the start/goal bounding box.
    pub margin: u32,
    /// Largest search window, in cells.
    pub max_cells: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridCoord {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    f_cost: u32,
    h_cost: u32,
    y: i32,
    x: i32,
    insertion_order: u64,
}

struct SearchGrid<'a, W: Walkability + ?Sized> {
    occupancy: &'a W,
    start: Vec2,
    cell_size: f32,
    min: GridCoord,
    width: u32,
    height: u32,
    walkable: Vec<Option<bool>>,
}

impl<W: Walkability + ?Sized> SearchGrid<'_, W> {
    fn index_of(&self, coord: GridCoord) -> Option<usize> {
        let x = coord.x - self.min.x;
        let y = coord.y - self.min.y;
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn coord_of(&self, index: usize) -> GridCoord {
        GridCoord {
            x: self.min.x + (index % self.width as usize) as i32,
            y: self.min.y + (index / self.width as usize) as i32,
        }
    }

    fn center(&self, coord: GridCoord) -> Vec2 {
        self.start + Vec2::new(coord.x as f32, coord.y as f32) * self.cell_size
    }

    /// The start cell is always walkable: the body is already there.
    fn is_walkable(&mut self, coord: GridCoord) -> bool {
        let Some(index) = self.index_of(coord) else {
            return false;
        };
        if coord.x == 0 && coord.y == 0 {
            return true;
        }
        if let Some(known) = self.walkable[index] {
            return known;
        }
        let free = self.occupancy.is_walkable(self.center(coord));
        self.walkable[index] = Some(free);
        free
    }
}

fn heuristic(a: GridCoord, b: GridCoord, diagonal: bool) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    if diagonal {
        STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
    } else {
        STRAIGHT_COST * (dx + dy)
    }
}

/// Find a path from `start` to `goal` (pixels).
///
/// Returns the centers of the visited cells, starting at `start` and ending
/// exactly at `goal`. Returns `None` when the goal cell is blocked, no route
/// exists, or the search window would exceed `max_cells`.
pub fn find_grid_path<W: Walkability + ?Sized>(
    occupancy: &W,
    start: Vec2,
    goal: Vec2,
    options: &PathOptions,
) -> Option<Vec<Vec2>> {
    if !(options.cell_size > 0.0 && options.cell_size.is_finite()) {
        return None;
    }
    let rel = (goal - start) / options.cell_size;
    if !rel.is_finite() {
        return None;
    }
    let goal_cell = GridCoord {
        x: rel.x.round() as i32,
        y: rel.y.round() as i32,
    };
    let start_cell = GridCoord { x: 0, y: 0 };
    if goal_cell == start_cell {
        return Some(vec![goal]);
    }

    let margin = options.margin.min(i32::MAX as u32 / 4) as i32;
    let min = GridCoord {
        x: goal_cell.x.min(0).saturating_sub(margin),
        y: goal_cell.y.min(0).saturating_sub(margin),
    };
    let width = (goal_cell.x.max(0).saturating_add(margin) as i64 - min.x as i64 + 1) as u64;
    let height = (goal_cell.y.max(0).saturating_add(margin) as i64 - min.y as i64 + 1) as u64;
    let cell_count = width.saturating_mul(height);
    if cell_count > options.max_cells as u64 {
        log::debug!(
            "Path search window of {}x{} cells exceeds limit {}",
            width,
            height,
            options.max_cells
        );
        return None;
    }
    let cell_count = cell_count as usize;

    let mut grid = SearchGrid {
        occupancy,
        start,
        cell_size: options.cell_size,
        min,
        width: width as u32,
        height: height as u32,
        walkable: vec![None; cell_count],
    };
    if !grid.is_walkable(goal_cell) {
        return None;
    }

    let diagonal = options.allow_diagonal_steps;
    let start_index = grid.index_of(start_cell)?;
    let goal_index = grid.index_of(goal_cell)?;

    let mut closed = vec![false; cell_count];
    let mut best_g = vec![u32::MAX; cell_count];
    let mut parent = vec![None::<usize>; cell_count];
    let mut open = BinaryHeap::new();
    let mut next_insertion = 0u64;

    let start_h = heuristic(start_cell, goal_cell, diagonal);
    open.push(Reverse(OpenNode {
        f_cost: start_h,
        h_cost: start_h,
        y: start_cell.y,
        x: start_cell.x,
        insertion_order: next_insertion,
    }));
    best_g[start_index] = 0;

    while let Some(Reverse(current)) = open.pop() {
        let coord = GridCoord { x: current.x, y: current.y };
        let Some(current_index) = grid.index_of(coord) else {
            continue;
        };
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if current_index == goal_index {
            let mut points: Vec<Vec2> = reconstruct_path(&parent, start_index, goal_index)?
                .into_iter()
                .map(|index| grid.center(grid.coord_of(index)))
                .collect();
            if let Some(last) = points.last_mut() {
                *last = goal;
            }
            return Some(points);
        }

        let current_g = best_g[current_index];
        for (dx, dy, cost) in steps(diagonal) {
            let next = GridCoord {
                x: coord.x + dx,
                y: coord.y + dy,
            };
            let Some(next_index) = grid.index_of(next) else {
                continue;
            };
            if closed[next_index] || !grid.is_walkable(next) {
                continue;
            }
            // No corner cutting: both orthogonal neighbours must be free.
            if dx != 0
                && dy != 0
                && (!grid.is_walkable(GridCoord { x: coord.x + dx, y: coord.y })
                    || !grid.is_walkable(GridCoord { x: coord.x, y: coord.y + dy }))
            {
                continue;
            }

            let tentative_g = current_g.saturating_add(cost);
            if tentative_g >= best_g[next_index] {
                continue;
            }
            best_g[next_index] = tentative_g;
            parent[next_index] = Some(current_index);
            let h_cost = heuristic(next, goal_cell, diagonal);
            next_insertion += 1;
            open.push(Reverse(OpenNode {
                f_cost: tentative_g.saturating_add(h_cost),
                h_cost,
                y: next.y,
                x: next.x,
                insertion_order: next_insertion,
            }));
        }
    }

    None
}

fn steps(diagonal: bool) -> impl Iterator<Item = (i32, i32, u32)> {
    const ORTHOGONAL: [(i32, i32, u32); 4] = [
        (0, -1, STRAIGHT_COST),
        (1, 0, STRAIGHT_COST),
        (0, 1, STRAIGHT_COST),
        (-1, 0, STRAIGHT_COST),
    ];
    const DIAGONAL: [(i32, i32, u32); 4] = [
        (1, -1, DIAGONAL_COST),
        (1, 1, DIAGONAL_COST),
        (-1, 1, DIAGONAL_COST),
        (-1, -1, DIAGONAL_COST),
    ];
    let diagonals: &'static [(i32, i32, u32)] = if diagonal { &DIAGONAL } else { &[] };
    ORTHOGONAL.into_iter().chain(diagonals.iter().copied())
}

fn reconstruct_path(parent: &[Option<usize>], start_index: usize, goal_index: usize) -> Option<Vec<usize>> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];
    while cursor != start_index {
        cursor = parent.get(cursor).and_then(|value| *value)?;
        indices.push(cursor);
    }
    indices.reverse();
    Some(indices)
}

// ---------------------------------------------------------------------------
// Physics occupancy
// ---------------------------------------------------------------------------

/// Tests a box the size of a body against every other collider.
pub struct PhysicsOccupancy<'a> {
    world: &'a PhysicsWorld,
    units: Units,
    body: RigidBodyHandle,
    /// Query box half extents in meters.
    half_extents: Vec2,
    avoid_sensors: bool,
}

impl<'a> PhysicsOccupancy<'a> {
    /// Build an occupancy query for `body` and return it with the grid cell size in
    /// pixels. Bodies without shapes use `default_cell_size`.
    pub fn for_body(
        world: &'a PhysicsWorld,
        units: Units,
        body: RigidBodyHandle,
        avoid_sensors: bool,
        default_cell_size: f32,
    ) -> (Self, f32) {
        let extent = world
            .body_bounds(body)
            .map(|(min, max)| max - min)
            .filter(|extent| extent.max_element() > 0.0);
        let (half_extents, cell_size) = match extent {
            Some(extent) => (extent / 2.0, units.to_pixels(extent.max_element())),
            None => (Vec2::splat(units.to_physics(default_cell_size) / 2.0), default_cell_size),
        };
        let occupancy = Self {
            world,
            units,
            body,
            half_extents: (half_extents * CELL_SHRINK).max(Vec2::splat(f32::EPSILON)),
            avoid_sensors,
        };
        (occupancy, cell_size)
    }
}

impl Walkability for PhysicsOccupancy<'_> {
    fn is_walkable(&self, point: Vec2) -> bool {
        let center = self.units.point_to_physics(point);
        let shape = Cuboid::new(vector![self.half_extents.x, self.half_extents.y]);
        let iso = Isometry::translation(center.x, center.y);
        let bounds = Aabb::new(
            point![center.x - self.half_extents.x, center.y - self.half_extents.y],
            point![center.x + self.half_extents.x, center.y + self.half_extents.y],
        );

        for (_, collider) in self.world.colliders.iter() {
            if collider.parent() == Some(self.body) {
                continue;
            }
            if collider.is_sensor() && !self.avoid_sensors {
                continue;
            }
            if !collider.compute_aabb().intersects(&bounds) {
                continue;
            }
            if intersection_test(&iso, &shape, collider.position(), collider.shape()).unwrap_or(true) {
                return false;
            }
        }
        true
    }
}
