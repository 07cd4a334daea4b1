//! A* pathfinding over the tile grid.
//!
//! Two cost models share one search: `Walk` refuses unexcavated walls,
//! `Tunnel` crosses them at a steep weight so diggers can plan routes
//! through earth. Unreachable goals return `None`; the caller treats
//! that as a recoverable planning failure, never a fatal error.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::constants::TilePos;
use crate::grid::TileGrid;

/// Which traversal weights the search uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModel {
    /// Normal floor traversal; walls block.
    Walk,
    /// Digger traversal; walls are expensive but crossable.
    Tunnel,
}

fn tile_cost(grid: &TileGrid, pos: TilePos, model: CostModel, ignore_walls: bool) -> Option<u32> {
    match model {
        CostModel::Walk => grid.walk_cost(pos, ignore_walls),
        CostModel::Tunnel => grid.tunnel_cost(pos, ignore_walls),
    }
}

/// Find a cost-optimal path from `from` to `to`.
///
/// The returned waypoints exclude `from` and include `to`; a path from
/// a tile to itself is `Some(vec![])`. `None` means no route exists.
/// The start tile's own cost is not charged, so a digger standing on a
/// wall can still plan its way out.
pub fn find_path(
    grid: &TileGrid,
    from: TilePos,
    to: TilePos,
    model: CostModel,
    ignore_walls: bool,
) -> Option<Vec<TilePos>> {
    if from == to {
        return Some(vec![]);
    }
    if !grid.in_bounds(from) || tile_cost(grid, to, model, ignore_walls).is_none() {
        return None;
    }

    let mut frontier: BinaryHeap<Reverse<(u32, (i32, i32))>> = BinaryHeap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut cost_so_far: HashMap<TilePos, u32> = HashMap::new();

    frontier.push(Reverse((0, (from.x, from.y))));
    cost_so_far.insert(from, 0);

    while let Some(Reverse((_, (cx, cy)))) = frontier.pop() {
        let current = TilePos::new(cx, cy);
        if current == to {
            // Reconstruct, dropping the start tile.
            let mut path = vec![current];
            let mut node = current;
            while let Some(&prev) = came_from.get(&node) {
                if prev == from {
                    break;
                }
                path.push(prev);
                node = prev;
            }
            path.reverse();
            return Some(path);
        }

        let neighbors = [
            TilePos::new(current.x + 1, current.y),
            TilePos::new(current.x - 1, current.y),
            TilePos::new(current.x, current.y + 1),
            TilePos::new(current.x, current.y - 1),
        ];
        for next in neighbors {
            let Some(step_cost) = tile_cost(grid, next, model, ignore_walls) else {
                continue;
            };
            let new_cost = cost_so_far[&current].saturating_add(step_cost);
            if cost_so_far.get(&next).map_or(true, |&c| new_cost < c) {
                cost_so_far.insert(next, new_cost);
                came_from.insert(next, current);
                let heuristic = next.manhattan(&to) as u32 * crate::grid::COST_OPEN;
                frontier.push(Reverse((new_cost + heuristic, (next.x, next.y))));
            }
        }
    }

    None
}
