//! Tile grid: terrain kinds, traversal costs, and dig marks.
//!
//! The grid is the read-only collaborator of the path planner. Costs
//! are integer weights (tenths of a tile) so they order totally in a
//! binary heap. Out-of-range queries read as impassable rather than
//! panicking.

use serde::{Deserialize, Serialize};

use crate::constants::TilePos;

/// What occupies a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Excavated floor.
    Open,
    /// Shallow water; walkable but slow.
    Water,
    /// Lava; walkable at a steep cost (flying creatures pass freely).
    Lava,
    /// Unexcavated earth; diggable, so tunnel paths may cross it.
    Wall,
    /// Impenetrable rock (map border). Never traversable.
    Rock,
}

/// Base walk cost of open terrain, in grid cost units.
pub const COST_OPEN: u32 = 10;
/// Walk cost of water.
pub const COST_WATER: u32 = 25;
/// Walk cost of lava.
pub const COST_LAVA: u32 = 60;
/// Tunnel-model cost of an unexcavated wall (dig time dominates).
pub const COST_WALL_TUNNEL: u32 = 100;

/// 2D grid of tiles with a revision counter for path invalidation.
///
/// Every mutation bumps `revision`, so a planner can tell whether a
/// path computed earlier might have been invalidated without diffing
/// tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<TileKind>,
    marked: Vec<bool>,
    revision: u64,
}

impl TileGrid {
    /// Create a grid filled with a single terrain kind.
    pub fn new(width: i32, height: i32, fill: TileKind) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        let len = (width * height) as usize;
        Self {
            width,
            height,
            tiles: vec![fill; len],
            marked: vec![false; len],
            revision: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Monotonic counter bumped on every tile mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    /// Tile kind at `pos`; `None` when out of range.
    pub fn get(&self, pos: TilePos) -> Option<TileKind> {
        self.index(pos).map(|i| self.tiles[i])
    }

    /// Set a tile, bumping the revision. Out-of-range sets are ignored.
    pub fn set(&mut self, pos: TilePos, kind: TileKind) {
        if let Some(i) = self.index(pos) {
            if self.tiles[i] != kind {
                self.tiles[i] = kind;
                self.revision += 1;
            }
        }
    }

    /// Walk-model traversal cost. `None` = impassable.
    ///
    /// `ignore_walls` lets wall-passing creatures treat unexcavated
    /// earth as open floor; rock stays impassable either way.
    pub fn walk_cost(&self, pos: TilePos, ignore_walls: bool) -> Option<u32> {
        match self.get(pos)? {
            TileKind::Open => Some(COST_OPEN),
            TileKind::Water => Some(COST_WATER),
            TileKind::Lava => Some(COST_LAVA),
            TileKind::Wall => {
                if ignore_walls {
                    Some(COST_OPEN)
                } else {
                    None
                }
            }
            TileKind::Rock => None,
        }
    }

    /// Tunnel-model traversal cost: walls are crossable but expensive.
    pub fn tunnel_cost(&self, pos: TilePos, ignore_walls: bool) -> Option<u32> {
        match self.get(pos)? {
            TileKind::Open => Some(COST_OPEN),
            TileKind::Water => Some(COST_WATER),
            TileKind::Lava => Some(COST_LAVA),
            TileKind::Wall if ignore_walls => Some(COST_OPEN),
            TileKind::Wall => Some(COST_WALL_TUNNEL),
            TileKind::Rock => None,
        }
    }

    /// Mark a wall tile for digging. Returns whether the mark took;
    /// non-wall and out-of-range tiles are refused.
    pub fn mark_for_dig(&mut self, pos: TilePos) -> bool {
        if let Some(i) = self.index(pos) {
            if self.tiles[i] == TileKind::Wall {
                self.marked[i] = true;
                return true;
            }
        }
        false
    }

    pub fn unmark(&mut self, pos: TilePos) {
        if let Some(i) = self.index(pos) {
            self.marked[i] = false;
        }
    }

    pub fn is_marked(&self, pos: TilePos) -> bool {
        self.index(pos).map(|i| self.marked[i]).unwrap_or(false)
    }

    /// All tiles currently marked for digging.
    pub fn marked_tiles(&self) -> Vec<TilePos> {
        let mut out = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = TilePos::new(x, y);
                if self.is_marked(pos) {
                    out.push(pos);
                }
            }
        }
        out
    }

    /// Excavate a tile: wall becomes open floor and loses its mark.
    pub fn dig(&mut self, pos: TilePos) {
        if self.get(pos) == Some(TileKind::Wall) {
            self.set(pos, TileKind::Open);
            self.unmark(pos);
        }
    }
}
