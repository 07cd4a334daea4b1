//! Subtile granularity and movement-speed calibration.
//!
//! World positions are measured in subtiles: every game tile is a 3x3
//! block of subtiles so creatures can move smoothly within a tile.

use serde::{Deserialize, Serialize};

/// Subtiles along each axis of a game tile.
pub const SUBTILES_PER_TILE: i32 = 3;

/// Divisor converting game-design base speed into subtiles per second.
///
/// Derived from a reference traversal: an imp at base speed 96 crosses
/// 20 tiles in ~6.5 seconds. That is tiles per second; world values are
/// in subtiles, so the measurement is scaled by 3.
pub const BASESPEED_DIVISOR: f32 = 10.645_161;

/// Convert a creature's base speed stat into subtile displacement per second.
pub fn base_speed_to_delta(base_speed: f32) -> f32 {
    base_speed / BASESPEED_DIVISOR
}

/// A tile coordinate on the navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile containing a subtile coordinate.
    pub fn from_subtile(subtile_x: f32, subtile_y: f32) -> Self {
        Self {
            x: (subtile_x / SUBTILES_PER_TILE as f32).floor() as i32,
            y: (subtile_y / SUBTILES_PER_TILE as f32).floor() as i32,
        }
    }

    /// Subtile coordinate of this tile's center.
    pub fn center_subtile(&self) -> (f32, f32) {
        (
            (self.x * SUBTILES_PER_TILE + SUBTILES_PER_TILE / 2) as f32,
            (self.y * SUBTILES_PER_TILE + SUBTILES_PER_TILE / 2) as f32,
        )
    }

    /// Manhattan distance in tiles.
    pub fn manhattan(&self, other: &TilePos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}
