//! Pure simulation logic for Underkeep.
//!
//! This crate contains the leaf pieces of the creature simulation that
//! are independent of the ECS, the renderer, and any runtime. Functions
//! take plain data and return results, making them unit-testable and
//! portable.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`clock`] | Fixed 20 Hz turn conversions and a free-running timer |
//! | [`constants`] | Subtile granularity and speed calibration |
//! | [`grid`] | Tile grid of terrain kinds with walk/tunnel costs |
//! | [`pathfinding`] | A* pathfinding over the tile grid |

pub mod clock;
pub mod constants;
pub mod grid;
pub mod pathfinding;
