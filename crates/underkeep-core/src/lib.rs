//! Underkeep Core - Dungeon Creature Simulation Engine
//!
//! An ECS-based simulation of a dungeon's creature population: workers
//! that dig and claim, dungeon creatures that eat, sleep, research and
//! fight, and invading heroes, all stepped at a fixed 20 turns per
//! second independent of rendering frame rate.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System via `hecs`:
//! - **Entities**: creatures, lairs, food
//! - **Components**: pure data (Creature, Spatial, Order, PathState, ...)
//! - **Systems**: free functions run in a fixed order each turn
//!
//! # Example
//!
//! ```rust,no_run
//! use underkeep_core::prelude::*;
//! use underkeep_logic::grid::{TileGrid, TileKind};
//!
//! let grid = TileGrid::new(16, 16, TileKind::Open);
//! let mut sim = Simulation::new(grid);
//! let mut renderer = RecordingRenderer::new();
//!
//! let imp = sim
//!     .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
//!     .unwrap();
//!
//! loop {
//!     sim.update(1.0 / 60.0); // variable frame delta, fixed 20 Hz turns
//!     sim.draw(&mut renderer);
//! }
//! ```

pub mod components;
pub mod data;
pub mod engine;
pub mod render;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{Simulation, SpawnError};
    pub use crate::render::{CreatureInstanceData, RecordingRenderer, Renderer};
}
