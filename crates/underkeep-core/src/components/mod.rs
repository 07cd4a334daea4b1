//! All component types for the simulation

mod common;
mod creature;
mod tasks;

pub use common::*;
pub use creature::*;
pub use tasks::*;
