//! Simulation systems, run in a fixed order each turn:
//! state machine, then pathing, then the animation/timer driver.

mod animation;
mod pathing;
mod state;

pub use animation::*;
pub use pathing::*;
pub use state::*;

use hecs::Entity;

use crate::components::AnimationState;

/// Events raised by one turn's systems and consumed by the state
/// machine at the start of the next. Double-buffered by the engine so
/// the tick boundary stays the only synchronization point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Path cursor reached path length; the path has been cleared.
    Arrived(Entity),
    /// A one-shot animation finished.
    AnimationDone(Entity, AnimationState),
    /// Health reached zero; the creature entered its terminal state.
    Died(Entity),
}
