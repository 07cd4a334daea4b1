//! Order/Activity directives and per-creature path state.
//!
//! The original engine used all-sentinel records (`{false, (-1,-1),
//! (-1,-1), -1, null}`) for "no order"; here the empty case is an
//! explicit `None` so sentinel coordinates cannot leak into logic.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use underkeep_logic::constants::TilePos;

/// A directed task: where it started, where it points, how long it
/// runs, and which entity (if any) it is about.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub origin: TilePos,
    pub target: TilePos,
    /// Remaining duration in seconds; negative means "until done".
    pub duration: f32,
    /// Non-owning handle; a stale target reads as "target lost".
    pub target_entity: Option<Entity>,
}

impl Directive {
    pub fn toward(origin: TilePos, target: TilePos) -> Self {
        Self {
            origin,
            target,
            duration: -1.0,
            target_entity: None,
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.target_entity = Some(entity);
        self
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }
}

/// An immediate, short-horizon navigation/action directive.
#[derive(Debug, Clone, Default)]
pub struct Order {
    pub directive: Option<Directive>,
}

impl Order {
    pub fn is_active(&self) -> bool {
        self.directive.is_some()
    }

    pub fn assign(&mut self, directive: Directive) {
        self.directive = Some(directive);
    }

    /// Idempotent; clearing an empty order is fine.
    pub fn clear(&mut self) {
        self.directive = None;
    }
}

/// Longer-horizon behavioral goals. An Activity may issue several
/// Orders over its lifetime; only one of the two drives motion at a
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    Explore,
    Eat,
    Sleep,
    Research,
    Train,
    Fight,
}

/// The creature's current Activity, if any.
#[derive(Debug, Clone, Default)]
pub struct Activity {
    pub current: Option<(ActivityKind, Directive)>,
}

impl Activity {
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn kind(&self) -> Option<ActivityKind> {
        self.current.as_ref().map(|(k, _)| *k)
    }

    pub fn assign(&mut self, kind: ActivityKind, directive: Directive) {
        self.current = Some((kind, directive));
    }

    /// Idempotent.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Waypoint path and cursor. Empty waypoints = no path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathState {
    /// Ordered tile waypoints, excluding the start tile.
    pub waypoints: Vec<TilePos>,
    /// Index of the waypoint being approached. Always <= len.
    pub cursor: usize,
    /// Goal tile the current path was computed for.
    pub goal: Option<TilePos>,
    /// Grid revision at plan time; a moved revision invalidates us.
    pub planned_revision: u64,
    /// Whether this path was planned with tunnel costs.
    pub tunnel: bool,
}

impl PathState {
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// The waypoint currently being approached.
    pub fn current_waypoint(&self) -> Option<TilePos> {
        self.waypoints.get(self.cursor).copied()
    }

    /// Drop the path and its goal. Idempotent.
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
        self.goal = None;
        self.tunnel = false;
    }
}
