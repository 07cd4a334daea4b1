//! Per-agent path planning and waypoint movement.
//!
//! Planning (`path_to` / `tunnel_path_to`) is idempotent when called
//! every tick with the same goal: a path is recomputed only when the
//! goal changes or the grid revision has moved since it was planned.
//! Planning failure is a `bool`, never a panic; the caller falls back
//! to another Activity and the task-search backoff throttles retries.

use hecs::World;

use underkeep_logic::constants::{base_speed_to_delta, TilePos};
use underkeep_logic::grid::{TileGrid, TileKind};
use underkeep_logic::pathfinding::{find_path, CostModel};

use crate::components::{Animation, AnimationState, Creature, PathState, Spatial, Timers, Vec3};
use crate::systems::SimEvent;

/// Seconds a stalled agent waits before retrying a failed plan.
pub const TASK_SEARCH_BACKOFF: f32 = 1.0;

/// Request or continue a path toward a goal tile on the walk model.
///
/// Returns `false` when no path exists or the creature is locked in a
/// special action mid-animation. Never mutates the agent's position.
pub fn path_to(
    grid: &TileGrid,
    spatial: &Spatial,
    path: &mut PathState,
    timers: &mut Timers,
    goal: TilePos,
    ignore_walls: bool,
) -> bool {
    plan(grid, spatial, path, timers, goal, CostModel::Walk, ignore_walls)
}

/// Variant for diggable terrain: walls cost heavily instead of blocking.
pub fn tunnel_path_to(
    grid: &TileGrid,
    spatial: &Spatial,
    path: &mut PathState,
    timers: &mut Timers,
    goal: TilePos,
    ignore_walls: bool,
) -> bool {
    plan(grid, spatial, path, timers, goal, CostModel::Tunnel, ignore_walls)
}

fn plan(
    grid: &TileGrid,
    spatial: &Spatial,
    path: &mut PathState,
    timers: &mut Timers,
    goal: TilePos,
    model: CostModel,
    ignore_walls: bool,
) -> bool {
    // Mid-animation lock: a special action (dig, claim) owns the agent.
    if timers.special_timer > 0.0 {
        return false;
    }

    let current_tile = spatial.tile();
    let fresh = path.goal == Some(goal) && path.planned_revision == grid.revision();
    if fresh && (!path.is_empty() || current_tile == goal) {
        return true;
    }

    // Replanning needed; respect the backoff after a recent failure.
    if timers.task_search_timer > 0.0 {
        return false;
    }

    match find_path(grid, current_tile, goal, model, ignore_walls) {
        Some(waypoints) => {
            path.waypoints = waypoints;
            path.cursor = 0;
            path.goal = Some(goal);
            path.planned_revision = grid.revision();
            path.tunnel = model == CostModel::Tunnel;
            true
        }
        None => {
            path.clear();
            timers.task_search_timer = TASK_SEARCH_BACKOFF;
            false
        }
    }
}

/// Advance every creature along its waypoints for one turn.
///
/// Raises `SimEvent::Arrived` when the cursor reaches path length, at
/// which point the path is cleared. Tunnel paths park in front of
/// undug walls so the state machine can dig them first.
pub fn pathing_system(
    world: &mut World,
    grid: &TileGrid,
    delta_seconds: f32,
    events: &mut Vec<SimEvent>,
) {
    for (entity, (creature, spatial, path, timers, anim)) in world
        .query_mut::<(&Creature, &mut Spatial, &mut PathState, &mut Timers, &mut Animation)>()
    {
        if path.is_empty() {
            continue;
        }

        timers.path_lerp_time += delta_seconds;
        let mut step = base_speed_to_delta(creature.base_speed) * delta_seconds;
        let mut moved = false;

        while step > 0.0 {
            let Some(waypoint) = path.current_waypoint() else {
                break;
            };
            // An unexcavated wall on a tunnel path blocks until dug.
            if path.tunnel && grid.get(waypoint) == Some(TileKind::Wall) {
                break;
            }

            let (cx, cy) = waypoint.center_subtile();
            let target = Vec3::new(cx, spatial.position.y, cy);
            let distance = spatial.position.distance(&target);

            if step >= distance {
                spatial.position = target;
                path.cursor += 1;
                step -= distance;
                moved = true;
            } else {
                let direction = (target - spatial.position).normalize();
                spatial.position = spatial.position + direction * step;
                spatial.facing = direction;
                moved = true;
                step = 0.0;
            }
        }

        if path.cursor >= path.waypoints.len() {
            path.clear();
            timers.path_lerp_time = 0.0;
            events.push(SimEvent::Arrived(entity));
            if anim.state == AnimationState::Walking {
                anim.set_fresh(AnimationState::Idle, timers);
            }
        } else if moved && anim.state == AnimationState::Idle {
            anim.set_fresh(AnimationState::Walking, timers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        Activity, CreatureState, CreatureType, Order, Owner, SpriteClass,
    };
    use underkeep_logic::clock::TURN_SECONDS;

    fn test_creature(base_speed: f32) -> Creature {
        Creature {
            kind: CreatureType::Imp,
            sprite_class: SpriteClass::Imp,
            owner: Owner::Red,
            state: CreatureState::Uncertain,
            health: 10.0,
            level: 1,
            hunger: 0,
            happiness: 100,
            gold_held: 0,
            just_slapped: false,
            base_speed,
        }
    }

    fn spawn_walker(world: &mut World, tile: TilePos, base_speed: f32) -> hecs::Entity {
        let (cx, cy) = tile.center_subtile();
        world.spawn((
            test_creature(base_speed),
            Spatial::at_subtile(cx, 0.0, cy),
            Order::default(),
            Activity::default(),
            PathState::default(),
            Timers::default(),
            Animation::default(),
        ))
    }

    #[test]
    fn test_plan_is_idempotent_for_same_goal() {
        let grid = TileGrid::new(8, 8, TileKind::Open);
        let spatial = Spatial::at_subtile(1.0, 0.0, 1.0);
        let mut path = PathState::default();
        let mut timers = Timers::default();
        let goal = TilePos::new(5, 0);

        assert!(path_to(&grid, &spatial, &mut path, &mut timers, goal, false));
        let planned = path.waypoints.clone();
        // Same goal, same revision: no recomputation, path untouched.
        assert!(path_to(&grid, &spatial, &mut path, &mut timers, goal, false));
        assert_eq!(path.waypoints, planned);
    }

    #[test]
    fn test_plan_recomputes_on_grid_change() {
        let mut grid = TileGrid::new(8, 8, TileKind::Open);
        let spatial = Spatial::at_subtile(1.0, 0.0, 1.0);
        let mut path = PathState::default();
        let mut timers = Timers::default();
        let goal = TilePos::new(5, 0);

        assert!(path_to(&grid, &spatial, &mut path, &mut timers, goal, false));
        let rev = path.planned_revision;
        grid.set(TilePos::new(2, 0), TileKind::Wall);
        assert!(path_to(&grid, &spatial, &mut path, &mut timers, goal, false));
        assert_ne!(path.planned_revision, rev);
        // New route avoids the wall.
        assert!(!path.waypoints.contains(&TilePos::new(2, 0)));
    }

    #[test]
    fn test_unreachable_goal_fails_and_arms_backoff() {
        let mut grid = TileGrid::new(8, 8, TileKind::Open);
        for (dx, dy) in [(1i32, 0i32), (-1, 0), (0, 1), (0, -1)] {
            grid.set(TilePos::new(5 + dx, 5 + dy), TileKind::Rock);
        }
        let spatial = Spatial::at_subtile(1.0, 0.0, 1.0);
        let mut path = PathState::default();
        let mut timers = Timers::default();

        assert!(!path_to(&grid, &spatial, &mut path, &mut timers, TilePos::new(5, 5), false));
        assert!(path.is_empty());
        assert!(timers.task_search_timer > 0.0);
        // Backoff suppresses the retry.
        assert!(!path_to(&grid, &spatial, &mut path, &mut timers, TilePos::new(5, 5), false));
    }

    #[test]
    fn test_special_action_locks_planning() {
        let grid = TileGrid::new(8, 8, TileKind::Open);
        let spatial = Spatial::at_subtile(1.0, 0.0, 1.0);
        let mut path = PathState::default();
        let mut timers = Timers {
            special_timer: 0.5,
            ..Default::default()
        };
        assert!(!path_to(&grid, &spatial, &mut path, &mut timers, TilePos::new(3, 0), false));
        assert!(path.is_empty());
    }

    #[test]
    fn test_movement_reaches_goal_in_expected_turns() {
        // Imp at tile (0,0), path to (5,0), base speed 96.
        let grid = TileGrid::new(8, 8, TileKind::Open);
        let mut world = World::new();
        let entity = spawn_walker(&mut world, TilePos::new(0, 0), 96.0);

        {
            let mut q = world
                .query_one::<(&Spatial, &mut PathState, &mut Timers)>(entity)
                .unwrap();
            let (spatial, path, timers) = q.get().unwrap();
            assert!(path_to(&grid, spatial, path, timers, TilePos::new(5, 0), false));
        }

        // 15 subtiles at ~0.451 subtiles/turn => 34 turns.
        let mut arrived_at = None;
        for turn in 1..=60 {
            let mut events = Vec::new();
            pathing_system(&mut world, &grid, TURN_SECONDS, &mut events);
            if events.contains(&SimEvent::Arrived(entity)) {
                arrived_at = Some(turn);
                break;
            }
        }
        let arrived_at = arrived_at.expect("never arrived");
        assert!(
            (arrived_at as i32 - 34).abs() <= 1,
            "arrived at turn {}",
            arrived_at
        );

        let spatial = world.get::<&Spatial>(entity).unwrap();
        assert_eq!(spatial.tile(), TilePos::new(5, 0));
        let path = world.get::<&PathState>(entity).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.cursor, 0);
    }

    #[test]
    fn test_tunnel_path_parks_at_wall() {
        let mut grid = TileGrid::new(8, 8, TileKind::Open);
        grid.set(TilePos::new(2, 0), TileKind::Wall);
        let mut world = World::new();
        let entity = spawn_walker(&mut world, TilePos::new(0, 0), 96.0);

        {
            let mut q = world
                .query_one::<(&Spatial, &mut PathState, &mut Timers)>(entity)
                .unwrap();
            let (spatial, path, timers) = q.get().unwrap();
            assert!(tunnel_path_to(&grid, spatial, path, timers, TilePos::new(4, 0), false));
        }

        for _ in 0..200 {
            let mut events = Vec::new();
            pathing_system(&mut world, &grid, TURN_SECONDS, &mut events);
        }
        // Parked on the tile before the wall, never inside it.
        let spatial = world.get::<&Spatial>(entity).unwrap();
        assert_eq!(spatial.tile(), TilePos::new(1, 0));
    }

    #[test]
    fn test_unreachable_never_moves_position() {
        let mut grid = TileGrid::new(8, 8, TileKind::Open);
        for y in 0..8 {
            grid.set(TilePos::new(3, y), TileKind::Rock);
        }
        let mut world = World::new();
        let entity = spawn_walker(&mut world, TilePos::new(0, 0), 96.0);
        let before = world.get::<&Spatial>(entity).unwrap().position;

        for _ in 0..50 {
            {
                let mut q = world
                    .query_one::<(&Spatial, &mut PathState, &mut Timers)>(entity)
                    .unwrap();
                let (spatial, path, timers) = q.get().unwrap();
                assert!(!path_to(&grid, spatial, path, timers, TilePos::new(6, 0), false));
            }
            let mut events = Vec::new();
            pathing_system(&mut world, &grid, TURN_SECONDS, &mut events);
        }
        let after = world.get::<&Spatial>(entity).unwrap().position;
        assert_eq!(before, after);
    }
}
