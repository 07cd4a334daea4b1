//! Underkeep Headless Simulation Harness
//!
//! Validates creature simulation logic end to end without a renderer.
//! Runs entirely in-process — no GPU, no windowing, no asset loading.
//!
//! Usage:
//!   cargo run -p underkeep-simtest
//!   cargo run -p underkeep-simtest -- --verbose
//!   cargo run -p underkeep-simtest -- --json

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use underkeep_core::components::{
    Activity, ActivityKind, Animation, Creature, CreatureState, CreatureType, HeroObjective, Order,
    Owner, PathState, Spatial, Timers,
};
use underkeep_core::engine::{Simulation, SpawnError, MAX_TURNS_PER_UPDATE};
use underkeep_core::render::{CreatureInstanceData, RecordingRenderer, RenderHandle};
use underkeep_core::systems::path_to;
use underkeep_logic::clock::{seconds_to_turns, turns_to_seconds, TURN_SECONDS};
use underkeep_logic::constants::{base_speed_to_delta, TilePos};
use underkeep_logic::grid::{TileGrid, TileKind};
use underkeep_logic::pathfinding::{find_path, CostModel};

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let json = std::env::args().any(|a| a == "--json");
    if !json {
        println!("=== Underkeep Simulation Harness ===\n");
    }

    let mut results = Vec::new();

    // 1. Grid & terrain costs
    results.extend(validate_grid(json));

    // 2. Path planner sweep
    results.extend(validate_pathfinding(json));

    // 3. Movement speed calibration
    results.extend(validate_movement(json));

    // 4. Fixed-timestep clock
    results.extend(validate_clock(json));

    // 5. Worker dig pipeline
    results.extend(validate_worker(json));

    // 6. Creature life loop (lair, hunger, food)
    results.extend(validate_life(json));

    // 7. Combat & death pipeline
    results.extend(validate_combat(json));

    // 8. Player command surface
    results.extend(validate_commands(json));

    // 9. Renderer seam
    results.extend(validate_render(json));

    // ── Summary ──
    if json {
        println!("{}", serde_json::to_string_pretty(&results).unwrap());
        if results.iter().any(|r| !r.passed) {
            std::process::exit(1);
        }
        return;
    }

    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn section(quiet: bool, title: &str) {
    if !quiet {
        println!("--- {} ---", title);
    }
}

/// Dungeon-like map: rock border, wall fill, open heart chamber with an
/// east corridor. Shared by several scenarios.
fn dungeon_map() -> TileGrid {
    let mut grid = TileGrid::new(20, 20, TileKind::Wall);
    for i in 0..20 {
        grid.set(TilePos::new(i, 0), TileKind::Rock);
        grid.set(TilePos::new(i, 19), TileKind::Rock);
        grid.set(TilePos::new(0, i), TileKind::Rock);
        grid.set(TilePos::new(19, i), TileKind::Rock);
    }
    for y in 8..12 {
        for x in 8..12 {
            grid.set(TilePos::new(x, y), TileKind::Open);
        }
    }
    for x in 12..18 {
        grid.set(TilePos::new(x, 9), TileKind::Open);
    }
    grid
}

// ── 1. Grid & Terrain ───────────────────────────────────────────────────

fn validate_grid(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Grid & Terrain");
    let mut results = Vec::new();

    let mut grid = TileGrid::new(8, 8, TileKind::Open);
    let rev0 = grid.revision();
    grid.set(TilePos::new(2, 2), TileKind::Wall);
    let rev1 = grid.revision();
    grid.set(TilePos::new(2, 2), TileKind::Wall); // no change
    let rev2 = grid.revision();
    results.push(TestResult {
        name: "grid_revision_bumps_on_change_only".into(),
        passed: rev1 > rev0 && rev2 == rev1,
        detail: format!("rev {} → {} → {}", rev0, rev1, rev2),
    });

    let marked_wall = grid.mark_for_dig(TilePos::new(2, 2));
    let marked_open = grid.mark_for_dig(TilePos::new(4, 4));
    results.push(TestResult {
        name: "grid_dig_marks_walls_only".into(),
        passed: marked_wall && !marked_open && grid.marked_tiles() == vec![TilePos::new(2, 2)],
        detail: format!("wall={} open={}", marked_wall, marked_open),
    });

    let rev_before_dig = grid.revision();
    grid.dig(TilePos::new(2, 2));
    results.push(TestResult {
        name: "grid_dig_opens_unmarks_bumps".into(),
        passed: grid.get(TilePos::new(2, 2)) == Some(TileKind::Open)
            && !grid.is_marked(TilePos::new(2, 2))
            && grid.revision() > rev_before_dig,
        detail: "dug wall is open, unmarked, revision moved".into(),
    });

    let out_of_range = grid.walk_cost(TilePos::new(-1, 3), false).is_none()
        && grid.walk_cost(TilePos::new(8, 3), true).is_none();
    results.push(TestResult {
        name: "grid_out_of_range_impassable".into(),
        passed: out_of_range,
        detail: "coordinates outside the grid cost None".into(),
    });

    results
}

// ── 2. Path Planner ─────────────────────────────────────────────────────

fn validate_pathfinding(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Path Planner");
    let mut results = Vec::new();
    let grid = dungeon_map();

    let same = find_path(&grid, TilePos::new(9, 9), TilePos::new(9, 9), CostModel::Walk, false);
    results.push(TestResult {
        name: "path_same_tile_empty".into(),
        passed: same == Some(vec![]),
        detail: "same tile → empty waypoint list".into(),
    });

    let corridor = find_path(&grid, TilePos::new(8, 8), TilePos::new(17, 9), CostModel::Walk, false);
    results.push(TestResult {
        name: "path_corridor_route".into(),
        passed: corridor
            .as_ref()
            .map_or(false, |p| p.last() == Some(&TilePos::new(17, 9))),
        detail: format!(
            "{} waypoints through chamber and corridor",
            corridor.map_or(0, |p| p.len())
        ),
    });

    let walled = find_path(&grid, TilePos::new(9, 9), TilePos::new(9, 2), CostModel::Walk, false);
    let tunneled = find_path(&grid, TilePos::new(9, 9), TilePos::new(9, 2), CostModel::Tunnel, false);
    results.push(TestResult {
        name: "path_tunnel_reaches_through_earth".into(),
        passed: walled.is_none() && tunneled.as_ref().map_or(false, |p| p.len() == 7),
        detail: format!(
            "walk=None tunnel={} waypoints",
            tunneled.map_or(0, |p| p.len())
        ),
    });

    let flyer = find_path(&grid, TilePos::new(9, 9), TilePos::new(9, 2), CostModel::Walk, true);
    results.push(TestResult {
        name: "path_flyer_ignores_walls".into(),
        passed: flyer.map_or(false, |p| p.len() == 7),
        detail: "wall-ignoring walk crosses solid earth".into(),
    });

    let border = find_path(&grid, TilePos::new(9, 9), TilePos::new(0, 0), CostModel::Tunnel, true);
    results.push(TestResult {
        name: "path_rock_impassable".into(),
        passed: border.is_none(),
        detail: "rock border unreachable even tunneling wall-blind".into(),
    });

    // Water costs more than open: a pond wide enough that wading
    // through costs more than the two-step detour gets skirted.
    let mut pond = TileGrid::new(9, 3, TileKind::Open);
    for x in 3..6 {
        pond.set(TilePos::new(x, 1), TileKind::Water);
    }
    let around = find_path(&pond, TilePos::new(0, 1), TilePos::new(8, 1), CostModel::Walk, false)
        .expect("route exists");
    results.push(TestResult {
        name: "path_avoids_costly_water".into(),
        passed: (3..6).all(|x| !around.contains(&TilePos::new(x, 1))),
        detail: format!("{} waypoints skirting the pond", around.len()),
    });

    results
}

// ── 3. Movement Calibration ─────────────────────────────────────────────

/// Spawn an imp and walk it along a straight line, returning the turn
/// on which it reached the goal tile with an empty path.
fn walk_scenario(goal: TilePos, max_turns: u32) -> Option<u32> {
    let grid = TileGrid::new(24, 4, TileKind::Open);
    let mut sim = Simulation::new(grid);
    let mut renderer = RecordingRenderer::new();
    let imp = sim
        .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
        .expect("spawn");

    {
        let mut q = sim
            .world
            .query_one::<(&Spatial, &mut PathState, &mut Timers)>(imp)
            .unwrap();
        let (spatial, path, timers) = q.get().unwrap();
        if !path_to(&sim.grid, spatial, path, timers, goal, false) {
            return None;
        }
    }

    let mut rng = StdRng::seed_from_u64(11);
    for turn in 1..=max_turns {
        sim.step_turn_with_rng(&mut rng);
        let spatial = sim.world.get::<&Spatial>(imp).unwrap();
        let path = sim.world.get::<&PathState>(imp).unwrap();
        if spatial.tile() == goal && path.is_empty() {
            return Some(turn);
        }
    }
    None
}

fn validate_movement(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Movement Calibration");
    let mut results = Vec::new();

    // Base speed 96 = the reference imp: ~9.02 subtiles per second.
    let delta = base_speed_to_delta(96.0);
    results.push(TestResult {
        name: "movement_reference_speed".into(),
        passed: (delta - 9.018).abs() < 0.01,
        detail: format!("base speed 96 → {:.3} subtiles/s", delta),
    });

    // Five tiles (15 subtiles) in 34 turns, give or take one.
    let short = walk_scenario(TilePos::new(5, 0), 80);
    results.push(TestResult {
        name: "movement_five_tile_reference".into(),
        passed: short.map_or(false, |t| (t as i32 - 34).abs() <= 1),
        detail: format!("arrived at turn {:?} (expected 34±1)", short),
    });

    // Twenty tiles in ~6.65 seconds, ~133 turns.
    let long = walk_scenario(TilePos::new(20, 0), 300);
    results.push(TestResult {
        name: "movement_twenty_tile_budget".into(),
        passed: long.map_or(false, |t| (t as i32 - 133).abs() <= 3),
        detail: format!("arrived at turn {:?} (expected ~133)", long),
    });

    results
}

// ── 4. Fixed-Timestep Clock ─────────────────────────────────────────────

fn validate_clock(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Fixed-Timestep Clock");
    let mut results = Vec::new();

    let seconds = turns_to_seconds(90.0);
    let turns = seconds_to_turns(seconds);
    results.push(TestResult {
        name: "clock_turn_second_round_trip".into(),
        passed: (turns - 90.0).abs() < 1e-3 && (TURN_SECONDS - 0.05).abs() < 1e-6,
        detail: format!("90 turns = {:.2}s = {:.1} turns", seconds, turns),
    });

    let mut sim = Simulation::new(TileGrid::new(4, 4, TileKind::Open));
    sim.update(0.1);
    let two = sim.turns();
    sim.update(0.02);
    let still_two = sim.turns();
    sim.update(0.04);
    let three = sim.turns();
    results.push(TestResult {
        name: "clock_accumulator_carries_remainder".into(),
        passed: two == 2 && still_two == 2 && three == 3,
        detail: format!("turns: {} → {} → {}", two, still_two, three),
    });

    let mut stalled = Simulation::new(TileGrid::new(4, 4, TileKind::Open));
    stalled.update(10.0);
    let clamped = stalled.turns();
    stalled.update(0.0);
    results.push(TestResult {
        name: "clock_stall_drops_backlog".into(),
        passed: clamped == MAX_TURNS_PER_UPDATE as u64 && stalled.turns() == clamped,
        detail: format!("10s frame → {} turns, backlog dropped", clamped),
    });

    results
}

// ── 5. Worker Dig Pipeline ──────────────────────────────────────────────

fn validate_worker(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Worker Dig Pipeline");
    let mut results = Vec::new();

    let mut grid = TileGrid::new(16, 16, TileKind::Open);
    let wall = TilePos::new(8, 2);
    grid.set(wall, TileKind::Wall);
    let mut sim = Simulation::new(grid);
    sim.mark_for_dig(wall);

    let mut renderer = RecordingRenderer::new();
    let imp = sim
        .spawn_creature(CreatureType::Imp, Owner::Red, (7, 0, 7), &mut renderer)
        .expect("spawn");

    let mut rng = StdRng::seed_from_u64(23);
    let mut dug_at = None;
    for turn in 1..=600 {
        sim.step_turn_with_rng(&mut rng);
        if dug_at.is_none() && sim.grid.get(wall) == Some(TileKind::Open) {
            dug_at = Some(turn);
        }
        if dug_at.is_some() && !sim.world.get::<&Order>(imp).unwrap().is_active() {
            break;
        }
    }

    results.push(TestResult {
        name: "worker_digs_marked_wall".into(),
        passed: dug_at.is_some() && !sim.grid.is_marked(wall),
        detail: format!("wall dug at turn {:?}", dug_at),
    });
    results.push(TestResult {
        name: "worker_completes_on_dug_tile".into(),
        passed: sim.world.get::<&Spatial>(imp).unwrap().tile() == wall
            && !sim.world.get::<&Order>(imp).unwrap().is_active(),
        detail: "imp stands on the opened tile with no order".into(),
    });

    // A task sealed in rock is dropped, not retried forever.
    let mut sealed_grid = TileGrid::new(8, 8, TileKind::Open);
    let sealed = TilePos::new(5, 5);
    sealed_grid.set(sealed, TileKind::Wall);
    for (dx, dy) in [(1i32, 0i32), (-1, 0), (0, 1), (0, -1)] {
        sealed_grid.set(TilePos::new(5 + dx, 5 + dy), TileKind::Rock);
    }
    let mut sealed_sim = Simulation::new(sealed_grid);
    sealed_sim.mark_for_dig(sealed);
    let imp2 = sealed_sim
        .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
        .expect("spawn");
    let mut rng2 = StdRng::seed_from_u64(29);
    for _ in 0..200 {
        sealed_sim.step_turn_with_rng(&mut rng2);
    }
    results.push(TestResult {
        name: "worker_drops_unreachable_task".into(),
        passed: !sealed_sim.world.get::<&Order>(imp2).unwrap().is_active()
            && sealed_sim.grid.get(sealed) == Some(TileKind::Wall),
        detail: "sealed wall still standing, imp idle".into(),
    });

    results
}

// ── 6. Creature Life Loop ───────────────────────────────────────────────

fn validate_life(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Creature Life Loop");
    let mut results = Vec::new();

    let mut sim = Simulation::new(TileGrid::new(8, 8, TileKind::Open));
    let mut renderer = RecordingRenderer::new();
    let beetle = sim
        .spawn_creature(CreatureType::Beetle, Owner::Red, (13, 0, 13), &mut renderer)
        .expect("spawn");

    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..10 {
        sim.step_turn_with_rng(&mut rng);
    }
    let lair = sim.world.get::<&Spatial>(beetle).unwrap().lair;
    results.push(TestResult {
        name: "life_lair_claimed_at_entry".into(),
        passed: lair == Some(TilePos::new(4, 4)),
        detail: format!("lair at {:?}", lair),
    });

    // Push the beetle over the hunger threshold and feed it.
    sim.world.get::<&mut Creature>(beetle).unwrap().hunger = 75;
    let food = sim.spawn_food(TilePos::new(1, 4));
    let mut eaten_at = None;
    for turn in 1..=800 {
        sim.step_turn_with_rng(&mut rng);
        if !sim.world.contains(food) {
            eaten_at = Some(turn);
            break;
        }
    }
    let creature = sim.world.get::<&Creature>(beetle).unwrap();
    results.push(TestResult {
        name: "life_hungry_finds_food".into(),
        passed: eaten_at.is_some() && creature.hunger < 70,
        detail: format!("ate at turn {:?}, hunger {}", eaten_at, creature.hunger),
    });
    drop(creature);

    // Starvation with no food: happiness erodes to the clamp, vitals
    // stay in range, nobody dies of an unhandled underflow.
    let mut starving = Simulation::new(TileGrid::new(6, 6, TileKind::Open));
    let dragon = starving
        .spawn_creature(CreatureType::Dragon, Owner::Red, (7, 0, 7), &mut renderer)
        .expect("spawn");
    starving.world.get::<&mut Creature>(dragon).unwrap().hunger = 100;
    let mut rng2 = StdRng::seed_from_u64(37);
    for _ in 0..4000 {
        starving.step_turn_with_rng(&mut rng2);
    }
    let c = starving.world.get::<&Creature>(dragon).unwrap();
    results.push(TestResult {
        name: "life_starvation_clamps".into(),
        passed: c.hunger == 100
            && c.happiness == 0
            && c.health > 0.0
            && !c.is_dying(),
        detail: format!(
            "after 200s unfed: hunger={} happiness={} health={:.0}",
            c.hunger, c.happiness, c.health
        ),
    });

    results
}

// ── 7. Combat & Death ───────────────────────────────────────────────────

fn validate_combat(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Combat & Death");
    let mut results = Vec::new();

    // Cramped arena keeps the combatants in provoke range.
    let mut sim = Simulation::new(TileGrid::new(2, 2, TileKind::Open));
    let mut renderer = RecordingRenderer::new();
    let beetle = sim
        .spawn_creature(CreatureType::Beetle, Owner::Red, (1, 0, 1), &mut renderer)
        .expect("spawn");
    let fly = sim
        .spawn_creature(CreatureType::Fly, Owner::Heroes, (4, 0, 4), &mut renderer)
        .expect("spawn");

    let happiness_before = sim.world.get::<&Creature>(beetle).unwrap().happiness;
    sim.slap(beetle);
    let mut rng = StdRng::seed_from_u64(41);
    sim.step_turn_with_rng(&mut rng);
    let after_slap = (*sim.world.get::<&Creature>(beetle).unwrap()).clone();
    results.push(TestResult {
        name: "combat_slap_provokes".into(),
        passed: after_slap.happiness == happiness_before - 20
            && matches!(
                after_slap.state,
                CreatureState::Annoyed | CreatureState::Fighting
            ),
        detail: format!(
            "happiness {} → {}, state {:?}",
            happiness_before, after_slap.happiness, after_slap.state
        ),
    });

    // 5 hp fly vs 1.5-damage strikes once per second: dead within a
    // handful of seconds even with chasing.
    let mut died_at = None;
    for turn in 1..=1200 {
        sim.step_turn_with_rng(&mut rng);
        if sim.world.get::<&Creature>(fly).unwrap().is_dying() {
            died_at = Some(turn);
            break;
        }
    }
    results.push(TestResult {
        name: "combat_fight_kills_target".into(),
        passed: died_at.is_some(),
        detail: format!("fly entered Dying at turn {:?}", died_at),
    });

    // Death animation runs out, then the caller reaps.
    for _ in 0..40 {
        sim.step_turn_with_rng(&mut rng);
    }
    let finished = sim.finished_dying();
    results.push(TestResult {
        name: "combat_dying_reported_finished".into(),
        passed: finished == vec![fly] && sim.world.contains(fly),
        detail: "death animation done, entity awaiting despawn".into(),
    });

    let live_before = renderer.live.len();
    sim.despawn_creature(fly, &mut renderer);
    results.push(TestResult {
        name: "combat_despawn_releases_resources".into(),
        passed: renderer.live.len() == live_before - 1 && !sim.world.contains(fly),
        detail: format!("renderables {} → {}", live_before, renderer.live.len()),
    });

    // The survivor disengages once its target is gone.
    for _ in 0..40 {
        sim.step_turn_with_rng(&mut rng);
    }
    let survivor_state = sim.world.get::<&Creature>(beetle).unwrap().state;
    results.push(TestResult {
        name: "combat_survivor_disengages".into(),
        passed: survivor_state != CreatureState::Fighting,
        detail: format!("survivor state {:?}", survivor_state),
    });

    results
}

// ── 8. Player Command Surface ───────────────────────────────────────────

fn validate_commands(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Player Commands");
    let mut results = Vec::new();

    let mut sim = Simulation::new(TileGrid::new(16, 16, TileKind::Open));
    let mut renderer = RecordingRenderer::new();

    let unknown = sim.spawn_from_content_id(42, Owner::Red, (1, 0, 1), &mut renderer);
    results.push(TestResult {
        name: "command_unknown_creature_id_rejected".into(),
        passed: matches!(unknown, Err(SpawnError::UnknownCreatureType(42)))
            && sim.creature_count() == 0,
        detail: "content id 42 fails the spawn, world untouched".into(),
    });

    let mut broke = RecordingRenderer::new();
    broke.fail_allocations = true;
    let alloc = sim.spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut broke);
    results.push(TestResult {
        name: "command_render_alloc_failure_fatal".into(),
        passed: matches!(alloc, Err(SpawnError::RenderAlloc(_))) && sim.creature_count() == 0,
        detail: "allocation failure aborts the spawn".into(),
    });

    // Stop an imp mid-path; the path drops at once.
    let wall = TilePos::new(12, 1);
    sim.grid.set(wall, TileKind::Wall);
    sim.mark_for_dig(wall);
    let imp = sim
        .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
        .expect("spawn");
    let mut rng = StdRng::seed_from_u64(43);
    for _ in 0..20 {
        sim.step_turn_with_rng(&mut rng);
    }
    let moving = sim.world.get::<&Spatial>(imp).unwrap().position.x > 1.0;
    let stopped = sim.stop_order(imp);
    let stopped_again = sim.stop_order(imp);
    results.push(TestResult {
        name: "command_stop_order_mid_path".into(),
        passed: moving
            && stopped
            && stopped_again
            && !sim.world.get::<&Order>(imp).unwrap().is_active()
            && sim.world.get::<&PathState>(imp).unwrap().is_empty(),
        detail: "order and path cleared, stop is idempotent".into(),
    });

    // Room activity assignment and interruption.
    let warlock = sim
        .spawn_creature(CreatureType::Warlock, Owner::Red, (25, 0, 25), &mut renderer)
        .expect("spawn");
    for _ in 0..5 {
        sim.step_turn_with_rng(&mut rng);
    }
    let target = sim.world.get::<&Spatial>(warlock).unwrap().tile();
    let assigned = sim.assign_activity(warlock, ActivityKind::Sleep, target, 30.0);
    let state_after_assign = sim.world.get::<&Creature>(warlock).unwrap().state;
    let kind_after_assign = sim.world.get::<&Activity>(warlock).unwrap().kind();
    sim.stop_activity(warlock);
    let kind_after_stop = sim.world.get::<&Activity>(warlock).unwrap().kind();
    sim.step_turn_with_rng(&mut rng);
    let state_after_stop = sim.world.get::<&Creature>(warlock).unwrap().state;
    results.push(TestResult {
        name: "command_assign_and_stop_activity".into(),
        passed: assigned
            && state_after_assign == CreatureState::Sleeping
            && kind_after_assign == Some(ActivityKind::Sleep)
            && kind_after_stop.is_none()
            && state_after_stop != CreatureState::Sleeping,
        detail: format!("{:?} → stop → {:?}", state_after_assign, state_after_stop),
    });

    let imp_refused = sim.assign_activity(imp, ActivityKind::Train, target, 10.0);
    results.push(TestResult {
        name: "command_workers_refuse_activities".into(),
        passed: !imp_refused,
        detail: "imps take dig tasks, not room activities".into(),
    });

    let party = sim
        .spawn_hero_party(
            &[CreatureType::Knight, CreatureType::Archer],
            HeroObjective::Explore,
            (40, 0, 40),
            &mut renderer,
        )
        .expect("party");
    let follower_leader = sim
        .world
        .get::<&underkeep_core::components::Hero>(party[1])
        .unwrap()
        .leader;
    results.push(TestResult {
        name: "command_hero_party_linked".into(),
        passed: follower_leader == Some(party[0]) && sim.hero_count() == 2,
        detail: "follower references the leader".into(),
    });

    results
}

// ── 9. Renderer Seam ────────────────────────────────────────────────────

fn validate_render(quiet: bool) -> Vec<TestResult> {
    section(quiet, "Renderer Seam");
    let mut results = Vec::new();

    results.push(TestResult {
        name: "render_instance_record_32_bytes".into(),
        passed: std::mem::size_of::<CreatureInstanceData>() == 32,
        detail: format!(
            "size_of::<CreatureInstanceData>() = {}",
            std::mem::size_of::<CreatureInstanceData>()
        ),
    });

    let mut sim = Simulation::new(TileGrid::new(8, 8, TileKind::Open));
    let mut renderer = RecordingRenderer::new();
    let imp = sim
        .spawn_creature(CreatureType::Imp, Owner::Red, (4, 0, 4), &mut renderer)
        .expect("spawn");
    let warlock = sim
        .spawn_creature(CreatureType::Warlock, Owner::Red, (10, 0, 10), &mut renderer)
        .expect("spawn");

    sim.draw(&mut renderer);
    let both_drawn = renderer.draws.len() == 2;

    sim.world.get::<&mut RenderHandle>(warlock).unwrap().visible = false;
    renderer.draws.clear();
    sim.draw(&mut renderer);
    let one_drawn = renderer.draws.len() == 1;
    results.push(TestResult {
        name: "render_draw_respects_visibility".into(),
        passed: both_drawn && one_drawn,
        detail: "one instance per visible creature".into(),
    });

    sim.world.get::<&mut Spatial>(imp).unwrap().facing =
        underkeep_core::components::Vec3::new(-1.0, 0.0, 0.0);
    renderer.draws.clear();
    sim.draw(&mut renderer);
    let flipped = renderer.draws[0].2.is_flipped == 1;
    results.push(TestResult {
        name: "render_facing_flips_sprite".into(),
        passed: flipped,
        detail: "west-facing sprite sets is_flipped".into(),
    });

    // Instance frame index tracks the animation component.
    let frame = sim.world.get::<&Animation>(imp).unwrap().index as f32;
    let drawn_frame = renderer.draws[0].2.anim_index;
    results.push(TestResult {
        name: "render_instance_tracks_animation".into(),
        passed: (frame - drawn_frame).abs() < f32::EPSILON,
        detail: format!("frame {} mirrored into instance data", frame),
    });

    results
}
