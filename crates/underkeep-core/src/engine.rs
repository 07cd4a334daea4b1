//! Simulation engine - main entry point for running the simulation

use hecs::{Entity, World};
use rand::Rng;

use underkeep_logic::clock::TURN_SECONDS;
use underkeep_logic::constants::TilePos;
use underkeep_logic::grid::TileGrid;

use crate::components::*;
use crate::data::{animation_def, stats_for};
use crate::render::{
    CreatureInstanceData, DrawTransform, RenderError, RenderHandle, Renderer, SpriteId,
};
use crate::systems::*;

/// Upper bound on turns stepped per `update` call. A frame stall longer
/// than this drops simulation time instead of spiraling.
pub const MAX_TURNS_PER_UPDATE: u32 = 8;

/// Why a spawn was refused.
#[derive(Debug)]
pub enum SpawnError {
    /// A content-file creature tag outside the known roster.
    UnknownCreatureType(u8),
    /// Renderer-side resource allocation failed. Fatal: the engine
    /// cannot degrade to an invisible creature.
    RenderAlloc(RenderError),
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpawnError::UnknownCreatureType(id) => {
                write!(f, "unknown creature type id {}", id)
            }
            SpawnError::RenderAlloc(e) => write!(f, "renderer allocation failed: {}", e),
        }
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpawnError::RenderAlloc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderError> for SpawnError {
    fn from(e: RenderError) -> Self {
        SpawnError::RenderAlloc(e)
    }
}

/// Main simulation: the ECS world, the tile grid, and the fixed-step
/// clock that drives both.
pub struct Simulation {
    /// ECS world containing all entities
    pub world: World,
    /// Navigation grid
    pub grid: TileGrid,

    // Fixed-timestep state
    accumulator: f32,
    turns: u64,
    /// Events raised last turn, consumed by the state machine next turn.
    events: Vec<SimEvent>,
}

impl Simulation {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            world: World::new(),
            grid,
            accumulator: 0.0,
            turns: 0,
            events: Vec::new(),
        }
    }

    /// Advance the simulation by a variable frame delta. Turns run at
    /// exactly 20 Hz regardless of how often this is called; leftover
    /// time carries over in the accumulator.
    pub fn update(&mut self, delta_seconds: f32) {
        self.accumulator += delta_seconds.max(0.0);

        let mut ran = 0;
        while self.accumulator >= TURN_SECONDS {
            if ran >= MAX_TURNS_PER_UPDATE {
                // Stalled frame: drop the backlog rather than chase it.
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= TURN_SECONDS;
            self.step_turn();
            ran += 1;
        }
    }

    /// Run exactly one 50 ms turn: state machine, then pathing, then
    /// the animation/timer driver. Events raised here are seen by the
    /// state machine at the start of the next turn.
    fn step_turn(&mut self) {
        let events_in = std::mem::take(&mut self.events);
        let mut events_out = Vec::new();
        let mut rng = rand::thread_rng();

        creature_state_system(
            &mut self.world,
            &mut self.grid,
            &events_in,
            &mut events_out,
            &mut rng,
            TURN_SECONDS,
        );
        pathing_system(&mut self.world, &self.grid, TURN_SECONDS, &mut events_out);
        animation_system(&mut self.world, TURN_SECONDS, &mut events_out);

        self.events = events_out;
        self.turns += 1;
    }

    /// Turns stepped since creation.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Spawn a creature at a subtile position `(x, height, y)`.
    ///
    /// Renderer resources are allocated up front; if that fails the
    /// spawn fails and nothing is added to the world.
    pub fn spawn_creature(
        &mut self,
        kind: CreatureType,
        owner: Owner,
        position: (i32, i32, i32),
        renderer: &mut dyn Renderer,
    ) -> Result<Entity, SpawnError> {
        let stats = stats_for(kind);
        let sprite: SpriteId = kind.sprite_class() as u32;
        let renderable = renderer.create_renderable(sprite)?;

        let creature = Creature {
            kind,
            sprite_class: kind.sprite_class(),
            owner,
            state: CreatureState::JustEntered,
            health: stats.max_health,
            level: 1,
            hunger: 0,
            happiness: 100,
            gold_held: 0,
            just_slapped: false,
            base_speed: stats.base_speed,
        };
        let entity = self.world.spawn((
            creature,
            Spatial::at_subtile(position.0 as f32, position.1 as f32, position.2 as f32),
            Order::default(),
            Activity::default(),
            PathState::default(),
            Timers::default(),
            Animation::default(),
            RenderHandle {
                renderable,
                sprite,
                visible: true,
            },
        ));
        if kind.is_hero() {
            // Attach-only extension; never present on dungeon creatures.
            self.world
                .insert_one(entity, Hero::default())
                .expect("entity just spawned");
        }
        Ok(entity)
    }

    /// Spawn from a raw content-file creature tag. Unknown tags fail
    /// the spawn instead of defaulting.
    pub fn spawn_from_content_id(
        &mut self,
        id: u8,
        owner: Owner,
        position: (i32, i32, i32),
        renderer: &mut dyn Renderer,
    ) -> Result<Entity, SpawnError> {
        let kind = CreatureType::from_content_id(id).ok_or(SpawnError::UnknownCreatureType(id))?;
        self.spawn_creature(kind, owner, position, renderer)
    }

    /// Drop an edible into the world at a tile center.
    pub fn spawn_food(&mut self, tile: TilePos) -> Entity {
        let (cx, cy) = tile.center_subtile();
        self.world.spawn((Food, Spatial::at_subtile(cx, 0.0, cy)))
    }

    /// Spawn a hero party on a shared objective: the leader first, then
    /// followers with their leader reference set.
    pub fn spawn_hero_party(
        &mut self,
        kinds: &[CreatureType],
        objective: HeroObjective,
        position: (i32, i32, i32),
        renderer: &mut dyn Renderer,
    ) -> Result<Vec<Entity>, SpawnError> {
        let mut party = Vec::with_capacity(kinds.len());
        let mut leader = None;
        for &kind in kinds {
            let entity = self.spawn_creature(kind, Owner::Heroes, position, renderer)?;
            if let Ok(mut hero) = self.world.get::<&mut Hero>(entity) {
                hero.objective = objective;
                hero.leader = leader;
            }
            if leader.is_none() {
                leader = Some(entity);
            }
            party.push(entity);
        }
        Ok(party)
    }

    /// Remove a creature, releasing its renderer resources and lair.
    pub fn despawn_creature(&mut self, entity: Entity, renderer: &mut dyn Renderer) -> bool {
        if let Ok(handle) = self.world.get::<&RenderHandle>(entity) {
            renderer.destroy_renderable(handle.renderable);
        }
        let lair = self
            .world
            .get::<&Spatial>(entity)
            .ok()
            .and_then(|s| s.lair_entity);
        if let Some(lair) = lair {
            let _ = self.world.despawn(lair);
        }
        self.world.despawn(entity).is_ok()
    }

    /// Creatures whose death animation has finished. The engine keeps
    /// them in the world; the caller decides when to despawn.
    pub fn finished_dying(&self) -> Vec<Entity> {
        self.world
            .query::<(&Creature, &Animation)>()
            .iter()
            .filter(|(_, (c, a))| c.is_dying() && a.state == AnimationState::Dying && a.done)
            .map(|(e, _)| e)
            .collect()
    }

    /// Emit one draw call per visible creature. Read-only with respect
    /// to simulation state.
    pub fn draw(&self, renderer: &mut dyn Renderer) {
        for (_, (creature, spatial, anim, handle)) in self
            .world
            .query::<(&Creature, &Spatial, &Animation, &RenderHandle)>()
            .iter()
        {
            if !handle.visible {
                continue;
            }
            let def = animation_def(anim.state);
            let instance = CreatureInstanceData {
                anim_index: anim.index as f32,
                num_anim_frames: def.frames as f32,
                sprite_width: stats_for(creature.kind).sprite_width,
                is_frozen: anim.frozen as u32,
                is_flipped: (spatial.facing.x < 0.0) as u32,
                is_hovered: anim.hovered as u32,
                pad: [0; 2],
            };
            renderer.draw(
                handle.renderable,
                DrawTransform {
                    position: spatial.position,
                    facing: spatial.facing,
                },
                &instance,
            );
        }
    }

    /// Stop a creature's immediate order. Idempotent; false only when
    /// the entity is gone or not a creature.
    pub fn stop_order(&mut self, entity: Entity) -> bool {
        match self
            .world
            .query_one_mut::<(&mut Order, &mut PathState, &mut Timers)>(entity)
        {
            Ok((order, path, timers)) => {
                stop_order(order, path, timers);
                true
            }
            Err(_) => false,
        }
    }

    /// Stop a creature's current activity and any order it issued.
    pub fn stop_activity(&mut self, entity: Entity) -> bool {
        match self
            .world
            .query_one_mut::<(&mut Activity, &mut Order, &mut PathState, &mut Timers)>(entity)
        {
            Ok((activity, order, path, timers)) => {
                stop_activity(activity, order, path, timers);
                true
            }
            Err(_) => false,
        }
    }

    /// Slap a creature. Takes effect on the next turn's state pass.
    pub fn slap(&mut self, entity: Entity) -> bool {
        match self.world.get::<&mut Creature>(entity) {
            Ok(mut creature) if !creature.is_dying() => {
                creature.just_slapped = true;
                true
            }
            _ => false,
        }
    }

    /// Assign a behavioral activity with a target tile and duration.
    /// Refused for workers (they only take dig tasks) and the dying.
    pub fn assign_activity(
        &mut self,
        entity: Entity,
        kind: ActivityKind,
        target: TilePos,
        duration_seconds: f32,
    ) -> bool {
        let Ok((creature, spatial, activity, order, path)) = self.world.query_one_mut::<(
            &mut Creature,
            &Spatial,
            &mut Activity,
            &mut Order,
            &mut PathState,
        )>(entity) else {
            return false;
        };
        if creature.is_dying() || creature.kind.is_worker() {
            return false;
        }
        let state = match kind {
            ActivityKind::Sleep => CreatureState::Sleeping,
            ActivityKind::Research => CreatureState::Researching,
            ActivityKind::Train => CreatureState::Training,
            ActivityKind::Explore => CreatureState::Exploring,
            // Eat and Fight are chosen by the creature, not assigned.
            ActivityKind::Eat | ActivityKind::Fight => return false,
        };
        order.clear();
        path.clear();
        activity.assign(
            kind,
            Directive::toward(spatial.tile(), target).with_duration(duration_seconds),
        );
        creature.state = state;
        true
    }

    /// Mark a wall tile for digging; workers pick it up on their next
    /// task search.
    pub fn mark_for_dig(&mut self, tile: TilePos) -> bool {
        self.grid.mark_for_dig(tile)
    }

    pub fn creature_count(&self) -> usize {
        self.world.query::<&Creature>().iter().count()
    }

    pub fn worker_count(&self) -> usize {
        self.world
            .query::<&Creature>()
            .iter()
            .filter(|(_, c)| c.kind.is_worker())
            .count()
    }

    pub fn hero_count(&self) -> usize {
        self.world.query::<(&Creature, &Hero)>().iter().count()
    }

    /// Step one turn with a caller-supplied rng; used by scenario
    /// harnesses that need reproducible wandering.
    pub fn step_turn_with_rng(&mut self, rng: &mut impl Rng) {
        let events_in = std::mem::take(&mut self.events);
        let mut events_out = Vec::new();
        creature_state_system(
            &mut self.world,
            &mut self.grid,
            &events_in,
            &mut events_out,
            rng,
            TURN_SECONDS,
        );
        pathing_system(&mut self.world, &self.grid, TURN_SECONDS, &mut events_out);
        animation_system(&mut self.world, TURN_SECONDS, &mut events_out);
        self.events = events_out;
        self.turns += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingRenderer;
    use underkeep_logic::grid::TileKind;

    fn open_sim(size: i32) -> Simulation {
        Simulation::new(TileGrid::new(size, size, TileKind::Open))
    }

    #[test]
    fn test_fixed_timestep_accumulation() {
        let mut sim = open_sim(8);
        sim.update(0.1); // exactly two turns
        assert_eq!(sim.turns(), 2);
        sim.update(0.02); // under one turn: accumulates
        assert_eq!(sim.turns(), 2);
        sim.update(0.04); // 0.02 + 0.04 crosses one turn
        assert_eq!(sim.turns(), 3);
    }

    #[test]
    fn test_stalled_frame_drops_backlog() {
        let mut sim = open_sim(8);
        sim.update(10.0);
        assert_eq!(sim.turns(), MAX_TURNS_PER_UPDATE as u64);
        // Backlog was dropped, not carried.
        sim.update(0.0);
        assert_eq!(sim.turns(), MAX_TURNS_PER_UPDATE as u64);
        sim.update(TURN_SECONDS);
        assert_eq!(sim.turns(), MAX_TURNS_PER_UPDATE as u64 + 1);
    }

    #[test]
    fn test_unknown_content_id_fails_spawn() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let result = sim.spawn_from_content_id(42, Owner::Red, (1, 0, 1), &mut renderer);
        assert!(matches!(result, Err(SpawnError::UnknownCreatureType(42))));
        assert_eq!(sim.creature_count(), 0);
        assert!(renderer.live.is_empty());
    }

    #[test]
    fn test_render_allocation_failure_fails_spawn() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        renderer.fail_allocations = true;
        let result = sim.spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer);
        assert!(matches!(result, Err(SpawnError::RenderAlloc(_))));
        assert_eq!(sim.creature_count(), 0);
    }

    #[test]
    fn test_spawn_attaches_hero_component_only_to_heroes() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let knight = sim
            .spawn_creature(CreatureType::Knight, Owner::Heroes, (1, 0, 1), &mut renderer)
            .unwrap();
        let beetle = sim
            .spawn_creature(CreatureType::Beetle, Owner::Red, (4, 0, 4), &mut renderer)
            .unwrap();
        assert!(sim.world.get::<&Hero>(knight).is_ok());
        assert!(sim.world.get::<&Hero>(beetle).is_err());
        assert_eq!(sim.hero_count(), 1);
    }

    #[test]
    fn test_hero_party_links_followers_to_leader() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let party = sim
            .spawn_hero_party(
                &[
                    CreatureType::Knight,
                    CreatureType::Archer,
                    CreatureType::Barbarian,
                ],
                HeroObjective::AttackHeart,
                (1, 0, 1),
                &mut renderer,
            )
            .unwrap();
        assert_eq!(party.len(), 3);
        assert_eq!(sim.world.get::<&Hero>(party[0]).unwrap().leader, None);
        assert_eq!(
            sim.world.get::<&Hero>(party[0]).unwrap().objective,
            HeroObjective::AttackHeart
        );
        assert_eq!(
            sim.world.get::<&Hero>(party[1]).unwrap().leader,
            Some(party[0])
        );
        assert_eq!(
            sim.world.get::<&Hero>(party[2]).unwrap().leader,
            Some(party[0])
        );
    }

    #[test]
    fn test_despawn_releases_renderable_and_lair() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let beetle = sim
            .spawn_creature(CreatureType::Beetle, Owner::Red, (7, 0, 7), &mut renderer)
            .unwrap();
        // Let it settle in and claim a lair.
        for _ in 0..10 {
            sim.update(TURN_SECONDS);
        }
        let lair = sim.world.get::<&Spatial>(beetle).unwrap().lair_entity;
        assert!(lair.is_some());

        assert!(sim.despawn_creature(beetle, &mut renderer));
        assert!(renderer.live.is_empty());
        assert!(!sim.world.contains(lair.unwrap()));
        assert_eq!(sim.creature_count(), 0);
    }

    #[test]
    fn test_draw_emits_one_instance_per_visible_creature() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let a = sim
            .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
            .unwrap();
        let _b = sim
            .spawn_creature(CreatureType::Warlock, Owner::Red, (4, 0, 4), &mut renderer)
            .unwrap();

        sim.draw(&mut renderer);
        assert_eq!(renderer.draws.len(), 2);

        // Hiding one drops it from the pass without touching the other.
        sim.world.get::<&mut RenderHandle>(a).unwrap().visible = false;
        renderer.draws.clear();
        sim.draw(&mut renderer);
        assert_eq!(renderer.draws.len(), 1);
    }

    #[test]
    fn test_draw_flips_on_facing() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let imp = sim
            .spawn_creature(CreatureType::Imp, Owner::Red, (4, 0, 4), &mut renderer)
            .unwrap();
        sim.world.get::<&mut Spatial>(imp).unwrap().facing = Vec3::new(-1.0, 0.0, 0.0);

        sim.draw(&mut renderer);
        assert_eq!(renderer.draws[0].2.is_flipped, 1);
    }

    #[test]
    fn test_stop_order_mid_path() {
        let mut sim = open_sim(16);
        let mut renderer = RecordingRenderer::new();
        let wall = TilePos::new(10, 1);
        sim.grid.set(wall, TileKind::Wall);
        sim.mark_for_dig(wall);
        let imp = sim
            .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
            .unwrap();

        // Enough turns to take the task and start walking.
        for _ in 0..20 {
            sim.update(TURN_SECONDS);
        }
        assert!(sim.world.get::<&Order>(imp).unwrap().is_active());
        let mid = sim.world.get::<&Spatial>(imp).unwrap().position;
        assert!(mid.x > 1.0);

        assert!(sim.stop_order(imp));
        assert!(!sim.world.get::<&Order>(imp).unwrap().is_active());
        assert!(sim.world.get::<&PathState>(imp).unwrap().is_empty());
        // Idempotent.
        assert!(sim.stop_order(imp));
    }

    #[test]
    fn test_assign_activity_maps_room_states() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let warlock = sim
            .spawn_creature(CreatureType::Warlock, Owner::Red, (1, 0, 1), &mut renderer)
            .unwrap();
        assert!(sim.assign_activity(warlock, ActivityKind::Research, TilePos::new(5, 5), 20.0));
        assert_eq!(
            sim.world.get::<&Creature>(warlock).unwrap().state,
            CreatureState::Researching
        );

        // Workers refuse activities.
        let imp = sim
            .spawn_creature(CreatureType::Imp, Owner::Red, (1, 0, 1), &mut renderer)
            .unwrap();
        assert!(!sim.assign_activity(imp, ActivityKind::Research, TilePos::new(5, 5), 20.0));
    }

    #[test]
    fn test_training_completes_and_levels_up() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let warlock = sim
            .spawn_creature(CreatureType::Warlock, Owner::Red, (2, 0, 2), &mut renderer)
            .unwrap();
        // Settle first so JustEntered/CreateLair are behind us.
        for _ in 0..5 {
            sim.update(TURN_SECONDS);
        }
        let target = sim.world.get::<&Spatial>(warlock).unwrap().tile();
        assert!(sim.assign_activity(warlock, ActivityKind::Train, target, 2.0));

        // Already at the target tile: 2 seconds of training.
        for _ in 0..60 {
            sim.update(TURN_SECONDS);
        }
        let creature = sim.world.get::<&Creature>(warlock).unwrap();
        assert_eq!(creature.level, 2);
        assert_ne!(creature.state, CreatureState::Training);
    }

    #[test]
    fn test_death_flows_to_finished_dying() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let fly = sim
            .spawn_creature(CreatureType::Fly, Owner::Red, (4, 0, 4), &mut renderer)
            .unwrap();
        sim.world.get::<&mut Creature>(fly).unwrap().health = 0.0;

        // One turn to enter Dying, then the 1.2s death animation.
        sim.update(TURN_SECONDS);
        assert!(sim.world.get::<&Creature>(fly).unwrap().is_dying());
        assert!(sim.finished_dying().is_empty());

        for _ in 0..30 {
            sim.update(TURN_SECONDS);
        }
        assert_eq!(sim.finished_dying(), vec![fly]);
        // Still in the world until the caller despawns.
        assert!(sim.world.contains(fly));
        assert!(sim.despawn_creature(fly, &mut renderer));
    }

    #[test]
    fn test_slap_refused_for_dying() {
        let mut sim = open_sim(8);
        let mut renderer = RecordingRenderer::new();
        let fly = sim
            .spawn_creature(CreatureType::Fly, Owner::Red, (4, 0, 4), &mut renderer)
            .unwrap();
        assert!(sim.slap(fly));
        sim.world.get::<&mut Creature>(fly).unwrap().health = 0.0;
        sim.update(TURN_SECONDS);
        assert!(!sim.slap(fly));
    }
}
