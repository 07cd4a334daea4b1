//! Creature-related components: identity, vitals, behavioral state,
//! spatial state, timers, animation, and the hero extension.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use underkeep_logic::constants::TilePos;

use super::common::Vec3;

/// Closed roster of creature types. Workers, dungeon creatures, and
/// hero variants are all here; dispatch over this enum is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureType {
    Imp,
    Fly,
    Beetle,
    Warlock,
    Dragon,
    Knight,
    Archer,
    Barbarian,
}

impl CreatureType {
    /// Decode a content-file creature tag. Unknown tags are a data bug
    /// and must fail the spawn, not default to something.
    pub fn from_content_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CreatureType::Imp),
            1 => Some(CreatureType::Fly),
            2 => Some(CreatureType::Beetle),
            3 => Some(CreatureType::Warlock),
            4 => Some(CreatureType::Dragon),
            5 => Some(CreatureType::Knight),
            6 => Some(CreatureType::Archer),
            7 => Some(CreatureType::Barbarian),
            _ => None,
        }
    }

    /// Worker-class creatures run the imp update path (tasks, digging)
    /// instead of the generic behavior update.
    pub fn is_worker(&self) -> bool {
        matches!(self, CreatureType::Imp)
    }

    pub fn is_hero(&self) -> bool {
        matches!(
            self,
            CreatureType::Knight | CreatureType::Archer | CreatureType::Barbarian
        )
    }

    /// Creatures that fly path straight over walls.
    pub fn ignores_walls(&self) -> bool {
        matches!(self, CreatureType::Fly | CreatureType::Dragon)
    }

    pub fn sprite_class(&self) -> SpriteClass {
        match self {
            CreatureType::Imp => SpriteClass::Imp,
            CreatureType::Fly => SpriteClass::Fly,
            CreatureType::Beetle => SpriteClass::Beetle,
            CreatureType::Warlock => SpriteClass::Warlock,
            CreatureType::Dragon => SpriteClass::Dragon,
            CreatureType::Knight => SpriteClass::Knight,
            CreatureType::Archer => SpriteClass::Archer,
            CreatureType::Barbarian => SpriteClass::Barbarian,
        }
    }
}

/// Which sprite sheet a creature renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteClass {
    Imp,
    Fly,
    Beetle,
    Warlock,
    Dragon,
    Knight,
    Archer,
    Barbarian,
}

/// Owning faction tag. Immutable after spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    Red,
    Blue,
    Green,
    Yellow,
    Neutral,
    Heroes,
}

impl Owner {
    /// Neutral creatures fight nobody; everyone else fights across
    /// faction lines.
    pub fn is_hostile_to(&self, other: Owner) -> bool {
        *self != Owner::Neutral && other != Owner::Neutral && *self != other
    }
}

/// Behavioral state of a creature. `Dying` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureState {
    JustEntered,
    CreateLair,
    Uncertain,
    Hungry,
    Annoyed,
    Fighting,
    Exploring,
    Sleeping,
    Researching,
    Training,
    Dying,
}

impl CreatureState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CreatureState::Dying)
    }

    /// States entered only through an explicitly assigned room Activity.
    pub fn is_room_bound(&self) -> bool {
        matches!(
            self,
            CreatureState::Sleeping | CreatureState::Researching | CreatureState::Training
        )
    }
}

/// Core creature component: identity and vitals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub kind: CreatureType,
    pub sprite_class: SpriteClass,
    /// Immutable after construction.
    pub owner: Owner,
    pub state: CreatureState,
    pub health: f32,
    pub level: i32,
    /// 0 (fed) to 100 (starving).
    pub hunger: i32,
    /// 0 (furious) to 100 (content).
    pub happiness: i32,
    pub gold_held: i32,
    pub just_slapped: bool,
    /// Game-design speed units; see `base_speed_to_delta`.
    pub base_speed: f32,
}

impl Creature {
    /// Clamp-adjust hunger; positive = getting hungrier.
    pub fn add_hunger(&mut self, amount: i32) {
        self.hunger = (self.hunger + amount).clamp(0, 100);
    }

    /// Clamp-adjust happiness.
    pub fn add_happiness(&mut self, amount: i32) {
        self.happiness = (self.happiness + amount).clamp(0, 100);
    }

    /// Apply damage, flooring health at zero. The state system turns
    /// zero health into the terminal state on its next pass.
    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    pub fn is_dying(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Spatial state: subtile position, facing, and lair references.
#[derive(Debug, Clone)]
pub struct Spatial {
    /// Position in subtile units; `y` is height.
    pub position: Vec3,
    pub facing: Vec3,
    /// Claimed lair tile, if any.
    pub lair: Option<TilePos>,
    /// Non-owning handle to the lair entity; validated before use.
    pub lair_entity: Option<Entity>,
}

impl Spatial {
    pub fn at_subtile(x: f32, height: f32, y: f32) -> Self {
        Self {
            position: Vec3::new(x, height, y),
            facing: Vec3::new(0.0, 0.0, 1.0),
            lair: None,
            lair_entity: None,
        }
    }

    /// The tile this creature currently stands on.
    pub fn tile(&self) -> TilePos {
        TilePos::from_subtile(self.position.x, self.position.z)
    }
}

/// Number of per-ability cooldown slots. Fixed; no dynamic resizing.
pub const NUM_ABILITY_SLOTS: usize = 10;

/// Cooldown slot used for the basic melee/ranged strike.
pub const ABILITY_ATTACK: usize = 0;

/// Per-creature timers advanced each turn by the timer driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timers {
    /// Time into the current animation frame cycle.
    pub animation_time: f32,
    /// Sub-tile visual interpolation clock; independent of logical
    /// per-tile arrival.
    pub path_lerp_time: f32,
    /// Fractional hunger accumulator; spills into whole hunger points.
    pub hunger_accum: f32,
    /// Per-ability cooldowns, decaying toward zero.
    pub power_cooldowns: [f32; NUM_ABILITY_SLOTS],
    /// Worker special action (dig, claim) in progress when > 0.
    pub special_timer: f32,
    /// Backoff before retrying a failed task/path search.
    pub task_search_timer: f32,
    /// Cadence for escalating mood penalties (e.g. unfed hunger).
    pub mood_timer: f32,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            animation_time: 0.0,
            path_lerp_time: 0.0,
            hunger_accum: 0.0,
            power_cooldowns: [0.0; NUM_ABILITY_SLOTS],
            special_timer: 0.0,
            task_search_timer: 0.0,
            mood_timer: 0.0,
        }
    }
}

/// Which animation a creature is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationState {
    Idle,
    Walking,
    Digging,
    Claiming,
    Eating,
    Sleeping,
    Attacking,
    Dying,
}

/// Animation playback state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub state: AnimationState,
    pub index: usize,
    /// One-shot animation has reached its final frame.
    pub done: bool,
    pub frozen: bool,
    pub hovered: bool,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            state: AnimationState::Idle,
            index: 0,
            done: false,
            frozen: false,
            hovered: false,
        }
    }
}

impl Animation {
    /// Switch to `state` from frame zero. No-op when already playing
    /// it, so per-tick callers don't stutter the animation.
    pub fn set_fresh(&mut self, state: AnimationState, timers: &mut Timers) {
        if self.state != state {
            self.state = state;
            self.index = 0;
            self.done = false;
            timers.animation_time = 0.0;
        }
    }
}

/// Hero extension component, attached only to hero-class creatures.
#[derive(Debug, Clone)]
pub struct Hero {
    /// Countdown to the next strike while fighting.
    pub time_till_strike: f32,
    /// Non-owning back-reference to the party leader.
    pub leader: Option<Entity>,
    pub objective: HeroObjective,
}

impl Default for Hero {
    fn default() -> Self {
        Self {
            time_till_strike: 0.0,
            leader: None,
            objective: HeroObjective::Explore,
        }
    }
}

/// What a hero party came to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeroObjective {
    Explore,
    AttackHeart,
    StealGold,
    LeaveLevel,
}

/// A claimed lair spot in the dungeon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lair {
    pub tile: TilePos,
    pub owner: Owner,
}

/// Marker component for an edible world entity (a chicken, in spirit).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Food;
