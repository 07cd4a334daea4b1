//! Creature base data: per-type stats and animation definitions.
//!
//! The roster is a closed enum, so lookups are exhaustive matches
//! rather than a file-format registry; the content-id decode path in
//! `CreatureType::from_content_id` is where unknown tags fail fast.

use crate::components::{AnimationState, CreatureType};

/// Per-type base stats consulted at spawn time.
#[derive(Debug, Clone, Copy)]
pub struct CreatureStats {
    /// Game-design speed units (96 = reference imp).
    pub base_speed: f32,
    pub max_health: f32,
    /// Hunger points gained per second.
    pub hunger_rate: f32,
    /// How many of the fixed cooldown slots this type uses.
    pub ability_count: usize,
    /// Sprite sheet frame width in texels, for the instance record.
    pub sprite_width: f32,
}

/// Base stats for a creature type.
pub fn stats_for(kind: CreatureType) -> CreatureStats {
    match kind {
        CreatureType::Imp => CreatureStats {
            base_speed: 96.0,
            max_health: 10.0,
            hunger_rate: 0.0, // workers don't eat
            ability_count: 2,
            sprite_width: 32.0,
        },
        CreatureType::Fly => CreatureStats {
            base_speed: 80.0,
            max_health: 5.0,
            hunger_rate: 0.6,
            ability_count: 1,
            sprite_width: 32.0,
        },
        CreatureType::Beetle => CreatureStats {
            base_speed: 48.0,
            max_health: 20.0,
            hunger_rate: 0.8,
            ability_count: 1,
            sprite_width: 48.0,
        },
        CreatureType::Warlock => CreatureStats {
            base_speed: 56.0,
            max_health: 30.0,
            hunger_rate: 0.5,
            ability_count: 4,
            sprite_width: 48.0,
        },
        CreatureType::Dragon => CreatureStats {
            base_speed: 40.0,
            max_health: 90.0,
            hunger_rate: 1.2,
            ability_count: 3,
            sprite_width: 96.0,
        },
        CreatureType::Knight => CreatureStats {
            base_speed: 56.0,
            max_health: 60.0,
            hunger_rate: 0.4,
            ability_count: 2,
            sprite_width: 48.0,
        },
        CreatureType::Archer => CreatureStats {
            base_speed: 72.0,
            max_health: 25.0,
            hunger_rate: 0.4,
            ability_count: 2,
            sprite_width: 48.0,
        },
        CreatureType::Barbarian => CreatureStats {
            base_speed: 64.0,
            max_health: 45.0,
            hunger_rate: 0.5,
            ability_count: 2,
            sprite_width: 48.0,
        },
    }
}

/// How an animation plays: frame count, seconds per frame, looping.
#[derive(Debug, Clone, Copy)]
pub struct AnimationDef {
    pub frames: usize,
    pub frame_time: f32,
    pub looping: bool,
}

/// Playback definition for an animation state. Death is the only
/// one-shot that freezes on its final frame; attack and worker actions
/// are one-shots that report completion.
pub fn animation_def(state: AnimationState) -> AnimationDef {
    match state {
        AnimationState::Idle => AnimationDef {
            frames: 4,
            frame_time: 0.25,
            looping: true,
        },
        AnimationState::Walking => AnimationDef {
            frames: 8,
            frame_time: 0.1,
            looping: true,
        },
        AnimationState::Digging => AnimationDef {
            frames: 6,
            frame_time: 0.12,
            looping: false,
        },
        AnimationState::Claiming => AnimationDef {
            frames: 6,
            frame_time: 0.12,
            looping: false,
        },
        AnimationState::Eating => AnimationDef {
            frames: 4,
            frame_time: 0.2,
            looping: true,
        },
        AnimationState::Sleeping => AnimationDef {
            frames: 2,
            frame_time: 0.6,
            looping: true,
        },
        AnimationState::Attacking => AnimationDef {
            frames: 5,
            frame_time: 0.1,
            looping: false,
        },
        AnimationState::Dying => AnimationDef {
            frames: 8,
            frame_time: 0.15,
            looping: false,
        },
    }
}
