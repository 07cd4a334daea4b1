//! Animation/timer driver.
//!
//! Advances every per-creature timer each turn: animation frames (loop
//! or one-shot with an `AnimationDone` event), ability cooldowns toward
//! zero, the hunger accumulator toward the hunger stat, and the special
//! and task-search timers. Path interpolation time is owned by the
//! pathing system; everything else ticks here.

use hecs::World;

use crate::components::{Animation, Creature, Timers};
use crate::data::{animation_def, stats_for};
use crate::systems::SimEvent;

pub fn animation_system(world: &mut World, delta_seconds: f32, events: &mut Vec<SimEvent>) {
    for (entity, (creature, anim, timers)) in
        world.query_mut::<(&mut Creature, &mut Animation, &mut Timers)>()
    {
        let def = animation_def(anim.state);

        if !anim.frozen {
            timers.animation_time += delta_seconds;
            while timers.animation_time >= def.frame_time {
                timers.animation_time -= def.frame_time;
                if anim.index + 1 < def.frames {
                    anim.index += 1;
                } else if def.looping {
                    anim.index = 0;
                } else if !anim.done {
                    // One-shot complete: hold the final frame, report once.
                    anim.done = true;
                    events.push(SimEvent::AnimationDone(entity, anim.state));
                }
            }
        }

        for cooldown in timers.power_cooldowns.iter_mut() {
            *cooldown = (*cooldown - delta_seconds).max(0.0);
        }
        timers.special_timer = (timers.special_timer - delta_seconds).max(0.0);
        timers.task_search_timer = (timers.task_search_timer - delta_seconds).max(0.0);

        let hunger_rate = stats_for(creature.kind).hunger_rate;
        if hunger_rate > 0.0 && !creature.is_dying() {
            timers.hunger_accum += hunger_rate * delta_seconds;
            while timers.hunger_accum >= 1.0 {
                timers.hunger_accum -= 1.0;
                creature.add_hunger(1);
            }
        }
    }
}
