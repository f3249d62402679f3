//! Stat recalculation - rebuild current attributes from base + effects
//!
//! Order, fixed:
//! 1. Preserve resources (HP, mana, secondary) and pinned stats
//! 2. Reset every stat to base, except pinned ones
//! 3. Restore pinned values
//! 4. Flat bonuses kept outside the effect list
//! 5. Effect modifiers, buffs then debuffs, in insertion order
//! 6. Clamp resources; drop an undefined secondary resource
//! 7. Character extension adjustments
//! 8. UI refresh (context wrapper only)
//!
//! Resetting before re-applying keeps the result independent of how many
//! times recalculation has already run.

use crate::combatant::{clamp_resource, Combatant, InstanceId};
use crate::context::CombatContext;
use crate::effect::{Effect, StatModifier};
use defs_core::{Attributes, ModifierOp};

impl Combatant {
    /// Rebuild `current` from `base`, bonuses and active effects
    pub fn recalculate(&mut self) {
        // Step 1: Preserve resources and pins
        let hp = self.current.hp;
        let mana = self.current.mana;
        let secondary = self.current.secondary;

        // Step 2 + 3: Reset from base, then restore pins
        let mut next = self.base.clone();
        for (stat, value) in self.pins() {
            next.set(stat, value);
        }

        // Step 4: Flat bonuses
        for (stat, value) in self.bonuses() {
            next.add(stat, value);
        }
        next.dodge_chance += self.properties.bonus_dodge;

        // Step 5: Effects, buffs before debuffs
        let (buffs, debuffs): (Vec<&Effect>, Vec<&Effect>) = self.effects().iter().partition(|e| e.is_buff());
        for effect in buffs.into_iter().chain(debuffs) {
            let stacks = effect.effective_stacks() as f64;
            for modifier in &effect.modifiers {
                apply_modifier(&mut next, &self.base, modifier, stacks);
            }
        }

        // Step 6: Clamp resources
        next.hp = clamp_resource(hp, next.max_hp);
        next.mana = clamp_resource(mana, next.max_mana);
        next.secondary = match next.max_secondary {
            Some(max) => Some(clamp_resource(secondary.unwrap_or(max), max)),
            None => None,
        };

        // Step 7: Extension adjustments
        if let Some(extension) = self.extension() {
            if let Err(err) = extension.adjust_attributes(&self.base, &mut next, &self.properties) {
                tracing::warn!(combatant = %self.instance_id, "Attribute adjustment failed: {}", err);
            }
            next.hp = clamp_resource(next.hp, next.max_hp);
            next.mana = clamp_resource(next.mana, next.max_mana);
        }

        self.current = next;
    }
}

/// Apply one modifier to the running record
pub fn apply_modifier(current: &mut Attributes, base: &Attributes, modifier: &StatModifier, stacks: f64) {
    let stat = modifier.stat;
    let total = if modifier.applies_per_stack {
        modifier.value * stacks
    } else {
        modifier.value
    };

    match modifier.operation {
        ModifierOp::Add => current.add(stat, total),
        ModifierOp::Multiply => current.set(stat, current.get(stat) * total),
        ModifierOp::AddBasePercentage => current.add(stat, base.get(stat) * total),
        ModifierOp::Set => {
            let value = current.get(stat);
            if total > value || same_value(value, base.get(stat)) {
                current.set(stat, total);
            }
        }
    }
}

fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

/// Recalculate a combatant and notify the UI
pub fn recalculate(ctx: &mut CombatContext, id: InstanceId) {
    let Some(combatant) = ctx.roster.get_mut(id) else {
        return;
    };
    combatant.recalculate();
    ctx.ui.refresh(id);
}
