//! Combatant lifecycle - effects attach/detach, per-turn processing, death
//!
//! Per-turn order:
//! 1. Turn-start callbacks of every effect, then the character's own hook
//! 2. Cleanse roll
//! 3. Buffs then debuffs, newest first: tick payload, turn-end, duration
//! 4. Ability disable counters (every turn) and cooldowns (full rounds)
//! 5. Regeneration
//! 6. Shield from buff count
//! 7. UI refresh
//!
//! A death during step 3 stops processing for that combatant.

use crate::combatant::{Combatant, InstanceId};
use crate::context::CombatContext;
use crate::effect::{run_attached, run_detached, Effect, EffectHook};
use crate::hooks::with_extension;
use crate::observer::{Damaged, Died, EffectApplied, EffectRemoved, Summoned};
use crate::pipeline::{heal, resolve_lethal, HealOptions};
use crate::stats::recalculate;
use defs_core::DamageType;

/// Switches supplied by the match director each turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnOptions {
    /// True once per full round: durations and cooldowns count down
    pub reduce_durations: bool,
    pub regenerate: bool,
}

impl TurnOptions {
    pub fn full_round() -> Self {
        TurnOptions {
            reduce_durations: true,
            regenerate: true,
        }
    }
}

/// What happened to one combatant during `process_turn`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    pub died: bool,
    /// Effect ids that ran out, in processing order
    pub expired: Vec<String>,
    pub dot_damage: f64,
    pub regenerated_hp: f64,
    pub regenerated_mana: f64,
}

// === Effects ===

/// Attach an effect (or merge it into an existing one with the same id)
///
/// Returns false if the target is not an active combatant.
pub fn apply_effect(ctx: &mut CombatContext, target: InstanceId, effect: Effect) -> bool {
    if !ctx.roster.is_active(target) {
        return false;
    }
    let Some(combatant) = ctx.roster.get_mut(target) else {
        return false;
    };

    let id = effect.id.clone();
    let name = effect.name.clone();
    let kind = effect.kind;
    let applied_by = effect.applied_by;

    let merged = match combatant.effect_mut(&id) {
        Some(existing) => {
            existing.merge(effect);
            true
        }
        None => {
            combatant.push_effect(effect);
            false
        }
    };
    let stacks = combatant.effect(&id).map_or(1, Effect::effective_stacks);

    if !merged {
        run_attached(ctx, target, &id, EffectHook::Apply);
    }
    recalculate(ctx, target);

    ctx.observers.effect_applied(&EffectApplied {
        target,
        effect_id: id.clone(),
        kind,
        applied_by,
        stacks,
    });
    ctx.statistics.record_status_effect(applied_by, target, &id);
    tracing::debug!(target = %target, effect = %id, stacks, merged, "Effect applied");

    let who = ctx.name_of(target);
    let line = if merged && stacks > 1 {
        format!("{}'s {} grows to {} stacks", who, name, stacks)
    } else {
        format!("{} is affected by {}", who, name)
    };
    ctx.log.push(line);
    true
}

/// Detach an effect, run its removal callback and recalculate
pub fn remove_effect(ctx: &mut CombatContext, target: InstanceId, effect_id: &str, expired: bool) -> Option<Effect> {
    let mut effect = ctx.roster.get_mut(target)?.detach_effect(effect_id)?;

    run_detached(ctx, target, &mut effect, EffectHook::Remove);
    recalculate(ctx, target);

    ctx.observers.effect_removed(&EffectRemoved {
        target,
        effect_id: effect.id.clone(),
        kind: effect.kind,
        expired,
    });
    tracing::debug!(target = %target, effect = %effect.id, expired, "Effect removed");

    let who = ctx.name_of(target);
    let line = if expired {
        format!("{} wore off from {}", effect.name, who)
    } else {
        format!("{} is no longer affected by {}", who, effect.name)
    };
    ctx.log.push(line);
    Some(effect)
}

/// Strip every debuff; returns the removed ids
pub fn cleanse(ctx: &mut CombatContext, target: InstanceId) -> Vec<String> {
    let debuffs: Vec<String> = ctx
        .roster
        .get(target)
        .map(|c| c.debuffs().map(|e| e.id.clone()).collect())
        .unwrap_or_default();

    debuffs
        .into_iter()
        .filter(|id| remove_effect(ctx, target, id, false).is_some())
        .collect()
}

// === Per-turn processing ===

/// Process one turn for a combatant
pub fn process_turn(ctx: &mut CombatContext, id: InstanceId, options: TurnOptions) -> TurnReport {
    let mut report = TurnReport::default();
    if !ctx.roster.is_active(id) {
        return report;
    }

    // Step 1: Turn-start callbacks
    for effect_id in effect_ids(ctx, id, |_| true) {
        run_attached(ctx, id, &effect_id, EffectHook::TurnStart);
    }
    with_extension(ctx, id, "on_turn_start", (), |ext, ctx| ext.on_turn_start(ctx, id));

    // Step 2: Cleanse roll
    let cleanse_chance = ctx.roster.get(id).map_or(0.0, |c| c.properties.cleanse_chance);
    let has_debuffs = ctx.roster.get(id).is_some_and(|c| c.debuffs().next().is_some());
    if has_debuffs && ctx.roll(cleanse_chance) {
        let removed = cleanse(ctx, id);
        let name = ctx.name_of(id);
        ctx.log.push(format!("{} shakes off {} debuff(s)", name, removed.len()));
    }

    // Step 3: Effects, buffs then debuffs, newest first
    let mut order = effect_ids(ctx, id, Effect::is_buff);
    order.reverse();
    let mut debuffs = effect_ids(ctx, id, Effect::is_debuff);
    debuffs.reverse();
    order.extend(debuffs);

    for effect_id in order {
        if !ctx.roster.is_active(id) {
            break;
        }
        if !ctx.roster.get(id).is_some_and(|c| c.has_effect(&effect_id)) {
            continue;
        }

        run_attached(ctx, id, &effect_id, EffectHook::Tick);
        if tick_payload(ctx, id, &effect_id, &mut report) {
            break;
        }

        if options.reduce_durations {
            run_attached(ctx, id, &effect_id, EffectHook::TurnEnd);
            let ran_out = ctx
                .roster
                .get_mut(id)
                .and_then(|c| c.effect_mut(&effect_id))
                .is_some_and(Effect::tick_duration);
            if ran_out && remove_effect(ctx, id, &effect_id, true).is_some() {
                report.expired.push(effect_id);
            }
        }
    }

    report.died = ctx.roster.get(id).is_some_and(Combatant::is_dead);
    if report.died {
        ctx.ui.refresh(id);
        return report;
    }

    // Step 4: Ability counters
    tick_abilities(ctx, id, options.reduce_durations);

    // Step 5: Regeneration
    if options.regenerate {
        regenerate(ctx, id, &mut report);
    }

    // Step 6: Shield from buffs
    if let Some(combatant) = ctx.roster.get_mut(id) {
        let per_buff = combatant.properties.shield_per_buff;
        if per_buff > 0.0 {
            let buffs = combatant.buffs().count() as f64;
            combatant.set_shield((per_buff * buffs).floor());
        }
    }

    // Step 7: UI
    ctx.ui.refresh(id);
    report
}

fn effect_ids(ctx: &CombatContext, id: InstanceId, filter: impl Fn(&Effect) -> bool) -> Vec<String> {
    ctx.roster
        .get(id)
        .map(|c| c.effects().iter().filter(|e| filter(*e)).map(|e| e.id.clone()).collect())
        .unwrap_or_default()
}

/// Built-in damage/heal over time; returns true if the combatant died
fn tick_payload(ctx: &mut CombatContext, id: InstanceId, effect_id: &str, report: &mut TurnReport) -> bool {
    let Some(effect) = ctx.roster.get(id).and_then(|c| c.effect(effect_id)) else {
        return false;
    };
    let dot = effect.dot_damage().floor();
    let hot = effect.hot_heal().floor();
    let source = effect.applied_by;
    let ability_id = effect.ability_id.clone();
    let effect_name = effect.name.clone();

    if dot > 0.0 {
        // Straight to HP: not dodgeable, not mitigated
        let Some(combatant) = ctx.roster.get_mut(id) else {
            return false;
        };
        let before = combatant.hp();
        combatant.set_hp(before - dot);
        let lost = before - combatant.hp();
        let lethal = combatant.hp() <= 0.0;
        report.dot_damage += lost;

        ctx.statistics.record_damage(source, id, lost, DamageType::True);
        ctx.observers.damaged(&Damaged {
            target: id,
            source,
            amount: lost,
            shield_absorbed: 0.0,
            damage_type: DamageType::True,
            is_critical: false,
            ability_id,
        });
        let name = ctx.name_of(id);
        ctx.log.push(format!("{} suffers {} damage from {}", name, lost, effect_name));

        if lethal && resolve_lethal(ctx, id, source) {
            return true;
        }
    }

    if hot > 0.0 {
        heal(ctx, id, hot, source, &HealOptions::passive());
    }
    false
}

fn tick_abilities(ctx: &mut CombatContext, id: InstanceId, reduce_cooldowns: bool) {
    let Some(combatant) = ctx.roster.get_mut(id) else {
        return;
    };
    let mut restored = Vec::new();
    for ability in combatant.abilities.iter_mut() {
        if ability.tick_disabled() {
            restored.push(ability.name.clone());
        }
        if reduce_cooldowns {
            ability.reduce_cooldown(1);
        }
    }
    let name = combatant.name.clone();
    for ability in restored {
        ctx.log.push(format!("{}'s {} can be used again", name, ability));
    }
}

/// Per-turn HP and mana regeneration
fn regenerate(ctx: &mut CombatContext, id: InstanceId, report: &mut TurnReport) {
    let healing_disabled = ctx.environment.healing_disabled;
    let flat_heal = ctx.environment.heal_per_turn;
    let percent_heal = ctx.environment.percent_heal_per_turn;
    let Some(combatant) = ctx.roster.get_mut(id) else {
        return;
    };

    let stats = combatant.current();
    let properties = &combatant.properties;
    let hp_gain = stats.hp_per_turn
        + flat_heal
        + (percent_heal + properties.percent_hp_regen) * stats.max_hp
        + properties.missing_hp_regen * stats.missing_hp();
    let mana_gain = stats.mana_per_turn + properties.percent_mana_regen * stats.max_mana;

    if hp_gain > 0.0 && !healing_disabled && !combatant.cannot_be_healed() {
        let before = combatant.hp();
        combatant.set_hp(before + hp_gain.floor());
        report.regenerated_hp = combatant.hp() - before;
    }
    if mana_gain > 0.0 && !combatant.cannot_restore_mana() {
        let before = combatant.mana();
        combatant.set_mana(before + mana_gain.floor());
        report.regenerated_mana = combatant.mana() - before;
    }

    with_extension(ctx, id, "on_regenerate", (), |ext, ctx| ext.on_regenerate(ctx, id));
}

// === Entering and leaving the battle ===

/// Recalculate and fill resources before the first turn
pub fn enter_battle(ctx: &mut CombatContext, id: InstanceId) {
    let Some(combatant) = ctx.roster.get_mut(id) else {
        return;
    };
    combatant.recalculate();
    let max_hp = combatant.max_hp();
    let max_mana = combatant.current().max_mana;
    combatant.set_hp(max_hp);
    combatant.set_mana(max_mana);
    if let Some(max) = combatant.current().max_secondary {
        combatant.set_secondary(max);
    }
    let name = combatant.name.clone();
    tracing::debug!(combatant = %id, "Entered battle");
    ctx.log.push(format!("{} enters the battle", name));
    ctx.ui.refresh(id);
}

/// Add a combatant mid-battle
pub fn summon(ctx: &mut CombatContext, combatant: Combatant, summoner: Option<InstanceId>) -> InstanceId {
    let id = ctx.roster.add(combatant);
    enter_battle(ctx, id);
    ctx.observers.summoned(&Summoned { summoned: id, summoner });
    tracing::info!(combatant = %id, summoner = ?summoner, "Combatant summoned");
    id
}

/// Mark a combatant dead and remove it from the active set
pub fn finalize_death(ctx: &mut CombatContext, id: InstanceId, killer: Option<InstanceId>) {
    let Some(combatant) = ctx.roster.get_mut(id) else {
        return;
    };
    if combatant.dead {
        return;
    }
    combatant.dead = true;
    combatant.set_hp(0.0);
    combatant.set_shield(0.0);
    let name = combatant.name.clone();
    ctx.roster.deactivate(id);

    ctx.observers.died(&Died { target: id, killer });
    tracing::info!(combatant = %id, killer = ?killer, "Combatant died");
    ctx.log.push(format!("{} has fallen", name));

    if let Some(killer) = killer.filter(|k| *k != id) {
        with_extension(ctx, killer, "on_kill", (), |ext, ctx| ext.on_kill(ctx, killer, id));
    }
    ctx.ui.refresh(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Team;
    use crate::config::GameConstants;
    use crate::effect::{EffectBehavior, EffectDuration, EffectFlags, StatModifier};
    use crate::hooks::{CharacterExtension, HookError};
    use defs_core::{Attributes, Stat};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Counter {
        applied: Rc<Cell<u32>>,
        removed: Rc<Cell<u32>>,
        ticks: Rc<Cell<u32>>,
    }

    impl EffectBehavior for Counter {
        fn on_apply(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
            self.applied.set(self.applied.get() + 1);
            Ok(())
        }

        fn on_remove(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
            self.removed.set(self.removed.get() + 1);
            Ok(())
        }

        fn on_tick(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
            self.ticks.set(self.ticks.get() + 1);
            Ok(())
        }
    }

    fn setup() -> (CombatContext, InstanceId) {
        let mut ctx = CombatContext::with_seed(GameConstants::default(), 11);
        let id = ctx
            .roster
            .add(Combatant::new("ranger", "Ranger", Attributes::default(), Team::Player));
        (ctx, id)
    }

    #[test]
    fn test_duration_counts_down_then_expires() {
        let (mut ctx, id) = setup();
        let counter = Counter::default();
        let effect = Effect::buff("haste", "Haste", EffectDuration::Turns(2))
            .with_modifier(StatModifier::add(Stat::Speed, 20.0))
            .with_behavior(counter.clone());
        assert!(apply_effect(&mut ctx, id, effect));
        assert_eq!(counter.applied.get(), 1);
        assert!((ctx.roster.get(id).unwrap().current().speed - 120.0).abs() < f64::EPSILON);

        let report = process_turn(&mut ctx, id, TurnOptions::full_round());
        let haste = ctx.roster.get(id).unwrap().effect("haste").unwrap();
        assert_eq!(haste.duration, EffectDuration::Turns(1));
        assert!(report.expired.is_empty());

        let report = process_turn(&mut ctx, id, TurnOptions::full_round());
        assert_eq!(report.expired, vec!["haste".to_string()]);
        assert_eq!(counter.removed.get(), 1);
        assert!(!ctx.roster.get(id).unwrap().has_effect("haste"));
        assert!((ctx.roster.get(id).unwrap().current().speed - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_durations_hold_without_reduce() {
        let (mut ctx, id) = setup();
        apply_effect(&mut ctx, id, Effect::buff("ward", "Ward", EffectDuration::Turns(1)));
        process_turn(&mut ctx, id, TurnOptions::default());
        assert!(ctx.roster.get(id).unwrap().has_effect("ward"));
    }

    #[test]
    fn test_reapply_merges() {
        let (mut ctx, id) = setup();
        let counter = Counter::default();
        let bleed = Effect::debuff("bleed", "Bleed", EffectDuration::Turns(2))
            .with_stacking(3)
            .with_behavior(counter.clone());
        for _ in 0..5 {
            apply_effect(&mut ctx, id, bleed.clone());
        }
        let combatant = ctx.roster.get(id).unwrap();
        assert_eq!(combatant.effects().len(), 1);
        assert_eq!(combatant.effect("bleed").unwrap().stacks, 3);
        assert_eq!(counter.applied.get(), 1);
    }

    #[test]
    fn test_dot_death_stops_processing() {
        let (mut ctx, id) = setup();
        ctx.roster.get_mut(id).unwrap().set_hp(15.0);
        let counter = Counter::default();
        // Buffs run before debuffs, so put the counter on a debuff applied first
        apply_effect(
            &mut ctx,
            id,
            Effect::debuff("hex", "Hex", EffectDuration::Turns(3)).with_behavior(counter.clone()),
        );
        apply_effect(
            &mut ctx,
            id,
            Effect::debuff("poison", "Poison", EffectDuration::Turns(3)).with_flags(EffectFlags {
                damage_per_turn: Some(20.0),
                ..Default::default()
            }),
        );

        let report = process_turn(&mut ctx, id, TurnOptions::full_round());

        assert!(report.died);
        assert!((report.dot_damage - 15.0).abs() < f64::EPSILON);
        assert_eq!(counter.ticks.get(), 0);
        assert!(!ctx.roster.is_active(id));
    }

    #[test]
    fn test_dot_ignores_armor_and_dodge() {
        let (mut ctx, id) = setup();
        {
            let c = ctx.roster.get_mut(id).unwrap();
            c.base_mut().armor = 1000.0;
            c.base_mut().dodge_chance = 1.0;
            c.recalculate();
        }
        apply_effect(
            &mut ctx,
            id,
            Effect::debuff("burn", "Burn", EffectDuration::Turns(3)).with_flags(EffectFlags {
                damage_per_turn: Some(10.0),
                ..Default::default()
            }),
        );
        process_turn(&mut ctx, id, TurnOptions::default());
        assert!((ctx.roster.get(id).unwrap().hp() - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ability_counters() {
        use crate::ability::{Ability, AbilityCast, AbilityEffect, AbilityError};
        use defs_core::AbilityDescriptor;
        use std::sync::Arc;

        struct Noop;
        impl AbilityEffect for Noop {
            fn execute(&self, _ctx: &mut CombatContext, _cast: &AbilityCast) -> Result<(), AbilityError> {
                Ok(())
            }
        }

        let (mut ctx, id) = setup();
        {
            let c = ctx.roster.get_mut(id).unwrap();
            let mut ability = Ability::new(&AbilityDescriptor::new("volley", "Volley").with_cooldown(2), Arc::new(Noop));
            ability.start_cooldown();
            ability.disable(1);
            c.abilities.push(ability);
        }

        process_turn(&mut ctx, id, TurnOptions::default());
        let ability = ctx.roster.get(id).unwrap().ability(0).unwrap();
        assert!(!ability.is_disabled());
        assert_eq!(ability.current_cooldown(), 2);

        process_turn(&mut ctx, id, TurnOptions::full_round());
        assert_eq!(ctx.roster.get(id).unwrap().ability(0).unwrap().current_cooldown(), 1);
    }

    #[test]
    fn test_regeneration_respects_blocks() {
        let (mut ctx, id) = setup();
        {
            let c = ctx.roster.get_mut(id).unwrap();
            c.base_mut().hp_per_turn = 5.0;
            c.base_mut().mana_per_turn = 10.0;
            c.properties.percent_hp_regen = 0.1;
            c.recalculate();
            c.set_hp(50.0);
            c.set_mana(50.0);
        }
        apply_effect(
            &mut ctx,
            id,
            Effect::debuff("silence", "Silence", EffectDuration::Turns(3)).with_flags(EffectFlags {
                cannot_restore_mana: true,
                ..Default::default()
            }),
        );

        let report = process_turn(&mut ctx, id, TurnOptions::full_round());

        assert!((report.regenerated_hp - 15.0).abs() < f64::EPSILON);
        assert!((report.regenerated_mana - 0.0).abs() < f64::EPSILON);
        assert!((ctx.roster.get(id).unwrap().mana() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cleanse_and_buff_shield() {
        let (mut ctx, id) = setup();
        {
            let c = ctx.roster.get_mut(id).unwrap();
            c.properties.cleanse_chance = 1.0;
            c.properties.shield_per_buff = 12.5;
        }
        apply_effect(&mut ctx, id, Effect::debuff("slow", "Slow", EffectDuration::Turns(3)));
        apply_effect(&mut ctx, id, Effect::buff("a", "A", EffectDuration::Permanent));
        apply_effect(&mut ctx, id, Effect::buff("b", "B", EffectDuration::Permanent));

        process_turn(&mut ctx, id, TurnOptions::default());

        let c = ctx.roster.get(id).unwrap();
        assert_eq!(c.debuffs().count(), 0);
        assert!((c.shield() - 25.0).abs() < f64::EPSILON);
    }

    struct Reaper {
        kills: Rc<Cell<u32>>,
    }

    impl CharacterExtension for Reaper {
        fn on_kill(&mut self, _ctx: &mut CombatContext, _me: InstanceId, _victim: InstanceId) -> Result<(), HookError> {
            self.kills.set(self.kills.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_finalize_death_runs_once() {
        let (mut ctx, victim) = setup();
        let kills = Rc::new(Cell::new(0));
        let reaper = ctx.roster.add(
            Combatant::new("reaper", "Reaper", Attributes::default(), Team::Opponent)
                .with_extension(Reaper { kills: kills.clone() }),
        );

        finalize_death(&mut ctx, victim, Some(reaper));
        finalize_death(&mut ctx, victim, Some(reaper));

        assert_eq!(kills.get(), 1);
        assert!(ctx.roster.get(victim).unwrap().is_dead());
        assert!(!ctx.roster.active_ids().contains(&victim));
        assert!(ctx.log.contains("Ranger has fallen"));
    }

    #[test]
    fn test_summon_enters_at_full_resources() {
        let (mut ctx, id) = setup();
        let mut wolf = Combatant::new("wolf", "Wolf", Attributes::default(), Team::Player);
        wolf.set_hp(1.0);
        let wolf = summon(&mut ctx, wolf, Some(id));
        assert!(ctx.roster.is_active(wolf));
        assert!((ctx.roster.get(wolf).unwrap().hp() - 100.0).abs() < f64::EPSILON);
        assert_eq!(ctx.roster.allies(id), vec![id, wolf]);
    }
}
