//! Healing
//!
//! Steps, in order:
//! 1. No-op when healing is disabled for the battlefield or the target
//! 2. Target's healing-received bonus
//! 3. Critical roll (healer's stats)
//! 4. Healer's healing power: floor(amount * (1 + healing_power))
//! 5. Clamp to missing HP; with overheal the excess becomes shield
//! 6. Hooks, mana-on-heal, heal echo

use super::{crit_multiplier, floor_stage, HealOptions, HealOutcome};
use crate::combatant::InstanceId;
use crate::context::CombatContext;
use crate::hooks::with_extension;
use crate::observer::{CriticalHit, Healed};

/// Heal `target` by `amount`, credited to `healer`
pub fn heal(
    ctx: &mut CombatContext,
    target: InstanceId,
    amount: f64,
    healer: Option<InstanceId>,
    options: &HealOptions,
) -> HealOutcome {
    let mut outcome = HealOutcome::default();

    // Step 1: Blocked healing
    if !amount.is_finite() || amount <= 0.0 || !ctx.roster.is_active(target) {
        return outcome;
    }
    let Some(patient) = ctx.roster.get(target) else {
        return outcome;
    };
    if ctx.environment.healing_disabled || patient.cannot_be_healed() {
        tracing::debug!(target = %target, "Healing blocked");
        return outcome;
    }

    // Step 2: Healing received
    let mut healing = amount * (1.0 + patient.current().healing_received);

    // Step 3: Critical roll
    let (crit_chance, raw_multiplier, healing_power) = healer
        .and_then(|h| ctx.roster.get(h))
        .map_or((0.0, 0.0, 0.0), |c| {
            let stats = c.current();
            (stats.crit_chance, stats.crit_multiplier, stats.healing_power)
        });
    if options.can_crit && ctx.roll(crit_chance) {
        healing = floor_stage(healing * crit_multiplier(raw_multiplier, ctx));
        outcome.is_critical = true;
    }

    // Step 4: Healing power
    healing = floor_stage(healing * (1.0 + healing_power));
    if !healing.is_finite() || healing <= 0.0 {
        return outcome;
    }

    // Step 5: Apply
    let Some(patient) = ctx.roster.get_mut(target) else {
        return outcome;
    };
    let previous_hp = patient.hp();
    let missing = (patient.max_hp() - previous_hp).max(0.0);
    patient.set_hp(previous_hp + healing.min(missing));
    if options.allow_overheal && healing > missing {
        let excess = healing - missing;
        patient.add_shield(excess);
        outcome.shield_gained = excess;
    }
    let actual = patient.hp() - previous_hp;
    outcome.amount = actual;

    if actual <= 0.0 && outcome.shield_gained <= 0.0 {
        return outcome;
    }

    // Step 6: Notifications and side effects
    let event = Healed {
        target,
        healer,
        amount: actual,
        is_critical: outcome.is_critical,
    };
    ctx.statistics.record_healing(healer, target, actual);
    ctx.observers.healed(&event);
    if outcome.is_critical {
        ctx.observers.critical_hit(&CriticalHit {
            source: healer,
            target,
            amount: actual,
            is_heal: true,
        });
    }
    tracing::debug!(target = %target, healer = ?healer, healed = actual, shield = outcome.shield_gained, "Heal applied");
    let line = heal_line(ctx, target, healer, actual, outcome.is_critical);
    ctx.log.push(line);

    with_extension(ctx, target, "on_heal_received", (), |ext, ctx| {
        ext.on_heal_received(ctx, target, &event)
    });

    if !options.is_passive {
        restore_mana_on_heal(ctx, healer);
        echo_heal(ctx, target, healer, actual);
    }

    outcome
}

/// Healer's mana-on-heal talent
fn restore_mana_on_heal(ctx: &mut CombatContext, healer: Option<InstanceId>) {
    let Some(caster) = healer.and_then(|h| ctx.roster.get_mut(h)) else {
        return;
    };
    let mana = caster.properties.mana_on_heal;
    if mana > 0.0 && caster.is_alive() && !caster.cannot_restore_mana() {
        caster.set_mana(caster.mana() + mana);
    }
}

/// Share part of a heal with a linked partner
fn echo_heal(ctx: &mut CombatContext, target: InstanceId, healer: Option<InstanceId>, healed: f64) {
    let Some(echo) = ctx.roster.get(target).and_then(|c| c.heal_echo()) else {
        return;
    };
    if echo.partner == target || !ctx.roster.is_active(echo.partner) {
        return;
    }
    let amount = floor_stage(healed * echo.fraction);
    if amount > 0.0 {
        heal(ctx, echo.partner, amount, healer, &HealOptions::passive());
    }
}

fn heal_line(ctx: &CombatContext, target: InstanceId, healer: Option<InstanceId>, amount: f64, critical: bool) -> String {
    let patient = ctx.name_of(target);
    let mut line = match healer.filter(|h| *h != target) {
        Some(h) => format!("{} heals {} for {}", ctx.name_of(h), patient, amount),
        None => format!("{} recovers {} HP", patient, amount),
    };
    if critical {
        line.push_str(" - critical!");
    }
    line
}
