//! Damage application
//!
//! Steps, in order:
//! 1. Reject non-positive amounts, dead or untargetable targets
//! 2. Redirection (at most once per hit)
//! 3. Evasion, with parry retaliation
//! 4. Source-specific reduction held by the target
//! 5. Critical roll (source's stats, target's for source-less damage)
//! 6. Outgoing modifiers (`calculate_damage`)
//! 7. Armor / magical resistance, then flat damage reduction
//! 8. Damage-taken multiplier
//! 9. Reflect shield (retaliation deferred)
//! 10. Shield absorbs first, remainder hits HP
//! 11. Bookkeeping on the amounts actually lost
//! 12. Lifesteal, damage hooks, stun break
//! 13. Death check
//! 14. Deferred retaliation

use super::{calculate_mitigated_damage, crit_multiplier, floor_stage, heal, resolve_lethal, DamageOptions, DamageOutcome, HealOptions};
use crate::combatant::InstanceId;
use crate::context::CombatContext;
use crate::hooks::with_extension;
use crate::lifecycle::remove_effect;
use crate::observer::{CriticalHit, Damaged, Dodged};
use defs_core::DamageType;

/// Apply damage from `source` (None for environmental damage) to `target`
pub fn apply_damage(
    ctx: &mut CombatContext,
    target: InstanceId,
    amount: f64,
    damage_type: DamageType,
    source: Option<InstanceId>,
    options: &DamageOptions,
) -> DamageOutcome {
    let mut outcome = DamageOutcome::default();

    // Step 1: Validate
    if !amount.is_finite() || amount <= 0.0 || !ctx.roster.is_active(target) {
        return outcome;
    }
    let Some(defender) = ctx.roster.get(target) else {
        return outcome;
    };
    let untargetable = defender.is_untargetable();
    let redirect = defender.redirect_target();
    let dodge_chance = defender.current().dodge_chance;
    let has_parry = defender.has_parry();

    if untargetable {
        ctx.observers.damaged(&Damaged {
            target,
            source,
            amount: 0.0,
            shield_absorbed: 0.0,
            damage_type,
            is_critical: false,
            ability_id: options.ability_id.clone(),
        });
        return outcome;
    }

    // Step 2: Redirection
    if !options.redirected {
        if let Some(guardian) = redirect.filter(|g| ctx.roster.is_active(*g)) {
            let (protected, protector) = (ctx.name_of(target), ctx.name_of(guardian));
            ctx.log.push(format!("{} takes the hit for {}", protector, protected));
            let redirected = DamageOptions {
                redirected: true,
                ..options.clone()
            };
            return apply_damage(ctx, guardian, amount, damage_type, source, &redirected);
        }
    }

    // Step 3: Evasion
    outcome.recipient = Some(target);
    if ctx.roll(dodge_chance) {
        outcome.is_dodged = true;
        ctx.observers.dodged(&Dodged { target, source });
        ctx.statistics.record_dodge(target);
        let name = ctx.name_of(target);
        ctx.log.push(format!("{} dodged the attack", name));
        with_extension(ctx, target, "on_dodge", (), |ext, ctx| ext.on_dodge(ctx, target, source));

        if has_parry && !options.is_retaliation {
            if let Some(attacker) = source.filter(|s| *s != target && ctx.roster.is_active(*s)) {
                ctx.log.push(format!("{} parries", name));
                apply_damage(ctx, attacker, amount, damage_type, Some(target), &DamageOptions::retaliation());
            }
        }
        return outcome;
    }

    // Step 4: Reduction against this source
    let mut damage = amount;
    if let Some(src) = source {
        let reduction = ctx.roster.get(target).map_or(0.0, |c| c.reduction_against(src));
        damage *= 1.0 - reduction.clamp(0.0, 1.0);
    }

    // Step 5: Critical roll
    let (crit_chance, raw_multiplier) = source
        .and_then(|s| ctx.roster.get(s))
        .or_else(|| ctx.roster.get(target))
        .map_or((0.0, 0.0), |c| (c.current().crit_chance, c.current().crit_multiplier));
    if options.can_crit && ctx.roll(crit_chance) {
        damage *= crit_multiplier(raw_multiplier, ctx);
        outcome.is_critical = true;
    }
    damage = floor_stage(damage);

    // Step 6: Outgoing modifiers
    damage = calculate_damage(ctx, source, target, damage);

    // Step 7: Mitigation
    let minimum = ctx.constants.damage.minimum;
    if let Some(defender) = ctx.roster.get(target) {
        if !options.bypass_mitigation {
            damage = calculate_mitigated_damage(damage, damage_type, defender.current(), &ctx.constants);
        }
        let flat = defender.current().damage_reduction;
        if flat > 0.0 {
            damage = floor_stage(damage * (1.0 - flat.clamp(0.0, 1.0))).max(minimum);
        }
    }

    // Step 8: Damage-taken multiplier
    let (taken_multiplier, reflect) = ctx
        .roster
        .get(target)
        .map_or((1.0, None), |c| (c.damage_taken_multiplier(), c.reflect_shield()));
    damage = floor_stage(damage * taken_multiplier).max(0.0);

    // Step 9: Reflect shield
    let mut retaliation = None;
    if !options.is_retaliation {
        if let (Some(shield), Some(src)) = (reflect, source.filter(|s| *s != target)) {
            retaliation = Some((src, floor_stage(damage * shield.retaliation)));
            damage = floor_stage(damage * (1.0 - shield.damage_reduction.clamp(0.0, 1.0)));
        }
    }

    // Step 10: Shield, then HP
    let Some(defender) = ctx.roster.get_mut(target) else {
        return outcome;
    };
    let previous_hp = defender.hp();
    let previous_shield = defender.shield();
    let absorbed = previous_shield.min(damage);
    defender.set_shield(previous_shield - absorbed);
    defender.set_hp(previous_hp - (damage - absorbed));

    // Step 11: Bookkeeping on actual loss
    let actual = previous_hp - defender.hp();
    let shield_absorbed = previous_shield - defender.shield();
    let survived = defender.hp() > 0.0;
    outcome.damage = actual;
    outcome.shield_absorbed = shield_absorbed;

    let event = Damaged {
        target,
        source,
        amount: actual,
        shield_absorbed,
        damage_type,
        is_critical: outcome.is_critical,
        ability_id: options.ability_id.clone(),
    };
    ctx.statistics.record_damage(source, target, actual, damage_type);
    if shield_absorbed > 0.0 {
        ctx.statistics.record_shield_absorbed(target, shield_absorbed);
    }
    ctx.observers.damaged(&event);
    if outcome.is_critical {
        ctx.observers.critical_hit(&CriticalHit {
            source,
            target,
            amount: actual,
            is_heal: false,
        });
    }

    tracing::debug!(
        target = %target,
        source = ?source,
        requested = amount,
        damage = actual,
        shield_absorbed,
        critical = outcome.is_critical,
        "Damage applied"
    );
    let line = damage_line(ctx, target, source, actual, shield_absorbed, outcome.is_critical);
    ctx.log.push(line);

    // Step 12: On-damage side effects
    if actual > 0.0 {
        if let Some(src) = source.filter(|s| *s != target) {
            let lifesteal = ctx
                .roster
                .get(src)
                .filter(|c| c.is_alive())
                .map_or(0.0, |c| c.current().lifesteal);
            if lifesteal > 0.0 {
                heal(ctx, src, floor_stage(actual * lifesteal), Some(src), &HealOptions::passive());
            }
        }

        with_extension(ctx, target, "on_damage_taken", (), |ext, ctx| {
            ext.on_damage_taken(ctx, target, &event)
        });
        if let Some(src) = source {
            with_extension(ctx, src, "on_damage_dealt", (), |ext, ctx| {
                ext.on_damage_dealt(ctx, src, &event)
            });
        }

        if survived {
            break_stun(ctx, target);
        }
    }

    // Step 13: Death check
    let lethal = ctx
        .roster
        .get(target)
        .is_some_and(|c| !c.is_dead() && c.hp() <= 0.0);
    if lethal {
        outcome.killed = resolve_lethal(ctx, target, source);
    }

    // Step 14: Deferred retaliation
    if let Some((src, amount)) = retaliation {
        if amount > 0.0 && ctx.roster.is_active(src) {
            let name = ctx.name_of(target);
            ctx.log.push(format!("{}'s shield strikes back", name));
            apply_damage(ctx, src, amount, DamageType::Magical, Some(target), &DamageOptions::retaliation());
        }
    }

    outcome
}

/// Apply source-side and battlefield modifiers to a hit
///
/// Order: source's outgoing multiplier, bonus per debuff on the target,
/// environment multiplier and reduction, amplification held by the target
/// against this source, faction bonus, then the source's extension.
/// Floored, with the configured minimum.
pub fn calculate_damage(ctx: &CombatContext, source: Option<InstanceId>, target: InstanceId, amount: f64) -> f64 {
    let mut damage = amount;
    let attacker = source.and_then(|s| ctx.roster.get(s));
    let defender = ctx.roster.get(target);

    if let Some(attacker) = attacker {
        damage *= attacker.outgoing_damage_multiplier();
        let per_debuff = attacker.properties.bonus_damage_per_debuff;
        if let Some(defender) = defender.filter(|_| per_debuff != 0.0) {
            damage *= 1.0 + per_debuff * defender.debuffs().count() as f64;
        }
    }

    damage *= ctx.environment.damage_multiplier;
    damage *= 1.0 - ctx.environment.damage_reduction.clamp(0.0, 1.0);

    if let (Some(attacker), Some(defender)) = (attacker, defender) {
        damage *= 1.0 + defender.amplification_from(attacker.instance_id());

        let favored = attacker.properties.favored_faction.as_deref();
        if favored.is_some() && favored == defender.faction.as_deref() {
            damage *= 1.0 + attacker.properties.faction_damage_bonus;
        }

        if let Some(extension) = attacker.extension() {
            damage = extension.modify_outgoing_damage(attacker, defender, damage);
        }
    }

    if !damage.is_finite() {
        damage = 0.0;
    }
    floor_stage(damage).max(ctx.constants.damage.minimum)
}

/// Roll to shake off the first stun-type debuff after taking a hit
fn break_stun(ctx: &mut CombatContext, target: InstanceId) {
    let stun = ctx
        .roster
        .get(target)
        .and_then(|c| c.debuffs().find(|e| e.is_stun()).map(|e| e.id.clone()));
    let Some(stun_id) = stun else {
        return;
    };
    let chance = ctx.constants.control.stun_break_on_hit_chance;
    if ctx.roll(chance) {
        remove_effect(ctx, target, &stun_id, false);
        let name = ctx.name_of(target);
        ctx.log.push(format!("{} was knocked out of the stun", name));
    }
}

fn damage_line(
    ctx: &CombatContext,
    target: InstanceId,
    source: Option<InstanceId>,
    damage: f64,
    absorbed: f64,
    critical: bool,
) -> String {
    let victim = ctx.name_of(target);
    let mut line = match source.filter(|s| *s != target) {
        Some(src) => format!("{} hits {} for {} damage", ctx.name_of(src), victim, damage),
        None => format!("{} takes {} damage", victim, damage),
    };
    if absorbed > 0.0 {
        line.push_str(&format!(" ({} absorbed)", absorbed));
    }
    if critical {
        line.push_str(" - critical!");
    }
    line
}
