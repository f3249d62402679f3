//! Ability execution - eligibility checks, costs, cooldowns

use super::{AbilityCast, AbilityError};
use crate::combatant::{Combatant, InstanceId};
use crate::context::CombatContext;
use crate::hooks::with_extension;
use crate::observer::AbilityUsed;
use crate::pipeline::floor_stage;
use defs_core::ResourceKind;
use thiserror::Error;

/// Why an ability use did not run its effect
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UseFailure {
    #[error("cannot act right now")]
    CasterUnavailable,
    #[error("has no ability in slot {0}")]
    InvalidIndex(usize),
    #[error("cannot use {0}: it is disabled")]
    AbilityDisabled(String),
    #[error("cannot use {ability}: on cooldown for {turns} more turn(s)")]
    OnCooldown { ability: String, turns: u32 },
    #[error("cannot use {ability}: needs {needed} {resource}, has {available}")]
    InsufficientResource {
        ability: String,
        resource: &'static str,
        needed: f64,
        available: f64,
    },
    #[error("cannot use {0}: no valid target")]
    MissingTarget(String),
    #[error("is stunned")]
    Stunned,
    #[error("is frozen and failed to break free")]
    Frozen,
    #[error("cannot act")]
    CannotAct,
    #[error("cannot use {0}: it has been sealed")]
    DisabledByEffect(String),
    #[error("used {0} but it missed")]
    Missed(String),
    #[error("used {0} but could not find the target")]
    Obscured(String),
    #[error("used {ability} but it failed: {error}")]
    EffectFailed { ability: String, error: AbilityError },
}

/// Result of `use_ability`
#[derive(Debug, Clone, PartialEq)]
pub enum UseOutcome {
    /// Effect ran
    Executed,
    /// Cost paid and cooldown started, but the effect did not run
    Interrupted(UseFailure),
    /// Nothing happened; the combatant has not acted
    Rejected(UseFailure),
    /// Effect function errored; cost refunded and cooldown restored
    Failed(UseFailure),
}

impl UseOutcome {
    /// Whether the combatant is considered to have acted
    pub fn acted(&self) -> bool {
        matches!(self, UseOutcome::Executed | UseOutcome::Interrupted(_))
    }

    pub fn failure(&self) -> Option<&UseFailure> {
        match self {
            UseOutcome::Executed => None,
            UseOutcome::Interrupted(f) | UseOutcome::Rejected(f) | UseOutcome::Failed(f) => Some(f),
        }
    }
}

fn resource_name(resource: ResourceKind) -> &'static str {
    match resource {
        ResourceKind::Mana => "mana",
        ResourceKind::Secondary => "energy",
    }
}

fn available_resource(combatant: &Combatant, resource: ResourceKind) -> f64 {
    match resource {
        ResourceKind::Mana => combatant.current().mana,
        ResourceKind::Secondary => combatant.current().secondary.unwrap_or(0.0),
    }
}

/// Cost after waivers and reductions held by the caster
pub fn effective_cost(combatant: &Combatant, base_cost: f64) -> f64 {
    if combatant.cost_waived() {
        return 0.0;
    }
    floor_stage(base_cost * (1.0 - combatant.cost_reduction())).max(0.0)
}

fn report(ctx: &mut CombatContext, caster: InstanceId, failure: &UseFailure) {
    let name = ctx.name_of(caster);
    tracing::debug!(combatant = %caster, "Ability use did not execute: {}", failure);
    ctx.log.push(format!("{} {}", name, failure));
}

fn reject(ctx: &mut CombatContext, caster: InstanceId, failure: UseFailure) -> UseOutcome {
    report(ctx, caster, &failure);
    UseOutcome::Rejected(failure)
}

fn interrupt(ctx: &mut CombatContext, caster: InstanceId, failure: UseFailure) -> UseOutcome {
    report(ctx, caster, &failure);
    UseOutcome::Interrupted(failure)
}

/// Deduct the cost and start the cooldown
fn pay(ctx: &mut CombatContext, caster: InstanceId, index: usize, resource: ResourceKind, cost: f64) {
    let Some(combatant) = ctx.roster.get_mut(caster) else {
        return;
    };
    match resource {
        ResourceKind::Mana => combatant.set_mana(combatant.mana() - cost),
        ResourceKind::Secondary => {
            let current = combatant.current().secondary.unwrap_or(0.0);
            combatant.set_secondary(current - cost);
        }
    }
    if let Some(ability) = combatant.ability_mut(index) {
        ability.start_cooldown();
    }
}

fn refund(ctx: &mut CombatContext, caster: InstanceId, index: usize, resource: ResourceKind, cost: f64, cooldown: u32) {
    let Some(combatant) = ctx.roster.get_mut(caster) else {
        return;
    };
    match resource {
        ResourceKind::Mana => combatant.set_mana(combatant.mana() + cost),
        ResourceKind::Secondary => {
            let current = combatant.current().secondary.unwrap_or(0.0);
            combatant.set_secondary(current + cost);
        }
    }
    if let Some(ability) = combatant.ability_mut(index) {
        ability.restore_cooldown(cooldown);
    }
}

/// Use the ability in slot `index`
///
/// Checks run in a fixed order and stop at the first failure. Frozen and
/// forced-miss failures still pay the cost and start the cooldown.
pub fn use_ability(ctx: &mut CombatContext, caster: InstanceId, index: usize, target: Option<InstanceId>) -> UseOutcome {
    // Step 1: Structural checks (no state touched)
    if !ctx.roster.is_active(caster) {
        return reject(ctx, caster, UseFailure::CasterUnavailable);
    }
    let Some(combatant) = ctx.roster.get(caster) else {
        return reject(ctx, caster, UseFailure::CasterUnavailable);
    };
    let Some(ability) = combatant.ability(index) else {
        return reject(ctx, caster, UseFailure::InvalidIndex(index));
    };

    let ability_id = ability.id.clone();
    let ability_name = ability.name.clone();

    if ability.is_disabled() {
        return reject(ctx, caster, UseFailure::AbilityDisabled(ability_name));
    }
    if !ability.is_ready() {
        let turns = ability.current_cooldown();
        return reject(ctx, caster, UseFailure::OnCooldown { ability: ability_name, turns });
    }

    // Step 2: Cost
    let resource = ability.resource;
    let cost = effective_cost(combatant, ability.cost);
    let available = available_resource(combatant, resource);
    if available < cost {
        return reject(
            ctx,
            caster,
            UseFailure::InsufficientResource {
                ability: ability_name,
                resource: resource_name(resource),
                needed: cost,
                available,
            },
        );
    }

    if ability.target_type.requires_target() && !target.is_some_and(|t| ctx.roster.is_active(t)) {
        return reject(ctx, caster, UseFailure::MissingTarget(ability_name));
    }

    // Step 3: Crowd control
    if combatant.is_stunned() {
        return reject(ctx, caster, UseFailure::Stunned);
    }

    let freeze = combatant.freeze_break_chance();
    let cannot_act = combatant.cannot_act();
    let sealed = combatant.ability_disabled_by_effect(&ability_id);
    let obscured = combatant.forced_miss_chance();
    let cooldown_reset_chance = combatant.properties.cooldown_reset_chance;
    let cooldown_before = ability.current_cooldown();
    let effect = ability.effect();
    let cast = AbilityCast {
        caster,
        target,
        ability_id: ability_id.clone(),
        target_type: ability.target_type,
        params: ability.params.clone(),
        cost_paid: cost,
    };

    if let Some(chance) = freeze {
        if !ctx.roll(chance) {
            pay(ctx, caster, index, resource, cost);
            return interrupt(ctx, caster, UseFailure::Frozen);
        }
    }
    if cannot_act {
        return reject(ctx, caster, UseFailure::CannotAct);
    }
    if sealed {
        return reject(ctx, caster, UseFailure::DisabledByEffect(ability_name));
    }

    // Step 4: Forced misses
    let environment_miss = ctx.environment.forced_miss_chance;
    if ctx.roll(environment_miss) {
        pay(ctx, caster, index, resource, cost);
        return interrupt(ctx, caster, UseFailure::Missed(ability_name));
    }
    if ctx.roll(obscured) {
        pay(ctx, caster, index, resource, cost);
        return interrupt(ctx, caster, UseFailure::Obscured(ability_name));
    }

    // Step 5: Execute
    pay(ctx, caster, index, resource, cost);
    if let Err(error) = effect.execute(ctx, &cast) {
        tracing::warn!(combatant = %caster, ability = %ability_id, "Ability effect failed: {}", error);
        refund(ctx, caster, index, resource, cost, cooldown_before);
        let failure = UseFailure::EffectFailed {
            ability: ability_name,
            error,
        };
        report(ctx, caster, &failure);
        return UseOutcome::Failed(failure);
    }

    // Step 6: Post-use hooks
    if ctx.roll(cooldown_reset_chance) {
        if let Some(ability) = ctx.roster.get_mut(caster).and_then(|c| c.ability_mut(index)) {
            ability.reset_cooldown();
        }
        tracing::debug!(combatant = %caster, ability = %ability_id, "Cooldown reset");
    }

    let event = AbilityUsed {
        caster,
        ability_id: ability_id.clone(),
        target,
        cost_paid: cost,
    };
    with_extension(ctx, caster, "on_ability_used", (), |ext, ctx| {
        ext.on_ability_used(ctx, caster, &event)
    });
    ctx.observers.ability_used(&event);
    ctx.statistics.record_ability_use(caster, &ability_id);

    let name = ctx.name_of(caster);
    ctx.log.push(format!("{} used {}", name, ability_name));
    UseOutcome::Executed
}
