//! Per-character strategy objects
//!
//! Behaviour unique to one character lives in a `CharacterExtension` attached
//! to the combatant when it is created. The generic pipeline only ever calls
//! the hook points below and never branches on a character id.

use crate::combatant::{CharacterProperties, Combatant, InstanceId};
use crate::context::CombatContext;
use crate::observer::{AbilityUsed, Damaged, Healed};
use defs_core::{Attributes, PassiveDescriptor};
use std::fmt;
use thiserror::Error;

/// Error returned by user-supplied callbacks
///
/// Callers log it and carry on as if the callback did nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HookError {
    #[error("Combatant not found: {0}")]
    MissingCombatant(InstanceId),
    #[error("Missing property '{0}'")]
    MissingProperty(String),
    #[error("{0}")]
    Failed(String),
}

/// Answer to a "would die" notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeathVerdict {
    #[default]
    Allow,
    /// Veto the death; the combatant is left on at least 1 HP
    Prevent,
}

/// Hook points for character-specific behaviour
///
/// All methods default to no-ops.
pub trait CharacterExtension {
    /// Last step of recalculation, for bonuses that accumulate outside the effect list
    ///
    /// Must be a pure function of its inputs.
    fn adjust_attributes(
        &self,
        _base: &Attributes,
        _current: &mut Attributes,
        _properties: &CharacterProperties,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Innate passive's turn-start hook
    fn on_turn_start(&mut self, _ctx: &mut CombatContext, _me: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    /// Resource conversions run during regeneration
    fn on_regenerate(&mut self, _ctx: &mut CombatContext, _me: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    /// Last source-side adjustment of outgoing damage
    fn modify_outgoing_damage(&self, _attacker: &Combatant, _target: &Combatant, amount: f64) -> f64 {
        amount
    }

    fn on_damage_taken(&mut self, _ctx: &mut CombatContext, _me: InstanceId, _event: &Damaged) -> Result<(), HookError> {
        Ok(())
    }

    fn on_damage_dealt(&mut self, _ctx: &mut CombatContext, _me: InstanceId, _event: &Damaged) -> Result<(), HookError> {
        Ok(())
    }

    fn on_dodge(
        &mut self,
        _ctx: &mut CombatContext,
        _me: InstanceId,
        _attacker: Option<InstanceId>,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn on_heal_received(&mut self, _ctx: &mut CombatContext, _me: InstanceId, _event: &Healed) -> Result<(), HookError> {
        Ok(())
    }

    fn on_kill(&mut self, _ctx: &mut CombatContext, _me: InstanceId, _victim: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    /// May veto this combatant's own death
    fn on_would_die(
        &mut self,
        _ctx: &mut CombatContext,
        _me: InstanceId,
        _killer: Option<InstanceId>,
    ) -> Result<DeathVerdict, HookError> {
        Ok(DeathVerdict::Allow)
    }

    fn on_ability_used(&mut self, _ctx: &mut CombatContext, _me: InstanceId, _event: &AbilityUsed) -> Result<(), HookError> {
        Ok(())
    }

    /// The innate passive was modified by a talent
    fn on_passive_changed(&mut self, _passive: &PassiveDescriptor) -> Result<(), HookError> {
        Ok(())
    }
}

impl fmt::Debug for dyn CharacterExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacterExtension")
    }
}

/// Call a hook on `id`'s extension with the context available
///
/// The extension is detached while it runs, so a nested call for the same
/// combatant sees no extension and falls back. Recalculations inside the hook
/// miss `adjust_attributes`, so the combatant is recalculated once the
/// extension is back. Errors are logged and replaced by `fallback`.
pub(crate) fn with_extension<R>(
    ctx: &mut CombatContext,
    id: InstanceId,
    hook: &'static str,
    fallback: R,
    f: impl FnOnce(&mut dyn CharacterExtension, &mut CombatContext) -> Result<R, HookError>,
) -> R {
    let Some(mut extension) = ctx.roster.get_mut(id).and_then(Combatant::take_extension) else {
        return fallback;
    };

    let result = f(extension.as_mut(), ctx);

    let changed = ctx.roster.get_mut(id).is_some_and(|combatant| {
        combatant.restore_extension(extension);
        let before = combatant.current().clone();
        combatant.recalculate();
        *combatant.current() != before
    });
    if changed {
        ctx.ui.refresh(id);
    }

    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(combatant = %id, hook, "Character hook failed: {}", err);
            fallback
        }
    }
}
