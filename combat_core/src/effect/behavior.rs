//! Lifecycle callbacks for effects

use super::Effect;
use crate::combatant::InstanceId;
use crate::context::CombatContext;
use crate::hooks::HookError;
use std::fmt;

/// Optional lifecycle callbacks of an effect
///
/// Every method defaults to doing nothing; implementors override the ones
/// they need. Errors are logged by the caller and treated as a no-op.
pub trait EffectBehavior: BehaviorClone {
    /// Called once when the effect is first attached
    fn on_apply(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    /// Called after the effect has been detached
    fn on_remove(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    fn on_turn_start(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    /// Called on turns that reduce durations, before the decrement
    fn on_turn_end(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
        Ok(())
    }

    /// Per-turn payload (e.g. a custom damage-over-time)
    fn on_tick(&mut self, _ctx: &mut CombatContext, _owner: InstanceId) -> Result<(), HookError> {
        Ok(())
    }
}

/// Deep-clone support for boxed behaviours
pub trait BehaviorClone {
    fn clone_box(&self) -> Box<dyn EffectBehavior>;
}

impl<T> BehaviorClone for T
where
    T: EffectBehavior + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn EffectBehavior> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn EffectBehavior> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn EffectBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectBehavior")
    }
}

/// Which lifecycle callback to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectHook {
    Apply,
    Remove,
    TurnStart,
    TurnEnd,
    Tick,
}

impl fmt::Display for EffectHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EffectHook::Apply => "on_apply",
            EffectHook::Remove => "on_remove",
            EffectHook::TurnStart => "on_turn_start",
            EffectHook::TurnEnd => "on_turn_end",
            EffectHook::Tick => "on_tick",
        };
        write!(f, "{}", s)
    }
}

fn dispatch(
    behavior: &mut dyn EffectBehavior,
    hook: EffectHook,
    ctx: &mut CombatContext,
    owner: InstanceId,
) -> Result<(), HookError> {
    match hook {
        EffectHook::Apply => behavior.on_apply(ctx, owner),
        EffectHook::Remove => behavior.on_remove(ctx, owner),
        EffectHook::TurnStart => behavior.on_turn_start(ctx, owner),
        EffectHook::TurnEnd => behavior.on_turn_end(ctx, owner),
        EffectHook::Tick => behavior.on_tick(ctx, owner),
    }
}

fn log_failure(err: &HookError, owner: InstanceId, effect_id: &str, hook: EffectHook) {
    tracing::warn!(
        combatant = %owner,
        effect = %effect_id,
        hook = %hook,
        "Effect callback failed: {}",
        err
    );
}

/// Run a callback on an effect still attached to `owner`
///
/// The behaviour is taken out of the effect for the duration of the call and
/// put back afterwards if the effect is still attached.
pub(crate) fn run_attached(ctx: &mut CombatContext, owner: InstanceId, effect_id: &str, hook: EffectHook) {
    let Some(mut behavior) = ctx
        .roster
        .get_mut(owner)
        .and_then(|c| c.effect_mut(effect_id))
        .and_then(Effect::take_behavior)
    else {
        return;
    };

    if let Err(err) = dispatch(behavior.as_mut(), hook, ctx, owner) {
        log_failure(&err, owner, effect_id, hook);
    }

    if let Some(effect) = ctx.roster.get_mut(owner).and_then(|c| c.effect_mut(effect_id)) {
        effect.restore_behavior(behavior);
    }
}

/// Run a callback on an effect that is no longer attached
pub(crate) fn run_detached(ctx: &mut CombatContext, owner: InstanceId, effect: &mut Effect, hook: EffectHook) {
    let Some(mut behavior) = effect.take_behavior() else {
        return;
    };
    if let Err(err) = dispatch(behavior.as_mut(), hook, ctx, owner) {
        log_failure(&err, owner, &effect.id, hook);
    }
    effect.restore_behavior(behavior);
}
