//! Damage/heal pipeline - the single mutation path for HP and shields
//!
//! Cross-combatant side effects (lifesteal, retaliation, redirection, heal
//! echoes) re-enter through `apply_damage` / `heal` on the other combatant.

mod damage;
mod heal;
mod mitigation;

pub use damage::{apply_damage, calculate_damage};
pub use heal::heal;
pub use mitigation::{calculate_mitigated_damage, defense_for, mitigation_fraction};

use crate::combatant::InstanceId;
use crate::context::CombatContext;
use crate::hooks::{with_extension, DeathVerdict};
use crate::lifecycle::finalize_death;
use crate::observer::WouldDie;

/// Per-call switches for `apply_damage`
#[derive(Debug, Clone, PartialEq)]
pub struct DamageOptions {
    /// Skip armor / magical resistance
    pub bypass_mitigation: bool,
    /// Damage bounced back by parry or a reflect shield; never bounces again
    pub is_retaliation: bool,
    /// Already moved once by a redirect effect
    pub redirected: bool,
    pub can_crit: bool,
    /// Ability that caused the hit, for notifications
    pub ability_id: Option<String>,
}

impl Default for DamageOptions {
    fn default() -> Self {
        DamageOptions {
            bypass_mitigation: false,
            is_retaliation: false,
            redirected: false,
            can_crit: true,
            ability_id: None,
        }
    }
}

impl DamageOptions {
    pub fn from_ability(ability_id: impl Into<String>) -> Self {
        DamageOptions {
            ability_id: Some(ability_id.into()),
            ..Default::default()
        }
    }

    /// Options for retaliation damage (no crit, no further bounce)
    pub fn retaliation() -> Self {
        DamageOptions {
            is_retaliation: true,
            can_crit: false,
            ..Default::default()
        }
    }
}

/// Result of `apply_damage`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageOutcome {
    /// Combatant the hit resolved against, after any redirect
    ///
    /// None when the hit was a no-op (invalid amount, inactive or untargetable target).
    pub recipient: Option<InstanceId>,
    /// HP actually lost (shield absorption excluded)
    pub damage: f64,
    pub is_critical: bool,
    pub is_dodged: bool,
    pub shield_absorbed: f64,
    pub killed: bool,
}

/// Per-call switches for `heal`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealOptions {
    /// Excess healing becomes shield instead of being discarded
    pub allow_overheal: bool,
    pub can_crit: bool,
    /// Secondary heal (lifesteal, echo, regeneration); never echoes
    pub is_passive: bool,
}

impl Default for HealOptions {
    fn default() -> Self {
        HealOptions {
            allow_overheal: false,
            can_crit: true,
            is_passive: false,
        }
    }
}

impl HealOptions {
    /// Options for secondary heals
    pub fn passive() -> Self {
        HealOptions {
            allow_overheal: false,
            can_crit: false,
            is_passive: true,
        }
    }
}

/// Result of `heal`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealOutcome {
    /// HP actually restored
    pub amount: f64,
    pub is_critical: bool,
    pub shield_gained: f64,
}

/// Floor a stage result, absorbing f64 error from fractional multipliers
///
/// `100.0 * (1.0 - 0.8)` is 19.999999999999996, which must still floor to 20.
pub(crate) fn floor_stage(value: f64) -> f64 {
    (value + 1e-9).floor()
}

/// Crit multiplier to use, falling back when the stat is missing or invalid
pub(crate) fn crit_multiplier(value: f64, ctx: &CombatContext) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        ctx.constants.crit.default_multiplier
    }
}

/// A combatant hit 0 HP: ask for a veto, otherwise finalize the death
///
/// Returns true if the combatant died.
pub(crate) fn resolve_lethal(ctx: &mut CombatContext, target: InstanceId, killer: Option<InstanceId>) -> bool {
    let own = with_extension(ctx, target, "on_would_die", DeathVerdict::Allow, |ext, ctx| {
        ext.on_would_die(ctx, target, killer)
    });
    let verdict = match own {
        DeathVerdict::Prevent => DeathVerdict::Prevent,
        DeathVerdict::Allow => ctx.observers.would_die(&WouldDie { target, killer }),
    };

    if verdict == DeathVerdict::Prevent {
        if let Some(combatant) = ctx.roster.get_mut(target) {
            if combatant.hp() < 1.0 {
                combatant.set_hp(1.0);
            }
        }
        tracing::debug!(combatant = %target, "Death prevented");
        let name = ctx.name_of(target);
        ctx.log.push(format!("{} refuses to fall", name));
        return false;
    }

    finalize_death(ctx, target, killer);
    true
}
