//! Unified effect system - buffs and debuffs attached to a combatant

mod behavior;

pub use behavior::{BehaviorClone, EffectBehavior, EffectHook};
pub(crate) use behavior::{run_attached, run_detached};

use crate::combatant::InstanceId;
use defs_core::{ModifierOp, Stat};
use serde::{Deserialize, Serialize};

// ============================================================================
// Effect
// ============================================================================

/// Whether an effect helps or hinders its holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Buff,
    Debuff,
}

/// Remaining lifetime of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDuration {
    /// Turns remaining, decremented once per full round
    Turns(u32),
    /// Never decremented, never expires
    Permanent,
}

impl EffectDuration {
    pub fn is_permanent(&self) -> bool {
        matches!(self, EffectDuration::Permanent)
    }

    pub fn remaining(&self) -> Option<u32> {
        match self {
            EffectDuration::Turns(n) => Some(*n),
            EffectDuration::Permanent => None,
        }
    }
}

/// A stat modification carried by an effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: Stat,
    pub value: f64,
    pub operation: ModifierOp,
    /// Scale by the effect's stack count
    #[serde(default = "default_true")]
    pub applies_per_stack: bool,
}

fn default_true() -> bool {
    true
}

impl StatModifier {
    pub fn new(stat: Stat, value: f64, operation: ModifierOp) -> Self {
        StatModifier {
            stat,
            value,
            operation,
            applies_per_stack: true,
        }
    }

    pub fn add(stat: Stat, value: f64) -> Self {
        Self::new(stat, value, ModifierOp::Add)
    }

    pub fn multiply(stat: Stat, value: f64) -> Self {
        Self::new(stat, value, ModifierOp::Multiply)
    }

    pub fn set(stat: Stat, value: f64) -> Self {
        Self::new(stat, value, ModifierOp::Set)
    }

    pub fn add_base_percentage(stat: Stat, value: f64) -> Self {
        Self::new(stat, value, ModifierOp::AddBasePercentage)
    }
}

/// A modifier scoped to one other combatant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceModifier {
    pub source: InstanceId,
    /// Fraction, e.g. 0.25 = 25%
    pub value: f64,
}

/// Damage-reflecting shield
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflectShield {
    /// Fraction of the pre-reduction hit sent back at the attacker
    pub retaliation: f64,
    /// Fraction removed from the hit itself
    pub damage_reduction: f64,
}

/// Linked healing: a share of every heal received is echoed to a partner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealEcho {
    pub partner: InstanceId,
    pub fraction: f64,
}

/// Flags consumed by the pipeline, ability checks and turn processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectFlags {
    // === Control ===
    pub stun: bool,
    /// Frozen: chance to break free when acting
    pub freeze_break_chance: Option<f64>,
    pub cannot_act: bool,
    pub disabled_abilities: Vec<String>,
    /// Obscured: chance the holder's abilities miss
    pub forced_miss_chance: Option<f64>,

    // === Recovery ===
    pub cannot_be_healed: bool,
    pub cannot_restore_mana: bool,

    // === Targeting ===
    pub untargetable: bool,
    pub redirect_to: Option<InstanceId>,

    // === Damage ===
    pub parry: bool,
    pub damage_taken_multiplier: Option<f64>,
    pub outgoing_damage_multiplier: Option<f64>,
    pub reduction_against: Option<SourceModifier>,
    pub amplify_from: Option<SourceModifier>,
    pub reflect: Option<ReflectShield>,

    // === Costs ===
    pub cost_waiver: bool,
    pub cost_reduction: Option<f64>,

    // === Per turn ===
    pub damage_per_turn: Option<f64>,
    pub heal_per_turn: Option<f64>,
    pub heal_echo: Option<HealEcho>,
}

/// A buff or debuff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    /// Unique among a combatant's active effects
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub kind: EffectKind,
    pub duration: EffectDuration,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
    #[serde(default)]
    pub flags: EffectFlags,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default = "default_stacks")]
    pub max_stacks: u32,
    #[serde(default = "default_stacks")]
    pub stacks: u32,
    /// Source combatant (attribution only)
    #[serde(default)]
    pub applied_by: Option<InstanceId>,
    /// Source ability (attribution only)
    #[serde(default)]
    pub ability_id: Option<String>,
    #[serde(skip)]
    behavior: Option<Box<dyn EffectBehavior>>,
}

fn default_stacks() -> u32 {
    1
}

impl Effect {
    /// Create an effect with no modifiers or flags
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EffectKind, duration: EffectDuration) -> Self {
        Effect {
            id: id.into(),
            name: name.into(),
            icon: None,
            kind,
            duration,
            modifiers: Vec::new(),
            flags: EffectFlags::default(),
            stackable: false,
            max_stacks: 1,
            stacks: 1,
            applied_by: None,
            ability_id: None,
            behavior: None,
        }
    }

    pub fn buff(id: impl Into<String>, name: impl Into<String>, duration: EffectDuration) -> Self {
        Self::new(id, name, EffectKind::Buff, duration)
    }

    pub fn debuff(id: impl Into<String>, name: impl Into<String>, duration: EffectDuration) -> Self {
        Self::new(id, name, EffectKind::Debuff, duration)
    }

    pub fn with_modifier(mut self, modifier: StatModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_flags(mut self, flags: EffectFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_stacking(mut self, max_stacks: u32) -> Self {
        self.stackable = true;
        self.max_stacks = max_stacks.max(1);
        self
    }

    pub fn with_behavior(mut self, behavior: impl EffectBehavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn applied_by(mut self, source: InstanceId) -> Self {
        self.applied_by = Some(source);
        self
    }

    pub fn is_buff(&self) -> bool {
        self.kind == EffectKind::Buff
    }

    pub fn is_debuff(&self) -> bool {
        self.kind == EffectKind::Debuff
    }

    /// Stack count used to scale modifiers and per-turn ticks
    pub fn effective_stacks(&self) -> u32 {
        if self.stackable {
            self.stacks.max(1)
        } else {
            1
        }
    }

    /// Whether the effect prevents acting outright
    pub fn is_stun(&self) -> bool {
        self.flags.stun
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    /// Take the behaviour out so it can be called with the context borrowed
    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn EffectBehavior>> {
        self.behavior.take()
    }

    pub(crate) fn restore_behavior(&mut self, behavior: Box<dyn EffectBehavior>) {
        if self.behavior.is_none() {
            self.behavior = Some(behavior);
        }
    }

    /// Add a stack (capped at max_stacks)
    pub fn add_stack(&mut self) {
        if self.stacks < self.max_stacks {
            self.stacks += 1;
        }
    }

    /// Refresh duration from a newer application
    pub fn refresh(&mut self, duration: EffectDuration) {
        self.duration = duration;
    }

    /// Merge a re-application of the same effect id
    ///
    /// Stackable effects gain a stack; others take the newer modifiers and flags.
    /// Both refresh duration.
    pub fn merge(&mut self, newer: Effect) {
        if self.stackable {
            self.add_stack();
        } else {
            self.modifiers = newer.modifiers;
            self.flags = newer.flags;
        }
        self.refresh(newer.duration);
        if newer.applied_by.is_some() {
            self.applied_by = newer.applied_by;
        }
    }

    /// Decrement a timed duration; returns true when the effect has run out
    pub fn tick_duration(&mut self) -> bool {
        match &mut self.duration {
            EffectDuration::Turns(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            EffectDuration::Permanent => false,
        }
    }

    /// Damage dealt to the holder each turn
    pub fn dot_damage(&self) -> f64 {
        self.flags
            .damage_per_turn
            .map(|d| d * self.effective_stacks() as f64)
            .unwrap_or(0.0)
    }

    /// Healing granted to the holder each turn
    pub fn hot_heal(&self) -> f64 {
        self.flags
            .heal_per_turn
            .map(|h| h * self.effective_stacks() as f64)
            .unwrap_or(0.0)
    }
}
