//! Prelude module for convenient imports
//!
//! ```rust
//! use combat_core::prelude::*;
//! ```

// Core types
pub use crate::combatant::{CharacterProperties, Combatant, CombatantSnapshot, InstanceId, Roster, Team};
pub use crate::context::{CombatContext, Environment, NullNotifier, UiNotifier};

// Effects
pub use crate::effect::{Effect, EffectBehavior, EffectDuration, EffectFlags, EffectHook, EffectKind, StatModifier};

// Damage and healing
pub use crate::pipeline::{apply_damage, heal, DamageOptions, DamageOutcome, HealOptions, HealOutcome};

// Turn processing
pub use crate::lifecycle::{apply_effect, cleanse, enter_battle, process_turn, remove_effect, summon, TurnOptions, TurnReport};

// Abilities
pub use crate::ability::{use_ability, Ability, AbilityCast, AbilityEffect, AbilityError, AbilityFactory, UseFailure, UseOutcome};

// Talents and progression
pub use crate::progression::Experience;
pub use crate::talent::{apply_talents, TalentError, TalentReport};

// Config
pub use crate::config::{ConfigError, GameConstants};

// Extension points (for character-specific behaviour)
pub use crate::hooks::{CharacterExtension, DeathVerdict, HookError};
pub use crate::log::BattleLog;
pub use crate::observer::{CombatObserver, Observers};
pub use crate::statistics::{BattleStatistics, NullStatistics, StatisticsSink};

// Re-exports from defs_core
pub use defs_core::{
    AbilityDescriptor, Attributes, CharacterDefinition, DamageType, DefinitionSet, ModifierOp, PassiveDescriptor,
    PropertyValue, Stat, TalentTree, TargetType,
};
