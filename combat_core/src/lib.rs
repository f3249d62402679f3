//! combat_core - Combat resolution for a turn-based party battler
//!
//! This library provides:
//! - Combatant: a character instance with base and derived attributes
//! - Stat recalculation from base values, effects and character properties
//! - The damage/heal pipeline: dodge, crit, mitigation, shields, death
//! - Effects with durations, stacking and per-turn processing
//! - Abilities with costs, cooldowns and eligibility checks
//! - Talents applied once at battle setup
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use combat_core::prelude::*;
//!
//! let mut ctx = CombatContext::with_seed(GameConstants::default(), 42);
//! let factory = AbilityFactory::with_builtins();
//!
//! let knight = ctx.roster.add(Combatant::from_definition(&knight_def, &factory, Team::Player));
//! let goblin = ctx.roster.add(Combatant::from_definition(&goblin_def, &factory, Team::Opponent));
//!
//! let outcome = use_ability(&mut ctx, knight, 0, Some(goblin));
//! let report = process_turn(&mut ctx, knight, TurnOptions::full_round());
//! ```

pub mod ability;
pub mod combatant;
pub mod config;
pub mod context;
pub mod effect;
pub mod hooks;
pub mod lifecycle;
pub mod log;
pub mod observer;
pub mod pipeline;
pub mod prelude;
pub mod progression;
pub mod statistics;
pub mod stats;
pub mod talent;

// Core API - what most users need
pub use combatant::{Combatant, InstanceId, Roster, Team};
pub use context::{CombatContext, Environment};
pub use effect::{Effect, EffectDuration, EffectFlags, EffectKind, StatModifier};
pub use pipeline::{apply_damage, heal, DamageOptions, DamageOutcome, HealOptions, HealOutcome};
pub use lifecycle::{apply_effect, process_turn, remove_effect, TurnOptions, TurnReport};
pub use ability::{use_ability, AbilityFactory, UseFailure, UseOutcome};
pub use talent::{apply_talents, TalentReport};

// Configuration
pub use config::{ConfigError, GameConstants};

// Extension points
pub use hooks::{CharacterExtension, DeathVerdict, HookError};
pub use observer::CombatObserver;
pub use statistics::StatisticsSink;

// Re-export commonly needed defs_core types
pub use defs_core::{Attributes, CharacterDefinition, DamageType, Stat};
