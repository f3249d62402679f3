//! defs_core - Attribute model and parsed definitions for the combat core
//!
//! Everything here is plain data: the combat core consumes these types but
//! never reads them from disk itself.

pub mod definition;
pub mod registry;
pub mod talent;
pub mod types;

pub use definition::{AbilityDescriptor, CharacterDefinition, PassiveDescriptor, ResourceKind, TargetType};
pub use registry::DefinitionSet;
pub use talent::{StatOperation, StatTarget, TalentDefinition, TalentEffect, TalentTree};
pub use types::{Attributes, DamageType, ModifierOp, PropertyValue, Stat};

use thiserror::Error;

/// Problem found while assembling or validating definitions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("Duplicate character definition: {0}")]
    DuplicateCharacter(String),
    #[error("Talent tree for unknown character: {0}")]
    UnknownCharacter(String),
    #[error("Character '{character}' declares ability '{ability}' twice")]
    DuplicateAbility { character: String, ability: String },
    #[error("Ability '{ability}' of '{character}' has no effect handler")]
    MissingAbilityEffect { character: String, ability: String },
    #[error("Talent '{talent}' modifies unknown ability '{ability}'")]
    UnknownAbility { talent: String, ability: String },
    #[error("Talent '{0}' declares an unknown effect type")]
    UnknownEffectType(String),
}
