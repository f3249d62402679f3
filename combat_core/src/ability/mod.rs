//! Abilities - per-combatant instances with their own cooldown state

mod builtin;
mod execute;
mod factory;

pub use builtin::{ApplyEffectEffect, DamageEffect, DamageParams, HealEffect};
pub use execute::{effective_cost, use_ability, UseFailure, UseOutcome};
pub use factory::{AbilityFactory, HandlerCtor};

use crate::combatant::InstanceId;
use crate::context::CombatContext;
use crate::talent::TalentError;
use defs_core::{AbilityDescriptor, PropertyValue, ResourceKind, StatOperation, TargetType};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by an ability's effect function or while building one
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbilityError {
    #[error("Ability has no effect handler")]
    MissingHandler,
    #[error("Unknown effect handler: {0}")]
    UnknownHandler(String),
    #[error("Unknown effect template: {0}")]
    UnknownTemplate(String),
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("No valid target")]
    NoTarget,
    #[error("Caster not found: {0}")]
    MissingCaster(InstanceId),
    #[error("{0}")]
    Failed(String),
}

/// Everything an effect function needs to know about one use
#[derive(Debug, Clone)]
pub struct AbilityCast {
    pub caster: InstanceId,
    pub target: Option<InstanceId>,
    pub ability_id: String,
    pub target_type: TargetType,
    pub params: BTreeMap<String, PropertyValue>,
    pub cost_paid: f64,
}

impl AbilityCast {
    /// Numeric parameter with a default
    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).and_then(PropertyValue::as_f64).unwrap_or(default)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(PropertyValue::as_str)
    }

    /// Resolve who the ability lands on, in declaration order
    pub fn resolve_targets(&self, ctx: &CombatContext) -> Vec<InstanceId> {
        match self.target_type {
            TargetType::Enemy | TargetType::Ally => self.target.into_iter().collect(),
            TargetType::SelfOnly => vec![self.caster],
            TargetType::AllEnemies => ctx.roster.enemies(self.caster),
            TargetType::AllAllies => ctx.roster.allies(self.caster),
        }
    }
}

/// Stateless behaviour of an ability
///
/// Shared between ability instances; all mutable state lives on `Ability`.
pub trait AbilityEffect {
    fn execute(&self, ctx: &mut CombatContext, cast: &AbilityCast) -> Result<(), AbilityError>;
}

impl fmt::Debug for dyn AbilityEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AbilityEffect")
    }
}

/// A talent's change to an ability, kept for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityModification {
    pub talent_id: String,
    pub property: String,
    pub value: PropertyValue,
}

/// An ability owned by one combatant
#[derive(Debug, Clone)]
pub struct Ability {
    pub id: String,
    pub name: String,
    description_template: String,
    description: String,
    pub cost: f64,
    pub resource: ResourceKind,
    /// Turns applied after each use
    pub cooldown: u32,
    current_cooldown: u32,
    pub target_type: TargetType,
    pub params: BTreeMap<String, PropertyValue>,
    disabled_turns: u32,
    modifications: Vec<AbilityModification>,
    effect: Arc<dyn AbilityEffect>,
}

impl Ability {
    /// Instantiate a descriptor with its effect
    pub fn new(descriptor: &AbilityDescriptor, effect: Arc<dyn AbilityEffect>) -> Self {
        let mut ability = Ability {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            description_template: descriptor.description.clone(),
            description: String::new(),
            cost: descriptor.cost,
            resource: descriptor.resource,
            cooldown: descriptor.cooldown,
            current_cooldown: 0,
            target_type: descriptor.target_type,
            params: descriptor.params.clone(),
            disabled_turns: 0,
            modifications: Vec::new(),
            effect,
        };
        ability.render_description();
        ability
    }

    pub(crate) fn effect(&self) -> Arc<dyn AbilityEffect> {
        Arc::clone(&self.effect)
    }

    // === Cooldown ===

    pub fn current_cooldown(&self) -> u32 {
        self.current_cooldown
    }

    pub fn is_ready(&self) -> bool {
        self.current_cooldown == 0
    }

    pub fn start_cooldown(&mut self) {
        self.current_cooldown = self.cooldown;
    }

    pub fn reset_cooldown(&mut self) {
        self.current_cooldown = 0;
    }

    pub fn reduce_cooldown(&mut self, turns: u32) {
        self.current_cooldown = self.current_cooldown.saturating_sub(turns);
    }

    pub(crate) fn restore_cooldown(&mut self, turns: u32) {
        self.current_cooldown = turns;
    }

    // === Disable ===

    /// Disable for a number of turns (keeps the longer of two disables)
    pub fn disable(&mut self, turns: u32) {
        self.disabled_turns = self.disabled_turns.max(turns);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_turns > 0
    }

    pub fn disabled_turns(&self) -> u32 {
        self.disabled_turns
    }

    /// Count down a disable; returns true when it just cleared
    pub(crate) fn tick_disabled(&mut self) -> bool {
        if self.disabled_turns == 0 {
            return false;
        }
        self.disabled_turns -= 1;
        self.disabled_turns == 0
    }

    // === Parameters & description ===

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(PropertyValue::as_f64)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn modifications(&self) -> &[AbilityModification] {
        &self.modifications
    }

    /// Re-render the description from its template
    pub fn render_description(&mut self) {
        let mut text = self.description_template.replace("{cooldown}", &self.cooldown.to_string());
        text = text.replace("{cost}", &self.cost.to_string());
        text = text.replace("{name}", &self.name);
        for (name, value) in &self.params {
            text = text.replace(&format!("{{{}}}", name), &value.to_string());
        }
        self.description = text;
    }

    /// Overwrite a property on behalf of a talent
    pub fn apply_modification(
        &mut self,
        talent_id: &str,
        property: &str,
        operation: Option<StatOperation>,
        value: PropertyValue,
    ) -> Result<(), TalentError> {
        let operation = operation.unwrap_or(StatOperation::Set);
        let invalid = |value: &PropertyValue| TalentError::InvalidValue {
            property: property.to_string(),
            value: value.to_string(),
        };

        match property {
            "cooldown" => {
                let v = value.as_f64().ok_or_else(|| invalid(&value))?;
                let next = operation.apply(self.cooldown as f64, v);
                self.cooldown = next.round().max(0.0) as u32;
                self.current_cooldown = self.current_cooldown.min(self.cooldown);
            }
            "cost" => {
                let v = value.as_f64().ok_or_else(|| invalid(&value))?;
                self.cost = operation.apply(self.cost, v).max(0.0);
            }
            "name" => {
                let v = value.as_str().ok_or_else(|| invalid(&value))?;
                self.name = v.to_string();
            }
            "target_type" => {
                let v = value.as_str().ok_or_else(|| invalid(&value))?;
                self.target_type = v.parse().map_err(|_| invalid(&value))?;
            }
            param => match (self.params.get(param).and_then(PropertyValue::as_f64), value.as_f64()) {
                (Some(current), Some(v)) => {
                    self.params
                        .insert(param.to_string(), PropertyValue::Number(operation.apply(current, v)));
                }
                _ if operation == StatOperation::Set => {
                    self.params.insert(param.to_string(), value.clone());
                }
                _ => return Err(invalid(&value)),
            },
        }

        self.modifications.push(AbilityModification {
            talent_id: talent_id.to_string(),
            property: property.to_string(),
            value,
        });
        self.render_description();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl AbilityEffect for Noop {
        fn execute(&self, _ctx: &mut CombatContext, _cast: &AbilityCast) -> Result<(), AbilityError> {
            Ok(())
        }
    }

    fn setup() -> Ability {
        let descriptor = AbilityDescriptor::new("fireball", "Fireball")
            .with_cost(40.0)
            .with_cooldown(3)
            .with_param("coefficient", 1.2)
            .with_description("{name}: {coefficient}x damage, {cost} mana, cooldown {cooldown}");
        Ability::new(&descriptor, Arc::new(Noop))
    }

    #[test]
    fn test_description_rendered() {
        let ability = setup();
        assert_eq!(ability.description(), "Fireball: 1.2x damage, 40 mana, cooldown 3");
    }

    #[test]
    fn test_cooldown_cycle() {
        let mut ability = setup();
        assert!(ability.is_ready());
        ability.start_cooldown();
        assert_eq!(ability.current_cooldown(), 3);
        ability.reduce_cooldown(5);
        assert!(ability.is_ready());
    }

    #[test]
    fn test_clones_do_not_share_cooldown() {
        let mut a = setup();
        let b = a.clone();
        a.start_cooldown();
        assert!(!a.is_ready());
        assert!(b.is_ready());
    }

    #[test]
    fn test_modifications_update_description() {
        let mut ability = setup();
        ability
            .apply_modification("quick_cast", "cooldown", Some(StatOperation::Subtract), PropertyValue::Number(1.0))
            .unwrap();
        ability
            .apply_modification("empower", "coefficient", Some(StatOperation::Multiply), PropertyValue::Number(2.0))
            .unwrap();
        ability
            .apply_modification("retarget", "target_type", None, PropertyValue::from("all_enemies"))
            .unwrap();

        assert_eq!(ability.cooldown, 2);
        assert_eq!(ability.target_type, TargetType::AllEnemies);
        assert_eq!(ability.description(), "Fireball: 2.4x damage, 40 mana, cooldown 2");
        assert_eq!(ability.modifications().len(), 3);
    }

    #[test]
    fn test_invalid_modification_rejected() {
        let mut ability = setup();
        let err = ability
            .apply_modification("bad", "cooldown", None, PropertyValue::from("soon"))
            .unwrap_err();
        assert!(matches!(err, TalentError::InvalidValue { .. }));
        assert!(ability
            .apply_modification("bad", "unknown_param", Some(StatOperation::Add), PropertyValue::Number(1.0))
            .is_err());
        assert!(ability.modifications().is_empty());
    }

    #[test]
    fn test_disable_counts_down() {
        let mut ability = setup();
        ability.disable(2);
        assert!(ability.is_disabled());
        assert!(!ability.tick_disabled());
        assert!(ability.tick_disabled());
        assert!(!ability.is_disabled());
    }
}
