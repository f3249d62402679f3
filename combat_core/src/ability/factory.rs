//! Ability factory - explicit registry of effect handlers

use super::{Ability, AbilityEffect, AbilityError, ApplyEffectEffect, DamageEffect, HealEffect};
use crate::effect::Effect;
use defs_core::{AbilityDescriptor, CharacterDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the effect object for a descriptor
pub type HandlerCtor = Box<dyn Fn(&AbilityDescriptor, &HashMap<String, Effect>) -> Result<Arc<dyn AbilityEffect>, AbilityError>>;

/// Maps descriptor handler ids to effect constructors
///
/// Passed in when combatants are built; there is no global registry.
#[derive(Default)]
pub struct AbilityFactory {
    handlers: HashMap<String, HandlerCtor>,
    templates: HashMap<String, Effect>,
}

impl std::fmt::Debug for AbilityFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("AbilityFactory")
            .field("handlers", &handlers)
            .field("templates", &self.templates.len())
            .finish()
    }
}

impl AbilityFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with the `damage`, `heal` and `apply_effect` handlers
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("damage", |descriptor, templates| {
            Ok(Arc::new(DamageEffect::from_descriptor(descriptor, templates)?) as Arc<dyn AbilityEffect>)
        });
        factory.register("heal", |descriptor, _| {
            Ok(Arc::new(HealEffect::from_descriptor(descriptor)?) as Arc<dyn AbilityEffect>)
        });
        factory.register("apply_effect", |descriptor, templates| {
            Ok(Arc::new(ApplyEffectEffect::from_descriptor(descriptor, templates)?) as Arc<dyn AbilityEffect>)
        });
        factory
    }

    /// Register (or replace) a handler
    pub fn register<F>(&mut self, handler: impl Into<String>, ctor: F)
    where
        F: Fn(&AbilityDescriptor, &HashMap<String, Effect>) -> Result<Arc<dyn AbilityEffect>, AbilityError> + 'static,
    {
        self.handlers.insert(handler.into(), Box::new(ctor));
    }

    /// Register an effect template usable by `apply_effect` abilities
    pub fn register_template(&mut self, effect: Effect) {
        self.templates.insert(effect.id.clone(), effect);
    }

    pub fn template(&self, id: &str) -> Option<&Effect> {
        self.templates.get(id)
    }

    pub fn has_handler(&self, handler: &str) -> bool {
        self.handlers.contains_key(handler)
    }

    /// Build one ability instance
    pub fn build(&self, descriptor: &AbilityDescriptor) -> Result<Ability, AbilityError> {
        let handler = descriptor.effect.as_deref().ok_or(AbilityError::MissingHandler)?;
        let ctor = self
            .handlers
            .get(handler)
            .ok_or_else(|| AbilityError::UnknownHandler(handler.to_string()))?;
        let effect = ctor(descriptor, &self.templates)?;
        Ok(Ability::new(descriptor, effect))
    }

    /// Build every ability of a definition, skipping (and logging) the ones that fail
    pub fn build_all(&self, definition: &CharacterDefinition) -> Vec<Ability> {
        definition
            .abilities
            .iter()
            .filter_map(|descriptor| match self.build(descriptor) {
                Ok(ability) => Some(ability),
                Err(err) => {
                    tracing::warn!(
                        character = %definition.id,
                        ability = %descriptor.id,
                        "Skipping ability: {}",
                        err
                    );
                    None
                }
            })
            .collect()
    }
}
