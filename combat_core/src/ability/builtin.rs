//! Generic ability effects shared by most characters

use super::{AbilityCast, AbilityEffect, AbilityError};
use crate::context::CombatContext;
use crate::effect::{Effect, EffectDuration};
use crate::lifecycle::apply_effect;
use crate::pipeline::{apply_damage, floor_stage, heal, DamageOptions, HealOptions};
use defs_core::{AbilityDescriptor, DamageType, PropertyValue, Stat};
use std::collections::{BTreeMap, HashMap};

fn parse_stat(name: &str) -> Option<Stat> {
    Stat::all().iter().copied().find(|s| s.to_string() == name)
}

fn parse_damage_type(name: &str) -> Option<DamageType> {
    match name {
        "physical" => Some(DamageType::Physical),
        "magical" => Some(DamageType::Magical),
        "true" => Some(DamageType::True),
        _ => None,
    }
}

type Params = BTreeMap<String, PropertyValue>;

fn text_param<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).and_then(PropertyValue::as_str)
}

fn stat_param(params: &Params, default: Stat) -> Result<Stat, AbilityError> {
    match text_param(params, "scaling") {
        Some(name) => parse_stat(name).ok_or_else(|| AbilityError::InvalidParam {
            name: "scaling".to_string(),
            reason: format!("unknown stat '{}'", name),
        }),
        None => Ok(default),
    }
}

fn template_param(params: &Params, name: &str, templates: &HashMap<String, Effect>) -> Result<Option<Effect>, AbilityError> {
    match text_param(params, name) {
        Some(id) => templates
            .get(id)
            .cloned()
            .map(Some)
            .ok_or_else(|| AbilityError::UnknownTemplate(id.to_string())),
        None => Ok(None),
    }
}

/// Scaled amount: `flat + coefficient * caster[scaling]`, floored
fn scaled_amount(ctx: &CombatContext, cast: &AbilityCast, scaling: Stat, default_coefficient: f64) -> Result<f64, AbilityError> {
    let caster = ctx
        .roster
        .get(cast.caster)
        .ok_or(AbilityError::MissingCaster(cast.caster))?;
    let coefficient = cast.number("coefficient", default_coefficient);
    let flat = cast.number("flat", 0.0);
    Ok(floor_stage(flat + coefficient * caster.current().get(scaling)))
}

/// Deep copy of a template, credited to the cast
fn attach(template: &Effect, cast: &AbilityCast) -> Effect {
    let mut effect = template.clone();
    effect.applied_by = Some(cast.caster);
    effect.ability_id = Some(cast.ability_id.clone());
    effect
}

fn living_targets(ctx: &CombatContext, cast: &AbilityCast) -> Result<Vec<crate::combatant::InstanceId>, AbilityError> {
    let targets: Vec<_> = cast
        .resolve_targets(ctx)
        .into_iter()
        .filter(|id| ctx.roster.is_active(*id))
        .collect();
    if targets.is_empty() {
        return Err(AbilityError::NoTarget);
    }
    Ok(targets)
}

/// Deal `flat + coefficient * scaling` damage to each target
///
/// Params: `coefficient` (1.0), `flat` (0), `damage_type` ("physical"),
/// `scaling` (physical_damage, or magical_damage for magical hits),
/// `on_hit` (effect template attached to whoever took a hit that was not dodged).
///
/// Params are read from the cast, so talent modifications apply.
#[derive(Debug, Clone)]
pub struct DamageEffect {
    templates: HashMap<String, Effect>,
}

/// Damage params resolved for one cast
#[derive(Debug, Clone)]
pub struct DamageParams {
    pub damage_type: DamageType,
    pub scaling: Stat,
    pub on_hit: Option<Effect>,
}

impl DamageEffect {
    /// Build the effect, rejecting params it could never resolve
    pub fn from_descriptor(descriptor: &AbilityDescriptor, templates: &HashMap<String, Effect>) -> Result<Self, AbilityError> {
        let effect = DamageEffect {
            templates: templates.clone(),
        };
        effect.resolve(&descriptor.params)?;
        Ok(effect)
    }

    pub fn resolve(&self, params: &BTreeMap<String, PropertyValue>) -> Result<DamageParams, AbilityError> {
        let damage_type = match text_param(params, "damage_type") {
            Some(name) => parse_damage_type(name).ok_or_else(|| AbilityError::InvalidParam {
                name: "damage_type".to_string(),
                reason: format!("unknown damage type '{}'", name),
            })?,
            None => DamageType::Physical,
        };
        let default_scaling = match damage_type {
            DamageType::Magical => Stat::MagicalDamage,
            _ => Stat::PhysicalDamage,
        };
        Ok(DamageParams {
            damage_type,
            scaling: stat_param(params, default_scaling)?,
            on_hit: template_param(params, "on_hit", &self.templates)?,
        })
    }
}

impl AbilityEffect for DamageEffect {
    fn execute(&self, ctx: &mut CombatContext, cast: &AbilityCast) -> Result<(), AbilityError> {
        let params = self.resolve(&cast.params)?;
        let amount = scaled_amount(ctx, cast, params.scaling, 1.0)?;
        let options = DamageOptions::from_ability(&cast.ability_id);
        for target in living_targets(ctx, cast)? {
            let outcome = apply_damage(ctx, target, amount, params.damage_type, Some(cast.caster), &options);
            // Untargetable hits have no recipient; redirected ones land on the guardian
            let Some(recipient) = outcome.recipient.filter(|r| !outcome.is_dodged && ctx.roster.is_active(*r)) else {
                continue;
            };
            if let Some(template) = &params.on_hit {
                apply_effect(ctx, recipient, attach(template, cast));
            }
        }
        Ok(())
    }
}

/// Heal each target for `flat + coefficient * scaling`
///
/// Params: `coefficient` (1.0), `flat` (0), `scaling` (magical_damage),
/// `allow_overheal` (false).
#[derive(Debug, Clone, Default)]
pub struct HealEffect;

impl HealEffect {
    pub fn from_descriptor(descriptor: &AbilityDescriptor) -> Result<Self, AbilityError> {
        stat_param(&descriptor.params, Stat::MagicalDamage)?;
        Ok(HealEffect)
    }
}

impl AbilityEffect for HealEffect {
    fn execute(&self, ctx: &mut CombatContext, cast: &AbilityCast) -> Result<(), AbilityError> {
        let scaling = stat_param(&cast.params, Stat::MagicalDamage)?;
        let amount = scaled_amount(ctx, cast, scaling, 1.0)?;
        let options = HealOptions {
            allow_overheal: cast.params.get("allow_overheal").and_then(PropertyValue::as_bool).unwrap_or(false),
            ..HealOptions::default()
        };
        for target in living_targets(ctx, cast)? {
            heal(ctx, target, amount, Some(cast.caster), &options);
        }
        Ok(())
    }
}

/// Attach a deep copy of an effect template to each target
///
/// Params: `effect` (template id, required), `duration` (overrides the template's turns).
#[derive(Debug, Clone)]
pub struct ApplyEffectEffect {
    templates: HashMap<String, Effect>,
}

impl ApplyEffectEffect {
    pub fn from_descriptor(descriptor: &AbilityDescriptor, templates: &HashMap<String, Effect>) -> Result<Self, AbilityError> {
        let effect = ApplyEffectEffect {
            templates: templates.clone(),
        };
        effect.template(&descriptor.params)?;
        Ok(effect)
    }

    /// Template named by the `effect` param
    pub fn template(&self, params: &BTreeMap<String, PropertyValue>) -> Result<Effect, AbilityError> {
        template_param(params, "effect", &self.templates)?.ok_or_else(|| AbilityError::InvalidParam {
            name: "effect".to_string(),
            reason: "missing effect template id".to_string(),
        })
    }
}

impl AbilityEffect for ApplyEffectEffect {
    fn execute(&self, ctx: &mut CombatContext, cast: &AbilityCast) -> Result<(), AbilityError> {
        let template = self.template(&cast.params)?;
        for target in living_targets(ctx, cast)? {
            let mut effect = attach(&template, cast);
            if let Some(turns) = cast.params.get("duration").and_then(PropertyValue::as_f64) {
                effect.duration = EffectDuration::Turns(turns.max(1.0) as u32);
            }
            apply_effect(ctx, target, effect);
        }
        Ok(())
    }
}
