//! Combatant - a character instance participating in a battle

mod properties;
mod roster;
mod snapshot;

pub use properties::CharacterProperties;
pub use roster::Roster;
pub use snapshot::CombatantSnapshot;

use crate::ability::{Ability, AbilityFactory};
use crate::effect::{Effect, EffectKind, HealEcho, ReflectShield};
use crate::hooks::CharacterExtension;
use crate::progression::Experience;
use defs_core::{Attributes, CharacterDefinition, PassiveDescriptor, Stat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Per-battle identity, distinguishing copies of the same template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side of the battle a combatant fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Player,
    Opponent,
}

impl Team {
    pub fn opposing(&self) -> Team {
        match self {
            Team::Player => Team::Opponent,
            Team::Opponent => Team::Player,
        }
    }
}

/// A character instance in battle
#[derive(Debug)]
pub struct Combatant {
    pub(crate) instance_id: InstanceId,
    template_id: String,
    pub name: String,
    pub faction: Option<String>,
    pub team: Team,

    /// Definition values plus baked-in talents
    pub(crate) base: Attributes,
    /// Derived every recalculation; owns the live resource values
    pub(crate) current: Attributes,
    /// Absorption buffer consumed before HP
    shield: f64,

    /// Buffs and debuffs in insertion order
    effects: Vec<Effect>,
    applied_talents: BTreeSet<String>,
    pub abilities: Vec<Ability>,
    pub passive: Option<PassiveDescriptor>,
    pub properties: CharacterProperties,

    /// Flat bonuses accumulated outside the effect list
    bonus: BTreeMap<Stat, f64>,
    /// Stage-managed values that survive recalculation
    pinned: BTreeMap<Stat, f64>,

    extension: Option<Box<dyn CharacterExtension>>,
    pub experience: Experience,
    pub(crate) dead: bool,
}

impl Combatant {
    /// Create a combatant from base attributes, at full resources
    pub fn new(template_id: impl Into<String>, name: impl Into<String>, base: Attributes, team: Team) -> Self {
        let mut current = base.clone();
        current.hp = base.max_hp;
        current.mana = base.max_mana;
        current.secondary = base.max_secondary;

        Combatant {
            instance_id: InstanceId(0),
            template_id: template_id.into(),
            name: name.into(),
            faction: None,
            team,
            base,
            current,
            shield: 0.0,
            effects: Vec::new(),
            applied_talents: BTreeSet::new(),
            abilities: Vec::new(),
            passive: None,
            properties: CharacterProperties::default(),
            bonus: BTreeMap::new(),
            pinned: BTreeMap::new(),
            extension: None,
            experience: Experience::default(),
            dead: false,
        }
    }

    /// Create a combatant from a parsed definition
    ///
    /// Abilities whose handler cannot be built are logged and skipped.
    pub fn from_definition(definition: &CharacterDefinition, factory: &AbilityFactory, team: Team) -> Self {
        let mut combatant = Self::new(&definition.id, &definition.name, definition.base.clone(), team);
        combatant.faction = definition.faction.clone();
        combatant.passive = definition.passive.clone();
        combatant.abilities = factory.build_all(definition);
        combatant
    }

    pub fn with_extension(mut self, extension: impl CharacterExtension + 'static) -> Self {
        self.extension = Some(Box::new(extension));
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    // === Identity ===

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    // === Attributes ===

    pub fn base(&self) -> &Attributes {
        &self.base
    }

    /// Mutable base record, for setup code; call recalculate afterwards
    pub fn base_mut(&mut self) -> &mut Attributes {
        &mut self.base
    }

    pub fn current(&self) -> &Attributes {
        &self.current
    }

    pub fn hp(&self) -> f64 {
        self.current.hp
    }

    pub fn max_hp(&self) -> f64 {
        self.current.max_hp
    }

    pub fn mana(&self) -> f64 {
        self.current.mana
    }

    /// Set HP, clamped to [0, max_hp]
    pub fn set_hp(&mut self, hp: f64) {
        self.current.hp = clamp_resource(hp, self.current.max_hp);
    }

    /// Set mana, clamped to [0, max_mana]
    pub fn set_mana(&mut self, mana: f64) {
        self.current.mana = clamp_resource(mana, self.current.max_mana);
    }

    /// Set the secondary resource (ignored if the pool is undefined)
    pub fn set_secondary(&mut self, value: f64) {
        if let Some(max) = self.current.max_secondary {
            self.current.secondary = Some(clamp_resource(value, max));
        }
    }

    pub fn shield(&self) -> f64 {
        self.shield
    }

    pub fn set_shield(&mut self, shield: f64) {
        self.shield = if shield.is_finite() { shield.max(0.0) } else { 0.0 };
    }

    pub fn add_shield(&mut self, amount: f64) {
        self.set_shield(self.shield + amount);
    }

    pub fn is_alive(&self) -> bool {
        !self.dead && self.current.hp > 0.0
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    // === Bonuses and pins ===

    /// Add a flat bonus applied at every recalculation
    pub fn add_bonus(&mut self, stat: Stat, value: f64) {
        *self.bonus.entry(stat).or_insert(0.0) += value;
    }

    pub fn bonus(&self, stat: Stat) -> f64 {
        self.bonus.get(&stat).copied().unwrap_or(0.0)
    }

    pub(crate) fn bonuses(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        self.bonus.iter().map(|(s, v)| (*s, *v))
    }

    /// Pin a stat to an externally managed value
    pub fn pin_stat(&mut self, stat: Stat, value: f64) {
        self.pinned.insert(stat, value);
    }

    pub fn unpin_stat(&mut self, stat: Stat) -> Option<f64> {
        self.pinned.remove(&stat)
    }

    pub fn pinned(&self, stat: Stat) -> Option<f64> {
        self.pinned.get(&stat).copied()
    }

    pub(crate) fn pins(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        self.pinned.iter().map(|(s, v)| (*s, *v))
    }

    // === Effects ===

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn buffs(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(|e| e.kind == EffectKind::Buff)
    }

    pub fn debuffs(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(|e| e.kind == EffectKind::Debuff)
    }

    pub fn effect(&self, id: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn effect_mut(&mut self, id: &str) -> Option<&mut Effect> {
        self.effects.iter_mut().find(|e| e.id == id)
    }

    pub fn has_effect(&self, id: &str) -> bool {
        self.effect(id).is_some()
    }

    pub(crate) fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub(crate) fn detach_effect(&mut self, id: &str) -> Option<Effect> {
        let index = self.effects.iter().position(|e| e.id == id)?;
        Some(self.effects.remove(index))
    }

    // === Effect flag queries ===

    pub fn is_stunned(&self) -> bool {
        self.effects.iter().any(|e| e.flags.stun)
    }

    /// Break-free chance of the first freezing effect
    pub fn freeze_break_chance(&self) -> Option<f64> {
        self.effects.iter().find_map(|e| e.flags.freeze_break_chance)
    }

    pub fn cannot_act(&self) -> bool {
        self.effects.iter().any(|e| e.flags.cannot_act)
    }

    pub fn cannot_be_healed(&self) -> bool {
        self.effects.iter().any(|e| e.flags.cannot_be_healed)
    }

    pub fn cannot_restore_mana(&self) -> bool {
        self.effects.iter().any(|e| e.flags.cannot_restore_mana)
    }

    pub fn is_untargetable(&self) -> bool {
        self.effects.iter().any(|e| e.flags.untargetable)
    }

    pub fn has_parry(&self) -> bool {
        self.effects.iter().any(|e| e.flags.parry)
    }

    pub fn ability_disabled_by_effect(&self, ability_id: &str) -> bool {
        self.effects
            .iter()
            .any(|e| e.flags.disabled_abilities.iter().any(|a| a == ability_id))
    }

    /// Combined chance that this combatant's abilities miss
    pub fn forced_miss_chance(&self) -> f64 {
        let hit = self
            .effects
            .iter()
            .filter_map(|e| e.flags.forced_miss_chance)
            .fold(1.0, |acc, c| acc * (1.0 - c.clamp(0.0, 1.0)));
        1.0 - hit
    }

    pub fn damage_taken_multiplier(&self) -> f64 {
        self.effects
            .iter()
            .filter_map(|e| e.flags.damage_taken_multiplier)
            .product()
    }

    pub fn outgoing_damage_multiplier(&self) -> f64 {
        self.effects
            .iter()
            .filter_map(|e| e.flags.outgoing_damage_multiplier)
            .product()
    }

    /// First living redirect target other than self
    pub fn redirect_target(&self) -> Option<InstanceId> {
        self.effects
            .iter()
            .filter_map(|e| e.flags.redirect_to)
            .find(|id| *id != self.instance_id)
    }

    /// Reduction held against hits from `source`
    pub fn reduction_against(&self, source: InstanceId) -> f64 {
        self.effects
            .iter()
            .filter_map(|e| e.flags.reduction_against)
            .filter(|m| m.source == source)
            .map(|m| m.value)
            .sum()
    }

    /// Extra damage taken from `source`
    pub fn amplification_from(&self, source: InstanceId) -> f64 {
        self.effects
            .iter()
            .filter_map(|e| e.flags.amplify_from)
            .filter(|m| m.source == source)
            .map(|m| m.value)
            .sum()
    }

    pub fn reflect_shield(&self) -> Option<ReflectShield> {
        self.effects.iter().find_map(|e| e.flags.reflect)
    }

    pub fn cost_waived(&self) -> bool {
        self.effects.iter().any(|e| e.flags.cost_waiver)
    }

    /// Fraction removed from ability costs, in [0, 1]
    pub fn cost_reduction(&self) -> f64 {
        self.effects
            .iter()
            .filter_map(|e| e.flags.cost_reduction)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn heal_echo(&self) -> Option<HealEcho> {
        self.effects.iter().find_map(|e| e.flags.heal_echo)
    }

    // === Talents ===

    pub fn applied_talents(&self) -> &BTreeSet<String> {
        &self.applied_talents
    }

    pub fn has_talent(&self, id: &str) -> bool {
        self.applied_talents.contains(id)
    }

    pub(crate) fn mark_talent_applied(&mut self, id: &str) {
        self.applied_talents.insert(id.to_string());
    }

    // === Abilities ===

    pub fn ability(&self, index: usize) -> Option<&Ability> {
        self.abilities.get(index)
    }

    pub fn ability_mut(&mut self, index: usize) -> Option<&mut Ability> {
        self.abilities.get_mut(index)
    }

    pub fn find_ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == id)
    }

    pub fn find_ability_mut(&mut self, id: &str) -> Option<&mut Ability> {
        self.abilities.iter_mut().find(|a| a.id == id)
    }

    // === Extension ===

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    pub(crate) fn extension(&self) -> Option<&dyn CharacterExtension> {
        self.extension.as_deref()
    }

    pub(crate) fn take_extension(&mut self) -> Option<Box<dyn CharacterExtension>> {
        self.extension.take()
    }

    pub(crate) fn restore_extension(&mut self, extension: Box<dyn CharacterExtension>) {
        if self.extension.is_none() {
            self.extension = Some(extension);
        }
    }
}

/// Clamp a resource value into [0, max], treating non-finite as 0
pub(crate) fn clamp_resource(value: f64, max: f64) -> f64 {
    let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectDuration, EffectFlags, SourceModifier};

    fn setup() -> Combatant {
        let base = Attributes {
            max_hp: 200.0,
            max_mana: 50.0,
            ..Default::default()
        };
        Combatant::new("squire", "Squire", base, Team::Player)
    }

    #[test]
    fn test_new_starts_at_full_resources() {
        let c = setup();
        assert!((c.hp() - 200.0).abs() < f64::EPSILON);
        assert!((c.mana() - 50.0).abs() < f64::EPSILON);
        assert!(c.current().secondary.is_none());
        assert!(c.is_alive());
    }

    #[test]
    fn test_resource_setters_clamp() {
        let mut c = setup();
        c.set_hp(500.0);
        assert!((c.hp() - 200.0).abs() < f64::EPSILON);
        c.set_hp(-5.0);
        assert!((c.hp() - 0.0).abs() < f64::EPSILON);
        c.set_mana(f64::NAN);
        assert!((c.mana() - 0.0).abs() < f64::EPSILON);
        c.set_shield(-10.0);
        assert!((c.shield() - 0.0).abs() < f64::EPSILON);
        c.set_secondary(10.0);
        assert!(c.current().secondary.is_none());
    }

    #[test]
    fn test_flag_queries() {
        let mut c = setup();
        let other = InstanceId(7);
        c.push_effect(Effect::debuff("blind", "Blind", EffectDuration::Turns(2)).with_flags(EffectFlags {
            forced_miss_chance: Some(0.5),
            ..Default::default()
        }));
        c.push_effect(Effect::debuff("smoke", "Smoke", EffectDuration::Turns(2)).with_flags(EffectFlags {
            forced_miss_chance: Some(0.5),
            damage_taken_multiplier: Some(1.2),
            amplify_from: Some(SourceModifier { source: other, value: 0.3 }),
            ..Default::default()
        }));

        assert!((c.forced_miss_chance() - 0.75).abs() < 1e-9);
        assert!((c.damage_taken_multiplier() - 1.2).abs() < 1e-9);
        assert!((c.amplification_from(other) - 0.3).abs() < 1e-9);
        assert!((c.amplification_from(InstanceId(8)) - 0.0).abs() < f64::EPSILON);
        assert!(!c.is_stunned());
        assert_eq!(c.debuffs().count(), 2);
        assert_eq!(c.buffs().count(), 0);
    }

    #[test]
    fn test_detach_effect() {
        let mut c = setup();
        c.push_effect(Effect::buff("a", "A", EffectDuration::Permanent));
        c.push_effect(Effect::buff("b", "B", EffectDuration::Permanent));
        assert_eq!(c.detach_effect("a").map(|e| e.id), Some("a".to_string()));
        assert!(c.detach_effect("a").is_none());
        assert_eq!(c.effects().len(), 1);
    }
}
