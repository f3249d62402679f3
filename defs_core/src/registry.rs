use crate::definition::CharacterDefinition;
use crate::talent::{TalentEffect, TalentTree};
use crate::DefinitionError;
use std::collections::{BTreeMap, BTreeSet};

/// Already-parsed definitions for one match, keyed by template id
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    characters: BTreeMap<String, CharacterDefinition>,
    talent_trees: BTreeMap<String, TalentTree>,
}

impl DefinitionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a character definition
    pub fn insert_character(&mut self, definition: CharacterDefinition) -> Result<(), DefinitionError> {
        if self.characters.contains_key(&definition.id) {
            return Err(DefinitionError::DuplicateCharacter(definition.id));
        }
        self.characters.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Register (or replace) the talent tree of a character
    pub fn insert_talent_tree(&mut self, character_id: impl Into<String>, tree: TalentTree) {
        self.talent_trees.insert(character_id.into(), tree);
    }

    /// Get a character definition by template id
    pub fn character(&self, id: &str) -> Option<&CharacterDefinition> {
        self.characters.get(id)
    }

    /// Get the talent tree of a character
    pub fn talent_tree(&self, character_id: &str) -> Option<&TalentTree> {
        self.talent_trees.get(character_id)
    }

    /// List all character ids
    pub fn character_ids(&self) -> impl Iterator<Item = &str> {
        self.characters.keys().map(|s| s.as_str())
    }

    /// Check cross references, returning every problem found
    ///
    /// Problems are configuration errors: the combat core logs and skips the
    /// offending unit, so a non-empty result is not fatal.
    pub fn validate(&self) -> Vec<DefinitionError> {
        let mut problems = Vec::new();

        for def in self.characters.values() {
            let mut seen = BTreeSet::new();
            for ability in &def.abilities {
                if !seen.insert(ability.id.as_str()) {
                    problems.push(DefinitionError::DuplicateAbility {
                        character: def.id.clone(),
                        ability: ability.id.clone(),
                    });
                }
                if ability.effect.is_none() {
                    problems.push(DefinitionError::MissingAbilityEffect {
                        character: def.id.clone(),
                        ability: ability.id.clone(),
                    });
                }
            }
        }

        for (character_id, tree) in &self.talent_trees {
            let Some(def) = self.characters.get(character_id) else {
                problems.push(DefinitionError::UnknownCharacter(character_id.clone()));
                continue;
            };

            for talent in tree.iter() {
                for effect in &talent.effects {
                    match effect {
                        TalentEffect::ModifyAbility { ability_id, .. } if def.ability(ability_id).is_none() => {
                            problems.push(DefinitionError::UnknownAbility {
                                talent: talent.id.clone(),
                                ability: ability_id.clone(),
                            });
                        }
                        TalentEffect::Unknown => {
                            problems.push(DefinitionError::UnknownEffectType(talent.id.clone()));
                        }
                        _ => {}
                    }
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::AbilityDescriptor;
    use crate::talent::TalentDefinition;
    use crate::types::{Attributes, PropertyValue};

    fn knight() -> CharacterDefinition {
        CharacterDefinition::new("knight", "Knight", Attributes::default())
            .with_ability(AbilityDescriptor::new("bash", "Bash").with_effect("damage"))
    }

    #[test]
    fn test_duplicate_character_rejected() {
        let mut set = DefinitionSet::new();
        set.insert_character(knight()).unwrap();
        let err = set.insert_character(knight()).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateCharacter(id) if id == "knight"));
    }

    #[test]
    fn test_valid_set_has_no_problems() {
        let mut set = DefinitionSet::new();
        set.insert_character(knight()).unwrap();
        set.insert_talent_tree(
            "knight",
            TalentTree::from_definitions([TalentDefinition::new("quick_bash", "Quick Bash")
                .with_effect(TalentEffect::ModifyAbility {
                    ability_id: "bash".to_string(),
                    property: "cooldown".to_string(),
                    operation: None,
                    value: PropertyValue::Number(1.0),
                })]),
        );
        assert!(set.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut set = DefinitionSet::new();
        let def = knight()
            .with_ability(AbilityDescriptor::new("bash", "Bash Again").with_effect("damage"))
            .with_ability(AbilityDescriptor::new("shout", "Shout"));
        set.insert_character(def).unwrap();
        set.insert_talent_tree(
            "knight",
            TalentTree::from_definitions([TalentDefinition::new("broken", "Broken")
                .with_effect(TalentEffect::ModifyAbility {
                    ability_id: "missing".to_string(),
                    property: "cooldown".to_string(),
                    operation: None,
                    value: PropertyValue::Number(1.0),
                })
                .with_effect(TalentEffect::Unknown)]),
        );
        set.insert_talent_tree("ghost", TalentTree::new());

        let problems = set.validate();
        assert_eq!(problems.len(), 5);
    }
}
