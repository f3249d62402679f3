//! Mitigation - armor and magical resistance
//!
//! Formula:
//! - fraction = clamp(defense / divisor, 0, cap)
//! - damage_taken = max(floor(damage * (1 - fraction)), minimum)
//!
//! With the default cap of 0.8 at least 20% of every hit gets through.

use super::floor_stage;
use crate::config::{GameConstants, MitigationConstants};
use defs_core::{Attributes, DamageType};

/// Fraction of damage removed by a defense value
pub fn mitigation_fraction(defense: f64, constants: &MitigationConstants) -> f64 {
    if !defense.is_finite() || constants.divisor <= 0.0 {
        return 0.0;
    }
    (defense / constants.divisor).clamp(0.0, constants.cap)
}

/// Defense stat that applies to a damage type (true damage has none)
pub fn defense_for(attributes: &Attributes, damage_type: DamageType) -> Option<f64> {
    match damage_type {
        DamageType::Physical => Some(attributes.armor),
        DamageType::Magical => Some(attributes.magical_resistance),
        DamageType::True => None,
    }
}

/// Calculate damage after the defender's armor or resistance
///
/// Result is floored with the configured minimum.
pub fn calculate_mitigated_damage(
    damage: f64,
    damage_type: DamageType,
    defender: &Attributes,
    constants: &GameConstants,
) -> f64 {
    let Some(defense) = defense_for(defender, damage_type) else {
        return damage;
    };
    let fraction = mitigation_fraction(defense, &constants.mitigation);
    floor_stage(damage * (1.0 - fraction)).max(constants.damage.minimum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defender(armor: f64, resist: f64) -> Attributes {
        Attributes {
            armor,
            magical_resistance: resist,
            ..Default::default()
        }
    }

    #[test]
    fn test_half_mitigation() {
        let constants = GameConstants::default();
        let damage = calculate_mitigated_damage(100.0, DamageType::Physical, &defender(50.0, 0.0), &constants);
        assert!((damage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mitigation_cap() {
        let constants = GameConstants::default();
        assert!((mitigation_fraction(1000.0, &constants.mitigation) - 0.8).abs() < f64::EPSILON);
        let damage = calculate_mitigated_damage(100.0, DamageType::Physical, &defender(1000.0, 0.0), &constants);
        assert!((damage - 20.0).abs() < 1e-9);

        // Minimum damage still applies under the cap
        let damage = calculate_mitigated_damage(2.0, DamageType::Magical, &defender(0.0, 1000.0), &constants);
        assert!((damage - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cap_holds_on_odd_amounts() {
        let constants = GameConstants::default();
        for amount in [5.0, 40.0, 95.0, 100.0, 1234.0] {
            let damage = calculate_mitigated_damage(amount, DamageType::Physical, &defender(1052.14, 0.0), &constants);
            assert!(damage >= (amount * 0.2).floor(), "{} let through {}", amount, damage);
        }
    }

    #[test]
    fn test_negative_defense_does_not_amplify() {
        let constants = GameConstants::default();
        assert!((mitigation_fraction(-40.0, &constants.mitigation) - 0.0).abs() < f64::EPSILON);
        assert!((mitigation_fraction(f64::NAN, &constants.mitigation) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_defense_per_damage_type() {
        let constants = GameConstants::default();
        let target = defender(0.0, 30.0);
        let physical = calculate_mitigated_damage(100.0, DamageType::Physical, &target, &constants);
        let magical = calculate_mitigated_damage(100.0, DamageType::Magical, &target, &constants);
        let true_damage = calculate_mitigated_damage(100.0, DamageType::True, &defender(500.0, 500.0), &constants);
        assert!((physical - 100.0).abs() < f64::EPSILON);
        assert!((magical - 70.0).abs() < f64::EPSILON);
        assert!((true_damage - 100.0).abs() < f64::EPSILON);
    }
}
