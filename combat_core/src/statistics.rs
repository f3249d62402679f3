//! Battle statistics sinks

use crate::combatant::InstanceId;
use defs_core::DamageType;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Best-effort statistics collector
///
/// Methods return nothing, so a sink can never fail back into the pipeline.
pub trait StatisticsSink {
    fn record_ability_use(&mut self, _caster: InstanceId, _ability_id: &str) {}
    fn record_damage(&mut self, _source: Option<InstanceId>, _target: InstanceId, _amount: f64, _damage_type: DamageType) {}
    fn record_healing(&mut self, _healer: Option<InstanceId>, _target: InstanceId, _amount: f64) {}
    fn record_dodge(&mut self, _target: InstanceId) {}
    fn record_shield_absorbed(&mut self, _target: InstanceId, _amount: f64) {}
    fn record_status_effect(&mut self, _source: Option<InstanceId>, _target: InstanceId, _effect_id: &str) {}
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatistics;

impl StatisticsSink for NullStatistics {}

impl<T: StatisticsSink> StatisticsSink for Rc<RefCell<T>> {
    fn record_ability_use(&mut self, caster: InstanceId, ability_id: &str) {
        self.borrow_mut().record_ability_use(caster, ability_id)
    }
    fn record_damage(&mut self, source: Option<InstanceId>, target: InstanceId, amount: f64, damage_type: DamageType) {
        self.borrow_mut().record_damage(source, target, amount, damage_type)
    }
    fn record_healing(&mut self, healer: Option<InstanceId>, target: InstanceId, amount: f64) {
        self.borrow_mut().record_healing(healer, target, amount)
    }
    fn record_dodge(&mut self, target: InstanceId) {
        self.borrow_mut().record_dodge(target)
    }
    fn record_shield_absorbed(&mut self, target: InstanceId, amount: f64) {
        self.borrow_mut().record_shield_absorbed(target, amount)
    }
    fn record_status_effect(&mut self, source: Option<InstanceId>, target: InstanceId, effect_id: &str) {
        self.borrow_mut().record_status_effect(source, target, effect_id)
    }
}

/// Totals for one combatant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatantStats {
    pub abilities_used: u32,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub healing_done: f64,
    pub healing_received: f64,
    pub dodges: u32,
    pub shield_absorbed: f64,
    pub effects_applied: u32,
    pub effects_received: u32,
}

/// In-memory statistics per combatant
#[derive(Debug, Clone, Default)]
pub struct BattleStatistics {
    per_combatant: BTreeMap<InstanceId, CombatantStats>,
}

impl BattleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: InstanceId) -> Option<&CombatantStats> {
        self.per_combatant.get(&id)
    }

    pub fn total_damage(&self) -> f64 {
        self.per_combatant.values().map(|s| s.damage_dealt).sum()
    }

    fn entry(&mut self, id: InstanceId) -> &mut CombatantStats {
        self.per_combatant.entry(id).or_default()
    }
}

impl StatisticsSink for BattleStatistics {
    fn record_ability_use(&mut self, caster: InstanceId, _ability_id: &str) {
        self.entry(caster).abilities_used += 1;
    }

    fn record_damage(&mut self, source: Option<InstanceId>, target: InstanceId, amount: f64, _damage_type: DamageType) {
        if let Some(source) = source {
            self.entry(source).damage_dealt += amount;
        }
        self.entry(target).damage_taken += amount;
    }

    fn record_healing(&mut self, healer: Option<InstanceId>, target: InstanceId, amount: f64) {
        if let Some(healer) = healer {
            self.entry(healer).healing_done += amount;
        }
        self.entry(target).healing_received += amount;
    }

    fn record_dodge(&mut self, target: InstanceId) {
        self.entry(target).dodges += 1;
    }

    fn record_shield_absorbed(&mut self, target: InstanceId, amount: f64) {
        self.entry(target).shield_absorbed += amount;
    }

    fn record_status_effect(&mut self, source: Option<InstanceId>, target: InstanceId, _effect_id: &str) {
        if let Some(source) = source {
            self.entry(source).effects_applied += 1;
        }
        self.entry(target).effects_received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_statistics_attribution() {
        let mut stats = BattleStatistics::new();
        let a = InstanceId(0);
        let b = InstanceId(1);

        stats.record_damage(Some(a), b, 40.0, DamageType::Physical);
        stats.record_damage(None, b, 5.0, DamageType::True);
        stats.record_healing(Some(a), a, 12.0);
        stats.record_dodge(b);

        let a_stats = stats.get(a).unwrap();
        assert!((a_stats.damage_dealt - 40.0).abs() < f64::EPSILON);
        assert!((a_stats.healing_done - 12.0).abs() < f64::EPSILON);
        assert!((a_stats.healing_received - 12.0).abs() < f64::EPSILON);

        let b_stats = stats.get(b).unwrap();
        assert!((b_stats.damage_taken - 45.0).abs() < f64::EPSILON);
        assert_eq!(b_stats.dodges, 1);
        assert!((stats.total_damage() - 40.0).abs() < f64::EPSILON);
    }
}
