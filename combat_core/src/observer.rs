//! Typed combat notifications
//!
//! Listeners register on the combat context. The core never depends on any
//! listener existing.

use crate::combatant::InstanceId;
use crate::effect::EffectKind;
use crate::hooks::DeathVerdict;
use defs_core::DamageType;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct AbilityUsed {
    pub caster: InstanceId,
    pub ability_id: String,
    pub target: Option<InstanceId>,
    pub cost_paid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectApplied {
    pub target: InstanceId,
    pub effect_id: String,
    pub kind: EffectKind,
    pub applied_by: Option<InstanceId>,
    pub stacks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectRemoved {
    pub target: InstanceId,
    pub effect_id: String,
    pub kind: EffectKind,
    /// Ran out of duration, as opposed to being cleansed or broken
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Damaged {
    pub target: InstanceId,
    pub source: Option<InstanceId>,
    /// HP actually lost
    pub amount: f64,
    pub shield_absorbed: f64,
    pub damage_type: DamageType,
    pub is_critical: bool,
    pub ability_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Healed {
    pub target: InstanceId,
    pub healer: Option<InstanceId>,
    /// HP actually restored
    pub amount: f64,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriticalHit {
    pub source: Option<InstanceId>,
    pub target: InstanceId,
    pub amount: f64,
    pub is_heal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dodged {
    pub target: InstanceId,
    pub source: Option<InstanceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WouldDie {
    pub target: InstanceId,
    pub killer: Option<InstanceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Died {
    pub target: InstanceId,
    pub killer: Option<InstanceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summoned {
    pub summoned: InstanceId,
    pub summoner: Option<InstanceId>,
}

/// Listener for combat notifications; every method defaults to ignoring the event
pub trait CombatObserver {
    fn ability_used(&mut self, _event: &AbilityUsed) {}
    fn effect_applied(&mut self, _event: &EffectApplied) {}
    fn effect_removed(&mut self, _event: &EffectRemoved) {}
    fn damaged(&mut self, _event: &Damaged) {}
    fn healed(&mut self, _event: &Healed) {}
    fn critical_hit(&mut self, _event: &CriticalHit) {}
    fn dodged(&mut self, _event: &Dodged) {}

    /// The only cancellable notification
    fn would_die(&mut self, _event: &WouldDie) -> DeathVerdict {
        DeathVerdict::Allow
    }

    fn died(&mut self, _event: &Died) {}
    fn summoned(&mut self, _event: &Summoned) {}
}

impl<T: CombatObserver> CombatObserver for Rc<RefCell<T>> {
    fn ability_used(&mut self, event: &AbilityUsed) {
        self.borrow_mut().ability_used(event)
    }
    fn effect_applied(&mut self, event: &EffectApplied) {
        self.borrow_mut().effect_applied(event)
    }
    fn effect_removed(&mut self, event: &EffectRemoved) {
        self.borrow_mut().effect_removed(event)
    }
    fn damaged(&mut self, event: &Damaged) {
        self.borrow_mut().damaged(event)
    }
    fn healed(&mut self, event: &Healed) {
        self.borrow_mut().healed(event)
    }
    fn critical_hit(&mut self, event: &CriticalHit) {
        self.borrow_mut().critical_hit(event)
    }
    fn dodged(&mut self, event: &Dodged) {
        self.borrow_mut().dodged(event)
    }
    fn would_die(&mut self, event: &WouldDie) -> DeathVerdict {
        self.borrow_mut().would_die(event)
    }
    fn died(&mut self, event: &Died) {
        self.borrow_mut().died(event)
    }
    fn summoned(&mut self, event: &Summoned) {
        self.borrow_mut().summoned(event)
    }
}

/// Registered observers, notified in registration order
#[derive(Default)]
pub struct Observers {
    listeners: Vec<Box<dyn CombatObserver>>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("count", &self.listeners.len()).finish()
    }
}

impl Observers {
    pub fn register(&mut self, observer: impl CombatObserver + 'static) {
        self.listeners.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn ability_used(&mut self, event: &AbilityUsed) {
        self.listeners.iter_mut().for_each(|l| l.ability_used(event));
    }

    pub fn effect_applied(&mut self, event: &EffectApplied) {
        self.listeners.iter_mut().for_each(|l| l.effect_applied(event));
    }

    pub fn effect_removed(&mut self, event: &EffectRemoved) {
        self.listeners.iter_mut().for_each(|l| l.effect_removed(event));
    }

    pub fn damaged(&mut self, event: &Damaged) {
        self.listeners.iter_mut().for_each(|l| l.damaged(event));
    }

    pub fn healed(&mut self, event: &Healed) {
        self.listeners.iter_mut().for_each(|l| l.healed(event));
    }

    pub fn critical_hit(&mut self, event: &CriticalHit) {
        self.listeners.iter_mut().for_each(|l| l.critical_hit(event));
    }

    pub fn dodged(&mut self, event: &Dodged) {
        self.listeners.iter_mut().for_each(|l| l.dodged(event));
    }

    /// Every listener is asked; any single veto prevents the death
    pub fn would_die(&mut self, event: &WouldDie) -> DeathVerdict {
        let mut verdict = DeathVerdict::Allow;
        for listener in self.listeners.iter_mut() {
            if listener.would_die(event) == DeathVerdict::Prevent {
                verdict = DeathVerdict::Prevent;
            }
        }
        verdict
    }

    pub fn died(&mut self, event: &Died) {
        self.listeners.iter_mut().for_each(|l| l.died(event));
    }

    pub fn summoned(&mut self, event: &Summoned) {
        self.listeners.iter_mut().for_each(|l| l.summoned(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        damaged: Vec<f64>,
    }

    impl CombatObserver for Recorder {
        fn damaged(&mut self, event: &Damaged) {
            self.damaged.push(event.amount);
        }
    }

    struct Guardian;

    impl CombatObserver for Guardian {
        fn would_die(&mut self, _event: &WouldDie) -> DeathVerdict {
            DeathVerdict::Prevent
        }
    }

    #[test]
    fn test_shared_observer_sees_events() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut observers = Observers::default();
        observers.register(Rc::clone(&recorder));

        observers.damaged(&Damaged {
            target: InstanceId(1),
            source: None,
            amount: 12.0,
            shield_absorbed: 0.0,
            damage_type: DamageType::Physical,
            is_critical: false,
            ability_id: None,
        });

        assert_eq!(recorder.borrow().damaged, vec![12.0]);
    }

    #[test]
    fn test_any_veto_prevents_death() {
        let mut observers = Observers::default();
        let event = WouldDie { target: InstanceId(0), killer: None };
        assert_eq!(observers.would_die(&event), DeathVerdict::Allow);

        observers.register(Recorder::default());
        observers.register(Guardian);
        assert_eq!(observers.would_die(&event), DeathVerdict::Prevent);
    }
}
