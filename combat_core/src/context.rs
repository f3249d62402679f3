//! CombatContext - everything a pipeline call needs, passed explicitly

use crate::combatant::{Combatant, InstanceId, Roster};
use crate::config::GameConstants;
use crate::log::BattleLog;
use crate::observer::{CombatObserver, Observers};
use crate::statistics::{NullStatistics, StatisticsSink};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Receiver of "this combatant's display is stale" notifications
pub trait UiNotifier {
    fn refresh(&mut self, id: InstanceId);
}

/// Notifier that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl UiNotifier for NullNotifier {
    fn refresh(&mut self, _id: InstanceId) {}
}

impl<T: UiNotifier> UiNotifier for Rc<RefCell<T>> {
    fn refresh(&mut self, id: InstanceId) {
        self.borrow_mut().refresh(id)
    }
}

/// Battlefield-wide conditions set by the match director
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub healing_disabled: bool,
    /// Multiplies every hit
    pub damage_multiplier: f64,
    /// Fraction removed from every hit
    pub damage_reduction: f64,
    /// Chance any ability use misses
    pub forced_miss_chance: f64,
    /// Flat healing each combatant receives on regeneration
    pub heal_per_turn: f64,
    /// Fraction of max HP each combatant receives on regeneration
    pub percent_heal_per_turn: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            healing_disabled: false,
            damage_multiplier: 1.0,
            damage_reduction: 0.0,
            forced_miss_chance: 0.0,
            heal_per_turn: 0.0,
            percent_heal_per_turn: 0.0,
        }
    }
}

/// Explicit dependencies of every combat operation
pub struct CombatContext {
    pub roster: Roster,
    pub environment: Environment,
    pub constants: GameConstants,
    pub observers: Observers,
    pub statistics: Box<dyn StatisticsSink>,
    pub ui: Box<dyn UiNotifier>,
    pub log: BattleLog,
    rng: ChaCha8Rng,
}

impl std::fmt::Debug for CombatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatContext")
            .field("roster", &self.roster)
            .field("environment", &self.environment)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl CombatContext {
    /// Create a context with an entropy-seeded RNG
    pub fn new(constants: GameConstants) -> Self {
        Self::with_rng(constants, ChaCha8Rng::from_entropy())
    }

    /// Create a context with a fixed seed (reproducible rolls)
    pub fn with_seed(constants: GameConstants, seed: u64) -> Self {
        Self::with_rng(constants, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(constants: GameConstants, rng: ChaCha8Rng) -> Self {
        let log = BattleLog::new(constants.feed.capacity);
        CombatContext {
            roster: Roster::new(),
            environment: Environment::default(),
            constants,
            observers: Observers::default(),
            statistics: Box::new(NullStatistics),
            ui: Box::new(NullNotifier),
            log,
            rng,
        }
    }

    pub fn with_statistics(mut self, sink: impl StatisticsSink + 'static) -> Self {
        self.statistics = Box::new(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: impl UiNotifier + 'static) -> Self {
        self.ui = Box::new(notifier);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn add_observer(&mut self, observer: impl CombatObserver + 'static) {
        self.observers.register(observer);
    }

    /// Roll against a probability; <= 0 never fires, >= 1 always fires
    pub fn roll(&mut self, chance: f64) -> bool {
        if !chance.is_finite() || chance <= 0.0 {
            return false;
        }
        if chance >= 1.0 {
            return true;
        }
        self.rng.gen::<f64>() < chance
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn combatant(&self, id: InstanceId) -> Option<&Combatant> {
        self.roster.get(id)
    }

    pub fn combatant_mut(&mut self, id: InstanceId) -> Option<&mut Combatant> {
        self.roster.get_mut(id)
    }

    /// Display name for feed lines
    pub(crate) fn name_of(&self, id: InstanceId) -> String {
        self.roster
            .get(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_edges_never_draw() {
        let mut ctx = CombatContext::with_seed(GameConstants::default(), 1);
        for _ in 0..100 {
            assert!(!ctx.roll(0.0));
            assert!(!ctx.roll(-1.0));
            assert!(!ctx.roll(f64::NAN));
            assert!(ctx.roll(1.0));
            assert!(ctx.roll(3.0));
        }
    }

    #[test]
    fn test_seeded_rolls_reproduce() {
        let mut a = CombatContext::with_seed(GameConstants::default(), 42);
        let mut b = CombatContext::with_seed(GameConstants::default(), 42);
        let rolls_a: Vec<bool> = (0..32).map(|_| a.roll(0.5)).collect();
        let rolls_b: Vec<bool> = (0..32).map(|_| b.roll(0.5)).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_feed_capacity_from_constants() {
        let mut constants = GameConstants::default();
        constants.feed.capacity = 3;
        let mut ctx = CombatContext::with_seed(constants, 0);
        for i in 0..5 {
            ctx.log.push(format!("line {}", i));
        }
        assert_eq!(ctx.log.len(), 3);
    }
}
