//! Roster - owns every combatant of one battle

use super::{Combatant, InstanceId, Team};

/// Arena of combatants keyed by instance id
///
/// Combatants are never dropped during a battle; death only removes them from
/// the active set, so an id handed out stays valid.
#[derive(Debug, Default)]
pub struct Roster {
    combatants: Vec<Combatant>,
    active: Vec<InstanceId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combatant, assigning its instance id and marking it active
    pub fn add(&mut self, mut combatant: Combatant) -> InstanceId {
        let id = InstanceId(self.combatants.len() as u32);
        combatant.instance_id = id;
        self.combatants.push(combatant);
        self.active.push(id);
        id
    }

    pub fn get(&self, id: InstanceId) -> Option<&Combatant> {
        self.combatants.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Combatant> {
        self.combatants.get_mut(id.0 as usize)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        (id.0 as usize) < self.combatants.len()
    }

    /// Alive and not removed from the battle
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.active.contains(&id) && self.get(id).is_some_and(Combatant::is_alive)
    }

    /// Remove from the active set (the combatant itself is kept)
    pub fn deactivate(&mut self, id: InstanceId) {
        self.active.retain(|a| *a != id);
    }

    /// Active ids in insertion order
    pub fn active_ids(&self) -> Vec<InstanceId> {
        self.active
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(Combatant::is_alive))
            .collect()
    }

    /// Active members of a team in insertion order
    pub fn team(&self, team: Team) -> Vec<InstanceId> {
        self.active_ids()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|c| c.team == team))
            .collect()
    }

    /// Active allies of `id`, including itself
    pub fn allies(&self, id: InstanceId) -> Vec<InstanceId> {
        match self.get(id) {
            Some(c) => self.team(c.team),
            None => Vec::new(),
        }
    }

    /// Active enemies of `id`
    pub fn enemies(&self, id: InstanceId) -> Vec<InstanceId> {
        match self.get(id) {
            Some(c) => self.team(c.team.opposing()),
            None => Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }
}
