//! ManagedActorSet - Actor Factory output
//!
//! Bookkeeping of every actor the orchestrator owns and must destroy.

use std::collections::HashSet;

/// CARLA actor handle type
pub type ActorId = u32;

/// Pedestrian tracked by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedPedestrian {
    /// Pedestrian actor
    pub actor_id: ActorId,

    /// AI controller paired with this pedestrian (None if its spawn failed)
    pub controller_id: Option<ActorId>,

    /// Max speed chosen at spawn time (m/s)
    pub max_speed: f64,
}

/// Managed actor set
///
/// Every id in here was created by the owning orchestrator and is destroyed
/// by it exactly once. Ids of failed spawns are never inserted.
#[derive(Debug, Clone, Default)]
pub struct ManagedActorSet {
    vehicles: Vec<ActorId>,
    pedestrians: Vec<ManagedPedestrian>,
    known: HashSet<ActorId>,
}

impl ManagedActorSet {
    /// Create empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register vehicle. Returns false if the id is already tracked.
    pub fn register_vehicle(&mut self, actor_id: ActorId) -> bool {
        if !self.known.insert(actor_id) {
            return false;
        }
        self.vehicles.push(actor_id);
        true
    }

    /// Register pedestrian with its chosen max speed. Returns false if already tracked.
    pub fn register_pedestrian(&mut self, actor_id: ActorId, max_speed: f64) -> bool {
        if !self.known.insert(actor_id) {
            return false;
        }
        self.pedestrians.push(ManagedPedestrian {
            actor_id,
            controller_id: None,
            max_speed,
        });
        true
    }

    /// Pair the controller with the pedestrian at survivor index `index`.
    ///
    /// Returns false if the index is out of range, the slot is already paired
    /// or the controller id is already tracked.
    pub fn attach_controller(&mut self, index: usize, controller_id: ActorId) -> bool {
        let Some(slot) = self.pedestrians.get_mut(index) else {
            return false;
        };
        if slot.controller_id.is_some() || !self.known.insert(controller_id) {
            return false;
        }
        slot.controller_id = Some(controller_id);
        true
    }

    pub fn vehicle_ids(&self) -> &[ActorId] {
        &self.vehicles
    }

    pub fn pedestrians(&self) -> &[ManagedPedestrian] {
        &self.pedestrians
    }

    pub fn pedestrian_ids(&self) -> Vec<ActorId> {
        self.pedestrians.iter().map(|p| p.actor_id).collect()
    }

    /// Controller ids in pairing order
    pub fn controller_ids(&self) -> Vec<ActorId> {
        self.pedestrians
            .iter()
            .filter_map(|p| p.controller_id)
            .collect()
    }

    /// Controllers and pedestrians interleaved, controller first
    pub fn pedestrian_and_controller_ids(&self) -> Vec<ActorId> {
        self.pedestrians
            .iter()
            .flat_map(|p| p.controller_id.into_iter().chain(std::iter::once(p.actor_id)))
            .collect()
    }

    /// Total number of tracked actors
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Move everything out, leaving the set empty.
    ///
    /// Teardown drains the set so that a second teardown finds nothing to destroy.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_duplicates() {
        let mut set = ManagedActorSet::new();
        assert!(set.register_vehicle(10));
        assert!(!set.register_vehicle(10));
        assert!(!set.register_pedestrian(10, 1.4));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_controller_pairing_by_survivor_index() {
        let mut set = ManagedActorSet::new();
        set.register_pedestrian(20, 1.4);
        set.register_pedestrian(22, 2.0);

        assert!(set.attach_controller(1, 31));
        assert!(!set.attach_controller(1, 32));
        assert!(!set.attach_controller(5, 33));

        assert_eq!(set.controller_ids(), vec![31]);
        assert_eq!(set.pedestrian_and_controller_ids(), vec![20, 31, 22]);
        assert_eq!(set.pedestrians()[1].controller_id, Some(31));
    }

    #[test]
    fn test_take_empties_set() {
        let mut set = ManagedActorSet::new();
        set.register_vehicle(1);
        let taken = set.take();
        assert_eq!(taken.vehicle_ids(), &[1]);
        assert!(set.is_empty());
    }
}
