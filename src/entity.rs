// ==============================================================================
// entity.rs — ENTITY ARENA + CAPABILITY BUCKETS
// ------------------------------------------------------------------------------
// Entities live in generation-checked slots. Each one declares what it can do
// through the `as_*` accessors; at admission it is filed into the matching
// buckets, in insertion order:
//
//   input     Inputtable::handle_inputs
//   physics   Physical::update_physics     (after the world step)
//   movement  Movable::update_movement
//   tuning    Tunable::apply_tuning
//
// add_entity only queues. update_entities, once per tick, first sweeps out
// inactive entities and then admits the queue, so the buckets never change
// while a phase iterates them.
// ==============================================================================

use tracing::debug;

use crate::input::KeySignal;
use crate::physics::PhysicsWorld;
use crate::tuning::TuningUpdate;
use crate::vehicle::telemetry::Telemetry;

pub trait Inputtable {
    fn handle_inputs(&mut self, signals: &[KeySignal], world: &mut PhysicsWorld);
}

pub trait Physical {
    fn update_physics(&mut self, world: &mut PhysicsWorld, dt: f32);
}

pub trait Movable {
    fn update_movement(&mut self, dt: f32);
}

pub trait Tunable {
    fn apply_tuning(&mut self, update: &TuningUpdate);
}

pub trait Entity: Send {
    fn name(&self) -> &str;

    /// Inactive entities are removed at the next sweep.
    fn is_active(&self) -> bool {
        true
    }

    fn as_inputtable(&mut self) -> Option<&mut dyn Inputtable> {
        None
    }

    fn as_physical(&mut self) -> Option<&mut dyn Physical> {
        None
    }

    fn as_movable(&mut self) -> Option<&mut dyn Movable> {
        None
    }

    fn as_tunable(&mut self) -> Option<&mut dyn Tunable> {
        None
    }

    fn telemetry(&self) -> Option<Telemetry> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    entity: Option<Box<dyn Entity>>,
}

#[derive(Default)]
pub struct EntityManager {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pending: Vec<(EntityId, Box<dyn Entity>)>,

    // systems
    input: Vec<EntityId>,
    physics: Vec<EntityId>,
    movement: Vec<EntityId>,
    tuning: Vec<EntityId>,
}

/// Live entity behind `id`, if the slot still holds that generation.
fn slot_entity(slots: &mut [Slot], id: EntityId) -> Option<&mut Box<dyn Entity>> {
    slots
        .get_mut(id.index as usize)
        .filter(|s| s.generation == id.generation)
        .and_then(|s| s.entity.as_mut())
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id and queue the entity; it joins the systems at the next
    /// `update_entities`.
    pub fn add_entity(&mut self, entity: Box<dyn Entity>) -> EntityId {
        let id = match self.free.pop() {
            Some(index) => EntityId { index, generation: self.slots[index as usize].generation },
            None => {
                self.slots.push(Slot { generation: 0, entity: None });
                EntityId { index: (self.slots.len() - 1) as u32, generation: 0 }
            }
        };
        self.pending.push((id, entity));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn Entity> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_deref())
    }

    /// Admitted entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entity.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn update_entities(&mut self) {
        self.update_removal();
        self.add_pending();
    }

    fn update_removal(&mut self) {
        let mut removed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let inactive = slot.entity.as_ref().is_some_and(|e| !e.is_active());
            if !inactive {
                continue;
            }
            if let Some(entity) = slot.entity.take() {
                debug!(name = entity.name(), index, "entity removed");
            }
            removed.push(EntityId { index: index as u32, generation: slot.generation });
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index as u32);
        }

        if removed.is_empty() {
            return;
        }
        for system in [&mut self.input, &mut self.physics, &mut self.movement, &mut self.tuning] {
            system.retain(|id| !removed.contains(id));
        }
    }

    fn add_pending(&mut self) {
        for (id, mut entity) in self.pending.drain(..) {
            if entity.as_inputtable().is_some() {
                self.input.push(id);
            }
            if entity.as_physical().is_some() {
                self.physics.push(id);
            }
            if entity.as_movable().is_some() {
                self.movement.push(id);
            }
            if entity.as_tunable().is_some() {
                self.tuning.push(id);
            }
            debug!(name = entity.name(), index = id.index, "entity admitted");
            self.slots[id.index as usize].entity = Some(entity);
        }
    }

    pub fn handle_inputs(&mut self, signals: &[KeySignal], world: &mut PhysicsWorld) {
        for &id in &self.input {
            if let Some(e) = slot_entity(&mut self.slots, id).and_then(|e| e.as_inputtable()) {
                e.handle_inputs(signals, world);
            }
        }
    }

    /// Step the world, then let every physical entity react to the new state.
    pub fn update_physics(&mut self, world: &mut PhysicsWorld, dt: f32) {
        world.step();
        for &id in &self.physics {
            if let Some(e) = slot_entity(&mut self.slots, id).and_then(|e| e.as_physical()) {
                e.update_physics(world, dt);
            }
        }
    }

    pub fn update_movement(&mut self, dt: f32) {
        for &id in &self.movement {
            if let Some(e) = slot_entity(&mut self.slots, id).and_then(|e| e.as_movable()) {
                e.update_movement(dt);
            }
        }
    }

    pub fn apply_tuning(&mut self, update: &TuningUpdate) {
        for &id in &self.tuning {
            if let Some(e) = slot_entity(&mut self.slots, id).and_then(|e| e.as_tunable()) {
                e.apply_tuning(update);
            }
        }
    }

    /// Telemetry of the first admitted entity that reports any.
    pub fn telemetry(&self) -> Option<Telemetry> {
        self.slots.iter().filter_map(|s| s.entity.as_ref()).find_map(|e| e.telemetry())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: String,
        log: Log,
        active: Arc<Mutex<bool>>,
        physical: bool,
    }

    impl Recorder {
        fn boxed(name: &str, log: &Log, physical: bool) -> (Box<dyn Entity>, Arc<Mutex<bool>>) {
            let active = Arc::new(Mutex::new(true));
            let recorder = Recorder { name: name.to_string(), log: Arc::clone(log), active: Arc::clone(&active), physical };
            (Box::new(recorder), active)
        }

        fn record(&self, phase: &str) {
            self.log.lock().expect("log").push(format!("{phase}:{}", self.name));
        }
    }

    impl Entity for Recorder {
        fn name(&self) -> &str {
            &self.name
        }
        fn is_active(&self) -> bool {
            *self.active.lock().expect("flag")
        }
        fn as_inputtable(&mut self) -> Option<&mut dyn Inputtable> {
            Some(self)
        }
        fn as_physical(&mut self) -> Option<&mut dyn Physical> {
            if self.physical {
                Some(self)
            } else {
                None
            }
        }
        fn as_movable(&mut self) -> Option<&mut dyn Movable> {
            Some(self)
        }
    }

    impl Inputtable for Recorder {
        fn handle_inputs(&mut self, _signals: &[KeySignal], _world: &mut PhysicsWorld) {
            self.record("input");
        }
    }

    impl Physical for Recorder {
        fn update_physics(&mut self, _world: &mut PhysicsWorld, _dt: f32) {
            self.record("physics");
        }
    }

    impl Movable for Recorder {
        fn update_movement(&mut self, _dt: f32) {
            self.record("move");
        }
    }

    fn tick(manager: &mut EntityManager, world: &mut PhysicsWorld) {
        manager.handle_inputs(&[], world);
        manager.update_entities();
        manager.update_physics(world, 1.0 / 60.0);
        manager.update_movement(1.0 / 60.0);
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().expect("log"))
    }

    #[test]
    fn entities_join_on_the_next_update() {
        let log = Log::default();
        let mut world = PhysicsWorld::new();
        let mut manager = EntityManager::new();

        let (a, _) = Recorder::boxed("a", &log, true);
        let id = manager.add_entity(a);
        assert_eq!(manager.pending_len(), 1);
        assert!(manager.get(id).is_none());

        // queued entity misses this tick's input phase, then joins
        tick(&mut manager, &mut world);
        assert_eq!(drain(&log), ["physics:a", "move:a"]);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get(id).map(|e| e.name()), Some("a"));
    }

    #[test]
    fn phases_keep_insertion_order_and_capabilities() {
        let log = Log::default();
        let mut world = PhysicsWorld::new();
        let mut manager = EntityManager::new();

        for (name, physical) in [("a", true), ("b", false), ("c", true)] {
            let (recorder, _) = Recorder::boxed(name, &log, physical);
            manager.add_entity(recorder);
        }
        manager.update_entities();
        tick(&mut manager, &mut world);

        assert_eq!(
            drain(&log),
            ["input:a", "input:b", "input:c", "physics:a", "physics:c", "move:a", "move:b", "move:c"]
        );
    }

    #[test]
    fn inactive_entities_are_swept_and_slots_reused() {
        let log = Log::default();
        let mut world = PhysicsWorld::new();
        let mut manager = EntityManager::new();

        let (a, a_active) = Recorder::boxed("a", &log, true);
        let (b, _) = Recorder::boxed("b", &log, true);
        let a_id = manager.add_entity(a);
        manager.add_entity(b);
        manager.update_entities();

        *a_active.lock().expect("flag") = false;
        tick(&mut manager, &mut world);
        // "a" still took input this tick; it is gone from physics and movement
        assert_eq!(drain(&log), ["input:a", "input:b", "physics:b", "move:b"]);
        assert!(manager.get(a_id).is_none());

        let (c, _) = Recorder::boxed("c", &log, false);
        let c_id = manager.add_entity(c);
        manager.update_entities();
        assert_ne!(c_id, a_id, "reused slot must carry a new generation");
        assert!(manager.get(a_id).is_none());
        assert_eq!(manager.get(c_id).map(|e| e.name()), Some("c"));
        assert_eq!(manager.len(), 2);
    }
}
