//! Test utilities and mock types for carsight development.
//!
//! Provides [`MockWorld`], an in-memory implementation of the
//! [`World`] collaborator: an actor table, sensor channels the test
//! drives by hand, and a captured spectator pose.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use carsight_core::{
    ActorId, ActorState, SensorBlueprint, SensorError, SensorId, SensorKind, SensorReading,
    SensorStream, Transform, World,
};
use crossbeam_channel::Sender;
use indexmap::IndexMap;

struct MockSensor {
    blueprint: SensorBlueprint,
    parent: ActorId,
    sender: Sender<SensorReading>,
}

/// In-memory world.
///
/// Sensors are unbounded channels; tests push readings with
/// [`emit`](MockWorld::emit). A sensor whose receiver has been dropped
/// is reaped on the next `emit` to it.
pub struct MockWorld {
    ego: Mutex<Option<ActorId>>,
    actors: Mutex<IndexMap<ActorId, ActorState>>,
    sensors: Mutex<IndexMap<SensorId, MockSensor>>,
    spectator: Mutex<Option<Transform>>,
    next_sensor: AtomicU64,
    refuse_spawn: Mutex<Option<String>>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self {
            ego: Mutex::new(None),
            actors: Mutex::new(IndexMap::new()),
            sensors: Mutex::new(IndexMap::new()),
            spectator: Mutex::new(None),
            next_sensor: AtomicU64::new(1),
            refuse_spawn: Mutex::new(None),
        }
    }

    /// A world containing `ego` as the agent-controlled actor.
    pub fn with_ego(ego: ActorState) -> Self {
        let world = Self::new();
        world.set_ego(ego);
        world
    }

    /// Insert or replace the ego actor.
    pub fn set_ego(&self, ego: ActorState) {
        *self.ego.lock().unwrap() = Some(ego.id);
        self.add_actor(ego);
    }

    /// Insert or replace an actor.
    pub fn add_actor(&self, actor: ActorState) {
        self.actors.lock().unwrap().insert(actor.id, actor);
    }

    pub fn remove_actor(&self, id: ActorId) {
        self.actors.lock().unwrap().shift_remove(&id);
    }

    /// Move an existing actor. Returns `false` if it does not exist.
    pub fn set_transform(&self, id: ActorId, transform: Transform) -> bool {
        match self.actors.lock().unwrap().get_mut(&id) {
            Some(actor) => {
                actor.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Make every subsequent `spawn_sensor` fail with `reason`.
    pub fn refuse_spawns(&self, reason: &str) {
        *self.refuse_spawn.lock().unwrap() = Some(reason.to_string());
    }

    /// Push a reading to a sensor.
    ///
    /// Returns `false` (and reaps the sensor) if its receiver is gone.
    pub fn emit(&self, sensor: SensorId, reading: SensorReading) -> bool {
        let mut sensors = self.sensors.lock().unwrap();
        let Some(s) = sensors.get(&sensor) else {
            return false;
        };
        if s.sender.send(reading).is_err() {
            sensors.shift_remove(&sensor);
            return false;
        }
        true
    }

    /// Drop the sending half, disconnecting the handler's stream.
    pub fn disconnect(&self, sensor: SensorId) {
        self.sensors.lock().unwrap().shift_remove(&sensor);
    }

    /// First live sensor of a kind, in spawn order.
    pub fn sensor_of_kind(&self, kind: SensorKind) -> Option<SensorId> {
        self.sensors
            .lock()
            .unwrap()
            .iter()
            .find(|(_, s)| s.blueprint.kind == kind)
            .map(|(&id, _)| id)
    }

    pub fn sensor_blueprint(&self, sensor: SensorId) -> Option<SensorBlueprint> {
        self.sensors
            .lock()
            .unwrap()
            .get(&sensor)
            .map(|s| s.blueprint.clone())
    }

    pub fn sensor_parent(&self, sensor: SensorId) -> Option<ActorId> {
        self.sensors.lock().unwrap().get(&sensor).map(|s| s.parent)
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.lock().unwrap().len()
    }

    /// Last pose given to [`World::set_spectator`].
    pub fn spectator(&self) -> Option<Transform> {
        *self.spectator.lock().unwrap()
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl World for MockWorld {
    fn ego(&self) -> Option<ActorId> {
        *self.ego.lock().unwrap()
    }

    fn actor(&self, id: ActorId) -> Option<ActorState> {
        self.actors.lock().unwrap().get(&id).cloned()
    }

    fn actors(&self) -> Vec<ActorState> {
        self.actors.lock().unwrap().values().cloned().collect()
    }

    fn spawn_sensor(
        &self,
        blueprint: &SensorBlueprint,
        parent: ActorId,
    ) -> Result<SensorStream, SensorError> {
        if let Some(reason) = self.refuse_spawn.lock().unwrap().clone() {
            return Err(SensorError::SpawnFailed { reason });
        }
        if !self.actors.lock().unwrap().contains_key(&parent) {
            return Err(SensorError::SpawnFailed {
                reason: format!("parent actor {parent} does not exist"),
            });
        }
        let id = SensorId(self.next_sensor.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.sensors.lock().unwrap().insert(
            id,
            MockSensor {
                blueprint: blueprint.clone(),
                parent,
                sender,
            },
        );
        Ok(SensorStream { id, receiver })
    }

    fn set_spectator(&self, transform: Transform) -> Result<(), SensorError> {
        *self.spectator.lock().unwrap() = Some(transform);
        Ok(())
    }
}
