//! Collision handler.

use std::collections::VecDeque;

use carsight_core::{
    CollisionEvent, ConfigError, Dtype, Fragment, HandlerError, OutputSpec, SensorBlueprint,
    SensorKind, SensorReading, World,
};
use carsight_obs::{EnvState, Handler, HandlerOutput};
use smallvec::smallvec;
use tracing::{debug, trace};

use crate::config::CollisionConfig;
use crate::sensor::{spawn_on_ego, SensorFeed};

/// Reports the collision intensity of the current frame as a `(1,)`
/// vector.
///
/// Never blocks: collisions are sparse, so an empty channel simply means
/// no contact. Events accumulate in a bounded per-episode history; an
/// event that arrives after its frame was observed is kept there but
/// not reported.
#[derive(Debug)]
pub struct CollisionHandler {
    spec: OutputSpec,
    history_len: usize,
    history: VecDeque<CollisionEvent>,
    feed: SensorFeed,
}

impl CollisionHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "collision";

    /// Validate `config` and spawn the collision sensor on the ego.
    pub fn new(world: &dyn World, config: &CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (_, stream) = spawn_on_ego(world, &SensorBlueprint::new(SensorKind::Collision))?;
        Ok(Self {
            spec: OutputSpec::vector(1, Dtype::F32),
            history_len: config.history_len,
            history: VecDeque::with_capacity(config.history_len),
            // Collision reads never wait.
            feed: SensorFeed::new(stream, std::time::Duration::ZERO),
        })
    }

    /// Events seen this episode, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.history.iter()
    }

    fn record(&mut self, event: CollisionEvent) {
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }
}

impl Handler for CollisionHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn reset(&mut self) -> Result<(), HandlerError> {
        self.history.clear();
        self.feed.clear();
        Ok(())
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let sensor = self.feed.id();
        let drained = self.feed.drain()?;

        // Summed before recording, so history eviction cannot drop any of
        // this frame's events.
        let mut intensity = 0.0f64;
        let mut hit = false;
        let mut other = None;
        for event in self.history.iter().filter(|e| e.frame == env.frame) {
            intensity += event.intensity();
            hit = true;
            other = event.other.or(other);
        }
        for reading in drained {
            let SensorReading::Collision(event) = reading else {
                return Err(HandlerError::UnexpectedReading {
                    sensor,
                    expected: SensorKind::Collision,
                });
            };
            if event.frame == env.frame {
                intensity += event.intensity();
                hit = true;
                other = event.other.or(other);
            } else if event.frame < env.frame {
                trace!(
                    sensor = %sensor,
                    have = %event.frame,
                    want = %env.frame,
                    "late collision"
                );
            }
            debug!(frame = %event.frame, other = ?event.other, "collision");
            self.record(event);
        }

        let fragment = Fragment::from_f32(smallvec![1], vec![intensity as f32])?;
        let mut output = HandlerOutput::new(fragment).with_info("collision", hit);
        if let Some(other) = other {
            output = output.with_info("collision_actor", other.0 as i64);
        }
        Ok(output)
    }
}
