//! Spectator follow-camera handler.

use carsight_core::{ConfigError, HandlerError, Location, OutputSpec, Rotation, Transform};
use carsight_obs::{EnvState, Handler, HandlerOutput};

use crate::config::SpectatorConfig;

/// Keeps the simulator's free camera behind and above the ego.
///
/// Produces no fragment; its only effect is on the simulator view.
#[derive(Debug)]
pub struct SpectatorHandler {
    distance: f64,
    height: f64,
    pitch: f64,
}

impl SpectatorHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "spectator";

    /// Validate `config`.
    pub fn new(config: &SpectatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            distance: config.distance,
            height: config.height,
            pitch: config.pitch,
        })
    }

    /// Spectator pose for an ego at `ego`.
    pub fn follow(&self, ego: &Transform) -> Transform {
        let (x, y) = ego.to_world(-self.distance, 0.0);
        Transform::new(
            Location::new(x, y, ego.location.z + self.height),
            Rotation::new(self.pitch, ego.rotation.yaw, 0.0),
        )
    }
}

impl Handler for SpectatorHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        None
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let ego = env
            .world
            .actor(env.ego)
            .ok_or(HandlerError::MissingActor { id: env.ego })?;
        env.world.set_spectator(self.follow(&ego.transform))?;
        Ok(HandlerOutput::empty())
    }
}
