//! The default no-op handler.

use carsight_core::{HandlerError, OutputSpec};
use carsight_obs::{EnvState, Handler, HandlerOutput};

/// Produces no fragment and no info.
///
/// Useful as a placeholder key while assembling an observation.
#[derive(Clone, Copy, Debug, Default)]
pub struct BaseHandler;

impl BaseHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "base";

    /// Construct the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Handler for BaseHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        None
    }

    fn get_observation(&mut self, _env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        Ok(HandlerOutput::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carsight_core::{ActorId, FrameId, Info};
    use carsight_test_utils::MockWorld;

    #[test]
    fn produces_nothing() {
        let world = MockWorld::new();
        let values = Info::new();
        let env = EnvState::new(&world, FrameId(0), ActorId(0), &values);
        let mut h = BaseHandler::new();
        h.reset().unwrap();
        assert_eq!(h.get_observation(&env).unwrap(), HandlerOutput::empty());
        assert!(h.output_spec().is_none());
    }
}
