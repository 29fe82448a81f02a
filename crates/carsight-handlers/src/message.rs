//! Scalar message handler.

use carsight_core::{ConfigError, Dtype, Fragment, HandlerError, OutputSpec};
use carsight_obs::{EnvState, Handler, HandlerOutput};

use crate::config::MessageConfig;

/// Packs named scalar environment values into an `f32` vector.
///
/// `Scalar` and `Int` values are cast, `Flag` becomes `0.0` / `1.0`.
/// Output order follows the configured key order.
#[derive(Debug)]
pub struct MessageHandler {
    spec: OutputSpec,
    keys: Vec<String>,
}

impl MessageHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "message";

    /// Validate `config`.
    pub fn new(config: &MessageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            spec: OutputSpec::vector(config.keys.len(), Dtype::F32),
            keys: config.keys.clone(),
        })
    }
}

impl Handler for MessageHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let mut message = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let value = env.require(key)?;
            let scalar = value.as_scalar().ok_or_else(|| HandlerError::InvalidValue {
                key: key.clone(),
                reason: format!("expected a scalar, got {}", value.kind()),
            })?;
            message.push(scalar as f32);
        }
        Ok(HandlerOutput::new(Fragment::from_f32(
            self.spec.shape.clone(),
            message,
        )?))
    }
}
