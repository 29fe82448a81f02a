//! Pass-through handler for a vector environment value.

use carsight_core::{ConfigError, Dtype, Fragment, HandlerError, OutputSpec, Shape};
use carsight_obs::{EnvState, Handler, HandlerOutput};

use crate::config::SimpleConfig;

/// Copies one `Vector` environment value into a fragment of fixed shape.
#[derive(Debug)]
pub struct SimpleHandler {
    spec: OutputSpec,
    source: String,
}

impl SimpleHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "simple";

    /// Validate `config`.
    pub fn new(config: &SimpleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            spec: OutputSpec::new(Shape::from_slice(&config.shape), Dtype::F32),
            source: config.source.clone(),
        })
    }
}

impl Handler for SimpleHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let value = env.require(&self.source)?;
        let data = value.as_vector().ok_or_else(|| HandlerError::InvalidValue {
            key: self.source.clone(),
            reason: format!("expected a vector, got {}", value.kind()),
        })?;
        if data.len() != self.spec.element_count() {
            return Err(HandlerError::ShapeMismatch {
                expected: self.spec.shape.clone(),
                actual: Shape::from_slice(&[data.len()]),
            });
        }
        Ok(HandlerOutput::new(Fragment::from_f32(
            self.spec.shape.clone(),
            data.to_vec(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carsight_core::{ActorId, FrameId, Info, Value};
    use carsight_test_utils::MockWorld;

    fn handler(shape: &[usize]) -> SimpleHandler {
        SimpleHandler::new(&SimpleConfig {
            source: "ego_state".into(),
            shape: shape.to_vec(),
        })
        .unwrap()
    }

    fn observe(h: &mut SimpleHandler, value: Option<Value>) -> Result<HandlerOutput, HandlerError> {
        let world = MockWorld::new();
        let mut values = Info::new();
        if let Some(v) = value {
            values.insert("ego_state".into(), v);
        }
        let env = EnvState::new(&world, FrameId(0), ActorId(1), &values);
        h.get_observation(&env)
    }

    #[test]
    fn copies_vector_into_shape() {
        let mut h = handler(&[2, 2]);
        let frag = observe(&mut h, Some(Value::Vector(vec![1.0, 2.0, 3.0, 4.0])))
            .unwrap()
            .fragment
            .unwrap();
        assert_eq!(frag.shape(), &[2, 2]);
        assert_eq!(frag.get(&[1, 0]), Some(3.0));
    }

    #[test]
    fn length_mismatch_fails() {
        let mut h = handler(&[3]);
        assert!(matches!(
            observe(&mut h, Some(Value::Vector(vec![1.0]))),
            Err(HandlerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn wrong_type_and_missing_fail() {
        let mut h = handler(&[1]);
        assert!(matches!(
            observe(&mut h, Some(Value::Scalar(1.0))),
            Err(HandlerError::InvalidValue { .. })
        ));
        assert!(matches!(
            observe(&mut h, None),
            Err(HandlerError::MissingValue { .. })
        ));
    }
}
