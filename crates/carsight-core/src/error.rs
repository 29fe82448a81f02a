//! Error types for the carsight observation framework.
//!
//! Organized by when they surface: [`ConfigError`] at handler or
//! observer construction, [`HandlerError`] from a single handler call,
//! [`ObserverError`] from the composer, and [`SensorError`] from the
//! simulator collaborator.

use crate::fragment::{Dtype, Shape};
use crate::id::{ActorId, SensorId};
use crate::world::SensorKind;
use std::error::Error;
use std::fmt;

/// Errors reported by the simulator collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SensorError {
    /// The world refused to spawn a sensor.
    SpawnFailed {
        /// Simulator-provided reason.
        reason: String,
    },
    /// No ego actor exists to attach to or follow.
    NoEgo,
    /// The sensor's channel was closed by the world.
    Disconnected,
    /// Moving the spectator failed.
    Spectator {
        /// Simulator-provided reason.
        reason: String,
    },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed { reason } => write!(f, "sensor spawn failed: {reason}"),
            Self::NoEgo => write!(f, "no ego actor in world"),
            Self::Disconnected => write!(f, "sensor channel disconnected"),
            Self::Spectator { reason } => write!(f, "spectator update failed: {reason}"),
        }
    }
}

impl Error for SensorError {}

/// Errors detected while validating a handler or observer configuration.
///
/// Always raised at construction, before the first episode starts.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Output shape is empty or has a zero dimension.
    InvalidShape {
        /// Handler kind being configured.
        handler: &'static str,
        /// What is wrong with the shape.
        reason: String,
    },
    /// Field of view is NaN, non-positive, or above 360 degrees.
    InvalidFov {
        /// Handler kind being configured.
        handler: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// Ego row lies outside the grid.
    EgoOffsetOutOfRange {
        /// Handler kind being configured.
        handler: &'static str,
        /// The rejected row.
        offset: usize,
        /// Grid height.
        height: usize,
    },
    /// Any other out-of-range parameter.
    InvalidParameter {
        /// Handler kind being configured.
        handler: &'static str,
        /// Description of the violated constraint.
        reason: String,
    },
    /// Two handlers registered under the same observation key.
    DuplicateKey {
        /// The repeated key.
        key: String,
    },
    /// A handler was registered under an empty key.
    EmptyKey,
    /// The world could not provide a sensor the handler needs.
    Sensor(SensorError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShape { handler, reason } => {
                write!(f, "{handler}: invalid shape: {reason}")
            }
            Self::InvalidFov { handler, value } => {
                write!(f, "{handler}: field of view must be in (0, 360], got {value}")
            }
            Self::EgoOffsetOutOfRange {
                handler,
                offset,
                height,
            } => write!(
                f,
                "{handler}: ego offset {offset} outside grid of height {height}"
            ),
            Self::InvalidParameter { handler, reason } => write!(f, "{handler}: {reason}"),
            Self::DuplicateKey { key } => write!(f, "duplicate observation key '{key}'"),
            Self::EmptyKey => write!(f, "observation key must not be empty"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sensor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SensorError> for ConfigError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

/// Errors from a single handler's `reset` or `get_observation`.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerError {
    /// No fresh reading arrived within the handler's timeout.
    SensorTimeout {
        /// The silent sensor.
        sensor: SensorId,
        /// How long the handler waited.
        waited_ms: u64,
    },
    /// The world closed the sensor's channel.
    SensorDisconnected {
        /// The closed sensor.
        sensor: SensorId,
    },
    /// A sensor delivered a reading of the wrong family.
    UnexpectedReading {
        /// The misbehaving sensor.
        sensor: SensorId,
        /// Family the handler expects.
        expected: SensorKind,
    },
    /// Produced data does not match the declared shape.
    ShapeMismatch {
        /// Declared shape.
        expected: Shape,
        /// Produced shape.
        actual: Shape,
    },
    /// Produced element type differs from the declared one.
    DtypeMismatch {
        /// Declared dtype.
        expected: Dtype,
        /// Produced dtype.
        actual: Dtype,
    },
    /// A buffer's length disagrees with the shape it was wrapped in.
    BufferLength {
        /// Product of the shape.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },
    /// Handler declares an output but returned no fragment.
    MissingFragment,
    /// Handler declares no output but returned a fragment.
    UnexpectedFragment,
    /// A required environment-state value is absent.
    MissingValue {
        /// Key that was looked up.
        key: String,
    },
    /// An environment-state value has the wrong type.
    InvalidValue {
        /// Offending key.
        key: String,
        /// What was expected.
        reason: String,
    },
    /// An actor the handler depends on is not in the world.
    MissingActor {
        /// The absent actor.
        id: ActorId,
    },
    /// The simulator rejected a request.
    Sensor(SensorError),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorTimeout { sensor, waited_ms } => {
                write!(f, "sensor {sensor} produced no reading within {waited_ms} ms")
            }
            Self::SensorDisconnected { sensor } => write!(f, "sensor {sensor} disconnected"),
            Self::UnexpectedReading { sensor, expected } => {
                write!(f, "sensor {sensor} delivered a non-{expected:?} reading")
            }
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "shape mismatch: expected {:?}, got {:?}",
                expected.as_slice(),
                actual.as_slice()
            ),
            Self::DtypeMismatch { expected, actual } => {
                write!(f, "dtype mismatch: expected {expected}, got {actual}")
            }
            Self::BufferLength { expected, actual } => {
                write!(f, "buffer has {actual} elements, shape needs {expected}")
            }
            Self::MissingFragment => write!(f, "declared output but produced no fragment"),
            Self::UnexpectedFragment => write!(f, "produced a fragment without declaring one"),
            Self::MissingValue { key } => write!(f, "environment value '{key}' missing"),
            Self::InvalidValue { key, reason } => {
                write!(f, "environment value '{key}' invalid: {reason}")
            }
            Self::MissingActor { id } => write!(f, "actor {id} not found in world"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sensor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SensorError> for HandlerError {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

/// Errors surfaced by the observation composer.
///
/// Any handler failure aborts the step; there is no silent fallback to
/// zeroed output.
#[derive(Clone, Debug, PartialEq)]
pub enum ObserverError {
    /// `observe` was called before any `reset`.
    NotReset,
    /// A handler failed.
    Handler {
        /// Observation key of the failing handler.
        key: String,
        /// The underlying failure.
        source: HandlerError,
    },
}

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReset => write!(f, "observer used before reset"),
            Self::Handler { key, source } => write!(f, "handler '{key}' failed: {source}"),
        }
    }
}

impl Error for ObserverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Handler { source, .. } => Some(source),
            Self::NotReset => None,
        }
    }
}
