//! Typed handler configuration, validation, and explicit construction.
//!
//! Every handler has a config struct with a [`Default`] and a
//! `validate()` pass that checks its invariants. Optional fields whose
//! default depends on other fields are resolved through `resolved_*`
//! accessors, so a config never needs dynamic key lookup.
//!
//! [`HandlerConfig`] collects the variants; [`build_handler`] and
//! [`build_observer`] turn them into live handlers in the order given.

use std::time::Duration;

use carsight_core::{ConfigError, Location, Rotation, Transform, World};
use carsight_obs::{Handler, Observer};
use tracing::debug;

use crate::{
    BaseHandler, BirdeyeHandler, CameraHandler, CollisionHandler, LidarHandler, MaskHandler,
    MessageHandler, SimpleHandler, SpectatorHandler,
};

fn check_dims(handler: &'static str, height: usize, width: usize) -> Result<(), ConfigError> {
    if height == 0 || width == 0 {
        return Err(ConfigError::InvalidShape {
            handler,
            reason: format!("height and width must be positive, got {height}x{width}"),
        });
    }
    Ok(())
}

fn check_positive(handler: &'static str, name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidParameter {
            handler,
            reason: format!("{name} must be finite and positive, got {value}"),
        });
    }
    Ok(())
}

fn check_timeout(handler: &'static str, timeout: Duration) -> Result<(), ConfigError> {
    if timeout.is_zero() {
        return Err(ConfigError::InvalidParameter {
            handler,
            reason: "timeout must be non-zero".to_string(),
        });
    }
    Ok(())
}

fn check_row(handler: &'static str, offset: usize, height: usize) -> Result<(), ConfigError> {
    if offset >= height {
        return Err(ConfigError::EgoOffsetOutOfRange {
            handler,
            offset,
            height,
        });
    }
    Ok(())
}

// ── MaskConfig ─────────────────────────────────────────────────────

/// Configuration for [`MaskHandler`].
#[derive(Clone, Debug, PartialEq)]
pub struct MaskConfig {
    /// Grid rows.
    pub height: usize,
    /// Grid columns.
    pub width: usize,
    /// Total cone angle in degrees, `(0, 360]`.
    pub sight_fov: f64,
    /// Row treated as the agent's position. Default: bottom row.
    pub ego_offset: Option<usize>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            height: 128,
            width: 128,
            sight_fov: 150.0,
            ego_offset: None,
        }
    }
}

impl MaskConfig {
    /// The ego row, falling back to `height - 1`.
    pub fn resolved_ego_offset(&self) -> usize {
        self.ego_offset.unwrap_or_else(|| self.height.saturating_sub(1))
    }

    /// Check grid dimensions, field of view, and ego row.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dims(MaskHandler::NAME, self.height, self.width)?;
        // Written to reject NaN as well.
        if !(self.sight_fov > 0.0 && self.sight_fov <= 360.0) {
            return Err(ConfigError::InvalidFov {
                handler: MaskHandler::NAME,
                value: self.sight_fov,
            });
        }
        check_row(MaskHandler::NAME, self.resolved_ego_offset(), self.height)
    }
}

// ── CameraConfig ───────────────────────────────────────────────────

/// Configuration for [`CameraHandler`].
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Image rows.
    pub height: usize,
    /// Image columns.
    pub width: usize,
    /// Horizontal field of view in degrees, `(0, 180]`.
    pub fov: f64,
    /// Mount pose relative to the ego.
    pub mount: Transform,
    /// Longest wait for a fresh frame.
    pub timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            height: 128,
            width: 128,
            fov: 90.0,
            mount: Transform::new(Location::new(1.5, 0.0, 2.4), Rotation::default()),
            timeout: Duration::from_secs(2),
        }
    }
}

impl CameraConfig {
    /// Check image size, field of view, and timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dims(CameraHandler::NAME, self.height, self.width)?;
        if !(self.fov > 0.0 && self.fov <= 180.0) {
            return Err(ConfigError::InvalidParameter {
                handler: CameraHandler::NAME,
                reason: format!("fov must be in (0, 180], got {}", self.fov),
            });
        }
        check_timeout(CameraHandler::NAME, self.timeout)
    }
}

// ── LidarConfig ────────────────────────────────────────────────────

/// Configuration for [`LidarHandler`].
#[derive(Clone, Debug, PartialEq)]
pub struct LidarConfig {
    /// Image rows.
    pub height: usize,
    /// Image columns.
    pub width: usize,
    /// Metres covered by the image width.
    pub obs_range: f64,
    /// Row of the sensor origin. Default: bottom row.
    pub ego_row: Option<usize>,
    /// Points with `z` below this (sensor frame, metres) count as ground.
    pub ground_height: f64,
    /// Sensor range in metres.
    pub range: f64,
    /// Laser channels.
    pub channels: u32,
    /// Mount pose relative to the ego.
    pub mount: Transform,
    /// Longest wait for a fresh sweep.
    pub timeout: Duration,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            height: 128,
            width: 128,
            obs_range: 32.0,
            ego_row: None,
            ground_height: -1.85,
            range: 32.0,
            channels: 32,
            mount: Transform::new(Location::new(0.0, 0.0, 2.1), Rotation::default()),
            timeout: Duration::from_secs(2),
        }
    }
}

impl LidarConfig {
    /// The sensor row, falling back to `height - 1`.
    pub fn resolved_ego_row(&self) -> usize {
        self.ego_row.unwrap_or_else(|| self.height.saturating_sub(1))
    }

    /// Pixels per metre along both axes.
    pub fn pixels_per_metre(&self) -> f64 {
        self.width as f64 / self.obs_range
    }

    /// Check image size, ranges, and timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dims(LidarHandler::NAME, self.height, self.width)?;
        check_positive(LidarHandler::NAME, "obs_range", self.obs_range)?;
        check_positive(LidarHandler::NAME, "range", self.range)?;
        if !self.ground_height.is_finite() {
            return Err(ConfigError::InvalidParameter {
                handler: LidarHandler::NAME,
                reason: format!("ground_height must be finite, got {}", self.ground_height),
            });
        }
        if self.channels == 0 {
            return Err(ConfigError::InvalidParameter {
                handler: LidarHandler::NAME,
                reason: "channels must be at least 1".to_string(),
            });
        }
        check_row(LidarHandler::NAME, self.resolved_ego_row(), self.height)?;
        check_timeout(LidarHandler::NAME, self.timeout)
    }
}

// ── CollisionConfig ────────────────────────────────────────────────

/// Configuration for [`CollisionHandler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionConfig {
    /// Collision events retained per episode. Oldest are dropped first.
    pub history_len: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { history_len: 32 }
    }
}

impl CollisionConfig {
    /// Check the history bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_len == 0 {
            return Err(ConfigError::InvalidParameter {
                handler: CollisionHandler::NAME,
                reason: "history_len must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── BirdeyeConfig ──────────────────────────────────────────────────

/// Configuration for [`BirdeyeHandler`].
#[derive(Clone, Debug, PartialEq)]
pub struct BirdeyeConfig {
    /// Image rows.
    pub height: usize,
    /// Image columns.
    pub width: usize,
    /// Metres covered by the image width.
    pub obs_range: f64,
    /// Row of the ego origin. Default: three quarters down the image.
    pub ego_row: Option<usize>,
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            height: 128,
            width: 128,
            obs_range: 32.0,
            ego_row: None,
        }
    }
}

impl BirdeyeConfig {
    /// The ego row, falling back to `height * 3 / 4`.
    pub fn resolved_ego_row(&self) -> usize {
        self.ego_row.unwrap_or(self.height * 3 / 4)
    }

    /// Pixels per metre along both axes.
    pub fn pixels_per_metre(&self) -> f64 {
        self.width as f64 / self.obs_range
    }

    /// Check image size, range, and ego row.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_dims(BirdeyeHandler::NAME, self.height, self.width)?;
        check_positive(BirdeyeHandler::NAME, "obs_range", self.obs_range)?;
        check_row(BirdeyeHandler::NAME, self.resolved_ego_row(), self.height)
    }
}

// ── MessageConfig ──────────────────────────────────────────────────

/// Configuration for [`MessageHandler`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageConfig {
    /// Environment value keys, in output order.
    pub keys: Vec<String>,
}

impl MessageConfig {
    /// Check that keys are present, non-empty, and distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidParameter {
            handler: MessageHandler::NAME,
            reason,
        };
        if self.keys.is_empty() {
            return Err(invalid("at least one key is required".to_string()));
        }
        for (i, key) in self.keys.iter().enumerate() {
            if key.is_empty() {
                return Err(invalid(format!("key {i} is empty")));
            }
            if self.keys[..i].contains(key) {
                return Err(invalid(format!("key '{key}' listed twice")));
            }
        }
        Ok(())
    }
}

// ── SimpleConfig ───────────────────────────────────────────────────

/// Configuration for [`SimpleHandler`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimpleConfig {
    /// Environment value key holding a vector.
    pub source: String,
    /// Output shape; its product must equal the vector length.
    pub shape: Vec<usize>,
}

impl SimpleConfig {
    /// Check the source key and shape.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.is_empty() {
            return Err(ConfigError::InvalidParameter {
                handler: SimpleHandler::NAME,
                reason: "source key is empty".to_string(),
            });
        }
        if self.shape.is_empty() || self.shape.contains(&0) {
            return Err(ConfigError::InvalidShape {
                handler: SimpleHandler::NAME,
                reason: format!("shape {:?} must be non-empty with positive dims", self.shape),
            });
        }
        Ok(())
    }
}

// ── SpectatorConfig ────────────────────────────────────────────────

/// Configuration for [`SpectatorHandler`].
#[derive(Clone, Debug, PartialEq)]
pub struct SpectatorConfig {
    /// Metres behind the ego.
    pub distance: f64,
    /// Metres above the ego.
    pub height: f64,
    /// Camera pitch in degrees, `[-90, 90]`.
    pub pitch: f64,
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            distance: 6.0,
            height: 3.0,
            pitch: -15.0,
        }
    }
}

impl SpectatorConfig {
    /// Check that offsets are finite and pitch is physical.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.distance.is_finite() || !self.height.is_finite() {
            return Err(ConfigError::InvalidParameter {
                handler: SpectatorHandler::NAME,
                reason: "distance and height must be finite".to_string(),
            });
        }
        if !(-90.0..=90.0).contains(&self.pitch) {
            return Err(ConfigError::InvalidParameter {
                handler: SpectatorHandler::NAME,
                reason: format!("pitch must be in [-90, 90], got {}", self.pitch),
            });
        }
        Ok(())
    }
}

// ── HandlerConfig ──────────────────────────────────────────────────

/// Configuration for any handler.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerConfig {
    /// No-op handler.
    Base,
    /// Rasterized actor boxes.
    Birdeye(BirdeyeConfig),
    /// RGB camera.
    Camera(CameraConfig),
    /// Collision sensor.
    Collision(CollisionConfig),
    /// Binned lidar.
    Lidar(LidarConfig),
    /// Scalar environment values.
    Message(MessageConfig),
    /// One vector environment value.
    Simple(SimpleConfig),
    /// Spectator follow camera.
    Spectator(SpectatorConfig),
    /// Field-of-view mask.
    Mask(MaskConfig),
}

impl HandlerConfig {
    /// Handler kind this config builds.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Base => BaseHandler::NAME,
            Self::Birdeye(_) => BirdeyeHandler::NAME,
            Self::Camera(_) => CameraHandler::NAME,
            Self::Collision(_) => CollisionHandler::NAME,
            Self::Lidar(_) => LidarHandler::NAME,
            Self::Message(_) => MessageHandler::NAME,
            Self::Simple(_) => SimpleHandler::NAME,
            Self::Spectator(_) => SpectatorHandler::NAME,
            Self::Mask(_) => MaskHandler::NAME,
        }
    }

    /// Validate without touching the world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Base => Ok(()),
            Self::Birdeye(c) => c.validate(),
            Self::Camera(c) => c.validate(),
            Self::Collision(c) => c.validate(),
            Self::Lidar(c) => c.validate(),
            Self::Message(c) => c.validate(),
            Self::Simple(c) => c.validate(),
            Self::Spectator(c) => c.validate(),
            Self::Mask(c) => c.validate(),
        }
    }
}

/// Construct one handler bound to `world`.
///
/// Sensor-backed handlers spawn their sensor here, so a missing ego or a
/// refused spawn surfaces as a [`ConfigError`] before the episode starts.
pub fn build_handler(
    world: &dyn World,
    config: &HandlerConfig,
) -> Result<Box<dyn Handler>, ConfigError> {
    let handler: Box<dyn Handler> = match config {
        HandlerConfig::Base => Box::new(BaseHandler::new()),
        HandlerConfig::Birdeye(c) => Box::new(BirdeyeHandler::new(c)?),
        HandlerConfig::Camera(c) => Box::new(CameraHandler::new(world, c)?),
        HandlerConfig::Collision(c) => Box::new(CollisionHandler::new(world, c)?),
        HandlerConfig::Lidar(c) => Box::new(LidarHandler::new(world, c)?),
        HandlerConfig::Message(c) => Box::new(MessageHandler::new(c)?),
        HandlerConfig::Simple(c) => Box::new(SimpleHandler::new(c)?),
        HandlerConfig::Spectator(c) => Box::new(SpectatorHandler::new(c)?),
        HandlerConfig::Mask(c) => Box::new(MaskHandler::new(c)?),
    };
    debug!(handler = handler.name(), "handler built");
    Ok(handler)
}

/// Construct every handler in order and register them with an [`Observer`].
///
/// All configs are validated before any sensor is spawned.
pub fn build_observer(
    world: &dyn World,
    entries: &[(String, HandlerConfig)],
) -> Result<Observer, ConfigError> {
    for (_, config) in entries {
        config.validate()?;
    }
    let handlers = entries
        .iter()
        .map(|(key, config)| Ok((key.clone(), build_handler(world, config)?)))
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Observer::new(handlers)
}
