//! Lidar handler: bins a point cloud into an ego-centric image.
//!
//! The image is oriented like the visibility mask: forward is up, the
//! sensor sits on `ego_row` at column `width / 2`, and one pixel spans
//! `obs_range / width` metres on both axes. A point `(x, y, z)` in the
//! sensor frame lands on row `ego_row - floor(x * ppm)` and column
//! `width / 2 + floor(y * ppm)`.
//!
//! Channel 0 marks hits below `ground_height`, channel 1 hits at or
//! above it. Channel 2 is reserved and always zero.

use carsight_core::{
    ConfigError, Dtype, Fragment, HandlerError, OutputSpec, SensorBlueprint, SensorKind,
    SensorReading, World,
};
use carsight_obs::{EnvState, Handler, HandlerOutput};

use crate::config::LidarConfig;
use crate::sensor::{spawn_on_ego, SensorFeed};

const OCCUPIED: u8 = 255;

/// Delivers the ego lidar sweep as a `(height, width, 3)` occupancy image.
#[derive(Debug)]
pub struct LidarHandler {
    spec: OutputSpec,
    height: usize,
    width: usize,
    ego_row: usize,
    pixels_per_metre: f64,
    ground_height: f64,
    feed: SensorFeed,
}

impl LidarHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "lidar";

    /// Validate `config` and spawn the lidar on the ego.
    pub fn new(world: &dyn World, config: &LidarConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let blueprint = SensorBlueprint::new(SensorKind::Lidar)
            .with_attribute("range", config.range)
            .with_attribute("channels", config.channels)
            .with_mount(config.mount);
        let (_, stream) = spawn_on_ego(world, &blueprint)?;
        Ok(Self {
            spec: OutputSpec::image(config.height, config.width, 3, Dtype::U8),
            height: config.height,
            width: config.width,
            ego_row: config.resolved_ego_row(),
            pixels_per_metre: config.pixels_per_metre(),
            ground_height: config.ground_height,
            feed: SensorFeed::new(stream, config.timeout),
        })
    }

    /// Grid cell of a sensor-frame ground point, if it falls on the image.
    fn cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let row = self.ego_row as f64 - (x * self.pixels_per_metre).floor();
        let col = (self.width / 2) as f64 + (y * self.pixels_per_metre).floor();
        if !(0.0..self.height as f64).contains(&row) || !(0.0..self.width as f64).contains(&col) {
            return None;
        }
        Some((row as usize, col as usize))
    }
}

impl Handler for LidarHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn reset(&mut self) -> Result<(), HandlerError> {
        self.feed.clear();
        Ok(())
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let sensor = self.feed.id();
        let points = match self.feed.await_frame(env.frame)? {
            SensorReading::PointCloud(cloud) => cloud.points.clone(),
            _ => {
                return Err(HandlerError::UnexpectedReading {
                    sensor,
                    expected: SensorKind::Lidar,
                })
            }
        };
        let mut image = vec![0u8; self.height * self.width * 3];
        let mut binned = 0i64;
        for &[x, y, z, _] in &points {
            let (x, y, z) = (f64::from(x), f64::from(y), f64::from(z));
            if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                continue;
            }
            let Some((row, col)) = self.cell(x, y) else {
                continue;
            };
            let channel = usize::from(z >= self.ground_height);
            image[(row * self.width + col) * 3 + channel] = OCCUPIED;
            binned += 1;
        }
        let fragment = Fragment::from_u8(self.spec.shape.clone(), image)?;
        Ok(HandlerOutput::new(fragment).with_info("lidar_points", binned))
    }
}
