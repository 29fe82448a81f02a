//! RGB camera handler.

use carsight_core::{
    ConfigError, Dtype, Fragment, HandlerError, OutputSpec, SensorBlueprint, SensorKind,
    SensorReading, World,
};
use carsight_obs::{EnvState, Handler, HandlerOutput};
use smallvec::smallvec;

use crate::config::CameraConfig;
use crate::sensor::{spawn_on_ego, SensorFeed};

/// Delivers the ego camera image as `(height, width, 3)` RGB bytes.
///
/// Each step waits (bounded by the configured timeout) for a frame
/// captured on or after the current environment frame.
#[derive(Debug)]
pub struct CameraHandler {
    spec: OutputSpec,
    height: usize,
    width: usize,
    feed: SensorFeed,
}

impl CameraHandler {
    /// Handler kind name.
    pub const NAME: &'static str = "camera";

    /// Validate `config` and spawn the camera on the ego.
    pub fn new(world: &dyn World, config: &CameraConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let blueprint = SensorBlueprint::new(SensorKind::Camera)
            .with_attribute("image_size_x", config.width)
            .with_attribute("image_size_y", config.height)
            .with_attribute("fov", config.fov)
            .with_mount(config.mount);
        let (_, stream) = spawn_on_ego(world, &blueprint)?;
        Ok(Self {
            spec: OutputSpec::image(config.height, config.width, 3, Dtype::U8),
            height: config.height,
            width: config.width,
            feed: SensorFeed::new(stream, config.timeout),
        })
    }
}

impl Handler for CameraHandler {
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
        let SensorReading::Image(image) = self.feed.await_frame(env.frame)? else {
            return Err(HandlerError::UnexpectedReading {
                sensor,
                expected: SensorKind::Camera,
            });
        };
        if image.height != self.height || image.width != self.width {
            return Err(HandlerError::ShapeMismatch {
                expected: self.spec.shape.clone(),
                actual: smallvec![image.height, image.width, 3],
            });
        }
        let pixels = self.height * self.width;
        if image.bgra.len() != pixels * 4 {
            return Err(HandlerError::BufferLength {
                expected: pixels * 4,
                actual: image.bgra.len(),
            });
        }
        let mut rgb = Vec::with_capacity(pixels * 3);
        for px in image.bgra.chunks_exact(4) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        let frame = image.frame.0 as i64;
        let fragment = Fragment::from_u8(self.spec.shape.clone(), rgb)?;
        Ok(HandlerOutput::new(fragment).with_info("camera_frame", frame))
    }
}
