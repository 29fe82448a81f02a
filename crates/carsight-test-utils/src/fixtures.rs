//! Reusable actors, sensor readings and handlers for tests.
//!
//! - [`vehicle`], [`walker`]: actor snapshots with typical extents.
//! - [`image`], [`point_cloud`], [`collision`]: sensor readings.
//! - [`CountingHandler`]: records resets and observations.
//! - [`FailingHandler`]: fails deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use carsight_core::{
    ActorId, ActorKind, ActorState, CollisionEvent, Dtype, Fragment, FrameId, HandlerError,
    ImageFrame, Location, OutputSpec, PointCloudFrame, Rotation, SensorReading, Transform,
};
use carsight_obs::{EnvState, Handler, HandlerOutput};

/// A 4.5 m × 2 m car at `(x, y)` heading `yaw` degrees.
pub fn vehicle(id: u64, x: f64, y: f64, yaw: f64) -> ActorState {
    ActorState {
        id: ActorId(id),
        kind: ActorKind::Vehicle,
        transform: Transform::new(Location::new(x, y, 0.0), Rotation::new(0.0, yaw, 0.0)),
        half_extent: [2.25, 1.0],
        speed: 0.0,
    }
}

/// A 0.6 m square pedestrian at `(x, y)`.
pub fn walker(id: u64, x: f64, y: f64) -> ActorState {
    ActorState {
        id: ActorId(id),
        kind: ActorKind::Walker,
        transform: Transform::new(Location::new(x, y, 0.0), Rotation::default()),
        half_extent: [0.3, 0.3],
        speed: 1.2,
    }
}

/// A solid-colour BGRA image.
pub fn image(frame: u64, width: usize, height: usize, bgra: [u8; 4]) -> SensorReading {
    let mut px = Vec::with_capacity(width * height * 4);
    for _ in 0..width * height {
        px.extend_from_slice(&bgra);
    }
    SensorReading::Image(ImageFrame {
        frame: FrameId(frame),
        width,
        height,
        bgra: px,
    })
}

/// A lidar sweep from `[x, y, z]` points with unit intensity.
pub fn point_cloud(frame: u64, points: &[[f32; 3]]) -> SensorReading {
    SensorReading::PointCloud(PointCloudFrame {
        frame: FrameId(frame),
        points: points.iter().map(|&[x, y, z]| [x, y, z, 1.0]).collect(),
    })
}

/// A collision with an optional other actor.
pub fn collision(frame: u64, other: Option<u64>, impulse: [f64; 3]) -> SensorReading {
    SensorReading::Collision(CollisionEvent {
        frame: FrameId(frame),
        other: other.map(ActorId),
        impulse,
    })
}

/// Emits the current frame number as a one-element vector and counts
/// lifecycle calls through shared counters.
pub struct CountingHandler {
    spec: OutputSpec,
    pub resets: Arc<AtomicUsize>,
    pub observations: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self {
            spec: OutputSpec::vector(1, Dtype::F32),
            resets: Arc::new(AtomicUsize::new(0)),
            observations: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for CountingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for CountingHandler {
    fn name(&self) -> &str {
        "counting"
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn reset(&mut self) -> Result<(), HandlerError> {
        self.resets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn get_observation(&mut self, env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let n = self.observations.fetch_add(1, Ordering::Relaxed) + 1;
        let frag = Fragment::from_f32(self.spec.shape.clone(), vec![env.frame.0 as f32])?;
        Ok(HandlerOutput::new(frag).with_info("counting_calls", n as i64))
    }
}

/// Succeeds `succeed_count` times, then fails every call.
pub struct FailingHandler {
    spec: OutputSpec,
    succeed_count: usize,
    calls: AtomicUsize,
}

impl FailingHandler {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            spec: OutputSpec::vector(1, Dtype::F32),
            succeed_count,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Handler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    fn output_spec(&self) -> Option<&OutputSpec> {
        Some(&self.spec)
    }

    fn get_observation(&mut self, _env: &EnvState<'_>) -> Result<HandlerOutput, HandlerError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(HandlerError::MissingValue {
                key: format!("call {n}"),
            });
        }
        Ok(HandlerOutput::new(Fragment::from_f32(
            self.spec.shape.clone(),
            vec![0.0],
        )?))
    }
}
