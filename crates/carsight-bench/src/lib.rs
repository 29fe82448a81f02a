//! Benchmark profiles for the carsight observation framework.
//!
//! - [`reference_profile`]: the handler set of a typical driving agent
//!   (camera, lidar, collision, bird's-eye, visibility mask, message)
//! - [`reference_world`]: a mock world with an ego and light traffic
//! - [`feed_sensors`]: push one frame of readings to every sensor

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use carsight_core::{Info, SensorKind, Value};
use carsight_handlers::{
    BirdeyeConfig, CameraConfig, CollisionConfig, HandlerConfig, LidarConfig, MaskConfig,
    MessageConfig,
};
use carsight_test_utils::fixtures::{collision, image, point_cloud, vehicle, walker};
use carsight_test_utils::MockWorld;

/// Grid side of every spatial observation in the reference profile.
pub const GRID: usize = 128;

/// Handler entries for a 128×128 observation stack.
pub fn reference_profile() -> Vec<(String, HandlerConfig)> {
    let timeout = Duration::from_millis(100);
    vec![
        (
            "camera".into(),
            HandlerConfig::Camera(CameraConfig {
                height: GRID,
                width: GRID,
                timeout,
                ..CameraConfig::default()
            }),
        ),
        (
            "lidar".into(),
            HandlerConfig::Lidar(LidarConfig {
                height: GRID,
                width: GRID,
                timeout,
                ..LidarConfig::default()
            }),
        ),
        (
            "collision".into(),
            HandlerConfig::Collision(CollisionConfig::default()),
        ),
        (
            "birdeye".into(),
            HandlerConfig::Birdeye(BirdeyeConfig {
                height: GRID,
                width: GRID,
                ..BirdeyeConfig::default()
            }),
        ),
        (
            "mask".into(),
            HandlerConfig::Mask(MaskConfig {
                height: GRID,
                width: GRID,
                ..MaskConfig::default()
            }),
        ),
        (
            "message".into(),
            HandlerConfig::Message(MessageConfig {
                keys: vec!["speed".into(), "steer".into(), "throttle".into()],
            }),
        ),
    ]
}

/// Ego at the origin with `traffic` vehicles and walkers spread ahead.
pub fn reference_world(traffic: u64) -> MockWorld {
    let world = MockWorld::with_ego(vehicle(1, 0.0, 0.0, 0.0));
    for i in 0..traffic {
        let ahead = 6.0 + i as f64 * 3.0;
        let lateral = if i % 2 == 0 { 3.5 } else { -3.5 };
        if i % 3 == 0 {
            world.add_actor(walker(100 + i, ahead, lateral * 1.5));
        } else {
            world.add_actor(vehicle(100 + i, ahead, lateral, (i * 15) as f64));
        }
    }
    world
}

/// Per-step values consumed by the message handler.
pub fn reference_values() -> Info {
    let mut values = Info::new();
    values.insert("speed".into(), Value::Scalar(8.3));
    values.insert("steer".into(), Value::Scalar(-0.1));
    values.insert("throttle".into(), Value::Scalar(0.6));
    values
}

/// Emit one reading for `frame` on each live sensor.
///
/// The lidar sweep holds `points` returns on a ring around the ego.
pub fn feed_sensors(world: &MockWorld, frame: u64, points: usize) {
    if let Some(camera) = world.sensor_of_kind(SensorKind::Camera) {
        world.emit(camera, image(frame, GRID, GRID, [40, 80, 120, 255]));
    }
    if let Some(lidar) = world.sensor_of_kind(SensorKind::Lidar) {
        let sweep: Vec<[f32; 3]> = (0..points)
            .map(|i| {
                let a = i as f32 * std::f32::consts::TAU / points.max(1) as f32;
                let r = 4.0 + (i % 20) as f32;
                [r * a.cos(), r * a.sin(), if i % 4 == 0 { -2.0 } else { 0.5 }]
            })
            .collect();
        world.emit(lidar, point_cloud(frame, &sweep));
    }
    if frame % 50 == 0 {
        if let Some(sensor) = world.sensor_of_kind(SensorKind::Collision) {
            world.emit(sensor, collision(frame, Some(101), [120.0, 0.0, 0.0]));
        }
    }
}
