//! The simulator world as seen by handlers.
//!
//! [`World`] is a narrow, object-safe view of the external simulator.
//! Handlers receive `&dyn World` at construction and through each
//! step's environment state, but never store it: the world may be torn
//! down and rebuilt between episodes.
//!
//! Coordinates follow the simulator convention: `x` forward, `y` right,
//! `z` up, angles in degrees, yaw measured from `+x` towards `+y`.

use crate::error::SensorError;
use crate::id::{ActorId, FrameId, SensorId};
use crossbeam_channel::Receiver;
use indexmap::IndexMap;

/// A point in world space (metres).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Location {
    /// Forward axis.
    pub x: f64,
    /// Right axis.
    pub y: f64,
    /// Up axis.
    pub z: f64,
}

impl Location {
    /// Construct a location.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Orientation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    /// Nose up/down.
    pub pitch: f64,
    /// Heading, from `+x` towards `+y`.
    pub yaw: f64,
    /// Bank.
    pub roll: f64,
}

impl Rotation {
    /// Construct a rotation.
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Pose of an actor or sensor mount.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    /// Position.
    pub location: Location,
    /// Orientation.
    pub rotation: Rotation,
}

impl Transform {
    /// Construct a transform.
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// Unit heading vector in the ground plane, `(x, y)`.
    pub fn forward_vector(&self) -> (f64, f64) {
        let yaw = self.rotation.yaw.to_radians();
        (yaw.cos(), yaw.sin())
    }

    /// Express a world-space ground point in this transform's frame.
    ///
    /// Returns `(forward, right)` metres relative to `self.location`.
    pub fn to_local(&self, x: f64, y: f64) -> (f64, f64) {
        let (cos, sin) = self.forward_vector();
        let dx = x - self.location.x;
        let dy = y - self.location.y;
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// Map a point given in this transform's frame back to world space.
    pub fn to_world(&self, forward: f64, right: f64) -> (f64, f64) {
        let (cos, sin) = self.forward_vector();
        (
            self.location.x + forward * cos - right * sin,
            self.location.y + forward * sin + right * cos,
        )
    }
}

/// Broad actor category, used by the birdeye rasterizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActorKind {
    /// Cars, trucks, bikes.
    Vehicle,
    /// Pedestrians.
    Walker,
    /// Signal heads.
    TrafficLight,
    /// Anything else (props, spectators).
    Other,
}

/// Snapshot of one actor's state, copied out of the world.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorState {
    /// Actor id.
    pub id: ActorId,
    /// Category.
    pub kind: ActorKind,
    /// Current pose.
    pub transform: Transform,
    /// Bounding box half extents `(forward, right)` in metres.
    pub half_extent: [f64; 2],
    /// Ground speed in m/s.
    pub speed: f64,
}

/// Sensor families the world can spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// RGB camera.
    Camera,
    /// Ray-cast lidar.
    Lidar,
    /// Collision detector.
    Collision,
}

/// Everything the world needs to spawn a sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorBlueprint {
    /// Sensor family.
    pub kind: SensorKind,
    /// Simulator attributes (`image_size_x`, `range`, ...).
    pub attributes: IndexMap<String, String>,
    /// Mount pose relative to the parent actor.
    pub mount: Transform,
}

impl SensorBlueprint {
    /// Blueprint with no attributes and an identity mount.
    pub fn new(kind: SensorKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            mount: Transform::default(),
        }
    }

    /// Set one attribute.
    pub fn with_attribute(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the mount pose.
    pub fn with_mount(mut self, mount: Transform) -> Self {
        self.mount = mount;
        self
    }
}

/// Raw camera image, BGRA row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFrame {
    /// Capture frame.
    pub frame: FrameId,
    /// Pixel columns.
    pub width: usize,
    /// Pixel rows.
    pub height: usize,
    /// `height * width * 4` bytes.
    pub bgra: Vec<u8>,
}

/// Raw lidar sweep: `[x, y, z, intensity]` in the sensor frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloudFrame {
    /// Capture frame.
    pub frame: FrameId,
    /// Points, metres.
    pub points: Vec<[f32; 4]>,
}

/// One contact reported by a collision sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionEvent {
    /// Frame on which the contact happened.
    pub frame: FrameId,
    /// The other actor, when the simulator knows it.
    pub other: Option<ActorId>,
    /// Normal impulse `(x, y, z)` in N·s.
    pub impulse: [f64; 3],
}

impl CollisionEvent {
    /// Magnitude of the impulse vector.
    pub fn intensity(&self) -> f64 {
        let [x, y, z] = self.impulse;
        (x * x + y * y + z * z).sqrt()
    }
}

/// One message on a sensor channel.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorReading {
    /// Camera output.
    Image(ImageFrame),
    /// Lidar output.
    PointCloud(PointCloudFrame),
    /// Collision output.
    Collision(CollisionEvent),
}

impl SensorReading {
    /// Frame the reading belongs to.
    pub fn frame(&self) -> FrameId {
        match self {
            Self::Image(i) => i.frame,
            Self::PointCloud(p) => p.frame,
            Self::Collision(c) => c.frame,
        }
    }
}

/// Receiving end of a spawned sensor.
///
/// The world keeps the sending half. Dropping the stream disconnects
/// the channel, which is the world's signal to destroy the sensor.
#[derive(Debug)]
pub struct SensorStream {
    /// World-assigned sensor id.
    pub id: SensorId,
    /// Readings in capture order.
    pub receiver: Receiver<SensorReading>,
}

/// Narrow view of the external simulator.
///
/// All methods take `&self`: the simulator client is a handle, and any
/// interior bookkeeping is the implementation's concern.
pub trait World {
    /// The agent-controlled actor, if one is spawned.
    fn ego(&self) -> Option<ActorId>;

    /// Current state of one actor.
    fn actor(&self, id: ActorId) -> Option<ActorState>;

    /// Current state of every live actor.
    fn actors(&self) -> Vec<ActorState>;

    /// Spawn a sensor attached to `parent`.
    fn spawn_sensor(
        &self,
        blueprint: &SensorBlueprint,
        parent: ActorId,
    ) -> Result<SensorStream, SensorError>;

    /// Move the free-flying spectator camera.
    fn set_spectator(&self, transform: Transform) -> Result<(), SensorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn to_local_identity_yaw() {
        let t = Transform::new(Location::new(10.0, 5.0, 0.0), Rotation::default());
        let (f, r) = t.to_local(12.0, 4.0);
        assert!(approx(f, 2.0));
        assert!(approx(r, -1.0));
    }

    #[test]
    fn to_local_rotated_ninety() {
        // Facing +y: a point further along +y is straight ahead.
        let t = Transform::new(Location::default(), Rotation::new(0.0, 90.0, 0.0));
        let (f, r) = t.to_local(0.0, 3.0);
        assert!(approx(f, 3.0));
        assert!(approx(r, 0.0));
        // A point at -x is on the right when facing +y.
        let (f, r) = t.to_local(-2.0, 0.0);
        assert!(approx(f, 0.0));
        assert!(approx(r, 2.0));
    }

    #[test]
    fn to_world_inverts_to_local() {
        let t = Transform::new(Location::new(-4.0, 7.5, 1.0), Rotation::new(0.0, 33.0, 0.0));
        let (x, y) = t.to_world(3.25, -1.5);
        let (f, r) = t.to_local(x, y);
        assert!(approx(f, 3.25));
        assert!(approx(r, -1.5));
    }

    #[test]
    fn collision_intensity_is_norm() {
        let ev = CollisionEvent {
            frame: FrameId(1),
            other: None,
            impulse: [3.0, 4.0, 0.0],
        };
        assert!(approx(ev.intensity(), 5.0));
    }

    #[test]
    fn blueprint_builder() {
        let bp = SensorBlueprint::new(SensorKind::Camera)
            .with_attribute("image_size_x", 64)
            .with_attribute("fov", 90.0);
        assert_eq!(bp.attributes["image_size_x"], "64");
        assert_eq!(bp.attributes["fov"], "90");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn local_round_trips_through_world(
                x in -500.0f64..500.0,
                y in -500.0f64..500.0,
                yaw in -360.0f64..360.0,
                px in -100.0f64..100.0,
                py in -100.0f64..100.0,
            ) {
                let t = Transform::new(Location::new(x, y, 0.0), Rotation::new(0.0, yaw, 0.0));
                let (f, r) = t.to_local(px, py);
                let (wx, wy) = t.to_world(f, r);
                prop_assert!((wx - px).abs() < 1e-6);
                prop_assert!((wy - py).abs() < 1e-6);
                // Rotation preserves distance from the origin.
                let d = ((px - x).powi(2) + (py - y).powi(2)).sqrt();
                prop_assert!((f.hypot(r) - d).abs() < 1e-6);
            }
        }
    }
}
