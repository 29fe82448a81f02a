//! Core types and traits for the carsight observation framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every handler: identifiers, info values,
//! observation fragments and their declared specs, the [`World`]
//! collaborator trait, sensor readings, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod fragment;
pub mod id;
pub mod value;
pub mod world;

pub use error::{ConfigError, HandlerError, ObserverError, SensorError};
pub use fragment::{Dtype, Fragment, FragmentData, OutputSpec, Shape};
pub use id::{ActorId, FrameId, SensorId};
pub use value::{Info, Value};
pub use world::{
    ActorKind, ActorState, CollisionEvent, ImageFrame, Location, PointCloudFrame, Rotation,
    SensorBlueprint, SensorKind, SensorReading, SensorStream, Transform, World,
};
