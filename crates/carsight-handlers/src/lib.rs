//! Observation handlers for carsight.
//!
//! Each handler turns one source of simulator or task state into a
//! named observation fragment:
//!
//! | Handler | Output | Source |
//! |---------|--------|--------|
//! | [`BaseHandler`] | none | no-op default |
//! | [`BirdeyeHandler`] | `(H, W, 3)` u8 | actor boxes, rasterized ego-centric |
//! | [`CameraHandler`] | `(H, W, 3)` u8 | RGB camera sensor |
//! | [`CollisionHandler`] | `(1,)` f32 | collision sensor |
//! | [`LidarHandler`] | `(H, W, 3)` u8 | lidar sensor, binned ego-centric |
//! | [`MaskHandler`] | `(H, W, 1)` f32 | field-of-view cone geometry |
//! | [`MessageHandler`] | `(N,)` f32 | scalar environment values |
//! | [`SimpleHandler`] | configured, f32 | one vector environment value |
//! | [`SpectatorHandler`] | none | moves the simulator spectator |
//!
//! Handlers are built explicitly from typed configs with
//! [`build_handler`] or, for a whole observation, [`build_observer`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod base;
pub mod birdeye;
pub mod camera;
pub mod collision;
pub mod config;
pub mod lidar;
pub mod mask;
pub mod message;
pub mod sensor;
pub mod simple;
pub mod spectator;

pub use base::BaseHandler;
pub use birdeye::BirdeyeHandler;
pub use camera::CameraHandler;
pub use collision::CollisionHandler;
pub use config::{
    build_handler, build_observer, BirdeyeConfig, CameraConfig, CollisionConfig, HandlerConfig,
    LidarConfig, MaskConfig, MessageConfig, SimpleConfig, SpectatorConfig,
};
pub use lidar::LidarHandler;
pub use mask::{visibility_mask, MaskHandler};
pub use message::MessageHandler;
pub use simple::SimpleHandler;
pub use spectator::SpectatorHandler;
