//! Carsight: composable egocentric observations for driving-simulator
//! reinforcement learning.
//!
//! This is the facade crate that re-exports the public API of the
//! carsight sub-crates. Most users only need `carsight` as a dependency.
//!
//! # Quick start
//!
//! ```rust
//! use carsight::prelude::*;
//!
//! # let world = carsight_test_utils::MockWorld::with_ego(
//! #     carsight_test_utils::fixtures::vehicle(1, 0.0, 0.0, 0.0));
//! let entries = vec![
//!     ("mask".to_string(), HandlerConfig::Mask(MaskConfig {
//!         height: 3,
//!         width: 3,
//!         sight_fov: 90.0,
//!         ego_offset: Some(2),
//!     })),
//!     ("base".to_string(), HandlerConfig::Base),
//! ];
//! let mut observer = build_observer(&world, &entries).unwrap();
//! observer.reset().unwrap();
//!
//! let values = Info::new();
//! let env = EnvState::new(&world, FrameId(1), ActorId(1), &values);
//! let step = observer.observe(&env).unwrap();
//! assert_eq!(
//!     step.observations["mask"].as_f32().unwrap(),
//!     &[1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]
//! );
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `carsight-core` | IDs, values, fragments, world snapshots, errors |
//! | [`obs`] | `carsight-obs` | `Handler` trait and the `Observer` composer |
//! | [`handlers`] | `carsight-handlers` | Built-in handlers and their configs |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, the simulator contract, and error types (`carsight-core`).
///
/// The [`types::World`] trait is the seam to a live simulator.
pub use carsight_core as types;

/// Handler trait and observation composer (`carsight-obs`).
///
/// Implement [`obs::Handler`] for custom observations and compose them
/// with [`obs::Observer`].
pub use carsight_obs as obs;

/// Built-in handlers (`carsight-handlers`).
///
/// Includes [`handlers::MaskHandler`], [`handlers::CameraHandler`],
/// [`handlers::LidarHandler`], and [`handlers::BirdeyeHandler`], plus
/// [`handlers::build_observer`] for config-driven construction.
pub use carsight_handlers as handlers;

/// Common imports for typical carsight usage.
///
/// ```rust
/// use carsight::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use carsight_core::{
        ActorId, ActorState, Dtype, Fragment, FrameId, Info, OutputSpec, SensorReading, Transform,
        Value, World,
    };

    // Errors
    pub use carsight_core::{ConfigError, HandlerError, ObserverError, SensorError};

    // Composition
    pub use carsight_obs::{EnvState, Handler, HandlerOutput, Observer, StepObservation};

    // Handlers
    pub use carsight_handlers::{build_handler, build_observer, HandlerConfig, MaskConfig};
}
