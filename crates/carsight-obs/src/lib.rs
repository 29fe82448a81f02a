//! Handler trait and observation composer for carsight.
//!
//! A [`Handler`] turns simulator state into one named slice of an
//! agent's observation. The [`Observer`] owns an ordered list of
//! handlers, drives their per-episode `reset` and per-step
//! `get_observation`, and assembles the results into a single
//! [`StepObservation`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod handler;
pub mod observer;

pub use handler::{EnvState, Handler, HandlerOutput};
pub use observer::{Observer, StepObservation};
