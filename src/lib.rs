//! # harvest
//!
//! Bounded fan-out/fan-in dispatch under a deadline.
//!
//! One worker per submitted item, all spawned eagerly; results fan back in
//! through a channel sized to the submission count and are collected in
//! completion order until every item has reported or the deadline fires,
//! whichever comes first. An incomplete result set is the normal timeout
//! outcome, not an error.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod model;
pub mod shutdown;
pub mod telemetry;
