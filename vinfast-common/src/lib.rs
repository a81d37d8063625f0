//! Common stuff shared between vinfast-tokio and vinfast-backend
#![warn(missing_docs)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::use_self)]

pub mod datetime;
pub mod entities;
pub mod region;
pub mod schedule;
pub mod telemetry;

pub use std::time::Duration;
