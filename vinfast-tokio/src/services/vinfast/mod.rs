//! VinFast connected car service.
pub mod api;
pub mod poller;
