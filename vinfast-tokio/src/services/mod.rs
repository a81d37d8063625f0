//! Services that talk to the outside world.
pub mod persistent_state;
pub mod vinfast;
