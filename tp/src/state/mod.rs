//! State management for TripPlanner
//!
//! A StateManager actor owns the SessionStore and serializes access to it
//! through a command channel, so many in-flight planning sessions can share
//! one store handle without contending on locks.

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
