//! Domain types for TripPlanner
//!
//! Core domain types: Session, ParsedConstraints, Itinerary, ConfidenceMetrics.
//! The Session owns everything produced during one planning conversation and
//! is what the state manager persists after every orchestrator transition.

#[allow(unused_imports)]
use tracing::debug;

mod constraints;
mod id;
mod itinerary;
mod metrics;
mod session;

pub use constraints::{Flexibility, ParsedConstraints};
pub use id::generate_session_id;
pub use itinerary::{
    AccommodationSummary, Activity, Itinerary, ItineraryDay, Meal, TransportLeg, WeatherForecast,
};
pub use metrics::{ConfidenceLevel, ConfidenceMetrics};
pub use session::Session;
