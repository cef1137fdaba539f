//! Travel data gateway for TripPlanner
//!
//! Fetches flights, weather, and points of interest for requested
//! destinations from a pluggable provider. Lookups fan out per destination
//! and tolerate partial failure; the builder supplies defaults for anything
//! missing, so a gather never fails a planning run.

#[allow(unused_imports)]
use tracing::debug;

mod gather;
mod mock;
mod provider;
mod types;

pub use gather::{TravelData, gather_travel_data};
pub use mock::MockTravelProvider;
pub use provider::TravelDataProvider;
pub use types::{FlightOffer, PointOfInterest, WeatherDay};
