//! TravelDataProvider trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{FlightOffer, PointOfInterest, WeatherDay};

/// Pluggable source of external travel data
///
/// Implementations may call real network services or generate deterministic
/// mock records with identical shapes. Callers treat every method as
/// best-effort: errors are logged and degraded to empty results at the
/// gather layer, never propagated into the planning loop.
#[async_trait]
pub trait TravelDataProvider: Send + Sync {
    /// Search flight offers between two cities
    async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        departure_date: DateTime<Utc>,
        return_date: Option<DateTime<Utc>>,
        adults: u32,
    ) -> eyre::Result<Vec<FlightOffer>>;

    /// Daily forecast for a location starting at `start_date`
    async fn get_weather(&self, location: &str, start_date: DateTime<Utc>, days: u32) -> eyre::Result<Vec<WeatherDay>>;

    /// Points of interest in a location for one category
    async fn search_poi(&self, location: &str, category: &str, limit: usize) -> eyre::Result<Vec<PointOfInterest>>;
}
