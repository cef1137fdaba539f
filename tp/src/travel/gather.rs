//! Travel data gathering
//!
//! Fans out provider lookups per destination and assembles the results the
//! builder consumes. Partial failures degrade to empty collections; a gather
//! never fails the planning run and never blocks past the configured
//! timeout.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::domain::ParsedConstraints;

use super::{FlightOffer, PointOfInterest, TravelDataProvider, WeatherDay};

/// Origin assumed when the query never stated one
const DEFAULT_ORIGIN: &str = "New York";

/// Everything gathered for one build pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelData {
    /// Flight offers across all destinations, cheapest first per search
    pub flights: Vec<FlightOffer>,

    /// Destination -> daily forecast
    pub weather: BTreeMap<String, Vec<WeatherDay>>,

    /// Destination -> category -> points of interest
    pub points_of_interest: BTreeMap<String, BTreeMap<String, Vec<PointOfInterest>>>,
}

impl TravelData {
    /// Forecast entry for a destination on a calendar date
    pub fn weather_for(&self, destination: &str, date: DateTime<Utc>) -> Option<&WeatherDay> {
        self.weather
            .get(destination)?
            .iter()
            .find(|w| w.date.date_naive() == date.date_naive())
    }

    /// Points of interest for a destination and category
    pub fn pois_for(&self, destination: &str, category: &str) -> &[PointOfInterest] {
        self.points_of_interest
            .get(destination)
            .and_then(|cats| cats.get(category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cheapest flight offer across all searches
    pub fn cheapest_flight(&self) -> Option<&FlightOffer> {
        self.flights.iter().min_by(|a, b| a.price.total_cmp(&b.price))
    }
}

/// Gather flights, weather, and POIs for every destination in the constraints
///
/// Per-destination lookups run concurrently since they are independent reads
/// with no ordering requirement. Each call is bounded by the gateway timeout
/// and degrades to empty data on failure.
pub async fn gather_travel_data(
    provider: &dyn TravelDataProvider,
    constraints: &ParsedConstraints,
    config: &GatewayConfig,
) -> TravelData {
    debug!(destinations = constraints.destinations.len(), "gather_travel_data: called");

    let origin = constraints.origin.clone().unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
    let duration_days = constraints.duration_or_default();
    let start_date = constraints.start_date.unwrap_or_else(|| Utc::now() + Duration::days(1));
    let end_date = constraints
        .end_date
        .unwrap_or_else(|| start_date + Duration::days(duration_days as i64));

    // Top activity preferences plus restaurants for meal planning
    let mut categories: Vec<String> = constraints
        .activity_preferences
        .iter()
        .take(config.max_poi_categories)
        .cloned()
        .collect();
    if !categories.iter().any(|c| c == "restaurant") {
        categories.push("restaurant".to_string());
    }

    let lookups = constraints.destinations.iter().map(|destination| {
        let origin = origin.clone();
        let categories = categories.clone();
        async move {
            let flights = gather_flights(
                provider,
                config,
                &origin,
                destination,
                start_date,
                Some(end_date),
                constraints.traveler_count,
            )
            .await;
            let weather = gather_weather(provider, config, destination, start_date, duration_days + 1).await;
            let pois = gather_pois(provider, config, destination, &categories).await;
            (destination.clone(), flights, weather, pois)
        }
    });

    let mut data = TravelData::default();
    for (destination, flights, weather, pois) in join_all(lookups).await {
        data.flights.extend(flights);
        if !weather.is_empty() {
            data.weather.insert(destination.clone(), weather);
        }
        data.points_of_interest.insert(destination, pois);
    }

    debug!(
        flight_count = data.flights.len(),
        weather_destinations = data.weather.len(),
        "gather_travel_data: complete"
    );
    data
}

async fn gather_flights(
    provider: &dyn TravelDataProvider,
    config: &GatewayConfig,
    origin: &str,
    destination: &str,
    departure_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    adults: u32,
) -> Vec<FlightOffer> {
    debug!(%origin, %destination, "gather_flights: called");
    let call = provider.search_flights(origin, destination, departure_date, return_date, adults);
    match tokio::time::timeout(config.request_timeout(), call).await {
        Ok(Ok(flights)) => flights,
        Ok(Err(e)) => {
            warn!(%destination, error = %e, "Flight search failed, continuing without offers");
            vec![]
        }
        Err(_) => {
            warn!(%destination, "Flight search timed out, continuing without offers");
            vec![]
        }
    }
}

async fn gather_weather(
    provider: &dyn TravelDataProvider,
    config: &GatewayConfig,
    destination: &str,
    start_date: DateTime<Utc>,
    days: u32,
) -> Vec<WeatherDay> {
    debug!(%destination, days, "gather_weather: called");
    let call = provider.get_weather(destination, start_date, days);
    match tokio::time::timeout(config.request_timeout(), call).await {
        Ok(Ok(forecast)) => forecast,
        Ok(Err(e)) => {
            warn!(%destination, error = %e, "Weather lookup failed, continuing without forecast");
            vec![]
        }
        Err(_) => {
            warn!(%destination, "Weather lookup timed out, continuing without forecast");
            vec![]
        }
    }
}

async fn gather_pois(
    provider: &dyn TravelDataProvider,
    config: &GatewayConfig,
    destination: &str,
    categories: &[String],
) -> BTreeMap<String, Vec<PointOfInterest>> {
    debug!(%destination, category_count = categories.len(), "gather_pois: called");
    let mut by_category = BTreeMap::new();

    for category in categories {
        let call = provider.search_poi(destination, category, config.poi_limit);
        let pois = match tokio::time::timeout(config.request_timeout(), call).await {
            Ok(Ok(pois)) => pois,
            Ok(Err(e)) => {
                warn!(%destination, %category, error = %e, "POI search failed, continuing without results");
                vec![]
            }
            Err(_) => {
                warn!(%destination, %category, "POI search timed out, continuing without results");
                vec![]
            }
        };
        by_category.insert(category.clone(), pois);
    }

    by_category
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::MockTravelProvider;
    use async_trait::async_trait;

    /// Provider that fails every call, for degradation tests
    struct FailingProvider;

    #[async_trait]
    impl TravelDataProvider for FailingProvider {
        async fn search_flights(
            &self,
            _origin: &str,
            _destination: &str,
            _departure_date: DateTime<Utc>,
            _return_date: Option<DateTime<Utc>>,
            _adults: u32,
        ) -> eyre::Result<Vec<FlightOffer>> {
            Err(eyre::eyre!("provider down"))
        }

        async fn get_weather(
            &self,
            _location: &str,
            _start_date: DateTime<Utc>,
            _days: u32,
        ) -> eyre::Result<Vec<WeatherDay>> {
            Err(eyre::eyre!("provider down"))
        }

        async fn search_poi(
            &self,
            _location: &str,
            _category: &str,
            _limit: usize,
        ) -> eyre::Result<Vec<PointOfInterest>> {
            Err(eyre::eyre!("provider down"))
        }
    }

    fn constraints() -> ParsedConstraints {
        let mut c = ParsedConstraints::default();
        c.destinations = vec!["Paris".to_string()];
        c.origin = Some("New York".to_string());
        c.duration_days = Some(3);
        c.start_date = Some("2026-09-01T00:00:00Z".parse().unwrap());
        c
    }

    #[tokio::test]
    async fn test_gather_with_mock_provider() {
        let provider = MockTravelProvider::new();
        let config = GatewayConfig::default();

        let data = gather_travel_data(&provider, &constraints(), &config).await;

        assert!(!data.flights.is_empty());
        assert!(data.weather.contains_key("Paris"));
        // duration 3 -> 4 forecast days covering arrival through departure
        assert_eq!(data.weather["Paris"].len(), 4);
        assert!(!data.pois_for("Paris", "restaurant").is_empty());
        assert!(!data.pois_for("Paris", "sightseeing").is_empty());
        assert!(data.cheapest_flight().is_some());
    }

    #[tokio::test]
    async fn test_gather_degrades_to_empty_on_provider_failure() {
        let provider = FailingProvider;
        let config = GatewayConfig::default();

        let data = gather_travel_data(&provider, &constraints(), &config).await;

        assert!(data.flights.is_empty());
        assert!(data.weather.is_empty());
        assert!(data.pois_for("Paris", "restaurant").is_empty());
        assert!(data.cheapest_flight().is_none());
    }

    #[tokio::test]
    async fn test_weather_for_matches_by_calendar_date() {
        let provider = MockTravelProvider::new();
        let config = GatewayConfig::default();
        let c = constraints();

        let data = gather_travel_data(&provider, &c, &config).await;

        let start = c.start_date.unwrap();
        assert!(data.weather_for("Paris", start).is_some());
        assert!(data.weather_for("Paris", start + Duration::days(30)).is_none());
        assert!(data.weather_for("Lyon", start).is_none());
    }

    #[tokio::test]
    async fn test_multi_destination_gather() {
        let provider = MockTravelProvider::new();
        let config = GatewayConfig::default();
        let mut c = constraints();
        c.destinations = vec!["Paris".to_string(), "Rome".to_string()];

        let data = gather_travel_data(&provider, &c, &config).await;

        assert!(data.weather.contains_key("Paris"));
        assert!(data.weather.contains_key("Rome"));
        assert!(data.flights.iter().any(|f| f.destination == "Paris"));
        assert!(data.flights.iter().any(|f| f.destination == "Rome"));
    }
}
