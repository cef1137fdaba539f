//! Deterministic mock travel data provider
//!
//! Generates realistic-looking records seeded from the request inputs, so
//! identical queries produce identical data. This keeps the builder
//! deterministic end-to-end and lets tests assert on concrete values.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hash::{DefaultHasher, Hash, Hasher};
use tracing::debug;

use super::{FlightOffer, PointOfInterest, TravelDataProvider, WeatherDay};

const WEATHER_DESCRIPTIONS: &[&str] = &[
    "Sunny",
    "Partly Cloudy",
    "Cloudy",
    "Light Rain",
    "Clear",
    "Scattered Clouds",
    "Overcast",
];

const AIRLINES: &[&str] = &[
    "Delta",
    "American Airlines",
    "United",
    "JetBlue",
    "Southwest",
    "Alaska Airlines",
    "Spirit",
];

/// Sample POI names by category
fn poi_pool(category: &str) -> &'static [&'static str] {
    match category {
        "restaurant" => &[
            "The Local Bistro",
            "Sunset Grill",
            "Corner Café",
            "Ocean View Restaurant",
            "Mountain Lodge Dining",
        ],
        "attraction" | "sightseeing" => &[
            "City Museum",
            "Historic Downtown",
            "Waterfront Park",
            "Art Gallery",
            "Scenic Overlook",
        ],
        "shopping" => &[
            "Local Market",
            "Artisan Shops",
            "Downtown Mall",
            "Vintage Boutiques",
            "Craft Center",
        ],
        _ => &["Local Spot", "Neighborhood Favorite", "Hidden Gem"],
    }
}

/// Deterministic seed from arbitrary hashable inputs
fn seed_for<T: Hash>(input: T) -> u64 {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

/// Mock travel data provider
#[derive(Debug, Clone, Default)]
pub struct MockTravelProvider;

impl MockTravelProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TravelDataProvider for MockTravelProvider {
    async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        departure_date: DateTime<Utc>,
        return_date: Option<DateTime<Utc>>,
        adults: u32,
    ) -> eyre::Result<Vec<FlightOffer>> {
        debug!(%origin, %destination, adults, "MockTravelProvider::search_flights: called");
        let mut rng = StdRng::seed_from_u64(seed_for((origin, destination, departure_date.date_naive())));

        let count = rng.random_range(2..=3);
        let mut flights = Vec::with_capacity(count);

        for i in 0..count {
            let base_price: i64 = rng.random_range(200..=800);
            let adjustment: i64 = rng.random_range(-50..=200);

            flights.push(FlightOffer {
                id: format!("flight_{}_{}_{}", origin, destination, i),
                origin: origin.to_string(),
                destination: destination.to_string(),
                // Keep departures in daytime hours so feasibility checks see
                // plausible schedules
                departure_date: departure_date + Duration::hours(rng.random_range(7..=20)),
                return_date,
                price: (base_price + adjustment) as f64,
                currency: "USD".to_string(),
                airline: AIRLINES[rng.random_range(0..AIRLINES.len())].to_string(),
                duration: format!("{}h {}m", rng.random_range(2..=8), rng.random_range(0..56)),
                stops: rng.random_range(0..=1),
            });
        }

        flights.sort_by(|a, b| a.price.total_cmp(&b.price));
        Ok(flights)
    }

    async fn get_weather(&self, location: &str, start_date: DateTime<Utc>, days: u32) -> eyre::Result<Vec<WeatherDay>> {
        debug!(%location, days, "MockTravelProvider::get_weather: called");
        let base_temp: f64 = if location.to_lowercase().contains("beach") { 75.0 } else { 65.0 };

        let mut forecasts = Vec::with_capacity(days as usize);
        for day in 0..days {
            let date = start_date + Duration::days(day as i64);
            let mut rng = StdRng::seed_from_u64(seed_for((location, date.date_naive())));
            let variation: i64 = rng.random_range(-15..=15);

            forecasts.push(WeatherDay {
                location: location.to_string(),
                date,
                temperature_high: base_temp + variation as f64 + rng.random_range(5..=15) as f64,
                temperature_low: base_temp + variation as f64 - rng.random_range(5..=15) as f64,
                description: WEATHER_DESCRIPTIONS[rng.random_range(0..WEATHER_DESCRIPTIONS.len())].to_string(),
                humidity: rng.random_range(30..=80),
                wind_speed: rng.random_range(5..=25) as f64,
                precipitation_chance: rng.random_range(0..=40),
            });
        }

        Ok(forecasts)
    }

    async fn search_poi(&self, location: &str, category: &str, limit: usize) -> eyre::Result<Vec<PointOfInterest>> {
        debug!(%location, %category, limit, "MockTravelProvider::search_poi: called");
        let mut rng = StdRng::seed_from_u64(seed_for((location, category)));
        let pool = poi_pool(category);

        let pois = pool
            .iter()
            .take(limit.min(3))
            .enumerate()
            .map(|(i, name)| PointOfInterest {
                id: format!("{}_{}_{}", category, location, i),
                name: format!("{} - {}", name, location),
                category: category.to_string(),
                rating: Some((rng.random_range(35..=48) as f64) / 10.0),
                price_level: Some(rng.random_range(1..=4)),
                description: Some(format!("Popular {} in {} with great reviews", category, location)),
            })
            .collect();

        Ok(pois)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depart() -> DateTime<Utc> {
        "2026-09-01T00:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_flights_deterministic_and_sorted() {
        let provider = MockTravelProvider::new();

        let a = provider.search_flights("New York", "Paris", depart(), None, 2).await.unwrap();
        let b = provider.search_flights("New York", "Paris", depart(), None, 2).await.unwrap();

        assert!(!a.is_empty());
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].price, b[0].price);
        assert!(a.windows(2).all(|w| w[0].price <= w[1].price));
    }

    #[tokio::test]
    async fn test_flight_departure_hours_are_daytime() {
        use chrono::Timelike;
        let provider = MockTravelProvider::new();

        let flights = provider.search_flights("New York", "Tokyo", depart(), None, 1).await.unwrap();
        for flight in flights {
            let hour = flight.departure_date.hour();
            assert!((6..=22).contains(&hour), "hour {hour} outside daytime window");
        }
    }

    #[tokio::test]
    async fn test_weather_covers_requested_days() {
        let provider = MockTravelProvider::new();

        let forecast = provider.get_weather("Paris", depart(), 4).await.unwrap();

        assert_eq!(forecast.len(), 4);
        assert_eq!(forecast[0].date, depart());
        assert_eq!(forecast[3].date, depart() + Duration::days(3));
        for day in &forecast {
            assert!(day.temperature_high > day.temperature_low);
            assert!(day.precipitation_chance <= 40);
        }
    }

    #[tokio::test]
    async fn test_poi_respects_limit_and_category() {
        let provider = MockTravelProvider::new();

        let pois = provider.search_poi("Paris", "restaurant", 2).await.unwrap();

        assert_eq!(pois.len(), 2);
        assert!(pois.iter().all(|p| p.category == "restaurant"));
        assert!(pois[0].name.contains("Paris"));
    }
}
