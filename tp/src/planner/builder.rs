//! ItineraryBuilder - day-by-day plan synthesis
//!
//! Combines parsed constraints with gathered travel data into a complete
//! itinerary: two activities, three meals, and transportation per day, plus
//! accommodation, highlights, and a budget breakdown. Deterministic given
//! identical inputs; every invocation appends a new immutable version to the
//! session.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::domain::{
    AccommodationSummary, Activity, Itinerary, ItineraryDay, Meal, ParsedConstraints, Session, TransportLeg,
    WeatherForecast,
};
use crate::travel::{TravelData, TravelDataProvider, gather_travel_data};

use super::stage::PlannerStage;

/// Budget assumed when the query never stated one
const DEFAULT_BUDGET: f64 = 1000.0;

/// Round-trip flight cost assumed when no offers were gathered
const FALLBACK_FLIGHT_COST: f64 = 420.0;

/// Nightly accommodation floor
const MIN_NIGHTLY_RATE: f64 = 30.0;

/// Generic slot names, excluded from highlights
const GENERIC_ACTIVITY_NAMES: &[&str] = &["Morning Exploration", "Afternoon Adventure"];

/// Builds day-by-day itineraries from constraints and gathered data
pub struct ItineraryBuilder {
    provider: Arc<dyn TravelDataProvider>,
    gateway: GatewayConfig,
}

impl ItineraryBuilder {
    pub fn new(provider: Arc<dyn TravelDataProvider>, gateway: GatewayConfig) -> Self {
        debug!("ItineraryBuilder::new: called");
        Self { provider, gateway }
    }

    /// Synthesize one itinerary version from constraints and gathered data
    pub fn build(&self, constraints: &ParsedConstraints, travel_data: &TravelData) -> Itinerary {
        debug!(destinations = constraints.destinations.len(), "build: called");

        let duration = constraints.duration_or_default();
        let budget = constraints.total_budget.unwrap_or(DEFAULT_BUDGET);
        let start_date = constraints.start_date.unwrap_or_else(|| Utc::now() + Duration::days(1));
        let end_date = constraints
            .end_date
            .unwrap_or_else(|| start_date + Duration::days(duration as i64));
        let primary = constraints.primary_destination().to_string();

        let mut days = Vec::with_capacity(duration as usize);
        let mut day_cost_total = 0.0;

        for day_num in 0..duration {
            let day_date = start_date + Duration::days(day_num as i64);
            let weather = self.weather_for_date(travel_data, &primary, day_date);
            let activities = self.plan_daily_activities(&primary, constraints, travel_data);
            let meals = self.plan_daily_meals(&primary, travel_data);
            let transportation = self.plan_daily_transportation(day_num, duration, travel_data, &primary);

            let estimated_cost: f64 = activities.iter().map(|a| a.cost).sum::<f64>()
                + meals.iter().map(|m| m.cost).sum::<f64>()
                + transportation.iter().map(|t| t.cost).sum::<f64>();
            day_cost_total += estimated_cost;

            days.push(ItineraryDay {
                day_number: day_num + 1,
                date: day_date,
                location: primary.clone(),
                weather_forecast: weather,
                activities,
                meals,
                transportation,
                estimated_cost,
                notes: vec![],
            });
        }

        let accommodation_cost = self.accommodation_cost(duration, budget, day_cost_total, constraints);
        let total_cost = day_cost_total + accommodation_cost;

        debug!(duration, day_cost_total, accommodation_cost, total_cost, "build: costs computed");

        Itinerary {
            title: self.title(&constraints.destinations, duration),
            description: self.description(constraints),
            total_cost,
            currency: constraints.budget_currency.clone(),
            origin: constraints.origin.clone().unwrap_or_else(|| "Unknown".to_string()),
            destinations: constraints.destinations.clone(),
            start_date,
            end_date,
            duration_days: duration,
            traveler_count: constraints.traveler_count,
            highlights: self.highlights(&days, travel_data),
            flight_summary: travel_data.flights.iter().take(2).cloned().collect(),
            accommodations_summary: self.accommodation_summary(&primary, duration, accommodation_cost, constraints),
            budget_breakdown: self.budget_breakdown(total_cost, accommodation_cost, travel_data),
            days,
            generated_at: Utc::now(),
            version: 1,
        }
    }

    /// Forecast for one day, or the fixed default when no data matched
    fn weather_for_date(&self, travel_data: &TravelData, destination: &str, date: DateTime<Utc>) -> WeatherForecast {
        match travel_data.weather_for(destination, date) {
            Some(day) => WeatherForecast {
                temperature_high: day.temperature_high,
                temperature_low: day.temperature_low,
                description: day.description.clone(),
                precipitation_chance: day.precipitation_chance,
                humidity: day.humidity,
                wind_speed: day.wind_speed,
            },
            None => {
                debug!(%destination, "weather_for_date: no forecast, using default");
                WeatherForecast::default()
            }
        }
    }

    /// Morning sightseeing slot plus an afternoon slot keyed to the top
    /// activity preference
    fn plan_daily_activities(
        &self,
        destination: &str,
        constraints: &ParsedConstraints,
        travel_data: &TravelData,
    ) -> Vec<Activity> {
        let top_pref = constraints
            .activity_preferences
            .first()
            .map(String::as_str)
            .unwrap_or("sightseeing");

        let mut morning = Activity {
            time: "9:00 AM".to_string(),
            name: "Morning Exploration".to_string(),
            activity_type: "sightseeing".to_string(),
            location: destination.to_string(),
            duration: "2-3 hours".to_string(),
            cost: 15.0,
            description: format!("Start your day exploring {}", destination),
            weather_dependent: false,
        };
        if let Some(poi) = travel_data.pois_for(destination, "sightseeing").first() {
            morning.name = poi.name.clone();
            morning.description = poi.description.clone().unwrap_or_else(|| format!("Visit {}", poi.name));
        }

        let mut afternoon = Activity {
            time: "2:00 PM".to_string(),
            name: "Afternoon Adventure".to_string(),
            activity_type: top_pref.to_string(),
            location: destination.to_string(),
            duration: "3-4 hours".to_string(),
            cost: 25.0,
            description: format!("Enjoy {} in {}", top_pref, destination),
            weather_dependent: true,
        };
        if let Some(poi) = travel_data.pois_for(destination, top_pref).first() {
            afternoon.name = poi.name.clone();
            afternoon.description = poi
                .description
                .clone()
                .unwrap_or_else(|| format!("Experience {}", poi.name));
        }

        vec![morning, afternoon]
    }

    /// Three meals, keyed to distinct restaurant POIs when available
    fn plan_daily_meals(&self, destination: &str, travel_data: &TravelData) -> Vec<Meal> {
        let restaurants = travel_data.pois_for(destination, "restaurant");

        let slots = [
            ("8:00 AM", "breakfast", "Local Café", 12.0, "Start your day with a local breakfast"),
            ("1:00 PM", "lunch", "Local Restaurant", 18.0, "Enjoy local cuisine for lunch"),
            ("7:00 PM", "dinner", "Dinner Restaurant", 28.0, "End your day with a delicious dinner"),
        ];

        slots
            .iter()
            .enumerate()
            .map(|(i, (time, meal_type, default_name, cost, default_desc))| {
                let (name, description) = match restaurants.get(i) {
                    Some(poi) => (poi.name.clone(), format!("{} at {}", title_word(meal_type), poi.name)),
                    None => (default_name.to_string(), default_desc.to_string()),
                };
                Meal {
                    time: time.to_string(),
                    meal_type: meal_type.to_string(),
                    name,
                    cost: *cost,
                    description,
                }
            })
            .collect()
    }

    /// Arrival flight + transfer on day 0, return flight on the last day,
    /// local transport every day
    fn plan_daily_transportation(
        &self,
        day_num: u32,
        total_days: u32,
        travel_data: &TravelData,
        destination: &str,
    ) -> Vec<TransportLeg> {
        let mut legs = Vec::new();

        if day_num == 0 {
            if let Some(flight) = travel_data.cheapest_flight() {
                legs.push(TransportLeg {
                    leg_type: "flight".to_string(),
                    name: format!("Flight to {}", destination),
                    time: flight.departure_date.format("%I:%M %p").to_string(),
                    duration: flight.duration.clone(),
                    cost: flight.price,
                    description: format!("{} flight from {} to {}", flight.airline, flight.origin, flight.destination),
                });
            }
            legs.push(TransportLeg {
                leg_type: "transfer".to_string(),
                name: "Airport Transfer".to_string(),
                time: "Upon arrival".to_string(),
                duration: "30-45 minutes".to_string(),
                cost: 25.0,
                description: "Transfer from airport to accommodation".to_string(),
            });
        } else if day_num == total_days - 1
            && let Some(flight) = travel_data.cheapest_flight()
        {
            legs.push(TransportLeg {
                leg_type: "flight".to_string(),
                name: "Return Flight".to_string(),
                time: flight.departure_date.format("%I:%M %p").to_string(),
                duration: flight.duration.clone(),
                // Round trip already counted on arrival
                cost: 0.0,
                description: format!("{} return flight to {}", flight.airline, flight.origin),
            });
        }

        legs.push(TransportLeg {
            leg_type: "local".to_string(),
            name: "Local Transportation".to_string(),
            time: "As needed".to_string(),
            duration: "Various".to_string(),
            cost: 15.0,
            description: "Public transport, taxis, or walking".to_string(),
        });

        legs
    }

    /// Accommodation spend, bounded by budget share and floored per night
    fn accommodation_cost(&self, duration: u32, budget: f64, day_cost_total: f64, constraints: &ParsedConstraints) -> f64 {
        let accommodation_budget = budget * 0.35;
        let remaining_budget = budget - day_cost_total;

        let mut cost = accommodation_budget.min(remaining_budget * 0.6);

        if constraints.travel_style.iter().any(|s| s == "luxury") {
            cost *= 1.5;
        } else if constraints.travel_style.iter().any(|s| s == "budget")
            || constraints.accommodation_type.iter().any(|a| a == "hostel")
        {
            cost *= 0.6;
        }

        cost.max(duration as f64 * MIN_NIGHTLY_RATE)
    }

    fn title(&self, destinations: &[String], duration: u32) -> String {
        match destinations {
            [single] => format!("{}-Day Adventure in {}", duration, single),
            many => format!(
                "{}-Day Multi-City Journey: {}",
                duration,
                many.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    fn description(&self, constraints: &ParsedConstraints) -> String {
        let traveler_desc = if constraints.traveler_count == 1 {
            "solo traveler".to_string()
        } else {
            format!("{} travelers", constraints.traveler_count)
        };
        let style_desc = constraints
            .travel_style
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "A {} itinerary designed for {}, featuring carefully selected activities, dining, and experiences.",
            style_desc, traveler_desc
        )
    }

    /// Up to 3 distinct non-generic activity names, a flight-price callout,
    /// and a weather-coverage note; capped at 5 entries
    fn highlights(&self, days: &[ItineraryDay], travel_data: &TravelData) -> Vec<String> {
        let mut highlights: Vec<String> = Vec::new();

        for day in days {
            for activity in &day.activities {
                if !GENERIC_ACTIVITY_NAMES.contains(&activity.name.as_str())
                    && !highlights.contains(&activity.name)
                    && highlights.len() < 3
                {
                    highlights.push(activity.name.clone());
                }
            }
        }

        if let Some(flight) = travel_data.cheapest_flight() {
            highlights.push(format!("Round-trip flights from ${:.0}", flight.price));
        }

        highlights.push("Weather forecasts included for each day".to_string());
        highlights.truncate(5);
        highlights
    }

    fn accommodation_summary(
        &self,
        destination: &str,
        duration: u32,
        cost: f64,
        constraints: &ParsedConstraints,
    ) -> Vec<AccommodationSummary> {
        let accommodation_type = constraints
            .accommodation_type
            .first()
            .cloned()
            .unwrap_or_else(|| "hotel".to_string());

        vec![AccommodationSummary {
            location: destination.to_string(),
            nights: duration.saturating_sub(1),
            total_cost: cost,
            description: format!("Comfortable {} accommodation in {}", accommodation_type, destination),
            accommodation_type,
        }]
    }

    /// Heuristic category allocation for display; intentionally not
    /// reconciled against per-day costs
    fn budget_breakdown(&self, total_cost: f64, accommodation_cost: f64, travel_data: &TravelData) -> BTreeMap<String, f64> {
        let flight_cost = travel_data
            .cheapest_flight()
            .map(|f| f.price * 2.0)
            .unwrap_or(FALLBACK_FLIGHT_COST);

        let remainder = total_cost - accommodation_cost - flight_cost;
        let meal_cost = remainder * 0.6;
        let activity_cost = remainder * 0.4;

        let mut breakdown = BTreeMap::new();
        breakdown.insert("flights".to_string(), flight_cost);
        breakdown.insert("accommodation".to_string(), accommodation_cost);
        breakdown.insert("activities".to_string(), activity_cost);
        breakdown.insert("meals".to_string(), meal_cost);
        breakdown.insert("transportation".to_string(), total_cost * 0.1);
        breakdown.insert("total".to_string(), total_cost);
        breakdown
    }
}

#[async_trait]
impl PlannerStage for ItineraryBuilder {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn process(&self, mut session: Session) -> eyre::Result<Session> {
        debug!(session_id = %session.session_id, "ItineraryBuilder::process: called");
        session.log_step(self.name(), "Starting itinerary generation");

        let constraints = session
            .parsed_constraints
            .clone()
            .ok_or_else(|| eyre::eyre!("Cannot build itinerary before constraints are parsed"))?;

        if !session.improvement_hints.is_empty() {
            session.log_step(
                self.name(),
                format!("Applying improvement hints: {}", session.improvement_hints.join("; ")),
            );
        }

        let travel_data = gather_travel_data(self.provider.as_ref(), &constraints, &self.gateway).await;
        session.log_step(
            self.name(),
            format!(
                "Gathered travel data: {} flight offer(s), {} forecast destination(s)",
                travel_data.flights.len(),
                travel_data.weather.len()
            ),
        );

        let itinerary = self.build(&constraints, &travel_data);
        let total_cost = itinerary.total_cost;
        let day_count = itinerary.days.len();
        let version = session.push_itinerary(itinerary);
        session.travel_data = Some(travel_data);

        session.log_step(
            self.name(),
            format!(
                "Generated itinerary v{} with {} days, estimated cost: ${:.2}",
                version, day_count, total_cost
            ),
        );
        session.touch();

        Ok(session)
    }
}

/// Capitalize one word for meal descriptions
fn title_word(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::MockTravelProvider;

    fn constraints(duration: u32, budget: f64) -> ParsedConstraints {
        let mut c = ParsedConstraints::default();
        c.destinations = vec!["Paris".to_string()];
        c.origin = Some("New York".to_string());
        c.duration_days = Some(duration);
        c.total_budget = Some(budget);
        c.traveler_count = 2;
        c.start_date = Some("2026-09-01T00:00:00Z".parse().unwrap());
        c.end_date = Some("2026-09-04T00:00:00Z".parse().unwrap());
        c
    }

    fn builder() -> ItineraryBuilder {
        ItineraryBuilder::new(Arc::new(MockTravelProvider::new()), GatewayConfig::default())
    }

    async fn gathered(c: &ParsedConstraints) -> TravelData {
        gather_travel_data(&MockTravelProvider::new(), c, &GatewayConfig::default()).await
    }

    #[tokio::test]
    async fn test_day_count_matches_duration() {
        let c = constraints(3, 2000.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);

        assert_eq!(itinerary.days.len(), 3);
        let numbers: Vec<u32> = itinerary.days.iter().map(|d| d.day_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_day_structure() {
        let c = constraints(3, 2000.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);

        for day in &itinerary.days {
            assert_eq!(day.activities.len(), 2);
            assert_eq!(day.meals.len(), 3);
            assert!(!day.transportation.is_empty());
            assert_eq!(day.location, "Paris");

            let nested: f64 = day.activities.iter().map(|a| a.cost).sum::<f64>()
                + day.meals.iter().map(|m| m.cost).sum::<f64>()
                + day.transportation.iter().map(|t| t.cost).sum::<f64>();
            assert!((day.estimated_cost - nested).abs() < 1e-9);
        }

        // Arrival day carries the flight and transfer
        let arrival = &itinerary.days[0];
        assert!(arrival.transportation.iter().any(|t| t.leg_type == "flight"));
        assert!(arrival.transportation.iter().any(|t| t.leg_type == "transfer"));

        // Last day carries a zero-cost return leg
        let last = itinerary.days.last().unwrap();
        let return_leg = last.transportation.iter().find(|t| t.name == "Return Flight").unwrap();
        assert_eq!(return_leg.cost, 0.0);

        // Every day has local transport
        for day in &itinerary.days {
            assert!(day.transportation.iter().any(|t| t.leg_type == "local"));
        }
    }

    #[tokio::test]
    async fn test_paris_scenario_within_budget_band() {
        let c = constraints(3, 2000.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);

        // The reference scenario lands within the 105% adherence band
        assert!(itinerary.total_cost <= 2000.0 * 1.05, "total {}", itinerary.total_cost);
        assert!(itinerary.total_cost > 0.0);
    }

    #[tokio::test]
    async fn test_accommodation_floor_and_style_scaling() {
        let b = builder();
        let base = constraints(3, 2000.0);

        // Floor: tiny budget still pays $30/night
        let floor = b.accommodation_cost(3, 50.0, 400.0, &base);
        assert_eq!(floor, 90.0);

        let plain = b.accommodation_cost(3, 2000.0, 400.0, &base);

        let mut luxury = base.clone();
        luxury.travel_style = vec!["luxury".to_string()];
        assert!(b.accommodation_cost(3, 2000.0, 400.0, &luxury) > plain);

        let mut hostel = base.clone();
        hostel.accommodation_type = vec!["hostel".to_string()];
        assert!(b.accommodation_cost(3, 2000.0, 400.0, &hostel) < plain);
    }

    #[tokio::test]
    async fn test_budget_breakdown_keys() {
        let c = constraints(3, 2000.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);
        let breakdown = &itinerary.budget_breakdown;

        for key in ["flights", "accommodation", "activities", "meals", "transportation", "total"] {
            assert!(breakdown.contains_key(key), "missing {key}");
        }
        assert_eq!(breakdown["total"], itinerary.total_cost);
    }

    #[tokio::test]
    async fn test_fallback_flight_cost_when_no_offers() {
        let c = constraints(3, 2000.0);
        let data = TravelData::default();

        let itinerary = builder().build(&c, &data);

        assert_eq!(itinerary.budget_breakdown["flights"], FALLBACK_FLIGHT_COST);
        // No offers means default weather on every day too
        assert_eq!(itinerary.days[0].weather_forecast.description, "Partly cloudy");
    }

    #[tokio::test]
    async fn test_highlights_capped_and_annotated() {
        let c = constraints(3, 2000.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);

        assert!(itinerary.highlights.len() <= 5);
        assert!(itinerary.highlights.iter().any(|h| h.starts_with("Round-trip flights from $")));
        assert!(!itinerary.highlights.iter().any(|h| h == "Morning Exploration"));
    }

    #[tokio::test]
    async fn test_titles() {
        let b = builder();

        assert_eq!(b.title(&["Paris".to_string()], 3), "3-Day Adventure in Paris");
        assert_eq!(
            b.title(&["Paris".to_string(), "Rome".to_string(), "Oslo".to_string()], 7),
            "7-Day Multi-City Journey: Paris, Rome"
        );
    }

    #[tokio::test]
    async fn test_meals_use_distinct_restaurants() {
        let c = constraints(2, 1500.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);
        let meals = &itinerary.days[0].meals;

        let names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(
            names.iter().collect::<std::collections::BTreeSet<_>>().len(),
            3,
            "meals should use distinct restaurants when POIs are available"
        );
    }

    #[tokio::test]
    async fn test_single_day_trip_has_no_return_leg() {
        let c = constraints(1, 500.0);
        let data = gathered(&c).await;

        let itinerary = builder().build(&c, &data);

        assert_eq!(itinerary.days.len(), 1);
        assert!(!itinerary.days[0].transportation.iter().any(|t| t.name == "Return Flight"));
    }

    #[tokio::test]
    async fn test_process_appends_versions() {
        let b = builder();
        let mut session = Session::new("test", None);
        session.parsed_constraints = Some(constraints(3, 2000.0));

        session = b.process(session).await.unwrap();
        session = b.process(session).await.unwrap();

        assert_eq!(session.itinerary_versions.len(), 2);
        assert_eq!(session.itinerary_versions[0].version, 1);
        assert_eq!(session.itinerary_versions[1].version, 2);
        assert!(session.travel_data.is_some());
    }

    #[tokio::test]
    async fn test_process_without_constraints_is_fatal() {
        let b = builder();
        let session = Session::new("test", None);

        assert!(b.process(session).await.is_err());
    }
}
