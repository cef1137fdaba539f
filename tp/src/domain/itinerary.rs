//! Itinerary domain types
//!
//! One Itinerary is an immutable snapshot produced by a single builder
//! invocation. Sessions retain every version for audit; `version` is 1-based
//! and monotonically increasing within a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weather expectation for one day at one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub description: String,
    pub precipitation_chance: u32,
    pub humidity: u32,
    pub wind_speed: f64,
}

impl Default for WeatherForecast {
    /// Fixed record used when no forecast matched a day
    fn default() -> Self {
        Self {
            temperature_high: 75.0,
            temperature_low: 65.0,
            description: "Partly cloudy".to_string(),
            precipitation_chance: 20,
            humidity: 60,
            wind_speed: 10.0,
        }
    }
}

/// One planned activity slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub time: String,
    pub name: String,
    /// Category tag (sightseeing, hiking, museums, ...)
    pub activity_type: String,
    pub location: String,
    pub duration: String,
    pub cost: f64,
    pub description: String,
    /// Whether bad weather would force a replan of this slot
    pub weather_dependent: bool,
}

/// One planned meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub time: String,
    /// breakfast, lunch, dinner
    pub meal_type: String,
    pub name: String,
    pub cost: f64,
    pub description: String,
}

/// One transportation leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportLeg {
    /// flight, transfer, local
    pub leg_type: String,
    pub name: String,
    pub time: String,
    pub duration: String,
    pub cost: f64,
    pub description: String,
}

/// Accommodation summary entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccommodationSummary {
    pub accommodation_type: String,
    pub location: String,
    pub nights: u32,
    pub total_cost: f64,
    pub description: String,
}

/// A single day in the itinerary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryDay {
    /// 1-based day number
    pub day_number: u32,
    pub date: DateTime<Utc>,
    pub location: String,
    pub weather_forecast: WeatherForecast,
    pub activities: Vec<Activity>,
    pub meals: Vec<Meal>,
    pub transportation: Vec<TransportLeg>,
    /// Sum of nested activity, meal, and transport costs
    pub estimated_cost: f64,
    pub notes: Vec<String>,
}

/// Complete itinerary snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    pub title: String,
    pub description: String,
    pub total_cost: f64,
    pub currency: String,

    pub origin: String,
    pub destinations: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_days: u32,
    pub traveler_count: u32,

    pub days: Vec<ItineraryDay>,

    /// Up to 5 summary strings
    pub highlights: Vec<String>,
    /// Best flight options carried for display (at most 2)
    pub flight_summary: Vec<crate::travel::FlightOffer>,
    pub accommodations_summary: Vec<AccommodationSummary>,
    /// Category -> amount, including a `total` key. Display heuristic; does
    /// not reconcile against per-day costs.
    pub budget_breakdown: BTreeMap<String, f64>,

    pub generated_at: DateTime<Utc>,
    /// 1-based version within the session
    pub version: u32,
}
