//! Wire types returned by travel data providers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One flight option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub price: f64,
    pub currency: String,
    pub airline: String,
    /// Human-readable duration, e.g. "4h 35m"
    pub duration: String,
    pub stops: u32,
}

/// One day of forecast for a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherDay {
    pub location: String,
    pub date: DateTime<Utc>,
    pub temperature_high: f64,
    pub temperature_low: f64,
    pub description: String,
    pub humidity: u32,
    pub wind_speed: f64,
    pub precipitation_chance: u32,
}

/// A point of interest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: String,
    pub name: String,
    pub category: String,
    pub rating: Option<f64>,
    /// 1 (cheap) to 4 (expensive)
    pub price_level: Option<u32>,
    pub description: Option<String>,
}
