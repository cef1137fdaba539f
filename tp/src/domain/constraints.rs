//! ParsedConstraints domain type
//!
//! The fully-populated constraint record the extractor produces from a
//! free-text query. Every list field carries a sensible non-empty default so
//! downstream stages never branch on emptiness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How firm the user is about a planning dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Flexibility {
    Low,
    #[default]
    Medium,
    High,
}

/// Structured extraction of a travel query
///
/// Immutable once produced for a loop iteration; the orchestrator requests
/// re-extraction only when the user supplies a clarification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedConstraints {
    /// Departure city, when stated
    pub origin: Option<String>,

    /// Destination list; never empty, "Unknown" sentinel when unparseable
    pub destinations: Vec<String>,

    /// Trip start, when resolvable
    pub start_date: Option<DateTime<Utc>>,

    /// Trip end, when resolvable
    pub end_date: Option<DateTime<Utc>>,

    /// Trip length in days
    pub duration_days: Option<u32>,

    /// Total budget in `budget_currency`
    pub total_budget: Option<f64>,

    /// ISO currency code, defaults to USD
    pub budget_currency: String,

    /// Number of travelers, at least 1
    pub traveler_count: u32,

    /// solo, couple, family, friends
    pub traveler_types: Vec<String>,

    /// adventure, relaxation, culture, food, ...
    pub travel_style: Vec<String>,

    /// hotel, hostel, airbnb, camping, bnb
    pub accommodation_type: Vec<String>,

    /// flight, car, train, bus, walking, bike
    pub transportation_modes: Vec<String>,

    /// hiking, museums, dining, nightlife, ...
    pub activity_preferences: Vec<String>,

    pub dietary_restrictions: Vec<String>,

    pub accessibility_needs: Vec<String>,

    /// Free-text "must have" phrases
    pub must_have: Vec<String>,

    /// Free-text "avoid" phrases
    pub must_avoid: Vec<String>,

    /// Dimension (dates, budget, destinations) -> firmness
    pub flexibility: BTreeMap<String, Flexibility>,
}

impl Default for ParsedConstraints {
    fn default() -> Self {
        let mut flexibility = BTreeMap::new();
        flexibility.insert("dates".to_string(), Flexibility::Medium);
        flexibility.insert("budget".to_string(), Flexibility::Medium);
        flexibility.insert("destinations".to_string(), Flexibility::Medium);

        Self {
            origin: None,
            destinations: vec!["Unknown".to_string()],
            start_date: None,
            end_date: None,
            duration_days: None,
            total_budget: None,
            budget_currency: "USD".to_string(),
            traveler_count: 1,
            traveler_types: vec!["solo".to_string()],
            travel_style: vec!["general".to_string()],
            accommodation_type: vec!["hotel".to_string()],
            transportation_modes: vec!["flight".to_string()],
            activity_preferences: vec!["sightseeing".to_string()],
            dietary_restrictions: vec![],
            accessibility_needs: vec![],
            must_have: vec![],
            must_avoid: vec![],
            flexibility,
        }
    }
}

impl ParsedConstraints {
    /// The first-listed destination, used to anchor day-by-day planning
    pub fn primary_destination(&self) -> &str {
        debug!("ParsedConstraints::primary_destination: called");
        self.destinations.first().map(String::as_str).unwrap_or("Unknown")
    }

    /// Trip length with the builder's default applied
    pub fn duration_or_default(&self) -> u32 {
        self.duration_days.unwrap_or(3)
    }
}
