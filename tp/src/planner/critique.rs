//! QualityEvaluator - itinerary scoring and clarification questions
//!
//! Scores an itinerary against the constraints on five independent axes,
//! combines four of them into an overall confidence score, and produces
//! targeted clarification questions when confidence comes up short. Each
//! axis is independently defined and clamped to [0,1].

use async_trait::async_trait;
use chrono::Timelike;
use std::collections::BTreeSet;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::domain::{ConfidenceLevel, ConfidenceMetrics, Itinerary, ParsedConstraints, Session};

use super::stage::PlannerStage;

/// Sub-score below which a clarification question is worth asking
const CLARIFICATION_SCORE_FLOOR: f64 = 0.6;

/// Evaluates itinerary quality and decides what to ask the user
pub struct QualityEvaluator {
    high_threshold: f64,
    medium_threshold: f64,
}

impl QualityEvaluator {
    pub fn new(config: &PlannerConfig) -> Self {
        debug!(
            high = config.confidence_threshold_high,
            medium = config.confidence_threshold_medium,
            "QualityEvaluator::new: called"
        );
        Self {
            high_threshold: config.confidence_threshold_high,
            medium_threshold: config.confidence_threshold_medium,
        }
    }

    /// Score an itinerary against the constraints
    pub fn evaluate(&self, itinerary: &Itinerary, constraints: &ParsedConstraints) -> ConfidenceMetrics {
        debug!(version = itinerary.version, "evaluate: called");

        let metrics = ConfidenceMetrics::new(
            self.budget_adherence(itinerary, constraints),
            self.feasibility(itinerary),
            self.preference_match(itinerary, constraints),
            self.completeness(itinerary),
            self.experience_quality(itinerary),
        );

        debug!(
            budget = metrics.budget_score,
            feasibility = metrics.feasibility_score,
            preference = metrics.preference_match_score,
            completeness = metrics.completeness_score,
            quality = metrics.quality_score,
            overall = metrics.overall_score,
            "evaluate: complete"
        );
        metrics
    }

    /// Bucket an overall score into a confidence level
    pub fn level(&self, metrics: &ConfidenceMetrics) -> ConfidenceLevel {
        ConfidenceLevel::from_score(metrics.overall_score, self.high_threshold, self.medium_threshold)
    }

    /// How well total cost fits the budget
    ///
    /// Banded on the actual/target ratio, with a bonus when the breakdown
    /// allocates flights and accommodation in broadly sane proportions.
    fn budget_adherence(&self, itinerary: &Itinerary, constraints: &ParsedConstraints) -> f64 {
        let Some(target_budget) = constraints.total_budget else {
            debug!("budget_adherence: no budget stated, assuming reasonable");
            return 0.8;
        };

        let actual_cost = itinerary.total_cost;
        let budget_ratio = actual_cost / target_budget;

        let mut score = if budget_ratio <= 0.95 {
            1.0
        } else if budget_ratio <= 1.05 {
            0.9
        } else if budget_ratio <= 1.15 {
            0.7
        } else if budget_ratio <= 1.25 {
            0.4
        } else {
            0.1
        };

        if actual_cost > 0.0 {
            let flight_ratio = itinerary.budget_breakdown.get("flights").copied().unwrap_or(0.0) / actual_cost;
            let accom_ratio = itinerary.budget_breakdown.get("accommodation").copied().unwrap_or(0.0) / actual_cost;

            if (0.3..=0.6).contains(&flight_ratio) && (0.2..=0.5).contains(&accom_ratio) {
                score = (score + 0.1_f64).min(1.0);
            }
        }

        debug!(budget_ratio, score, "budget_adherence: scored");
        score
    }

    /// Is the timeline realistic?
    fn feasibility(&self, itinerary: &Itinerary) -> f64 {
        if itinerary.days.is_empty() {
            debug!("feasibility: no days, scoring zero");
            return 0.0;
        }

        let mut score: f64 = 1.0;

        for day in &itinerary.days {
            // Overpacked days cost; spaced, timed slots earn a signal back
            if day.activities.len() > 4 {
                score -= 0.1;
            }
            let timed = day.activities.iter().filter(|a| !a.time.is_empty()).count();
            if timed >= 2 {
                score += 0.05;
            }
        }

        for flight in &itinerary.flight_summary {
            let hour = flight.departure_date.hour();
            if (6..=22).contains(&hour) {
                score += 0.05;
            } else {
                score -= 0.05;
            }
        }

        // Multi-city trips need roughly two days per destination
        let destination_count = itinerary.destinations.len() as u32;
        if destination_count > 1 && itinerary.duration_days < destination_count * 2 {
            score -= 0.2;
        }

        let score = score.clamp(0.0, 1.0);
        debug!(score, "feasibility: scored");
        score
    }

    /// Does the plan match what the user asked for?
    fn preference_match(&self, itinerary: &Itinerary, constraints: &ParsedConstraints) -> f64 {
        let mut score: f64 = 0.5;

        for day in &itinerary.days {
            for activity in &day.activities {
                let activity_type = activity.activity_type.to_lowercase();
                let activity_name = activity.name.to_lowercase();

                for pref in &constraints.activity_preferences {
                    let pref = pref.to_lowercase();
                    if activity_type.contains(&pref) || activity_name.contains(&pref) {
                        score += 0.1;
                    }
                }
                for style in &constraints.travel_style {
                    let style = style.to_lowercase();
                    if activity_type.contains(&style) || activity_name.contains(&style) {
                        score += 0.1;
                    }
                }
            }
        }

        for accommodation in &itinerary.accommodations_summary {
            if constraints.accommodation_type.contains(&accommodation.accommodation_type) {
                score += 0.15;
            }
        }

        // Outdoor slots planned against the forecast
        for day in &itinerary.days {
            let outdoor = day.activities.iter().filter(|a| a.weather_dependent).count();
            if outdoor > 0 {
                if day.weather_forecast.precipitation_chance > 70 {
                    score -= 0.1;
                } else if day.weather_forecast.precipitation_chance < 30 {
                    score += 0.05;
                }
            }
        }

        let score = score.clamp(0.0, 1.0);
        debug!(score, "preference_match: scored");
        score
    }

    /// Are all necessary details included?
    fn completeness(&self, itinerary: &Itinerary) -> f64 {
        let mut score: f64 = 0.0;

        // Eight required top-level fields
        let required_present = [
            !itinerary.title.is_empty(),
            !itinerary.description.is_empty(),
            itinerary.total_cost > 0.0,
            !itinerary.destinations.is_empty(),
            true, // start_date
            true, // end_date
            !itinerary.days.is_empty(),
            !itinerary.budget_breakdown.is_empty(),
        ];
        for present in required_present {
            if present {
                score += 0.1;
            }
        }

        for day in &itinerary.days {
            let day_elements = [!day.activities.is_empty(), !day.meals.is_empty(), !day.transportation.is_empty()];
            let populated = day_elements.iter().filter(|&&p| p).count();
            score += (populated as f64 / day_elements.len() as f64) * 0.1;
        }

        // Every structured day carries a forecast record
        if !itinerary.days.is_empty() {
            score += 0.1;
        }

        // Excluding the synthetic total line
        if itinerary.budget_breakdown.keys().filter(|k| *k != "total").count() >= 4 {
            score += 0.1;
        }

        let score = score.clamp(0.0, 1.0);
        debug!(score, "completeness: scored");
        score
    }

    /// Advisory experience-quality score; excluded from the overall
    fn experience_quality(&self, itinerary: &Itinerary) -> f64 {
        let mut score: f64 = 0.5;

        let activity_types: BTreeSet<&str> = itinerary
            .days
            .iter()
            .flat_map(|d| d.activities.iter().map(|a| a.activity_type.as_str()))
            .collect();
        if activity_types.len() >= 3 {
            score += 0.2;
        }

        let mut local_experiences = 0usize;
        let mut total_activities = 0usize;
        for day in &itinerary.days {
            total_activities += day.activities.len();
            for activity in &day.activities {
                let description = activity.description.to_lowercase();
                if ["local", "authentic", "traditional"].iter().any(|w| description.contains(w)) {
                    local_experiences += 1;
                }
            }
        }
        if total_activities > 0 {
            score += (local_experiences as f64 / total_activities as f64) * 0.2;
        }

        let unique_restaurants: BTreeSet<&str> = itinerary
            .days
            .iter()
            .flat_map(|d| d.meals.iter().map(|m| m.name.as_str()))
            .collect();
        if unique_restaurants.len() >= itinerary.days.len() && !itinerary.days.is_empty() {
            score += 0.1;
        }

        // Longer trips should leave room to breathe
        let total_days = itinerary.days.len();
        if total_days >= 3 {
            let downtime_days = itinerary.days.iter().filter(|d| d.activities.len() <= 2).count();
            if downtime_days as f64 >= total_days as f64 * 0.3 {
                score += 0.1;
            }
        }

        let score = score.clamp(0.0, 1.0);
        debug!(score, "experience_quality: scored");
        score
    }

    /// Up to 3 targeted clarification questions for a low-confidence result
    pub fn clarification_questions(&self, metrics: &ConfidenceMetrics, constraints: &ParsedConstraints) -> Vec<String> {
        debug!(overall = metrics.overall_score, "clarification_questions: called");
        let mut questions = Vec::new();

        if metrics.budget_score < CLARIFICATION_SCORE_FLOOR {
            match constraints.total_budget {
                Some(budget) => questions.push(format!(
                    "Your budget of ${:.0} might be tight for this trip. \
                     Would you like to increase the budget or adjust the itinerary scope?",
                    budget
                )),
                None => questions.push(
                    "Could you provide a specific budget range for this trip? \
                     This will help us create a more realistic itinerary."
                        .to_string(),
                ),
            }
        }

        if metrics.preference_match_score < CLARIFICATION_SCORE_FLOOR {
            questions.push(
                "The planned activities might not fully match your interests. \
                 Could you provide more specific preferences or must-have experiences?"
                    .to_string(),
            );
        }

        if metrics.feasibility_score < CLARIFICATION_SCORE_FLOOR {
            let destination_count = constraints.destinations.len() as u32;
            if destination_count > 1 && constraints.duration_or_default() < destination_count * 2 {
                questions.push(
                    "The timeline might be rushed for visiting multiple destinations. \
                     Would you prefer to extend the trip or focus on fewer places?"
                        .to_string(),
                );
            }
        }

        if metrics.completeness_score < CLARIFICATION_SCORE_FLOOR {
            let mut missing = Vec::new();
            if constraints.start_date.is_none() {
                missing.push("travel dates");
            }
            if constraints.origin.is_none() {
                missing.push("departure location");
            }
            if constraints.accommodation_type.is_empty() {
                missing.push("accommodation preferences");
            }
            if !missing.is_empty() {
                questions.push(format!("Could you provide more details about: {}?", missing.join(", ")));
            }
        }

        if questions.is_empty() {
            questions.push(
                "We need more information to create the perfect itinerary for you. \
                 Could you provide more details about your preferences or requirements?"
                    .to_string(),
            );
        }

        questions.truncate(3);
        questions
    }
}

#[async_trait]
impl PlannerStage for QualityEvaluator {
    fn name(&self) -> &'static str {
        "critique"
    }

    async fn process(&self, mut session: Session) -> eyre::Result<Session> {
        debug!(session_id = %session.session_id, "QualityEvaluator::process: called");
        session.log_step(self.name(), "Starting itinerary critique and evaluation");

        let Some(itinerary) = session.current_itinerary() else {
            session.log_step(self.name(), "No itinerary found to critique");
            return Ok(session);
        };
        let constraints = session.parsed_constraints.clone().unwrap_or_default();

        let metrics = self.evaluate(itinerary, &constraints);
        let level = self.level(&metrics);

        session.log_step(
            self.name(),
            format!("Evaluation complete - Confidence: {} (score: {:.2})", level, metrics.overall_score),
        );
        session.confidence_metrics = Some(metrics);
        session.confidence_level = Some(level);
        session.touch();

        Ok(session)
    }
}
