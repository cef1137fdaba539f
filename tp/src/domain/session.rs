//! Session domain type
//!
//! Tracks the full state of one planning conversation: the original query,
//! extracted constraints, every itinerary version, the latest quality
//! metrics, and an append-only execution trace. The orchestrator is the sole
//! mutator of the control fields (`retry_count`, `is_complete`,
//! `needs_clarification`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::travel::TravelData;

use super::id::generate_session_id;
use super::{ConfidenceLevel, ConfidenceMetrics, Itinerary, ParsedConstraints};

/// State of one planning conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (`{hex6}-trip-{slug}`)
    pub session_id: String,

    /// Original request text, extended (never rewritten) by clarifications
    pub user_query: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,

    /// Regeneration attempts so far this run
    pub retry_count: u32,

    /// True once a final itinerary is locked in
    pub is_complete: bool,

    /// True when planning stopped to ask the user for more input
    pub needs_clarification: bool,

    /// Questions attached when clarification is requested
    pub clarification_questions: Vec<String>,

    /// Builder guidance derived from weak sub-scores on the previous pass
    pub improvement_hints: Vec<String>,

    /// Structured constraints from the latest parse
    pub parsed_constraints: Option<ParsedConstraints>,

    /// Gathered external data from the latest build
    pub travel_data: Option<TravelData>,

    /// Every itinerary version produced this session, oldest first
    pub itinerary_versions: Vec<Itinerary>,

    /// Metrics from the latest critique
    pub confidence_metrics: Option<ConfidenceMetrics>,

    /// Level from the latest critique
    pub confidence_level: Option<ConfidenceLevel>,

    /// The finalized itinerary, once complete
    pub final_itinerary: Option<Itinerary>,

    /// Ordered, append-only log of stage transitions and decisions
    pub execution_trace: Vec<String>,
}

impl Session {
    /// Create a new session, generating an id when the caller supplies none
    pub fn new(user_query: impl Into<String>, session_id: Option<String>) -> Self {
        let user_query = user_query.into();
        let session_id = session_id.unwrap_or_else(|| generate_session_id(&user_query));
        debug!(%session_id, query_len = user_query.len(), "Session::new: called");

        let now = Utc::now();
        Self {
            session_id,
            user_query,
            created_at: now,
            updated_at: now,
            retry_count: 0,
            is_complete: false,
            needs_clarification: false,
            clarification_questions: vec![],
            improvement_hints: vec![],
            parsed_constraints: None,
            travel_data: None,
            itinerary_versions: vec![],
            confidence_metrics: None,
            confidence_level: None,
            final_itinerary: None,
            execution_trace: vec![],
        }
    }

    /// The latest itinerary version, if any
    pub fn current_itinerary(&self) -> Option<&Itinerary> {
        self.itinerary_versions.last()
    }

    /// Append a new itinerary version, assigning the next version number
    pub fn push_itinerary(&mut self, mut itinerary: Itinerary) -> u32 {
        let version = self.itinerary_versions.len() as u32 + 1;
        itinerary.version = version;
        debug!(session_id = %self.session_id, version, "Session::push_itinerary: called");
        self.itinerary_versions.push(itinerary);
        version
    }

    /// Record one trace line for a stage and emit it to the log
    pub fn log_step(&mut self, stage: &str, message: impl AsRef<str>) {
        let message = message.as_ref();
        let entry = format!("[{}] {}: {}", Utc::now().to_rfc3339(), stage, message);
        info!(session_id = %self.session_id, stage, "{}", message);
        self.execution_trace.push(entry);
    }

    /// Bump the updated-at timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Fold a clarification answer into the session and rearm it for a fresh
    /// planning run: query extended, retry counter reset, decision state
    /// cleared. Itinerary versions and the trace are kept for audit.
    pub fn absorb_clarification(&mut self, additional_info: &str) {
        debug!(session_id = %self.session_id, info_len = additional_info.len(), "Session::absorb_clarification: called");
        self.user_query = format!("{}\n\nAdditional details: {}", self.user_query, additional_info);
        self.retry_count = 0;
        self.is_complete = false;
        self.needs_clarification = false;
        self.clarification_questions.clear();
        self.improvement_hints.clear();
        self.parsed_constraints = None;
        self.travel_data = None;
        self.confidence_metrics = None;
        self.confidence_level = None;
        self.final_itinerary = None;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_itinerary() -> Itinerary {
        Itinerary {
            title: "t".to_string(),
            description: "d".to_string(),
            total_cost: 100.0,
            currency: "USD".to_string(),
            origin: "Unknown".to_string(),
            destinations: vec!["Paris".to_string()],
            start_date: Utc::now(),
            end_date: Utc::now(),
            duration_days: 3,
            traveler_count: 1,
            days: vec![],
            highlights: vec![],
            flight_summary: vec![],
            accommodations_summary: vec![],
            budget_breakdown: Default::default(),
            generated_at: Utc::now(),
            version: 1,
        }
    }

    #[test]
    fn test_new_session_initial_state() {
        let session = Session::new("Plan a trip to Paris", None);

        assert_eq!(session.retry_count, 0);
        assert!(!session.is_complete);
        assert!(!session.needs_clarification);
        assert!(session.session_id.contains("-trip-"));
        assert!(session.itinerary_versions.is_empty());
    }

    #[test]
    fn test_caller_supplied_id_kept() {
        let session = Session::new("query", Some("my-id".to_string()));
        assert_eq!(session.session_id, "my-id");
    }

    #[test]
    fn test_push_itinerary_versions_increase() {
        let mut session = Session::new("query", None);

        let v1 = session.push_itinerary(minimal_itinerary());
        let v2 = session.push_itinerary(minimal_itinerary());

        assert_eq!((v1, v2), (1, 2));
        assert_eq!(session.current_itinerary().unwrap().version, 2);
        assert_eq!(session.itinerary_versions[0].version, 1);
    }

    #[test]
    fn test_log_step_appends_trace() {
        let mut session = Session::new("query", None);

        session.log_step("parse", "Starting query parsing");
        session.log_step("build", "Generated itinerary v1");

        assert_eq!(session.execution_trace.len(), 2);
        assert!(session.execution_trace[0].contains("parse: Starting query parsing"));
        assert!(session.execution_trace[1].contains("build: Generated itinerary v1"));
    }

    #[test]
    fn test_absorb_clarification_resets_decision_state() {
        let mut session = Session::new("Plan a trip", None);
        session.retry_count = 2;
        session.needs_clarification = true;
        session.clarification_questions.push("Budget?".to_string());
        session.push_itinerary(minimal_itinerary());
        session.log_step("critique", "needs clarification");

        session.absorb_clarification("Budget is $2000");

        assert_eq!(session.retry_count, 0);
        assert!(!session.needs_clarification);
        assert!(session.clarification_questions.is_empty());
        assert!(session.user_query.contains("Additional details: Budget is $2000"));
        // audit history survives
        assert_eq!(session.itinerary_versions.len(), 1);
        assert_eq!(session.execution_trace.len(), 1);
    }

    #[test]
    fn test_serde_roundtrip_preserves_trace() {
        let mut session = Session::new("query", None);
        session.log_step("parse", "step one");

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(back.session_id, session.session_id);
        assert_eq!(back.execution_trace, session.execution_trace);
        assert_eq!(back.created_at, session.created_at);
    }
}
