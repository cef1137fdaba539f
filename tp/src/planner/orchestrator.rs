//! Planner - the confidence-driven planning state machine
//!
//! Drives PARSE → BUILD → CRITIQUE and branches on the critique's confidence
//! level: HIGH finalizes, MEDIUM retries with improvement hints up to the
//! configured bound (then finalizes with warnings), LOW retries under a
//! stricter fixed bound and then stops to ask the user for clarification.
//! Full session state persists after every transition, so a crash or a
//! CLARIFY stop can always be resumed from the store.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{ConfidenceLevel, ConfidenceMetrics, Itinerary, Session};
use crate::llm::LlmClient;
use crate::state::{StateError, StateManager};
use crate::travel::TravelDataProvider;

use super::builder::ItineraryBuilder;
use super::critique::QualityEvaluator;
use super::extractor::ConstraintExtractor;
use super::stage::PlannerStage;

/// Retry bound on the LOW-confidence path
///
/// Deliberately stricter than the configurable MEDIUM bound: a plan the
/// critique rates LOW twice is unlikely to improve without new information
/// from the user, so patience runs out faster here.
const LOW_CONFIDENCE_RETRY_LIMIT: u32 = 2;

/// Sub-score below which an improvement hint is attached for the next build
const HINT_SCORE_FLOOR: f64 = 0.7;

/// States of the planning loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    Parse,
    Build,
    Critique,
    Finalize,
    Clarify,
}

/// Errors surfaced by the planning API
#[derive(Debug, Error)]
pub enum PlanError {
    /// Resuming an unknown or expired session id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Caller-facing result of one planning run
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub success: bool,
    pub session_id: String,
    /// The finalized itinerary, when planning completed
    pub itinerary: Option<Itinerary>,
    pub needs_clarification: bool,
    pub clarification_questions: Vec<String>,
    pub retry_count: u32,
    pub execution_trace: Vec<String>,
    /// Generic failure message for unsuccessful runs
    pub error: Option<String>,
}

impl PlanResponse {
    fn from_session(session: &Session, error: Option<String>) -> Self {
        Self {
            success: error.is_none() && session.is_complete,
            session_id: session.session_id.clone(),
            itinerary: session.final_itinerary.clone(),
            needs_clarification: session.needs_clarification,
            clarification_questions: session.clarification_questions.clone(),
            retry_count: session.retry_count,
            execution_trace: session.execution_trace.clone(),
            error,
        }
    }
}

/// Point-in-time summary of a stored session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub is_complete: bool,
    pub needs_clarification: bool,
    pub retry_count: u32,
    pub confidence_level: Option<ConfidenceLevel>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub has_final_itinerary: bool,
    pub clarification_questions: Vec<String>,
}

/// The planning orchestrator
pub struct Planner {
    extractor: ConstraintExtractor,
    builder: ItineraryBuilder,
    evaluator: QualityEvaluator,
    state: StateManager,
    max_retries: u32,
}

impl Planner {
    /// Assemble the planning pipeline from its collaborators
    pub fn new(
        config: &Config,
        llm: Option<Arc<dyn LlmClient>>,
        provider: Arc<dyn TravelDataProvider>,
        state: StateManager,
    ) -> Self {
        debug!(max_retries = config.planner.max_retries, "Planner::new: called");
        Self {
            extractor: ConstraintExtractor::new(llm),
            builder: ItineraryBuilder::new(provider, config.gateway.clone()),
            evaluator: QualityEvaluator::new(&config.planner),
            state,
            max_retries: config.planner.max_retries,
        }
    }

    /// Plan an itinerary for a free-text query
    ///
    /// Runs the full loop to a terminal state. Stage failures produce an
    /// unsuccessful response carrying the execution trace; they are not
    /// surfaced as `Err`, which is reserved for store-level failures.
    pub async fn plan(&self, query: &str, session_id: Option<String>) -> Result<PlanResponse, PlanError> {
        debug!(query_len = query.len(), ?session_id, "plan: called");
        let mut session = Session::new(query, session_id);
        session.log_step(
            "orchestrator",
            format!("Starting travel planning workflow for session {}", session.session_id),
        );

        self.run_loop(session).await
    }

    /// Resume a session that stopped to ask for clarification
    ///
    /// The user's answer extends the original query, the retry counter
    /// resets, and the loop re-enters PARSE.
    pub async fn resume(&self, session_id: &str, additional_info: &str) -> Result<PlanResponse, PlanError> {
        debug!(%session_id, "resume: called");
        let mut session = self
            .state
            .get_session(session_id)
            .await?
            .ok_or_else(|| PlanError::SessionNotFound(session_id.to_string()))?;

        session.log_step(
            "orchestrator",
            format!("Processing user clarification: {}", truncate(additional_info, 100)),
        );
        session.absorb_clarification(additional_info);

        self.run_loop(session).await
    }

    /// Current status of a stored session
    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatus, PlanError> {
        debug!(%session_id, "session_status: called");
        let session = self
            .state
            .get_session(session_id)
            .await?
            .ok_or_else(|| PlanError::SessionNotFound(session_id.to_string()))?;

        Ok(SessionStatus {
            session_id: session.session_id.clone(),
            is_complete: session.is_complete,
            needs_clarification: session.needs_clarification,
            retry_count: session.retry_count,
            confidence_level: session.confidence_level,
            created_at: session.created_at,
            updated_at: session.updated_at,
            has_final_itinerary: session.final_itinerary.is_some(),
            clarification_questions: session.clarification_questions.clone(),
        })
    }

    /// Execution trace of a stored session, for debugging and transparency
    pub async fn execution_trace(&self, session_id: &str) -> Result<Vec<String>, PlanError> {
        debug!(%session_id, "execution_trace: called");
        let session = self
            .state
            .get_session(session_id)
            .await?
            .ok_or_else(|| PlanError::SessionNotFound(session_id.to_string()))?;
        Ok(session.execution_trace)
    }

    /// Drive the state machine to a terminal state
    async fn run_loop(&self, mut session: Session) -> Result<PlanResponse, PlanError> {
        let mut state = PlannerState::Parse;

        loop {
            debug!(session_id = %session.session_id, ?state, retry_count = session.retry_count, "run_loop: transition");

            state = match state {
                PlannerState::Parse => match self.run_stage(&self.extractor, session).await? {
                    StageOutcome::Ok(updated) => {
                        session = updated;
                        PlannerState::Build
                    }
                    StageOutcome::Failed(response) => return Ok(response),
                },

                PlannerState::Build => match self.run_stage(&self.builder, session).await? {
                    StageOutcome::Ok(updated) => {
                        session = updated;
                        PlannerState::Critique
                    }
                    StageOutcome::Failed(response) => return Ok(response),
                },

                PlannerState::Critique => match self.run_stage(&self.evaluator, session).await? {
                    StageOutcome::Ok(updated) => {
                        session = updated;
                        self.decide(&mut session)
                    }
                    StageOutcome::Failed(response) => return Ok(response),
                },

                PlannerState::Finalize => {
                    self.finalize(&mut session);
                    self.persist(&session).await?;
                    break;
                }

                PlannerState::Clarify => {
                    self.request_clarification(&mut session);
                    self.persist(&session).await?;
                    break;
                }
            };
        }

        info!(
            session_id = %session.session_id,
            complete = session.is_complete,
            needs_clarification = session.needs_clarification,
            "Workflow completed"
        );
        session.log_step(
            "orchestrator",
            format!(
                "Workflow completed - Complete: {}, Needs clarification: {}",
                session.is_complete, session.needs_clarification
            ),
        );
        self.persist(&session).await?;

        Ok(PlanResponse::from_session(&session, None))
    }

    /// Branch on the critique's confidence level
    fn decide(&self, session: &mut Session) -> PlannerState {
        let level = session.confidence_level.unwrap_or(ConfidenceLevel::Low);
        debug!(session_id = %session.session_id, %level, retry_count = session.retry_count, "decide: called");

        match level {
            ConfidenceLevel::High => {
                debug!(session_id = %session.session_id, "decide: high confidence, finalizing");
                PlannerState::Finalize
            }
            ConfidenceLevel::Medium => {
                if session.retry_count < self.max_retries {
                    session.retry_count += 1;
                    session.improvement_hints = improvement_hints(session.confidence_metrics.as_ref());
                    session.log_step(
                        "orchestrator",
                        format!("Handling retry {}/{}", session.retry_count, self.max_retries),
                    );
                    PlannerState::Build
                } else {
                    debug!(session_id = %session.session_id, "decide: medium confidence, retries exhausted");
                    session.log_step("orchestrator", "Max retries reached, finalized with warnings");
                    PlannerState::Finalize
                }
            }
            ConfidenceLevel::Low => {
                if session.retry_count < LOW_CONFIDENCE_RETRY_LIMIT {
                    session.retry_count += 1;
                    session.log_step(
                        "orchestrator",
                        format!(
                            "Low confidence, regenerating (attempt {}/{})",
                            session.retry_count, LOW_CONFIDENCE_RETRY_LIMIT
                        ),
                    );
                    PlannerState::Build
                } else {
                    debug!(session_id = %session.session_id, "decide: low confidence, asking for clarification");
                    PlannerState::Clarify
                }
            }
        }
    }

    /// Lock in the current itinerary as final
    fn finalize(&self, session: &mut Session) {
        debug!(session_id = %session.session_id, "finalize: called");
        session.log_step("orchestrator", "Finalizing itinerary");

        if let Some(itinerary) = session.current_itinerary().cloned() {
            session.final_itinerary = Some(itinerary);
            session.is_complete = true;
        }
        session.touch();
    }

    /// Stop and ask the user for more input
    fn request_clarification(&self, session: &mut Session) {
        debug!(session_id = %session.session_id, "request_clarification: called");

        let constraints = session.parsed_constraints.clone().unwrap_or_default();
        let questions = match session.confidence_metrics.as_ref() {
            Some(metrics) => self.evaluator.clarification_questions(metrics, &constraints),
            None => vec![
                "We need more information to create the perfect itinerary for you. \
                 Could you provide more details about your preferences or requirements?"
                    .to_string(),
            ],
        };

        session.needs_clarification = true;
        session.clarification_questions = questions;
        session.log_step(
            "orchestrator",
            format!("Requesting clarification with {} question(s)", session.clarification_questions.len()),
        );
        session.touch();
    }

    /// Run one stage, persisting the outcome either way
    ///
    /// A stage error is fatal for the request but still leaves an audit
    /// trail: the pre-stage snapshot persists with a trace entry naming the
    /// failure, and the caller gets an unsuccessful response carrying it.
    async fn run_stage(&self, stage: &dyn PlannerStage, session: Session) -> Result<StageOutcome, PlanError> {
        let snapshot = session.clone();
        match stage.process(session).await {
            Ok(updated) => {
                self.persist(&updated).await?;
                Ok(StageOutcome::Ok(updated))
            }
            Err(e) => {
                warn!(session_id = %snapshot.session_id, stage = stage.name(), error = %e, "run_stage: stage failed");
                let mut failed = snapshot;
                failed.log_step(stage.name(), format!("Stage failed: {}", e));
                self.persist(&failed).await?;
                Ok(StageOutcome::Failed(PlanResponse::from_session(
                    &failed,
                    Some("Itinerary generation failed; see execution trace for details".to_string()),
                )))
            }
        }
    }

    /// Persist full session state before control moves on
    async fn persist(&self, session: &Session) -> Result<(), PlanError> {
        self.state.put_session(session.clone()).await?;
        Ok(())
    }
}

/// Result of running one stage inside the loop
enum StageOutcome {
    Ok(Session),
    Failed(PlanResponse),
}

/// Builder guidance derived from weak sub-scores
fn improvement_hints(metrics: Option<&ConfidenceMetrics>) -> Vec<String> {
    let Some(metrics) = metrics else {
        return vec![];
    };

    let mut hints = Vec::new();
    if metrics.budget_score < HINT_SCORE_FLOOR {
        hints.push("Focus on budget-friendly options".to_string());
    }
    if metrics.preference_match_score < HINT_SCORE_FLOOR {
        hints.push("Better match user preferences".to_string());
    }
    if metrics.feasibility_score < HINT_SCORE_FLOOR {
        hints.push("Improve timeline and logistics".to_string());
    }
    hints
}

/// Clip long user text for trace entries
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let clipped: String = s.chars().take(max_chars).collect();
        format!("{}...", clipped)
    }
}
