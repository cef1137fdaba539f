//! TripPlanner - confidence-driven travel itinerary planning
//!
//! TripPlanner turns a free-text travel request into a day-by-day itinerary
//! through an iterative generate-evaluate-retry loop. A query is parsed into
//! structured constraints, an itinerary is synthesized from gathered travel
//! data, and the result is scored for quality; low scores trigger bounded
//! regeneration or a request for user clarification.
//!
//! # Core Concepts
//!
//! - **Confidence-Driven Branching**: every itinerary version is scored on
//!   independent axes; the discrete confidence level picks the next state
//! - **Bounded Retries**: regeneration is capped by the state machine's own
//!   counters, never by infrastructure-level retry
//! - **Full Audit Trail**: sessions carry every itinerary version and an
//!   append-only execution trace, persisted after every transition
//! - **Degrade, Don't Block**: model calls and travel-data lookups fall back
//!   to deterministic data instead of failing the loop
//!
//! # Modules
//!
//! - [`planner`] - extraction, building, critique, and the orchestrator
//! - [`travel`] - travel data gateway and the mock provider
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`state`] - session persistence actor over the SessionStore
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod planner;
pub mod state;
pub mod travel;

// Re-export commonly used types
pub use config::{Config, GatewayConfig, LlmConfig, PlannerConfig, StorageConfig};
pub use domain::{
    ConfidenceLevel, ConfidenceMetrics, Flexibility, Itinerary, ItineraryDay, ParsedConstraints, Session,
};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use planner::{
    ConstraintExtractor, ItineraryBuilder, PlanError, PlanResponse, Planner, PlannerStage, QualityEvaluator,
    SessionStatus,
};
pub use state::{StateError, StateManager};
pub use travel::{FlightOffer, MockTravelProvider, PointOfInterest, TravelData, TravelDataProvider, WeatherDay};
