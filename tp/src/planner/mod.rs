//! Planning loop for TripPlanner
//!
//! The orchestrator drives extract → build → critique until the session
//! reaches a terminal state: finalized, finalized-with-warnings, or waiting
//! on user clarification. Each stage consumes and returns the Session, and
//! full session state persists after every transition.

mod builder;
mod critique;
mod extractor;
mod orchestrator;
mod stage;

pub use builder::ItineraryBuilder;
pub use critique::QualityEvaluator;
pub use extractor::ConstraintExtractor;
pub use orchestrator::{PlanError, PlanResponse, Planner, PlannerState, SessionStatus};
pub use stage::PlannerStage;
