//! PlannerStage trait definition

use async_trait::async_trait;

use crate::domain::Session;

/// One stage of the planning loop
///
/// Stages take exclusive ownership of the session, mutate their slice of it,
/// and hand it back; the orchestrator composes them by explicit sequencing.
/// A stage error is fatal for the current request - recoverable conditions
/// (missing data, bad model output) are handled inside the stage with
/// fallbacks instead.
#[async_trait]
pub trait PlannerStage: Send + Sync {
    /// Stage name used in trace entries
    fn name(&self) -> &'static str;

    /// Process the session and return it updated
    async fn process(&self, session: Session) -> eyre::Result<Session>;
}
