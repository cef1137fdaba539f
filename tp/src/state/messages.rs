//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::Session;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    PutSession {
        session: Session,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    GetSession {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Session>>>,
    },
    DeleteSession {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListSessions {
        reply: oneshot::Sender<StateResponse<Vec<String>>>,
    },
    PurgeExpired {
        reply: oneshot::Sender<StateResponse<usize>>,
    },

    // Shutdown
    Shutdown,
}
