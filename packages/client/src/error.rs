//! Error types for the synchronization client.

use thiserror::Error;

use crate::domain::ValueObjectError;

/// Reasons an inbound frame is dropped by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("unknown frame type '{0}'")]
    UnknownType(String),

    #[error("invalid '{frame_type}' payload: {reason}")]
    InvalidPayload { frame_type: String, reason: String },

    /// Payload parsed but carries an unusable value (empty id, unknown kind)
    #[error("rejected '{frame_type}' frame: {source}")]
    Domain {
        frame_type: String,
        #[source]
        source: ValueObjectError,
    },
}

/// Transport-level failures reported by a connector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("connection is closed")]
    Closed,

    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// User actions rejected before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not connected to the room")]
    NotConnected,

    #[error("question text is empty")]
    EmptyQuestion,

    #[error("poll question is empty")]
    EmptyPollText,

    #[error("poll duration must be at least one second")]
    InvalidPollDuration,

    #[error("question '{0}' is already upvoted")]
    AlreadyUpvoted(String),

    #[error("already voted in poll '{0}'")]
    AlreadyVoted(String),

    #[error("unknown question '{0}'")]
    UnknownQuestion(String),

    #[error("no poll is running")]
    NoActivePoll,

    #[error("poll '{0}' is closed")]
    PollClosed(String),

    /// The session task has stopped
    #[error("session is closed")]
    SessionClosed,
}

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValueObjectError),
}
