//! Domain error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    /// Participant identity is empty
    #[error("Participant ID must not be empty")]
    EmptyParticipantId,

    /// Room code is empty after trimming
    #[error("Room code must not be empty")]
    EmptyRoomCode,

    /// Room code contains characters that cannot appear in a path segment
    #[error("Room code '{0}' must be alphanumeric")]
    InvalidRoomCode(String),

    /// Question or poll identity is empty
    #[error("Identifier must not be empty")]
    EmptyIdentifier,

    /// Reaction kind is not one of the fixed set
    #[error("Unknown reaction kind '{0}'")]
    UnknownReactionKind(String),

    /// Poll ballot is neither `yes` nor `no`
    #[error("Unknown vote '{0}', expected 'yes' or 'no'")]
    UnknownVote(String),
}
