//! Domain layer: value objects and entities of a feedback room.
//!
//! Nothing here performs I/O or reads the clock; timestamps are passed in.

pub mod entity;
pub mod error;
pub mod value_object;

pub use entity::{
    Alert, AlertId, AlertKind, AlertSeverity, Poll, Question, ReactionEvent, ReactionTally,
};
pub use error::ValueObjectError;
pub use value_object::{
    ParticipantId, PollId, QuestionId, ReactionKind, RoomCode, Timestamp, VoteChoice,
};
