//! Synchronization core of one room session.
//!
//! - `channel`: connection lifecycle, heartbeat and reconnect
//! - `dispatcher`: inbound frame validation and routing
//! - `reconciler`: canonical state, optimistic and authoritative updates
//! - `aggregation`: timeline, engagement score, velocity
//! - `alert`: threshold heuristics and the alert board
//! - `effects`: particles, waves, participant pulses
//! - `scheduler`: the single timer queue all of the above share
//! - `session`: the actor tying everything to a transport

pub mod aggregation;
pub mod alert;
pub mod channel;
pub mod dispatcher;
pub mod effects;
pub mod reconciler;
pub mod scheduler;
pub mod session;
pub mod snapshot;

use crate::domain::{AlertId, ParticipantId, PollId};
use effects::EffectId;

pub use channel::{ConnectionState, DisconnectCause};
pub use reconciler::{Action, RoomState};
pub use session::{Session, SessionHandle};
pub use snapshot::RoomSnapshot;

/// Every deferred task of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    Reconnect,
    Heartbeat,
    AlertExpiry(AlertId),
    EffectExpiry(EffectId),
    PulseEnd(ParticipantId),
    ParticipantIdle(ParticipantId),
    PollClear(PollId),
}
