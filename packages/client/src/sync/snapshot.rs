//! Immutable view of a session, published after every processed event.

use super::{
    aggregation::{TimelineBucket, compute_engagement_score, compute_timeline, compute_velocity},
    channel::{ChannelManager, ConnectionState},
    effects::{Effect, ParticipantActivity},
    reconciler::RoomState,
};
use crate::config::SyncConfig;
use crate::domain::{
    Alert, ParticipantId, Poll, Question, ReactionEvent, ReactionTally, RoomCode, Timestamp,
    VoteChoice,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_code: RoomCode,
    pub me: ParticipantId,
    pub connection: ConnectionState,
    pub last_heartbeat_at: Option<Timestamp>,
    pub tally: ReactionTally,
    pub engagement_score: u8,
    pub velocity_per_minute: f64,
    /// Oldest bucket first
    pub timeline: Vec<TimelineBucket>,
    /// Newest first
    pub questions: Vec<Question>,
    pub poll: Option<Poll>,
    pub my_vote: Option<VoteChoice>,
    /// Newest first
    pub alerts: Vec<Alert>,
    pub effects: Vec<Effect>,
    pub participants: Vec<ParticipantActivity>,
    /// Oldest first
    pub recent_reactions: Vec<ReactionEvent>,
    pub viewers: Option<u32>,
    pub total_questions: Option<u32>,
    pub taken_at: Timestamp,
}

impl RoomSnapshot {
    /// State before the first connection attempt
    pub fn empty(room_code: RoomCode, me: ParticipantId, config: &SyncConfig, now: Timestamp) -> Self {
        Self::capture(
            &room_code,
            &me,
            ConnectionState::Idle,
            None,
            &RoomState::new(),
            config,
            now,
        )
    }

    pub(crate) fn from_session(
        room_code: &RoomCode,
        me: &ParticipantId,
        channel: &ChannelManager,
        state: &RoomState,
        config: &SyncConfig,
        now: Timestamp,
    ) -> Self {
        Self::capture(
            room_code,
            me,
            channel.state(),
            channel.last_heartbeat_at(),
            state,
            config,
            now,
        )
    }

    fn capture(
        room_code: &RoomCode,
        me: &ParticipantId,
        connection: ConnectionState,
        last_heartbeat_at: Option<Timestamp>,
        state: &RoomState,
        config: &SyncConfig,
        now: Timestamp,
    ) -> Self {
        let log = state.reaction_log();
        let tally = state.tally();
        Self {
            room_code: room_code.clone(),
            me: me.clone(),
            connection,
            last_heartbeat_at,
            tally,
            engagement_score: compute_engagement_score(&tally),
            velocity_per_minute: compute_velocity(log, now, config.velocity_window_ms),
            timeline: compute_timeline(
                log,
                now,
                config.timeline_bucket_ms,
                config.timeline_bucket_count,
            ),
            questions: state.questions().to_vec(),
            poll: state.poll().map(|p| p.poll.clone()),
            my_vote: state.poll().and_then(|p| p.my_vote),
            alerts: state.alerts().alerts().cloned().collect(),
            effects: state.effects().effects().cloned().collect(),
            participants: state.effects().participants(),
            recent_reactions: log.iter().cloned().collect(),
            viewers: state.viewers(),
            total_questions: state.total_questions(),
            taken_at: now,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Open
    }
}
