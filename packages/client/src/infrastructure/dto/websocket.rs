//! WebSocket frame DTOs exchanged with the room channel server.
//!
//! Every frame is a JSON object with a `type` discriminator. Outbound frames are
//! serialized straight from [`OutboundFrame`]; inbound frames are validated into
//! the [`InboundFrame`] tagged union before any handler sees them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_POLL_DURATION_SECS;
use crate::error::FrameError;

// ========================================
// Client → Server
// ========================================

/// Frames sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Snapshot request, also used as the heartbeat
    GetStats,
    Reaction {
        reaction: String,
        user_id: String,
    },
    Question {
        text: String,
        user_id: String,
    },
    UpvoteQuestion {
        question_id: String,
        user_id: String,
    },
    CreatePoll {
        text: String,
        duration: u64,
    },
    VotePoll {
        poll_id: String,
        user_id: String,
        vote: String,
    },
}

impl OutboundFrame {
    /// Value of the `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundFrame::GetStats => "get_stats",
            OutboundFrame::Reaction { .. } => "reaction",
            OutboundFrame::Question { .. } => "question",
            OutboundFrame::UpvoteQuestion { .. } => "upvote_question",
            OutboundFrame::CreatePoll { .. } => "create_poll",
            OutboundFrame::VotePoll { .. } => "vote_poll",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ========================================
// Server → Client payloads
// ========================================

/// Timestamp as sent by the server: ISO-8601 text or epoch milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Text(String),
}

/// Reaction counts keyed by reaction kind; unknown kinds are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TallyDto {
    pub speed_up: u64,
    pub slow_down: u64,
    pub show_code: u64,
    pub im_lost: u64,
}

/// One reaction event; the server puts the kind under `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReactionEventDto {
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionDto {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub upvoted_by: Vec<String>,
}

/// Upvote payload; the server usually sends the whole question record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionUpvoteDto {
    pub id: String,
    pub upvotes: u64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub upvoted_by: Vec<String>,
}

fn default_poll_duration() -> u64 {
    DEFAULT_POLL_DURATION_SECS
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollDto {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_poll_duration")]
    pub duration: u64,
    #[serde(default)]
    pub yes_votes: u64,
    #[serde(default)]
    pub no_votes: u64,
    #[serde(default = "default_active")]
    pub active: bool,
}

// ========================================
// Server → Client frames
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ConnectedFrame {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub room_code: Option<String>,
}

/// Full authoritative snapshot, answer to `get_stats`
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct StatsFrame {
    #[serde(default)]
    pub counts: TallyDto,
    /// Oldest first, as the server keeps them
    #[serde(default)]
    pub recent_questions: Vec<QuestionDto>,
    #[serde(default)]
    pub recent_reactions: Vec<ReactionEventDto>,
    #[serde(default)]
    pub active_poll: Option<PollDto>,
    #[serde(default)]
    pub active_connections: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionFrame {
    pub counts: TallyDto,
    #[serde(default)]
    pub data: Option<ReactionEventDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionFrame {
    pub data: QuestionDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionUpvoteFrame {
    pub data: QuestionUpvoteDto,
}

/// Shared shape of `poll_created`, `poll_vote` and `poll_closed`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollFrame {
    pub data: PollDto,
    /// Voter, present on `poll_vote`
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Validated inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Connected(ConnectedFrame),
    Stats(StatsFrame),
    Reaction(ReactionFrame),
    Question(QuestionFrame),
    QuestionUpvote(QuestionUpvoteFrame),
    PollCreated(PollFrame),
    PollVote(PollFrame),
    PollClosed(PollFrame),
    Pong,
}

impl InboundFrame {
    /// Parse and validate one raw text frame.
    pub fn from_json(raw: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| FrameError::InvalidJson(e.to_string()))?;

        let type_name = match value.get("type") {
            Some(Value::String(type_name)) => type_name.clone(),
            Some(_) | None => return Err(FrameError::MissingType),
        };

        fn payload<T: serde::de::DeserializeOwned>(
            type_name: &str,
            value: Value,
        ) -> Result<T, FrameError> {
            serde_json::from_value(value).map_err(|e| FrameError::InvalidPayload {
                frame_type: type_name.to_string(),
                reason: e.to_string(),
            })
        }

        let frame = match type_name.as_str() {
            "connected" => InboundFrame::Connected(payload(&type_name, value)?),
            "stats" => InboundFrame::Stats(payload(&type_name, value)?),
            "reaction" => InboundFrame::Reaction(payload(&type_name, value)?),
            "question" => InboundFrame::Question(payload(&type_name, value)?),
            "question_upvote" => InboundFrame::QuestionUpvote(payload(&type_name, value)?),
            "poll_created" => InboundFrame::PollCreated(payload(&type_name, value)?),
            "poll_vote" => InboundFrame::PollVote(payload(&type_name, value)?),
            "poll_closed" => InboundFrame::PollClosed(payload(&type_name, value)?),
            "pong" => InboundFrame::Pong,
            _ => return Err(FrameError::UnknownType(type_name)),
        };

        Ok(frame)
    }

    /// Value of the `type` field this frame was parsed from
    pub fn type_name(&self) -> &'static str {
        match self {
            InboundFrame::Connected(_) => "connected",
            InboundFrame::Stats(_) => "stats",
            InboundFrame::Reaction(_) => "reaction",
            InboundFrame::Question(_) => "question",
            InboundFrame::QuestionUpvote(_) => "question_upvote",
            InboundFrame::PollCreated(_) => "poll_created",
            InboundFrame::PollVote(_) => "poll_vote",
            InboundFrame::PollClosed(_) => "poll_closed",
            InboundFrame::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_stats_serializes_type_only() {
        // テスト項目: get_stats は type フィールドのみの JSON になる
        // given (前提条件):
        let frame = OutboundFrame::GetStats;

        // when (操作):
        let json = frame.to_json().unwrap();

        // then (期待する結果):
        assert_eq!(json, r#"{"type":"get_stats"}"#);
    }

    #[test]
    fn test_vote_poll_serializes_all_fields() {
        // テスト項目: vote_poll は poll_id, user_id, vote を含む
        // given (前提条件):
        let frame = OutboundFrame::VotePoll {
            poll_id: "poll-ABC-1".to_string(),
            user_id: "user_1".to_string(),
            vote: "yes".to_string(),
        };

        // when (操作):
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "vote_poll");
        assert_eq!(value["poll_id"], "poll-ABC-1");
        assert_eq!(value["user_id"], "user_1");
        assert_eq!(value["vote"], "yes");
    }

    #[test]
    fn test_parse_reaction_frame_reads_kind_from_type() {
        // テスト項目: reaction の data.type がリアクション種別として読まれる
        // given (前提条件):
        let raw = r#"{
            "type": "reaction",
            "data": {"type": "im_lost", "timestamp": "2025-01-01T10:00:00.5", "user_id": "user_a", "room_code": "ABC"},
            "counts": {"speed_up": 1, "slow_down": 0, "show_code": 0, "im_lost": 4}
        }"#;

        // when (操作):
        let frame = InboundFrame::from_json(raw).unwrap();

        // then (期待する結果):
        let InboundFrame::Reaction(reaction) = frame else {
            panic!("expected reaction frame");
        };
        assert_eq!(reaction.counts.im_lost, 4);
        let data = reaction.data.unwrap();
        assert_eq!(data.kind, "im_lost");
        assert_eq!(
            data.timestamp,
            Some(WireTimestamp::Text("2025-01-01T10:00:00.5".to_string()))
        );
    }

    #[test]
    fn test_parse_stats_with_missing_optional_fields() {
        // テスト項目: stats の省略可能フィールドが欠けていても解析できる
        // given (前提条件):
        let raw = r#"{"type": "stats", "counts": {"speed_up": 2}, "active_poll": null}"#;

        // when (操作):
        let frame = InboundFrame::from_json(raw).unwrap();

        // then (期待する結果):
        let InboundFrame::Stats(stats) = frame else {
            panic!("expected stats frame");
        };
        assert_eq!(stats.counts.speed_up, 2);
        assert_eq!(stats.counts.im_lost, 0);
        assert!(stats.recent_questions.is_empty());
        assert!(stats.active_poll.is_none());
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        // テスト項目: JSON として不正なフレームは InvalidJson になる
        // given (前提条件):
        let raw = "{not json";

        // when (操作):
        let result = InboundFrame::from_json(raw);

        // then (期待する結果):
        assert!(matches!(result, Err(FrameError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_rejects_non_string_type() {
        // テスト項目: type が文字列でないフレームは MissingType になる
        // given (前提条件):
        let raw = r#"{"type": 7}"#;

        // when (操作):
        let result = InboundFrame::from_json(raw);

        // then (期待する結果):
        assert_eq!(result, Err(FrameError::MissingType));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        // テスト項目: 未知の type は UnknownType になる
        // given (前提条件):
        let raw = r#"{"type": "confetti"}"#;

        // when (操作):
        let result = InboundFrame::from_json(raw);

        // then (期待する結果):
        assert_eq!(result, Err(FrameError::UnknownType("confetti".to_string())));
    }

    #[test]
    fn test_parse_rejects_question_without_data() {
        // テスト項目: 必須ペイロードが欠けたフレームは InvalidPayload になる
        // given (前提条件):
        let raw = r#"{"type": "question"}"#;

        // when (操作):
        let result = InboundFrame::from_json(raw);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(FrameError::InvalidPayload { frame_type, .. }) if frame_type == "question"
        ));
    }

    #[test]
    fn test_poll_without_duration_uses_session_default() {
        // テスト項目: duration のない投票はセッション設定と同じ既定の長さになる
        // given (前提条件):
        let raw = r#"{"type": "poll_created", "data": {"id": "poll-1", "text": "Ready?"}}"#;

        // when (操作):
        let frame = InboundFrame::from_json(raw).unwrap();

        // then (期待する結果):
        let InboundFrame::PollCreated(poll) = frame else {
            panic!("expected poll_created frame");
        };
        assert_eq!(
            poll.data.duration,
            crate::config::SyncConfig::default().default_poll_duration_secs
        );
        assert!(poll.data.active);
    }
}
