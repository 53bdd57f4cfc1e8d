//! Conversion logic between DTOs and domain entities.

use hibiki_shared::time::parse_timestamp;

use crate::domain::{
    ParticipantId, Poll, PollId, Question, QuestionId, ReactionEvent, ReactionKind,
    ReactionTally, Timestamp, ValueObjectError, VoteChoice,
};
use crate::infrastructure::dto::websocket as dto;

fn participant_or_anonymous(user_id: Option<String>) -> ParticipantId {
    user_id
        .and_then(|id| ParticipantId::new(id).ok())
        .unwrap_or_else(ParticipantId::anonymous)
}

impl dto::WireTimestamp {
    /// Resolve to epoch milliseconds, or `fallback` when the text is unparseable.
    pub fn resolve(&self, fallback: Timestamp) -> Timestamp {
        match self {
            dto::WireTimestamp::Millis(millis) => Timestamp::new(*millis),
            dto::WireTimestamp::Text(text) => parse_timestamp(text)
                .map(Timestamp::new)
                .unwrap_or(fallback),
        }
    }
}

fn resolve_timestamp(timestamp: Option<&dto::WireTimestamp>, fallback: Timestamp) -> Timestamp {
    timestamp
        .map(|t| t.resolve(fallback))
        .unwrap_or(fallback)
}

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::TallyDto> for ReactionTally {
    fn from(dto: dto::TallyDto) -> Self {
        ReactionTally::from_counts(&[
            (ReactionKind::SpeedUp, dto.speed_up),
            (ReactionKind::SlowDown, dto.slow_down),
            (ReactionKind::ShowCode, dto.show_code),
            (ReactionKind::ImLost, dto.im_lost),
        ])
    }
}

/// Convert a reaction event; `received_at` stands in for a missing timestamp.
pub fn reaction_event_from_dto(
    dto: dto::ReactionEventDto,
    received_at: Timestamp,
) -> Result<ReactionEvent, ValueObjectError> {
    let kind: ReactionKind = dto.kind.parse()?;
    Ok(ReactionEvent {
        kind,
        participant: participant_or_anonymous(dto.user_id),
        at: resolve_timestamp(dto.timestamp.as_ref(), received_at),
    })
}

/// Convert a question record. `upvoted_by_me` is derived from `upvoted_by`.
pub fn question_from_dto(
    dto: dto::QuestionDto,
    me: &ParticipantId,
    received_at: Timestamp,
) -> Result<Question, ValueObjectError> {
    let upvoted_by_me = dto.upvoted_by.iter().any(|id| id == me.as_str());
    Ok(Question {
        id: QuestionId::new(dto.id)?,
        text: dto.text,
        created_at: resolve_timestamp(dto.timestamp.as_ref(), received_at),
        upvotes: dto.upvotes,
        author: participant_or_anonymous(dto.user_id),
        upvoted_by_me,
        pending: false,
    })
}

/// Convert an upvote payload that carries the full question record.
///
/// Returns `Ok(None)` when the payload only holds `id` and `upvotes`.
pub fn question_from_upvote_dto(
    dto: dto::QuestionUpvoteDto,
    me: &ParticipantId,
    received_at: Timestamp,
) -> Result<Option<Question>, ValueObjectError> {
    let Some(text) = dto.text else {
        return Ok(None);
    };
    question_from_dto(
        dto::QuestionDto {
            id: dto.id,
            text,
            timestamp: dto.timestamp,
            upvotes: dto.upvotes,
            user_id: dto.user_id,
            upvoted_by: dto.upvoted_by,
        },
        me,
        received_at,
    )
    .map(Some)
}

impl TryFrom<dto::PollDto> for Poll {
    type Error = ValueObjectError;

    fn try_from(dto: dto::PollDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PollId::new(dto.id)?,
            text: dto.text,
            duration_secs: dto.duration,
            yes_votes: dto.yes_votes,
            no_votes: dto.no_votes,
            active: dto.active,
        })
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<ReactionTally> for dto::TallyDto {
    fn from(tally: ReactionTally) -> Self {
        Self {
            speed_up: tally.get(ReactionKind::SpeedUp),
            slow_down: tally.get(ReactionKind::SlowDown),
            show_code: tally.get(ReactionKind::ShowCode),
            im_lost: tally.get(ReactionKind::ImLost),
        }
    }
}

impl dto::OutboundFrame {
    pub fn reaction(kind: ReactionKind, me: &ParticipantId) -> Self {
        Self::Reaction {
            reaction: kind.as_str().to_string(),
            user_id: me.as_str().to_string(),
        }
    }

    pub fn question(text: &str, me: &ParticipantId) -> Self {
        Self::Question {
            text: text.to_string(),
            user_id: me.as_str().to_string(),
        }
    }

    pub fn upvote_question(question_id: &QuestionId, me: &ParticipantId) -> Self {
        Self::UpvoteQuestion {
            question_id: question_id.as_str().to_string(),
            user_id: me.as_str().to_string(),
        }
    }

    pub fn create_poll(text: &str, duration_secs: u64) -> Self {
        Self::CreatePoll {
            text: text.to_string(),
            duration: duration_secs,
        }
    }

    pub fn vote_poll(poll_id: &PollId, vote: VoteChoice, me: &ParticipantId) -> Self {
        Self::VotePoll {
            poll_id: poll_id.as_str().to_string(),
            user_id: me.as_str().to_string(),
            vote: vote.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn me() -> ParticipantId {
        ParticipantId::new("user_me".to_string()).unwrap()
    }

    #[test]
    fn test_tally_dto_round_trips_through_domain() {
        // テスト項目: TallyDto とドメインの ReactionTally が相互変換される
        // given (前提条件):
        let dto_tally = dto::TallyDto {
            speed_up: 4,
            slow_down: 1,
            show_code: 2,
            im_lost: 0,
        };

        // when (操作):
        let tally: ReactionTally = dto_tally.into();

        // then (期待する結果):
        assert_eq!(tally.get(ReactionKind::SpeedUp), 4);
        assert_eq!(tally.get(ReactionKind::SlowDown), 1);
        assert_eq!(dto::TallyDto::from(tally), dto_tally);
    }

    #[test]
    fn test_question_from_dto_derives_upvoted_flag() {
        // テスト項目: upvoted_by に自分が含まれていれば upvoted_by_me が立つ
        // given (前提条件):
        let question = dto::QuestionDto {
            id: "q-1".to_string(),
            text: "What about lifetimes?".to_string(),
            timestamp: Some(dto::WireTimestamp::Millis(1_000)),
            upvotes: 2,
            user_id: Some("user_other".to_string()),
            upvoted_by: vec!["user_x".to_string(), "user_me".to_string()],
        };

        // when (操作):
        let question = question_from_dto(question, &me(), Timestamp::new(9_999)).unwrap();

        // then (期待する結果):
        assert!(question.upvoted_by_me);
        assert!(!question.pending);
        assert_eq!(question.created_at, Timestamp::new(1_000));
        assert_eq!(question.author.as_str(), "user_other");
    }

    #[test]
    fn test_question_without_author_is_anonymous() {
        // テスト項目: user_id のない質問は anonymous として扱われる
        // given (前提条件):
        let question = dto::QuestionDto {
            id: "q-2".to_string(),
            text: "Slides?".to_string(),
            timestamp: None,
            upvotes: 0,
            user_id: None,
            upvoted_by: vec![],
        };

        // when (操作):
        let question = question_from_dto(question, &me(), Timestamp::new(42)).unwrap();

        // then (期待する結果):
        assert_eq!(question.author.as_str(), "anonymous");
        assert_eq!(question.created_at, Timestamp::new(42));
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_receive_time() {
        // テスト項目: 解析できないタイムスタンプは受信時刻で代替される
        // given (前提条件):
        let event = dto::ReactionEventDto {
            kind: "show_code".to_string(),
            user_id: Some("user_a".to_string()),
            timestamp: Some(dto::WireTimestamp::Text("soon".to_string())),
        };

        // when (操作):
        let event = reaction_event_from_dto(event, Timestamp::new(5_000)).unwrap();

        // then (期待する結果):
        assert_eq!(event.kind, ReactionKind::ShowCode);
        assert_eq!(event.at, Timestamp::new(5_000));
    }

    #[test]
    fn test_unknown_reaction_kind_is_rejected() {
        // テスト項目: 未知のリアクション種別は変換エラーになる
        // given (前提条件):
        let event = dto::ReactionEventDto {
            kind: "applause".to_string(),
            user_id: None,
            timestamp: None,
        };

        // when (操作):
        let result = reaction_event_from_dto(event, Timestamp::new(0));

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::UnknownReactionKind("applause".to_string()))
        );
    }

    #[test]
    fn test_bare_upvote_payload_has_no_question() {
        // テスト項目: id と upvotes のみの upvote ペイロードからは質問を作らない
        // given (前提条件):
        let upvote = dto::QuestionUpvoteDto {
            id: "q-3".to_string(),
            upvotes: 5,
            text: None,
            timestamp: None,
            user_id: None,
            upvoted_by: vec![],
        };

        // when (操作):
        let result = question_from_upvote_dto(upvote, &me(), Timestamp::new(0)).unwrap();

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_outbound_reaction_uses_wire_ids() {
        // テスト項目: ドメインから生成した reaction フレームはワイヤ ID を使う
        // given (前提条件):
        let kind = ReactionKind::ImLost;

        // when (操作):
        let frame = dto::OutboundFrame::reaction(kind, &me());

        // then (期待する結果):
        assert_eq!(
            frame,
            dto::OutboundFrame::Reaction {
                reaction: "im_lost".to_string(),
                user_id: "user_me".to_string(),
            }
        );
    }
}
