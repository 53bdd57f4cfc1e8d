//! Entities held in a client's room state.

use std::fmt;

use super::value_object::{ParticipantId, PollId, QuestionId, ReactionKind, Timestamp};

/// Per-kind reaction counts for the current room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReactionTally {
    counts: [u64; 4],
}

impl ReactionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tally from `(kind, count)` pairs; kinds not listed are zero.
    pub fn from_counts(counts: &[(ReactionKind, u64)]) -> Self {
        let mut tally = Self::default();
        for (kind, count) in counts {
            tally.counts[kind.index()] = *count;
        }
        tally
    }

    pub fn get(&self, kind: ReactionKind) -> u64 {
        self.counts[kind.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReactionKind, u64)> + '_ {
        ReactionKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Local preview of the client's own reaction, applied at send time.
    pub fn apply_optimistic(&mut self, kind: ReactionKind) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(1);
    }

    /// Server-confirmed counts replace whatever is held, optimistic previews included.
    pub fn apply_authoritative(&mut self, authoritative: ReactionTally) {
        *self = authoritative;
    }

    /// Signed change of one kind relative to `previous`
    pub fn delta(&self, previous: &ReactionTally, kind: ReactionKind) -> i64 {
        self.get(kind) as i64 - previous.get(kind) as i64
    }
}

/// A single reaction as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReactionEvent {
    pub kind: ReactionKind,
    pub participant: ParticipantId,
    pub at: Timestamp,
}

/// An audience question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub created_at: Timestamp,
    pub upvotes: u64,
    pub author: ParticipantId,
    /// Derived locally; the server never sends it for the current client
    pub upvoted_by_me: bool,
    /// Inserted locally, waiting for the server echo
    pub pending: bool,
}

impl Question {
    /// Local placeholder created right after the client's own `question` send.
    pub fn pending(text: String, author: ParticipantId, created_at: Timestamp) -> Self {
        Self {
            id: QuestionId::local(),
            text,
            created_at,
            upvotes: 0,
            author,
            upvoted_by_me: false,
            pending: true,
        }
    }

    /// Optimistic `count+1` shown until the upvote broadcast arrives.
    pub fn preview_upvote(&mut self) {
        self.upvotes = self.upvotes.saturating_add(1);
        self.upvoted_by_me = true;
    }

    /// Authoritative upvote count from the server
    pub fn confirm_upvotes(&mut self, upvotes: u64) {
        self.upvotes = upvotes;
    }
}

/// A yes/no poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub id: PollId,
    pub text: String,
    pub duration_secs: u64,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub active: bool,
}

impl Poll {
    pub fn total_votes(&self) -> u64 {
        self.yes_votes + self.no_votes
    }

    /// Share of `yes` ballots in percent, `None` before any vote
    pub fn yes_percent(&self) -> Option<u64> {
        let total = self.total_votes();
        if total == 0 {
            None
        } else {
            Some(self.yes_votes * 100 / total)
        }
    }
}

/// Alert identity, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    Info,
    Success,
    Warning,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Success => "success",
            AlertSeverity::Warning => "warning",
        }
    }
}

/// Which heuristic produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Confusion,
    CodeDemand,
    Momentum,
    Pace,
}

/// Transient advisory shown to the presenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_then_authoritative_replaces() {
        // テスト項目: 楽観的加算の後に権威値を適用すると、権威値に置き換わる（加算されない）
        // given (前提条件):
        let mut tally = ReactionTally::from_counts(&[(ReactionKind::SpeedUp, 3)]);
        tally.apply_optimistic(ReactionKind::SpeedUp);
        assert_eq!(tally.get(ReactionKind::SpeedUp), 4);

        // when (操作):
        tally.apply_authoritative(ReactionTally::from_counts(&[(ReactionKind::SpeedUp, 4)]));

        // then (期待する結果):
        assert_eq!(tally.get(ReactionKind::SpeedUp), 4);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_authoritative_can_lower_counts() {
        // テスト項目: サーバーの値が楽観値より小さい場合も、サーバーの値が優先される
        // given (前提条件):
        let mut tally = ReactionTally::from_counts(&[(ReactionKind::ImLost, 7)]);

        // when (操作):
        tally.apply_authoritative(ReactionTally::from_counts(&[(ReactionKind::ImLost, 2)]));

        // then (期待する結果):
        assert_eq!(tally.get(ReactionKind::ImLost), 2);
    }

    #[test]
    fn test_delta_is_signed() {
        // テスト項目: delta は前回値との差分を符号付きで返す
        // given (前提条件):
        let previous = ReactionTally::from_counts(&[(ReactionKind::ShowCode, 5)]);
        let current = ReactionTally::from_counts(&[(ReactionKind::ShowCode, 2)]);

        // when (操作):
        let delta = current.delta(&previous, ReactionKind::ShowCode);

        // then (期待する結果):
        assert_eq!(delta, -3);
    }

    #[test]
    fn test_poll_yes_percent() {
        // テスト項目: 投票がない場合は None、ある場合は yes の割合を返す
        // given (前提条件):
        let mut poll = Poll {
            id: PollId::new("poll-1".to_string()).unwrap(),
            text: "Ready?".to_string(),
            duration_secs: 30,
            yes_votes: 0,
            no_votes: 0,
            active: true,
        };
        assert_eq!(poll.yes_percent(), None);

        // when (操作):
        poll.yes_votes = 3;
        poll.no_votes = 1;

        // then (期待する結果):
        assert_eq!(poll.yes_percent(), Some(75));
    }
}
