//! Value objects of the feedback domain.

use std::{fmt, str::FromStr};

use uuid::Uuid;

use super::error::ValueObjectError;

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Timestamp `millis` milliseconds later
    pub fn add_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(i64::try_from(millis).unwrap_or(i64::MAX)))
    }
}

/// Ephemeral per-session participant identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Length of the random suffix after `user_`
    const SUFFIX_LEN: usize = 9;

    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.trim().is_empty() {
            return Err(ValueObjectError::EmptyParticipantId);
        }
        Ok(Self(id))
    }

    /// Generate a fresh identity such as `user_3f9a0c1de`
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(format!("user_{}", &simple[..Self::SUFFIX_LEN]))
    }

    /// Author the server records when a frame carries no `user_id`
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Two uppercase characters used by participant-activity records.
    ///
    /// Generated ids skip the `user_` prefix so they do not all read "US".
    pub fn initials(&self) -> String {
        let source = self.0.strip_prefix("user_").unwrap_or(&self.0);
        let initials: String = source
            .chars()
            .filter(|c| c.is_alphanumeric())
            .take(2)
            .collect::<String>()
            .to_uppercase();
        if initials.is_empty() {
            "??".to_string()
        } else {
            initials
        }
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room code addressing one presenter session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalizes to uppercase, the form the channel server uses.
    pub fn new(code: String) -> Result<Self, ValueObjectError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValueObjectError::EmptyRoomCode);
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ValueObjectError::InvalidRoomCode(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Room-scoped channel address under `base_url`
    pub fn channel_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Question identity, either server-assigned or a local placeholder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionId(String);

impl QuestionId {
    const LOCAL_PREFIX: &'static str = "local-";

    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    /// Placeholder id for a question that has not been echoed by the server yet
    pub fn local() -> Self {
        Self(format!("{}{}", Self::LOCAL_PREFIX, Uuid::new_v4().simple()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(Self::LOCAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Poll identity (server-assigned)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollId(String);

impl PollId {
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of audience reaction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReactionKind {
    SpeedUp,
    SlowDown,
    ShowCode,
    ImLost,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::SpeedUp,
        ReactionKind::SlowDown,
        ReactionKind::ShowCode,
        ReactionKind::ImLost,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::SpeedUp => "speed_up",
            ReactionKind::SlowDown => "slow_down",
            ReactionKind::ShowCode => "show_code",
            ReactionKind::ImLost => "im_lost",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReactionKind::SpeedUp => "Speed Up",
            ReactionKind::SlowDown => "Slow Down",
            ReactionKind::ShowCode => "Show Code",
            ReactionKind::ImLost => "I'm Lost",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ReactionKind::SpeedUp => 0,
            ReactionKind::SlowDown => 1,
            ReactionKind::ShowCode => 2,
            ReactionKind::ImLost => 3,
        }
    }
}

impl FromStr for ReactionKind {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValueObjectError::UnknownReactionKind(s.to_string()))
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poll ballot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteChoice {
    Yes,
    No,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Yes => "yes",
            VoteChoice::No => "no",
        }
    }
}

impl FromStr for VoteChoice {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(VoteChoice::Yes),
            "no" | "n" => Ok(VoteChoice::No),
            other => Err(ValueObjectError::UnknownVote(other.to_string())),
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
