//! Session configuration.

use crate::domain::{AlertKind, AlertSeverity, ReactionKind};
use crate::sync::alert::AlertRule;

/// Default room channel base address
pub const DEFAULT_BASE_URL: &str = "ws://127.0.0.1:8000/ws";

/// Poll duration used when neither the caller nor the server gives one, in seconds
pub const DEFAULT_POLL_DURATION_SECS: u64 = 30;

/// Every tunable of a synchronization session, in milliseconds unless noted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay between a disconnect and the next connection attempt
    pub reconnect_delay_ms: u64,
    /// Interval of the `get_stats` heartbeat while open
    pub heartbeat_interval_ms: u64,
    pub alert_ttl_ms: u64,
    pub alert_cap: usize,
    pub alert_rules: Vec<AlertRule>,
    /// Particles spawned per reaction
    pub particle_count: usize,
    pub particle_lifetime_ms: u64,
    pub wave_lifetime_ms: u64,
    pub pulse_duration_ms: u64,
    /// A participant record is retired after this long without activity
    pub participant_idle_ms: u64,
    /// A closed poll stays visible this long
    pub poll_grace_ms: u64,
    /// Reaction events retained for aggregation
    pub reaction_log_capacity: usize,
    pub timeline_bucket_ms: u64,
    pub timeline_bucket_count: usize,
    pub velocity_window_ms: u64,
    /// Poll duration used when the caller gives none, in seconds
    pub default_poll_duration_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3_000,
            heartbeat_interval_ms: 5_000,
            alert_ttl_ms: 5_000,
            alert_cap: 5,
            alert_rules: default_alert_rules(),
            particle_count: 8,
            particle_lifetime_ms: 1_200,
            wave_lifetime_ms: 600,
            pulse_duration_ms: 1_500,
            participant_idle_ms: 60_000,
            poll_grace_ms: 5_000,
            reaction_log_capacity: 50,
            timeline_bucket_ms: 5 * 60 * 1_000,
            timeline_bucket_count: 12,
            velocity_window_ms: 60_000,
            default_poll_duration_secs: DEFAULT_POLL_DURATION_SECS,
        }
    }
}

/// Default presenter alert heuristics
pub fn default_alert_rules() -> Vec<AlertRule> {
    vec![
        AlertRule {
            kind: AlertKind::Confusion,
            reaction: ReactionKind::ImLost,
            min_delta: 2,
            min_count: 5,
            severity: AlertSeverity::Warning,
            message: "Audience confusion detected! Consider slowing down.".to_string(),
        },
        AlertRule {
            kind: AlertKind::CodeDemand,
            reaction: ReactionKind::ShowCode,
            min_delta: 3,
            min_count: 10,
            severity: AlertSeverity::Info,
            message: "Strong demand for code examples! Time to show some code?".to_string(),
        },
        AlertRule {
            kind: AlertKind::Momentum,
            reaction: ReactionKind::SpeedUp,
            min_delta: 3,
            min_count: 0,
            severity: AlertSeverity::Success,
            message: "Great engagement! Keep up the pace!".to_string(),
        },
        AlertRule {
            kind: AlertKind::Pace,
            reaction: ReactionKind::SlowDown,
            min_delta: 3,
            min_count: 8,
            severity: AlertSeverity::Warning,
            message: "Multiple requests to slow down. Adjust your pace.".to_string(),
        },
    ]
}
