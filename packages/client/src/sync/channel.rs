//! Connection lifecycle of one session.
//!
//! `ChannelManager` is a pure state machine: it decides which state the
//! connection is in, when to heartbeat and when to reconnect, and leaves the
//! actual socket work to the session that owns it.

use std::fmt;

use super::{Timer, scheduler::{Scheduler, TimerId}};
use crate::config::SyncConfig;
use crate::domain::Timestamp;
use crate::infrastructure::{dto::websocket::OutboundFrame, transport::TransportEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
    /// Terminal; reached only by an explicit leave
    Left,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
            ConnectionState::Left => "left",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Close frame from the server
    ClosedByPeer(Option<String>),
    /// The stream ended without a close frame
    StreamEnded,
    TransportError(String),
    ConnectFailed(String),
}

impl DisconnectCause {
    /// State the connection moves to
    pub fn resulting_state(&self) -> ConnectionState {
        match self {
            DisconnectCause::ClosedByPeer(_) | DisconnectCause::StreamEnded => {
                ConnectionState::Closed
            }
            DisconnectCause::TransportError(_) | DisconnectCause::ConnectFailed(_) => {
                ConnectionState::Errored
            }
        }
    }
}

impl fmt::Display for DisconnectCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectCause::ClosedByPeer(Some(reason)) => write!(f, "closed by server ({reason})"),
            DisconnectCause::ClosedByPeer(None) => f.write_str("closed by server"),
            DisconnectCause::StreamEnded => f.write_str("stream ended"),
            DisconnectCause::TransportError(e) => write!(f, "transport error: {e}"),
            DisconnectCause::ConnectFailed(e) => write!(f, "connect failed: {e}"),
        }
    }
}

/// Classify what the transport reported.
///
/// `None` means the inbound side went away; a text frame is not a disconnect.
pub fn classify_disconnect(event: Option<&TransportEvent>) -> Option<DisconnectCause> {
    match event {
        None => Some(DisconnectCause::StreamEnded),
        Some(TransportEvent::Closed(reason)) => Some(DisconnectCause::ClosedByPeer(reason.clone())),
        Some(TransportEvent::Error(e)) => Some(DisconnectCause::TransportError(e.clone())),
        Some(TransportEvent::Frame(_)) => None,
    }
}

#[derive(Debug)]
pub struct ChannelManager {
    url: String,
    state: ConnectionState,
    /// Attempts since the last successful open
    attempts: u32,
    reconnect_timer: Option<TimerId>,
    heartbeat_timer: Option<TimerId>,
    last_heartbeat_at: Option<Timestamp>,
    reconnect_delay_ms: u64,
    heartbeat_interval_ms: u64,
}

impl ChannelManager {
    pub fn new(url: String, config: &SyncConfig) -> Self {
        Self {
            url,
            state: ConnectionState::Idle,
            attempts: 0,
            reconnect_timer: None,
            heartbeat_timer: None,
            last_heartbeat_at: None,
            reconnect_delay_ms: config.reconnect_delay_ms,
            heartbeat_interval_ms: config.heartbeat_interval_ms,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_heartbeat_at(&self) -> Option<Timestamp> {
        self.last_heartbeat_at
    }

    /// Start a connection attempt.
    ///
    /// Returns `false` (and does nothing) while connecting, open or left.
    pub fn open(&mut self, timers: &mut Scheduler<Timer>) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Left => false,
            ConnectionState::Idle | ConnectionState::Closed | ConnectionState::Errored => {
                if let Some(timer) = self.reconnect_timer.take() {
                    timers.cancel(timer);
                }
                self.state = ConnectionState::Connecting;
                self.attempts += 1;
                tracing::info!("Connecting to {} (attempt {})", self.url, self.attempts);
                true
            }
        }
    }

    /// The connection is up: request a snapshot and start the heartbeat.
    pub fn on_open(&mut self, now: Timestamp, timers: &mut Scheduler<Timer>) -> OutboundFrame {
        self.state = ConnectionState::Open;
        self.attempts = 0;
        self.last_heartbeat_at = Some(now);
        self.schedule_heartbeat(now, timers);
        tracing::info!("Connected to {}", self.url);
        OutboundFrame::GetStats
    }

    pub fn on_heartbeat_due(
        &mut self,
        now: Timestamp,
        timers: &mut Scheduler<Timer>,
    ) -> Option<OutboundFrame> {
        self.heartbeat_timer = None;
        if !self.is_open() {
            return None;
        }
        self.last_heartbeat_at = Some(now);
        self.schedule_heartbeat(now, timers);
        Some(OutboundFrame::GetStats)
    }

    /// Record a disconnect and schedule the reconnect.
    ///
    /// Returns `true` if a reconnect was scheduled; at most one is pending.
    pub fn on_closed(
        &mut self,
        cause: DisconnectCause,
        now: Timestamp,
        timers: &mut Scheduler<Timer>,
    ) -> bool {
        if self.state == ConnectionState::Left {
            return false;
        }
        self.state = cause.resulting_state();
        if let Some(timer) = self.heartbeat_timer.take() {
            timers.cancel(timer);
        }
        tracing::warn!(
            "Connection to {} {} (attempt {}), state: {}",
            self.url,
            cause,
            self.attempts,
            self.state
        );

        if self.reconnect_timer.is_some_and(|timer| timers.is_pending(timer)) {
            return false;
        }
        let at = now.add_millis(self.reconnect_delay_ms);
        self.reconnect_timer = Some(timers.schedule(at, Timer::Reconnect));
        tracing::info!("Reconnecting in {} ms", self.reconnect_delay_ms);
        true
    }

    pub fn on_reconnect_due(&mut self, timers: &mut Scheduler<Timer>) -> bool {
        self.reconnect_timer = None;
        self.open(timers)
    }

    /// Explicit leave; nothing transitions out of `Left`.
    pub fn leave(&mut self, timers: &mut Scheduler<Timer>) {
        for timer in [self.reconnect_timer.take(), self.heartbeat_timer.take()]
            .into_iter()
            .flatten()
        {
            timers.cancel(timer);
        }
        self.state = ConnectionState::Left;
        tracing::info!("Left {}", self.url);
    }

    fn schedule_heartbeat(&mut self, now: Timestamp, timers: &mut Scheduler<Timer>) {
        if let Some(timer) = self.heartbeat_timer.take() {
            timers.cancel(timer);
        }
        let at = now.add_millis(self.heartbeat_interval_ms);
        self.heartbeat_timer = Some(timers.schedule(at, Timer::Heartbeat));
    }
}
