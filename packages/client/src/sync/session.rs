//! Session actor.
//!
//! One tokio task owns the channel manager, the room state and the timer
//! queue of a session and processes commands, inbound frames and timers one
//! at a time. Callers hold a cloneable [`SessionHandle`].

use std::{sync::Arc, time::Duration};

use futures_util::future::BoxFuture;
use hibiki_shared::time::{Clock, get_timestamp};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::Instant,
};

use super::{
    Timer,
    channel::{ChannelManager, DisconnectCause, classify_disconnect},
    dispatcher::dispatch,
    reconciler::{Action, Reconciler, RoomState},
    scheduler::Scheduler,
    snapshot::RoomSnapshot,
};
use crate::config::SyncConfig;
use crate::domain::{ParticipantId, QuestionId, ReactionKind, RoomCode, Timestamp, VoteChoice};
use crate::error::{ActionError, TransportError};
use crate::infrastructure::{
    dto::websocket::OutboundFrame,
    transport::{Connection, Connector, TransportEvent},
};

const COMMAND_BUFFER: usize = 32;

/// Stand-in for deadlines too far away for `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Wall clock anchored to tokio's clock, so paused test time drives it too
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    origin_millis: i64,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(get_timestamp())
    }

    pub fn starting_at(origin_millis: i64) -> Self {
        Self {
            origin: Instant::now(),
            origin_millis,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.now_millis())
    }

    /// tokio instant at which `at` is reached
    pub fn instant_at(&self, at: Timestamp) -> Instant {
        let offset = at.value().saturating_sub(self.origin_millis).max(0) as u64;
        self.origin
            .checked_add(Duration::from_millis(offset))
            .unwrap_or_else(|| self.origin + FAR_FUTURE)
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> i64 {
        self.origin_millis + self.origin.elapsed().as_millis() as i64
    }
}

enum Command {
    Act {
        action: Action,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    RequestStats {
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}

type ConnectFuture = BoxFuture<'static, Result<Connection, TransportError>>;

pub struct Session<C: Connector> {
    connector: Arc<C>,
    room_code: RoomCode,
    me: ParticipantId,
    config: SyncConfig,
    clock: TokioClock,
    channel: ChannelManager,
    state: RoomState,
    timers: Scheduler<Timer>,
    pending_connect: Option<ConnectFuture>,
    connection: Option<Connection>,
    commands: mpsc::Receiver<Command>,
    snapshot: watch::Sender<RoomSnapshot>,
}

impl<C: Connector> Session<C> {
    /// Spawn a session for `room_code` under `base_url` and start connecting.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        connector: C,
        base_url: &str,
        room_code: RoomCode,
        me: ParticipantId,
        config: SyncConfig,
    ) -> SessionHandle {
        let clock = TokioClock::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(RoomSnapshot::empty(
            room_code.clone(),
            me.clone(),
            &config,
            clock.now(),
        ));

        let session = Self {
            connector: Arc::new(connector),
            channel: ChannelManager::new(room_code.channel_url(base_url), &config),
            room_code,
            me: me.clone(),
            config,
            clock,
            state: RoomState::new(),
            timers: Scheduler::new(),
            pending_connect: None,
            connection: None,
            commands: command_rx,
            snapshot: snapshot_tx,
        };
        tokio::spawn(session.run());

        SessionHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
            me,
        }
    }

    async fn run(mut self) {
        self.open();
        self.publish();

        loop {
            let wake_at = self
                .timers
                .next_deadline()
                .map(|deadline| self.clock.instant_at(deadline));

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Act { action, reply }) => {
                        let _ = reply.send(self.handle_action(action));
                    }
                    Some(Command::RequestStats { reply }) => {
                        let _ = reply.send(
                            self.send(&OutboundFrame::GetStats)
                                .map_err(|_| ActionError::NotConnected),
                        );
                    }
                    Some(Command::Leave { reply }) => {
                        self.teardown();
                        self.publish();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        tracing::debug!("Every session handle dropped");
                        self.teardown();
                        break;
                    }
                },
                result = next_connect(&mut self.pending_connect), if self.pending_connect.is_some() => {
                    self.pending_connect = None;
                    self.handle_connect(result);
                }
                event = next_event(&mut self.connection), if self.connection.is_some() => {
                    self.handle_event(event);
                }
                _ = sleep_until(wake_at), if wake_at.is_some() => {
                    self.fire_timers();
                }
            }

            self.publish();
        }

        tracing::info!("Session for room {} stopped", self.room_code);
    }

    fn open(&mut self) {
        if self.channel.open(&mut self.timers) {
            self.start_connect();
        }
    }

    /// Start the connect future for an attempt the channel has already begun.
    fn start_connect(&mut self) {
        let connector = Arc::clone(&self.connector);
        let url = self.channel.url().to_string();
        let future: ConnectFuture = Box::pin(async move { connector.connect(&url).await });
        self.pending_connect = Some(future);
    }

    fn handle_connect(&mut self, result: Result<Connection, TransportError>) {
        let now = self.clock.now();
        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                let frame = self.channel.on_open(now, &mut self.timers);
                if let Err(e) = self.send(&frame) {
                    tracing::warn!("Failed to request snapshot: {}", e);
                }
            }
            Err(e) => {
                self.channel
                    .on_closed(DisconnectCause::ConnectFailed(e.to_string()), now, &mut self.timers);
            }
        }
    }

    fn handle_event(&mut self, event: Option<TransportEvent>) {
        let now = self.clock.now();
        if let Some(TransportEvent::Frame(raw)) = &event {
            let mut reconciler = Reconciler {
                state: &mut self.state,
                timers: &mut self.timers,
                config: &self.config,
                me: &self.me,
                now,
            };
            let _ = dispatch(raw, &mut reconciler);
            return;
        }

        if let Some(cause) = classify_disconnect(event.as_ref()) {
            self.connection = None;
            self.channel.on_closed(cause, now, &mut self.timers);
        }
    }

    fn fire_timers(&mut self) {
        let now = self.clock.now();
        for timer in self.timers.pop_due(now) {
            match timer {
                Timer::Reconnect => {
                    if self.channel.on_reconnect_due(&mut self.timers) {
                        self.start_connect();
                    }
                }
                Timer::Heartbeat => {
                    if let Some(frame) = self.channel.on_heartbeat_due(now, &mut self.timers)
                        && let Err(e) = self.send(&frame)
                    {
                        tracing::warn!("Heartbeat not sent: {}", e);
                    }
                }
                other => self.state.on_timer(&other),
            }
        }
    }

    fn handle_action(&mut self, action: Action) -> Result<(), ActionError> {
        let frame = self.state.prepare(&action, &self.me, &self.config)?;
        if let Err(e) = self.send(&frame) {
            tracing::debug!("'{}' not sent: {}", frame.type_name(), e);
            return Err(ActionError::NotConnected);
        }
        let now = self.clock.now();
        self.state
            .commit(&action, &self.me, now, &self.config, &mut self.timers);
        Ok(())
    }

    fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let connection = match &self.connection {
            Some(connection) if self.channel.is_open() => connection,
            _ => return Err(TransportError::Closed),
        };
        let text = frame
            .to_json()
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        connection.send(text)?;
        tracing::debug!("Sent '{}' frame", frame.type_name());
        Ok(())
    }

    fn teardown(&mut self) {
        self.channel.leave(&mut self.timers);
        self.timers.clear();
        self.pending_connect = None;
        self.connection = None;
    }

    fn publish(&self) {
        self.snapshot.send_replace(RoomSnapshot::from_session(
            &self.room_code,
            &self.me,
            &self.channel,
            &self.state,
            &self.config,
            self.clock.now(),
        ));
    }
}

async fn next_connect(pending: &mut Option<ConnectFuture>) -> Result<Connection, TransportError> {
    match pending {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_event(connection: &mut Option<Connection>) -> Option<TransportEvent> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Cloneable front of a running [`Session`]
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<RoomSnapshot>,
    me: ParticipantId,
}

impl SessionHandle {
    pub fn me(&self) -> &ParticipantId {
        &self.me
    }

    /// Latest published state
    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RoomSnapshot> {
        self.snapshot.clone()
    }

    pub async fn act(&self, action: Action) -> Result<(), ActionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Act { action, reply })
            .await
            .map_err(|_| ActionError::SessionClosed)?;
        response.await.map_err(|_| ActionError::SessionClosed)?
    }

    pub async fn react(&self, kind: ReactionKind) -> Result<(), ActionError> {
        self.act(Action::React(kind)).await
    }

    pub async fn ask(&self, text: impl Into<String>) -> Result<(), ActionError> {
        self.act(Action::Ask(text.into())).await
    }

    pub async fn upvote(&self, question_id: QuestionId) -> Result<(), ActionError> {
        self.act(Action::Upvote(question_id)).await
    }

    pub async fn vote(&self, choice: VoteChoice) -> Result<(), ActionError> {
        self.act(Action::Vote(choice)).await
    }

    pub async fn create_poll(
        &self,
        text: impl Into<String>,
        duration_secs: Option<u64>,
    ) -> Result<(), ActionError> {
        self.act(Action::CreatePoll {
            text: text.into(),
            duration_secs,
        })
        .await
    }

    /// Ask the server for a fresh snapshot outside the heartbeat.
    pub async fn request_stats(&self) -> Result<(), ActionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::RequestStats { reply })
            .await
            .map_err(|_| ActionError::SessionClosed)?;
        response.await.map_err(|_| ActionError::SessionClosed)?
    }

    /// Leave the room. Every pending timer and the connection are dropped.
    pub async fn leave(&self) {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Leave { reply }).await.is_ok() {
            let _ = response.await;
        }
    }
}
