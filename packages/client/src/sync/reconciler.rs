//! Canonical room state and its reconciliation with server broadcasts.
//!
//! Local actions are applied in two phases: [`RoomState::prepare`] validates
//! and builds the outbound frame, [`RoomState::commit`] applies the optimistic
//! preview once the frame has been handed to the transport. Authoritative
//! frames arrive through [`Reconciler`], the [`FrameHandler`] of a session.

use std::collections::{HashSet, VecDeque};

use super::{
    Timer,
    alert::{AlertBoard, evaluate},
    dispatcher::FrameHandler,
    effects::EffectsScheduler,
    scheduler::{Scheduler, TimerId},
};
use crate::config::SyncConfig;
use crate::domain::{
    ParticipantId, Poll, PollId, Question, QuestionId, ReactionEvent, ReactionKind,
    ReactionTally, Timestamp, ValueObjectError, VoteChoice,
};
use crate::error::{ActionError, FrameError};
use crate::infrastructure::dto::{
    conversion::{question_from_dto, question_from_upvote_dto, reaction_event_from_dto},
    websocket::{
        ConnectedFrame, OutboundFrame, PollFrame, QuestionFrame, QuestionUpvoteFrame,
        ReactionEventDto, ReactionFrame, StatsFrame,
    },
};

/// A user action, validated before anything is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    React(ReactionKind),
    Ask(String),
    Upvote(QuestionId),
    Vote(VoteChoice),
    /// `None` uses the configured default duration
    CreatePoll {
        text: String,
        duration_secs: Option<u64>,
    },
}

/// The current poll plus what this client did with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub poll: Poll,
    pub my_vote: Option<VoteChoice>,
    clear_timer: Option<TimerId>,
}

fn domain_error(frame_type: &str) -> impl FnOnce(ValueObjectError) -> FrameError + '_ {
    move |source| FrameError::Domain {
        frame_type: frame_type.to_string(),
        source,
    }
}

/// Process-local state store of one session
#[derive(Debug, Default)]
pub struct RoomState {
    tally: ReactionTally,
    /// Last server-confirmed tally; alert deltas are measured against it
    baseline: ReactionTally,
    /// Newest first
    questions: Vec<Question>,
    upvoted: HashSet<QuestionId>,
    poll: Option<PollState>,
    alerts: AlertBoard,
    effects: EffectsScheduler,
    /// Oldest first, bounded by `reaction_log_capacity`
    reaction_log: VecDeque<ReactionEvent>,
    viewers: Option<u32>,
    total_questions: Option<u32>,
    server_room_code: Option<String>,
}

impl RoomState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&self) -> ReactionTally {
        self.tally
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    pub fn poll(&self) -> Option<&PollState> {
        self.poll.as_ref()
    }

    pub fn alerts(&self) -> &AlertBoard {
        &self.alerts
    }

    pub fn effects(&self) -> &EffectsScheduler {
        &self.effects
    }

    pub fn reaction_log(&self) -> &VecDeque<ReactionEvent> {
        &self.reaction_log
    }

    pub fn viewers(&self) -> Option<u32> {
        self.viewers
    }

    pub fn total_questions(&self) -> Option<u32> {
        self.total_questions
    }

    pub fn server_room_code(&self) -> Option<&str> {
        self.server_room_code.as_deref()
    }

    /// Validate an action and build its frame. Nothing is mutated.
    pub fn prepare(
        &self,
        action: &Action,
        me: &ParticipantId,
        config: &SyncConfig,
    ) -> Result<OutboundFrame, ActionError> {
        match action {
            Action::React(kind) => Ok(OutboundFrame::reaction(*kind, me)),
            Action::Ask(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ActionError::EmptyQuestion);
                }
                Ok(OutboundFrame::question(text, me))
            }
            Action::Upvote(id) => {
                let question = self
                    .question(id)
                    .filter(|q| !q.pending)
                    .ok_or_else(|| ActionError::UnknownQuestion(id.to_string()))?;
                if question.upvoted_by_me || self.upvoted.contains(id) {
                    return Err(ActionError::AlreadyUpvoted(id.to_string()));
                }
                Ok(OutboundFrame::upvote_question(id, me))
            }
            Action::Vote(choice) => {
                let state = self.poll.as_ref().ok_or(ActionError::NoActivePoll)?;
                if !state.poll.active {
                    return Err(ActionError::PollClosed(state.poll.id.to_string()));
                }
                if state.my_vote.is_some() {
                    return Err(ActionError::AlreadyVoted(state.poll.id.to_string()));
                }
                Ok(OutboundFrame::vote_poll(&state.poll.id, *choice, me))
            }
            Action::CreatePoll {
                text,
                duration_secs,
            } => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ActionError::EmptyPollText);
                }
                let duration = duration_secs.unwrap_or(config.default_poll_duration_secs);
                if duration == 0 {
                    return Err(ActionError::InvalidPollDuration);
                }
                Ok(OutboundFrame::create_poll(text, duration))
            }
        }
    }

    /// Apply the optimistic preview of an action that has been sent.
    pub fn commit(
        &mut self,
        action: &Action,
        me: &ParticipantId,
        now: Timestamp,
        config: &SyncConfig,
        timers: &mut Scheduler<Timer>,
    ) {
        match action {
            Action::React(kind) => {
                self.tally.apply_optimistic(*kind);
                self.effects.spawn_particles(*kind, now, config, timers);
                self.effects.touch_participant(me, now, config, timers);
            }
            Action::Ask(text) => {
                self.questions.insert(
                    0,
                    Question::pending(text.trim().to_string(), me.clone(), now),
                );
                self.effects.touch_participant(me, now, config, timers);
            }
            Action::Upvote(id) => {
                if let Some(question) = self.questions.iter_mut().find(|q| &q.id == id) {
                    question.preview_upvote();
                }
                self.upvoted.insert(id.clone());
            }
            Action::Vote(choice) => {
                if let Some(state) = self.poll.as_mut() {
                    state.my_vote = Some(*choice);
                }
                self.effects.touch_participant(me, now, config, timers);
            }
            Action::CreatePoll { .. } => {}
        }
    }

    /// Handle a fired timer owned by the state store.
    pub fn on_timer(&mut self, timer: &Timer) {
        match timer {
            Timer::AlertExpiry(id) => {
                self.alerts.expire(*id);
            }
            Timer::EffectExpiry(id) => {
                self.effects.expire_effect(*id);
            }
            Timer::PulseEnd(participant) => self.effects.end_pulse(participant),
            Timer::ParticipantIdle(participant) => {
                self.effects.retire_participant(participant);
            }
            Timer::PollClear(id) => {
                if self
                    .poll
                    .as_ref()
                    .is_some_and(|state| &state.poll.id == id && !state.poll.active)
                {
                    tracing::debug!("Clearing closed poll {}", id);
                    self.poll = None;
                }
            }
            Timer::Reconnect | Timer::Heartbeat => {}
        }
    }

    fn apply_tally(
        &mut self,
        authoritative: ReactionTally,
        now: Timestamp,
        config: &SyncConfig,
        timers: &mut Scheduler<Timer>,
    ) {
        for draft in evaluate(&config.alert_rules, &self.baseline, &authoritative) {
            self.alerts
                .push(draft, now, config.alert_ttl_ms, config.alert_cap, timers);
        }
        self.baseline = authoritative;
        self.tally.apply_authoritative(authoritative);
    }

    /// Append one event unless it is already logged; returns whether it was new.
    fn log_reaction(&mut self, event: ReactionEvent, capacity: usize) -> bool {
        if self.reaction_log.contains(&event) {
            return false;
        }
        let position = self
            .reaction_log
            .iter()
            .rposition(|logged| logged.at <= event.at)
            .map_or(0, |i| i + 1);
        self.reaction_log.insert(position, event);
        while self.reaction_log.len() > capacity {
            self.reaction_log.pop_front();
        }
        true
    }

    fn set_poll(&mut self, poll: Poll, now: Timestamp, config: &SyncConfig, timers: &mut Scheduler<Timer>) {
        let (my_vote, mut clear_timer) = match self.poll.take() {
            Some(previous) if previous.poll.id == poll.id => (previous.my_vote, previous.clear_timer),
            Some(previous) => {
                if let Some(timer) = previous.clear_timer {
                    timers.cancel(timer);
                }
                (None, None)
            }
            None => (None, None),
        };

        if poll.active {
            if let Some(timer) = clear_timer.take() {
                timers.cancel(timer);
            }
        } else if clear_timer.is_none() {
            clear_timer = Some(timers.schedule(
                now.add_millis(config.poll_grace_ms),
                Timer::PollClear(poll.id.clone()),
            ));
        }

        self.poll = Some(PollState {
            poll,
            my_vote,
            clear_timer,
        });
    }

    fn upsert_question(&mut self, question: Question, me: &ParticipantId) {
        if self.questions.iter().any(|q| q.id == question.id) {
            tracing::debug!("Question {} already known", question.id);
            return;
        }

        let mut question = question;
        if self.upvoted.contains(&question.id) {
            question.upvoted_by_me = true;
        }

        let pending_echo = self.questions.iter().position(|q| {
            q.pending && &q.author == me && question.author == *me && q.text == question.text
        });
        match pending_echo {
            Some(index) => self.questions[index] = question,
            None => self.questions.insert(0, question),
        }
    }
}

/// Applies inbound frames to a [`RoomState`] at one instant
pub struct Reconciler<'a> {
    pub state: &'a mut RoomState,
    pub timers: &'a mut Scheduler<Timer>,
    pub config: &'a SyncConfig,
    pub me: &'a ParticipantId,
    pub now: Timestamp,
}

impl Reconciler<'_> {
    fn convert_reactions(&self, events: Vec<ReactionEventDto>) -> Vec<ReactionEvent> {
        events
            .into_iter()
            .filter_map(|dto| match reaction_event_from_dto(dto, self.now) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping reaction event: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl FrameHandler for Reconciler<'_> {
    fn on_connected(&mut self, frame: ConnectedFrame) -> Result<(), FrameError> {
        tracing::info!(
            "Room channel confirmed: {}",
            frame.message.as_deref().unwrap_or("connected")
        );
        if frame.room_code.is_some() {
            self.state.server_room_code = frame.room_code;
        }
        Ok(())
    }

    fn on_stats(&mut self, frame: StatsFrame) -> Result<(), FrameError> {
        self.state
            .apply_tally(frame.counts.into(), self.now, self.config, self.timers);

        let mut questions = Vec::with_capacity(frame.recent_questions.len());
        for dto in frame.recent_questions.into_iter().rev() {
            match question_from_dto(dto, self.me, self.now) {
                Ok(mut question) => {
                    question.upvoted_by_me |= self.state.upvoted.contains(&question.id);
                    questions.push(question);
                }
                Err(e) => tracing::warn!("Skipping question in snapshot: {}", e),
            }
        }
        self.state.questions = questions;

        match frame.active_poll.map(Poll::try_from) {
            Some(Ok(poll)) => self.state.set_poll(poll, self.now, self.config, self.timers),
            Some(Err(e)) => tracing::warn!("Skipping poll in snapshot: {}", e),
            None => {
                if self.state.poll.as_ref().is_some_and(|state| state.poll.active) {
                    tracing::debug!("Snapshot has no active poll; dropping the local one");
                    self.state.poll = None;
                }
            }
        }

        let capacity = self.config.reaction_log_capacity;
        for event in self.convert_reactions(frame.recent_reactions) {
            self.state.log_reaction(event, capacity);
        }

        if frame.active_connections.is_some() {
            self.state.viewers = frame.active_connections;
        }
        if frame.total_questions.is_some() {
            self.state.total_questions = frame.total_questions;
        }
        Ok(())
    }

    fn on_reaction(&mut self, frame: ReactionFrame) -> Result<(), FrameError> {
        self.state
            .apply_tally(frame.counts.into(), self.now, self.config, self.timers);

        let Some(event) = frame.data.and_then(|dto| self.convert_reactions(vec![dto]).pop()) else {
            return Ok(());
        };

        let effects = &mut self.state.effects;
        effects.spawn_wave(event.kind, self.now, self.config, self.timers);
        if &event.participant != self.me {
            effects.spawn_particles(event.kind, self.now, self.config, self.timers);
        }
        effects.touch_participant(&event.participant, self.now, self.config, self.timers);

        let capacity = self.config.reaction_log_capacity;
        self.state.log_reaction(event, capacity);
        Ok(())
    }

    fn on_question(&mut self, frame: QuestionFrame) -> Result<(), FrameError> {
        let question =
            question_from_dto(frame.data, self.me, self.now).map_err(domain_error("question"))?;
        let author = question.author.clone();
        self.state.upsert_question(question, self.me);
        self.state
            .effects
            .touch_participant(&author, self.now, self.config, self.timers);
        Ok(())
    }

    fn on_question_upvote(&mut self, frame: QuestionUpvoteFrame) -> Result<(), FrameError> {
        let id = QuestionId::new(frame.data.id.clone()).map_err(domain_error("question_upvote"))?;
        let upvoted_by_me = frame.data.upvoted_by.iter().any(|u| u == self.me.as_str());

        if let Some(question) = self.state.questions.iter_mut().find(|q| q.id == id) {
            question.confirm_upvotes(frame.data.upvotes);
            if upvoted_by_me {
                question.upvoted_by_me = true;
                self.state.upvoted.insert(id);
            }
            return Ok(());
        }

        match question_from_upvote_dto(frame.data, self.me, self.now)
            .map_err(domain_error("question_upvote"))?
        {
            Some(question) => {
                if question.upvoted_by_me {
                    self.state.upvoted.insert(id);
                }
                self.state.upsert_question(question, self.me);
            }
            None => tracing::debug!("Ignoring upvote count for unknown question {}", id),
        }
        Ok(())
    }

    fn on_poll_created(&mut self, frame: PollFrame) -> Result<(), FrameError> {
        let poll = Poll::try_from(frame.data).map_err(domain_error("poll_created"))?;
        tracing::info!("Poll {} started: {}", poll.id, poll.text);
        self.state.set_poll(poll, self.now, self.config, self.timers);
        Ok(())
    }

    fn on_poll_vote(&mut self, frame: PollFrame) -> Result<(), FrameError> {
        let id = PollId::new(frame.data.id).map_err(domain_error("poll_vote"))?;
        match self.state.poll.as_mut() {
            Some(state) if state.poll.id == id => {
                state.poll.yes_votes = frame.data.yes_votes;
                state.poll.no_votes = frame.data.no_votes;
            }
            _ => {
                tracing::debug!("Ignoring vote for poll {} (not current)", id);
                return Ok(());
            }
        }

        if let Some(voter) = frame.user_id.and_then(|id| ParticipantId::new(id).ok()) {
            self.state
                .effects
                .touch_participant(&voter, self.now, self.config, self.timers);
        }
        Ok(())
    }

    fn on_poll_closed(&mut self, frame: PollFrame) -> Result<(), FrameError> {
        let mut poll = Poll::try_from(frame.data).map_err(domain_error("poll_closed"))?;
        if !self
            .state
            .poll
            .as_ref()
            .is_some_and(|state| state.poll.id == poll.id)
        {
            tracing::debug!("Ignoring close of poll {} (not current)", poll.id);
            return Ok(());
        }
        poll.active = false;
        tracing::info!("Poll {} closed ({} votes)", poll.id, poll.total_votes());
        self.state.set_poll(poll, self.now, self.config, self.timers);
        Ok(())
    }

    fn on_pong(&mut self) -> Result<(), FrameError> {
        tracing::debug!("Heartbeat acknowledged");
        Ok(())
    }
}
