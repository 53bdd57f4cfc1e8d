//! Short-lived presentation state: particles, reaction waves and participant
//! pulses. Every object is removed by a timer, never by the caller.

use std::{
    collections::{BTreeMap, HashMap},
    f64::consts::TAU,
    fmt,
};

use super::{
    Timer,
    scheduler::{Scheduler, TimerId},
};
use crate::config::SyncConfig;
use crate::domain::{ParticipantId, ReactionKind, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u64);

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// One of `total` particles fanned out evenly around the origin
    Particle { index: usize, total: usize },
    Wave,
}

impl EffectKind {
    /// Launch direction of a particle in radians
    pub fn angle(&self) -> Option<f64> {
        match self {
            EffectKind::Particle { index, total } if *total > 0 => {
                Some(*index as f64 / *total as f64 * TAU)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub id: EffectId,
    pub kind: EffectKind,
    pub reaction: ReactionKind,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Recent activity of one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantActivity {
    pub id: ParticipantId,
    pub initials: String,
    pub last_active: Timestamp,
    pub pulsing: bool,
}

#[derive(Debug)]
struct ActivityEntry {
    activity: ParticipantActivity,
    pulse_timer: TimerId,
    idle_timer: TimerId,
}

#[derive(Debug, Default)]
pub struct EffectsScheduler {
    effects: BTreeMap<EffectId, Effect>,
    participants: HashMap<ParticipantId, ActivityEntry>,
    next_id: u64,
}

impl EffectsScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(
        &mut self,
        kind: EffectKind,
        reaction: ReactionKind,
        now: Timestamp,
        lifetime_ms: u64,
        timers: &mut Scheduler<Timer>,
    ) -> EffectId {
        self.next_id += 1;
        let id = EffectId(self.next_id);
        let expires_at = now.add_millis(lifetime_ms);
        timers.schedule(expires_at, Timer::EffectExpiry(id));
        self.effects.insert(
            id,
            Effect {
                id,
                kind,
                reaction,
                created_at: now,
                expires_at,
            },
        );
        id
    }

    /// Fan out `config.particle_count` particles for one reaction.
    pub fn spawn_particles(
        &mut self,
        reaction: ReactionKind,
        now: Timestamp,
        config: &SyncConfig,
        timers: &mut Scheduler<Timer>,
    ) -> Vec<EffectId> {
        let total = config.particle_count;
        (0..total)
            .map(|index| {
                self.spawn(
                    EffectKind::Particle { index, total },
                    reaction,
                    now,
                    config.particle_lifetime_ms,
                    timers,
                )
            })
            .collect()
    }

    pub fn spawn_wave(
        &mut self,
        reaction: ReactionKind,
        now: Timestamp,
        config: &SyncConfig,
        timers: &mut Scheduler<Timer>,
    ) -> EffectId {
        self.spawn(EffectKind::Wave, reaction, now, config.wave_lifetime_ms, timers)
    }

    pub fn expire_effect(&mut self, id: EffectId) -> bool {
        self.effects.remove(&id).is_some()
    }

    /// Insert or refresh a participant's activity record and restart its pulse.
    pub fn touch_participant(
        &mut self,
        participant: &ParticipantId,
        now: Timestamp,
        config: &SyncConfig,
        timers: &mut Scheduler<Timer>,
    ) {
        let pulse_timer = timers.schedule(
            now.add_millis(config.pulse_duration_ms),
            Timer::PulseEnd(participant.clone()),
        );
        let idle_timer = timers.schedule(
            now.add_millis(config.participant_idle_ms),
            Timer::ParticipantIdle(participant.clone()),
        );

        match self.participants.get_mut(participant) {
            Some(entry) => {
                timers.cancel(entry.pulse_timer);
                timers.cancel(entry.idle_timer);
                entry.activity.last_active = now;
                entry.activity.pulsing = true;
                entry.pulse_timer = pulse_timer;
                entry.idle_timer = idle_timer;
            }
            None => {
                self.participants.insert(
                    participant.clone(),
                    ActivityEntry {
                        activity: ParticipantActivity {
                            id: participant.clone(),
                            initials: participant.initials(),
                            last_active: now,
                            pulsing: true,
                        },
                        pulse_timer,
                        idle_timer,
                    },
                );
            }
        }
    }

    pub fn end_pulse(&mut self, participant: &ParticipantId) {
        if let Some(entry) = self.participants.get_mut(participant) {
            entry.activity.pulsing = false;
        }
    }

    pub fn retire_participant(&mut self, participant: &ParticipantId) -> bool {
        self.participants.remove(participant).is_some()
    }

    /// Live effects, oldest first
    pub fn effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects.values()
    }

    /// Participants, most recently active first
    pub fn participants(&self) -> Vec<ParticipantActivity> {
        let mut participants: Vec<ParticipantActivity> = self
            .participants
            .values()
            .map(|entry| entry.activity.clone())
            .collect();
        participants.sort_by(|a, b| {
            b.last_active
                .cmp(&a.last_active)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        participants
    }
}
