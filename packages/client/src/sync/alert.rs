//! Presenter alert heuristics.

use std::collections::VecDeque;

use super::{
    Timer,
    scheduler::{Scheduler, TimerId},
};
use crate::domain::{Alert, AlertId, AlertKind, AlertSeverity, ReactionKind, ReactionTally, Timestamp};

/// Threshold rule: fires when one reaction kind grew by at least `min_delta`
/// and has reached `min_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRule {
    pub kind: AlertKind,
    pub reaction: ReactionKind,
    pub min_delta: u64,
    pub min_count: u64,
    pub severity: AlertSeverity,
    pub message: String,
}

impl AlertRule {
    pub fn matches(&self, previous: &ReactionTally, current: &ReactionTally) -> bool {
        let delta = current.delta(previous, self.reaction);
        delta >= self.min_delta as i64 && current.get(self.reaction) >= self.min_count
    }
}

/// An alert that has not been given an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Evaluate every rule independently against two successive tallies.
pub fn evaluate(
    rules: &[AlertRule],
    previous: &ReactionTally,
    current: &ReactionTally,
) -> Vec<AlertDraft> {
    rules
        .iter()
        .filter(|rule| rule.matches(previous, current))
        .map(|rule| AlertDraft {
            kind: rule.kind,
            severity: rule.severity,
            message: rule.message.clone(),
        })
        .collect()
}

/// Bounded, newest-first list of live alerts
#[derive(Debug, Default)]
pub struct AlertBoard {
    alerts: VecDeque<(Alert, TimerId)>,
    next_id: u64,
}

impl AlertBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an alert, schedule its expiry and drop whatever exceeds `cap`.
    pub fn push(
        &mut self,
        draft: AlertDraft,
        now: Timestamp,
        ttl_ms: u64,
        cap: usize,
        timers: &mut Scheduler<Timer>,
    ) -> AlertId {
        let id = AlertId(self.next_id);
        self.next_id += 1;
        let timer = timers.schedule(now.add_millis(ttl_ms), Timer::AlertExpiry(id));
        tracing::info!("Alert {} [{}]: {}", id, draft.severity.as_str(), draft.message);
        self.alerts.push_front((
            Alert {
                id,
                kind: draft.kind,
                severity: draft.severity,
                message: draft.message,
                created_at: now,
            },
            timer,
        ));

        while self.alerts.len() > cap {
            if let Some((dropped, timer)) = self.alerts.pop_back() {
                timers.cancel(timer);
                tracing::debug!("Alert {} dropped by cap", dropped.id);
            }
        }
        id
    }

    /// Remove an expired alert; `false` if it was already gone.
    pub fn expire(&mut self, id: AlertId) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|(alert, _)| alert.id != id);
        before != self.alerts.len()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().map(|(alert, _)| alert)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_alert_rules;

    fn tally(kind: ReactionKind, count: u64) -> ReactionTally {
        ReactionTally::from_counts(&[(kind, count)])
    }

    #[test]
    fn test_confusion_fires_on_delta_and_level() {
        // テスト項目: im_lost が 3 → 5 で混乱アラートが 1 件だけ出る
        // given (前提条件):
        let rules = default_alert_rules();
        let previous = tally(ReactionKind::ImLost, 3);
        let current = tally(ReactionKind::ImLost, 5);

        // when (操作):
        let drafts = evaluate(&rules, &previous, &current);

        // then (期待する結果):
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, AlertKind::Confusion);
        assert_eq!(drafts[0].severity, AlertSeverity::Warning);
        assert_eq!(
            drafts[0].message,
            "Audience confusion detected! Consider slowing down."
        );
    }

    #[test]
    fn test_small_delta_emits_nothing() {
        // テスト項目: im_lost が 3 → 4 ではアラートが出ない
        // given (前提条件):
        let rules = default_alert_rules();

        // when (操作):
        let drafts = evaluate(
            &rules,
            &tally(ReactionKind::ImLost, 3),
            &tally(ReactionKind::ImLost, 4),
        );

        // then (期待する結果):
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_delta_without_level_emits_nothing() {
        // テスト項目: 差分が閾値以上でも絶対数が下限未満ならアラートは出ない
        // given (前提条件):
        let rules = default_alert_rules();

        // when (操作):
        let drafts = evaluate(
            &rules,
            &tally(ReactionKind::ShowCode, 2),
            &tally(ReactionKind::ShowCode, 6),
        );

        // then (期待する結果):
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_rules_are_independent() {
        // テスト項目: 複数のルールが同時に成立すればすべて発火する
        // given (前提条件):
        let rules = default_alert_rules();
        let previous = ReactionTally::new();
        let current = ReactionTally::from_counts(&[
            (ReactionKind::SpeedUp, 3),
            (ReactionKind::SlowDown, 8),
        ]);

        // when (操作):
        let drafts = evaluate(&rules, &previous, &current);

        // then (期待する結果):
        let kinds: Vec<AlertKind> = drafts.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Momentum, AlertKind::Pace]);
    }

    #[test]
    fn test_board_prepends_and_truncates_to_cap() {
        // テスト項目: 新しいアラートが先頭に入り、上限を超えた古いものは破棄される
        // given (前提条件):
        let mut board = AlertBoard::new();
        let mut timers = Scheduler::new();
        let draft = AlertDraft {
            kind: AlertKind::Momentum,
            severity: AlertSeverity::Success,
            message: "Great engagement! Keep up the pace!".to_string(),
        };

        // when (操作):
        for i in 0..7 {
            board.push(draft.clone(), Timestamp::new(i), 5_000, 5, &mut timers);
        }

        // then (期待する結果):
        let ids: Vec<String> = board.alerts().map(|a| a.id.to_string()).collect();
        assert_eq!(ids, vec!["alert-6", "alert-5", "alert-4", "alert-3", "alert-2"]);
        assert_eq!(timers.len(), 5);
    }

    #[test]
    fn test_board_expire_removes_alert() {
        // テスト項目: 期限切れのアラートは位置に関係なく削除される
        // given (前提条件):
        let mut board = AlertBoard::new();
        let mut timers = Scheduler::new();
        let draft = AlertDraft {
            kind: AlertKind::Pace,
            severity: AlertSeverity::Warning,
            message: "Multiple requests to slow down. Adjust your pace.".to_string(),
        };
        let first = board.push(draft.clone(), Timestamp::new(0), 5_000, 5, &mut timers);
        board.push(draft, Timestamp::new(10), 5_000, 5, &mut timers);

        // when (操作):
        let due = timers.pop_due(Timestamp::new(5_000));
        let removed = board.expire(first);

        // then (期待する結果):
        assert_eq!(due, vec![Timer::AlertExpiry(first)]);
        assert!(removed);
        assert_eq!(board.len(), 1);
        assert!(!board.expire(first));
    }
}
