//! Derived metrics over the retained reaction log.
//!
//! Everything here is pure and recomputed on demand from the bounded log.

use crate::domain::{ReactionEvent, ReactionKind, ReactionTally, Timestamp};

const MINUTE_MS: u64 = 60_000;

/// Reaction count over one fixed-width interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineBucket {
    /// Age of the bucket's older edge, e.g. `-10m`
    pub label: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub count: u64,
}

fn bucket_label(age_ms: u64) -> String {
    if age_ms % MINUTE_MS == 0 {
        format!("-{}m", age_ms / MINUTE_MS)
    } else {
        format!("-{}s", age_ms / 1_000)
    }
}

/// Bucket reaction events into `count` intervals of `width_ms`, oldest first.
///
/// Bucket `k` counted back from `now` covers `[now-(k+1)·width, now-k·width)`.
/// Events outside every bucket, including ones stamped at or after `now`,
/// are not counted.
pub fn compute_timeline<'a, I>(
    events: I,
    now: Timestamp,
    width_ms: u64,
    count: usize,
) -> Vec<TimelineBucket>
where
    I: IntoIterator<Item = &'a ReactionEvent>,
{
    if count == 0 || width_ms == 0 {
        return Vec::new();
    }

    let mut buckets: Vec<TimelineBucket> = (0..count)
        .map(|index| {
            let back = (count - 1 - index) as u64;
            TimelineBucket {
                label: bucket_label((back + 1) * width_ms),
                start: Timestamp::new(now.value() - ((back + 1) * width_ms) as i64),
                end: Timestamp::new(now.value() - (back * width_ms) as i64),
                count: 0,
            }
        })
        .collect();

    for event in events {
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|bucket| bucket.start <= event.at && event.at < bucket.end)
        {
            bucket.count += 1;
        }
    }

    buckets
}

/// Engagement score in `0..=100`; an empty tally scores 50.
pub fn compute_engagement_score(tally: &ReactionTally) -> u8 {
    let positive = tally.get(ReactionKind::SpeedUp) + tally.get(ReactionKind::ShowCode);
    let negative = tally.get(ReactionKind::SlowDown) + 2 * tally.get(ReactionKind::ImLost);
    let score = 50 + 5 * (positive as i64 - negative as i64);
    score.clamp(0, 100) as u8
}

/// Reactions per minute over the trailing `window_ms`
pub fn compute_velocity<'a, I>(events: I, now: Timestamp, window_ms: u64) -> f64
where
    I: IntoIterator<Item = &'a ReactionEvent>,
{
    if window_ms == 0 {
        return 0.0;
    }
    let recent = events
        .into_iter()
        .filter(|event| {
            let age = now.value() - event.at.value();
            (0..window_ms as i64).contains(&age)
        })
        .count();
    recent as f64 * MINUTE_MS as f64 / window_ms as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParticipantId;

    fn event_at(millis: i64) -> ReactionEvent {
        ReactionEvent {
            kind: ReactionKind::SpeedUp,
            participant: ParticipantId::new("user_a".to_string()).unwrap(),
            at: Timestamp::new(millis),
        }
    }

    #[test]
    fn test_event_seven_minutes_old_lands_second_from_end() {
        // テスト項目: 5 分幅 12 バケットで 7 分前のイベントは -10m（末尾から 2 番目）に入る
        // given (前提条件):
        let now = Timestamp::new(60 * MINUTE_MS as i64);
        let events = vec![event_at(now.value() - 7 * MINUTE_MS as i64)];

        // when (操作):
        let buckets = compute_timeline(&events, now, 5 * MINUTE_MS, 12);

        // then (期待する結果):
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[10].label, "-10m");
        assert_eq!(buckets[10].count, 1);
        assert_eq!(buckets[11].label, "-5m");
        assert_eq!(buckets[0].label, "-60m");
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 1);
    }

    #[test]
    fn test_timeline_ignores_events_outside_range() {
        // テスト項目: 範囲外の古いイベントと未来のイベントは数えられない
        // given (前提条件):
        let now = Timestamp::new(1_000_000);
        let events = vec![event_at(0), event_at(1_000_500)];

        // when (操作):
        let buckets = compute_timeline(&events, now, 10_000, 3);

        // then (期待する結果):
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 0, 0]);
        assert_eq!(buckets[0].label, "-30s");
    }

    #[test]
    fn test_timeline_bucket_edges_are_closed_at_older_side() {
        // テスト項目: バケットは古い側の端を含み、新しい側の端 (now を含む) は含まない
        // given (前提条件):
        let width = 5 * MINUTE_MS;
        let now = Timestamp::new(120 * MINUTE_MS as i64);
        let exactly_one_width = vec![event_at(now.value() - width as i64)];
        let exactly_now = vec![event_at(now.value())];
        let oldest_edge = vec![event_at(now.value() - 12 * width as i64)];

        // when (操作):
        let one_width = compute_timeline(&exactly_one_width, now, width, 12);
        let at_now = compute_timeline(&exactly_now, now, width, 12);
        let oldest = compute_timeline(&oldest_edge, now, width, 12);

        // then (期待する結果):
        assert_eq!(one_width[11].count, 1);
        assert_eq!(one_width.iter().map(|b| b.count).sum::<u64>(), 1);
        assert!(at_now.iter().all(|b| b.count == 0));
        assert_eq!(oldest[0].count, 1);
        assert_eq!(oldest.iter().map(|b| b.count).sum::<u64>(), 1);
    }

    #[test]
    fn test_engagement_score() {
        // テスト項目: スコアは 50 + 5×(正 − 負) を 0〜100 に丸めた値になる
        // given (前提条件):
        let positive = ReactionTally::from_counts(&[
            (ReactionKind::SpeedUp, 4),
            (ReactionKind::ShowCode, 2),
        ]);
        let very_lost = ReactionTally::from_counts(&[(ReactionKind::ImLost, 20)]);

        // when (操作):

        // then (期待する結果):
        assert_eq!(compute_engagement_score(&positive), 80);
        assert_eq!(compute_engagement_score(&ReactionTally::new()), 50);
        assert_eq!(compute_engagement_score(&very_lost), 0);
    }

    #[test]
    fn test_velocity_counts_trailing_window() {
        // テスト項目: 直近ウィンドウ内のリアクション数を毎分あたりに換算する
        // given (前提条件):
        let now = Timestamp::new(100_000);
        let events = vec![event_at(99_000), event_at(70_000), event_at(10_000)];

        // when (操作):
        let per_minute = compute_velocity(&events, now, 30_000);

        // then (期待する結果):
        assert_eq!(per_minute, 2.0);
    }
}
