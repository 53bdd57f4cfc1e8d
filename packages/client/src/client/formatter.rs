//! Plain-text rendering of room snapshots for the terminal client.

use hibiki_shared::time::timestamp_to_local_clock;

use crate::domain::{Alert, Poll, Question, VoteChoice};
use crate::sync::{ConnectionState, RoomSnapshot};

const RULE: &str = "============================================================";

/// Snapshot formatter for client display
pub struct SnapshotFormatter;

impl SnapshotFormatter {
    /// Full room summary printed by `/stats`
    pub fn format_summary(snapshot: &RoomSnapshot) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!(
            "Room {} [{}] as {}",
            snapshot.room_code, snapshot.connection, snapshot.me
        ));
        if let Some(viewers) = snapshot.viewers {
            output.push_str(&format!(" - {} viewers", viewers));
        }
        output.push('\n');

        output.push_str(&format!(
            "Engagement {}/100, {:.1} reactions/min\n",
            snapshot.engagement_score, snapshot.velocity_per_minute
        ));
        let counts: Vec<String> = snapshot
            .tally
            .iter()
            .map(|(kind, count)| format!("{} {}", kind.label(), count))
            .collect();
        output.push_str(&format!("Reactions: {}\n", counts.join(" | ")));
        output.push_str(&Self::format_timeline(snapshot));

        if let Some(poll) = &snapshot.poll {
            output.push_str(&Self::format_poll(poll, snapshot.my_vote));
        }

        output.push_str("Questions:\n");
        if snapshot.questions.is_empty() {
            output.push_str("(No questions)\n");
        } else {
            for question in &snapshot.questions {
                output.push_str(&Self::format_question(question));
            }
        }

        for alert in &snapshot.alerts {
            output.push_str(&Self::format_alert(alert));
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// One-line heatmap, oldest bucket first
    pub fn format_timeline(snapshot: &RoomSnapshot) -> String {
        let cells: Vec<String> = snapshot
            .timeline
            .iter()
            .map(|bucket| format!("{}:{}", bucket.label, bucket.count))
            .collect();
        format!("Timeline: {}\n", cells.join(" "))
    }

    pub fn format_question(question: &Question) -> String {
        let mut markers = String::new();
        if question.upvoted_by_me {
            markers.push_str(" (upvoted)");
        }
        if question.pending {
            markers.push_str(" (sending)");
        }
        format!(
            "  [{}] ▲{} {}{} - {} at {}\n",
            question.id,
            question.upvotes,
            question.text,
            markers,
            question.author,
            timestamp_to_local_clock(question.created_at.value())
        )
    }

    pub fn format_poll(poll: &Poll, my_vote: Option<VoteChoice>) -> String {
        let status = if poll.active { "open" } else { "closed" };
        let share = poll
            .yes_percent()
            .map(|p| format!(" ({}% yes)", p))
            .unwrap_or_default();
        let mine = my_vote
            .map(|vote| format!(", you voted {}", vote))
            .unwrap_or_default();
        format!(
            "Poll [{}] {} - {}: yes {} / no {}{}{}\n",
            poll.id, status, poll.text, poll.yes_votes, poll.no_votes, share, mine
        )
    }

    pub fn format_alert(alert: &Alert) -> String {
        format!(
            "! {} [{}] {}\n",
            alert.id,
            alert.severity.as_str(),
            alert.message
        )
    }

    pub fn format_connection_change(state: ConnectionState) -> String {
        let text = match state {
            ConnectionState::Idle => "Not connected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Open => "Live, connected",
            ConnectionState::Closed => "Disconnected, reconnecting...",
            ConnectionState::Errored => "Connection error, reconnecting...",
            ConnectionState::Left => "Left the room",
        };
        format!("\n* {}\n", text)
    }

    pub fn format_help() -> String {
        "\nCommands:\n  \
         <text>                   ask a question\n  \
         /react <kind>            speed_up | slow_down | show_code | im_lost\n  \
         /upvote <question id>    upvote a question\n  \
         /vote yes|no             vote in the running poll\n  \
         /poll <secs> <question>  start a poll (presenter)\n  \
         /stats                   show the room summary\n  \
         /quit                    leave the room\n"
            .to_string()
    }
}
