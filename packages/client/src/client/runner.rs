//! Terminal client execution logic.

use std::collections::HashSet;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use super::{
    command::{Role, UserCommand, parse_command},
    formatter::SnapshotFormatter,
    ui::{prompt, redisplay_prompt},
};
use crate::config::SyncConfig;
use crate::domain::{AlertId, ParticipantId, PollId, QuestionId, RoomCode};
use crate::error::{ActionError, ClientError};
use crate::infrastructure::transport::WebSocketConnector;
use crate::sync::{ConnectionState, RoomSnapshot, Session, SessionHandle};

/// Everything the terminal client needs to join a room
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub room: String,
    pub role: Role,
    pub config: SyncConfig,
}

/// Tracks what has already been printed so only changes are announced
#[derive(Debug, Default)]
pub struct NoticeTracker {
    connection: Option<ConnectionState>,
    alerts: HashSet<AlertId>,
    questions: HashSet<QuestionId>,
    poll: Option<(PollId, bool)>,
}

impl NoticeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications for everything new in `snapshot`
    pub fn notices(&mut self, snapshot: &RoomSnapshot, role: Role) -> Vec<String> {
        let mut notices = Vec::new();

        if self.connection != Some(snapshot.connection) {
            self.connection = Some(snapshot.connection);
            notices.push(SnapshotFormatter::format_connection_change(snapshot.connection));
        }

        if role == Role::Presenter {
            for alert in snapshot.alerts.iter().rev() {
                if self.alerts.insert(alert.id) {
                    notices.push(SnapshotFormatter::format_alert(alert));
                }
            }
        }

        for question in snapshot.questions.iter().rev() {
            if question.pending || question.author == snapshot.me {
                self.questions.insert(question.id.clone());
                continue;
            }
            if self.questions.insert(question.id.clone()) {
                notices.push(SnapshotFormatter::format_question(question));
            }
        }

        let poll = snapshot
            .poll
            .as_ref()
            .map(|poll| (poll.id.clone(), poll.active));
        if poll != self.poll {
            if let Some(current) = &snapshot.poll {
                notices.push(SnapshotFormatter::format_poll(current, snapshot.my_vote));
            }
            self.poll = poll;
        }

        notices
    }
}

/// Run one command against the session; returns text to print.
async fn execute(handle: &SessionHandle, command: UserCommand) -> Result<Option<String>, ActionError> {
    match command {
        UserCommand::React(kind) => handle.react(kind).await.map(|_| None),
        UserCommand::Ask(text) => handle.ask(text).await.map(|_| None),
        UserCommand::Upvote(id) => handle.upvote(id).await.map(|_| None),
        UserCommand::Vote(choice) => handle.vote(choice).await.map(|_| None),
        UserCommand::CreatePoll {
            duration_secs,
            text,
        } => handle
            .create_poll(text, Some(duration_secs))
            .await
            .map(|_| None),
        UserCommand::Stats => {
            if let Err(e) = handle.request_stats().await {
                tracing::debug!("Showing cached state: {}", e);
            }
            Ok(Some(SnapshotFormatter::format_summary(&handle.snapshot())))
        }
        UserCommand::Help => Ok(Some(SnapshotFormatter::format_help())),
        UserCommand::Quit => Ok(None),
    }
}

/// Spawn a blocking thread for rustyline (synchronous readline)
fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

/// Join a room and drive the session from terminal input until the user quits.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let room_code = RoomCode::new(options.room)?;
    let me = ParticipantId::generate();
    let role = options.role;

    let handle = Session::spawn(
        WebSocketConnector::new(),
        &options.base_url,
        room_code.clone(),
        me.clone(),
        options.config,
    );
    tracing::info!(
        "Joining {} as '{}' ({})",
        room_code.channel_url(&options.base_url),
        me,
        role
    );
    println!(
        "\nYou are '{}' in room {} ({}). Type a question or /help. Press Ctrl+C to exit.\n",
        me, room_code, role
    );

    let mut input_rx = spawn_readline(prompt(&room_code));
    let mut updates = handle.subscribe();
    let mut tracker = NoticeTracker::new();

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                match parse_command(&line, role) {
                    Ok(UserCommand::Quit) => break,
                    Ok(command) => match execute(&handle, command).await {
                        Ok(Some(text)) => print!("{}", text),
                        Ok(None) => {}
                        Err(e) => println!("x {}", e),
                    },
                    Err(e) => println!("x {}", e),
                }
                redisplay_prompt(&room_code);
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let notices = tracker.notices(&snapshot, role);
                if !notices.is_empty() {
                    print!("{}", notices.concat());
                    redisplay_prompt(&room_code);
                }
            }
        }
    }

    handle.leave().await;
    tracing::info!("Client session ended normally");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Alert, AlertKind, AlertSeverity, Question, Timestamp};

    fn snapshot() -> RoomSnapshot {
        RoomSnapshot::empty(
            RoomCode::new("demo".to_string()).unwrap(),
            ParticipantId::new("user_me".to_string()).unwrap(),
            &SyncConfig::default(),
            Timestamp::new(0),
        )
    }

    #[test]
    fn test_notices_report_only_changes() {
        // テスト項目: 同じスナップショットを 2 回渡しても通知は 1 回だけ
        // given (前提条件):
        let mut tracker = NoticeTracker::new();
        let mut snapshot = snapshot();
        snapshot.questions.push(Question {
            id: QuestionId::new("q1".to_string()).unwrap(),
            text: "Generics?".to_string(),
            created_at: Timestamp::new(0),
            upvotes: 0,
            author: ParticipantId::new("user_other".to_string()).unwrap(),
            upvoted_by_me: false,
            pending: false,
        });

        // when (操作):
        let first = tracker.notices(&snapshot, Role::Audience);
        let second = tracker.notices(&snapshot, Role::Audience);

        // then (期待する結果):
        assert_eq!(first.len(), 2);
        assert!(first[0].contains("Not connected"));
        assert!(first[1].contains("Generics?"));
        assert!(second.is_empty());
    }

    #[test]
    fn test_alerts_only_shown_to_presenter() {
        // テスト項目: アラートはプレゼンターにのみ通知される
        // given (前提条件):
        let mut snapshot = snapshot();
        snapshot.alerts.push(Alert {
            id: AlertId(0),
            kind: AlertKind::Confusion,
            severity: AlertSeverity::Warning,
            message: "Audience confusion detected! Consider slowing down.".to_string(),
            created_at: Timestamp::new(0),
        });
        let mut audience = NoticeTracker::new();
        let mut presenter = NoticeTracker::new();

        // when (操作):
        let audience_notices = audience.notices(&snapshot, Role::Audience);
        let presenter_notices = presenter.notices(&snapshot, Role::Presenter);

        // then (期待する結果):
        assert_eq!(audience_notices.len(), 1);
        assert_eq!(presenter_notices.len(), 2);
        assert!(presenter_notices[1].contains("alert-0 [warning]"));
    }
}
