//! Slash-command parsing for the terminal client.
//!
//! Pure functions only, so the parsing rules are easy to test.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::domain::{QuestionId, ReactionKind, ValueObjectError, VoteChoice};

/// Which side of the room this terminal plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Role {
    #[default]
    Audience,
    Presenter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Audience => f.write_str("audience"),
            Role::Presenter => f.write_str("presenter"),
        }
    }
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    React(ReactionKind),
    Ask(String),
    Upvote(QuestionId),
    Vote(VoteChoice),
    CreatePoll { duration_secs: u64, text: String },
    Stats,
    Help,
    Quit,
}

/// Why a line could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (try /help)")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    MissingArgument(&'static str),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("{0} is only available to presenters")]
    PresenterOnly(&'static str),

    #[error(transparent)]
    InvalidValue(#[from] ValueObjectError),
}

/// Parse one input line.
///
/// Lines without a leading `/` are questions.
pub fn parse_command(line: &str, role: Role) -> Result<UserCommand, ParseError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(UserCommand::Ask(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "react" | "r" => {
            if args.is_empty() {
                return Err(ParseError::MissingArgument(
                    "/react speed_up|slow_down|show_code|im_lost",
                ));
            }
            Ok(UserCommand::React(ReactionKind::from_str(args)?))
        }
        "ask" | "q" => {
            if args.is_empty() {
                return Err(ParseError::MissingArgument("/ask <question>"));
            }
            Ok(UserCommand::Ask(args.to_string()))
        }
        "upvote" | "up" => {
            if args.is_empty() {
                return Err(ParseError::MissingArgument("/upvote <question id>"));
            }
            Ok(UserCommand::Upvote(QuestionId::new(args.to_string())?))
        }
        "vote" | "v" => {
            if args.is_empty() {
                return Err(ParseError::MissingArgument("/vote yes|no"));
            }
            Ok(UserCommand::Vote(VoteChoice::from_str(args)?))
        }
        "poll" => {
            if role != Role::Presenter {
                return Err(ParseError::PresenterOnly("/poll"));
            }
            let usage = "/poll <seconds> <question>";
            let (secs, text) = args
                .split_once(char::is_whitespace)
                .ok_or(ParseError::MissingArgument(usage))?;
            let duration_secs = secs
                .parse::<u64>()
                .map_err(|_| ParseError::InvalidDuration(secs.to_string()))?;
            Ok(UserCommand::CreatePoll {
                duration_secs,
                text: text.trim().to_string(),
            })
        }
        "stats" | "s" => Ok(UserCommand::Stats),
        "help" | "h" => Ok(UserCommand::Help),
        "quit" | "exit" => Ok(UserCommand::Quit),
        other => Err(ParseError::UnknownCommand(format!("/{other}"))),
    }
}
