//! Inbound frame routing.
//!
//! A raw text frame is validated into an [`InboundFrame`] and handed to
//! exactly one [`FrameHandler`] method. Anything that fails validation is
//! logged and dropped.

use crate::error::FrameError;
use crate::infrastructure::dto::websocket::{
    ConnectedFrame, InboundFrame, PollFrame, QuestionFrame, QuestionUpvoteFrame, ReactionFrame,
    StatsFrame,
};

/// Typed handlers, one per recognized frame type
#[cfg_attr(test, mockall::automock)]
pub trait FrameHandler {
    fn on_connected(&mut self, frame: ConnectedFrame) -> Result<(), FrameError>;
    fn on_stats(&mut self, frame: StatsFrame) -> Result<(), FrameError>;
    fn on_reaction(&mut self, frame: ReactionFrame) -> Result<(), FrameError>;
    fn on_question(&mut self, frame: QuestionFrame) -> Result<(), FrameError>;
    fn on_question_upvote(&mut self, frame: QuestionUpvoteFrame) -> Result<(), FrameError>;
    fn on_poll_created(&mut self, frame: PollFrame) -> Result<(), FrameError>;
    fn on_poll_vote(&mut self, frame: PollFrame) -> Result<(), FrameError>;
    fn on_poll_closed(&mut self, frame: PollFrame) -> Result<(), FrameError>;
    fn on_pong(&mut self) -> Result<(), FrameError>;
}

/// Route one validated frame.
pub fn route<H: FrameHandler + ?Sized>(frame: InboundFrame, handler: &mut H) -> Result<(), FrameError> {
    match frame {
        InboundFrame::Connected(frame) => handler.on_connected(frame),
        InboundFrame::Stats(frame) => handler.on_stats(frame),
        InboundFrame::Reaction(frame) => handler.on_reaction(frame),
        InboundFrame::Question(frame) => handler.on_question(frame),
        InboundFrame::QuestionUpvote(frame) => handler.on_question_upvote(frame),
        InboundFrame::PollCreated(frame) => handler.on_poll_created(frame),
        InboundFrame::PollVote(frame) => handler.on_poll_vote(frame),
        InboundFrame::PollClosed(frame) => handler.on_poll_closed(frame),
        InboundFrame::Pong => handler.on_pong(),
    }
}

/// Parse, validate and route one raw frame.
///
/// Returns the frame type on success. Errors are already logged; callers
/// only need them for bookkeeping.
pub fn dispatch<H: FrameHandler + ?Sized>(raw: &str, handler: &mut H) -> Result<&'static str, FrameError> {
    let frame = match InboundFrame::from_json(raw) {
        Ok(frame) => frame,
        Err(e @ FrameError::UnknownType(_)) => {
            tracing::debug!("Dropping frame: {}", e);
            return Err(e);
        }
        Err(e) => {
            tracing::warn!("Dropping frame: {}", e);
            return Err(e);
        }
    };

    let type_name = frame.type_name();
    tracing::debug!("Received '{}' frame", type_name);
    route(frame, handler).inspect_err(|e| tracing::warn!("Dropping frame: {}", e))?;
    Ok(type_name)
}
