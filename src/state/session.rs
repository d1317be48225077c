use crate::types::{ServerMessage, Step, StreamFailure};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Error,
}

impl RunStatus {
    pub fn label(self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Complete => "complete",
            RunStatus::Error => "error",
        }
    }
}

/// Identity of one execution channel. Only the most recently issued id may
/// mutate the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Frame(String),
    /// A frame arrived that could not be read as text.
    Undecodable(String),
    TransportError(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub channel: ChannelId,
    pub event: ChannelEvent,
}

/// State of the current (or last) execution: the received steps, the final
/// answer and the run status.
#[derive(Debug, Default)]
pub struct TrajectorySession {
    steps: Vec<Step>,
    final_answer: Option<String>,
    status: RunStatus,
    last_failure: Option<StreamFailure>,
    current_channel: Option<ChannelId>,
    issued_channels: u64,
}

impl TrajectorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn last_failure(&self) -> Option<&StreamFailure> {
        self.last_failure.as_ref()
    }

    pub fn current_channel(&self) -> Option<ChannelId> {
        self.current_channel
    }

    pub fn is_current(&self, channel: ChannelId) -> bool {
        self.current_channel == Some(channel)
    }

    /// Clears the previous run and hands out the id of the channel that now
    /// owns the session. Any earlier channel loses authority immediately.
    pub fn begin_run(&mut self) -> ChannelId {
        self.issued_channels += 1;
        let channel = ChannelId(self.issued_channels);
        self.steps.clear();
        self.final_answer = None;
        self.last_failure = None;
        self.status = RunStatus::Running;
        self.current_channel = Some(channel);
        channel
    }

    /// Applies one channel event. Returns `false` without touching any state
    /// when the event comes from a superseded channel.
    ///
    /// Once the run has completed or failed, later events from the current
    /// channel are accepted but change nothing; only `begin_run` starts over.
    pub fn apply(&mut self, channel: ChannelId, event: ChannelEvent) -> bool {
        if !self.is_current(channel) {
            tracing::debug!(%channel, ?event, "ignoring event from superseded channel");
            return false;
        }
        if self.status != RunStatus::Running && !matches!(event, ChannelEvent::Opened) {
            tracing::debug!(
                %channel,
                status = self.status.label(),
                ?event,
                "ignoring event after run ended"
            );
            return true;
        }

        match event {
            ChannelEvent::Opened => {
                tracing::debug!(%channel, "execution channel open");
            }
            ChannelEvent::Frame(text) => self.apply_frame(channel, &text),
            ChannelEvent::Undecodable(reason) => {
                tracing::warn!(%channel, %reason, "dropping undecodable frame");
                self.fail(StreamFailure::Malformed(reason));
            }
            ChannelEvent::TransportError(reason) => {
                tracing::warn!(%channel, %reason, "execution channel failed");
                self.fail(StreamFailure::Transport(reason));
            }
            ChannelEvent::Closed => {
                tracing::info!(%channel, steps = self.steps.len(), "channel closed without a final answer");
                self.status = RunStatus::Complete;
            }
        }
        true
    }

    fn apply_frame(&mut self, channel: ChannelId, text: &str) {
        match ServerMessage::parse(text) {
            Ok(ServerMessage::Step(step)) => self.steps.push(step),
            Ok(ServerMessage::Final { answer }) => {
                tracing::info!(%channel, steps = self.steps.len(), "run complete");
                self.final_answer = Some(answer);
                self.status = RunStatus::Complete;
            }
            Ok(ServerMessage::Error { error }) => {
                tracing::warn!(%channel, %error, "backend reported an error");
                self.fail(StreamFailure::Backend(error));
            }
            Err(error) => {
                tracing::warn!(%channel, %error, frame = %text, "dropping malformed frame");
                self.fail(StreamFailure::Malformed(error.to_string()));
            }
        }
    }

    fn fail(&mut self, failure: StreamFailure) {
        self.status = RunStatus::Error;
        self.last_failure = Some(failure);
    }
}
