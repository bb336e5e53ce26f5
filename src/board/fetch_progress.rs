//! Utilities to track the progression of a fetch

use std::fmt::{Display, Error, Formatter};

/// An event that happens during a fetch
#[derive(Clone, Debug, PartialEq)]
pub enum FetchEvent {
    /// No fetch has started yet
    NotStarted,
    /// A fetch is in flight. A loading indicator should be displayed
    Started,
    /// A fetch is over
    Finished{ success: bool, records: usize, rejected: usize },
}

impl Display for FetchEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            FetchEvent::NotStarted => write!(f, "Not started"),
            FetchEvent::Started => write!(f, "Loading schedules..."),
            FetchEvent::Finished{success, records, rejected} => match success {
                true => write!(f, "{} schedules loaded ({} skipped)", records, rejected),
                false => write!(f, "Unable to load schedules"),
            }
        }
    }
}

impl Default for FetchEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}



/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<FetchEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<FetchEvent>;

/// Create a feeback channel, that can be used to retrieve the current progress of a fetch
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(FetchEvent::default())
}




/// A structure that logs the progression of a fetch, and forwards it to a feedback channel (if any)
#[derive(Debug, Default)]
pub struct FetchProgress {
    feedback_channel: Option<FeedbackSender>
}
impl FetchProgress {
    pub fn new_with_feedback_channel(channel: FeedbackSender) -> Self {
        Self { feedback_channel: Some(channel) }
    }

    /// Log an error
    pub fn error(&self, text: &str) {
        log::error!("{}", text);
    }
    /// Log an info
    pub fn info(&self, text: &str) {
        log::info!("{}", text);
    }
    /// Send an event as a feedback to the listener (if any).
    pub fn feedback(&self, event: FetchEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Nobody listening is not an error
            let _ = sender.send(event);
        }
    }
}
