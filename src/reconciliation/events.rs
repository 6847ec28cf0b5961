//! Observer implementations for run side effects

use tokio::sync::mpsc;

use crate::traits::RunObserver;
use crate::types::RunReport;

/// One side effect of a run, as delivered over a channel
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Log(String),
    Progress { fraction: f64, text: String },
    Complete(Box<RunReport>),
}

/// Forwards every side effect to an unbounded channel
///
/// Sending never blocks the worker. A dropped receiver is tolerated: the run
/// keeps going and later events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiver that drains it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: RunEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("run event receiver dropped");
        }
    }
}

impl RunObserver for ChannelObserver {
    fn on_log(&mut self, message: &str) {
        self.send(RunEvent::Log(message.to_string()));
    }

    fn on_progress(&mut self, fraction: f64, text: &str) {
        self.send(RunEvent::Progress {
            fraction,
            text: text.to_string(),
        });
    }

    fn on_complete(&mut self, report: &RunReport) {
        self.send(RunEvent::Complete(Box::new(report.clone())));
    }
}
