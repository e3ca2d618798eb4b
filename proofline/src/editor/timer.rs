use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::editor::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Check,
    Hide,
    Recheck,
    FixAllLabel,
    CopyLabel,
}

/// A cancellable delay owned by exactly one controller.
///
/// Scheduling replaces any pending instance. Each schedule gets a fresh token
/// and only the fire event carrying the current token is honoured, so an
/// event already queued by a replaced or cancelled delay is ignored.
#[derive(Debug)]
pub struct DelayHandle {
    kind: TimerKind,
    token: u64,
    task: Option<JoinHandle<()>>,
}

impl DelayHandle {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            token: 0,
            task: None,
        }
    }

    pub(crate) fn schedule(&mut self, delay: Duration, events: &mpsc::UnboundedSender<Message>) {
        self.cancel();
        self.token += 1;

        let kind = self.kind;
        let token = self.token;
        let events = events.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Message::TimerFired { kind, token });
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.task.is_some()
    }

    /// Accepts a fire event; returns false for tokens of replaced or cancelled delays.
    pub fn take_fired(&mut self, token: u64) -> bool {
        if self.task.is_some() && token == self.token {
            self.task = None;
            true
        } else {
            false
        }
    }
}

impl Drop for DelayHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
