use std::time::Duration;

use tokio::sync::mpsc;

use crate::editor::Message;
use crate::editor::timer::{DelayHandle, TimerKind};

/// Coalesces bursts of edits into a single delayed check.
///
/// The debouncer only tracks timing. The controller owns the document, so
/// the check that fires always reads the latest edit.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    timer: DelayHandle,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: DelayHandle::new(TimerKind::Check),
        }
    }

    /// Replaces any pending check with one that fires after the quiet period.
    /// Does nothing while `locked`; returns whether a check was scheduled.
    pub(crate) fn on_edit(&mut self, locked: bool, events: &mpsc::UnboundedSender<Message>) -> bool {
        if locked {
            return false;
        }

        self.timer.schedule(self.delay, events);
        true
    }

    /// Whether `token` belongs to the pending check.
    pub fn fire(&mut self, token: u64) -> bool {
        self.timer.take_fired(token)
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_token(rx: &mut mpsc::UnboundedReceiver<Message>) -> u64 {
        match rx.recv().await {
            Some(Message::TimerFired { token, .. }) => token,
            _ => panic!("expected the debounced check to fire"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(900));

        for _ in 0..10 {
            assert!(debouncer.on_edit(false, &tx));
            tokio::time::sleep(Duration::from_millis(80)).await;
        }

        let token = next_token(&mut rx).await;
        assert!(debouncer.fire(token));
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn locked_edits_are_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(900));

        assert!(!debouncer.on_edit(true, &tx));
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_check_is_not_honoured() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        debouncer.on_edit(false, &tx);
        let token = next_token(&mut rx).await;
        debouncer.cancel();

        assert!(!debouncer.fire(token));
    }
}
