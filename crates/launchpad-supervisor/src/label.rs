//! Button label notifications.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Label shown between a stop request and the end of the run.
pub const STOPPING_LABEL: &str = "stopping..";

/// Receives the label the launcher button should display.
///
/// Calls come from a dedicated delivery thread, one at a time and in the
/// order the supervisor changed state. They are never made while the
/// supervisor is locked: an implementation may block until its own UI thread
/// has applied the label, and may call back into the supervisor.
pub trait LabelSink: Send + Sync {
    fn set_label(&self, label: &str);
}

impl<F> LabelSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn set_label(&self, label: &str) {
        self(label)
    }
}

/// Discards label changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl LabelSink for NoLabels {
    fn set_label(&self, _label: &str) {}
}

enum LabelEvent {
    Set(String),
    Flush(oneshot::Sender<()>),
}

/// Ordered hand-off from state transitions to a [`LabelSink`].
///
/// `push` only enqueues, so it is safe under the slot lock. The delivery
/// thread exits once the queue is dropped.
pub(crate) struct LabelQueue {
    tx: mpsc::UnboundedSender<LabelEvent>,
}

impl LabelQueue {
    pub(crate) fn spawn(sink: Arc<dyn LabelSink>) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("launchpad-labels".to_string())
            .spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    match event {
                        LabelEvent::Set(label) => sink.set_label(&label),
                        LabelEvent::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("label delivery stopped");
            })?;

        Ok(Self { tx })
    }

    pub(crate) fn push(&self, label: &str) {
        if self.tx.send(LabelEvent::Set(label.to_string())).is_err() {
            debug!(label, "label dropped, delivery thread is gone");
        }
    }

    /// Resolves once every label pushed before the call has been delivered.
    pub(crate) async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(LabelEvent::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_labels_are_delivered_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let queue = LabelQueue::spawn(Arc::new(move |label: &str| {
            recorded.lock().push(label.to_string())
        }))
        .unwrap();

        for label in ["stop Task", STOPPING_LABEL, "Task"] {
            queue.push(label);
        }
        tokio::time::timeout(Duration::from_secs(1), queue.flush())
            .await
            .expect("flush did not complete");

        assert_eq!(*seen.lock(), vec!["stop Task", STOPPING_LABEL, "Task"]);
    }

    #[tokio::test]
    async fn test_push_does_not_wait_for_a_blocked_sink() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let queue = LabelQueue::spawn(Arc::new(move |_: &str| {
            let _ = release_rx.lock().recv();
        }))
        .unwrap();

        // The sink is stuck on the first label; pushing more must not block
        queue.push("one");
        queue.push("two");
        queue.push("three");

        for _ in 0..3 {
            release_tx.send(()).unwrap();
        }
        tokio::time::timeout(Duration::from_secs(1), queue.flush())
            .await
            .expect("flush did not complete");
    }
}
