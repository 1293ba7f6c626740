//! Supervised background tasks.
//!
//! Tasks run on a [`JoinSet`] and receive a child of the supervisor's
//! [`CancellationToken`]. Each task's output is sent on an unbounded
//! channel. [`TaskSupervisor::shutdown`] cancels every task and waits for
//! all of them.

use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct TaskSupervisor<T> {
    tasks: Mutex<JoinSet<()>>,
    cancel: CancellationToken,
    outcomes_tx: mpsc::UnboundedSender<T>,
    outcomes_rx: Mutex<Option<mpsc::UnboundedReceiver<T>>>,
}

impl<T: Send + 'static> Default for TaskSupervisor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> TaskSupervisor<T> {
    pub fn new() -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            tasks: Mutex::new(JoinSet::new()),
            cancel: CancellationToken::new(),
            outcomes_tx,
            outcomes_rx: Mutex::new(Some(outcomes_rx)),
        }
    }

    /// Spawn `make(token)` on the current runtime.
    ///
    /// After shutdown the token handed out is already cancelled.
    pub fn spawn<F, Fut>(&self, make: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let fut = make(self.cancel.child_token());
        let tx = self.outcomes_tx.clone();

        let mut tasks = self.tasks.lock();
        while let Some(finished) = tasks.try_join_next() {
            log_join(finished);
        }
        tasks.spawn(async move {
            let outcome = fut.await;
            if tx.send(outcome).is_err() {
                debug!("Outcome receiver dropped");
            }
        });
    }

    /// The outcome stream. Only the first caller gets it.
    pub fn take_outcomes(&self) -> Option<mpsc::UnboundedReceiver<T>> {
        self.outcomes_rx.lock().take()
    }

    /// Tasks spawned and not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every task and wait until all have finished.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        let count = tasks.len();
        while let Some(finished) = tasks.join_next().await {
            log_join(finished);
        }
        info!(tasks = count, "Task supervisor shut down");
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            error!(error = %err, "Supervised task panicked");
        } else {
            debug!(error = %err, "Supervised task aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn outcomes_are_delivered() {
        let supervisor = TaskSupervisor::new();
        let mut outcomes = supervisor.take_outcomes().unwrap();
        assert!(supervisor.take_outcomes().is_none());

        for n in 0..3u32 {
            supervisor.spawn(move |_cancel| async move { n * 10 });
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(outcomes.recv().await.unwrap());
        }
        seen.sort();
        assert_eq!(seen, vec![0, 10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_and_awaits() {
        let supervisor = TaskSupervisor::new();
        let mut outcomes = supervisor.take_outcomes().unwrap();

        supervisor.spawn(|cancel| async move {
            tokio::select! {
                _ = cancel.cancelled() => "cancelled",
                _ = tokio::time::sleep(Duration::from_secs(3_600)) => "finished",
            }
        });
        assert_eq!(supervisor.len(), 1);

        supervisor.shutdown().await;
        assert!(supervisor.is_empty());
        assert!(supervisor.is_shutting_down());
        assert_eq!(outcomes.recv().await, Some("cancelled"));
    }
}
