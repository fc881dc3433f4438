//! Deadline racing for backend-bound work.
//!
//! [`run_with_timeout`] bounds how long the caller waits, not how long the
//! work runs. The work is spawned onto the runtime and keeps going to
//! completion after a lost race; its late result is dropped. Commands
//! already handed to the transport cannot be un-sent, so cancelling them
//! would only hide whether they took effect.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Result of a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The work finished in time.
    Completed(T),
    /// The deadline elapsed first.
    TimedOut,
}

impl<T> Outcome<T> {
    /// Returns `true` if the deadline elapsed.
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Returns the value if the work completed.
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }

    /// Maps the completed value.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::TimedOut => Outcome::TimedOut,
        }
    }
}

/// Races `work` against `duration`.
///
/// The work runs on its own task. If the deadline wins, the task is
/// detached and whatever it later produces is discarded. A panic inside the
/// work is resumed on the caller.
pub async fn run_with_timeout<F>(work: F, duration: Duration) -> Outcome<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut handle = tokio::spawn(work);
    match tokio::time::timeout(duration, &mut handle).await {
        Ok(Ok(value)) => Outcome::Completed(value),
        Ok(Err(join_err)) if join_err.is_panic() => {
            std::panic::resume_unwind(join_err.into_panic())
        }
        Ok(Err(join_err)) => {
            debug!(%join_err, "bounded work aborted by runtime");
            Outcome::TimedOut
        }
        Err(_) => {
            debug!(timeout_ms = duration.as_millis(), "bounded work timed out, detaching");
            Outcome::TimedOut
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn completes_within_deadline() {
        let outcome = run_with_timeout(async { 7 }, Duration::from_secs(1)).await;
        assert_eq!(outcome, Outcome::Completed(7));
        assert_eq!(outcome.map(|v| v * 2).completed(), Some(14));
    }

    #[tokio::test]
    async fn never_completing_work_times_out() {
        let outcome = run_with_timeout(
            std::future::pending::<u32>(),
            Duration::from_millis(20),
        )
        .await;
        assert!(outcome.is_timed_out());
        assert_eq!(outcome.completed(), None);
    }

    #[tokio::test]
    async fn late_work_keeps_running_but_is_discarded() {
        let finished = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = oneshot::channel();
        let flag = Arc::clone(&finished);

        let outcome = run_with_timeout(
            async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                flag.store(true, Ordering::SeqCst);
                let _ = done_tx.send(());
                "late"
            },
            Duration::from_millis(10),
        )
        .await;
        assert_eq!(outcome, Outcome::TimedOut);
        assert!(!finished.load(Ordering::SeqCst));

        let Ok(()) = done_rx.await else {
            panic!("detached work was cancelled");
        };
        assert!(finished.load(Ordering::SeqCst));
    }
}
