//! Caller cancellation and deadlines.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a caller's context stopped a saga step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

impl std::fmt::Display for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interrupt::Cancelled => write!(f, "call cancelled"),
            Interrupt::DeadlineExceeded => write!(f, "call deadline exceeded"),
        }
    }
}

/// The caller's side of a saga invocation: a cancellation signal and an
/// optional deadline.
///
/// Forward steps give up as soon as the context is interrupted. Compensation
/// never looks at it.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels the paired `CallContext`. Dropping the handle cancels too.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl CallContext {
    /// A context that is never interrupted.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that can be cancelled through the returned handle.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancelled: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    /// Adds a deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the interrupt if the context is already cancelled or expired.
    pub fn interrupt(&self) -> Option<Interrupt> {
        if let Some(rx) = &self.cancelled
            && *rx.borrow()
        {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn interrupted(&self) -> Interrupt {
        let cancelled = async {
            if let Some(rx) = &self.cancelled {
                let mut rx = rx.clone();
                let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                if fired {
                    return;
                }
            }
            std::future::pending::<()>().await
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Interrupt::Cancelled,
            _ = expired => Interrupt::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_is_never_interrupted() {
        let ctx = CallContext::background();
        assert!(ctx.interrupt().is_none());

        let waited =
            tokio::time::timeout(Duration::from_millis(20), ctx.interrupted()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (ctx, handle) = CallContext::cancellable();
        assert!(ctx.interrupt().is_none());

        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.interrupted().await }
        });
        handle.cancel();

        assert_eq!(waiter.await.unwrap(), Interrupt::Cancelled);
        assert_eq!(ctx.interrupt(), Some(Interrupt::Cancelled));
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels() {
        let (ctx, handle) = CallContext::cancellable();
        drop(handle);

        assert_eq!(ctx.interrupt(), Some(Interrupt::Cancelled));
        assert_eq!(ctx.interrupted().await, Interrupt::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
        assert!(ctx.interrupt().is_none());

        assert_eq!(ctx.interrupted().await, Interrupt::DeadlineExceeded);
        assert_eq!(ctx.interrupt(), Some(Interrupt::DeadlineExceeded));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let ctx = CallContext::background()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(60));
        let deadline = ctx.deadline().unwrap();
        assert!(deadline <= Instant::now() + Duration::from_secs(1));
    }
}
