//! Scoped cooperative cancellation (§4.1, §5, §9).
//!
//! A [`CancelToken`] cancels itself and every child token created from it.
//! Re-entrant and post-terminal cancellation are no-ops, satisfying the
//! idempotence property in §8 ("`Cancel` applied twice ... equals `Cancel`
//! applied once").

use tokio::sync::watch;

#[derive(Debug, Clone)]
struct Inner {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

/// A cheaply-cloneable handle to a cancellation scope.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Inner,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            inner: Inner { tx, rx },
        }
    }

    /// Create a child token. Cancelling `self` cancels the child, but
    /// cancelling a child does not cancel its parent.
    ///
    /// Backed by a `watch` channel rather than a one-shot notify: a
    /// receiver always observes the latest value on `borrow()`/`changed()`
    /// regardless of when it starts watching, so there is no lost-wakeup
    /// window between the parent cancelling and the child subscribing.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        if self.is_cancelled() {
            child.cancel();
            return child;
        }
        let mut parent_rx = self.inner.rx.clone();
        let child_clone = child.clone();
        tokio::spawn(async move {
            loop {
                if *parent_rx.borrow() {
                    child_clone.cancel();
                    return;
                }
                if parent_rx.changed().await.is_err() {
                    return;
                }
            }
        });
        child
    }

    /// Idempotent: cancelling an already-cancelled token is a no-op.
    pub fn cancel(&self) {
        let _ = self.inner.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.rx.borrow()
    }

    /// Resolves once this token is cancelled. Already-cancelled tokens
    /// resolve immediately.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn double_cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn child_token_observes_parent_cancellation() {
        let parent = CancelToken::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        child.cancelled().await;
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_child_does_not_cancel_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn child_created_after_parent_cancel_is_already_cancelled() {
        let parent = CancelToken::new();
        parent.cancel();
        let child = parent.child();
        assert!(child.is_cancelled());
    }
}
