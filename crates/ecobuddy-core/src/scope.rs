use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{EcoError, Result};

/// Cancellation scope tied to the lifetime of a consuming view.
///
/// Futures run through [`ViewScope::run`] are dropped as soon as the scope is
/// cancelled. Dropping the scope cancels it, so a view that goes away takes
/// its in-flight requests with it.
#[derive(Debug)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A scope cancelled together with `parent` (e.g. a server shutdown token).
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    /// A narrower scope, e.g. one chat turn inside a session.
    pub fn child(&self) -> Self {
        Self::child_of(&self.token)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Drive `fut` to completion unless the scope is cancelled first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(EcoError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(EcoError::Cancelled),
            res = fut => res,
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes() {
        let scope = ViewScope::new();
        let value = scope.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_after_cancel_is_cancelled() {
        let scope = ViewScope::new();
        scope.cancel();
        let result = scope.run(async { Ok(1) }).await;
        assert!(matches!(result, Err(EcoError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_during_run() {
        let scope = ViewScope::new();
        let token = scope.token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let result = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(EcoError::Cancelled)));
    }

    #[tokio::test]
    async fn test_parent_cancels_child() {
        let parent = CancellationToken::new();
        let scope = ViewScope::child_of(&parent);
        parent.cancel();
        assert!(scope.is_cancelled());
    }

    #[test]
    fn test_drop_cancels() {
        let scope = ViewScope::new();
        let token = scope.token().clone();
        drop(scope);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_dropping_child_leaves_parent() {
        let parent = ViewScope::new();
        let child = parent.child();
        drop(child);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelling_parent_stops_child_run() {
        let parent = ViewScope::new();
        let turn = parent.child();
        parent.cancel();
        let result = turn.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(EcoError::Cancelled)));
    }
}
