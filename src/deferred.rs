//! Results that may be available now or later.
//!
//! Storage adapters and migrations can answer synchronously or hand back a
//! future. `Deferred` folds both into one chain: ready values run their
//! continuations inline, pending ones compose into a single boxed future.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use tracing::warn;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A value that is either ready or still being computed.
#[must_use = "a pending Deferred does nothing unless awaited or detached"]
pub enum Deferred<T> {
    Ready(T),
    Pending(BoxFuture<T>),
}

impl<T: Send + 'static> Deferred<T> {
    pub fn ready(value: T) -> Self {
        Deferred::Ready(value)
    }

    pub fn pending(future: impl Future<Output = T> + Send + 'static) -> Self {
        Deferred::Pending(Box::pin(future))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Deferred::Ready(_))
    }

    /// Take the value if it is already available.
    pub fn into_ready(self) -> Result<T, Self> {
        match self {
            Deferred::Ready(value) => Ok(value),
            pending => Err(pending),
        }
    }

    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Deferred::Ready(value) => Deferred::Ready(f(value)),
            Deferred::Pending(future) => Deferred::pending(async move { f(future.await) }),
        }
    }

    pub fn and_then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        match self {
            Deferred::Ready(value) => f(value),
            Deferred::Pending(future) => Deferred::pending(async move { f(future.await).await }),
        }
    }
}

impl<T, E> Deferred<Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Chain a fallible step, short-circuiting on error.
    pub fn and_then_ok<U, F>(self, f: F) -> Deferred<Result<U, E>>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<Result<U, E>> + Send + 'static,
    {
        self.and_then(|result| match result {
            Ok(value) => f(value),
            Err(e) => Deferred::Ready(Err(e)),
        })
    }
}

impl Deferred<()> {
    /// Run to completion without waiting for it.
    ///
    /// Pending work is spawned on the current tokio runtime. Without one
    /// there is nothing to drive it, so it is dropped with a warning.
    pub fn detach(self, what: &str) {
        if let Deferred::Pending(future) = self {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(future);
                }
                Err(_) => warn!(operation = what, "no async runtime available, dropping pending work"),
            }
        }
    }
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = T;
    type IntoFuture = BoxFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Deferred::Ready(value) => Box::pin(std::future::ready(value)),
            Deferred::Pending(future) => future,
        }
    }
}

impl<T> From<T> for Deferred<T> {
    fn from(value: T) -> Self {
        Deferred::Ready(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_chain_runs_inline() {
        let result = Deferred::ready(2)
            .map(|n| n * 10)
            .and_then(|n| Deferred::ready(n + 1))
            .into_ready();
        assert!(matches!(result, Ok(21)));
    }

    #[test]
    fn test_and_then_ok_short_circuits() {
        let result: Deferred<Result<i32, String>> = Deferred::ready(Err("boom".to_string()))
            .and_then_ok(|n: i32| Deferred::ready(Ok(n + 1)));
        match result.into_ready() {
            Ok(Err(e)) => assert_eq!(e, "boom"),
            _ => panic!("expected ready error"),
        }
    }

    #[tokio::test]
    async fn test_pending_chain() {
        let deferred = Deferred::pending(async {
            tokio::task::yield_now().await;
            3
        })
        .map(|n| n * 2);

        assert!(!deferred.is_ready());
        assert_eq!(deferred.await, 6);
    }

    #[tokio::test]
    async fn test_detach_spawns_on_runtime() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        Deferred::pending(async move {
            let _ = tx.send(7);
        })
        .detach("test");

        assert_eq!(rx.await.unwrap(), 7);
    }
}
