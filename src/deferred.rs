//! Deferred results
//!
//! A [`Deferred`] is the handle every asynchronous operation in this crate
//! returns: connection acquisition, query submission, stream reads and
//! entity creation. It is a boxed future resolving exactly once to
//! `Ok(value)` or `Err(OgmError)`.
//!
//! Multi-step operations are built with the sequencing combinators instead
//! of nested callbacks:
//!
//! ```ignore
//! pool.acquire()
//!     .and_then(move |conn| conn.send(request))   // runs only if acquire succeeded
//!     .map(|stream| Ok(Some(stream)))             // fallible transformation
//! ```
//!
//! Each combinator wraps the previous deferred, so continuations run in the
//! order they were attached and a failure skips every later stage.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::errors::{OgmError, Result};

/// A value that becomes available later, or a failure.
#[must_use = "a deferred does nothing unless awaited or spawned"]
pub struct Deferred<T> {
    inner: BoxFuture<'static, Result<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap a future.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Deferred {
            inner: future.boxed(),
        }
    }

    /// A deferred that is already resolved.
    pub fn resolved(value: T) -> Self {
        Self::new(future::ready(Ok(value)))
    }

    /// A deferred that has already failed.
    pub fn failed(err: OgmError) -> Self {
        Self::new(future::ready(Err(err)))
    }

    /// Chain an asynchronous continuation that runs after success.
    pub fn and_then<U, F>(self, continuation: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        Deferred::new(async move {
            let value = self.await?;
            continuation(value).await
        })
    }

    /// Chain a synchronous, fallible transformation.
    pub fn map<U, F>(self, transform: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        Deferred::new(async move { transform(self.await?) })
    }

    /// Rewrite the failure, leaving success untouched.
    pub fn map_err<F>(self, rewrite: F) -> Deferred<T>
    where
        F: FnOnce(OgmError) -> OgmError + Send + 'static,
    {
        Deferred::new(async move { self.await.map_err(rewrite) })
    }

    /// Start driving this deferred on the current tokio runtime.
    ///
    /// The work runs to completion even if the returned handle is dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> Deferred<T> {
        let handle = tokio::spawn(self.inner);
        Deferred::new(async move {
            handle
                .await
                .map_err(|e| OgmError::Transport(format!("deferred task failed: {}", e)))?
        })
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Deferred")
    }
}
