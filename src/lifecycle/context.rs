//! Shared, one-shot cancellation context.

use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Boxed error returned by watchers and accepted as a notification reason.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Reason attached to a completed context.
pub type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// Completion signal shared between every watcher and the hosting application.
///
/// The context starts active and completes exactly once. The first completion
/// records its cause; later attempts are ignored.
#[derive(Clone)]
pub struct ShutdownContext {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    state: Mutex<State>,
    parent: Option<ShutdownContext>,
}

#[derive(Default)]
struct State {
    completed: bool,
    cause: Option<Cause>,
}

impl ShutdownContext {
    /// Create a root context that only completes when cancelled directly.
    pub fn new() -> Self {
        Self::from_parts(CancellationToken::new(), None)
    }

    /// Create a context that also completes when `self` completes.
    pub fn child(&self) -> Self {
        Self::from_parts(self.inner.token.child_token(), Some(self.clone()))
    }

    fn from_parts(token: CancellationToken, parent: Option<ShutdownContext>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                state: Mutex::new(State::default()),
                parent,
            }),
        }
    }

    /// Complete the context without a cause.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn cancel(&self) -> bool {
        self.cancel_with(None)
    }

    /// Complete the context, recording `cause` if this is the first completion.
    pub fn cancel_with(&self, cause: Option<Cause>) -> bool {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        // A parent completion cancels the token without going through this lock.
        if state.completed || self.inner.token.is_cancelled() {
            return false;
        }
        state.completed = true;
        state.cause = cause;
        self.inner.token.cancel();
        true
    }

    /// Whether the context has completed.
    pub fn is_done(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Wait until the context completes.
    pub fn done(&self) -> WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    /// Owned variant of [`done`](Self::done), for APIs that need a `'static` future.
    pub async fn into_done(self) {
        self.inner.token.cancelled().await
    }

    /// Cause of completion.
    ///
    /// `None` while active, or when the context was released without a cause.
    pub fn cause(&self) -> Option<Cause> {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.completed {
            return state.cause.clone();
        }
        drop(state);

        match &self.inner.parent {
            Some(parent) if self.is_done() => parent.cause(),
            _ => None,
        }
    }

    /// A token cancelled together with this context.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }
}

impl Default for ShutdownContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownContext")
            .field("done", &self.is_done())
            .field("cause", &self.cause().map(|c| c.to_string()))
            .finish()
    }
}
