//! Host store interface
//!
//! The persistence middleware only needs three things from a store: read the
//! current state, dispatch an action, and run after each action has been
//! reduced. [`ReducerStore`] is a minimal store providing exactly that.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Read and dispatch access to a store.
#[async_trait]
pub trait Dispatcher<S, A>: Send + Sync {
    /// Snapshot of the current state
    fn state(&self) -> S;

    /// Run `action` through the reducer and every middleware
    async fn dispatch(&self, action: A);
}

/// Hook run after the reducer has applied an action.
///
/// Middleware sees every action unchanged and cannot block it from reaching
/// the reducer.
#[async_trait]
pub trait Middleware<S, A>: Send + Sync {
    async fn after_dispatch(&self, store: &dyn Dispatcher<S, A>, action: &A);
}

type Reducer<S, A> = Box<dyn Fn(&S, &A) -> S + Send + Sync>;

/// Single-threaded reducer store with post-dispatch middleware.
pub struct ReducerStore<S, A> {
    state: Mutex<S>,
    reducer: Reducer<S, A>,
    middleware: Vec<Arc<dyn Middleware<S, A>>>,
}

impl<S, A> ReducerStore<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    pub fn new<F>(initial: S, reducer: F) -> Self
    where
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(initial),
            reducer: Box::new(reducer),
            middleware: Vec::new(),
        }
    }

    /// Append middleware; middleware runs in registration order.
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware<S, A>>) -> Self {
        self.middleware.push(middleware);
        self
    }
}

#[async_trait]
impl<S, A> Dispatcher<S, A> for ReducerStore<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    fn state(&self) -> S {
        self.state.lock().clone()
    }

    async fn dispatch(&self, action: A) {
        {
            let mut state = self.state.lock();
            let next = (self.reducer)(&*state, &action);
            *state = next;
        }

        for middleware in &self.middleware {
            middleware.after_dispatch(self, &action).await;
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for ReducerStore<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerStore")
            .field("state", &*self.state.lock())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
