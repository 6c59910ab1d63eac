//! Store middleware driving the persistor from dispatched actions
//!
//! A load-request action triggers `load()` and is followed by a loaded
//! action; the error action is ignored; every other action saves the
//! current state. Failures never reach the dispatcher: they are published
//! on the persistor's error stream and signalled with an error action.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::error::PersistError;
use crate::persistor::Persistor;
use crate::store::{Dispatcher, Middleware};

/// Classification of a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Restore state from storage
    LoadRequested,
    /// A persistence failure was reported; never triggers a save
    ErrorOccurred,
    /// Anything else; triggers a save of the reduced state
    Other,
}

/// Actions understood by [`PersistMiddleware`].
///
/// `S` is the store state, which is also the persisted state.
pub trait PersistAction<S>: Send + Sync + 'static {
    fn signal(&self) -> Signal;

    /// The action `start` dispatches
    fn load_requested() -> Self;

    /// Carries the load result, `None` when nothing was stored
    fn loaded(state: Option<S>) -> Self;

    /// Signals a failure; details are on the error stream
    fn error_occurred() -> Self;
}

/// Errors returned by [`PersistMiddleware::start`].
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Initial load failed: {0}")]
    Load(Arc<PersistError>),
    #[error("Persistor event streams closed before the initial load finished")]
    StreamsClosed,
}

/// Middleware connecting a store to a [`Persistor`].
pub struct PersistMiddleware<T> {
    persistor: Arc<Persistor<T>>,
}

impl<T> Clone for PersistMiddleware<T> {
    fn clone(&self) -> Self {
        Self {
            persistor: self.persistor.clone(),
        }
    }
}

impl<T> PersistMiddleware<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    pub fn new(persistor: Arc<Persistor<T>>) -> Self {
        Self { persistor }
    }

    pub fn persistor(&self) -> &Arc<Persistor<T>> {
        &self.persistor
    }

    /// Request the initial load and wait for its outcome.
    ///
    /// Both event streams are subscribed before the request is dispatched.
    /// Calling this twice concurrently on the same store is not supported:
    /// each call may observe the other's outcome.
    pub async fn start<A, D>(&self, store: &D) -> Result<Option<T>, StartError>
    where
        A: PersistAction<T>,
        D: Dispatcher<T, A> + ?Sized,
    {
        let mut loaded = self.persistor.subscribe_loaded();
        let mut errors = self.persistor.subscribe_errors();

        store.dispatch(A::load_requested()).await;

        tokio::select! {
            biased;
            Ok(state) = loaded.recv() => Ok(state),
            Ok(error) = errors.recv() => Err(StartError::Load(error)),
            else => Err(StartError::StreamsClosed),
        }
    }

    async fn report<A>(
        &self,
        store: &dyn Dispatcher<T, A>,
        operation: &'static str,
        error: PersistError,
    ) where
        A: PersistAction<T>,
    {
        tracing::warn!(operation, kind = error.kind(), error = %error, "Persistence failed");
        self.persistor.publish_error(Arc::new(error));
        store.dispatch(A::error_occurred()).await;
    }
}

#[async_trait]
impl<T, A> Middleware<T, A> for PersistMiddleware<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
    A: PersistAction<T>,
{
    async fn after_dispatch(&self, store: &dyn Dispatcher<T, A>, action: &A) {
        match action.signal() {
            Signal::LoadRequested => match self.persistor.load().await {
                Ok(state) => store.dispatch(A::loaded(state)).await,
                Err(error) => self.report(store, "load", error).await,
            },
            Signal::ErrorOccurred => {}
            Signal::Other => {
                if let Err(error) = self.persistor.save(store.state()).await {
                    self.report(store, "save", error).await;
                }
            }
        }
    }
}

impl<T> fmt::Debug for PersistMiddleware<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistMiddleware")
            .field("persistor", &self.persistor)
            .finish()
    }
}
