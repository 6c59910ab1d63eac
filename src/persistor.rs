//! Load/save orchestration
//!
//! The [`Persistor`] ties the transform pipeline, the envelope codec and the
//! migration registry to a storage engine, and broadcasts load outcomes to
//! any interested subscribers.
//!
//! Load order: raw load transforms, envelope parse, version check and
//! migrations, decoder, typed load transforms.
//! Save order: typed save transforms, envelope encode, raw save transforms,
//! storage write.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::codec;
use crate::error::{PersistError, Result, VersionMismatch};
use crate::migration::MigrationRegistry;
use crate::storage::StorageEngine;
use crate::transform::TransformPipeline;

/// Version meaning "unversioned": every registered migration runs forward.
pub const UNVERSIONED: i64 = -1;

/// Default capacity of the loaded-state and error broadcast channels.
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Turns migrated plain JSON into the application state.
pub type Decoder<T> = Box<dyn Fn(Value) -> anyhow::Result<T> + Send + Sync>;

/// Persistor configuration
///
/// Defaults: version [`UNVERSIONED`], no transforms, no migrations, serde
/// decoder, compact JSON, [`DEFAULT_EVENT_CAPACITY`].
pub struct PersistorConfig<T> {
    /// Version the running code expects
    pub version: i64,
    pub transforms: TransformPipeline<T>,
    pub migrations: MigrationRegistry,
    /// Custom decoder; `None` uses `serde_json::from_value`
    pub decoder: Option<Decoder<T>>,
    /// Write indented JSON
    pub pretty: bool,
    pub event_capacity: usize,
}

impl<T> Default for PersistorConfig<T> {
    fn default() -> Self {
        Self {
            version: UNVERSIONED,
            transforms: TransformPipeline::default(),
            migrations: MigrationRegistry::default(),
            decoder: None,
            pretty: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl<T> PersistorConfig<T> {
    pub fn new(version: i64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_transforms(mut self, transforms: TransformPipeline<T>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_migrations(mut self, migrations: MigrationRegistry) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl<T> fmt::Debug for PersistorConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistorConfig")
            .field("version", &self.version)
            .field("transforms", &self.transforms)
            .field("migrations", &self.migrations)
            .field("custom_decoder", &self.decoder.is_some())
            .field("pretty", &self.pretty)
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

/// Versioned load/save engine over a storage backend.
///
/// `load()` and `save()` hold no lock around the storage engine: two calls
/// issued back to back may complete in either order.
pub struct Persistor<T> {
    storage: Arc<dyn StorageEngine>,
    version: i64,
    transforms: TransformPipeline<T>,
    migrations: MigrationRegistry,
    decoder: Decoder<T>,
    pretty: bool,
    loaded: AtomicBool,
    loaded_tx: broadcast::Sender<Option<T>>,
    error_tx: broadcast::Sender<Arc<PersistError>>,
}

impl<T> Persistor<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Build a persistor, falling back to serde for decoding when the
    /// config carries no decoder.
    pub fn new(storage: Arc<dyn StorageEngine>, mut config: PersistorConfig<T>) -> Self {
        let decoder: Decoder<T> = match config.decoder.take() {
            Some(decoder) => decoder,
            None => Box::new(|value: Value| -> anyhow::Result<T> {
                Ok(serde_json::from_value(value)?)
            }),
        };
        Self::with_decoder(storage, config, decoder)
    }
}

impl<T> Persistor<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    /// Build a persistor with an explicit decoder (any decoder in `config`
    /// is ignored).
    pub fn with_decoder(
        storage: Arc<dyn StorageEngine>,
        config: PersistorConfig<T>,
        decoder: Decoder<T>,
    ) -> Self {
        let capacity = config.event_capacity.max(1);
        let (loaded_tx, _) = broadcast::channel(capacity);
        let (error_tx, _) = broadcast::channel(capacity);
        Self {
            storage,
            version: config.version,
            transforms: config.transforms,
            migrations: config.migrations,
            decoder,
            pretty: config.pretty,
            loaded: AtomicBool::new(false),
            loaded_tx,
            error_tx,
        }
    }

    /// Target version
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Whether a load has succeeded at least once
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Subscribe to successful load outcomes. Only loads that finish after
    /// this call are delivered.
    pub fn subscribe_loaded(&self) -> broadcast::Receiver<Option<T>> {
        self.loaded_tx.subscribe()
    }

    /// Subscribe to errors reported through [`Persistor::publish_error`].
    pub fn subscribe_errors(&self) -> broadcast::Receiver<Arc<PersistError>> {
        self.error_tx.subscribe()
    }

    /// Broadcast an error to current error subscribers.
    pub fn publish_error(&self, error: Arc<PersistError>) {
        if self.error_tx.send(error).is_err() {
            tracing::trace!("No error subscribers");
        }
    }

    /// Read, migrate and decode the stored state.
    ///
    /// Returns `Ok(None)` when storage holds nothing. On success the
    /// outcome is also broadcast to loaded-state subscribers; failures are
    /// only returned.
    pub async fn load(&self) -> Result<Option<T>> {
        let raw = self.storage.load().await?;

        let state = match raw {
            Some(raw) if !raw.is_empty() => Some(self.restore(raw)?),
            _ => {
                tracing::debug!("No persisted state found");
                None
            }
        };

        if !self.loaded.swap(true, Ordering::SeqCst) {
            tracing::info!(
                version = self.version,
                restored = state.is_some(),
                "Initial state load complete"
            );
        }

        if self.loaded_tx.send(state.clone()).is_err() {
            tracing::trace!("No loaded-state subscribers");
        }
        Ok(state)
    }

    fn restore(&self, raw: String) -> Result<T> {
        let raw = self.transforms.apply_load_raw(raw)?;
        let envelope = codec::decode(&raw)?;
        let saved = envelope.version;

        if saved > self.version {
            return Err(PersistError::InvalidVersion {
                saved,
                target: self.version,
                reason: VersionMismatch::Downgrade,
            });
        }

        let plain = if saved < self.version {
            tracing::debug!(saved, target = self.version, "Migrating persisted state");
            self.migrations.resolve(saved, self.version, envelope.state)?
        } else {
            envelope.state
        };

        let state = (self.decoder)(plain).map_err(|e| PersistError::transformation("decoder", e))?;
        self.transforms.apply_load_typed(state)
    }

    /// Transform, encode and write `state`.
    ///
    /// Successful saves publish nothing.
    pub async fn save(&self, state: T) -> Result<()> {
        let raw = {
            let state = self.transforms.apply_save_typed(state)?;
            let raw = codec::encode(&state, self.version, self.pretty)?;
            self.transforms.apply_save_raw(raw)?
        };

        tracing::debug!(version = self.version, bytes = raw.len(), "Saving state");
        self.storage.save(&raw).await?;
        Ok(())
    }
}

impl<T> fmt::Debug for Persistor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistor")
            .field("version", &self.version)
            .field("loaded", &self.loaded.load(Ordering::SeqCst))
            .field("transforms", &self.transforms)
            .field("migrations", &self.migrations)
            .finish()
    }
}
