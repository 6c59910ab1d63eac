pub mod codec;
pub mod config;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod persistor;
pub mod storage;
pub mod store;
pub mod transform;

pub use codec::VersionedEnvelope;
pub use config::Settings;
pub use error::{PersistError, Result, StorageError, VersionMismatch};
pub use middleware::{PersistAction, PersistMiddleware, Signal, StartError};
pub use migration::{MigrationFn, MigrationRegistry};
pub use persistor::{Decoder, Persistor, PersistorConfig, DEFAULT_EVENT_CAPACITY, UNVERSIONED};
pub use storage::{FileStorage, MemoryStorage, StorageEngine};
pub use store::{Dispatcher, Middleware, ReducerStore};
pub use transform::{Phase, RawTransform, TransformPipeline, TypedTransform};
