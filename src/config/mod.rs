//! Settings for file-backed persistence

mod settings;

pub use settings::{
    config_path, data_dir, Settings, TomlPersistConfig, TomlSettings, TomlStorageConfig,
};
