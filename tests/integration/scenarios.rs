//! Load scenarios driven through the store middleware
//!
//! Covers empty storage, full and partial migration chains, and a stored
//! version newer than the running code.

use std::sync::Arc;

use statekeep::{
    Dispatcher, MemoryStorage, PersistError, PersistorConfig, StartError, VersionMismatch,
};

use super::common::{build_app, counter_migrations, AppAction, CounterState};

/// Empty storage: the loaded action carries nothing and no error is raised
#[tokio::test]
async fn test_empty_storage_loads_absent() {
    let storage = MemoryStorage::new();
    let app = build_app(
        Arc::new(storage.clone()),
        PersistorConfig::new(1).with_migrations(counter_migrations()),
    );
    let mut errors = app.persist.persistor().subscribe_errors();

    let restored = app.persist.start(&app.store).await.unwrap();

    assert_eq!(restored, None);
    assert!(app.log.contains(|a| *a == AppAction::Loaded(None)));
    assert!(!app.log.contains(|a| *a == AppAction::PersistFailed));
    assert!(errors.try_recv().is_err());
    assert_eq!(app.store.state(), CounterState::default());
}

/// Unversioned data runs every migration from below version 0
#[tokio::test]
async fn test_unversioned_data_runs_full_chain() {
    let storage = MemoryStorage::with_content(r#"{"version": -1}"#);
    let app = build_app(
        Arc::new(storage.clone()),
        PersistorConfig::new(1).with_migrations(counter_migrations()),
    );

    let restored = app.persist.start(&app.store).await.unwrap();

    assert_eq!(restored, Some(CounterState { counter: 6 }));
    assert_eq!(app.store.state().counter, 6);
    // the loaded action re-saves the state at the target version
    assert_eq!(
        storage.content().as_deref(),
        Some(r#"{"version":1,"state":{"counter":6}}"#)
    );
}

/// Data at version 0 only needs the migration to version 1
#[tokio::test]
async fn test_version_zero_runs_single_migration() {
    let storage = MemoryStorage::with_content(r#"{"version": 0, "state": {"counter": 0}}"#);
    let app = build_app(
        Arc::new(storage),
        PersistorConfig::new(1).with_migrations(counter_migrations()),
    );

    let restored = app.persist.start(&app.store).await.unwrap();

    assert_eq!(restored, Some(CounterState { counter: 1 }));
}

/// Data from a newer version fails; only the error action is dispatched
#[tokio::test]
async fn test_future_version_signals_error_only() {
    let storage = MemoryStorage::with_content(r#"{"version": 5}"#);
    let app = build_app(
        Arc::new(storage.clone()),
        PersistorConfig::new(1).with_migrations(counter_migrations()),
    );
    let mut errors = app.persist.persistor().subscribe_errors();

    let err = app.persist.start(&app.store).await.unwrap_err();

    match err {
        StartError::Load(error) => assert!(matches!(
            *error,
            PersistError::InvalidVersion {
                saved: 5,
                target: 1,
                reason: VersionMismatch::Downgrade
            }
        )),
        other => panic!("Expected load failure, got {:?}", other),
    }
    assert_eq!(errors.recv().await.unwrap().kind(), "invalid_version");
    assert!(app.log.contains(|a| *a == AppAction::PersistFailed));
    assert!(!app.log.contains(|a| matches!(a, AppAction::Loaded(_))));
    assert!(!app.persist.persistor().is_loaded());
    // stored data is left untouched
    assert!(storage.writes().is_empty());
}

/// A gap in the registry fails the load without running any migration
#[tokio::test]
async fn test_registry_gap_is_invalid_version() {
    let storage = MemoryStorage::with_content(r#"{"version": 1, "state": {"counter": 3}}"#);
    let app = build_app(
        Arc::new(storage),
        PersistorConfig::new(3).with_migrations(counter_migrations()),
    );

    let err = app.persist.start(&app.store).await.unwrap_err();

    assert!(matches!(
        err,
        StartError::Load(ref e) if matches!(
            **e,
            PersistError::InvalidVersion {
                reason: VersionMismatch::NoMigrationPath { stuck_at: 1 },
                ..
            }
        )
    ));
}

/// Ordinary actions persist the reduced state
#[tokio::test]
async fn test_actions_persist_reduced_state() {
    let storage = MemoryStorage::new();
    let app = build_app(Arc::new(storage.clone()), PersistorConfig::new(1));

    app.persist.start(&app.store).await.unwrap();
    app.store.dispatch(AppAction::Increment).await;
    app.store.dispatch(AppAction::Increment).await;

    assert_eq!(
        storage.writes().last().map(String::as_str),
        Some(r#"{"version":1,"state":{"counter":2}}"#)
    );
}

/// Save failures are reported on the error stream and never escape dispatch
#[tokio::test]
async fn test_save_failure_reported_through_stream() {
    let storage = MemoryStorage::new().failing_save("disk full");
    let app = build_app(Arc::new(storage), PersistorConfig::new(1));
    let mut errors = app.persist.persistor().subscribe_errors();

    app.store.dispatch(AppAction::Set(4)).await;

    let error = errors.recv().await.unwrap();
    assert!(error.to_string().contains("disk full"));
    assert_eq!(app.store.state().counter, 4);
    assert_eq!(
        app.log.actions(),
        vec![AppAction::PersistFailed, AppAction::Set(4)]
    );
}
