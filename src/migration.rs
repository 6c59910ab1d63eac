//! Migration registry and version-chain resolution.
//!
//! A migration registered at version `v` turns state shaped for the closest
//! lower version into state shaped for `v`. Resolution always takes the
//! smallest forward step, so each migration only ever sees the shape it was
//! written against.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use serde_json::Value;

use crate::error::{PersistError, Result, VersionMismatch};

/// A single migration step over plain JSON state.
pub type MigrationFn = Box<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync>;

/// Migrations keyed by the version they produce.
///
/// Keys are unique by construction; they need not be contiguous.
#[derive(Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<i64, MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration producing `version` (builder style).
    pub fn with<F>(mut self, version: i64, migration: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.insert(version, migration);
        self
    }

    /// Register a migration producing `version`, replacing any previous one.
    pub fn insert<F>(&mut self, version: i64, migration: F)
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        if self.migrations.insert(version, Box::new(migration)).is_some() {
            tracing::warn!(version, "Replacing previously registered migration");
        }
    }

    /// Registered versions in ascending order
    pub fn versions(&self) -> Vec<i64> {
        self.migrations.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Compute the ordered list of migration versions that bring `saved` to
    /// `target`, without running any of them.
    ///
    /// Fails with [`PersistError::InvalidVersion`] when `saved > target` or
    /// when some intermediate version has no registered step up to `target`.
    pub fn plan(&self, saved: i64, target: i64) -> Result<Vec<i64>> {
        let steps = self.steps(saved, target)?;
        Ok(steps.into_iter().map(|(version, _)| version).collect())
    }

    /// Migrate `state` from `saved` to `target`.
    ///
    /// The whole path is planned before the first migration runs, so a gap
    /// in the registry fails without invoking anything. A failing migration
    /// is reported as [`PersistError::Transformation`].
    pub fn resolve(&self, saved: i64, target: i64, state: Value) -> Result<Value> {
        let steps = self.steps(saved, target)?;
        steps.into_iter().try_fold(state, |state, (version, migration)| {
            tracing::debug!(version, "Applying migration");
            migration(state).map_err(|e| {
                PersistError::transformation(format!("migration to version {}", version), e)
            })
        })
    }

    fn steps(&self, saved: i64, target: i64) -> Result<Vec<(i64, &MigrationFn)>> {
        if saved > target {
            return Err(PersistError::InvalidVersion {
                saved,
                target,
                reason: VersionMismatch::Downgrade,
            });
        }

        let mut steps = Vec::new();
        let mut current = saved;
        while current < target {
            let next = self
                .migrations
                .range((Bound::Excluded(current), Bound::Included(target)))
                .next();

            match next {
                Some((&version, migration)) => {
                    steps.push((version, migration));
                    current = version;
                }
                None => {
                    return Err(PersistError::InvalidVersion {
                        saved,
                        target,
                        reason: VersionMismatch::NoMigrationPath { stuck_at: current },
                    });
                }
            }
        }
        Ok(steps)
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.versions())
            .finish()
    }
}

/// Free-function form of [`MigrationRegistry::resolve`].
pub fn resolve(
    saved: i64,
    target: i64,
    state: Value,
    registry: &MigrationRegistry,
) -> Result<Value> {
    registry.resolve(saved, target, state)
}
