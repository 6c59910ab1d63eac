//! Ordered load/save transform pipeline
//!
//! Raw transforms run on the serialized envelope string; typed transforms
//! run on the decoded application state. Each list runs strictly in the
//! order it was declared.

use std::fmt;

use crate::error::{PersistError, Result};

/// Transform over the decoded application state.
pub type TypedTransform<T> = Box<dyn Fn(T) -> anyhow::Result<T> + Send + Sync>;

/// Transform over the serialized envelope string.
pub type RawTransform = Box<dyn Fn(String) -> anyhow::Result<String> + Send + Sync>;

/// Which direction a transform runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    Save,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Save => "save",
        }
    }
}

/// Typed and raw transforms for both phases.
pub struct TransformPipeline<T> {
    typed_on_load: Vec<TypedTransform<T>>,
    typed_on_save: Vec<TypedTransform<T>>,
    raw_on_load: Vec<RawTransform>,
    raw_on_save: Vec<RawTransform>,
}

impl<T> Default for TransformPipeline<T> {
    fn default() -> Self {
        Self {
            typed_on_load: Vec::new(),
            typed_on_save: Vec::new(),
            raw_on_load: Vec::new(),
            raw_on_save: Vec::new(),
        }
    }
}

impl<T> TransformPipeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a typed transform to the given phase.
    pub fn typed<F>(mut self, phase: Phase, transform: F) -> Self
    where
        F: Fn(T) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        match phase {
            Phase::Load => self.typed_on_load.push(Box::new(transform)),
            Phase::Save => self.typed_on_save.push(Box::new(transform)),
        }
        self
    }

    /// Append a raw string transform to the given phase.
    pub fn raw<F>(mut self, phase: Phase, transform: F) -> Self
    where
        F: Fn(String) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        match phase {
            Phase::Load => self.raw_on_load.push(Box::new(transform)),
            Phase::Save => self.raw_on_save.push(Box::new(transform)),
        }
        self
    }

    pub fn apply_load_raw(&self, raw: String) -> Result<String> {
        apply_all(&self.raw_on_load, raw, "raw", Phase::Load)
    }

    pub fn apply_save_raw(&self, raw: String) -> Result<String> {
        apply_all(&self.raw_on_save, raw, "raw", Phase::Save)
    }

    pub fn apply_load_typed(&self, state: T) -> Result<T> {
        apply_all(&self.typed_on_load, state, "typed", Phase::Load)
    }

    pub fn apply_save_typed(&self, state: T) -> Result<T> {
        apply_all(&self.typed_on_save, state, "typed", Phase::Save)
    }

    pub fn is_empty(&self) -> bool {
        self.typed_on_load.is_empty()
            && self.typed_on_save.is_empty()
            && self.raw_on_load.is_empty()
            && self.raw_on_save.is_empty()
    }
}

fn apply_all<V>(
    transforms: &[Box<dyn Fn(V) -> anyhow::Result<V> + Send + Sync>],
    value: V,
    kind: &str,
    phase: Phase,
) -> Result<V> {
    transforms
        .iter()
        .enumerate()
        .try_fold(value, |value, (index, transform)| {
            transform(value).map_err(|e| {
                PersistError::transformation(
                    format!("{} {} transform #{}", kind, phase.as_str(), index),
                    e,
                )
            })
        })
}

impl<T> fmt::Debug for TransformPipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("typed_on_load", &self.typed_on_load.len())
            .field("typed_on_save", &self.typed_on_save.len())
            .field("raw_on_load", &self.raw_on_load.len())
            .field("raw_on_save", &self.raw_on_save.len())
            .finish()
    }
}
