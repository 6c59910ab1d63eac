//! Shared test utilities for statekeep
//!
//! - A small counter application (state, actions, reducer)
//! - An action-recording middleware
//! - Store/persistor wiring helpers


pub use app::*;
