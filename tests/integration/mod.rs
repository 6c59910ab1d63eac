//! Integration tests for statekeep
//!
//! These tests drive the persistor through a store and its middleware, and
//! exercise the CLI binary.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod scenarios;
