//! Shared test utilities for logtide integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Time-dependent helpers assume `start_paused = true`.

#![allow(dead_code)]

pub mod assertions;
pub mod builders;
pub mod fake_log_backend;
pub mod fixtures;

pub use builders::*;
pub use fake_log_backend::FakeLogBackend;
pub use fixtures::*;
