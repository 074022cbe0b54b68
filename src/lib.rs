//! apiprobe - behavior-driven contract testing for HTTP and GraphQL APIs
//!
//! The [`engine`] holds scenario state, sends requests and evaluates
//! assertions; [`testing`] parses scenario files and runs them.

pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{Dialect, Expectation, HttpExecutor, ScenarioContext, Seed, Source, Value};
