//! Contract-testing engine
//!
//! Scenario state, template rendering, request execution and the assertion
//! strategies that steps are built from.

pub mod assertions;
pub mod context;
pub mod executor;
pub mod graphql;
pub mod matching;
pub mod query;
pub mod template;
pub mod value;

pub use assertions::Expectation;
pub use context::{LastResponse, ScenarioContext, Seed, Source};
pub use executor::HttpExecutor;
pub use query::{Dialect, QueryEvaluator};
pub use value::{Memory, Value};
