//! Scenario files and the runner that executes them
//!
//! A scenario file is YAML: a named feature holding scenarios, each an
//! ordered list of step phrases. Phrases are parsed into [`Step`]s and run
//! against the engine.

mod config;
mod runner;
mod steps;

pub use config::{Scenario, ScenarioFile, StepSpec};
pub use runner::{any_failed, check_file, CheckResult, Runner, ScenarioResult, SuiteResult};
pub use steps::{parse_step, DumpTarget, ResetTarget, Step, VariableKind};
