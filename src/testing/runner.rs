//! Scenario runner
//!
//! Runs the scenarios of a file in order against one executor. Each scenario
//! starts from a reset context; the first failing step fails it and skips
//! the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::common::paths::resolve_relative;
use crate::common::Result;
use crate::engine::assertions;
use crate::engine::{HttpExecutor, ScenarioContext, Seed, Source, Value};

use super::config::{Scenario, ScenarioFile, StepSpec};
use super::steps::{parse_step, DumpTarget, ResetTarget, Step, VariableKind};

/// Result of one scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Result of one scenario file
#[derive(Debug)]
pub struct SuiteResult {
    pub name: String,
    pub path: PathBuf,
    pub scenarios: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.passed)
    }

    pub fn failed(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.passed).count()
    }
}

/// Result of checking a file without running it
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub steps_total: usize,
    pub problems: Vec<String>,
}

/// Runs scenario files against a shared executor and seed
pub struct Runner {
    executor: HttpExecutor,
    seed: Arc<Seed>,
    fail_fast: bool,
    verbose: bool,
}

impl Runner {
    pub fn new(executor: HttpExecutor, seed: Arc<Seed>) -> Self {
        Self {
            executor,
            seed,
            fail_fast: false,
            verbose: false,
        }
    }

    /// Stop after the first failed scenario
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Load and run a scenario file
    pub async fn run_file(&self, path: &Path) -> Result<SuiteResult> {
        let file = ScenarioFile::load(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut result = self.run_suite(&file, base_dir).await;
        result.path = path.to_path_buf();
        Ok(result)
    }

    /// Run every scenario of `file`; relative paths in steps resolve against `base_dir`
    pub async fn run_suite(&self, file: &ScenarioFile, base_dir: &Path) -> SuiteResult {
        println!(
            "\n{} {}",
            "Feature:".blue().bold(),
            file.name.white().bold()
        );
        if let Some(desc) = &file.description {
            println!("  {}", desc.dimmed());
        }

        let mut ctx = ScenarioContext::new(Arc::clone(&self.seed));
        let mut scenarios = Vec::with_capacity(file.scenarios.len());

        for scenario in &file.scenarios {
            let result = self
                .run_scenario(&mut ctx, &file.background, scenario, base_dir)
                .await;
            let stop = !result.passed && self.fail_fast;
            scenarios.push(result);
            if stop {
                tracing::debug!("fail-fast: skipping remaining scenarios");
                break;
            }
        }

        let suite = SuiteResult {
            name: file.name.clone(),
            path: PathBuf::new(),
            scenarios,
        };
        if suite.passed() {
            println!(
                "\n{} {}\n",
                "✓".green().bold(),
                format!("{} scenario(s) passed", suite.scenarios.len()).green().bold()
            );
        } else {
            println!(
                "\n{} {}\n",
                "✗".red().bold(),
                format!(
                    "{} of {} scenario(s) failed",
                    suite.failed(),
                    suite.scenarios.len()
                )
                .red()
                .bold()
            );
        }
        suite
    }

    async fn run_scenario(
        &self,
        ctx: &mut ScenarioContext,
        background: &[StepSpec],
        scenario: &Scenario,
        base_dir: &Path,
    ) -> ScenarioResult {
        println!("\n{} {}", "Scenario:".cyan(), scenario.name.white());
        self.executor.reset_scenario(ctx).await;

        let steps: Vec<&StepSpec> = background.iter().chain(&scenario.steps).collect();
        let steps_total = steps.len();

        for (i, spec) in steps.iter().enumerate() {
            let step_num = i + 1;
            match self.execute_step(ctx, spec, base_dir).await {
                Ok(()) => {
                    println!("  {} {}", "✓".green(), spec.phrase().dimmed());
                    if self.verbose {
                        if let Some(doc) = spec.doc() {
                            for line in doc.lines() {
                                println!("      {}", line.dimmed());
                            }
                        }
                    }
                }
                Err(e) => {
                    println!("  {} {}", "✗".red(), spec.phrase());
                    println!("    {}", e.to_string().red());
                    return ScenarioResult {
                        name: scenario.name.clone(),
                        passed: false,
                        steps_run: step_num,
                        steps_total,
                        error: Some(e.to_string()),
                    };
                }
            }
        }

        ScenarioResult {
            name: scenario.name.clone(),
            passed: true,
            steps_run: steps_total,
            steps_total,
            error: None,
        }
    }

    async fn execute_step(
        &self,
        ctx: &mut ScenarioContext,
        spec: &StepSpec,
        base_dir: &Path,
    ) -> Result<()> {
        let step = parse_step(spec.phrase(), spec.doc())?;
        tracing::trace!(step = ?step, "executing step");

        match step {
            Step::Send { method, path, body } => {
                self.executor.execute(ctx, &method, &path, &body).await
            }
            Step::Status(code) => assertions::assert_status(ctx, code),
            Step::Header { name, value } => assertions::assert_header(ctx, &name, &value),
            Step::BodyExact { source, expected } => {
                assertions::assert_exact(ctx, source, &expected)
            }
            Step::BodyJson { source, expected } => assertions::assert_json(ctx, source, &expected),
            Step::BodySubset { source, expected } => {
                assertions::assert_subset(ctx, source, &expected)
            }
            Step::Query {
                source,
                dialect,
                query,
                expectation,
            } => assertions::assert_query(ctx, source, dialect, &query, &expectation),
            Step::RememberQuery {
                dialect,
                query,
                key,
            } => ctx.remember_query(Source::Body, dialect, &query, &key),
            Step::Remember { key, value } => {
                let rendered = ctx.render_required(&value)?;
                ctx.remember(key, rendered);
                Ok(())
            }
            Step::SetVariable { key, kind, value } => set_variable(ctx, key, kind, &value),
            Step::SetHeader { name, value } => ctx.set_header(&name, &value),
            Step::ExecuteQuery(key) => self.executor.execute_graphql(ctx, &key).await,
            Step::Wait(secs) => {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok(())
            }
            Step::Dump(target) => {
                match target {
                    DumpTarget::Memory => ctx.dump_memory(),
                    DumpTarget::Variables => ctx.dump_variables(),
                    DumpTarget::Headers => ctx.dump_headers(),
                    DumpTarget::ResponseHeaders => ctx.dump_response_headers(),
                    DumpTarget::ResponseJson => println!("{}", ctx.pretty_body()),
                }
                Ok(())
            }
            Step::Reset(target) => {
                match target {
                    ResetTarget::Headers => ctx.reset_headers(),
                    ResetTarget::Variables => ctx.reset_variables(),
                    ResetTarget::Memory => ctx.reset_memory(),
                }
                Ok(())
            }
            Step::LoadDirectory(dir) => {
                let dir = ctx.render_required(&dir)?;
                let dir = if dir.is_empty() {
                    PathBuf::new()
                } else {
                    resolve_relative(base_dir, Path::new(&dir))
                };
                let loaded = ctx.load_directory(&dir)?;
                tracing::debug!(dir = %dir.display(), loaded, "loaded directory into memory");
                Ok(())
            }
        }
    }
}

fn set_variable(
    ctx: &mut ScenarioContext,
    key: String,
    kind: VariableKind,
    text: &str,
) -> Result<()> {
    let value = match kind {
        VariableKind::String => Value::String(ctx.render_required(text)?),
        VariableKind::StringList => Value::parse_list(text),
        VariableKind::Number => Value::Integer(Value::parse_integer(text)?),
        VariableKind::Float => Value::Float(Value::parse_float(text)?),
        VariableKind::Boolean => Value::Boolean(Value::parse_bool(text)?),
    };
    ctx.set_variable(key, value);
    Ok(())
}

/// Parse a scenario file and all of its step phrases without running anything
pub fn check_file(path: &Path) -> Result<CheckResult> {
    let file = ScenarioFile::load(path)?;
    let mut problems = Vec::new();
    let mut steps_total = file.background.len();

    for (i, spec) in file.background.iter().enumerate() {
        if let Err(e) = parse_step(spec.phrase(), spec.doc()) {
            problems.push(format!("background, step {}: {}", i + 1, e));
        }
    }
    for scenario in &file.scenarios {
        steps_total += scenario.steps.len();
        for (i, spec) in scenario.steps.iter().enumerate() {
            if let Err(e) = parse_step(spec.phrase(), spec.doc()) {
                problems.push(format!("{}, step {}: {}", scenario.name, i + 1, e));
            }
        }
    }

    Ok(CheckResult {
        name: file.name,
        steps_total,
        problems,
    })
}

/// Whether a run of these suites should exit with failure
pub fn any_failed(suites: &[SuiteResult]) -> bool {
    suites.iter().any(|s| !s.passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::HttpConfig;
    use crate::common::Error;
    use reqwest::cookie::Jar;

    fn runner() -> Runner {
        let executor = HttpExecutor::new(Arc::new(Jar::default()), &HttpConfig::default()).unwrap();
        Runner::new(executor, Arc::new(Seed::default()))
    }

    #[test]
    fn test_set_variable_kinds() {
        let mut ctx = ScenarioContext::new(Arc::new(Seed::default()));
        ctx.remember("NAME", "Ann");
        set_variable(&mut ctx, "name".into(), VariableKind::String, "{{.NAME}}").unwrap();
        set_variable(&mut ctx, "tags".into(), VariableKind::StringList, "a,{{.NAME}}").unwrap();
        set_variable(&mut ctx, "id".into(), VariableKind::Number, "7").unwrap();
        set_variable(&mut ctx, "ok".into(), VariableKind::Boolean, "T").unwrap();

        let vars = ctx.variables();
        assert_eq!(vars.get("name"), Some(&Value::from("Ann")));
        assert_eq!(
            vars.get("tags"),
            Some(&Value::List(vec!["a".into(), "{{.NAME}}".into()]))
        );
        assert_eq!(vars.get("id"), Some(&Value::Integer(7)));
        assert_eq!(vars.get("ok"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_invalid_typed_variable_fails_without_storing() {
        let mut ctx = ScenarioContext::new(Arc::new(Seed::default()));
        let err = set_variable(&mut ctx, "ok".into(), VariableKind::Boolean, "yes").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { kind: "boolean", .. }));
        assert!(set_variable(&mut ctx, "n".into(), VariableKind::Float, "x").is_err());
        assert!(ctx.variables().is_empty());
    }

    #[tokio::test]
    async fn test_first_failing_step_stops_scenario() {
        let file = ScenarioFile::parse(
            r#"
name: local only
scenarios:
  - name: fails on second step
    steps:
      - I remember "A" as "1"
      - I set variable "flag" as boolean "maybe"
      - I remember "B" as "2"
  - name: passes
    steps:
      - I remember "A" as "1"
      - I reset memory
"#,
        )
        .unwrap();

        let suite = runner().run_suite(&file, Path::new(".")).await;
        assert!(!suite.passed());
        assert_eq!(suite.failed(), 1);
        let failed = &suite.scenarios[0];
        assert_eq!(failed.steps_run, 2);
        assert_eq!(failed.steps_total, 3);
        assert!(failed.error.as_deref().unwrap_or_default().contains("maybe"));
        assert!(suite.scenarios[1].passed);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_scenarios() {
        let file = ScenarioFile::parse(
            r#"
name: fail fast
scenarios:
  - name: unknown step
    steps:
      - I do something unusual
  - name: never runs
    steps:
      - I reset headers
"#,
        )
        .unwrap();

        let suite = runner().fail_fast(true).run_suite(&file, Path::new(".")).await;
        assert_eq!(suite.scenarios.len(), 1);
        assert!(any_failed(&[suite]));
    }

    #[tokio::test]
    async fn test_scenarios_do_not_share_memory() {
        let file = ScenarioFile::parse(
            r#"
name: isolation
scenarios:
  - name: writes
    steps:
      - I remember "TOKEN" as "abc"
  - name: reads
    steps:
      - I set HTTP header "Authorization" as "{{.TOKEN}}"
"#,
        )
        .unwrap();

        let suite = runner().run_suite(&file, Path::new(".")).await;
        assert!(suite.scenarios[0].passed);
        assert!(!suite.scenarios[1].passed);
    }

    #[tokio::test]
    async fn test_load_directory_relative_to_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("queries")).unwrap();
        std::fs::write(dir.path().join("queries/getUser.graphql"), "query { me }").unwrap();
        let path = dir.path().join("users.yaml");
        std::fs::write(
            &path,
            r#"
name: directory
scenarios:
  - name: load
    steps:
      - I load variables from directory "queries"
      - I set HTTP header "X-Query" as "{{.getUser}}"
"#,
        )
        .unwrap();

        let suite = runner().run_file(&path).await.unwrap();
        assert!(suite.passed(), "{:?}", suite.scenarios);
        assert_eq!(suite.path, path);
    }

    #[test]
    fn test_check_file_reports_problems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.yaml");
        std::fs::write(
            &path,
            r#"
name: check
background:
  - I set HTTP header "Accept" as "application/json"
scenarios:
  - name: mixed
    steps:
      - the response code should be 200
      - the response should match json:
      - I fly to the moon
"#,
        )
        .unwrap();

        let result = check_file(&path).unwrap();
        assert_eq!(result.steps_total, 4);
        assert_eq!(result.problems.len(), 2);
        assert!(result.problems[0].contains("requires a doc string"));
        assert!(result.problems[1].contains("I fly to the moon"));
    }
}
