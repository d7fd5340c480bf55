//! Declarative script test units
//!
//! A script is a YAML or JSON list of top-level items:
//!
//! ```yaml
//! - describe: Fibonacci
//!   body:
//!     - it: starts with zero and one
//!       steps:
//!         - equal: [[0, 1], [0, 1]]
//!     - fail: fixture missing   # suite error, rest of body skipped
//! - it: top level case
//!   steps:
//!     - contains: ["hello world", "world"]
//! - fail: aborts the rest of the file
//! ```
//!
//! Steps: `equal`, `not_equal`, `contains`, `fail`, `panic`, `sleep_ms`, `exit`.
//! Suites cannot nest.

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use super::{LoadError, TestUnit, UnitLoader};
use crate::registry::Registrar;

/// Loader for `.yaml`, `.yml` and `.json` scripts
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptLoader;

impl UnitLoader for ScriptLoader {
    fn name(&self) -> &'static str {
        "script"
    }

    fn claims(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml" | "json")
        )
    }

    fn load(&self, path: &Path) -> std::result::Result<Box<dyn TestUnit>, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let parsed = if is_json {
            Script::from_json(&content)
        } else {
            Script::from_yaml(&content)
        };

        parsed
            .map(|script| Box::new(script) as Box<dyn TestUnit>)
            .map_err(|e| LoadError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// A parsed script
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct Script {
    items: Vec<Item>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum Item {
    Describe(SuiteDef),
    Case(CaseDef),
    Step(Step),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Case(CaseDef),
    Step(Step),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteDef {
    describe: String,
    #[serde(default)]
    body: Vec<Entry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseDef {
    it: String,
    #[serde(default)]
    steps: Vec<Step>,
}

/// One assertion or action; a step is a map with exactly one key
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    Equal((Value, Value)),
    NotEqual((Value, Value)),
    Contains((Value, Value)),
    Fail(String),
    Panic(String),
    SleepMs(u64),
    Exit(i32),
}

impl Script {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(content)?)
    }

}

impl TestUnit for Script {
    fn register(&self, t: &mut Registrar<'_>) -> Result<()> {
        for item in &self.items {
            match item {
                Item::Describe(suite) => t.describe(&suite.describe, |t| run_body(t, &suite.body)),
                Item::Case(case) => t.it(&case.it, || run_steps(&case.steps)),
                Item::Step(step) => step.run()?,
            }
        }
        Ok(())
    }
}

fn run_body(t: &mut Registrar<'_>, body: &[Entry]) -> Result<()> {
    for entry in body {
        match entry {
            Entry::Case(case) => t.it(&case.it, || run_steps(&case.steps)),
            Entry::Step(step) => step.run()?,
        }
    }
    Ok(())
}

fn run_steps(steps: &[Step]) -> Result<()> {
    steps.iter().try_for_each(Step::run)
}

impl Step {
    fn run(&self) -> Result<()> {
        match self {
            Step::Equal((actual, expected)) => {
                if actual != expected {
                    bail!("expected {actual} to equal {expected}");
                }
            }
            Step::NotEqual((actual, expected)) => {
                if actual == expected {
                    bail!("expected {actual} to not equal {expected}");
                }
            }
            Step::Contains((haystack, needle)) => {
                if !contains(haystack, needle)? {
                    bail!("expected {haystack} to contain {needle}");
                }
            }
            Step::Fail(message) => bail!("{message}"),
            Step::Panic(message) => panic!("{message}"),
            Step::SleepMs(ms) => std::thread::sleep(Duration::from_millis(*ms)),
            Step::Exit(code) => std::process::exit(*code),
        }
        Ok(())
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => Ok(h.contains(n.as_str())),
        (Value::Array(items), needle) => Ok(items.contains(needle)),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => bail!("cannot check whether {haystack} contains {needle}"),
    }
}
