//! Task data model for a parallel run.
//!
//! A [`TaskRecord`] describes one remote process invocation. Executing it
//! yields exactly one [`Outcome`]; the outcomes of a run fold into a
//! [`RunSummary`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A named parameter passed to a remote process.
///
/// Serializes with the capitalized field names the REST API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Render parameters as `[Name=Value, ...]`.
pub fn format_parameters(parameters: &[Parameter]) -> String {
    let joined = parameters
        .iter()
        .map(Parameter::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

/// One unit of work: a process name and its ordered parameters.
///
/// Immutable once built. `seq` is the 1-based position in the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    seq: usize,
    procedure: String,
    parameters: Vec<Parameter>,
}

impl TaskRecord {
    pub fn new(seq: usize, procedure: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            seq,
            procedure: procedure.into(),
            parameters,
        }
    }

    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

/// The recorded result of attempting one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub seq: usize,
    pub procedure: String,
    pub parameters: Vec<Parameter>,
    pub success: bool,
    /// Human-readable report line, including the error detail on failure.
    pub message: String,
    pub server: String,
}

impl Outcome {
    pub fn succeeded(task: &TaskRecord, server: &str) -> Self {
        let message = format!(
            "Row {} {}: Process Completed Successfully for {} on {}",
            task.seq(),
            task.procedure(),
            format_parameters(task.parameters()),
            server
        );
        Self::from_task(task, server, true, message)
    }

    pub fn failed(task: &TaskRecord, server: &str, detail: &str) -> Self {
        let message = format!(
            "Row {} {}: Produced Errors for {} on {} | {}",
            task.seq(),
            task.procedure(),
            format_parameters(task.parameters()),
            server,
            detail
        );
        Self::from_task(task, server, false, message)
    }

    fn from_task(task: &TaskRecord, server: &str, success: bool, message: String) -> Self {
        Self {
            seq: task.seq(),
            procedure: task.procedure().to_string(),
            parameters: task.parameters().to_vec(),
            success,
            message,
            server: server.to_string(),
        }
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run complete: {} tasks, {} succeeded, {} failed in {:.3}s",
            self.total,
            self.succeeded,
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}
