//! Asynchronous task tracking.
//!
//! # Design
//! Long-running server work (a repository sync, for instance) is reported as
//! a `Task` that callers poll with `TasksService::get` until `is_terminal`
//! returns true. Fetches are side-effect free, so polling cadence and
//! cancellation are left to the caller.
//!
//! The progress report is keyed by importer kind and the server populates
//! exactly one key per fetch. It is decoded into the `ProgressReport` enum by
//! looking at which key is present; when both are present the yum importer
//! wins.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::client::Client;
use crate::de::null_as_default;
use crate::error::{Error, FieldError};
use crate::http::{HttpMethod, Response, Transport};
use crate::options::ListOptions;

/// Server-side task state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Waiting,
    Skipped,
    Accepted,
    Running,
    Suspended,
    Finished,
    Error,
    Canceled,
    /// Missing or unrecognised state string.
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// States the server never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished | TaskState::Error | TaskState::Canceled | TaskState::Skipped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "waiting",
            TaskState::Skipped => "skipped",
            TaskState::Accepted => "accepted",
            TaskState::Running => "running",
            TaskState::Suspended => "suspended",
            TaskState::Finished => "finished",
            TaskState::Error => "error",
            TaskState::Canceled => "canceled",
            TaskState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item and byte counters for one step of an importer run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    pub items_total: u64,
    pub items_left: u64,
    pub size_total: u64,
    pub size_left: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub error_details: Vec<String>,
}

impl Content {
    pub fn items_done(&self) -> u64 {
        self.items_total.saturating_sub(self.items_left)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    pub error: Option<String>,
}

/// Progress of a single importer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterProgress {
    pub content: Option<Content>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImporterKind {
    Yum,
    Docker,
}

impl ImporterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImporterKind::Yum => "yum",
            ImporterKind::Docker => "docker",
        }
    }
}

impl fmt::Display for ImporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress report of a task, tagged by the importer that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProgressReport {
    Yum(ImporterProgress),
    Docker(ImporterProgress),
    /// No importer key was present, or the report was null.
    #[default]
    None,
}

impl ProgressReport {
    pub fn kind(&self) -> Option<ImporterKind> {
        match self {
            ProgressReport::Yum(_) => Some(ImporterKind::Yum),
            ProgressReport::Docker(_) => Some(ImporterKind::Docker),
            ProgressReport::None => None,
        }
    }

    pub fn importer(&self) -> Option<&ImporterProgress> {
        match self {
            ProgressReport::Yum(p) | ProgressReport::Docker(p) => Some(p),
            ProgressReport::None => None,
        }
    }
}

impl<'de> Deserialize<'de> for ProgressReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            yum_importer: Option<ImporterProgress>,
            #[serde(default)]
            docker_importer: Option<ImporterProgress>,
        }

        let report = match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw {
                yum_importer: Some(progress),
                ..
            }) => ProgressReport::Yum(progress),
            Some(Raw {
                docker_importer: Some(progress),
                ..
            }) => ProgressReport::Docker(progress),
            _ => ProgressReport::None,
        };
        Ok(report)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskResultDetails {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskResult {
    pub details: TaskResultDetails,
}

/// Snapshot of a server-side task at fetch time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(rename = "task_id", deserialize_with = "null_as_default")]
    pub id: String,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub state: TaskState,
    pub error: Option<FieldError>,
    pub progress_report: ProgressReport,
    #[serde(deserialize_with = "null_as_default")]
    pub result: TaskResult,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn importer_kind(&self) -> Option<ImporterKind> {
        self.progress_report.kind()
    }

    pub fn importer_progress(&self) -> Option<&ImporterProgress> {
        self.progress_report.importer()
    }

    /// Content counters of the active importer, if any.
    pub fn content_progress(&self) -> Option<&Content> {
        self.importer_progress()?.content.as_ref()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} [{}]", self.id, self.state)?;
        if let Some(kind) = self.importer_kind() {
            write!(f, " {kind} importer")?;
        }
        Ok(())
    }
}

pub struct TasksService<'a, T> {
    client: &'a Client<T>,
}

impl<'a, T: Transport> TasksService<'a, T> {
    pub(crate) fn new(client: &'a Client<T>) -> Self {
        Self { client }
    }

    pub fn get(&self, task_id: &str) -> Result<(Task, Response), Error> {
        let req = self.client.new_request(HttpMethod::Get, &format!("tasks/{task_id}/"));
        self.client.execute(&req)
    }

    pub fn list(&self, options: &ListOptions) -> Result<(Vec<Task>, Response), Error> {
        let req = self.client.new_request_with(HttpMethod::Get, "tasks/", options)?;
        self.client.execute(&req)
    }
}
