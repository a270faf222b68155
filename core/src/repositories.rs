//! Repository retrieval and synchronization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Client;
use crate::de::null_as_default;
use crate::error::Error;
use crate::http::{HttpMethod, Response, Transport};
use crate::options::is_false;

/// A Pulp repository. Only the commonly used fields are typed; importer and
/// distributor configurations are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub notes: Map<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub content_unit_counts: BTreeMap<String, u64>,
    pub total_repository_units: Option<u64>,
    pub last_unit_added: Option<String>,
    pub last_unit_removed: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub importers: Vec<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub distributors: Vec<Value>,
    #[serde(rename = "_href", skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Query flags for repository reads. `details` implies both importers and
/// distributors on the server side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRepositoryOptions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub details: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub importers: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub distributors: bool,
}

/// Body of a sync call. The server requires `override_config`, even empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncOptions {
    #[serde(default)]
    pub override_config: Map<String, Value>,
}

/// Reference to an asynchronous task started by a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnedTask {
    #[serde(deserialize_with = "null_as_default")]
    pub task_id: String,
    #[serde(rename = "_href", deserialize_with = "null_as_default")]
    pub href: String,
}

/// Returned by calls that start server-side work. The work itself is
/// tracked by polling the spawned tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncCallReport {
    pub result: Option<Value>,
    pub error: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub spawned_tasks: Vec<SpawnedTask>,
}

impl SyncCallReport {
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.spawned_tasks.iter().map(|t| t.task_id.as_str())
    }
}

pub struct RepositoriesService<'a, T> {
    client: &'a Client<T>,
}

impl<'a, T: Transport> RepositoriesService<'a, T> {
    pub(crate) fn new(client: &'a Client<T>) -> Self {
        Self { client }
    }

    pub fn list(&self, options: &GetRepositoryOptions) -> Result<(Vec<Repository>, Response), Error> {
        let req = self.client.new_request_with(HttpMethod::Get, "repositories/", options)?;
        self.client.execute(&req)
    }

    pub fn get(&self, repository: &str, options: &GetRepositoryOptions) -> Result<(Repository, Response), Error> {
        let path = format!("repositories/{repository}/");
        let req = self.client.new_request_with(HttpMethod::Get, &path, options)?;
        self.client.execute(&req)
    }

    /// Starts a sync with the importer's stored configuration.
    pub fn sync(&self, repository: &str) -> Result<(SyncCallReport, Response), Error> {
        self.sync_with(repository, &SyncOptions::default())
    }

    pub fn sync_with(&self, repository: &str, options: &SyncOptions) -> Result<(SyncCallReport, Response), Error> {
        let path = format!("repositories/{repository}/actions/sync/");
        let req = self.client.new_request_with(HttpMethod::Post, &path, options)?;
        self.client.execute(&req)
    }
}
