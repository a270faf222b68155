//! Synchronous client for the Pulp 2 REST API.
//!
//! # Overview
//! Covers the request/response plumbing (authentication, query and body
//! encoding, status classification, JSON decoding, `Link` pagination) and
//! typed services for repositories, tasks and content units.
//!
//! # Design
//! - `Client` is immutable after construction apart from `set_base_url`, and
//!   builds a fresh request per call.
//! - I/O sits behind the `Transport` trait. `UreqTransport` is the default;
//!   tests substitute in-memory transports.
//! - Long-running operations such as a sync only return the spawned task
//!   ids. Polling them to completion is up to the caller:
//!
//! ```no_run
//! use pulp_core::Client;
//!
//! # fn main() -> Result<(), pulp_core::Error> {
//! let client = Client::builder("pulp.example.com")
//!     .credentials("admin", "secret")
//!     .build()?;
//!
//! let (report, _) = client.repositories().sync("zoo")?;
//! for task_id in report.task_ids() {
//!     loop {
//!         let (task, _) = client.tasks().get(task_id)?;
//!         if task.is_terminal() {
//!             break;
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(500));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod de;
pub mod error;
pub mod http;
pub mod options;
pub mod pagination;
pub mod repositories;
pub mod tasks;
pub mod transport;
pub mod units;

#[cfg(test)]
mod testing;

pub use client::{Client, ClientBuilder, Credentials};
pub use error::{check_response, Error, ErrorResponse, FieldError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Response, Transport, TransportError};
pub use options::ListOptions;
pub use pagination::{parse_link_header, Pagination};
pub use repositories::{GetRepositoryOptions, Repository, SpawnedTask, SyncCallReport, SyncOptions};
pub use tasks::{Content, ImporterKind, ImporterProgress, Metadata, ProgressReport, Task, TaskState};
pub use transport::UreqTransport;
pub use units::{Require, Unit, UnitAssociationCriteria, UnitMetadata};
