//! Option bags shared by several resource services.
//!
//! Options are plain `Serialize` structs. Unset fields are skipped, so a
//! default value encodes to an empty query string. `Option<T>` keeps an
//! explicit zero distinguishable from "not set".

use serde::{Deserialize, Serialize};

/// Page selection for list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl ListOptions {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
