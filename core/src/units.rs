//! Content unit search.
//!
//! # Design
//! Searching is a POST with the criteria in the JSON body even though it
//! only reads: the server needs a body for anything beyond trivial
//! criteria. Field selection keeps payloads small; the service remembers a
//! field list set with `set_fields` and `list` turns it into criteria, while
//! `search` takes fully custom criteria.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::de::null_as_default;
use crate::error::Error;
use crate::http::{HttpMethod, Response, Transport};

/// A dependency requirement of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Require {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(deserialize_with = "null_as_default")]
    pub requires: Vec<Require>,
}

/// A content unit associated with a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repo_id: String,
    #[serde(rename = "unit_type_id", deserialize_with = "null_as_default")]
    pub type_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: UnitMetadata,
}

/// Projection of a unit association search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFields {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unit: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub association: Vec<String>,
}

/// Criteria for a unit association search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitAssociationCriteria {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<UnitFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

impl UnitAssociationCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unit metadata fields to retrieve, keeping their order.
    pub fn add_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if !fields.is_empty() {
            self.fields.get_or_insert_with(UnitFields::default).unit.extend(fields);
        }
        self
    }

    pub fn type_ids<I, S>(mut self, type_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_ids = type_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Request body of a unit search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchUnitsOptions {
    pub criteria: UnitAssociationCriteria,
}

pub struct UnitsService<'a, T> {
    client: &'a Client<T>,
    fields: Vec<String>,
}

impl<'a, T: Transport> UnitsService<'a, T> {
    pub(crate) fn new(client: &'a Client<T>) -> Self {
        Self {
            client,
            fields: Vec::new(),
        }
    }

    /// Metadata fields `list` asks for. Empty means the server default.
    pub fn set_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Units of `repository`, restricted to the fields set with `set_fields`.
    pub fn list(&self, repository: &str) -> Result<(Vec<Unit>, Response), Error> {
        let mut criteria = UnitAssociationCriteria::new();
        criteria.add_fields(self.fields.iter().cloned());
        self.search(repository, &criteria)
    }

    pub fn search(
        &self,
        repository: &str,
        criteria: &UnitAssociationCriteria,
    ) -> Result<(Vec<Unit>, Response), Error> {
        let path = format!("repositories/{repository}/search/units/");
        let options = SearchUnitsOptions {
            criteria: criteria.clone(),
        };
        let req = self.client.new_request_with(HttpMethod::Post, &path, &options)?;
        self.client.execute(&req)
    }
}
