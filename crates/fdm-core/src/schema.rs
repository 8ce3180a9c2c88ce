//! Declarative resource schemas.
//!
//! A [`ResourceSchema`] captures everything that differs between resource
//! types: the name used to build operation names, the collection and item
//! paths, and which fields go into bodies, queries and paths. The adapter in
//! [`crate::resource`] is the same for every schema.

use crate::{Error, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query fields accepted by every list operation.
pub const DEFAULT_QUERY_FIELDS: [&str; 4] = ["offset", "limit", "sort", "filter"];

/// Path placeholder of every item path.
pub const OBJ_ID: &str = "objId";

/// Operations a resource can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Create an object
    Add,
    /// Replace an object by id
    Edit,
    /// Delete an object by id
    Delete,
    /// Fetch an object by id
    Get,
    /// Fetch one page of the collection
    List,
    /// Find an object by exact name
    GetByName,
    /// Create, or edit the object with the same name
    Upsert,
    /// Edit the object with the given name
    EditByName,
    /// Delete the object with the given name
    DeleteByName,
}

impl OperationKind {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Add,
        Self::Edit,
        Self::Delete,
        Self::Get,
        Self::List,
        Self::GetByName,
        Self::Upsert,
        Self::EditByName,
        Self::DeleteByName,
    ];

    /// Name the operation is invoked by for `resource`, e.g. `getFlexConfigPolicyList`.
    #[must_use]
    pub fn operation_name(self, resource: &str) -> String {
        match self {
            Self::Add => format!("add{resource}"),
            Self::Edit => format!("edit{resource}"),
            Self::Delete => format!("delete{resource}"),
            Self::Get => format!("get{resource}"),
            Self::List => format!("get{resource}List"),
            Self::GetByName => format!("get{resource}ByName"),
            Self::Upsert => format!("upsert{resource}"),
            Self::EditByName => format!("edit{resource}ByName"),
            Self::DeleteByName => format!("delete{resource}ByName"),
        }
    }

    /// Returns true for operations that never change remote state.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Get | Self::List | Self::GetByName)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Get => "get",
            Self::List => "list",
            Self::GetByName => "get_by_name",
            Self::Upsert => "upsert",
            Self::EditByName => "edit_by_name",
            Self::DeleteByName => "delete_by_name",
        };
        f.write_str(name)
    }
}

/// One HTTP call: method, path template and the fields projected into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Operation name, e.g. `addFlexConfigPolicy`
    pub name: String,
    /// HTTP method
    pub method: Method,
    /// Path template relative to the API prefix
    pub path_template: String,
    /// Fields sent in the JSON body; empty means no body
    pub body_fields: Vec<String>,
    /// Fields sent as query parameters
    pub query_fields: Vec<String>,
    /// Fields substituted into the path template
    pub path_fields: Vec<String>,
}

/// Static description of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Resource name as it appears in operation names, e.g. `FlexConfigPolicy`
    pub name: String,
    /// Collection path, e.g. `/object/flexconfigpolicies`
    pub collection_path: String,
    /// Item path with an `{objId}` placeholder
    pub item_path: String,
    /// Fields of the resource body, identity fields included
    pub body_fields: Vec<String>,
    /// Query fields of the list operation
    #[serde(default = "default_query_fields")]
    pub query_fields: Vec<String>,
    /// Placeholders of the item path
    #[serde(default = "default_path_fields")]
    pub path_fields: Vec<String>,
    /// Operations the resource exposes
    #[serde(default = "default_operations")]
    pub operations: Vec<OperationKind>,
}

fn default_query_fields() -> Vec<String> {
    DEFAULT_QUERY_FIELDS.iter().map(ToString::to_string).collect()
}

fn default_path_fields() -> Vec<String> {
    vec![OBJ_ID.to_string()]
}

fn default_operations() -> Vec<OperationKind> {
    OperationKind::ALL.to_vec()
}

impl ResourceSchema {
    /// Create a schema exposing all nine operations, with the item path
    /// derived as `{collection_path}/{objId}`.
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        collection_path: impl Into<String>,
        body_fields: impl IntoIterator<Item = S>,
    ) -> Self {
        let collection_path = collection_path.into();
        let item_path = format!("{}/{{{OBJ_ID}}}", collection_path.trim_end_matches('/'));
        Self {
            name: name.into(),
            collection_path,
            item_path,
            body_fields: body_fields.into_iter().map(Into::into).collect(),
            query_fields: default_query_fields(),
            path_fields: default_path_fields(),
            operations: default_operations(),
        }
    }

    /// Restrict the exposed operations.
    #[must_use]
    pub fn with_operations(mut self, operations: impl IntoIterator<Item = OperationKind>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    /// Whether the schema exposes `kind`.
    #[must_use]
    pub fn supports(&self, kind: OperationKind) -> bool {
        self.operations.contains(&kind)
    }

    /// Names of every exposed operation, in declaration order.
    #[must_use]
    pub fn operation_names(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|kind| kind.operation_name(&self.name))
            .collect()
    }

    /// Map an operation name back to its kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] listing the valid choices.
    pub fn resolve_operation(&self, name: &str) -> Result<OperationKind> {
        self.operations
            .iter()
            .copied()
            .find(|kind| kind.operation_name(&self.name) == name)
            .ok_or_else(|| {
                Error::UnknownOperation(format!(
                    "value of operation must be one of: {}, got: {name}",
                    self.operation_names().join(", ")
                ))
            })
    }

    /// Descriptor of a primitive operation; `None` for composed ones.
    #[must_use]
    pub fn descriptor(&self, kind: OperationKind) -> Option<OperationDescriptor> {
        let (method, path, body, query, path_fields) = match kind {
            OperationKind::Add => (Method::POST, &self.collection_path, true, false, false),
            OperationKind::Edit => (Method::PUT, &self.item_path, true, false, true),
            OperationKind::Delete => (Method::DELETE, &self.item_path, false, false, true),
            OperationKind::Get => (Method::GET, &self.item_path, false, false, true),
            OperationKind::List => (Method::GET, &self.collection_path, false, true, false),
            _ => return None,
        };

        let pick = |enabled: bool, fields: &[String]| {
            if enabled {
                fields.to_vec()
            } else {
                Vec::new()
            }
        };

        Some(OperationDescriptor {
            name: kind.operation_name(&self.name),
            method,
            path_template: path.clone(),
            body_fields: pick(body, &self.body_fields),
            query_fields: pick(query, &self.query_fields),
            path_fields: pick(path_fields, &self.path_fields),
        })
    }
}
