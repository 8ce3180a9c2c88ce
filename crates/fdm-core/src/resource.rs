//! Generic CRUD adapter over one [`ResourceSchema`].
//!
//! Primitive operations (add, edit, delete, get, list) are one HTTP call each.
//! Name-based operations walk the collection with a `name:<value>` filter and
//! an exact client-side match, then delegate to a primitive with the found
//! identity merged in. Upsert tries `add` first and turns a duplicate-name
//! rejection into an edit of the existing object.

use crate::http::FdmClient;
use crate::pagination::{Page, PageSource, PageWalker};
use crate::params::Params;
use crate::schema::{OperationKind, ResourceSchema, OBJ_ID};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Text the appliance puts in a 422 body when the name is already taken.
///
/// Matching on it is a heuristic: a reworded message disables upsert's
/// conflict recovery and the 422 surfaces as a plain failure.
pub const DUPLICATE_NAME_MARKER: &str = "Validation failed due to a duplicate name";

/// Server-assigned identity of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Object id
    pub id: String,
    /// Object version, must match the server on edit/delete
    pub version: String,
}

impl Identity {
    /// Read `id` and `version` from an object returned by the appliance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] if either field is missing or not a string.
    pub fn from_object(object: &Value) -> Result<Self> {
        let field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| Error::ParseError(format!("object has no string `{name}`")))
        };

        Ok(Self {
            id: field("id")?,
            version: field("version")?,
        })
    }

    /// Overwrite `id`, `version` and the `objId` path parameter in `params`.
    pub fn merge_into(&self, params: &mut Params) {
        params.insert("id", self.id.clone());
        params.insert("version", self.version.clone());
        params.insert(OBJ_ID, self.id.clone());
    }
}

/// Outcome of an `add` attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The object was created; carries the created object
    Created(Value),
    /// The appliance rejected the name as a duplicate; carries the 422 body
    DuplicateName(String),
}

/// Returns true for a 422 whose body carries [`DUPLICATE_NAME_MARKER`].
#[must_use]
pub fn is_duplicate_name(status: u16, body: &str) -> bool {
    status == 422 && body.contains(DUPLICATE_NAME_MARKER)
}

/// CRUD operations of one resource type.
#[derive(Clone)]
pub struct ResourceAdapter {
    client: FdmClient,
    schema: Arc<ResourceSchema>,
}

impl ResourceAdapter {
    /// Bind a schema to a client.
    #[must_use]
    pub fn new(client: FdmClient, schema: Arc<ResourceSchema>) -> Self {
        Self { client, schema }
    }

    /// Return the schema.
    #[must_use]
    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Return the client.
    #[must_use]
    pub const fn client(&self) -> &FdmClient {
        &self.client
    }

    /// Run `kind` with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] if the schema does not expose
    /// `kind`, otherwise whatever the operation returns.
    pub async fn dispatch(&self, kind: OperationKind, params: &Params) -> Result<Value> {
        if !self.schema.supports(kind) {
            return Err(Error::UnknownOperation(format!(
                "{} does not support {kind}",
                self.schema.name
            )));
        }

        info!(
            resource = %self.schema.name,
            operation = %kind,
            read_only = kind.is_read_only(),
            "dispatching operation"
        );
        match kind {
            OperationKind::Add => self.add(params).await,
            OperationKind::Edit => self.edit(params).await,
            OperationKind::Delete => self.delete(params).await,
            OperationKind::Get => self.get(params).await,
            OperationKind::List => self.list(params).await,
            OperationKind::GetByName => self.get_by_name(params).await,
            OperationKind::Upsert => self.upsert(params).await,
            OperationKind::EditByName => self.edit_by_name(params).await,
            OperationKind::DeleteByName => self.delete_by_name(params).await,
        }
    }

    /// Create an object.
    ///
    /// # Errors
    ///
    /// A duplicate name surfaces as the unchanged 422 [`Error::Http`].
    pub async fn add(&self, params: &Params) -> Result<Value> {
        match self.try_add(params).await? {
            AddOutcome::Created(created) => Ok(created),
            AddOutcome::DuplicateName(body) => Err(Error::Http { status: 422, body }),
        }
    }

    /// Create an object, reporting a duplicate name as an outcome instead of
    /// an error.
    ///
    /// # Errors
    ///
    /// Any failure other than a duplicate-name 422.
    pub async fn try_add(&self, params: &Params) -> Result<AddOutcome> {
        match self.primitive(OperationKind::Add, params).await {
            Ok(created) => Ok(AddOutcome::Created(created)),
            Err(Error::Http { status, body }) if is_duplicate_name(status, &body) => {
                Ok(AddOutcome::DuplicateName(body))
            }
            Err(err) => Err(err),
        }
    }

    /// Replace an object; `objId`, `id` and `version` must be set.
    ///
    /// # Errors
    ///
    /// Propagates the remote failure, e.g. a version mismatch.
    pub async fn edit(&self, params: &Params) -> Result<Value> {
        self.primitive(OperationKind::Edit, params).await
    }

    /// Delete the object addressed by `objId`.
    ///
    /// # Errors
    ///
    /// Propagates the remote failure.
    pub async fn delete(&self, params: &Params) -> Result<Value> {
        self.primitive(OperationKind::Delete, params).await
    }

    /// Fetch the object addressed by `objId`.
    ///
    /// # Errors
    ///
    /// Propagates the remote failure.
    pub async fn get(&self, params: &Params) -> Result<Value> {
        self.primitive(OperationKind::Get, params).await
    }

    /// Fetch one page using `offset`, `limit`, `sort` and `filter`.
    ///
    /// # Errors
    ///
    /// Propagates the remote failure.
    pub async fn list(&self, params: &Params) -> Result<Value> {
        self.primitive(OperationKind::List, params).await
    }

    /// Walk every page of the collection matching `params`.
    #[must_use]
    pub fn iterate(&self, search: &Params) -> PageWalker<'_, Self> {
        PageWalker::new(self, search)
    }

    /// Find the object whose name equals `params["name"]` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] without `name` and
    /// [`Error::NotFound`] when no object matches.
    pub async fn get_by_name(&self, params: &Params) -> Result<Value> {
        let name = params
            .get_str("name")
            .ok_or_else(|| Error::ValidationError("missing required arguments: name".into()))?;

        let mut search = params.project(&self.schema.query_fields);
        search.remove("offset");
        search.insert("filter", format!("name:{name}"));

        self.iterate(&search)
            .find(|item| item.get("name").and_then(Value::as_str) == Some(name))
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} with name `{name}`", self.schema.name)))
    }

    /// Create the object, or edit the existing one with the same name.
    ///
    /// # Errors
    ///
    /// Any failure of the add, lookup or edit other than the duplicate-name
    /// rejection.
    pub async fn upsert(&self, params: &Params) -> Result<Value> {
        match self.try_add(params).await? {
            AddOutcome::Created(created) => Ok(created),
            AddOutcome::DuplicateName(_) => {
                warn!(resource = %self.schema.name, "name already taken, editing existing object");
                self.edit_by_name(params).await
            }
        }
    }

    /// Edit the object with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] before any mutating call if the name is
    /// unknown.
    pub async fn edit_by_name(&self, params: &Params) -> Result<Value> {
        let merged = self.with_identity_of_named(params).await?;
        self.edit(&merged).await
    }

    /// Delete the object with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] before any mutating call if the name is
    /// unknown.
    pub async fn delete_by_name(&self, params: &Params) -> Result<Value> {
        let merged = self.with_identity_of_named(params).await?;
        self.delete(&merged).await
    }

    async fn with_identity_of_named(&self, params: &Params) -> Result<Params> {
        let existing = self.get_by_name(params).await?;
        let identity = Identity::from_object(&existing)?;
        let mut merged = params.clone();
        identity.merge_into(&mut merged);
        Ok(merged)
    }

    async fn primitive(&self, kind: OperationKind, params: &Params) -> Result<Value> {
        let descriptor = self.schema.descriptor(kind).ok_or_else(|| {
            Error::UnknownOperation(format!("{kind} is not a single remote call"))
        })?;
        self.client.call(&descriptor, params).await
    }
}

#[async_trait]
impl PageSource for ResourceAdapter {
    async fn fetch_page(&self, params: &Params) -> Result<Page> {
        let response = self.list(params).await?;
        Ok(serde_json::from_value(response)?)
    }
}
