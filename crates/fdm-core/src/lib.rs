//! # fdm-core
//!
//! Generic CRUD machinery for the FDM (Firepower Device Manager) REST API.
//!
//! One [`resource::ResourceAdapter`] drives every resource type from a
//! declarative [`schema::ResourceSchema`]: primitive operations are single
//! HTTP calls, name-based operations and upsert are composed from them.
//!
//! ## Modules
//!
//! - [`error`] - Error type and status classification
//! - [`client`] - HTTP client tuning
//! - [`config`] - Appliance connection settings
//! - [`params`] - Parameter mapping and projection
//! - [`query`] - Query string assembly
//! - [`request`] - URL templating and request headers
//! - [`auth`] - Tokens and the refresh-once retry combinator
//! - [`http`] - The asynchronous [`http::FdmClient`]
//! - [`pagination`] - Offset/limit page walking
//! - [`schema`] - Resource schemas and operation descriptors
//! - [`resource`] - The generic resource adapter and upsert
//! - [`result`] - Success and failure reports

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pagination;
pub mod params;
pub mod query;
pub mod request;
pub mod resource;
pub mod result;
pub mod schema;

// Re-export commonly used types
pub use error::{Error, Result};
pub use http::FdmClient;
pub use params::Params;
pub use resource::ResourceAdapter;
pub use result::ModuleResult;
pub use schema::{OperationKind, ResourceSchema};
