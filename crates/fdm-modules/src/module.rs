//! Module entry points.
//!
//! A module validates its arguments, opens one [`FdmClient`] for the
//! invocation, runs the selected operation and reports a [`ModuleResult`].
//! Errors never escape [`Module::run`]; they are turned into failure reports
//! here and nowhere else.

use crate::resources::ResourceDefinition;
use async_trait::async_trait;
use fdm_core::auth::Credentials;
use fdm_core::config::{FdmConfig, DEFAULT_API_PREFIX};
use fdm_core::result::classify_failure;
use fdm_core::{Error, FdmClient, ModuleResult, Params, ResourceAdapter, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-run settings that are not module arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOptions {
    /// Prefix of the versioned REST API
    pub api_prefix: String,
    /// Whether to verify the appliance's TLS certificate
    pub tls_verify: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            tls_verify: true,
            timeout_secs: 30,
        }
    }
}

impl ModuleOptions {
    /// Client configuration for `hostname`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an invalid hostname or timeout.
    pub fn fdm_config(&self, hostname: &str) -> Result<FdmConfig> {
        FdmConfig::new(hostname)?
            .with_api_prefix(self.api_prefix.clone())
            .with_tls_verify(self.tls_verify)
            .with_timeout(self.timeout_secs)
            .validated()
    }

    /// Open a client from the connection arguments in `params`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if a connection argument is missing,
    /// or the configuration error of the client builder.
    pub fn connect(&self, params: &Params) -> Result<FdmClient> {
        let required = |name: &str| {
            params.get_str(name).ok_or_else(|| {
                Error::ValidationError(format!("missing required arguments: {name}"))
            })
        };

        let hostname = required("hostname")?;
        let credentials = Credentials::new(required("access_token")?, required("refresh_token")?);

        debug!(hostname, api_prefix = %self.api_prefix, "connecting to FDM");
        FdmClient::builder(self.fdm_config(hostname)?, credentials).build()
    }
}

/// One invocable module.
#[async_trait]
pub trait Module: Send + Sync {
    /// Module name, e.g. `flex_config_policy`.
    fn name(&self) -> &str;

    /// Validate `args`, run the selected operation and report its outcome.
    async fn run(&self, args: &Params) -> ModuleResult;
}

/// Module managing one resource type through the generic adapter.
#[derive(Debug, Clone)]
pub struct ResourceModule {
    definition: ResourceDefinition,
    schema: Arc<fdm_core::ResourceSchema>,
    options: ModuleOptions,
}

impl ResourceModule {
    /// Create a module for `definition` with default options.
    #[must_use]
    pub fn new(definition: ResourceDefinition) -> Self {
        let schema = Arc::new(definition.schema.clone());
        Self {
            definition,
            schema,
            options: ModuleOptions::default(),
        }
    }

    /// Override the run options.
    #[must_use]
    pub fn with_options(mut self, options: ModuleOptions) -> Self {
        self.options = options;
        self
    }

    /// Return the definition.
    #[must_use]
    pub const fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    async fn execute(&self, params: &Params) -> Result<Value> {
        let operation = params.get_str("operation").unwrap_or_default();
        let kind = self.schema.resolve_operation(operation)?;

        let client = self.options.connect(params)?;
        let adapter = ResourceAdapter::new(client, Arc::clone(&self.schema));

        info!(module = %self.definition.module, operation, "running module");
        adapter.dispatch(kind, params).await
    }
}

#[async_trait]
impl Module for ResourceModule {
    fn name(&self) -> &str {
        &self.definition.module
    }

    async fn run(&self, args: &Params) -> ModuleResult {
        let params = match self.definition.argument_spec().validate(args) {
            Ok(params) => params,
            Err(err) => return ModuleResult::Failure(classify_failure(&err)),
        };

        let outcome = self.execute(&params).await;
        ModuleResult::from_outcome(outcome, &params)
    }
}
