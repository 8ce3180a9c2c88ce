//! File upload module.
//!
//! Uploads a local file as multipart form data through a named upload
//! operation. The operation is looked up in an [`UploadCatalog`] and must be a
//! POST returning an upload-status model; both checks and argument validation
//! happen before the file is read or any request is sent.

use crate::args::{connection_args, ArgSpec, ArgType, ArgumentSpec};
use crate::module::{Module, ModuleOptions};
use async_trait::async_trait;
use fdm_core::result::{classify_failure, normalize};
use fdm_core::{Error, ModuleResult, Params, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Argument carrying the local path of the file to upload.
pub const FILE_ARG: &str = "fileToUpload";

/// Suffix every upload-status model name ends with.
const UPLOAD_STATUS_SUFFIX: &str = "UploadStatus";

/// One entry of the upload catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOperation {
    /// HTTP method, e.g. `POST`
    pub method: String,
    /// Path relative to the API prefix
    pub url: String,
    /// Name of the returned model
    pub model_name: String,
}

impl UploadOperation {
    /// A POST to `url` returning `model_name`.
    #[must_use]
    pub fn post(url: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            model_name: model_name.into(),
        }
    }

    /// Whether the operation is a POST returning an upload-status model.
    #[must_use]
    pub fn is_upload(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST") && self.model_name.ends_with(UPLOAD_STATUS_SUFFIX)
    }
}

/// Named operations the upload module may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadCatalog {
    operations: BTreeMap<String, UploadOperation>,
}

impl Default for UploadCatalog {
    fn default() -> Self {
        Self::empty().with_operation(
            "uploadFile",
            UploadOperation::post("/action/uploaddiskfile", "FileUploadStatus"),
        )
    }
}

impl UploadCatalog {
    /// Catalog without any operation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    /// Add or replace an operation.
    #[must_use]
    pub fn with_operation(mut self, name: impl Into<String>, operation: UploadOperation) -> Self {
        self.operations.insert(name.into(), operation);
        self
    }

    /// Resolve `name` to an upload operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the name is unknown or the
    /// operation is not an upload.
    pub fn resolve(&self, name: &str) -> Result<&UploadOperation> {
        let operation = self.operations.get(name).ok_or_else(|| {
            Error::ValidationError(format!(
                "Operation with specified name is not found: {name}"
            ))
        })?;

        if !operation.is_upload() {
            return Err(Error::ValidationError(format!(
                "Invalid upload operation: {name}. The operation must make POST request and return UploadStatus model."
            )));
        }
        Ok(operation)
    }
}

/// The `file_upload` module.
#[derive(Debug, Clone, Default)]
pub struct FileUploadModule {
    catalog: UploadCatalog,
    options: ModuleOptions,
}

impl FileUploadModule {
    /// Module with the default catalog and options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: UploadCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Override the run options.
    #[must_use]
    pub fn with_options(mut self, options: ModuleOptions) -> Self {
        self.options = options;
        self
    }

    /// Arguments of the module.
    #[must_use]
    pub fn argument_spec() -> ArgumentSpec {
        connection_args()
            .arg(ArgSpec::new("operation", ArgType::Str).required())
            .arg(ArgSpec::new(FILE_ARG, ArgType::Path).required())
    }

    async fn execute(&self, params: &Params) -> Result<Value> {
        let name = params.get_str("operation").unwrap_or_default();
        let operation = self.catalog.resolve(name)?;
        let file = params.get_str(FILE_ARG).unwrap_or_default();

        let client = self.options.connect(params)?;
        info!(operation = name, url = %operation.url, file, "uploading file");
        client.upload_file(&operation.url, Path::new(file)).await
    }
}

#[async_trait]
impl Module for FileUploadModule {
    fn name(&self) -> &str {
        "file_upload"
    }

    async fn run(&self, args: &Params) -> ModuleResult {
        let params = match Self::argument_spec().validate(args) {
            Ok(params) => params,
            Err(err) => return ModuleResult::Failure(classify_failure(&err)),
        };

        match self.execute(&params).await {
            Ok(response) => {
                let mut report = normalize(response, &params);
                report.changed = true;
                ModuleResult::Success(report)
            }
            Err(err) => ModuleResult::Failure(classify_failure(&err)),
        }
    }
}
