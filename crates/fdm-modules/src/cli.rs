//! Helpers of the `fdm-module` command line runner.

use crate::module::{Module, ModuleOptions, ResourceModule};
use crate::resources::{self, ResourceDefinition};
use crate::upload::FileUploadModule;
use anyhow::{bail, Context, Result};
use fdm_core::{Params, ResourceSchema};
use serde_json::Value;
use std::path::Path;

/// Key the automation tool wraps module arguments in.
pub const WRAPPED_ARGS_KEY: &str = "ANSIBLE_MODULE_ARGS";

/// Name of the file upload module.
pub const FILE_UPLOAD: &str = "file_upload";

/// Parse module arguments, unwrapping [`WRAPPED_ARGS_KEY`] when present.
///
/// # Errors
///
/// Fails if the text is not a JSON object.
pub fn parse_args(raw: &str) -> Result<Params> {
    let mut value: Value = serde_json::from_str(raw).context("module arguments are not JSON")?;
    if let Some(inner) = value.get_mut(WRAPPED_ARGS_KEY).map(Value::take) {
        value = inner;
    }

    match Params::from_value(value) {
        Some(params) => Ok(params),
        None => bail!("module arguments must be a JSON object"),
    }
}

/// Read module arguments from a file.
///
/// # Errors
///
/// Fails if the file cannot be read or does not hold a JSON object.
pub fn load_args(path: &Path) -> Result<Params> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read arguments from {}", path.display()))?;
    parse_args(&raw)
}

/// Read run options from a JSON file.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_options(path: &Path) -> Result<ModuleOptions> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read options from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid options in {}", path.display()))
}

/// Read a custom resource definition from a JSON schema file.
///
/// The module name is the file stem.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a resource schema.
pub fn load_definition(path: &Path) -> Result<ResourceDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read schema from {}", path.display()))?;
    let schema: ResourceSchema = serde_json::from_str(&raw)
        .with_context(|| format!("invalid resource schema in {}", path.display()))?;
    let module = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&schema.name)
        .to_string();
    Ok(ResourceDefinition::from_schema(module, schema))
}

/// Resolve a module by name: a built-in resource, `file_upload`, or a path to
/// a JSON resource schema.
///
/// # Errors
///
/// Fails if the name is neither built in nor a readable schema file.
pub fn select_module(name: &str, options: ModuleOptions) -> Result<Box<dyn Module>> {
    if name == FILE_UPLOAD {
        return Ok(Box::new(FileUploadModule::new().with_options(options)));
    }

    let definition = match resources::lookup(name) {
        Some(definition) => definition,
        None if Path::new(name).is_file() => load_definition(Path::new(name))?,
        None => bail!(
            "unknown module `{name}`; expected one of: {}, {FILE_UPLOAD}, or a schema file",
            resources::builtin()
                .iter()
                .map(|def| def.module.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    Ok(Box::new(ResourceModule::new(definition).with_options(options)))
}
