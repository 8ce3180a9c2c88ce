//! Built-in resource definitions.
//!
//! A [`ResourceDefinition`] pairs a [`ResourceSchema`] with the typed
//! arguments of its resource-specific fields. The module entry point adds the
//! connection arguments and the `operation` choice on top.

use crate::args::{connection_args, ArgSpec, ArgType, ArgumentSpec};
use fdm_core::schema::{DEFAULT_QUERY_FIELDS, OBJ_ID};
use fdm_core::ResourceSchema;
use serde::{Deserialize, Serialize};

/// Schema plus typed arguments of one resource module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Module name, e.g. `flex_config_policy`
    pub module: String,
    /// Remote shape of the resource
    pub schema: ResourceSchema,
    /// Resource-specific arguments; fields of the schema not listed here are
    /// accepted as-is
    #[serde(default)]
    pub fields: Vec<ArgSpec>,
}

impl ResourceDefinition {
    /// Definition with typed paging arguments and every other schema field
    /// accepted as-is.
    #[must_use]
    pub fn from_schema(module: impl Into<String>, schema: ResourceSchema) -> Self {
        Self {
            module: module.into(),
            schema,
            fields: Vec::new(),
        }
    }

    /// Full argument schema: connection arguments, `operation` restricted to
    /// the schema's operation names, then every resource field.
    #[must_use]
    pub fn argument_spec(&self) -> ArgumentSpec {
        let mut spec = connection_args().arg(
            ArgSpec::new("operation", ArgType::Str)
                .required()
                .with_choices(self.schema.operation_names()),
        );

        let schema_fields = self
            .schema
            .body_fields
            .iter()
            .chain(&self.schema.query_fields)
            .chain(&self.schema.path_fields);
        for field in schema_fields {
            let arg_type = match field.as_str() {
                "offset" | "limit" => ArgType::Int,
                _ => ArgType::Raw,
            };
            spec = spec.arg(ArgSpec::new(field.clone(), arg_type));
        }

        self.fields
            .iter()
            .cloned()
            .fold(spec, ArgumentSpec::arg)
    }
}

fn paging_args() -> Vec<ArgSpec> {
    DEFAULT_QUERY_FIELDS
        .iter()
        .map(|field| match *field {
            "offset" | "limit" => ArgSpec::new(*field, ArgType::Int),
            _ => ArgSpec::new(*field, ArgType::Str),
        })
        .chain([ArgSpec::new(OBJ_ID, ArgType::Str)])
        .collect()
}

/// `FlexConfigPolicy`: the ordered list of flex-config objects deployed to the device.
#[must_use]
pub fn flex_config_policy() -> ResourceDefinition {
    let schema = ResourceSchema::new(
        "FlexConfigPolicy",
        "/object/flexconfigpolicies",
        ["version", "name", "flexConfigObjects", "id", "type"],
    );

    let mut fields = paging_args();
    fields.extend([
        ArgSpec::new("flexConfigObjects", ArgType::List),
        ArgSpec::new("id", ArgType::Str),
        ArgSpec::new("name", ArgType::Str),
        ArgSpec::new("type", ArgType::Str),
        ArgSpec::new("version", ArgType::Str),
    ]);

    ResourceDefinition {
        module: "flex_config_policy".into(),
        schema,
        fields,
    }
}

/// `FlexConfigObject`: a named block of CLI lines with variables.
#[must_use]
pub fn flex_config_object() -> ResourceDefinition {
    let schema = ResourceSchema::new(
        "FlexConfigObject",
        "/object/flexconfigobjects",
        [
            "version",
            "name",
            "description",
            "lines",
            "negateLines",
            "isBlacklisted",
            "variables",
            "id",
            "type",
        ],
    );

    let mut fields = paging_args();
    fields.extend([
        ArgSpec::new("description", ArgType::Str),
        ArgSpec::new("id", ArgType::Str),
        ArgSpec::new("isBlacklisted", ArgType::Bool),
        ArgSpec::new("lines", ArgType::List),
        ArgSpec::new("name", ArgType::Str),
        ArgSpec::new("negateLines", ArgType::List),
        ArgSpec::new("type", ArgType::Str),
        ArgSpec::new("variables", ArgType::List),
        ArgSpec::new("version", ArgType::Str),
    ]);

    ResourceDefinition {
        module: "flex_config_object".into(),
        schema,
        fields,
    }
}

/// Every built-in resource definition.
#[must_use]
pub fn builtin() -> Vec<ResourceDefinition> {
    vec![flex_config_policy(), flex_config_object()]
}

/// Built-in definition by module name.
#[must_use]
pub fn lookup(module: &str) -> Option<ResourceDefinition> {
    builtin().into_iter().find(|def| def.module == module)
}
