//! Declarative argument schemas.
//!
//! Every module declares the arguments it accepts. Validation runs before any
//! remote call: required arguments are checked first, then the type and the
//! allowed choices of each present argument. Values are converted the way the
//! automation tool converts them (numbers to strings for `str`, numeric strings
//! to integers for `int`, comma-separated strings to lists).

use fdm_core::{Error, Params, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accepted type of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    /// Text
    Str,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// List of values
    List,
    /// Mapping
    Dict,
    /// Local filesystem path
    Path,
    /// Any JSON value, passed through
    Raw,
}

impl ArgType {
    const fn label(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Path => "path",
            Self::Raw => "raw",
        }
    }

    fn convert(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Raw, v) => Some(v.clone()),
            (Self::Str | Self::Path, Value::String(_)) => Some(value.clone()),
            (Self::Str, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::Str, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Bool, Value::Bool(_)) => Some(value.clone()),
            (Self::Bool, Value::String(s)) => parse_bool(s).map(Value::Bool),
            (Self::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            (Self::List, Value::Array(_)) => Some(value.clone()),
            (Self::List, Value::String(s)) => Some(Value::Array(
                s.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            )),
            (Self::List, Value::Number(_) | Value::Bool(_)) => {
                Some(Value::Array(vec![value.clone()]))
            }
            (Self::Dict, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "on" | "1" | "true" | "y" | "t" => Some(true),
        "no" | "off" | "0" | "false" | "n" | "f" => Some(false),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// One declared argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Argument name
    pub name: String,
    /// Accepted type
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    /// Whether the argument must be present
    #[serde(default)]
    pub required: bool,
    /// Allowed values, when enumerated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl ArgSpec {
    /// Optional argument of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            name: name.into(),
            arg_type,
            required: false,
            choices: None,
        }
    }

    /// Mark the argument as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restrict the argument to `choices`.
    #[must_use]
    pub fn with_choices<S: Into<String>>(mut self, choices: impl IntoIterator<Item = S>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }
}

/// The full argument schema of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    args: Vec<ArgSpec>,
}

impl ArgumentSpec {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, replacing an earlier one with the same name.
    #[must_use]
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.retain(|existing| existing.name != spec.name);
        self.args.push(spec);
        self
    }

    /// Look up a declared argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgSpec> {
        self.args.iter().find(|spec| spec.name == name)
    }

    /// Declared argument names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|spec| spec.name.as_str())
    }

    /// Check `input` and return it with declared values converted.
    ///
    /// Undeclared keys are kept as they are; projection ignores them later.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] naming every missing required
    /// argument, the first choice violation, or the first type mismatch.
    /// Operation choices are reported as [`Error::UnknownOperation`].
    pub fn validate(&self, input: &Params) -> Result<Params> {
        let mut missing: Vec<&str> = self
            .args
            .iter()
            .filter(|spec| spec.required && !input.contains(&spec.name))
            .map(|spec| spec.name.as_str())
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(Error::ValidationError(format!(
                "missing required arguments: {}",
                missing.join(", ")
            )));
        }

        let mut output = input.clone();
        for spec in &self.args {
            let Some(value) = input.get(&spec.name) else {
                continue;
            };

            let converted = spec.arg_type.convert(value).ok_or_else(|| {
                Error::ValidationError(format!(
                    "argument {} is of type {} and we were unable to convert to {}",
                    spec.name,
                    json_type_name(value),
                    spec.arg_type.label()
                ))
            })?;

            if let Some(choices) = &spec.choices {
                let rendered = match &converted {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if !choices.iter().any(|choice| *choice == rendered) {
                    let message = format!(
                        "value of {} must be one of: {}, got: {rendered}",
                        spec.name,
                        choices.join(", ")
                    );
                    return Err(if spec.name == "operation" {
                        Error::UnknownOperation(message)
                    } else {
                        Error::ValidationError(message)
                    });
                }
            }

            output.insert(spec.name.clone(), converted);
        }

        Ok(output)
    }
}

/// Arguments shared by every module: the appliance, the tokens and the fact name.
#[must_use]
pub fn connection_args() -> ArgumentSpec {
    ArgumentSpec::new()
        .arg(ArgSpec::new("hostname", ArgType::Str).required())
        .arg(ArgSpec::new("access_token", ArgType::Str).required())
        .arg(ArgSpec::new("refresh_token", ArgType::Str).required())
        .arg(ArgSpec::new("register_as", ArgType::Str))
}
