//! Uniform success and failure reports.

use crate::params::Params;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reported when an operation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessReport {
    /// Whether remote state may have changed
    pub changed: bool,
    /// Response body of the last remote call (`null` when empty)
    pub response: Value,
    /// `{register_as: response}` when the caller asked for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ansible_facts: Option<Map<String, Value>>,
}

/// Reported when an operation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Always true
    pub failed: bool,
    /// Always false
    pub changed: bool,
    /// Parsed error body for HTTP failures, message text otherwise
    pub msg: Value,
    /// HTTP status of the failed call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
}

/// Outcome of one module invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleResult {
    /// Operation succeeded
    Success(SuccessReport),
    /// Operation failed
    Failure(FailureReport),
}

impl ModuleResult {
    /// Returns true for [`ModuleResult::Failure`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Build the report for `outcome` of the operation invoked with `params`.
    #[must_use]
    pub fn from_outcome(outcome: crate::Result<Value>, params: &Params) -> Self {
        match outcome {
            Ok(response) => Self::Success(normalize(response, params)),
            Err(err) => Self::Failure(classify_failure(&err)),
        }
    }
}

/// Returns true for operation names that only read, i.e. `get*` and `list*`.
#[must_use]
pub fn is_read_operation(operation: &str) -> bool {
    operation.starts_with("get") || operation.starts_with("list")
}

/// Wrap a successful response.
///
/// `changed` follows the `operation` parameter; `register_as` adds the
/// response under that fact name.
#[must_use]
pub fn normalize(response: Value, params: &Params) -> SuccessReport {
    let changed = !params.get_str("operation").is_some_and(is_read_operation);

    let ansible_facts = params.get_str("register_as").map(|fact| {
        let mut facts = Map::new();
        facts.insert(fact.to_string(), response.clone());
        facts
    });

    SuccessReport {
        changed,
        response,
        ansible_facts,
    }
}

/// Turn an error into a failure report.
///
/// HTTP failures carry their status and the parsed body (an empty mapping
/// for an empty body, the raw text if it is not JSON). Every other error is
/// reported by its message alone.
#[must_use]
pub fn classify_failure(err: &Error) -> FailureReport {
    let (msg, error_code) = match err {
        Error::Http { status, body } => {
            let msg = if body.trim().is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()))
            };
            (msg, Some(*status))
        }
        other => (Value::String(other.to_string()), None),
    };

    FailureReport {
        failed: true,
        changed: false,
        msg,
        error_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        Params::from_value(value).unwrap()
    }

    #[test]
    fn read_operations_are_unchanged() {
        let report = normalize(
            json!({"items": []}),
            &params(json!({"operation": "getFlexConfigPolicyList"})),
        );
        assert!(!report.changed);
        assert!(report.ansible_facts.is_none());
    }

    #[test]
    fn mutating_operations_are_changed() {
        for operation in ["addFlexConfigPolicy", "upsertFlexConfigPolicy", "uploadFile"] {
            let report = normalize(Value::Null, &params(json!({ "operation": operation })));
            assert!(report.changed, "{operation}");
        }
    }

    #[test]
    fn register_as_publishes_fact() {
        let report = normalize(
            json!({"id": "1"}),
            &params(json!({"operation": "addFlexConfigPolicy", "register_as": "policy"})),
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "changed": true,
                "response": {"id": "1"},
                "ansible_facts": {"policy": {"id": "1"}}
            })
        );
    }

    #[test]
    fn http_failure_keeps_status_and_parsed_body() {
        let report = classify_failure(&Error::Http {
            status: 422,
            body: r#"{"error": {"key": "Validation"}}"#.to_string(),
        });
        assert_eq!(report.error_code, Some(422));
        assert_eq!(report.msg, json!({"error": {"key": "Validation"}}));
        assert!(report.failed);
        assert!(!report.changed);
    }

    #[test]
    fn http_failure_with_empty_body_is_empty_mapping() {
        let report = classify_failure(&Error::Http {
            status: 404,
            body: String::new(),
        });
        assert_eq!(report.msg, json!({}));
        assert_eq!(report.error_code, Some(404));
    }

    #[test]
    fn http_failure_with_text_body_keeps_text() {
        let report = classify_failure(&Error::Http {
            status: 502,
            body: "Bad Gateway".to_string(),
        });
        assert_eq!(report.msg, json!("Bad Gateway"));
    }

    #[test]
    fn other_errors_have_no_code() {
        let report = classify_failure(&Error::NotFound("FlexConfigPolicy `x`".into()));
        assert_eq!(report.error_code, None);
        assert_eq!(report.msg, json!("Not found: FlexConfigPolicy `x`"));

        let rendered = serde_json::to_value(ModuleResult::Failure(report)).unwrap();
        assert_eq!(
            rendered,
            json!({"failed": true, "changed": false, "msg": "Not found: FlexConfigPolicy `x`"})
        );
    }

    #[test]
    fn from_outcome_picks_variant() {
        let params = params(json!({"operation": "getFlexConfigPolicy"}));
        assert!(!ModuleResult::from_outcome(Ok(Value::Null), &params).is_failure());
        assert!(
            ModuleResult::from_outcome(Err(Error::Timeout("slow".into())), &params).is_failure()
        );
    }
}
