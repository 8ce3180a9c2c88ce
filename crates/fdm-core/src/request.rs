//! HTTP request construction.
//!
//! [`ApiEndpoint::build_request`] turns a path template plus projected
//! parameter sets into a fully resolved [`RequestSpec`]. Building is pure; the
//! network call happens in [`crate::http`].

use crate::params::Params;
use crate::query::QueryParams;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// A fully resolved request, ready to be sent.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Absolute URL including the query string
    pub url: Url,
    /// Request headers; the authorization value is marked sensitive
    pub headers: HeaderMap,
    /// JSON body, if any
    pub body: Option<Value>,
}

/// Root of the versioned API on one appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    base: Url,
}

impl ApiEndpoint {
    /// Wrap an already combined hostname + API prefix URL.
    #[must_use]
    pub const fn new(base: Url) -> Self {
        Self { base }
    }

    /// Return the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `template` against the base URL without query or headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPathParameter`] when a `{placeholder}` has no
    /// value in `path_params`.
    pub fn resolve(&self, template: &str, path_params: &Params) -> Result<Url> {
        let mut url = self.base.clone();
        let segments = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| substitute(segment, path_params))
            .collect::<Result<Vec<_>>>()?;

        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidEndpoint(format!("`{}` cannot be a base URL", self.base))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Build a request against `template`.
    ///
    /// Query parameters with empty values are omitted. The bearer token is sent
    /// in the `Authorization` header together with JSON content negotiation
    /// headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPathParameter`] for unresolved placeholders and
    /// [`Error::ValidationError`] if the token is not a valid header value.
    pub fn build_request(
        &self,
        method: Method,
        template: &str,
        path_params: &Params,
        query_params: &Params,
        access_token: &str,
        body: Option<Value>,
    ) -> Result<RequestSpec> {
        let mut url = self.resolve(template, path_params)?;

        let query = QueryParams::from_params(query_params);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.into_pairs());
        }

        Ok(RequestSpec {
            method,
            url,
            headers: base_headers(access_token)?,
            body,
        })
    }
}

/// Standard headers for every FDM call.
///
/// # Errors
///
/// Returns [`Error::ValidationError`] if the token contains characters that
/// are not allowed in a header.
pub fn base_headers(access_token: &str) -> Result<HeaderMap> {
    let mut authorization = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|_| Error::ValidationError("access_token is not a valid header value".into()))?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
    Ok(headers)
}

fn substitute(segment: &str, path_params: &Params) -> Result<String> {
    let mut resolved = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = path_params
            .get(name)
            .map(render_path_value)
            .ok_or_else(|| Error::MissingPathParameter(name.to_string()))?;

        resolved.push_str(&rest[..start]);
        resolved.push_str(&value);
        rest = &rest[start + len + 1..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}

fn render_path_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
