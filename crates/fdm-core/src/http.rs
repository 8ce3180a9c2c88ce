//! Asynchronous FDM client.
//!
//! [`FdmClient`] owns the `reqwest` client, the API endpoint and the token
//! store. Every remote call goes through
//! [`retry_on_token_expiration`](crate::auth::retry_on_token_expiration).

use crate::auth::{
    retry_on_token_expiration, Credentials, HttpTokenRefresher, TokenRefresher, TokenStore,
};
use crate::client::ClientConfig;
use crate::config::FdmConfig;
use crate::params::Params;
use crate::request::{base_headers, ApiEndpoint, RequestSpec};
use crate::schema::OperationDescriptor;
use crate::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method, Response};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("fdm-core/", env!("CARGO_PKG_VERSION"));

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "fileToUpload";

/// Builder for [`FdmClient`].
pub struct FdmClientBuilder {
    config: FdmConfig,
    http_config: Option<ClientConfig>,
    credentials: Credentials,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl FdmClientBuilder {
    /// Create a builder for the given appliance and credentials.
    #[must_use]
    pub fn new(config: FdmConfig, credentials: Credentials) -> Self {
        Self {
            config,
            http_config: None,
            credentials,
            refresher: None,
        }
    }

    /// Override the HTTP client configuration.
    ///
    /// Its timeout takes precedence over the one in [`FdmConfig`].
    #[must_use]
    pub fn with_http_config(mut self, http_config: ClientConfig) -> Self {
        self.http_config = Some(http_config);
        self
    }

    /// Replace the token refresher (defaults to the appliance token endpoint).
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the hostname, CA certificate or HTTP
    /// client settings are unusable.
    pub fn build(self) -> Result<FdmClient> {
        let endpoint = ApiEndpoint::new(self.config.api_base_url()?);

        let http_config = self
            .http_config
            .unwrap_or_else(|| ClientConfig::new().with_timeout(self.config.timeout()));

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(http_config.timeout)
            .connect_timeout(http_config.connect_timeout)
            .pool_idle_timeout(http_config.pool_idle_timeout)
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .gzip(http_config.enable_compression);

        if !self.config.tls_verify {
            warn!("TLS verification disabled for FDM client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &self.config.tls_ca_cert {
            debug!("loading FDM CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::ConfigError(format!(
                    "Failed to read CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::ConfigError(format!("Invalid CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        let refresher = match self.refresher {
            Some(refresher) => refresher,
            None => {
                let token_url = endpoint.resolve(&self.config.token_path, &Params::new())?;
                Arc::new(HttpTokenRefresher::new(http.clone(), token_url))
            }
        };

        Ok(FdmClient {
            http,
            endpoint,
            tokens: Arc::new(TokenStore::new(self.credentials)),
            refresher,
        })
    }
}

/// Asynchronous client for one appliance and one set of credentials.
#[derive(Clone)]
pub struct FdmClient {
    http: Client,
    endpoint: ApiEndpoint,
    tokens: Arc<TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
}

impl FdmClient {
    /// Start a builder.
    #[must_use]
    pub fn builder(config: FdmConfig, credentials: Credentials) -> FdmClientBuilder {
        FdmClientBuilder::new(config, credentials)
    }

    /// Return the API base URL (hostname plus prefix).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        self.endpoint.base_url()
    }

    /// Access the token store, e.g. to read back refreshed tokens.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Execute one primitive operation.
    ///
    /// Path, query and body parameters are projected out of `params` using the
    /// descriptor's field lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] for non-success statuses, after at most one
    /// token refresh.
    pub async fn call(&self, op: &OperationDescriptor, params: &Params) -> Result<Value> {
        let path_params = params.project(&op.path_fields);
        let query_params = params.project(&op.query_fields);
        let body = (!op.body_fields.is_empty())
            .then(|| params.project(&op.body_fields).into_value());

        debug!(operation = %op.name, method = %op.method, path = %op.path_template, "calling FDM operation");
        self.send_json(
            op.method.clone(),
            &op.path_template,
            &path_params,
            &query_params,
            body,
        )
        .await
    }

    /// Send a JSON request, refreshing the token once on 401.
    ///
    /// # Errors
    ///
    /// Propagates request building, transport and HTTP status errors.
    pub async fn send_json(
        &self,
        method: Method,
        template: &str,
        path_params: &Params,
        query_params: &Params,
        body: Option<Value>,
    ) -> Result<Value> {
        let client = self;
        retry_on_token_expiration(&self.tokens, self.refresher.as_ref(), move || {
            let spec = client.endpoint.build_request(
                method.clone(),
                template,
                path_params,
                query_params,
                &client.tokens.access_token(),
                body.clone(),
            );
            async move { client.send(spec?).await }
        })
        .await
    }

    /// Upload a local file as multipart form data to `template`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the same
    /// errors as [`FdmClient::send_json`].
    pub async fn upload_file(&self, template: &str, file: &Path) -> Result<Value> {
        let contents = tokio::fs::read(file)
            .await
            .map_err(|err| Error::Io(format!("cannot read {}: {err}", file.display())))?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(UPLOAD_FIELD)
            .to_string();
        let url = self.endpoint.resolve(template, &Params::new())?;

        debug!(url = %url, file = %file.display(), bytes = contents.len(), "uploading file");
        let client = self;
        retry_on_token_expiration(&self.tokens, self.refresher.as_ref(), move || {
            let form = Form::new().part(
                UPLOAD_FIELD,
                Part::bytes(contents.clone()).file_name(file_name.clone()),
            );
            let headers = base_headers(&client.tokens.access_token()).map(|mut headers| {
                headers.remove(CONTENT_TYPE);
                headers
            });
            let url = url.clone();
            async move {
                let response = client
                    .http
                    .post(url)
                    .headers(headers?)
                    .multipart(form)
                    .send()
                    .await?;
                read_response(response).await
            }
        })
        .await
    }

    async fn send(&self, spec: RequestSpec) -> Result<Value> {
        debug!(method = %spec.method, url = %spec.url, "sending FDM request");
        let mut request = self
            .http
            .request(spec.method, spec.url)
            .headers(spec.headers);
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        read_response(request.send().await?).await
    }
}

async fn read_response(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        debug!(status = status.as_u16(), "FDM request failed");
        return Err(Error::Http {
            status: status.as_u16(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text)
        .map_err(|err| Error::ParseError(format!("invalid JSON in FDM response: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockTokenRefresher;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> FdmConfig {
        FdmConfig::new(server.uri()).unwrap()
    }

    fn test_client(server: &MockServer) -> FdmClient {
        FdmClient::builder(config(server), Credentials::new("ACCESS", "REFRESH"))
            .build()
            .unwrap()
    }

    fn list_descriptor() -> OperationDescriptor {
        OperationDescriptor {
            name: "getWidgetList".into(),
            method: Method::GET,
            path_template: "/object/widgets".into(),
            body_fields: vec![],
            query_fields: vec!["offset".into(), "limit".into(), "filter".into()],
            path_fields: vec![],
        }
    }

    #[tokio::test]
    async fn call_projects_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fdm/v2/object/widgets"))
            .and(query_param("limit", "5"))
            .and(query_param("filter", "name:w"))
            .and(header("Authorization", "Bearer ACCESS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let params = Params::from_value(json!({
            "limit": 5,
            "filter": "name:w",
            "hostname": "ignored",
            "name": "ignored"
        }))
        .unwrap();

        let response = test_client(&server)
            .call(&list_descriptor(), &params)
            .await
            .unwrap();
        assert_eq!(response, json!({"items": []}));
    }

    #[tokio::test]
    async fn call_sends_projected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/fdm/v2/object/widgets"))
            .and(body_json(json!({"name": "w", "type": "widget"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "1"})))
            .mount(&server)
            .await;

        let descriptor = OperationDescriptor {
            name: "addWidget".into(),
            method: Method::POST,
            path_template: "/object/widgets".into(),
            body_fields: vec!["name".into(), "type".into(), "id".into()],
            query_fields: vec![],
            path_fields: vec![],
        };
        let params = Params::from_value(json!({
            "name": "w",
            "type": "widget",
            "operation": "addWidget"
        }))
        .unwrap();

        let created = test_client(&server).call(&descriptor, &params).await.unwrap();
        assert_eq!(created["id"], "1");
    }

    #[tokio::test]
    async fn empty_body_becomes_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/fdm/v2/object/widgets/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let path_params: Params = [("objId", json!("7"))].into_iter().collect();
        let response = test_client(&server)
            .send_json(
                Method::DELETE,
                "/object/widgets/{objId}",
                &path_params,
                &Params::new(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(response, Value::Null);
    }

    #[tokio::test]
    async fn error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"boom"}"#))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .call(&list_descriptor(), &Params::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Http {
                status: 500,
                body: r#"{"error":"boom"}"#.to_string()
            }
        );
    }

    #[tokio::test]
    async fn unauthorized_triggers_refresh_through_token_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fdm/v2/object/widgets"))
            .and(header("Authorization", "Bearer ACCESS"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/fdm/v2/fdm/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "FRESH",
                "refresh_token": "FRESH_REFRESH"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/fdm/v2/object/widgets"))
            .and(header("Authorization", "Bearer FRESH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client
            .call(&list_descriptor(), &Params::new())
            .await
            .unwrap();

        assert_eq!(response, json!({"items": [1]}));
        assert_eq!(client.tokens().access_token(), "FRESH");
    }

    #[tokio::test]
    async fn server_error_never_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);

        let client = FdmClient::builder(config(&server), Credentials::new("A", "R"))
            .with_refresher(Arc::new(refresher))
            .build()
            .unwrap();

        let err = client
            .call(&list_descriptor(), &Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn http_config_timeout_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fdm/v2/object/widgets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = FdmClient::builder(config(&server), Credentials::new("ACCESS", "REFRESH"))
            .with_http_config(ClientConfig::new().with_timeout(Duration::from_millis(500)))
            .build()
            .unwrap();
        let err = client
            .call(&list_descriptor(), &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn upload_sends_multipart_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/fdm/v2/action/uploaddiskfile"))
            .and(header("Authorization", "Bearer ACCESS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "123",
                "type": "fileuploadstatus"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("test.txt");
        std::fs::write(&file_path, b"hello").unwrap();

        let response = test_client(&server)
            .upload_file("/action/uploaddiskfile", &file_path)
            .await
            .unwrap();
        assert_eq!(response["id"], "123");

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"fileToUpload\""));
        assert!(body.contains("filename=\"test.txt\""));
        assert!(body.contains("hello"));
    }

    #[tokio::test]
    async fn upload_missing_file_fails_before_request() {
        let server = MockServer::start().await;
        let err = test_client(&server)
            .upload_file("/action/uploaddiskfile", Path::new("/nonexistent/fdm/file.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
