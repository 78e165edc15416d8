//! HTTP client for a Confluent-compatible schema registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result, SchemaError};
use crate::schema::SchemaId;

use super::{RegisteredSchema, RegistryBackend};

const REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";
const SCHEMA_TYPE_AVRO: &str = "AVRO";

/// Registry error codes that mean "nothing registered yet"
const SUBJECT_NOT_FOUND: u32 = 40401;
const VERSION_NOT_FOUND: u32 = 40402;

const OP_FETCH_LATEST: &str = "fetch latest schema";
const OP_CREATE: &str = "create schema";
const OP_LOOKUP: &str = "look up schema version";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    schema: &'a str,
    schema_type: &'static str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: SchemaId,
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: Option<u32>,
    message: Option<String>,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// HTTP client for the registry REST API.
///
/// Credentials and the request deadline are fixed at construction and
/// applied to every call. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct HttpRegistryClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl HttpRegistryClient {
    /// Create a new registry client from configuration.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let invalid_url = |reason: String| SchemaError::InvalidRegistryUrl {
            url: config.url.clone(),
            reason,
        };
        let base_url = Url::parse(&config.url).map_err(|e| invalid_url(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_url("url cannot carry a path".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SchemaError::HttpClient)?;

        let credentials = config.credentials().map(|(username, password)| Credentials {
            username: username.to_owned(),
            password: password.to_owned(),
        });

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL from path segments; each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(ACCEPT, REGISTRY_CONTENT_TYPE);
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, Some(&c.password)),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        subject: &str,
        builder: RequestBuilder,
    ) -> std::result::Result<T, RegistryError> {
        let transport = |source: reqwest::Error| RegistryError::Transport {
            operation,
            subject: subject.to_owned(),
            source,
        };

        let response = self.authorize(builder).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if status.is_success() {
            return serde_json::from_slice(&body).map_err(|e| RegistryError::InvalidResponse {
                operation,
                subject: subject.to_owned(),
                reason: e.to_string(),
            });
        }

        let (error_code, message) = match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(err) => (
                err.error_code,
                err.message.unwrap_or_else(|| status.to_string()),
            ),
            Err(_) => (None, String::from_utf8_lossy(&body).trim().to_owned()),
        };

        Err(RegistryError::Status {
            operation,
            subject: subject.to_owned(),
            status: status.as_u16(),
            error_code,
            message,
        })
    }

    fn register_body(spec: &str) -> RegisterRequest<'_> {
        RegisterRequest {
            schema: spec,
            schema_type: SCHEMA_TYPE_AVRO,
        }
    }
}

#[async_trait]
impl RegistryBackend for HttpRegistryClient {
    async fn fetch_latest(
        &self,
        subject: &str,
    ) -> std::result::Result<RegisteredSchema, RegistryError> {
        let url = self.url(&["subjects", subject, "versions", "latest"]);
        tracing::debug!(subject, %url, "fetching latest schema");

        let result = self
            .send::<RegisteredSchema>(OP_FETCH_LATEST, subject, self.client.get(url))
            .await;

        match result {
            Err(RegistryError::Status {
                status: 404,
                error_code: Some(SUBJECT_NOT_FOUND | VERSION_NOT_FOUND),
                ..
            }) => Err(RegistryError::NotFound {
                subject: subject.to_owned(),
            }),
            other => other,
        }
    }

    async fn create(
        &self,
        subject: &str,
        spec: &str,
    ) -> std::result::Result<RegisteredSchema, RegistryError> {
        let body = Self::register_body(spec);

        let url = self.url(&["subjects", subject, "versions"]);
        tracing::debug!(subject, %url, "registering schema");
        let created: RegisterResponse = self
            .send(
                OP_CREATE,
                subject,
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, REGISTRY_CONTENT_TYPE)
                    .json(&body),
            )
            .await?;

        // Registration only answers with the id; the lookup endpoint
        // reports which version of the subject holds it.
        let url = self.url(&["subjects", subject]);
        let registered: RegisteredSchema = self
            .send(
                OP_LOOKUP,
                subject,
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, REGISTRY_CONTENT_TYPE)
                    .json(&body),
            )
            .await?;

        if registered.id != created.id {
            return Err(RegistryError::InvalidResponse {
                operation: OP_LOOKUP,
                subject: subject.to_owned(),
                reason: format!(
                    "lookup returned schema id {} but registration assigned {}",
                    registered.id, created.id
                ),
            });
        }

        Ok(registered)
    }
}
