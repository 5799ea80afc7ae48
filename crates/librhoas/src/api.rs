//! Typed clients for the Kafka and Service Registry management APIs.
//!
//! Requests are built from a [`ServiceClient`] and then `execute()`d. Failures
//! come back as [`ApiError`] carrying the HTTP status, so each command can map
//! it to its own message with a [`StatusMessages`] table.

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::{Error, config::ServiceKind};

/// The API families the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFamily {
    KafkaMgmt,
    ServiceRegistryMgmt,
}

impl ApiFamily {
    fn collection_path(&self) -> &'static str {
        match self {
            ApiFamily::KafkaMgmt => "api/kafkas_mgmt/v1/kafkas",
            ApiFamily::ServiceRegistryMgmt => "api/serviceregistry_mgmt/v1/registries",
        }
    }
}

impl From<ServiceKind> for ApiFamily {
    fn from(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::Kafka => ApiFamily::KafkaMgmt,
            ServiceKind::ServiceRegistry => ApiFamily::ServiceRegistryMgmt,
        }
    }
}

/// A managed service instance as returned by either API family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Kafka bootstrap host or registry URL.
    #[serde(
        default,
        alias = "bootstrap_server_host",
        alias = "registryUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceList {
    #[serde(default)]
    pub items: Vec<Instance>,
    #[serde(default)]
    pub total: i64,
}

/// Response metadata kept alongside a decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub request_id: Option<String>,
}

impl ResponseMeta {
    fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            request_id: response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        }
    }
}

/// A failed management API call.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// Missing when the request never got a response.
    pub meta: Option<ResponseMeta>,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        self.meta.as_ref().map(|m| m.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }

    /// Map to a user-facing error through a command's message table.
    pub fn into_error(self, messages: &StatusMessages) -> Error {
        match self.status() {
            Some(status) => Error::Api {
                status,
                message: messages
                    .lookup(status)
                    .map(String::from)
                    .unwrap_or_else(|| format!("{status}: {}", self.message)),
            },
            None => Error::Remote(self.message),
        }
    }
}

/// Per-command messages for well-known HTTP statuses.
#[derive(Debug, Clone, Copy)]
pub struct StatusMessages(pub &'static [(u16, &'static str)]);

impl StatusMessages {
    pub fn lookup(&self, status: u16) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, message)| *message)
    }
}

/// Entry point to the management APIs for one connection.
#[derive(Clone)]
pub struct Api {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl Api {
    pub fn new(http: reqwest::Client, base_url: Url, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    pub fn kafka_mgmt(&self) -> ServiceClient<'_> {
        self.service(ApiFamily::KafkaMgmt)
    }

    pub fn service_registry_mgmt(&self) -> ServiceClient<'_> {
        self.service(ApiFamily::ServiceRegistryMgmt)
    }

    pub fn service(&self, family: ApiFamily) -> ServiceClient<'_> {
        ServiceClient { api: self, family }
    }

    fn collection_url(&self, family: ApiFamily) -> Url {
        let mut url = self.base_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{}", family.collection_path()));
        url
    }
}

pub struct ServiceClient<'a> {
    api: &'a Api,
    family: ApiFamily,
}

impl<'a> ServiceClient<'a> {
    pub fn get(&self, id: impl Into<String>) -> GetInstance<'a> {
        GetInstance {
            api: self.api,
            family: self.family,
            id: id.into(),
        }
    }

    pub fn list(&self) -> ListInstances<'a> {
        ListInstances {
            api: self.api,
            family: self.family,
            search: None,
            page: None,
            size: None,
        }
    }
}

pub struct GetInstance<'a> {
    api: &'a Api,
    family: ApiFamily,
    id: String,
}

impl GetInstance<'_> {
    pub async fn execute(self) -> Result<(Instance, ResponseMeta), ApiError> {
        let collection = self.api.collection_url(self.family);
        let mut url = collection.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError {
                meta: None,
                message: format!("API URL cannot have a path: {collection}"),
            })?
            .push(&self.id);

        tracing::debug!(%url, "fetching instance");
        send_json(self.api.http.get(url).bearer_auth(&self.api.token)).await
    }
}

pub struct ListInstances<'a> {
    api: &'a Api,
    family: ApiFamily,
    search: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
}

impl ListInstances<'_> {
    /// Filter expression, e.g. `name = my-kafka`.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub async fn execute(self) -> Result<(InstanceList, ResponseMeta), ApiError> {
        let url = self.api.collection_url(self.family);
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            query.push(("size", size.to_string()));
        }
        if let Some(search) = self.search {
            query.push(("search", search));
        }

        tracing::debug!(%url, ?query, "listing instances");
        send_json(
            self.api
                .http
                .get(url)
                .query(&query)
                .bearer_auth(&self.api.token),
        )
        .await
    }
}

async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<(T, ResponseMeta), ApiError> {
    let response = request.send().await.map_err(|e| ApiError {
        meta: None,
        message: e.to_string(),
    })?;
    let meta = ResponseMeta::from_response(&response);

    if !response.status().is_success() {
        tracing::debug!(
            status = meta.status,
            request_id = ?meta.request_id,
            "management API request failed"
        );
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError {
            message: error_reason(&body).unwrap_or_else(|| {
                StatusCode::from_u16(meta.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("request failed")
                    .to_string()
            }),
            meta: Some(meta),
        });
    }

    let body = response.json::<T>().await.map_err(|e| ApiError {
        meta: Some(meta.clone()),
        message: format!("invalid response body: {e}"),
    })?;
    Ok((body, meta))
}

/// The management APIs answer errors with `{"reason": "..."}`.
fn error_reason(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        reason: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.reason)
        .filter(|r| !r.is_empty())
}
