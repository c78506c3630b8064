//! Request Client
//!
//! Authenticated JSON-over-HTTPS client. Attaches the bearer token, turns a
//! 401 into one shared refresh plus exactly one retry, and maps every failure
//! to a typed [`ClientError`].

use std::sync::Arc;

use platform::events::SessionEvents;
use platform::storage::KeyValueStore;
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::application::config::ClientConfig;
use crate::application::refresh::RefreshCoordinator;
use crate::domain::credentials::{Credentials, TokenPair};
use crate::error::{ClientError, ClientResult};
use crate::infra::credential_store::CredentialStore;
use crate::infra::dto::ErrorBody;

/// Method and optional JSON body of a request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
        }
    }

    /// POST with any serializable body
    pub fn post_json<B: Serialize + ?Sized>(body: &B) -> ClientResult<Self> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::Invalid(format!("request body could not be encoded: {e}")))?;
        Ok(Self::post(body))
    }
}

/// Authenticated request client
///
/// Cheap to clone; clones share credentials, the HTTP connection pool and
/// the pending refresh.
#[derive(Clone)]
pub struct RequestClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    credentials: CredentialStore,
    events: SessionEvents,
    refresher: Arc<RefreshCoordinator>,
}

impl RequestClient {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        events: SessionEvents,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let config = Arc::new(config);
        let credentials = CredentialStore::new(store);
        let refresher = Arc::new(RefreshCoordinator::new(
            http.clone(),
            config.clone(),
            credentials.clone(),
            events.clone(),
        ));

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                credentials,
                events,
                refresher,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Session event hub this client publishes expiry on
    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn credentials(&self) -> ClientResult<Credentials> {
        Ok(self.inner.credentials.load()?)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials().is_ok_and(|c| c.is_authenticated())
    }

    /// Send a request.
    ///
    /// With `allow_refresh`, a 401 triggers (or joins) a token refresh and
    /// the request is retried once with the new token. The retry never
    /// refreshes again; its failure is returned as is.
    pub async fn send(
        &self,
        endpoint: &str,
        options: RequestOptions,
        allow_refresh: bool,
    ) -> ClientResult<Response> {
        let sent_with = self.inner.credentials.access_token()?;
        let response = self.dispatch(endpoint, &options, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !allow_refresh {
            return Self::check_status(response).await;
        }

        tracing::debug!(endpoint, "Received 401, refreshing access token");

        // Another request may have refreshed while this one was in flight
        let current = self.inner.credentials.access_token()?;
        let token = match current {
            Some(current) if sent_with.as_deref() != Some(current.as_str()) => {
                tracing::debug!(endpoint, "Access token rotated during request, retrying");
                current
            }
            _ => self.inner.refresher.refresh(sent_with.as_deref()).await?.access_token,
        };

        let retried = self.dispatch(endpoint, &options, Some(&token)).await?;
        Self::check_status(retried).await
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<T> {
        let response = self.send(endpoint, RequestOptions::get(), true).await?;
        Self::read_json(response).await
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(endpoint, RequestOptions::post_json(body)?, true)
            .await?;
        Self::read_json(response).await
    }

    /// Decode a successful response. An empty body decodes as JSON `null`.
    pub async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };

        serde_json::from_slice(bytes).map_err(|e| {
            tracing::warn!(status, error = %e, "Undecodable response body");
            ClientError::InvalidResponse {
                status,
                message: e.to_string(),
            }
        })
    }

    /// Drop both tokens locally
    pub fn sign_out(&self) -> ClientResult<()> {
        self.inner.credentials.clear_all()?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub(crate) fn store_tokens(&self, pair: &TokenPair) -> ClientResult<()> {
        self.inner.credentials.save(pair)?;
        Ok(())
    }

    async fn dispatch(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> ClientResult<Response> {
        let url = self.inner.config.url(endpoint);
        let mut request = self
            .inner
            .http
            .request(options.method.clone(), &url)
            .timeout(self.inner.config.request_timeout);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Request failed before a response");
            ClientError::from(e)
        })
    }

    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let parsed = ErrorBody::parse(&body);
        let message = parsed
            .message()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        tracing::debug!(
            status = status.as_u16(),
            message = %message,
            "Request returned an error status"
        );

        Err(ClientError::Http {
            status: status.as_u16(),
            message,
            code: parsed.error,
        })
    }
}
