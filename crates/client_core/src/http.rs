//! Shared outbound request object.
//!
//! Every backend call goes through [`ApiClient`]: it resolves paths against the
//! configured base URL, sends JSON, attaches the stored bearer token, and turns
//! a 401 into a global logout.

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client, Method, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use shared::error::ApiError;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    config::{normalize_base_url, ClientSettings},
    error::ClientError,
    storage::LocalStorage,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Unauthorized,
    UserRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut { reason: LogoutReason },
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    storage: LocalStorage,
    session: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(base_url: &str, storage: LocalStorage) -> Result<Self, ClientError> {
        Self::from_settings(
            &ClientSettings {
                api_base_url: base_url.to_string(),
                ..ClientSettings::default()
            },
            storage,
        )
    }

    pub fn from_settings(
        settings: &ClientSettings,
        storage: LocalStorage,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(&normalize_base_url(&settings.api_base_url))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let (session, _) = broadcast::channel(16);
        Ok(Self {
            http: builder.build()?,
            base_url,
            storage,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn subscribe_session(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub(crate) fn notify_session(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.session.send(event);
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.url(path)?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.storage.token()? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let builder = self.request(Method::GET, path)?;
        self.execute(path, builder).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        self.execute(path, builder).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path)?.json(body);
        self.execute(path, builder).await
    }

    pub async fn post_idempotent<B, T>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Uuid,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .request(Method::POST, path)?
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(body);
        self.execute(path, builder).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.execute(path, builder).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PATCH, path)?.json(body);
        self.execute(path, builder).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let builder = self.request(Method::DELETE, path)?;
        self.send(path, builder).await.map(|_| ())
    }

    pub async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body = self.send(path, builder).await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = builder.send().await.map_err(|error| {
            warn!(path, %error, "request failed before a response arrived");
            ClientError::Transport(error)
        })?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(path);
            return Err(ClientError::Unauthorized);
        }

        let body = response.bytes().await?.to_vec();
        if !status.is_success() {
            let error = serde_json::from_slice::<ApiError>(&body).ok();
            let body = String::from_utf8_lossy(&body).into_owned();
            debug!(path, status = status.as_u16(), "backend returned error status");
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                error,
                body,
            });
        }

        Ok(body)
    }

    fn handle_unauthorized(&self, path: &str) {
        warn!(path, "backend rejected credentials; signing out");
        if let Err(error) = self.storage.clear_token() {
            warn!(%error, "failed to clear stored token after 401");
        }
        self.notify_session(SessionEvent::LoggedOut {
            reason: LogoutReason::Unauthorized,
        });
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
