use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::navigation::{self, Navigator};
use crate::storage::SessionStorage;
use crate::types::Credential;

type UnauthorizedHook = Box<dyn Fn() + Send + Sync>;

/// The single outgoing HTTP client.
///
/// Every request is sent relative to the configured base address with JSON
/// headers and, when a credential is stored, `Authorization: Bearer <token>`.
/// A `401` from any call site tears the persisted session down, runs the
/// registered [`on_unauthorized`](Self::on_unauthorized) callbacks and sends
/// the user to the login view, provided the stored credential is still the
/// one the request carried.
pub struct ApiGateway {
    http: reqwest::Client,
    base_url: Url,
    login_path: String,
    storage: Arc<SessionStorage>,
    navigator: Arc<dyn Navigator>,
    unauthorized_hooks: RwLock<Vec<UnauthorizedHook>>,
}

impl ApiGateway {
    /// Create a gateway with a client built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        storage: Arc<SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: Self::build_http_client(config, None)?,
            base_url: config.base_url.clone(),
            login_path: config.login_path.clone(),
            storage,
            navigator,
            unauthorized_hooks: RwLock::new(Vec::new()),
        })
    }

    /// Use a custom HTTP client (for a shared cookie jar or testing).
    ///
    /// The client is used as-is; see [`build_http_client`](Self::build_http_client)
    /// for one carrying the JSON default headers.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Build a client with JSON default headers, the configured timeout and an
    /// optional cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the TLS backend cannot be initialised.
    pub fn build_http_client(
        config: &ClientConfig,
        jar: Option<Arc<Jar>>,
    ) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }
        builder.build().map_err(Into::into)
    }

    /// Register a callback run after every unauthorized response, once the
    /// persisted session has been cleared.
    ///
    /// Callbacks must not register further callbacks.
    pub fn on_unauthorized(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.unauthorized_hooks.write().push(Box::new(hook));
    }

    /// Backend base address.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client path unauthorized users are sent to.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Persisted session entries.
    #[must_use]
    pub fn storage(&self) -> &Arc<SessionStorage> {
        &self.storage
    }

    /// Navigator used for login redirects.
    #[must_use]
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Absolute URL of `path`, keeping the base address's own path prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the result is not a valid URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(format!("{base}/{path}").parse()?)
    }

    /// Send a request and return the raw response once it has passed the
    /// status checks.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] on transport failure
    /// - [`Error::Unauthorized`] on `401`, after the session teardown ran
    /// - [`Error::Api`] on any other non-success status
    pub async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response, Error>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.http.request(method.clone(), self.url(path)?);
        let credential = self.storage.credential();
        if let Some(credential) = &credential {
            request = request.bearer_auth(credential.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, path, error = %e, "Request failed in transport");
            Error::from(e)
        })?;
        self.intercept(method, path, credential.as_ref(), response).await
    }

    /// Send a request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus [`Error::Http`] if the body does not decode.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// Send a request whose response body is irrelevant.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send).
    pub async fn send_empty<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        self.send(method, path, body).await.map(drop)
    }

    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }

    async fn intercept(
        &self,
        method: Method,
        path: &str,
        sent: Option<&Credential>,
        response: Response,
    ) -> Result<Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(path, sent);
            return Err(Error::Unauthorized {
                path: path.to_owned(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%method, path, status = status.as_u16(), "Request rejected");
        Err(Error::Api {
            method,
            path: path.to_owned(),
            status: status.as_u16(),
            message: backend_message(&body),
        })
    }

    /// Tear down the session the rejected request was sent with. A rejection
    /// of a credential that has since been replaced or cleared is ignored.
    fn handle_unauthorized(&self, path: &str, sent: Option<&Credential>) {
        if self.storage.credential().as_ref() != sent {
            tracing::debug!(path, "Unauthorized response for a replaced credential, ignoring");
            return;
        }
        tracing::warn!(path, "Unauthorized response, tearing down session");
        self.storage.clear_logged();

        for hook in self.unauthorized_hooks.read().iter() {
            hook();
        }

        let current = self.navigator.current();
        if navigation::is_at(&current, &self.login_path) {
            tracing::debug!(current = %current, "Already at login view");
        } else {
            self.navigator.navigate(&self.login_path);
        }
    }
}

/// `message` (or `error`) field of a JSON error body.
fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}
