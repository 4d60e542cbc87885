//! Application-level wiring of the session layer.

use std::sync::Arc;

use reqwest::cookie::Jar;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::gateway::ApiGateway;
use crate::guard::{Access, RoleRequirement, RouteGuard};
use crate::navigation::Navigator;
use crate::session::SessionStore;
use crate::storage::{CookieCredential, DurableStorage, SessionStorage};
use crate::ui::{self, NavItem, UiStore};

/// One gateway, one session store, one guard and one UI store, sharing a
/// storage backend and a navigator.
///
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct MarketplaceClient {
    config: Arc<ClientConfig>,
    gateway: Arc<ApiGateway>,
    session: SessionStore,
    guard: RouteGuard,
    ui: UiStore,
}

impl MarketplaceClient {
    /// Wire the layer on top of `storage` and `navigator`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        let storage = Arc::new(SessionStorage::new(storage));
        let gateway = ApiGateway::new(&config, storage, navigator)?;
        Ok(Self::assemble(config, gateway))
    }

    /// Like [`new`](Self::new), but the HTTP client shares `jar`, and a
    /// credential cookie in it is honoured when storage holds none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn with_cookie_jar(
        config: ClientConfig,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
        jar: Arc<Jar>,
    ) -> Result<Self, Error> {
        let cookie = CookieCredential::new(
            jar.clone(),
            config.base_url().clone(),
            config.credential_cookie(),
        );
        let storage = Arc::new(SessionStorage::new(storage).with_fallback(Arc::new(cookie)));
        let http = ApiGateway::build_http_client(&config, Some(jar))?;
        let gateway = ApiGateway::new(&config, storage, navigator)?.with_http_client(http);
        Ok(Self::assemble(config, gateway))
    }

    /// [`new`](Self::new) with [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] or [`Error::Url`] for bad environment
    /// values, or [`Error::Http`].
    pub fn from_env(
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        Self::new(ClientConfig::from_env()?, storage, navigator)
    }

    fn assemble(config: ClientConfig, gateway: ApiGateway) -> Self {
        let gateway = Arc::new(gateway);
        let session = SessionStore::new(gateway.clone(), config.restore_policy());
        let guard = RouteGuard::from_config(&config);
        tracing::debug!(
            base_url = %config.base_url(),
            restore_policy = ?config.restore_policy(),
            "Marketplace client ready"
        );
        Self {
            config: Arc::new(config),
            gateway,
            session,
            guard,
            ui: UiStore::new(),
        }
    }

    /// Restore any persisted session. Call once at application start.
    pub async fn start(&self) {
        self.session.check_auth().await;
    }

    /// Configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared API gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    /// Session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Route guard for protected views.
    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// UI chrome store.
    #[must_use]
    pub fn ui(&self) -> &UiStore {
        &self.ui
    }

    /// Guard `content` at the current location, navigating on redirect.
    pub fn protect<T>(&self, content: T, requirement: Option<&RoleRequirement>) -> Access<T> {
        self.guard.enforce(
            &self.session.state(),
            content,
            requirement,
            self.gateway.navigator().as_ref(),
        )
    }

    /// Sidebar links for the logged-in user; empty when logged out.
    #[must_use]
    pub fn sidebar_menu(&self) -> &'static [NavItem] {
        self.session
            .current_user()
            .map(|user| ui::sidebar_menu(user.role))
            .unwrap_or_default()
    }
}
