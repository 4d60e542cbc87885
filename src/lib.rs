#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod format;
pub mod forms;
pub mod gateway;
pub mod guard;
pub mod navigation;
pub mod session;
pub mod storage;
pub mod types;
pub mod ui;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use client::MarketplaceClient;
pub use config::{ClientConfig, RestorePolicy};
pub use error::Error;
pub use forms::{LoginForm, RegistrationForm};
pub use gateway::ApiGateway;
pub use guard::{Access, RoleRequirement, RouteGuard};
pub use navigation::{History, Navigator};
pub use session::{SessionState, SessionStore};
pub use storage::{
    CookieCredential, CredentialSource, DurableStorage, FileStorage, MemoryStorage,
    SessionStorage,
};
pub use types::{ApiResponse, AuthResponse, Credential, PageMeta, Role, SellerPackage, User, UserId};
pub use ui::{NavItem, UiState, UiStore};
