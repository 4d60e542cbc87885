//! UI chrome state: sidebar, modal and busy overlay, plus the role-specific
//! sidebar menus.

use std::sync::Arc;

use tokio::sync::watch;

use crate::navigation;
use crate::types::Role;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub sidebar_open: bool,
    pub current_modal: Option<String>,
    pub busy: bool,
}

/// Observable holder of [`UiState`]. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct UiStore {
    state: Arc<watch::Sender<UiState>>,
}

impl UiStore {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Current UI state.
    #[must_use]
    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every UI state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub fn set_sidebar_open(&self, open: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.sidebar_open != open;
            s.sidebar_open = open;
            changed
        });
    }

    pub fn toggle_sidebar(&self) {
        self.state.send_modify(|s| s.sidebar_open = !s.sidebar_open);
    }

    /// Show `modal`, replacing any modal already open.
    pub fn open_modal(&self, modal: impl Into<String>) {
        let modal = modal.into();
        self.state.send_if_modified(|s| {
            let changed = s.current_modal.as_deref() != Some(modal.as_str());
            s.current_modal = Some(modal);
            changed
        });
    }

    pub fn close_modal(&self) {
        self.state.send_if_modified(|s| s.current_modal.take().is_some());
    }

    /// Show or hide the busy overlay.
    pub fn set_busy(&self, busy: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.busy != busy;
            s.busy = busy;
            changed
        });
    }
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One sidebar navigation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
}

impl NavItem {
    const fn new(label: &'static str, href: &'static str) -> Self {
        Self { label, href }
    }

    /// Whether this link is the current view.
    #[must_use]
    pub fn is_active(&self, location: &str) -> bool {
        navigation::is_at(location, self.href)
    }
}

const CUSTOMER_MENU: &[NavItem] = &[
    NavItem::new("Dashboard", "/dashboard"),
    NavItem::new("Appointments", "/dashboard/appointments"),
    NavItem::new("Payment History", "/dashboard/payments"),
    NavItem::new("Profile Settings", "/dashboard/settings"),
];

const SELLER_MENU: &[NavItem] = &[
    NavItem::new("Dashboard", "/dashboard"),
    NavItem::new("My Services", "/dashboard/services"),
    NavItem::new("Appointments", "/dashboard/appointments"),
    NavItem::new("Analytics", "/dashboard/analytics"),
    NavItem::new("Package Upgrade", "/dashboard/package-upgrade"),
    NavItem::new("Earnings", "/dashboard/earnings"),
    NavItem::new("Profile Settings", "/dashboard/settings"),
];

const ADMIN_MENU: &[NavItem] = &[
    NavItem::new("Dashboard", "/admin/dashboard"),
    NavItem::new("Users", "/admin/users"),
    NavItem::new("Services", "/admin/services"),
    NavItem::new("Payments", "/admin/payments"),
    NavItem::new("Analytics", "/admin/analytics"),
    NavItem::new("Reports", "/admin/reports"),
    NavItem::new("Settings", "/admin/settings"),
];

/// Sidebar links for `role`.
#[must_use]
pub fn sidebar_menu(role: Role) -> &'static [NavItem] {
    match role {
        Role::Customer => CUSTOMER_MENU,
        Role::Seller => SELLER_MENU,
        Role::Admin => ADMIN_MENU,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidebar_toggles() {
        let ui = UiStore::new();
        assert!(!ui.state().sidebar_open);
        ui.toggle_sidebar();
        assert!(ui.state().sidebar_open);
        ui.set_sidebar_open(false);
        assert!(!ui.state().sidebar_open);
    }

    #[test]
    fn test_modal_lifecycle() {
        let ui = UiStore::new();
        let shared = ui.clone();
        ui.open_modal("booking");
        assert_eq!(shared.state().current_modal.as_deref(), Some("booking"));
        ui.open_modal("payment");
        assert_eq!(shared.state().current_modal.as_deref(), Some("payment"));
        shared.close_modal();
        assert!(ui.state().current_modal.is_none());
    }

    #[test]
    fn test_subscribers_see_only_real_changes() {
        let ui = UiStore::new();
        let mut rx = ui.subscribe();

        ui.set_busy(false);
        ui.close_modal();
        assert!(!rx.has_changed().unwrap());

        ui.set_busy(true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().busy);
    }

    #[test]
    fn test_menus_follow_role() {
        assert_eq!(sidebar_menu(Role::Customer).len(), 4);
        assert!(
            sidebar_menu(Role::Seller)
                .iter()
                .any(|item| item.href == "/dashboard/package-upgrade")
        );
        assert!(
            sidebar_menu(Role::Admin)
                .iter()
                .all(|item| item.href.starts_with("/admin/"))
        );
    }

    #[test]
    fn test_active_item_matches_path() {
        let menu = sidebar_menu(Role::Customer);
        let active: Vec<_> = menu
            .iter()
            .filter(|item| item.is_active("/dashboard/payments?page=2"))
            .map(|item| item.label)
            .collect();
        assert_eq!(active, vec!["Payment History"]);
    }
}
