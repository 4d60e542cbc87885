use crate::config::ClientConfig;
use crate::navigation::Navigator;
use crate::session::SessionState;
use crate::types::Role;

/// Roles allowed to see a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRequirement(Vec<Role>);

impl RoleRequirement {
    /// Any of `roles` qualifies.
    #[must_use]
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Exactly `role` qualifies.
    #[must_use]
    pub fn only(role: Role) -> Self {
        Self(vec![role])
    }

    /// Whether `role` qualifies.
    #[must_use]
    pub fn allows(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Qualifying roles.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.0
    }
}

/// Outcome of guarding a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access<T> {
    /// Show the protected content.
    Render(T),
    /// Session restore still running: show a placeholder.
    Loading,
    /// Nobody is logged in. `from` is the requested location, for the login
    /// flow to return to.
    RedirectToLogin { to: String, from: String },
    /// Logged in, but the role does not qualify.
    RedirectToDefault { to: String },
}

impl<T> Access<T> {
    /// Whether the content may render.
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    /// Where the view must navigate, if anywhere.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::RedirectToLogin { to, .. } | Self::RedirectToDefault { to } => Some(to.as_str()),
            Self::Render(_) | Self::Loading => None,
        }
    }

    /// Login redirects carry the original location as `?from=`.
    #[must_use]
    pub fn redirect_location(&self) -> Option<String> {
        match self {
            Self::RedirectToLogin { to, from } => {
                Some(format!("{to}?from={}", urlencoding::encode(from)))
            }
            Self::RedirectToDefault { to } => Some(to.clone()),
            Self::Render(_) | Self::Loading => None,
        }
    }

    /// The content, if it may render.
    #[must_use]
    pub fn content(self) -> Option<T> {
        match self {
            Self::Render(content) => Some(content),
            _ => None,
        }
    }
}

/// Render-time authorization for protected views. Holds no session state.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    landing_path: String,
}

impl RouteGuard {
    /// Guard redirecting to `login_path` and `landing_path`.
    #[must_use]
    pub fn new(login_path: impl Into<String>, landing_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            landing_path: landing_path.into(),
        }
    }

    /// Guard using the configured login and landing paths.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.login_path(), config.landing_path())
    }

    /// Decide what to show for `content` requested at `location`.
    ///
    /// First match wins: loading, then missing identity, then role mismatch.
    pub fn authorize<T>(
        &self,
        state: &SessionState,
        content: T,
        requirement: Option<&RoleRequirement>,
        location: &str,
    ) -> Access<T> {
        if state.is_loading() {
            return Access::Loading;
        }
        let Some(user) = state.user() else {
            return Access::RedirectToLogin {
                to: self.login_path.clone(),
                from: location.to_owned(),
            };
        };
        if requirement.is_some_and(|r| !r.allows(user.role)) {
            tracing::debug!(role = %user.role, location, "Role not permitted, redirecting");
            return Access::RedirectToDefault {
                to: self.landing_path.clone(),
            };
        }
        Access::Render(content)
    }

    /// [`authorize`](Self::authorize) at the navigator's current location,
    /// performing any redirect. Returns the content only when it may render.
    pub fn enforce<T>(
        &self,
        state: &SessionState,
        content: T,
        requirement: Option<&RoleRequirement>,
        navigator: &dyn Navigator,
    ) -> Access<T> {
        let location = navigator.current();
        let access = self.authorize(state, content, requirement, &location);
        if let Some(target) = access.redirect_location() {
            navigator.navigate(&target);
        }
        access
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new("/login", "/dashboard")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::History;
    use crate::types::User;

    fn state(loading: bool, role: Option<Role>) -> SessionState {
        let mut state = SessionState::initial();
        if !loading {
            state = state.settled();
        }
        match role {
            Some(role) => state.with_user(User::new("1", "Amina", "amina@example.com", role)),
            None => state,
        }
    }

    #[test]
    fn test_loading_wins_over_everything() {
        let guard = RouteGuard::default();
        for role in [None, Some(Role::Customer), Some(Role::Admin)] {
            let admin = RoleRequirement::only(Role::Admin);
            assert_eq!(
                guard.authorize(&state(true, role), "page", Some(&admin), "/admin/users"),
                Access::Loading
            );
        }
    }

    #[test]
    fn test_anonymous_goes_to_login_with_origin() {
        let guard = RouteGuard::default();
        let access = guard.authorize(&state(false, None), "page", None, "/dashboard/payments");
        assert_eq!(
            access,
            Access::RedirectToLogin {
                to: "/login".into(),
                from: "/dashboard/payments".into()
            }
        );
        assert_eq!(
            access.redirect_location().as_deref(),
            Some("/login?from=%2Fdashboard%2Fpayments")
        );
    }

    #[test]
    fn test_wrong_role_is_downgraded_silently() {
        let guard = RouteGuard::default();
        let admin = RoleRequirement::only(Role::Admin);
        let access = guard.authorize(&state(false, Some(Role::Customer)), "page", Some(&admin), "/admin");
        assert_eq!(
            access,
            Access::RedirectToDefault {
                to: "/dashboard".into()
            }
        );
        assert_eq!(access.redirect_target(), Some("/dashboard"));
    }

    #[test]
    fn test_permitted_roles_render() {
        let guard = RouteGuard::default();
        let admin = RoleRequirement::only(Role::Admin);
        assert_eq!(
            guard.authorize(&state(false, Some(Role::Admin)), "page", Some(&admin), "/admin"),
            Access::Render("page")
        );
        let any = guard.authorize(&state(false, Some(Role::Seller)), "page", None, "/dashboard");
        assert!(any.is_render());
        assert_eq!(any.content(), Some("page"));

        let staff = RoleRequirement::any_of([Role::Seller, Role::Admin]);
        assert!(
            guard
                .authorize(&state(false, Some(Role::Seller)), (), Some(&staff), "/x")
                .is_render()
        );
    }

    #[test]
    fn test_enforce_navigates_on_redirect_only() {
        let guard = RouteGuard::new("/signin", "/home");
        let history = History::new("/dashboard/settings");

        let access = guard.enforce(&state(false, None), "page", None, &history);
        assert!(!access.is_render());
        assert_eq!(history.current(), "/signin?from=%2Fdashboard%2Fsettings");

        let history = History::new("/dashboard");
        let access = guard.enforce(&state(false, Some(Role::Customer)), "page", None, &history);
        assert!(access.is_render());
        assert_eq!(history.entries(), vec!["/dashboard"]);

        let access = guard.enforce(&state(true, None), "page", None, &history);
        assert_eq!(access, Access::Loading);
        assert_eq!(history.entries(), vec!["/dashboard"]);
    }
}
