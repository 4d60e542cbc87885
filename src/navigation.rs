use parking_lot::RwLock;

/// Where the client currently is, and how to move it elsewhere.
///
/// The gateway uses this to send the user to the login view after an
/// unauthorized response; the guard uses it to apply redirects.
pub trait Navigator: Send + Sync {
    /// Current location, including any query string.
    fn current(&self) -> String;

    /// Replace the current location.
    fn navigate(&self, to: &str);
}

/// Path component of a location: no query string or fragment, no trailing
/// slash (except for the root).
#[must_use]
pub fn path_of(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let path = &location[..end];
    match path.trim_end_matches('/') {
        "" if path.starts_with('/') => "/",
        trimmed => trimmed,
    }
}

/// Whether `location` is the view at `path`, ignoring query and fragment.
#[must_use]
pub fn is_at(location: &str, path: &str) -> bool {
    path_of(location) == path_of(path)
}

/// In-memory location history.
#[derive(Debug)]
pub struct History {
    entries: RwLock<Vec<String>>,
}

impl History {
    /// History starting at `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(vec![initial.into()]),
        }
    }

    /// Every location visited, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    /// Step back one entry. Returns the new location, or `None` at the start.
    pub fn back(&self) -> Option<String> {
        let mut entries = self.entries.write();
        if entries.len() < 2 {
            return None;
        }
        entries.pop();
        entries.last().cloned()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for History {
    fn current(&self) -> String {
        self.entries.read().last().cloned().unwrap_or_else(|| "/".into())
    }

    fn navigate(&self, to: &str) {
        tracing::debug!(to, "Navigating");
        self.entries.write().push(to.to_owned());
    }
}
