use odds_core::{NavigationMode, PageMeta, StateCell, ViewHost};

/// Host for running view state in a terminal: there is no browser, so
/// navigations are only remembered and page metadata only logged.
#[derive(Debug, Clone, Default)]
pub struct TerminalHost {
    pub location: StateCell<Option<String>>,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewHost for TerminalHost {
    fn navigate(&self, path: &str, mode: NavigationMode) {
        tracing::debug!(path, ?mode, "navigate");
        self.location.set(Some(path.to_string()));
    }

    fn set_page_meta(&self, meta: &PageMeta) {
        tracing::debug!(title = %meta.title, "page meta");
    }
}
