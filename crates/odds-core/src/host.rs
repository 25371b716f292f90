//! Seam between view state and whatever presents it.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// New history entry.
    Push,
    /// Overwrite the current history entry.
    Replace,
}

/// Document title and meta description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
}

/// Router, document head and input focus of the presenting surface.
pub trait ViewHost: Send + Sync {
    fn navigate(&self, path: &str, mode: NavigationMode);

    fn set_page_meta(&self, _meta: &PageMeta) {}

    fn focus_question(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Navigate { path: String, mode: NavigationMode },
    PageMeta(PageMeta),
    FocusQuestion,
}

/// Headless host that records every request in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    events: Arc<Mutex<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn last_path(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            HostEvent::Navigate { path, .. } => Some(path),
            _ => None,
        })
    }

    pub fn last_meta(&self) -> Option<PageMeta> {
        self.events().into_iter().rev().find_map(|event| match event {
            HostEvent::PageMeta(meta) => Some(meta),
            _ => None,
        })
    }

    fn record(&self, event: HostEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ViewHost for RecordingHost {
    fn navigate(&self, path: &str, mode: NavigationMode) {
        self.record(HostEvent::Navigate {
            path: path.to_string(),
            mode,
        });
    }

    fn set_page_meta(&self, meta: &PageMeta) {
        self.record(HostEvent::PageMeta(meta.clone()));
    }

    fn focus_question(&self) {
        self.record(HostEvent::FocusQuestion);
    }
}
