//! Search box filtering: keystrokes in, a debounced filter value out.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::cell::StateCell;
use crate::effect::AbortOnDrop;
use crate::throttle::{sleep_until_opt, Debounce};

pub const FILTER_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Debounced free-text filter feeding a page state's `text_filter` cell.
///
/// Raw keystrokes go through [`TextFilter::input`]; the cell only sees a
/// value after 300 ms without typing, and never the same value twice in a
/// row. The cell starts at `None`.
#[derive(Debug)]
pub struct TextFilter {
    tx: mpsc::UnboundedSender<String>,
    _task: AbortOnDrop,
}

impl TextFilter {
    pub fn spawn(target: StateCell<Option<String>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        target.set(None);

        let task = tokio::spawn(async move {
            let mut debounce = Debounce::new(FILTER_QUIET_PERIOD);
            loop {
                tokio::select! {
                    raw = rx.recv() => match raw {
                        Some(text) => debounce.offer(text, Instant::now()),
                        None => break,
                    },
                    _ = sleep_until_opt(debounce.deadline()) => {
                        if let Some(text) = debounce.fire(Instant::now()) {
                            tracing::debug!(filter = %text, "text filter settled");
                            target.set(Some(text));
                        }
                    }
                }
            }
        });

        Self {
            tx,
            _task: AbortOnDrop::new(task),
        }
    }

    pub fn input(&self, text: impl Into<String>) {
        if self.tx.send(text.into()).is_err() {
            tracing::warn!("text filter task is gone");
        }
    }
}

pub fn placeholder(kind: &str, focused: bool) -> String {
    if focused {
        "Full text search on all fields...".to_string()
    } else {
        format!("Filter {kind}...")
    }
}
