//! Change-driven effects with keyed request supersession.
//!
//! An effect watches a set of cells, derives a key from them and runs one
//! fetch per distinct key. When the key changes the in-flight fetch is
//! aborted, and a result is committed only if its key is still current.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cell::StateCell;

trait Watched: Send {
    fn changed(&mut self) -> BoxFuture<'_, bool>;
}

impl<T: Send + Sync + 'static> Watched for watch::Receiver<T> {
    fn changed(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move { watch::Receiver::changed(self).await.is_ok() })
    }
}

/// Wakes when any of the watched cells publishes a new value.
#[derive(Default)]
pub struct Changes {
    watched: Vec<Box<dyn Watched>>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch<T: Send + Sync + 'static>(mut self, cell: &StateCell<T>) -> Self {
        self.watched.push(Box::new(cell.subscribe()));
        self
    }

    pub fn watch_receiver<T: Send + Sync + 'static>(mut self, rx: watch::Receiver<T>) -> Self {
        self.watched.push(Box::new(rx));
        self
    }

    /// Resolves on the next change. `false` once any watched cell is gone.
    pub async fn next(&mut self) -> bool {
        if self.watched.is_empty() {
            return false;
        }
        let pending = self.watched.iter_mut().map(|w| w.changed());
        let (alive, _, _) = futures::future::select_all(pending).await;
        alive
    }
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
pub struct AbortOnDrop(JoinHandle<()>);

impl AbortOnDrop {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawns an effect that runs `fetch` for each distinct key produced by
/// `key_of` and hands the outcome to `commit`, unless the key moved on.
pub fn follow<K, KF, F, Fut, V, C>(
    label: &'static str,
    mut changes: Changes,
    key_of: KF,
    fetch: F,
    commit: C,
) -> AbortOnDrop
where
    K: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static,
    KF: Fn() -> K + Send + Sync + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = V> + Send + 'static,
    V: Send + 'static,
    C: Fn(V) + Send + Sync + 'static,
{
    let key_of = Arc::new(key_of);
    let commit = Arc::new(commit);
    AbortOnDrop::new(tokio::spawn(async move {
        let mut current: Option<K> = None;
        let mut in_flight: Option<AbortOnDrop> = None;
        loop {
            let key = key_of();
            if current.as_ref() != Some(&key) {
                if in_flight.take().is_some_and(|task| !task.is_finished()) {
                    tracing::debug!(effect = label, "superseding in-flight fetch");
                }
                let pending = fetch(key.clone());
                let key_of = Arc::clone(&key_of);
                let commit = Arc::clone(&commit);
                let issued = key.clone();
                in_flight = Some(AbortOnDrop::new(tokio::spawn(async move {
                    let value = pending.await;
                    if key_of() == issued {
                        commit(value);
                    } else {
                        tracing::debug!(effect = label, key = ?issued, "dropping stale result");
                    }
                })));
                current = Some(key);
            }
            if !changes.next().await {
                break;
            }
        }
    }))
}
