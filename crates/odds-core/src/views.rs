//! Paged list views: datasets, webpages and questions.

use std::sync::{Arc, Mutex};

use odds_client::{AdminApi, ListQuery};
use odds_schema::{Dataset, QA};

use crate::cell::StateCell;
use crate::effect::{follow, AbortOnDrop, Changes};
use crate::page::PageState;
use crate::store::StateStore;

/// Items and total of the page currently shown. `total` is `None` while
/// nothing has loaded for the current context.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    pub items: StateCell<Vec<T>>,
    pub total: StateCell<Option<u64>>,
    pub page: PageState,
}

pub type DatasetListView = ListView<Dataset>;
pub type QuestionListView = ListView<QA>;

fn page_changes(page: &PageState) -> Changes {
    Changes::new()
        .watch(&page.current_page)
        .watch(&page.sort_directive)
        .watch(&page.text_filter)
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ListView<T> {
    fn new(page: PageState) -> Self {
        Self {
            items: StateCell::new(Vec::new()),
            total: StateCell::new(None),
            page,
        }
    }

    /// Empties the view when the context it lists for changes.
    fn clear_on_context_change<C: PartialEq>(&self, last: &Mutex<Option<C>>, context: C) {
        let Ok(mut last) = last.lock() else {
            return;
        };
        if last.as_ref() != Some(&context) {
            self.items.set(Vec::new());
            self.total.set(None);
            *last = Some(context);
        }
    }

    fn commit(&self, loaded: Option<(Vec<T>, u64)>) {
        match loaded {
            Some((items, total)) => {
                self.items.set(items);
                self.total.set(Some(total));
            }
            None => {
                self.items.set(Vec::new());
            }
        }
    }
}

type CatalogKey = (Option<String>, Option<String>, ListQuery);

impl ListView<Dataset> {
    pub fn datasets(store: &StateStore) -> Self {
        Self::new(store.datasets_page.clone())
    }

    pub fn webpages(store: &StateStore) -> Self {
        Self::new(store.webpages_page.clone())
    }

    /// Follows (deployment, catalog, page, sort, filter) and fetches the page.
    pub fn spawn(&self, store: &StateStore, api: Arc<dyn AdminApi>) -> AbortOnDrop {
        let label = if self.page.view() == "webpages" {
            "webpages"
        } else {
            "datasets"
        };
        let (d_cell, c_cell, page) = (
            store.deployment_id.clone(),
            store.catalog_id.clone(),
            self.page.clone(),
        );
        let view = self.clone();
        let committed = self.clone();
        let retry = store.retry();
        let last_context = Mutex::new(None);

        follow(
            label,
            page_changes(&self.page)
                .watch(&store.deployment_id)
                .watch(&store.catalog_id),
            move || -> CatalogKey { (d_cell.get(), c_cell.get(), page.query()) },
            move |(deployment, catalog, query): CatalogKey| {
                if deployment.is_some() && catalog.is_some() {
                    view.clear_on_context_change(
                        &last_context,
                        (deployment.clone(), catalog.clone()),
                    );
                }
                let api = Arc::clone(&api);
                async move {
                    let (Some(d), Some(c)) = (deployment, catalog) else {
                        return None;
                    };
                    match retry.run(label, || api.list_datasets(&d, &c, &query)).await {
                        Ok(page) => Some((page.datasets, page.total)),
                        Err(e) => {
                            tracing::warn!(deployment = %d, catalog = %c, page = query.page, "{label} fetch failed: {e}");
                            None
                        }
                    }
                }
            },
            move |loaded| committed.commit(loaded),
        )
    }
}

type DeploymentKey = (Option<String>, ListQuery);

impl ListView<QA> {
    pub fn questions(store: &StateStore) -> Self {
        Self::new(store.questions_page.clone())
    }

    /// Follows (deployment, page, sort, filter) and fetches the page.
    pub fn spawn(&self, store: &StateStore, api: Arc<dyn AdminApi>) -> AbortOnDrop {
        let (d_cell, page) = (store.deployment_id.clone(), self.page.clone());
        let view = self.clone();
        let committed = self.clone();
        let retry = store.retry();
        let last_context = Mutex::new(None);

        follow(
            "questions",
            page_changes(&self.page).watch(&store.deployment_id),
            move || -> DeploymentKey { (d_cell.get(), page.query()) },
            move |(deployment, query): DeploymentKey| {
                if deployment.is_some() {
                    view.clear_on_context_change(&last_context, deployment.clone());
                }
                let api = Arc::clone(&api);
                async move {
                    let d = deployment?;
                    match retry.run("questions", || api.list_questions(&d, &query)).await {
                        Ok(page) => Some((page.questions, page.total)),
                        Err(e) => {
                            tracing::warn!(deployment = %d, page = query.page, "questions fetch failed: {e}");
                            None
                        }
                    }
                }
            },
            move |loaded| committed.commit(loaded),
        )
    }
}
