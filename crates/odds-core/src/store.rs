//! Route-bound state of the admin surface.
//!
//! Navigation publishes the route's ids into independent cells. Effects
//! spawned by [`StateStore::spawn_effects`] follow those cells and fetch the
//! catalog and dataset they name.

use std::sync::{Arc, Mutex};

use odds_client::AdminApi;
use odds_schema::{DataCatalog, Dataset, Resource};

use crate::cell::StateCell;
use crate::effect::{follow, AbortOnDrop, Changes};
use crate::error::RouteError;
use crate::markdown::{render_content, RenderOptions, SafeHtml};
use crate::page::{PageState, SortFieldMap};
use crate::retry::RetryPolicy;
use crate::route::{parse_resource_index, AdminRoute, RouteParams};

#[derive(Debug, Clone)]
pub struct StateStore {
    pub route: StateCell<Option<AdminRoute>>,
    pub deployment_id: StateCell<Option<String>>,
    pub catalog_id: StateCell<Option<String>>,
    pub dataset_id: StateCell<Option<String>>,
    pub resource_index: StateCell<Option<usize>>,
    pub catalog: StateCell<Option<DataCatalog>>,
    pub dataset: StateCell<Option<Dataset>>,
    pub datasets_page: PageState,
    pub webpages_page: PageState,
    pub questions_page: PageState,
    extra_pages: Arc<Mutex<Vec<PageState>>>,
    retry: RetryPolicy,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.is_empty())
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            route: StateCell::new(None),
            deployment_id: StateCell::new(None),
            catalog_id: StateCell::new(None),
            dataset_id: StateCell::new(None),
            resource_index: StateCell::new(None),
            catalog: StateCell::new(None),
            dataset: StateCell::new(None),
            datasets_page: PageState::new(SortFieldMap::DATASETS),
            webpages_page: PageState::new(SortFieldMap::WEBPAGES),
            questions_page: PageState::new(SortFieldMap::QUESTIONS),
            extra_pages: Arc::new(Mutex::new(Vec::new())),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Adds a page state that is reset together with the built-in ones.
    pub fn register_page(&self, page: PageState) {
        if let Ok(mut pages) = self.extra_pages.lock() {
            pages.push(page);
        }
    }

    pub fn pages(&self) -> Vec<PageState> {
        let mut pages = vec![
            self.datasets_page.clone(),
            self.webpages_page.clone(),
            self.questions_page.clone(),
        ];
        if let Ok(extra) = self.extra_pages.lock() {
            pages.extend(extra.iter().cloned());
        }
        pages
    }

    /// Publishes the route's ids. Moving to a different (deployment, catalog)
    /// pair resets every page state first.
    pub fn update_from_route(&self, params: &RouteParams) {
        let deployment = present(&params.deployment_id);
        let catalog = present(&params.catalog_id);
        let dataset = present(&params.dataset_id);

        if let (Some(d), Some(c)) = (&deployment, &catalog) {
            let moved = self.deployment_id.with(|cur| cur.as_ref() != Some(d))
                || self.catalog_id.with(|cur| cur.as_ref() != Some(c));
            if moved {
                tracing::debug!(deployment = %d, catalog = %c, "catalog context changed, resetting pages");
                for page in self.pages() {
                    page.reset();
                }
            }
        }

        self.deployment_id.set(deployment);
        self.catalog_id.set(catalog);
        self.dataset_id.set(dataset);
        self.resource_index
            .set(parse_resource_index(params.resource_idx.as_deref()));
    }

    pub fn navigate(&self, path: &str) -> Result<AdminRoute, RouteError> {
        let route = AdminRoute::parse(path)?;
        self.update_from_route(&route.params());
        self.route.set(Some(route.clone()));
        Ok(route)
    }

    /// `dataset.resources[resource_index]` when both are known.
    pub fn resource(&self) -> Option<Resource> {
        let index = self.resource_index.get()?;
        self.dataset
            .with(|dataset| dataset.as_ref().and_then(|d| d.resources.get(index).cloned()))
    }

    pub fn resource_content(&self, options: &RenderOptions) -> Option<SafeHtml> {
        let resource = self.resource()?;
        let content = resource.content.filter(|c| !c.is_empty())?;
        Some(render_content(&content, options))
    }

    pub fn spawn_effects(&self, api: Arc<dyn AdminApi>) -> StoreEffects {
        let catalog = {
            let (d_cell, c_cell) = (self.deployment_id.clone(), self.catalog_id.clone());
            let target = self.catalog.clone();
            let clear = self.catalog.clone();
            let api = Arc::clone(&api);
            let retry = self.retry;
            follow(
                "catalog",
                Changes::new().watch(&self.deployment_id).watch(&self.catalog_id),
                move || (d_cell.get(), c_cell.get()),
                move |key: (Option<String>, Option<String>)| {
                    clear.set(None);
                    let api = Arc::clone(&api);
                    async move {
                        let (Some(d), Some(c)) = key else {
                            return None;
                        };
                        retry
                            .run("catalog", || api.get_catalog(&d, &c))
                            .await
                            .unwrap_or_else(|e| {
                                tracing::warn!(deployment = %d, catalog = %c, "catalog fetch failed: {e}");
                                None
                            })
                    }
                },
                move |value| {
                    target.set(value);
                },
            )
        };

        let dataset = {
            let cells = (
                self.deployment_id.clone(),
                self.catalog_id.clone(),
                self.dataset_id.clone(),
            );
            let target = self.dataset.clone();
            let clear = self.dataset.clone();
            let retry = self.retry;
            follow(
                "dataset",
                Changes::new()
                    .watch(&self.deployment_id)
                    .watch(&self.catalog_id)
                    .watch(&self.dataset_id),
                move || (cells.0.get(), cells.1.get(), cells.2.get()),
                move |key: (Option<String>, Option<String>, Option<String>)| {
                    clear.set(None);
                    let api = Arc::clone(&api);
                    async move {
                        let (Some(d), Some(c), Some(ds)) = key else {
                            return None;
                        };
                        retry
                            .run("dataset", || api.get_dataset(&d, &c, &ds))
                            .await
                            .unwrap_or_else(|e| {
                                tracing::warn!(deployment = %d, catalog = %c, dataset = %ds, "dataset fetch failed: {e}");
                                None
                            })
                    }
                },
                move |value| {
                    target.set(value);
                },
            )
        };

        StoreEffects {
            _tasks: vec![catalog, dataset],
        }
    }
}

/// Running store effects; dropping this stops them.
#[derive(Debug)]
pub struct StoreEffects {
    _tasks: Vec<AbortOnDrop>,
}
