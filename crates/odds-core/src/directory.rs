//! Deployments the signed-in admin can see, and the catalogs of the current one.

use std::collections::BTreeMap;
use std::sync::Arc;

use odds_auth::AuthSession;
use odds_client::{AdminApi, ListQuery};
use odds_schema::{DataCatalog, Deployment};

use crate::cell::StateCell;
use crate::effect::{follow, AbortOnDrop, Changes};
use crate::host::{NavigationMode, ViewHost};
use crate::page::DEFAULT_SORT_DIRECTIVE;
use crate::route::AdminRoute;
use crate::store::StateStore;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Default)]
pub struct DeploymentDirectory {
    pub deployments: StateCell<Vec<Deployment>>,
    /// The deployment named by the route, once the list knows it.
    pub current_deployment: StateCell<Option<Deployment>>,
    pub data_catalogs: StateCell<Vec<DataCatalog>>,
    /// Dataset totals keyed by catalog id.
    pub dataset_counts: StateCell<BTreeMap<String, u64>>,
}

impl DeploymentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn websites(&self) -> Vec<DataCatalog> {
        self.data_catalogs
            .with(|all| all.iter().filter(|c| c.is_website()).cloned().collect())
    }

    pub fn catalogs(&self) -> Vec<DataCatalog> {
        self.data_catalogs
            .with(|all| all.iter().filter(|c| !c.is_website()).cloned().collect())
    }

    pub fn catalog_dataset_count(&self, catalog_id: &str) -> Option<u64> {
        self.dataset_counts.with(|counts| counts.get(catalog_id).copied())
    }

    pub fn spawn(
        &self,
        store: &StateStore,
        api: Arc<dyn AdminApi>,
        auth: AuthSession,
        host: Arc<dyn ViewHost>,
    ) -> DirectoryEffects {
        let retry = store.retry();

        let deployments = {
            let target = self.deployments.clone();
            let route = store.route.clone();
            let api = Arc::clone(&api);
            let token_source = auth.clone();
            follow(
                "deployments",
                Changes::new().watch_receiver(auth.subscribe()),
                move || token_source.bearer_token(),
                move |token: Option<String>| {
                    let api = Arc::clone(&api);
                    let host = Arc::clone(&host);
                    let route = route.clone();
                    async move {
                        let to_login = || {
                            let on_login = route.with(|r| matches!(r, Some(AdminRoute::Login)));
                            if !on_login {
                                host.navigate(LOGIN_PATH, NavigationMode::Replace);
                            }
                        };
                        if token.is_none() {
                            tracing::info!("no credential, sending to login");
                            to_login();
                            return Vec::new();
                        }
                        match retry.run("deployments", || api.list_deployments()).await {
                            Ok(deployments) => deployments,
                            Err(e) => {
                                tracing::warn!("failed to load deployments: {e}");
                                if e.is_auth() {
                                    to_login();
                                }
                                Vec::new()
                            }
                        }
                    }
                },
                move |value| {
                    target.set(value);
                },
            )
        };

        let current = {
            let list = self.deployments.clone();
            let requested = store.deployment_id.clone();
            let target = self.current_deployment.clone();
            follow(
                "current-deployment",
                Changes::new()
                    .watch(&self.deployments)
                    .watch(&store.deployment_id),
                move || (requested.get(), list.get()),
                |(requested, list): (Option<String>, Vec<Deployment>)| async move {
                    let requested = requested?;
                    list.into_iter().find(|d| d.id == requested)
                },
                move |value| {
                    target.set(value);
                },
            )
        };

        let catalogs = {
            let current = self.current_deployment.clone();
            let target = self.data_catalogs.clone();
            let api = Arc::clone(&api);
            follow(
                "catalogs",
                Changes::new().watch(&self.current_deployment),
                move || current.with(|d| d.as_ref().map(|d| d.id.clone())),
                move |deployment: Option<String>| {
                    let api = Arc::clone(&api);
                    async move {
                        let Some(deployment) = deployment else {
                            return Vec::new();
                        };
                        retry
                            .run("catalogs", || api.list_catalogs(&deployment))
                            .await
                            .unwrap_or_else(|e| {
                                tracing::warn!(deployment = %deployment, "failed to load catalogs: {e}");
                                Vec::new()
                            })
                    }
                },
                move |value| {
                    target.set(value);
                },
            )
        };

        let counts = {
            let catalogs = self.data_catalogs.clone();
            let target = self.dataset_counts.clone();
            let clear = self.dataset_counts.clone();
            follow(
                "dataset-counts",
                Changes::new().watch(&self.data_catalogs),
                move || {
                    catalogs.with(|all| {
                        all.iter()
                            .filter_map(|c| Some((c.deployment_id.clone()?, c.id.clone())))
                            .collect::<Vec<_>>()
                    })
                },
                move |pairs: Vec<(String, String)>| {
                    clear.set(BTreeMap::new());
                    let api = Arc::clone(&api);
                    async move { count_datasets(api.as_ref(), &pairs).await }
                },
                move |value| {
                    target.set(value);
                },
            )
        };

        DirectoryEffects {
            _tasks: vec![deployments, current, catalogs, counts],
        }
    }
}

/// Dataset totals for (deployment, catalog) pairs, keyed by catalog id.
/// Catalogs whose count request fails are left out.
pub async fn count_datasets(api: &dyn AdminApi, pairs: &[(String, String)]) -> BTreeMap<String, u64> {
    let query = ListQuery::page(1).with_sort(Some(DEFAULT_SORT_DIRECTIVE.to_string()));
    let lookups = pairs.iter().map(|(deployment, catalog)| {
        let query = &query;
        async move {
            match api.list_datasets(deployment, catalog, query).await {
                Ok(page) => Some((catalog.clone(), page.total)),
                Err(e) => {
                    tracing::warn!(catalog = %catalog, "failed to count datasets: {e}");
                    None
                }
            }
        }
    });
    futures::future::join_all(lookups)
        .await
        .into_iter()
        .flatten()
        .collect()
}

#[derive(Debug)]
pub struct DirectoryEffects {
    _tasks: Vec<AbortOnDrop>,
}
