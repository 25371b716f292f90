use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use odds_auth::{AuthSession, Credential};
use odds_client::{AdminApi, ClientError, ErrorKind, ListQuery, Result};
use odds_core::{
    DeploymentDirectory, HostEvent, ListView, NavigationMode, RecordingHost, SortDirection,
    SortState, StateStore,
};
use odds_schema::{CatalogKind, DataCatalog, Dataset, DatasetPage, Deployment, QuestionPage, QA};

/// In-memory admin backend. Catalog ids listed in `slow` answer after 500 ms.
#[derive(Default)]
struct FakeAdmin {
    slow: Vec<String>,
    unauthorized: bool,
    calls: Mutex<Vec<String>>,
    queries: Mutex<Vec<ListQuery>>,
}

impl FakeAdmin {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn delay(&self, catalog: &str) {
        if self.slow.iter().any(|c| c == catalog) {
            tokio::time::sleep(Duration::from_millis(500)).await;
        } else {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

fn catalog(deployment: &str, id: &str, kind: CatalogKind) -> DataCatalog {
    DataCatalog {
        id: id.to_string(),
        kind,
        deployment_id: Some(deployment.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl AdminApi for FakeAdmin {
    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.record("deployments".into());
        if self.unauthorized {
            return Err(ClientError::Status {
                endpoint: "/deployments".into(),
                status: 401,
                kind: ErrorKind::Auth,
                message: "expired token".into(),
            });
        }
        Ok(vec![
            Deployment {
                id: "gov".into(),
                agent_org_name: "Gov".into(),
                ..Default::default()
            },
            Deployment {
                id: "city".into(),
                ..Default::default()
            },
        ])
    }

    async fn list_catalogs(&self, deployment_id: &str) -> Result<Vec<DataCatalog>> {
        self.record(format!("catalogs:{deployment_id}"));
        Ok(vec![
            catalog(deployment_id, "data-gov", CatalogKind::Catalog),
            catalog(deployment_id, "gov-site", CatalogKind::Website),
        ])
    }

    async fn get_catalog(&self, deployment_id: &str, catalog_id: &str) -> Result<Option<DataCatalog>> {
        self.record(format!("catalog:{catalog_id}"));
        self.delay(catalog_id).await;
        if catalog_id == "missing" {
            return Ok(None);
        }
        Ok(Some(catalog(deployment_id, catalog_id, CatalogKind::Catalog)))
    }

    async fn list_datasets(
        &self,
        _deployment_id: &str,
        catalog_id: &str,
        query: &ListQuery,
    ) -> Result<DatasetPage> {
        self.record(format!("datasets:{catalog_id}:{}", query.page));
        self.queries.lock().unwrap().push(query.clone());
        self.delay(catalog_id).await;
        let total = if catalog_id == "gov-site" { 3 } else { 42 };
        Ok(DatasetPage {
            datasets: vec![Dataset {
                id: format!("{catalog_id}-p{}", query.page),
                catalog_id: catalog_id.to_string(),
                ..Default::default()
            }],
            total,
            pages: 3,
            page: query.page,
        })
    }

    async fn get_dataset(
        &self,
        _deployment_id: &str,
        catalog_id: &str,
        dataset_id: &str,
    ) -> Result<Option<Dataset>> {
        self.record(format!("dataset:{dataset_id}"));
        self.delay(catalog_id).await;
        Ok(Some(Dataset {
            id: dataset_id.to_string(),
            catalog_id: catalog_id.to_string(),
            ..Default::default()
        }))
    }

    async fn list_questions(&self, deployment_id: &str, query: &ListQuery) -> Result<QuestionPage> {
        self.record(format!("questions:{deployment_id}:{}", query.page));
        self.queries.lock().unwrap().push(query.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(QuestionPage {
            questions: vec![QA {
                id: format!("{deployment_id}-q{}", query.page),
                question: "How many schools?".into(),
                ..Default::default()
            }],
            total: 7,
            pages: 1,
            page: query.page,
        })
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn catalog_and_dataset_follow_the_route() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let _effects = store.spawn_effects(api.clone());

    store
        .navigate("/deployment/gov/catalog/data-gov/dataset/ds1")
        .unwrap();
    settle().await;

    assert_eq!(store.catalog.get().unwrap().id, "data-gov");
    assert_eq!(store.dataset.get().unwrap().id, "ds1");

    store.navigate("/deployment/gov/catalogs").unwrap();
    settle().await;
    assert!(store.catalog.get().is_none());
    assert!(store.dataset.get().is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_catalog_response_never_overwrites_newer_one() {
    let api = Arc::new(FakeAdmin {
        slow: vec!["slow".into()],
        ..Default::default()
    });
    let store = StateStore::new();
    let _effects = store.spawn_effects(api.clone());

    store.navigate("/deployment/gov/catalog/slow/datasets").unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store.navigate("/deployment/gov/catalog/fast/datasets").unwrap();
    settle().await;

    assert_eq!(store.catalog.get().unwrap().id, "fast");
    assert!(api.calls().contains(&"catalog:slow".to_string()));
}

#[tokio::test(start_paused = true)]
async fn missing_catalog_is_absent() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let _effects = store.spawn_effects(api.clone());

    store.navigate("/deployment/gov/catalog/missing/datasets").unwrap();
    settle().await;
    assert!(store.catalog.get().is_none());
}

#[tokio::test(start_paused = true)]
async fn datasets_view_pages_sorts_and_resets() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let view = ListView::datasets(&store);
    let _task = view.spawn(&store, api.clone());

    store.navigate("/deployment/gov/catalog/data-gov/datasets").unwrap();
    settle().await;
    assert_eq!(view.items.get()[0].id, "data-gov-p1");
    assert_eq!(view.total.get(), Some(42));

    view.page.on_page_index(1);
    view.page
        .on_sort(SortState::new("title", SortDirection::Asc))
        .unwrap();
    settle().await;
    assert_eq!(view.items.get()[0].id, "data-gov-p2");
    let last = api.queries.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.page, 2);
    assert_eq!(last.sort.as_deref(), Some("+title.keyword"));

    // Another catalog: page back to 1, old rows gone before new ones land.
    let mut items_rx = view.items.subscribe();
    store.navigate("/deployment/gov/catalog/other/datasets").unwrap();
    items_rx.changed().await.unwrap();
    assert!(items_rx.borrow_and_update().is_empty());
    settle().await;
    assert_eq!(view.page.current_page.get(), 1);
    assert_eq!(view.items.get()[0].id, "other-p1");
}

#[tokio::test(start_paused = true)]
async fn datasets_view_is_empty_without_catalog() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let view = ListView::datasets(&store);
    let _task = view.spawn(&store, api.clone());

    store.navigate("/deployment/gov/catalogs").unwrap();
    settle().await;
    assert!(view.items.get().is_empty());
    assert_eq!(view.total.get(), None);
    assert!(api.calls().iter().all(|c| !c.starts_with("datasets:")));
}

#[tokio::test(start_paused = true)]
async fn questions_view_follows_deployment() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let view = ListView::questions(&store);
    let _task = view.spawn(&store, api.clone());

    store.navigate("/deployment/gov/questions").unwrap();
    settle().await;
    assert_eq!(view.items.get()[0].id, "gov-q1");
    assert_eq!(view.total.get(), Some(7));

    view.page.text_filter.set(Some("schools".into()));
    settle().await;
    let last = api.queries.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.filter.as_deref(), Some("schools"));
    assert_eq!(last.sort.as_deref(), Some("-last_updated"));
}

#[tokio::test(start_paused = true)]
async fn directory_loads_deployment_catalogs_and_counts() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let host = Arc::new(RecordingHost::new());
    let auth = AuthSession::with_credential(Credential::new("id-token"));
    let directory = DeploymentDirectory::new();
    let _effects = directory.spawn(&store, api.clone(), auth, host.clone());

    store.navigate("/deployment/gov/catalogs").unwrap();
    settle().await;

    assert_eq!(directory.deployments.get().len(), 2);
    assert_eq!(directory.current_deployment.get().unwrap().agent_org_name, "Gov");
    assert_eq!(directory.catalogs()[0].id, "data-gov");
    assert_eq!(directory.websites()[0].id, "gov-site");
    assert_eq!(directory.catalog_dataset_count("data-gov"), Some(42));
    assert_eq!(directory.catalog_dataset_count("gov-site"), Some(3));
    assert!(host.events().is_empty());

    store.navigate("/deployment/nowhere/catalogs").unwrap();
    settle().await;
    assert!(directory.current_deployment.get().is_none());
    assert!(directory.data_catalogs.get().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signing_out_sends_to_login() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    let host = Arc::new(RecordingHost::new());
    let auth = AuthSession::with_credential(Credential::new("id-token"));
    let directory = DeploymentDirectory::new();
    let _effects = directory.spawn(&store, api.clone(), auth.clone(), host.clone());

    store.navigate("/deployment/gov/catalogs").unwrap();
    settle().await;
    assert_eq!(directory.deployments.get().len(), 2);

    auth.sign_out();
    settle().await;
    assert!(directory.deployments.get().is_empty());
    assert_eq!(
        host.events(),
        vec![HostEvent::Navigate {
            path: "/login".into(),
            mode: NavigationMode::Replace
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_token_sends_to_login() {
    let api = Arc::new(FakeAdmin {
        unauthorized: true,
        ..Default::default()
    });
    let store = StateStore::new();
    let host = Arc::new(RecordingHost::new());
    let auth = AuthSession::with_credential(Credential::new("stale"));
    let directory = DeploymentDirectory::new();
    let _effects = directory.spawn(&store, api.clone(), auth, host.clone());

    settle().await;
    assert!(directory.deployments.get().is_empty());
    assert_eq!(host.last_path().as_deref(), Some("/login"));
}

#[tokio::test(start_paused = true)]
async fn anonymous_on_login_page_stays_put() {
    let api = Arc::new(FakeAdmin::default());
    let store = StateStore::new();
    store.navigate("/login").unwrap();
    let host = Arc::new(RecordingHost::new());
    let directory = DeploymentDirectory::new();
    let _effects = directory.spawn(&store, api.clone(), AuthSession::anonymous(), host.clone());

    settle().await;
    assert!(host.events().is_empty());
    assert!(!api.calls().contains(&"deployments".to_string()));
}

#[test]
fn catalog_split_is_by_kind() {
    let directory = DeploymentDirectory::new();
    let mut catalogs = HashMap::new();
    catalogs.insert("a", CatalogKind::Website);
    catalogs.insert("b", CatalogKind::Catalog);
    directory.data_catalogs.set(
        catalogs
            .into_iter()
            .map(|(id, kind)| catalog("gov", id, kind))
            .collect(),
    );
    assert_eq!(directory.websites().len(), 1);
    assert_eq!(directory.catalogs().len(), 1);
}
