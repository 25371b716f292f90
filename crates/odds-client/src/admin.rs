use std::time::Duration;

use async_trait::async_trait;
use odds_auth::AuthSession;
use odds_schema::{DataCatalog, Dataset, DatasetPage, Deployment, QuestionPage};

use crate::error::Result;
use crate::http::{self, segment};
use crate::{AdminApi, ListQuery};

/// REST client for the admin backend. Every request carries the session's
/// bearer token when one is present.
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    session: AuthSession,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>, session: AuthSession) -> Self {
        Self::with_timeout(base_url, session, http::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, session: AuthSession, timeout: Duration) -> Self {
        Self {
            client: http::build_client(Some(timeout)),
            base_url: http::normalize_base(base_url),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{path}", self.base_url));
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let path = "/deployments";
        http::get_json(self.get(path), path).await
    }

    async fn list_catalogs(&self, deployment_id: &str) -> Result<Vec<DataCatalog>> {
        let path = format!("/deployment/{}/catalogs", segment(deployment_id));
        let mut catalogs: Vec<DataCatalog> = http::get_json(self.get(&path), &path).await?;
        for catalog in &mut catalogs {
            catalog.deployment_id = Some(deployment_id.to_string());
        }
        Ok(catalogs)
    }

    async fn get_catalog(&self, deployment_id: &str, catalog_id: &str) -> Result<Option<DataCatalog>> {
        let path = format!(
            "/deployment/{}/catalog/{}",
            segment(deployment_id),
            segment(catalog_id)
        );
        let catalog: Option<DataCatalog> = http::get_optional_json(self.get(&path), &path).await?;
        Ok(catalog.map(|mut catalog| {
            catalog.deployment_id = Some(deployment_id.to_string());
            catalog
        }))
    }

    async fn list_datasets(
        &self,
        deployment_id: &str,
        catalog_id: &str,
        query: &ListQuery,
    ) -> Result<DatasetPage> {
        let path = format!(
            "/deployment/{}/catalog/{}/datasets",
            segment(deployment_id),
            segment(catalog_id)
        );
        tracing::debug!(deployment_id, catalog_id, page = query.page, "listing datasets");
        http::get_json(self.get(&path).query(&query.params()), &path).await
    }

    async fn get_dataset(
        &self,
        deployment_id: &str,
        catalog_id: &str,
        dataset_id: &str,
    ) -> Result<Option<Dataset>> {
        let path = format!(
            "/deployment/{}/catalog/{}/dataset/{}",
            segment(deployment_id),
            segment(catalog_id),
            segment(dataset_id)
        );
        http::get_optional_json(self.get(&path), &path).await
    }

    async fn list_questions(&self, deployment_id: &str, query: &ListQuery) -> Result<QuestionPage> {
        let path = format!("/deployment/{}/questions", segment(deployment_id));
        tracing::debug!(deployment_id, page = query.page, "listing questions");
        http::get_json(self.get(&path).query(&query.params()), &path).await
    }
}
