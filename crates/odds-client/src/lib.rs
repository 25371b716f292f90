pub mod admin;
pub mod ask;
pub mod error;
mod http;
pub mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use odds_schema::{AnswerEvent, AnswerPayload, DataCatalog, Dataset, DatasetPage, Deployment, QuestionPage};

pub use admin::AdminClient;
pub use ask::AskClient;
pub use error::{ClientError, ErrorKind, Result};

/// Events of one answer exchange. Ends after the terminal `answer` event or
/// when the transport completes; transport failures end it silently.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AnswerEvent> + Send>>;

/// Pagination, sort directive and free-text filter of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    /// Signed field name such as `-last_updated`. `None` means backend default.
    pub sort: Option<String>,
    pub filter: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort: None,
            filter: None,
        }
    }
}

impl ListQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: Option<String>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.max(1).to_string())];
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            params.push(("sort", sort.to_string()));
        }
        if let Some(filter) = self.filter.as_deref().filter(|f| !f.trim().is_empty()) {
            params.push(("filter", filter.to_string()));
        }
        params
    }
}

/// How a persisted answer is looked up on `GET /answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerLookup {
    /// Fetch an answer that was already produced.
    Id(String),
    /// Ask synchronously and wait for the full answer.
    Question(String),
}

/// Authenticated admin surface.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn list_deployments(&self) -> Result<Vec<Deployment>>;
    async fn list_catalogs(&self, deployment_id: &str) -> Result<Vec<DataCatalog>>;
    async fn get_catalog(&self, deployment_id: &str, catalog_id: &str) -> Result<Option<DataCatalog>>;
    async fn list_datasets(
        &self,
        deployment_id: &str,
        catalog_id: &str,
        query: &ListQuery,
    ) -> Result<DatasetPage>;
    async fn get_dataset(
        &self,
        deployment_id: &str,
        catalog_id: &str,
        dataset_id: &str,
    ) -> Result<Option<Dataset>>;
    async fn list_questions(&self, deployment_id: &str, query: &ListQuery) -> Result<QuestionPage>;
}

/// Public ask surface.
#[async_trait]
pub trait AskApi: Send + Sync {
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment>;
    async fn get_answer(&self, lookup: &AnswerLookup, deployment_id: &str) -> Result<AnswerPayload>;
    async fn stream_answer(&self, question: &str, deployment_id: &str) -> Result<AnswerStream>;
}
