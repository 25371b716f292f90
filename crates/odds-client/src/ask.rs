use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use odds_schema::{AnswerPayload, Deployment};

use crate::error::Result;
use crate::http::{self, segment};
use crate::sse::parse_answer_stream;
use crate::{AnswerLookup, AnswerStream, AskApi};

/// Client for the public ask backend. Deployment descriptors are cached for
/// the lifetime of the client.
#[derive(Debug, Clone)]
pub struct AskClient {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    base_url: String,
    deployments: Arc<Mutex<HashMap<String, Deployment>>>,
}

impl AskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, http::DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds plain requests only; the answer stream has no
    /// overall deadline.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: http::build_client(Some(timeout)),
            stream_client: http::build_client(None),
            base_url: http::normalize_base(base_url),
            deployments: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cached_deployment(&self, deployment_id: &str) -> Option<Deployment> {
        self.deployments
            .lock()
            .ok()
            .and_then(|cache| cache.get(deployment_id).cloned())
    }

    fn cache_deployment(&self, deployment_id: &str, deployment: &Deployment) {
        if let Ok(mut cache) = self.deployments.lock() {
            cache.insert(deployment_id.to_string(), deployment.clone());
        }
    }
}

#[async_trait]
impl AskApi for AskClient {
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        if let Some(deployment) = self.cached_deployment(deployment_id) {
            return Ok(deployment);
        }
        let path = format!("/deployment/{}", segment(deployment_id));
        let request = self.client.get(format!("{}{path}", self.base_url));
        let deployment: Deployment = http::get_json(request, &path).await?;
        self.cache_deployment(deployment_id, &deployment);
        Ok(deployment)
    }

    async fn get_answer(&self, lookup: &AnswerLookup, deployment_id: &str) -> Result<AnswerPayload> {
        let path = "/answer";
        let mut params = vec![("deployment_id", deployment_id)];
        match lookup {
            AnswerLookup::Id(id) => params.push(("id", id.as_str())),
            AnswerLookup::Question(question) => params.push(("q", question.as_str())),
        }
        let request = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(&params);
        http::get_json(request, path).await
    }

    async fn stream_answer(&self, question: &str, deployment_id: &str) -> Result<AnswerStream> {
        let path = "/answer/stream";
        let request = self
            .stream_client
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&[("q", question), ("deployment_id", deployment_id)]);
        tracing::debug!(deployment_id, "opening answer stream");
        let response = http::send(request, path).await?;
        Ok(Box::pin(parse_answer_stream(response.bytes_stream())))
    }
}
