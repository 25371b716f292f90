use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client(timeout: Option<Duration>) -> reqwest::Client {
    let builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder.build().unwrap_or_default()
}

pub(crate) fn normalize_base(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

/// Percent-encodes one path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub(crate) async fn send(request: RequestBuilder, endpoint: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::transport(endpoint, e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(endpoint, status = status.as_u16(), "request rejected");
    Err(ClientError::status(endpoint, status, &body))
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::transport(endpoint, e))?;
    serde_json::from_slice(&body).map_err(|e| ClientError::decode(endpoint, e))
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: &str,
) -> Result<T> {
    let response = send(request, endpoint).await?;
    decode(response, endpoint).await
}

/// Like [`get_json`], but a 404 or a `null` body means "no such entity".
pub(crate) async fn get_optional_json<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: &str,
) -> Result<Option<T>> {
    match send(request, endpoint).await {
        Ok(response) => decode::<Option<T>>(response, endpoint).await,
        Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_percent_encoded() {
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
        assert_eq!(segment("plain-id_1"), "plain-id_1");
    }

    #[test]
    fn base_loses_trailing_slash() {
        assert_eq!(normalize_base("http://host/api/"), "http://host/api");
    }
}
