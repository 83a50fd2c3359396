use crate::error::SourceError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client with JSON headers plus the service's own auth headers.
pub(crate) fn build_client(extra: &[(&'static str, &str)]) -> Result<Client, SourceError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in extra {
        let value = HeaderValue::from_str(value)
            .map_err(|e| SourceError::Decode(format!("invalid value for header {}: {}", name, e)))?;
        headers.insert(HeaderName::from_static(name), value);
    }

    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .default_headers(headers)
        .build()?)
}

pub(crate) fn join_url(base_url: &str, suffix: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), suffix)
}

/// Send the request and turn non-2xx responses into `SourceError::Api`.
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Api {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SourceError> {
    let response = send(request).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.to_string()))
}

/// GET that maps 404 to `None`.
pub(crate) async fn json_optional<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<Option<T>, SourceError> {
    match json(request).await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// DELETE where an already-missing resource counts as success.
pub(crate) async fn delete_idempotent(request: RequestBuilder) -> Result<(), SourceError> {
    match send(request).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}
