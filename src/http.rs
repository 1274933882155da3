//! HTTP transport helpers shared by the cloud service clients
//!
//! Every helper requires a `200 OK` with a non-empty body. Anything else is an
//! error, which the callers degrade to an empty result.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use crate::config::HttpConfig;
use crate::{Error, Result};

/// Body and content type of a successful response
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// `Content-Type` header, if the server sent one
    pub content_type: Option<String>,

    /// Response body
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Whether the server labelled the body as audio
    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("audio/"))
    }

    /// Body decoded as UTF-8 (lossy)
    #[must_use]
    pub fn into_text(self) -> String {
        String::from_utf8(self.body)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }
}

/// One-shot HTTP client
///
/// Idle connections are never kept, so each request opens and tears down its
/// own connection.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the configured request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialized
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client })
    }

    /// POST a raw body with the given content type and return the response text
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-200 status or empty body
    pub async fn post(&self, url: &str, body: String, content_type: &str) -> Result<String> {
        tracing::debug!(url = %redact(url), content_type, bytes = body.len(), "HTTP POST");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %redact(url), error = %e, "HTTP POST request failed");
                e
            })?;

        Ok(read_body(response, url).await?.into_text())
    }

    /// POST an `application/x-www-form-urlencoded` body
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-200 status or empty body
    pub async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> Result<RawResponse> {
        tracing::debug!(url = %redact(url), fields = params.len(), "HTTP POST (form)");

        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %redact(url), error = %e, "HTTP POST request failed");
                e
            })?;

        read_body(response, url).await
    }

    /// GET a URL and return the response text
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-200 status or empty body
    pub async fn get(&self, url: &str) -> Result<String> {
        tracing::debug!(url = %redact(url), "HTTP GET");

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!(url = %redact(url), error = %e, "HTTP GET request failed");
            e
        })?;

        Ok(read_body(response, url).await?.into_text())
    }
}

/// Validate status and collect the body
async fn read_body(response: reqwest::Response, url: &str) -> Result<RawResponse> {
    let status = response.status();
    if status != StatusCode::OK {
        tracing::error!(url = %redact(url), status = %status, "HTTP request failed with status code");
        let body = response.text().await.unwrap_or_default();
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            url: redact(url).to_string(),
            body,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(Error::EmptyResponse(redact(url).to_string()));
    }

    Ok(RawResponse {
        content_type,
        body: body.to_vec(),
    })
}

/// Strip the query string, which may carry tokens or API keys
pub(crate) fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
