use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::error::HttpClientError;
use crate::options::RequestOptions;

/// Header carrying the client-generated idempotency key.
///
/// The key is generated once per logical call and resent verbatim on every
/// retry, so a receiver that deduplicates on it cannot double-apply a
/// re-sent POST.
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

#[derive(Clone, Copy)]
enum Payload<'a> {
    Get,
    Post(&'a serde_json::Value),
}

/// Outbound HTTP client with bounded timeout, bounded retries, and linear
/// backoff.
///
/// An attempt fails on a transport error, on the per-attempt deadline, or on
/// a non-2xx response; while retries remain the client sleeps
/// `retry_delay * (attempt + 1)` and tries again, otherwise the last error
/// is returned. The deadline is enforced with [`tokio::time::timeout`]
/// around the whole attempt, so a call returns within the configured
/// timeout even if the remote never responds.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: reqwest::Client,
    defaults: RequestOptions,
}

impl ResilientClient {
    /// Build a client with the given default options.
    pub fn new(defaults: RequestOptions) -> Result<Self, HttpClientError> {
        // No reqwest-level timeout: the deadline is enforced around each
        // attempt so it also covers connection setup and body reads.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpClientError::Configuration(e.to_string()))?;
        Ok(Self { client, defaults })
    }

    /// The default options applied when a call passes `None`.
    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// POST a JSON body and return the decoded JSON response.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &HashMap<String, String>,
        opts: Option<&RequestOptions>,
    ) -> Result<serde_json::Value, HttpClientError> {
        self.execute(url, Payload::Post(body), headers, opts).await
    }

    /// GET a URL and return the decoded JSON response.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        opts: Option<&RequestOptions>,
    ) -> Result<serde_json::Value, HttpClientError> {
        self.execute(url, Payload::Get, headers, opts).await
    }

    /// POST and deserialize the response into `T`.
    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &HashMap<String, String>,
        opts: Option<&RequestOptions>,
    ) -> Result<T, HttpClientError> {
        let value = self.post_json(url, body, headers, opts).await?;
        serde_json::from_value(value).map_err(|e| HttpClientError::Decode(e.to_string()))
    }

    /// GET and deserialize the response into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        opts: Option<&RequestOptions>,
    ) -> Result<T, HttpClientError> {
        let value = self.get_json(url, headers, opts).await?;
        serde_json::from_value(value).map_err(|e| HttpClientError::Decode(e.to_string()))
    }

    async fn execute(
        &self,
        url: &str,
        payload: Payload<'_>,
        headers: &HashMap<String, String>,
        opts: Option<&RequestOptions>,
    ) -> Result<serde_json::Value, HttpClientError> {
        let opts = opts.unwrap_or(&self.defaults);

        // One key for the whole logical call, shared by every retry.
        let idempotency_key = match payload {
            Payload::Post(_) => Some(Uuid::new_v4().to_string()),
            Payload::Get => None,
        };

        let mut last_error = HttpClientError::Connection("no attempt made".into());

        for attempt in 0..=opts.max_retries {
            let mut request = match payload {
                Payload::Get => self.client.get(url),
                Payload::Post(body) => self.client.post(url).json(body),
            };
            for (key, value) in headers {
                request = request.header(key, value);
            }
            if let Some(ref key) = idempotency_key {
                request = request.header(IDEMPOTENCY_KEY_HEADER, key);
            }

            match tokio::time::timeout(opts.timeout, Self::attempt(request)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => last_error = err,
                Err(_elapsed) => last_error = HttpClientError::Timeout(opts.timeout),
            }

            if attempt < opts.max_retries {
                let delay = opts.delay_for(attempt);
                warn!(
                    url,
                    attempt,
                    delay_ms = %delay.as_millis(),
                    error = %last_error,
                    "HTTP request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }

    /// Run a single attempt: send, check status, decode the body.
    async fn attempt(request: reqwest::RequestBuilder) -> Result<serde_json::Value, HttpClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                HttpClientError::Connection(e.to_string())
            } else {
                HttpClientError::Connection(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            // Probe the error body for an `error` field to enrich the message.
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("error")
                        .and_then(|v| v.as_str())
                        .map(str::to_owned)
                })
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(HttpClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| HttpClientError::Decode(e.to_string()))
    }
}
