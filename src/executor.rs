use reqwest::{header::HeaderMap, Method, StatusCode, Url};
use tokio::time::sleep;

use crate::{KvsError, Result, Session};

/// Response as received from the transport, before any decoding.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// Numeric response status.
    pub status: u16,
    /// Final request address.
    pub endpoint: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Error message for a non-success response: the body verbatim, or the
    /// canonical reason when the body is empty.
    pub fn error_message(&self) -> String {
        if !self.body.is_empty() {
            return String::from_utf8_lossy(&self.body).into_owned();
        }
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("request failed")
            .to_owned()
    }
}

impl Session {
    /// Issues one request, retrying transient failures.
    ///
    /// `max_attempts` in the session's [`RetryPolicy`](crate::RetryPolicy)
    /// is the total number of tries. A response whose status is retryable
    /// is retried while tries remain and returned as-is once they run out;
    /// any other response is returned immediately. Connection failures are
    /// retried the same way and propagated once tries run out. Every retry
    /// waits the same fixed delay.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: Url,
        body: Option<String>,
        headers: Option<HeaderMap>,
    ) -> Result<RawResponse> {
        let http = self.http()?;
        let policy = &self.options().retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1usize;

        loop {
            let outcome = send_once(
                http,
                method.clone(),
                endpoint.clone(),
                body.clone(),
                headers.clone(),
            )
            .await;

            match outcome {
                Ok(response)
                    if policy.is_retryable_status(response.status) && attempt < max_attempts =>
                {
                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        endpoint = %endpoint,
                        status = response.status,
                        attempt,
                        "attempt failed, retrying in {} ms",
                        policy.base_delay_ms
                    );

                    #[cfg(not(feature = "tracing"))]
                    let _ = response;
                }
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(endpoint = %endpoint, attempt, "connection failure: {err}");

                    #[cfg(not(feature = "tracing"))]
                    let _ = err;
                }
                Err(err) => return Err(err),
            }

            sleep(policy.delay()).await;
            attempt += 1;
        }
    }
}

async fn send_once(
    http: &reqwest::Client,
    method: Method,
    endpoint: Url,
    body: Option<String>,
    headers: Option<HeaderMap>,
) -> Result<RawResponse> {
    let mut request = http.request(method, endpoint);
    if let Some(headers) = headers {
        request = request.headers(headers);
    }
    if let Some(body) = body {
        request = request.body(body);
    }

    let response = request.send().await.map_err(KvsError::from_transport)?;
    let status = response.status().as_u16();
    let endpoint = response.url().to_string();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(KvsError::from_transport)?;

    Ok(RawResponse {
        status,
        endpoint,
        headers,
        body: body.to_vec(),
    })
}
