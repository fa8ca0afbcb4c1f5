//! Shared utilities for talking to Ethereum JSON-RPC endpoints.

use std::{future::Future, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for a single RPC request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of attempts for read-only calls failing at the transport level.
const READ_RETRY_ATTEMPTS: usize = 4;

/// Error returned by a JSON-RPC call.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request never produced a response (connection, timeout, HTTP status).
    #[error("transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    /// The node answered with a JSON-RPC error object.
    #[error("{method} failed: {message} (code {code})")]
    Node {
        method: String,
        code: i64,
        message: String,
    },
    /// The response could not be decoded.
    #[error("invalid {method} response: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transport { .. })
    }
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result. A `null` result deserializes into `Option::None`
/// when `T` is an `Option`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    let transport = |source| RpcError::Transport {
        method: method.to_string(),
        source,
    };

    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(transport)?;

    let result: Value = response.json().await.map_err(transport)?;

    if let Some(error) = result.get("error") {
        return Err(RpcError::Node {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = result.get("result").cloned().ok_or_else(|| RpcError::Decode {
        method: method.to_string(),
        reason: "no result in response".to_string(),
    })?;

    serde_json::from_value(result_value).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Like [`json_rpc_call`], retrying transport failures with exponential backoff.
///
/// Only use this for calls without side effects: a request whose response was
/// lost may still have been executed by the node.
pub async fn json_rpc_read<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    (|| json_rpc_call(client, url, method, params.clone()))
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(200))
                .with_max_times(READ_RETRY_ATTEMPTS),
        )
        .when(RpcError::is_transient)
        .notify(|err, delay| {
            tracing::debug!(error = %err, ?delay, "RPC read failed, retrying...");
        })
        .await
}

/// Polling gave up before the check produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{name} not observed within {timeout:?}")]
pub struct PollTimeout {
    pub name: &'static str,
    pub timeout: Duration,
}

/// Repeatedly run `check` until it yields a value or `timeout` elapses.
///
/// `Ok(None)` and errors both mean "not yet": errors are logged and the check
/// is retried after `interval`. A check still running at the deadline is
/// cancelled.
pub async fn poll_until<T, F, Fut, E>(
    name: &'static str,
    timeout: Duration,
    interval: Duration,
    check: F,
) -> Result<T, PollTimeout>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: std::fmt::Display,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let timed_out = PollTimeout { name, timeout };

    loop {
        match tokio::time::timeout_at(deadline, check()).await {
            Err(_) => return Err(timed_out),
            Ok(Ok(Some(value))) => return Ok(value),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::trace!(error = %e, check = %name, "Poll check failed, retrying...");
            }
        }

        if tokio::time::Instant::now() + interval > deadline {
            return Err(timed_out);
        }

        tokio::time::sleep(interval).await;
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0xa869").unwrap(), 43113);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_first_value() {
        let calls = AtomicUsize::new(0);

        let value = poll_until(
            "value",
            Duration::from_secs(10),
            Duration::from_secs(1),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Ok::<_, String>(None)
                } else {
                    Ok(Some(n))
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_retries_errors_then_times_out() {
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = poll_until(
            "receipt",
            Duration::from_secs(5),
            Duration::from_secs(1),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<()>, _>("connection refused")
            },
        )
        .await;

        assert_eq!(
            result,
            Err(PollTimeout {
                name: "receipt",
                timeout: Duration::from_secs(5)
            })
        );
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_cancels_a_slow_check_at_the_deadline() {
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = poll_until(
            "receipt",
            Duration::from_secs(3),
            Duration::from_millis(100),
            || async {
                // A lookup stuck in its own retries.
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<Option<()>, String>(None)
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
