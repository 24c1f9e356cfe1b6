//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between polling attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Create an HTTP client configured for JSON-RPC and explorer requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A `null` result deserializes into `None` when `T` is an `Option`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
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
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    parse_response(method, result)
}

/// Extract the `result` of a JSON-RPC response, surfacing `error` objects.
fn parse_response<T: DeserializeOwned>(method: &str, response: Value) -> Result<T, anyhow::Error> {
    if let Some(error) = response.get("error") {
        anyhow::bail!(
            "RPC error in {}: {}",
            method,
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = response
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll `check_fn` until it yields a value.
///
/// `check_fn` returns `Ok(None)` while the awaited condition is not met yet; errors
/// are logged and retried. Fails once `timeout` has elapsed.
pub async fn wait_for<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                tracing::trace!(name, "Condition not met yet, retrying...");
            }
            Err(e) => {
                tracing::debug!(error = %e, name, "Check failed, retrying...");
            }
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Timeout after {:?} waiting for {}", timeout, name);
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::U64;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_hex_quantity_result() {
        let value: U64 = parse_response(
            "eth_chainId",
            serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": "0x7a69" }),
        )
        .unwrap();
        assert_eq!(value.to::<u64>(), 31337);
    }

    #[test]
    fn test_null_result_is_none() {
        let value: Option<Value> = parse_response(
            "eth_getTransactionReceipt",
            serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": null }),
        )
        .unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_error_response() {
        let err = parse_response::<Value>(
            "eth_sendRawTransaction",
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "insufficient funds for gas * price + value" }
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn test_wait_for_returns_first_value() {
        let attempts = AtomicUsize::new(0);
        let value = wait_for("counter", Duration::from_secs(5), Duration::from_millis(1), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                match attempt {
                    0 => anyhow::bail!("transient"),
                    1 => Ok(None),
                    _ => Ok(Some(attempt)),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let result: Result<(), _> =
            wait_for("never", Duration::from_millis(5), Duration::from_millis(1), || async {
                Ok::<_, anyhow::Error>(None)
            })
            .await;
        assert!(result.is_err());
    }
}
