// crates/meeple-cli/src/rpc_client.rs
//
// Lightweight JSON-RPC client that POSTs to the meeple-daemon HTTP endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Mirrors the server's JsonRpcRequest envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: serde_json::Value,
}

/// Mirrors the server's JsonRpcResponse envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Failures talking to the daemon.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("could not reach daemon: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("daemon rejected {method}: {message}")]
    Rejected { method: String, message: String },

    #[error("unexpected response to {method}: {message}")]
    Malformed { method: String, message: String },
}

/// Send a JSON-RPC call to the daemon and return the parsed response.
pub async fn rpc_call(
    endpoint: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<JsonRpcResponse, RpcError> {
    let request = JsonRpcRequest {
        method: method.to_string(),
        params,
    };

    let client = reqwest::Client::new();
    let resp = client.post(endpoint).json(&request).send().await?;

    let rpc_response: JsonRpcResponse = resp.json().await?;
    Ok(rpc_response)
}

/// Call `method` and decode a successful result as `T`.
pub async fn call<T: DeserializeOwned>(
    endpoint: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<T, RpcError> {
    let response = rpc_call(endpoint, method, params).await?;
    decode(method, response)
}

/// Turn an envelope into either the typed result or an error.
fn decode<T: DeserializeOwned>(method: &str, response: JsonRpcResponse) -> Result<T, RpcError> {
    if !response.success {
        return Err(RpcError::Rejected {
            method: method.to_string(),
            message: response.error.unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    let value = response.result.ok_or_else(|| RpcError::Malformed {
        method: method.to_string(),
        message: "missing result".to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| RpcError::Malformed {
        method: method.to_string(),
        message: e.to_string(),
    })
}
