//! JSON-RPC transport for bridge processes
//!
//! Requests are written one per line to the child's stdin; responses are
//! read one per line from its stdout and matched back to the waiting caller
//! by id.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::BridgeError;

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

type ResponseSender = oneshot::Sender<Result<Value, BridgeError>>;

/// Request sender type alias
pub type RequestSender = mpsc::Sender<(RpcRequest, ResponseSender)>;

/// Request receiver type alias
pub type RequestReceiver = mpsc::Receiver<(RpcRequest, ResponseSender)>;

/// Global request ID counter
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Create a new RPC request with auto-incremented ID
pub fn new_request(method: &str, params: Value) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0",
        id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
        method: method.to_string(),
        params,
    }
}

/// Send an RPC request and wait for response
pub async fn send_request(
    request_tx: &RequestSender,
    method: &str,
    params: Value,
) -> Result<Value, BridgeError> {
    let req = new_request(method, params);
    let (tx, rx) = oneshot::channel();

    request_tx
        .send((req, tx))
        .await
        .map_err(|_| BridgeError::Disconnected)?;

    rx.await.map_err(|_| BridgeError::Disconnected)?
}

/// Decode one response line into the caller's result
fn into_result(response: RpcResponse) -> Result<Value, BridgeError> {
    match response.error {
        Some(err) => Err(BridgeError::ServerError(format!(
            "[{}] {}",
            err.code, err.message
        ))),
        None => Ok(response.result.unwrap_or(Value::Null)),
    }
}

/// Spawn the background communication task for JSON-RPC over stdin/stdout
pub fn spawn_communication_task(
    mut request_rx: RequestReceiver,
    stdin: ChildStdin,
    stdout: ChildStdout,
) {
    tokio::spawn(async move {
        let mut stdin = stdin;
        let mut reader = BufReader::new(stdout);
        let mut pending: HashMap<u64, ResponseSender> = HashMap::new();
        let mut line = String::new();

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    match request {
                        Some((req, response_tx)) => {
                            let id = req.id;
                            let json = match serde_json::to_string(&req) {
                                Ok(json) => json + "\n",
                                Err(e) => {
                                    let _ = response_tx.send(Err(e.into()));
                                    continue;
                                }
                            };
                            if stdin.write_all(json.as_bytes()).await.is_err() {
                                let _ = response_tx.send(Err(BridgeError::Disconnected));
                                break;
                            }
                            pending.insert(id, response_tx);
                        }
                        None => break,
                    }
                }

                result = reader.read_line(&mut line) => {
                    match result {
                        Ok(0) => break,
                        Ok(_) => {
                            match serde_json::from_str::<RpcResponse>(&line) {
                                Ok(response) => {
                                    if let Some(tx) = pending.remove(&response.id) {
                                        let _ = tx.send(into_result(response));
                                    }
                                }
                                Err(_) => debug!(line = line.trim_end(), "Ignoring non-RPC output"),
                            }
                            line.clear();
                        }
                        Err(e) => {
                            warn!(error = %e, "Bridge stdout read failed");
                            break;
                        }
                    }
                }
            }
        }

        // Dropping the senders wakes every waiting caller with Disconnected
        pending.clear();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_ids_increase() {
        let a = new_request("page.goto", json!({}));
        let b = new_request("page.goto", json!({}));
        assert!(b.id > a.id);
        assert_eq!(a.jsonrpc, "2.0");
    }

    #[test]
    fn test_response_decoding() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"count":2}}"#).unwrap();
        assert_eq!(into_result(ok).unwrap(), json!({"count": 2}));

        let err: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"Timeout 500ms"}}"#,
        )
        .unwrap();
        let message = into_result(err).unwrap_err().to_string();
        assert!(message.contains("[-32000] Timeout 500ms"));
    }
}
