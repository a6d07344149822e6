//! Cross-thread request bridge between transport tasks and the host loop.
//!
//! Transport tasks run on the async runtime; the machine lives on the
//! emulator's single-threaded real-time loop.  The bridge is the only path
//! between them: a bounded queue carries requests in, a oneshot channel per
//! request carries the result back.
//!
//! Submission never blocks the host side and never waits for queue space.
//! A full queue is an immediate `SERVER_BUSY` back to the caller so the
//! client can retry, keeping a flood of requests from building unbounded
//! latency into the control path.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use retrolink_core::RpcError;

/// One request in flight from a transport task to the host loop.
pub struct PendingRequest {
    pub name: String,
    pub params: Value,
    /// Dropped receivers are fine: the host applies the side effects and
    /// discards the undeliverable result.
    pub reply_to: oneshot::Sender<Result<Value, RpcError>>,
}

/// Transport-side handle for submitting requests to the host loop.
///
/// Cloneable; every session holds one.
#[derive(Clone)]
pub struct RequestBridge {
    tx: mpsc::Sender<PendingRequest>,
}

/// Creates a bridge with the given queue capacity, returning the
/// transport-side handle and the host-side receiver.
pub fn bridge_channel(capacity: usize) -> (RequestBridge, mpsc::Receiver<PendingRequest>) {
    let (tx, rx) = mpsc::channel(capacity);
    (RequestBridge { tx }, rx)
}

impl RequestBridge {
    /// Submits one request and waits for the host loop to execute it.
    ///
    /// # Errors
    ///
    /// - `SERVER_BUSY` when the queue is full.  The request was not enqueued
    ///   and had no effect; the caller may retry.
    /// - `INTERNAL_ERROR` when the host loop has shut down, either before
    ///   enqueueing or while the request was waiting.
    pub async fn submit(&self, name: String, params: Value) -> Result<Value, RpcError> {
        let (reply_to, reply_rx) = oneshot::channel();
        let request = PendingRequest {
            name,
            params,
            reply_to,
        };

        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!("request queue full, rejecting request");
                RpcError::ServerBusy
            }
            mpsc::error::TrySendError::Closed(_) => {
                RpcError::internal("Host loop is not running")
            }
        })?;

        // A dropped sender means the host loop exited mid-request.
        reply_rx
            .await
            .map_err(|_| RpcError::internal("Host loop shut down before replying"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_delivers_request_and_reply() {
        let (bridge, mut rx) = bridge_channel(4);

        let submit = tokio::spawn(async move {
            bridge.submit("machine.ping".into(), json!({})).await
        });

        let request = rx.recv().await.unwrap();
        assert_eq!(request.name, "machine.ping");
        request.reply_to.send(Ok(json!({"status": "ok"}))).unwrap();

        let result = submit.await.unwrap().unwrap();
        assert_eq!(result["status"], "ok");
    }

    #[tokio::test]
    async fn test_full_queue_is_server_busy() {
        let (bridge, _rx) = bridge_channel(1);

        // First submission occupies the single slot; nobody drains it.
        let bridge2 = bridge.clone();
        let _held = tokio::spawn(async move {
            bridge2.submit("keyboard.type".into(), json!({"text": "a"})).await
        });
        tokio::task::yield_now().await;

        let err = bridge
            .submit("machine.ping".into(), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32000);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_internal_error() {
        let (bridge, rx) = bridge_channel(4);
        drop(rx);

        let err = bridge
            .submit("machine.ping".into(), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32603);
    }

    #[tokio::test]
    async fn test_dropped_reply_sender_is_internal_error() {
        let (bridge, mut rx) = bridge_channel(4);

        let submit = tokio::spawn(async move {
            bridge.submit("machine.ping".into(), json!({})).await
        });

        let request = rx.recv().await.unwrap();
        drop(request.reply_to);

        let err = submit.await.unwrap().unwrap_err();
        assert_eq!(err.code(), -32603);
    }
}
