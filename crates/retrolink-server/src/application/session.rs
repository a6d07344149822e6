//! One client session: envelope parsing, local subscription tools, and
//! bridge forwarding.
//!
//! A [`Session`] owns no socket.  The transport layer feeds it inbound text
//! frames and sends whatever it returns; events flow out through the channel
//! handed over by [`Session::take_event_rx`].  That split keeps the whole
//! request path testable without a listener.
//!
//! Two tools never cross the bridge.  `events.subscribe` and
//! `events.unsubscribe` only touch session-local state (the subscriber
//! registration), so they are served here and the host loop never sees them.

use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, warn};
use uuid::Uuid;

use retrolink_core::{EventFrame, RpcError, WireRequest, WireResponse};
use retrolink_host::bridge::RequestBridge;

use crate::infrastructure::broadcast::EventBroadcaster;

/// The server-side state of one connected client.
pub struct Session {
    id: Uuid,
    bridge: RequestBridge,
    broadcaster: Arc<EventBroadcaster>,
    /// Set while this session is subscribed to machine events.
    subscription: Option<Uuid>,
    /// Receiver handed out once to the transport's event-forwarding side.
    event_rx: Option<Receiver<EventFrame>>,
}

impl Session {
    pub fn new(bridge: RequestBridge, broadcaster: Arc<EventBroadcaster>) -> Self {
        let id = Uuid::new_v4();
        debug!("session {id} created");
        Session {
            id,
            bridge,
            broadcaster,
            subscription: None,
            event_rx: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handles one inbound text frame and returns the serialized response.
    ///
    /// Every frame gets exactly one response, including unparseable ones
    /// (`PARSE_ERROR` with a null id, since no id could be recovered).
    pub async fn handle_frame(&mut self, text: &str) -> String {
        let request: WireRequest = match serde_json::from_str(text) {
            Ok(req) => req,
            Err(e) => {
                warn!("session {}: unparseable frame: {e}", self.id);
                let err = RpcError::ParseError(e.to_string());
                return serialize(&WireResponse::err(None, &err));
            }
        };

        let id = request.id;
        let result = match request.name.as_str() {
            "events.subscribe" => self.subscribe(),
            "events.unsubscribe" => self.unsubscribe(),
            _ => self.bridge.submit(request.name, request.params).await,
        };

        let response = match result {
            Ok(value) => WireResponse::ok(id, value),
            Err(err) => WireResponse::err(Some(id), &err),
        };
        serialize(&response)
    }

    /// Hands out the event receiver.  Returns `None` until the session has
    /// subscribed, and at most once per subscription.
    pub fn take_event_rx(&mut self) -> Option<Receiver<EventFrame>> {
        self.event_rx.take()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    fn subscribe(&mut self) -> Result<serde_json::Value, RpcError> {
        if self.subscription.is_none() {
            let (sub_id, rx) = self.broadcaster.subscribe();
            self.subscription = Some(sub_id);
            self.event_rx = Some(rx);
            debug!("session {} subscribed to events", self.id);
        }
        Ok(serde_json::json!({"status": "ok", "subscribed": true}))
    }

    fn unsubscribe(&mut self) -> Result<serde_json::Value, RpcError> {
        if let Some(sub_id) = self.subscription.take() {
            self.broadcaster.unsubscribe(sub_id);
            self.event_rx = None;
            debug!("session {} unsubscribed from events", self.id);
        }
        Ok(serde_json::json!({"status": "ok", "subscribed": false}))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A disconnecting client must not leave a dangling subscriber.
        if let Some(sub_id) = self.subscription.take() {
            self.broadcaster.unsubscribe(sub_id);
        }
    }
}

fn serialize(response: &WireResponse) -> String {
    // The envelope contains only JSON-representable types.
    serde_json::to_string(response).unwrap_or_else(|e| {
        warn!("response serialization failed: {e}");
        r#"{"id":null,"error":{"code":-32603,"message":"internal error: response serialization failed"}}"#.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrolink_host::bridge::bridge_channel;
    use retrolink_host::runtime::HostRuntime;
    use retrolink_host::testing::MockMachine;
    use serde_json::{json, Value};

    /// A session wired to a live host runtime pumped on demand.
    struct Harness {
        session: Session,
        runtime: HostRuntime,
        machine: MockMachine,
        broadcaster: Arc<EventBroadcaster>,
    }

    impl Harness {
        fn new() -> Self {
            let (bridge, rx) = bridge_channel(16);
            let broadcaster = Arc::new(EventBroadcaster::new());
            Harness {
                session: Session::new(bridge, Arc::clone(&broadcaster)),
                runtime: HostRuntime::new(rx),
                machine: MockMachine::new(),
                broadcaster,
            }
        }

        /// Feeds one frame, pumping the host runtime concurrently so bridged
        /// requests complete.
        async fn roundtrip(&mut self, text: &str) -> Value {
            let handle = self.session.handle_frame(text);
            tokio::pin!(handle);
            loop {
                tokio::select! {
                    response = &mut handle => {
                        return serde_json::from_str(&response).unwrap();
                    }
                    _ = tokio::task::yield_now() => {
                        self.runtime.process_frame(&mut self.machine);
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_unparseable_frame_gets_parse_error_with_null_id() {
        let mut h = Harness::new();

        let response = h.roundtrip("{not json").await;

        assert!(response["id"].is_null());
        assert_eq!(response["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_bridged_request_echoes_id_and_result() {
        let mut h = Harness::new();

        let response = h
            .roundtrip(r#"{"id":42,"name":"machine.ping","params":{}}"#)
            .await;

        assert_eq!(response["id"], 42);
        assert_eq!(response["result"]["status"], "ok");
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_error_carries_request_id() {
        let mut h = Harness::new();

        let response = h
            .roundtrip(r#"{"id":9,"name":"tape.rewind"}"#)
            .await;

        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_missing_params_field_defaults_to_null() {
        let mut h = Harness::new();

        // keyboard.type with no params at all: handler sees null and reports
        // the missing text field, not a parse error.
        let response = h
            .roundtrip(r#"{"id":1,"name":"keyboard.type"}"#)
            .await;

        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_subscribe_is_served_locally_and_registers() {
        let mut h = Harness::new();

        let response = h
            .roundtrip(r#"{"id":1,"name":"events.subscribe"}"#)
            .await;

        assert_eq!(response["result"]["subscribed"], true);
        assert!(h.session.is_subscribed());
        assert_eq!(h.broadcaster.subscriber_count(), 1);
        assert!(h.session.take_event_rx().is_some());
    }

    #[tokio::test]
    async fn test_subscribed_session_receives_broadcast() {
        let mut h = Harness::new();
        h.roundtrip(r#"{"id":1,"name":"events.subscribe"}"#).await;
        let mut rx = h.session.take_event_rx().unwrap();

        h.broadcaster.broadcast(&EventFrame {
            event: "machine_activity".into(),
            data: json!({"kind": "joystick_set"}),
        });

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.event, "machine_activity");
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_keeps_single_registration() {
        let mut h = Harness::new();
        h.roundtrip(r#"{"id":1,"name":"events.subscribe"}"#).await;
        h.roundtrip(r#"{"id":2,"name":"events.subscribe"}"#).await;

        assert_eq!(h.broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_registration() {
        let mut h = Harness::new();
        h.roundtrip(r#"{"id":1,"name":"events.subscribe"}"#).await;
        let response = h
            .roundtrip(r#"{"id":2,"name":"events.unsubscribe"}"#)
            .await;

        assert_eq!(response["result"]["subscribed"], false);
        assert_eq!(h.broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_without_subscription_is_ok() {
        let mut h = Harness::new();
        let response = h
            .roundtrip(r#"{"id":1,"name":"events.unsubscribe"}"#)
            .await;
        assert_eq!(response["result"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_dropping_session_cleans_up_subscription() {
        let mut h = Harness::new();
        h.roundtrip(r#"{"id":1,"name":"events.subscribe"}"#).await;
        let broadcaster = Arc::clone(&h.broadcaster);

        drop(h);

        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_host_loop_yields_internal_error() {
        let (bridge, rx) = bridge_channel(4);
        drop(rx);
        let broadcaster = Arc::new(EventBroadcaster::new());
        let mut session = Session::new(bridge, broadcaster);

        let response: Value = serde_json::from_str(
            &session
                .handle_frame(r#"{"id":5,"name":"machine.ping"}"#)
                .await,
        )
        .unwrap();

        assert_eq!(response["id"], 5);
        assert_eq!(response["error"]["code"], -32603);
    }
}
