//! Event fan-out to subscribed sessions.
//!
//! The host loop produces [`EventFrame`]s; every subscribed session gets a
//! copy through its own bounded channel.  Broadcasting with zero subscribers
//! is a successful no-op, and a subscriber whose receiving side has gone
//! away is pruned during the send pass rather than failing the broadcast.
//!
//! A subscriber that stops draining (a stalled WebSocket client) keeps at
//! most [`EVENT_QUEUE_DEPTH`] frames queued; further events addressed to it
//! are dropped, never buffered, so one stuck client cannot grow the
//! server's memory with everyone else's activity.

use std::sync::Mutex;

use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::debug;
use uuid::Uuid;

use retrolink_core::EventFrame;

/// Per-subscriber queue depth.  Enough for bursts within a few frames;
/// anything deeper means the client is not reading.
pub const EVENT_QUEUE_DEPTH: usize = 64;

struct Subscriber {
    id: Uuid,
    tx: Sender<EventFrame>,
}

/// Registry of event subscribers, shared between the host loop and the
/// session tasks.
///
/// Uses a `std::sync::Mutex` rather than the async variant: the host loop is
/// a plain OS thread, and the critical section is a handful of channel sends
/// with no await points.
#[derive(Default)]
pub struct EventBroadcaster {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber, returning its id and the receiving end of
    /// its event channel.
    pub fn subscribe(&self) -> (Uuid, Receiver<EventFrame>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let id = Uuid::new_v4();
        self.lock().push(Subscriber { id, tx });
        debug!("event subscriber {id} registered");
        (id, rx)
    }

    /// Removes a subscriber.  Unknown ids are ignored.
    pub fn unsubscribe(&self, id: Uuid) {
        self.lock().retain(|s| s.id != id);
        debug!("event subscriber {id} removed");
    }

    /// Sends `frame` to every live subscriber, pruning dead ones, and
    /// returns the number actually reached.
    ///
    /// A subscriber whose queue is full keeps its registration but misses
    /// this frame; events are dropped rather than queued without bound.
    pub fn broadcast(&self, frame: &EventFrame) -> usize {
        let mut reached = 0;
        self.lock().retain(|s| match s.tx.try_send(frame.clone()) {
            Ok(()) => {
                reached += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("event subscriber {} stalled, dropping frame", s.id);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("event subscriber {} gone, pruning", s.id);
                false
            }
        });
        reached
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
        // A panic while holding the lock leaves the list intact, so a
        // poisoned guard is still usable.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity_frame() -> EventFrame {
        EventFrame {
            event: "machine_activity".into(),
            data: json!({"kind": "key_pressed"}),
        }
    }

    #[test]
    fn test_broadcast_with_no_subscribers_is_a_no_op() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.broadcast(&activity_frame()), 0);
    }

    #[test]
    fn test_each_subscriber_receives_a_copy() {
        // Arrange
        let broadcaster = EventBroadcaster::new();
        let (_id_a, mut rx_a) = broadcaster.subscribe();
        let (_id_b, mut rx_b) = broadcaster.subscribe();

        // Act
        let reached = broadcaster.broadcast(&activity_frame());

        // Assert
        assert_eq!(reached, 2);
        assert_eq!(rx_a.try_recv().unwrap().event, "machine_activity");
        assert_eq!(rx_b.try_recv().unwrap().event, "machine_activity");
    }

    #[test]
    fn test_unsubscribed_session_stops_receiving() {
        let broadcaster = EventBroadcaster::new();
        let (id, mut rx) = broadcaster.subscribe();
        broadcaster.unsubscribe(id);

        broadcaster.broadcast(&activity_frame());

        assert!(rx.try_recv().is_err());
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_dead_subscriber_is_pruned_and_rest_still_reached() {
        // Arrange: one subscriber drops its receiver mid-flight.
        let broadcaster = EventBroadcaster::new();
        let (_id_dead, rx_dead) = broadcaster.subscribe();
        let (_id_live, mut rx_live) = broadcaster.subscribe();
        drop(rx_dead);

        // Act
        let reached = broadcaster.broadcast(&activity_frame());

        // Assert: the live subscriber still gets the event and the dead one
        // is gone from the registry.
        assert_eq!(reached, 1);
        assert!(rx_live.try_recv().is_ok());
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_stalled_subscriber_drops_frames_but_stays_registered() {
        // Arrange: a subscriber that never drains its queue.
        let broadcaster = EventBroadcaster::new();
        let (_id, mut rx) = broadcaster.subscribe();
        for _ in 0..EVENT_QUEUE_DEPTH {
            assert_eq!(broadcaster.broadcast(&activity_frame()), 1);
        }

        // Act: the queue is full, so this frame is dropped for it.
        let reached = broadcaster.broadcast(&activity_frame());

        // Assert: not reached, not pruned, and nothing queued beyond the
        // fixed depth.
        assert_eq!(reached, 0);
        assert_eq!(broadcaster.subscriber_count(), 1);
        let mut queued = 0;
        while rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, EVENT_QUEUE_DEPTH);

        // Delivery resumes once the subscriber drains.
        assert_eq!(broadcaster.broadcast(&activity_frame()), 1);
    }

    #[test]
    fn test_stalled_subscriber_does_not_block_the_rest() {
        let broadcaster = EventBroadcaster::new();
        let (_id_stalled, _rx_stalled) = broadcaster.subscribe();
        let (_id_live, mut rx_live) = broadcaster.subscribe();
        for _ in 0..EVENT_QUEUE_DEPTH {
            broadcaster.broadcast(&activity_frame());
        }
        while rx_live.try_recv().is_ok() {}

        // The stalled subscriber's full queue must not stop delivery to the
        // one that keeps up.
        assert_eq!(broadcaster.broadcast(&activity_frame()), 1);
        assert!(rx_live.try_recv().is_ok());
    }

    #[test]
    fn test_unsubscribe_unknown_id_is_ignored() {
        let broadcaster = EventBroadcaster::new();
        let (_id, _rx) = broadcaster.subscribe();
        broadcaster.unsubscribe(Uuid::new_v4());
        assert_eq!(broadcaster.subscriber_count(), 1);
    }
}
