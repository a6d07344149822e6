//! Per-frame execution of queued requests on the host thread.
//!
//! [`HostRuntime::process_frame`] is the single entry point the emulator's
//! real-time loop calls, once per simulated frame.  It advances the release
//! scheduler, then drains whatever requests have accumulated since the last
//! frame, executing each against the machine and replying.  It never waits
//! on network I/O and never blocks on an empty queue.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};

use retrolink_core::{Machine, RpcError};

use crate::bridge::PendingRequest;
use crate::release::ReleaseScheduler;
use crate::tools::{ToolContext, ToolDispatcher};

/// The host-thread half of the control plane.
pub struct HostRuntime {
    rx: mpsc::Receiver<PendingRequest>,
    dispatcher: ToolDispatcher,
    scheduler: ReleaseScheduler,
}

impl HostRuntime {
    pub fn new(rx: mpsc::Receiver<PendingRequest>) -> Self {
        HostRuntime {
            rx,
            dispatcher: ToolDispatcher::new(),
            scheduler: ReleaseScheduler::new(),
        }
    }

    /// Ticks the release scheduler, then executes all queued requests
    /// against the machine.  Call once per simulated frame.
    ///
    /// The tick runs before the drain so that a release scheduled by a
    /// request executed in this frame takes its first decrement on the NEXT
    /// frame.  A one-frame hold is therefore held across one full frame
    /// window; ticking after the drain would release it inside the same
    /// `process_frame` call, before the machine ever sees the key down.
    ///
    /// Handler panics are caught and converted to `INTERNAL_ERROR`; the host
    /// thread itself must never die.  A reply whose requester has gone away
    /// is discarded, with the side effects left applied.
    pub fn process_frame(&mut self, machine: &mut dyn Machine) {
        self.scheduler.on_host_tick(machine);
        while let Ok(request) = self.rx.try_recv() {
            let result = self.execute(machine, &request.name, &request.params);
            if request.reply_to.send(result).is_err() {
                debug!("requester gone, discarding result for '{}'", request.name);
            }
        }
    }

    fn execute(
        &mut self,
        machine: &mut dyn Machine,
        name: &str,
        params: &Value,
    ) -> Result<Value, RpcError> {
        let dispatcher = &self.dispatcher;
        let scheduler = &mut self.scheduler;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = ToolContext { machine, scheduler };
            dispatcher.dispatch(&mut ctx, name, params)
        }));

        match outcome {
            Ok(result) => result,
            Err(_) => {
                error!("tool handler for '{name}' panicked");
                Err(RpcError::internal("Tool handler panicked"))
            }
        }
    }

    /// Number of scheduled releases still pending.
    pub fn pending_releases(&self) -> usize {
        self.scheduler.pending()
    }

    /// True once every transport-side handle has been dropped.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}
