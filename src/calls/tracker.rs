//! Turns driver call events into missed-call log entries.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use super::log::CallLog;
use crate::driver::CallCallback;
use crate::error::Result;
use crate::gate::ModemGate;
use crate::model::call::{CallEvent, MissedCallRecord};

#[derive(Clone)]
pub struct EventTracker {
    log: Arc<CallLog>,
}

impl EventTracker {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Arc<CallLog> {
        &self.log
    }

    /// Record `event` if it is a missed incoming call; drop anything else.
    ///
    /// Runs on the driver's thread and must not touch the modem gate.
    pub fn handle(&self, event: &CallEvent) {
        if !event.is_missed_incoming() {
            debug!(kind = ?event.kind, state = ?event.state, number = %event.number, "Ignoring call event");
            return;
        }
        let record = MissedCallRecord::new(
            event.number.clone(),
            event.timestamp.unwrap_or_else(Utc::now),
        );
        info!(number = %record.number, "Missed call");
        if let Err(e) = self.log.append(record) {
            error!(path = %self.log.path().display(), error = %e, "Failed to persist missed call");
        }
    }

    /// Boxed callback suitable for [`ModemDriver::set_incoming_callback`](crate::driver::ModemDriver::set_incoming_callback).
    pub fn callback(&self) -> CallCallback {
        let tracker = self.clone();
        Box::new(move |event| tracker.handle(&event))
    }

    /// Install the callback and enable call notifications.
    pub fn register(&self, gate: &ModemGate) -> Result<()> {
        let mut guard = gate.acquire()?;
        guard.set_incoming_callback(self.callback());
        guard.set_incoming_call(true)?;
        info!("Incoming call listening enabled");
        Ok(())
    }
}
