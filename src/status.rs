//! Modem status queries and reset.

use std::sync::Arc;

use tracing::info;

use crate::driver::{NetworkInfo, SignalQuality};
use crate::error::Result;
use crate::gate::ModemGate;

/// Name reported for operator codes missing from the driver's table.
pub const UNKNOWN_NETWORK: &str = "Unknown";

pub struct StatusService {
    gate: Arc<ModemGate>,
}

impl StatusService {
    pub fn new(gate: Arc<ModemGate>) -> Self {
        Self { gate }
    }

    pub fn signal(&self) -> Result<SignalQuality> {
        self.gate.acquire()?.signal_quality()
    }

    /// Current registration with the operator name filled in.
    pub fn network(&self) -> Result<NetworkInfo> {
        let mut guard = self.gate.acquire()?;
        let mut info = guard.network_info()?;
        let name = guard
            .network_name(&info.network_code)
            .unwrap_or_else(|| UNKNOWN_NETWORK.to_string());
        info.network_name = Some(name);
        Ok(info)
    }

    pub fn reset(&self, hard: bool) -> Result<()> {
        self.gate.acquire()?.reset(hard)?;
        info!(hard, "Modem reset");
        Ok(())
    }
}
