//! The capability set the engine needs from the modem driver.
//!
//! The driver itself (serial I/O, AT framing, vendor protocols) lives outside
//! this crate. Everything above this module talks to the modem only through
//! [`ModemDriver`], and only while holding the [`crate::gate::ModemGate`].

pub mod simulated;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GateError, Result};
use crate::model::call::CallEvent;
use crate::model::segment::{OutgoingSegment, Segment};

/// Callback invoked by the driver, on its own thread, for every call event.
pub type CallCallback = Box<dyn Fn(CallEvent) + Send + Sync>;

/// Lock state of the SIM after the driver is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityStatus {
    Ready,
    PinRequired,
}

/// Occupied message slots per storage area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmsStatus {
    pub sim_used: usize,
    pub phone_used: usize,
    pub templates_used: usize,
}

impl SmsStatus {
    /// Total stored segments across every storage area.
    pub fn total(&self) -> usize {
        self.sim_used + self.phone_used + self.templates_used
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignalQuality {
    /// dBm.
    pub signal_strength: i32,
    pub signal_percent: i32,
    pub bit_error_rate: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkInfo {
    /// `"MCC MNC"`, e.g. `"262 01"`.
    pub network_code: String,
    pub state: String,
    #[serde(rename = "LAC")]
    pub lac: String,
    #[serde(rename = "CID")]
    pub cid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
}

/// Everything the engine asks of the modem.
///
/// Implementations need not be thread-safe beyond `Send`: callers serialize
/// all access through the modem gate. The only concurrent entry point is the
/// call callback, which the driver invokes from its own context.
pub trait ModemDriver: Send {
    fn security_status(&mut self) -> Result<SecurityStatus>;

    fn enter_pin(&mut self, pin: &str) -> Result<()>;

    fn sms_status(&mut self) -> Result<SmsStatus>;

    /// First stored segment of `folder`, restarting the read cursor.
    fn first_segment(&mut self, folder: u32) -> Result<Segment>;

    /// Segment following `after` in `folder`.
    fn next_segment(&mut self, folder: u32, after: u32) -> Result<Segment>;

    /// Send one segment. Returns the network message reference.
    fn send(&mut self, segment: &OutgoingSegment) -> Result<u8>;

    fn delete(&mut self, folder: u32, location: u32) -> Result<()>;

    fn signal_quality(&mut self) -> Result<SignalQuality>;

    fn network_info(&mut self) -> Result<NetworkInfo>;

    /// Operator name for an `"MCC MNC"` code, from the driver's table.
    fn network_name(&self, _code: &str) -> Option<String> {
        None
    }

    fn reset(&mut self, hard: bool) -> Result<()>;

    fn set_incoming_call(&mut self, enabled: bool) -> Result<()>;

    fn set_incoming_callback(&mut self, callback: CallCallback);
}

/// Bring the modem to a usable state, entering `pin` if the SIM asks for one.
///
/// Fails with [`GateError::Security`] when a PIN is required but none (or an
/// empty one) was supplied.
pub fn unlock(driver: &mut dyn ModemDriver, pin: Option<&str>) -> Result<()> {
    match driver.security_status()? {
        SecurityStatus::Ready => Ok(()),
        SecurityStatus::PinRequired => {
            let pin = pin.filter(|p| !p.is_empty()).ok_or_else(|| {
                warn!("SIM requires a PIN but none was configured");
                GateError::Security("PIN is required.".to_string())
            })?;
            driver.enter_pin(pin)?;
            info!("SIM unlocked");
            Ok(())
        }
    }
}
