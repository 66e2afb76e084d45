//! In-memory modem used by the tests and by the binary when no hardware
//! driver is linked in.
//!
//! The store is a `BTreeMap` keyed by location, so the read cursor walks
//! segments in location order like a SIM does. A [`SimulatorHandle`] shares
//! the state with the outside world: tests use it to deliver messages, inspect
//! what was sent, inject failures, and fire call events from another thread.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use super::{CallCallback, ModemDriver, NetworkInfo, SecurityStatus, SignalQuality, SmsStatus};
use crate::codec;
use crate::error::{GateError, Result};
use crate::model::call::CallEvent;
use crate::model::segment::{OutgoingSegment, Segment, SegmentState};

/// Folder incoming messages are stored in.
pub const INBOX_FOLDER: u32 = 0;

struct SimState {
    initialized: bool,
    pin: Option<String>,
    unlocked: bool,
    segments: BTreeMap<u32, Segment>,
    next_location: u32,
    sent: Vec<OutgoingSegment>,
    next_reference: u8,
    failing_numbers: HashSet<String>,
    failing_locations: HashSet<u32>,
    incoming_enabled: bool,
    resets: usize,
    signal: SignalQuality,
    network: NetworkInfo,
}

impl SimState {
    fn ensure_ready(&self) -> Result<()> {
        if !self.initialized {
            return Err(GateError::StoreUnavailable(
                "modem driver is not initialized".to_string(),
            ));
        }
        if self.pin.is_some() && !self.unlocked {
            return Err(GateError::Security("SIM is locked".to_string()));
        }
        Ok(())
    }

    fn allocate_location(&mut self) -> u32 {
        let loc = self.next_location;
        self.next_location += 1;
        loc
    }
}

type CallbackSlot = Arc<Mutex<Option<CallCallback>>>;

/// A modem that lives entirely in memory.
pub struct SimulatedModem {
    state: Arc<Mutex<SimState>>,
    callback: CallbackSlot,
    networks: HashMap<String, String>,
}

/// Shared view of a [`SimulatedModem`] that stays usable after the modem has
/// been moved into the gate.
#[derive(Clone)]
pub struct SimulatorHandle {
    state: Arc<Mutex<SimState>>,
    callback: CallbackSlot,
}

/// One message of a JSON seed file.
#[derive(Debug, Deserialize)]
struct SeedMessage {
    number: String,
    text: String,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    state: Option<SegmentState>,
    /// Store as a bare text segment without structured payload.
    #[serde(default)]
    raw: bool,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    messages: Vec<SeedMessage>,
}

impl Default for SimulatedModem {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedModem {
    /// An initialized modem with an unlocked SIM and an empty store.
    pub fn new() -> Self {
        let state = SimState {
            initialized: true,
            pin: None,
            unlocked: true,
            segments: BTreeMap::new(),
            next_location: 1,
            sent: Vec::new(),
            next_reference: 0,
            failing_numbers: HashSet::new(),
            failing_locations: HashSet::new(),
            incoming_enabled: false,
            resets: 0,
            signal: SignalQuality {
                signal_strength: -71,
                signal_percent: 62,
                bit_error_rate: 0,
            },
            network: NetworkInfo {
                network_code: "262 01".to_string(),
                state: "HomeNetwork".to_string(),
                lac: "D3B2".to_string(),
                cid: "3E8A".to_string(),
                network_name: None,
            },
        };
        let networks = [
            ("262 01", "Telekom.de"),
            ("262 02", "Vodafone.de"),
            ("208 01", "Orange F"),
            ("234 15", "Vodafone UK"),
            ("310 260", "T-Mobile"),
        ]
        .into_iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();

        Self {
            state: Arc::new(Mutex::new(state)),
            callback: Arc::new(Mutex::new(None)),
            networks,
        }
    }

    /// A modem whose SIM stays locked until `pin` is entered.
    pub fn with_pin(pin: &str) -> Self {
        let modem = Self::new();
        {
            let mut st = modem.state.lock();
            st.pin = Some(pin.to_string());
            st.unlocked = false;
        }
        modem
    }

    /// Load a modem whose inbox is pre-filled from a JSON seed file:
    ///
    /// ```json
    /// { "messages": [ { "number": "+491701234567", "text": "Hi", "raw": false } ] }
    /// ```
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GateError::io(path, e))?;
        let seed: SeedFile = serde_json::from_str(&contents).map_err(|e| {
            GateError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;

        let modem = Self::new();
        let handle = modem.handle();
        for msg in seed.messages {
            let at = msg.date.unwrap_or_else(Utc::now);
            let locations = if msg.raw {
                vec![handle.receive_raw(&msg.number, &msg.text, at)]
            } else {
                handle.receive_text(&msg.number, &msg.text, at)?
            };
            if let Some(state) = msg.state {
                handle.set_state(&locations, state);
            }
        }
        debug!(path = %path.display(), stored = handle.locations().len(), "Seeded simulated modem");
        Ok(modem)
    }

    pub fn handle(&self) -> SimulatorHandle {
        SimulatorHandle {
            state: Arc::clone(&self.state),
            callback: Arc::clone(&self.callback),
        }
    }
}

impl ModemDriver for SimulatedModem {
    fn security_status(&mut self) -> Result<SecurityStatus> {
        let st = self.state.lock();
        if st.pin.is_some() && !st.unlocked {
            Ok(SecurityStatus::PinRequired)
        } else {
            Ok(SecurityStatus::Ready)
        }
    }

    fn enter_pin(&mut self, pin: &str) -> Result<()> {
        let mut st = self.state.lock();
        if st.pin.as_deref() == Some(pin) {
            st.unlocked = true;
            Ok(())
        } else {
            Err(GateError::Security("wrong PIN".to_string()))
        }
    }

    fn sms_status(&mut self) -> Result<SmsStatus> {
        let st = self.state.lock();
        st.ensure_ready()?;
        Ok(SmsStatus {
            sim_used: st.segments.len(),
            phone_used: 0,
            templates_used: 0,
        })
    }

    fn first_segment(&mut self, folder: u32) -> Result<Segment> {
        let st = self.state.lock();
        st.ensure_ready()?;
        st.segments
            .values()
            .find(|s| s.folder == folder)
            .cloned()
            .ok_or_else(|| GateError::Driver(format!("folder {folder} is empty")))
    }

    fn next_segment(&mut self, folder: u32, after: u32) -> Result<Segment> {
        let st = self.state.lock();
        st.ensure_ready()?;
        st.segments
            .range((Bound::Excluded(after), Bound::Unbounded))
            .map(|(_, s)| s)
            .find(|s| s.folder == folder)
            .cloned()
            .ok_or_else(|| GateError::Driver(format!("no segment after location {after}")))
    }

    fn send(&mut self, segment: &OutgoingSegment) -> Result<u8> {
        let mut st = self.state.lock();
        st.ensure_ready()?;
        if st.failing_numbers.contains(&segment.number) {
            return Err(GateError::Driver(format!(
                "network rejected message to {}",
                segment.number
            )));
        }
        st.sent.push(segment.clone());
        let reference = st.next_reference;
        st.next_reference = st.next_reference.wrapping_add(1);
        Ok(reference)
    }

    fn delete(&mut self, folder: u32, location: u32) -> Result<()> {
        let mut st = self.state.lock();
        st.ensure_ready()?;
        if st.failing_locations.contains(&location) {
            return Err(GateError::Driver(format!(
                "cannot delete location {location}"
            )));
        }
        match st.segments.get(&location) {
            Some(s) if s.folder == folder => {
                st.segments.remove(&location);
                Ok(())
            }
            _ => Err(GateError::Driver(format!(
                "no segment at folder {folder} location {location}"
            ))),
        }
    }

    fn signal_quality(&mut self) -> Result<SignalQuality> {
        let st = self.state.lock();
        st.ensure_ready()?;
        Ok(st.signal.clone())
    }

    fn network_info(&mut self) -> Result<NetworkInfo> {
        let st = self.state.lock();
        st.ensure_ready()?;
        Ok(st.network.clone())
    }

    fn network_name(&self, code: &str) -> Option<String> {
        self.networks.get(code).cloned()
    }

    fn reset(&mut self, hard: bool) -> Result<()> {
        let mut st = self.state.lock();
        st.resets += 1;
        debug!(hard, resets = st.resets, "Simulated modem reset");
        Ok(())
    }

    fn set_incoming_call(&mut self, enabled: bool) -> Result<()> {
        let mut st = self.state.lock();
        st.ensure_ready()?;
        st.incoming_enabled = enabled;
        Ok(())
    }

    fn set_incoming_callback(&mut self, callback: CallCallback) {
        *self.callback.lock() = Some(callback);
    }
}

impl SimulatorHandle {
    /// Deliver `text` from `from` as it would arrive over the air: encoded,
    /// split into concatenated segments, and stored at fresh locations.
    pub fn receive_text(&self, from: &str, text: &str, at: DateTime<Utc>) -> Result<Vec<u32>> {
        let parts = codec::encode(text, codec::needs_unicode(text))?;
        let mut st = self.state.lock();
        let mut locations = Vec::with_capacity(parts.len());
        for part in parts {
            let loc = st.allocate_location();
            st.segments
                .insert(loc, part.into_stored(loc, INBOX_FOLDER, from, at));
            locations.push(loc);
        }
        Ok(locations)
    }

    /// Store a segment with driver text only, as from a non-standard source.
    pub fn receive_raw(&self, from: &str, text: &str, at: DateTime<Utc>) -> u32 {
        let mut st = self.state.lock();
        let loc = st.allocate_location();
        st.segments.insert(
            loc,
            Segment {
                location: loc,
                folder: INBOX_FOLDER,
                date_time: at,
                number: from.to_string(),
                state: SegmentState::UnRead,
                text: text.to_string(),
                link: None,
                payload: None,
            },
        );
        loc
    }

    /// Store an arbitrary segment under its own location.
    pub fn insert(&self, segment: Segment) {
        let mut st = self.state.lock();
        st.next_location = st.next_location.max(segment.location + 1);
        st.segments.insert(segment.location, segment);
    }

    pub fn set_state(&self, locations: &[u32], state: SegmentState) {
        let mut st = self.state.lock();
        for loc in locations {
            if let Some(seg) = st.segments.get_mut(loc) {
                seg.state = state.clone();
            }
        }
    }

    /// Locations currently stored, in cursor order.
    pub fn locations(&self) -> Vec<u32> {
        self.state.lock().segments.keys().copied().collect()
    }

    /// Every segment handed to `send`, in order.
    pub fn sent(&self) -> Vec<OutgoingSegment> {
        self.state.lock().sent.clone()
    }

    pub fn fail_sends_to(&self, number: &str) {
        self.state.lock().failing_numbers.insert(number.to_string());
    }

    pub fn fail_delete_of(&self, location: u32) {
        self.state.lock().failing_locations.insert(location);
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.state.lock().initialized = initialized;
    }

    /// Register on another operator, e.g. `"001 01"` for a test network.
    pub fn roam_to(&self, network_code: &str) {
        self.state.lock().network.network_code = network_code.to_string();
    }

    pub fn incoming_enabled(&self) -> bool {
        self.state.lock().incoming_enabled
    }

    pub fn resets(&self) -> usize {
        self.state.lock().resets
    }

    /// Fire a call event the way the driver thread would.
    ///
    /// Does nothing unless listening was enabled and a callback registered.
    /// Never touches the modem gate.
    pub fn ring(&self, event: CallEvent) {
        if !self.incoming_enabled() {
            debug!("Incoming call listening disabled, dropping event");
            return;
        }
        if let Some(callback) = self.callback.lock().as_ref() {
            callback(event);
        }
    }
}
