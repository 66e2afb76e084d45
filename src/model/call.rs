//! Missed-call records and the call events the modem reports.

use chrono::{DateTime, SecondsFormat, Utc};

/// What kind of call activity the driver is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEventKind {
    IncomingCall,
    OutgoingCall,
    Other,
}

/// Where the call ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Ringing,
    Answered,
    Ended,
    Missed,
}

/// Asynchronous notification delivered by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub kind: CallEventKind,
    pub state: CallState,
    pub number: String,
    /// Time the network reported, if any.
    pub timestamp: Option<DateTime<Utc>>,
}

impl CallEvent {
    pub fn is_missed_incoming(&self) -> bool {
        self.kind == CallEventKind::IncomingCall && self.state == CallState::Missed
    }
}

/// One line of the missed-call log: `<number> <rfc3339 timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissedCallRecord {
    pub number: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MissedCallRecord {
    pub fn new(number: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            number: number.into(),
            timestamp: Some(timestamp),
        }
    }

    /// Parse a log line. Lines without a trailing timestamp are kept whole.
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        if let Some((number, stamp)) = line.rsplit_once(' ') {
            if let Ok(ts) = DateTime::parse_from_rfc3339(stamp) {
                return Self {
                    number: number.trim().to_string(),
                    timestamp: Some(ts.with_timezone(&Utc)),
                };
            }
        }
        Self {
            number: line.to_string(),
            timestamp: None,
        }
    }

    pub fn to_line(&self) -> String {
        match self.timestamp {
            Some(ts) => format!(
                "{} {}",
                self.number,
                ts.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => self.number.clone(),
        }
    }
}

impl std::fmt::Display for MissedCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}
