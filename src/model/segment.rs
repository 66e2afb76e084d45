//! Transport-level message segments, as stored in and sent by the modem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage state of a segment, as reported by the driver.
///
/// The four common states are named; anything else the driver reports
/// (error states, vendor specifics) is carried through as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SegmentState {
    Read,
    UnRead,
    Sent,
    UnSent,
    Other(String),
}

impl SegmentState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Read => "Read",
            Self::UnRead => "UnRead",
            Self::Sent => "Sent",
            Self::UnSent => "UnSent",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SegmentState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Read" => Self::Read,
            "UnRead" => Self::UnRead,
            "Sent" => Self::Sent,
            "UnSent" => Self::UnSent,
            _ => Self::Other(s),
        }
    }
}

impl From<SegmentState> for String {
    fn from(state: SegmentState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for SegmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data coding scheme of a segment's user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coding {
    /// GSM 03.38 default alphabet, packed septets.
    Default7Bit,
    /// Binary data; carries no text.
    EightBit,
    /// UCS-2 / UTF-16 big endian.
    Ucs2,
}

/// Concatenation header: which part of which multi-segment message this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkInfo {
    /// Reference number shared by all parts of one message.
    pub reference: u16,
    /// 1-based part index.
    pub part: u8,
    /// Total number of parts announced by the sender.
    pub total: u8,
}

/// Structured user data of a segment (the part after the user data header).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub coding: Coding,
    /// Encoded bytes: packed septets for 7-bit, raw octets otherwise.
    pub data: Vec<u8>,
    /// Number of septets (7-bit) or octets (8-bit, UCS-2) in `data`.
    pub length: usize,
    /// Padding bits before the first septet, aligning it after the header.
    #[serde(default)]
    pub fill_bits: u8,
}

/// A single stored segment, as returned by the driver.
///
/// Segments are immutable once fetched and owned by the store until deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Store-assigned handle, unique per folder. Required for deletion.
    pub location: u32,
    pub folder: u32,
    pub date_time: DateTime<Utc>,
    /// Sender (inbox) or recipient (outbox) number.
    pub number: String,
    pub state: SegmentState,
    /// Driver-decoded text, used when the payload cannot be decoded.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub link: Option<LinkInfo>,
    /// Absent when the segment comes from a non-standard source.
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// Which service centre relays an outgoing segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Smsc {
    /// Explicit service centre number.
    Number(String),
    /// Service centre stored on the SIM at this location.
    Location(u8),
}

impl Default for Smsc {
    fn default() -> Self {
        Self::Location(1)
    }
}

/// A segment ready to be handed to the driver's send primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingSegment {
    /// Destination; empty until addressed.
    pub number: String,
    pub smsc: Smsc,
    pub link: LinkInfo,
    pub payload: Payload,
}

impl OutgoingSegment {
    /// Copy of this segment addressed to `number` through `smsc`.
    pub fn addressed(&self, number: &str, smsc: &Smsc) -> Self {
        Self {
            number: number.to_string(),
            smsc: smsc.clone(),
            ..self.clone()
        }
    }

    /// The segment as it would appear in a receiver's store.
    pub fn into_stored(self, location: u32, folder: u32, from: &str, at: DateTime<Utc>) -> Segment {
        Segment {
            location,
            folder,
            date_time: at,
            number: from.to_string(),
            state: SegmentState::UnRead,
            text: String::new(),
            link: Some(self.link),
            payload: Some(self.payload),
        }
    }
}
