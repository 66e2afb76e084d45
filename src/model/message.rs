//! Logical messages and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segment::SegmentState;

/// One or more linked segments decoded into a single text message.
///
/// A `LogicalMessage` has no identity of its own: its ordinal is its position
/// in a freshly computed catalog listing and is only meaningful for that
/// listing.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalMessage {
    /// Timestamp of the first part.
    pub date: DateTime<Utc>,
    /// Number of the first part.
    pub number: String,
    /// State of the first part.
    pub state: SegmentState,
    /// Store locations of every part, in part order. Never empty.
    pub locations: Vec<u32>,
    /// Fully decoded text.
    pub text: String,
}

/// A message as exposed to API callers.
///
/// Store locations are deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsRecord {
    pub date: String,
    pub number: String,
    pub state: String,
    pub text: String,
}

impl SmsRecord {
    /// Placeholder returned when there is no message to hand out.
    pub fn empty() -> Self {
        Self {
            date: String::new(),
            number: String::new(),
            state: String::new(),
            text: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_empty() && self.text.is_empty() && self.date.is_empty()
    }
}

impl From<&LogicalMessage> for SmsRecord {
    fn from(msg: &LogicalMessage) -> Self {
        Self {
            date: msg.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            number: msg.number.clone(),
            state: msg.state.to_string(),
            text: msg.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_hides_locations() {
        let msg = LogicalMessage {
            date: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            number: "+4915112345678".to_string(),
            state: SegmentState::UnRead,
            locations: vec![3, 4],
            text: "Hello".to_string(),
        };
        let json = serde_json::to_value(SmsRecord::from(&msg)).unwrap();
        assert_eq!(json["Date"], "2024-03-01 08:30:00");
        assert_eq!(json["Number"], "+4915112345678");
        assert_eq!(json["State"], "UnRead");
        assert_eq!(json["Text"], "Hello");
        assert!(json.get("Locations").is_none());
    }

    #[test]
    fn test_empty_placeholder() {
        let empty = SmsRecord::empty();
        assert!(empty.is_empty());
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["Text"], "");
    }
}
