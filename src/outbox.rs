//! Outgoing messages: validation, encoding and fan-out to every destination.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::codec;
use crate::error::{GateError, Result};
use crate::gate::ModemGate;
use crate::model::segment::Smsc;

/// Body of a send request. Every field is optional on the wire so that a
/// missing one can be reported as a validation error instead of a parse
/// failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// One or more destinations separated by commas.
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub smsc: Option<String>,
}

/// Result of handing one segment to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub number: String,
    pub part: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Outbox {
    gate: Arc<ModemGate>,
}

impl Outbox {
    pub fn new(gate: Arc<ModemGate>) -> Self {
        Self { gate }
    }

    /// Encode `request.text` once and send every segment to every number.
    ///
    /// The gate is held for the whole batch. A driver failure is recorded in
    /// the outcome of that segment and the batch carries on.
    pub fn send(&self, request: &SendRequest) -> Result<Vec<SendOutcome>> {
        let (text, numbers) = match (&request.text, &request.number) {
            (Some(text), Some(number)) => (text, split_numbers(number)),
            _ => {
                return Err(GateError::Validation(
                    "Parameters 'text' and 'number' are required.".to_string(),
                ))
            }
        };
        if numbers.is_empty() {
            return Err(GateError::Validation(
                "Parameter 'number' holds no destination.".to_string(),
            ));
        }

        let smsc = match request.smsc.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => Smsc::Number(number.to_string()),
            _ => Smsc::default(),
        };
        // ASCII outside the GSM alphabet (backtick, tab) goes out as UCS-2.
        let is_unicode = codec::needs_unicode(text) || !codec::fits_gsm7(text);
        let segments = codec::encode(text, is_unicode)?;

        let mut guard = self.gate.acquire()?;
        let mut outcomes = Vec::with_capacity(numbers.len() * segments.len());
        for number in &numbers {
            for segment in &segments {
                let addressed = segment.addressed(number, &smsc);
                let part = addressed.link.part;
                let outcome = match guard.send(&addressed) {
                    Ok(reference) => SendOutcome {
                        number: number.clone(),
                        part,
                        reference: Some(reference),
                        error: None,
                    },
                    Err(e) => {
                        warn!(number = %number, part, error = %e, "Send failed");
                        SendOutcome {
                            number: number.clone(),
                            part,
                            reference: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                outcomes.push(outcome);
            }
        }
        drop(guard);

        let sent = outcomes.iter().filter(|o| o.is_sent()).count();
        info!(
            destinations = numbers.len(),
            parts = segments.len(),
            sent,
            failed = outcomes.len() - sent,
            "Sent message"
        );
        Ok(outcomes)
    }
}

fn split_numbers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::simulated::{SimulatedModem, SimulatorHandle};

    fn outbox() -> (Outbox, SimulatorHandle) {
        let modem = SimulatedModem::new();
        let handle = modem.handle();
        (Outbox::new(Arc::new(ModemGate::new(modem))), handle)
    }

    fn request(text: Option<&str>, number: Option<&str>) -> SendRequest {
        SendRequest {
            text: text.map(String::from),
            number: number.map(String::from),
            smsc: None,
        }
    }

    #[test]
    fn test_missing_fields_rejected() {
        let (outbox, h) = outbox();
        assert!(matches!(
            outbox.send(&request(None, Some("+1"))),
            Err(GateError::Validation(_))
        ));
        assert!(matches!(
            outbox.send(&request(Some("hi"), None)),
            Err(GateError::Validation(_))
        ));
        assert!(matches!(
            outbox.send(&request(Some("hi"), Some(" , "))),
            Err(GateError::Validation(_))
        ));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_fan_out_shares_payloads() {
        let (outbox, h) = outbox();
        let outcomes = outbox.send(&request(Some("hello"), Some("+1, +2"))).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(SendOutcome::is_sent));

        let sent = h.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].number, "+1");
        assert_eq!(sent[1].number, "+2");
        assert_eq!(sent[0].payload, sent[1].payload);
        assert_eq!(sent[0].link, sent[1].link);
        assert_eq!(sent[0].smsc, Smsc::Location(1));
    }

    #[test]
    fn test_long_text_sends_every_part() {
        let (outbox, h) = outbox();
        let outcomes = outbox
            .send(&request(Some(&"z".repeat(300)), Some("+1")))
            .unwrap();
        let parts: Vec<u8> = outcomes.iter().map(|o| o.part).collect();
        assert_eq!(parts, vec![1, 2]);
        assert_eq!(h.sent().len(), 2);
    }

    #[test]
    fn test_explicit_smsc() {
        let (outbox, h) = outbox();
        let mut req = request(Some("hi"), Some("+1"));
        req.smsc = Some("+491710760000".to_string());
        outbox.send(&req).unwrap();
        assert_eq!(h.sent()[0].smsc, Smsc::Number("+491710760000".to_string()));
    }

    #[test]
    fn test_driver_failure_does_not_abort_batch() {
        let (outbox, h) = outbox();
        h.fail_sends_to("+2");
        let outcomes = outbox
            .send(&request(Some("hello"), Some("+1,+2,+3")))
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_sent());
        assert!(outcomes[1].error.is_some());
        assert!(outcomes[2].is_sent());
        assert_eq!(h.sent().len(), 2);
    }

    #[test]
    fn test_unicode_text_is_sent_as_ucs2() {
        let (outbox, h) = outbox();
        outbox.send(&request(Some("Grüße 👋"), Some("+1"))).unwrap();
        assert_eq!(
            h.sent()[0].payload.coding,
            crate::model::segment::Coding::Ucs2
        );
    }

    #[test]
    fn test_ascii_outside_gsm_alphabet_falls_back_to_ucs2() {
        let (outbox, h) = outbox();
        let outcomes = outbox
            .send(&request(Some("run `make`\tnow"), Some("+1")))
            .unwrap();
        assert!(outcomes.iter().all(SendOutcome::is_sent));
        let sent = h.sent();
        assert_eq!(sent[0].payload.coding, crate::model::segment::Coding::Ucs2);
        assert_eq!(
            crate::codec::decode_payload(&sent[0].payload).as_deref(),
            Some("run `make`\tnow")
        );
    }

    #[test]
    fn test_split_numbers() {
        assert_eq!(split_numbers("+1,,+2 , "), vec!["+1", "+2"]);
    }
}
