//! Text codec: linked segments to text, and text to outgoing segments.
//!
//! Outgoing text always uses the concatenated structure, even when it fits a
//! single segment, so every part carries an 8-bit reference concatenation
//! header. That header takes 6 octets of user data, which leaves:
//!
//! - 153 septets per part in the GSM default alphabet (plus 1 fill bit)
//! - 134 octets = 67 UTF-16 code units per part in UCS-2

pub mod gsm7;
pub mod ucs2;

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::debug;

use crate::error::{GateError, Result};
use crate::model::segment::{Coding, LinkInfo, OutgoingSegment, Payload, Segment, Smsc};

/// Septets per concatenated 7-bit part.
pub const GSM7_SEGMENT_SEPTETS: usize = 153;

/// UTF-16 code units per concatenated UCS-2 part.
pub const UCS2_SEGMENT_UNITS: usize = 67;

/// The part counter is one octet.
pub const MAX_SEGMENTS: usize = 255;

/// Aligns the first septet on a septet boundary after the 6-octet header.
const CONCAT_FILL_BITS: u8 = 1;

static NEXT_REFERENCE: AtomicU8 = AtomicU8::new(0);

/// Whether `text` must be sent as UCS-2: any character outside 7-bit ASCII.
pub fn needs_unicode(text: &str) -> bool {
    text.chars().any(|c| c as u32 > 0x7F)
}

/// Whether every character of `text` exists in the GSM default alphabet or
/// its extension table.
pub fn fits_gsm7(text: &str) -> bool {
    text.chars().all(|c| gsm7::lookup(c).is_some())
}

/// Decode a linked group into text.
///
/// When every part carries structured user data, the decoded parts are
/// concatenated in group order; parts without text (8-bit data) are skipped.
/// Otherwise the first segment's driver text is returned verbatim.
pub fn decode(group: &[Segment]) -> String {
    let Some(first) = group.first() else {
        return String::new();
    };
    if group.iter().any(|s| s.payload.is_none()) {
        return first.text.clone();
    }
    group
        .iter()
        .filter_map(|s| s.payload.as_ref().and_then(decode_payload))
        .collect()
}

/// Text carried by one part, `None` for binary data.
pub fn decode_payload(payload: &Payload) -> Option<String> {
    match payload.coding {
        Coding::Default7Bit => {
            let septets = gsm7::unpack(&payload.data, payload.length, payload.fill_bits);
            Some(gsm7::septets_to_string(&septets))
        }
        Coding::Ucs2 => {
            let end = payload.length.min(payload.data.len());
            Some(ucs2::decode(&payload.data[..end]))
        }
        Coding::EightBit => None,
    }
}

/// Split `text` into concatenated segments, unaddressed.
///
/// `is_unicode` selects UCS-2; otherwise every character must exist in the
/// GSM default alphabet.
pub fn encode(text: &str, is_unicode: bool) -> Result<Vec<OutgoingSegment>> {
    let reference = NEXT_REFERENCE.fetch_add(1, Ordering::Relaxed);
    encode_with_reference(text, is_unicode, reference)
}

/// [`encode`] with an explicit concatenation reference.
pub fn encode_with_reference(
    text: &str,
    is_unicode: bool,
    reference: u8,
) -> Result<Vec<OutgoingSegment>> {
    let payloads = if is_unicode {
        split_ucs2(text)
    } else {
        split_gsm7(text)?
    };

    if payloads.len() > MAX_SEGMENTS {
        return Err(GateError::Encoding(format!(
            "text needs {} segments, at most {MAX_SEGMENTS} are possible",
            payloads.len()
        )));
    }

    let total = payloads.len() as u8;
    debug!(parts = total, is_unicode, reference, "Encoded text");

    Ok(payloads
        .into_iter()
        .enumerate()
        .map(|(i, payload)| OutgoingSegment {
            number: String::new(),
            smsc: Smsc::default(),
            link: LinkInfo {
                reference: reference as u16,
                part: (i + 1) as u8,
                total,
            },
            payload,
        })
        .collect())
}

fn split_gsm7(text: &str) -> Result<Vec<Payload>> {
    let mut parts = Vec::new();
    let mut current: Vec<u8> = Vec::with_capacity(GSM7_SEGMENT_SEPTETS);

    for c in text.chars() {
        let ch = gsm7::lookup(c).ok_or_else(|| {
            GateError::Encoding(format!(
                "character {c:?} is not in the GSM 7-bit alphabet"
            ))
        })?;
        // An escape pair never straddles two parts.
        if current.len() + ch.septets() > GSM7_SEGMENT_SEPTETS {
            parts.push(gsm7_payload(std::mem::take(&mut current)));
        }
        ch.push_to(&mut current);
    }
    if !current.is_empty() || parts.is_empty() {
        parts.push(gsm7_payload(current));
    }
    Ok(parts)
}

fn gsm7_payload(septets: Vec<u8>) -> Payload {
    Payload {
        coding: Coding::Default7Bit,
        data: gsm7::pack(&septets, CONCAT_FILL_BITS),
        length: septets.len(),
        fill_bits: CONCAT_FILL_BITS,
    }
}

fn split_ucs2(text: &str) -> Vec<Payload> {
    let mut parts = Vec::new();
    let mut current: Vec<u16> = Vec::with_capacity(UCS2_SEGMENT_UNITS);
    let mut buf = [0u16; 2];

    for c in text.chars() {
        // A surrogate pair never straddles two parts.
        let units = c.encode_utf16(&mut buf);
        if current.len() + units.len() > UCS2_SEGMENT_UNITS {
            parts.push(ucs2_payload(&std::mem::take(&mut current)));
        }
        current.extend_from_slice(units);
    }
    if !current.is_empty() || parts.is_empty() {
        parts.push(ucs2_payload(&current));
    }
    parts
}

fn ucs2_payload(units: &[u16]) -> Payload {
    Payload {
        coding: Coding::Ucs2,
        data: ucs2::encode_units(units),
        length: units.len() * 2,
        fill_bits: 0,
    }
}
