//! UCS-2 user data (UTF-16 big endian on the wire).

use byteorder::{BigEndian, ByteOrder};

/// Serialize UTF-16 code units as big-endian octets.
pub fn encode_units(units: &[u16]) -> Vec<u8> {
    let mut out = vec![0u8; units.len() * 2];
    BigEndian::write_u16_into(units, &mut out);
    out
}

/// Decode big-endian UTF-16 octets. Malformed sequences become U+FFFD.
pub fn decode(data: &[u8]) -> String {
    let (text, had_errors) = encoding_rs::UTF_16BE.decode_without_bom_handling(data);
    if had_errors {
        tracing::debug!(len = data.len(), "Malformed UCS-2 payload");
    }
    text.into_owned()
}
