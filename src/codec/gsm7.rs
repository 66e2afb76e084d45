//! GSM 03.38 default alphabet: character tables and septet packing.

/// Basic character table, indexed by septet value. Position 0x1B is the
/// escape to the extension table and never maps to a character.
const BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞ\u{1b}ÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// Escape septet introducing an extension-table character.
pub const ESCAPE: u8 = 0x1B;

/// Extension table: `(septet after ESCAPE, character)`.
const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

/// Septet encoding of one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gsm7Char {
    Basic(u8),
    Extended(u8),
}

impl Gsm7Char {
    /// Septets this character occupies (1, or 2 with the escape).
    pub fn septets(self) -> usize {
        match self {
            Self::Basic(_) => 1,
            Self::Extended(_) => 2,
        }
    }

    pub fn push_to(self, out: &mut Vec<u8>) {
        match self {
            Self::Basic(s) => out.push(s),
            Self::Extended(s) => {
                out.push(ESCAPE);
                out.push(s);
            }
        }
    }
}

/// Find `c` in the basic or extension table.
pub fn lookup(c: char) -> Option<Gsm7Char> {
    if c != '\u{1b}' {
        if let Some(pos) = BASIC.chars().position(|b| b == c) {
            return Some(Gsm7Char::Basic(pos as u8));
        }
    }
    EXTENSION
        .iter()
        .find(|(_, e)| *e == c)
        .map(|(s, _)| Gsm7Char::Extended(*s))
}

/// Map unpacked septets back to text.
///
/// An escape followed by an unknown code yields the basic-table character of
/// that code. A trailing lone escape is ignored.
pub fn septets_to_string(septets: &[u8]) -> String {
    let mut out = String::with_capacity(septets.len());
    let mut iter = septets.iter().copied();
    while let Some(s) = iter.next() {
        if s == ESCAPE {
            let Some(code) = iter.next() else { break };
            match EXTENSION.iter().find(|(e, _)| *e == code) {
                Some((_, c)) => out.push(*c),
                None => out.push(basic_char(code)),
            }
        } else {
            out.push(basic_char(s));
        }
    }
    out
}

fn basic_char(septet: u8) -> char {
    BASIC.chars().nth((septet & 0x7F) as usize).unwrap_or(' ')
}

/// Pack septets into octets, leaving `fill_bits` zero bits in front.
pub fn pack(septets: &[u8], fill_bits: u8) -> Vec<u8> {
    let total_bits = fill_bits as usize + septets.len() * 7;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    for (i, &s) in septets.iter().enumerate() {
        let bit = fill_bits as usize + i * 7;
        let (byte, shift) = (bit / 8, bit % 8);
        let v = ((s & 0x7F) as u16) << shift;
        out[byte] |= v as u8;
        if shift > 1 {
            out[byte + 1] |= (v >> 8) as u8;
        }
    }
    out
}

/// Unpack `count` septets starting after `fill_bits` padding bits.
///
/// Stops at the last septet whose seven bits are all present in `data`.
pub fn unpack(data: &[u8], count: usize, fill_bits: u8) -> Vec<u8> {
    let available = data.len() * 8;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let bit = fill_bits as usize + i * 7;
        if bit + 7 > available {
            break;
        }
        let (byte, shift) = (bit / 8, bit % 8);
        let lo = data[byte];
        let hi = data.get(byte + 1).copied().unwrap_or(0);
        let v = (lo as u16) | ((hi as u16) << 8);
        out.push(((v >> shift) & 0x7F) as u8);
    }
    out
}
