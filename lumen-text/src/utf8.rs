//! UTF-8 codec: one codepoint at a time.
//!
//! The engine works on raw byte slices rather than `&str` so that text
//! coming from files, widgets or foreign callers can be validated at the
//! point of use. Decoding is strict: overlong forms, surrogates, values
//! past U+10FFFF and broken continuation bytes are all rejected.
//!
//! [`compare`] walks two strings codepoint by codepoint and reports the
//! prefix relationship as well as the ordering. A string that fails to
//! decode is treated as ending at the bad byte.

use std::cmp::Ordering;
use thiserror::Error;

/// A decoded Unicode scalar value.
pub type Codepoint = u32;

/// Highest valid Unicode scalar value.
pub const MAX_CODEPOINT: Codepoint = 0x10FFFF;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Error {
    #[error("invalid UTF-8 sequence at byte {offset}")]
    InvalidSequence { offset: usize },
    #[error("codepoint U+{0:X} cannot be encoded")]
    InvalidCodepoint(Codepoint),
}

// ── Decoding ────────────────────────────────────────────────────────

/// Decode the codepoint at the start of `bytes`.
///
/// Returns the codepoint and the number of bytes it occupied.
pub fn decode_one(bytes: &[u8]) -> Result<(Codepoint, usize), Utf8Error> {
    let invalid = Utf8Error::InvalidSequence { offset: 0 };
    let lead = *bytes.first().ok_or(invalid)?;

    // (sequence length, payload bits of the lead byte, smallest legal value)
    let (len, init, min) = match lead {
        0x00..=0x7F => return Ok((lead as Codepoint, 1)),
        0xC0..=0xDF => (2, (lead & 0x1F) as Codepoint, 0x80),
        0xE0..=0xEF => (3, (lead & 0x0F) as Codepoint, 0x800),
        0xF0..=0xF7 => (4, (lead & 0x07) as Codepoint, 0x10000),
        _ => return Err(invalid),
    };

    if bytes.len() < len {
        return Err(invalid);
    }

    let mut value = init;
    for (i, &byte) in bytes[1..len].iter().enumerate() {
        if byte & 0xC0 != 0x80 {
            return Err(Utf8Error::InvalidSequence { offset: i + 1 });
        }
        value = (value << 6) | (byte & 0x3F) as Codepoint;
    }

    if value < min || value > MAX_CODEPOINT || (0xD800..=0xDFFF).contains(&value) {
        return Err(invalid);
    }

    Ok((value, len))
}

/// Iterator over the codepoints of a byte slice.
///
/// Yields an error once and then stops.
pub struct Codepoints<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

/// Iterate over the codepoints of `bytes`.
pub fn codepoints(bytes: &[u8]) -> Codepoints<'_> {
    Codepoints {
        bytes,
        offset: 0,
        failed: false,
    }
}

impl Iterator for Codepoints<'_> {
    type Item = Result<Codepoint, Utf8Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match decode_one(&self.bytes[self.offset..]) {
            Ok((cp, len)) => {
                self.offset += len;
                Some(Ok(cp))
            }
            Err(Utf8Error::InvalidSequence { offset }) => {
                self.failed = true;
                Some(Err(Utf8Error::InvalidSequence {
                    offset: self.offset + offset,
                }))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a whole string. Fails on the first bad sequence.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Codepoint>, Utf8Error> {
    codepoints(bytes).collect()
}

// ── Encoding ────────────────────────────────────────────────────────

/// An encoded codepoint: up to four bytes plus their count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Utf8Char {
    bytes: [u8; 4],
    len: u8,
}

impl Utf8Char {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Encode a single codepoint.
pub fn encode_one(cp: Codepoint) -> Result<Utf8Char, Utf8Error> {
    if cp > MAX_CODEPOINT || (0xD800..=0xDFFF).contains(&cp) {
        return Err(Utf8Error::InvalidCodepoint(cp));
    }

    let mut bytes = [0u8; 4];
    let len = match cp {
        0..=0x7F => {
            bytes[0] = cp as u8;
            1
        }
        0x80..=0x7FF => {
            bytes[0] = 0xC0 | (cp >> 6) as u8;
            bytes[1] = 0x80 | (cp & 0x3F) as u8;
            2
        }
        0x800..=0xFFFF => {
            bytes[0] = 0xE0 | (cp >> 12) as u8;
            bytes[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            bytes[2] = 0x80 | (cp & 0x3F) as u8;
            3
        }
        _ => {
            bytes[0] = 0xF0 | (cp >> 18) as u8;
            bytes[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
            bytes[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            bytes[3] = 0x80 | (cp & 0x3F) as u8;
            4
        }
    };

    Ok(Utf8Char { bytes, len })
}

/// Encode a codepoint sequence back into bytes.
pub fn encode_all(cps: &[Codepoint]) -> Result<Vec<u8>, Utf8Error> {
    let mut out = Vec::with_capacity(cps.len());
    for &cp in cps {
        out.extend_from_slice(encode_one(cp)?.as_bytes());
    }
    Ok(out)
}

// ── Comparison ──────────────────────────────────────────────────────

/// Result of [`compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Utf8Ordering {
    Equal,
    APrefixOfB,
    BPrefixOfA,
    ALess,
    BLess,
}

impl Utf8Ordering {
    /// The result of the same comparison with the arguments swapped.
    pub fn reverse(self) -> Self {
        match self {
            Self::Equal => Self::Equal,
            Self::APrefixOfB => Self::BPrefixOfA,
            Self::BPrefixOfA => Self::APrefixOfB,
            Self::ALess => Self::BLess,
            Self::BLess => Self::ALess,
        }
    }

    /// Collapse into a total ordering (prefixes sort first).
    pub fn to_ordering(self) -> Ordering {
        match self {
            Self::Equal => Ordering::Equal,
            Self::APrefixOfB | Self::ALess => Ordering::Less,
            Self::BPrefixOfA | Self::BLess => Ordering::Greater,
        }
    }
}

/// Compare two UTF-8 strings codepoint by codepoint.
///
/// Case folding is ASCII only: multi-byte codepoints always compare on
/// their raw value.
pub fn compare(a: &[u8], b: &[u8], case_sensitive: bool) -> Utf8Ordering {
    let mut ia = 0;
    let mut ib = 0;

    loop {
        let next_a = next_or_end(a, ia);
        let next_b = next_or_end(b, ib);

        let ((ca, la), (cb, lb)) = match (next_a, next_b) {
            (None, None) => return Utf8Ordering::Equal,
            (None, Some(_)) => return Utf8Ordering::APrefixOfB,
            (Some(_), None) => return Utf8Ordering::BPrefixOfA,
            (Some(x), Some(y)) => (x, y),
        };
        ia += la;
        ib += lb;

        if ca == cb {
            continue;
        }

        let order = if case_sensitive {
            ca.cmp(&cb)
        } else {
            let fa = fold(ca, la);
            let fb = fold(cb, lb);
            if fa == fb {
                continue;
            }
            (fa, ca).cmp(&(fb, cb))
        };

        return match order {
            Ordering::Less => Utf8Ordering::ALess,
            _ => Utf8Ordering::BLess,
        };
    }
}

/// Convenience wrapper over [`compare`] for `&str`.
pub fn compare_str(a: &str, b: &str, case_sensitive: bool) -> Utf8Ordering {
    compare(a.as_bytes(), b.as_bytes(), case_sensitive)
}

fn next_or_end(bytes: &[u8], offset: usize) -> Option<(Codepoint, usize)> {
    if offset >= bytes.len() {
        return None;
    }
    decode_one(&bytes[offset..]).ok()
}

fn fold(cp: Codepoint, len: usize) -> Codepoint {
    if len == 1 {
        (cp as u8).to_ascii_lowercase() as Codepoint
    } else {
        cp
    }
}

// ===================================================================
// Tests
// ===================================================================
