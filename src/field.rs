//! Fixed-width field marshaling.
//!
//! Every ustar header field is a fixed-size byte range. Text fields hold a
//! NUL-terminated string padded with zeros; numeric fields hold zero-padded
//! octal ASCII digits followed by the terminator the caller reserves.

use crate::error::{Error, Result};

/// Copy `value` into `dst`, zero-filling the remainder of the field.
///
/// The value must be strictly shorter than the field so that at least one
/// NUL terminator follows it.
///
/// # Errors
///
/// Returns [`Error::FieldTooLong`] if `value.len() >= dst.len()`.
pub fn encode_text(value: &[u8], dst: &mut [u8]) -> Result<()> {
    if value.len() >= dst.len() {
        return Err(Error::FieldTooLong {
            len: value.len(),
            width: dst.len(),
        });
    }
    dst.fill(0);
    dst[..value.len()].copy_from_slice(value);
    Ok(())
}

/// Truncate a field at the first NUL byte.
///
/// A field starting with NUL is empty regardless of what follows it. If no
/// NUL byte is found the entire field is the value.
///
/// ```
/// use ustar_stream::field::decode_text;
///
/// assert_eq!(decode_text(b"hello\0world"), b"hello");
/// assert_eq!(decode_text(b"no null here"), b"no null here");
/// assert_eq!(decode_text(b"\0empty"), b"");
/// ```
#[must_use]
pub fn decode_text(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(pos) => &field[..pos],
        None => field,
    }
}

/// Render `value` in base 8, left-padded with zeros to at least `width` digits.
#[must_use]
pub fn octal_string(value: u64, width: usize) -> String {
    format!("{value:0width$o}")
}

/// Write `value` as exactly `dst.len()` zero-padded octal digits.
///
/// No terminator is written; callers reserve the last byte of a header field
/// by passing a sub-slice.
///
/// A value that does not fit is an error; it is never truncated to its low
/// digits.
///
/// # Errors
///
/// Returns [`Error::NumericFieldOverflow`] if the value needs more digits than
/// the destination has.
pub fn encode_octal(value: u64, dst: &mut [u8]) -> Result<()> {
    let digits = octal_string(value, dst.len());
    if digits.len() != dst.len() {
        return Err(Error::NumericFieldOverflow {
            value,
            width: dst.len(),
        });
    }
    dst.copy_from_slice(digits.as_bytes());
    Ok(())
}

/// Parse an octal field leniently.
///
/// The field is first cut at its NUL terminator; leading spaces are skipped
/// and the leading run of octal digits is parsed. Empty, malformed or
/// overflowing fields decode to 0, since real archives often leave optional
/// numeric fields blank.
#[must_use]
pub fn decode_octal(field: &[u8]) -> u64 {
    let text = decode_text(field);
    let start = text.iter().position(|&b| b != b' ').unwrap_or(text.len());
    let digits = text[start..]
        .iter()
        .take_while(|b| (b'0'..=b'7').contains(*b));

    let mut value: u64 = 0;
    for &digit in digits {
        match value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(digit - b'0')))
        {
            Some(v) => value = v,
            None => return 0,
        }
    }
    value
}
