// Variable-length integers for the patch format.
//
// Base-128, big-endian: most-significant group first. Every byte except
// the last has bit 7 set. A u64 takes at most 10 bytes.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

/// If any of these bits are set before a shift, `<< 7` would overflow.
const U64_OVERFLOW_MASK: u64 = 0xFE00_0000_0000_0000;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `num` into the tail of `buf`. Returns the encoded length (1..=10);
/// the encoding is `buf[MAX_VARINT_LEN - len..]`.
#[inline]
pub fn encode_u64(mut num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = MAX_VARINT_LEN;
    loop {
        i -= 1;
        buf[i] = (num as u8 & 0x7F) | 0x80;
        num >>= 7;
        if num == 0 {
            break;
        }
    }
    buf[MAX_VARINT_LEN - 1] &= 0x7F;
    MAX_VARINT_LEN - i
}

/// Encode `num` and write it to `w`.
pub fn write_u64<W: Write>(w: &mut W, num: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    w.write_all(&buf[MAX_VARINT_LEN - len..])
}

/// Encoded length of `num` in bytes.
#[inline]
pub fn sizeof_u64(num: u64) -> usize {
    let bits = 64 - num.leading_zeros();
    (bits.max(1).div_ceil(7) as usize).min(MAX_VARINT_LEN)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Read one varint from `r`.
///
/// End of stream mid-value is `Truncated`; a value wider than 64 bits is
/// `Format`. `what` names the field in error messages.
pub fn read_u64<R: Read>(r: &mut R, what: &str) -> Result<u64> {
    let mut val: u64 = 0;
    for _ in 0..MAX_VARINT_LEN {
        let byte = read_byte(r, what)?;
        if val & U64_OVERFLOW_MASK != 0 {
            return Err(Error::format(format!("{what}: varint overflow")));
        }
        val = (val << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(val);
        }
    }
    Err(Error::format(format!("{what}: varint too long")))
}

/// Read one byte, mapping end of stream to `Truncated`.
pub fn read_byte<R: Read>(r: &mut R, what: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf, what)?;
    Ok(buf[0])
}

/// `read_exact` with end of stream mapped to `Truncated`.
pub fn read_exact<R: Read>(r: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::truncated(format!("stream ended reading {what}")),
        _ => Error::Io(e),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
