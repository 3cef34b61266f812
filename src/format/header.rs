// Patch header encoding/decoding.
//
// Layout:
//   magic       4 bytes  "XDLT"
//   version     1 byte
//   block_size  varint
//   old_len     varint
//   new_len     varint
//   checksum    8 bytes, big-endian XXH3-64 of the new data
//   count       varint, number of instructions that follow

use std::io::{self, Read, Write};

use super::checksum::CHECKSUM_LEN;
use super::varint;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Magic and version
// ---------------------------------------------------------------------------

pub const PATCH_MAGIC: [u8; 4] = *b"XDLT";

/// Current format version. Bump on any layout change.
pub const FORMAT_VERSION: u8 = 2;

/// Smallest possible header: magic, version, four one-byte varints and the
/// checksum.
pub const MIN_HEADER_LEN: usize = 4 + 1 + 4 + CHECKSUM_LEN;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Parsed patch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchHeader {
    /// Format version the patch was written with.
    pub version: u8,
    /// Block size used when creating the patch.
    pub block_size: u32,
    /// Length of the old data the patch was created against.
    pub old_len: u64,
    /// Length of the reconstructed new data.
    pub new_len: u64,
    /// XXH3-64 of the new data.
    pub checksum: u64,
    /// Number of instructions in the stream.
    pub count: u64,
}

impl PatchHeader {
    /// Header for the current format version.
    pub fn new(block_size: u32, old_len: u64, new_len: u64, checksum: u64, count: u64) -> Self {
        Self {
            version: FORMAT_VERSION,
            block_size,
            old_len,
            new_len,
            checksum,
            count,
        }
    }

    /// Write the header to `w`.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&PATCH_MAGIC)?;
        w.write_all(&[self.version])?;
        varint::write_u64(w, u64::from(self.block_size))?;
        varint::write_u64(w, self.old_len)?;
        varint::write_u64(w, self.new_len)?;
        w.write_all(&self.checksum.to_be_bytes())?;
        varint::write_u64(w, self.count)?;
        Ok(())
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        PATCH_MAGIC.len()
            + 1
            + varint::sizeof_u64(u64::from(self.block_size))
            + varint::sizeof_u64(self.old_len)
            + varint::sizeof_u64(self.new_len)
            + CHECKSUM_LEN
            + varint::sizeof_u64(self.count)
    }

    /// Read and validate a header from `r`.
    ///
    /// Unknown magic or version, a zero or oversized block size, and an
    /// instruction count that cannot fit the declared new length are
    /// `Format` errors; a short stream is `Truncated`.
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        varint::read_exact(r, &mut magic, "magic")?;
        if magic != PATCH_MAGIC {
            return Err(Error::format(format!(
                "bad magic: expected {:02X?}, got {magic:02X?}",
                PATCH_MAGIC
            )));
        }

        let version = varint::read_byte(r, "version")?;
        if version != FORMAT_VERSION {
            return Err(Error::format(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }

        let block_size = varint::read_u64(r, "block size")?;
        let block_size = u32::try_from(block_size)
            .ok()
            .filter(|&b| b > 0)
            .ok_or_else(|| Error::format(format!("invalid block size {block_size}")))?;

        let old_len = varint::read_u64(r, "old length")?;
        let new_len = varint::read_u64(r, "new length")?;

        let mut cksum = [0u8; CHECKSUM_LEN];
        varint::read_exact(r, &mut cksum, "checksum")?;
        let checksum = u64::from_be_bytes(cksum);

        let count = varint::read_u64(r, "instruction count")?;
        // Every instruction produces at least one byte.
        if count > new_len {
            return Err(Error::format(format!(
                "{count} instructions cannot produce {new_len} bytes"
            )));
        }

        Ok(Self {
            version,
            block_size,
            old_len,
            new_len,
            checksum,
            count,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
