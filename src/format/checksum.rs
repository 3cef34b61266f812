// XXH3-64 integrity checksum over the reconstructed new data.
//
// Sum-based checksums collide on short permutations ("ADDA" vs "BCCB"), so
// a single corrupted COPY offset can land on different bytes with the same
// value. XXH3 mixes position into every lane.

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Width of the stored checksum in bytes.
pub const CHECKSUM_LEN: usize = 8;

/// Checksum of a complete buffer.
pub fn checksum(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Incremental checksum for streamed output.
#[derive(Clone)]
pub struct Checksum {
    inner: Xxh3,
}

impl Checksum {
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Feed the next chunk of output.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Checksum of everything fed so far.
    pub fn value(&self) -> u64 {
        self.inner.digest()
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}
