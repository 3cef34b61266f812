// Block index over the old data.
//
// The old data is cut into non-overlapping blocks of `block_size` bytes
// (the final block may be shorter). Each block's weak fingerprint is
// stored in a power-of-two bucket table with per-block chaining:
//
//   heads[bucket] = block + 1   (0 means empty)
//   next[block]   = next block + 1 in the same bucket (0 ends the chain)
//
// Blocks are inserted in reverse so every chain yields ascending offsets.
// Different fingerprints may share a bucket; lookups filter on the full
// fingerprint, and the matcher still verifies bytes before using a block.

use log::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::rolling::{self, HashCfg};
use crate::error::{Error, Result};

/// One block of the old data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Byte position in the old data.
    pub offset: u64,
    /// Block length (`block_size`, or shorter for the final block).
    pub len: usize,
    /// Weak fingerprint of the block bytes.
    pub fingerprint: u32,
}

/// Fingerprint → ordered block offsets for one old buffer.
///
/// Built once per diff call and immutable afterwards.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    block_size: usize,
    old_len: u64,
    cfg: HashCfg,
    heads: Vec<u32>,
    next: Vec<u32>,
    fingerprints: Vec<u32>,
}

impl BlockIndex {
    /// Index `old` in blocks of `block_size` bytes.
    ///
    /// Fails with `InvalidArgument` when `block_size` is 0 or the block count
    /// does not fit the chain representation, and with `Allocation` when the
    /// tables cannot be allocated.
    pub fn build(old: &[u8], block_size: u32) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidArgument("block_size must be > 0".into()));
        }
        let bs = block_size as usize;
        let count = old.len().div_ceil(bs);
        if count >= u32::MAX as usize {
            return Err(Error::InvalidArgument(format!(
                "{count} blocks exceed the index limit; use a larger block size"
            )));
        }

        let cfg = HashCfg::new(count);
        let mut heads = Vec::new();
        heads.try_reserve_exact(cfg.size)?;
        heads.resize(cfg.size, 0u32);

        let mut next = Vec::new();
        next.try_reserve_exact(count)?;
        next.resize(count, 0u32);

        let mut fingerprints = Vec::new();
        fingerprints.try_reserve_exact(count)?;
        compute_fingerprints(old, bs, &mut fingerprints);

        for block in (0..count).rev() {
            let bucket = cfg.bucket(fingerprints[block]);
            next[block] = heads[bucket];
            heads[bucket] = block as u32 + 1;
        }

        debug!(
            "indexed {} bytes: {count} blocks of {bs} bytes, {} buckets",
            old.len(),
            cfg.size
        );

        Ok(Self {
            block_size: bs,
            old_len: old.len() as u64,
            cfg,
            heads,
            next,
            fingerprints,
        })
    }

    /// Block size the index was built with.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Length of the indexed old data.
    pub fn old_len(&self) -> u64 {
        self.old_len
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// The `i`th block, if any.
    pub fn block(&self, i: usize) -> Option<Block> {
        let fingerprint = *self.fingerprints.get(i)?;
        let offset = (i * self.block_size) as u64;
        let len = (self.old_len - offset).min(self.block_size as u64) as usize;
        Some(Block {
            offset,
            len,
            fingerprint,
        })
    }

    /// All blocks in offset order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.len()).filter_map(|i| self.block(i))
    }

    /// Blocks whose fingerprint equals `fp`, in ascending offset order.
    #[inline]
    pub fn lookup(&self, fp: u32) -> Candidates<'_> {
        Candidates {
            index: self,
            fp,
            cursor: self.heads[self.cfg.bucket(fp)],
        }
    }
}

/// Iterator over the blocks sharing one fingerprint.
pub struct Candidates<'a> {
    index: &'a BlockIndex,
    fp: u32,
    cursor: u32,
}

impl Iterator for Candidates<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        while self.cursor != 0 {
            let block = (self.cursor - 1) as usize;
            self.cursor = self.index.next[block];
            if self.index.fingerprints[block] == self.fp {
                return self.index.block(block);
            }
        }
        None
    }
}

#[cfg(not(feature = "parallel"))]
fn compute_fingerprints(old: &[u8], block_size: usize, out: &mut Vec<u32>) {
    out.extend(old.chunks(block_size).map(rolling::fingerprint));
}

#[cfg(feature = "parallel")]
fn compute_fingerprints(old: &[u8], block_size: usize, out: &mut Vec<u32>) {
    out.par_extend(old.par_chunks(block_size).map(rolling::fingerprint));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
