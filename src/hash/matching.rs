// Block matching of new data against an indexed old buffer.
//
// The scan keeps a `block_size` window over the new data:
//   1. Probe the index with the window's rolling fingerprint.
//   2. Verify each candidate block byte-for-byte over the whole window.
//   3. Extend the best candidate forward past the window, and backward
//      into the pending INSERT run.
//   4. On a miss, roll the window one byte and keep the byte pending.
//
// Pending bytes are flushed as one INSERT whenever a COPY is emitted and at
// end of input. COPYs that continue each other in old data are merged.

use log::debug;

use super::config::DEFAULT_MAX_CANDIDATES;
use super::index::{Block, BlockIndex};
use super::rolling::{self, RollingChecksum};
use crate::error::{Error, Result};
use crate::format::Instruction;

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

/// A verified match, already extended in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    /// Start in the new data.
    new_pos: usize,
    /// Start in the old data.
    old_pos: usize,
    len: usize,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Finds COPY/INSERT instructions that rebuild `new` from the indexed old
/// buffer.
pub struct Matcher<'a> {
    old: &'a [u8],
    index: &'a BlockIndex,
    max_candidates: usize,
}

impl<'a> Matcher<'a> {
    /// `index` must have been built over `old`; a length disagreement is
    /// `InvalidArgument`.
    pub fn new(old: &'a [u8], index: &'a BlockIndex) -> Result<Self> {
        if index.old_len() != old.len() as u64 {
            return Err(Error::InvalidArgument(format!(
                "index covers {} bytes but old data has {}",
                index.old_len(),
                old.len()
            )));
        }
        Ok(Self {
            old,
            index,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        })
    }

    /// Bound on candidates verified per window position (at least 1).
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Scan `new` and return the instruction sequence that reproduces it.
    pub fn find_matches(&self, new: &[u8]) -> Vec<Instruction> {
        if new.is_empty() {
            return Vec::new();
        }
        if self.index.is_empty() {
            return vec![Instruction::Insert { data: new.to_vec() }];
        }

        let bs = self.index.block_size();
        let mut out = Emitter::new(new);
        let mut pos = 0usize;
        let mut window: Option<RollingChecksum> = None;

        while pos + bs <= new.len() {
            let rc = *window.get_or_insert_with(|| RollingChecksum::new(&new[pos..pos + bs]));

            if let Some(m) = self.best_match(new, pos, out.pending_start, rc.digest()) {
                out.copy(m);
                pos = m.new_pos + m.len;
                window = None;
                continue;
            }

            if pos + bs < new.len()
                && let Some(rc) = window.as_mut()
            {
                rc.roll(new[pos], new[pos + bs]);
            }
            pos += 1;
        }

        if let Some(m) = self.tail_match(new, out.pending_start) {
            out.copy(m);
        }

        let instructions = out.finish();
        debug!(
            "matched {} new bytes against {} old bytes: {} instructions",
            new.len(),
            self.old.len(),
            instructions.len()
        );
        instructions
    }

    /// Best verified candidate for the window at `pos`.
    ///
    /// Longest total length wins; ties go to the lowest old offset.
    fn best_match(&self, new: &[u8], pos: usize, pending_start: usize, fp: u32) -> Option<Match> {
        let bs = self.index.block_size();
        let mut best: Option<Match> = None;

        for block in self
            .index
            .lookup(fp)
            .filter(|b| b.len == bs)
            .take(self.max_candidates)
        {
            let Some(m) = self.extend(new, pos, pending_start, block) else {
                continue;
            };
            let better = match best {
                None => true,
                Some(b) => m.len > b.len || (m.len == b.len && m.old_pos < b.old_pos),
            };
            if better {
                best = Some(m);
            }
        }
        best
    }

    /// Match the end of `new` against a short final old block.
    ///
    /// Windows shorter than a block are never probed by the scan, so the
    /// last `len` bytes get one direct comparison.
    fn tail_match(&self, new: &[u8], pending_start: usize) -> Option<Match> {
        let last = self.index.block(self.index.len().checked_sub(1)?)?;
        if last.len >= self.index.block_size() {
            return None;
        }
        let pos = new.len().checked_sub(last.len)?;
        if pos < pending_start || last.fingerprint != rolling::fingerprint(&new[pos..]) {
            return None;
        }
        self.extend(new, pos, pending_start, last)
    }

    /// Verify `block` against `new[pos..]` and extend it.
    ///
    /// Returns `None` unless the whole block matches.
    fn extend(&self, new: &[u8], pos: usize, pending_start: usize, block: Block) -> Option<Match> {
        let off = block.offset as usize;
        let fwd = rolling::forward_match(&self.old[off..], &new[pos..], usize::MAX);
        if fwd < block.len {
            return None;
        }

        let max_back = (pos - pending_start).min(off);
        let back = rolling::backward_match(
            &self.old[off - max_back..off],
            &new[pos - max_back..pos],
            max_back,
        );

        Some(Match {
            new_pos: pos - back,
            old_pos: off - back,
            len: back + fwd,
        })
    }
}

// ---------------------------------------------------------------------------
// Instruction emission
// ---------------------------------------------------------------------------

/// Accumulates the instruction list, tracking the pending INSERT run.
struct Emitter<'n> {
    new: &'n [u8],
    pending_start: usize,
    instructions: Vec<Instruction>,
}

impl<'n> Emitter<'n> {
    fn new(new: &'n [u8]) -> Self {
        Self {
            new,
            pending_start: 0,
            instructions: Vec::new(),
        }
    }

    fn flush_insert(&mut self, end: usize) {
        if end > self.pending_start {
            self.instructions.push(Instruction::Insert {
                data: self.new[self.pending_start..end].to_vec(),
            });
        }
        self.pending_start = end;
    }

    fn copy(&mut self, m: Match) {
        debug_assert!(m.new_pos >= self.pending_start);
        self.flush_insert(m.new_pos);
        self.pending_start = m.new_pos + m.len;

        let (offset, len) = (m.old_pos as u64, m.len as u64);
        if let Some(Instruction::Copy {
            offset: prev_off,
            len: prev_len,
        }) = self.instructions.last_mut()
            && *prev_off + *prev_len == offset
        {
            *prev_len += len;
            return;
        }
        self.instructions.push(Instruction::Copy { offset, len });
    }

    fn finish(mut self) -> Vec<Instruction> {
        self.flush_insert(self.new.len());
        self.instructions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
