// Patch engine: ties block hashing and matching to the patch codec.
//
// Creation:    index old -> match new -> header + instructions -> bytes
// Application: decode header + instructions -> replay -> verified new data
//
// Every public entry point records its failure in the per-thread
// last-error slot before returning it.

use log::debug;

use crate::apply;
use crate::diagnostics::record;
use crate::error::{Error, Result};
use crate::format::{self, Instruction, PatchHeader, checksum};
use crate::hash::config::PatchOptions;
use crate::hash::index::BlockIndex;
use crate::hash::matching::Matcher;

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Create a patch that turns `old` into `new`, using `block_size`-byte
/// blocks.
///
/// Deterministic: the same inputs and block size always give the same bytes.
pub fn create_patch(old: &[u8], new: &[u8], block_size: u32) -> Result<Vec<u8>> {
    create_patch_with_options(old, new, &PatchOptions::with_block_size(block_size))
}

/// Create a patch with explicit options.
pub fn create_patch_with_options(old: &[u8], new: &[u8], opts: &PatchOptions) -> Result<Vec<u8>> {
    record(create_inner(old, new, opts))
}

fn create_inner(old: &[u8], new: &[u8], opts: &PatchOptions) -> Result<Vec<u8>> {
    let instructions = diff_inner(old, new, opts)?;
    let header = PatchHeader::new(
        opts.block_size,
        old.len() as u64,
        new.len() as u64,
        checksum(new),
        instructions.len() as u64,
    );

    let mut out = Vec::new();
    out.try_reserve_exact(format::encoder::encoded_len(&header, &instructions))?;
    format::encode(&header, &instructions, &mut out)?;

    debug!(
        "created patch: {} old + {} new bytes -> {} instructions, {} patch bytes",
        old.len(),
        new.len(),
        instructions.len(),
        out.len()
    );
    Ok(out)
}

/// Instruction sequence that rebuilds `new` from `old`, without encoding.
pub fn diff_instructions(old: &[u8], new: &[u8], opts: &PatchOptions) -> Result<Vec<Instruction>> {
    record(diff_inner(old, new, opts))
}

pub(crate) fn diff_inner(old: &[u8], new: &[u8], opts: &PatchOptions) -> Result<Vec<Instruction>> {
    if opts.block_size == 0 {
        return Err(Error::InvalidArgument("block_size must be > 0".into()));
    }
    let index = BlockIndex::build(old, opts.block_size)?;
    Ok(Matcher::new(old, &index)?
        .with_max_candidates(opts.max_candidates)
        .find_matches(new))
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Rebuild the new data from `old` and an encoded patch.
///
/// Fails with `Format`/`Truncated` for a malformed patch, `Range` when a
/// COPY reaches past `old`, and `LengthMismatch`/`ChecksumMismatch` when the
/// output does not verify. No output is returned on failure.
pub fn apply_patch(old: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    record(format::decode(patch).and_then(|p| apply::apply(old, &p)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
