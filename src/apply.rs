// Patch application.
//
// Two modes:
//   - `apply`: replay a decoded `Patch` into a pre-sized buffer.
//   - `PatchApplier`: pull instructions from a `PatchReader` and write the
//     output to any `io::Write` sink, checksumming as bytes go out.
//
// Both check every COPY against the actual old data before reading it and
// verify length and checksum before reporting success. A failed
// application never hands back output; streaming callers must discard
// whatever reached the sink.

use std::io::{Read, Write};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::format::instruction::output_len;
use crate::format::{Checksum, Instruction, Patch, PatchHeader, PatchReader, Step, checksum};

/// Size of the buffer used to move INSERT payloads to the sink.
const COPY_BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// In-memory application
// ---------------------------------------------------------------------------

/// Rebuild the new data from `old` and a decoded patch.
pub fn apply(old: &[u8], patch: &Patch) -> Result<Vec<u8>> {
    apply_instructions(
        old,
        &patch.instructions,
        patch.header.new_len,
        patch.header.checksum,
    )
}

/// Replay `instructions` against `old`.
///
/// `new_len` and `expected_checksum` are the values the output must match.
pub fn apply_instructions(
    old: &[u8],
    instructions: &[Instruction],
    new_len: u64,
    expected_checksum: u64,
) -> Result<Vec<u8>> {
    for inst in instructions {
        if let Instruction::Copy { offset, len } = *inst {
            check_range(old, offset, len)?;
        }
    }

    let actual_len = output_len(instructions);
    if actual_len != new_len {
        warn!("patch declares {new_len} bytes but instructions produce {actual_len}");
        return Err(Error::LengthMismatch {
            expected: new_len,
            actual: actual_len,
        });
    }

    let mut out = Vec::new();
    out.try_reserve_exact(usize::try_from(actual_len).map_err(|_| {
        Error::InvalidArgument(format!("output of {actual_len} bytes exceeds address space"))
    })?)?;

    for inst in instructions {
        match inst {
            Instruction::Copy { offset, len } => {
                let start = *offset as usize;
                out.extend_from_slice(&old[start..start + *len as usize]);
            }
            Instruction::Insert { data } => out.extend_from_slice(data),
        }
    }

    verify_checksum(expected_checksum, checksum(&out))?;
    debug!(
        "applied {} instructions: {} old bytes -> {} new bytes",
        instructions.len(),
        old.len(),
        out.len()
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Streaming application
// ---------------------------------------------------------------------------

/// Streaming patch applier with progress tracking.
///
/// Only one INSERT chunk is held in memory at a time; COPY data is written
/// straight from the old buffer.
pub struct PatchApplier<R: Read> {
    reader: PatchReader<R>,
    bytes_written: u64,
    instructions_applied: u64,
}

impl<R: Read> PatchApplier<R> {
    /// Read the patch header from `reader`.
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            reader: PatchReader::new(reader)?,
            bytes_written: 0,
            instructions_applied: 0,
        })
    }

    pub fn header(&self) -> &PatchHeader {
        self.reader.header()
    }

    /// Output bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn instructions_applied(&self) -> u64 {
        self.instructions_applied
    }

    /// Apply the whole patch against `old`, writing the output to `sink`.
    ///
    /// Returns the number of bytes written. On error the sink holds a
    /// partial output that must not be used.
    pub fn apply_to<W: Write>(&mut self, old: &[u8], sink: &mut W) -> Result<u64> {
        let mut hasher = Checksum::new();
        let mut buf = Vec::new();

        while let Some(step) = self.reader.next_step()? {
            match step {
                Step::Copy { offset, len } => {
                    check_range(old, offset, len)?;
                    let start = offset as usize;
                    let data = &old[start..start + len as usize];
                    sink.write_all(data)?;
                    hasher.update(data);
                }
                Step::Insert { len } => {
                    if buf.is_empty() {
                        buf.try_reserve_exact(COPY_BUF_SIZE)?;
                        buf.resize(COPY_BUF_SIZE, 0u8);
                    }
                    let mut remaining = len;
                    while remaining > 0 {
                        let n = self.reader.read_insert_data(&mut buf)?;
                        if n == 0 {
                            return Err(Error::truncated("insert data ended early"));
                        }
                        sink.write_all(&buf[..n])?;
                        hasher.update(&buf[..n]);
                        remaining -= n as u64;
                    }
                }
            }
            self.bytes_written += match step {
                Step::Copy { len, .. } | Step::Insert { len } => len,
            };
            self.instructions_applied += 1;
        }
        self.reader.check_end()?;

        let expected = self.reader.header().new_len;
        if self.bytes_written != expected {
            warn!(
                "patch declares {expected} bytes but {} were written",
                self.bytes_written
            );
            return Err(Error::LengthMismatch {
                expected,
                actual: self.bytes_written,
            });
        }
        verify_checksum(self.reader.header().checksum, hasher.value())?;
        sink.flush()?;

        debug!(
            "streamed {} instructions: {} bytes written",
            self.instructions_applied, self.bytes_written
        );
        Ok(self.bytes_written)
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

fn check_range(old: &[u8], offset: u64, len: u64) -> Result<()> {
    let old_len = old.len() as u64;
    match offset.checked_add(len) {
        Some(end) if end <= old_len => Ok(()),
        _ => Err(Error::Range {
            offset,
            len,
            old_len,
        }),
    }
}

fn verify_checksum(expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        warn!("output checksum {actual:#018X} does not match patch checksum {expected:#018X}");
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
