// File-level entry points.
//
// `create_patch_file()` and `apply_patch_file()` wrap the engine with
// buffered file I/O. Old data is read fully into memory; patches are
// streamed on apply. Outputs are written to a staging file beside the
// destination and renamed over it only after the write succeeded, so a
// failed call leaves an existing destination untouched. With the `file-io`
// feature the stats carry SHA-256 digests of the new data.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::apply::PatchApplier;
use crate::diagnostics::record;
use crate::engine::diff_inner;
use crate::error::{Error, Result};
use crate::format::{self, Instruction, PatchHeader, checksum};
use crate::hash::config::PatchOptions;

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

static NEXT_STAGING_ID: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `create_patch_file()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// New file size in bytes.
    pub new_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Number of instructions in the patch.
    pub instructions: u64,
    /// SHA-256 of the new file (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `apply_patch_file()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of instructions applied.
    pub instructions: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// create_patch_file
// ---------------------------------------------------------------------------

/// Create a patch turning the file at `old_path` into the file at
/// `new_path`, writing it to `patch_path`.
///
/// Both inputs are read fully into memory. An existing patch file is
/// replaced once the new one is complete.
pub fn create_patch_file(
    old_path: &Path,
    new_path: &Path,
    patch_path: &Path,
    block_size: u32,
) -> Result<CreateStats> {
    record(create_inner(old_path, new_path, patch_path, block_size))
}

fn create_inner(
    old_path: &Path,
    new_path: &Path,
    patch_path: &Path,
    block_size: u32,
) -> Result<CreateStats> {
    let old = fs::read(old_path)?;
    let new = fs::read(new_path)?;

    let opts = PatchOptions::with_block_size(block_size);
    let instructions = diff_inner(&old, &new, &opts)?;
    let header = PatchHeader::new(
        block_size,
        old.len() as u64,
        new.len() as u64,
        checksum(&new),
        instructions.len() as u64,
    );

    let (staged, patch_file) = StagedOutput::create(patch_path)?;
    let patch_size = write_patch(patch_file, &header, &instructions)?;
    staged.commit()?;

    #[cfg(feature = "file-io")]
    let new_sha256 = Some(sha2::Sha256::digest(&new).into());
    #[cfg(not(feature = "file-io"))]
    let new_sha256: Option<[u8; 32]> = None;

    debug!(
        "wrote {}: {patch_size} bytes, {} instructions",
        patch_path.display(),
        instructions.len()
    );
    Ok(CreateStats {
        old_size: old.len() as u64,
        new_size: new.len() as u64,
        patch_size,
        instructions: instructions.len() as u64,
        new_sha256,
    })
}

fn write_patch(file: File, header: &PatchHeader, instructions: &[Instruction]) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, file);
    format::encode(header, instructions, &mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(file.metadata()?.len())
}

// ---------------------------------------------------------------------------
// apply_patch_file
// ---------------------------------------------------------------------------

/// Apply the patch at `patch_path` to the file at `old_path`, writing the
/// reconstructed data to `out_path`.
///
/// The old file is read into memory; the patch is streamed. `out_path` is
/// only replaced when the output passed every check.
pub fn apply_patch_file(old_path: &Path, patch_path: &Path, out_path: &Path) -> Result<ApplyStats> {
    record(apply_inner(old_path, patch_path, out_path))
}

fn apply_inner(old_path: &Path, patch_path: &Path, out_path: &Path) -> Result<ApplyStats> {
    let old = fs::read(old_path)?;

    let patch_file = File::open(patch_path)?;
    let patch_size = patch_file.metadata()?.len();
    let mut applier = PatchApplier::new(BufReader::with_capacity(BUF_SIZE, patch_file))?;

    let (staged, out_file) = StagedOutput::create(out_path)?;
    let (output_size, output_sha256) = stream_output(&mut applier, &old, out_file)?;
    staged.commit()?;

    debug!("wrote {}: {output_size} bytes", out_path.display());
    Ok(ApplyStats {
        old_size: old.len() as u64,
        patch_size,
        output_size,
        instructions: applier.instructions_applied(),
        output_sha256,
    })
}

fn stream_output<R: io::Read>(
    applier: &mut PatchApplier<R>,
    old: &[u8],
    out_file: File,
) -> Result<(u64, Option<[u8; 32]>)> {
    let mut out_writer = BufWriter::with_capacity(BUF_SIZE, out_file);

    #[cfg(feature = "file-io")]
    let result = {
        let mut hasher = sha2::Sha256::new();
        let mut hashing_writer = HashingWriter {
            inner: &mut out_writer,
            hasher: &mut hasher,
        };
        let n = applier.apply_to(old, &mut hashing_writer)?;
        (n, Some(hasher.finalize().into()))
    };
    #[cfg(not(feature = "file-io"))]
    let result = (applier.apply_to(old, &mut out_writer)?, None);

    out_writer.flush()?;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Staged output
// ---------------------------------------------------------------------------

/// Output file written under a unique sibling name and renamed onto the
/// destination by `commit`. Dropping it uncommitted removes the staging file.
struct StagedOutput {
    final_path: PathBuf,
    temp_path: PathBuf,
    committed: bool,
}

impl StagedOutput {
    fn create(destination: &Path) -> Result<(Self, File)> {
        let name = destination.file_name().ok_or_else(|| {
            Error::InvalidArgument(format!("not a file path: {}", destination.display()))
        })?;
        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        loop {
            let unique = NEXT_STAGING_ID.fetch_add(1, Ordering::Relaxed);
            let mut temp_name = OsString::from(".");
            temp_name.push(name);
            temp_name.push(format!(".{}.{unique}.tmp", process::id()));
            let temp_path = dir.join(temp_name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
            {
                Ok(file) => {
                    return Ok((
                        Self {
                            final_path: destination.to_path_buf(),
                            temp_path,
                            committed: false,
                        },
                        file,
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn commit(mut self) -> Result<()> {
        fs::rename(&self.temp_path, &self.final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.temp_path) {
            Ok(()) => debug!("removed staging file {}", self.temp_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "could not remove staging file {}: {e}",
                self.temp_path.display()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
