//! xdelta: block-matching binary delta engine.
//!
//! Given an old and a new byte sequence, the engine produces a compact patch
//! of COPY (reuse a range of the old data) and INSERT (literal bytes)
//! instructions; applying the patch to the same old data rebuilds the new
//! data exactly, verified by length and XXH3-64 checksum.
//!
//! The crate provides:
//! - Block hashing and matching (`hash`)
//! - The versioned patch format (`format`)
//! - Patch application, in memory or streaming (`apply`)
//! - In-memory entry points (`engine`) and file helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! Every entry point returns a typed [`Error`]; the message of the most
//! recent failure on the calling thread is also available from
//! [`last_error`].
//!
//! # Quick Start
//!
//! ```
//! let old = b"hello old world, hello old world";
//! let new = b"hello new world, hello old world";
//!
//! let patch = xdelta::create_patch(old, new, 8).unwrap();
//! let rebuilt = xdelta::apply_patch(old, &patch).unwrap();
//! assert_eq!(rebuilt, new);
//! ```

pub mod apply;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod format;
pub mod hash;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use diagnostics::last_error;
pub use engine::{apply_patch, create_patch, create_patch_with_options, diff_instructions};
pub use error::{Error, Result};
pub use hash::config::PatchOptions;
pub use io::{ApplyStats, CreateStats, apply_patch_file, create_patch_file};
