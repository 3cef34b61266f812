// Matcher tuning and patch creation options.

/// Default block size in bytes.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Default cap on index candidates verified per scan position.
pub const DEFAULT_MAX_CANDIDATES: usize = 64;

/// Options for patch creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Block size used to partition the old data. Must be at least 1.
    pub block_size: u32,
    /// Maximum number of same-fingerprint offsets verified at one position.
    ///
    /// Bounds the work spent on pathological collision chains (e.g. old data
    /// made of one repeated byte). Values below 1 are treated as 1.
    pub max_candidates: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl PatchOptions {
    /// Options with the given block size and default tuning.
    pub fn with_block_size(block_size: u32) -> Self {
        Self {
            block_size,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = PatchOptions::default();
        assert_eq!(opts.block_size, 4096);
        assert_eq!(opts.max_candidates, 64);
    }

    #[test]
    fn with_block_size_keeps_tuning() {
        let opts = PatchOptions::with_block_size(16);
        assert_eq!(opts.block_size, 16);
        assert_eq!(opts.max_candidates, DEFAULT_MAX_CANDIDATES);
    }
}
