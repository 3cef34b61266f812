// Rolling checksum and byte-comparison helpers for block matching.
//
// The weak checksum is the rsync-style pair (s1, s2):
//   s1 = sum of bytes
//   s2 = sum of prefix sums = sum((len - i) * b[i])
// both kept in wrapping u32 arithmetic, reported as a 32-bit fingerprint
// `(s2 << 16) | (s1 & 0xFFFF)`. Sliding the window one byte is O(1).
//
// Forward/backward match scanning compares 8 bytes at a time and falls
// back to byte-wise comparison for the tail.

// ---------------------------------------------------------------------------
// Rolling checksum
// ---------------------------------------------------------------------------

/// Weak rolling checksum over a fixed-width window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Checksum of the whole of `window`.
    #[inline]
    pub fn new(window: &[u8]) -> Self {
        let mut s1: u32 = 0;
        let mut s2: u32 = 0;
        for &b in window {
            s1 = s1.wrapping_add(u32::from(b));
            s2 = s2.wrapping_add(s1);
        }
        Self {
            s1,
            s2,
            len: window.len(),
        }
    }

    /// Slide the window one byte: drop `out` from the front, append `inp`.
    #[inline(always)]
    pub fn roll(&mut self, out: u8, inp: u8) {
        let out = u32::from(out);
        self.s1 = self.s1.wrapping_sub(out).wrapping_add(u32::from(inp));
        self.s2 = self
            .s2
            .wrapping_sub((self.len as u32).wrapping_mul(out))
            .wrapping_add(self.s1);
    }

    /// 32-bit fingerprint of the current window.
    #[inline(always)]
    pub fn digest(&self) -> u32 {
        (self.s2 << 16) | (self.s1 & 0xFFFF)
    }

    /// Window width in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fingerprint of a single block.
#[inline]
pub fn fingerprint(block: &[u8]) -> u32 {
    RollingChecksum::new(block).digest()
}

// ---------------------------------------------------------------------------
// Bucket index computation
// ---------------------------------------------------------------------------

/// Hash table sizing for a fingerprint-keyed bucket array.
#[derive(Clone, Debug)]
pub struct HashCfg {
    /// Number of buckets (power of 2).
    pub size: usize,
    /// `32 - log2(size)`.
    pub shift: u32,
    /// `size - 1`.
    pub mask: u32,
}

impl HashCfg {
    /// Smallest power-of-two table holding `slots` entries, at least 8 and
    /// at most 2^28 buckets.
    pub fn new(slots: usize) -> Self {
        let size = slots.max(8).checked_next_power_of_two().unwrap_or(1 << 28);
        let size = size.min(1 << 28);
        let bits = size.trailing_zeros();
        Self {
            size,
            shift: 32 - bits,
            mask: (size - 1) as u32,
        }
    }

    /// Fold the high bits of `fp` into the bucket range.
    #[inline(always)]
    pub fn bucket(&self, fp: u32) -> usize {
        ((fp >> self.shift) ^ (fp & self.mask)) as usize
    }
}

// ---------------------------------------------------------------------------
// Match scanning
// ---------------------------------------------------------------------------

/// Number of equal leading bytes of `s1[..n]` and `s2[..n]`.
#[inline]
pub fn forward_match(s1: &[u8], s2: &[u8], n: usize) -> usize {
    let n = n.min(s1.len()).min(s2.len());
    let mut i = 0;
    while i + 8 <= n {
        let a = read_u64(&s1[i..i + 8]);
        let b = read_u64(&s2[i..i + 8]);
        let xor = a ^ b;
        if xor != 0 {
            return i + (xor.trailing_zeros() / 8) as usize;
        }
        i += 8;
    }
    while i < n && s1[i] == s2[i] {
        i += 1;
    }
    i
}

/// Number of equal trailing bytes of `s1[..n]` and `s2[..n]`.
#[inline]
pub fn backward_match(s1: &[u8], s2: &[u8], n: usize) -> usize {
    let n = n.min(s1.len()).min(s2.len());
    let mut i = n;
    while i >= 8 {
        let a = read_u64(&s1[i - 8..i]);
        let b = read_u64(&s2[i - 8..i]);
        let xor = a ^ b;
        if xor != 0 {
            return n - i + (xor.leading_zeros() / 8) as usize;
        }
        i -= 8;
    }
    while i > 0 && s1[i - 1] == s2[i - 1] {
        i -= 1;
    }
    n - i
}

/// Little-endian load so that byte 0 sits in the lowest bits.
#[inline(always)]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_le_bytes(word)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
