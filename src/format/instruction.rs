// Patch instructions.

/// Wire tag of a COPY instruction.
pub const TAG_COPY: u8 = 0x01;
/// Wire tag of an INSERT instruction.
pub const TAG_INSERT: u8 = 0x02;

/// One step of a patch: reuse old bytes or append literal bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Copy `len` bytes starting at `offset` in the old data.
    Copy { offset: u64, len: u64 },
    /// Append literal bytes not taken from the old data.
    Insert { data: Vec<u8> },
}

impl Instruction {
    /// Number of output bytes this instruction produces.
    #[inline]
    pub fn len(&self) -> u64 {
        match self {
            Self::Copy { len, .. } => *len,
            Self::Insert { data } => data.len() as u64,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wire tag for this instruction.
    #[inline]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Copy { .. } => TAG_COPY,
            Self::Insert { .. } => TAG_INSERT,
        }
    }
}

/// Total output length of an instruction sequence.
pub fn output_len(instructions: &[Instruction]) -> u64 {
    instructions.iter().map(Instruction::len).sum()
}
