// Patch decoding.
//
// `PatchReader` parses the header, then hands out one instruction step at a
// time so that large patches never need to be resident in memory. INSERT
// payloads can be streamed with `read_insert_data` or collected whole with
// `next_instruction`.
//
// Validation performed while reading:
//   - unknown tag, zero-length instruction            -> Format
//   - COPY reaching past the declared old length      -> Format
//   - running output length exceeding new_len         -> Format
//   - all instructions read but output != new_len     -> Format
//   - bytes after the last instruction                -> Format
//   - stream ends before a declared field or payload  -> Truncated

use std::io::{self, Read};

use super::header::PatchHeader;
use super::instruction::{Instruction, TAG_COPY, TAG_INSERT};
use super::varint;
use crate::error::{Error, Result};

/// Largest up-front reservation for a collected INSERT payload.
const INSERT_CHUNK: usize = 64 * 1024;

/// One decoded instruction without its INSERT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Copy { offset: u64, len: u64 },
    Insert { len: u64 },
}

/// A fully decoded patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub header: PatchHeader,
    pub instructions: Vec<Instruction>,
}

// ---------------------------------------------------------------------------
// PatchReader
// ---------------------------------------------------------------------------

/// Incremental reader over an encoded patch.
pub struct PatchReader<R: Read> {
    reader: R,
    header: PatchHeader,
    /// Instructions returned so far.
    read: u64,
    /// Output bytes described by the instructions returned so far.
    produced: u64,
    /// Unread payload of the current INSERT.
    pending_insert: u64,
}

impl<R: Read> PatchReader<R> {
    /// Read and validate the header.
    pub fn new(mut reader: R) -> Result<Self> {
        let header = PatchHeader::decode(&mut reader)?;
        Ok(Self {
            reader,
            header,
            read: 0,
            produced: 0,
            pending_insert: 0,
        })
    }

    pub fn header(&self) -> &PatchHeader {
        &self.header
    }

    /// Number of instructions read so far.
    pub fn instructions_read(&self) -> u64 {
        self.read
    }

    /// Next instruction step, or `None` after the last declared one.
    ///
    /// Any unread payload of a previous INSERT is skipped first.
    pub fn next_step(&mut self) -> Result<Option<Step>> {
        self.skip_pending_insert()?;

        if self.read == self.header.count {
            if self.produced != self.header.new_len {
                return Err(Error::format(format!(
                    "instructions produce {} bytes, header declares {}",
                    self.produced, self.header.new_len
                )));
            }
            return Ok(None);
        }

        let tag = varint::read_byte(&mut self.reader, "instruction tag")?;
        let step = match tag {
            TAG_COPY => {
                let offset = varint::read_u64(&mut self.reader, "copy offset")?;
                let len = varint::read_u64(&mut self.reader, "copy length")?;
                let in_range = offset
                    .checked_add(len)
                    .is_some_and(|end| end <= self.header.old_len);
                if !in_range {
                    return Err(Error::format(format!(
                        "copy offset {offset} + length {len} exceeds declared old length {}",
                        self.header.old_len
                    )));
                }
                Step::Copy { offset, len }
            }
            TAG_INSERT => {
                let len = varint::read_u64(&mut self.reader, "insert length")?;
                Step::Insert { len }
            }
            other => {
                return Err(Error::format(format!(
                    "unknown instruction tag {other:#04X} at instruction {}",
                    self.read
                )));
            }
        };

        let len = match step {
            Step::Copy { len, .. } | Step::Insert { len } => len,
        };
        if len == 0 {
            return Err(Error::format(format!(
                "zero-length instruction at {}",
                self.read
            )));
        }
        if len > self.header.new_len - self.produced {
            return Err(Error::format(format!(
                "instruction {} overruns declared new length {}",
                self.read, self.header.new_len
            )));
        }

        self.read += 1;
        self.produced += len;
        if let Step::Insert { len } = step {
            self.pending_insert = len;
        }
        Ok(Some(step))
    }

    /// Read up to `buf.len()` bytes of the current INSERT payload.
    ///
    /// Returns 0 once the payload is exhausted.
    pub fn read_insert_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pending_insert == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.pending_insert).unwrap_or(usize::MAX));
        varint::read_exact(&mut self.reader, &mut buf[..want], "insert data")?;
        self.pending_insert -= want as u64;
        Ok(want)
    }

    /// Next instruction with its INSERT payload collected.
    pub fn next_instruction(&mut self) -> Result<Option<Instruction>> {
        match self.next_step()? {
            None => Ok(None),
            Some(Step::Copy { offset, len }) => Ok(Some(Instruction::Copy { offset, len })),
            Some(Step::Insert { len }) => {
                // Grow with the data actually present so a corrupt length
                // cannot force a huge up-front allocation.
                let mut data = Vec::new();
                data.try_reserve(usize::try_from(len).unwrap_or(usize::MAX).min(INSERT_CHUNK))?;
                let mut chunk = [0u8; 4096];
                loop {
                    let n = self.read_insert_data(&mut chunk)?;
                    if n == 0 {
                        break;
                    }
                    data.try_reserve(n)?;
                    data.extend_from_slice(&chunk[..n]);
                }
                Ok(Some(Instruction::Insert { data }))
            }
        }
    }

    /// Check that every declared instruction was read and nothing follows.
    ///
    /// Returns the underlying reader.
    pub fn finish(mut self) -> Result<R> {
        self.check_end()?;
        Ok(self.reader)
    }

    /// Like `finish`, but keeps the reader usable for inspection.
    pub fn check_end(&mut self) -> Result<()> {
        if self.next_step()?.is_some() {
            return Err(Error::format(format!(
                "finished after {} of {} instructions",
                self.read, self.header.count
            )));
        }
        let mut probe = [0u8; 1];
        loop {
            match self.reader.read(&mut probe) {
                Ok(0) => return Ok(()),
                Ok(_) => return Err(Error::format("trailing bytes after instruction stream")),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    fn skip_pending_insert(&mut self) -> Result<()> {
        if self.pending_insert == 0 {
            return Ok(());
        }
        let want = self.pending_insert;
        let skipped = io::copy(&mut (&mut self.reader).take(want), &mut io::sink())?;
        self.pending_insert = 0;
        if skipped < want {
            return Err(Error::truncated("stream ended reading insert data"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory helpers
// ---------------------------------------------------------------------------

/// Decode a complete patch held in memory.
pub fn decode(patch: &[u8]) -> Result<Patch> {
    let mut reader = PatchReader::new(patch)?;
    let header = *reader.header();

    let mut instructions = Vec::new();
    // `count <= new_len` is checked by the header, but new_len itself is
    // untrusted; cap the up-front reservation.
    instructions.try_reserve(header.count.min(1 << 16) as usize)?;
    while let Some(inst) = reader.next_instruction()? {
        instructions.push(inst);
    }
    reader.finish()?;

    Ok(Patch {
        header,
        instructions,
    })
}

/// Parse only the header of a patch.
pub fn read_header(patch: &[u8]) -> Result<PatchHeader> {
    let mut cursor = patch;
    PatchHeader::decode(&mut cursor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encoder;

    fn sample() -> (PatchHeader, Vec<Instruction>) {
        let insts = vec![
            Instruction::Copy { offset: 0, len: 3 },
            Instruction::Insert {
                data: b"X".to_vec(),
            },
            Instruction::Copy { offset: 4, len: 4 },
        ];
        (PatchHeader::new(4, 8, 8, 0x0ABC_0123, 3), insts)
    }

    fn encode(header: &PatchHeader, insts: &[Instruction]) -> Vec<u8> {
        let mut out = Vec::new();
        encoder::encode(header, insts, &mut out).unwrap();
        out
    }

    #[test]
    fn decode_sample() {
        let (h, insts) = sample();
        let patch = decode(&encode(&h, &insts)).unwrap();
        assert_eq!(patch.header, h);
        assert_eq!(patch.instructions, insts);
    }

    #[test]
    fn empty_instruction_stream() {
        let h = PatchHeader::new(4096, 5, 0, 1, 0);
        let patch = decode(&encode(&h, &[])).unwrap();
        assert!(patch.instructions.is_empty());
    }

    #[test]
    fn streaming_steps_and_payload() {
        let (h, insts) = sample();
        let bytes = encode(&h, &insts);
        let mut reader = PatchReader::new(bytes.as_slice()).unwrap();
        assert_eq!(
            reader.next_step().unwrap(),
            Some(Step::Copy { offset: 0, len: 3 })
        );
        assert_eq!(reader.next_step().unwrap(), Some(Step::Insert { len: 1 }));
        let mut buf = [0u8; 8];
        assert_eq!(reader.read_insert_data(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'X');
        assert_eq!(reader.read_insert_data(&mut buf).unwrap(), 0);
        assert_eq!(
            reader.next_step().unwrap(),
            Some(Step::Copy { offset: 4, len: 4 })
        );
        assert_eq!(reader.next_step().unwrap(), None);
        assert_eq!(reader.instructions_read(), 3);
        reader.finish().unwrap();
    }

    #[test]
    fn unread_insert_payload_is_skipped() {
        let (h, insts) = sample();
        let bytes = encode(&h, &insts);
        let mut reader = PatchReader::new(bytes.as_slice()).unwrap();
        reader.next_step().unwrap();
        reader.next_step().unwrap();
        assert_eq!(
            reader.next_step().unwrap(),
            Some(Step::Copy { offset: 4, len: 4 })
        );
    }

    #[test]
    fn truncation_is_reported() {
        let (h, insts) = sample();
        let bytes = encode(&h, &insts);
        for cut in h.encoded_len()..bytes.len() {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, Error::Truncated(_)), "cut {cut}: {err}");
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let (h, insts) = sample();
        let mut bytes = encode(&h, &insts);
        bytes.push(0);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
    }

    #[test]
    fn unknown_tag_rejected() {
        let (h, insts) = sample();
        let mut bytes = encode(&h, &insts);
        bytes[h.encoded_len()] = 0x7F;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown instruction tag"), "{err}");
    }

    #[test]
    fn length_sum_must_match_header() {
        let (_, insts) = sample();
        let h = PatchHeader::new(4, 8, 9, 0, 3);
        let err = decode(&encode(&h, &insts)).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");

        let h = PatchHeader::new(4, 8, 7, 0, 3);
        let err = decode(&encode(&h, &insts)).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
    }

    #[test]
    fn copy_past_declared_old_len_rejected() {
        let insts = vec![Instruction::Copy { offset: 6, len: 4 }];
        let h = PatchHeader::new(4, 8, 4, 0, 1);
        let err = decode(&encode(&h, &insts)).unwrap_err();
        assert!(err.to_string().contains("exceeds declared old length"), "{err}");
    }

    #[test]
    fn zero_length_rejected() {
        let insts = vec![
            Instruction::Insert { data: Vec::new() },
            Instruction::Insert {
                data: b"a".to_vec(),
            },
        ];
        let h = PatchHeader::new(4, 0, 2, 0, 2);
        let err = decode(&encode(&h, &insts)).unwrap_err();
        assert!(err.to_string().contains("zero-length"), "{err}");
    }

    #[test]
    fn header_only() {
        let (h, insts) = sample();
        let bytes = encode(&h, &insts);
        assert_eq!(read_header(&bytes).unwrap(), h);
    }
}
