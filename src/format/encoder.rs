// Patch encoding: header followed by the tagged instruction stream.
//
//   COPY    0x01  offset varint, len varint
//   INSERT  0x02  len varint, len literal bytes

use std::io::{self, Write};

use log::trace;

use super::header::PatchHeader;
use super::instruction::Instruction;
use super::varint;

/// Write `header` and `instructions` to `w`.
///
/// `header.count`, `new_len` and `checksum` must describe `instructions`.
pub fn encode<W: Write>(
    header: &PatchHeader,
    instructions: &[Instruction],
    w: &mut W,
) -> io::Result<()> {
    debug_assert_eq!(header.count, instructions.len() as u64);
    header.encode(w)?;
    for inst in instructions {
        write_instruction(w, inst)?;
    }
    Ok(())
}

/// Write one instruction.
pub fn write_instruction<W: Write>(w: &mut W, inst: &Instruction) -> io::Result<()> {
    w.write_all(&[inst.tag()])?;
    match inst {
        Instruction::Copy { offset, len } => {
            trace!("COPY offset={offset} len={len}");
            varint::write_u64(w, *offset)?;
            varint::write_u64(w, *len)?;
        }
        Instruction::Insert { data } => {
            trace!("INSERT len={}", data.len());
            varint::write_u64(w, data.len() as u64)?;
            w.write_all(data)?;
        }
    }
    Ok(())
}

/// Encoded size of one instruction.
pub fn instruction_len(inst: &Instruction) -> usize {
    1 + match inst {
        Instruction::Copy { offset, len } => varint::sizeof_u64(*offset) + varint::sizeof_u64(*len),
        Instruction::Insert { data } => varint::sizeof_u64(data.len() as u64) + data.len(),
    }
}

/// Exact encoded size of a patch.
pub fn encoded_len(header: &PatchHeader, instructions: &[Instruction]) -> usize {
    header.encoded_len() + instructions.iter().map(instruction_len).sum::<usize>()
}
