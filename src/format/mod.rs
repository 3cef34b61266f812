// Binary patch format.
//
// # Modules
//
// - `varint`      - Variable-length integer encoding (base-128, big-endian)
// - `checksum`    - XXH3-64 integrity checksum of the new data
// - `instruction` - COPY/INSERT instruction model and wire tags
// - `header`      - Versioned patch header
// - `encoder`     - Header + instruction stream emission
// - `decoder`     - Validating, incremental patch reader

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod instruction;
pub mod varint;

pub use checksum::{CHECKSUM_LEN, Checksum, checksum};
pub use decoder::{Patch, PatchReader, Step, decode, read_header};
pub use encoder::encode;
pub use header::{FORMAT_VERSION, PATCH_MAGIC, PatchHeader};
pub use instruction::Instruction;
