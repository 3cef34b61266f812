// Block hashing and matching.
//
// - `rolling`  - weak rolling checksum, bucket hashing, byte comparison
// - `index`    - fingerprint index over fixed-size blocks of the old data
// - `matching` - scan of the new data producing COPY/INSERT instructions
// - `config`   - block size and candidate limits

pub mod config;
pub mod index;
pub mod matching;
pub mod rolling;
