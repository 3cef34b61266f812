use xdelta::format::{self, CHECKSUM_LEN, Instruction, varint};
use xdelta::{Error, PatchOptions, apply_patch, create_patch, diff_instructions, last_error};

fn instructions(old: &[u8], new: &[u8], block_size: u32) -> Vec<Instruction> {
    let patch = create_patch(old, new, block_size).unwrap();
    format::decode(&patch).unwrap().instructions
}

/// Byte range of the stored checksum inside an encoded patch.
fn checksum_range(patch: &[u8]) -> std::ops::Range<usize> {
    let h = format::read_header(patch).unwrap();
    let start = 5
        + varint::sizeof_u64(u64::from(h.block_size))
        + varint::sizeof_u64(h.old_len)
        + varint::sizeof_u64(h.new_len);
    start..start + CHECKSUM_LEN
}

fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed | 1;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn single_byte_substitution() {
    let old = b"ABCDEFGH";
    let new = b"ABCXEFGH";
    let patch = create_patch(old, new, 4).unwrap();
    assert_eq!(apply_patch(old, &patch).unwrap(), new);

    let insts = format::decode(&patch).unwrap().instructions;
    assert_eq!(format::instruction::output_len(&insts), 8);
    assert_eq!(insts.last(), Some(&Instruction::Copy { offset: 4, len: 4 }));
}

#[test]
fn empty_old_hello() {
    let patch = create_patch(b"", b"hello", 4).unwrap();
    let insts = format::decode(&patch).unwrap().instructions;
    assert_eq!(
        insts,
        vec![Instruction::Insert {
            data: b"hello".to_vec()
        }]
    );
    assert_eq!(apply_patch(b"", &patch).unwrap(), b"hello");
}

#[test]
fn zeroed_checksum_is_detected() {
    let old = b"hello";
    let mut patch = create_patch(old, b"hello, world", 4).unwrap();
    let range = checksum_range(&patch);
    patch[range].fill(0);

    let err = apply_patch(old, &patch).unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { expected: 0, .. }), "{err}");
}

// ---------------------------------------------------------------------------
// Properties on fixed inputs
// ---------------------------------------------------------------------------

#[test]
fn identity_is_single_copy_for_many_block_sizes() {
    let data = pseudo_random(10_000, 7);
    for bs in [1, 3, 16, 1000, 4096, 20_000] {
        assert_eq!(
            instructions(&data, &data, bs),
            vec![Instruction::Copy {
                offset: 0,
                len: 10_000
            }],
            "block size {bs}"
        );
    }
}

#[test]
fn empty_new_on_any_old() {
    let patch = create_patch(b"some old bytes", b"", 4).unwrap();
    assert!(format::decode(&patch).unwrap().instructions.is_empty());
    assert!(apply_patch(b"some old bytes", &patch).unwrap().is_empty());
    assert!(apply_patch(b"", &patch).unwrap().is_empty());
    assert!(apply_patch(b"entirely different", &patch).unwrap().is_empty());
}

#[test]
fn empty_old_is_pure_insert() {
    let new = pseudo_random(5000, 3);
    let insts = instructions(b"", &new, 64);
    assert!(
        insts
            .iter()
            .all(|i| matches!(i, Instruction::Insert { .. }))
    );
    assert_eq!(apply_patch(b"", &create_patch(b"", &new, 64).unwrap()).unwrap(), new);
}

#[test]
fn roundtrip_edits() {
    let old = pseudo_random(100_000, 11);
    let mut new = old.clone();
    new.splice(500..500, pseudo_random(300, 5));
    new.drain(40_000..41_234);
    new[60_000] ^= 0x55;
    new.extend_from_slice(&old[10_000..20_000]);

    for bs in [1, 7, 64, 512, 4096] {
        let patch = create_patch(&old, &new, bs).unwrap();
        assert_eq!(apply_patch(&old, &patch).unwrap(), new, "block size {bs}");
    }
    let patch = create_patch(&old, &new, 512).unwrap();
    assert!(patch.len() < new.len() / 10, "patch {} bytes", patch.len());
}

#[test]
fn determinism() {
    let old = pseudo_random(30_000, 21);
    let mut new = old.clone();
    new.rotate_left(12_345);
    let a = create_patch(&old, &new, 128).unwrap();
    let b = create_patch(&old, &new, 128).unwrap();
    assert_eq!(a, b);
}

#[test]
fn max_candidates_bounds_repetitive_input() {
    let old = vec![0u8; 1 << 16];
    let new = vec![0u8; 1 << 15];
    let opts = PatchOptions {
        block_size: 16,
        max_candidates: 1,
    };
    let insts = diff_instructions(&old, &new, &opts).unwrap();
    assert_eq!(
        insts,
        vec![Instruction::Copy {
            offset: 0,
            len: 1 << 15
        }]
    );
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn zero_block_size_rejected() {
    let err = create_patch(b"old", b"new", 0).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{err}");
}

#[test]
fn shorter_old_gives_range_error() {
    let old = pseudo_random(4096, 9);
    let patch = create_patch(&old, &old, 256).unwrap();
    let err = apply_patch(&old[..1000], &patch).unwrap_err();
    assert!(matches!(err, Error::Range { .. }), "{err}");
    assert_eq!(last_error(), Some(err.to_string()));
}

#[test]
fn truncated_patch() {
    let old = pseudo_random(2048, 13);
    let new = pseudo_random(2048, 17);
    let patch = create_patch(&old, &new, 64).unwrap();
    let err = apply_patch(&old, &patch[..patch.len() - 1]).unwrap_err();
    assert!(matches!(err, Error::Truncated(_)), "{err}");
}

#[test]
fn last_error_survives_success() {
    let _ = apply_patch(b"", b"garbage!");
    let msg = last_error().expect("error recorded");
    assert!(msg.starts_with("invalid patch"), "{msg}");
    create_patch(b"a", b"b", 1).unwrap();
    assert_eq!(last_error(), Some(msg));
}

#[test]
fn threads_work_independently() {
    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            std::thread::spawn(move || {
                let old = pseudo_random(20_000, t + 100);
                let mut new = old.clone();
                new[t as usize * 1000] ^= 1;
                let patch = create_patch(&old, &new, 256).unwrap();
                assert_eq!(apply_patch(&old, &patch).unwrap(), new);
                if t % 2 == 0 {
                    let _ = apply_patch(&old, b"XDLT");
                    assert!(last_error().is_some());
                } else {
                    assert!(last_error().is_none());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
