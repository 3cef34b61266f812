#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the block size, the rest splits into old and new.
    let block_size = u32::from(data[0] % 64) + 1;
    let payload = &data[1..];
    let split = payload.len() / 2;
    let (old, new) = payload.split_at(split);

    let patch = xdelta::create_patch(old, new, block_size).unwrap();
    let rebuilt = xdelta::apply_patch(old, &patch).unwrap();
    assert_eq!(rebuilt, new);
});
