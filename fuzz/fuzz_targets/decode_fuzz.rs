#![no_main]
use libfuzzer_sys::fuzz_target;
use xdelta::apply::PatchApplier;

fuzz_target!(|data: &[u8]| {
    // Arbitrary patch bytes must only ever produce errors, never panics.
    let _ = xdelta::apply_patch(&[], data);

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (old, patch) = data.split_at(split);
        let in_memory = xdelta::apply_patch(old, patch);

        let mut out = Vec::new();
        let streamed = PatchApplier::new(patch).and_then(|mut a| a.apply_to(old, &mut out));

        // Both paths accept exactly the same patches, with the same output.
        assert_eq!(in_memory.is_ok(), streamed.is_ok());
        if let Ok(new) = in_memory {
            assert_eq!(new, out);
        }
    }
});
