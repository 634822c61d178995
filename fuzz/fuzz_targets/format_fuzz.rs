//! Format fuzz target: feed arbitrary bytes as a format string, then unpack a zero buffer
//! through scratch fields. Validation, iteration and unpacking must never panic.
//! Build with: cargo fuzz run format_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let format = match structpack::Format::new(s) {
        Ok(f) => f,
        Err(_) => return,
    };
    // keep runaway repeat counts out of the per-field passes
    if format.field_count() > 4096 || format.packed_size() > 1 << 16 {
        return;
    }
    for d in format.descriptors() {
        if d.is_err() {
            return;
        }
    }
    let buf = vec![0u8; format.packed_size().max(1)];
    let mut storage = vec![vec![0u8; 64]; format.field_count()];
    let mut fields: Vec<&mut [u8]> = storage.iter_mut().map(|v| v.as_mut_slice()).collect();
    let _ = format.unpack_ptr(format.field_count(), &mut fields, &buf);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run format_fuzz");
}
