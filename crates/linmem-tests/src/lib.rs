// Fixture modules compiled by build.rs (in OUT_DIR)
include!(concat!(env!("OUT_DIR"), "/mod.rs"));

use linmem::{Imports, Instance, InstanceOptions, Result};

/// Instantiate a fixture with no imports and default options.
pub fn instantiate(wasm: &[u8]) -> Result<Instance> {
    Instance::instantiate(wasm, Imports::new(), &InstanceOptions::default())
}

/// Fill `len` bytes with a deterministic pattern, then sum them back.
/// Plain-Rust baseline for the checked-access benchmark.
pub fn fill_sum_orig(buf: &mut [u8], len: usize) -> u64 {
    for (i, b) in buf.iter_mut().take(len).enumerate() {
        *b = (i % 251) as u8;
    }
    buf.iter().take(len).map(|&b| u64::from(b)).sum()
}
