//! Compiles every `data/wat/*.wat` fixture to a `.wasm` file in `OUT_DIR`
//! and generates `mod.rs` exposing each one as a byte constant.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").context("OUT_DIR not set")?);
    let wat_dir = Path::new("data/wat");
    println!("cargo:rerun-if-changed={}", wat_dir.display());

    let mut entries: Vec<PathBuf> = fs::read_dir(wat_dir)
        .with_context(|| format!("reading {}", wat_dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.retain(|p| p.extension().is_some_and(|ext| ext == "wat"));
    entries.sort();

    let mut module_rs = String::new();
    for path in &entries {
        println!("cargo:rerun-if-changed={}", path.display());
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("bad fixture name {}", path.display()))?;
        let wasm = wat::parse_file(path).with_context(|| format!("compiling {}", path.display()))?;
        let wasm_name = format!("{stem}.wasm");
        fs::write(out_dir.join(&wasm_name), wasm)?;

        writeln!(
            module_rs,
            "/// `data/wat/{stem}.wat` compiled to binary.\n\
             pub const {}: &[u8] = include_bytes!(concat!(env!(\"OUT_DIR\"), \"/{wasm_name}\"));",
            stem.to_uppercase()
        )?;
    }

    fs::write(out_dir.join("mod.rs"), module_rs)?;
    Ok(())
}
