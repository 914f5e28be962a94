//! linmem — host side of a bounds-checked WebAssembly linear memory.
//!
//! This crate loads modules restricted to the memory-access subset of Wasm,
//! instantiates them over a `linmem_runtime::LinearMemory`, exposes their
//! exports by name, and runs the bounds-checking conformance scenario.

pub mod exec;
pub mod harness;
pub mod instance;
pub mod parser;
pub mod shared;
pub mod value;

use std::path::Path;

// Re-export key types for convenience
pub use anyhow::{Context, Result};
pub use instance::{Export, FuncHandle, Imports, Instance, InstanceOptions};
pub use linmem_runtime::{
    AccessWidth, GrowError, LinearMemory, Trap, MAX_WASM_PAGES, OUT_OF_RANGE, PAGE_SIZE,
};
pub use shared::SharedMemory;
pub use value::{Value, ValueType};

/// Read a module from disk.
///
/// Accepts a binary `.wasm` file or WebAssembly text (`.wat`), which is
/// compiled to binary first.
pub fn load_module_bytes(path: &Path) -> Result<Vec<u8>> {
    wat::parse_file(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Load and instantiate a module file with an empty import object.
pub fn instantiate_file(path: &Path, options: &InstanceOptions) -> Result<Instance> {
    let wasm_bytes = load_module_bytes(path)?;
    Instance::instantiate(&wasm_bytes, Imports::new(), options)
        .with_context(|| format!("failed to instantiate {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("linmem-{}-{name}", std::process::id()))
    }

    #[test]
    fn loads_text_and_binary_modules() {
        let wat = r#"(module (memory 1) (func (export "size") (result i32) memory.size))"#;
        let text_path = temp_path("size.wat");
        let bin_path = temp_path("size.wasm");
        fs::write(&text_path, wat).unwrap();
        fs::write(&bin_path, wat::parse_str(wat).unwrap()).unwrap();

        for path in [&text_path, &bin_path] {
            let mut instance = instantiate_file(path, &InstanceOptions::default()).unwrap();
            assert_eq!(instance.call("size", &[]).unwrap(), vec![Value::I32(1)]);
        }

        let _ = fs::remove_file(text_path);
        let _ = fs::remove_file(bin_path);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_module_bytes(Path::new("/nonexistent/array.wasm")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/array.wasm"));
    }
}
