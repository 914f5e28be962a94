//! `linmem-runtime` — bounds-checked linear memory for a sandboxed Wasm VM.
//!
//! This crate is `#![no_std]` and only needs `alloc`. It provides:
//! - `LinearMemory`, a growable page-granular byte buffer whose every
//!   load/store is validated against the current size
//! - `Trap` / `TrapResult<T>` for accesses that must abort the current call
//! - `GrowError` and `ConstructionError` for the recoverable failure paths

#![no_std]

extern crate alloc;

use core::fmt;

/// WebAssembly page size: 64 KiB.
pub const PAGE_SIZE: usize = 65536;

/// Largest page count addressable by a 32-bit Wasm memory (4 GiB).
pub const MAX_WASM_PAGES: u32 = 65536;

/// Substring carried by every out-of-bounds trap message.
///
/// Embedders and conformance harnesses match on this text, so it is part of
/// the observable contract of [`Trap::OutOfRangeAccess`].
pub const OUT_OF_RANGE: &str = "out of range";

mod memory;
pub use memory::{effective_address, AccessWidth, LinearMemory};

/// Execution traps — no panics, no unwinding.
///
/// A trap aborts the operation that raised it and leaves memory untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// `addr + width` exceeds the current memory size (or overflows).
    OutOfRangeAccess {
        addr: u64,
        width: u64,
        memory_size: usize,
    },
    /// `unreachable` instruction executed.
    Unreachable,
}

/// Result type for trapping operations — `Result<T, Trap>`.
pub type TrapResult<T> = Result<T, Trap>;

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::OutOfRangeAccess {
                addr,
                width,
                memory_size,
            } => write!(
                f,
                "memory access {OUT_OF_RANGE}: address {addr} + {width} byte(s) \
                 exceeds memory size {memory_size}"
            ),
            Trap::Unreachable => f.write_str("unreachable executed"),
        }
    }
}

impl core::error::Error for Trap {}

/// `grow` refused to extend the memory. The memory is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowError {
    /// `current_pages + delta_pages` exceeds the declared maximum, the wasm32
    /// address space, or the host's `usize`.
    GrowLimitExceeded {
        current_pages: u32,
        delta_pages: u32,
        max_pages: u32,
    },
}

impl fmt::Display for GrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowError::GrowLimitExceeded {
                current_pages,
                delta_pages,
                max_pages,
            } => write!(
                f,
                "cannot grow memory from {current_pages} by {delta_pages} page(s): \
                 limit is {max_pages} page(s)"
            ),
        }
    }
}

impl core::error::Error for GrowError {}

/// Errors that occur while constructing a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// Initial pages exceeds the declared maximum.
    InitialPagesExceedsMax { initial: u32, max: u32 },
    /// Initial pages (or the declared maximum) exceeds `MAX_WASM_PAGES`.
    ExceedsAddressSpace { pages: u32 },
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionError::InitialPagesExceedsMax { initial, max } => write!(
                f,
                "initial memory size {initial} page(s) exceeds maximum {max} page(s)"
            ),
            ConstructionError::ExceedsAddressSpace { pages } => write!(
                f,
                "{pages} page(s) exceeds the wasm32 limit of {MAX_WASM_PAGES} pages"
            ),
        }
    }
}

impl core::error::Error for ConstructionError {}
