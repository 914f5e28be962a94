//! WebAssembly linear memory — `LinearMemory`.
//!
//! The backing store is a single `Vec<u8>` whose length is always
//! `page_count * PAGE_SIZE`. Growth appends zero-filled pages; nothing ever
//! shrinks it.
//!
//! Every access funnels through `checked_range`, which validates
//! `addr + len <= active_size` before any byte is read or written. A failed
//! check returns `Trap::OutOfRangeAccess` and leaves the buffer untouched,
//! so a trapping store can never produce a partial write.

use alloc::vec::Vec;
use core::ops::Range;

use crate::{ConstructionError, GrowError, Trap, TrapResult, MAX_WASM_PAGES, PAGE_SIZE};

/// Width of a single load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessWidth {
    /// 1 byte (`*.load8_*`, `*.store8`).
    W8,
    /// 2 bytes (`*.load16_*`, `*.store16`).
    W16,
    /// 4 bytes (`i32.load`, `f32.load`, `i64.load32_*`, ...).
    W32,
    /// 8 bytes (`i64.load`, `f64.load`, ...).
    W64,
}

impl AccessWidth {
    /// Number of bytes touched by an access of this width.
    #[inline(always)]
    pub const fn bytes(self) -> usize {
        match self {
            AccessWidth::W8 => 1,
            AccessWidth::W16 => 2,
            AccessWidth::W32 => 4,
            AccessWidth::W64 => 8,
        }
    }
}

/// Effective address of a `memarg` access: dynamic base plus static offset.
///
/// Computed in 64 bits so `base + offset` never wraps back into range.
#[inline(always)]
pub fn effective_address(base: u32, offset: u64) -> u64 {
    u64::from(base).saturating_add(offset)
}

/// Growable, bounds-checked linear memory owned by a single instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearMemory {
    /// Active bytes. `bytes.len()` is always a multiple of `PAGE_SIZE`.
    bytes: Vec<u8>,
    /// Declared maximum in pages, if any. Never above `MAX_WASM_PAGES`.
    max_pages: Option<u32>,
}

impl LinearMemory {
    /// Create a memory with `initial_pages` zeroed pages and an optional
    /// upper bound on growth.
    ///
    /// # Errors
    /// - `InitialPagesExceedsMax` if `initial_pages > max_pages`
    /// - `ExceedsAddressSpace` if either count is above `MAX_WASM_PAGES` or
    ///   the byte size does not fit in `usize`
    pub fn try_new(initial_pages: u32, max_pages: Option<u32>) -> Result<Self, ConstructionError> {
        if let Some(max) = max_pages {
            if max > MAX_WASM_PAGES {
                return Err(ConstructionError::ExceedsAddressSpace { pages: max });
            }
            if initial_pages > max {
                return Err(ConstructionError::InitialPagesExceedsMax {
                    initial: initial_pages,
                    max,
                });
            }
        }
        if initial_pages > MAX_WASM_PAGES {
            return Err(ConstructionError::ExceedsAddressSpace {
                pages: initial_pages,
            });
        }
        let len = pages_to_bytes(initial_pages).ok_or(ConstructionError::ExceedsAddressSpace {
            pages: initial_pages,
        })?;
        let mut bytes = Vec::new();
        bytes.resize(len, 0);
        Ok(Self { bytes, max_pages })
    }

    /// Current number of pages.
    #[inline(always)]
    pub fn page_count(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    /// Current size in bytes (`page_count * PAGE_SIZE`).
    #[inline(always)]
    pub fn active_size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared maximum, if any.
    #[inline(always)]
    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    /// Effective growth limit: the declared maximum or the wasm32 limit.
    #[inline(always)]
    fn limit_pages(&self) -> u32 {
        self.max_pages.unwrap_or(MAX_WASM_PAGES)
    }

    /// Append `delta` zero-filled pages and return the previous page count.
    ///
    /// # Errors
    /// `GrowError::GrowLimitExceeded` if the new size would exceed the
    /// maximum, the wasm32 address space, or what the host can allocate.
    /// The memory is unchanged in that case.
    pub fn grow(&mut self, delta: u32) -> Result<u32, GrowError> {
        let old = self.page_count();
        let limit = self.limit_pages();
        let exceeded = GrowError::GrowLimitExceeded {
            current_pages: old,
            delta_pages: delta,
            max_pages: limit,
        };
        let new = old.checked_add(delta).ok_or(exceeded)?;
        if new > limit {
            return Err(exceeded);
        }
        let new_len = pages_to_bytes(new).ok_or(exceeded)?;
        let extra = new_len - self.bytes.len();
        self.bytes.try_reserve_exact(extra).map_err(|_| exceeded)?;
        self.bytes.resize(new_len, 0);
        Ok(old)
    }

    /// Wasm `memory.grow` — previous page count, or -1 on failure.
    pub fn memory_grow(&mut self, delta: u32) -> i32 {
        match self.grow(delta) {
            Ok(old) => old as i32,
            Err(_) => -1,
        }
    }

    /// Wasm `memory.size` — current page count.
    #[inline(always)]
    pub fn memory_size(&self) -> i32 {
        self.page_count() as i32
    }

    // ── Raw load/store ────────────────────────────────────────────────

    /// Return the `width` bytes at `addr` verbatim.
    #[inline]
    pub fn load(&self, addr: u64, width: AccessWidth) -> TrapResult<&[u8]> {
        let range = checked_range(self.active_size(), addr, width.bytes())?;
        Ok(&self.bytes[range])
    }

    /// Write the low `width` bytes of `value` (little-endian) at `addr`.
    #[inline]
    pub fn store(&mut self, addr: u64, width: AccessWidth, value: u64) -> TrapResult<()> {
        let n = width.bytes();
        let range = checked_range(self.active_size(), addr, n)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes()[..n]);
        Ok(())
    }

    #[inline(always)]
    fn read<const N: usize>(&self, addr: u64) -> TrapResult<[u8; N]> {
        let range = checked_range(self.active_size(), addr, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[range]);
        Ok(out)
    }

    #[inline(always)]
    fn write<const N: usize>(&mut self, addr: u64, data: [u8; N]) -> TrapResult<()> {
        let range = checked_range(self.active_size(), addr, N)?;
        self.bytes[range].copy_from_slice(&data);
        Ok(())
    }

    // ── Typed loads (little-endian) ───────────────────────────────────

    pub fn load_u8(&self, addr: u64) -> TrapResult<u8> {
        self.read::<1>(addr).map(u8::from_le_bytes)
    }

    pub fn load_i8(&self, addr: u64) -> TrapResult<i8> {
        self.read::<1>(addr).map(i8::from_le_bytes)
    }

    pub fn load_u16(&self, addr: u64) -> TrapResult<u16> {
        self.read::<2>(addr).map(u16::from_le_bytes)
    }

    pub fn load_i16(&self, addr: u64) -> TrapResult<i16> {
        self.read::<2>(addr).map(i16::from_le_bytes)
    }

    pub fn load_u32(&self, addr: u64) -> TrapResult<u32> {
        self.read::<4>(addr).map(u32::from_le_bytes)
    }

    pub fn load_i32(&self, addr: u64) -> TrapResult<i32> {
        self.read::<4>(addr).map(i32::from_le_bytes)
    }

    pub fn load_i64(&self, addr: u64) -> TrapResult<i64> {
        self.read::<8>(addr).map(i64::from_le_bytes)
    }

    pub fn load_f32(&self, addr: u64) -> TrapResult<f32> {
        self.read::<4>(addr).map(f32::from_le_bytes)
    }

    pub fn load_f64(&self, addr: u64) -> TrapResult<f64> {
        self.read::<8>(addr).map(f64::from_le_bytes)
    }

    // ── Typed stores (little-endian) ──────────────────────────────────

    pub fn store_u8(&mut self, addr: u64, value: u8) -> TrapResult<()> {
        self.write(addr, value.to_le_bytes())
    }

    pub fn store_u16(&mut self, addr: u64, value: u16) -> TrapResult<()> {
        self.write(addr, value.to_le_bytes())
    }

    pub fn store_i32(&mut self, addr: u64, value: i32) -> TrapResult<()> {
        self.write(addr, value.to_le_bytes())
    }

    pub fn store_i64(&mut self, addr: u64, value: i64) -> TrapResult<()> {
        self.write(addr, value.to_le_bytes())
    }

    pub fn store_f32(&mut self, addr: u64, value: f32) -> TrapResult<()> {
        self.write(addr, value.to_le_bytes())
    }

    pub fn store_f64(&mut self, addr: u64, value: f64) -> TrapResult<()> {
        self.write(addr, value.to_le_bytes())
    }

    // ── Bulk memory operations ────────────────────────────────────────

    /// Wasm `memory.fill` — set `len` bytes starting at `dst` to `value`.
    pub fn memory_fill(&mut self, dst: u64, value: u8, len: u64) -> TrapResult<()> {
        let range = checked_range_u64(self.active_size(), dst, len)?;
        self.bytes[range].fill(value);
        Ok(())
    }

    /// Wasm `memory.copy` — copy `len` bytes from `src` to `dst`.
    ///
    /// Semantics match `memmove`: overlapping regions are handled. Both
    /// regions are checked before anything is copied.
    pub fn memory_copy(&mut self, dst: u64, src: u64, len: u64) -> TrapResult<()> {
        let active = self.active_size();
        let src = checked_range_u64(active, src, len)?;
        let dst = checked_range_u64(active, dst, len)?;
        self.bytes.copy_within(src, dst.start);
        Ok(())
    }

    /// Copy `data` into memory at `offset` (active data segment).
    ///
    /// # Errors
    /// `OutOfRangeAccess` if `offset + data.len()` exceeds the active size.
    pub fn init_data(&mut self, offset: u64, data: &[u8]) -> TrapResult<()> {
        let range = checked_range(self.active_size(), offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Read-only access to the active memory region.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access to the active memory region.
    ///
    /// The length is fixed; only `grow` changes it.
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

fn pages_to_bytes(pages: u32) -> Option<usize> {
    usize::try_from(pages).ok()?.checked_mul(PAGE_SIZE)
}

/// Bounds-check `[addr, addr + len)` against `active_bytes`.
///
/// Returns the in-bounds index range, or `OutOfRangeAccess` on overflow or
/// out-of-range. Never panics; slicing with the returned range is in bounds.
#[inline(always)]
fn checked_range(active_bytes: usize, addr: u64, len: usize) -> TrapResult<Range<usize>> {
    let trap = Trap::OutOfRangeAccess {
        addr,
        width: len as u64,
        memory_size: active_bytes,
    };
    let start = usize::try_from(addr).map_err(|_| trap)?;
    let end = start.checked_add(len).ok_or(trap)?;
    if end > active_bytes {
        return Err(trap);
    }
    Ok(start..end)
}

/// `checked_range` for 64-bit lengths coming from bulk instructions.
#[inline(always)]
fn checked_range_u64(active_bytes: usize, addr: u64, len: u64) -> TrapResult<Range<usize>> {
    let len_usize = usize::try_from(len).map_err(|_| Trap::OutOfRangeAccess {
        addr,
        width: len,
        memory_size: active_bytes,
    })?;
    checked_range(active_bytes, addr, len_usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_page() -> LinearMemory {
        LinearMemory::try_new(1, None).unwrap()
    }

    fn is_out_of_range(result: TrapResult<impl core::fmt::Debug>) -> bool {
        matches!(result, Err(Trap::OutOfRangeAccess { .. }))
    }

    #[test]
    fn new_initializes_to_zero() {
        let mem = one_page();
        assert_eq!(mem.page_count(), 1);
        assert_eq!(mem.active_size(), PAGE_SIZE);
        assert!(mem.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_page_memory_rejects_everything() {
        let mem = LinearMemory::try_new(0, Some(0)).unwrap();
        assert_eq!(mem.active_size(), 0);
        assert!(is_out_of_range(mem.load(0, AccessWidth::W8)));
    }

    #[test]
    fn try_new_fails_if_initial_exceeds_max() {
        assert_eq!(
            LinearMemory::try_new(2, Some(1)),
            Err(ConstructionError::InitialPagesExceedsMax { initial: 2, max: 1 })
        );
    }

    #[test]
    fn try_new_fails_beyond_address_space() {
        assert_eq!(
            LinearMemory::try_new(0, Some(MAX_WASM_PAGES + 1)),
            Err(ConstructionError::ExceedsAddressSpace {
                pages: MAX_WASM_PAGES + 1
            })
        );
        assert_eq!(
            LinearMemory::try_new(MAX_WASM_PAGES + 1, None),
            Err(ConstructionError::ExceedsAddressSpace {
                pages: MAX_WASM_PAGES + 1
            })
        );
    }

    // ── grow ──

    #[test]
    fn grow_success() {
        let mut mem = LinearMemory::try_new(1, Some(4)).unwrap();
        assert_eq!(mem.grow(2), Ok(1)); // old page count
        assert_eq!(mem.page_count(), 3);
        assert_eq!(mem.active_size(), 3 * PAGE_SIZE);
    }

    #[test]
    fn grow_to_max() {
        let mut mem = LinearMemory::try_new(1, Some(4)).unwrap();
        assert_eq!(mem.grow(3), Ok(1));
        assert_eq!(mem.page_count(), 4);
    }

    #[test]
    fn grow_beyond_max_fails() {
        let mut mem = LinearMemory::try_new(1, Some(4)).unwrap();
        assert_eq!(
            mem.grow(4),
            Err(GrowError::GrowLimitExceeded {
                current_pages: 1,
                delta_pages: 4,
                max_pages: 4
            })
        );
        assert_eq!(mem.page_count(), 1); // unchanged
    }

    #[test]
    fn grow_beyond_address_space_fails_without_max() {
        let mut mem = LinearMemory::try_new(0, None).unwrap();
        assert!(mem.grow(MAX_WASM_PAGES + 1).is_err());
        assert!(mem.grow(u32::MAX).is_err());
        assert_eq!(mem.page_count(), 0);
    }

    #[test]
    fn grow_zero_is_noop() {
        let mut mem = one_page();
        assert_eq!(mem.grow(0), Ok(1));
        assert_eq!(mem.page_count(), 1);
    }

    #[test]
    fn grow_zeroes_new_pages() {
        let mut mem = LinearMemory::try_new(1, Some(2)).unwrap();
        mem.as_mut_slice().fill(0xAA);
        assert_eq!(mem.grow(1), Ok(1));
        assert!(mem.as_slice()[PAGE_SIZE..].iter().all(|&b| b == 0));
        assert!(mem.as_slice()[..PAGE_SIZE].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn memory_grow_returns_neg1_on_failure() {
        let mut mem = LinearMemory::try_new(1, Some(2)).unwrap();
        assert_eq!(mem.memory_grow(2), -1);
        assert_eq!(mem.memory_size(), 1);
        assert_eq!(mem.memory_grow(1), 1);
        assert_eq!(mem.memory_size(), 2);
    }

    // ── raw load/store ──

    #[test]
    fn single_page_boundary_scenario() {
        let mut mem = one_page();
        assert_eq!(mem.load(0, AccessWidth::W8), Ok(&[0u8][..]));

        let err = mem.load(65536, AccessWidth::W8).unwrap_err();
        assert!(alloc::format!("{err}").contains(crate::OUT_OF_RANGE));

        assert!(mem.store(65535, AccessWidth::W8, 7).is_ok());
        let before = mem.clone();
        assert!(is_out_of_range(mem.store(65536, AccessWidth::W8, 7)));
        assert_eq!(mem, before);
    }

    #[test]
    fn store_writes_low_bytes_little_endian() {
        let mut mem = one_page();
        mem.store(8, AccessWidth::W16, 0xDEAD_BEEF).unwrap();
        assert_eq!(mem.load(8, AccessWidth::W32), Ok(&[0xEF, 0xBE, 0, 0][..]));
    }

    #[test]
    fn straddling_store_writes_nothing() {
        let mut mem = one_page();
        let result = mem.store((PAGE_SIZE - 3) as u64, AccessWidth::W32, u64::MAX);
        assert_eq!(
            result,
            Err(Trap::OutOfRangeAccess {
                addr: (PAGE_SIZE - 3) as u64,
                width: 4,
                memory_size: PAGE_SIZE
            })
        );
        assert!(mem.as_slice()[PAGE_SIZE - 3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn load_every_width_at_last_valid_address() {
        let mem = one_page();
        for width in [
            AccessWidth::W8,
            AccessWidth::W16,
            AccessWidth::W32,
            AccessWidth::W64,
        ] {
            let last = (PAGE_SIZE - width.bytes()) as u64;
            assert!(mem.load(last, width).is_ok(), "{width:?}");
            assert!(is_out_of_range(mem.load(last + 1, width)), "{width:?}");
        }
    }

    // ── typed load/store ──

    #[test]
    fn store_load_i32_roundtrip() {
        let mut mem = one_page();
        mem.store_i32(100, 0x12345678).unwrap();
        assert_eq!(mem.load_i32(100), Ok(0x12345678));
    }

    #[test]
    fn load_i32_out_of_bounds() {
        let mem = one_page();
        let size = PAGE_SIZE as u64;
        assert!(mem.load_i32(size - 4).is_ok());
        assert!(is_out_of_range(mem.load_i32(size - 3)));
        assert!(is_out_of_range(mem.load_i32(size)));
    }

    #[test]
    fn load_offset_overflow() {
        let mem = one_page();
        assert!(is_out_of_range(mem.load_i32(u64::MAX)));
        assert!(is_out_of_range(mem.load_u8(u64::MAX)));
    }

    #[test]
    fn store_load_i64_roundtrip() {
        let mut mem = one_page();
        mem.store_i64(200, 0x0102030405060708i64).unwrap();
        assert_eq!(mem.load_i64(200), Ok(0x0102030405060708i64));
    }

    #[test]
    fn signed_subwidth_loads() {
        let mut mem = one_page();
        mem.store_u8(0, 0xFF).unwrap();
        mem.store_u16(2, 0x8000).unwrap();
        assert_eq!(mem.load_u8(0), Ok(0xFF));
        assert_eq!(mem.load_i8(0), Ok(-1));
        assert_eq!(mem.load_u16(2), Ok(0x8000));
        assert_eq!(mem.load_i16(2), Ok(i16::MIN));
    }

    #[test]
    fn store_load_floats() {
        let mut mem = one_page();
        mem.store_f32(300, core::f32::consts::PI).unwrap();
        mem.store_f64(400, core::f64::consts::E).unwrap();
        assert_eq!(mem.load_f32(300), Ok(core::f32::consts::PI));
        assert_eq!(mem.load_f64(400), Ok(core::f64::consts::E));
    }

    #[test]
    fn i32_is_little_endian() {
        let mut mem = one_page();
        mem.store_i32(0, 0x04030201).unwrap();
        assert_eq!(mem.load_u8(0), Ok(0x01));
        assert_eq!(mem.load_u8(1), Ok(0x02));
        assert_eq!(mem.load_u8(2), Ok(0x03));
        assert_eq!(mem.load_u8(3), Ok(0x04));
        assert_eq!(mem.load_u32(0), Ok(0x04030201));
    }

    #[test]
    fn grow_then_access_new_region() {
        let mut mem = LinearMemory::try_new(1, Some(2)).unwrap();
        let second = PAGE_SIZE as u64;
        assert!(is_out_of_range(mem.load_i32(second)));
        mem.grow(1).unwrap();
        assert_eq!(mem.load_i32(second), Ok(0));
        mem.store_i32(second, 99).unwrap();
        assert_eq!(mem.load_i32(second), Ok(99));
    }

    // ── effective address ──

    #[test]
    fn effective_address_never_wraps() {
        assert_eq!(effective_address(10, 5), 15);
        assert_eq!(
            effective_address(u32::MAX, u64::from(u32::MAX)),
            2 * u64::from(u32::MAX)
        );
        assert_eq!(effective_address(1, u64::MAX), u64::MAX);
    }

    // ── bulk ──

    #[test]
    fn memory_fill_and_bounds() {
        let mut mem = one_page();
        mem.memory_fill(10, 0x5A, 4).unwrap();
        assert_eq!(&mem.as_slice()[9..15], &[0, 0x5A, 0x5A, 0x5A, 0x5A, 0]);
        assert!(is_out_of_range(mem.memory_fill(PAGE_SIZE as u64 - 1, 1, 2)));
        assert_eq!(mem.load_u8(PAGE_SIZE as u64 - 1), Ok(0));
        // Zero-length fill at the very end is in bounds.
        assert!(mem.memory_fill(PAGE_SIZE as u64, 1, 0).is_ok());
    }

    #[test]
    fn memory_copy_overlapping() {
        let mut mem = one_page();
        mem.init_data(0, &[1, 2, 3, 4, 5]).unwrap();
        mem.memory_copy(1, 0, 4).unwrap();
        assert_eq!(&mem.as_slice()[..5], &[1, 1, 2, 3, 4]);
    }

    #[test]
    fn memory_copy_checks_both_ranges() {
        let mut mem = one_page();
        mem.init_data(0, &[9; 8]).unwrap();
        let end = PAGE_SIZE as u64;
        assert!(is_out_of_range(mem.memory_copy(end - 4, 0, 8)));
        assert!(is_out_of_range(mem.memory_copy(0, end - 4, 8)));
        assert!(mem.as_slice()[PAGE_SIZE - 8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn init_data_out_of_bounds() {
        let mut mem = one_page();
        let data = [0u8; 10];
        assert!(is_out_of_range(mem.init_data(PAGE_SIZE as u64 - 5, &data)));
    }

    #[test]
    fn init_data_at_boundary() {
        let mut mem = one_page();
        assert!(mem.init_data(PAGE_SIZE as u64 - 4, &[42u8; 4]).is_ok());
        assert_eq!(mem.load_u8(PAGE_SIZE as u64 - 1), Ok(42));
    }

    #[test]
    fn init_data_empty_slice_is_noop() {
        let mut mem = one_page();
        assert!(mem.init_data(0, &[]).is_ok());
    }
}

// ── Kani Formal Verification Proofs ──────────────────────────────────────
//
// Bounded model checking of the bounds-check invariants.
// Run with: cargo kani -p linmem-runtime

#[cfg(kani)]
mod proofs {
    use super::*;

    /// A successful load implies `addr + width <= active_size`.
    #[kani::proof]
    #[kani::unwind(2)]
    fn load_success_implies_valid_range() {
        let mem = LinearMemory::try_new(1, Some(1)).unwrap();
        let addr: u64 = kani::any();
        if mem.load_i32(addr).is_ok() {
            let end = addr.checked_add(4);
            kani::assert(end.is_some(), "successful load offset does not overflow");
            kani::assert(
                end.unwrap() <= mem.active_size() as u64,
                "successful load is within bounds",
            );
        }
    }

    /// A failed store leaves every byte unchanged.
    #[kani::proof]
    #[kani::unwind(2)]
    fn failed_store_leaves_memory_unchanged() {
        let mut mem = LinearMemory::try_new(1, Some(1)).unwrap();
        let addr: u64 = kani::any();
        kani::assume(addr > (PAGE_SIZE - 8) as u64);
        let value: i64 = kani::any();
        let probe = (PAGE_SIZE - 1) as u64;
        if mem.store_i64(addr, value).is_err() {
            kani::assert(mem.load_u8(probe) == Ok(0), "no partial write");
        }
    }

    /// grow never exceeds the declared maximum and failure changes nothing.
    #[kani::proof]
    #[kani::unwind(2)]
    fn grow_respects_max_pages() {
        let mut mem = LinearMemory::try_new(0, Some(1)).unwrap();
        let delta: u32 = kani::any();
        let old = mem.page_count();
        match mem.grow(delta) {
            Ok(prev) => {
                kani::assert(prev == old, "grow returns old page count");
                kani::assert(mem.page_count() <= 1, "page_count within max");
            }
            Err(_) => kani::assert(mem.page_count() == old, "failed grow is a no-op"),
        }
    }

    /// Store followed by load at the same address returns the stored value.
    #[kani::proof]
    #[kani::unwind(2)]
    fn store_load_roundtrip_u8() {
        let mut mem = LinearMemory::try_new(1, Some(1)).unwrap();
        let addr: u64 = kani::any();
        let value: u8 = kani::any();
        if mem.store_u8(addr, value).is_ok() {
            kani::assert(mem.load_u8(addr) == Ok(value), "u8 roundtrip");
        }
    }
}
