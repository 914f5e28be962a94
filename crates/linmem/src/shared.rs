//! Thread-safe handle to a linear memory.
//!
//! `grow` changes the valid address range, so each load, store, and grow
//! holds the lock across both the bounds check and the data access.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use linmem_runtime::{AccessWidth, LinearMemory};

/// A `LinearMemory` that can be cloned across threads.
#[derive(Debug, Clone)]
pub struct SharedMemory {
    inner: Arc<Mutex<LinearMemory>>,
}

impl SharedMemory {
    pub fn new(memory: LinearMemory) -> Self {
        Self {
            inner: Arc::new(Mutex::new(memory)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LinearMemory>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("shared memory lock poisoned"))
    }

    /// Run `f` with exclusive access to the memory.
    pub fn with<R>(&self, f: impl FnOnce(&mut LinearMemory) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Bounds-checked load; a trap is returned as `linmem_runtime::Trap`.
    pub fn load(&self, addr: u64, width: AccessWidth) -> Result<Vec<u8>> {
        let guard = self.lock()?;
        Ok(guard.load(addr, width)?.to_vec())
    }

    /// Bounds-checked store; a trap is returned as `linmem_runtime::Trap`.
    pub fn store(&self, addr: u64, width: AccessWidth, value: u64) -> Result<()> {
        self.lock()?.store(addr, width, value)?;
        Ok(())
    }

    /// Grow by `delta` pages; a refusal is returned as `linmem_runtime::GrowError`.
    pub fn grow(&self, delta: u32) -> Result<u32> {
        Ok(self.lock()?.grow(delta)?)
    }

    pub fn page_count(&self) -> Result<u32> {
        Ok(self.lock()?.page_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linmem_runtime::{GrowError, Trap, PAGE_SIZE};
    use std::thread;

    #[test]
    fn concurrent_growth_and_stores() {
        let shared = SharedMemory::new(LinearMemory::try_new(1, Some(8)).unwrap());

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let mem = shared.clone();
                thread::spawn(move || {
                    mem.grow(1).unwrap();
                    mem.store(i * 8, AccessWidth::W64, i).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.page_count().unwrap(), 5);
        for i in 0..4u64 {
            let bytes = shared.load(i * 8, AccessWidth::W64).unwrap();
            assert_eq!(bytes, i.to_le_bytes());
        }
    }

    #[test]
    fn traps_and_grow_errors_are_downcastable() {
        let shared = SharedMemory::new(LinearMemory::try_new(1, Some(1)).unwrap());

        let err = shared
            .store(PAGE_SIZE as u64, AccessWidth::W8, 1)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Trap>(),
            Some(Trap::OutOfRangeAccess { .. })
        ));

        let err = shared.grow(1).unwrap_err();
        assert!(err.downcast_ref::<GrowError>().is_some());
        assert_eq!(shared.page_count().unwrap(), 1);
    }

    #[test]
    fn with_gives_exclusive_access() {
        let shared = SharedMemory::new(LinearMemory::try_new(1, None).unwrap());
        shared.with(|mem| mem.store_i32(0, -5)).unwrap().unwrap();
        assert_eq!(shared.with(|mem| mem.load_i32(0)).unwrap(), Ok(-5));
    }
}
