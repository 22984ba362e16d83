//! Shared byte-addressable memory with wraparound addressing.
//!
//! Every CPU context runs against the same [`SharedMemory`]. Plain accesses are
//! unsynchronised byte loads and stores (`Relaxed` atomics, so concurrent
//! contexts may race without undefined behaviour). The shared-memory atomic
//! instructions go through [`SharedMemory::atomic`], which serialises them
//! behind one lock common to every context.

/// Program image loading.
pub mod image;

pub use image::LoadError;

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Size in bytes of the flat architectural address space (64 KiB).
pub const ADDRESS_SPACE_BYTES: usize = u16::MAX as usize + 1;
/// Size in bytes of a machine word.
pub const WORD_BYTES: u16 = 2;

/// Reduces any computed address modulo the memory size.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn wrap_address(addr: u32) -> usize {
    (addr as usize) % ADDRESS_SPACE_BYTES
}

/// The single memory segment shared by all CPU contexts.
pub struct SharedMemory {
    cells: Box<[AtomicU8]>,
    atomic_lock: Mutex<()>,
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemory")
            .field("len", &self.cells.len())
            .finish_non_exhaustive()
    }
}

impl SharedMemory {
    /// Allocates a zero-filled 64 KiB memory segment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: (0..ADDRESS_SPACE_BYTES).map(|_| AtomicU8::new(0)).collect(),
            atomic_lock: Mutex::new(()),
        }
    }

    /// Number of addressable bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: the segment has a fixed non-zero size.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads one byte.
    #[must_use]
    pub fn read_u8(&self, addr: impl Into<u32>) -> u8 {
        self.cells[wrap_address(addr.into())].load(Ordering::Relaxed)
    }

    /// Writes one byte.
    pub fn write_u8(&self, addr: impl Into<u32>, value: u8) {
        self.cells[wrap_address(addr.into())].store(value, Ordering::Relaxed);
    }

    /// Reads a big-endian word; the second byte wraps past the top of memory.
    #[must_use]
    pub fn read_u16_be(&self, addr: impl Into<u32>) -> u16 {
        let addr = addr.into();
        u16::from_be_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }

    /// Writes a big-endian word; the second byte wraps past the top of memory.
    pub fn write_u16_be(&self, addr: impl Into<u32>, value: u16) {
        let addr = addr.into();
        let [hi, lo] = value.to_be_bytes();
        self.write_u8(addr, hi);
        self.write_u8(addr.wrapping_add(1), lo);
    }

    /// Acquires the process-wide lock covering `loada`, `stora` and `tnset`.
    ///
    /// The lock is released when the returned section is dropped.
    #[must_use]
    pub fn atomic(&self) -> AtomicSection<'_> {
        AtomicSection {
            memory: self,
            _guard: self
                .atomic_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Copies the whole segment out, e.g. for inspection after a run.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .collect()
    }
}

/// Scoped access to memory under the shared-memory instruction lock.
pub struct AtomicSection<'a> {
    memory: &'a SharedMemory,
    _guard: MutexGuard<'a, ()>,
}

impl AtomicSection<'_> {
    /// Word load under the lock.
    #[must_use]
    pub fn read_u16_be(&self, addr: impl Into<u32>) -> u16 {
        self.memory.read_u16_be(addr)
    }

    /// Word store under the lock.
    pub fn write_u16_be(&self, addr: impl Into<u32>, value: u16) {
        self.memory.write_u16_be(addr, value);
    }

    /// Reads the word at `addr`, then overwrites it with `0x0001`.
    ///
    /// Returns the previous value. Indivisible with respect to every other
    /// holder of the lock.
    #[must_use]
    pub fn test_and_set(&self, addr: impl Into<u32>) -> u16 {
        let addr = addr.into();
        let previous = self.memory.read_u16_be(addr);
        self.memory.write_u16_be(addr, 0x0001);
        previous
    }
}
