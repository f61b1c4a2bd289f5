// SPDX-License-Identifier: MPL-2.0

//! Word-granular access to memory-mapped register blocks.
//!
//! Every register this crate touches is a 32-bit word at a fixed byte offset
//! within one of the two GIC blocks, so the whole hardware dependency
//! reduces to [`RegisterBus`]: read a word, write a word, atomically with
//! respect to the issuing CPU. [`Mmio`] implements it over a mapped block;
//! tests substitute a RAM-backed register file.

use core::ptr::NonNull;

use cfg_if::cfg_if;
use volatile::{access::ReadOnly, VolatileRef};

/// Word-granular access to one memory-mapped register block.
///
/// Offsets are in bytes from the block base and must be word-aligned.
/// Implementations perform no caching: every `read` observes the device
/// state at call time, every `write` is a single non-tearing store.
pub trait RegisterBus: Send + Sync {
    /// Reads the 32-bit register at `offset`.
    fn read(&self, offset: usize) -> u32;

    /// Writes the 32-bit register at `offset`.
    fn write(&self, offset: usize, value: u32);
}

impl<B: RegisterBus> RegisterBus for &B {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// A [`RegisterBus`] over a mapped MMIO register block.
#[derive(Clone, Debug)]
pub struct Mmio {
    base: NonNull<u32>,
    size: usize,
}

// SAFETY: `Mmio` holds no CPU-local state; the registers it points at are
// shared by design and every access is a single volatile word operation.
unsafe impl Send for Mmio {}
// SAFETY: As above; `read`/`write` take `&self` and do not alias local data.
unsafe impl Sync for Mmio {}

impl Mmio {
    /// Creates a bus over the `size` bytes of registers mapped at `base`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `base..base + size` is a valid,
    /// device-type mapping of the intended register block for the lifetime
    /// of the returned value, and that accessing it has no side effects
    /// beyond those of the device itself.
    pub unsafe fn new(base: usize, size: usize) -> Self {
        Self {
            base: NonNull::new(base as *mut u32).unwrap(),
            size,
        }
    }

    fn word_ptr(&self, offset: usize) -> NonNull<u32> {
        debug_assert_eq!(offset % 4, 0);
        assert!(offset + 4 <= self.size);
        // SAFETY: The offset is in bounds of the mapping the constructor
        // took responsibility for.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().byte_add(offset)) }
    }
}

impl RegisterBus for Mmio {
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `word_ptr` yields a valid register inside the mapped block.
        let reg = unsafe { VolatileRef::new_restricted(ReadOnly, self.word_ptr(offset)) };
        reg.as_ptr().read()
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: `word_ptr` yields a valid register inside the mapped block.
        let mut reg = unsafe { VolatileRef::new(self.word_ptr(offset)) };
        reg.as_mut_ptr().write(value);
    }
}

cfg_if! {
    if #[cfg(any(target_arch = "aarch64", target_arch = "arm"))] {
        /// Drains outstanding stores before a cross-CPU signalling write.
        pub(crate) fn data_barrier() {
            // SAFETY: A data synchronization barrier has no software-visible
            // state beyond ordering.
            unsafe { core::arch::asm!("dsb ish", options(nostack, preserves_flags)) };
        }
    } else {
        /// Drains outstanding stores before a cross-CPU signalling write.
        pub(crate) fn data_barrier() {}
    }
}
