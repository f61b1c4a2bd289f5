// SPDX-License-Identifier: MPL-2.0

//! A RAM-backed register file standing in for the hardware in tests.
//!
//! `SimBus` serves reads from plain storage (so read-modify-write sequences
//! behave like real registers), lets tests script the value of a read (the
//! acknowledge register becomes a queue of pending claims), and records
//! every write, which is how the write-1-to-set/clear registers and the
//! end-of-interrupt traffic are asserted on.

use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use spin::Mutex;

use crate::io::RegisterBus;
use crate::regs;

pub(crate) struct SimBus {
    words: Mutex<BTreeMap<usize, u32>>,
    scripted: Mutex<BTreeMap<usize, VecDeque<u32>>>,
    writes: Mutex<Vec<(usize, u32)>>,
}

impl SimBus {
    pub(crate) fn new() -> Self {
        Self {
            words: Mutex::new(BTreeMap::new()),
            scripted: Mutex::new(BTreeMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Sets the stored value of a register without logging a write.
    pub(crate) fn preset(&self, offset: usize, value: u32) {
        self.words.lock().insert(offset, value);
    }

    /// Queues `value` to be returned by the next read of `offset`, ahead of
    /// the stored value.
    pub(crate) fn push_read(&self, offset: usize, value: u32) {
        self.scripted
            .lock()
            .entry(offset)
            .or_default()
            .push_back(value);
    }

    /// The stored value of a register (0 if never written).
    pub(crate) fn word(&self, offset: usize) -> u32 {
        self.words.lock().get(&offset).copied().unwrap_or(0)
    }

    /// Every write issued so far, in order.
    pub(crate) fn writes(&self) -> Vec<(usize, u32)> {
        self.writes.lock().clone()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    pub(crate) fn last_write(&self) -> Option<(usize, u32)> {
        self.writes.lock().last().copied()
    }

    /// Writes to `offset` issued so far, in order.
    pub(crate) fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.writes
            .lock()
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl RegisterBus for SimBus {
    fn read(&self, offset: usize) -> u32 {
        if let Some(queue) = self.scripted.lock().get_mut(&offset) {
            if let Some(value) = queue.pop_front() {
                return value;
            }
        }
        self.word(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        self.writes.lock().push((offset, value));
        self.words.lock().insert(offset, value);
    }
}

/// A distributor block whose type register reports the given geometry.
pub(crate) fn dist_bus(lines: u32, cpus: u32) -> SimBus {
    assert_eq!(lines % 32, 0);
    let bus = SimBus::new();
    bus.preset(regs::GICD_TYPER, (lines / 32 - 1) | ((cpus - 1) << 5));
    bus
}

/// A CPU-interface block with nothing pending: acknowledge and the
/// highest-pending peek both report the spurious ID until a claim is
/// scripted with [`SimBus::push_read`].
pub(crate) fn cpu_bus() -> SimBus {
    let bus = SimBus::new();
    bus.preset(regs::GICC_IAR, regs::SPURIOUS_INTID);
    bus.preset(regs::GICC_HPPIR, regs::SPURIOUS_INTID);
    bus
}
