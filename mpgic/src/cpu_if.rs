// SPDX-License-Identifier: MPL-2.0

//! The banked CPU-interface block.
//!
//! Each CPU sees its own interface at the same physical address; every
//! access here is implicitly scoped to the CPU executing it. The interface
//! filters what the distributor forwards (by priority mask, and by the
//! preemption grouping the binary point selects) and runs the
//! claim/complete handshake: an interrupt moves from pending to active when
//! its ID is read from the acknowledge register, and back to inactive when
//! the same ID (and, for SGIs, the same source CPU) is written to the
//! end-of-interrupt register. Matched claim/complete pairs are the caller's
//! obligation; [`Gic::dispatch`] tracks them in software.
//!
//! [`Gic::dispatch`]: crate::irq::Gic::dispatch

use bit_field::BitField;

use crate::{
    cpu::CpuId,
    io::RegisterBus,
    regs::{self, CpuIfCtrl},
};

/// A claimed pending interrupt, as read from the acknowledge register.
///
/// The raw register word is retained so that completion writes back exactly
/// what was claimed: the ID, and the source CPU field that the hardware
/// uses to demultiplex SGI completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Claim {
    raw: u32,
}

impl Claim {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    /// The claimed interrupt ID.
    pub fn line(self) -> u32 {
        self.raw.get_bits(regs::INTID)
    }

    /// The CPU that requested the interrupt, for SGIs.
    pub fn source_cpu(self) -> Option<CpuId> {
        if self.line() < regs::SGI_COUNT {
            Some(CpuId::new(self.raw.get_bits(regs::INTID_SOURCE_CPU)))
        } else {
            None
        }
    }

    pub(crate) fn eoi_value(self) -> u32 {
        self.raw & regs::EOI_FIELDS_MASK
    }
}

/// How many priority bits take part in preemption decisions.
///
/// Bits excluded from the comparison still order pending interrupts against
/// each other, but no longer let one interrupt preempt another that is
/// already active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum BinaryPoint {
    /// All implemented priority bits are compared for preemption.
    AllBits = 3,
    /// Priority bits \[7:5\] are compared.
    Bits5To7 = 4,
    /// Priority bits \[7:6\] are compared.
    Bits6To7 = 5,
    /// Only priority bit \[7\] is compared.
    Bit7Only = 6,
    /// No preemption is performed.
    NoPreemption = 7,
}

/// Driver for the calling CPU's interface block.
pub struct CpuInterface<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> CpuInterface<B> {
    /// Creates the driver over the banked interface block at `bus`.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Brings the calling CPU's interface up: admit every priority level,
    /// compare all priority bits for preemption, and enable signalling.
    pub fn init(&self) {
        self.set_priority_mask(u8::MAX);
        self.set_binary_point(BinaryPoint::AllBits);
        self.enable();
    }

    /// Enables interrupt signalling to the calling CPU.
    pub fn enable(&self) {
        self.bus.write(regs::GICC_CTLR, CpuIfCtrl::ENABLE.bits());
    }

    /// Disables interrupt signalling to the calling CPU.
    pub fn disable(&self) {
        self.bus.write(regs::GICC_CTLR, 0);
    }

    /// Sets the priority mask: only interrupts strictly more urgent (lower
    /// value) than `mask` are signalled to this CPU. Truncated to the
    /// implemented priority bits.
    pub fn set_priority_mask(&self, mask: u8) {
        self.bus
            .write(regs::GICC_PMR, regs::implemented_priority(mask) as u32);
    }

    /// Selects the preemption grouping.
    pub fn set_binary_point(&self, bp: BinaryPoint) {
        self.bus.write(regs::GICC_BPR, bp as u32);
    }

    /// Claims the highest-priority pending interrupt, moving it to the
    /// active state. Returns `None` when nothing is pending for this CPU;
    /// a spurious acknowledge is a documented empty result, not an error.
    pub fn acknowledge(&self) -> Option<Claim> {
        let raw = self.bus.read(regs::GICC_IAR);
        if raw.get_bits(regs::INTID) == regs::SPURIOUS_INTID {
            return None;
        }
        Some(Claim::from_raw(raw))
    }

    /// Completes a claimed interrupt, returning it to the inactive state.
    ///
    /// Both the interrupt ID and the SGI source-CPU field of the original
    /// claim are written back; the hardware matches completion on both.
    pub fn end_of_interrupt(&self, claim: Claim) {
        self.bus.write(regs::GICC_EOIR, claim.eoi_value());
    }

    /// The priority of the interrupt currently active on this CPU, or the
    /// idle priority if none is.
    pub fn running_priority(&self) -> u8 {
        self.bus.read(regs::GICC_RPR) as u8
    }

    /// Peeks at the highest-priority pending interrupt without claiming it.
    /// For diagnostics; the pending state is not consumed.
    pub fn highest_pending(&self) -> Option<Claim> {
        let raw = self.bus.read(regs::GICC_HPPIR);
        if raw.get_bits(regs::INTID) == regs::SPURIOUS_INTID {
            return None;
        }
        Some(Claim::from_raw(raw))
    }

    /// The CPU interface implementer identification register.
    pub fn implementer_id(&self) -> u32 {
        self.bus.read(regs::GICC_IIDR)
    }
}
