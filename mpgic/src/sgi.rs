// SPDX-License-Identifier: MPL-2.0

//! Software-generated interrupts.
//!
//! SGIs (IDs 0-15) are the controller's inter-processor signalling
//! mechanism: one store to the SGI register raises the chosen ID on the
//! CPUs a target filter selects. The filter either names the targets
//! explicitly or lets the hardware derive them from the requesting CPU
//! (everyone else, or the requester itself), so the two derived forms carry
//! no caller-supplied mask at all.

use bit_field::BitField;

use crate::{
    cpu::CpuMask,
    io::RegisterBus,
    prelude::*,
    regs,
};

/// Which CPUs a software-generated interrupt is delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SgiTarget {
    /// The CPUs named by the mask. The mask must be non-empty and within
    /// the controller's reported CPU count; [`Gic::send_sgi`] validates it.
    ///
    /// [`Gic::send_sgi`]: crate::irq::Gic::send_sgi
    List(CpuMask),
    /// Every CPU except the requesting one. The hardware computes the
    /// complement of the sender; no mask is involved.
    AllExcludingSelf,
    /// The requesting CPU only.
    Myself,
}

/// A software-generated interrupt request: an SGI ID and a target filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SgiRequest {
    id: u32,
    target: SgiTarget,
}

impl SgiRequest {
    /// Builds a request for SGI `id`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidConfiguration`] if `id` is not an SGI ID
    /// (0-15).
    pub fn new(id: u32, target: SgiTarget) -> Result<Self> {
        if id >= regs::SGI_COUNT {
            return Err(Error::InvalidConfiguration);
        }
        Ok(Self { id, target })
    }

    /// The SGI ID to raise.
    pub fn id(self) -> u32 {
        self.id
    }

    /// The target filter.
    pub fn target(self) -> SgiTarget {
        self.target
    }

    /// Packs the request into the SGI register format.
    pub(crate) fn encode(self) -> u32 {
        let (filter, targets) = match self.target {
            SgiTarget::List(mask) => (0b00, mask.bits() as u32),
            SgiTarget::AllExcludingSelf => (0b01, 0),
            SgiTarget::Myself => (0b10, 0),
        };
        let mut raw = 0u32;
        raw.set_bits(regs::SGIR_INTID, self.id);
        raw.set_bits(regs::SGIR_TARGETS, targets);
        raw.set_bits(regs::SGIR_FILTER, filter);
        raw
    }
}

/// Issues a software-generated interrupt through the distributor block at
/// `bus`. One self-contained store, preceded by a data barrier so that
/// memory written by the requester is visible to the targets before the
/// interrupt is. Takes no lock; usable from interrupt context.
pub(crate) fn send<B: RegisterBus>(bus: &B, request: SgiRequest) {
    crate::io::data_barrier();
    bus.write(regs::GICD_SGIR, request.encode());
}
