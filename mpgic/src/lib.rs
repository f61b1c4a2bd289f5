// SPDX-License-Identifier: MPL-2.0

//! GIC distributor and CPU-interface management for ARM SMP kernels.
//!
//! The Generic Interrupt Controller of a multiprocessor ARM core complex is
//! split into two register blocks: the **distributor**, shared by every CPU,
//! which routes, enables, and prioritizes interrupt lines; and the **CPU
//! interface**, banked per CPU at a single address, through which each CPU
//! claims and completes the interrupts delivered to it. This crate drives
//! both blocks and layers the pieces a kernel's interrupt subsystem needs on
//! top of them:
//!
//! - [`Distributor`]: line enable/disable, priority, CPU targeting,
//!   trigger configuration, and global control;
//! - [`CpuInterface`]: priority masking, preemption grouping,
//!   acknowledge/end-of-interrupt, and pending introspection;
//! - [`SgiRequest`]: directed inter-processor interrupts;
//! - [`Gic`]: the facade tying them together, with a handler table, the
//!   trap-entry `dispatch` path, and serialized configuration.
//!
//! # Hardware access
//!
//! All register traffic goes through the word-granular [`RegisterBus`]
//! trait. On hardware this is [`Mmio`] over the mapped blocks; tests drive
//! the same code against a simulated register file, so nothing in this crate
//! requires a target machine.
//!
//! # Locking discipline
//!
//! Most distributor registers pack the state of several interrupt lines into
//! one 32-bit word, so every configuration write is a read-modify-write that
//! must not race with another CPU configuring a neighbouring line. [`Gic`]
//! serializes all configuration behind one spin lock. The hot paths,
//! `dispatch` and `send_sgi`, never take that lock: the CPU interface is
//! banked per CPU, and the software-generated-interrupt register is a single
//! self-contained store.
//!
//! # Example
//!
//! ```no_run
//! use mpgic::{CpuId, CpuMask, Gic, Mmio};
//!
//! // Map the distributor and the banked CPU-interface block of the platform.
//! let dist = unsafe { Mmio::new(0xf8f0_1000, 0x1000) };
//! let cpu = unsafe { Mmio::new(0xf8f0_0100, 0x100) };
//!
//! let gic = Gic::new(dist, cpu);
//! gic.init();
//! gic.init_current_cpu();
//!
//! fn on_timer(_claim: &mpgic::Claim) { /* ... */ }
//! gic.attach(34, on_timer).unwrap();
//! gic.set_priority(34, 0x80).unwrap();
//! gic.set_affinity(34, CpuMask::CPU0).unwrap();
//! gic.enable(34).unwrap();
//!
//! // From the IRQ trap vector:
//! gic.dispatch(CpuId::new(0));
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod cpu;
pub mod cpu_if;
pub mod dist;
mod error;
pub mod io;
pub mod irq;
pub mod prelude;
pub mod regs;
pub mod sgi;

#[cfg(test)]
mod sim;

pub use self::{
    cpu::{CpuId, CpuMask},
    cpu_if::{BinaryPoint, Claim, CpuInterface},
    dist::{Distributor, InterruptGroup, Model, Trigger},
    error::Error,
    io::{Mmio, RegisterBus},
    irq::{Gic, IrqHandler},
    prelude::Result,
    sgi::{SgiRequest, SgiTarget},
};
