// SPDX-License-Identifier: MPL-2.0

//! The interrupt driver facade.
//!
//! [`Gic`] is what a kernel's interrupt subsystem talks to: it owns the
//! distributor and the calling CPU's interface, a fixed-size handler table,
//! and the per-CPU bookkeeping that keeps acknowledge and end-of-interrupt
//! in matched pairs. Configuration calls (attach, enable, priority,
//! affinity) run in task context and serialize behind one spin lock;
//! [`Gic::dispatch`] and [`Gic::send_sgi`] run in interrupt context and
//! never take it.
//!
//! Handler slots hold plain function pointers, so a slot update is one
//! short critical section and dispatch copies the pointer out before
//! calling it: no allocation, and no lock held across a handler.

use log::warn;
use spin::Mutex;

use crate::{
    cpu::{CpuId, CpuMask},
    cpu_if::{Claim, CpuInterface},
    dist::{Distributor, Model, Trigger},
    io::RegisterBus,
    prelude::*,
    regs,
    sgi::{self, SgiRequest, SgiTarget},
};


/// A top-half interrupt handler.
///
/// Handlers run in interrupt context with no locks held; they receive the
/// claim so SGI handlers can see the requesting CPU.
pub type IrqHandler = fn(&Claim);

/// Outstanding claims a CPU can have is bounded by its preemption depth:
/// with four implemented priority bits there are at most 16 levels.
const CLAIM_DEPTH: usize = 1 << regs::PRIORITY_BITS;

/// Claims acknowledged on one CPU and not yet completed, newest on top.
struct ClaimStack {
    lines: [u32; CLAIM_DEPTH],
    depth: usize,
}

impl ClaimStack {
    const fn new() -> Self {
        Self {
            lines: [0; CLAIM_DEPTH],
            depth: 0,
        }
    }

    fn push(&mut self, line: u32) -> bool {
        if self.depth == CLAIM_DEPTH {
            return false;
        }
        self.lines[self.depth] = line;
        self.depth += 1;
        true
    }

    /// Completes the newest claim if it is `line`. A mismatch leaves the
    /// stack untouched, so claims that are genuinely outstanding still
    /// match their own completion later.
    fn pop_expecting(&mut self, line: u32) -> bool {
        if self.depth == 0 || self.lines[self.depth - 1] != line {
            return false;
        }
        self.depth -= 1;
        true
    }
}

/// The GIC driver facade.
///
/// One instance manages the whole controller for all CPUs. CPU identity is
/// always passed explicitly (there is no hidden current-CPU state), which
/// keeps the driver usable from any context and testable by simulation.
pub struct Gic<B: RegisterBus> {
    dist: Mutex<Distributor<B>>,
    sgi_bus: B,
    cpu_if: CpuInterface<B>,
    handlers: [Mutex<Option<IrqHandler>>; regs::MAX_LINES as usize],
    claims: [Mutex<ClaimStack>; regs::MAX_CPUS as usize],
    lines: u32,
    cpus: u32,
}

impl<B: RegisterBus + Clone> Gic<B> {
    /// Probes the controller over its two register blocks: the shared
    /// distributor at `dist_bus` and the banked CPU interface at `cpu_bus`.
    pub fn new(dist_bus: B, cpu_bus: B) -> Self {
        let dist = Distributor::new(dist_bus.clone());
        let lines = dist.lines();
        let cpus = dist.cpus();

        Self {
            dist: Mutex::new(dist),
            sgi_bus: dist_bus,
            cpu_if: CpuInterface::new(cpu_bus),
            handlers: core::array::from_fn(|_| Mutex::new(None)),
            claims: core::array::from_fn(|_| Mutex::new(ClaimStack::new())),
            lines,
            cpus,
        }
    }
}

impl<B: RegisterBus> Gic<B> {
    /// Number of implemented interrupt lines.
    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Number of attached CPU interfaces.
    pub fn cpus(&self) -> u32 {
        self.cpus
    }

    /// Global distributor bring-up. Call once, on the boot CPU, before any
    /// line is enabled.
    pub fn init(&self) {
        self.dist.lock().init();
    }

    /// Per-CPU interface bring-up. Call on every CPU that is to take
    /// interrupts, including the boot CPU.
    pub fn init_current_cpu(&self) {
        self.cpu_if.init();
    }

    /// Registers `handler` as the top half of `line`, replacing any
    /// previous handler in the slot.
    pub fn attach(&self, line: u32, handler: IrqHandler) -> Result<()> {
        *self.slot(line)?.lock() = Some(handler);
        Ok(())
    }

    /// Removes the handler of `line`, if any. The line is not disabled;
    /// further deliveries are completed without a handler.
    pub fn detach(&self, line: u32) -> Result<()> {
        *self.slot(line)?.lock() = None;
        Ok(())
    }

    /// Enables delivery of `line`.
    pub fn enable(&self, line: u32) -> Result<()> {
        self.dist.lock().enable_line(line)
    }

    /// Disables delivery of `line`.
    pub fn disable(&self, line: u32) -> Result<()> {
        self.dist.lock().disable_line(line)
    }

    /// Sets the priority of `line`; lower values are more urgent.
    pub fn set_priority(&self, line: u32, priority: u8) -> Result<()> {
        self.dist.lock().set_priority(line, priority)
    }

    /// Restricts delivery of `line` to the CPUs in `mask`.
    pub fn set_affinity(&self, line: u32, mask: CpuMask) -> Result<()> {
        self.dist.lock().set_target(line, mask)
    }

    /// Sets how `line` is sampled and delivered.
    pub fn set_trigger(&self, line: u32, trigger: Trigger, model: Model) -> Result<()> {
        self.dist.lock().set_trigger(line, trigger, model)
    }

    /// Raises a software-generated interrupt. Lock-free; callable from
    /// interrupt context.
    ///
    /// # Errors
    ///
    /// An explicit target list must be non-empty and name only CPU
    /// interfaces the controller reports; otherwise
    /// [`Error::InvalidConfiguration`] is returned and nothing is sent.
    pub fn send_sgi(&self, request: SgiRequest) -> Result<()> {
        if let SgiTarget::List(mask) = request.target() {
            if mask.is_empty() || !mask.fits(self.cpus) {
                return Err(Error::InvalidConfiguration);
            }
        }
        sgi::send(&self.sgi_bus, request);
        Ok(())
    }

    /// The trap-entry hot path, to be called by `cpu`'s IRQ vector.
    ///
    /// Claims the pending interrupt, runs its handler, and always completes
    /// the claim, also when no handler is attached: a claim left active
    /// would starve its priority level on this CPU for good. A spurious
    /// acknowledge returns immediately with no side effects.
    pub fn dispatch(&self, cpu: CpuId) {
        let Some(claim) = self.acknowledge(cpu) else {
            return;
        };
        let line = claim.line();

        let handler = if line < self.lines {
            *self.handlers[line as usize].lock()
        } else {
            None
        };
        match handler {
            Some(handler) => handler(&claim),
            None => warn!("[GIC]: no handler attached for interrupt {}", line),
        }

        let _ = self.complete(cpu, claim);
    }

    /// Claims the pending interrupt of `cpu` for a manual handling flow,
    /// recording it so that [`end_of_interrupt`] can check for matched
    /// completion. Returns `None` on a spurious acknowledge.
    ///
    /// [`end_of_interrupt`]: Self::end_of_interrupt
    pub fn acknowledge(&self, cpu: CpuId) -> Option<Claim> {
        let claim = self.cpu_if.acknowledge()?;
        if !self.claims[cpu.as_usize()].lock().push(claim.line()) {
            warn!("[GIC]: claim stack overflow on CPU {}", cpu.index());
        }
        Some(claim)
    }

    /// Completes a claim out of band.
    ///
    /// Normal interrupt flow never needs this ([`dispatch`] completes its
    /// own claim), but a driver doing a manual [`acknowledge`] does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedEndOfInterrupt`] if `claim` is not the
    /// most recently claimed, still-active interrupt of `cpu`. The
    /// end-of-interrupt store has been issued regardless by the time this
    /// returns: wedging a priority level is worse than a logged anomaly.
    ///
    /// [`dispatch`]: Self::dispatch
    /// [`acknowledge`]: Self::acknowledge
    pub fn end_of_interrupt(&self, cpu: CpuId, claim: Claim) -> Result<()> {
        self.complete(cpu, claim)
    }

    /// The calling CPU's interface, for priority masking and preemption
    /// control beyond what the facade wraps.
    pub fn cpu_interface(&self) -> &CpuInterface<B> {
        &self.cpu_if
    }

    /// Runs `f` with the distributor configuration lock held, for
    /// configuration the facade does not wrap (security groups, pending
    /// injection, status introspection).
    pub fn with_distributor<R>(&self, f: impl FnOnce(&mut Distributor<B>) -> R) -> R {
        f(&mut self.dist.lock())
    }

    fn complete(&self, cpu: CpuId, claim: Claim) -> Result<()> {
        self.cpu_if.end_of_interrupt(claim);

        let matched = self.claims[cpu.as_usize()]
            .lock()
            .pop_expecting(claim.line());
        if matched {
            Ok(())
        } else {
            warn!(
                "[GIC]: unmatched end of interrupt for {} on CPU {}",
                claim.line(),
                cpu.index()
            );
            Err(Error::UnmatchedEndOfInterrupt)
        }
    }

    fn slot(&self, line: u32) -> Result<&Mutex<Option<IrqHandler>>> {
        if line >= self.lines {
            return Err(Error::InvalidConfiguration);
        }
        Ok(&self.handlers[line as usize])
    }
}
