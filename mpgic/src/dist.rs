// SPDX-License-Identifier: MPL-2.0

//! The distributor block.
//!
//! The distributor is the globally shared half of the controller: it owns
//! per-line enable, pending, priority, target, trigger, and security state
//! for every interrupt line, and forwards the highest-priority pending line
//! to each targeted CPU interface.
//!
//! Most of the per-line state is packed several lines to a 32-bit word
//! (see [`regs`] for the density of each array), so configuration writes
//! are read-modify-write sequences. Methods that perform one take
//! `&mut self`; callers that may configure lines from multiple CPUs must
//! serialize all such calls behind one lock, since two lines sharing a
//! packed word race even when the lines differ. [`Gic`] provides exactly
//! that lock. No register contents are cached here: every read re-fetches
//! from the device, so there is no shadow state to go stale across CPUs.
//!
//! [`Gic`]: crate::irq::Gic

use bit_field::BitField;
use log::info;
use reg_pack::{field, PackedField};

use crate::{
    cpu::CpuMask,
    io::RegisterBus,
    prelude::*,
    regs::{self, DistCtrl},
};

/// How a line's interrupt signal is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The line is asserted for as long as the source holds it.
    Level,
    /// The line latches on a rising edge.
    Edge,
}

/// How a line is delivered among its targeted CPUs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Model {
    /// Every targeted CPU sees the interrupt independently.
    NToN,
    /// Exactly one CPU, chosen among the target set, takes the interrupt.
    /// Lines under this model must be given an explicit, non-empty target
    /// set before they are enabled.
    OneToN,
}

/// Security group of an interrupt line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptGroup {
    /// Group 0, the secure bank.
    Secure,
    /// Group 1, the non-secure bank.
    NonSecure,
}

/// Driver for the shared distributor block.
pub struct Distributor<B: RegisterBus> {
    bus: B,
    lines: u32,
    cpus: u32,
}

impl<B: RegisterBus> Distributor<B> {
    /// Probes the distributor behind `bus` and reports its geometry.
    pub fn new(bus: B) -> Self {
        let typer = bus.read(regs::GICD_TYPER);
        let lines = 32 * (typer.get_bits(regs::TYPER_ITLINES) + 1);
        let lines = lines.min(regs::MAX_LINES);
        let cpus = typer.get_bits(regs::TYPER_CPUS) + 1;

        info!(
            "[GIC]: distributor reports {} interrupt lines, {} CPU interface(s)",
            lines, cpus
        );

        Self { bus, lines, cpus }
    }

    /// Number of implemented interrupt lines.
    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Number of attached CPU interfaces.
    pub fn cpus(&self) -> u32 {
        self.cpus
    }

    /// Puts every shared peripheral line into a known state (masked, not
    /// pending, default priority, targeted at CPU 0, level-sensitive 1-N),
    /// then enables forwarding for both security groups.
    ///
    /// SGIs and the per-CPU private peripherals (IDs 0-31) are banked per
    /// CPU and keep their reset state.
    pub fn init(&mut self) {
        self.set_control(DistCtrl::empty());

        for word in 0..(self.lines as usize + 31) / 32 {
            self.bus.write(regs::GICD_ICENABLER + 4 * word, !0);
            self.bus.write(regs::GICD_ICPENDR + 4 * word, !0);
        }
        for word in (regs::SPI_FIRST as usize / 4)..(self.lines as usize + 3) / 4 {
            self.bus
                .write(regs::GICD_IPRIORITYR + 4 * word, regs::DEFAULT_PRIORITY_WORD);
            self.bus
                .write(regs::GICD_ITARGETSR + 4 * word, regs::DEFAULT_TARGET_WORD);
        }
        for word in (regs::SPI_FIRST as usize / 16)..(self.lines as usize + 15) / 16 {
            self.bus
                .write(regs::GICD_ICFGR + 4 * word, regs::DEFAULT_CFG_WORD);
        }

        self.global_enable();
    }

    /// Enables forwarding of `line` to its targeted CPU interfaces.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidConfiguration`] if the line is routed
    /// under the 1-N model but has an empty target set; nothing is written
    /// in that case. SGIs are always enabled and yield
    /// [`Error::UnsupportedOperation`].
    pub fn enable_line(&mut self, line: u32) -> Result<()> {
        self.check_configurable(line)?;
        if self.model_of(line) == Model::OneToN && self.target(line)?.is_empty() {
            return Err(Error::InvalidConfiguration);
        }
        let f = field(line, regs::BITSET_DENSITY);
        // Write-1-to-set: a single store, co-packed lines unaffected.
        self.bus.write(regs::GICD_ISENABLER + f.byte_offset, f.mask);
        Ok(())
    }

    /// Disables forwarding of `line`.
    ///
    /// A level-triggered line that is still asserted re-pends while active;
    /// check [`is_active`] before disabling if that re-assertion must not be
    /// lost.
    ///
    /// [`is_active`]: Self::is_active
    pub fn disable_line(&mut self, line: u32) -> Result<()> {
        self.check_configurable(line)?;
        let f = field(line, regs::BITSET_DENSITY);
        // Write-1-to-clear.
        self.bus.write(regs::GICD_ICENABLER + f.byte_offset, f.mask);
        Ok(())
    }

    /// Marks `line` pending in software, as if the hardware signal fired.
    pub fn set_pending(&mut self, line: u32) -> Result<()> {
        self.check_configurable(line)?;
        let f = field(line, regs::BITSET_DENSITY);
        self.bus.write(regs::GICD_ISPENDR + f.byte_offset, f.mask);
        Ok(())
    }

    /// Clears the pending state of `line`.
    pub fn clear_pending(&mut self, line: u32) -> Result<()> {
        self.check_configurable(line)?;
        let f = field(line, regs::BITSET_DENSITY);
        self.bus.write(regs::GICD_ICPENDR + f.byte_offset, f.mask);
        Ok(())
    }

    /// Whether `line` is pending.
    pub fn is_pending(&self, line: u32) -> Result<bool> {
        self.check_line(line)?;
        let f = field(line, regs::BITSET_DENSITY);
        Ok(f.is_set(self.bus.read(regs::GICD_ISPENDR + f.byte_offset)))
    }

    /// Whether `line` is active (claimed and not yet completed) on some CPU.
    pub fn is_active(&self, line: u32) -> Result<bool> {
        self.check_line(line)?;
        let f = field(line, regs::BITSET_DENSITY);
        Ok(f.is_set(self.bus.read(regs::GICD_ISACTIVER + f.byte_offset)))
    }

    /// Sets the priority of `line`, truncated to the implemented priority
    /// bits. Lower values are more urgent; 0 is the most urgent.
    pub fn set_priority(&mut self, line: u32, priority: u8) -> Result<()> {
        self.check_configurable(line)?;
        let value = regs::implemented_priority(priority) as u32;
        self.rmw(regs::GICD_IPRIORITYR, field(line, regs::IPRIORITYR_DENSITY), value);
        Ok(())
    }

    /// The stored priority of `line`.
    pub fn priority(&self, line: u32) -> Result<u8> {
        self.check_line(line)?;
        let f = field(line, regs::IPRIORITYR_DENSITY);
        Ok(f.extract(self.bus.read(regs::GICD_IPRIORITYR + f.byte_offset)) as u8)
    }

    /// Sets the CPU interfaces `line` may be delivered to.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidConfiguration`] if the mask names a CPU
    /// interface the controller does not have, or if it is empty while the
    /// line is routed under the 1-N model. Nothing is written on failure.
    pub fn set_target(&mut self, line: u32, mask: CpuMask) -> Result<()> {
        self.check_configurable(line)?;
        if !mask.fits(self.cpus) {
            return Err(Error::InvalidConfiguration);
        }
        if mask.is_empty() && self.model_of(line) == Model::OneToN {
            return Err(Error::InvalidConfiguration);
        }
        let value = mask.bits() as u32;
        self.rmw(regs::GICD_ITARGETSR, field(line, regs::ITARGETSR_DENSITY), value);
        Ok(())
    }

    /// The CPU interfaces `line` is targeted at.
    pub fn target(&self, line: u32) -> Result<CpuMask> {
        self.check_line(line)?;
        let f = field(line, regs::ITARGETSR_DENSITY);
        let raw = f.extract(self.bus.read(regs::GICD_ITARGETSR + f.byte_offset));
        Ok(CpuMask::from_bits_truncate(raw as u8))
    }

    /// Sets how `line` is sampled and delivered.
    pub fn set_trigger(&mut self, line: u32, trigger: Trigger, model: Model) -> Result<()> {
        self.check_configurable(line)?;
        let value = match trigger {
            Trigger::Level => 0,
            Trigger::Edge => regs::CFG_EDGE,
        } | match model {
            Model::NToN => 0,
            Model::OneToN => regs::CFG_MODEL_1N,
        };
        self.rmw(regs::GICD_ICFGR, field(line, regs::ICFGR_DENSITY), value);
        Ok(())
    }

    /// The trigger configuration of `line`.
    pub fn trigger(&self, line: u32) -> Result<(Trigger, Model)> {
        self.check_line(line)?;
        let f = field(line, regs::ICFGR_DENSITY);
        let raw = f.extract(self.bus.read(regs::GICD_ICFGR + f.byte_offset));
        let trigger = if raw & regs::CFG_EDGE != 0 {
            Trigger::Edge
        } else {
            Trigger::Level
        };
        let model = if raw & regs::CFG_MODEL_1N != 0 {
            Model::OneToN
        } else {
            Model::NToN
        };
        Ok((trigger, model))
    }

    /// Assigns `line` to a security group.
    pub fn set_group(&mut self, line: u32, group: InterruptGroup) -> Result<()> {
        self.check_configurable(line)?;
        let value = match group {
            InterruptGroup::Secure => 0,
            InterruptGroup::NonSecure => 1,
        };
        self.rmw(regs::GICD_IGROUPR, field(line, regs::BITSET_DENSITY), value);
        Ok(())
    }

    /// Enables forwarding for both security groups.
    pub fn global_enable(&mut self) {
        self.set_control(DistCtrl::ENABLE_GROUP0 | DistCtrl::ENABLE_GROUP1);
    }

    /// Disables forwarding for both security groups.
    pub fn global_disable(&mut self) {
        self.set_control(DistCtrl::empty());
    }

    /// Writes the distributor control register. For callers that need the
    /// security banks toggled individually.
    pub fn set_control(&mut self, control: DistCtrl) {
        self.bus.write(regs::GICD_CTLR, control.bits());
    }

    /// The distributor implementer identification register.
    pub fn implementer_id(&self) -> u32 {
        self.bus.read(regs::GICD_IIDR)
    }

    /// One of the eight peripheral identification registers.
    pub fn peripheral_id(&self, index: usize) -> u32 {
        debug_assert!(index < 8);
        self.bus.read(regs::GICD_PIDR + 4 * index)
    }

    /// One of the four PrimeCell component identification registers.
    pub fn component_id(&self, index: usize) -> u32 {
        debug_assert!(index < 4);
        self.bus.read(regs::GICD_CIDR + 4 * index)
    }

    /// Raw signal state of the private peripheral inputs (Cortex-A9).
    pub fn ppi_status(&self) -> u32 {
        self.bus.read(regs::GICD_PPISR)
    }

    /// Raw signal state of one word of shared peripheral inputs (Cortex-A9).
    pub fn spi_status(&self, word: usize) -> u32 {
        self.bus.read(regs::GICD_SPISR + 4 * word)
    }

    /// The delivery model of `line`, for validation. SGI-ness and range are
    /// checked by the caller.
    fn model_of(&self, line: u32) -> Model {
        let f = field(line, regs::ICFGR_DENSITY);
        let raw = f.extract(self.bus.read(regs::GICD_ICFGR + f.byte_offset));
        if raw & regs::CFG_MODEL_1N != 0 {
            Model::OneToN
        } else {
            Model::NToN
        }
    }

    fn check_line(&self, line: u32) -> Result<()> {
        if line >= self.lines {
            return Err(Error::InvalidConfiguration);
        }
        Ok(())
    }

    /// SGIs are permanently enabled and routed by their sender; the normal
    /// configuration path uniformly rejects them.
    fn check_configurable(&self, line: u32) -> Result<()> {
        self.check_line(line)?;
        if line < regs::SGI_COUNT {
            return Err(Error::UnsupportedOperation);
        }
        Ok(())
    }

    fn rmw(&mut self, base: usize, f: PackedField, value: u32) {
        let offset = base + f.byte_offset;
        let word = self.bus.read(offset);
        self.bus.write(offset, f.insert(word, value));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{regs::*, sim};

    fn fixture(lines: u32, cpus: u32) -> sim::SimBus {
        sim::dist_bus(lines, cpus)
    }

    #[test]
    fn probes_geometry_from_type_register() {
        let bus = fixture(96, 4);
        let dist = Distributor::new(&bus);
        assert_eq!(dist.lines(), 96);
        assert_eq!(dist.cpus(), 4);
    }

    #[test]
    fn geometry_is_capped_at_reserved_ids() {
        let bus = sim::SimBus::new();
        bus.preset(GICD_TYPER, 0x1f | (7 << 5));
        let dist = Distributor::new(&bus);
        assert_eq!(dist.lines(), 1020);
        assert_eq!(dist.cpus(), 8);
    }

    #[test]
    fn enable_and_disable_are_single_stores() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        let before = bus.write_count();
        dist.enable_line(37).unwrap();
        assert_eq!(bus.write_count(), before + 1);
        assert_eq!(bus.last_write(), Some((GICD_ISENABLER + 4, 1 << 5)));

        dist.disable_line(37).unwrap();
        assert_eq!(bus.last_write(), Some((GICD_ICENABLER + 4, 1 << 5)));
    }

    #[test]
    fn pending_injection_uses_set_clear_registers() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        dist.set_pending(33).unwrap();
        assert_eq!(bus.last_write(), Some((GICD_ISPENDR + 4, 1 << 1)));
        dist.clear_pending(33).unwrap();
        assert_eq!(bus.last_write(), Some((GICD_ICPENDR + 4, 1 << 1)));
    }

    #[test]
    fn priority_writes_preserve_packed_neighbours() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        dist.set_priority(8, 0x50).unwrap();
        dist.set_priority(9, 0xa0).unwrap();
        assert_eq!(bus.word(GICD_IPRIORITYR + 8), 0xa050);
        assert_eq!(dist.priority(8).unwrap(), 0x50);
        assert_eq!(dist.priority(9).unwrap(), 0xa0);
    }

    #[test]
    fn priority_truncates_to_implemented_bits() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        // Only the upper four bits are wired; 5 truncates to 0.
        dist.set_priority(8, 5).unwrap();
        dist.set_priority(9, 0).unwrap();
        assert_eq!(dist.priority(8).unwrap(), 0);
        assert_eq!(dist.priority(9).unwrap(), 0);
        assert_eq!(bus.word(GICD_IPRIORITYR + 8), 0);
    }

    #[test]
    fn one_to_n_line_needs_targets_before_enable() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        dist.set_trigger(40, Trigger::Level, Model::OneToN).unwrap();

        let before = bus.write_count();
        assert_eq!(dist.enable_line(40), Err(Error::InvalidConfiguration));
        // The failed enable must not have touched the device.
        assert_eq!(bus.write_count(), before);

        dist.set_target(40, CpuMask::CPU1).unwrap();
        dist.enable_line(40).unwrap();
        assert_eq!(bus.last_write(), Some((GICD_ISENABLER + 4, 1 << 8)));
    }

    #[test]
    fn empty_target_mask_is_rejected_under_one_to_n() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        dist.set_trigger(40, Trigger::Edge, Model::OneToN).unwrap();
        dist.set_target(40, CpuMask::CPU0 | CpuMask::CPU1).unwrap();

        let word_before = bus.word(GICD_ITARGETSR + 40);
        assert_eq!(
            dist.set_target(40, CpuMask::empty()),
            Err(Error::InvalidConfiguration)
        );
        // No partial mutation on the failed call.
        assert_eq!(bus.word(GICD_ITARGETSR + 40), word_before);
    }

    #[test]
    fn target_mask_must_fit_reported_interfaces() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);
        assert_eq!(
            dist.set_target(40, CpuMask::CPU6),
            Err(Error::InvalidConfiguration)
        );
    }

    #[test]
    fn trigger_configuration_shares_words_safely() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        dist.set_trigger(36, Trigger::Edge, Model::NToN).unwrap();
        dist.set_trigger(37, Trigger::Edge, Model::OneToN).unwrap();
        // Lines 36 and 37 share the density-16 word at 0xc08.
        assert_eq!(bus.word(GICD_ICFGR + 8), (0b10 << 8) | (0b11 << 10));
        assert_eq!(dist.trigger(36).unwrap(), (Trigger::Edge, Model::NToN));
        assert_eq!(dist.trigger(37).unwrap(), (Trigger::Edge, Model::OneToN));
    }

    #[test]
    fn sgi_lines_reject_configuration() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        assert_eq!(dist.enable_line(3), Err(Error::UnsupportedOperation));
        assert_eq!(dist.disable_line(3), Err(Error::UnsupportedOperation));
        assert_eq!(dist.set_pending(3), Err(Error::UnsupportedOperation));
        assert_eq!(dist.set_priority(3, 0x10), Err(Error::UnsupportedOperation));
        assert_eq!(
            dist.set_target(3, CpuMask::CPU0),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            dist.set_trigger(3, Trigger::Edge, Model::NToN),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            dist.set_group(3, InterruptGroup::NonSecure),
            Err(Error::UnsupportedOperation)
        );
    }

    #[test]
    fn lines_beyond_geometry_are_rejected() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);
        assert_eq!(dist.enable_line(64), Err(Error::InvalidConfiguration));
        assert_eq!(dist.priority(64), Err(Error::InvalidConfiguration));
    }

    #[test]
    fn global_control_toggles_both_groups() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);

        dist.global_enable();
        assert_eq!(bus.word(GICD_CTLR), 0b11);
        dist.global_disable();
        assert_eq!(bus.word(GICD_CTLR), 0);
    }

    #[test]
    fn active_state_is_read_from_the_device() {
        let bus = fixture(64, 4);
        let dist = Distributor::new(&bus);

        assert!(!dist.is_active(37).unwrap());
        bus.preset(GICD_ISACTIVER + 4, 1 << 5);
        assert!(dist.is_active(37).unwrap());
    }

    #[test]
    fn init_masks_and_defaults_the_shared_lines() {
        let bus = fixture(64, 4);
        let mut dist = Distributor::new(&bus);
        dist.init();

        let writes = bus.writes();
        // Every enable word cleared, every pending word cleared.
        for word in 0..2 {
            assert!(writes.contains(&(GICD_ICENABLER + 4 * word, !0)));
            assert!(writes.contains(&(GICD_ICPENDR + 4 * word, !0)));
        }
        // SPI defaults start at line 32; banked IDs 0-31 are untouched.
        assert_eq!(bus.word(GICD_IPRIORITYR), 0);
        assert_eq!(bus.word(GICD_IPRIORITYR + 32), DEFAULT_PRIORITY_WORD);
        assert_eq!(bus.word(GICD_ITARGETSR + 32), DEFAULT_TARGET_WORD);
        assert_eq!(bus.word(GICD_ICFGR + 8), DEFAULT_CFG_WORD);
        // Forwarding re-enabled for both groups at the end.
        assert_eq!(bus.word(GICD_CTLR), 0b11);
    }
}
