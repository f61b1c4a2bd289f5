// SPDX-License-Identifier: MPL-2.0

//! GIC register map.
//!
//! Offsets and field definitions for the distributor block and the banked
//! CPU-interface block, per the ARM Generic Interrupt Controller as
//! implemented in the Cortex-A9 MPCore (ARM DDI 0407). All offsets are
//! relative to the respective block base; every register is a 32-bit word.
//!
//! The per-line register arrays pack their fields at the densities listed
//! with each array; addressing within an array goes through [`reg_pack`].

use core::ops::Range;

use bitflags::bitflags;
use reg_pack::Density;
use static_assertions::const_assert;

/// Interrupt IDs 1020-1023 are architecturally reserved, so at most 1020
/// lines are implemented regardless of what the type register reports.
pub const MAX_LINES: u32 = 1020;

/// The distributor can serve at most eight CPU interfaces.
pub const MAX_CPUS: u32 = 8;

/// IDs 0-15 are software-generated interrupts.
pub const SGI_COUNT: u32 = 16;

/// First shared peripheral interrupt; 16-31 are per-CPU private peripherals.
pub const SPI_FIRST: u32 = 32;

/// Interrupt ID reported by an acknowledge that found nothing pending.
pub const SPURIOUS_INTID: u32 = 1023;

/// Number of priority bits this implementation wires up. Priorities occupy
/// the upper bits of their 8-bit fields; the low four bits read as zero.
pub const PRIORITY_BITS: u32 = 4;

/// Mask of the implemented priority bits within an 8-bit priority value.
pub const PRIORITY_MASK: u8 = !(0xff >> PRIORITY_BITS);

/// Truncates a requested priority to the implemented priority bits, exactly
/// as the hardware stores it.
pub const fn implemented_priority(priority: u8) -> u8 {
    priority & PRIORITY_MASK
}

// CPU interface registers (banked per CPU).

/// CPU Interface Control Register.
pub const GICC_CTLR: usize = 0x0000;
/// Interrupt Priority Mask Register.
pub const GICC_PMR: usize = 0x0004;
/// Binary Point Register.
pub const GICC_BPR: usize = 0x0008;
/// Interrupt Acknowledge Register.
pub const GICC_IAR: usize = 0x000c;
/// End Of Interrupt Register.
pub const GICC_EOIR: usize = 0x0010;
/// Running Priority Register.
pub const GICC_RPR: usize = 0x0014;
/// Highest Pending Interrupt Register.
pub const GICC_HPPIR: usize = 0x0018;
/// Aliased Non-secure Binary Point Register.
pub const GICC_ABPR: usize = 0x001c;
/// CPU Interface Implementer ID Register.
pub const GICC_IIDR: usize = 0x00fc;

// Distributor registers.

/// Distributor Control Register.
pub const GICD_CTLR: usize = 0x0000;
/// Interrupt Controller Type Register.
pub const GICD_TYPER: usize = 0x0004;
/// Distributor Implementer ID Register.
pub const GICD_IIDR: usize = 0x0008;
/// Interrupt Security Registers, 32 fields/word.
pub const GICD_IGROUPR: usize = 0x0080;
/// Interrupt Set-Enable Registers, 32 fields/word, write 1 to enable.
pub const GICD_ISENABLER: usize = 0x0100;
/// Interrupt Clear-Enable Registers, 32 fields/word, write 1 to disable.
pub const GICD_ICENABLER: usize = 0x0180;
/// Interrupt Set-Pending Registers, 32 fields/word, write 1 to set.
pub const GICD_ISPENDR: usize = 0x0200;
/// Interrupt Clear-Pending Registers, 32 fields/word, write 1 to clear.
pub const GICD_ICPENDR: usize = 0x0280;
/// Interrupt Active Bit Registers, 32 fields/word, read-only.
pub const GICD_ISACTIVER: usize = 0x0300;
/// Interrupt Priority Registers, 4 fields/word.
pub const GICD_IPRIORITYR: usize = 0x0400;
/// Interrupt Processor Target Registers, 4 fields/word.
pub const GICD_ITARGETSR: usize = 0x0800;
/// Interrupt Configuration Registers, 16 fields/word.
pub const GICD_ICFGR: usize = 0x0c00;
/// PPI Status Register (Cortex-A9 MPCore).
pub const GICD_PPISR: usize = 0x0d00;
/// SPI Status Registers, 32 fields/word (Cortex-A9 MPCore).
pub const GICD_SPISR: usize = 0x0d04;
/// Software Generated Interrupt Register.
pub const GICD_SGIR: usize = 0x0f00;
/// Peripheral Identification Registers, eight words.
pub const GICD_PIDR: usize = 0x0fd0;
/// PrimeCell (Component) Identification Registers, four words.
pub const GICD_CIDR: usize = 0x0ff0;

// Packing density of each per-line register array.

/// Density of the security, enable, pending, and active arrays.
pub const BITSET_DENSITY: Density = Density::D32;
/// Density of the priority array.
pub const IPRIORITYR_DENSITY: Density = Density::D4;
/// Density of the processor-target array.
pub const ITARGETSR_DENSITY: Density = Density::D4;
/// Density of the trigger-configuration array.
pub const ICFGR_DENSITY: Density = Density::D16;

// The enable and priority arrays for all addressable lines must fit in
// front of the next register group.
const_assert!(GICD_ISENABLER + ((MAX_LINES as usize + 31) / 32) * 4 <= GICD_ICENABLER);
const_assert!(GICD_IPRIORITYR + ((MAX_LINES as usize + 3) / 4) * 4 <= GICD_ITARGETSR);
const_assert!(GICD_ICFGR + ((MAX_LINES as usize + 15) / 16) * 4 <= GICD_PPISR);

// Register fields.

/// Type register: number of implemented line groups, as `32 * (N + 1)`.
pub const TYPER_ITLINES: Range<usize> = 0..5;
/// Type register: number of CPU interfaces, as `N + 1`.
pub const TYPER_CPUS: Range<usize> = 5..8;

/// Interrupt ID field of the acknowledge, end-of-interrupt, and
/// highest-pending registers.
pub const INTID: Range<usize> = 0..10;
/// Source CPU field of the same registers; meaningful for SGIs only.
pub const INTID_SOURCE_CPU: Range<usize> = 10..13;

/// The fields of a claim word that end-of-interrupt must write back: the
/// interrupt ID and, for SGIs, the source CPU. The hardware demultiplexes
/// completion by both.
pub const EOI_FIELDS_MASK: u32 = 0x1fff;

/// SGI register: interrupt ID of the generated interrupt.
pub const SGIR_INTID: Range<usize> = 0..10;
/// SGI register: CPU target list.
pub const SGIR_TARGETS: Range<usize> = 16..24;
/// SGI register: target filter.
pub const SGIR_FILTER: Range<usize> = 24..26;

/// Configuration field bit: line is routed under the 1-N model.
pub const CFG_MODEL_1N: u32 = 0b01;
/// Configuration field bit: line is edge-triggered.
pub const CFG_EDGE: u32 = 0b10;

bitflags! {
    /// Distributor Control Register bits.
    pub struct DistCtrl: u32 {
        /// Forward group 0 (secure) interrupts to the CPU interfaces.
        const ENABLE_GROUP0 = 1 << 0;
        /// Forward group 1 (non-secure) interrupts to the CPU interfaces.
        const ENABLE_GROUP1 = 1 << 1;
    }
}

bitflags! {
    /// CPU Interface Control Register bits.
    pub struct CpuIfCtrl: u32 {
        /// Signal interrupts to the attached CPU.
        const ENABLE = 1 << 0;
    }
}

// Boot-time defaults for the shared peripheral lines, written one packed
// word at a time during distributor bring-up.

/// Default priority, replicated over a priority word.
pub const DEFAULT_PRIORITY: u8 = 0x80;
/// A priority word with every field at [`DEFAULT_PRIORITY`].
pub const DEFAULT_PRIORITY_WORD: u32 = 0x8080_8080;
/// A target word routing every field to CPU 0.
pub const DEFAULT_TARGET_WORD: u32 = 0x0101_0101;
/// A configuration word with every field level-sensitive, 1-N model.
pub const DEFAULT_CFG_WORD: u32 = 0x5555_5555;
