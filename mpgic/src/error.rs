// SPDX-License-Identifier: MPL-2.0

/// The error type returned by the fallible APIs of this crate.
///
/// Every variant reports a static wiring bug in the caller, not a transient
/// condition; none of them is safe to ignore. An acknowledge that finds no
/// pending interrupt is *not* an error; [`CpuInterface::acknowledge`]
/// returns `None` for it.
///
/// [`CpuInterface::acknowledge`]: crate::cpu_if::CpuInterface::acknowledge
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// An interrupt line, priority, or affinity argument does not match the
    /// geometry the controller reports: a line number at or beyond the
    /// implemented count, a target mask naming a CPU interface that does not
    /// exist, or an empty target mask for a line routed under the 1-N model.
    InvalidConfiguration,
    /// The operation is not defined for the targeted interrupt line.
    /// Software-generated interrupts (IDs 0-15) are permanently enabled and
    /// routed by the sender, so the normal distributor configuration path
    /// rejects them.
    UnsupportedOperation,
    /// An end-of-interrupt was issued for an ID that is not the most
    /// recently claimed, still-active interrupt on the calling CPU. The
    /// end-of-interrupt store has already been issued when this is returned;
    /// see [`Gic::end_of_interrupt`].
    ///
    /// [`Gic::end_of_interrupt`]: crate::irq::Gic::end_of_interrupt
    UnmatchedEndOfInterrupt,
}
