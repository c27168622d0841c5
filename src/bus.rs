//! The seam between the TIA and the host CPU core.
//!
//! The TIA never runs on its own; it is called from the CPU's instruction
//! loop. [`crate::tia::Tia::update`] drives the CPU through the [`Cpu`] trait,
//! and the CPU's memory bus calls back into `peek`/`poke`, handing over a
//! [`BusState`] snapshot of its cycle counter and data bus.

use crate::tia::Tia;

/// Snapshot of the bus at the moment of a single register access.
#[derive(Debug, Clone, Copy)]
pub struct BusState {
    /// CPU cycle counter at the time of the access. One CPU cycle is 3 color
    /// clocks.
    pub cycles: i32,
    /// Last value seen on the data bus; leaks into undriven bits of reads.
    pub data_bus: u8,
    /// `true` if the current bus cycle is a read. WSYNC only takes effect on
    /// read cycles, not on the write half of read-modify-write instructions.
    pub last_access_was_read: bool,
}

/// Outcome of a register write, to be applied by the CPU core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PokeResult {
    /// The CPU must stop executing after the current instruction. Raised when
    /// VSYNC completes a frame or when a frame runs away past the scanline
    /// maximum without one.
    pub halt_cpu: bool,
    /// Extra CPU cycles to consume before the next instruction. WSYNC resolves
    /// to the cycles remaining until the end of the current scanline, computed
    /// in closed form instead of spinning.
    pub consume_cycles: i32,
}

/// A host CPU core capable of driving the TIA.
pub trait Cpu {
    /// Executes at most `max_instructions` instructions, issuing bus accesses
    /// against `tia` and honoring [`PokeResult`] halt and cycle-consumption
    /// requests.
    fn execute(&mut self, max_instructions: u32, tia: &mut Tia);

    /// Current value of the cycle counter.
    fn cycles(&self) -> i32;

    /// Resets the cycle counter to 0. Called once per frame so that the color
    /// clock bookkeeping never overflows.
    fn reset_cycles(&mut self);
}
