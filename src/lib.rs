//! Cycle-accurate emulation of the TIA, the custom video/audio/IO chip of the
//! Atari 2600.
//!
//! The [`tia::Tia`] device is driven by a host CPU core through the [`bus::Cpu`]
//! trait: [`tia::Tia::update`] executes CPU instructions for one frame while
//! bus accesses call back into [`tia::Tia::peek`] and [`tia::Tia::poke`]. Every
//! register write first catches the picture up to its own color clock, so a
//! poke becomes visible exactly at its propagation point and never earlier.
//! The output is an indexed-color frame buffer, 160 pixels wide and up to 320
//! scanlines tall.

pub mod bus;
pub mod controller;
pub mod serializer;
pub mod settings;
pub mod sound;
pub mod tia;
