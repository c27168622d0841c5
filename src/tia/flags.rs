//! Constants in this module are bit masks for setting and testing register
//! values, plus the internal bit layouts shared by the renderer and the
//! collision logic.

/// Bit mask for turning on the VSYNC signal using the `VSYNC` register.
pub const VSYNC_ON: u8 = 0b0000_0010;
/// Bit mask for turning on vertical blanking using the `VBLANK` register.
pub const VBLANK_ON: u8 = 0b0000_0010;
/// Bit mask for turning on input latches using the `VBLANK` register.
pub const VBLANK_INPUT_LATCH: u8 = 0b0100_0000;
/// Bit mask for grounding the paddle dump capacitors using the `VBLANK`
/// register.
pub const VBLANK_DUMP_PORTS: u8 = 0b1000_0000;
/// Bit mask for turning on reflected playfield using the `CTRLPF` register.
pub const CTRLPF_REFLECT: u8 = 0b0000_0001;
/// Bit mask for turning on the playfield score mode using the `CTRLPF`
/// register.
pub const CTRLPF_SCORE: u8 = 0b0000_0010;
/// Bit mask for giving the playfield and ball priority over sprites using the
/// `CTRLPF` register.
pub const CTRLPF_PRIORITY: u8 = 0b0000_0100;
/// Bit mask for reflecting a player using the `REFP0`/`REFP1` registers.
pub const REFPX_REFLECT: u8 = 0b0000_1000;
/// Bit mask for enabling a missile or ball using `ENAM0`/`ENAM1`/`ENABL`.
pub const ENAXX_ENABLE: u8 = 0b0000_0010;
/// Bit mask for locking a missile to its player using `RESMP0`/`RESMP1`.
pub const RESMPX_LOCK: u8 = 0b0000_0010;
/// Bit mask for enabling vertical delay using `VDELP0`/`VDELP1`/`VDELBL`.
pub const VDELXX_ON: u8 = 0b0000_0001;

/// Indicates a HIGH level on an input port latch.
pub const INPUT_HIGH: u8 = 1 << 7;

// Object presence bits. A pixel's "enabled" byte ORs these together; the
// priority encoder and the collision table are both indexed by them.
pub const P0_BIT: u8 = 0b0000_0001;
pub const M0_BIT: u8 = 0b0000_0010;
pub const P1_BIT: u8 = 0b0000_0100;
pub const M1_BIT: u8 = 0b0000_1000;
pub const BL_BIT: u8 = 0b0001_0000;
pub const PF_BIT: u8 = 0b0010_0000;
/// Playfield score mode, folded into the priority encoder index.
pub const SCORE_BIT: u8 = 0b0100_0000;
/// Playfield priority, folded into the priority encoder index.
pub const PRIORITY_BIT: u8 = 0b1000_0000;

/// All six object presence bits.
pub const ALL_OBJECT_BITS: u8 = P0_BIT | M0_BIT | P1_BIT | M1_BIT | BL_BIT | PF_BIT;

// Palette entry indices within the TIA's color array.
pub const BK_COLOR: usize = 0;
pub const PF_COLOR: usize = 1;
pub const BL_COLOR: usize = 2;
pub const P0_COLOR: usize = 3;
pub const P1_COLOR: usize = 4;
pub const M0_COLOR: usize = 5;
pub const M1_COLOR: usize = 6;
pub const HBLANK_COLOR: usize = 7;

// Collision latch bits, one per object pair. The top bit of the 16-bit latch
// is unused, matching the hardware's 15 collision pairs.
pub const CX_M0P1: u16 = 1 << 0;
pub const CX_M0P0: u16 = 1 << 1;
pub const CX_M1P0: u16 = 1 << 2;
pub const CX_M1P1: u16 = 1 << 3;
pub const CX_P0PF: u16 = 1 << 4;
pub const CX_P0BL: u16 = 1 << 5;
pub const CX_P1PF: u16 = 1 << 6;
pub const CX_P1BL: u16 = 1 << 7;
pub const CX_M0PF: u16 = 1 << 8;
pub const CX_M0BL: u16 = 1 << 9;
pub const CX_M1PF: u16 = 1 << 10;
pub const CX_M1BL: u16 = 1 << 11;
pub const CX_BLPF: u16 = 1 << 12;
pub const CX_P0P1: u16 = 1 << 13;
pub const CX_M0M1: u16 = 1 << 14;
