//! Precomputed lookup tables used by the renderer.
//!
//! Each `Tia` instance owns one immutable [`TiaTables`] value built at
//! construction, so multiple emulated consoles stay independent.
//!
//! The sprite masks answer "is this object lit at this column" without
//! re-deriving NUSIZ copy/size logic per pixel. They are indexed by the low
//! two bits of the object position (`align`), the NUSIZ-derived selector, and
//! a column index `160 - (position & !3) + hpos`, which stays within
//! `[0, 320)` for every on-screen position. The second half of each table
//! repeats the first so that the wrapped index never needs a modulo in the
//! pixel loop.

use crate::tia::flags;

/// Number of visible pixels per scanline.
pub const VISIBLE_WIDTH: usize = 160;
/// Mask table span: two wrapped copies of the visible line.
const SPAN: usize = 2 * VISIBLE_WIDTH;

pub struct TiaTables {
    /// `[position & 3][suppress][NUSIZ & 7][column]` -> GRP bit to test, or 0.
    pub player_mask: Box<[[[[u8; SPAN]; 8]; 2]; 4]>,
    /// `[position & 3][NUSIZ & 7][size index][column]` -> lit flag.
    pub missile_mask: Box<[[[[u8; SPAN]; 4]; 8]; 4]>,
    /// `[position & 3][size index][column]` -> lit flag.
    pub ball_mask: Box<[[[u8; SPAN]; 4]; 4]>,
    /// `[reflect][column]` -> bit of the 20-bit playfield pattern to test.
    pub playfield_mask: Box<[[u32; VISIBLE_WIDTH]; 2]>,
    /// Bit-reversal of a GRP byte, for REFP.
    pub grp_reflect: [u8; 256],
    /// Object-presence bits -> collision latch bits.
    pub collision_mask: [u16; 64],
    /// Per-register write propagation delay in color clocks. `-1` marks the
    /// playfield registers, whose delay depends on the beam position.
    pub poke_delay: [i16; 64],
    /// Whether an HMOVE strobed at this CPU cycle of a scanline arms the
    /// HMOVE blank.
    pub hmove_blank_enable_cycles: [bool; 76],
}

/// Copy start offsets for each NUSIZ copy-count value, in color clocks from
/// the object position. Multi-copy modes space copies 16, 32 or 64 clocks
/// apart; the stretched modes (5 and 7) have a single copy.
pub(crate) fn copy_offsets(nusiz: usize) -> &'static [usize] {
    match nusiz {
        1 => &[0, 16],
        2 => &[0, 32],
        3 => &[0, 16, 32],
        4 => &[0, 64],
        6 => &[0, 32, 64],
        _ => &[0],
    }
}

/// Width multiplier of a player for a NUSIZ value: 1x for copy modes, 2x and
/// 4x for the stretched modes.
pub(crate) fn player_scale(nusiz: usize) -> usize {
    match nusiz {
        5 => 2,
        7 => 4,
        _ => 1,
    }
}

fn build_player_mask() -> Box<[[[[u8; SPAN]; 8]; 2]; 4]> {
    let mut table = Box::new([[[[0u8; SPAN]; 8]; 2]; 4]);
    for suppress in 0..2 {
        for nusiz in 0..8 {
            let scale = player_scale(nusiz);
            // Stretched players start one clock later than 1x players.
            let skew = if scale > 1 { 1 } else { 0 };
            let mut line = [0u8; VISIBLE_WIDTH];
            for &start in copy_offsets(nusiz) {
                if suppress == 1 && start == 0 {
                    // Suppression blanks the first copy.
                    continue;
                }
                for dx in 0..8 * scale {
                    line[start + skew + dx] = 0x80 >> (dx / scale);
                }
            }
            for x in 0..SPAN {
                table[0][suppress][nusiz][x] = line[x % VISIBLE_WIDTH];
            }
        }
    }
    spread_alignments(&mut |align, src, dst| {
        for suppress in 0..2 {
            for nusiz in 0..8 {
                table[align][suppress][nusiz][dst] = table[0][suppress][nusiz][src];
            }
        }
    });
    return table;
}

fn build_missile_mask() -> Box<[[[[u8; SPAN]; 4]; 8]; 4]> {
    let mut table = Box::new([[[[0u8; SPAN]; 4]; 8]; 4]);
    for number in 0..8 {
        for size in 0..4 {
            let width = 1 << size;
            let mut line = [0u8; VISIBLE_WIDTH];
            for &start in copy_offsets(number) {
                // Missiles trail their position by one clock of serial delay.
                for dx in 0..width {
                    line[(start + 1 + dx) % VISIBLE_WIDTH] = 1;
                }
            }
            for x in 0..SPAN {
                table[0][number][size][x] = line[x % VISIBLE_WIDTH];
            }
        }
    }
    spread_alignments(&mut |align, src, dst| {
        for number in 0..8 {
            for size in 0..4 {
                table[align][number][size][dst] = table[0][number][size][src];
            }
        }
    });
    return table;
}

fn build_ball_mask() -> Box<[[[u8; SPAN]; 4]; 4]> {
    let mut table = Box::new([[[0u8; SPAN]; 4]; 4]);
    for size in 0..4 {
        let width = 1 << size;
        let mut line = [0u8; VISIBLE_WIDTH];
        for dx in 0..width {
            line[1 + dx] = 1;
        }
        for x in 0..SPAN {
            table[0][size][x] = line[x % VISIBLE_WIDTH];
        }
    }
    spread_alignments(&mut |align, src, dst| {
        for size in 0..4 {
            table[align][size][dst] = table[0][size][src];
        }
    });
    return table;
}

/// Fills alignments 1..4 by rotating alignment 0 right by the alignment
/// amount. The callback copies one column from `src` to `dst` for a given
/// alignment across all inner dimensions.
fn spread_alignments(copy_column: &mut dyn FnMut(usize, usize, usize)) {
    for align in 1..4 {
        for x in 0..SPAN {
            copy_column(align, (x + SPAN - align) % SPAN, x);
        }
    }
}

fn build_playfield_mask() -> Box<[[u32; VISIBLE_WIDTH]; 2]> {
    let mut table = Box::new([[0u32; VISIBLE_WIDTH]; 2]);
    for x in 0..80 {
        // Left half: PF0 upper nibble (low bits first), PF1 reversed, PF2
        // forward; 4 clocks per playfield bit.
        let bit: u32 = match x {
            0..=15 => 0x0000_0001 << (x / 4),
            16..=47 => 0x0000_0800 >> ((x - 16) / 4),
            _ => 0x0000_1000 << ((x - 48) / 4),
        };
        table[0][x] = bit;
        table[1][x] = bit;
        // Right half repeats the left one, or mirrors it in reflect mode.
        table[0][x + 80] = bit;
        table[1][159 - x] = bit;
    }
    return table;
}

fn build_grp_reflect() -> [u8; 256] {
    let mut table = [0u8; 256];
    for value in 0..256 {
        let mut reflected = 0u8;
        for bit in 0..8 {
            if value & (1 << bit) != 0 {
                reflected |= 0x80 >> bit;
            }
        }
        table[value] = reflected;
    }
    return table;
}

fn build_collision_mask() -> [u16; 64] {
    use flags::*;
    const PAIRS: [(u8, u8, u16); 15] = [
        (M0_BIT, P1_BIT, CX_M0P1),
        (M0_BIT, P0_BIT, CX_M0P0),
        (M1_BIT, P0_BIT, CX_M1P0),
        (M1_BIT, P1_BIT, CX_M1P1),
        (P0_BIT, PF_BIT, CX_P0PF),
        (P0_BIT, BL_BIT, CX_P0BL),
        (P1_BIT, PF_BIT, CX_P1PF),
        (P1_BIT, BL_BIT, CX_P1BL),
        (M0_BIT, PF_BIT, CX_M0PF),
        (M0_BIT, BL_BIT, CX_M0BL),
        (M1_BIT, PF_BIT, CX_M1PF),
        (M1_BIT, BL_BIT, CX_M1BL),
        (BL_BIT, PF_BIT, CX_BLPF),
        (P0_BIT, P1_BIT, CX_P0P1),
        (M0_BIT, M1_BIT, CX_M0M1),
    ];
    let mut table = [0u16; 64];
    for enabled in 0..64u8 {
        for &(a, b, collision) in &PAIRS {
            if enabled & a != 0 && enabled & b != 0 {
                table[enabled as usize] |= collision;
            }
        }
    }
    return table;
}

/// Playfield writes take effect after a delay that cycles with the beam
/// position; marked with `-1` in the delay table.
pub const PLAYFIELD_DELAY: [i16; 4] = [4, 5, 2, 3];

fn build_poke_delay() -> [i16; 64] {
    use crate::tia::registers::*;
    let mut table = [0i16; 64];
    table[VBLANK as usize] = 1;
    table[NUSIZ0 as usize] = 8;
    table[NUSIZ1 as usize] = 8;
    table[REFP0 as usize] = 1;
    table[REFP1 as usize] = 1;
    table[PF0 as usize] = -1;
    table[PF1 as usize] = -1;
    table[PF2 as usize] = -1;
    table[GRP0 as usize] = 1;
    table[GRP1 as usize] = 1;
    table[ENAM0 as usize] = 1;
    table[ENAM1 as usize] = 1;
    table[ENABL as usize] = 1;
    return table;
}

fn build_hmove_blank_enable_cycles() -> [bool; 76] {
    let mut table = [false; 76];
    for cycle in 0..=20 {
        table[cycle] = true;
    }
    table[75] = true;
    return table;
}

impl TiaTables {
    pub fn new() -> Self {
        TiaTables {
            player_mask: build_player_mask(),
            missile_mask: build_missile_mask(),
            ball_mask: build_ball_mask(),
            playfield_mask: build_playfield_mask(),
            grp_reflect: build_grp_reflect(),
            collision_mask: build_collision_mask(),
            poke_delay: build_poke_delay(),
            hmove_blank_enable_cycles: build_hmove_blank_enable_cycles(),
        }
    }
}

impl Default for TiaTables {
    fn default() -> Self {
        TiaTables::new()
    }
}
