//! One of the two 8-bit player sprites.

use crate::serializer::{Deserializer, SerializationError, Serializer};
use crate::tia::flags;
use crate::tia::horizontal::{Beam, HorizontalObject, PLAYER_EDGES};
use crate::tia::tables::{self, TiaTables};
use crate::tia::VISIBLE_PIXELS;

/// Where a mid-scanline reset lands relative to the copies the player was
/// displaying from its old position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResetTiming {
    /// During the display of one of the copies.
    DuringDisplay,
    /// In the start-signal delay just before a copy's first pixel.
    DuringDelay,
    /// Anywhere else on the line.
    BetweenCopies,
}

/// Classifies a position change caused by a RESPx strobe. The first copy is
/// suppressed unless the reset lands in the delay section of a copy.
pub(crate) fn reset_timing(nusiz: u8, old: i16, new: i16) -> ResetTiming {
    let nusiz = usize::from(nusiz & 7);
    let shift = (i32::from(new) - i32::from(old)).rem_euclid(VISIBLE_PIXELS);
    let scale = tables::player_scale(nusiz) as i32;
    // Stretched players draw their first pixel one clock later.
    let skew = if scale > 1 { 1 } else { 0 };
    for &start in tables::copy_offsets(nusiz) {
        let start = start as i32;
        let display = start + 5 + skew;
        if (start + 1..display).contains(&shift) {
            return ResetTiming::DuringDelay;
        }
        if (display..display + 8 * scale).contains(&shift) {
            return ResetTiming::DuringDisplay;
        }
    }
    return ResetTiming::BetweenCopies;
}

/// A RESPx strobe that actually changes the player's position, ready to be
/// committed once the frame has been painted up to the strobe.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlayerReset {
    pub new_pos: i16,
    pub timing: ResetTiming,
}

#[derive(Debug)]
pub(crate) struct Player {
    pub horizontal: HorizontalObject,
    /// Presence bit this player contributes to a pixel's enabled mask.
    bit: u8,
    grp: u8,
    /// Delayed copy of GRP, committed by writes to the other player's GRP.
    dgrp: u8,
    nusiz: u8,
    refp: bool,
    /// Blanks the first copy after a mid-display reset; cleared by NUSIZ
    /// writes, HMOVE and at the end of each scanline.
    suppress: u8,
    /// The graphics byte actually rendered, with delay and reflection
    /// applied.
    current_grp: u8,
    mask_align: usize,
    mask_base: usize,
}

impl Player {
    pub fn new(bit: u8) -> Self {
        Player {
            horizontal: HorizontalObject::default(),
            bit,
            grp: 0,
            dgrp: 0,
            nusiz: 0,
            refp: false,
            suppress: 0,
            current_grp: 0,
            mask_align: 0,
            mask_base: VISIBLE_PIXELS as usize,
        }
    }

    pub fn reset(&mut self) {
        let bit = self.bit;
        *self = Player::new(bit);
    }

    pub fn pos(&self) -> i16 {
        self.horizontal.pos
    }

    pub fn motion_clock(&self) -> i32 {
        self.horizontal.motion_clock
    }

    fn refresh_current_grp(&mut self, tables: &TiaTables) {
        let grp = if self.horizontal.vdel { self.dgrp } else { self.grp };
        self.current_grp = if self.refp {
            tables.grp_reflect[usize::from(grp)]
        } else {
            grp
        };
    }

    pub fn write_grp(&mut self, value: u8, tables: &TiaTables) {
        self.grp = value;
        self.refresh_current_grp(tables);
    }

    /// Writes to the other player's GRP commit this player's delayed copy.
    pub fn commit_delayed_grp(&mut self, tables: &TiaTables) {
        self.dgrp = self.grp;
        self.refresh_current_grp(tables);
    }

    pub fn write_refp(&mut self, value: u8, tables: &TiaTables) {
        self.refp = value & flags::REFPX_REFLECT != 0;
        self.refresh_current_grp(tables);
    }

    pub fn write_vdel(&mut self, value: u8, tables: &TiaTables) {
        self.horizontal.write_vdel(value);
        self.refresh_current_grp(tables);
    }

    pub fn write_nusiz(&mut self, value: u8) {
        self.nusiz = value;
        self.suppress = 0;
    }

    pub fn apply_hmove(&mut self, beam: &Beam) {
        self.horizontal.apply_hmove(beam);
        self.suppress = 0;
    }

    pub fn clear_suppress(&mut self) {
        self.suppress = 0;
    }

    /// Resolves a RESPx strobe. Returns `None` if the position is unchanged;
    /// the caller commits the returned reset after flushing pixels.
    pub fn prepare_reset(&self, beam: &Beam) -> Option<PlayerReset> {
        let new_pos = self.horizontal.resolve_reset_position(beam, &PLAYER_EDGES);
        if new_pos == self.horizontal.pos {
            return None;
        }
        return Some(PlayerReset {
            new_pos,
            timing: reset_timing(self.nusiz, self.horizontal.pos, new_pos),
        });
    }

    pub fn commit_reset(&mut self, reset: PlayerReset) {
        self.suppress = match reset.timing {
            ResetTiming::DuringDelay => 0,
            _ => 1,
        };
        self.horizontal.pos = reset.new_pos;
    }

    /// Recomputes the mask lookup base for the current position. Called once
    /// per rendered chunk, not per pixel.
    pub fn update_mask(&mut self) {
        let pos = i32::from(self.horizontal.pos);
        self.mask_align = (pos & 0x03) as usize;
        self.mask_base = (VISIBLE_PIXELS - (pos & !0x03)) as usize;
    }

    /// The presence bit of this player at a visible column.
    pub fn enabled(&self, tables: &TiaTables, hpos: usize) -> u8 {
        let mask = tables.player_mask[self.mask_align][usize::from(self.suppress)]
            [usize::from(self.nusiz & 0x07)][self.mask_base + hpos];
        if self.current_grp & mask != 0 {
            self.bit
        } else {
            0
        }
    }

    pub fn save(&self, out: &mut Serializer) {
        self.horizontal.save(out);
        out.put_byte(self.grp);
        out.put_byte(self.dgrp);
        out.put_byte(self.nusiz);
        out.put_bool(self.refp);
        out.put_byte(self.suppress);
        out.put_byte(self.current_grp);
    }

    pub fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        self.horizontal.load(input)?;
        self.grp = input.get_byte()?;
        self.dgrp = input.get_byte()?;
        self.nusiz = input.get_byte()?;
        self.refp = input.get_bool()?;
        self.suppress = input.get_byte()?;
        self.current_grp = input.get_byte()?;
        self.update_mask();
        return Ok(());
    }
}
