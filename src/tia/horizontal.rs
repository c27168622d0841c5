//! Horizontal motion engine shared by players, missiles and the ball.
//!
//! Every movable object owns a [`HorizontalObject`] holding its position, its
//! HMxx register nibble and the bookkeeping needed to apply HMOVE strobes that
//! land at awkward points of the scanline. The more exotic paths here (HMxx
//! writes while an HMOVE is still in flight, the "more motion required" latch
//! and its 17-clock correction) reproduce undocumented chip behavior that
//! games like Cosmic Ark depend on, down to the 0x70/0x80 magic values.

use crate::serializer::{Deserializer, SerializationError, Serializer};
use crate::tia::{HBLANK_CLOCKS, NO_HMOVE, VISIBLE_PIXELS};

/// Where the beam and the HMOVE bookkeeping stand at the moment a register
/// event is processed. `hpos` counts color clocks from the start of the
/// visible area, so horizontal blank spans `[-68, 0)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Beam {
    pub hpos: i32,
    pub current_hmove_pos: i32,
    pub previous_hmove_pos: i32,
}

/// Subtype-specific constants for RESxx strobes. The serial graphics shift
/// differs by one clock between players and missiles/ball, which moves both
/// the landing column and the edge below which a reset collapses to it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResetEdges {
    pub landing: i16,
    pub offset: i32,
    pub previous_edge: i32,
}

pub(crate) const PLAYER_EDGES: ResetEdges = ResetEdges {
    landing: 3,
    offset: 5,
    previous_edge: -2,
};

pub(crate) const MISSILE_EDGES: ResetEdges = ResetEdges {
    landing: 2,
    offset: 4,
    previous_edge: -1,
};

pub(crate) const BALL_EDGES: ResetEdges = ResetEdges {
    landing: 2,
    offset: 4,
    previous_edge: 0,
};

/// While an HMOVE is active, a reset collapses to the landing column anywhere
/// below this beam position.
const ACTIVE_EDGE: i32 = 7;

pub(crate) fn clamp_pos(pos: i32) -> i16 {
    pos.rem_euclid(VISIBLE_PIXELS) as i16
}

#[derive(Debug, Default)]
pub(crate) struct HorizontalObject {
    /// Position of the object on the scanline, in `[0, 160)`.
    pub pos: i16,
    /// Last written HMxx value; only the top nibble is kept.
    pub hm: u8,
    /// Motion clocks still to be applied from the pending HMOVE.
    pub motion_clock: i32,
    /// The "more motion required" latch; set by HMxx writes that force a full
    /// 15-clock shift and only cleared by the next HMOVE.
    pub more_motion_required: bool,
    /// Vertical delay (VDELxx) flag.
    pub vdel: bool,
}

impl HorizontalObject {
    /// Signed motion clock count encoded in an HMxx nibble, in `[0, 15]`
    /// hardware counter terms.
    fn motion_from(hm: u8) -> i32 {
        (i32::from(hm) ^ 0x80) >> 4
    }

    pub fn reset(&mut self) {
        *self = HorizontalObject::default();
    }

    pub fn write_vdel(&mut self, value: u8) {
        self.vdel = value & 0x01 != 0;
    }

    /// Handles a write to the object's HMxx register.
    ///
    /// If an HMOVE is still in flight and the new value lets the motion
    /// counter stop normally, the position is adjusted incrementally.
    /// Otherwise the object takes the maximal 15-clock shift, and unless the
    /// written value is one of the two nibbles whose comparison can still
    /// succeed (0x70, 0x80), the more-motion-required latch is armed.
    pub fn write_motion(&mut self, value: u8, beam: &Beam) {
        let value = value & 0xF0;
        if self.hm == value {
            return;
        }
        if beam.current_hmove_pos != NO_HMOVE
            && beam.hpos < (beam.current_hmove_pos + 6 + self.motion_clock * 4).min(ACTIVE_EDGE)
        {
            let new_motion = Self::motion_from(value);
            if new_motion > self.motion_clock
                || beam.hpos <= (beam.current_hmove_pos + 6 + new_motion * 4).min(ACTIVE_EDGE)
            {
                self.pos = clamp_pos(i32::from(self.pos) - (new_motion - self.motion_clock));
                self.motion_clock = new_motion;
            } else {
                self.pos = clamp_pos(i32::from(self.pos) - (15 - self.motion_clock));
                self.motion_clock = 15;
                if value != 0x70 && value != 0x80 {
                    self.more_motion_required = true;
                }
            }
        }
        self.hm = value;
    }

    /// Handles an HMOVE strobe.
    ///
    /// Strobes within the window `hpos in [-5, 97)` are ignored entirely (the
    /// caller also resets its HMOVE pointer). Strobes overlapping active
    /// display have their motion clipped by the number of decrement pulses
    /// already elapsed; strobes fully outside the display apply the usual
    /// `8 - motion` shift immediately.
    pub fn apply_hmove(&mut self, beam: &Beam) {
        // Fold in the pending comb-artifact correction before recomputing.
        if beam.hpos < 0 && self.more_motion_required {
            let cycle_fix = 17 - (beam.hpos + HBLANK_CLOCKS + 7) / 4;
            self.pos = ((i32::from(self.pos) + cycle_fix) % VISIBLE_PIXELS) as i16;
        }
        self.more_motion_required = false;

        if beam.hpos >= -5 && beam.hpos < 97 {
            self.motion_clock = 0;
            return;
        }

        self.motion_clock = Self::motion_from(self.hm);
        if beam.hpos >= 97 && beam.hpos < 151 {
            let skipped = (VISIBLE_PIXELS - beam.hpos - 6) >> 2;
            self.motion_clock = (self.motion_clock - skipped).max(0);
        }
        if beam.hpos >= -56 && beam.hpos < -5 {
            let max_clocks = (7 - (beam.hpos + 5)) >> 2;
            self.motion_clock = self.motion_clock.min(max_clocks);
        }
        if beam.hpos < -5 || beam.hpos >= 157 {
            self.pos = clamp_pos(i32::from(self.pos) + 8 - self.motion_clock);
        }
    }

    /// Converts the beam position of a RESxx strobe into the object's new
    /// column, accounting for a currently active or just-finished HMOVE.
    pub fn resolve_reset_position(&self, beam: &Beam, edges: &ResetEdges) -> i16 {
        let mut pos;
        if beam.current_hmove_pos != NO_HMOVE {
            pos = if beam.hpos < ACTIVE_EDGE {
                edges.landing
            } else {
                ((beam.hpos + edges.offset) % VISIBLE_PIXELS) as i16
            };
            self.apply_active_hmove_motion(beam, &mut pos);
        } else {
            pos = if beam.hpos < edges.previous_edge {
                edges.landing
            } else {
                ((beam.hpos + edges.offset) % VISIBLE_PIXELS) as i16
            };
            self.apply_previous_hmove_motion(beam, &mut pos);
        }
        return clamp_pos(i32::from(pos));
    }

    fn apply_active_hmove_motion(&self, beam: &Beam, pos: &mut i16) {
        if beam.hpos < (beam.current_hmove_pos + 6 + 16 * 4).min(ACTIVE_EDGE) {
            let decrements_passed = (beam.hpos - (beam.current_hmove_pos + 4)) >> 2;
            *pos += 8;
            if self.motion_clock - decrements_passed > 0 {
                *pos -= (self.motion_clock - decrements_passed) as i16;
                if *pos < 0 {
                    *pos += VISIBLE_PIXELS as i16;
                }
            }
        }
    }

    fn apply_previous_hmove_motion(&self, beam: &Beam, pos: &mut i16) {
        if beam.previous_hmove_pos != NO_HMOVE {
            let motion = Self::motion_from(self.hm);
            let start = beam.previous_hmove_pos - 228;
            if beam.hpos <= start + 5 + motion * 4 {
                let passed = (beam.hpos - (start + 6)) >> 2;
                *pos -= (motion - passed) as i16;
            }
        }
    }

    /// Called once per scanline transition: applies motion from an HMOVE that
    /// was strobed mid-display (which only moves objects on the next line)
    /// and the 17-clock more-motion-required correction.
    pub fn apply_pending_motions(&mut self, current_hmove_pos: i32) {
        if current_hmove_pos != NO_HMOVE && (97..157).contains(&current_hmove_pos) {
            self.pos = clamp_pos(i32::from(self.pos) - self.motion_clock);
        }
        if self.more_motion_required {
            self.pos = clamp_pos(i32::from(self.pos) - 17);
        }
    }

    pub fn save(&self, out: &mut Serializer) {
        out.put_byte(self.hm);
        out.put_bool(self.vdel);
        out.put_short(self.pos as u16);
        out.put_int(self.motion_clock as u32);
        out.put_bool(self.more_motion_required);
    }

    pub fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        self.hm = input.get_byte()?;
        self.vdel = input.get_bool()?;
        self.pos = input.get_short()? as i16;
        self.motion_clock = input.get_int()? as i32;
        self.more_motion_required = input.get_bool()?;
        return Ok(());
    }
}
