//! One of the two missile sprites: a NUSIZ-sized rectangle tied to a player.

use crate::serializer::{Deserializer, SerializationError, Serializer};
use crate::tia::flags;
use crate::tia::horizontal::{clamp_pos, Beam, HorizontalObject, MISSILE_EDGES};
use crate::tia::player::Player;
use crate::tia::tables::TiaTables;
use crate::tia::{NO_HMOVE, VISIBLE_PIXELS};

#[derive(Debug)]
pub(crate) struct Missile {
    pub horizontal: HorizontalObject,
    bit: u8,
    nusiz: u8,
    enable: bool,
    /// While set, the missile is hidden and tracks its player.
    resmp: bool,
    mask_align: usize,
    mask_base: usize,
    mask_size: usize,
    /// Comb-artifact rendering can hide the missile for a whole line.
    line_hidden: bool,
}

impl Missile {
    pub fn new(bit: u8) -> Self {
        Missile {
            horizontal: HorizontalObject::default(),
            bit,
            nusiz: 0,
            enable: false,
            resmp: false,
            mask_align: 0,
            mask_base: VISIBLE_PIXELS as usize,
            mask_size: 0,
            line_hidden: false,
        }
    }

    pub fn reset(&mut self) {
        let bit = self.bit;
        *self = Missile::new(bit);
    }

    pub fn write_enam(&mut self, value: u8) {
        self.enable = value & flags::ENAXX_ENABLE != 0;
    }

    pub fn write_nusiz(&mut self, value: u8) {
        self.nusiz = value;
    }

    /// Handles RESMPx. On the 1-to-0 transition the missile snaps to the
    /// middle of its player, adjusted for any motion difference while an
    /// HMOVE is in flight.
    pub fn write_resmp(&mut self, value: u8, player: &Player, current_hmove_pos: i32) {
        if self.resmp && value & flags::RESMPX_LOCK == 0 {
            // The extra 1-pixel correction is baked into the mask tables.
            let middle = match self.nusiz & 0x07 {
                0x05 => 8,
                0x07 => 16,
                _ => 4,
            };
            let mut pos = i32::from(player.pos()) + middle;
            if current_hmove_pos != NO_HMOVE {
                pos -= 8 - player.motion_clock();
                pos += 8 - self.horizontal.motion_clock;
            }
            self.horizontal.pos = clamp_pos(pos);
        }
        self.resmp = value & flags::RESMPX_LOCK != 0;
    }

    pub fn reset_position(&mut self, beam: &Beam) {
        self.horizontal.pos = self.horizontal.resolve_reset_position(beam, &MISSILE_EDGES);
    }

    /// Recomputes the mask lookup base. While the more-motion-required latch
    /// is armed the missile is redrawn with comb artifacts: doubled and
    /// shifted left, hidden entirely, or normal, cycling with the position.
    pub fn update_mask(&mut self) {
        let pos = i32::from(self.horizontal.pos);
        let size = usize::from((self.nusiz & 0x30) >> 4);
        self.line_hidden = false;
        if self.horizontal.more_motion_required {
            match pos % 4 {
                3 => {
                    self.mask_align = ((pos - 1) & 0x03) as usize;
                    self.mask_base = (VISIBLE_PIXELS - ((pos - 1) & !0x03)) as usize;
                    self.mask_size = size | 1;
                    return;
                }
                2 => {
                    self.line_hidden = true;
                    return;
                }
                _ => {}
            }
        }
        self.mask_align = (pos & 0x03) as usize;
        self.mask_base = (VISIBLE_PIXELS - (pos & !0x03)) as usize;
        self.mask_size = size;
    }

    /// The presence bit of this missile at a visible column.
    pub fn enabled(&self, tables: &TiaTables, hpos: usize) -> u8 {
        if !self.enable || self.resmp || self.line_hidden {
            return 0;
        }
        let mask = tables.missile_mask[self.mask_align][usize::from(self.nusiz & 0x07)]
            [self.mask_size][self.mask_base + hpos];
        if mask != 0 {
            self.bit
        } else {
            0
        }
    }

    pub fn save(&self, out: &mut Serializer) {
        self.horizontal.save(out);
        out.put_bool(self.enable);
        out.put_byte(self.nusiz);
        out.put_bool(self.resmp);
    }

    pub fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        self.horizontal.load(input)?;
        self.enable = input.get_bool()?;
        self.nusiz = input.get_byte()?;
        self.resmp = input.get_bool()?;
        self.update_mask();
        return Ok(());
    }
}
