//! The ball: a 1/2/4/8-clock rectangle sharing the playfield's color.

use crate::serializer::{Deserializer, SerializationError, Serializer};
use crate::tia::flags;
use crate::tia::horizontal::{Beam, HorizontalObject, BALL_EDGES};
use crate::tia::tables::TiaTables;
use crate::tia::VISIBLE_PIXELS;

#[derive(Debug)]
pub(crate) struct Ball {
    pub horizontal: HorizontalObject,
    ctrlpf: u8,
    enable: bool,
    /// Delayed copy of the enable flag, committed by writes to GRP1.
    denable: bool,
    /// The enable flag actually rendered, with vertical delay applied.
    current_enabled: bool,
    mask_align: usize,
    mask_base: usize,
}

impl Ball {
    pub fn new() -> Self {
        Ball {
            horizontal: HorizontalObject::default(),
            ctrlpf: 0,
            enable: false,
            denable: false,
            current_enabled: false,
            mask_align: 0,
            mask_base: VISIBLE_PIXELS as usize,
        }
    }

    pub fn reset(&mut self) {
        *self = Ball::new();
    }

    fn refresh_current_enabled(&mut self) {
        self.current_enabled = if self.horizontal.vdel {
            self.denable
        } else {
            self.enable
        };
    }

    pub fn write_enabl(&mut self, value: u8) {
        self.enable = value & flags::ENAXX_ENABLE != 0;
        self.refresh_current_enabled();
    }

    /// Writes to GRP1 commit the ball's delayed enable.
    pub fn commit_delayed_enable(&mut self) {
        self.denable = self.enable;
        self.refresh_current_enabled();
    }

    pub fn write_vdel(&mut self, value: u8) {
        self.horizontal.write_vdel(value);
        self.refresh_current_enabled();
    }

    pub fn write_ctrlpf(&mut self, value: u8) {
        self.ctrlpf = value;
    }

    pub fn reset_position(&mut self, beam: &Beam) {
        self.horizontal.pos = self.horizontal.resolve_reset_position(beam, &BALL_EDGES);
    }

    pub fn update_mask(&mut self) {
        let pos = i32::from(self.horizontal.pos);
        self.mask_align = (pos & 0x03) as usize;
        self.mask_base = (VISIBLE_PIXELS - (pos & !0x03)) as usize;
    }

    /// The presence bit of the ball at a visible column.
    pub fn enabled(&self, tables: &TiaTables, hpos: usize) -> u8 {
        if !self.current_enabled {
            return 0;
        }
        let size = usize::from((self.ctrlpf & 0x30) >> 4);
        if tables.ball_mask[self.mask_align][size][self.mask_base + hpos] != 0 {
            flags::BL_BIT
        } else {
            0
        }
    }

    pub fn save(&self, out: &mut Serializer) {
        self.horizontal.save(out);
        out.put_bool(self.enable);
        out.put_byte(self.ctrlpf);
        out.put_bool(self.denable);
        out.put_bool(self.current_enabled);
    }

    pub fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        self.horizontal.load(input)?;
        self.enable = input.get_bool()?;
        self.ctrlpf = input.get_byte()?;
        self.denable = input.get_bool()?;
        self.current_enabled = input.get_bool()?;
        self.update_mask();
        return Ok(());
    }
}
