//! The playfield: a 20-bit pattern covering half the screen, repeated or
//! mirrored on the right half.

use crate::serializer::{Deserializer, SerializationError, Serializer};
use crate::tia::flags;
use crate::tia::tables::TiaTables;

#[derive(Debug, Default)]
pub(crate) struct Playfield {
    /// The assembled 20-bit pattern: PF0's upper nibble in bits 0-3, PF1 in
    /// bits 4-11, PF2 in bits 12-19.
    pf: u32,
    ctrlpf: u8,
    /// CTRLPF priority and score bits, pre-shifted into priority encoder
    /// index position.
    priority_and_score: u8,
}

impl Playfield {
    pub fn reset(&mut self) {
        *self = Playfield::default();
    }

    /// PF0 supplies the pattern's low 4 bits from its upper nibble.
    pub fn write_pf0(&mut self, value: u8) {
        self.pf = (self.pf & 0x000F_FFF0) | u32::from((value >> 4) & 0x0F);
    }

    /// PF1 supplies the middle 8 bits.
    pub fn write_pf1(&mut self, value: u8) {
        self.pf = (self.pf & 0x000F_F00F) | (u32::from(value) << 4);
    }

    /// PF2 supplies the high 8 bits.
    pub fn write_pf2(&mut self, value: u8) {
        self.pf = (self.pf & 0x0000_0FFF) | (u32::from(value) << 12);
    }

    pub fn write_ctrlpf(&mut self, value: u8) {
        self.ctrlpf = value;
        // Pre-shift the score/priority bits so the pixel loop can OR them
        // straight into the priority encoder index.
        self.priority_and_score = (value & (flags::CTRLPF_SCORE | flags::CTRLPF_PRIORITY)) << 5;
    }

    pub fn priority_and_score(&self) -> u8 {
        self.priority_and_score
    }

    /// The presence bit of the playfield at a visible column.
    pub fn enabled(&self, tables: &TiaTables, hpos: usize) -> u8 {
        let reflect = usize::from(self.ctrlpf & flags::CTRLPF_REFLECT);
        if self.pf & tables.playfield_mask[reflect][hpos] != 0 {
            flags::PF_BIT
        } else {
            0
        }
    }

    pub fn save(&self, out: &mut Serializer) {
        out.put_byte(self.ctrlpf);
        out.put_int(self.pf);
        out.put_byte(self.priority_and_score);
    }

    pub fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        self.ctrlpf = input.get_byte()?;
        self.pf = input.get_int()?;
        self.priority_and_score = input.get_byte()?;
        return Ok(());
    }
}
