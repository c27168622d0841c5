//! Seam to the audio collaborator.
//!
//! The TIA forwards AUDC/AUDF/AUDV writes with a CPU-cycle timestamp; turning
//! those into samples happens elsewhere.

use crate::serializer::{Deserializer, SerializationError, Serializer};

pub trait Sound {
    /// Resets the sound device to its power-on state.
    fn reset(&mut self);

    /// Records a write to an audio register at the given CPU cycle.
    fn set(&mut self, address: u16, value: u8, cycle: i32);

    /// Shifts the device's notion of the cycle counter; called when the CPU
    /// cycle counter is rebased at a frame boundary.
    fn adjust_cycle_counter(&mut self, delta: i32);

    fn save(&self, out: &mut Serializer) -> Result<(), SerializationError>;

    fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError>;
}

/// Discards all audio. Useful for headless operation and tests.
#[derive(Debug, Default)]
pub struct NullSound;

impl Sound for NullSound {
    fn reset(&mut self) {}

    fn set(&mut self, _address: u16, _value: u8, _cycle: i32) {}

    fn adjust_cycle_counter(&mut self, _delta: i32) {}

    fn save(&self, out: &mut Serializer) -> Result<(), SerializationError> {
        out.put_string(NULL_SOUND_TAG);
        return Ok(());
    }

    fn load(&mut self, input: &mut Deserializer) -> Result<(), SerializationError> {
        input.expect_tag(NULL_SOUND_TAG)
    }
}

const NULL_SOUND_TAG: &str = "NullSound";
