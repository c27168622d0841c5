//! Tagged byte-stream serialization for save states.
//!
//! The format is a flat sequence of primitives, little-endian, with strings
//! length-prefixed. Each device writes a name tag first so that a stream
//! loaded into the wrong device is rejected instead of silently misparsed.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializationError {
    #[error("unexpected end of stream at byte {position}")]
    Truncated { position: usize },
    #[error("device tag mismatch: expected {expected:?}, found {found:?}")]
    TagMismatch { expected: String, found: String },
    #[error("invalid boolean byte {value:#04X} at byte {position}")]
    InvalidBool { value: u8, position: usize },
    #[error("string length {length} exceeds remaining stream")]
    BadStringLength { length: usize },
}

/// Accumulates a save-state stream in memory.
#[derive(Debug, Default)]
pub struct Serializer {
    data: Vec<u8>,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn put_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.data.push(if value { BOOL_TRUE } else { BOOL_FALSE });
    }

    pub fn put_short(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_int(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_string(&mut self, value: &str) {
        self.put_int(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
    }

    pub fn put_byte_array(&mut self, values: &[u8]) {
        self.put_int(values.len() as u32);
        self.data.extend_from_slice(values);
    }
}

/// Reads a save-state stream back. Keeps a cursor so that consecutive `get_*`
/// calls walk the stream in the order it was written.
#[derive(Debug)]
pub struct Deserializer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Deserializer { data, position: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], SerializationError> {
        if self.position + count > self.data.len() {
            return Err(SerializationError::Truncated {
                position: self.position,
            });
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        return Ok(slice);
    }

    pub fn get_byte(&mut self) -> Result<u8, SerializationError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool, SerializationError> {
        let position = self.position;
        match self.get_byte()? {
            BOOL_TRUE => Ok(true),
            BOOL_FALSE => Ok(false),
            value => Err(SerializationError::InvalidBool { value, position }),
        }
    }

    pub fn get_short(&mut self) -> Result<u16, SerializationError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_int(&mut self) -> Result<u32, SerializationError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_string(&mut self) -> Result<String, SerializationError> {
        let length = self.get_int()? as usize;
        if self.position + length > self.data.len() {
            return Err(SerializationError::BadStringLength { length });
        }
        let bytes = self.take(length)?;
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    pub fn get_byte_array(&mut self) -> Result<Vec<u8>, SerializationError> {
        let length = self.get_int()? as usize;
        Ok(self.take(length)?.to_vec())
    }

    /// Reads a string and verifies it against an expected device tag.
    pub fn expect_tag(&mut self, expected: &str) -> Result<(), SerializationError> {
        let found = self.get_string()?;
        if found != expected {
            return Err(SerializationError::TagMismatch {
                expected: expected.to_string(),
                found,
            });
        }
        return Ok(());
    }
}

const BOOL_TRUE: u8 = 0xFE;
const BOOL_FALSE: u8 = 0x01;
