//! DHT11 frame decoding

use crate::error::SensorError;
use crate::model::EnvironmentReading;
use crate::units::celsius_to_fahrenheit_trunc;

/// Bits per transfer: humidity (2 bytes), temperature (2 bytes), checksum
pub const FRAME_BITS: usize = 40;

/// A high pulse longer than this is a `1` bit [us]
pub const ONE_BIT_THRESHOLD_US: u32 = 40;

/// Decoded DHT11 transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub humidity: u8,
    pub humidity_decimal: u8,
    pub temperature: u8,
    pub temperature_decimal: u8,
}

impl Frame {
    pub fn decode(bytes: [u8; 5]) -> Result<Self, SensorError> {
        let sum = bytes[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != bytes[4] {
            return Err(SensorError::Checksum);
        }
        Ok(Self {
            humidity: bytes[0],
            humidity_decimal: bytes[1],
            temperature: bytes[2],
            temperature_decimal: bytes[3],
        })
    }

    /// Assemble the five bytes from the measured high-pulse widths
    pub fn from_pulses(pulses_us: &[u32; FRAME_BITS]) -> Result<Self, SensorError> {
        let mut bytes = [0u8; 5];
        for (i, width) in pulses_us.iter().enumerate() {
            if *width > ONE_BIT_THRESHOLD_US {
                bytes[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Self::decode(bytes)
    }

    pub fn fahrenheit(&self) -> i32 {
        celsius_to_fahrenheit_trunc(self.temperature as i32)
    }

    pub fn reading(&self) -> EnvironmentReading {
        EnvironmentReading {
            fahrenheit: self.fahrenheit(),
            humidity: self.humidity as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_frame() {
        let frame = Frame::decode([50, 0, 25, 0, 75]).unwrap();
        assert_eq!(frame.humidity, 50);
        assert_eq!(frame.temperature, 25);
        assert_eq!(
            frame.reading(),
            EnvironmentReading {
                fahrenheit: 77,
                humidity: 50
            }
        );
    }

    #[test]
    fn checksum_wraps() {
        let frame = Frame::decode([200, 100, 0, 0, 44]);
        assert!(frame.is_ok());
    }

    #[test]
    fn rejects_bad_checksum() {
        assert_eq!(Frame::decode([50, 0, 25, 0, 76]), Err(SensorError::Checksum));
    }

    #[test]
    fn pulses_to_bits() {
        let bytes = [60u8, 0, 22, 0, 82];
        let mut pulses = [26u32; FRAME_BITS];
        for (i, pulse) in pulses.iter_mut().enumerate() {
            if bytes[i / 8] & (0x80 >> (i % 8)) != 0 {
                *pulse = 70;
            }
        }

        let frame = Frame::from_pulses(&pulses).unwrap();
        assert_eq!(frame.humidity, 60);
        assert_eq!(frame.temperature, 22);
        assert_eq!(frame.fahrenheit(), 71);
    }
}
