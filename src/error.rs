//! Error types for sensor reads and telemetry output

use core::fmt;

/// Failure of a single collaborator read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C/UART/ADC transfer failed
    Bus,
    /// Device did not answer in time
    Timeout,
    /// Frame or sentence checksum mismatch
    Checksum,
    /// Data arrived but could not be parsed
    Malformed,
    /// Read attempted before the device was set up
    NotInitialized,
    /// Device answered without the data we asked for
    NoData,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus error"),
            Self::Timeout => write!(f, "sensor timeout"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Malformed => write!(f, "malformed data"),
            Self::NotInitialized => write!(f, "sensor not initialized"),
            Self::NoData => write!(f, "no data"),
        }
    }
}

impl core::error::Error for SensorError {}

/// Failure to produce or deliver a telemetry line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The formatted line did not fit the line buffer
    Format,
    /// The transport rejected the write
    Link(embedded_io::ErrorKind),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "telemetry line overflow"),
            Self::Link(kind) => write!(f, "telemetry link error: {:?}", kind),
        }
    }
}

impl core::error::Error for TelemetryError {}

impl From<fmt::Error> for TelemetryError {
    fn from(_: fmt::Error) -> Self {
        Self::Format
    }
}
