//! Hardware abstraction traits

use crate::error::SensorError;
use crate::model::{EnvironmentReading, GgaFix};

/// Trait for the battery / power system monitor
pub trait PowerMonitor {
    /// Read battery voltage in volts
    fn read_voltage(&mut self) -> Result<f32, SensorError>;
}

/// Trait for the on-board temperature sensor
pub trait BoardThermometer {
    /// Read temperature in Celsius
    fn read_temperature(&mut self) -> Result<f32, SensorError>;
}

/// A thermometer that failed to come up at boot
impl<T: BoardThermometer> BoardThermometer for Option<T> {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        match self {
            Some(sensor) => sensor.read_temperature(),
            None => Err(SensorError::NotInitialized),
        }
    }
}

/// Trait for the ambient temperature/humidity sensor
pub trait EnvironmentSensor {
    /// Trigger a measurement and return it in the sensor's native integer units
    fn read(&mut self) -> Result<EnvironmentReading, SensorError>;
}

/// Trait for the analog soil moisture probe
pub trait SoilProbe {
    /// Read the probe as a fraction of full scale, `0.0..=1.0`
    fn read(&mut self) -> Result<f32, SensorError>;
}

/// Trait for the GPS receiver
pub trait GpsReceiver {
    /// One-time receiver setup (output sentences, fix rate)
    fn configure(&mut self) -> Result<(), SensorError>;

    /// Return the most recent GGA fix, blocking only if none has arrived
    /// since the last call
    fn read_fix(&mut self) -> Result<GgaFix, SensorError>;
}
