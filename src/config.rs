//! Fixed configuration of the sensor hub

/// Identifier reported in every telemetry line
pub const DEVICE_ID: &str = "MIZU_0001";

/// No anemometer is fitted yet; this value is reported instead [m/s]
pub const WIND_SPEED_PLACEHOLDER_MS: f32 = 5.2;

pub const SAMPLE_INTERVAL_MS: u32 = 1_000;

pub const TELEMETRY_BAUD: u32 = 9_600;
pub const GPS_BAUD: u32 = 9_600;

/// 12-bit ADC
pub const ADC_MAX_RAW: u16 = 4_095;
/// Input voltage at full scale with 11 dB attenuation [V]
pub const ADC_FULL_SCALE_V: f32 = 3.1;
/// Battery sense goes through a 1:2 resistor divider
pub const BATTERY_DIVIDER_RATIO: f32 = 2.0;

pub const BMP280_ADDRESS: u8 = 0x76;

/// Values that stay the same for the whole run
#[derive(Debug, Clone, Copy)]
pub struct TelemetryConfig {
    pub device_id: &'static str,
    pub wind_speed: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            device_id: DEVICE_ID,
            wind_speed: WIND_SPEED_PLACEHOLDER_MS,
        }
    }
}
