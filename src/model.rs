// Model of the data read in this app

use crate::config::TelemetryConfig;
use crate::units::{fahrenheit_to_celsius, fraction_to_percent};

/// Raw DHT11-style reading, integer units as the sensor reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentReading {
    pub fahrenheit: i32,
    pub humidity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn from_indicator(c: u8) -> Option<Self> {
        match c {
            b'N' => Some(Self::North),
            b'S' => Some(Self::South),
            b'E' => Some(Self::East),
            b'W' => Some(Self::West),
            _ => None,
        }
    }

    pub fn indicator(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
            Self::East => 'E',
            Self::West => 'W',
        }
    }

    fn sign(self) -> f32 {
        match self {
            Self::South | Self::West => -1.0,
            Self::North | Self::East => 1.0,
        }
    }
}

/// Unsigned coordinates plus hemisphere indicators, as GGA carries them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f32,
    pub lat_hemisphere: Hemisphere,
    pub longitude: f32,
    pub lon_hemisphere: Hemisphere,
}

impl Position {
    pub fn signed_latitude(&self) -> f32 {
        self.latitude * self.lat_hemisphere.sign()
    }

    pub fn signed_longitude(&self) -> f32 {
        self.longitude * self.lon_hemisphere.sign()
    }
}

/// One GGA fix. `position` is `None` when the receiver sent empty fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GgaFix {
    /// UTC time as hhmmss.sss
    pub time: f32,
    pub position: Option<Position>,
    pub quality: u8,
    pub satellites: u8,
    pub horizontal_dilution: f32,
    pub altitude: f32,
    pub altitude_unit: char,
    pub fix_valid: bool,
}

/// Last known value of every sensor. Failed reads leave the previous value in
/// place, so a line can always be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    pub battery_voltage: f32,
    pub board_temperature: f32,
    pub ambient_temperature: f32,
    pub humidity: f32,
    pub soil_moisture: f32,
    pub latitude: f32,
    pub longitude: f32,
    pub fix_valid: bool,
}

impl Readings {
    pub fn apply_environment(&mut self, env: EnvironmentReading) {
        self.ambient_temperature = fahrenheit_to_celsius(env.fahrenheit);
        self.humidity = env.humidity as f32;
    }

    pub fn apply_soil(&mut self, fraction: f32) {
        self.soil_moisture = fraction_to_percent(fraction);
    }

    /// Coordinates are only replaced when the fix carries a position
    pub fn apply_fix(&mut self, fix: &GgaFix) {
        if let Some(position) = fix.position {
            self.latitude = position.signed_latitude();
            self.longitude = position.signed_longitude();
        }
        self.fix_valid = fix.fix_valid;
    }
}

/// One telemetry sample as it goes out on the link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord<'a> {
    pub device_id: &'a str,
    pub ambient_temp: f32,
    pub humidity: f32,
    pub soil_moisture: f32,
    /// The board sensor stands in until a soil temperature probe is fitted
    pub soil_temp: f32,
    pub wind_speed: f32,
    pub longitude: f32,
    pub latitude: f32,
}

impl<'a> TelemetryRecord<'a> {
    pub fn from_readings(config: &'a TelemetryConfig, readings: &Readings) -> Self {
        Self {
            device_id: config.device_id,
            ambient_temp: readings.ambient_temperature,
            humidity: readings.humidity,
            soil_moisture: readings.soil_moisture,
            soil_temp: readings.board_temperature,
            wind_speed: config.wind_speed,
            longitude: readings.longitude,
            latitude: readings.latitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_at(position: Option<Position>, fix_valid: bool) -> GgaFix {
        GgaFix {
            time: 0.0,
            position,
            quality: fix_valid as u8,
            satellites: 0,
            horizontal_dilution: 99.99,
            altitude: 0.0,
            altitude_unit: 'M',
            fix_valid,
        }
    }

    #[test]
    fn western_longitude_is_negative() {
        let position = Position {
            latitude: 37.7749,
            lat_hemisphere: Hemisphere::North,
            longitude: 122.4194,
            lon_hemisphere: Hemisphere::West,
        };
        assert_eq!(position.signed_latitude(), 37.7749);
        assert_eq!(position.signed_longitude(), -122.4194);
    }

    #[test]
    fn southern_latitude_is_negative() {
        let position = Position {
            latitude: 33.8688,
            lat_hemisphere: Hemisphere::South,
            longitude: 151.2093,
            lon_hemisphere: Hemisphere::East,
        };
        assert_eq!(position.signed_latitude(), -33.8688);
        assert_eq!(position.signed_longitude(), 151.2093);
    }

    #[test]
    fn empty_position_keeps_held_coordinates() {
        let mut readings = Readings::default();
        readings.apply_fix(&fix_at(
            Some(Position {
                latitude: 10.0,
                lat_hemisphere: Hemisphere::North,
                longitude: 20.0,
                lon_hemisphere: Hemisphere::East,
            }),
            true,
        ));
        readings.apply_fix(&fix_at(None, false));

        assert_eq!(readings.latitude, 10.0);
        assert_eq!(readings.longitude, 20.0);
        assert!(!readings.fix_valid);
    }

    #[test]
    fn invalid_fix_with_position_still_updates() {
        let mut readings = Readings::default();
        readings.apply_fix(&fix_at(
            Some(Position {
                latitude: 1.5,
                lat_hemisphere: Hemisphere::North,
                longitude: 2.5,
                lon_hemisphere: Hemisphere::East,
            }),
            false,
        ));
        assert_eq!(readings.latitude, 1.5);
        assert_eq!(readings.longitude, 2.5);
    }

    #[test]
    fn record_uses_board_temperature_for_soil() {
        let config = TelemetryConfig::default();
        let readings = Readings {
            board_temperature: 22.1,
            ..Readings::default()
        };
        let record = TelemetryRecord::from_readings(&config, &readings);
        assert_eq!(record.soil_temp, 22.1);
        assert_eq!(record.wind_speed, 5.2);
        assert_eq!(record.device_id, "MIZU_0001");
    }

    #[test]
    fn hemisphere_indicators() {
        assert_eq!(Hemisphere::from_indicator(b'W'), Some(Hemisphere::West));
        assert_eq!(Hemisphere::from_indicator(b'x'), None);
        assert_eq!(Hemisphere::South.indicator(), 'S');
    }
}
