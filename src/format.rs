//! Telemetry line formatting

use core::fmt::Write;

use heapless::String;

use crate::error::TelemetryError;
use crate::model::TelemetryRecord;

/// Large enough for eight fields holding any finite f32
pub const LINE_CAPACITY: usize = 512;

pub type TelemetryLine = String<LINE_CAPACITY>;

/// Render one record as a CRLF-terminated `key=value` line
pub fn format_line(record: &TelemetryRecord<'_>) -> Result<TelemetryLine, TelemetryError> {
    let mut line = TelemetryLine::new();
    write!(
        line,
        "device_id={},ambient_temp={:.2},humidity={:.2},soil_moisture={:.1},soil_temp={:.1},wind_speed={:.1},longitude={:.6},latitude={:.6}\r\n",
        record.device_id,
        record.ambient_temp,
        record.humidity,
        record.soil_moisture,
        record.soil_temp,
        record.wind_speed,
        record.longitude,
        record.latitude,
    )?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryConfig;
    use crate::model::Readings;
    use crate::units::{fahrenheit_to_celsius, fraction_to_percent};

    fn record(readings: &Readings) -> TelemetryLine {
        let config = TelemetryConfig::default();
        format_line(&TelemetryRecord::from_readings(&config, readings)).unwrap()
    }

    #[test]
    fn example_values_line() {
        let config = TelemetryConfig::default();
        let line = format_line(&TelemetryRecord {
            device_id: config.device_id,
            ambient_temp: 25.5,
            humidity: 60.2,
            soil_moisture: 45.8,
            soil_temp: 22.1,
            wind_speed: config.wind_speed,
            longitude: -122.4194,
            latitude: 37.7749,
        })
        .unwrap();

        assert_eq!(
            line.as_str(),
            "device_id=MIZU_0001,ambient_temp=25.50,humidity=60.20,soil_moisture=45.8,soil_temp=22.1,wind_speed=5.2,longitude=-122.419403,latitude=37.774899\r\n"
        );
    }

    #[test]
    fn line_shape() {
        let line = record(&Readings::default());
        let body = line.strip_suffix("\r\n").unwrap();

        assert!(!body.contains('\r') && !body.contains('\n'));
        assert!(!body.contains(' '));

        let fields: heapless::Vec<&str, 16> = body.split(',').collect();
        assert_eq!(fields.len(), 8);

        let keys = [
            "device_id",
            "ambient_temp",
            "humidity",
            "soil_moisture",
            "soil_temp",
            "wind_speed",
            "longitude",
            "latitude",
        ];
        for (field, key) in fields.iter().zip(keys) {
            let (k, v) = field.split_once('=').unwrap();
            assert_eq!(k, key);
            assert!(!v.is_empty());
        }
    }

    #[test]
    fn ambient_77f_humidity_50() {
        let readings = Readings {
            ambient_temperature: fahrenheit_to_celsius(77),
            humidity: 50.0,
            ..Readings::default()
        };
        assert!(record(&readings).contains("ambient_temp=25.00,humidity=50.00"));
    }

    #[test]
    fn freezing_and_boiling_render() {
        let freezing = Readings {
            ambient_temperature: fahrenheit_to_celsius(32),
            ..Readings::default()
        };
        assert!(record(&freezing).contains("ambient_temp=0.00,"));

        let boiling = Readings {
            ambient_temperature: fahrenheit_to_celsius(212),
            ..Readings::default()
        };
        assert!(record(&boiling).contains("ambient_temp=100.00,"));
    }

    #[test]
    fn soil_moisture_one_decimal() {
        let readings = Readings {
            soil_moisture: fraction_to_percent(0.652),
            ..Readings::default()
        };
        assert!(record(&readings).contains("soil_moisture=65.2,"));

        let readings = Readings {
            soil_moisture: fraction_to_percent(0.458),
            ..Readings::default()
        };
        assert!(record(&readings).contains("soil_moisture=45.8,"));
    }

    #[test]
    fn extreme_values_fit_the_buffer() {
        let readings = Readings {
            ambient_temperature: f32::MAX,
            humidity: f32::MIN,
            soil_moisture: f32::MAX,
            board_temperature: f32::MIN,
            latitude: f32::MIN,
            longitude: f32::MAX,
            ..Readings::default()
        };
        let line = record(&readings);
        assert!(line.ends_with("\r\n"));
    }

    #[test]
    fn oversized_device_id_is_reported() {
        let long_id = "X".repeat(LINE_CAPACITY);
        let config = TelemetryConfig {
            device_id: long_id.leak(),
            ..TelemetryConfig::default()
        };
        let result = format_line(&TelemetryRecord::from_readings(&config, &Readings::default()));
        assert_eq!(result, Err(TelemetryError::Format));
    }
}
