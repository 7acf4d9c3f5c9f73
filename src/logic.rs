//! Sample-and-report loop (hardware-independent)

use embedded_hal::delay::DelayNs;
use embedded_io::{Error as _, Write};
use log::{debug, warn};

use crate::config::{SAMPLE_INTERVAL_MS, TelemetryConfig};
use crate::error::{SensorError, TelemetryError};
use crate::format::{TelemetryLine, format_line};
use crate::model::{Readings, TelemetryRecord};
use crate::traits::{BoardThermometer, EnvironmentSensor, GpsReceiver, PowerMonitor, SoilProbe};

/// The sensors polled on every tick, in read order
pub struct Sensors<P, B, E, S, G> {
    pub power: P,
    pub board: B,
    pub environment: E,
    pub soil: S,
    pub gps: G,
}

/// Owns every collaborator and the last known readings
pub struct TelemetryLogger<P, B, E, S, G, L> {
    config: TelemetryConfig,
    sensors: Sensors<P, B, E, S, G>,
    link: L,
    readings: Readings,
    ticks: u32,
}

fn hold<T>(sensor: &str, result: Result<T, SensorError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} read failed: {}, keeping last value", sensor, e);
            None
        }
    }
}

/// Hand one complete line to the transport
pub fn write_line<L: Write>(link: &mut L, line: &[u8]) -> Result<(), TelemetryError> {
    link.write_all(line)
        .map_err(|e| TelemetryError::Link(e.kind()))?;
    link.flush().map_err(|e| TelemetryError::Link(e.kind()))
}

impl<P, B, E, S, G, L> TelemetryLogger<P, B, E, S, G, L>
where
    P: PowerMonitor,
    B: BoardThermometer,
    E: EnvironmentSensor,
    S: SoilProbe,
    G: GpsReceiver,
    L: Write,
{
    pub fn new(config: TelemetryConfig, sensors: Sensors<P, B, E, S, G>, link: L) -> Self {
        Self {
            config,
            sensors,
            link,
            readings: Readings::default(),
            ticks: 0,
        }
    }

    /// One-time setup before the first tick. A GPS that refuses the setup
    /// keeps its factory output, which still includes GGA.
    pub fn start(&mut self) {
        if let Err(e) = self.sensors.gps.configure() {
            warn!("GPS setup failed: {}", e);
        }
    }

    /// Poll every sensor in the fixed order and update the held readings
    pub fn sample(&mut self) -> &Readings {
        let readings = &mut self.readings;

        if let Some(v) = hold("battery", self.sensors.power.read_voltage()) {
            readings.battery_voltage = v;
        }
        if let Some(t) = hold("board temperature", self.sensors.board.read_temperature()) {
            readings.board_temperature = t;
        }
        if let Some(env) = hold("environment", self.sensors.environment.read()) {
            readings.apply_environment(env);
        }
        if let Some(fraction) = hold("soil moisture", self.sensors.soil.read()) {
            readings.apply_soil(fraction);
        }
        if let Some(fix) = hold("GPS", self.sensors.gps.read_fix()) {
            match &fix.position {
                Some(pos) => debug!(
                    "GGA time={} pos={:.6}{} {:.6}{} quality={} sats={} hdop={} alt={}{}",
                    fix.time,
                    pos.latitude,
                    pos.lat_hemisphere.indicator(),
                    pos.longitude,
                    pos.lon_hemisphere.indicator(),
                    fix.quality,
                    fix.satellites,
                    fix.horizontal_dilution,
                    fix.altitude,
                    fix.altitude_unit
                ),
                None => debug!("GGA time={} no position quality={}", fix.time, fix.quality),
            }
            if !fix.fix_valid {
                warn!("GPS has no valid fix, reporting last position");
            }
            readings.apply_fix(&fix);
        }

        &self.readings
    }

    /// Format the held readings into a telemetry line
    pub fn render(&self) -> Result<TelemetryLine, TelemetryError> {
        format_line(&TelemetryRecord::from_readings(&self.config, &self.readings))
    }

    /// One read-format-transmit cycle
    pub fn tick(&mut self) -> Result<TelemetryLine, TelemetryError> {
        self.sample();
        self.ticks = self.ticks.wrapping_add(1);
        debug!(
            "tick {} battery={:.2}V gps_valid={}",
            self.ticks, self.readings.battery_voltage, self.readings.fix_valid
        );

        let line = self.render()?;
        write_line(&mut self.link, line.as_bytes())?;
        Ok(line)
    }

    /// Run `count` ticks with the sample interval in between. Errors are
    /// logged and do not stop the run.
    pub fn run_ticks<D: DelayNs>(&mut self, count: u32, delay: &mut D) {
        for _ in 0..count {
            if let Err(e) = self.tick() {
                warn!("tick failed: {}", e);
            }
            delay.delay_ms(SAMPLE_INTERVAL_MS);
        }
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
