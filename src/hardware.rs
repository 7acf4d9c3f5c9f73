use esp_hal::gpio::AnyPin;
use esp_hal::{
    Blocking,
    analog::adc::{Adc, AdcConfig, AdcPin, Attenuation},
    delay::Delay,
    gpio::{DriveMode, Flex, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, I2c},
    peripherals::{ADC1, ADC2, GPIO4, GPIO11, I2C0, UART1, UART2},
    time::{Instant, Rate},
    uart::{Config as UartConfig, Uart},
};

use crate::config::{
    ADC_FULL_SCALE_V, ADC_MAX_RAW, BATTERY_DIVIDER_RATIO, BMP280_ADDRESS, GPS_BAUD,
    TELEMETRY_BAUD,
};
use crate::dht11::{FRAME_BITS, Frame};
use crate::error::SensorError;
use crate::model::{EnvironmentReading, GgaFix};
use crate::nmea::{self, SentenceBuffer};
use crate::traits::{BoardThermometer, EnvironmentSensor, GpsReceiver, PowerMonitor, SoilProbe};

/// Sentences to skip while waiting for a GGA before giving up on this tick
const MAX_SENTENCES_PER_FIX: usize = 16;
const RX_CHUNK_LEN: usize = 64;
/// Upper bound on one drain, a few seconds of 9600 baud
const MAX_DRAIN_CHUNKS: usize = 64;

const DHT11_START_LOW_MS: u32 = 20;
const DHT11_PULSE_TIMEOUT_US: u64 = 200;

fn adc_fraction(raw: u16) -> f32 {
    raw.min(ADC_MAX_RAW) as f32 / ADC_MAX_RAW as f32
}

pub struct BatteryMonitor<'a> {
    adc: Adc<'a, ADC2<'a>, Blocking>,
    pin: AdcPin<GPIO11<'a>, ADC2<'a>>,
}

impl<'a> BatteryMonitor<'a> {
    pub fn new(adc_periph: ADC2<'a>, sense: GPIO11<'a>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(sense, Attenuation::_11dB);
        let adc = Adc::new(adc_periph, config);

        Self { adc, pin }
    }
}

impl PowerMonitor for BatteryMonitor<'_> {
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        let raw: u16 =
            nb::block!(self.adc.read_oneshot(&mut self.pin)).map_err(|_| SensorError::Bus)?;
        Ok(adc_fraction(raw) * ADC_FULL_SCALE_V * BATTERY_DIVIDER_RATIO)
    }
}

pub struct SoilMoistureProbe<'a> {
    adc: Adc<'a, ADC1<'a>, Blocking>,
    pin: AdcPin<GPIO4<'a>, ADC1<'a>>,
}

impl<'a> SoilMoistureProbe<'a> {
    pub fn new(adc_periph: ADC1<'a>, probe: GPIO4<'a>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(probe, Attenuation::_11dB);
        let adc = Adc::new(adc_periph, config);

        Self { adc, pin }
    }
}

impl SoilProbe for SoilMoistureProbe<'_> {
    fn read(&mut self) -> Result<f32, SensorError> {
        let raw: u16 =
            nb::block!(self.adc.read_oneshot(&mut self.pin)).map_err(|_| SensorError::Bus)?;
        Ok(adc_fraction(raw))
    }
}

#[derive(Debug, Clone, Copy)]
struct CalibrationData {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
}

pub struct BMP280Hardware<'a> {
    i2c: I2c<'a, Blocking>,
    calibration: Option<CalibrationData>,
    address: u8,
}

impl<'a> BMP280Hardware<'a> {
    pub fn new<SDA, SCL>(i2c_periph: I2C0<'a>, sda: SDA, scl: SCL) -> Result<Self, SensorError>
    where
        SDA: Into<AnyPin<'a>>,
        SCL: Into<AnyPin<'a>>,
    {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(100)),
        )
        .map_err(|_| SensorError::Bus)?
        .with_sda(sda.into())
        .with_scl(scl.into());

        Ok(Self {
            i2c,
            calibration: None,
            address: BMP280_ADDRESS,
        })
    }

    pub fn scan(&mut self) {
        esp_println::println!("I2C scan start");
        for addr in 0x03..=0x77 {
            if self.i2c.write(addr, &[]).is_ok() {
                esp_println::println!("Found device at 0x{:02X}", addr);
            }
        }
        esp_println::println!("I2C scan done");
    }

    pub fn read_chip_id(&mut self) -> Result<u8, SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[0xD0], &mut id)
            .map_err(|_| SensorError::Bus)?;
        Ok(id[0])
    }

    pub fn init(&mut self) -> Result<(), SensorError> {
        let delay = Delay::new();

        // Soft reset
        self.i2c
            .write(self.address, &[0xE0, 0xB6])
            .map_err(|_| SensorError::Bus)?;

        delay.delay_millis(100);

        // Wait for NVM data to be copied (status bit 0 must be 0)
        for _ in 0..50 {
            let mut status = [0u8];
            if self
                .i2c
                .write_read(self.address, &[0xF3], &mut status)
                .is_ok()
                && status[0] & 0x01 == 0
            {
                break;
            }
            delay.delay_millis(20);
        }

        let chip_id = self.read_chip_id()?;
        esp_println::println!("[BMP280] Chip ID: 0x{:02X}", chip_id);

        // Temperature trimming only
        let mut calib_data = [0u8; 6];
        self.i2c
            .write_read(self.address, &[0x88], &mut calib_data)
            .map_err(|_| SensorError::Bus)?;

        let calibration = CalibrationData {
            dig_t1: u16::from_le_bytes([calib_data[0], calib_data[1]]),
            dig_t2: i16::from_le_bytes([calib_data[2], calib_data[3]]),
            dig_t3: i16::from_le_bytes([calib_data[4], calib_data[5]]),
        };
        log::debug!(
            "BMP280 calibration T1={} T2={} T3={}",
            calibration.dig_t1,
            calibration.dig_t2,
            calibration.dig_t3
        );
        self.calibration = Some(calibration);

        // Config register: standby 1000 ms, filter off
        self.i2c
            .write(self.address, &[0xF5, 0xA0])
            .map_err(|_| SensorError::Bus)?;

        delay.delay_millis(10);

        // Control register: temp oversampling x16, pressure x16, normal mode
        self.i2c
            .write(self.address, &[0xF4, 0x3F])
            .map_err(|_| SensorError::Bus)?;

        delay.delay_millis(100);

        esp_println::println!("[BMP280] Initialized - ready to measure");

        Ok(())
    }
}

impl BoardThermometer for BMP280Hardware<'_> {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let calib = self.calibration.ok_or(SensorError::NotInitialized)?;

        let mut buf = [0u8; 3];
        self.i2c
            .write_read(self.address, &[0xFA], &mut buf)
            .map_err(|_| SensorError::Bus)?;

        let adc_t: i32 = ((buf[0] as i32) << 12) | ((buf[1] as i32) << 4) | ((buf[2] as i32) >> 4);

        // Bosch datasheet compensation formula (integer version)
        let var1 = (((adc_t >> 3) - ((calib.dig_t1 as i32) << 1)) * (calib.dig_t2 as i32)) >> 11;
        let var2 = (((((adc_t >> 4) - (calib.dig_t1 as i32))
            * ((adc_t >> 4) - (calib.dig_t1 as i32)))
            >> 12)
            * (calib.dig_t3 as i32))
            >> 14;
        let t_fine = var1 + var2;

        Ok(((t_fine * 5 + 128) >> 8) as f32 / 100.0)
    }
}

pub struct Dht11Hardware<'a> {
    pin: Flex<'a>,
    delay: Delay,
}

impl<'a> Dht11Hardware<'a> {
    pub fn new<DATA>(data: DATA) -> Self
    where
        DATA: Into<AnyPin<'a>>,
    {
        let mut pin = Flex::new(data.into());
        pin.apply_output_config(
            &OutputConfig::default()
                .with_drive_mode(DriveMode::OpenDrain)
                .with_pull(Pull::Up),
        );
        pin.set_input_enable(true);
        pin.set_output_enable(true);
        pin.set_high();

        Self {
            pin,
            delay: Delay::new(),
        }
    }

    /// Busy-wait while the line is at `high`, returning how long that took
    fn wait_while(&self, high: bool) -> Result<u32, SensorError> {
        let start = Instant::now();
        while self.pin.is_high() == high {
            if start.elapsed().as_micros() > DHT11_PULSE_TIMEOUT_US {
                return Err(SensorError::Timeout);
            }
        }
        Ok(start.elapsed().as_micros() as u32)
    }

    fn read_frame(&mut self) -> Result<Frame, SensorError> {
        // Start signal, then release the line to the sensor
        self.pin.set_low();
        self.delay.delay_millis(DHT11_START_LOW_MS);
        self.pin.set_high();

        // Response: line goes low for 80 us, then high for 80 us
        self.wait_while(true)?;
        self.wait_while(false)?;
        self.wait_while(true)?;

        let mut pulses = [0u32; FRAME_BITS];
        for pulse in pulses.iter_mut() {
            self.wait_while(false)?;
            *pulse = self.wait_while(true)?;
        }

        Frame::from_pulses(&pulses)
    }
}

impl EnvironmentSensor for Dht11Hardware<'_> {
    fn read(&mut self) -> Result<EnvironmentReading, SensorError> {
        let frame = self.read_frame();
        self.pin.set_high();
        Ok(frame?.reading())
    }
}

fn uart_write_all(uart: &mut Uart<'_, Blocking>, mut bytes: &[u8]) -> Result<(), SensorError> {
    while !bytes.is_empty() {
        let n = uart.write(bytes).map_err(|_| SensorError::Bus)?;
        bytes = &bytes[n..];
    }
    uart.flush().map_err(|_| SensorError::Bus)
}

pub struct GpsHardware<'a> {
    uart: Uart<'a, Blocking>,
    sentences: SentenceBuffer,
}

impl<'a> GpsHardware<'a> {
    pub fn new<TX, RX>(uart_periph: UART2<'a>, tx: TX, rx: RX) -> Result<Self, SensorError>
    where
        TX: Into<AnyPin<'a>>,
        RX: Into<AnyPin<'a>>,
    {
        let uart = Uart::new(uart_periph, UartConfig::default().with_baudrate(GPS_BAUD))
            .map_err(|_| SensorError::Bus)?
            .with_tx(tx.into())
            .with_rx(rx.into());

        Ok(Self {
            uart,
            sentences: SentenceBuffer::new(),
        })
    }

    /// Read everything already received and keep the newest GGA in it, so
    /// the reported fix does not lag behind the receiver
    fn drain_backlog(&mut self) -> Option<Result<GgaFix, SensorError>> {
        let mut latest = None;
        let mut chunk = [0u8; RX_CHUNK_LEN];
        for _ in 0..MAX_DRAIN_CHUNKS {
            if !self.uart.read_ready() {
                break;
            }
            match self.uart.read(&mut chunk) {
                Ok(n) => {
                    if let Some(fix) = nmea::latest_gga(&mut self.sentences, &chunk[..n]) {
                        latest = nmea::newest(latest, fix);
                    }
                }
                Err(_) => {
                    // Overrun: whatever was partially assembled is lost
                    log::warn!("GPS receive overrun, resyncing");
                    self.sentences.clear();
                }
            }
        }
        latest
    }

    /// Block until the next GGA arrives
    fn wait_for_gga(&mut self) -> Result<GgaFix, SensorError> {
        let mut seen = 0;
        while seen < MAX_SENTENCES_PER_FIX {
            let mut byte = [0u8; 1];
            if self.uart.read(&mut byte).map_err(|_| SensorError::Bus)? == 0 {
                continue;
            }
            if let Some(sentence) = self.sentences.feed(byte[0]) {
                if nmea::is_gga(sentence) {
                    return nmea::parse_gga(sentence);
                }
                seen += 1;
            }
        }
        Err(SensorError::NoData)
    }
}

impl GpsReceiver for GpsHardware<'_> {
    fn configure(&mut self) -> Result<(), SensorError> {
        for body in [nmea::PMTK_GGA_ONLY, nmea::PMTK_RATE_1HZ] {
            let sentence = nmea::write_sentence(body)?;
            uart_write_all(&mut self.uart, sentence.as_bytes())?;
        }
        esp_println::println!("[GPS] Configured for GGA at 1 Hz");
        Ok(())
    }

    fn read_fix(&mut self) -> Result<GgaFix, SensorError> {
        match self.drain_backlog() {
            Some(fix) => fix,
            None => self.wait_for_gga(),
        }
    }
}

/// Telemetry output port
pub struct SerialLink<'a> {
    uart: Uart<'a, Blocking>,
}

impl<'a> SerialLink<'a> {
    pub fn new<TX, RX>(uart_periph: UART1<'a>, tx: TX, rx: RX) -> Result<Self, SensorError>
    where
        TX: Into<AnyPin<'a>>,
        RX: Into<AnyPin<'a>>,
    {
        let uart = Uart::new(uart_periph, UartConfig::default().with_baudrate(TELEMETRY_BAUD))
            .map_err(|_| SensorError::Bus)?
            .with_tx(tx.into())
            .with_rx(rx.into());

        Ok(Self { uart })
    }
}

impl embedded_io::ErrorType for SerialLink<'_> {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for SerialLink<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart
            .write(buf)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush().map_err(|_| embedded_io::ErrorKind::Other)
    }
}
