#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;

use mizu::{
    config::TelemetryConfig,
    format::format_line,
    hardware::{
        BMP280Hardware, BatteryMonitor, Dht11Hardware, GpsHardware, SerialLink, SoilMoistureProbe,
    },
    logic::write_line,
    model::{Readings, TelemetryRecord},
    nmea,
    traits::{BoardThermometer, EnvironmentSensor, GpsReceiver, PowerMonitor, SoilProbe},
    units::{fahrenheit_to_celsius, fraction_to_percent},
};

esp_bootloader_esp_idf::esp_app_desc!();

// Test result tracking
struct TestResults {
    passed: u32,
    failed: u32,
    total: u32,
}

impl TestResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            total: 0,
        }
    }

    fn assert(&mut self, condition: bool, test_name: &str) {
        self.total += 1;
        if condition {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED", test_name);
        }
    }

    fn assert_close(&mut self, value: f32, expected: f32, tolerance: f32, test_name: &str) {
        self.total += 1;
        if (value - expected).abs() < tolerance {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!(
                "  ✗ {} FAILED: {:.2} not close to {:.2} (tolerance: {:.2})",
                test_name,
                value,
                expected,
                tolerance
            );
        }
    }

    fn print_summary(&self) {
        esp_println::println!("\n==========================================");
        esp_println::println!("Test Summary:");
        esp_println::println!("  Total:  {}", self.total);
        esp_println::println!("  Passed: {}", self.passed);
        esp_println::println!("  Failed: {}", self.failed);
        if self.failed == 0 {
            esp_println::println!("\n✓ ALL TESTS PASSED!");
        } else {
            esp_println::println!("\n✗ SOME TESTS FAILED");
        }
        esp_println::println!("==========================================");
    }
}

// Float formatting and conversions on the target FPU
fn test_formatting(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Formatting Tests");

    results.assert_close(fahrenheit_to_celsius(32), 0.0, 0.001, "32F is 0C");
    results.assert_close(fahrenheit_to_celsius(212), 100.0, 0.001, "212F is 100C");

    let config = TelemetryConfig::default();
    let readings = Readings {
        ambient_temperature: fahrenheit_to_celsius(77),
        humidity: 50.0,
        soil_moisture: fraction_to_percent(0.652),
        ..Readings::default()
    };
    match format_line(&TelemetryRecord::from_readings(&config, &readings)) {
        Ok(line) => {
            results.assert(
                line.contains("ambient_temp=25.00,humidity=50.00"),
                "ambient and humidity fields",
            );
            results.assert(line.contains("soil_moisture=65.2,"), "soil moisture field");
            results.assert(line.ends_with("\r\n"), "line ends with CRLF");
            results.assert(line.split(',').count() == 8, "line has 8 fields");
        }
        Err(e) => {
            esp_println::println!("    format failed: {}", e);
            results.assert(false, "format line");
        }
    }

    let fix = nmea::parse_gga(
        b"$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76",
    );
    match fix.ok().and_then(|f| f.position) {
        Some(position) => {
            results.assert_close(position.signed_latitude(), 53.361337, 0.0001, "GGA latitude");
            results.assert_close(position.signed_longitude(), -6.505620, 0.0001, "GGA longitude");
        }
        None => results.assert(false, "parse GGA"),
    }
}

fn test_board_sensor<'a>(results: &mut TestResults, bmp280: &mut BMP280Hardware<'a>) {
    esp_println::println!("\n[TEST] BMP280 Board Temperature");

    esp_println::println!("  Running I2C scan...");
    bmp280.scan();

    match bmp280.init() {
        Ok(_) => {
            results.assert(true, "BMP280 initialization");
            match bmp280.read_chip_id() {
                Ok(chip_id) => results.assert(chip_id == 0x58, "BMP280 chip ID is 0x58"),
                Err(e) => {
                    esp_println::println!("    Failed to read chip ID: {}", e);
                    results.assert(false, "read chip ID");
                }
            }
            match bmp280.read_temperature() {
                Ok(temp) => {
                    esp_println::println!("    Board: {:.2}°C", temp);
                    results.assert(temp > -40.0 && temp < 85.0, "board temperature in range");
                }
                Err(e) => {
                    esp_println::println!("    Failed to read temperature: {}", e);
                    results.assert(false, "read board temperature");
                }
            }
        }
        Err(e) => {
            esp_println::println!("  Failed to initialize BMP280: {}", e);
            results.assert(false, "BMP280 initialization");
        }
    }
}

fn test_analog<P: PowerMonitor, S: SoilProbe>(
    results: &mut TestResults,
    power: &mut P,
    soil: &mut S,
) {
    esp_println::println!("\n[TEST] Analog Inputs");

    match power.read_voltage() {
        Ok(v) => {
            esp_println::println!("    Battery: {:.2} V", v);
            results.assert((0.0..=6.2).contains(&v), "battery voltage within ADC range");
        }
        Err(e) => {
            esp_println::println!("    Battery read failed: {}", e);
            results.assert(false, "read battery voltage");
        }
    }

    match soil.read() {
        Ok(r) => {
            esp_println::println!("    Soil: {:.3}", r);
            results.assert((0.0..=1.0).contains(&r), "soil fraction within 0..1");
        }
        Err(e) => {
            esp_println::println!("    Soil read failed: {}", e);
            results.assert(false, "read soil moisture");
        }
    }
}

async fn test_environment<E: EnvironmentSensor>(results: &mut TestResults, env: &mut E) {
    esp_println::println!("\n[TEST] DHT11 Environment (3 samples)");

    let mut ok = 0;
    for i in 0..3 {
        // DHT11 needs a second between conversions
        Timer::after(Duration::from_millis(1_100)).await;
        match env.read() {
            Ok(reading) => {
                esp_println::println!(
                    "    Sample {}: {}F {}%",
                    i + 1,
                    reading.fahrenheit,
                    reading.humidity
                );
                if (32..=122).contains(&reading.fahrenheit) && (0..=100).contains(&reading.humidity)
                {
                    ok += 1;
                }
            }
            Err(e) => esp_println::println!("    Sample {} failed: {}", i + 1, e),
        }
    }
    results.assert(ok > 0, "DHT11 produced a plausible reading");
}

fn test_gps<G: GpsReceiver>(results: &mut TestResults, gps: &mut G) {
    esp_println::println!("\n[TEST] GPS Receiver");

    results.assert(gps.configure().is_ok(), "GPS configuration sent");
    match gps.read_fix() {
        Ok(fix) => {
            esp_println::println!(
                "    quality={} sats={} position={:?}",
                fix.quality,
                fix.satellites,
                fix.position
            );
            results.assert(true, "GGA sentence received");
        }
        Err(e) => {
            esp_println::println!("    No GGA: {}", e);
            results.assert(false, "GGA sentence received");
        }
    }
}

fn test_link(results: &mut TestResults, link: &mut SerialLink<'_>) {
    esp_println::println!("\n[TEST] Telemetry Link");
    results.assert(
        write_line(link, b"device_id=TEST\r\n").is_ok(),
        "telemetry line written",
    );
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("\n==========================================");
    esp_println::println!("=== Hardware Unit Test Runner ===");
    esp_println::println!("==========================================");

    let mut results = TestResults::new();

    // Run tests that don't need hardware
    test_formatting(&mut results);

    // Initialize RTOS timer for embassy (this consumes TIMG0)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    match BMP280Hardware::new(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
        Ok(mut bmp280) => test_board_sensor(&mut results, &mut bmp280),
        Err(_) => results.assert(false, "I2C0 setup"),
    }

    let mut power = BatteryMonitor::new(peripherals.ADC2, peripherals.GPIO11);
    let mut soil = SoilMoistureProbe::new(peripherals.ADC1, peripherals.GPIO4);
    test_analog(&mut results, &mut power, &mut soil);

    let mut env = Dht11Hardware::new(peripherals.GPIO15);
    test_environment(&mut results, &mut env).await;

    match GpsHardware::new(peripherals.UART2, peripherals.GPIO17, peripherals.GPIO18) {
        Ok(mut gps) => test_gps(&mut results, &mut gps),
        Err(_) => results.assert(false, "UART2 setup"),
    }

    match SerialLink::new(peripherals.UART1, peripherals.GPIO5, peripherals.GPIO6) {
        Ok(mut link) => test_link(&mut results, &mut link),
        Err(_) => results.assert(false, "UART1 setup"),
    }

    results.print_summary();

    esp_println::println!("\nTest run complete. Looping...");
    loop {
        if results.failed == 0 {
            Timer::after(Duration::from_millis(200)).await;
        } else {
            Timer::after(Duration::from_millis(1000)).await;
        }
    }
}
