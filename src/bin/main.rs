#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::{delay::Delay, timer::timg::TimerGroup};

use mizu::{
    config::{SAMPLE_INTERVAL_MS, TelemetryConfig},
    error::SensorError,
    hardware::{
        BMP280Hardware, BatteryMonitor, Dht11Hardware, GpsHardware, SerialLink, SoilMoistureProbe,
    },
    logic::{Sensors, TelemetryLogger},
};

// Wiring
// Telemetry link - UART1 on GPIO5(TX), GPIO6(RX), 9600 baud
// GPS            - UART2 on GPIO17(TX), GPIO18(RX), 9600 baud
// BMP280         - I2C0 on GPIO8(SDA), GPIO9(SCL), address 0x76
// DHT11          - GPIO15
// Soil moisture  - GPIO4 (ADC1)
// Battery sense  - GPIO11 (ADC2) through a 1:2 divider

esp_bootloader_esp_idf::esp_app_desc!();

/// Without the link or the GPS port there is nothing to report on
fn halt(what: &str, e: SensorError) -> ! {
    let delay = Delay::new();
    loop {
        esp_println::println!("[ERROR] {} setup failed: {}", what, e);
        delay.delay_millis(1_000);
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("=== Mizu Sensor Hub ===");

    // Initialize RTOS timer for embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let link = SerialLink::new(peripherals.UART1, peripherals.GPIO5, peripherals.GPIO6)
        .unwrap_or_else(|e| halt("telemetry link", e));

    let gps = GpsHardware::new(peripherals.UART2, peripherals.GPIO17, peripherals.GPIO18)
        .unwrap_or_else(|e| halt("GPS", e));

    // soil_temp stays at its last value while the sensor is missing
    let board = match BMP280Hardware::new(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
        Ok(mut board) => {
            if let Err(e) = board.init() {
                esp_println::println!("[ERROR] BMP280 init failed: {}", e);
            }
            Some(board)
        }
        Err(e) => {
            esp_println::println!("[ERROR] BMP280 setup failed: {}", e);
            None
        }
    };

    let sensors = Sensors {
        power: BatteryMonitor::new(peripherals.ADC2, peripherals.GPIO11),
        board,
        environment: Dht11Hardware::new(peripherals.GPIO15),
        soil: SoilMoistureProbe::new(peripherals.ADC1, peripherals.GPIO4),
        gps,
    };

    let mut logger = TelemetryLogger::new(TelemetryConfig::default(), sensors, link);
    logger.start();

    esp_println::println!("[MIZU] Logging every {} ms", SAMPLE_INTERVAL_MS);

    loop {
        match logger.tick() {
            Ok(_) => log::debug!("uptime {} ms", Instant::now().as_millis()),
            Err(e) => esp_println::println!("[MIZU] {}", e),
        }

        Timer::after(Duration::from_millis(SAMPLE_INTERVAL_MS as u64)).await;
    }
}
