//! Sub-GHz Radio Main Application
//!
//! Entry point for the STM32WB55-based sub-GHz firmware. Initializes the
//! radio and runs a minimal listening loop; the worker subsystem proper
//! is driven by the applications layered on the library.

#![no_std]
#![no_main]

use defmt::info;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Flex, Level, Output, Speed};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use subghz_firmware::config::{DEFAULT_FREQUENCY_HZ, SPI_FREQUENCY_HZ};
use subghz_firmware::hal::subghz::SubGhz;
use subghz_firmware::radio::presets::RadioPreset;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Sub-GHz Firmware v{}", env!("CARGO_PKG_VERSION"));

    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    info!("Peripherals initialized");

    let led = Output::new(p.PB5, Level::Low, Speed::Low);

    // SPI1 to the CC1101: SCK PA5, MISO PA6, MOSI PA7, soft CS PA4
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(SPI_FREQUENCY_HZ);
    let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
    let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let gdo0 = Flex::new(p.PB0);

    let mut radio = SubGhz::new(spi, cs, gdo0);

    radio.reset();
    Timer::after(Duration::from_millis(10)).await;
    let (partnum, version) = radio.probe();
    info!("CC1101 PARTNUM=0x{:x} VERSION=0x{:x}", partnum, version);

    radio.load_preset(&RadioPreset::Ook650Async);
    let actual = radio.set_frequency_and_path(DEFAULT_FREQUENCY_HZ);
    info!("Listening on {} Hz", actual);
    radio.rx();

    spawner.spawn(heartbeat_task(led)).unwrap();

    loop {
        Timer::after(Duration::from_secs(1)).await;
        info!("RSSI {} dBm", radio.rssi());
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after(Duration::from_millis(50)).await;
        led.set_low();
        Timer::after(Duration::from_millis(950)).await;
    }
}
