//! CC1101 wiring for the STM32WB55
//!
//! Owns the chip lifecycle on real hardware: SPI transactions behind a
//! software chip select, GDO0 reads for packet timing, and bit-banged
//! async TX with `embassy-time` pulse scheduling.

use embassy_stm32::gpio::{Flex, Input, Level, Output, Pull, Speed};
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::Spi;
use embassy_time::Timer;
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use crate::drivers::cc1101::{strobe, status_reg, Cc1101, ChipStatus};
use crate::radio::presets::RadioPreset;
use crate::types::LevelDuration;

/// Blocking SPI with a software chip select
///
/// The CC1101 shares its bus with nothing on this board, so a plain
/// output pin wrapped around the blocking SPI peripheral is all the
/// device abstraction needed.
pub struct SoftCsDevice<'d> {
    spi: Spi<'d, Blocking>,
    cs: Output<'d>,
}

impl<'d> SoftCsDevice<'d> {
    /// Wrap a bus and its chip-select pin
    #[must_use]
    pub fn new(spi: Spi<'d, Blocking>, cs: Output<'d>) -> Self {
        Self { spi, cs }
    }
}

impl ErrorType for SoftCsDevice<'_> {
    type Error = embassy_stm32::spi::Error;
}

impl SpiDevice for SoftCsDevice<'_> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.cs.set_low();
        let mut result = Ok(());
        for op in operations {
            result = match op {
                Operation::Read(buf) => self.spi.blocking_read(buf),
                Operation::Write(buf) => self.spi.blocking_write(buf),
                Operation::Transfer(read, write) => self.spi.blocking_transfer(read, write),
                Operation::TransferInPlace(buf) => self.spi.blocking_transfer_in_place(buf),
                Operation::DelayNs(_) => Ok(()),
            };
            if result.is_err() {
                break;
            }
        }
        self.cs.set_high();
        result
    }
}

/// The assembled sub-GHz radio
pub struct SubGhz<'d> {
    chip: Cc1101<SoftCsDevice<'d>>,
    gdo0: Flex<'d>,
}

impl<'d> SubGhz<'d> {
    /// Assemble the radio from its bus and GDO0 pin
    #[must_use]
    pub fn new(spi: Spi<'d, Blocking>, cs: Output<'d>, gdo0: Flex<'d>) -> Self {
        let mut radio = Self {
            chip: Cc1101::new(SoftCsDevice::new(spi, cs)),
            gdo0,
        };
        radio.gdo0.set_as_input(Pull::Down);
        radio
    }

    /// Probe the chip identity registers
    pub fn probe(&mut self) -> (u8, u8) {
        (self.chip.partnum(), self.chip.version())
    }

    /// Reset to power-on state
    pub fn reset(&mut self) -> ChipStatus {
        self.chip.reset()
    }

    /// Abort RX/TX and idle the chip
    pub fn idle(&mut self) -> ChipStatus {
        self.chip.strobe(strobe::SIDLE)
    }

    /// Power down until the next chip select
    pub fn sleep(&mut self) -> ChipStatus {
        self.chip.shutdown()
    }

    /// Enter receive state
    pub fn rx(&mut self) -> ChipStatus {
        self.chip.strobe(strobe::SRX)
    }

    /// Enter transmit state
    pub fn tx(&mut self) -> ChipStatus {
        self.chip.strobe(strobe::STX)
    }

    /// Flush the RX FIFO
    pub fn flush_rx(&mut self) -> ChipStatus {
        self.chip.strobe(strobe::SFRX)
    }

    /// Flush the TX FIFO
    pub fn flush_tx(&mut self) -> ChipStatus {
        self.chip.strobe(strobe::SFTX)
    }

    /// Program a modulation preset and its PA ramp
    pub fn load_preset(&mut self, preset: &RadioPreset) {
        self.chip.write_registers(preset.registers());
        self.chip.set_pa_table(preset.pa_table());
    }

    /// Program the synthesizer, recalibrate, and return the achieved
    /// frequency
    pub fn set_frequency_and_path(&mut self, hz: u32) -> u32 {
        let actual = self.chip.set_frequency(hz);
        self.chip.strobe(strobe::SCAL);
        actual
    }

    /// Whether the RX FIFO holds data
    pub fn rx_pipe_not_empty(&mut self) -> bool {
        self.chip.rx_bytes() > 0
    }

    /// Whether the last received packet's CRC checked out (LQI bit 7)
    pub fn is_rx_data_crc_valid(&mut self) -> bool {
        self.chip.read_status_reg(status_reg::LQI) & 0x80 != 0
    }

    /// Read one size-prefixed packet from the RX FIFO
    pub fn read_packet(&mut self, buf: &mut [u8]) -> usize {
        let mut len = [0u8; 1];
        self.chip.read_fifo(&mut len);
        let n = (len[0] as usize).min(buf.len());
        if n > 0 {
            self.chip.read_fifo(&mut buf[..n]);
        }
        n
    }

    /// Write one size-prefixed packet to the TX FIFO
    pub fn write_packet(&mut self, data: &[u8]) {
        self.chip.write_fifo(&[data.len() as u8]);
        self.chip.write_fifo(data);
    }

    /// Current RSSI in dBm
    pub fn rssi(&mut self) -> f32 {
        self.chip.rssi_dbm()
    }

    /// Raw GDO0 level
    pub fn gdo0_is_high(&mut self) -> bool {
        self.gdo0.is_high()
    }

    /// Bit-bang a pulse train into the chip's serial TX input
    ///
    /// GDO0 flips to an MCU output for the duration: async-serial
    /// presets route it to the modulator. The feeder ends the
    /// transmission with [`LevelDuration::Reset`]; a starved feeder
    /// ([`LevelDuration::Wait`]) holds the previous level for one poll
    /// tick rather than dropping the carrier.
    pub async fn transmit_pulses(&mut self, mut feeder: impl FnMut() -> LevelDuration) {
        self.gdo0.set_as_output(Speed::VeryHigh);
        self.gdo0.set_level(Level::Low);
        self.tx();

        loop {
            match feeder() {
                LevelDuration::Level { level, duration_us } => {
                    self.gdo0
                        .set_level(if level { Level::High } else { Level::Low });
                    Timer::after_micros(u64::from(duration_us)).await;
                }
                LevelDuration::Wait => {
                    Timer::after_micros(100).await;
                }
                LevelDuration::Reset => break,
            }
        }

        self.gdo0.set_level(Level::Low);
        self.idle();
        self.flush_tx();
        self.gdo0.set_as_input(Pull::Down);
    }
}

/// GDO0 input helper for captures: sample level + timestamp pairs
///
/// Kept separate from [`SubGhz`] so a capture session can hand the pin
/// to an EXTI-driven sampler while the chip stays in RX.
pub struct Gdo0Capture<'d> {
    pin: Input<'d>,
}

impl<'d> Gdo0Capture<'d> {
    /// Wrap a configured input pin
    #[must_use]
    pub fn new(pin: Input<'d>) -> Self {
        Self { pin }
    }

    /// Current level
    #[must_use]
    pub fn level(&self) -> bool {
        self.pin.is_high()
    }
}
