//! CC1101 Sub-GHz Transceiver Driver
//!
//! Stateless request/response wrapper over an exclusive SPI device:
//! strobes, register and FIFO access, synthesizer programming. Every
//! operation returns the chip status byte piggybacked on the SPI
//! transaction, never an error code. A failed SPI transfer is logged and
//! surfaces as a zeroed status; this layer is called from both interrupt
//! and thread context and must not block or retry.

use embedded_hal::spi::SpiDevice;
use log::error;

use crate::config::CC1101_XTAL_HZ;

/// SPI header bit: burst access
pub const WRITE_BURST: u8 = 0x40;
/// SPI header bit: single read
pub const READ_SINGLE: u8 = 0x80;
/// SPI header bits: burst read (also selects status registers)
pub const READ_BURST: u8 = 0xC0;

/// Strobe commands
pub mod strobe {
    /// Reset chip
    pub const SRES: u8 = 0x30;
    /// Enable and calibrate frequency synthesizer
    pub const SFSTXON: u8 = 0x31;
    /// Turn off crystal oscillator
    pub const SXOFF: u8 = 0x32;
    /// Calibrate synthesizer and turn it off
    pub const SCAL: u8 = 0x33;
    /// Enable RX
    pub const SRX: u8 = 0x34;
    /// Enable TX
    pub const STX: u8 = 0x35;
    /// Exit RX/TX
    pub const SIDLE: u8 = 0x36;
    /// Start wake-on-radio
    pub const SWOR: u8 = 0x38;
    /// Enter power-down when CSn goes high
    pub const SPWD: u8 = 0x39;
    /// Flush the RX FIFO
    pub const SFRX: u8 = 0x3A;
    /// Flush the TX FIFO
    pub const SFTX: u8 = 0x3B;
    /// Reset the wake-on-radio timer
    pub const SWORRST: u8 = 0x3C;
    /// No operation (fetch the status byte)
    pub const SNOP: u8 = 0x3D;
}

/// Configuration register addresses
#[allow(missing_docs)]
pub mod reg {
    pub const IOCFG2: u8 = 0x00;
    pub const IOCFG1: u8 = 0x01;
    pub const IOCFG0: u8 = 0x02;
    pub const FIFOTHR: u8 = 0x03;
    pub const SYNC1: u8 = 0x04;
    pub const SYNC0: u8 = 0x05;
    pub const PKTLEN: u8 = 0x06;
    pub const PKTCTRL1: u8 = 0x07;
    pub const PKTCTRL0: u8 = 0x08;
    pub const ADDR: u8 = 0x09;
    pub const CHANNR: u8 = 0x0A;
    pub const FSCTRL1: u8 = 0x0B;
    pub const FSCTRL0: u8 = 0x0C;
    pub const FREQ2: u8 = 0x0D;
    pub const FREQ1: u8 = 0x0E;
    pub const FREQ0: u8 = 0x0F;
    pub const MDMCFG4: u8 = 0x10;
    pub const MDMCFG3: u8 = 0x11;
    pub const MDMCFG2: u8 = 0x12;
    pub const MDMCFG1: u8 = 0x13;
    pub const MDMCFG0: u8 = 0x14;
    pub const DEVIATN: u8 = 0x15;
    pub const MCSM2: u8 = 0x16;
    pub const MCSM1: u8 = 0x17;
    pub const MCSM0: u8 = 0x18;
    pub const FOCCFG: u8 = 0x19;
    pub const BSCFG: u8 = 0x1A;
    pub const AGCCTRL2: u8 = 0x1B;
    pub const AGCCTRL1: u8 = 0x1C;
    pub const AGCCTRL0: u8 = 0x1D;
    pub const WOREVT1: u8 = 0x1E;
    pub const WOREVT0: u8 = 0x1F;
    pub const WORCTRL: u8 = 0x20;
    pub const FREND1: u8 = 0x21;
    pub const FREND0: u8 = 0x22;
    pub const FSCAL3: u8 = 0x23;
    pub const FSCAL2: u8 = 0x24;
    pub const FSCAL1: u8 = 0x25;
    pub const FSCAL0: u8 = 0x26;
    pub const RCCTRL1: u8 = 0x27;
    pub const RCCTRL0: u8 = 0x28;
    pub const FSTEST: u8 = 0x29;
    pub const PTEST: u8 = 0x2A;
    pub const AGCTEST: u8 = 0x2B;
    pub const TEST2: u8 = 0x2C;
    pub const TEST1: u8 = 0x2D;
    pub const TEST0: u8 = 0x2E;
}

/// Status register addresses (read with the burst bit set)
#[allow(missing_docs)]
pub mod status_reg {
    pub const PARTNUM: u8 = 0x30;
    pub const VERSION: u8 = 0x31;
    pub const FREQEST: u8 = 0x32;
    pub const LQI: u8 = 0x33;
    pub const RSSI: u8 = 0x34;
    pub const MARCSTATE: u8 = 0x35;
    pub const PKTSTATUS: u8 = 0x38;
    pub const TXBYTES: u8 = 0x3A;
    pub const RXBYTES: u8 = 0x3B;
}

/// PA ramp table address
pub const PATABLE: u8 = 0x3E;
/// TX/RX FIFO address
pub const FIFO: u8 = 0x3F;

/// Synthesizer frequency step: `XTAL / 2^16` scaled arithmetic below
const FREQ_DIVIDER_SHIFT: u32 = 16;

/// Main radio control state of the chip (status byte bits 6:4)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipState {
    /// Idle
    Idle,
    /// Receive mode
    Rx,
    /// Transmit mode
    Tx,
    /// Fast TX ready
    FstxOn,
    /// Synthesizer calibration running
    Calibrate,
    /// PLL settling
    Settling,
    /// RX FIFO overflowed; flush with SFRX
    RxFifoOverflow,
    /// TX FIFO underflowed; flush with SFTX
    TxFifoUnderflow,
}

/// Chip status byte returned by every SPI header exchange
///
/// Callers interpret the bit fields themselves; an all-zero value is
/// indistinguishable from "idle, ready, empty FIFO" and is exactly what a
/// failed transfer produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipStatus(pub u8);

impl ChipStatus {
    /// Whether the crystal is ready (CHIP_RDYn is active low)
    #[must_use]
    pub const fn is_ready(self) -> bool {
        self.0 & 0x80 == 0
    }

    /// Decode the control state bits
    #[must_use]
    pub const fn state(self) -> ChipState {
        match (self.0 >> 4) & 0x07 {
            0 => ChipState::Idle,
            1 => ChipState::Rx,
            2 => ChipState::Tx,
            3 => ChipState::FstxOn,
            4 => ChipState::Calibrate,
            5 => ChipState::Settling,
            6 => ChipState::RxFifoOverflow,
            _ => ChipState::TxFifoUnderflow,
        }
    }

    /// FIFO bytes available (RX) or free (TX), saturated at 15
    #[must_use]
    pub const fn fifo_bytes(self) -> u8 {
        self.0 & 0x0F
    }
}

/// CC1101 driver over an exclusive SPI device
pub struct Cc1101<S> {
    spi: S,
}

impl<S> Cc1101<S>
where
    S: SpiDevice,
    S::Error: core::fmt::Debug,
{
    /// Wrap an SPI device
    pub const fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Release the SPI device
    pub fn release(self) -> S {
        self.spi
    }

    fn transfer_in_place(&mut self, buf: &mut [u8], what: &str) {
        if let Err(e) = self.spi.transfer_in_place(buf) {
            error!("CC1101 {what} transfer failed: {e:?}");
            buf.fill(0);
        }
    }

    /// Issue a command strobe
    pub fn strobe(&mut self, cmd: u8) -> ChipStatus {
        let mut buf = [cmd];
        self.transfer_in_place(&mut buf, "strobe");
        ChipStatus(buf[0])
    }

    /// Reset the chip to its power-on register state
    pub fn reset(&mut self) -> ChipStatus {
        self.strobe(strobe::SRES)
    }

    /// Fetch the status byte without side effects
    pub fn get_status(&mut self) -> ChipStatus {
        self.strobe(strobe::SNOP)
    }

    /// Enter power-down when chip select rises
    pub fn shutdown(&mut self) -> ChipStatus {
        self.strobe(strobe::SPWD)
    }

    /// Write one configuration register
    pub fn write_reg(&mut self, addr: u8, value: u8) -> ChipStatus {
        let mut buf = [addr, value];
        self.transfer_in_place(&mut buf, "write_reg");
        ChipStatus(buf[0])
    }

    /// Read one configuration register
    pub fn read_reg(&mut self, addr: u8) -> u8 {
        let mut buf = [addr | READ_SINGLE, 0x00];
        self.transfer_in_place(&mut buf, "read_reg");
        buf[1]
    }

    /// Read one status register
    pub fn read_status_reg(&mut self, addr: u8) -> u8 {
        let mut buf = [addr | READ_BURST, 0x00];
        self.transfer_in_place(&mut buf, "read_status_reg");
        buf[1]
    }

    /// Program a table of (addr, value) pairs
    pub fn write_registers(&mut self, table: &[(u8, u8)]) {
        for &(addr, value) in table {
            self.write_reg(addr, value);
        }
    }

    /// Program the PA ramp table
    pub fn set_pa_table(&mut self, table: &[u8; 8]) {
        let mut buf = [0u8; 9];
        buf[0] = PATABLE | WRITE_BURST;
        buf[1..].copy_from_slice(table);
        self.transfer_in_place(&mut buf, "set_pa_table");
    }

    /// Program the synthesizer for `hz` and return the frequency actually
    /// achieved
    ///
    /// The synthesizer step is `XTAL / 2^16` (~397 Hz at 26 MHz), so the
    /// requested value is quantized; callers must use the return value,
    /// not their request, for subsequent calculations.
    pub fn set_frequency(&mut self, hz: u32) -> u32 {
        let word = (u64::from(hz) << FREQ_DIVIDER_SHIFT) / u64::from(CC1101_XTAL_HZ);
        self.write_reg(reg::FREQ2, (word >> 16) as u8);
        self.write_reg(reg::FREQ1, (word >> 8) as u8);
        self.write_reg(reg::FREQ0, word as u8);
        ((word * u64::from(CC1101_XTAL_HZ)) >> FREQ_DIVIDER_SHIFT) as u32
    }

    /// Burst-write `data` into the TX FIFO
    ///
    /// Bounded by the 64-byte FIFO; the 60-byte application packet
    /// ceiling is enforced by callers, not here.
    pub fn write_fifo(&mut self, data: &[u8]) -> ChipStatus {
        let mut buf = [0u8; 65];
        let n = data.len().min(64);
        buf[0] = FIFO | WRITE_BURST;
        buf[1..=n].copy_from_slice(&data[..n]);
        self.transfer_in_place(&mut buf[..=n], "write_fifo");
        ChipStatus(buf[0])
    }

    /// Burst-read `buf.len()` bytes from the RX FIFO
    pub fn read_fifo(&mut self, buf: &mut [u8]) -> ChipStatus {
        let mut raw = [0u8; 65];
        let n = buf.len().min(64);
        raw[0] = FIFO | READ_BURST;
        self.transfer_in_place(&mut raw[..=n], "read_fifo");
        buf[..n].copy_from_slice(&raw[1..=n]);
        ChipStatus(raw[0])
    }

    /// Bytes pending in the RX FIFO (overflow bit masked off)
    pub fn rx_bytes(&mut self) -> u8 {
        self.read_status_reg(status_reg::RXBYTES) & 0x7F
    }

    /// Main radio control FSM state
    pub fn marc_state(&mut self) -> u8 {
        self.read_status_reg(status_reg::MARCSTATE) & 0x1F
    }

    /// Chip part number (0x00 for the CC1101)
    pub fn partnum(&mut self) -> u8 {
        self.read_status_reg(status_reg::PARTNUM)
    }

    /// Silicon revision
    pub fn version(&mut self) -> u8 {
        self.read_status_reg(status_reg::VERSION)
    }

    /// Current RSSI in dBm
    ///
    /// Datasheet conversion: the raw register is a signed half-dB offset
    /// from -74 dBm.
    pub fn rssi_dbm(&mut self) -> f32 {
        let raw = self.read_status_reg(status_reg::RSSI);
        let half_db = if raw >= 128 {
            i16::from(raw) - 256
        } else {
            i16::from(raw)
        };
        f32::from(half_db) / 2.0 - 74.0
    }
}
