//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the sub-GHz subsystem.
//! All timing budgets, buffer sizes and pin mappings are centralized here
//! so the worker loops never carry hardcoded tick counts.

/// CC1101 crystal oscillator frequency (26 MHz standard)
pub const CC1101_XTAL_HZ: u32 = 26_000_000;

/// SPI bus frequency for the CC1101 (chip limit is 10 MHz, burst 6.5 MHz)
pub const SPI_FREQUENCY_HZ: u32 = 4_000_000;

/// Hardware FIFO depth of the CC1101
pub const CHIP_FIFO_SIZE: usize = 64;

/// Application packet ceiling for a single chip FIFO write
///
/// Leaves room for the length byte and two status bytes appended by the
/// chip in variable-length packet mode.
pub const PACKET_MAX_SIZE: usize = 60;

/// TX and RX byte stream capacity (several max-size packets each)
pub const TXRX_STREAM_SIZE: usize = 2048;

/// Pulse stream capacity of the file encoder, counted in level/duration
/// units rather than bytes
pub const ENCODER_STREAM_UNITS: usize = 2048;

/// Low-water refill threshold of the file encoder stream, in units
pub const ENCODER_REFILL_UNITS: usize = 512;

/// Capture ring capacity in pulses (must be a power of two)
pub const CAPTURE_BUFFER_SIZE: usize = 1024;

/// Maximum plausible pulse width accepted by the capture path, in
/// microseconds; longer gaps are clamped to reject glitches
pub const CAPTURE_MAX_PULSE_US: u32 = 15_000;

/// Cooldown between consecutive TX bursts of the TxRx worker
pub const TX_COOLDOWN_MS: u64 = 10;

/// Budget for GDO0 to rise after a TX strobe (sync word sent)
pub const GDO0_RISE_TIMEOUT_MS: u64 = 50;

/// Budget for GDO0 to fall after the sync rose (packet complete)
pub const GDO0_FALL_TIMEOUT_MS: u64 = 100;

/// Budget for an in-progress reception to complete before the RX path
/// flushes the chip and starts listening again
pub const RX_RESTART_TIMEOUT_MS: u64 = 150;

/// Poll interval of the worker busy-wait loops
///
/// Bounds the latency to observe a GDO0 edge without pegging a core on
/// hosts with preemptive scheduling.
pub const WORKER_POLL_INTERVAL_MS: u64 = 1;

/// Delay between two transmissions of the brute-force sequencer
pub const BRUTE_INTER_TX_DELAY_MS: u64 = 5;

/// Minimum spacing between manual single-shot transmissions
///
/// Rate limiter protecting the radio duty cycle; doubles as a debounce for
/// the physical button driving the manual path.
pub const MANUAL_TRANSMIT_INTERVAL_MS: u64 = 400;

/// Absolute value above which a `RAW_Data` token is considered corrupt
pub const RAW_VALUE_LIMIT_US: u32 = 1_000_000;

/// Replacement duration for corrupt `RAW_Data` tokens, in microseconds
pub const RAW_VALUE_CLAMP_US: u32 = 100;

/// Default frequency loaded before any caller configures one
pub const DEFAULT_FREQUENCY_HZ: u32 = 433_920_000;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic (STM32WB55 application
    //! core side)

    /// SPI1 SCK to the CC1101
    pub const SPI_SCK: &str = "PA5";

    /// SPI1 MISO from the CC1101
    pub const SPI_MISO: &str = "PA6";

    /// SPI1 MOSI to the CC1101
    pub const SPI_MOSI: &str = "PA7";

    /// CC1101 chip select (active low)
    pub const RADIO_CS: &str = "PA4";

    /// CC1101 GDO0, read directly for packet/sync timing
    pub const RADIO_GDO0: &str = "PB0";

    /// External capture input (protocol timing sniffing)
    pub const CAPTURE_IN: &str = "PB1";

    /// Status LED
    pub const LED_STATUS: &str = "PB5";
}

/// Timer assignments
pub mod timers {
    //! Hardware timer assignments

    /// Free-running 1 MHz timebase for capture timestamps
    pub const CAPTURE_TIMEBASE: u8 = 2;

    /// Async TX pulse scheduling timer
    pub const ASYNC_TX: u8 = 16;
}
