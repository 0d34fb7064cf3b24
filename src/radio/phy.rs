//! The phy seam consumed by the workers
//!
//! Workers never talk to the CC1101 driver directly; they are written
//! against this trait so the whole worker layer runs unmodified against
//! real hardware or a scripted test double. The surface is the chip
//! lifecycle (idle/rx/tx/sleep), preset and frequency programming,
//! packet-mode FIFO access, async bit-banged TX, and a raw read of the
//! GDO0 pin for hand-rolled protocol timing.

use crate::radio::presets::RadioPreset;
use crate::types::LevelDuration;

/// Pulse source for async TX
///
/// Called at modulation rate; must return [`LevelDuration::Wait`] when
/// momentarily starved (the carrier holds its previous level) and
/// [`LevelDuration::Reset`] to end the transmission.
pub type PulseFeeder = Box<dyn FnMut() -> LevelDuration + Send>;

/// Chip lifecycle and I/O surface of the sub-GHz radio
///
/// Implementations must be cheap to call: every method is invoked from
/// worker loops with microsecond-scale timing budgets. None of them may
/// block beyond the SPI transaction itself.
pub trait SubGhzPhy: Send {
    /// Reset the chip to its power-on register state
    fn reset(&mut self);

    /// Enter idle state, aborting any RX/TX in progress
    fn idle(&mut self);

    /// Power the chip down; wakes on the next chip-select
    fn sleep(&mut self);

    /// Enter receive state
    fn rx(&mut self);

    /// Enter transmit state
    fn tx(&mut self);

    /// Flush the RX FIFO (chip must be idle)
    fn flush_rx(&mut self);

    /// Flush the TX FIFO (chip must be idle)
    fn flush_tx(&mut self);

    /// Program a modulation preset
    fn load_preset(&mut self, preset: &RadioPreset);

    /// Program the synthesizer and RF path for `hz`
    ///
    /// Returns the actual frequency achieved after quantization to the
    /// synthesizer step; callers must use the returned value for any
    /// further calculation.
    fn set_frequency_and_path(&mut self, hz: u32) -> u32;

    /// Begin async bit-banged TX fed by `feeder`
    ///
    /// Returns `false` when the transmission could not be started (e.g.
    /// the feeder's first pulse was already end-of-stream).
    fn start_async_tx(&mut self, feeder: PulseFeeder) -> bool;

    /// Whether the async TX has consumed its feeder to completion
    fn is_async_tx_complete(&mut self) -> bool;

    /// Stop async TX and return the chip to idle
    fn stop_async_tx(&mut self);

    /// Whether the RX FIFO holds at least one byte
    fn rx_pipe_not_empty(&mut self) -> bool;

    /// Whether the received packet's CRC checked out
    fn is_rx_data_crc_valid(&mut self) -> bool;

    /// Read one size-prefixed packet into `buf`, returning its length
    fn read_packet(&mut self, buf: &mut [u8]) -> usize;

    /// Write one size-prefixed packet to the TX FIFO
    fn write_packet(&mut self, data: &[u8]);

    /// Current RSSI in dBm
    fn rssi(&mut self) -> f32;

    /// Raw level of the GDO0 pin
    fn gdo0_is_high(&mut self) -> bool;
}
