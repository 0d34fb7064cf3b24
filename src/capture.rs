//! Timing capture path
//!
//! A GPIO-edge interrupt (or a free-running sampling timer in raw mode)
//! produces `(level, duration)` pulses that a lower-priority decode loop
//! consumes. The bridge is a lock-free single-producer ring with a
//! free-running write index and overwrite-oldest semantics: the ISR never
//! blocks and never observes backpressure. Consumers detect when they have
//! been lapped and resync, counting what they lost.
//!
//! Pulses are packed into one 32-bit word so the ring works with plain
//! `AtomicU32` operations (the Cortex-M4 has no 64-bit atomics): bit 31 is
//! the level, the low 31 bits the duration in microseconds. Durations are
//! clamped to [`CAPTURE_MAX_PULSE_US`] well below that width.

use core::sync::atomic::{AtomicU32, Ordering};

use log::warn;

use crate::config::CAPTURE_MAX_PULSE_US;
use crate::types::LevelDuration;

/// Default capture ring capacity in pulses
pub use crate::config::CAPTURE_BUFFER_SIZE;

const LEVEL_BIT: u32 = 1 << 31;
const DURATION_MASK: u32 = LEVEL_BIT - 1;

const fn pack(level: bool, duration_us: u32) -> u32 {
    let level_bit = if level { LEVEL_BIT } else { 0 };
    level_bit | (duration_us & DURATION_MASK)
}

const fn unpack(word: u32) -> (bool, u32) {
    (word & LEVEL_BIT != 0, word & DURATION_MASK)
}

/// Lock-free single-producer pulse ring
///
/// The producer (ISR context) writes unconditionally; when it laps a slow
/// consumer the oldest pulses are overwritten. Each consumer keeps its own
/// read index and uses [`CaptureReader`] to detect the lap.
///
/// # Memory ordering
///
/// The producer stores the slot with `Relaxed` and publishes it with a
/// `Release` increment of the write index; consumers pair that with an
/// `Acquire` load of the index before touching slots.
pub struct CaptureBuffer<const N: usize = CAPTURE_BUFFER_SIZE> {
    slots: [AtomicU32; N],
    write_idx: AtomicU32,
}

impl<const N: usize> CaptureBuffer<N> {
    const MASK: usize = N - 1;
    const SLOT_INIT: AtomicU32 = AtomicU32::new(0);

    /// Create an empty ring
    ///
    /// # Panics
    ///
    /// Panics at compile time if `N` is not a power of 2.
    #[must_use]
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "capture ring size must be a power of 2");
        Self {
            slots: [Self::SLOT_INIT; N],
            write_idx: AtomicU32::new(0),
        }
    }

    /// Append one pulse (producer side, ISR-safe, never blocks)
    ///
    /// Durations above the plausibility ceiling are clamped; glitch
    /// rejection belongs to [`EdgeSampler`], this is the last line.
    #[inline]
    pub fn record(&self, level: bool, duration_us: u32) {
        let duration_us = if duration_us > CAPTURE_MAX_PULSE_US {
            CAPTURE_MAX_PULSE_US
        } else {
            duration_us
        };
        let idx = self.write_idx.load(Ordering::Relaxed) as usize;
        self.slots[idx & Self::MASK].store(pack(level, duration_us), Ordering::Relaxed);
        self.write_idx.fetch_add(1, Ordering::Release);
    }

    /// Current write head (consumers initialize their read index here)
    #[inline]
    #[must_use]
    pub fn write_head(&self) -> u32 {
        self.write_idx.load(Ordering::Acquire)
    }

    /// How many pulses behind `reader_idx` is
    #[inline]
    #[must_use]
    pub fn lag(&self, reader_idx: u32) -> u32 {
        self.write_head().wrapping_sub(reader_idx)
    }

    /// Whether a consumer at `reader_idx` has been lapped
    #[inline]
    #[must_use]
    pub fn is_overrun(&self, reader_idx: u32) -> bool {
        self.lag(reader_idx) > N as u32
    }

    /// Read the pulse at `idx`, `None` when not yet written or already
    /// overwritten
    #[inline]
    #[must_use]
    pub fn read(&self, idx: u32) -> Option<(bool, u32)> {
        let behind = self.write_head().wrapping_sub(idx);
        if behind == 0 || behind > N as u32 {
            return None;
        }
        Some(unpack(self.slots[(idx as usize) & Self::MASK].load(Ordering::Relaxed)))
    }

    /// Ring capacity
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for CaptureBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// ISR-side edge-to-pulse converter
///
/// Turns level transitions with a microsecond timestamp into completed
/// pulses: an edge closes the pulse at the PREVIOUS level. The first edge
/// after construction only primes the timebase.
pub struct EdgeSampler<'a, const N: usize = CAPTURE_BUFFER_SIZE> {
    buffer: &'a CaptureBuffer<N>,
    last_timestamp_us: u64,
    primed: bool,
}

impl<'a, const N: usize> EdgeSampler<'a, N> {
    /// Create a sampler feeding `buffer`
    #[must_use]
    pub const fn new(buffer: &'a CaptureBuffer<N>) -> Self {
        Self {
            buffer,
            last_timestamp_us: 0,
            primed: false,
        }
    }

    /// Register a transition to `new_level` at `timestamp_us`
    #[inline]
    pub fn transition(&mut self, new_level: bool, timestamp_us: u64) {
        if self.primed {
            let elapsed = timestamp_us.wrapping_sub(self.last_timestamp_us);
            let duration_us = u32::try_from(elapsed).unwrap_or(CAPTURE_MAX_PULSE_US);
            self.buffer.record(!new_level, duration_us);
        }
        self.last_timestamp_us = timestamp_us;
        self.primed = true;
    }

    /// Forget the timebase (e.g. after capture was paused)
    #[inline]
    pub fn reset(&mut self) {
        self.primed = false;
    }
}

/// Decode-side consumer with lap detection
///
/// Never blocks and never fails: when the ISR has lapped it, it skips
/// forward to half a buffer behind the head, adds the skipped pulses to
/// the drop counter and keeps going.
pub struct CaptureReader<'a, const N: usize = CAPTURE_BUFFER_SIZE> {
    buffer: &'a CaptureBuffer<N>,
    read_idx: u32,
    dropped: u32,
}

impl<'a, const N: usize> CaptureReader<'a, N> {
    /// Create a reader starting at the current write head
    #[must_use]
    pub fn new(buffer: &'a CaptureBuffer<N>) -> Self {
        Self {
            buffer,
            read_idx: buffer.write_head(),
            dropped: 0,
        }
    }

    /// Pop the next pulse, `None` when caught up with the producer
    #[inline]
    pub fn pop(&mut self) -> Option<LevelDuration> {
        if self.buffer.is_overrun(self.read_idx) {
            let head = self.buffer.write_head();
            let skipped = head.wrapping_sub(self.read_idx).saturating_sub(N as u32 / 2);
            self.read_idx = head.wrapping_sub(N as u32 / 2);
            self.dropped = self.dropped.saturating_add(skipped);
            warn!("capture reader lapped, dropped {skipped} pulses");
        }

        let (level, duration_us) = self.buffer.read(self.read_idx)?;
        self.read_idx = self.read_idx.wrapping_add(1);
        Some(LevelDuration::pulse(level, duration_us))
    }

    /// Pulses lost to laps since construction (or the last reset)
    #[inline]
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Reset the drop counter (e.g. after reporting)
    #[inline]
    pub fn reset_dropped(&mut self) {
        self.dropped = 0;
    }

    /// Pulses currently buffered ahead of this reader
    #[inline]
    #[must_use]
    pub fn lag(&self) -> u32 {
        self.buffer.lag(self.read_idx)
    }
}
