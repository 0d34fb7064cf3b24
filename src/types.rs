//! Shared types used across the sub-GHz firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

use thiserror::Error;

/// Frequency in Hertz
///
/// Stored in Hz for precision. Whether a frequency may actually be
/// transmitted on is decided by the regulatory band table in
/// [`crate::radio::bands`], not by this type; the chip synthesizer range
/// is wider than any single regulatory region.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Create a new Frequency from Hz
    #[must_use]
    pub const fn from_hz(hz: u32) -> Self {
        Self(hz)
    }

    /// Create a new Frequency from kHz
    #[must_use]
    pub const fn from_khz(khz: u32) -> Self {
        Self(khz * 1000)
    }

    /// Get the frequency in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        self.0
    }

    /// Get the frequency in kHz (truncated)
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        self.0 / 1000
    }

    /// Get the frequency in MHz as floating point
    #[must_use]
    pub fn as_mhz_f32(self) -> f32 {
        self.0 as f32 / 1_000_000.0
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({} Hz)", self.0)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} MHz", self.0 / 1_000_000, (self.0 % 1_000_000) / 10_000)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} Hz", self.0);
    }
}

/// The atomic unit of a radio waveform
///
/// Captured and synthesized waveforms flow through the firmware as a
/// sequence of these values. The two sentinels replace the packed magic
/// integers of older firmwares: [`Reset`](LevelDuration::Reset) terminates
/// a stream, [`Wait`](LevelDuration::Wait) tells a real-time consumer the
/// producer is momentarily behind and the previous level should be held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelDuration {
    /// A pulse: logic level held for a duration in microseconds
    Level {
        /// Logic level (`true` = mark/high)
        level: bool,
        /// Pulse width in microseconds; always non-zero for emitted values
        duration_us: u32,
    },
    /// End-of-stream marker
    Reset,
    /// Producer not ready yet; the consumer must retry
    Wait,
}

impl LevelDuration {
    /// Construct a pulse value
    #[must_use]
    pub const fn pulse(level: bool, duration_us: u32) -> Self {
        Self::Level { level, duration_us }
    }

    /// Check whether this is the end-of-stream sentinel
    #[must_use]
    pub const fn is_reset(self) -> bool {
        matches!(self, Self::Reset)
    }

    /// Check whether this is the producer-lag sentinel
    #[must_use]
    pub const fn is_wait(self) -> bool {
        matches!(self, Self::Wait)
    }

    /// Get the logic level of a pulse, `None` for sentinels
    #[must_use]
    pub const fn level(self) -> Option<bool> {
        match self {
            Self::Level { level, .. } => Some(level),
            _ => None,
        }
    }

    /// Get the duration of a pulse in microseconds, `None` for sentinels
    #[must_use]
    pub const fn duration_us(self) -> Option<u32> {
        match self {
            Self::Level { duration_us, .. } => Some(duration_us),
            _ => None,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LevelDuration {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Level { level, duration_us } => {
                defmt::write!(f, "{}:{}us", if *level { "H" } else { "L" }, duration_us);
            }
            Self::Reset => defmt::write!(f, "RESET"),
            Self::Wait => defmt::write!(f, "WAIT"),
        }
    }
}

/// Session state of a chip-owning worker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WorkerStatus {
    /// Chip idle, worker not operating the radio
    #[default]
    Idle,
    /// Receiving
    Rx,
    /// Transmitting
    Tx,
    /// Chip put to sleep
    Sleep,
}

#[cfg(feature = "embedded")]
impl defmt::Format for WorkerStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Rx => defmt::write!(f, "RX"),
            Self::Tx => defmt::write!(f, "TX"),
            Self::Sleep => defmt::write!(f, "SLEEP"),
        }
    }
}

/// Lifecycle state of the brute-force sequencer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BruteState {
    /// No attack configured
    #[default]
    Idle,
    /// Attack configured, ready to run or resume
    Ready,
    /// Worker thread transmitting
    Tx,
    /// Key space exhausted
    Finished,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BruteState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Ready => defmt::write!(f, "READY"),
            Self::Tx => defmt::write!(f, "TX"),
            Self::Finished => defmt::write!(f, "FINISHED"),
        }
    }
}

/// How a brute-force session derives its key candidates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackType {
    /// Walk the protocol's whole key space from a default starting point
    DefaultValues,
    /// Vary the low byte(s) of a key loaded from a capture file
    LoadFile,
}

/// Caller-visible radio-session failures
///
/// Timing and hardware timeouts never surface here: the worker loops log
/// them and recover on the next iteration.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The chip is leased to another session
    #[error("radio is owned by another session")]
    Busy,
}

/// Persisted capture-file failures
#[derive(Debug, Error)]
pub enum FormatError {
    /// First header line absent or not the expected filetype
    #[error("file header is missing or malformed")]
    MalformedHeader,
    /// Header version this firmware does not understand
    #[error("unsupported file version {0}")]
    UnsupportedVersion(u32),
    /// A required header key never appeared
    #[error("required key `{0}` is missing")]
    MissingKey(&'static str),
    /// Underlying file I/O failed
    #[cfg(feature = "std")]
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
