//! Regulatory transmit band table
//!
//! The synthesizer covers more spectrum than any region allows on the
//! air. Every worker checks a requested frequency against this table
//! before keying the transmitter.

use crate::types::Frequency;

/// Sub-GHz ISM band
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    /// 300 - 348 MHz
    B315,
    /// 387 - 464 MHz
    B433,
    /// 779 - 928 MHz
    B868,
}

impl Band {
    /// Get the band containing a given frequency
    #[must_use]
    pub const fn from_frequency(freq: Frequency) -> Option<Self> {
        let hz = freq.as_hz();
        if hz >= 300_000_000 && hz <= 348_000_000 {
            Some(Self::B315)
        } else if hz >= 387_000_000 && hz <= 464_000_000 {
            Some(Self::B433)
        } else if hz >= 779_000_000 && hz <= 928_000_000 {
            Some(Self::B868)
        } else {
            None
        }
    }

    /// Get the band start frequency
    #[must_use]
    pub const fn start_hz(self) -> u32 {
        match self {
            Self::B315 => 300_000_000,
            Self::B433 => 387_000_000,
            Self::B868 => 779_000_000,
        }
    }

    /// Get the band end frequency
    #[must_use]
    pub const fn end_hz(self) -> u32 {
        match self {
            Self::B315 => 348_000_000,
            Self::B433 => 464_000_000,
            Self::B868 => 928_000_000,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Band {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::B315 => defmt::write!(f, "315 MHz band"),
            Self::B433 => defmt::write!(f, "433 MHz band"),
            Self::B868 => defmt::write!(f, "868 MHz band"),
        }
    }
}

/// Check whether a frequency may be transmitted on
#[must_use]
pub fn is_frequency_valid(hz: u32) -> bool {
    Band::from_frequency(Frequency::from_hz(hz)).is_some()
}
