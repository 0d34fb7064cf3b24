//! Fixed-code OOK protocol encoders
//!
//! The brute-force sequencer turns a key counter into a radio waveform
//! through these encoders. Each produces a single frame of alternating
//! [`LevelDuration`] pulses; repetition is the transmitter's business.

use crate::types::LevelDuration;

/// Upper bound on pulses in one encoded frame (64 bits plus framing)
pub const MAX_FRAME_PULSES: usize = 160;

/// One encoded waveform frame
pub type PulseFrame = heapless::Vec<LevelDuration, MAX_FRAME_PULSES>;

/// A fixed-code protocol encoder
pub trait ProtocolEncoder: Send + Sync {
    /// Protocol name as it appears in capture files
    fn name(&self) -> &'static str;

    /// Conventional key width in bits
    fn default_bits(&self) -> u8;

    /// Conventional short-pulse width in microseconds
    fn default_te_us(&self) -> u32;

    /// Append the frame for `key` to `frame`
    ///
    /// Bits are sent most-significant first within the `bits` window.
    /// Emitted pulses always alternate level; frames never end with a
    /// dangling mark.
    fn encode(&self, key: u64, bits: u8, te_us: u32, frame: &mut PulseFrame);
}

/// Princeton-style encoder (PT2262 family)
///
/// Bit 0: mark te, space 3·te. Bit 1: mark 3·te, space te. Frame ends
/// with a sync pair of mark te, space 30·te.
pub struct Princeton;

impl ProtocolEncoder for Princeton {
    fn name(&self) -> &'static str {
        "Princeton"
    }

    fn default_bits(&self) -> u8 {
        24
    }

    fn default_te_us(&self) -> u32 {
        390
    }

    fn encode(&self, key: u64, bits: u8, te_us: u32, frame: &mut PulseFrame) {
        for i in (0..bits).rev() {
            let bit = (key >> i) & 1 == 1;
            let (mark, space) = if bit {
                (3 * te_us, te_us)
            } else {
                (te_us, 3 * te_us)
            };
            let _ = frame.push(LevelDuration::pulse(true, mark));
            let _ = frame.push(LevelDuration::pulse(false, space));
        }
        // Sync pair
        let _ = frame.push(LevelDuration::pulse(true, te_us));
        let _ = frame.push(LevelDuration::pulse(false, 30 * te_us));
    }
}

/// CAME-style encoder
///
/// Leading guard space of 36·te, then bit 0: mark te, space 2·te and
/// bit 1: mark 2·te, space te.
pub struct Came;

impl ProtocolEncoder for Came {
    fn name(&self) -> &'static str {
        "CAME"
    }

    fn default_bits(&self) -> u8 {
        12
    }

    fn default_te_us(&self) -> u32 {
        320
    }

    fn encode(&self, key: u64, bits: u8, te_us: u32, frame: &mut PulseFrame) {
        let _ = frame.push(LevelDuration::pulse(false, 36 * te_us));
        for i in (0..bits).rev() {
            let bit = (key >> i) & 1 == 1;
            let (mark, space) = if bit {
                (2 * te_us, te_us)
            } else {
                (te_us, 2 * te_us)
            };
            let _ = frame.push(LevelDuration::pulse(true, mark));
            let _ = frame.push(LevelDuration::pulse(false, space));
        }
    }
}

static PRINCETON: Princeton = Princeton;
static CAME: Came = Came;

/// All registered encoders
pub static ENCODERS: &[&dyn ProtocolEncoder] = &[&PRINCETON, &CAME];

/// Look an encoder up by its capture-file name (case-insensitive)
#[must_use]
pub fn lookup(name: &str) -> Option<&'static dyn ProtocolEncoder> {
    ENCODERS
        .iter()
        .copied()
        .find(|encoder| encoder.name().eq_ignore_ascii_case(name))
}
