//! Persisted capture-file format
//!
//! Line-oriented key/value text with a required header and `RAW_Data`
//! lines of signed decimal durations. The sign of each value encodes the
//! logic level (positive = mark), the magnitude the pulse width in
//! microseconds:
//!
//! ```text
//! Filetype: SubGhz RAW File
//! Version: 1
//! Frequency: 433920000
//! Preset: Ook650Async
//! Protocol: RAW
//! RAW_Data: 100, -200, 300
//! ```
//!
//! Parsing is whitespace-tolerant and accepts comma or whitespace
//! separated values. A file without a `Protocol` key is rejected outright;
//! corrupt values are clamped and level-alternation violations dropped so
//! a damaged capture degrades instead of aborting playback.

use log::warn;

use crate::config::{RAW_VALUE_CLAMP_US, RAW_VALUE_LIMIT_US};
use crate::types::{FormatError, Frequency, LevelDuration};

/// Expected value of the `Filetype` header key
pub const FILETYPE: &str = "SubGhz RAW File";

/// Newest understood format version
pub const FORMAT_VERSION: u32 = 1;

/// Key introducing a line of raw durations
pub const RAW_DATA_KEY: &str = "RAW_Data";

/// Maximum stored length of a header string value
pub const MAX_VALUE_LEN: usize = 64;

/// Parsed file header
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// `Filetype` value
    pub filetype: heapless::String<MAX_VALUE_LEN>,
    /// `Version` value
    pub version: u32,
    /// `Frequency` value in Hz, when present
    pub frequency: Option<Frequency>,
    /// `Preset` name, when present
    pub preset: Option<heapless::String<MAX_VALUE_LEN>>,
    /// `Protocol` name (required)
    pub protocol: heapless::String<MAX_VALUE_LEN>,
}

/// Split a `Key: value` line
///
/// Returns `None` for blank and comment lines and anything without a
/// colon. Both sides are trimmed.
#[must_use]
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Incremental header accumulator
///
/// Feed lines until the first `RAW_Data` line (or any non-header content),
/// then call [`HeaderBuilder::build`]. Unknown keys are ignored so newer
/// files stay readable.
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    filetype: Option<heapless::String<MAX_VALUE_LEN>>,
    version: Option<u32>,
    frequency: Option<Frequency>,
    preset: Option<heapless::String<MAX_VALUE_LEN>>,
    protocol: Option<heapless::String<MAX_VALUE_LEN>>,
}

impl HeaderBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line
    ///
    /// Returns `false` once the line belongs to the data section (a
    /// `RAW_Data` line), in which case the line was NOT consumed and the
    /// header is complete as far as this file is concerned.
    pub fn feed(&mut self, line: &str) -> bool {
        let Some((key, value)) = split_key_value(line) else {
            return true;
        };
        match key {
            _ if key == RAW_DATA_KEY => return false,
            "Filetype" => self.filetype = store(value),
            "Version" => self.version = value.parse().ok(),
            "Frequency" => self.frequency = value.parse().ok().map(Frequency::from_hz),
            "Preset" => self.preset = store(value),
            "Protocol" => self.protocol = store(value),
            _ => {}
        }
        true
    }

    /// Validate and produce the header
    ///
    /// # Errors
    ///
    /// [`FormatError::MalformedHeader`] when `Filetype`/`Version` never
    /// appeared, [`FormatError::UnsupportedVersion`] for a future version,
    /// [`FormatError::MissingKey`] when `Protocol` is absent.
    pub fn build(self) -> Result<FileHeader, FormatError> {
        let filetype = self.filetype.ok_or(FormatError::MalformedHeader)?;
        let version = self.version.ok_or(FormatError::MalformedHeader)?;
        if version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let protocol = self.protocol.ok_or(FormatError::MissingKey("Protocol"))?;
        Ok(FileHeader {
            filetype,
            version,
            frequency: self.frequency,
            preset: self.preset,
            protocol,
        })
    }
}

fn store(value: &str) -> Option<heapless::String<MAX_VALUE_LEN>> {
    let mut stored = heapless::String::new();
    stored.push_str(value).ok()?;
    Some(stored)
}

/// Stateful `RAW_Data` decoder
///
/// Tracks the level of the previously emitted pulse across lines so that
/// alternation is enforced for the whole file, not per line.
#[derive(Debug, Default)]
pub struct RawLineDecoder {
    last_level: Option<bool>,
}

impl RawLineDecoder {
    /// Create a decoder with no emitted history
    #[must_use]
    pub const fn new() -> Self {
        Self { last_level: None }
    }

    /// Decode the payload of one `RAW_Data` line (the text after the
    /// colon) into pulses
    pub fn decode_line<'a>(
        &'a mut self,
        payload: &'a str,
    ) -> impl Iterator<Item = LevelDuration> + 'a {
        payload
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .filter_map(move |tok| self.decode_token(tok))
    }

    /// Decode a single signed token
    ///
    /// Returns `None` for unparseable tokens, zero durations and
    /// alternation violations; all three are logged and skipped rather
    /// than aborting playback.
    pub fn decode_token(&mut self, token: &str) -> Option<LevelDuration> {
        let value: i64 = match token.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("unparseable RAW_Data token `{token}`");
                return None;
            }
        };
        if value == 0 {
            warn!("zero-length pulse in RAW_Data");
            return None;
        }

        let level = value > 0;
        let magnitude = value.unsigned_abs();
        let duration_us = if magnitude > u64::from(RAW_VALUE_LIMIT_US) {
            warn!("implausible RAW_Data value {value}, clamping");
            RAW_VALUE_CLAMP_US
        } else {
            magnitude as u32
        };

        if self.last_level == Some(level) {
            warn!("invalid level in the stream, dropping {value}");
            return None;
        }
        self.last_level = Some(level);
        Some(LevelDuration::pulse(level, duration_us))
    }
}

/// Number of durations emitted per `RAW_Data` line by the writer
#[cfg(feature = "std")]
pub const WRITER_VALUES_PER_LINE: usize = 512;

/// Write a capture file: header followed by wrapped `RAW_Data` lines
///
/// Sentinels terminate the output: a `Reset` stops writing, a `Wait` is
/// skipped (it carries no waveform information).
///
/// # Errors
///
/// Propagates I/O failures from the sink.
#[cfg(feature = "std")]
pub fn write_raw_file<W: std::io::Write>(
    sink: &mut W,
    header: &FileHeader,
    pulses: impl IntoIterator<Item = LevelDuration>,
) -> Result<(), FormatError> {
    writeln!(sink, "Filetype: {}", header.filetype)?;
    writeln!(sink, "Version: {}", header.version)?;
    if let Some(frequency) = header.frequency {
        writeln!(sink, "Frequency: {}", frequency.as_hz())?;
    }
    if let Some(preset) = &header.preset {
        writeln!(sink, "Preset: {preset}")?;
    }
    writeln!(sink, "Protocol: {}", header.protocol)?;

    let mut on_line = 0;
    for pulse in pulses {
        let (level, duration_us) = match pulse {
            LevelDuration::Level { level, duration_us } => (level, duration_us),
            LevelDuration::Reset => break,
            LevelDuration::Wait => continue,
        };
        if on_line == 0 {
            write!(sink, "{RAW_DATA_KEY}: ")?;
        } else {
            write!(sink, ", ")?;
        }
        let signed = if level {
            i64::from(duration_us)
        } else {
            -i64::from(duration_us)
        };
        write!(sink, "{signed}")?;
        on_line += 1;
        if on_line == WRITER_VALUES_PER_LINE {
            writeln!(sink)?;
            on_line = 0;
        }
    }
    if on_line != 0 {
        writeln!(sink)?;
    }
    Ok(())
}
