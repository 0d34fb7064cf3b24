//! File-to-radio streaming encoder
//!
//! Replays a persisted capture file against the async-TX feeder without
//! ever holding the whole file in memory: a worker thread parses
//! `RAW_Data` lines into a pulse stream behind a low-water refill check,
//! and the radio-side consumer pops pulses at modulation rate. When
//! storage cannot keep up the consumer sees [`LevelDuration::Wait`] and
//! the lag is logged as a soft-real-time violation, not a failure.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::config::{ENCODER_REFILL_UNITS, ENCODER_STREAM_UNITS};
use crate::fileformat::{split_key_value, FileHeader, HeaderBuilder, RawLineDecoder, RAW_DATA_KEY};
use crate::stream::PulseStream;
use crate::types::{FormatError, LevelDuration};

/// Callback fired once when playback reaches the end of the file
pub type EndCallback = Box<dyn FnMut() + Send>;

/// How long the producer waits for stream space before rechecking the
/// stop flag
const REFILL_WAIT_MS: u64 = 50;

struct EncoderShared {
    run: AtomicBool,
    producer_done: AtomicBool,
    end_reported: AtomicBool,
    stream: PulseStream,
    file_size: AtomicU64,
    bytes_read: AtomicU64,
    end_callback: Mutex<Option<EndCallback>>,
}

/// File encoder worker
pub struct SubGhzFileEncoderWorker {
    shared: Arc<EncoderShared>,
    thread: Option<JoinHandle<()>>,
    header: Option<FileHeader>,
}

impl SubGhzFileEncoderWorker {
    /// Create a stopped worker
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(EncoderShared {
                run: AtomicBool::new(false),
                producer_done: AtomicBool::new(false),
                end_reported: AtomicBool::new(false),
                stream: PulseStream::new(ENCODER_STREAM_UNITS),
                file_size: AtomicU64::new(0),
                bytes_read: AtomicU64::new(0),
                end_callback: Mutex::new(None),
            }),
            thread: None,
            header: None,
        }
    }

    /// Open `path`, validate its header and spawn the producer thread
    ///
    /// # Errors
    ///
    /// I/O failures, a malformed header, or a missing `Protocol` key.
    ///
    /// # Panics
    ///
    /// Panics if the worker is already running (a firmware defect, fatal
    /// by the error taxonomy).
    pub fn start(&mut self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        assert!(!self.is_running(), "file encoder worker started twice");

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        // Consume the header; the line that stopped it (the first
        // RAW_Data line) is handed to the producer unconsumed.
        let mut builder = HeaderBuilder::new();
        let mut header_bytes = 0u64;
        let mut pending = None;
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if builder.feed(&line) {
                header_bytes += line.len() as u64;
            } else {
                pending = Some(std::mem::take(&mut line));
                break;
            }
        }
        let header = builder.build()?;
        debug!("replaying protocol `{}`", header.protocol);
        self.header = Some(header);

        self.shared.file_size.store(file_size, Ordering::Relaxed);
        self.shared.bytes_read.store(header_bytes, Ordering::Relaxed);
        self.shared.producer_done.store(false, Ordering::Relaxed);
        self.shared.end_reported.store(false, Ordering::Relaxed);
        self.shared.stream.clear();
        self.shared.run.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        self.thread = Some(thread::spawn(move || {
            producer_loop(&shared, reader, pending);
        }));
        Ok(())
    }

    /// Signal the producer to exit and join it
    pub fn stop(&mut self) {
        self.shared.run.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle.join().expect("file encoder worker thread panicked");
        }
        self.shared.stream.clear();
    }

    /// Whether the producer thread is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.run.load(Ordering::Acquire)
            && !self.shared.producer_done.load(Ordering::Acquire)
    }

    /// Header of the file being replayed, once [`Self::start`] succeeded
    #[must_use]
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// Pop the next pulse for the async-TX feeder
    ///
    /// Never blocks: returns [`LevelDuration::Wait`] when the producer
    /// is momentarily behind (the radio holds its previous level), and
    /// the terminating [`LevelDuration::Reset`] once the file is played
    /// out, at which point the end callback fires, exactly once.
    pub fn get_level_duration(&self) -> LevelDuration {
        let value = self.shared.stream.pop();
        match value {
            LevelDuration::Wait => {
                if !self.shared.producer_done.load(Ordering::Acquire) {
                    warn!("storage is slow");
                }
            }
            LevelDuration::Reset => {
                if !self.shared.end_reported.swap(true, Ordering::AcqRel) {
                    if let Some(callback) = self
                        .shared
                        .end_callback
                        .lock()
                        .expect("end callback mutex poisoned")
                        .as_mut()
                    {
                        callback();
                    }
                }
            }
            LevelDuration::Level { .. } => {}
        }
        value
    }

    /// Approximate playback progress in percent
    ///
    /// Computed from the file position: pulses that are buffered but not
    /// yet played already count as consumed, so the value runs slightly
    /// ahead of the carrier.
    #[must_use]
    pub fn get_text_progress(&self) -> u8 {
        let size = self.shared.file_size.load(Ordering::Relaxed);
        if size == 0 {
            return 100;
        }
        let read = self.shared.bytes_read.load(Ordering::Relaxed).min(size);
        (read * 100 / size) as u8
    }

    /// Register the end-of-playback callback
    pub fn set_end_callback(&self, callback: Option<EndCallback>) {
        *self
            .shared
            .end_callback
            .lock()
            .expect("end callback mutex poisoned") = callback;
    }
}

impl Default for SubGhzFileEncoderWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubGhzFileEncoderWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Push one pulse, waiting out a full stream without losing it
fn push_pulse(shared: &EncoderShared, pulse: LevelDuration) {
    while !shared.stream.push(pulse) {
        if !shared.run.load(Ordering::Acquire) {
            return;
        }
        shared
            .stream
            .wait_for_space(1, Duration::from_millis(REFILL_WAIT_MS));
    }
}

fn producer_loop(
    shared: &EncoderShared,
    mut reader: BufReader<File>,
    mut pending: Option<String>,
) {
    let mut decoder = RawLineDecoder::new();
    let mut line = String::new();

    while shared.run.load(Ordering::Acquire) {
        // Low-water refill: stay asleep while the stream is well fed.
        if !shared
            .stream
            .wait_for_space(ENCODER_REFILL_UNITS, Duration::from_millis(REFILL_WAIT_MS))
        {
            continue;
        }

        let text = if let Some(p) = pending.take() {
            line = p;
            &line
        } else {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => &line,
                Err(e) => {
                    warn!("capture file read failed mid-replay: {e}");
                    break;
                }
            }
        };

        shared
            .bytes_read
            .fetch_add(text.len() as u64, Ordering::Relaxed);

        if text.trim().is_empty() || text.trim_start().starts_with('#') {
            continue;
        }
        match split_key_value(text) {
            Some((key, payload)) if key == RAW_DATA_KEY => {
                // Iterate eagerly; the decoder borrows the line.
                let pulses: Vec<_> = decoder.decode_line(payload).collect();
                for pulse in pulses {
                    push_pulse(shared, pulse);
                }
            }
            // Anything else means the data section is over.
            _ => break,
        }
    }

    push_pulse(shared, LevelDuration::Reset);
    shared.producer_done.store(true, Ordering::Release);
}
