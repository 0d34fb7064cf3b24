//! Half-duplex packet TX/RX worker
//!
//! Owns the radio for a bidirectional byte-stream session (the chat
//! transport): callers enqueue packets into a TX stream and drain
//! received packets from an RX stream; the worker thread runs the
//! half-duplex state machine against the chip.
//!
//! The GDO0 waits are bounded polling loops, not interrupt-driven
//! blocking; packet timing at the chat preset's 9.99 kb/s sits in the
//! millisecond range. A timeout is logged, the chip is forced back to a
//! safe state, and the next iteration simply retries.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::{
    DEFAULT_FREQUENCY_HZ, GDO0_FALL_TIMEOUT_MS, GDO0_RISE_TIMEOUT_MS, PACKET_MAX_SIZE,
    RX_RESTART_TIMEOUT_MS, TXRX_STREAM_SIZE, TX_COOLDOWN_MS, WORKER_POLL_INTERVAL_MS,
};
use crate::radio::arbiter::RadioLease;
use crate::radio::bands;
use crate::radio::phy::SubGhzPhy;
use crate::radio::presets::RadioPreset;
use crate::stream::ByteStream;
use crate::types::WorkerStatus;

/// Callback invoked when the RX stream goes from empty to non-empty
pub type HaveReadCallback = Box<dyn FnMut() + Send>;

struct TxRxShared {
    run: AtomicBool,
    status: Mutex<WorkerStatus>,
    frequency: AtomicU32,
    tx_stream: ByteStream,
    rx_stream: ByteStream,
    have_read: Mutex<Option<HaveReadCallback>>,
    rx_dropped: AtomicU32,
}

impl TxRxShared {
    fn set_status(&self, status: WorkerStatus) {
        *self.status.lock().expect("worker status mutex poisoned") = status;
    }
}

/// Half-duplex TX/RX worker
pub struct SubGhzTxRxWorker<P: SubGhzPhy + 'static> {
    shared: Arc<TxRxShared>,
    thread: Option<JoinHandle<RadioLease<P>>>,
}

impl<P: SubGhzPhy + 'static> SubGhzTxRxWorker<P> {
    /// Create a stopped worker with empty streams
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TxRxShared {
                run: AtomicBool::new(false),
                status: Mutex::new(WorkerStatus::Idle),
                frequency: AtomicU32::new(DEFAULT_FREQUENCY_HZ),
                tx_stream: ByteStream::new(TXRX_STREAM_SIZE),
                rx_stream: ByteStream::new(TXRX_STREAM_SIZE),
                have_read: Mutex::new(None),
                rx_dropped: AtomicU32::new(0),
            }),
            thread: None,
        }
    }

    /// Start the session on `frequency`
    ///
    /// Returns `false` when the frequency is outside the allowed band
    /// table, but the worker thread is started REGARDLESS, on the last
    /// configured frequency. Long-standing behavior callers depend on:
    /// check [`Self::is_running`], not just this return value.
    ///
    /// # Panics
    ///
    /// Panics if the worker is already running (a firmware defect, fatal
    /// by the error taxonomy).
    pub fn start(&mut self, lease: RadioLease<P>, frequency: u32) -> bool {
        assert!(!self.is_running(), "tx/rx worker started twice");

        let allowed = bands::is_frequency_valid(frequency);
        if allowed {
            self.shared.frequency.store(frequency, Ordering::Relaxed);
        }

        self.shared.run.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        self.thread = Some(thread::spawn(move || {
            worker_loop(&shared, &lease);
            lease
        }));
        allowed
    }

    /// Signal the thread to exit and join it
    ///
    /// The chip is returned to idle and put to sleep; the lease is
    /// released.
    pub fn stop(&mut self) {
        self.shared.run.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            drop(handle.join().expect("tx/rx worker thread panicked"));
        }
    }

    /// Whether the worker thread is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.run.load(Ordering::Acquire)
    }

    /// Current session state
    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        *self.shared.status.lock().expect("worker status mutex poisoned")
    }

    /// Enqueue one packet's worth of bytes for transmission
    ///
    /// All-or-nothing: returns `false` when the TX stream's free space
    /// is smaller than `data`. The worker splits the stream into
    /// chip-sized writes on its own schedule.
    pub fn write(&self, data: &[u8]) -> bool {
        if data.len() > self.shared.tx_stream.free_space() {
            return false;
        }
        self.shared.tx_stream.write(data, Duration::ZERO)
    }

    /// Bytes received and not yet read
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.rx_stream.len()
    }

    /// Drain received bytes without blocking
    ///
    /// Returns the number of bytes copied, which may be less than
    /// `out.len()`.
    pub fn read(&self, out: &mut [u8]) -> usize {
        self.shared.rx_stream.read(out, Duration::ZERO)
    }

    /// Register the callback fired (from the worker thread) when the RX
    /// stream transitions from empty to non-empty
    pub fn set_have_read_callback(&self, callback: Option<HaveReadCallback>) {
        *self
            .shared
            .have_read
            .lock()
            .expect("have-read callback mutex poisoned") = callback;
    }

    /// Received bytes dropped because the RX stream was full
    #[must_use]
    pub fn rx_dropped(&self) -> u32 {
        self.shared.rx_dropped.load(Ordering::Relaxed)
    }
}

impl<P: SubGhzPhy + 'static> Default for SubGhzTxRxWorker<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SubGhzPhy + 'static> Drop for SubGhzTxRxWorker<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll GDO0 until it reaches `level`, for at most `budget_ms`
///
/// Returns `false` on timeout or when the stop flag was raised.
fn wait_gdo0<P: SubGhzPhy>(
    lease: &RadioLease<P>,
    level: bool,
    budget_ms: u64,
    run: &AtomicBool,
) -> bool {
    let deadline = Instant::now() + Duration::from_millis(budget_ms);
    loop {
        if lease.with(|phy| phy.gdo0_is_high()) == level {
            return true;
        }
        if !run.load(Ordering::Acquire) || Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(WORKER_POLL_INTERVAL_MS));
    }
}

fn worker_loop<P: SubGhzPhy>(shared: &TxRxShared, lease: &RadioLease<P>) {
    let frequency = shared.frequency.load(Ordering::Relaxed);
    let actual = lease.with(|phy| {
        phy.reset();
        phy.idle();
        phy.load_preset(&RadioPreset::Gfsk9_99Kb);
        phy.flush_rx();
        phy.flush_tx();
        phy.set_frequency_and_path(frequency)
    });
    debug!("tx/rx session up, requested {frequency} Hz, achieved {actual} Hz");

    let mut listening = false;
    let mut last_tx: Option<Instant> = None;

    while shared.run.load(Ordering::Acquire) {
        let cooled = last_tx
            .map_or(true, |t| t.elapsed() >= Duration::from_millis(TX_COOLDOWN_MS));

        if cooled && !shared.tx_stream.is_empty() {
            let mut packet = [0u8; PACKET_MAX_SIZE];
            let n = shared.tx_stream.read(&mut packet, Duration::ZERO);
            if n > 0 {
                shared.set_status(WorkerStatus::Tx);
                transmit_packet(shared, lease, &packet[..n]);
                listening = false;
                last_tx = Some(Instant::now());
            }
        } else {
            shared.set_status(WorkerStatus::Rx);
            if !listening {
                lease.with(|phy| {
                    phy.idle();
                    phy.flush_rx();
                    phy.rx();
                });
                listening = true;
            }
            receive_poll(shared, lease);
        }

        thread::sleep(Duration::from_millis(WORKER_POLL_INTERVAL_MS));
    }

    lease.with(|phy| {
        phy.idle();
        phy.sleep();
    });
    shared.set_status(WorkerStatus::Sleep);
}

/// One chip-sized packet out: FIFO write, TX strobe, GDO0 rise (sync
/// sent) then fall (packet complete), each on a bounded budget
fn transmit_packet<P: SubGhzPhy>(shared: &TxRxShared, lease: &RadioLease<P>, data: &[u8]) {
    lease.with(|phy| {
        phy.idle();
        phy.write_packet(data);
        phy.tx();
    });

    if !wait_gdo0(lease, true, GDO0_RISE_TIMEOUT_MS, &shared.run) {
        warn!("sync word never left the chip");
    } else if !wait_gdo0(lease, false, GDO0_FALL_TIMEOUT_MS, &shared.run) {
        warn!("end of packet never signaled");
    }

    lease.with(|phy| {
        phy.idle();
        phy.flush_tx();
    });
}

/// One RX poll: wait out an in-flight reception, then read a CRC-valid
/// packet into the RX stream
fn receive_poll<P: SubGhzPhy>(shared: &TxRxShared, lease: &RadioLease<P>) {
    if lease.with(SubGhzPhy::gdo0_is_high)
        && !wait_gdo0(lease, false, RX_RESTART_TIMEOUT_MS, &shared.run)
    {
        // Sync detected but the packet never completed; self-heal by
        // flushing and listening again.
        warn!("reception stuck, restarting listener");
        lease.with(|phy| {
            phy.idle();
            phy.flush_rx();
            phy.rx();
        });
        return;
    }

    let mut packet = [0u8; PACKET_MAX_SIZE];
    let n = lease.with(|phy| {
        if !phy.rx_pipe_not_empty() {
            return 0;
        }
        if !phy.is_rx_data_crc_valid() {
            phy.idle();
            phy.flush_rx();
            phy.rx();
            return 0;
        }
        let n = phy.read_packet(&mut packet);
        phy.rx();
        n
    });

    if n == 0 {
        return;
    }

    let was_empty = shared.rx_stream.is_empty();
    if shared.rx_stream.write(&packet[..n], Duration::ZERO) {
        if was_empty {
            if let Some(callback) = shared
                .have_read
                .lock()
                .expect("have-read callback mutex poisoned")
                .as_mut()
            {
                callback();
            }
        }
    } else {
        let dropped = shared.rx_dropped.fetch_add(n as u32, Ordering::Relaxed) + n as u32;
        warn!("rx stream full, dropped {n} bytes ({dropped} total)");
    }
}
