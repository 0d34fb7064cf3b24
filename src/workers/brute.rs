//! Brute-force transmit sequencer
//!
//! Walks a key counter through a fixed-code protocol's key space,
//! encoding each candidate through the protocol registry and
//! transmitting it synchronously. Also serves the UI's manual
//! single-shot path, rate-limited so a held button cannot violate the
//! radio duty cycle.
//!
//! Chip access from the worker thread and the manual path is serialized
//! by a `transmit_mode` busy flag rather than a mutex: the contending
//! paths sit in tight timing loops and must not park on an RTOS
//! primitive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::{BRUTE_INTER_TX_DELAY_MS, MANUAL_TRANSMIT_INTERVAL_MS, WORKER_POLL_INTERVAL_MS};
use crate::protocol::{self, ProtocolEncoder, PulseFrame};
use crate::radio::arbiter::RadioLease;
use crate::radio::bands;
use crate::radio::phy::{PulseFeeder, SubGhzPhy};
use crate::radio::presets::RadioPreset;
use crate::types::{AttackType, BruteState, LevelDuration};

/// Callback invoked on every worker state change
pub type StateCallback = Box<dyn FnMut(BruteState) + Send>;

/// Configured attack session
#[derive(Clone)]
struct AttackParams {
    attack: AttackType,
    encoder: &'static dyn ProtocolEncoder,
    frequency: u32,
    preset: RadioPreset,
    bits: u8,
    te_us: u32,
    repeat: u32,
    two_bytes: bool,
    /// Base key whose low byte(s) a file attack varies
    file_key: u64,
    max_value: u64,
}

impl AttackParams {
    /// Key candidate for a given step
    fn candidate(&self, step: u64) -> u64 {
        match self.attack {
            AttackType::DefaultValues => step,
            AttackType::LoadFile => {
                let mask = if self.two_bytes { 0xFFFF } else { 0xFF };
                (self.file_key & !mask) | (step & mask)
            }
        }
    }
}

struct BruteShared {
    run: AtomicBool,
    state: Mutex<BruteState>,
    step: AtomicU64,
    transmit_mode: AtomicBool,
    callback: Mutex<Option<StateCallback>>,
}

impl BruteShared {
    fn set_state(&self, state: BruteState) {
        *self.state.lock().expect("brute state mutex poisoned") = state;
        if let Some(callback) = self
            .callback
            .lock()
            .expect("brute callback mutex poisoned")
            .as_mut()
        {
            callback(state);
        }
    }
}

/// Brute-force transmit worker
pub struct SubBruteWorker<P: SubGhzPhy + 'static> {
    shared: Arc<BruteShared>,
    params: Option<AttackParams>,
    lease: Option<RadioLease<P>>,
    thread: Option<JoinHandle<RadioLease<P>>>,
    last_manual_tx: Option<Instant>,
}

impl<P: SubGhzPhy + 'static> SubBruteWorker<P> {
    /// Create an unconfigured worker
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BruteShared {
                run: AtomicBool::new(false),
                state: Mutex::new(BruteState::Idle),
                step: AtomicU64::new(0),
                transmit_mode: AtomicBool::new(false),
                callback: Mutex::new(None),
            }),
            params: None,
            lease: None,
            thread: None,
            last_manual_tx: None,
        }
    }

    /// Configure a full key-space walk
    ///
    /// `max_value` becomes `(1 << bits) - 1`. Moves the worker to
    /// `Ready` and notifies the state callback immediately so the UI can
    /// refresh before anything is transmitted.
    ///
    /// Returns `false` (leaving the session unconfigured) for an unknown
    /// protocol or a frequency outside the allowed bands.
    pub fn init_default_attack(
        &mut self,
        lease: RadioLease<P>,
        protocol_name: &str,
        frequency: u32,
        preset: RadioPreset,
        bits: u8,
        te_us: u32,
        repeat: u32,
    ) -> bool {
        self.init_attack(
            lease,
            AttackType::DefaultValues,
            protocol_name,
            frequency,
            preset,
            bits,
            te_us,
            repeat,
            false,
            0,
        )
    }

    /// Configure a file-based attack varying the low key byte(s)
    ///
    /// `max_value` is `0xFF`, or `0xFFFF` with `two_bytes`.
    #[allow(clippy::too_many_arguments)]
    pub fn init_file_attack(
        &mut self,
        lease: RadioLease<P>,
        protocol_name: &str,
        frequency: u32,
        preset: RadioPreset,
        file_key: u64,
        two_bytes: bool,
        te_us: u32,
        repeat: u32,
    ) -> bool {
        let bits = if two_bytes { 16 } else { 8 };
        self.init_attack(
            lease,
            AttackType::LoadFile,
            protocol_name,
            frequency,
            preset,
            bits,
            te_us,
            repeat,
            two_bytes,
            file_key,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn init_attack(
        &mut self,
        lease: RadioLease<P>,
        attack: AttackType,
        protocol_name: &str,
        frequency: u32,
        preset: RadioPreset,
        bits: u8,
        te_us: u32,
        repeat: u32,
        two_bytes: bool,
        file_key: u64,
    ) -> bool {
        assert!(!self.is_running(), "attack reconfigured while running");

        let Some(encoder) = protocol::lookup(protocol_name) else {
            warn!("unknown protocol `{protocol_name}`");
            return false;
        };
        if !bands::is_frequency_valid(frequency) {
            warn!("frequency {frequency} Hz not allowed");
            return false;
        }

        let max_value = match attack {
            AttackType::DefaultValues => {
                if bits >= 64 {
                    u64::MAX
                } else {
                    (1u64 << bits) - 1
                }
            }
            AttackType::LoadFile => {
                if two_bytes {
                    0xFFFF
                } else {
                    0xFF
                }
            }
        };

        let te_us = if te_us == 0 { encoder.default_te_us() } else { te_us };
        self.params = Some(AttackParams {
            attack,
            encoder,
            frequency,
            preset,
            bits,
            te_us,
            repeat: repeat.max(1),
            two_bytes,
            file_key,
            max_value,
        });
        self.reclaim_lease();
        self.lease = Some(lease);
        self.shared.step.store(0, Ordering::Relaxed);
        self.shared.set_state(BruteState::Ready);
        true
    }

    /// Spawn the worker thread
    ///
    /// Rejected (`false`) unless an attack is configured, the worker is
    /// stopped, and the state is `Ready` or `Finished`.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.reclaim_lease();
        let (Some(params), Some(_)) = (self.params.clone(), self.lease.as_ref()) else {
            return false;
        };
        if !matches!(self.state(), BruteState::Ready | BruteState::Finished) {
            return false;
        }
        let lease = self.lease.take().expect("lease vanished between checks");

        self.shared.run.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        self.thread = Some(thread::spawn(move || {
            worker_loop(&shared, &params, &lease);
            lease
        }));
        true
    }

    /// Signal the thread to exit and join it
    pub fn stop(&mut self) {
        self.shared.run.store(false, Ordering::Release);
        self.reclaim_lease();
    }

    /// Whether the worker thread is transmitting the sequence
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.run.load(Ordering::Acquire)
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> BruteState {
        *self.shared.state.lock().expect("brute state mutex poisoned")
    }

    /// Current step counter
    #[must_use]
    pub fn step(&self) -> u64 {
        self.shared.step.load(Ordering::Relaxed)
    }

    /// Last key candidate of the configured attack
    #[must_use]
    pub fn max_value(&self) -> Option<u64> {
        self.params.as_ref().map(|p| p.max_value)
    }

    /// Override the step counter
    ///
    /// Only honored while the worker thread is not running (resume and
    /// manual modes); returns `false` otherwise.
    pub fn set_step(&mut self, step: u64) -> bool {
        if self.is_running() || self.params.is_none() {
            return false;
        }
        self.shared.step.store(step, Ordering::Relaxed);
        true
    }

    /// Register the state-change callback
    pub fn set_callback(&self, callback: Option<StateCallback>) {
        *self
            .shared
            .callback
            .lock()
            .expect("brute callback mutex poisoned") = callback;
    }

    /// Manual single-shot transmission of `step`'s candidate
    ///
    /// Only permitted while the worker thread is not running, and no
    /// sooner than 400 ms after the previous manual shot: the second of
    /// two rapid calls returns `false` without touching the radio.
    pub fn transmit_current_key(&mut self, step: u64) -> bool {
        if self.is_running() {
            return false;
        }
        if let Some(last) = self.last_manual_tx {
            if last.elapsed() < Duration::from_millis(MANUAL_TRANSMIT_INTERVAL_MS) {
                return false;
            }
        }
        self.reclaim_lease();
        let (Some(params), Some(lease)) = (self.params.as_ref(), self.lease.as_ref()) else {
            return false;
        };
        if !matches!(self.state(), BruteState::Ready | BruteState::Finished) {
            return false;
        }

        self.shared.step.store(step, Ordering::Relaxed);
        self.last_manual_tx = Some(Instant::now());
        transmit(&self.shared, params, lease, params.candidate(step));
        true
    }

    /// Pull the lease back from a finished worker thread
    fn reclaim_lease(&mut self) {
        if let Some(handle) = self.thread.take() {
            self.lease = Some(handle.join().expect("brute worker thread panicked"));
        }
    }
}

impl<P: SubGhzPhy + 'static> Default for SubBruteWorker<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SubGhzPhy + 'static> Drop for SubBruteWorker<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<P: SubGhzPhy>(shared: &BruteShared, params: &AttackParams, lease: &RadioLease<P>) {
    shared.set_state(BruteState::Tx);
    let mut exhausted = false;

    while shared.run.load(Ordering::Acquire) {
        let step = shared.step.load(Ordering::Relaxed);
        if step > params.max_value {
            exhausted = true;
            break;
        }
        transmit(shared, params, lease, params.candidate(step));
        shared.step.store(step + 1, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(BRUTE_INTER_TX_DELAY_MS));
    }

    shared.run.store(false, Ordering::Release);
    shared.set_state(if exhausted {
        debug!("key space exhausted at {}", params.max_value);
        BruteState::Finished
    } else {
        BruteState::Ready
    });
}

/// Encode and synchronously transmit one key candidate
///
/// Serialized against concurrent callers by the `transmit_mode` busy
/// flag; the completion poll spins at tick granularity until the async
/// TX drains the frame.
fn transmit<P: SubGhzPhy>(shared: &BruteShared, params: &AttackParams, lease: &RadioLease<P>, key: u64) {
    while shared
        .transmit_mode
        .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        std::hint::spin_loop();
    }

    let mut frame = PulseFrame::new();
    params.encoder.encode(key, params.bits, params.te_us, &mut frame);

    let mut idx = 0usize;
    let mut remaining = params.repeat;
    let feeder: PulseFeeder = Box::new(move || {
        if idx == frame.len() {
            idx = 0;
            remaining -= 1;
        }
        if remaining == 0 {
            return LevelDuration::Reset;
        }
        let pulse = frame[idx];
        idx += 1;
        pulse
    });

    let started = lease.with(|phy| {
        phy.reset();
        phy.idle();
        phy.load_preset(&params.preset);
        phy.set_frequency_and_path(params.frequency);
        phy.start_async_tx(feeder)
    });

    if started {
        // Hard completion poll: a transmission once started is always
        // played out, so a stop request waits at most one key.
        while !lease.with(SubGhzPhy::is_async_tx_complete) {
            thread::sleep(Duration::from_millis(WORKER_POLL_INTERVAL_MS));
        }
        lease.with(|phy| {
            phy.stop_async_tx();
            phy.idle();
        });
    } else {
        warn!("async tx refused for key {key:#x}");
        lease.with(SubGhzPhy::idle);
    }

    shared.transmit_mode.store(false, Ordering::Release);
}
