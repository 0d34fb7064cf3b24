//! Shared test doubles
//!
//! A behavioral model of the sub-GHz phy: records everything the workers
//! do to the chip and lets tests script what the chip reports back.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use subghz_firmware::radio::phy::{PulseFeeder, SubGhzPhy};
use subghz_firmware::radio::presets::RadioPreset;
use subghz_firmware::types::LevelDuration;

/// Safety valve for runaway feeders
const MAX_FRAME_DRAIN: usize = 100_000;

/// Poll `cond` until it holds, panicking after `timeout_ms`
pub fn wait_for(timeout_ms: u64, what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}

#[derive(Default)]
struct MockInner {
    /// Packets handed to `write_packet`
    sent_packets: Mutex<Vec<Vec<u8>>>,
    /// Packets waiting in the scripted RX FIFO
    rx_queue: Mutex<VecDeque<Vec<u8>>>,
    /// GDO0 levels to report, consumed one per read
    gdo0_script: Mutex<VecDeque<bool>>,
    /// Complete async TX frames, one per `start_async_tx`
    async_frames: Mutex<Vec<Vec<LevelDuration>>>,
    /// Frequencies programmed, in order
    frequencies: Mutex<Vec<u32>>,
    /// Presets loaded, by name
    presets: Mutex<Vec<&'static str>>,
    crc_valid: AtomicBool,
    async_complete: AtomicBool,
    /// Tracks RX state so a TX strobe with RX still active fails the test
    in_rx: AtomicBool,
    resets: AtomicU32,
    sleeps: AtomicU32,
}

/// Test-side handle to the mock's recordings
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<MockInner>,
}

impl MockHandle {
    /// Packets the workers wrote to the chip FIFO
    pub fn sent_packets(&self) -> Vec<Vec<u8>> {
        self.inner.sent_packets.lock().unwrap().clone()
    }

    /// Queue a packet for the scripted RX FIFO
    pub fn inject_rx(&self, data: &[u8]) {
        self.inner.rx_queue.lock().unwrap().push_back(data.to_vec());
    }

    /// Packets still waiting in the scripted RX FIFO
    pub fn rx_pending(&self) -> usize {
        self.inner.rx_queue.lock().unwrap().len()
    }

    /// Completed async TX frames
    pub fn async_frames(&self) -> Vec<Vec<LevelDuration>> {
        self.inner.async_frames.lock().unwrap().clone()
    }

    /// Frequencies programmed, in order
    pub fn frequencies(&self) -> Vec<u32> {
        self.inner.frequencies.lock().unwrap().clone()
    }

    /// Preset names loaded, in order
    pub fn presets(&self) -> Vec<&'static str> {
        self.inner.presets.lock().unwrap().clone()
    }

    /// Script whether received packets pass the CRC check
    pub fn set_crc_valid(&self, valid: bool) {
        self.inner.crc_valid.store(valid, Ordering::Relaxed);
    }

    /// Chip resets observed
    pub fn resets(&self) -> u32 {
        self.inner.resets.load(Ordering::Relaxed)
    }

    /// Sleep strobes observed
    pub fn sleeps(&self) -> u32 {
        self.inner.sleeps.load(Ordering::Relaxed)
    }
}

/// Scripted phy for driving the workers without hardware
pub struct MockPhy {
    inner: Arc<MockInner>,
}

impl MockPhy {
    /// Create a phy and the handle observing it
    pub fn new() -> (Self, MockHandle) {
        let inner = Arc::new(MockInner {
            crc_valid: AtomicBool::new(true),
            ..MockInner::default()
        });
        (
            Self {
                inner: Arc::clone(&inner),
            },
            MockHandle { inner },
        )
    }
}

impl SubGhzPhy for MockPhy {
    fn reset(&mut self) {
        self.inner.resets.fetch_add(1, Ordering::Relaxed);
    }

    fn idle(&mut self) {
        self.inner.in_rx.store(false, Ordering::Relaxed);
    }

    fn sleep(&mut self) {
        self.inner.in_rx.store(false, Ordering::Relaxed);
        self.inner.sleeps.fetch_add(1, Ordering::Relaxed);
    }

    fn rx(&mut self) {
        self.inner.in_rx.store(true, Ordering::Relaxed);
    }

    fn tx(&mut self) {
        assert!(
            !self.inner.in_rx.load(Ordering::Relaxed),
            "TX strobed while RX was still active"
        );
        // One simulated packet flight: sync up, then packet done.
        let mut script = self.inner.gdo0_script.lock().unwrap();
        script.push_back(true);
        script.push_back(false);
    }

    fn flush_rx(&mut self) {
        self.inner.rx_queue.lock().unwrap().clear();
    }

    fn flush_tx(&mut self) {}

    fn load_preset(&mut self, preset: &RadioPreset) {
        self.inner.presets.lock().unwrap().push(preset.name());
    }

    fn set_frequency_and_path(&mut self, hz: u32) -> u32 {
        self.inner.frequencies.lock().unwrap().push(hz);
        hz
    }

    fn start_async_tx(&mut self, mut feeder: PulseFeeder) -> bool {
        // Drain the feeder synchronously; the mock "transmits" instantly.
        let mut frame = Vec::new();
        for _ in 0..MAX_FRAME_DRAIN {
            match feeder() {
                LevelDuration::Reset => break,
                LevelDuration::Wait => continue,
                pulse => frame.push(pulse),
            }
        }
        self.inner.async_frames.lock().unwrap().push(frame);
        self.inner.async_complete.store(true, Ordering::Relaxed);
        true
    }

    fn is_async_tx_complete(&mut self) -> bool {
        self.inner.async_complete.load(Ordering::Relaxed)
    }

    fn stop_async_tx(&mut self) {
        self.inner.async_complete.store(false, Ordering::Relaxed);
    }

    fn rx_pipe_not_empty(&mut self) -> bool {
        !self.inner.rx_queue.lock().unwrap().is_empty()
    }

    fn is_rx_data_crc_valid(&mut self) -> bool {
        self.inner.crc_valid.load(Ordering::Relaxed)
    }

    fn read_packet(&mut self, buf: &mut [u8]) -> usize {
        match self.inner.rx_queue.lock().unwrap().pop_front() {
            Some(packet) => {
                let n = packet.len().min(buf.len());
                buf[..n].copy_from_slice(&packet[..n]);
                n
            }
            None => 0,
        }
    }

    fn write_packet(&mut self, data: &[u8]) {
        self.inner.sent_packets.lock().unwrap().push(data.to_vec());
    }

    fn rssi(&mut self) -> f32 {
        -74.0
    }

    fn gdo0_is_high(&mut self) -> bool {
        self.inner
            .gdo0_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false)
    }
}
