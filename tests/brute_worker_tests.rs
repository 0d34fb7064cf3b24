//! Brute-Force Worker Tests
//!
//! Key-space walking (monotonicity and termination), the manual
//! single-shot rate limiter, state-change notification and lease
//! handling.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{wait_for, MockHandle, MockPhy};
use subghz_firmware::config::MANUAL_TRANSMIT_INTERVAL_MS;
use subghz_firmware::protocol::{lookup, PulseFrame};
use subghz_firmware::radio::arbiter::RadioArbiter;
use subghz_firmware::radio::presets::RadioPreset;
use subghz_firmware::types::BruteState;
use subghz_firmware::workers::brute::SubBruteWorker;

fn configured_worker(bits: u8) -> (SubBruteWorker<MockPhy>, MockHandle, RadioArbiter<MockPhy>) {
    let (phy, handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();
    assert!(worker.init_default_attack(
        arbiter.try_lease().unwrap(),
        "Princeton",
        433_920_000,
        RadioPreset::Ook650Async,
        bits,
        0,
        1,
    ));
    (worker, handle, arbiter)
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_init_moves_to_ready_and_notifies() {
    let (phy, _handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();

    let states = Arc::new(Mutex::new(Vec::new()));
    let states_cb = Arc::clone(&states);
    worker.set_callback(Some(Box::new(move |state| {
        states_cb.lock().unwrap().push(state);
    })));

    assert_eq!(worker.state(), BruteState::Idle);
    assert!(worker.init_default_attack(
        arbiter.try_lease().unwrap(),
        "Princeton",
        433_920_000,
        RadioPreset::Ook650Async,
        24,
        0,
        1,
    ));
    // The UI hears about Ready before anything is transmitted.
    assert_eq!(worker.state(), BruteState::Ready);
    assert_eq!(states.lock().unwrap().as_slice(), &[BruteState::Ready]);
    assert_eq!(worker.max_value(), Some(16_777_215));
}

#[test]
fn test_init_rejects_unknown_protocol() {
    let (phy, _handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();
    assert!(!worker.init_default_attack(
        arbiter.try_lease().unwrap(),
        "NoSuchProtocol",
        433_920_000,
        RadioPreset::Ook650Async,
        24,
        0,
        1,
    ));
    assert_eq!(worker.state(), BruteState::Idle);
}

#[test]
fn test_init_rejects_disallowed_frequency() {
    let (phy, _handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();
    assert!(!worker.init_default_attack(
        arbiter.try_lease().unwrap(),
        "Princeton",
        999_999_999,
        RadioPreset::Ook650Async,
        24,
        0,
        1,
    ));
}

#[test]
fn test_file_attack_max_value_from_two_byte_flag() {
    let (phy, _handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();
    assert!(worker.init_file_attack(
        arbiter.try_lease().unwrap(),
        "Princeton",
        433_920_000,
        RadioPreset::Ook650Async,
        0x00AA_BBCC,
        true,
        0,
        1,
    ));
    assert_eq!(worker.max_value(), Some(0xFFFF));
}

#[test]
fn test_start_rejected_when_unconfigured() {
    let mut worker = SubBruteWorker::<MockPhy>::new();
    assert!(!worker.start());
}

// ============================================================================
// Key-Space Walk
// ============================================================================

#[test]
fn test_small_walk_terminates_exactly_at_max() {
    // bits=3: steps 0..=7, eight transmissions, then Finished with the
    // counter one past the key space.
    let (mut worker, handle, _arbiter) = configured_worker(3);

    assert!(worker.start());
    wait_for(2000, "walk to finish", || {
        worker.state() == BruteState::Finished
    });

    assert_eq!(worker.step(), 8);
    assert_eq!(handle.async_frames().len(), 8);
    assert!(!worker.is_running());
}

#[test]
fn test_resumed_walk_transmits_remaining_keys() {
    // Resuming at the penultimate key: exactly two transmissions.
    let (mut worker, handle, _arbiter) = configured_worker(24);

    assert!(worker.set_step(16_777_214));
    assert!(worker.start());
    wait_for(2000, "walk to finish", || {
        worker.state() == BruteState::Finished
    });

    assert_eq!(handle.async_frames().len(), 2);
    assert_eq!(worker.step(), 16_777_216);
}

#[test]
fn test_walked_keys_are_sequential() {
    let (mut worker, handle, _arbiter) = configured_worker(2);

    assert!(worker.start());
    wait_for(2000, "walk to finish", || {
        worker.state() == BruteState::Finished
    });

    // Re-encode the expected candidates and compare frames.
    let encoder = lookup("Princeton").unwrap();
    let frames = handle.async_frames();
    assert_eq!(frames.len(), 4);
    for (key, frame) in frames.iter().enumerate() {
        let mut expected = PulseFrame::new();
        encoder.encode(key as u64, 2, encoder.default_te_us(), &mut expected);
        assert_eq!(frame.as_slice(), expected.as_slice(), "frame for key {key}");
    }
}

#[test]
fn test_stop_mid_walk_returns_to_ready() {
    let (mut worker, _handle, _arbiter) = configured_worker(24);

    let states = Arc::new(Mutex::new(Vec::new()));
    let states_cb = Arc::clone(&states);
    worker.set_callback(Some(Box::new(move |state| {
        states_cb.lock().unwrap().push(state);
    })));

    assert!(worker.start());
    wait_for(1000, "a few transmissions", || worker.step() > 2);
    worker.stop();

    assert_eq!(worker.state(), BruteState::Ready);
    assert!(!worker.is_running());
    assert_eq!(
        states.lock().unwrap().as_slice(),
        &[BruteState::Tx, BruteState::Ready]
    );
}

#[test]
fn test_start_while_running_rejected() {
    let (mut worker, _handle, _arbiter) = configured_worker(24);
    assert!(worker.start());
    assert!(!worker.start());
    worker.stop();
}

#[test]
fn test_set_step_rejected_while_running() {
    let (mut worker, _handle, _arbiter) = configured_worker(24);
    assert!(worker.start());
    assert!(!worker.set_step(12345));
    worker.stop();
}

#[test]
fn test_file_attack_varies_low_byte_only() {
    let (phy, handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();
    assert!(worker.init_file_attack(
        arbiter.try_lease().unwrap(),
        "Princeton",
        433_920_000,
        RadioPreset::Ook650Async,
        0x00AA_BBCC,
        false,
        0,
        1,
    ));
    assert!(worker.set_step(0xFE));
    assert!(worker.start());
    wait_for(2000, "walk to finish", || {
        worker.state() == BruteState::Finished
    });

    // Candidates 0xAABBFE and 0xAABBFF: high bytes from the file key.
    let encoder = lookup("Princeton").unwrap();
    let frames = handle.async_frames();
    assert_eq!(frames.len(), 2);
    let mut expected = PulseFrame::new();
    encoder.encode(0x00AA_BBFE, 8, encoder.default_te_us(), &mut expected);
    assert_eq!(frames[0].as_slice(), expected.as_slice());
}

// ============================================================================
// Manual Single Shot
// ============================================================================

#[test]
fn test_manual_transmit_rate_limited() {
    let (mut worker, handle, _arbiter) = configured_worker(24);

    assert!(worker.transmit_current_key(5));
    // The second of two rapid shots is refused without touching the
    // radio.
    assert!(!worker.transmit_current_key(6));
    assert_eq!(handle.async_frames().len(), 1);

    std::thread::sleep(Duration::from_millis(MANUAL_TRANSMIT_INTERVAL_MS + 50));
    assert!(worker.transmit_current_key(7));
    assert_eq!(handle.async_frames().len(), 2);
}

#[test]
fn test_manual_transmit_rejected_while_running() {
    let (mut worker, _handle, _arbiter) = configured_worker(24);
    assert!(worker.start());
    assert!(!worker.transmit_current_key(5));
    worker.stop();
}

#[test]
fn test_manual_transmit_rejected_when_unconfigured() {
    let mut worker = SubBruteWorker::<MockPhy>::new();
    assert!(!worker.transmit_current_key(5));
}

// ============================================================================
// Lease Handling
// ============================================================================

#[test]
fn test_lease_released_when_worker_dropped() {
    let (worker, _handle, arbiter) = configured_worker(3);
    assert!(arbiter.try_lease().is_err());
    drop(worker);
    assert!(arbiter.try_lease().is_ok());
}

#[test]
fn test_repeat_multiplies_frame() {
    let (phy, handle) = MockPhy::new();
    let arbiter = RadioArbiter::new(phy);
    let mut worker = SubBruteWorker::new();
    assert!(worker.init_default_attack(
        arbiter.try_lease().unwrap(),
        "Princeton",
        433_920_000,
        RadioPreset::Ook650Async,
        24,
        0,
        3,
    ));
    assert!(worker.transmit_current_key(1));

    let frames = handle.async_frames();
    // One frame is 24 bit pairs plus the sync pair, played three times.
    assert_eq!(frames[0].len(), 3 * (24 * 2 + 2));
}
