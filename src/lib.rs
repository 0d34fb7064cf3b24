//! Sub-GHz Radio Worker Firmware Library
//!
//! This library provides the sub-GHz transmit/receive worker subsystem for
//! an STM32WB55-based pocket multi-tool. It drives a CC1101 transceiver
//! through a half-duplex packet worker, replays persisted raw captures
//! against real-time modulation deadlines, and sequences brute-force
//! transmissions through a small OOK protocol registry.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WORKER LAYER                             │
//! │  TxRx Worker  │  File Encoder Worker  │  Brute Worker        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     RADIO LAYER                              │
//! │  Presets  │  Band Table  │  Phy Seam  │  Ownership Arbiter   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  STREAM / CAPTURE LAYER                      │
//! │  Byte Streams  │  Pulse Streams  │  Lock-free Capture Ring   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  CC1101 (SPI)  │  GDO0 (GPIO)  │  embassy (embedded only)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Single radio owner**: the physical CC1101 is an exclusive resource;
//!   a radio lease must be held for any chip session
//! - **Type-driven design**: level/duration sentinels are enum variants,
//!   never magic integers
//! - **No unsafe**: the ISR-side capture ring is built on plain atomics
//! - **Degrade, don't abort**: radio timeouts log and recover; only
//!   programmer errors (state machine violations) are fatal
//!
//! # Feature model
//!
//! The `std` feature (default) builds the portable core plus the worker
//! threads and blocking streams used on a host. The `embedded` feature
//! builds `no_std` with the embassy stack for the STM32WB55 target. The two
//! are mutually exclusive.

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// embassy-based wiring of the CC1101 bus and GDO0 pin on the STM32WB55.
#[cfg(feature = "embedded")]
pub mod hal;

/// Peripheral Drivers
///
/// Register-level driver for the CC1101 sub-GHz transceiver.
pub mod drivers;

/// Radio Control Layer
///
/// Modulation presets, the regulatory band table, the phy seam consumed by
/// the workers, and the exclusive-ownership arbiter.
pub mod radio;

/// Worker Threads
///
/// The half-duplex TxRx worker, the file encoder worker and the brute-force
/// sequencer. Host-side concurrency; requires `std`.
#[cfg(feature = "std")]
pub mod workers;

/// Producer/Consumer Streams
///
/// Fixed-capacity byte and pulse rings with blocking-with-timeout
/// semantics, bridging worker threads and API callers.
#[cfg(feature = "std")]
pub mod stream;

/// Timing Capture Path
///
/// Lock-free single-producer ring fed from edge interrupts, drained by a
/// lower-priority decode loop.
pub mod capture;

/// Persisted Capture Files
///
/// Line-oriented key/value format with signed `RAW_Data` durations.
pub mod fileformat;

/// Protocol Encoders
///
/// Fixed-code OOK encoders and the registry the brute worker transmits
/// through.
pub mod protocol;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal::spi::SpiDevice;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
