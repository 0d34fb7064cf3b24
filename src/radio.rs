//! Radio Control Layer
//!
//! Everything between the workers and the CC1101 driver: the regulatory
//! band table, named modulation presets, the phy seam the workers are
//! written against, and the exclusive-ownership arbiter that makes the
//! single-radio rule a type instead of a convention.

pub mod bands;
pub mod presets;

#[cfg(feature = "std")]
pub mod phy;

#[cfg(feature = "std")]
pub mod arbiter;
