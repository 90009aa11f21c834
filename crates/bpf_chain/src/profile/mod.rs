//! Target Profiles
//!
//! Build-time selection of the packet filter implementation a program is
//! checked and executed against. A profile fixes:
//! - the largest program the target accepts
//! - whether ancillary data loads (`ld #proto`, `ld #rand`, ...) exist
//!
//! # Architecture
//!
//! Profiles use a sealed trait so that only the targets defined here can be
//! selected, and the choice is made through Cargo features:
//!
//! ```bash
//! cargo build --features linux-profile
//! cargo build --no-default-features --features bsd-profile
//! ```
//!
//! # Example
//!
//! ```
//! use bpf_chain::profile::{ActiveProfile, TargetProfile};
//!
//! const LIMIT: usize = ActiveProfile::MAX_INSN_COUNT;
//! assert!(LIMIT >= 512);
//! ```

/// Sealed trait module to prevent external implementations of profile traits.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for packet filter targets.
///
/// # Sealed Trait
///
/// This trait is sealed and cannot be implemented outside this crate.
/// Only `LinuxProfile` and `BsdProfile` are valid implementations.
pub trait TargetProfile: sealed::Sealed + 'static {
    /// Maximum instruction count accepted by the target (`BPF_MAXINSNS`).
    ///
    /// - Linux: 4096
    /// - BSD: 512
    const MAX_INSN_COUNT: usize;

    /// Whether absolute word loads from the ancillary offset range read
    /// built-in values instead of packet bytes.
    const ANCILLARY_LOADS: bool;

    /// Profile name for diagnostics and logging.
    const NAME: &'static str;
}

/// Linux socket filters (`SO_ATTACH_FILTER`) and libpcap on Linux.
///
/// # Build-Time Selection
///
/// ```bash
/// cargo build --features linux-profile
/// ```
pub struct LinuxProfile;

impl sealed::Sealed for LinuxProfile {}

impl TargetProfile for LinuxProfile {
    const MAX_INSN_COUNT: usize = 4096;

    const ANCILLARY_LOADS: bool = true;

    const NAME: &'static str = "linux";
}

/// BSD `bpf(4)` devices.
///
/// # Build-Time Selection
///
/// ```bash
/// cargo build --no-default-features --features bsd-profile
/// ```
pub struct BsdProfile;

impl sealed::Sealed for BsdProfile {}

impl TargetProfile for BsdProfile {
    const MAX_INSN_COUNT: usize = 512;

    /// Only `ld len` exists
    const ANCILLARY_LOADS: bool = false;

    const NAME: &'static str = "bsd";
}

/// The currently active profile based on build-time feature selection.
///
/// This type alias resolves to either `LinuxProfile` or `BsdProfile`
/// depending on which feature flag is enabled.
#[cfg(feature = "linux-profile")]
pub type ActiveProfile = LinuxProfile;

/// The currently active profile based on build-time feature selection.
#[cfg(all(feature = "bsd-profile", not(feature = "linux-profile")))]
pub type ActiveProfile = BsdProfile;
