//! The single-byte recovery-reason namespace (§6): "a single-byte
//! namespace covering every failure class." Stored in nvdata as a plain
//! `u8` (nvdata itself is generic over any reason code, §4.3), but every
//! call site that requests recovery constructs one of these rather than
//! writing a magic number, and every one pairs with a human string for
//! `debug!` output — diagnostics only, never control flow (§7's "Debug
//! messages accompany every failure, distinct from recovery reasons").
//!
//! Open Question resolution: the distilled spec names the classes but not
//! their numeric values (those are a real-world on-disk ABI this crate
//! has no compatibility obligation toward, since §1 scopes out "recovery
//! from a corrupt root key" and any cross-version nvdata migration).
//! Values are assigned here in a stable, crate-local order; see
//! DESIGN.md.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecoveryReason {
    NotRequested = 0,
    GbbNotFound = 1,
    GbbMagic = 2,
    GbbVersion = 3,
    FwKeyblockVersionRollback = 4,
    FwKeyblockSigInvalid = 5,
    FwPreambleVersionRollback = 6,
    FwPreambleSigInvalid = 7,
    FwBodySigInvalid = 8,
    SlotNoGood = 9,
    KernelKeyblockSigInvalid = 10,
    KernelPreambleVersionRollback = 11,
    KernelPreambleSigInvalid = 12,
    KernelBodySigInvalid = 13,
    EcUnknownImage = 14,
    EcHashSize = 15,
    EcExpectedHash = 16,
    EcHashFailed = 17,
    EcUpdate = 18,
    EcJumpRw = 19,
    EcProtect = 20,
    TpmClear = 21,
    RwTpmWriteError = 22,
    RwNoDisk = 23,
    RwNoKernel = 24,
    RwInvalidKernel = 25,
    Manual = 26,
    TrainAndReboot = 27,
    AltfwHashFailed = 28,
}

impl RecoveryReason {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotRequested => "not requested",
            Self::GbbNotFound => "GBB not found",
            Self::GbbMagic => "GBB magic mismatch",
            Self::GbbVersion => "GBB version unsupported",
            Self::FwKeyblockVersionRollback => "firmware keyblock version rollback",
            Self::FwKeyblockSigInvalid => "firmware keyblock signature invalid",
            Self::FwPreambleVersionRollback => "firmware preamble version rollback",
            Self::FwPreambleSigInvalid => "firmware preamble signature invalid",
            Self::FwBodySigInvalid => "firmware body signature invalid",
            Self::SlotNoGood => "no firmware slot available to try",
            Self::KernelKeyblockSigInvalid => "kernel keyblock signature invalid",
            Self::KernelPreambleVersionRollback => "kernel preamble version rollback",
            Self::KernelPreambleSigInvalid => "kernel preamble signature invalid",
            Self::KernelBodySigInvalid => "kernel body signature invalid",
            Self::EcUnknownImage => "EC did not report which image it is running",
            Self::EcHashSize => "EC hash length mismatch",
            Self::EcExpectedHash => "EC expected hash unavailable",
            Self::EcHashFailed => "EC hash query failed",
            Self::EcUpdate => "EC image update failed to converge",
            Self::EcJumpRw => "EC failed to jump to RW",
            Self::EcProtect => "EC failed to protect a region",
            Self::TpmClear => "TPM was cleared",
            Self::RwTpmWriteError => "TPM write error outside recovery",
            Self::RwNoDisk => "no bootable disk found",
            Self::RwNoKernel => "no kernel found on disk",
            Self::RwInvalidKernel => "kernel failed verification",
            Self::Manual => "recovery requested manually",
            Self::TrainAndReboot => "memory training required a reboot",
            Self::AltfwHashFailed => "alternate firmware hash check failed",
        };
        f.write_str(msg)
    }
}
