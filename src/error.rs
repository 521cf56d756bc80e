//! Flat error/status type for the verified-boot core.
//!
//! The source this crate follows models fallible subsystems with a small
//! enum plus a hand-written `Display`/`Error` impl (see `domain.rs`'s
//! `TsmError`, or `shadowfax/src/error.rs`) rather than `thiserror`. We
//! keep that shape here but widen it to a single namespace across the
//! whole core, per the design note that error codes must collapse into
//! one flat representation that survives truncation to 8 bits when
//! recorded as a recovery subcode.

use core::fmt;

/// Every failure mode the core can produce, in one flat namespace.
///
/// Deliberately *not* `#[repr(u32)]`: with no payloads on any variant the
/// discriminant is already a plain integer, so `as u32`/`as_code` is exact
/// without relying on layout guarantees `repr` would otherwise buy us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VbError {
    // Workbuf arena
    WorkbufTooSmall,
    WorkbufOutOfMemory,
    WorkbufAlignment,
    WorkbufOrphanedRegion,

    // unpack_key
    UnpackKeySize,
    UnpackKeyAlgorithm,
    UnpackKeyArraySize,

    // Keyblock
    KeyblockMagic,
    KeyblockSize,
    KeyblockSigInvalid,
    KeyblockDataKeyOutOfBounds,
    KeyblockVersionRollback,

    // Preamble
    PreambleSize,
    PreambleSigInvalid,
    PreambleOutOfBounds,
    PreambleVersionRollback,

    // GBB
    GbbMagic,
    GbbVersion,
    GbbOutOfBounds,

    // Crypto
    DigestAlgorithmUnsupported,
    SignatureInvalid,
    SignatureSizeMismatch,

    // Persistent stores
    NvdataCrc,
    NvdataNotInitialized,
    NvdataWrite,
    SecdataCrc,
    SecdataNotInitialized,
    SecdataFirmwareWrite,
    SecdataKernelWrite,
    SecdataFwmpWrite,

    // Firmware / kernel state machine
    SlotNoGood,
    FwBodyHashMismatch,
    KernelSubkeyMissing,
    KernelDataSizeMismatch,
    KernelDataSigInvalid,

    // EC sync
    EcUnknownImage,
    EcHashSize,
    EcExpectedHash,
    EcHashFailed,
    EcUpdate,
    EcJumpRw,
    EcProtect,
    EcRebootToRoRequired,

    // Host I/O
    ReadResourceSize,
    ReadResourceIndex,
    DiskIo,

    // Dispatcher
    RebootRequired,
    Shutdown,
}

impl VbError {
    /// Truncated 8-bit form stored as a recovery subcode (§7).
    pub const fn as_subcode(self) -> u8 {
        (self as u32 & 0xFF) as u8
    }
}

impl fmt::Display for VbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::WorkbufTooSmall => "workbuf too small for requested allocation",
            Self::WorkbufOutOfMemory => "workbuf arena exhausted",
            Self::WorkbufAlignment => "workbuf offset violates alignment",
            Self::WorkbufOrphanedRegion => "set_used would orphan a live region",
            Self::UnpackKeySize => "packed key size out of bounds",
            Self::UnpackKeyAlgorithm => "packed key algorithm tag unrecognized",
            Self::UnpackKeyArraySize => "packed key modulus array size mismatch",
            Self::KeyblockMagic => "keyblock magic mismatch",
            Self::KeyblockSize => "keyblock size out of bounds",
            Self::KeyblockSigInvalid => "keyblock signature invalid",
            Self::KeyblockDataKeyOutOfBounds => "keyblock data key out of bounds",
            Self::KeyblockVersionRollback => "keyblock data key version rollback",
            Self::PreambleSize => "preamble size out of bounds",
            Self::PreambleSigInvalid => "preamble signature invalid",
            Self::PreambleOutOfBounds => "preamble field out of bounds",
            Self::PreambleVersionRollback => "preamble composite version rollback",
            Self::GbbMagic => "GBB magic mismatch",
            Self::GbbVersion => "GBB version unsupported",
            Self::GbbOutOfBounds => "GBB field out of bounds",
            Self::DigestAlgorithmUnsupported => "digest algorithm not compiled in",
            Self::SignatureInvalid => "RSA signature verification failed",
            Self::SignatureSizeMismatch => "signature length does not match key size",
            Self::NvdataCrc => "nvdata CRC mismatch",
            Self::NvdataNotInitialized => "nvdata read before init",
            Self::NvdataWrite => "nvdata write failed",
            Self::SecdataCrc => "secdata CRC mismatch",
            Self::SecdataNotInitialized => "secdata read before init",
            Self::SecdataFirmwareWrite => "secdata-firmware write failed",
            Self::SecdataKernelWrite => "secdata-kernel write failed",
            Self::SecdataFwmpWrite => "secdata-fwmp write failed",
            Self::SlotNoGood => "no firmware slot available to try",
            Self::FwBodyHashMismatch => "firmware body hash mismatch",
            Self::KernelSubkeyMissing => "no kernel subkey available to verify kernel keyblock",
            Self::KernelDataSizeMismatch => "kernel data size does not match preamble",
            Self::KernelDataSigInvalid => "kernel body signature invalid",
            Self::EcUnknownImage => "EC did not report which image it is running",
            Self::EcHashSize => "EC hash length mismatch",
            Self::EcExpectedHash => "EC expected hash unavailable",
            Self::EcHashFailed => "EC hash query failed",
            Self::EcUpdate => "EC image update failed to converge",
            Self::EcJumpRw => "EC failed to jump to RW",
            Self::EcProtect => "EC failed to protect a region",
            Self::EcRebootToRoRequired => "EC requires reboot to RO before continuing",
            Self::ReadResourceSize => "host read_resource returned wrong size",
            Self::ReadResourceIndex => "host read_resource given unknown index",
            Self::DiskIo => "disk I/O failed",
            Self::RebootRequired => "reboot required to continue",
            Self::Shutdown => "shutdown requested",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for VbError {}

pub type VbResult<T> = Result<T, VbError>;
