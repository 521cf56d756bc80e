//! Shared data: derived per-boot state that the format this was distilled
//! from packs at the base of the workbuf arena so every later phase can
//! find it at a fixed offset (§3). Per the design note in §9 (re-architect
//! self-relative pointer graphs as explicit view types, not raw offsets
//! callers reinterpret by hand), this crate keeps the values themselves as
//! a plain struct owned by [`Context`](crate::context::Context) and keeps
//! only the *workbuf regions* it names as bounds-checked offset/length
//! pairs — the same style [`crate::workbuf`] already uses everywhere else.
//!
//! Open Question resolution (recorded again in DESIGN.md): the source
//! struct this was distilled from is a single packed C struct read and
//! written at a fixed workbuf offset; nothing requires that
//! representation survive the rewrite, only the invariant that every
//! offset it carries stays valid. A plain struct makes that invariant a
//! type-level fact (an `Option<WorkbufRegion>` that outlives the region it
//! names is simply impossible to misuse, not merely rare).

use crate::crypto::KeyAlgorithm;
use crate::nvdata::FwResult;

/// One of the two redundant firmware slots (§1 Non-goals: never more than
/// two).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwSlot {
    A,
    B,
}

impl FwSlot {
    pub const fn other(self) -> Self {
        match self {
            FwSlot::A => FwSlot::B,
            FwSlot::B => FwSlot::A,
        }
    }

    pub const fn as_nv(self) -> u8 {
        match self {
            FwSlot::A => 0,
            FwSlot::B => 1,
        }
    }

    pub const fn from_nv(v: u8) -> Self {
        if v & 1 == 0 {
            FwSlot::A
        } else {
            FwSlot::B
        }
    }
}

/// The result and slot of the previous boot, as read back from nvdata
/// during phase1/phase2 (§3 "the result and slot of the previous boot").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorBoot {
    pub slot: FwSlot,
    pub result: FwResult,
}

/// A still-live, bounds-checked region pinned permanently into the
/// workbuf arena by an earlier phase. `offset + len <= workbuf_used` is
/// enforced at construction time by whichever staging helper produced it
/// ([`crate::packed_key::stage_key_in_workbuf`]); nothing downstream can
/// construct one pointing past the arena's high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbufRegion {
    pub offset: usize,
    pub len: usize,
}

/// Composite version: key-version in the upper 16 bits, body-version in
/// the lower 16 bits (§3, §8).
pub const fn composite_version(key_version: u32, body_version: u32) -> u32 {
    (key_version << 16) | (body_version & 0xFFFF)
}

/// Derived, per-boot state threaded from phase to phase. One `SharedData`
/// per boot, owned by [`Context`](crate::context::Context).
#[derive(Debug, Default)]
pub struct SharedData {
    /// Status bit: nvdata has been read (or defaulted) this boot.
    pub nv_init: bool,
    /// Status bit: secdata-firmware/-kernel have been read (or created)
    /// this boot.
    pub secdata_init: bool,
    /// Status bit: phase2 has picked a slot.
    pub chose_slot: bool,
    /// Status bit: the EC sync protocol (§4.6) has run to completion.
    pub ec_sync_complete: bool,

    pub fw_slot: Option<FwSlot>,
    pub fw_version: u32,
    pub kernel_version: u32,
    pub prior_boot: Option<PriorBoot>,

    /// Data key pinned by phase3, and the algorithm tag needed to
    /// reconstitute an [`crate::crypto::RsaVerifyKey`] from its bytes.
    pub data_key_region: Option<WorkbufRegion>,
    pub data_key_algorithm: Option<KeyAlgorithm>,

    /// Kernel subkey pinned by phase3 (absent in recovery mode, where the
    /// GBB recovery key is used directly instead — §4.5).
    pub kernel_subkey_region: Option<WorkbufRegion>,
    pub kernel_subkey_algorithm: Option<KeyAlgorithm>,

    /// The kernel keyblock's data key, pinned by [`crate::kernel::load_kernel_vblock`]
    /// for the later body-signature check (§4.5's `verify_kernel_data`).
    pub kernel_data_key_region: Option<WorkbufRegion>,
    pub kernel_data_key_algorithm: Option<KeyAlgorithm>,

    /// Set by [`crate::kernel::kernel_phase1`] when the kernel keyblock was
    /// verified against the GBB recovery key rather than the firmware
    /// preamble's kernel subkey. `kernel_phase3` consults this to withhold
    /// roll-forward for recovery images (§4.5: "the kernel was signed (not
    /// a recovery image)").
    pub kernel_used_recovery_key: bool,
}

impl SharedData {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_version_packs_halves() {
        assert_eq!(composite_version(2, 3), 0x0002_0003);
        assert_eq!(composite_version(0xFFFF, 0xFFFF), 0xFFFF_FFFF);
    }

    #[test]
    fn slot_other_is_an_involution() {
        assert_eq!(FwSlot::A.other(), FwSlot::B);
        assert_eq!(FwSlot::B.other().other(), FwSlot::B);
    }

    #[test]
    fn slot_nv_roundtrip() {
        assert_eq!(FwSlot::from_nv(FwSlot::A.as_nv()), FwSlot::A);
        assert_eq!(FwSlot::from_nv(FwSlot::B.as_nv()), FwSlot::B);
    }
}
