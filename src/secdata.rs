//! secdata: tamper-evident persistent data (TPM-backed in production).
//! The core only sees a small typed interface — the TPM wire protocol
//! itself is out of scope (§1) — so these structs are plain fixed-layout
//! blobs; tamper evidence is a property of the backing store the host
//! reads/writes them through, not of anything computed here.

use crate::error::VbResult;

pub const SECDATA_FIRMWARE_SIZE: usize = 8;
pub const SECDATA_KERNEL_SIZE: usize = 8;
pub const SECDATA_FWMP_SIZE: usize = 40;

/// Monotonic firmware versions plus a couple of sticky mode flags.
/// `versions` is the composite `(key_version << 16) | body_version`
/// described in §3/§8.
#[derive(Debug, Clone)]
pub struct SecDataFirmware {
    initialized: bool,
    dirty: bool,
    versions: u32,
    dev_mode: bool,
    last_boot_developer: bool,
}

impl Default for SecDataFirmware {
    fn default() -> Self {
        SecDataFirmware {
            initialized: false,
            dirty: false,
            versions: 0,
            dev_mode: false,
            last_boot_developer: false,
        }
    }
}

impl SecDataFirmware {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn init(raw: &[u8; SECDATA_FIRMWARE_SIZE]) -> Self {
        SecDataFirmware {
            initialized: true,
            dirty: false,
            versions: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            dev_mode: raw[4] & 0x01 != 0,
            last_boot_developer: raw[4] & 0x02 != 0,
        }
    }

    /// Emit a fresh default blob (used by `create` when the TPM space
    /// does not exist yet, e.g. first boot or after a TPM clear).
    pub fn create() -> Self {
        SecDataFirmware {
            initialized: true,
            dirty: true,
            versions: 0,
            dev_mode: false,
            last_boot_developer: false,
        }
    }

    pub fn serialize(&self, raw: &mut [u8; SECDATA_FIRMWARE_SIZE]) {
        raw[0..4].copy_from_slice(&self.versions.to_le_bytes());
        let mut flags = 0u8;
        if self.dev_mode {
            flags |= 0x01;
        }
        if self.last_boot_developer {
            flags |= 0x02;
        }
        raw[4] = flags;
        raw[5..8].fill(0);
    }

    pub fn versions(&self) -> u32 {
        self.versions
    }

    pub fn set_versions(&mut self, v: u32) {
        self.versions = v;
        self.dirty = true;
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }
}

/// Monotonic kernel versions.
#[derive(Debug, Clone)]
pub struct SecDataKernel {
    initialized: bool,
    dirty: bool,
    versions: u32,
}

impl Default for SecDataKernel {
    fn default() -> Self {
        SecDataKernel {
            initialized: false,
            dirty: false,
            versions: 0,
        }
    }
}

impl SecDataKernel {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn init(raw: &[u8; SECDATA_KERNEL_SIZE]) -> Self {
        SecDataKernel {
            initialized: true,
            dirty: false,
            versions: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        }
    }

    pub fn create() -> Self {
        SecDataKernel {
            initialized: true,
            dirty: true,
            versions: 0,
        }
    }

    pub fn serialize(&self, raw: &mut [u8; SECDATA_KERNEL_SIZE]) {
        raw[0..4].copy_from_slice(&self.versions.to_le_bytes());
        raw[4..8].fill(0);
    }

    pub fn versions(&self) -> u32 {
        self.versions
    }

    pub fn set_versions(&mut self, v: u32) {
        self.versions = v;
        self.dirty = true;
    }
}

/// Firmware management parameters. May be entirely absent (§6's
/// `NO_SECDATA_FWMP` context flag): when absent, policy reads fall back
/// to the permissive defaults below rather than failing, since there is
/// no enterprise enrollment to enforce.
#[derive(Debug, Clone)]
pub struct SecDataFwmp {
    dirty: bool,
    pub dev_disable_boot: bool,
    pub dev_disable_recovery: bool,
    pub hash: [u8; 32],
}

impl Default for SecDataFwmp {
    fn default() -> Self {
        SecDataFwmp {
            dirty: false,
            dev_disable_boot: false,
            dev_disable_recovery: false,
            hash: [0u8; 32],
        }
    }
}

impl SecDataFwmp {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn init(raw: &[u8; SECDATA_FWMP_SIZE]) -> VbResult<Self> {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&raw[0..32]);
        Ok(SecDataFwmp {
            dirty: false,
            dev_disable_boot: raw[32] & 0x01 != 0,
            dev_disable_recovery: raw[32] & 0x02 != 0,
            hash,
        })
    }

    pub fn serialize(&self, raw: &mut [u8; SECDATA_FWMP_SIZE]) {
        raw[0..32].copy_from_slice(&self.hash);
        let mut flags = 0u8;
        if self.dev_disable_boot {
            flags |= 0x01;
        }
        if self.dev_disable_recovery {
            flags |= 0x02;
        }
        raw[32] = flags;
        raw[33..40].fill(0);
    }
}
