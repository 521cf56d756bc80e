//! nvdata: non-volatile, non-tamper-evident boot-intent flags (CMOS-backed
//! in production). CRC-protected, read/write at any time.
//!
//! Two on-disk layouts exist side by side because `Context`'s
//! `NVDATA_V2` flag (§6) is meaningless without both representations to
//! pick between: a 16-byte legacy block and a wider 40-byte block that
//! adds a kernel-rollforward ceiling field. Both are CRC-8 protected with
//! the same polynomial (0x07, `CRC_8_SMBUS` in the `crc` crate) so the two
//! layouts stay wire-compatible with real on-disk nvdata.

use crate::error::{VbError, VbResult};

pub const NVDATA_V1_SIZE: usize = 16;
pub const NVDATA_V2_SIZE: usize = 40;

const CRC8: crc::Crc<u8> = crc::Crc::<u8>::new(&crc::CRC_8_SMBUS);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwResult {
    Unknown = 0,
    Success = 1,
    Failure = 2,
    Trying = 3,
}

impl FwResult {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Success,
            2 => Self::Failure,
            3 => Self::Trying,
            _ => Self::Unknown,
        }
    }
}

/// Parsed nvdata. Reads before [`NvData::init`] has been called return 0
/// for every field and never mark the store dirty (§4.3's invariant);
/// that is simply the effect of [`Default`].
#[derive(Debug, Clone)]
pub struct NvData {
    initialized: bool,
    dirty: bool,
    v2: bool,
    try_count: u8,
    try_next: u8,
    fw_result: FwResult,
    fw_slot: u8,
    recovery_request: u8,
    recovery_subcode: u8,
    display_request: bool,
    diag_request: bool,
    dev_boot_usb: bool,
    dev_boot_legacy: bool,
    dev_boot_signed_only: bool,
    try_ro_sync: bool,
    battery_cutoff_request: bool,
    kernel_max_rollforward: u32,
}

impl Default for NvData {
    fn default() -> Self {
        NvData {
            initialized: false,
            dirty: false,
            v2: true,
            try_count: 0,
            try_next: 0,
            fw_result: FwResult::Unknown,
            fw_slot: 0,
            recovery_request: 0,
            recovery_subcode: 0,
            display_request: false,
            diag_request: false,
            dev_boot_usb: false,
            dev_boot_legacy: false,
            dev_boot_signed_only: false,
            try_ro_sync: false,
            battery_cutoff_request: false,
            kernel_max_rollforward: u32::MAX,
        }
    }
}

impl NvData {
    /// A fresh, already-initialized, dirty block for the given layout
    /// (§6's `NVDATA_V2` context flag selects which one a host's CMOS
    /// block is laid out as). Used both on first boot and as the fallback
    /// when [`NvData::init`] rejects a corrupt block's CRC.
    pub fn reset_to_default(v2: bool) -> Self {
        NvData {
            v2,
            initialized: true,
            dirty: true,
            ..Self::default()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Force the dirty flag, used by callers of [`NvData::init`] that
    /// fall back to [`NvData::default`] on a CRC failure and need the
    /// fresh block written back (§4.3).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn wire_size(v2: bool) -> usize {
        if v2 {
            NVDATA_V2_SIZE
        } else {
            NVDATA_V1_SIZE
        }
    }

    /// Parse `raw` (exactly [`NvData::wire_size`] bytes) and validate its
    /// CRC. On CRC failure the caller (firmware phase1) is expected to
    /// fall back to [`NvData::default`] and mark the store dirty so a
    /// fresh block gets written back.
    pub fn init(raw: &[u8], v2: bool) -> VbResult<Self> {
        let size = Self::wire_size(v2);
        if raw.len() != size {
            return Err(VbError::NvdataCrc);
        }
        let stored_crc = raw[size - 1];
        let computed = CRC8.checksum(&raw[..size - 1]);
        if stored_crc != computed {
            return Err(VbError::NvdataCrc);
        }

        let b0 = raw[0];
        let fw_result = FwResult::from_u8(raw[1] & 0x03);
        let fw_slot = (raw[1] >> 2) & 0x01;
        let try_next = (raw[1] >> 3) & 0x01;
        let try_count = raw[2];
        let recovery_request = raw[3];
        let recovery_subcode = raw[4];
        let kernel_max_rollforward = if v2 {
            u32::from_le_bytes([raw[5], raw[6], raw[7], raw[8]])
        } else {
            u32::MAX
        };

        Ok(NvData {
            initialized: true,
            dirty: false,
            v2,
            try_count,
            try_next,
            fw_result,
            fw_slot,
            recovery_request,
            recovery_subcode,
            display_request: b0 & 0x01 != 0,
            diag_request: b0 & 0x02 != 0,
            dev_boot_usb: b0 & 0x04 != 0,
            dev_boot_legacy: b0 & 0x08 != 0,
            dev_boot_signed_only: b0 & 0x10 != 0,
            try_ro_sync: b0 & 0x20 != 0,
            battery_cutoff_request: b0 & 0x40 != 0,
            kernel_max_rollforward,
        })
    }

    /// Serialize into `out` (exactly [`NvData::wire_size`] bytes),
    /// computing and appending the CRC.
    pub fn serialize(&self, out: &mut [u8]) -> VbResult<()> {
        let size = Self::wire_size(self.v2);
        if out.len() != size {
            return Err(VbError::NvdataCrc);
        }
        let mut b0 = 0u8;
        if self.display_request {
            b0 |= 0x01;
        }
        if self.diag_request {
            b0 |= 0x02;
        }
        if self.dev_boot_usb {
            b0 |= 0x04;
        }
        if self.dev_boot_legacy {
            b0 |= 0x08;
        }
        if self.dev_boot_signed_only {
            b0 |= 0x10;
        }
        if self.try_ro_sync {
            b0 |= 0x20;
        }
        if self.battery_cutoff_request {
            b0 |= 0x40;
        }
        out[0] = b0;
        out[1] = (self.fw_result as u8 & 0x03) | (self.fw_slot & 0x01) << 2 | (self.try_next & 0x01) << 3;
        out[2] = self.try_count;
        out[3] = self.recovery_request;
        out[4] = self.recovery_subcode;
        if self.v2 {
            out[5..9].copy_from_slice(&self.kernel_max_rollforward.to_le_bytes());
            for b in &mut out[9..size - 1] {
                *b = 0;
            }
        }
        out[size - 1] = CRC8.checksum(&out[..size - 1]);
        Ok(())
    }

    // --- reads ---
    pub fn try_count(&self) -> u8 {
        self.try_count
    }
    pub fn try_next(&self) -> u8 {
        self.try_next
    }
    pub fn fw_result(&self) -> FwResult {
        self.fw_result
    }
    pub fn fw_slot(&self) -> u8 {
        self.fw_slot
    }
    pub fn recovery_request(&self) -> u8 {
        self.recovery_request
    }
    pub fn recovery_subcode(&self) -> u8 {
        self.recovery_subcode
    }
    pub fn diag_request(&self) -> bool {
        self.diag_request
    }
    pub fn try_ro_sync(&self) -> bool {
        self.try_ro_sync
    }
    pub fn dev_boot_usb(&self) -> bool {
        self.dev_boot_usb
    }
    pub fn dev_boot_legacy(&self) -> bool {
        self.dev_boot_legacy
    }
    pub fn kernel_max_rollforward(&self) -> u32 {
        self.kernel_max_rollforward
    }
    pub fn battery_cutoff_request(&self) -> bool {
        self.battery_cutoff_request
    }

    // --- writes: each marks the store dirty ---
    pub fn set_try_count(&mut self, v: u8) {
        self.try_count = v;
        self.dirty = true;
    }
    pub fn set_try_next(&mut self, slot: u8) {
        self.try_next = slot & 0x01;
        self.dirty = true;
    }
    pub fn set_fw_result(&mut self, result: FwResult, slot: u8) {
        self.fw_result = result;
        self.fw_slot = slot & 0x01;
        self.dirty = true;
    }
    pub fn set_diag_request(&mut self, v: bool) {
        self.diag_request = v;
        self.dirty = true;
    }
    pub fn set_battery_cutoff_request(&mut self, v: bool) {
        self.battery_cutoff_request = v;
        self.dirty = true;
    }
    /// Acknowledge a pending battery-cutoff request once the dispatcher has
    /// handed it to the host (§4.7: "battery-cutoff handling ... may return
    /// early with reboot/shutdown"). Idempotent.
    pub fn clear_battery_cutoff_request(&mut self) {
        self.set_battery_cutoff_request(false);
    }

    /// §8 invariant 4: never overwrite an existing, more specific
    /// recovery reason. The earliest reason wins.
    pub fn request_recovery(&mut self, reason: u8, subcode: u8) {
        if self.recovery_request == 0 {
            self.recovery_request = reason;
            self.recovery_subcode = subcode;
            self.dirty = true;
        }
    }

    pub fn clear_recovery_request(&mut self) {
        if self.recovery_request != 0 {
            self.recovery_request = 0;
            self.recovery_subcode = 0;
            self.dirty = true;
        }
    }
}
