//! Boot-wide mutable state.
//!
//! `Context` is the sole mutable root for an entire boot, replacing the
//! source crate's file-static `STATE: Mutex<OnceCell<State>>` pattern
//! (`src/state.rs`, `src/shadowfax_core/state.rs`) with a single value
//! threaded explicitly through every operation, following the design
//! note against process-wide global state.

use crate::error::{VbError, VbResult};
use crate::nvdata::NvData;
use crate::secdata::{SecDataFirmware, SecDataFwmp, SecDataKernel};

/// Observable context flags (§6). Stored as a bitset so the whole group
/// can be copied and inspected cheaply; each bit has a named accessor
/// below rather than callers masking `u32`s by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFlags(u32);

macro_rules! flag_accessor {
    ($bit:expr, $get:ident, $set:ident) => {
        pub const fn $get(&self) -> bool {
            self.0 & (1 << $bit) != 0
        }
        pub fn $set(&mut self, value: bool) {
            if value {
                self.0 |= 1 << $bit;
            } else {
                self.0 &= !(1 << $bit);
            }
        }
    };
}

impl ContextFlags {
    flag_accessor!(0, recovery_mode, set_recovery_mode);
    flag_accessor!(1, developer_mode, set_developer_mode);
    flag_accessor!(2, force_recovery_mode, set_force_recovery_mode);
    flag_accessor!(3, force_wipeout_mode, set_force_wipeout_mode);
    flag_accessor!(4, disable_developer_mode, set_disable_developer_mode);
    flag_accessor!(5, ec_sync_supported, set_ec_sync_supported);
    flag_accessor!(6, nvdata_v2, set_nvdata_v2);
    flag_accessor!(7, no_secdata_fwmp, set_no_secdata_fwmp);
    flag_accessor!(8, allow_kernel_roll_forward, set_allow_kernel_roll_forward);
    flag_accessor!(9, fw_slot_b, set_fw_slot_b);
    flag_accessor!(10, vendor_data_settable, set_vendor_data_settable);
    flag_accessor!(11, nofail_boot, set_nofail_boot);
    flag_accessor!(12, nvdata_dirty, set_nvdata_dirty);
    flag_accessor!(13, secdata_dirty, set_secdata_dirty);
    flag_accessor!(14, display_available, set_display_available);
    flag_accessor!(15, ec_sync_complete, set_ec_sync_complete);
}

pub struct Context<'a> {
    buf: &'a mut [u8],
    workbuf_used: usize,
    pub flags: ContextFlags,
    pub nvdata: NvData,
    pub secdata_firmware: SecDataFirmware,
    pub secdata_kernel: SecDataKernel,
    pub secdata_fwmp: Option<SecDataFwmp>,
}

impl<'a> Context<'a> {
    /// Create a new boot context over a caller-owned, pre-allocated
    /// scratch buffer. No allocation happens here or anywhere else in
    /// this crate; `buf` is the entire arena for the boot.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Context {
            buf,
            workbuf_used: 0,
            flags: ContextFlags::default(),
            nvdata: NvData::default(),
            secdata_firmware: SecDataFirmware::default(),
            secdata_kernel: SecDataKernel::default(),
            secdata_fwmp: None,
        }
    }

    pub fn workbuf_len(&self) -> usize {
        self.buf.len()
    }

    pub fn workbuf_used(&self) -> usize {
        self.workbuf_used
    }

    /// Only [`crate::workbuf::Workbuf::set_used`] may call this; it has
    /// already checked the orphan-prevention invariant.
    pub(crate) fn set_workbuf_used_raw(&mut self, n: usize) {
        debug_assert!(n <= self.buf.len());
        self.workbuf_used = n;
    }

    pub fn workbuf_ref(&self, offset: usize, len: usize) -> VbResult<&[u8]> {
        self.buf
            .get(offset..offset + len)
            .ok_or(VbError::WorkbufOutOfMemory)
    }

    pub fn workbuf_mut(&mut self, offset: usize, len: usize) -> VbResult<&mut [u8]> {
        self.buf
            .get_mut(offset..offset + len)
            .ok_or(VbError::WorkbufOutOfMemory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_roundtrip_independently() {
        let mut f = ContextFlags::default();
        assert!(!f.recovery_mode());
        f.set_recovery_mode(true);
        f.set_developer_mode(true);
        assert!(f.recovery_mode());
        assert!(f.developer_mode());
        assert!(!f.ec_sync_supported());
        f.set_recovery_mode(false);
        assert!(!f.recovery_mode());
        assert!(f.developer_mode());
    }
}
