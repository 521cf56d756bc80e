//! GBB: the read-only factory-programmed region naming the root key,
//! the recovery key, and a handful of board-level policy flags. Parsed
//! directly out of whatever slice the host hands in (typically a
//! memory-mapped flash region) — nothing here is copied into the
//! workbuf, since the GBB outlives the boot and the host already owns
//! stable storage for it.

use crate::error::{VbError, VbResult};

pub const GBB_MAGIC: [u8; 8] = *b"VB2GBB01";
const HEADER_SIZE: usize = 52;
const SUPPORTED_MAJOR_VERSION: u32 = 1;
const MINIMUM_MINOR_VERSION: u32 = 1;

/// Board-level policy flags (named per §10.5). Bit layout is local to
/// this crate; the wire format only guarantees the flags word's byte
/// offset, not which bit means what, so this is an Open Question
/// resolution recorded in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GbbFlags(u32);

macro_rules! gbb_flag {
    ($bit:expr, $name:ident) => {
        pub const fn $name(&self) -> bool {
            self.0 & (1 << $bit) != 0
        }
    };
}

impl GbbFlags {
    gbb_flag!(0, disable_fw_rollback_check);
    gbb_flag!(1, enable_serial);
    gbb_flag!(2, force_dev_switch_on);
    gbb_flag!(3, force_dev_boot_usb);
    gbb_flag!(4, disable_lid_switch);
    gbb_flag!(5, disable_ec_software_sync);
    gbb_flag!(6, disable_pd_software_sync);
    gbb_flag!(7, disable_vga);
    gbb_flag!(8, disable_fwmp);
    gbb_flag!(9, force_dev_boot_legacy);
    gbb_flag!(10, force_dev_boot_signed_only);
    gbb_flag!(11, disable_endorsement_check);
}

/// A parsed GBB, borrowing from whatever buffer the host supplied.
pub struct Gbb<'a> {
    pub flags: GbbFlags,
    root_key: &'a [u8],
    recovery_key: &'a [u8],
}

impl<'a> Gbb<'a> {
    pub fn root_key_bytes(&self) -> &'a [u8] {
        self.root_key
    }

    pub fn recovery_key_bytes(&self) -> &'a [u8] {
        self.recovery_key
    }
}

/// Header layout (little-endian, self-relative to the GBB's own start):
/// ```text
/// 0  magic[8]
/// 8  major_version         u32
/// 12 minor_version         u32
/// 16 flags                 u32
/// 20 hwid_offset           u32
/// 24 hwid_size             u32
/// 28 rootkey_offset        u32
/// 32 rootkey_size          u32
/// 36 bmpfv_offset          u32
/// 40 bmpfv_size            u32
/// 44 recovery_key_offset   u32
/// 48 recovery_key_size     u32
/// ```
/// `hwid` and `bmpfv` are parsed for bounds only — they carry the
/// human-readable board ID and the recovery-screen bitmap set, neither
/// of which this core interprets.
pub fn parse_gbb(buf: &[u8]) -> VbResult<Gbb<'_>> {
    if buf.len() < HEADER_SIZE {
        return Err(VbError::GbbOutOfBounds);
    }
    if buf[0..8] != GBB_MAGIC {
        return Err(VbError::GbbMagic);
    }
    let major = u32_at(buf, 8)?;
    let minor = u32_at(buf, 12)?;
    if major != SUPPORTED_MAJOR_VERSION || minor < MINIMUM_MINOR_VERSION {
        return Err(VbError::GbbVersion);
    }
    let flags = GbbFlags(u32_at(buf, 16)?);

    let hwid_offset = u32_at(buf, 20)? as usize;
    let hwid_size = u32_at(buf, 24)? as usize;
    let rootkey_offset = u32_at(buf, 28)? as usize;
    let rootkey_size = u32_at(buf, 32)? as usize;
    let bmpfv_offset = u32_at(buf, 36)? as usize;
    let bmpfv_size = u32_at(buf, 40)? as usize;
    let recovery_key_offset = u32_at(buf, 44)? as usize;
    let recovery_key_size = u32_at(buf, 48)? as usize;

    let _hwid = slice(buf, hwid_offset, hwid_size)?;
    let _bmpfv = slice(buf, bmpfv_offset, bmpfv_size)?;
    let root_key = slice(buf, rootkey_offset, rootkey_size)?;
    let recovery_key = slice(buf, recovery_key_offset, recovery_key_size)?;

    Ok(Gbb {
        flags,
        root_key,
        recovery_key,
    })
}

fn slice(buf: &[u8], offset: usize, len: usize) -> VbResult<&[u8]> {
    buf.get(offset..offset.checked_add(len).ok_or(VbError::GbbOutOfBounds)?)
        .ok_or(VbError::GbbOutOfBounds)
}

fn u32_at(buf: &[u8], offset: usize) -> VbResult<u32> {
    let bytes = buf.get(offset..offset + 4).ok_or(VbError::GbbOutOfBounds)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
