//! Keyblock: the first stage of the packed-image chain of trust. A
//! keyblock binds a data key to whichever root key signed it, and is
//! itself self-relative-offset addressed the same way as a packed key
//! (§9's design note) — every field below resolves against the start
//! of the keyblock, not the start of the caller's buffer.

use crate::crypto::verify_digest;
use crate::error::{VbError, VbResult};
use crate::packed_key::{unpack_key, PackedKey};

pub const KEYBLOCK_MAGIC: [u8; 8] = *b"VB2KYBLK";
const HEADER_SIZE: usize = 48;

/// Flag bits carried alongside the data key, gating which boot modes may
/// use it (e.g. a developer-only data key would clear the recovery bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBlockFlags(pub u32);

impl KeyBlockFlags {
    pub const fn usable_in_developer_mode(&self) -> bool {
        self.0 & 0x01 != 0
    }
    pub const fn usable_in_recovery_mode(&self) -> bool {
        self.0 & 0x02 != 0
    }
    pub const fn usable_in_normal_mode(&self) -> bool {
        self.0 & 0x04 != 0
    }
}

/// A parsed, signature-verified keyblock.
pub struct KeyBlock {
    pub flags: KeyBlockFlags,
    pub data_key: PackedKey,
    /// Total size of the keyblock (header through signature) — callers
    /// verifying a vblock use this to find where the following preamble
    /// starts (§4.4: "vb2_load_fw_keyblock → vb2_load_fw_preamble").
    pub size: usize,
}

/// Header layout (little-endian, self-relative to the keyblock's own
/// start):
/// ```text
/// 0  magic[8]
/// 8  header_version_major  u32
/// 12 header_version_minor  u32
/// 16 keyblock_size         u32   total size, header through signature
/// 20 flags                 u32
/// 24 data_key_offset        u32
/// 28 data_key_size          u32
/// 32 sig_offset             u32
/// 36 sig_size               u32
/// 40 reserved[8]
/// ```
pub fn verify_keyblock(buf: &[u8], root_key: &crate::crypto::RsaVerifyKey) -> VbResult<KeyBlock> {
    if buf.len() < HEADER_SIZE {
        return Err(VbError::KeyblockSize);
    }
    if buf[0..8] != KEYBLOCK_MAGIC {
        return Err(VbError::KeyblockMagic);
    }

    let keyblock_size = u32_at(buf, 16)? as usize;
    let flags = KeyBlockFlags(u32_at(buf, 20)?);
    let data_key_offset = u32_at(buf, 24)? as usize;
    let data_key_size = u32_at(buf, 28)? as usize;
    let sig_offset = u32_at(buf, 32)? as usize;
    let sig_size = u32_at(buf, 36)? as usize;

    if keyblock_size > buf.len() || sig_offset.checked_add(sig_size) != Some(keyblock_size) {
        return Err(VbError::KeyblockSize);
    }

    let signed_region = buf
        .get(0..sig_offset)
        .ok_or(VbError::KeyblockDataKeyOutOfBounds)?;
    let mut signature = buf
        .get(sig_offset..keyblock_size)
        .ok_or(VbError::KeyblockDataKeyOutOfBounds)?
        .to_vec();

    let mut digest_ctx = crate::crypto::DigestContext::init(root_key.algorithm.digest())?;
    digest_ctx.extend(signed_region);
    let mut digest = [0u8; 64];
    let digest_len = digest_ctx.finalize(&mut digest)?;

    verify_digest(root_key, &digest[..digest_len], &mut signature)
        .map_err(|_| VbError::KeyblockSigInvalid)?;

    let data_key_bytes = buf
        .get(data_key_offset..data_key_offset.checked_add(data_key_size).ok_or(VbError::KeyblockDataKeyOutOfBounds)?)
        .ok_or(VbError::KeyblockDataKeyOutOfBounds)?;
    let data_key = unpack_key(data_key_bytes)?;

    Ok(KeyBlock {
        flags,
        data_key,
        size: keyblock_size,
    })
}

fn u32_at(buf: &[u8], offset: usize) -> VbResult<u32> {
    let bytes = buf.get(offset..offset + 4).ok_or(VbError::KeyblockSize)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
