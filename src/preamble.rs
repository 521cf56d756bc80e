//! Preambles: the stage bound to a keyblock's data key. A firmware
//! preamble attests to a firmware body (by signature, checked once the
//! body is hashed) and carries the kernel subkey the kernel stage trusts
//! next; a kernel preamble attests to a kernel body the same way and
//! names where to load it. Both use the same self-relative-offset
//! addressing as the rest of this format family (§9).

use alloc::vec::Vec;

use crate::crypto::{verify_digest, DigestContext, RsaVerifyKey};
use crate::error::{VbError, VbResult};
use crate::packed_key::{unpack_key, PackedKey};

pub const FIRMWARE_PREAMBLE_MAGIC: [u8; 8] = *b"VB2FPRAM";
pub const KERNEL_PREAMBLE_MAGIC: [u8; 8] = *b"VB2KPRAM";

/// A verified firmware preamble.
///
/// `firmware_version` is the body-version half of the composite version
/// compared against secdata-firmware (§3); the key-version half comes
/// from the keyblock's data key, one level up.
pub struct FirmwarePreamble {
    pub firmware_version: u32,
    pub body_size: u32,
    pub body_signature: Vec<u8>,
    pub kernel_subkey: Option<PackedKey>,
}

/// A verified kernel preamble.
pub struct KernelPreamble {
    pub kernel_version: u32,
    pub body_load_address: u64,
    pub body_size: u32,
    pub body_signature: Vec<u8>,
}

/// Firmware preamble header layout (little-endian, self-relative):
/// ```text
/// 0  magic[8]
/// 8  header_version_major  u32
/// 12 header_version_minor  u32
/// 16 preamble_size         u32   header + kernel subkey + signature
/// 20 firmware_version      u32
/// 24 body_size             u32
/// 28 body_sig_offset       u32
/// 32 body_sig_size         u32
/// 36 kernel_subkey_offset  u32   (0 if absent)
/// 40 kernel_subkey_size    u32
/// 44 preamble_sig_offset   u32
/// 48 preamble_sig_size     u32
/// 52 reserved[4]
/// ```
pub fn verify_firmware_preamble(buf: &[u8], data_key: &RsaVerifyKey) -> VbResult<FirmwarePreamble> {
    const HEADER_SIZE: usize = 56;
    if buf.len() < HEADER_SIZE {
        return Err(VbError::PreambleSize);
    }
    if buf[0..8] != FIRMWARE_PREAMBLE_MAGIC {
        return Err(VbError::PreambleSize);
    }

    let preamble_size = u32_at(buf, 16)? as usize;
    let firmware_version = u32_at(buf, 20)?;
    let body_size = u32_at(buf, 24)?;
    let body_sig_offset = u32_at(buf, 28)? as usize;
    let body_sig_size = u32_at(buf, 32)? as usize;
    let kernel_subkey_offset = u32_at(buf, 36)? as usize;
    let kernel_subkey_size = u32_at(buf, 40)? as usize;
    let preamble_sig_offset = u32_at(buf, 44)? as usize;
    let preamble_sig_size = u32_at(buf, 48)? as usize;

    if preamble_size > buf.len()
        || preamble_sig_offset
            .checked_add(preamble_sig_size)
            .ok_or(VbError::PreambleSize)?
            != preamble_size
    {
        return Err(VbError::PreambleSize);
    }

    let signed_region = buf
        .get(0..preamble_sig_offset)
        .ok_or(VbError::PreambleOutOfBounds)?;
    let mut signature = buf
        .get(preamble_sig_offset..preamble_size)
        .ok_or(VbError::PreambleOutOfBounds)?
        .to_vec();

    verify_preamble_signature(data_key, signed_region, &mut signature)?;

    let body_signature = buf
        .get(body_sig_offset..body_sig_offset.checked_add(body_sig_size).ok_or(VbError::PreambleOutOfBounds)?)
        .ok_or(VbError::PreambleOutOfBounds)?
        .to_vec();

    let kernel_subkey = if kernel_subkey_size > 0 {
        let bytes = buf
            .get(kernel_subkey_offset..kernel_subkey_offset
                .checked_add(kernel_subkey_size)
                .ok_or(VbError::PreambleOutOfBounds)?)
            .ok_or(VbError::PreambleOutOfBounds)?;
        Some(unpack_key(bytes)?)
    } else {
        None
    };

    Ok(FirmwarePreamble {
        firmware_version,
        body_size,
        body_signature,
        kernel_subkey,
    })
}

/// Kernel preamble header layout, same self-relative addressing:
/// ```text
/// 0  magic[8]
/// 8  header_version_major  u32
/// 12 header_version_minor  u32
/// 16 preamble_size         u32
/// 20 kernel_version        u32
/// 24 body_load_address     u64
/// 32 body_size             u32
/// 36 body_sig_offset       u32
/// 40 body_sig_size         u32
/// 44 preamble_sig_offset   u32
/// 48 preamble_sig_size     u32
/// 52 reserved[4]
/// ```
pub fn verify_kernel_preamble(buf: &[u8], kernel_subkey: &RsaVerifyKey) -> VbResult<KernelPreamble> {
    const HEADER_SIZE: usize = 56;
    if buf.len() < HEADER_SIZE {
        return Err(VbError::PreambleSize);
    }
    if buf[0..8] != KERNEL_PREAMBLE_MAGIC {
        return Err(VbError::PreambleSize);
    }

    let preamble_size = u32_at(buf, 16)? as usize;
    let kernel_version = u32_at(buf, 20)?;
    let body_load_address = u64_at(buf, 24)?;
    let body_size = u32_at(buf, 32)?;
    let body_sig_offset = u32_at(buf, 36)? as usize;
    let body_sig_size = u32_at(buf, 40)? as usize;
    let preamble_sig_offset = u32_at(buf, 44)? as usize;
    let preamble_sig_size = u32_at(buf, 48)? as usize;

    if preamble_size > buf.len()
        || preamble_sig_offset
            .checked_add(preamble_sig_size)
            .ok_or(VbError::PreambleSize)?
            != preamble_size
    {
        return Err(VbError::PreambleSize);
    }

    let signed_region = buf
        .get(0..preamble_sig_offset)
        .ok_or(VbError::PreambleOutOfBounds)?;
    let mut signature = buf
        .get(preamble_sig_offset..preamble_size)
        .ok_or(VbError::PreambleOutOfBounds)?
        .to_vec();

    verify_preamble_signature(kernel_subkey, signed_region, &mut signature)?;

    let body_signature = buf
        .get(body_sig_offset..body_sig_offset.checked_add(body_sig_size).ok_or(VbError::PreambleOutOfBounds)?)
        .ok_or(VbError::PreambleOutOfBounds)?
        .to_vec();

    Ok(KernelPreamble {
        kernel_version,
        body_load_address,
        body_size,
        body_signature,
    })
}

fn verify_preamble_signature(key: &RsaVerifyKey, signed_region: &[u8], signature: &mut [u8]) -> VbResult<()> {
    let mut ctx = DigestContext::init(key.algorithm.digest())?;
    ctx.extend(signed_region);
    let mut digest = [0u8; 64];
    let n = ctx.finalize(&mut digest)?;
    verify_digest(key, &digest[..n], signature).map_err(|_| VbError::PreambleSigInvalid)
}

/// Verify a streamed firmware/kernel body against the signature a
/// preamble carried for it. `body_digest` must already be the result of
/// hashing the body through [`DigestContext`] as it was loaded — bodies
/// are typically too large to stage in the workbuf whole.
pub fn verify_body_signature(data_key: &RsaVerifyKey, body_digest: &[u8], body_signature: &mut [u8]) -> VbResult<()> {
    verify_digest(data_key, body_digest, body_signature)
}

fn u32_at(buf: &[u8], offset: usize) -> VbResult<u32> {
    let bytes = buf.get(offset..offset + 4).ok_or(VbError::PreambleSize)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn u64_at(buf: &[u8], offset: usize) -> VbResult<u64> {
    let bytes = buf.get(offset..offset + 8).ok_or(VbError::PreambleSize)?;
    Ok(u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}
