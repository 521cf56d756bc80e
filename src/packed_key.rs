//! `unpack_key`: turn the packed on-disk key format into an
//! [`RsaVerifyKey`] the crypto layer can hand to the `rsa` crate.
//!
//! The wire format is the self-relative-offset style used throughout this
//! format family (§9's design note): a fixed header naming an offset and
//! size for the variable-length key material, both counted from the start
//! of the packed key itself, not from the start of whatever buffer holds
//! it. `unpack_key` resolves those offsets against a caller-supplied base
//! slice and returns bounds-checked views, never raw pointers.

use alloc::vec::Vec;

use crate::context::Context;
use crate::crypto::{KeyAlgorithm, RsaVerifyKey};
use crate::error::{VbError, VbResult};
use crate::shared_data::WorkbufRegion;
use crate::workbuf::Workbuf;

const HEADER_SIZE: usize = 32;

/// A packed key as found embedded in a keyblock or preamble: a header
/// naming where the modulus words live, plus the resolved key data.
pub struct PackedKey {
    pub algorithm: KeyAlgorithm,
    pub key_version: u32,
    pub modulus_words: Vec<u32>,
}

impl PackedKey {
    pub fn to_verify_key(&self) -> RsaVerifyKey {
        RsaVerifyKey {
            algorithm: self.algorithm,
            modulus_words: self.modulus_words.clone(),
            exponent: 65537,
        }
    }
}

/// Parse a packed key starting at `base[0..]`.
///
/// Header layout (all fields little-endian `u32`, self-relative to `base`):
/// ```text
/// 0  key_version
/// 4  algorithm
/// 8  key_offset   (offset of key data array from `base`)
/// 12 key_size     (byte length of the key data array)
/// 16 reserved[4]
/// ```
/// Key data layout at `base[key_offset..]`:
/// ```text
/// 0  num_words (u32, modulus length in 32-bit words)
/// 4  n0inv     (u32, Montgomery -1/n mod 2^32; parsed for bit-exactness,
///               not used — RSA modexp is delegated to the `rsa` crate)
/// 8  n[num_words]   modulus, little-endian words, least-significant first
/// 8+4*num_words  rr[num_words]  Montgomery R^2 mod N (likewise unused here)
/// ```
pub fn unpack_key(base: &[u8]) -> VbResult<PackedKey> {
    if base.len() < HEADER_SIZE {
        return Err(VbError::UnpackKeySize);
    }
    let key_version = u32_at(base, 0)?;
    let algorithm = KeyAlgorithm::from_u64(u32_at(base, 4)? as u64)?;
    let key_offset = u32_at(base, 8)? as usize;
    let key_size = u32_at(base, 12)? as usize;

    let key_data = base
        .get(key_offset..key_offset.checked_add(key_size).ok_or(VbError::UnpackKeySize)?)
        .ok_or(VbError::UnpackKeySize)?;
    if key_data.len() < 8 {
        return Err(VbError::UnpackKeySize);
    }

    let num_words = u32_at(key_data, 0)? as usize;
    let expected_words = algorithm.key_size_bits() / 32;
    if num_words != expected_words {
        return Err(VbError::UnpackKeyArraySize);
    }
    let _n0inv = u32_at(key_data, 4)?;

    let n_start = 8;
    let n_end = n_start
        .checked_add(num_words.checked_mul(4).ok_or(VbError::UnpackKeyArraySize)?)
        .ok_or(VbError::UnpackKeyArraySize)?;
    let n_bytes = key_data
        .get(n_start..n_end)
        .ok_or(VbError::UnpackKeyArraySize)?;

    // rr follows n and must also be present, even though we don't use it.
    let rr_end = n_end
        .checked_add(num_words.checked_mul(4).ok_or(VbError::UnpackKeyArraySize)?)
        .ok_or(VbError::UnpackKeyArraySize)?;
    if key_data.len() < rr_end {
        return Err(VbError::UnpackKeyArraySize);
    }

    let mut modulus_words = Vec::with_capacity(num_words);
    for chunk in n_bytes.chunks_exact(4) {
        modulus_words.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(PackedKey {
        algorithm,
        key_version,
        modulus_words,
    })
}

fn u32_at(buf: &[u8], offset: usize) -> VbResult<u32> {
    let bytes = buf
        .get(offset..offset + 4)
        .ok_or(VbError::UnpackKeySize)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Pin a verified key's modulus into the arena, permanently pinning the
/// region is left to the caller's `Workbuf::set_used` once the whole
/// phase has staged everything it needs (§4.1's rationale: a verified
/// parent key's buffer is reused in place for the child key it just
/// certified, so staging happens before any `set_used` call commits the
/// boundary). Returns the region so it can be recorded in
/// [`crate::shared_data::SharedData`].
pub fn stage_key_in_workbuf(
    wb: &mut Workbuf,
    ctx: &mut Context<'_>,
    key: &PackedKey,
) -> VbResult<WorkbufRegion> {
    let len = key.modulus_words.len() * 4;
    let offset = wb.alloc(len)?;
    let bytes = wb.slice_mut(ctx, offset, len)?;
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(key.modulus_words.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    Ok(WorkbufRegion { offset, len })
}

/// Reconstitute an [`RsaVerifyKey`] from a region previously pinned by
/// [`stage_key_in_workbuf`]. The algorithm tag is not itself stored in the
/// arena (only raw modulus words are) so the caller must supply it back —
/// it is always available from [`crate::shared_data::SharedData`]
/// alongside the region.
pub fn load_key_from_workbuf(
    ctx: &Context<'_>,
    region: WorkbufRegion,
    algorithm: KeyAlgorithm,
) -> VbResult<RsaVerifyKey> {
    let bytes = ctx.workbuf_ref(region.offset, region.len)?;
    let modulus_words = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(RsaVerifyKey {
        algorithm,
        modulus_words,
        exponent: 65537,
    })
}
