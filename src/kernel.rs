//! Kernel verification state machine (§4.5):
//!
//! ```text
//! kernel_phase1          pick the keyblock-verification key: the GBB
//!                         recovery key in recovery mode, otherwise the
//!                         kernel subkey firmware phase3 pinned into the
//!                         workbuf.
//!   |  load_kernel_vblock  verify kernel keyblock, then kernel preamble,
//!   |                      same two-step pattern and rollback semantics
//!   |                      as firmware, against secdata-kernel.
//! KERNEL_PREAMBLE_LOADED
//!   |  (host loads kernel body; calls verify_kernel_data)
//! KERNEL_BODY_VERIFIED
//!   |  kernel_phase3       roll-forward secdata-kernel if earned.
//! ```
//!
//! Unlike the firmware body (§4.4, streamed chunk by chunk through
//! `hash_fw_body`), the kernel body here is verified from a caller-
//! supplied whole buffer: disk I/O and the kernel's own loader are out of
//! scope (§1), so by the time `verify_kernel_data` runs the host has
//! already staged the body wherever it needed to.

use alloc::vec::Vec;

use crate::context::Context;
use crate::crypto::{DigestContext, KeyAlgorithm, RsaVerifyKey};
use crate::error::{VbError, VbResult};
use crate::gbb::Gbb;
use crate::keyblock::verify_keyblock;
use crate::packed_key::{load_key_from_workbuf, stage_key_in_workbuf, unpack_key};
use crate::preamble::{verify_body_signature, verify_kernel_preamble};
use crate::shared_data::{composite_version, SharedData};
use crate::workbuf::Workbuf;

/// Phase 1 (§4.5). By the time this is called, the caller has already
/// populated `ctx.secdata_kernel` / `ctx.secdata_fwmp` (mirroring §4.4's
/// `fw_phase1` — store initialization is a store-manager concern, §4.3).
/// This phase's only job is to decide which key certifies the kernel's
/// keyblock.
pub fn kernel_phase1(ctx: &Context<'_>, shared: &mut SharedData, gbb: &Gbb<'_>) -> VbResult<RsaVerifyKey> {
    if ctx.flags.recovery_mode() {
        shared.kernel_used_recovery_key = true;
        let recovery_key = unpack_key(gbb.recovery_key_bytes())?;
        Ok(recovery_key.to_verify_key())
    } else {
        shared.kernel_used_recovery_key = false;
        let region = shared
            .kernel_subkey_region
            .ok_or(VbError::KernelSubkeyMissing)?;
        let algorithm = shared
            .kernel_subkey_algorithm
            .ok_or(VbError::KernelSubkeyMissing)?;
        load_key_from_workbuf(ctx, region, algorithm)
    }
}

/// What's left to check once the host has loaded the kernel body: the
/// body signature pulled out of the kernel preamble, held until
/// [`verify_kernel_data`] has the bytes to hash (§4.5, §8 invariant 3).
pub struct KernelBodyExpectation {
    pub body_size: u32,
    pub body_load_address: u64,
    signature: Vec<u8>,
}

impl KernelBodyExpectation {
    fn verify(
        mut self,
        ctx: &Context<'_>,
        shared: &SharedData,
        body_digest: &[u8],
    ) -> VbResult<()> {
        let region = shared
            .kernel_data_key_region
            .ok_or(VbError::KernelDataSigInvalid)?;
        let algorithm = shared
            .kernel_data_key_algorithm
            .ok_or(VbError::KernelDataSigInvalid)?;
        let key = load_key_from_workbuf(ctx, region, algorithm)?;
        verify_body_signature(&key, body_digest, &mut self.signature)
            .map_err(|_| VbError::KernelDataSigInvalid)
    }
}

/// Verify the kernel keyblock (against `kernel_key`, chosen by
/// [`kernel_phase1`]) and then the kernel preamble out of `vblock` — the
/// same two-step pattern §4.4 uses for firmware, against secdata-kernel
/// instead of secdata-firmware. Unlike firmware, there is no
/// override flag for kernel rollback: it is always enforced.
pub fn load_kernel_vblock(
    ctx: &mut Context<'_>,
    shared: &mut SharedData,
    kernel_key: &RsaVerifyKey,
    vblock: &[u8],
) -> VbResult<KernelBodyExpectation> {
    let keyblock = verify_keyblock(vblock, kernel_key)?;

    let kernel_versions = ctx.secdata_kernel.versions();
    if keyblock.data_key.key_version < (kernel_versions >> 16) {
        return Err(VbError::KeyblockVersionRollback);
    }

    let preamble_buf = vblock
        .get(keyblock.size..)
        .ok_or(VbError::PreambleOutOfBounds)?;
    let data_key = keyblock.data_key.to_verify_key();
    let preamble = verify_kernel_preamble(preamble_buf, &data_key)?;

    let composite = composite_version(keyblock.data_key.key_version, preamble.kernel_version);
    if composite < kernel_versions {
        return Err(VbError::PreambleVersionRollback);
    }
    shared.kernel_version = composite;

    let mut wb = Workbuf::from_ctx(ctx);
    let region = stage_key_in_workbuf(&mut wb, ctx, &keyblock.data_key)?;
    let used = wb.high_water();
    wb.set_used(ctx, used)?;

    shared.kernel_data_key_region = Some(region);
    shared.kernel_data_key_algorithm = Some(keyblock.data_key.algorithm);

    Ok(KernelBodyExpectation {
        body_size: preamble.body_size,
        body_load_address: preamble.body_load_address,
        signature: preamble.body_signature,
    })
}

/// `verify_kernel_data(buf, size)` (§4.5): `buf.len()` must equal the
/// preamble's declared body size; hash the whole buffer at once (the
/// kernel body, unlike the firmware body, is not streamed — see the
/// module doc) and RSA-verify the digest against the preamble's body
/// signature (§9's historical note: the body is signed, not merely
/// hashed, costing an extra RSA verify per kernel).
pub fn verify_kernel_data(
    ctx: &Context<'_>,
    shared: &SharedData,
    algorithm: KeyAlgorithm,
    buf: &[u8],
    expectation: KernelBodyExpectation,
) -> VbResult<()> {
    if buf.len() as u64 != expectation.body_size as u64 {
        return Err(VbError::KernelDataSizeMismatch);
    }
    let mut digest_ctx = DigestContext::init(algorithm.digest())?;
    digest_ctx.extend(buf);
    let mut digest = [0u8; 64];
    let n = digest_ctx.finalize(&mut digest)?;
    expectation.verify(ctx, shared, &digest[..n])
}

/// Phase 3 (§4.5): advance secdata-kernel only when every one of the
/// spec's four conditions holds. Recovery-mode boots, and boots that
/// verified against the GBB recovery key, never roll forward — a
/// recovery kernel proves nothing about the signed kernel's trustworthiness.
pub fn kernel_phase3(ctx: &mut Context<'_>, shared: &SharedData) {
    let kernel_versions = ctx.secdata_kernel.versions();
    if shared.kernel_version > kernel_versions
        && ctx.flags.allow_kernel_roll_forward()
        && !shared.kernel_used_recovery_key
        && !ctx.flags.recovery_mode()
    {
        ctx.secdata_kernel.set_versions(shared.kernel_version);
    }
}
