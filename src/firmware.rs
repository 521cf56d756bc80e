//! Firmware verification state machine (§4.4):
//!
//! ```text
//! START
//!   |  phase1  (recovery arbitration; nvdata/secdata already parsed)
//! RECOVERY_DECIDED
//!   |  phase2  (slot select; try-count bookkeeping)
//! SLOT_CHOSEN
//!   |  phase3  (keyblock + preamble verify; rollback / roll-forward)
//! PREAMBLE_LOADED
//!   |  host loads firmware body; calls hash_fw_body + FwBodyExpectation::verify
//! BODY_VERIFIED
//! ```
//!
//! [`api_fail`] is the shared failure/retry policy (§4.4, §7) any phase
//! calls when it cannot proceed: it never itself decides *that* something
//! failed, only what should happen next (retry the other slot, or ask for
//! recovery).

use alloc::vec::Vec;

use crate::context::Context;
use crate::crypto::{DigestContext, KeyAlgorithm};
use crate::error::{VbError, VbResult};
use crate::gbb::Gbb;
use crate::host::{ReadResource, ResourceIndex};
use crate::keyblock::verify_keyblock;
use crate::nvdata::FwResult;
use crate::packed_key::{load_key_from_workbuf, stage_key_in_workbuf, unpack_key};
use crate::preamble::{verify_firmware_preamble, verify_body_signature};
use crate::recovery::RecoveryReason;
use crate::shared_data::{composite_version, FwSlot, PriorBoot, SharedData};
use crate::workbuf::Workbuf;

/// Phase 1 (§4.4). By the time this is called, the caller has already
/// populated `ctx.nvdata` / `ctx.secdata_firmware` (mirroring §4.3's
/// `init(ctx)` — nvdata and secdata initialization is a store-manager
/// concern, not a firmware-state-machine one). This phase's only job is
/// recovery arbitration: decide whether the boot is in recovery mode, and
/// snapshot the previous boot's slot/result for phase2 and phase3 to
/// consult.
pub fn fw_phase1(ctx: &mut Context<'_>, shared: &mut SharedData) {
    shared.nv_init = true;
    shared.secdata_init = true;

    if ctx.flags.force_recovery_mode() {
        ctx.flags.set_recovery_mode(true);
        ctx.nvdata
            .request_recovery(RecoveryReason::Manual.as_u8(), 0);
    }
    if ctx.nvdata.recovery_request() != 0 {
        ctx.flags.set_recovery_mode(true);
    }

    shared.prior_boot = Some(PriorBoot {
        slot: FwSlot::from_nv(ctx.nvdata.fw_slot()),
        result: ctx.nvdata.fw_result(),
    });
}

/// Phase 2 (§4.4): slot selection and try-count bookkeeping.
///
/// ```text
/// if last_result == TRYING && last_slot == try_next && try_count == 0:
///     slot = other(try_next)      // last try of try_next was exhausted
/// else:
///     slot = try_next
/// if try_count > 0:
///     nvdata.fw_result = TRYING (for `slot`)
///     if !NOFAIL_BOOT: try_count -= 1
/// ```
pub fn fw_phase2(ctx: &mut Context<'_>, shared: &mut SharedData) -> FwSlot {
    let last_result = ctx.nvdata.fw_result();
    let last_slot = FwSlot::from_nv(ctx.nvdata.fw_slot());
    let try_next = FwSlot::from_nv(ctx.nvdata.try_next());
    let try_count = ctx.nvdata.try_count();

    let slot = if last_result == FwResult::Trying && last_slot == try_next && try_count == 0 {
        try_next.other()
    } else {
        try_next
    };

    if try_count > 0 {
        ctx.nvdata.set_fw_result(FwResult::Trying, slot.as_nv());
        if !ctx.flags.nofail_boot() {
            ctx.nvdata.set_try_count(try_count - 1);
        }
    }

    shared.fw_slot = Some(slot);
    shared.chose_slot = true;
    slot
}

/// What's left to check once the host has loaded and hashed the firmware
/// body: the body signature pulled out of the preamble, held until the
/// digest is available (§4.4's "host loads firmware body; core hashes it
/// against preamble").
pub struct FwBodyExpectation {
    pub body_size: u32,
    signature: Vec<u8>,
}

impl FwBodyExpectation {
    /// Verify a streamed body digest (see [`hash_fw_body`]) against the
    /// signature this preamble carried, using the data key phase3 pinned
    /// into the workbuf. Consumes `self`: each signature is checked at
    /// most once per boot (§4.2 policy, §8 invariant 3).
    pub fn verify(mut self, ctx: &Context<'_>, shared: &SharedData, body_digest: &[u8]) -> VbResult<()> {
        let region = shared
            .data_key_region
            .ok_or(VbError::FwBodyHashMismatch)?;
        let algorithm = shared
            .data_key_algorithm
            .ok_or(VbError::FwBodyHashMismatch)?;
        let key = load_key_from_workbuf(ctx, region, algorithm)?;
        verify_body_signature(&key, body_digest, &mut self.signature)
            .map_err(|_| VbError::FwBodyHashMismatch)
    }
}

/// Phase 3 (§4.4): load and verify the keyblock then the preamble out of
/// `vblock` (the on-disk concatenation read from [`ResourceIndex::FwVblock`]
/// for `shared.fw_slot`), enforce rollback, apply roll-forward, and pin
/// the data key / kernel subkey into the arena for the kernel state
/// machine (§4.5) to find later.
pub fn fw_phase3(ctx: &mut Context<'_>, shared: &mut SharedData, gbb: &Gbb<'_>, vblock: &[u8]) -> VbResult<FwBodyExpectation> {
    let slot = shared.fw_slot.ok_or(VbError::SlotNoGood)?;

    let root_key = unpack_key(gbb.root_key_bytes())?.to_verify_key();
    let keyblock = verify_keyblock(vblock, &root_key)?;

    let allow_rollback = gbb.flags.disable_fw_rollback_check();
    let fw_versions = ctx.secdata_firmware.versions();
    if !allow_rollback && keyblock.data_key.key_version < (fw_versions >> 16) {
        return Err(VbError::KeyblockVersionRollback);
    }

    let preamble_buf = vblock
        .get(keyblock.size..)
        .ok_or(VbError::PreambleOutOfBounds)?;
    let data_key = keyblock.data_key.to_verify_key();
    let preamble = verify_firmware_preamble(preamble_buf, &data_key)?;

    let composite = composite_version(keyblock.data_key.key_version, preamble.firmware_version);
    if !allow_rollback && composite < fw_versions {
        return Err(VbError::PreambleVersionRollback);
    }

    // Roll-forward (§4.4): only advance secdata if the boot we are
    // currently trying is the same slot whose *previous* boot reported
    // success — "trust last boot" lets a newer firmware promote itself
    // only after it has already run once.
    if composite > fw_versions {
        if let Some(prior) = shared.prior_boot {
            if prior.result == FwResult::Success && prior.slot == slot {
                ctx.secdata_firmware.set_versions(composite);
            }
        }
    }
    shared.fw_version = composite;

    let mut wb = Workbuf::from_ctx(ctx);
    let data_key_region = stage_key_in_workbuf(&mut wb, ctx, &keyblock.data_key)?;
    let kernel_subkey_region = match &preamble.kernel_subkey {
        Some(sk) => Some(stage_key_in_workbuf(&mut wb, ctx, sk)?),
        None => None,
    };
    let used = wb.high_water();
    wb.set_used(ctx, used)?;

    shared.data_key_region = Some(data_key_region);
    shared.data_key_algorithm = Some(keyblock.data_key.algorithm);
    shared.kernel_subkey_region = kernel_subkey_region;
    shared.kernel_subkey_algorithm = preamble.kernel_subkey.as_ref().map(|k| k.algorithm);

    Ok(FwBodyExpectation {
        body_size: preamble.body_size,
        signature: preamble.body_signature,
    })
}

/// Stream the firmware body through a digest, one `chunk_buf`-sized read
/// at a time (§4.2's hash-extend interface; §5: every I/O call blocks).
/// The body is never staged whole — only its running digest is kept.
pub fn hash_fw_body<H: ReadResource>(
    host: &mut H,
    algorithm: KeyAlgorithm,
    body_size: u32,
    chunk_buf: &mut [u8],
) -> VbResult<([u8; 64], usize)> {
    let mut digest_ctx = DigestContext::init(algorithm.digest())?;
    let mut remaining = body_size as u64;
    let mut offset = 0u64;
    while remaining > 0 {
        let n = core::cmp::min(remaining, chunk_buf.len() as u64) as usize;
        host.read_resource(ResourceIndex::FwBody, offset, &mut chunk_buf[..n])?;
        digest_ctx.extend(&chunk_buf[..n]);
        offset += n as u64;
        remaining -= n as u64;
    }
    let mut digest = [0u8; 64];
    let len = digest_ctx.finalize(&mut digest)?;
    Ok((digest, len))
}

/// The shared failure/retry policy (§4.4, §7): a failed phase calls this
/// instead of deciding for itself whether to demand recovery.
///
/// ```text
/// if a slot was chosen:
///     nvdata.fw_result = FAILURE (for that slot)
///     nvdata.try_count = 0
///     nvdata.try_next  = other(slot)
///     if the *other* slot did not already fail last boot: return (retry it)
///     else: request recovery(reason, subcode)
/// else:
///     request recovery(reason, subcode)
/// ```
pub fn api_fail(ctx: &mut Context<'_>, shared: &SharedData, reason: RecoveryReason, subcode: u8) {
    match shared.fw_slot {
        Some(slot) => {
            let other = slot.other();
            ctx.nvdata.set_fw_result(FwResult::Failure, slot.as_nv());
            ctx.nvdata.set_try_count(0);
            ctx.nvdata.set_try_next(other.as_nv());

            let both_failed_in_a_row = shared
                .prior_boot
                .map(|p| p.slot == other && p.result == FwResult::Failure)
                .unwrap_or(false);
            if both_failed_in_a_row {
                ctx.nvdata.request_recovery(reason.as_u8(), subcode);
            }
        }
        None => {
            ctx.nvdata.request_recovery(reason.as_u8(), subcode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbb::parse_gbb;
    use crate::nvdata::NvData;
    use crate::secdata::SecDataFirmware;
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{RandomizedSigner, SignatureEncoding};
    use rsa::RsaPrivateKey;

    fn build_packed_key(modulus_words: &[u32], algorithm: u32, key_version: u32) -> Vec<u8> {
        let key_offset = 32u32;
        let key_size = 8 + modulus_words.len() as u32 * 8;
        let mut buf = Vec::new();
        buf.extend_from_slice(&key_version.to_le_bytes());
        buf.extend_from_slice(&algorithm.to_le_bytes());
        buf.extend_from_slice(&key_offset.to_le_bytes());
        buf.extend_from_slice(&key_size.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&(modulus_words.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for w in modulus_words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        for w in modulus_words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        buf
    }

    fn build_keyblock(root_priv: &RsaPrivateKey, data_pub_words: &[u32], key_version: u32) -> Vec<u8> {
        let data_key_bytes = build_packed_key(data_pub_words, 4, key_version); // Rsa2048Sha256
        let header_size = 48usize;

        let mut body = Vec::new();
        body.extend_from_slice(&crate::keyblock::KEYBLOCK_MAGIC);
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // keyblock_size, patched
        body.extend_from_slice(&0x07u32.to_le_bytes());
        let data_key_offset = header_size as u32;
        body.extend_from_slice(&data_key_offset.to_le_bytes());
        body.extend_from_slice(&(data_key_bytes.len() as u32).to_le_bytes());
        let sig_offset = header_size as u32 + data_key_bytes.len() as u32;
        body.extend_from_slice(&sig_offset.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // sig_size, patched
        body.extend_from_slice(&[0u8; 8]);
        body.extend_from_slice(&data_key_bytes);

        let signing_key = SigningKey::<sha2::Sha256>::new(root_priv.clone());
        let mut rng = rand::thread_rng();
        let sig = signing_key.sign_with_rng(&mut rng, &body).to_bytes().to_vec();
        let sig_size = sig.len() as u32;
        let keyblock_size = sig_offset + sig_size;
        body[16..20].copy_from_slice(&keyblock_size.to_le_bytes());
        body[36..40].copy_from_slice(&sig_size.to_le_bytes());
        body.extend_from_slice(&sig);
        body
    }

    fn build_preamble(data_priv: &RsaPrivateKey, firmware_version: u32, body_bytes: &[u8]) -> Vec<u8> {
        let signing_key = SigningKey::<sha2::Sha256>::new(data_priv.clone());
        let mut rng = rand::thread_rng();
        let body_sig = signing_key.sign_with_rng(&mut rng, body_bytes).to_bytes().to_vec();
        let body_sig_offset = 56u32;
        let body_sig_size = body_sig.len() as u32;
        let preamble_sig_offset = body_sig_offset + body_sig_size;

        let mut header = Vec::new();
        header.extend_from_slice(&crate::preamble::FIRMWARE_PREAMBLE_MAGIC);
        header.extend_from_slice(&1u32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes()); // preamble_size, patched
        header.extend_from_slice(&firmware_version.to_le_bytes());
        header.extend_from_slice(&(body_bytes.len() as u32).to_le_bytes());
        header.extend_from_slice(&body_sig_offset.to_le_bytes());
        header.extend_from_slice(&body_sig_size.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&preamble_sig_offset.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes()); // preamble_sig_size, patched
        header.extend_from_slice(&[0u8; 4]);
        header.extend_from_slice(&body_sig);

        let preamble_sig = signing_key.sign_with_rng(&mut rng, &header).to_bytes().to_vec();
        let preamble_sig_size = preamble_sig.len() as u32;
        let preamble_size = preamble_sig_offset + preamble_sig_size;
        header[16..20].copy_from_slice(&preamble_size.to_le_bytes());
        header[48..52].copy_from_slice(&preamble_sig_size.to_le_bytes());
        header.extend_from_slice(&preamble_sig);
        header
    }

    fn build_gbb(root_pub_words: &[u32]) -> Vec<u8> {
        let root_key_bytes = build_packed_key(root_pub_words, 4, 0);
        let hwid = b"TEST";
        let bmpfv = [0u8; 8];
        let header_size = 52u32;
        let hwid_offset = header_size;
        let rootkey_offset = hwid_offset + hwid.len() as u32;
        let bmpfv_offset = rootkey_offset + root_key_bytes.len() as u32;
        let recovery_key_offset = bmpfv_offset + bmpfv.len() as u32;

        let mut buf = Vec::new();
        buf.extend_from_slice(&crate::gbb::GBB_MAGIC);
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // flags
        buf.extend_from_slice(&hwid_offset.to_le_bytes());
        buf.extend_from_slice(&(hwid.len() as u32).to_le_bytes());
        buf.extend_from_slice(&rootkey_offset.to_le_bytes());
        buf.extend_from_slice(&(root_key_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&bmpfv_offset.to_le_bytes());
        buf.extend_from_slice(&(bmpfv.len() as u32).to_le_bytes());
        buf.extend_from_slice(&recovery_key_offset.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // no recovery key in this fixture
        buf.extend_from_slice(hwid);
        buf.extend_from_slice(&root_key_bytes);
        buf.extend_from_slice(&bmpfv);
        buf
    }

    struct Fixture {
        gbb_bytes: Vec<u8>,
        vblock: Vec<u8>,
        body: Vec<u8>,
    }

    fn fixture(key_version: u32, firmware_version: u32) -> Fixture {
        let mut rng = rand::thread_rng();
        let root_priv = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let data_priv = RsaPrivateKey::new(&mut rng, 2048).unwrap();

        let gbb_bytes = build_gbb(&root_priv.to_public_key().n().to_u32_digits());
        let keyblock = build_keyblock(&root_priv, &data_priv.to_public_key().n().to_u32_digits(), key_version);
        let body = b"firmware body bytes go here".to_vec();
        let preamble = build_preamble(&data_priv, firmware_version, &body);

        let mut vblock = keyblock;
        vblock.extend_from_slice(&preamble);

        Fixture {
            gbb_bytes,
            vblock,
            body,
        }
    }

    struct StubHost<'a> {
        body: &'a [u8],
    }

    impl ReadResource for StubHost<'_> {
        fn read_resource(&mut self, index: ResourceIndex, offset: u64, buf: &mut [u8]) -> VbResult<()> {
            assert_eq!(index, ResourceIndex::FwBody);
            let start = offset as usize;
            buf.copy_from_slice(&self.body[start..start + buf.len()]);
            Ok(())
        }
    }

    #[test]
    fn scenario_a_happy_path_try_count_decrements() {
        let fx = fixture(2, 2);
        let gbb = parse_gbb(&fx.gbb_bytes).unwrap();

        let mut storage = [0u8; 2048];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.nvdata.set_try_count(1);
        ctx.nvdata.set_try_next(0);
        ctx.nvdata.set_fw_result(FwResult::Success, 0);
        ctx.secdata_firmware = SecDataFirmware::create();
        ctx.secdata_firmware.set_versions(0x0002_0002);

        let mut shared = SharedData::new();
        fw_phase1(&mut ctx, &mut shared);
        let slot = fw_phase2(&mut ctx, &mut shared);
        assert_eq!(slot, FwSlot::A);
        assert_eq!(ctx.nvdata.try_count(), 0);
        assert_eq!(ctx.nvdata.fw_result(), FwResult::Trying);

        let expectation = fw_phase3(&mut ctx, &mut shared, &gbb, &fx.vblock).unwrap();
        assert_eq!(shared.fw_version, 0x0002_0002);
        assert_eq!(ctx.secdata_firmware.versions(), 0x0002_0002, "secdata must not change");

        let mut host = StubHost { body: &fx.body };
        let mut chunk = [0u8; 16];
        let (digest, len) = hash_fw_body(
            &mut host,
            shared.data_key_algorithm.unwrap(),
            expectation.body_size,
            &mut chunk,
        )
        .unwrap();
        expectation.verify(&ctx, &shared, &digest[..len]).unwrap();
    }

    #[test]
    fn scenario_b_roll_forward_advances_secdata() {
        let fx = fixture(2, 3);
        let gbb = parse_gbb(&fx.gbb_bytes).unwrap();

        let mut storage = [0u8; 2048];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.nvdata.set_try_next(0);
        ctx.nvdata.set_fw_result(FwResult::Success, 0);
        ctx.secdata_firmware = SecDataFirmware::create();
        ctx.secdata_firmware.set_versions(0x0002_0002);

        let mut shared = SharedData::new();
        fw_phase1(&mut ctx, &mut shared);
        fw_phase2(&mut ctx, &mut shared);
        fw_phase3(&mut ctx, &mut shared, &gbb, &fx.vblock).unwrap();

        assert_eq!(shared.fw_version, 0x0002_0003);
        assert_eq!(ctx.secdata_firmware.versions(), 0x0002_0003);
    }

    #[test]
    fn scenario_c_roll_forward_suppressed_on_wrong_slot() {
        let fx = fixture(2, 3);
        let gbb = parse_gbb(&fx.gbb_bytes).unwrap();

        let mut storage = [0u8; 2048];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.nvdata.set_try_next(0);
        ctx.nvdata.set_fw_result(FwResult::Success, 1); // prior success was slot B, not A
        ctx.secdata_firmware = SecDataFirmware::create();
        ctx.secdata_firmware.set_versions(0x0002_0002);

        let mut shared = SharedData::new();
        fw_phase1(&mut ctx, &mut shared);
        fw_phase2(&mut ctx, &mut shared);
        fw_phase3(&mut ctx, &mut shared, &gbb, &fx.vblock).unwrap();

        assert_eq!(shared.fw_version, 0x0002_0003);
        assert_eq!(ctx.secdata_firmware.versions(), 0x0002_0002, "secdata must stay unchanged");
    }

    #[test]
    fn scenario_d_key_rollback_blocked_unless_gbb_override() {
        let fx = fixture(1, 2);
        let gbb = parse_gbb(&fx.gbb_bytes).unwrap();

        let mut storage = [0u8; 2048];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.nvdata.set_try_next(0);
        ctx.secdata_firmware = SecDataFirmware::create();
        ctx.secdata_firmware.set_versions(0x0002_0002);

        let mut shared = SharedData::new();
        fw_phase1(&mut ctx, &mut shared);
        fw_phase2(&mut ctx, &mut shared);
        let result = fw_phase3(&mut ctx, &mut shared, &gbb, &fx.vblock);
        assert_eq!(result.err(), Some(VbError::KeyblockVersionRollback));
    }

    #[test]
    fn api_fail_retries_other_slot_without_recovery_on_first_failure() {
        let mut storage = [0u8; 64];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);

        let mut shared = SharedData::new();
        shared.fw_slot = Some(FwSlot::A);
        shared.prior_boot = Some(PriorBoot {
            slot: FwSlot::B,
            result: FwResult::Success,
        });

        api_fail(&mut ctx, &shared, RecoveryReason::FwKeyblockSigInvalid, 1);

        assert_eq!(ctx.nvdata.fw_result(), FwResult::Failure);
        assert_eq!(ctx.nvdata.fw_slot(), 0);
        assert_eq!(ctx.nvdata.try_count(), 0);
        assert_eq!(ctx.nvdata.try_next(), 1);
        assert_eq!(ctx.nvdata.recovery_request(), 0, "other slot hasn't failed yet");
    }

    #[test]
    fn scenario_g_both_slots_failed_requests_recovery() {
        let mut storage = [0u8; 64];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);

        let mut shared = SharedData::new();
        shared.fw_slot = Some(FwSlot::B);
        shared.prior_boot = Some(PriorBoot {
            slot: FwSlot::A,
            result: FwResult::Failure,
        });

        api_fail(&mut ctx, &shared, RecoveryReason::FwPreambleSigInvalid, 7);

        assert_eq!(ctx.nvdata.try_count(), 0);
        assert_eq!(
            ctx.nvdata.recovery_request(),
            RecoveryReason::FwPreambleSigInvalid.as_u8()
        );
        assert_eq!(ctx.nvdata.recovery_subcode(), 7);
    }

    #[test]
    fn api_fail_with_no_slot_chosen_requests_recovery_immediately() {
        let mut storage = [0u8; 64];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);

        let shared = SharedData::new();
        api_fail(&mut ctx, &shared, RecoveryReason::GbbMagic, 0);

        assert_eq!(ctx.nvdata.recovery_request(), RecoveryReason::GbbMagic.as_u8());
    }

    #[test]
    fn recovery_arbitration_sets_mode_from_force_flag() {
        let mut storage = [0u8; 64];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.flags.set_force_recovery_mode(true);

        let mut shared = SharedData::new();
        fw_phase1(&mut ctx, &mut shared);

        assert!(ctx.flags.recovery_mode());
        assert_eq!(ctx.nvdata.recovery_request(), RecoveryReason::Manual.as_u8());
    }
}
