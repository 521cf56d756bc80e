//! EC software-sync protocol (§4.6): the embedded controller carries its
//! own RO/RW firmware split, shipped separately from the AP's, that must
//! match the hashes this AP firmware expects before boot continues.
//!
//! ```text
//! sync_ec
//!   1. ask which image the EC is running
//!   2. RW: compare hash, reflash if stale, re-check
//!   3. RO: same, but only when TRY_RO_SYNC asks for it
//!   4. jump EC to RW
//!   5. protect RO then RW
//!   6. ec_vboot_done (exactly once per boot)
//!   7. mark EC_SYNC_COMPLETE
//! ```
//!
//! Entered at most once per boot: [`crate::context::ContextFlags::ec_sync_complete`]
//! makes every call after the first a no-op, mirroring §4.6 step 7 ("status
//! flag ... subsequent calls short-circuit") without needing a separate
//! status type threaded alongside `SharedData`.

use crate::context::Context;
use crate::error::VbResult;
use crate::host::{EcHost, EcImage};
use crate::recovery::RecoveryReason;

/// What the caller should do once [`sync_ec`] returns successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcSyncOutcome {
    /// Sync completed (or was not applicable); boot may continue.
    Done,
    /// A reflash is needed but the display isn't up yet — bring up a WAIT
    /// screen, then call [`sync_ec`] again (§4.6 slow-update policy).
    RebootRequired,
    /// The EC cannot be trusted this boot — a hard reboot into RO is
    /// required before anything else runs (§4.6 step 2). Unlike
    /// `RebootRequired`, calling `sync_ec` again without that reboot
    /// cannot fix anything.
    RebootToRoRequired,
}

/// Entry point (§4.6). Returns `Ok(Done)` immediately, without touching
/// the EC at all, when sync is unsupported, this is a recovery boot, or
/// the GBB disables it — those are the three gates named in the
/// protocol's opening line.
pub fn sync_ec<E: EcHost>(ctx: &mut Context<'_>, ec: &mut E, gbb_disable_ec_sync: bool) -> VbResult<EcSyncOutcome> {
    if ctx.flags.ec_sync_complete() {
        return Ok(EcSyncOutcome::Done);
    }
    if !ctx.flags.ec_sync_supported() || ctx.flags.recovery_mode() || gbb_disable_ec_sync {
        return Ok(EcSyncOutcome::Done);
    }

    let in_rw = match ec.ec_running_rw() {
        Ok(v) => v,
        Err(e) => {
            ctx.nvdata
                .request_recovery(RecoveryReason::EcUnknownImage.as_u8(), e.as_subcode());
            return Err(e);
        }
    };

    match sync_one_image(ctx, ec, EcImage::Rw, in_rw)? {
        Some(outcome) => return Ok(outcome),
        None => {}
    }

    if ctx.nvdata.try_ro_sync() {
        if let Some(outcome) = sync_one_image(ctx, ec, EcImage::Ro, in_rw)? {
            return Ok(outcome);
        }
    }

    if !in_rw {
        if let Err(e) = ec.ec_jump_to_rw() {
            ctx.nvdata
                .request_recovery(RecoveryReason::EcJumpRw.as_u8(), e.as_subcode());
            return Err(e);
        }
    } else {
        ec.ec_disable_jump()?;
    }

    if let Err(e) = ec.ec_protect(EcImage::Ro) {
        ctx.nvdata
            .request_recovery(RecoveryReason::EcProtect.as_u8(), e.as_subcode());
        return Err(e);
    }
    if let Err(e) = ec.ec_protect(EcImage::Rw) {
        ctx.nvdata
            .request_recovery(RecoveryReason::EcProtect.as_u8(), e.as_subcode());
        return Err(e);
    }

    ec.ec_vboot_done()?;
    ctx.flags.set_ec_sync_complete(true);
    Ok(EcSyncOutcome::Done)
}

/// Compare-and-reflash for one image (RO or RW). Returns `Some(outcome)`
/// when the caller should return early (a reboot is required, or a
/// terminal error already recorded the recovery reason), `None` to keep
/// going.
fn sync_one_image<E: EcHost>(
    ctx: &mut Context<'_>,
    ec: &mut E,
    select: EcImage,
    in_rw: bool,
) -> VbResult<Option<EcSyncOutcome>> {
    let current = match ec.ec_hash_image(select) {
        Ok(h) => h,
        Err(e) => {
            ctx.nvdata
                .request_recovery(RecoveryReason::EcHashFailed.as_u8(), e.as_subcode());
            return Err(e);
        }
    };
    let expected = match ec.ec_get_expected_image_hash(select) {
        Ok(h) => h,
        Err(e) => {
            ctx.nvdata
                .request_recovery(RecoveryReason::EcExpectedHash.as_u8(), e.as_subcode());
            return Err(e);
        }
    };
    if current.len() != expected.len() {
        ctx.nvdata.request_recovery(RecoveryReason::EcHashSize.as_u8(), 0);
        return Ok(Some(EcSyncOutcome::RebootToRoRequired));
    }
    if current == expected {
        return Ok(None);
    }

    // RW can't be reflashed while it's the image currently executing;
    // the host must reboot to RO first (§4.6 step 2).
    if select == EcImage::Rw && in_rw {
        return Ok(Some(EcSyncOutcome::RebootToRoRequired));
    }

    if !ctx.flags.display_available() {
        return Ok(Some(EcSyncOutcome::RebootRequired));
    }

    if let Err(e) = ec.ec_update_image(select) {
        ctx.nvdata.request_recovery(RecoveryReason::EcUpdate.as_u8(), e.as_subcode());
        return Err(e);
    }
    let reflashed = match ec.ec_hash_image(select) {
        Ok(h) => h,
        Err(e) => {
            ctx.nvdata
                .request_recovery(RecoveryReason::EcHashFailed.as_u8(), e.as_subcode());
            return Err(e);
        }
    };
    if reflashed != expected {
        ctx.nvdata.request_recovery(RecoveryReason::EcUpdate.as_u8(), 0);
        return Ok(Some(EcSyncOutcome::RebootToRoRequired));
    }
    Ok(None)
}
