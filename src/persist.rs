//! Persistent store manager commit logic (§4.3, §7, §8 invariant 5): "one
//! write per dirty store ... never write a clean one." This module is
//! only the *commit* half — `init`/`get`/`set` are spread across
//! [`crate::nvdata`] and [`crate::secdata`] themselves, each already
//! marking itself dirty on write, per the design note in §9 that a
//! store's own dirty bit should live with the store, not be re-derived
//! by a caller.
//!
//! Write-failure policy (§7): nvdata write failure is unrecoverable —
//! there is nowhere left to record a recovery request if the very store
//! that holds it can't be written, so it propagates straight up. A
//! secdata write failure outside recovery mode instead flags recovery
//! mode and retries the commit exactly once (the retry gives the
//! newly-set recovery request its own chance to reach nvdata); a
//! secdata write failure that happens *while already in recovery mode*
//! has nothing further to fall back to and also propagates.

use crate::context::Context;
use crate::error::{VbError, VbResult};
use crate::host::CommitStore;
use crate::nvdata::NvData;
use crate::recovery::RecoveryReason;
use crate::secdata::{SECDATA_FIRMWARE_SIZE, SECDATA_FWMP_SIZE, SECDATA_KERNEL_SIZE};

/// Write every dirty store exactly once, recursing at most once to retry
/// a secdata failure that flips the boot into recovery mode outside of
/// it already being there.
pub fn commit<C: CommitStore>(ctx: &mut Context<'_>, host: &mut C) -> VbResult<()> {
    commit_once(ctx, host, ctx.flags.recovery_mode())
}

fn commit_once<C: CommitStore>(ctx: &mut Context<'_>, host: &mut C, already_in_recovery: bool) -> VbResult<()> {
    if ctx.nvdata.is_dirty() {
        let size = NvData::wire_size(ctx.flags.nvdata_v2());
        let mut raw = [0u8; crate::nvdata::NVDATA_V2_SIZE];
        ctx.nvdata.serialize(&mut raw[..size])?;
        if host.write_nvdata(&raw[..size]).is_err() {
            return Err(VbError::NvdataWrite);
        }
        ctx.nvdata.clear_dirty();
    }

    let mut secdata_failed = false;

    if ctx.secdata_firmware.is_dirty() {
        let mut raw = [0u8; SECDATA_FIRMWARE_SIZE];
        ctx.secdata_firmware.serialize(&mut raw);
        if host.write_secdata_firmware(&raw).is_err() {
            secdata_failed = true;
        } else {
            ctx.secdata_firmware.clear_dirty();
        }
    }

    if ctx.secdata_kernel.is_dirty() {
        let mut raw = [0u8; SECDATA_KERNEL_SIZE];
        ctx.secdata_kernel.serialize(&mut raw);
        if host.write_secdata_kernel(&raw).is_err() {
            secdata_failed = true;
        } else {
            ctx.secdata_kernel.clear_dirty();
        }
    }

    if let Some(fwmp) = ctx.secdata_fwmp.as_mut() {
        if fwmp.is_dirty() {
            let mut raw = [0u8; SECDATA_FWMP_SIZE];
            fwmp.serialize(&mut raw);
            if host.write_secdata_fwmp(&raw).is_err() {
                secdata_failed = true;
            } else {
                fwmp.clear_dirty();
            }
        }
    }

    if !secdata_failed {
        return Ok(());
    }

    if already_in_recovery {
        return Err(VbError::SecdataFirmwareWrite);
    }

    // Outside recovery, a secdata write failure is itself cause for
    // recovery (§7): flip the flag, re-request recovery in nvdata (the
    // request is write-once, so an existing more specific reason wins),
    // and retry the commit exactly once so the updated nvdata actually
    // reaches the host.
    ctx.flags.set_recovery_mode(true);
    ctx.nvdata
        .request_recovery(RecoveryReason::RwTpmWriteError.as_u8(), VbError::SecdataFirmwareWrite.as_subcode());
    commit_once(ctx, host, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secdata::{SecDataFirmware, SecDataFwmp, SecDataKernel};

    #[derive(Default)]
    struct RecordingHost {
        nvdata_writes: u32,
        secdata_firmware_writes: u32,
        secdata_kernel_writes: u32,
        secdata_fwmp_writes: u32,
        fail_secdata_firmware: bool,
    }

    impl CommitStore for RecordingHost {
        fn write_nvdata(&mut self, _raw: &[u8]) -> VbResult<()> {
            self.nvdata_writes += 1;
            Ok(())
        }
        fn write_secdata_firmware(&mut self, _raw: &[u8]) -> VbResult<()> {
            self.secdata_firmware_writes += 1;
            if self.fail_secdata_firmware {
                Err(VbError::SecdataFirmwareWrite)
            } else {
                Ok(())
            }
        }
        fn write_secdata_kernel(&mut self, _raw: &[u8]) -> VbResult<()> {
            self.secdata_kernel_writes += 1;
            Ok(())
        }
        fn write_secdata_fwmp(&mut self, _raw: &[u8]) -> VbResult<()> {
            self.secdata_fwmp_writes += 1;
            Ok(())
        }
    }

    #[test]
    fn clean_stores_are_never_written() {
        let mut storage = [0u8; 16];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.nvdata.clear_dirty();

        let mut host = RecordingHost::default();
        commit(&mut ctx, &mut host).unwrap();
        assert_eq!(host.nvdata_writes, 0);
        assert_eq!(host.secdata_firmware_writes, 0);
    }

    #[test]
    fn dirty_stores_are_written_exactly_once() {
        let mut storage = [0u8; 16];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.secdata_firmware = SecDataFirmware::create();
        ctx.secdata_kernel = SecDataKernel::create();
        ctx.secdata_fwmp = Some(SecDataFwmp::default());

        let mut host = RecordingHost::default();
        commit(&mut ctx, &mut host).unwrap();
        assert_eq!(host.nvdata_writes, 1);
        assert_eq!(host.secdata_firmware_writes, 1);
        assert_eq!(host.secdata_kernel_writes, 1);
        assert_eq!(host.secdata_fwmp_writes, 0, "fwmp was never marked dirty");

        assert!(!ctx.nvdata.is_dirty());
        assert!(!ctx.secdata_firmware.is_dirty());
        assert!(!ctx.secdata_kernel.is_dirty());
    }

    #[test]
    fn secdata_failure_outside_recovery_retries_once_and_succeeds() {
        let mut storage = [0u8; 16];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.secdata_firmware = SecDataFirmware::create();

        let mut host = RecordingHost {
            fail_secdata_firmware: true,
            ..Default::default()
        };
        let result = commit(&mut ctx, &mut host);
        assert!(result.is_err());
        assert!(ctx.flags.recovery_mode());
        assert_eq!(ctx.nvdata.recovery_request(), RecoveryReason::RwTpmWriteError.as_u8());
        // nvdata is written on the initial pass, then again on retry
        // (the recovery request flips it dirty a second time).
        assert_eq!(host.nvdata_writes, 2);
        assert_eq!(host.secdata_firmware_writes, 2);
    }

    #[test]
    fn secdata_failure_already_in_recovery_propagates_without_retry() {
        let mut storage = [0u8; 16];
        let mut ctx = Context::new(&mut storage);
        ctx.flags.set_recovery_mode(true);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx.secdata_firmware = SecDataFirmware::create();

        let mut host = RecordingHost {
            fail_secdata_firmware: true,
            ..Default::default()
        };
        let result = commit(&mut ctx, &mut host);
        assert_eq!(result, Err(VbError::SecdataFirmwareWrite));
        assert_eq!(host.secdata_firmware_writes, 1, "no retry once already in recovery");
    }

    #[test]
    fn nvdata_write_failure_is_fatal_and_unretried() {
        struct FailingNvdataHost;
        impl CommitStore for FailingNvdataHost {
            fn write_nvdata(&mut self, _raw: &[u8]) -> VbResult<()> {
                Err(VbError::NvdataWrite)
            }
            fn write_secdata_firmware(&mut self, _raw: &[u8]) -> VbResult<()> {
                Ok(())
            }
            fn write_secdata_kernel(&mut self, _raw: &[u8]) -> VbResult<()> {
                Ok(())
            }
            fn write_secdata_fwmp(&mut self, _raw: &[u8]) -> VbResult<()> {
                Ok(())
            }
        }

        let mut storage = [0u8; 16];
        let mut ctx = Context::new(&mut storage);
        ctx.nvdata = NvData::reset_to_default(true);

        let mut host = FailingNvdataHost;
        let result = commit(&mut ctx, &mut host);
        assert_eq!(result, Err(VbError::NvdataWrite));
    }
}
