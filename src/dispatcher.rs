//! Dispatcher (§4.7): the top-level per-boot entry point. Selects exactly
//! one [`BootPath`], but only after three pre-checks that can each end
//! the boot before a path is ever chosen — a pending battery-cutoff
//! request, EC software-sync wanting a reboot to bring up a display, or
//! the host's own auxiliary-firmware sync failing. Whatever happens,
//! the store commit at the end always runs: a path that reboots,
//! shuts down, or fails still needs whatever it touched in nvdata/secdata
//! written back.

use crate::context::Context;
use crate::ec_sync::{sync_ec, EcSyncOutcome};
use crate::error::{VbError, VbResult};
use crate::host::{AuxFwSync, CommitStore, EcHost};
use crate::persist;

/// The one path a boot commits to (§4.7). Disk enumeration, kernel
/// selection and the rest of what each path actually *does* once chosen
/// are out of scope (§1) — the caller supplies that as `run_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPath {
    Normal,
    Developer,
    Recovery,
    Diagnostic,
}

/// Run one full boot (§4.7): pre-checks, path selection, the caller's
/// path body, then an unconditional commit.
///
/// `run_path` is only invoked if every pre-check succeeds. Its result and
/// the commit's result can both carry an error; the commit's error wins
/// when both are present, since losing persisted state (the thing a
/// commit failure means) outranks whatever the path body was unhappy
/// about — by the time we're committing, the path has already run to
/// completion or failure and there is nothing left to retry there.
pub fn dispatch<H, E, A>(
    ctx: &mut Context<'_>,
    host: &mut H,
    ec: &mut E,
    aux: &mut A,
    gbb_disable_ec_sync: bool,
    mut run_path: impl FnMut(BootPath, &mut Context<'_>) -> VbResult<()>,
) -> VbResult<BootPath>
where
    H: CommitStore,
    E: EcHost,
    A: AuxFwSync,
{
    let pre_check = pre_checks(ctx, ec, aux, gbb_disable_ec_sync);
    let path = select_boot_path(ctx);

    let path_result = match pre_check {
        Ok(()) => run_path(path, ctx),
        Err(e) => Err(e),
    };

    match persist::commit(ctx, host) {
        Err(commit_err) => Err(commit_err),
        Ok(()) => path_result.map(|()| path),
    }
}

fn pre_checks<E: EcHost, A: AuxFwSync>(
    ctx: &mut Context<'_>,
    ec: &mut E,
    aux: &mut A,
    gbb_disable_ec_sync: bool,
) -> VbResult<()> {
    if ctx.nvdata.battery_cutoff_request() {
        ctx.nvdata.clear_battery_cutoff_request();
        return Err(VbError::Shutdown);
    }

    match sync_ec(ctx, ec, gbb_disable_ec_sync)? {
        EcSyncOutcome::RebootRequired => return Err(VbError::RebootRequired),
        EcSyncOutcome::RebootToRoRequired => return Err(VbError::EcRebootToRoRequired),
        EcSyncOutcome::Done => {}
    }

    aux.sync_aux_fw()
}

fn select_boot_path(ctx: &Context<'_>) -> BootPath {
    if ctx.flags.recovery_mode() {
        BootPath::Recovery
    } else if ctx.nvdata.diag_request() {
        BootPath::Diagnostic
    } else if ctx.flags.developer_mode() {
        BootPath::Developer
    } else {
        BootPath::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EcHash, EcImage};
    use crate::nvdata::NvData;
    use heapless::Vec as HVec;

    #[derive(Default)]
    struct RecordingHost {
        nvdata_writes: u32,
    }

    impl CommitStore for RecordingHost {
        fn write_nvdata(&mut self, _raw: &[u8]) -> VbResult<()> {
            self.nvdata_writes += 1;
            Ok(())
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

    struct MatchedEc;
    impl EcHost for MatchedEc {
        fn ec_running_rw(&mut self) -> VbResult<bool> {
            Ok(true)
        }
        fn ec_jump_to_rw(&mut self) -> VbResult<()> {
            Ok(())
        }
        fn ec_disable_jump(&mut self) -> VbResult<()> {
            Ok(())
        }
        fn ec_hash_image(&mut self, _select: EcImage) -> VbResult<EcHash> {
            let mut h = HVec::new();
            h.extend_from_slice(&[1, 2, 3]).unwrap();
            Ok(h)
        }
        fn ec_get_expected_image_hash(&mut self, _select: EcImage) -> VbResult<EcHash> {
            let mut h = HVec::new();
            h.extend_from_slice(&[1, 2, 3]).unwrap();
            Ok(h)
        }
        fn ec_update_image(&mut self, _select: EcImage) -> VbResult<()> {
            Ok(())
        }
        fn ec_protect(&mut self, _select: EcImage) -> VbResult<()> {
            Ok(())
        }
        fn ec_vboot_done(&mut self) -> VbResult<()> {
            Ok(())
        }
        fn ec_trusted(&mut self) -> bool {
            true
        }
    }

    struct NoAux;
    impl AuxFwSync for NoAux {}

    fn ready_ctx(storage: &mut [u8]) -> Context<'_> {
        let mut ctx = Context::new(storage);
        ctx.nvdata = NvData::reset_to_default(true);
        ctx
    }

    #[test]
    fn normal_mode_runs_normal_path_and_commits() {
        let mut storage = [0u8; 64];
        let mut ctx = ready_ctx(&mut storage);
        let mut host = RecordingHost::default();
        let mut ec = MatchedEc;
        let mut aux = NoAux;

        let mut ran_with = None;
        let path = dispatch(&mut ctx, &mut host, &mut ec, &mut aux, false, |p, _ctx| {
            ran_with = Some(p);
            Ok(())
        })
        .unwrap();

        assert_eq!(path, BootPath::Normal);
        assert_eq!(ran_with, Some(BootPath::Normal));
        assert_eq!(host.nvdata_writes, 1);
    }

    #[test]
    fn recovery_mode_selects_recovery_path() {
        let mut storage = [0u8; 64];
        let mut ctx = ready_ctx(&mut storage);
        ctx.flags.set_recovery_mode(true);
        let mut host = RecordingHost::default();
        let mut ec = MatchedEc;
        let mut aux = NoAux;

        let path = dispatch(&mut ctx, &mut host, &mut ec, &mut aux, false, |_, _| Ok(())).unwrap();
        assert_eq!(path, BootPath::Recovery);
    }

    #[test]
    fn diag_request_beats_developer_mode() {
        let mut storage = [0u8; 64];
        let mut ctx = ready_ctx(&mut storage);
        ctx.flags.set_developer_mode(true);
        ctx.nvdata.set_diag_request(true);
        let mut host = RecordingHost::default();
        let mut ec = MatchedEc;
        let mut aux = NoAux;

        let path = dispatch(&mut ctx, &mut host, &mut ec, &mut aux, false, |_, _| Ok(())).unwrap();
        assert_eq!(path, BootPath::Diagnostic);
    }

    #[test]
    fn battery_cutoff_shuts_down_without_running_a_path_but_still_commits() {
        let mut storage = [0u8; 64];
        let mut ctx = ready_ctx(&mut storage);
        ctx.nvdata.set_battery_cutoff_request(true);
        let mut host = RecordingHost::default();
        let mut ec = MatchedEc;
        let mut aux = NoAux;

        let mut path_ran = false;
        let result = dispatch(&mut ctx, &mut host, &mut ec, &mut aux, false, |_, _| {
            path_ran = true;
            Ok(())
        });

        assert_eq!(result, Err(VbError::Shutdown));
        assert!(!path_ran);
        assert_eq!(host.nvdata_writes, 1, "the battery-cutoff ack itself must still be committed");
    }

    #[test]
    fn commit_failure_outranks_a_failing_path() {
        struct FailingCommitHost;
        impl CommitStore for FailingCommitHost {
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

        let mut storage = [0u8; 64];
        let mut ctx = ready_ctx(&mut storage);
        ctx.nvdata.mark_dirty();
        let mut host = FailingCommitHost;
        let mut ec = MatchedEc;
        let mut aux = NoAux;

        let result = dispatch(&mut ctx, &mut host, &mut ec, &mut aux, false, |_, _| {
            Err(VbError::KernelDataSigInvalid)
        });
        assert_eq!(result, Err(VbError::NvdataWrite));
    }

    #[test]
    fn path_failure_propagates_when_commit_succeeds() {
        let mut storage = [0u8; 64];
        let mut ctx = ready_ctx(&mut storage);
        let mut host = RecordingHost::default();
        let mut ec = MatchedEc;
        let mut aux = NoAux;

        let result = dispatch(&mut ctx, &mut host, &mut ec, &mut aux, false, |_, _| {
            Err(VbError::KernelDataSigInvalid)
        });
        assert_eq!(result, Err(VbError::KernelDataSigInvalid));
    }
}
