//! External interfaces (§6): the small set of traits a host environment
//! implements so this crate never touches hardware, a filesystem, or a
//! TPM wire protocol directly. Everything named OUT OF SCOPE in §1 —
//! disk enumeration, GPT parsing, LBA I/O, the TPM transport, raw crypto
//! primitives — lives behind one of these, exactly as "a library the
//! core calls" rather than something this crate implements.

use heapless::Vec as HVec;

use crate::error::VbResult;

/// Which of the four named resources a [`ReadResource::read_resource`]
/// call is asking for (§6: "the core asks its host for four named
/// resources through a single callback").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceIndex {
    Gbb,
    FwVblock,
    KernelVblock,
    /// The firmware/kernel body is streamed, not staged whole — callers
    /// issue repeated `read_resource(FwBody, offset, buf)` calls and feed
    /// each chunk through [`crate::crypto::DigestContext::extend`].
    FwBody,
}

/// The host's read-only view of boot media: GBB, vblocks, and the
/// streamed firmware/kernel body. One blocking call per chunk (§5: "every
/// I/O call ... blocks the caller").
pub trait ReadResource {
    /// Copy exactly `buf.len()` bytes from `index` at `offset` into `buf`,
    /// or fail with [`crate::error::VbError::ReadResourceSize`] /
    /// [`crate::error::VbError::ReadResourceIndex`] (§6).
    fn read_resource(&mut self, index: ResourceIndex, offset: u64, buf: &mut [u8]) -> VbResult<()>;
}

/// Persistent-store commit (§4.3, §6). One write per dirty store; the
/// host is responsible for the store's own tamper-evidence properties
/// (TPM-backed for secdata, CMOS-backed for nvdata) — this crate only
/// decides *whether* a write is needed.
pub trait CommitStore {
    fn write_nvdata(&mut self, raw: &[u8]) -> VbResult<()>;
    fn write_secdata_firmware(&mut self, raw: &[u8]) -> VbResult<()>;
    fn write_secdata_kernel(&mut self, raw: &[u8]) -> VbResult<()>;
    fn write_secdata_fwmp(&mut self, raw: &[u8]) -> VbResult<()>;
}

/// Which EC image a software-sync operation (§4.6) names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcImage {
    Ro,
    Rw,
}

/// A hash buffer sized for the largest digest this crate supports
/// (SHA-512, 64 bytes) without needing an allocation — EC hash exchange
/// is a small, fixed-size handshake, unlike the variable-length keys and
/// signatures the workbuf arena stages.
pub type EcHash = HVec<u8, 64>;

/// The embedded-controller interface (§6/§4.6): a peer microcontroller
/// with its own RO/RW firmware that must be verified and, if stale,
/// reflashed in lockstep with the AP firmware this boot.
pub trait EcHost {
    fn ec_running_rw(&mut self) -> VbResult<bool>;
    fn ec_jump_to_rw(&mut self) -> VbResult<()>;
    fn ec_disable_jump(&mut self) -> VbResult<()>;
    fn ec_hash_image(&mut self, select: EcImage) -> VbResult<EcHash>;
    fn ec_get_expected_image_hash(&mut self, select: EcImage) -> VbResult<EcHash>;
    fn ec_update_image(&mut self, select: EcImage) -> VbResult<()>;
    fn ec_protect(&mut self, select: EcImage) -> VbResult<()>;
    /// Must be called exactly once per boot (§4.6 step 6); callers use
    /// [`crate::ec_sync::sync_ec`]'s `ec_sync_complete` status bit to
    /// enforce that, not this trait.
    fn ec_vboot_done(&mut self) -> VbResult<()>;
    fn ec_trusted(&mut self) -> bool;
}

/// Disk image parameters (§3): external collaborator data this crate
/// threads through but never interprets — disk enumeration, GPT parsing
/// and LBA I/O are explicitly OUT OF SCOPE (§1).
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskImageParams {
    pub handle: u64,
    pub bytes_per_lba: u32,
    pub lba_count: u64,
    pub partition_number: u32,
    pub bootloader_address: u64,
    pub bootloader_size: u64,
    pub partition_guid: [u8; 16],
}

/// Raw disk I/O (§6), in units of `bytes_per_lba`. Out of scope beyond the
/// trait surface: no GPT parsing or partition enumeration happens here.
pub trait DiskIo {
    fn disk_read(&mut self, handle: u64, lba_start: u64, lba_count: u64, buf: &mut [u8]) -> VbResult<()>;
    fn disk_write(&mut self, handle: u64, lba_start: u64, lba_count: u64, buf: &[u8]) -> VbResult<()>;
}

/// Auxiliary (non-AP, non-EC) firmware sync — e.g. a PD controller's own
/// software-sync handshake. §4.7 names this as something the dispatcher
/// runs before path selection but does not spell out its protocol (it is
/// not part of "the hard part" in §1); this crate models it as a thin
/// hook with a no-op default so a host without auxiliary controllers
/// pays nothing, while one that has them can override it.
pub trait AuxFwSync {
    fn sync_aux_fw(&mut self) -> VbResult<()> {
        Ok(())
    }
}
