//! Verified-boot core: a single-threaded, `no_std` library that drives a
//! device's chain of trust from "I have a pre-allocated scratch buffer"
//! through firmware verification, kernel verification, EC software-sync,
//! and a final persistent-store commit.
//!
//! This crate never touches hardware, a disk, or a TPM wire protocol
//! directly — every such concern lives behind a trait in [`host`], and
//! every byte this crate needs beyond its own stack lives in one
//! caller-owned scratch buffer threaded through [`Context`]. No heap
//! allocation happens for this crate's own bookkeeping; `alloc` is
//! pulled in only because the `rsa` crate's modular exponentiation needs
//! `BigUint`, which is itself heap-backed.
//!
//! ```text
//! fw_phase1 → fw_phase2 → fw_phase3 → (host hashes body) → FwBodyExpectation::verify
//!                                                                 |
//!                                            RW firmware re-enters here
//!                                                                 ↓
//! kernel_phase1 → load_kernel_vblock → (host loads body) → verify_kernel_data → kernel_phase3
//! ```
//!
//! [`dispatcher::dispatch`] is the top-level entry point a host calls
//! once per boot; it runs EC sync, auxiliary firmware sync and the
//! battery-cutoff check, picks one [`dispatcher::BootPath`], and always
//! commits whatever got marked dirty along the way.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod context;
pub mod crypto;
pub mod debug;
pub mod dispatcher;
pub mod ec_sync;
pub mod error;
pub mod firmware;
pub mod gbb;
pub mod host;
pub mod kernel;
pub mod keyblock;
pub mod nvdata;
pub mod packed_key;
pub mod persist;
pub mod preamble;
pub mod recovery;
pub mod secdata;
pub mod shared_data;
pub mod workbuf;

pub use context::{Context, ContextFlags};
pub use dispatcher::{dispatch, BootPath};
pub use error::{VbError, VbResult};
pub use recovery::RecoveryReason;
pub use shared_data::SharedData;
