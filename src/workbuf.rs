//! The workbuf arena: a single aligned scratch region into which all keys,
//! hashes and parsed headers are placed in a strict stacked order.
//!
//! Per the design note in §9, the on-disk structures elsewhere
//! in this crate use self-relative offsets, but the arena itself is
//! addressed purely by `usize` byte offsets into [`Context`]'s buffer —
//! indices, not pointers — so that a region can be overwritten in place
//! (a verified root key reused to hold the data key it just certified)
//! without ever materializing two overlapping `&mut` views.

use crate::context::Context;
use crate::error::{VbError, VbResult};

/// Every allocation is rounded up to this boundary.
pub const WB_ALIGN: usize = 8;

const fn align_up(n: usize) -> usize {
    (n + WB_ALIGN - 1) & !(WB_ALIGN - 1)
}

/// A single phase's view into the arena.
///
/// Constructed fresh at the start of every verification phase via
/// [`Workbuf::from_ctx`]; `high_water` starts at the previous permanent
/// boundary (`ctx.workbuf_used`) and only grows within this phase. Dropping
/// a `Workbuf` without calling [`Workbuf::set_used`] discards every
/// allocation made during the phase (the permanent boundary in `ctx` is
/// simply left unchanged).
pub struct Workbuf {
    len: usize,
    high_water: usize,
}

impl Workbuf {
    /// Open a new transient view onto `ctx`'s arena, starting above the
    /// current permanent region.
    pub fn from_ctx(ctx: &Context<'_>) -> Self {
        Workbuf {
            len: ctx.workbuf_len(),
            high_water: ctx.workbuf_used(),
        }
    }

    /// Allocate `n` bytes, aligned, at the current high-water mark.
    /// Returns the byte offset of the new region. Fails without touching
    /// any prior allocation if the arena would overflow.
    pub fn alloc(&mut self, n: usize) -> VbResult<usize> {
        let aligned = align_up(n);
        let offset = self.high_water;
        let new_high_water = offset
            .checked_add(aligned)
            .ok_or(VbError::WorkbufOutOfMemory)?;
        if new_high_water > self.len {
            return Err(VbError::WorkbufOutOfMemory);
        }
        self.high_water = new_high_water;
        Ok(offset)
    }

    /// Grow or shrink the most recent allocation in place. `old_offset`
    /// must be the offset returned by the immediately preceding `alloc`
    /// (or `realloc`) call, and `old_size` the size passed to it — this
    /// is not re-derived, matching the arena's stacked discipline: only
    /// the top of the stack may be resized.
    pub fn realloc(&mut self, old_offset: usize, old_size: usize, new_size: usize) -> VbResult<usize> {
        let old_aligned = align_up(old_size);
        if old_offset.checked_add(old_aligned) != Some(self.high_water) {
            return Err(VbError::WorkbufAlignment);
        }
        let new_aligned = align_up(new_size);
        let new_high_water = old_offset
            .checked_add(new_aligned)
            .ok_or(VbError::WorkbufOutOfMemory)?;
        if new_high_water > self.len {
            return Err(VbError::WorkbufOutOfMemory);
        }
        self.high_water = new_high_water;
        Ok(old_offset)
    }

    /// Current high-water mark reached during this phase so far.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Pin every allocation made during this phase (up to `n`) as
    /// permanent, and reset the free pointer to `n`. `n` must lie between
    /// the permanent boundary this `Workbuf` was opened with and the
    /// high-water mark reached since — shrinking below the prior
    /// permanent boundary would orphan a region shared data may still
    /// point into, which is exactly the invariant this refuses to allow.
    pub fn set_used(self, ctx: &mut Context<'_>, n: usize) -> VbResult<()> {
        if n < ctx.workbuf_used() || n > self.high_water {
            return Err(VbError::WorkbufOrphanedRegion);
        }
        ctx.set_workbuf_used_raw(n);
        Ok(())
    }

    /// Borrow `len` bytes at `offset` from the backing buffer, immutably.
    pub fn slice<'b>(&self, ctx: &'b Context<'_>, offset: usize, len: usize) -> VbResult<&'b [u8]> {
        let end = offset.checked_add(len).ok_or(VbError::WorkbufOutOfMemory)?;
        if end > self.high_water {
            return Err(VbError::WorkbufOutOfMemory);
        }
        ctx.workbuf_ref(offset, len)
    }

    /// Borrow `len` bytes at `offset` from the backing buffer, mutably.
    pub fn slice_mut<'b>(
        &self,
        ctx: &'b mut Context<'_>,
        offset: usize,
        len: usize,
    ) -> VbResult<&'b mut [u8]> {
        let end = offset.checked_add(len).ok_or(VbError::WorkbufOutOfMemory)?;
        if end > self.high_water {
            return Err(VbError::WorkbufOutOfMemory);
        }
        ctx.workbuf_mut(offset, len)
    }
}
