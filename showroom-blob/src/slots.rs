//! Slot allocation.
//!
//! The lowest free slot wins, so an owner that keeps deleting and re-adding
//! images cycles through the same low slot numbers.
//!
//! Allocation reads the occupied set and the caller writes afterwards. Two
//! concurrent auto-allocated ingestions for one owner can therefore pick the
//! same slot; the `(owner, slot)` upsert key resolves that as last write wins.

use crate::{ImageError, ImageResult, Slot};

/// Outcome of looking for a free slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAllocation {
    Free(Slot),
    Exhausted,
}

/// First integer in `0..max_slots` not present in `occupied`
pub fn next_free_slot(occupied: &[Slot], max_slots: u32) -> SlotAllocation {
    (0..max_slots)
        .map(Slot)
        .find(|slot| !occupied.contains(slot))
        .map_or(SlotAllocation::Exhausted, SlotAllocation::Free)
}

/// Resolve the slot an ingestion writes to.
///
/// An explicit request bypasses allocation but must be in range; without one
/// the next free slot is taken, and exhaustion becomes `CapacityExceeded`.
pub fn resolve_slot(explicit: Option<i64>, occupied: &[Slot], max_slots: u32) -> ImageResult<Slot> {
    if let Some(value) = explicit {
        return Slot::checked(value, max_slots);
    }
    match next_free_slot(occupied, max_slots) {
        SlotAllocation::Free(slot) => Ok(slot),
        SlotAllocation::Exhausted => Err(ImageError::CapacityExceeded { max_slots }),
    }
}
