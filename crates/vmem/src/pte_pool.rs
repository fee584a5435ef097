//! Shared backing store for page-table entry records.
//!
//! Entries for every level and address space are packed into 8-byte slots of a single
//! active frame. When the slots of that frame run out the cursor wraps to zero, and the
//! next request draws a fresh frame from the frame allocator.

use crate::address::PAGE_SIZE;
use crate::{FrameAllocator, FrameNumber, PhysicalAddress};

/// Size in bytes of one page-table entry.
pub const PTE_BYTES: u64 = 8;

/// Cursor over the frame currently receiving new page-table entry records.
#[derive(Debug, Clone, Default)]
pub struct PteBackingStore {
    active: Option<FrameNumber>,
    cursor: u64,
}

impl PteBackingStore {
    /// Creates a backing store with no active frame.
    pub const fn new() -> Self {
        Self {
            active: None,
            cursor: 0,
        }
    }

    /// Returns true if the next request will draw a new frame.
    pub const fn needs_frame(&self) -> bool {
        self.cursor == 0
    }

    /// Draws a new active frame if the cursor sits at the start of a frame.
    ///
    /// Returns the newly drawn frame, if any.
    pub fn refill(&mut self, frames: &mut FrameAllocator) -> Option<FrameNumber> {
        if !self.needs_frame() {
            return None;
        }

        let frame = frames.allocate();
        self.active = Some(frame);
        Some(frame)
    }

    /// Returns the address of the slot the next record will occupy.
    ///
    /// # Panics
    ///
    /// Panics if no frame has been drawn yet.
    pub fn current_slot(&self) -> PhysicalAddress {
        let frame = self
            .active
            .expect("backing store has no active frame; call refill first");
        frame.with_offset(self.cursor)
    }

    /// Moves the cursor past the slot returned by [`current_slot`](Self::current_slot).
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + PTE_BYTES) % PAGE_SIZE;
    }

    /// Returns the byte offset of the next free slot within the active frame.
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }
}
