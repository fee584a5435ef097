//! Monotonic physical frame allocator.
//!
//! Frames are handed out in increasing order from a fixed window and are never reclaimed.
//! The next candidate can be inspected before it is consumed so that callers only advance
//! the allocator on a genuine miss.

use crate::FrameNumber;

/// A bump allocator over the frame window `[next, last)`.
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    next: FrameNumber,
    last: FrameNumber,
}

impl FrameAllocator {
    /// Creates an allocator that hands out frames from `first` up to, but excluding, `last`.
    ///
    /// # Panics
    ///
    /// Panics if `last` does not lie above `first`.
    pub fn new(first: FrameNumber, last: FrameNumber) -> Self {
        assert!(last > first, "frame window must not be empty");
        Self { next: first, last }
    }

    /// Returns the frame the next allocation will produce without consuming it.
    ///
    /// # Panics
    ///
    /// Panics if no frames remain.
    pub fn peek_next_free_page(&self) -> FrameNumber {
        assert!(self.available_pages() > 0, "physical memory exhausted");
        self.next
    }

    /// Consumes the frame last returned by [`peek_next_free_page`](Self::peek_next_free_page).
    pub fn consume_next_free_page(&mut self) {
        debug_assert!(self.next < self.last, "consumed past the end of physical memory");
        self.next = self.next + 1;
    }

    /// Allocates the next free frame.
    ///
    /// # Panics
    ///
    /// Panics if no frames remain.
    pub fn allocate(&mut self) -> FrameNumber {
        let frame = self.peek_next_free_page();
        self.consume_next_free_page();
        frame
    }

    /// Returns the number of frames that can still be allocated.
    pub fn available_pages(&self) -> u64 {
        debug_assert!(self.next <= self.last);
        self.last - self.next
    }
}
