//! Radix page-table geometry.
//!
//! A page table with `levels` levels and `pte_page_size`-byte table pages resolves
//! `log2(pte_page_size)` bits of the virtual address per level, on top of the base page
//! offset. Levels are numbered from 1 (the leaf-adjacent table) upward.

use crate::VirtualAddress;
use crate::address::LOG2_PAGE_SIZE;
use crate::bits;

const PAGE_OFFSET_BITS: u64 = LOG2_PAGE_SIZE as u64;

/// Address slicing for a radix page table of configurable depth and fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableGeometry {
    levels: usize,
    index_bits: u64,
}

impl PageTableGeometry {
    /// Creates the geometry for `levels` levels of `pte_page_size`-byte table pages.
    ///
    /// `pte_page_size` is expected to be a power of two; it is validated by the
    /// configuration before an engine is built.
    pub const fn new(pte_page_size: u64, levels: usize) -> Self {
        Self {
            levels,
            index_bits: bits::lg2(pte_page_size),
        }
    }

    /// Returns the number of walk levels.
    #[inline]
    pub const fn levels(&self) -> usize {
        self.levels
    }

    /// Returns the width in bits of one level's index field.
    #[inline]
    pub const fn index_bits(&self) -> u64 {
        self.index_bits
    }

    /// Returns the number of low-order address bits consumed by the page offset and every
    /// level strictly below `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is 0.
    #[inline]
    pub const fn shift_amount(&self, level: usize) -> u64 {
        assert!(level >= 1, "walk levels are numbered from 1");
        PAGE_OFFSET_BITS.saturating_add(self.index_bits.saturating_mul(level as u64 - 1))
    }

    /// Returns the index a hardware walker would use to select an entry at `level`.
    #[inline]
    pub const fn field_at(&self, vaddr: VirtualAddress, level: usize) -> u64 {
        vaddr.slice(self.shift_amount(level), self.index_bits)
    }

    /// Returns `vaddr` with every bit below this level's granularity cleared.
    ///
    /// All addresses that share a `level` entry map to the same value.
    #[inline]
    pub const fn level_base(&self, vaddr: VirtualAddress, level: usize) -> VirtualAddress {
        vaddr.slice_upper(self.shift_amount(level))
    }

    /// Returns the number of address bits a full walk resolves, including the page offset.
    ///
    /// The value may exceed 64 for deep or wide configurations, and saturates at `u64::MAX`.
    #[inline]
    pub const fn required_bits(&self) -> u64 {
        PAGE_OFFSET_BITS.saturating_add(self.index_bits.saturating_mul(self.levels as u64))
    }
}
