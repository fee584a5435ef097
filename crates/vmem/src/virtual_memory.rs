//! The virtual memory engine.
//!
//! [`VirtualMemory`] owns every piece of mutable translation state: the leaf translation
//! table, the page-table entry location table, the frame allocator and the backing store
//! for page-table entries. Both public operations create mappings on first touch and report
//! the creation through the returned penalty rather than an error.

use alloc::collections::BTreeMap;
use alloc::collections::btree_map::Entry;

use crate::address::{LOG2_PAGE_SIZE, PAGE_SIZE};
use crate::bits::{self, ADDRESS_BITS};
use crate::{
    AddressSpaceId, ConfigError, FrameAllocator, FrameNumber, HumanSize, PTE_BYTES, PageNumber,
    PageTableGeometry, PhysicalAddress, PhysicalMemory, PteBackingStore, VirtualAddress,
    VmemConfig,
};

/// Bytes kept free at the bottom of physical memory: 1 MiB or one page, whichever is larger.
const RESERVED_BYTES: u64 = if PAGE_SIZE > (1 << 20) {
    PAGE_SIZE
} else {
    1 << 20
};

/// First frame handed out by the allocator.
const FIRST_FRAME: FrameNumber = FrameNumber::new(RESERVED_BYTES >> LOG2_PAGE_SIZE);

/// Result of a translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// The resolved physical address.
    pub address: PhysicalAddress,
    /// Latency charged for the request; non-zero only when a mapping was created.
    pub penalty: u64,
}

impl Translation {
    /// Returns true if the request created a new mapping.
    pub const fn is_fault(&self) -> bool {
        self.penalty != 0
    }
}

/// Key of the page-table entry location table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct PteKey {
    space: AddressSpaceId,
    level: usize,
    base: VirtualAddress,
}

/// Demand-paged translation engine for a set of address spaces.
///
/// The engine is not internally synchronized. Operations take `&mut self`; callers that share
/// an engine between schedulers must serialize access themselves.
pub struct VirtualMemory {
    config: VmemConfig,
    geometry: PageTableGeometry,
    frames: FrameAllocator,
    pte_store: PteBackingStore,
    leaf_table: BTreeMap<(AddressSpaceId, PageNumber), FrameNumber>,
    pte_table: BTreeMap<PteKey, PhysicalAddress>,
}

impl VirtualMemory {
    /// Creates a new engine.
    ///
    /// `memory` is queried once; if the configured virtual address space is wider than a
    /// 64-bit address or larger than physical memory, a warning is logged and construction
    /// proceeds.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. Use [`try_new`](Self::try_new) to handle the
    /// error instead.
    pub fn new(config: VmemConfig, memory: impl PhysicalMemory) -> Self {
        match Self::try_new(config, memory) {
            Ok(vmem) => vmem,
            Err(e) => panic!("invalid virtual memory configuration: {e}"),
        }
    }

    /// Creates a new engine, returning an error if the configuration is invalid.
    pub fn try_new(config: VmemConfig, memory: impl PhysicalMemory) -> Result<Self, ConfigError> {
        config.validate(FIRST_FRAME.as_u64())?;

        let geometry = config.geometry();
        let last_frame = FrameNumber::new(config.addressable_pages());
        let frames = FrameAllocator::new(FIRST_FRAME, last_frame);

        let required_bits = geometry.required_bits();
        if required_bits > ADDRESS_BITS {
            log::warn!(
                "virtual memory configuration would require {} bits of addressing",
                required_bits
            );
        }
        let memory_size = memory.size();
        if required_bits > bits::lg2(memory_size) {
            log::warn!(
                "physical memory size ({}) is smaller than virtual memory size",
                HumanSize(memory_size)
            );
        }

        log::info!(
            "virtual memory: {} levels of {} tables, {} frames available, {} physical memory",
            config.levels,
            HumanSize(config.pte_page_size),
            frames.available_pages(),
            HumanSize(memory_size)
        );

        Ok(Self {
            config,
            geometry,
            frames,
            pte_store: PteBackingStore::new(),
            leaf_table: BTreeMap::new(),
            pte_table: BTreeMap::new(),
        })
    }

    /// Translates `vaddr` in address space `space` to a physical address.
    ///
    /// The first touch of a virtual page allocates a frame for it and is charged the minor
    /// fault penalty. The page offset of `vaddr` is carried over unchanged.
    ///
    /// # Panics
    ///
    /// Panics if a new frame is needed and physical memory is exhausted.
    pub fn translate(&mut self, space: AddressSpaceId, vaddr: VirtualAddress) -> Translation {
        let (frame, fault) = match self.leaf_table.entry((space, vaddr.page_number())) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let frame = self.frames.peek_next_free_page();
                entry.insert(frame);
                self.frames.consume_next_free_page();
                (frame, true)
            }
        };

        let paddr = frame.with_offset(vaddr.page_offset());
        log::trace!(
            "translate: space {} vaddr {} paddr {} fault {}",
            space,
            vaddr,
            paddr,
            fault
        );

        self.translation(paddr, fault)
    }

    /// Returns the physical address of the entry a walker reads at `level` for `vaddr`.
    ///
    /// Entry records for every level and address space share one bump-allocated pool of
    /// frames in 8-byte slots. Addresses that agree on every bit at and above
    /// `shift_amount(level)` share a record. The first request for a record is charged the
    /// minor fault penalty.
    ///
    /// # Panics
    ///
    /// Panics if a new frame is needed and physical memory is exhausted, or if `level` is 0
    /// or exceeds the configured number of levels.
    pub fn pte_address(
        &mut self,
        space: AddressSpaceId,
        vaddr: VirtualAddress,
        level: usize,
    ) -> Translation {
        assert!(level <= self.geometry.levels(), "walk level out of range");

        if let Some(frame) = self.pte_store.refill(&mut self.frames) {
            log::debug!("drew frame {} for page table entries", frame);
        }

        let key = PteKey {
            space,
            level,
            base: self.geometry.level_base(vaddr, level),
        };
        let (record, fault) = match self.pte_table.entry(key) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let slot = self.pte_store.current_slot();
                entry.insert(slot);
                self.pte_store.advance();
                (slot, true)
            }
        };

        let offset = self.geometry.field_at(vaddr, level);
        let paddr = record.splice(
            bits::lg2(PTE_BYTES),
            self.geometry.index_bits(),
            offset,
        );
        log::trace!(
            "pte_address: space {} vaddr {} paddr {} index {} level {} fault {}",
            space,
            vaddr,
            paddr,
            offset,
            level,
            fault
        );

        self.translation(paddr, fault)
    }

    fn translation(&self, address: PhysicalAddress, fault: bool) -> Translation {
        Translation {
            address,
            penalty: if fault {
                self.config.minor_fault_penalty
            } else {
                0
            },
        }
    }

    /// Returns the number of frames that can still be allocated.
    pub fn available_pages(&self) -> u64 {
        self.frames.available_pages()
    }

    /// Returns the number of low-order address bits consumed below `level`.
    pub fn shift_amount(&self, level: usize) -> u64 {
        self.geometry.shift_amount(level)
    }

    /// Returns the entry index a walker uses at `level` for `vaddr`.
    pub fn field_at(&self, vaddr: VirtualAddress, level: usize) -> u64 {
        self.geometry.field_at(vaddr, level)
    }

    /// Returns the number of walk levels.
    pub fn levels(&self) -> usize {
        self.config.levels
    }

    /// Returns the size of a page-table page in bytes.
    pub fn pte_page_size(&self) -> u64 {
        self.config.pte_page_size
    }

    /// Returns the latency charged whenever a mapping is created.
    pub fn minor_fault_penalty(&self) -> u64 {
        self.config.minor_fault_penalty
    }
}
