#![cfg_attr(not(test), no_std)]

//! # Virtual Memory Engine (vmem)
//!
//! The vmem crate models the address-translation layer of a simulated memory hierarchy.
//! It provides:
//!
//! - Demand-paged leaf translation from (address space, virtual page) to physical page.
//! - Locations of the page-table entries a multi-level radix walk would read.
//! - A monotonic physical page allocator that never reclaims pages.
//! - A shared, bump-allocated backing store for page-table entries of every level and
//!   address space.
//!
//! Every operation is a deterministic function of call order: mappings are created on first
//! touch and persist for the lifetime of the engine.

extern crate alloc;

mod address;
mod bits;
mod config;
mod frame_allocator;
mod geometry;
mod human_size;
mod numbers;
mod physical_memory;
mod pte_pool;
mod virtual_memory;

pub use address::{LOG2_PAGE_SIZE, PAGE_SIZE, PhysicalAddress, VirtualAddress};
pub use config::{ConfigError, VmemConfig};
pub use frame_allocator::FrameAllocator;
pub use geometry::PageTableGeometry;
pub use human_size::HumanSize;
pub use numbers::{AddressSpaceId, FrameNumber, PageNumber};
pub use physical_memory::{MemoryCapacity, PhysicalMemory};
pub use pte_pool::{PTE_BYTES, PteBackingStore};
pub use virtual_memory::{Translation, VirtualMemory};
