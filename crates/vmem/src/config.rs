//! Engine configuration and validation.

use thiserror::Error;

use crate::HumanSize;
use crate::geometry::PageTableGeometry;

/// Smallest page-table page size accepted, exclusive.
const MIN_PTE_PAGE_SIZE: u64 = 1024;

/// Errors that make a virtual memory configuration unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Page-table pages must be a power of two.
    #[error("page table page size {0} is not a power of two")]
    PageSizeNotPowerOfTwo(u64),
    /// Page-table pages must be larger than 1 KiB.
    #[error("page table page size {} must be larger than 1KiB", HumanSize::from(.0))]
    PageSizeTooSmall(u64),
    /// At least one walk level is required.
    #[error("page table must have at least one level")]
    NoLevels,
    /// The translated address space does not extend past the reserved low memory.
    #[error("virtual address space of {pages} pages does not exceed the {reserved} reserved pages")]
    AddressSpaceTooSmall {
        /// Pages addressable by the configured page table.
        pages: u64,
        /// Pages reserved at the bottom of physical memory.
        reserved: u64,
    },
}

/// Configuration of a [`VirtualMemory`](crate::VirtualMemory) engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmemConfig {
    /// Size of one page-table page in bytes.
    pub pte_page_size: u64,
    /// Number of walk levels.
    pub levels: usize,
    /// Latency charged whenever a new mapping is created.
    pub minor_fault_penalty: u64,
}

impl Default for VmemConfig {
    fn default() -> Self {
        Self {
            pte_page_size: 4096,
            levels: 5,
            minor_fault_penalty: 200,
        }
    }
}

impl VmemConfig {
    /// Sets the page-table page size.
    pub const fn with_pte_page_size(mut self, bytes: u64) -> Self {
        self.pte_page_size = bytes;
        self
    }

    /// Sets the number of walk levels.
    pub const fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// Sets the minor fault penalty.
    pub const fn with_minor_fault_penalty(mut self, penalty: u64) -> Self {
        self.minor_fault_penalty = penalty;
        self
    }

    /// Returns the radix geometry described by this configuration.
    pub const fn geometry(&self) -> PageTableGeometry {
        PageTableGeometry::new(self.pte_page_size, self.levels)
    }

    /// Returns the number of pages the page table can address, saturating at `u64::MAX`.
    pub fn addressable_pages(&self) -> u64 {
        u32::try_from(self.levels)
            .ok()
            .and_then(|levels| self.pte_page_size.checked_pow(levels))
            .unwrap_or(u64::MAX)
    }

    /// Checks that the configuration describes a usable engine.
    ///
    /// `reserved_pages` is the number of frames kept free at the bottom of physical memory.
    pub fn validate(&self, reserved_pages: u64) -> Result<(), ConfigError> {
        if !self.pte_page_size.is_power_of_two() {
            return Err(ConfigError::PageSizeNotPowerOfTwo(self.pte_page_size));
        }
        if self.pte_page_size <= MIN_PTE_PAGE_SIZE {
            return Err(ConfigError::PageSizeTooSmall(self.pte_page_size));
        }
        if self.levels == 0 {
            return Err(ConfigError::NoLevels);
        }

        let pages = self.addressable_pages();
        if pages <= reserved_pages {
            return Err(ConfigError::AddressSpaceTooSmall {
                pages,
                reserved: reserved_pages,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESERVED: u64 = 256;

    #[test]
    fn default_is_valid() {
        assert_eq!(VmemConfig::default().validate(RESERVED), Ok(()));
    }

    #[test]
    fn builder_sets_fields() {
        let config = VmemConfig::default()
            .with_pte_page_size(2048)
            .with_levels(3)
            .with_minor_fault_penalty(7);
        assert_eq!(config.pte_page_size, 2048);
        assert_eq!(config.levels, 3);
        assert_eq!(config.minor_fault_penalty, 7);
    }

    #[test]
    fn rejects_non_power_of_two() {
        let config = VmemConfig::default().with_pte_page_size(3000);
        assert_eq!(
            config.validate(RESERVED),
            Err(ConfigError::PageSizeNotPowerOfTwo(3000))
        );
    }

    #[test]
    fn rejects_one_kib_tables() {
        let config = VmemConfig::default().with_pte_page_size(1024);
        assert_eq!(
            config.validate(RESERVED),
            Err(ConfigError::PageSizeTooSmall(1024))
        );
    }

    #[test]
    fn rejects_zero_levels() {
        let config = VmemConfig::default().with_levels(0);
        assert_eq!(config.validate(RESERVED), Err(ConfigError::NoLevels));
    }

    #[test]
    fn rejects_tiny_address_space() {
        let config = VmemConfig::default().with_pte_page_size(2048).with_levels(1);
        assert_eq!(config.validate(RESERVED), Ok(()));
        assert_eq!(
            config.validate(4096),
            Err(ConfigError::AddressSpaceTooSmall {
                pages: 2048,
                reserved: 4096
            })
        );
    }

    #[test]
    fn addressable_pages_saturates() {
        assert_eq!(VmemConfig::default().addressable_pages(), 1 << 60);
        assert_eq!(VmemConfig::default().with_levels(6).addressable_pages(), u64::MAX);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            format!("{}", ConfigError::PageSizeTooSmall(512)),
            "page table page size 512B must be larger than 1KiB"
        );
    }
}
