//! Address types for simulated physical and virtual memory.
//!
//! Simulated addresses are always 64 bits wide regardless of the host, so both types wrap a
//! `u64` rather than a `usize`.

use core::fmt;
use core::ops::{Add, Sub};

use crate::bits;

/// Log2 of the base page size.
pub const LOG2_PAGE_SIZE: u32 = 12;

/// Base page size in bytes (4 KiB).
pub const PAGE_SIZE: u64 = 1 << LOG2_PAGE_SIZE;

/// Macro to define common address type functionality.
///
/// This macro generates the basic structure and methods common to both physical
/// and virtual address types.
macro_rules! impl_address_common {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new address.
            #[inline]
            pub const fn new(addr: u64) -> Self {
                Self(addr)
            }

            /// Returns the raw address value.
            #[inline]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Returns the offset of this address within its base page.
            #[inline]
            pub const fn page_offset(self) -> u64 {
                self.0 & (PAGE_SIZE - 1)
            }

            /// Checks if the address is aligned to the given alignment.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn is_aligned(self, align: u64) -> bool {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                self.0 & (align - 1) == 0
            }

            /// Extracts the bit field `[lower, lower + width)`.
            #[inline]
            pub const fn slice(self, lower: u64, width: u64) -> u64 {
                bits::slice(self.0, lower, width)
            }

            /// Clears every bit below `lower`.
            #[inline]
            pub const fn slice_upper(self, lower: u64) -> Self {
                Self(bits::slice_upper(self.0, lower))
            }

            /// Replaces the bit field `[lower, lower + width)` with `field`.
            #[inline]
            pub const fn splice(self, lower: u64, width: u64, field: u64) -> Self {
                Self(bits::splice(self.0, lower, width, field))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(addr: u64) -> Self {
                Self::new(addr)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(addr: $name) -> Self {
                addr.0
            }
        }

        impl Add<u64> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: u64) -> Self::Output {
                Self(self.0.wrapping_add(rhs))
            }
        }

        impl Sub<u64> for $name {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: u64) -> Self::Output {
                Self(self.0.wrapping_sub(rhs))
            }
        }
    };
}

impl_address_common!(
    PhysicalAddress,
    "A simulated physical memory address.\n\n\
     Physical addresses are produced by the engine; the page number portion always comes\n\
     from the monotonic frame allocator."
);

impl PhysicalAddress {
    /// Returns the frame containing this address.
    #[inline]
    pub const fn frame_number(self) -> crate::FrameNumber {
        crate::FrameNumber::new(self.0 >> LOG2_PAGE_SIZE)
    }
}

impl_address_common!(
    VirtualAddress,
    "A simulated virtual memory address.\n\n\
     Virtual addresses are not checked for canonical form; any 64-bit value is accepted\n\
     and translated."
);

impl VirtualAddress {
    /// Returns the virtual page containing this address.
    #[inline]
    pub const fn page_number(self) -> crate::PageNumber {
        crate::PageNumber::new(self.0 >> LOG2_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod virtual_address {
        use super::*;

        #[test]
        fn page_number_and_offset() {
            let addr = VirtualAddress::new(0xdead_beef);
            assert_eq!(addr.page_number().as_u64(), 0xdeadb);
            assert_eq!(addr.page_offset(), 0xeef);
        }

        #[test]
        fn alignment_check() {
            let addr = VirtualAddress::new(PAGE_SIZE * 4);
            assert!(addr.is_aligned(PAGE_SIZE));
            assert!(addr.is_aligned(8));
            assert!(!addr.is_aligned(PAGE_SIZE * 8));
        }

        #[test]
        #[should_panic(expected = "alignment must be a power of two")]
        fn alignment_not_power_of_two() {
            VirtualAddress::new(0x1000).is_aligned(3);
        }

        #[test]
        fn slice_upper_keeps_high_bits() {
            let addr = VirtualAddress::new(0xffff_ffff_ffff_ffff);
            assert_eq!(addr.slice_upper(48).as_u64(), 0xffff_0000_0000_0000);
        }

        #[test]
        fn formatting() {
            let addr = VirtualAddress::new(0x1000);
            assert_eq!(format!("{}", addr), "0x1000");
            assert_eq!(format!("{:?}", addr), "VirtualAddress(0x1000)");
        }
    }

    mod physical_address {
        use super::*;

        #[test]
        fn frame_number() {
            let addr = PhysicalAddress::new(PAGE_SIZE * 3 + 10);
            assert_eq!(addr.frame_number().as_u64(), 3);
        }

        #[test]
        fn splice_entry_index() {
            let addr = PhysicalAddress::new(0x10_0000).splice(3, 12, 0x1ff);
            assert_eq!(addr.as_u64(), 0x10_0ff8);
        }

        #[test]
        fn arithmetic() {
            let addr = PhysicalAddress::new(0x1000);
            assert_eq!((addr + 8).as_u64(), 0x1008);
            assert_eq!((addr - 8).as_u64(), 0x0ff8);
        }
    }
}
