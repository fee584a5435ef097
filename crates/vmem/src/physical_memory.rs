//! Physical memory capacity providers.

/// Something that can report the size of the simulated physical memory.
///
/// The engine queries the capacity once, at construction, to decide whether the configured
/// virtual address space is larger than the memory behind it.
pub trait PhysicalMemory {
    /// Returns the capacity of physical memory in bytes.
    fn size(&self) -> u64;
}

/// A physical memory of fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCapacity(pub u64);

impl MemoryCapacity {
    /// Creates a capacity of `bytes` bytes.
    pub const fn bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Creates a capacity of `gib` gibibytes.
    pub const fn gibibytes(gib: u64) -> Self {
        Self(gib << 30)
    }
}

impl PhysicalMemory for MemoryCapacity {
    fn size(&self) -> u64 {
        self.0
    }
}

impl<T: PhysicalMemory + ?Sized> PhysicalMemory for &T {
    fn size(&self) -> u64 {
        (**self).size()
    }
}
