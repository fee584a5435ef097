//! Bit-field helpers for 64-bit addresses.
//!
//! Extents are given as `(lower, width)` pairs. Any part of an extent that lies at or beyond
//! bit 64 reads as zero and is ignored on writes, so callers can describe fields of the
//! upper page-table levels without clamping them first.

/// Number of bits in a simulated address.
pub const ADDRESS_BITS: u64 = u64::BITS as u64;

/// Returns `floor(log2(value))`, or 0 for 0.
#[inline]
pub const fn lg2(value: u64) -> u64 {
    if value == 0 { 0 } else { value.ilog2() as u64 }
}

/// Returns a mask with the low `width` bits set.
#[inline]
pub const fn low_mask(width: u64) -> u64 {
    if width >= ADDRESS_BITS {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Returns a mask covering the extent `[lower, lower + width)`.
#[inline]
pub const fn extent_mask(lower: u64, width: u64) -> u64 {
    if lower >= ADDRESS_BITS {
        0
    } else {
        low_mask(width) << lower
    }
}

/// Extracts the field at `[lower, lower + width)`, shifted down to bit 0.
#[inline]
pub const fn slice(value: u64, lower: u64, width: u64) -> u64 {
    if lower >= ADDRESS_BITS {
        0
    } else {
        (value >> lower) & low_mask(width)
    }
}

/// Keeps the bits at and above `lower`, clearing everything below it in place.
#[inline]
pub const fn slice_upper(value: u64, lower: u64) -> u64 {
    value & !low_mask(lower)
}

/// Replaces the extent `[lower, lower + width)` of `value` with the low bits of `field`.
#[inline]
pub const fn splice(value: u64, lower: u64, width: u64, field: u64) -> u64 {
    let mask = extent_mask(lower, width);
    if lower >= ADDRESS_BITS {
        value
    } else {
        (value & !mask) | ((field << lower) & mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lg2_of_powers() {
        assert_eq!(lg2(1), 0);
        assert_eq!(lg2(4096), 12);
        assert_eq!(lg2(1 << 20), 20);
        assert_eq!(lg2(0), 0);
    }

    #[test]
    fn lg2_rounds_down() {
        assert_eq!(lg2(4097), 12);
        assert_eq!(lg2(u64::MAX), 63);
    }

    #[test]
    fn low_mask_saturates() {
        assert_eq!(low_mask(0), 0);
        assert_eq!(low_mask(12), 0xfff);
        assert_eq!(low_mask(64), u64::MAX);
        assert_eq!(low_mask(72), u64::MAX);
    }

    #[test]
    fn slice_extracts_field() {
        assert_eq!(slice(0xdead_beef, 12, 12), 0xdbe);
        assert_eq!(slice(0xdead_beef, 0, 12), 0xeef);
    }

    #[test]
    fn slice_past_top_is_truncated() {
        // Bits 60..72 only have four bits of real address behind them.
        assert_eq!(slice(u64::MAX, 60, 12), 0xf);
        assert_eq!(slice(u64::MAX, 64, 12), 0);
    }

    #[test]
    fn slice_upper_clears_low_bits() {
        assert_eq!(slice_upper(0xdead_beef, 12), 0xdead_b000);
        assert_eq!(slice_upper(0xdead_beef, 0), 0xdead_beef);
        assert_eq!(slice_upper(u64::MAX, 64), 0);
    }

    #[test]
    fn splice_replaces_extent() {
        assert_eq!(splice(0x1000, 3, 12, 0x1), 0x1008);
        assert_eq!(splice(0xffff, 4, 4, 0x0), 0xff0f);
        // Field bits that do not fit in the extent are dropped.
        assert_eq!(splice(0, 0, 4, 0xff), 0xf);
    }

    #[test]
    fn splice_past_top_is_noop() {
        assert_eq!(splice(0x1234, 64, 8, 0xff), 0x1234);
    }
}
