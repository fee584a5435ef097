//! Human-readable byte sizes for diagnostics.

use core::fmt;

/// Formats a byte count with binary prefixes (KiB, MiB, ...).
///
/// Values are shown with up to two decimal places, truncated, with trailing zeros dropped.
///
/// # Examples
///
/// ```
/// use vmem::HumanSize;
///
/// assert_eq!(format!("{}", HumanSize(1023)), "1023B");
/// assert_eq!(format!("{}", HumanSize(4096)), "4KiB");
/// assert_eq!(format!("{}", HumanSize(1536)), "1.5KiB");
/// assert_eq!(format!("{}", HumanSize(1 << 60)), "1EiB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanSize(pub u64);

impl From<u64> for HumanSize {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<&u64> for HumanSize {
    #[inline]
    fn from(value: &u64) -> Self {
        Self(*value)
    }
}

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

        let mut unit = 0;
        while unit + 1 < UNITS.len() && self.0 >> (10 * (unit + 1)) != 0 {
            unit += 1;
        }

        let shift = 10 * unit;
        let whole = self.0 >> shift;
        if shift == 0 {
            return write!(f, "{}{}", whole, UNITS[unit]);
        }

        // Hundredths of a unit, computed in 128 bits so EiB values cannot overflow.
        let remainder = u128::from(self.0 & ((1u64 << shift) - 1));
        let hundredths = (remainder * 100 >> shift) as u64;

        match hundredths {
            0 => write!(f, "{}{}", whole, UNITS[unit]),
            h if h % 10 == 0 => write!(f, "{}.{}{}", whole, h / 10, UNITS[unit]),
            h => write!(f, "{}.{:02}{}", whole, h, UNITS[unit]),
        }
    }
}
