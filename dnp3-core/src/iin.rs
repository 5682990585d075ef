//! Internal indications

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Internal Indication bits carried by every outstation response
///
/// IIN1 occupies the high byte and IIN2 the low byte, so the wire order is
/// `[high, low]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Iin(u16);

impl Iin {
    // IIN1
    pub const ALL_STATIONS: Iin = Iin(0x0100);
    pub const CLASS_1_EVENTS: Iin = Iin(0x0200);
    pub const CLASS_2_EVENTS: Iin = Iin(0x0400);
    pub const CLASS_3_EVENTS: Iin = Iin(0x0800);
    pub const NEED_TIME: Iin = Iin(0x1000);
    pub const LOCAL_CONTROL: Iin = Iin(0x2000);
    pub const DEVICE_TROUBLE: Iin = Iin(0x4000);
    pub const DEVICE_RESTART: Iin = Iin(0x8000);

    // IIN2
    pub const NO_FUNC_CODE_SUPPORT: Iin = Iin(0x0001);
    pub const OBJECT_UNKNOWN: Iin = Iin(0x0002);
    pub const PARAMETER_ERROR: Iin = Iin(0x0004);
    pub const EVENT_BUFFER_OVERFLOW: Iin = Iin(0x0008);
    pub const ALREADY_EXECUTING: Iin = Iin(0x0010);
    pub const CONFIG_CORRUPT: Iin = Iin(0x0020);

    /// Bits that only describe the request currently being processed
    pub const REQUEST_BITS: Iin = Iin(0x0007);

    /// Number of IIN bits addressable through object group 80
    pub const BIT_COUNT: u16 = 16;

    /// No bits set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from the raw 16-bit value
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw 16-bit value
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Wire encoding `[IIN1, IIN2]`
    pub const fn to_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Decode from `[IIN1, IIN2]`
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    pub const fn contains(&self, other: Iin) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(&self, other: Iin) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Iin) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Iin) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Iin, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The bit addressed by object group 80 point `index`
    ///
    /// Points 0-7 map to IIN1 bits 0-7, points 8-15 to IIN2 bits 0-7.
    pub const fn from_index(index: u16) -> Option<Iin> {
        if index < 8 {
            Some(Iin(0x0100 << index))
        } else if index < 16 {
            Some(Iin(1 << (index - 8)))
        } else {
            None
        }
    }
}

impl BitOr for Iin {
    type Output = Iin;

    fn bitor(self, rhs: Self) -> Self::Output {
        Iin(self.0 | rhs.0)
    }
}

impl BitOrAssign for Iin {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Iin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [iin1, iin2] = self.to_bytes();
        write!(f, "IIN1: 0x{:02X} IIN2: 0x{:02X}", iin1, iin2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iin_wire_order() {
        let iin = Iin::DEVICE_RESTART | Iin::OBJECT_UNKNOWN;
        assert_eq!(iin.to_bytes(), [0x80, 0x02]);
        assert_eq!(Iin::from_bytes([0x80, 0x02]), iin);
    }

    #[test]
    fn test_iin_index_mapping() {
        assert_eq!(Iin::from_index(7), Some(Iin::DEVICE_RESTART));
        assert_eq!(Iin::from_index(4), Some(Iin::NEED_TIME));
        assert_eq!(Iin::from_index(8), Some(Iin::NO_FUNC_CODE_SUPPORT));
        assert_eq!(Iin::from_index(16), None);
    }

    #[test]
    fn test_iin_set_and_remove() {
        let mut iin = Iin::empty();
        iin.insert(Iin::NEED_TIME);
        assert!(iin.contains(Iin::NEED_TIME));
        iin.set(Iin::NEED_TIME, false);
        assert!(iin.is_empty());
    }
}
