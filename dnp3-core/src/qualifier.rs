//! Object header qualifier codes

use crate::error::{Dnp3Error, Dnp3Result};

/// Qualifier codes understood by the outstation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QualifierCode {
    /// 8-bit start and stop indices
    Range8 = 0x00,
    /// 16-bit start and stop indices
    Range16 = 0x01,
    /// All points, no range field
    AllObjects = 0x06,
    /// 8-bit limited quantity
    Count8 = 0x07,
    /// 16-bit limited quantity
    Count16 = 0x08,
    /// 8-bit count, 8-bit index prefix
    CountAndPrefix8 = 0x17,
    /// 16-bit count, 16-bit index prefix
    CountAndPrefix16 = 0x28,
    /// 8-bit count, 16-bit object size prefix (free format)
    FreeFormat16 = 0x5B,
}

impl QualifierCode {
    pub fn from_u8(value: u8) -> Dnp3Result<Self> {
        match value {
            0x00 => Ok(Self::Range8),
            0x01 => Ok(Self::Range16),
            0x06 => Ok(Self::AllObjects),
            0x07 => Ok(Self::Count8),
            0x08 => Ok(Self::Count16),
            0x17 => Ok(Self::CountAndPrefix8),
            0x28 => Ok(Self::CountAndPrefix16),
            0x5B => Ok(Self::FreeFormat16),
            other => Err(Dnp3Error::Parse(format!(
                "Unsupported qualifier code 0x{:02X}",
                other
            ))),
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Size of the range field that follows the qualifier
    pub const fn range_size(self) -> usize {
        match self {
            Self::Range8 => 2,
            Self::Range16 => 4,
            Self::AllObjects => 0,
            Self::Count8 | Self::CountAndPrefix8 | Self::FreeFormat16 => 1,
            Self::Count16 | Self::CountAndPrefix16 => 2,
        }
    }

    /// Size of the per-object prefix
    pub const fn prefix_size(self) -> usize {
        match self {
            Self::CountAndPrefix8 => 1,
            Self::CountAndPrefix16 | Self::FreeFormat16 => 2,
            _ => 0,
        }
    }

    /// Whether each object carries its point index
    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::CountAndPrefix8 | Self::CountAndPrefix16)
    }

    /// Qualifiers accepted for event reads and class scans
    ///
    /// Group 113 (virtual terminal events) additionally accepts indexed
    /// qualifiers.
    pub const fn allowed_for_event_read(self, group: u8) -> bool {
        match self {
            Self::AllObjects | Self::Count8 | Self::Count16 | Self::FreeFormat16 => true,
            Self::CountAndPrefix8 | Self::CountAndPrefix16 => group == 113,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier_decode() {
        assert_eq!(QualifierCode::from_u8(0x28).unwrap(), QualifierCode::CountAndPrefix16);
        assert!(QualifierCode::from_u8(0x39).is_err());
    }

    #[test]
    fn test_event_read_qualifiers() {
        assert!(QualifierCode::AllObjects.allowed_for_event_read(2));
        assert!(QualifierCode::Count8.allowed_for_event_read(60));
        assert!(!QualifierCode::Range16.allowed_for_event_read(2));
        assert!(!QualifierCode::CountAndPrefix16.allowed_for_event_read(2));
        assert!(QualifierCode::CountAndPrefix16.allowed_for_event_read(113));
    }
}
