//! Event classes

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Event class of a single point or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventClass {
    Class1,
    Class2,
    Class3,
}

impl EventClass {
    pub const ALL: [EventClass; 3] = [EventClass::Class1, EventClass::Class2, EventClass::Class3];

    /// Zero-based slot used for per-class configuration arrays
    pub const fn slot(self) -> usize {
        match self {
            Self::Class1 => 0,
            Self::Class2 => 1,
            Self::Class3 => 2,
        }
    }

    pub const fn mask(self) -> ClassMask {
        match self {
            Self::Class1 => ClassMask::CLASS_1,
            Self::Class2 => ClassMask::CLASS_2,
            Self::Class3 => ClassMask::CLASS_3,
        }
    }

    /// Class selected by a group 60 variation (2, 3 or 4)
    pub const fn from_group60_variation(variation: u8) -> Option<Self> {
        match variation {
            2 => Some(Self::Class1),
            3 => Some(Self::Class2),
            4 => Some(Self::Class3),
            _ => None,
        }
    }
}

/// Set of classes (0, 1, 2, 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClassMask(u8);

impl ClassMask {
    pub const NONE: ClassMask = ClassMask(0x00);
    pub const CLASS_1: ClassMask = ClassMask(0x01);
    pub const CLASS_2: ClassMask = ClassMask(0x02);
    pub const CLASS_3: ClassMask = ClassMask(0x04);
    pub const CLASS_0: ClassMask = ClassMask(0x08);
    pub const EVENTS: ClassMask = ClassMask(0x07);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    pub const fn contains(&self, other: ClassMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn intersects(&self, other: ClassMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: ClassMask) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ClassMask) {
        self.0 &= !other.0;
    }

    /// The single event class of this mask, if exactly one event class is set
    pub fn event_class(&self) -> Option<EventClass> {
        match self.0 & Self::EVENTS.0 {
            0x01 => Some(EventClass::Class1),
            0x02 => Some(EventClass::Class2),
            0x04 => Some(EventClass::Class3),
            _ => None,
        }
    }

    /// Iterate the event classes contained in this mask
    pub fn event_classes(&self) -> impl Iterator<Item = EventClass> + '_ {
        EventClass::ALL
            .into_iter()
            .filter(move |class| self.contains(class.mask()))
    }

    /// Class selected by a group 60 variation (1-4)
    pub const fn from_group60_variation(variation: u8) -> Option<Self> {
        match variation {
            1 => Some(Self::CLASS_0),
            2 => Some(Self::CLASS_1),
            3 => Some(Self::CLASS_2),
            4 => Some(Self::CLASS_3),
            _ => None,
        }
    }
}

impl From<EventClass> for ClassMask {
    fn from(class: EventClass) -> Self {
        class.mask()
    }
}

impl BitOr for ClassMask {
    type Output = ClassMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ClassMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClassMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ClassMask {
    type Output = ClassMask;

    fn bitand(self, rhs: Self) -> Self::Output {
        ClassMask(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_mask_membership() {
        let mask = ClassMask::CLASS_1 | ClassMask::CLASS_3;
        assert!(mask.contains(ClassMask::CLASS_1));
        assert!(!mask.contains(ClassMask::CLASS_2));
        assert!(!mask.contains(ClassMask::NONE));
        let classes: Vec<_> = mask.event_classes().collect();
        assert_eq!(classes, vec![EventClass::Class1, EventClass::Class3]);
    }

    #[test]
    fn test_group60_mapping() {
        assert_eq!(ClassMask::from_group60_variation(1), Some(ClassMask::CLASS_0));
        assert_eq!(EventClass::from_group60_variation(4), Some(EventClass::Class3));
        assert_eq!(EventClass::from_group60_variation(1), None);
    }
}
