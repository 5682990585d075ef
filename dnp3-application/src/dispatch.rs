//! Object dispatch registry
//!
//! Maps object group and variation to the handler the session invokes for
//! each function code. Lookups try the exact variation first, then the
//! wildcard entry registered for all variations of the group.

use crate::controls::{analog_output_size, CROB_SIZE};
use crate::parse::ObjectSize;
use dnp3_database::PointType;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Variation part of a registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariationKey {
    Exact(u8),
    Any,
}

/// Registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub group: u8,
    pub variation: VariationKey,
}

impl ObjectKey {
    pub const fn exact(group: u8, variation: u8) -> Self {
        Self {
            group,
            variation: VariationKey::Exact(variation),
        }
    }

    pub const fn any(group: u8) -> Self {
        Self {
            group,
            variation: VariationKey::Any,
        }
    }
}

/// Read pass an entry participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPass {
    /// Event objects and class scans
    Events,
    /// Explicit static objects
    Static,
}

/// What a read header asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadHandler {
    /// Group 60 class scan
    ClassScan,
    /// Events of one point category; variation 0 selects per-point defaults
    Events(PointType),
    /// Static values of one point category
    Static(PointType),
    /// Group 80 internal indications
    Iin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadEntry {
    pub pass: ReadPass,
    pub handler: ReadHandler,
}

/// What a write header changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteHandler {
    /// Group 50 variation 1
    Time,
    /// Group 50 variation 3
    LastRecordedTime,
    /// Group 80 variation 1
    Iin,
}

/// Request length validation for control objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    Fixed(usize),
    /// Variable-length objects are not length-checked
    NoCheck,
}

/// Control object family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Crob,
    AnalogOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEntry {
    pub kind: ControlKind,
    pub size: SizeCheck,
}

impl ControlEntry {
    pub fn object_size(&self) -> ObjectSize {
        match self.size {
            SizeCheck::Fixed(size) => ObjectSize::Fixed(size),
            SizeCheck::NoCheck => ObjectSize::Free,
        }
    }
}

/// Dispatch tables per function family
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    read: BTreeMap<ObjectKey, ReadEntry>,
    write: BTreeMap<ObjectKey, WriteHandler>,
    control: BTreeMap<ObjectKey, ControlEntry>,
    freeze: BTreeMap<ObjectKey, PointType>,
    assign_class: BTreeMap<ObjectKey, PointType>,
}

fn lookup<T: Copy>(table: &BTreeMap<ObjectKey, T>, group: u8, variation: u8) -> Option<T> {
    table
        .get(&ObjectKey::exact(group, variation))
        .or_else(|| table.get(&ObjectKey::any(group)))
        .copied()
}

impl ObjectRegistry {
    /// Build the registry for the supported object subset
    pub fn new() -> Self {
        let mut registry = Self::default();

        for class_var in 1..=4u8 {
            registry.read.insert(
                ObjectKey::exact(60, class_var),
                ReadEntry {
                    pass: ReadPass::Events,
                    handler: ReadHandler::ClassScan,
                },
            );
        }
        for point_type in PointType::STATIC_ORDER {
            registry.read.insert(
                ObjectKey::any(crate::objects::event_group(point_type)),
                ReadEntry {
                    pass: ReadPass::Events,
                    handler: ReadHandler::Events(point_type),
                },
            );
            let static_group = crate::objects::static_group(point_type);
            registry.read.insert(
                ObjectKey::any(static_group),
                ReadEntry {
                    pass: ReadPass::Static,
                    handler: ReadHandler::Static(point_type),
                },
            );
            registry.assign_class.insert(ObjectKey::any(static_group), point_type);
        }
        registry.read.insert(
            ObjectKey::exact(80, 1),
            ReadEntry {
                pass: ReadPass::Static,
                handler: ReadHandler::Iin,
            },
        );

        registry.write.insert(ObjectKey::exact(50, 1), WriteHandler::Time);
        registry.write.insert(ObjectKey::exact(50, 3), WriteHandler::LastRecordedTime);
        registry.write.insert(ObjectKey::exact(80, 1), WriteHandler::Iin);

        registry.control.insert(
            ObjectKey::exact(12, 1),
            ControlEntry {
                kind: ControlKind::Crob,
                size: SizeCheck::Fixed(CROB_SIZE),
            },
        );
        for variation in 1..=4u8 {
            if let Some(size) = analog_output_size(variation) {
                registry.control.insert(
                    ObjectKey::exact(41, variation),
                    ControlEntry {
                        kind: ControlKind::AnalogOutput,
                        size: SizeCheck::Fixed(size),
                    },
                );
            }
        }

        registry.freeze.insert(ObjectKey::any(20), PointType::Counter);
        registry.freeze.insert(ObjectKey::any(21), PointType::Counter);

        registry
    }

    pub fn read(&self, group: u8, variation: u8) -> Option<ReadEntry> {
        lookup(&self.read, group, variation)
    }

    pub fn write(&self, group: u8, variation: u8) -> Option<WriteHandler> {
        lookup(&self.write, group, variation)
    }

    pub fn control(&self, group: u8, variation: u8) -> Option<ControlEntry> {
        lookup(&self.control, group, variation)
    }

    pub fn freeze(&self, group: u8, variation: u8) -> Option<PointType> {
        lookup(&self.freeze, group, variation)
    }

    pub fn assign_class(&self, group: u8, variation: u8) -> Option<PointType> {
        lookup(&self.assign_class, group, variation)
    }
}

/// Registry shared by every session
pub static REGISTRY: Lazy<ObjectRegistry> = Lazy::new(ObjectRegistry::new);
