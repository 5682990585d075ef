//! Uniform access to point categories by [`PointType`]

use crate::traits::Database;
use crate::types::{Measurement, PointType};
use dnp3_core::{ClassMask, EventClass};

macro_rules! with_points {
    ($db:expr, $point_type:expr, |$points:ident| $body:expr, $missing:expr) => {
        match $point_type {
            PointType::BinaryInput => match $db.binary_inputs() {
                Some($points) => $body,
                None => $missing,
            },
            PointType::DoubleBitInput => match $db.double_bit_inputs() {
                Some($points) => $body,
                None => $missing,
            },
            PointType::BinaryOutput => match $db.binary_outputs() {
                Some($points) => $body,
                None => $missing,
            },
            PointType::Counter => match $db.counters() {
                Some($points) => $body,
                None => $missing,
            },
            PointType::FrozenCounter => match $db.frozen_counters() {
                Some($points) => $body,
                None => $missing,
            },
            PointType::AnalogInput => match $db.analog_inputs() {
                Some($points) => $body,
                None => $missing,
            },
            PointType::AnalogOutput => match $db.analog_outputs() {
                Some($points) => $body,
                None => $missing,
            },
        }
    };
}

/// Type-erased point access implemented for every [`Database`]
pub trait PointAccess {
    /// Whether the database exposes the category at all
    fn supports(&mut self, point_type: PointType) -> bool;
    fn quantity(&mut self, point_type: PointType) -> u16;
    fn is_enabled(&mut self, point_type: PointType, index: u16) -> bool;
    fn read_point(&mut self, point_type: PointType, index: u16) -> Option<Measurement>;
    fn point_class(&mut self, point_type: PointType, index: u16) -> ClassMask;
    fn assign_point_class(&mut self, point_type: PointType, index: u16, class: ClassMask) -> bool;
    fn in_class0(&mut self, point_type: PointType, index: u16) -> bool;
    fn static_variation(&mut self, point_type: PointType, index: u16) -> u8;
    fn event_variation(&mut self, point_type: PointType, index: u16, class: EventClass) -> u8;
    fn changed_point(&mut self, point_type: PointType, index: u16) -> Option<Measurement>;
}

impl<D: Database + ?Sized> PointAccess for D {
    fn supports(&mut self, point_type: PointType) -> bool {
        with_points!(self, point_type, |_points| true, false)
    }

    fn quantity(&mut self, point_type: PointType) -> u16 {
        with_points!(self, point_type, |points| points.quantity(), 0)
    }

    fn is_enabled(&mut self, point_type: PointType, index: u16) -> bool {
        with_points!(self, point_type, |points| points.is_enabled(index), false)
    }

    fn read_point(&mut self, point_type: PointType, index: u16) -> Option<Measurement> {
        with_points!(self, point_type, |points| points.read(index).map(Measurement::from), None)
    }

    fn point_class(&mut self, point_type: PointType, index: u16) -> ClassMask {
        with_points!(self, point_type, |points| points.event_class(index), ClassMask::NONE)
    }

    fn assign_point_class(&mut self, point_type: PointType, index: u16, class: ClassMask) -> bool {
        with_points!(self, point_type, |points| points.assign_class(index, class), false)
    }

    fn in_class0(&mut self, point_type: PointType, index: u16) -> bool {
        with_points!(self, point_type, |points| points.in_class0(index), false)
    }

    fn static_variation(&mut self, point_type: PointType, index: u16) -> u8 {
        with_points!(self, point_type, |points| points.default_variation(index), 0)
    }

    fn event_variation(&mut self, point_type: PointType, index: u16, class: EventClass) -> u8 {
        with_points!(
            self,
            point_type,
            |points| points.event_default_variation(index, class),
            0
        )
    }

    fn changed_point(&mut self, point_type: PointType, index: u16) -> Option<Measurement> {
        with_points!(self, point_type, |points| points.changed(index).map(Measurement::from), None)
    }
}
