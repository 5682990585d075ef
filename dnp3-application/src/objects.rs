//! Encoders for the supported object groups and variations
//!
//! Every static and event variation the outstation can report is listed in
//! one table. A `Variation` knows its point type, its encoded size and how
//! to write one value.

use bytes::{BufMut, BytesMut};
use dnp3_core::DnpTime;
use dnp3_database::{Measurement, PointType};

type Encoder = fn(&Measurement, &mut BytesMut);

/// Encoded size of one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSize {
    /// Bit-packed, bits per point
    Bits(u8),
    Bytes(usize),
}

/// A reportable object variation
#[derive(Clone, Copy)]
pub struct Variation {
    pub group: u8,
    pub variation: u8,
    pub point_type: PointType,
    pub event: bool,
    pub size: PointSize,
    encode: Encoder,
}

impl std::fmt::Debug for Variation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}v{}", self.group, self.variation)
    }
}

impl PartialEq for Variation {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.variation == other.variation
    }
}

impl Variation {
    /// Write one value
    ///
    /// Packed variations are written by the fragment builder and ignore
    /// this call.
    pub fn encode(&self, value: &Measurement, buf: &mut BytesMut) {
        (self.encode)(value, buf)
    }

    pub fn packed_bits(&self) -> Option<u8> {
        match self.size {
            PointSize::Bits(bits) => Some(bits),
            PointSize::Bytes(_) => None,
        }
    }

    pub fn lookup(group: u8, variation: u8) -> Option<&'static Variation> {
        VARIATIONS
            .iter()
            .find(|v| v.group == group && v.variation == variation)
    }

    /// Static variation for a point, `0` selects the category default
    pub fn resolve_static(point_type: PointType, variation: u8) -> Option<&'static Variation> {
        let group = static_group(point_type);
        let variation = if variation == 0 {
            default_static_variation(point_type)
        } else {
            variation
        };
        Self::lookup(group, variation).filter(|v| !v.event)
    }

    /// Event variation for a point, `0` selects the category default
    pub fn resolve_event(point_type: PointType, variation: u8) -> Option<&'static Variation> {
        let group = event_group(point_type);
        let variation = if variation == 0 {
            default_event_variation(point_type)
        } else {
            variation
        };
        Self::lookup(group, variation).filter(|v| v.event)
    }
}

/// Static object group of a point category
pub const fn static_group(point_type: PointType) -> u8 {
    match point_type {
        PointType::BinaryInput => 1,
        PointType::DoubleBitInput => 3,
        PointType::BinaryOutput => 10,
        PointType::Counter => 20,
        PointType::FrozenCounter => 21,
        PointType::AnalogInput => 30,
        PointType::AnalogOutput => 40,
    }
}

/// Event object group of a point category
pub const fn event_group(point_type: PointType) -> u8 {
    match point_type {
        PointType::BinaryInput => 2,
        PointType::DoubleBitInput => 4,
        PointType::BinaryOutput => 11,
        PointType::Counter => 22,
        PointType::FrozenCounter => 23,
        PointType::AnalogInput => 32,
        PointType::AnalogOutput => 42,
    }
}

pub const fn default_static_variation(point_type: PointType) -> u8 {
    match point_type {
        PointType::BinaryInput | PointType::DoubleBitInput | PointType::BinaryOutput => 2,
        _ => 1,
    }
}

pub const fn default_event_variation(point_type: PointType) -> u8 {
    match point_type {
        PointType::BinaryInput | PointType::DoubleBitInput | PointType::BinaryOutput => 2,
        _ => 1,
    }
}

fn time_bytes(value: &Measurement) -> [u8; DnpTime::SIZE] {
    value.time().unwrap_or_default().to_bytes()
}

fn counter(value: &Measurement) -> u32 {
    value.counter_value().unwrap_or(0)
}

fn packed(_: &Measurement, _: &mut BytesMut) {}

fn flags(value: &Measurement, buf: &mut BytesMut) {
    buf.put_u8(value.flags_with_state());
}

fn flags_time(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

fn counter32_flags(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_u32_le(counter(value));
}

fn counter16_flags(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_u16_le(counter(value) as u16);
}

fn counter32_flags_time(value: &Measurement, buf: &mut BytesMut) {
    counter32_flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

fn counter16_flags_time(value: &Measurement, buf: &mut BytesMut) {
    counter16_flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

fn counter32(value: &Measurement, buf: &mut BytesMut) {
    buf.put_u32_le(counter(value));
}

fn counter16(value: &Measurement, buf: &mut BytesMut) {
    buf.put_u16_le(counter(value) as u16);
}

fn analog32_flags(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_i32_le(value.numeric() as i32);
}

fn analog16_flags(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_i16_le(value.numeric() as i16);
}

fn analog32(value: &Measurement, buf: &mut BytesMut) {
    buf.put_i32_le(value.numeric() as i32);
}

fn analog16(value: &Measurement, buf: &mut BytesMut) {
    buf.put_i16_le(value.numeric() as i16);
}

fn float32_flags(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_f32_le(value.numeric() as f32);
}

fn float64_flags(value: &Measurement, buf: &mut BytesMut) {
    flags(value, buf);
    buf.put_f64_le(value.numeric());
}

fn analog32_flags_time(value: &Measurement, buf: &mut BytesMut) {
    analog32_flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

fn analog16_flags_time(value: &Measurement, buf: &mut BytesMut) {
    analog16_flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

fn float32_flags_time(value: &Measurement, buf: &mut BytesMut) {
    float32_flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

fn float64_flags_time(value: &Measurement, buf: &mut BytesMut) {
    float64_flags(value, buf);
    buf.put_slice(&time_bytes(value));
}

macro_rules! variation {
    ($group:expr, $var:expr, $pt:ident, $event:expr, bits $bits:expr) => {
        Variation {
            group: $group,
            variation: $var,
            point_type: PointType::$pt,
            event: $event,
            size: PointSize::Bits($bits),
            encode: packed,
        }
    };
    ($group:expr, $var:expr, $pt:ident, $event:expr, $size:expr, $encode:ident) => {
        Variation {
            group: $group,
            variation: $var,
            point_type: PointType::$pt,
            event: $event,
            size: PointSize::Bytes($size),
            encode: $encode,
        }
    };
}

static VARIATIONS: &[Variation] = &[
    variation!(1, 1, BinaryInput, false, bits 1),
    variation!(1, 2, BinaryInput, false, 1, flags),
    variation!(2, 1, BinaryInput, true, 1, flags),
    variation!(2, 2, BinaryInput, true, 7, flags_time),
    variation!(3, 1, DoubleBitInput, false, bits 2),
    variation!(3, 2, DoubleBitInput, false, 1, flags),
    variation!(4, 1, DoubleBitInput, true, 1, flags),
    variation!(4, 2, DoubleBitInput, true, 7, flags_time),
    variation!(10, 1, BinaryOutput, false, bits 1),
    variation!(10, 2, BinaryOutput, false, 1, flags),
    variation!(11, 1, BinaryOutput, true, 1, flags),
    variation!(11, 2, BinaryOutput, true, 7, flags_time),
    variation!(20, 1, Counter, false, 5, counter32_flags),
    variation!(20, 2, Counter, false, 3, counter16_flags),
    variation!(20, 5, Counter, false, 4, counter32),
    variation!(20, 6, Counter, false, 2, counter16),
    variation!(21, 1, FrozenCounter, false, 5, counter32_flags),
    variation!(21, 2, FrozenCounter, false, 3, counter16_flags),
    variation!(21, 5, FrozenCounter, false, 11, counter32_flags_time),
    variation!(21, 6, FrozenCounter, false, 9, counter16_flags_time),
    variation!(21, 9, FrozenCounter, false, 4, counter32),
    variation!(21, 10, FrozenCounter, false, 2, counter16),
    variation!(22, 1, Counter, true, 5, counter32_flags),
    variation!(22, 2, Counter, true, 3, counter16_flags),
    variation!(22, 5, Counter, true, 11, counter32_flags_time),
    variation!(22, 6, Counter, true, 9, counter16_flags_time),
    variation!(23, 1, FrozenCounter, true, 5, counter32_flags),
    variation!(23, 2, FrozenCounter, true, 3, counter16_flags),
    variation!(23, 5, FrozenCounter, true, 11, counter32_flags_time),
    variation!(23, 6, FrozenCounter, true, 9, counter16_flags_time),
    variation!(30, 1, AnalogInput, false, 5, analog32_flags),
    variation!(30, 2, AnalogInput, false, 3, analog16_flags),
    variation!(30, 3, AnalogInput, false, 4, analog32),
    variation!(30, 4, AnalogInput, false, 2, analog16),
    variation!(30, 5, AnalogInput, false, 5, float32_flags),
    variation!(30, 6, AnalogInput, false, 9, float64_flags),
    variation!(32, 1, AnalogInput, true, 5, analog32_flags),
    variation!(32, 2, AnalogInput, true, 3, analog16_flags),
    variation!(32, 3, AnalogInput, true, 11, analog32_flags_time),
    variation!(32, 4, AnalogInput, true, 9, analog16_flags_time),
    variation!(32, 5, AnalogInput, true, 5, float32_flags),
    variation!(32, 6, AnalogInput, true, 9, float64_flags),
    variation!(32, 7, AnalogInput, true, 11, float32_flags_time),
    variation!(32, 8, AnalogInput, true, 15, float64_flags_time),
    variation!(40, 1, AnalogOutput, false, 5, analog32_flags),
    variation!(40, 2, AnalogOutput, false, 3, analog16_flags),
    variation!(40, 3, AnalogOutput, false, 5, float32_flags),
    variation!(40, 4, AnalogOutput, false, 9, float64_flags),
    variation!(42, 1, AnalogOutput, true, 5, analog32_flags),
    variation!(42, 2, AnalogOutput, true, 3, analog16_flags),
    variation!(42, 3, AnalogOutput, true, 11, analog32_flags_time),
    variation!(42, 4, AnalogOutput, true, 9, analog16_flags_time),
    variation!(42, 5, AnalogOutput, true, 5, float32_flags),
    variation!(42, 6, AnalogOutput, true, 9, float64_flags),
    variation!(42, 7, AnalogOutput, true, 11, float32_flags_time),
    variation!(42, 8, AnalogOutput, true, 15, float64_flags_time),
    // internal indications, reported as packed binary states
    variation!(80, 1, BinaryInput, false, bits 1),
];
