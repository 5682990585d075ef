//! Point values and control commands exchanged with the database

use dnp3_core::{CommandStatus, DnpTime, Flags};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categories of static points the outstation serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PointType {
    BinaryInput,
    DoubleBitInput,
    BinaryOutput,
    Counter,
    FrozenCounter,
    AnalogInput,
    AnalogOutput,
}

impl PointType {
    /// Order in which point types are reported in a class 0 response
    pub const STATIC_ORDER: [PointType; 7] = [
        PointType::BinaryInput,
        PointType::DoubleBitInput,
        PointType::BinaryOutput,
        PointType::Counter,
        PointType::FrozenCounter,
        PointType::AnalogInput,
        PointType::AnalogOutput,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BinaryInput => "binary input",
            Self::DoubleBitInput => "double-bit input",
            Self::BinaryOutput => "binary output",
            Self::Counter => "counter",
            Self::FrozenCounter => "frozen counter",
            Self::AnalogInput => "analog input",
            Self::AnalogOutput => "analog output",
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary input value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Binary {
    pub value: bool,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl Binary {
    pub fn new(value: bool, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// Double-bit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DoubleBit {
    #[default]
    Intermediate = 0,
    DeterminedOff = 1,
    DeterminedOn = 2,
    Indeterminate = 3,
}

impl DoubleBit {
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Double-bit binary input value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoubleBitBinary {
    pub value: DoubleBit,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl DoubleBitBinary {
    pub fn new(value: DoubleBit, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// Binary output status value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BinaryOutputStatus {
    pub value: bool,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl BinaryOutputStatus {
    pub fn new(value: bool, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// Running counter value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Counter {
    pub value: u32,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl Counter {
    pub fn new(value: u32, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// Frozen counter value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrozenCounter {
    pub value: u32,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl FrozenCounter {
    pub fn new(value: u32, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// Analog input value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Analog {
    pub value: f64,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl Analog {
    pub fn new(value: f64, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// Analog output status value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalogOutputStatus {
    pub value: f64,
    pub flags: Flags,
    pub time: Option<DnpTime>,
}

impl AnalogOutputStatus {
    pub fn new(value: f64, flags: Flags) -> Self {
        Self { value, flags, time: None }
    }
}

/// A value of any point type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Binary(Binary),
    DoubleBit(DoubleBitBinary),
    BinaryOutput(BinaryOutputStatus),
    Counter(Counter),
    FrozenCounter(FrozenCounter),
    Analog(Analog),
    AnalogOutput(AnalogOutputStatus),
}

impl Measurement {
    pub fn point_type(&self) -> PointType {
        match self {
            Self::Binary(_) => PointType::BinaryInput,
            Self::DoubleBit(_) => PointType::DoubleBitInput,
            Self::BinaryOutput(_) => PointType::BinaryOutput,
            Self::Counter(_) => PointType::Counter,
            Self::FrozenCounter(_) => PointType::FrozenCounter,
            Self::Analog(_) => PointType::AnalogInput,
            Self::AnalogOutput(_) => PointType::AnalogOutput,
        }
    }

    pub fn flags(&self) -> Flags {
        match self {
            Self::Binary(v) => v.flags,
            Self::DoubleBit(v) => v.flags,
            Self::BinaryOutput(v) => v.flags,
            Self::Counter(v) => v.flags,
            Self::FrozenCounter(v) => v.flags,
            Self::Analog(v) => v.flags,
            Self::AnalogOutput(v) => v.flags,
        }
    }

    pub fn time(&self) -> Option<DnpTime> {
        match self {
            Self::Binary(v) => v.time,
            Self::DoubleBit(v) => v.time,
            Self::BinaryOutput(v) => v.time,
            Self::Counter(v) => v.time,
            Self::FrozenCounter(v) => v.time,
            Self::Analog(v) => v.time,
            Self::AnalogOutput(v) => v.time,
        }
    }

    /// Stamp the value with `time` if it carries none
    pub fn stamp(&mut self, time: DnpTime) {
        let slot = match self {
            Self::Binary(v) => &mut v.time,
            Self::DoubleBit(v) => &mut v.time,
            Self::BinaryOutput(v) => &mut v.time,
            Self::Counter(v) => &mut v.time,
            Self::FrozenCounter(v) => &mut v.time,
            Self::Analog(v) => &mut v.time,
            Self::AnalogOutput(v) => &mut v.time,
        };
        slot.get_or_insert(time);
    }

    /// Flags byte with the binary state merged into the upper bits
    pub fn flags_with_state(&self) -> u8 {
        let flags = self.flags().bits();
        match self {
            Self::Binary(v) if v.value => flags | 0x80,
            Self::BinaryOutput(v) if v.value => flags | 0x80,
            Self::Binary(_) | Self::BinaryOutput(_) => flags & 0x7F,
            Self::DoubleBit(v) => (flags & 0x3F) | (v.value.bits() << 6),
            _ => flags,
        }
    }

    /// State bits used by packed variations
    pub fn packed_state(&self) -> u8 {
        match self {
            Self::Binary(v) => v.value as u8,
            Self::BinaryOutput(v) => v.value as u8,
            Self::DoubleBit(v) => v.value.bits(),
            _ => 0,
        }
    }

    /// Numeric value for counters and analogs
    pub fn numeric(&self) -> f64 {
        match self {
            Self::Counter(v) => v.value as f64,
            Self::FrozenCounter(v) => v.value as f64,
            Self::Analog(v) => v.value,
            Self::AnalogOutput(v) => v.value,
            Self::Binary(_) | Self::DoubleBit(_) | Self::BinaryOutput(_) => {
                self.packed_state() as f64
            }
        }
    }

    /// Counter value, if this is a counter
    pub fn counter_value(&self) -> Option<u32> {
        match self {
            Self::Counter(v) => Some(v.value),
            Self::FrozenCounter(v) => Some(v.value),
            _ => None,
        }
    }
}

macro_rules! impl_from_value {
    ($($value:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$value> for Measurement {
                fn from(value: $value) -> Self {
                    Measurement::$variant(value)
                }
            }
        )*
    };
}

impl_from_value!(
    Binary => Binary,
    DoubleBitBinary => DoubleBit,
    BinaryOutputStatus => BinaryOutput,
    Counter => Counter,
    FrozenCounter => FrozenCounter,
    Analog => Analog,
    AnalogOutputStatus => AnalogOutput,
);

/// Operation requested by a control relay output block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Nul,
    PulseOn,
    PulseOff,
    LatchOn,
    LatchOff,
    Unknown(u8),
}

impl OpType {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0 => Self::Nul,
            1 => Self::PulseOn,
            2 => Self::PulseOff,
            3 => Self::LatchOn,
            4 => Self::LatchOff,
            other => Self::Unknown(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Nul => 0,
            Self::PulseOn => 1,
            Self::PulseOff => 2,
            Self::LatchOn => 3,
            Self::LatchOff => 4,
            Self::Unknown(bits) => bits & 0x0F,
        }
    }
}

/// Trip/close pairing code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCloseCode {
    Nul,
    Close,
    Trip,
    Reserved,
}

impl TripCloseCode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Nul,
            1 => Self::Close,
            2 => Self::Trip,
            _ => Self::Reserved,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Nul => 0,
            Self::Close => 1,
            Self::Trip => 2,
            Self::Reserved => 3,
        }
    }
}

/// Control code byte of a CROB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlCode {
    pub tcc: TripCloseCode,
    pub clear: bool,
    pub queue: bool,
    pub op_type: OpType,
}

impl ControlCode {
    pub fn from_op_type(op_type: OpType) -> Self {
        Self {
            tcc: TripCloseCode::Nul,
            clear: false,
            queue: false,
            op_type,
        }
    }

    pub fn from_u8(byte: u8) -> Self {
        Self {
            tcc: TripCloseCode::from_bits(byte >> 6),
            clear: byte & 0x20 != 0,
            queue: byte & 0x10 != 0,
            op_type: OpType::from_bits(byte),
        }
    }

    pub fn to_u8(&self) -> u8 {
        let mut byte = (self.tcc.bits() << 6) | self.op_type.bits();
        if self.clear {
            byte |= 0x20;
        }
        if self.queue {
            byte |= 0x10;
        }
        byte
    }
}

/// Control relay output block (group 12 variation 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crob {
    pub code: ControlCode,
    pub count: u8,
    pub on_time: u32,
    pub off_time: u32,
    pub status: CommandStatus,
}

impl Crob {
    pub fn new(op_type: OpType) -> Self {
        Self {
            code: ControlCode::from_op_type(op_type),
            count: 1,
            on_time: 0,
            off_time: 0,
            status: CommandStatus::Success,
        }
    }
}

/// Value carried by an analog output block (group 41 variations 1-4)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalogOutputValue {
    I32(i32),
    I16(i16),
    F32(f32),
    F64(f64),
}

impl AnalogOutputValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::I32(v) => *v as f64,
            Self::I16(v) => *v as f64,
            Self::F32(v) => *v as f64,
            Self::F64(v) => *v,
        }
    }
}

/// Analog output block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogOutputCommand {
    pub value: AnalogOutputValue,
    pub status: CommandStatus,
}

impl AnalogOutputCommand {
    pub fn new(value: AnalogOutputValue) -> Self {
        Self {
            value,
            status: CommandStatus::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_code_round_trip() {
        let code = ControlCode::from_u8(0x43);
        assert_eq!(code.tcc, TripCloseCode::Close);
        assert_eq!(code.op_type, OpType::LatchOn);
        assert!(!code.clear);
        assert_eq!(code.to_u8(), 0x43);
    }

    #[test]
    fn test_flags_with_state() {
        let on = Measurement::from(Binary::new(true, Flags::ONLINE));
        assert_eq!(on.flags_with_state(), 0x81);
        let dbl = Measurement::from(DoubleBitBinary::new(DoubleBit::DeterminedOn, Flags::ONLINE));
        assert_eq!(dbl.flags_with_state(), 0x81);
        let analog = Measurement::from(Analog::new(1.5, Flags::ONLINE));
        assert_eq!(analog.flags_with_state(), 0x01);
    }

    #[test]
    fn test_stamp_keeps_existing_time() {
        let mut value = Measurement::from(Counter {
            value: 1,
            flags: Flags::ONLINE,
            time: Some(DnpTime::from_millis(5)),
        });
        value.stamp(DnpTime::from_millis(10));
        assert_eq!(value.time(), Some(DnpTime::from_millis(5)));
    }
}
