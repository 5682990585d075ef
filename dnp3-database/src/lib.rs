//! Point database interface for the DNP3 outstation
//!
//! The outstation core never owns point data. It reads and writes points,
//! queries quantities and configuration, and executes controls through the
//! capability traits defined here. A backend implements [`Database`] and
//! returns the per-category capability objects it supports; categories it
//! leaves as `None` are reported to the master as unsupported.

pub mod types;
pub mod traits;
pub mod access;
pub mod memory;

pub use types::{
    Analog, AnalogOutputCommand, AnalogOutputStatus, AnalogOutputValue, Binary,
    BinaryOutputStatus, ControlCode, Counter, Crob, DoubleBit, DoubleBitBinary, FrozenCounter,
    Measurement, OpType, PointType, TripCloseCode,
};
pub use traits::{ActivationStatus, ControlPoints, Database, StaticPoints};
pub use access::PointAccess;
pub use memory::{ControlRecorder, MemoryDatabase, PointRecord, PointTable};
