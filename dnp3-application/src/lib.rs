//! Application layer for the DNP3 outstation
//!
//! This crate provides:
//! - Application header parsing and encoding
//! - Object header parsing with point enumeration
//! - Encoders for the supported object groups and variations
//! - The response fragment builder
//! - The object dispatch registry consulted by the session

pub mod header;
pub mod parse;
pub mod objects;
pub mod controls;
pub mod builder;
pub mod dispatch;

pub use header::{confirm_fragment, RequestHeader, ResponseHeader, REQUEST_HEADER_SIZE, RESPONSE_HEADER_SIZE};
pub use parse::{parse_header, HeaderRange, ObjectHeader, ObjectSize, PointRef};
pub use objects::{PointSize, Variation};
pub use controls::{
    analog_output_size, decode_analog_output, decode_crob, encode_analog_output, encode_crob,
    CROB_SIZE,
};
pub use builder::{FragmentBuilder, MIN_FRAGMENT_SIZE};
pub use dispatch::{
    ControlEntry, ControlKind, ObjectKey, ObjectRegistry, ReadEntry, ReadHandler, ReadPass,
    SizeCheck, VariationKey, WriteHandler, REGISTRY,
};
