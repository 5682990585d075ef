//! Core types and utilities for the DNP3 outstation stack
//!
//! This crate provides the protocol constants shared by every layer of the
//! outstation: application control bytes, function codes, internal
//! indications, qualifiers, event classes, control status codes, DNP3 time,
//! point quality flags and the common error type.

pub mod error;
pub mod control;
pub mod function;
pub mod iin;
pub mod qualifier;
pub mod class;
pub mod status;
pub mod datatypes;
pub mod address;

pub use error::{Dnp3Error, Dnp3Result};
pub use control::{AppControl, Sequence};
pub use function::{FunctionCode, FunctionCodeMask};
pub use iin::Iin;
pub use qualifier::QualifierCode;
pub use class::{ClassMask, EventClass};
pub use status::CommandStatus;
pub use datatypes::{DnpTime, Flags};
pub use address::BroadcastKind;
