//! Capability traits implemented by a point database
//!
//! Each point category is exposed through a [`StaticPoints`] object and each
//! control category through a [`ControlPoints`] object. A [`Database`]
//! returns `None` for categories it does not support; the outstation then
//! reports the corresponding objects as unknown.

use crate::types::{
    Analog, AnalogOutputCommand, AnalogOutputStatus, Binary, BinaryOutputStatus, Counter, Crob,
    DoubleBitBinary, FrozenCounter,
};
use dnp3_core::{ClassMask, CommandStatus, DnpTime, Dnp3Result, EventClass, FunctionCode, Iin};
use std::time::Duration;

/// Read and configuration access to one category of static points
///
/// Variation queries return `0` to request the category default.
pub trait StaticPoints<V>: Send {
    /// Number of points in the category
    fn quantity(&self) -> u16;

    /// Whether the point at `index` exists and can be reported
    fn is_enabled(&self, index: u16) -> bool {
        index < self.quantity()
    }

    /// Current value of the point at `index`
    fn read(&self, index: u16) -> Option<V>;

    /// Event class the point is assigned to
    fn event_class(&self, _index: u16) -> ClassMask {
        ClassMask::NONE
    }

    /// Move the point to another event class
    ///
    /// # Returns
    /// `false` if the database does not allow reassignment
    fn assign_class(&mut self, _index: u16, _class: ClassMask) -> bool {
        false
    }

    /// Whether the point is reported in class 0 responses
    fn in_class0(&self, _index: u16) -> bool {
        true
    }

    fn default_variation(&self, _index: u16) -> u8 {
        0
    }

    fn event_default_variation(&self, _index: u16, _class: EventClass) -> u8 {
        0
    }

    /// Value of the point if it changed since the last scan
    ///
    /// Polled by the periodic event scan. Returning `Some` clears the
    /// changed condition.
    fn changed(&mut self, _index: u16) -> Option<V> {
        None
    }
}

/// Select/operate access to one category of outputs
pub trait ControlPoints<C>: Send {
    /// Whether the output at `index` accepts `command`
    fn supports(&self, _index: u16, _command: &C) -> bool {
        true
    }

    fn select(&mut self, index: u16, command: &C) -> CommandStatus;

    fn operate(&mut self, index: u16, command: &C) -> CommandStatus;

    /// A pending selection was abandoned
    fn cancel_select(&mut self) {}
}

/// Result of an ACTIVATE_CONFIG request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationStatus {
    /// Time before the new configuration takes effect, in milliseconds
    pub delay_ms: u32,
    pub status_code: u8,
    /// Additional status text length echoed back, always zero here
    pub text_len: u8,
}

/// Point database consumed by one outstation session
///
/// Every method has a neutral default so a backend only implements the
/// categories and hooks it needs.
pub trait Database: Send {
    /// Called when the session is opened
    fn open(&mut self) -> Dnp3Result<()> {
        Ok(())
    }

    /// Called when the session is closed
    fn close(&mut self) {}

    fn binary_inputs(&mut self) -> Option<&mut dyn StaticPoints<Binary>> {
        None
    }

    fn double_bit_inputs(&mut self) -> Option<&mut dyn StaticPoints<DoubleBitBinary>> {
        None
    }

    fn binary_outputs(&mut self) -> Option<&mut dyn StaticPoints<BinaryOutputStatus>> {
        None
    }

    fn counters(&mut self) -> Option<&mut dyn StaticPoints<Counter>> {
        None
    }

    fn frozen_counters(&mut self) -> Option<&mut dyn StaticPoints<FrozenCounter>> {
        None
    }

    fn analog_inputs(&mut self) -> Option<&mut dyn StaticPoints<Analog>> {
        None
    }

    fn analog_outputs(&mut self) -> Option<&mut dyn StaticPoints<AnalogOutputStatus>> {
        None
    }

    fn binary_output_controls(&mut self) -> Option<&mut dyn ControlPoints<Crob>> {
        None
    }

    fn analog_output_controls(&mut self) -> Option<&mut dyn ControlPoints<AnalogOutputCommand>> {
        None
    }

    /// Bracketing notification around request processing
    ///
    /// Called with `in_progress = true` before a request is handled and with
    /// `false` once it is done.
    fn func_code(&mut self, _function: FunctionCode, _in_progress: bool) {}

    /// Bracketing notification around a read that reports events and statics
    fn event_and_static_read(&mut self, _in_progress: bool) {}

    /// Unsolicited reporting was enabled or disabled for a set of classes
    fn unsol_event_mask(&mut self, _mask: ClassMask) {}

    /// IIN bits owned by the application
    fn iin(&self) -> Iin {
        Iin::empty()
    }

    /// Number of IIN bits reported by a group 80 read
    fn iin_quantity(&self) -> u16 {
        Iin::BIT_COUNT
    }

    /// State of one application-defined IIN bit beyond the standard sixteen
    fn iin_read(&self, _index: u16) -> bool {
        false
    }

    /// Set the device clock
    ///
    /// # Returns
    /// `false` if the clock cannot be written
    fn write_time(&mut self, _time: DnpTime) -> bool {
        false
    }

    /// Begin a cold restart, returning the time until the device is ready
    fn cold_restart(&mut self) -> Option<Duration> {
        None
    }

    /// Begin a warm restart, returning the time until the device is ready
    fn warm_restart(&mut self) -> Option<Duration> {
        None
    }

    /// Freeze the counter at `index`, clearing it afterwards if `clear`
    fn freeze_counter(&mut self, _index: u16, _clear: bool) -> bool {
        false
    }

    /// Activate a configuration described by the request's object data
    fn activate_config(&mut self, _objects: &[u8]) -> Option<ActivationStatus> {
        None
    }
}
