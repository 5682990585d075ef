//! In-memory database backend
//!
//! Keeps every point in a `Vec` and records control and hook activity so
//! callers can inspect what the outstation asked of the database.

use crate::traits::{ActivationStatus, ControlPoints, Database, StaticPoints};
use crate::types::{
    Analog, AnalogOutputCommand, AnalogOutputStatus, Binary, BinaryOutputStatus, Counter, Crob,
    DoubleBitBinary, FrozenCounter,
};
use dnp3_core::{ClassMask, CommandStatus, DnpTime, Dnp3Result, EventClass, FunctionCode, Iin};
use std::time::Duration;

/// One stored point with its configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord<V> {
    pub value: V,
    pub class: ClassMask,
    pub enabled: bool,
    pub in_class0: bool,
    pub static_variation: u8,
    pub event_variation: u8,
    pub changed: bool,
}

impl<V> PointRecord<V> {
    pub fn new(value: V, class: ClassMask) -> Self {
        Self {
            value,
            class,
            enabled: true,
            in_class0: true,
            static_variation: 0,
            event_variation: 0,
            changed: false,
        }
    }
}

/// Table of points of one category
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable<V> {
    records: Vec<PointRecord<V>>,
}

impl<V> Default for PointTable<V> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<V: Clone> PointTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point and return its index
    pub fn add(&mut self, value: V, class: ClassMask) -> u16 {
        self.records.push(PointRecord::new(value, class));
        (self.records.len() - 1) as u16
    }

    pub fn record(&self, index: u16) -> Option<&PointRecord<V>> {
        self.records.get(index as usize)
    }

    pub fn record_mut(&mut self, index: u16) -> Option<&mut PointRecord<V>> {
        self.records.get_mut(index as usize)
    }

    /// Store a new value and flag the point as changed
    pub fn update(&mut self, index: u16, value: V) -> bool {
        match self.records.get_mut(index as usize) {
            Some(record) => {
                record.value = value;
                record.changed = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<V: Clone + Send> StaticPoints<V> for PointTable<V> {
    fn quantity(&self) -> u16 {
        self.records.len().min(u16::MAX as usize) as u16
    }

    fn is_enabled(&self, index: u16) -> bool {
        self.record(index).is_some_and(|r| r.enabled)
    }

    fn read(&self, index: u16) -> Option<V> {
        self.record(index).map(|r| r.value.clone())
    }

    fn event_class(&self, index: u16) -> ClassMask {
        self.record(index).map_or(ClassMask::NONE, |r| r.class)
    }

    fn assign_class(&mut self, index: u16, class: ClassMask) -> bool {
        match self.record_mut(index) {
            Some(record) => {
                record.class = class;
                true
            }
            None => false,
        }
    }

    fn in_class0(&self, index: u16) -> bool {
        self.record(index).is_some_and(|r| r.in_class0)
    }

    fn default_variation(&self, index: u16) -> u8 {
        self.record(index).map_or(0, |r| r.static_variation)
    }

    fn event_default_variation(&self, index: u16, _class: EventClass) -> u8 {
        self.record(index).map_or(0, |r| r.event_variation)
    }

    fn changed(&mut self, index: u16) -> Option<V> {
        let record = self.record_mut(index)?;
        if record.changed {
            record.changed = false;
            Some(record.value.clone())
        } else {
            None
        }
    }
}

/// Control category that records every select, operate and cancel
#[derive(Debug, Clone)]
pub struct ControlRecorder<C> {
    pub quantity: u16,
    /// Status returned for every select and operate
    pub status: CommandStatus,
    pub selects: Vec<(u16, C)>,
    pub operates: Vec<(u16, C)>,
    pub cancels: usize,
}

impl<C> ControlRecorder<C> {
    pub fn new(quantity: u16) -> Self {
        Self {
            quantity,
            status: CommandStatus::Success,
            selects: Vec::new(),
            operates: Vec::new(),
            cancels: 0,
        }
    }
}

impl<C: Clone + Send> ControlPoints<C> for ControlRecorder<C> {
    fn supports(&self, index: u16, _command: &C) -> bool {
        index < self.quantity
    }

    fn select(&mut self, index: u16, command: &C) -> CommandStatus {
        self.selects.push((index, command.clone()));
        self.status
    }

    fn operate(&mut self, index: u16, command: &C) -> CommandStatus {
        self.operates.push((index, command.clone()));
        self.status
    }

    fn cancel_select(&mut self) {
        self.cancels += 1;
    }
}

/// Database held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    pub binary_inputs: PointTable<Binary>,
    pub double_bit_inputs: PointTable<DoubleBitBinary>,
    pub binary_outputs: PointTable<BinaryOutputStatus>,
    pub counters: PointTable<Counter>,
    pub frozen_counters: PointTable<FrozenCounter>,
    pub analog_inputs: PointTable<Analog>,
    pub analog_outputs: PointTable<AnalogOutputStatus>,
    pub crob: ControlRecorder<Crob>,
    pub analog_commands: ControlRecorder<AnalogOutputCommand>,
    /// Application IIN bits
    pub iin: Iin,
    /// Last time written by the master
    pub time: Option<DnpTime>,
    /// Delay reported on restart, `None` rejects restarts
    pub restart_delay: Option<Duration>,
    pub restarts: Vec<bool>,
    pub activation: Option<ActivationStatus>,
    pub func_codes: Vec<(FunctionCode, bool)>,
    pub read_brackets: Vec<bool>,
    pub unsol_mask: ClassMask,
    pub is_open: bool,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            binary_inputs: PointTable::new(),
            double_bit_inputs: PointTable::new(),
            binary_outputs: PointTable::new(),
            counters: PointTable::new(),
            frozen_counters: PointTable::new(),
            analog_inputs: PointTable::new(),
            analog_outputs: PointTable::new(),
            crob: ControlRecorder::new(0),
            analog_commands: ControlRecorder::new(0),
            iin: Iin::empty(),
            time: None,
            restart_delay: None,
            restarts: Vec::new(),
            activation: None,
            func_codes: Vec::new(),
            read_brackets: Vec::new(),
            unsol_mask: ClassMask::NONE,
            is_open: false,
        }
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for MemoryDatabase {
    fn open(&mut self) -> Dnp3Result<()> {
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn binary_inputs(&mut self) -> Option<&mut dyn StaticPoints<Binary>> {
        Some(&mut self.binary_inputs)
    }

    fn double_bit_inputs(&mut self) -> Option<&mut dyn StaticPoints<DoubleBitBinary>> {
        Some(&mut self.double_bit_inputs)
    }

    fn binary_outputs(&mut self) -> Option<&mut dyn StaticPoints<BinaryOutputStatus>> {
        Some(&mut self.binary_outputs)
    }

    fn counters(&mut self) -> Option<&mut dyn StaticPoints<Counter>> {
        Some(&mut self.counters)
    }

    fn frozen_counters(&mut self) -> Option<&mut dyn StaticPoints<FrozenCounter>> {
        Some(&mut self.frozen_counters)
    }

    fn analog_inputs(&mut self) -> Option<&mut dyn StaticPoints<Analog>> {
        Some(&mut self.analog_inputs)
    }

    fn analog_outputs(&mut self) -> Option<&mut dyn StaticPoints<AnalogOutputStatus>> {
        Some(&mut self.analog_outputs)
    }

    fn binary_output_controls(&mut self) -> Option<&mut dyn ControlPoints<Crob>> {
        Some(&mut self.crob)
    }

    fn analog_output_controls(&mut self) -> Option<&mut dyn ControlPoints<AnalogOutputCommand>> {
        Some(&mut self.analog_commands)
    }

    fn func_code(&mut self, function: FunctionCode, in_progress: bool) {
        self.func_codes.push((function, in_progress));
    }

    fn event_and_static_read(&mut self, in_progress: bool) {
        self.read_brackets.push(in_progress);
    }

    fn unsol_event_mask(&mut self, mask: ClassMask) {
        self.unsol_mask = mask;
    }

    fn iin(&self) -> Iin {
        self.iin
    }

    fn write_time(&mut self, time: DnpTime) -> bool {
        self.time = Some(time);
        true
    }

    fn cold_restart(&mut self) -> Option<Duration> {
        self.restarts.push(true);
        self.restart_delay
    }

    fn warm_restart(&mut self) -> Option<Duration> {
        self.restarts.push(false);
        self.restart_delay
    }

    fn freeze_counter(&mut self, index: u16, clear: bool) -> bool {
        let Some(counter) = self.counters.read(index) else {
            return false;
        };
        let frozen = FrozenCounter {
            value: counter.value,
            flags: counter.flags,
            time: Some(DnpTime::now()),
        };
        if !self.frozen_counters.update(index, frozen) {
            return false;
        }
        if clear {
            self.counters.update(index, Counter { value: 0, ..counter });
        }
        true
    }

    fn activate_config(&mut self, _objects: &[u8]) -> Option<ActivationStatus> {
        self.activation
    }
}
