//! Event buffer shared by all point types
//!
//! Events are kept in arrival order. Each event records whether it is
//! waiting to be reported, or has been reported in a solicited or an
//! unsolicited response that is not yet confirmed.

use dnp3_application::Variation;
use dnp3_core::{ClassMask, EventClass, Iin};
use dnp3_database::{Measurement, PointType};
use std::collections::VecDeque;

/// Reporting state of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventState {
    #[default]
    Unsent,
    SentSolicited,
    SentUnsolicited,
}

/// One buffered event
#[derive(Debug, Clone)]
pub struct Event {
    pub point_type: PointType,
    pub index: u16,
    pub class: EventClass,
    pub value: Measurement,
    /// Variation used when the request does not name one
    pub variation: &'static Variation,
    pub state: EventState,
}

/// Filter applied when gathering events for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSelector {
    pub classes: ClassMask,
    pub point_type: Option<PointType>,
}

impl EventSelector {
    pub fn classes(classes: ClassMask) -> Self {
        Self {
            classes,
            point_type: None,
        }
    }

    pub fn point_type(point_type: PointType) -> Self {
        Self {
            classes: ClassMask::EVENTS,
            point_type: Some(point_type),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.classes.contains(event.class.mask())
            && self.point_type.is_none_or(|pt| pt == event.point_type)
    }
}

/// Bounded event queue
///
/// Capacity applies per point type. When a type is full its oldest event is
/// dropped and the overflow indication latches until every type is below
/// capacity again.
///
/// # Event States
/// Each event is `Unsent` until written into a response. It is then marked
/// as sent by a read or by an unsolicited response, and removed only when
/// that response is confirmed. A response that is never confirmed returns
/// its events to `Unsent` through `revert`.
///
/// # Usage
/// ```rust,ignore
/// let mut buffer = EventBuffer::new(100);
/// buffer.push(event);
/// for event in buffer.unsent_mut(EventSelector::classes(ClassMask::CLASS_1)) {
///     event.state = EventState::SentSolicited;
/// }
/// buffer.confirm(EventState::SentSolicited);
/// ```
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    capacity: usize,
    overflow: bool,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            overflow: false,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflow
    }

    fn count_of(&self, point_type: PointType) -> usize {
        self.events.iter().filter(|e| e.point_type == point_type).count()
    }

    /// Queue an event
    ///
    /// # Returns
    /// `true` if an older event had to be dropped to make room
    pub fn push(&mut self, event: Event) -> bool {
        let mut dropped = false;
        if self.count_of(event.point_type) >= self.capacity {
            if let Some(pos) = self
                .events
                .iter()
                .position(|e| e.point_type == event.point_type)
            {
                self.events.remove(pos);
            }
            self.overflow = true;
            dropped = true;
        }
        self.events.push_back(event);
        dropped
    }

    /// Number of unsent events in `class`
    pub fn unsent_count(&self, class: EventClass) -> usize {
        self.events
            .iter()
            .filter(|e| e.state == EventState::Unsent && e.class == class)
            .count()
    }

    /// Unsent events matching `selector`, oldest first
    pub fn unsent_mut(&mut self, selector: EventSelector) -> impl Iterator<Item = &mut Event> {
        self.events
            .iter_mut()
            .filter(move |e| e.state == EventState::Unsent && selector.matches(e))
    }

    /// Remove events confirmed in a response of the given kind
    pub fn confirm(&mut self, state: EventState) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.state != state);
        let removed = before - self.events.len();
        if self.overflow
            && PointType::STATIC_ORDER
                .iter()
                .all(|pt| self.count_of(*pt) < self.capacity)
        {
            self.overflow = false;
        }
        removed
    }

    /// Return events of the given kind to the unsent state
    pub fn revert(&mut self, state: EventState) {
        for event in self.events.iter_mut().filter(|e| e.state == state) {
            event.state = EventState::Unsent;
        }
    }

    /// Class IIN bits for unsent events plus the overflow indication
    pub fn iin(&self) -> Iin {
        let mut iin = Iin::empty();
        for class in EventClass::ALL {
            if self
                .events
                .iter()
                .any(|e| e.state == EventState::Unsent && e.class == class)
            {
                iin.insert(class_iin(class));
            }
        }
        if self.overflow {
            iin.insert(Iin::EVENT_BUFFER_OVERFLOW);
        }
        iin
    }
}

const fn class_iin(class: EventClass) -> Iin {
    match class {
        EventClass::Class1 => Iin::CLASS_1_EVENTS,
        EventClass::Class2 => Iin::CLASS_2_EVENTS,
        EventClass::Class3 => Iin::CLASS_3_EVENTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnp3_core::Flags;
    use dnp3_database::{Analog, Binary};

    fn binary(index: u16, class: EventClass) -> Event {
        let value = Measurement::from(Binary::new(true, Flags::ONLINE));
        Event {
            point_type: PointType::BinaryInput,
            index,
            class,
            value,
            variation: Variation::resolve_event(PointType::BinaryInput, 0).unwrap(),
            state: EventState::Unsent,
        }
    }

    #[test]
    fn test_overflow_drops_oldest_of_type() {
        let mut buffer = EventBuffer::new(2);
        assert!(!buffer.push(binary(0, EventClass::Class1)));
        assert!(!buffer.push(binary(1, EventClass::Class1)));
        assert!(buffer.push(binary(2, EventClass::Class1)));
        assert_eq!(buffer.len(), 2);
        assert!(buffer.is_overflowed());
        assert!(buffer.iin().contains(Iin::EVENT_BUFFER_OVERFLOW));
        let first = buffer.unsent_mut(EventSelector::classes(ClassMask::EVENTS)).next();
        assert_eq!(first.map(|e| e.index), Some(1));
    }

    #[test]
    fn test_overflow_clears_after_confirm() {
        let mut buffer = EventBuffer::new(1);
        buffer.push(binary(0, EventClass::Class1));
        buffer.push(binary(1, EventClass::Class1));
        for event in buffer.unsent_mut(EventSelector::classes(ClassMask::EVENTS)) {
            event.state = EventState::SentSolicited;
        }
        assert_eq!(buffer.confirm(EventState::SentSolicited), 1);
        assert!(!buffer.is_overflowed());
    }

    #[test]
    fn test_class_iin_and_revert() {
        let mut buffer = EventBuffer::new(10);
        buffer.push(binary(0, EventClass::Class2));
        let analog = Event {
            point_type: PointType::AnalogInput,
            index: 3,
            class: EventClass::Class3,
            value: Measurement::from(Analog::new(1.0, Flags::ONLINE)),
            variation: Variation::resolve_event(PointType::AnalogInput, 0).unwrap(),
            state: EventState::Unsent,
        };
        buffer.push(analog);
        let iin = buffer.iin();
        assert!(iin.contains(Iin::CLASS_2_EVENTS));
        assert!(iin.contains(Iin::CLASS_3_EVENTS));
        assert!(!iin.contains(Iin::CLASS_1_EVENTS));

        for event in buffer.unsent_mut(EventSelector::point_type(PointType::AnalogInput)) {
            event.state = EventState::SentUnsolicited;
        }
        assert_eq!(buffer.unsent_count(EventClass::Class3), 0);
        buffer.revert(EventState::SentUnsolicited);
        assert_eq!(buffer.unsent_count(EventClass::Class3), 1);
    }
}
