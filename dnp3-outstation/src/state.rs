//! Sub-states composed into a session

use crate::timer::Timer;
use bytes::Bytes;
use dnp3_application::REQUEST_HEADER_SIZE;
use dnp3_core::{ClassMask, Sequence};

/// Read pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadPass {
    /// Explicit event objects and class scans
    #[default]
    Events,
    /// Events of the classes requested by class scans
    Classes,
    /// Explicit static objects
    Static,
    /// Class 0 static data
    Class0,
}

impl ReadPass {
    /// Following pass, `None` after the last
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Events => Some(Self::Classes),
            Self::Classes => Some(Self::Static),
            Self::Static => Some(Self::Class0),
            Self::Class0 => None,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Outcome of running a read pass into a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Complete,
    /// The fragment filled before the pass finished
    MoreData,
    Failed,
}

/// Cursor of a read that spans fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadState {
    /// A read has fragments left to send
    pub active: bool,
    pub pass: ReadPass,
    /// Offset of the object header the pass resumes at
    pub offset: usize,
    /// Points already written from the header at `offset`
    pub point_index: usize,
    /// Static group position during the class 0 pass
    pub group_index: usize,
    /// Classes requested by group 60 headers
    pub class_mask: ClassMask,
    /// Count limits of limited-quantity class scans
    pub class_limits: [Option<usize>; 3],
    /// Events written per class during the class pass
    pub class_sent: [usize; 3],
    /// Next fragment is the first of the response
    pub first: bool,
}

impl Default for ReadState {
    fn default() -> Self {
        Self {
            active: false,
            pass: ReadPass::Events,
            offset: REQUEST_HEADER_SIZE,
            point_index: 0,
            group_index: 0,
            class_mask: ClassMask::NONE,
            class_limits: [None; 3],
            class_sent: [0; 3],
            first: true,
        }
    }
}

impl ReadState {
    /// Reset the cursor for a new read
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move to the next pass, rewinding to the first object header
    pub fn advance(&mut self) -> bool {
        self.offset = REQUEST_HEADER_SIZE;
        self.point_index = 0;
        self.group_index = 0;
        match self.pass.next() {
            Some(pass) => {
                self.pass = pass;
                true
            }
            None => false,
        }
    }
}

/// Record of the last executed OPERATE, used to echo duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperateRecord {
    pub seq: Sequence,
    pub objects: Bytes,
    pub response: Bytes,
}

/// Select buffer and timer
#[derive(Debug, Clone, Default)]
pub struct SelectState {
    /// Object portion of the last accepted SELECT
    pub objects: Option<Bytes>,
    pub seq: Sequence,
    /// Response sent to that SELECT, replayed for duplicates
    pub response: Option<Bytes>,
    pub timer: Timer,
    /// The select timer fired before an OPERATE arrived
    pub expired: bool,
    pub last_operate: Option<OperateRecord>,
}

impl SelectState {
    pub fn is_pending(&self) -> bool {
        self.objects.is_some()
    }

    pub fn clear(&mut self) {
        self.objects = None;
        self.response = None;
        self.expired = false;
        self.timer.cancel();
    }
}

/// Unsolicited response state
#[derive(Debug, Clone, Default)]
pub struct UnsolicitedState {
    /// Classes the master enabled for unsolicited reporting
    pub enabled: ClassMask,
    /// The initial null response has been confirmed
    pub null_confirmed: bool,
    pub seq: Sequence,
    pub awaiting_confirm: bool,
    /// Failed attempts since the last confirm
    pub retries: u32,
    /// Retries use the offline delay
    pub offline: bool,
    /// Retrying stopped until the session is restarted or re-enabled
    pub halted: bool,
    pub confirm_timer: Timer,
    pub retry_timer: Timer,
    /// Per-class delay since the first pending event
    pub class_timers: [Timer; 3],
    /// Classes whose delay timer fired with events still pending
    pub class_due: [bool; 3],
    /// Last sent fragment, kept for identical retries
    pub last_fragment: Option<Bytes>,
}

impl UnsolicitedState {
    /// Reset the retry bookkeeping after a confirm
    pub fn confirmed(&mut self) {
        self.awaiting_confirm = false;
        self.null_confirmed = true;
        self.retries = 0;
        self.offline = false;
        self.halted = false;
        self.confirm_timer.cancel();
        self.retry_timer.cancel();
        self.last_fragment = None;
        self.seq.increment();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pass_order() {
        let mut read = ReadState::default();
        read.offset = 9;
        read.point_index = 4;
        assert!(read.advance());
        assert_eq!(read.pass, ReadPass::Classes);
        assert_eq!(read.offset, REQUEST_HEADER_SIZE);
        assert_eq!(read.point_index, 0);
        assert!(read.advance());
        assert!(read.advance());
        assert_eq!(read.pass, ReadPass::Class0);
        assert!(!read.advance());
        assert!(ReadPass::Events < ReadPass::Class0);
    }

    #[test]
    fn test_select_clear() {
        let mut select = SelectState {
            objects: Some(Bytes::from_static(&[12, 1])),
            expired: true,
            ..Default::default()
        };
        assert!(select.is_pending());
        select.clear();
        assert!(!select.is_pending());
        assert!(!select.expired);
    }
}
