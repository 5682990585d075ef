//! Point quality flags

use serde::{Deserialize, Serialize};

/// Quality flags of a measurement
///
/// The upper bits are overloaded per point type: bit 7 carries the state of
/// binary points and bits 6-7 the state of double-bit points when encoded
/// with flags. The state bits are merged in by the encoder, so they are
/// never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Flags(u8);

impl Flags {
    pub const ONLINE: Flags = Flags(0x01);
    pub const RESTART: Flags = Flags(0x02);
    pub const COMM_LOST: Flags = Flags(0x04);
    pub const REMOTE_FORCED: Flags = Flags(0x08);
    pub const LOCAL_FORCED: Flags = Flags(0x10);
    /// Binary inputs: chatter filter
    pub const CHATTER_FILTER: Flags = Flags(0x20);
    /// Counters: rollover
    pub const ROLLOVER: Flags = Flags(0x20);
    /// Analogs: over range
    pub const OVER_RANGE: Flags = Flags(0x20);
    /// Counters: discontinuity, analogs: reference error
    pub const DISCONTINUITY: Flags = Flags(0x40);
    pub const REFERENCE_ERR: Flags = Flags(0x40);

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Flags) -> Self {
        Self(self.0 | other.0)
    }
}
