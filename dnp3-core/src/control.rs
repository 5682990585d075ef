//! Application control byte and sequence numbers

use serde::{Deserialize, Serialize};
use std::fmt;

/// First fragment of a message
pub const FIR: u8 = 0x80;
/// Final fragment of a message
pub const FIN: u8 = 0x40;
/// Application confirmation requested
pub const CON: u8 = 0x20;
/// Unsolicited response (or confirmation of one)
pub const UNS: u8 = 0x10;
/// Sequence number mask
pub const SEQ_MASK: u8 = 0x0F;

/// 4-bit application layer sequence number
///
/// Sequence numbers wrap around at 16. Solicited responses echo the request
/// sequence; unsolicited responses use their own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sequence(u8);

impl Sequence {
    /// Create a sequence number, discarding the upper nibble
    pub const fn new(value: u8) -> Self {
        Self(value & SEQ_MASK)
    }

    /// Raw sequence value (0-15)
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// The sequence number that follows this one
    #[must_use]
    pub const fn next(&self) -> Self {
        Self((self.0 + 1) & SEQ_MASK)
    }

    /// Advance this sequence number in place and return the previous value
    pub fn increment(&mut self) -> Self {
        let current = *self;
        *self = self.next();
        current
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application control byte
///
/// ```text
///  7   6   5   4   3..0
/// FIR FIN CON UNS  SEQ
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppControl {
    pub fir: bool,
    pub fin: bool,
    pub con: bool,
    pub uns: bool,
    pub seq: Sequence,
}

impl AppControl {
    /// Control byte for a single-fragment message
    pub const fn single(seq: Sequence) -> Self {
        Self {
            fir: true,
            fin: true,
            con: false,
            uns: false,
            seq,
        }
    }

    /// Control byte for a single-fragment unsolicited response
    ///
    /// Unsolicited responses always request confirmation.
    pub const fn unsolicited(seq: Sequence) -> Self {
        Self {
            fir: true,
            fin: true,
            con: true,
            uns: true,
            seq,
        }
    }

    /// Decode a control byte
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            fir: byte & FIR != 0,
            fin: byte & FIN != 0,
            con: byte & CON != 0,
            uns: byte & UNS != 0,
            seq: Sequence::new(byte),
        }
    }

    /// Encode this control as a byte
    pub const fn to_byte(&self) -> u8 {
        let mut byte = self.seq.value();
        if self.fir {
            byte |= FIR;
        }
        if self.fin {
            byte |= FIN;
        }
        if self.con {
            byte |= CON;
        }
        if self.uns {
            byte |= UNS;
        }
        byte
    }

    /// Set the CON bit
    #[must_use]
    pub const fn with_confirm(mut self, con: bool) -> Self {
        self.con = con;
        self
    }
}

impl fmt::Display for AppControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[fir: {} fin: {} con: {} uns: {} seq: {}]",
            self.fir as u8, self.fin as u8, self.con as u8, self.uns as u8, self.seq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_wraps() {
        assert_eq!(Sequence::new(15).next(), Sequence::new(0));
        assert_eq!(Sequence::new(0x1F).value(), 0x0F);

        let mut seq = Sequence::new(14);
        assert_eq!(seq.increment().value(), 14);
        assert_eq!(seq.increment().value(), 15);
        assert_eq!(seq.value(), 0);
    }

    #[test]
    fn test_control_byte() {
        let control = AppControl::from_byte(0xC3);
        assert!(control.fir);
        assert!(control.fin);
        assert!(!control.con);
        assert!(!control.uns);
        assert_eq!(control.seq.value(), 3);
        assert_eq!(control.to_byte(), 0xC3);

        assert_eq!(AppControl::unsolicited(Sequence::new(5)).to_byte(), 0xF5);
    }
}
