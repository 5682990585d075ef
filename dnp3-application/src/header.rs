//! Application layer headers

use bytes::{BufMut, Bytes, BytesMut};
use dnp3_core::{AppControl, Dnp3Error, Dnp3Result, FunctionCode, Iin, Sequence};
use std::fmt;

/// Size of a request header: control and function code
pub const REQUEST_HEADER_SIZE: usize = 2;

/// Size of a response header: control, function code and IIN
pub const RESPONSE_HEADER_SIZE: usize = 4;

/// Header of a received request fragment
///
/// The function code is kept raw so unknown codes can still be answered
/// with the request's sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub control: AppControl,
    pub function: u8,
}

impl RequestHeader {
    /// Parse the header at the start of `fragment`
    ///
    /// # Errors
    /// Returns `Dnp3Error::Parse` if the fragment is shorter than two bytes
    pub fn parse(fragment: &[u8]) -> Dnp3Result<Self> {
        if fragment.len() < REQUEST_HEADER_SIZE {
            return Err(Dnp3Error::Parse(format!(
                "Request fragment too short: {} bytes",
                fragment.len()
            )));
        }
        Ok(Self {
            control: AppControl::from_byte(fragment[0]),
            function: fragment[1],
        })
    }

    /// Decoded function code, `None` if unknown
    pub fn function_code(&self) -> Option<FunctionCode> {
        FunctionCode::from_u8(self.function)
    }

    pub fn seq(&self) -> Sequence {
        self.control.seq
    }
}

impl fmt::Display for RequestHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.function_code() {
            Some(fc) => write!(f, "{} {}", self.control, fc),
            None => write!(f, "{} unknown function 0x{:02X}", self.control, self.function),
        }
    }
}

/// Header of a response fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub control: AppControl,
    pub function: FunctionCode,
    pub iin: Iin,
}

impl ResponseHeader {
    pub fn new(control: AppControl, function: FunctionCode, iin: Iin) -> Self {
        Self { control, function, iin }
    }

    pub fn to_bytes(&self) -> [u8; RESPONSE_HEADER_SIZE] {
        let iin = self.iin.to_bytes();
        [self.control.to_byte(), self.function.as_u8(), iin[0], iin[1]]
    }

    /// Parse a response header
    ///
    /// # Errors
    /// Returns `Dnp3Error::Parse` on short input or a non-response function code
    pub fn parse(fragment: &[u8]) -> Dnp3Result<Self> {
        if fragment.len() < RESPONSE_HEADER_SIZE {
            return Err(Dnp3Error::Parse(format!(
                "Response fragment too short: {} bytes",
                fragment.len()
            )));
        }
        let function = FunctionCode::from_u8(fragment[1]).ok_or_else(|| {
            Dnp3Error::Parse(format!("Unknown function code 0x{:02X}", fragment[1]))
        })?;
        Ok(Self {
            control: AppControl::from_byte(fragment[0]),
            function,
            iin: Iin::from_bytes([fragment[2], fragment[3]]),
        })
    }
}

/// Build a two byte application confirm
pub fn confirm_fragment(seq: Sequence, unsolicited: bool) -> Bytes {
    let mut control = AppControl::single(seq);
    control.uns = unsolicited;
    let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE);
    buf.put_u8(control.to_byte());
    buf.put_u8(FunctionCode::Confirm.as_u8());
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_header_parse() {
        let header = RequestHeader::parse(&[0xC3, 0x01, 0x3C, 0x01, 0x06]).unwrap();
        assert!(header.control.fir && header.control.fin);
        assert_eq!(header.seq().value(), 3);
        assert_eq!(header.function_code(), Some(FunctionCode::Read));
        assert!(RequestHeader::parse(&[0xC0]).is_err());
    }

    #[test]
    fn test_unknown_function_kept_raw() {
        let header = RequestHeader::parse(&[0xC0, 0x70]).unwrap();
        assert_eq!(header.function, 0x70);
        assert_eq!(header.function_code(), None);
    }

    #[test]
    fn test_confirm_fragment() {
        let confirm = confirm_fragment(Sequence::new(5), true);
        assert_eq!(confirm.as_ref(), &[0xD5, 0x00]);
    }
}
