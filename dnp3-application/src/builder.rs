//! Response fragment builder
//!
//! The builder reserves room for the response header, then appends object
//! headers and point data while tracking the remaining capacity. Points of
//! the same variation with consecutive indices share one range header
//! (qualifier 0x01); events share one index-prefixed header (qualifier
//! 0x28). A header is patched with its final stop index or count when it is
//! closed.

use crate::header::{ResponseHeader, RESPONSE_HEADER_SIZE};
use crate::objects::{PointSize, Variation};
use bytes::{BufMut, Bytes, BytesMut};
use dnp3_core::QualifierCode;
use dnp3_database::Measurement;

/// Size of a range header with 16-bit start and stop
const RANGE_HEADER_SIZE: usize = 7;

/// Size of a count header with 16-bit count
const PREFIXED_HEADER_SIZE: usize = 5;

/// Smallest fragment the builder accepts
pub const MIN_FRAGMENT_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Range,
    Prefixed,
}

#[derive(Debug)]
struct OpenHeader {
    at: usize,
    kind: HeaderKind,
    variation: &'static Variation,
    next_index: u16,
    count: u16,
    /// Accumulated states of a packed variation
    packed: Vec<u8>,
}

impl OpenHeader {
    fn packed_len(&self, count: usize) -> usize {
        match self.variation.size {
            PointSize::Bits(bits) => (count * bits as usize).div_ceil(8),
            PointSize::Bytes(_) => 0,
        }
    }
}

/// Incrementally built response fragment
#[derive(Debug)]
pub struct FragmentBuilder {
    buf: BytesMut,
    max_size: usize,
    open: Option<OpenHeader>,
}

impl FragmentBuilder {
    /// Create a builder limited to `max_size` bytes including the header
    ///
    /// # Arguments
    /// * `max_size` - Maximum fragment size, raised to `MIN_FRAGMENT_SIZE`
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(MIN_FRAGMENT_SIZE);
        let mut buf = BytesMut::with_capacity(max_size);
        buf.put_bytes(0, RESPONSE_HEADER_SIZE);
        Self {
            buf,
            max_size,
            open: None,
        }
    }

    /// Bytes used so far, including packed data not yet flushed
    pub fn len(&self) -> usize {
        self.buf.len()
            + self
                .open
                .as_ref()
                .map_or(0, |h| h.packed_len(h.packed.len()))
    }

    pub fn remaining(&self) -> usize {
        self.max_size.saturating_sub(self.len())
    }

    /// Whether any object has been written
    pub fn is_empty(&self) -> bool {
        self.buf.len() == RESPONSE_HEADER_SIZE && self.open.is_none()
    }

    /// Append a static point
    ///
    /// Continues the open range header when `variation` matches and
    /// `index` is the next consecutive index, otherwise opens a new header.
    ///
    /// # Returns
    /// `false` if the point does not fit, in which case nothing is written
    pub fn push_static(
        &mut self,
        variation: &'static Variation,
        index: u16,
        value: &Measurement,
    ) -> bool {
        let continues = self.open.as_ref().is_some_and(|h| {
            h.kind == HeaderKind::Range && h.variation == variation && h.next_index == index
        });
        if !continues {
            self.close_header();
        }
        let point_len = match (variation.size, &self.open) {
            (PointSize::Bits(_), Some(h)) => h.packed_len(h.packed.len() + 1) - h.packed_len(h.packed.len()),
            (PointSize::Bits(bits), None) => (bits as usize).div_ceil(8),
            (PointSize::Bytes(size), _) => size,
        };
        let header_len = if continues { 0 } else { RANGE_HEADER_SIZE };
        if header_len + point_len > self.remaining() {
            return false;
        }
        if !continues {
            let at = self.buf.len();
            self.buf.put_u8(variation.group);
            self.buf.put_u8(variation.variation);
            self.buf.put_u8(QualifierCode::Range16.as_u8());
            self.buf.put_u16_le(index);
            self.buf.put_u16_le(index);
            self.open = Some(OpenHeader {
                at,
                kind: HeaderKind::Range,
                variation,
                next_index: index,
                count: 0,
                packed: Vec::new(),
            });
        }
        self.append(value);
        true
    }

    /// Append an event with its index prefix
    ///
    /// # Returns
    /// `false` if the event does not fit
    pub fn push_event(
        &mut self,
        variation: &'static Variation,
        index: u16,
        value: &Measurement,
    ) -> bool {
        let continues = self
            .open
            .as_ref()
            .is_some_and(|h| h.kind == HeaderKind::Prefixed && h.variation == variation);
        if !continues {
            self.close_header();
        }
        let size = match variation.size {
            PointSize::Bytes(size) => size,
            PointSize::Bits(_) => return false,
        };
        let header_len = if continues { 0 } else { PREFIXED_HEADER_SIZE };
        if header_len + 2 + size > self.remaining() {
            return false;
        }
        if !continues {
            let at = self.buf.len();
            self.buf.put_u8(variation.group);
            self.buf.put_u8(variation.variation);
            self.buf.put_u8(QualifierCode::CountAndPrefix16.as_u8());
            self.buf.put_u16_le(0);
            self.open = Some(OpenHeader {
                at,
                kind: HeaderKind::Prefixed,
                variation,
                next_index: 0,
                count: 0,
                packed: Vec::new(),
            });
        }
        self.buf.put_u16_le(index);
        self.append(value);
        true
    }

    fn append(&mut self, value: &Measurement) {
        if let Some(header) = self.open.as_mut() {
            match header.variation.size {
                PointSize::Bits(_) => header.packed.push(value.packed_state()),
                PointSize::Bytes(_) => header.variation.encode(value, &mut self.buf),
            }
            header.count += 1;
            header.next_index = header.next_index.wrapping_add(1);
        }
    }

    /// Close the open header, patching its stop index or count
    pub fn close_header(&mut self) {
        let Some(header) = self.open.take() else {
            return;
        };
        match header.kind {
            HeaderKind::Range => {
                let stop = header.next_index.wrapping_sub(1).to_le_bytes();
                self.buf[header.at + 5] = stop[0];
                self.buf[header.at + 6] = stop[1];
            }
            HeaderKind::Prefixed => {
                let count = header.count.to_le_bytes();
                self.buf[header.at + 3] = count[0];
                self.buf[header.at + 4] = count[1];
            }
        }
        if let PointSize::Bits(bits) = header.variation.size {
            let mut packed = vec![0u8; header.packed_len(header.packed.len())];
            let mask = (1u8 << bits) - 1;
            for (i, state) in header.packed.iter().enumerate() {
                let bit = i * bits as usize;
                packed[bit / 8] |= (state & mask) << (bit % 8);
            }
            self.buf.put_slice(&packed);
        }
    }

    /// Append a single object with qualifier 0x07 and count 1
    pub fn push_count_object(&mut self, group: u8, variation: u8, data: &[u8]) -> bool {
        self.close_header();
        if 4 + data.len() > self.remaining() {
            return false;
        }
        self.buf.put_u8(group);
        self.buf.put_u8(variation);
        self.buf.put_u8(QualifierCode::Count8.as_u8());
        self.buf.put_u8(1);
        self.buf.put_slice(data);
        true
    }

    /// Append a single object with free-format qualifier 0x5B
    pub fn push_free_format_object(&mut self, group: u8, variation: u8, data: &[u8]) -> bool {
        self.close_header();
        if 6 + data.len() > self.remaining() {
            return false;
        }
        self.buf.put_u8(group);
        self.buf.put_u8(variation);
        self.buf.put_u8(QualifierCode::FreeFormat16.as_u8());
        self.buf.put_u8(1);
        self.buf.put_u16_le(data.len() as u16);
        self.buf.put_slice(data);
        true
    }

    /// Append pre-encoded object headers and data
    pub fn push_raw(&mut self, data: &[u8]) -> bool {
        self.close_header();
        if data.len() > self.remaining() {
            return false;
        }
        self.buf.put_slice(data);
        true
    }

    /// Write the response header and return the encoded fragment
    pub fn finish(mut self, header: ResponseHeader) -> Bytes {
        self.close_header();
        self.buf[..RESPONSE_HEADER_SIZE].copy_from_slice(&header.to_bytes());
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnp3_core::{AppControl, Flags, FunctionCode, Iin, Sequence};
    use dnp3_database::{Binary, Counter};

    fn response() -> ResponseHeader {
        ResponseHeader::new(AppControl::single(Sequence::new(1)), FunctionCode::Response, Iin::empty())
    }

    #[test]
    fn test_consecutive_points_share_header() {
        let mut builder = FragmentBuilder::new(256);
        let v = Variation::lookup(20, 1).unwrap();
        for i in 0..3u16 {
            let value = Measurement::from(Counter::new(i as u32, Flags::ONLINE));
            assert!(builder.push_static(v, i + 4, &value));
        }
        let bytes = builder.finish(response());
        assert_eq!(&bytes[..4], &[0xC1, 0x81, 0x00, 0x00]);
        assert_eq!(&bytes[4..11], &[20, 1, 0x01, 4, 0, 6, 0]);
        assert_eq!(bytes.len(), 4 + 7 + 15);
    }

    #[test]
    fn test_gap_opens_new_header() {
        let mut builder = FragmentBuilder::new(256);
        let v = Variation::lookup(20, 1).unwrap();
        let value = Measurement::from(Counter::new(1, Flags::ONLINE));
        assert!(builder.push_static(v, 0, &value));
        assert!(builder.push_static(v, 2, &value));
        let bytes = builder.finish(response());
        assert_eq!(bytes.len(), 4 + 2 * (7 + 5));
    }

    #[test]
    fn test_packed_bits() {
        let mut builder = FragmentBuilder::new(256);
        let v = Variation::lookup(1, 1).unwrap();
        for i in 0..9u16 {
            let value = Measurement::from(Binary::new(i % 2 == 0, Flags::ONLINE));
            assert!(builder.push_static(v, i, &value));
        }
        let bytes = builder.finish(response());
        assert_eq!(&bytes[4..11], &[1, 1, 0x01, 0, 0, 8, 0]);
        assert_eq!(&bytes[11..], &[0x55, 0x01]);
    }

    #[test]
    fn test_capacity_exhausted() {
        let mut builder = FragmentBuilder::new(MIN_FRAGMENT_SIZE);
        let v = Variation::lookup(32, 8).unwrap();
        let value = Measurement::from(dnp3_database::Analog::new(1.0, Flags::ONLINE));
        let mut written = 0u16;
        while builder.push_event(v, written, &value) {
            written += 1;
        }
        // 64 - 4 header - 5 object header = 55 bytes, 17 per event
        assert_eq!(written, 3);
        let bytes = builder.finish(response());
        assert_eq!(&bytes[4..9], &[32, 8, 0x28, 3, 0]);
    }
}
