//! Object header parsing
//!
//! Offsets are absolute positions in the request fragment, so a session
//! can store a header offset as its read cursor and re-parse from there.

use dnp3_core::{Dnp3Error, Dnp3Result, QualifierCode};
use std::ops::Range;

/// Range field of an object header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRange {
    /// Start and stop indices, inclusive
    Range { start: u16, stop: u16 },
    /// All points of the object type
    All,
    /// Limited quantity or number of prefixed objects
    Count(u16),
}

/// Size of the data carried per object in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSize {
    /// Header only, as in read requests
    None,
    Fixed(usize),
    /// Bit-packed objects, bits per point
    Packed(u8),
    /// Each object carries its own length prefix
    Free,
}

/// One point of an object header: its index and the bytes of its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRef {
    pub index: u16,
    pub data: Range<usize>,
    /// For packed objects, bit position of the point within `data`
    pub bit: u8,
}

/// A parsed object header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub group: u8,
    pub variation: u8,
    pub qualifier: QualifierCode,
    pub range: HeaderRange,
    /// Offset of the group byte
    pub offset: usize,
    /// Offset of the first byte after the range field
    pub data_start: usize,
}

fn read_u16(buf: &[u8], at: usize) -> Dnp3Result<u16> {
    buf.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| Dnp3Error::Parse(format!("Truncated 16-bit field at offset {}", at)))
}

fn read_u8(buf: &[u8], at: usize) -> Dnp3Result<u8> {
    buf.get(at)
        .copied()
        .ok_or_else(|| Dnp3Error::Parse(format!("Truncated 8-bit field at offset {}", at)))
}

/// Parse the object header that starts at `offset` in `buf`
///
/// # Errors
/// Returns `Dnp3Error::Parse` on an unsupported qualifier, a truncated
/// range field, or an inverted start/stop range
pub fn parse_header(buf: &[u8], offset: usize) -> Dnp3Result<ObjectHeader> {
    let group = read_u8(buf, offset)?;
    let variation = read_u8(buf, offset + 1)?;
    let qualifier = QualifierCode::from_u8(read_u8(buf, offset + 2)?)?;
    let range_at = offset + 3;
    let range = match qualifier {
        QualifierCode::Range8 => {
            let start = read_u8(buf, range_at)? as u16;
            let stop = read_u8(buf, range_at + 1)? as u16;
            HeaderRange::Range { start, stop }
        }
        QualifierCode::Range16 => {
            let start = read_u16(buf, range_at)?;
            let stop = read_u16(buf, range_at + 2)?;
            HeaderRange::Range { start, stop }
        }
        QualifierCode::AllObjects => HeaderRange::All,
        QualifierCode::Count8 | QualifierCode::CountAndPrefix8 | QualifierCode::FreeFormat16 => {
            HeaderRange::Count(read_u8(buf, range_at)? as u16)
        }
        QualifierCode::Count16 | QualifierCode::CountAndPrefix16 => {
            HeaderRange::Count(read_u16(buf, range_at)?)
        }
    };
    if let HeaderRange::Range { start, stop } = range {
        if stop < start {
            return Err(Dnp3Error::Parse(format!(
                "Object header g{}v{} has stop {} before start {}",
                group, variation, stop, start
            )));
        }
    }
    Ok(ObjectHeader {
        group,
        variation,
        qualifier,
        range,
        offset,
        data_start: range_at + qualifier.range_size(),
    })
}

impl ObjectHeader {
    /// Number of points named by the header, `None` for all points
    pub fn quantity(&self) -> Option<usize> {
        match self.range {
            HeaderRange::Range { start, stop } => Some((stop - start) as usize + 1),
            HeaderRange::All => None,
            HeaderRange::Count(count) => Some(count as usize),
        }
    }

    /// Count limit of a limited-quantity header
    pub fn limit(&self) -> Option<usize> {
        match (self.qualifier, self.range) {
            (QualifierCode::Count8 | QualifierCode::Count16, HeaderRange::Count(count)) => {
                Some(count as usize)
            }
            _ => None,
        }
    }

    /// Enumerate the points of the header and the data each one carries
    ///
    /// # Errors
    /// Returns `Dnp3Error::Parse` if the data runs past the end of `buf`
    pub fn points(&self, buf: &[u8], size: ObjectSize) -> Dnp3Result<Vec<PointRef>> {
        let count = self.quantity().unwrap_or(0);
        let mut points = Vec::with_capacity(count.min(256));
        let mut at = self.data_start;
        let first = match self.range {
            HeaderRange::Range { start, .. } => start,
            _ => 0,
        };

        if let ObjectSize::Packed(bits) = size {
            let total_bits = count * bits as usize;
            let len = total_bits.div_ceil(8);
            if at + len > buf.len() {
                return Err(self.truncated());
            }
            for i in 0..count {
                let bit = i * bits as usize;
                points.push(PointRef {
                    index: first.wrapping_add(i as u16),
                    data: at + bit / 8..at + bit / 8 + 1,
                    bit: (bit % 8) as u8,
                });
            }
            return Ok(points);
        }

        for i in 0..count {
            let index = match self.qualifier.prefix_size() {
                _ if !self.qualifier.is_indexed() => first.wrapping_add(i as u16),
                1 => {
                    let index = read_u8(buf, at)? as u16;
                    at += 1;
                    index
                }
                _ => {
                    let index = read_u16(buf, at)?;
                    at += 2;
                    index
                }
            };
            let len = if self.qualifier == QualifierCode::FreeFormat16 {
                let len = read_u16(buf, at)? as usize;
                at += 2;
                len
            } else {
                match size {
                    ObjectSize::None => 0,
                    ObjectSize::Fixed(len) => len,
                    ObjectSize::Free => return Err(Dnp3Error::Parse(format!(
                        "Object g{}v{} requires free-format qualifier",
                        self.group, self.variation
                    ))),
                    ObjectSize::Packed(_) => 0,
                }
            };
            if at + len > buf.len() {
                return Err(self.truncated());
            }
            points.push(PointRef {
                index,
                data: at..at + len,
                bit: 0,
            });
            at += len;
        }
        Ok(points)
    }

    /// Offset of the first byte after this header and its data
    pub fn end(&self, buf: &[u8], size: ObjectSize) -> Dnp3Result<usize> {
        match size {
            ObjectSize::Packed(bits) => {
                let len = (self.quantity().unwrap_or(0) * bits as usize).div_ceil(8);
                if self.data_start + len > buf.len() {
                    return Err(self.truncated());
                }
                Ok(self.data_start + len)
            }
            ObjectSize::None if !self.qualifier.is_indexed()
                && self.qualifier != QualifierCode::FreeFormat16 =>
            {
                Ok(self.data_start)
            }
            _ => Ok(self
                .points(buf, size)?
                .last()
                .map_or(self.data_start, |p| p.data.end)),
        }
    }

    fn truncated(&self) -> Dnp3Error {
        Dnp3Error::Parse(format!(
            "Object data of g{}v{} truncated",
            self.group, self.variation
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_poll_headers() {
        let request = [0xC1, 0x01, 0x3C, 0x02, 0x06, 0x3C, 0x01, 0x06];
        let first = parse_header(&request, 2).unwrap();
        assert_eq!((first.group, first.variation), (60, 2));
        assert_eq!(first.range, HeaderRange::All);
        assert_eq!(first.end(&request, ObjectSize::None).unwrap(), 5);
        let second = parse_header(&request, 5).unwrap();
        assert_eq!((second.group, second.variation), (60, 1));
    }

    #[test]
    fn test_parse_range_and_count() {
        let buf = [0x01, 0x02, 0x00, 0x03, 0x07, 0x14, 0x01, 0x07, 0x05];
        let header = parse_header(&buf, 0).unwrap();
        assert_eq!(header.range, HeaderRange::Range { start: 3, stop: 7 });
        assert_eq!(header.quantity(), Some(5));
        let count = parse_header(&buf, 5).unwrap();
        assert_eq!(count.limit(), Some(5));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let buf = [0x01, 0x02, 0x00, 0x07, 0x03];
        assert!(parse_header(&buf, 0).is_err());
    }

    #[test]
    fn test_prefixed_points() {
        // g12v1, 0x28, count 1, index 3, 11 bytes of CROB
        let mut buf = vec![0x0C, 0x01, 0x28, 0x01, 0x00, 0x03, 0x00];
        buf.extend_from_slice(&[0x03, 0x01, 0x64, 0, 0, 0, 0x64, 0, 0, 0, 0x00]);
        let header = parse_header(&buf, 0).unwrap();
        let points = header.points(&buf, ObjectSize::Fixed(11)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, 3);
        assert_eq!(points[0].data, 7..18);
        assert_eq!(header.end(&buf, ObjectSize::Fixed(11)).unwrap(), 18);
        assert!(header.points(&buf[..12], ObjectSize::Fixed(11)).is_err());
    }

    #[test]
    fn test_packed_points() {
        // g80v1, 0x00, start 7 stop 7, one byte
        let buf = [0x50, 0x01, 0x00, 0x07, 0x07, 0x00];
        let header = parse_header(&buf, 0).unwrap();
        let points = header.points(&buf, ObjectSize::Packed(1)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, 7);
        assert_eq!(points[0].bit, 0);
        assert_eq!(header.end(&buf, ObjectSize::Packed(1)).unwrap(), 6);
    }
}
