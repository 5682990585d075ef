//! DNP3 48-bit absolute time

use crate::error::{Dnp3Error, Dnp3Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAX_VALUE: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Milliseconds since 1970-01-01 UTC, encoded on the wire as 6 bytes
/// little-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct DnpTime(u64);

impl DnpTime {
    /// Encoded size in bytes
    pub const SIZE: usize = 6;

    /// Create from milliseconds since the epoch, truncated to 48 bits
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis & MAX_VALUE)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Current system time
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self::from_millis(millis)
    }

    /// Add an elapsed duration
    #[must_use]
    pub fn add(&self, elapsed: Duration) -> Self {
        Self::from_millis(self.0.saturating_add(elapsed.as_millis() as u64))
    }

    pub fn to_bytes(&self) -> [u8; 6] {
        let bytes = self.0.to_le_bytes();
        [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]]
    }

    /// Decode from the first 6 bytes of `data`
    pub fn from_bytes(data: &[u8]) -> Dnp3Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Dnp3Error::InvalidData(format!(
                "DNP3 time too short: expected {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }
        let mut bytes = [0u8; 8];
        bytes[..Self::SIZE].copy_from_slice(&data[..Self::SIZE]);
        Ok(Self(u64::from_le_bytes(bytes)))
    }
}

impl fmt::Display for DnpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
