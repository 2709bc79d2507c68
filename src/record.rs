//! Wire record exposed to stream consumers.
//!
//! Every successful read delivers exactly one record in the fixed 16-byte
//! layout below, encoded in native host byte order. Cross-architecture
//! transport requires explicit conversion by the consumer.

/// Size in bytes of one encoded record.
pub const RECORD_SIZE: usize = 16;

/// Set on every committed record.
pub const FLAG_NEW_SAMPLE: u32 = 0x1;

/// Set when the sample met or exceeded the configured threshold at commit.
pub const FLAG_THRESHOLD: u32 = 0x2;

/// One temperature sample as committed by the producer.
///
/// Layout: `timestamp_ns` (u64) at offset 0, `temp_mc` (i32) at offset 8,
/// `flags` (u32) at offset 12. Reserved flag bits are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Monotonic nanoseconds at commit time.
    pub timestamp_ns: u64,
    /// Temperature in milli-degrees Celsius.
    pub temp_mc: i32,
    /// Bitmask of `FLAG_*` bits.
    pub flags: u32,
}

impl Sample {
    /// Encode into the fixed 16-byte wire form.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..8].copy_from_slice(&self.timestamp_ns.to_ne_bytes());
        out[8..12].copy_from_slice(&self.temp_mc.to_ne_bytes());
        out[12..16].copy_from_slice(&self.flags.to_ne_bytes());
        out
    }

    /// Decode from the fixed 16-byte wire form.
    pub fn from_bytes(raw: &[u8; RECORD_SIZE]) -> Self {
        let mut ts = [0u8; 8];
        let mut temp = [0u8; 4];
        let mut flags = [0u8; 4];
        ts.copy_from_slice(&raw[0..8]);
        temp.copy_from_slice(&raw[8..12]);
        flags.copy_from_slice(&raw[12..16]);

        Self {
            timestamp_ns: u64::from_ne_bytes(ts),
            temp_mc: i32::from_ne_bytes(temp),
            flags: u32::from_ne_bytes(flags),
        }
    }

    /// Whether the threshold mark is set.
    pub fn crossed_threshold(&self) -> bool {
        self.flags & FLAG_THRESHOLD != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let sample = Sample {
            timestamp_ns: 0x0102_0304_0506_0708,
            temp_mc: 45_000,
            flags: FLAG_NEW_SAMPLE | FLAG_THRESHOLD,
        };

        let raw = sample.to_bytes();
        assert_eq!(raw.len(), RECORD_SIZE);
        assert_eq!(raw[0..8], 0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(raw[8..12], 45_000i32.to_ne_bytes());
        assert_eq!(raw[12..16], 0x3u32.to_ne_bytes());
    }

    #[test]
    fn test_decode_inverts_encode() {
        let sample = Sample {
            timestamp_ns: 123_456_789,
            temp_mc: -2_000,
            flags: FLAG_NEW_SAMPLE,
        };

        assert_eq!(Sample::from_bytes(&sample.to_bytes()), sample);
    }

    #[test]
    fn test_crossed_threshold() {
        let plain = Sample {
            timestamp_ns: 0,
            temp_mc: 0,
            flags: FLAG_NEW_SAMPLE,
        };
        assert!(!plain.crossed_threshold());

        let marked = Sample {
            flags: FLAG_NEW_SAMPLE | FLAG_THRESHOLD,
            ..plain
        };
        assert!(marked.crossed_threshold());
    }
}
