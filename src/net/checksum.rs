//! RFC 1071 Internet checksum.
//!
//! IPv4, TCP and UDP all protect their headers with the same one's complement
//! sum of 16-bit words. `Checksum` keeps a running sum so the pseudo-header and
//! the segment can be fed as separate slices without copying them into a
//! scratch buffer first.

/// Running one's complement sum over a byte stream.
#[derive(Debug, Clone, Default)]
pub struct Checksum {
    sum: u64,
    // High byte of a word whose low byte has not been seen yet.
    pending: Option<u8>,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `data` to the sum. Slices of odd length may be chained; the
    /// result is the same as summing their concatenation.
    pub fn add_bytes(&mut self, data: &[u8]) -> &mut Self {
        let mut data = data;

        if let Some(high) = self.pending.take() {
            match data.split_first() {
                Some((&low, rest)) => {
                    self.sum += u64::from(u16::from_be_bytes([high, low]));
                    data = rest;
                }
                None => {
                    self.pending = Some(high);
                    return self;
                }
            }
        }

        let mut words = data.chunks_exact(2);
        for word in &mut words {
            self.sum += u64::from(u16::from_be_bytes([word[0], word[1]]));
        }
        if let [last] = words.remainder() {
            self.pending = Some(*last);
        }

        self
    }

    pub fn add_u16(&mut self, value: u16) -> &mut Self {
        self.add_bytes(&value.to_be_bytes())
    }

    pub fn add_u32(&mut self, value: u32) -> &mut Self {
        self.add_bytes(&value.to_be_bytes())
    }

    /// Folds the carries back into 16 bits and returns the complement.
    /// A dangling odd byte counts as the high byte of a zero padded word.
    pub fn finish(&self) -> u16 {
        let mut sum = self.sum;
        if let Some(high) = self.pending {
            sum += u64::from(high) << 8;
        }
        while sum >> 16 != 0 {
            sum = (sum & 0xffff) + (sum >> 16);
        }
        !(sum as u16)
    }
}

/// One-shot checksum of a single buffer.
pub fn rfc1071_checksum(buffer: &[u8]) -> u16 {
    Checksum::new().add_bytes(buffer).finish()
}

/// True when `buffer`, checksum field included, sums to all ones.
pub fn verify(buffer: &[u8]) -> bool {
    rfc1071_checksum(buffer) == 0
}
