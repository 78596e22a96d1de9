//! Fixed test-vector byte streams.
//!
//! Both roles exchange a fixed 16-byte pattern with the DUT. Transfers longer
//! than the pattern see `0x00` for every byte past index 15; the DUT-side
//! test programs never clock more than 16 bytes, so the tail is padding
//! rather than data.
//!
//! The two roles deliberately use different receive patterns (first byte
//! `0x01` for the responder, `0xAA` for the driver) so that captured traces
//! show which checker was on the bus.

/// Length of every fixed pattern.
pub const VECTOR_LEN: usize = 16;

/// A transmit/receive pattern pair, indexed by byte position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedVector {
    tx: [u8; VECTOR_LEN],
    rx: [u8; VECTOR_LEN],
}

/// Pattern used when the checker responds to a DUT master.
pub const RESPONDER_VECTORS: ExpectedVector = ExpectedVector::new(
    [
        0xFE, 0xF7, 0xFB, 0xEF, 0xDF, 0xBF, 0xFD, 0x7F, 0x01, 0x08, 0x04, 0x10, 0x20, 0x04, 0x02,
        0x80,
    ],
    [
        0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x04, 0x80, 0xFE, 0xFD, 0xFB, 0xF7, 0xEF, 0xDF, 0xBF,
        0x7F,
    ],
);

/// Pattern used when the checker drives a DUT slave.
pub const DRIVER_VECTORS: ExpectedVector = ExpectedVector::new(
    [
        0xAA, 0xF7, 0xFB, 0xEF, 0xDF, 0xBF, 0xFD, 0x7F, 0x01, 0x08, 0x04, 0x10, 0x20, 0x04, 0x02,
        0x80,
    ],
    [
        0xAA, 0x02, 0x04, 0x08, 0x10, 0x20, 0x04, 0x80, 0xFE, 0xFD, 0xFB, 0xF7, 0xEF, 0xDF, 0xBF,
        0x7F,
    ],
);

impl ExpectedVector {
    /// Pair a transmit pattern with a receive pattern.
    #[must_use]
    pub const fn new(tx: [u8; VECTOR_LEN], rx: [u8; VECTOR_LEN]) -> Self {
        Self { tx, rx }
    }

    /// Byte the checker sends at `index`; `0x00` past the pattern.
    #[must_use]
    pub fn tx_byte(&self, index: u32) -> u8 {
        Self::at(&self.tx, index)
    }

    /// Byte the checker expects at `index`; `0x00` past the pattern.
    #[must_use]
    pub fn rx_byte(&self, index: u32) -> u8 {
        Self::at(&self.rx, index)
    }

    /// Transmit bit number `bit_index` of the stream, MSB-first per byte.
    #[must_use]
    pub fn tx_bit(&self, bit_index: u32) -> bool {
        let byte = self.tx_byte(bit_index / 8);
        let shift = 7u32.saturating_sub(bit_index % 8);
        (byte >> shift) & 1 == 1
    }

    /// The transmit pattern.
    #[must_use]
    pub fn tx(&self) -> &[u8; VECTOR_LEN] {
        &self.tx
    }

    /// The receive pattern.
    #[must_use]
    pub fn rx(&self) -> &[u8; VECTOR_LEN] {
        &self.rx
    }

    fn at(bytes: &[u8; VECTOR_LEN], index: u32) -> u8 {
        usize::try_from(index)
            .ok()
            .and_then(|i| bytes.get(i))
            .copied()
            .unwrap_or(0)
    }
}
