//! Transport words and the lane codec.
//!
//! A transport word is a fixed-width container of `lanes` consecutive cells
//! of one row. Lane `i` occupies bits `[32 * i, 32 * i + 31]` of the word,
//! stored as IEEE-754 single precision. The word is kept as one `u32` limb
//! per lane so unpacking is a zero-copy bit cast.

use crate::error::{Result, StencilError};

/// Bits per lane.
pub const LANE_BITS: u32 = 32;

/// Word width used by the reference hardware configuration.
pub const DEFAULT_WORD_BITS: u32 = 512;

/// One fixed-width unit of the grid stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportWord {
    limbs: Box<[u32]>,
}

impl TransportWord {
    /// A word of `lanes` zero bits.
    pub fn zeroed(lanes: usize) -> Self {
        Self {
            limbs: vec![0u32; lanes].into_boxed_slice(),
        }
    }

    /// Build a word from raw lane bit patterns.
    pub fn from_limbs(limbs: impl Into<Box<[u32]>>) -> Self {
        Self {
            limbs: limbs.into(),
        }
    }

    /// Number of lanes carried by the word.
    #[inline]
    pub fn lanes(&self) -> usize {
        self.limbs.len()
    }

    /// Width of the word in bits.
    pub fn bits(&self) -> u32 {
        self.limbs.len() as u32 * LANE_BITS
    }

    /// Raw lane bit patterns.
    #[inline]
    pub fn limbs(&self) -> &[u32] {
        &self.limbs
    }

    /// Little-endian byte image (lane 0 first).
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.limbs.iter().flat_map(|l| l.to_le_bytes()).collect()
    }

    /// Decode a little-endian byte image.
    ///
    /// `bytes.len()` must be a non-zero multiple of four.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return Err(StencilError::config(format!(
                "word image of {} bytes is not a multiple of {} bits",
                bytes.len(),
                LANE_BITS
            )));
        }
        let limbs: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self::from_limbs(limbs))
    }
}

/// Bidirectional converter between transport words and lane values.
///
/// The lane count is fixed at construction; every call is pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneCodec {
    lanes: usize,
}

impl Default for LaneCodec {
    fn default() -> Self {
        Self {
            lanes: (DEFAULT_WORD_BITS / LANE_BITS) as usize,
        }
    }
}

impl LaneCodec {
    /// Create a codec for words of `word_bits` bits.
    ///
    /// Fails if the width is zero or not a multiple of 32.
    pub fn new(word_bits: u32) -> Result<Self> {
        if word_bits == 0 || word_bits % LANE_BITS != 0 {
            return Err(StencilError::config(format!(
                "word width {word_bits} is not a non-zero multiple of {LANE_BITS} bits"
            )));
        }
        Ok(Self {
            lanes: (word_bits / LANE_BITS) as usize,
        })
    }

    /// Create a codec carrying `lanes` values per word.
    pub fn with_lanes(lanes: usize) -> Result<Self> {
        if lanes == 0 {
            return Err(StencilError::config("lane count must be positive"));
        }
        Ok(Self { lanes })
    }

    /// Lanes per word (W).
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Word width in bits.
    pub fn word_bits(&self) -> u32 {
        self.lanes as u32 * LANE_BITS
    }

    /// View a word as its lane values, lane 0 first.
    #[inline]
    pub fn unpack<'w>(&self, word: &'w TransportWord) -> Result<&'w [f32]> {
        self.check_lanes(word.lanes())?;
        Ok(bytemuck::cast_slice(word.limbs()))
    }

    /// Pack lane values into a word. Bit patterns are preserved exactly.
    pub fn pack(&self, values: &[f32]) -> Result<TransportWord> {
        self.check_lanes(values.len())?;
        let limbs: &[u32] = bytemuck::cast_slice(values);
        Ok(TransportWord::from_limbs(limbs.to_vec()))
    }

    /// Read a single lane without materialising the others.
    #[inline]
    pub fn lane(&self, word: &TransportWord, lane: usize) -> Option<f32> {
        word.limbs().get(lane).map(|bits| f32::from_bits(*bits))
    }

    fn check_lanes(&self, got: usize) -> Result<()> {
        if got != self.lanes {
            return Err(StencilError::config(format!(
                "expected {} lanes per word, got {}",
                self.lanes, got
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_512_bits() {
        let codec = LaneCodec::default();
        assert_eq!(codec.lanes(), 16);
        assert_eq!(codec.word_bits(), 512);
    }

    #[test]
    fn test_rejects_bad_width() {
        assert!(LaneCodec::new(0).is_err());
        assert!(LaneCodec::new(48).is_err());
        assert!(matches!(
            LaneCodec::new(100),
            Err(StencilError::Configuration(_))
        ));
        assert_eq!(LaneCodec::new(96).unwrap().lanes(), 3);
    }

    #[test]
    fn test_lane_bit_layout() {
        let codec = LaneCodec::with_lanes(4).unwrap();
        let word = codec.pack(&[1.0, -2.5, 0.0, 8.0]).unwrap();

        // Lane 1 sits in bits [32, 63]: the second limb, and bytes 4..8 of
        // the little-endian image.
        assert_eq!(word.limbs()[1], (-2.5f32).to_bits());
        let bytes = word.to_le_bytes();
        assert_eq!(&bytes[4..8], &(-2.5f32).to_bits().to_le_bytes());
        assert_eq!(codec.lane(&word, 3), Some(8.0));
        assert_eq!(codec.lane(&word, 4), None);
    }

    #[test]
    fn test_nan_payload_survives() {
        let codec = LaneCodec::with_lanes(2).unwrap();
        let word = TransportWord::from_limbs(vec![0x7fc0_1234, 0xffff_ffff]);
        let values = codec.unpack(&word).unwrap().to_vec();
        assert!(values[0].is_nan());
        assert_eq!(codec.pack(&values).unwrap(), word);
    }

    #[test]
    fn test_lane_mismatch() {
        let codec = LaneCodec::with_lanes(4).unwrap();
        assert!(codec.pack(&[1.0, 2.0]).is_err());
        assert!(codec.unpack(&TransportWord::zeroed(8)).is_err());
    }

    #[test]
    fn test_le_bytes() {
        let word = TransportWord::from_limbs(vec![1, 2, 0xdead_beef]);
        let back = TransportWord::from_le_bytes(&word.to_le_bytes()).unwrap();
        assert_eq!(back, word);
        assert!(TransportWord::from_le_bytes(&[1, 2, 3]).is_err());
        assert!(TransportWord::from_le_bytes(&[]).is_err());
    }
}
