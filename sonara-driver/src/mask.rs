use bit_vec::BitVec;
use thiserror::Error;

use sonara_core::defined::{OEM_CHANNEL_GROUPS, OEM_TX_CHANNELS};

/// Order in which the 16 channel-group bits leave the FPGA pins.
///
/// `reordered[PIN_ORDER[i]] = logical[i]`; an artifact of the board routing,
/// applied only when the group mask is encoded for the wire.
const GROUP_PIN_ORDER: [usize; OEM_CHANNEL_GROUPS] =
    [0, 4, 8, 12, 2, 6, 10, 14, 1, 5, 9, 13, 3, 7, 11, 15];

/// A mask does not decode from its wire form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaskDecodeError {
    #[error("Mask string has {actual} digits, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Mask string contains a non-hex digit: {0:?}")]
    InvalidDigit(char),
}

/// A fixed-width channel bit mask.
///
/// Carried as a bit-set through planning; rendered to a big-endian hex
/// string only at the module boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    bits: BitVec,
}

impl Mask {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bits: BitVec::from_elem(len, false),
        }
    }

    #[must_use]
    pub fn from_fn(len: usize, mut f: impl FnMut(usize) -> bool) -> Self {
        let mut mask = Self::new(len);
        (0..len).for_each(|i| mask.set(i, f(i)));
        mask
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).unwrap_or(false)
    }

    pub fn set(&mut self, i: usize, value: bool) {
        self.bits.set(i, value);
    }

    /// Number of asserted channels.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|b| *b).count()
    }

    /// Indices of asserted channels, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.then_some(i))
    }

    /// Big-endian hex rendering: the highest channel maps to the most
    /// significant bit of the first digit. The width must be a multiple
    /// of 4.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        debug_assert_eq!(self.len() % 4, 0);
        let n_digits = self.len() / 4;
        (0..n_digits)
            .map(|digit| {
                let base = self.len() - 4 * (digit + 1);
                let nibble = (0..4).fold(0u32, |acc, bit| {
                    acc | ((self.get(base + bit) as u32) << bit)
                });
                char::from_digit(nibble, 16).unwrap()
            })
            .collect()
    }

    /// Inverse of [`Self::to_hex_string`].
    pub fn from_hex_string(s: &str, len: usize) -> Result<Self, MaskDecodeError> {
        if s.len() != len / 4 {
            return Err(MaskDecodeError::LengthMismatch {
                expected: len / 4,
                actual: s.len(),
            });
        }
        let mut mask = Self::new(len);
        for (digit, c) in s.chars().enumerate() {
            let nibble = c
                .to_digit(16)
                .ok_or(MaskDecodeError::InvalidDigit(c))?;
            let base = len - 4 * (digit + 1);
            (0..4).for_each(|bit| mask.set(base + bit, nibble & (1 << bit) != 0));
        }
        Ok(mask)
    }
}

/// Compresses a 128-channel mask into its 16 groups of 8 consecutive
/// channels; a group is active when any of its channels is.
#[must_use]
pub fn compress_channel_groups(channels: &Mask) -> Mask {
    debug_assert_eq!(channels.len(), OEM_TX_CHANNELS);
    Mask::from_fn(OEM_CHANNEL_GROUPS, |g| {
        (0..8).any(|i| channels.get(8 * g + i))
    })
}

/// Encodes a 16-bit channel-group mask for the wire, applying the pin-order
/// reshuffle before hex rendering.
#[must_use]
pub fn encode_channel_groups(groups: &Mask) -> String {
    debug_assert_eq!(groups.len(), OEM_CHANNEL_GROUPS);
    let mut reordered = Mask::new(OEM_CHANNEL_GROUPS);
    (0..OEM_CHANNEL_GROUPS).for_each(|i| reordered.set(GROUP_PIN_ORDER[i], groups.get(i)));
    reordered.to_hex_string()
}

/// Inverse of [`encode_channel_groups`].
pub fn decode_channel_groups(s: &str) -> Result<Mask, MaskDecodeError> {
    let reordered = Mask::from_hex_string(s, OEM_CHANNEL_GROUPS)?;
    Ok(Mask::from_fn(OEM_CHANNEL_GROUPS, |i| {
        reordered.get(GROUP_PIN_ORDER[i])
    }))
}
