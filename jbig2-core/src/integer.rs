//! Arithmetic integer decoding (Annex A).

use crate::arithmetic::{ArithmeticDecoder, ArithmeticState};
use crate::error::{DecodeError, Result};

/// Integer arithmetic decoder (A.2), one instance per IAx procedure.
///
/// "Each arithmetic integer decoding procedure requires 512 bytes of storage
/// for its context memory." (A.2)
#[derive(Clone, Debug)]
pub(crate) struct IntegerDecoder {
    state: ArithmeticState,
}

impl IntegerDecoder {
    pub(crate) fn new() -> Self {
        Self {
            state: ArithmeticState::new(9),
        }
    }

    /// Decode a signed integer. `None` is the out-of-band value.
    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Result<Option<i32>> {
        let mut prev = 1_usize;

        let sign = self.read_bits(decoder, &mut prev, 1);

        // The prefix selects the bit width and the offset of the magnitude.
        let mut magnitude = None;
        for (bits, offset) in [(2, 0), (4, 4), (6, 20), (8, 84), (12, 340)] {
            if self.read_bits(decoder, &mut prev, 1) == 0 {
                magnitude = Some(self.read_bits(decoder, &mut prev, bits) + offset);
                break;
            }
        }

        let magnitude = match magnitude {
            Some(m) => m,
            None => self
                .read_bits(decoder, &mut prev, 32)
                .checked_add(4436)
                .ok_or(DecodeError::Overflow)?,
        };

        // "OOB if S = 1 and V = 0"
        match (sign, magnitude) {
            (1, 0) => Ok(None),
            (1, m) => Ok(Some(
                i32::try_from(-i64::from(m)).map_err(|_| DecodeError::Overflow)?,
            )),
            (_, m) => Ok(Some(i32::try_from(m).map_err(|_| DecodeError::Overflow)?)),
        }
    }

    /// Decode an integer that must not be out-of-band.
    pub(crate) fn decode_value(
        &mut self,
        decoder: &mut ArithmeticDecoder<'_>,
        oob: impl Into<DecodeError>,
    ) -> Result<i32> {
        self.decode(decoder)?.ok_or_else(|| oob.into())
    }

    fn read_bits(&mut self, decoder: &mut ArithmeticDecoder<'_>, prev: &mut usize, count: u32) -> u32 {
        let mut value = 0_u32;

        for _ in 0..count {
            let bit = decoder.read_bit(*prev, &mut self.state);
            value = (value << 1) | u32::from(bit);

            // PREV keeps the eight most recent bits plus a leading one.
            let next = (*prev << 1) | usize::from(bit);
            *prev = if *prev < 256 {
                next
            } else {
                (next & 0x1FF) | 0x100
            };
        }

        value
    }
}

/// Symbol ID decoder (A.3, IAID).
#[derive(Clone, Debug)]
pub(crate) struct SymbolIdDecoder {
    state: ArithmeticState,
    code_len: u32,
}

impl SymbolIdDecoder {
    pub(crate) fn new(code_len: u32) -> Self {
        Self {
            state: ArithmeticState::new(code_len),
            code_len,
        }
    }

    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> u32 {
        let mut prev = 1_u32;

        for _ in 0..self.code_len {
            let bit = decoder.read_bit(prev as usize, &mut self.state);
            prev = (prev << 1) | u32::from(bit);
        }

        // Strip the leading one that PREV started with.
        prev - (1 << self.code_len)
    }
}
