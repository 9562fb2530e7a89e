//! The arithmetic decoder (Annex E) and its adaptive context state.
//!
//! The decoder follows the software conventions of Annex G: the code
//! register holds the complement of the coded data, so the MPS test is a
//! simple `Chigh < A` comparison.

/// The probability estimation table (Table E.1).
///
/// Each row holds `Qe`, the row to move to after an MPS, the row to move to
/// after an LPS, and whether an LPS flips the sense of the MPS.
const QE_TABLE: [(u32, u8, u8, bool); 47] = [
    (0x5601, 1, 1, true),
    (0x3401, 2, 6, false),
    (0x1801, 3, 9, false),
    (0x0AC1, 4, 12, false),
    (0x0521, 5, 29, false),
    (0x0221, 38, 33, false),
    (0x5601, 7, 6, true),
    (0x5401, 8, 14, false),
    (0x4801, 9, 14, false),
    (0x3801, 10, 14, false),
    (0x3001, 11, 17, false),
    (0x2401, 12, 18, false),
    (0x1C01, 13, 20, false),
    (0x1601, 29, 21, false),
    (0x5601, 15, 14, true),
    (0x5401, 16, 14, false),
    (0x5101, 17, 15, false),
    (0x4801, 18, 16, false),
    (0x3801, 19, 17, false),
    (0x3401, 20, 18, false),
    (0x3001, 21, 19, false),
    (0x2801, 22, 19, false),
    (0x2401, 23, 20, false),
    (0x2201, 24, 21, false),
    (0x1C01, 25, 22, false),
    (0x1801, 26, 23, false),
    (0x1601, 27, 24, false),
    (0x1401, 28, 25, false),
    (0x1201, 29, 26, false),
    (0x1101, 30, 27, false),
    (0x0AC1, 31, 28, false),
    (0x09C1, 32, 29, false),
    (0x08A1, 33, 30, false),
    (0x0521, 34, 31, false),
    (0x0441, 35, 32, false),
    (0x02A1, 36, 33, false),
    (0x0221, 37, 34, false),
    (0x0141, 38, 35, false),
    (0x0111, 39, 36, false),
    (0x0085, 40, 37, false),
    (0x0049, 41, 38, false),
    (0x0025, 42, 39, false),
    (0x0015, 43, 40, false),
    (0x0009, 44, 41, false),
    (0x0005, 45, 42, false),
    (0x0001, 45, 43, false),
    (0x5601, 46, 46, false),
];

/// The adaptive state of a single context (E.2.4): an index into
/// [`QE_TABLE`] and the current sense of the more probable symbol.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Context {
    index: u8,
    mps: u8,
}

/// The adaptive state of all contexts of one decoding procedure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ArithmeticState {
    contexts: Vec<Context>,
}

impl ArithmeticState {
    /// Create a state for contexts of `bits` bits, with every context in its
    /// initial state.
    pub(crate) fn new(bits: u32) -> Self {
        Self {
            contexts: vec![Context::default(); 1 << bits],
        }
    }

    /// Reset all contexts to their initial state.
    pub(crate) fn reset(&mut self, bits: u32) {
        self.contexts.clear();
        self.contexts.resize(1 << bits, Context::default());
    }

    /// Reset the state and continue with the statistics of `source`.
    pub(crate) fn reset_from(&mut self, bits: u32, source: &Self) {
        self.reset(bits);

        let len = self.contexts.len().min(source.contexts.len());
        self.contexts[..len].copy_from_slice(&source.contexts[..len]);
    }
}

pub(crate) struct ArithmeticDecoder<'a> {
    data: &'a [u8],
    /// Position of the byte that was read last ("BP").
    pos: usize,
    /// The code register ("C").
    c: u32,
    /// The interval register ("A").
    a: u32,
    /// The number of bits left in the low part of `c` ("CT").
    ct: u32,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Create a new decoder and run INITDEC (Figure G.1).
    pub(crate) fn new(data: &'a [u8]) -> Self {
        let mut decoder = Self {
            data,
            pos: 0,
            c: 0,
            a: 0,
            ct: 0,
        };

        decoder.c = (u32::from(decoder.byte_at(0)) ^ 0xFF) << 16;
        decoder.byte_in();
        decoder.c <<= 7;
        decoder.ct -= 7;
        decoder.a = 0x8000;

        decoder
    }

    /// Decode one bit with context `cx` of the given state (Figure G.2).
    #[inline]
    pub(crate) fn read_bit(&mut self, cx: usize, state: &mut ArithmeticState) -> u8 {
        let context = &mut state.contexts[cx];
        let (qe, nmps, nlps, switch) = QE_TABLE[usize::from(context.index)];

        self.a -= qe;

        let bit = if (self.c >> 16) < self.a {
            if self.a & 0x8000 != 0 {
                return context.mps;
            }

            // MPS_EXCHANGE (Figure E.16).
            if self.a < qe {
                let lps = 1 - context.mps;
                if switch {
                    context.mps = lps;
                }
                context.index = nlps;
                lps
            } else {
                context.index = nmps;
                context.mps
            }
        } else {
            self.c -= self.a << 16;

            // LPS_EXCHANGE (Figure E.17).
            let bit = if self.a < qe {
                context.index = nmps;
                context.mps
            } else {
                let lps = 1 - context.mps;
                if switch {
                    context.mps = lps;
                }
                context.index = nlps;
                lps
            };
            self.a = qe;

            bit
        };

        self.renormalize();

        bit
    }

    /// RENORMD (Figure E.18).
    #[inline]
    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.byte_in();
            }

            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// BYTEIN (Figure G.3).
    ///
    /// A 0xFF byte followed by a byte larger than 0x8F is a marker. The
    /// decoder then stops advancing and keeps feeding 1-bits.
    #[inline]
    fn byte_in(&mut self) {
        if self.byte_at(self.pos) == 0xFF {
            if self.byte_at(self.pos + 1) > 0x8F {
                self.ct = 8;
            } else {
                self.pos += 1;
                let b = u32::from(self.byte_at(self.pos));
                self.c = self.c.wrapping_add(0xFE00).wrapping_sub(b << 9);
                self.ct = 7;
            }
        } else {
            self.pos += 1;
            let b = u32::from(self.byte_at(self.pos));
            self.c = self.c.wrapping_add(0xFF00).wrapping_sub(b << 8);
            self.ct = 8;
        }
    }

    /// Bytes past the end of the data read as 0xFF, which makes the end of
    /// the data look like a marker.
    #[inline]
    fn byte_at(&self, pos: usize) -> u8 {
        self.data.get(pos).copied().unwrap_or(0xFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mq::{Contexts, MqEncoder};

    #[test]
    fn decodes_encoded_bits() {
        let bits: Vec<u8> = (0..500_u32)
            .map(|i| u8::from(i % 7 == 0 || i % 13 == 1))
            .collect();

        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(2);
        for (i, &bit) in bits.iter().enumerate() {
            encoder.encode(&mut contexts, i % 4, bit);
        }
        let data = encoder.finish();

        let mut decoder = ArithmeticDecoder::new(&data);
        let mut state = ArithmeticState::new(2);
        let decoded: Vec<u8> = (0..bits.len())
            .map(|i| decoder.read_bit(i % 4, &mut state))
            .collect();

        assert_eq!(decoded, bits);
    }

    #[test]
    fn decodes_bytes() {
        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(0);
        for byte in [0xA5_u8, 0x00, 0xFF, 0x3C] {
            for i in (0..8).rev() {
                encoder.encode(&mut contexts, 0, (byte >> i) & 1);
            }
        }
        let data = encoder.finish();

        let mut decoder = ArithmeticDecoder::new(&data);
        let mut state = ArithmeticState::new(0);
        let decoded: Vec<u8> = (0..4)
            .map(|_| (0..8).fold(0, |byte, _| (byte << 1) | decoder.read_bit(0, &mut state)))
            .collect();

        assert_eq!(decoded, [0xA5, 0x00, 0xFF, 0x3C]);
    }

    #[test]
    fn state_reset_and_copy() {
        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(1);
        for _ in 0..64 {
            encoder.encode(&mut contexts, 1, 1);
        }
        let data = encoder.finish();

        let mut decoder = ArithmeticDecoder::new(&data);
        let mut state = ArithmeticState::new(1);
        for _ in 0..64 {
            assert_eq!(decoder.read_bit(1, &mut state), 1);
        }
        assert_ne!(state, ArithmeticState::new(1));

        let mut copy = ArithmeticState::default();
        copy.reset_from(1, &state);
        assert_eq!(copy, state);

        copy.reset(1);
        assert_eq!(copy, ArithmeticState::new(1));
    }
}
