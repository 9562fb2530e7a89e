//! An MQ encoder (Annex E.2) used to build arithmetically coded test data.
//!
//! This file is shared between the unit tests of the crate and the
//! integration tests.

#![allow(dead_code)]

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

/// Adaptive encoder contexts: `(index, mps)` per context.
#[derive(Clone)]
pub struct Contexts(Vec<(u8, u8)>);

impl Contexts {
    pub fn new(bits: u32) -> Self {
        Self(vec![(0, 0); 1 << bits])
    }
}

pub struct MqEncoder {
    /// The first byte stands in for the byte before the start of the
    /// stream and is dropped when finishing.
    out: Vec<u8>,
    c: u32,
    a: u32,
    ct: u32,
}

impl Default for MqEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MqEncoder {
    /// INITENC.
    pub fn new() -> Self {
        Self {
            out: vec![0],
            c: 0,
            a: 0x8000,
            ct: 12,
        }
    }

    /// ENCODE: CODEMPS or CODELPS depending on the bit.
    pub fn encode(&mut self, contexts: &mut Contexts, cx: usize, bit: u8) {
        let (index, mps) = contexts.0[cx];
        let (qe, nmps, nlps, switch) = QE_TABLE[usize::from(index)];

        self.a -= qe;

        if bit == mps {
            if self.a & 0x8000 == 0 {
                if self.a < qe {
                    self.a = qe;
                } else {
                    self.c += qe;
                }
                contexts.0[cx].0 = nmps;
                self.renormalize();
            } else {
                self.c += qe;
            }
        } else {
            if self.a < qe {
                self.c += qe;
            } else {
                self.a = qe;
            }
            if switch {
                contexts.0[cx].1 = 1 - mps;
            }
            contexts.0[cx].0 = nlps;
            self.renormalize();
        }
    }

    /// Encode an integer with the IAx procedure (Annex A.2). `None` encodes
    /// OOB.
    pub fn encode_integer(&mut self, contexts: &mut Contexts, value: Option<i32>) {
        let (sign, magnitude) = match value {
            None => (1, 0_u32),
            Some(v) => (u8::from(v < 0), v.unsigned_abs()),
        };

        let (prefix, bits, offset): (&[u8], u32, u32) = match magnitude {
            0..=3 => (&[0], 2, 0),
            4..=19 => (&[1, 0], 4, 4),
            20..=83 => (&[1, 1, 0], 6, 20),
            84..=339 => (&[1, 1, 1, 0], 8, 84),
            340..=4435 => (&[1, 1, 1, 1, 0], 12, 340),
            _ => (&[1, 1, 1, 1, 1], 32, 4436),
        };

        let mut prev = 1_usize;
        self.encode_integer_bit(contexts, &mut prev, sign);

        for &bit in prefix {
            self.encode_integer_bit(contexts, &mut prev, bit);
        }

        let value = magnitude - offset;
        for i in (0..bits).rev() {
            self.encode_integer_bit(contexts, &mut prev, ((value >> i) & 1) as u8);
        }
    }

    fn encode_integer_bit(&mut self, contexts: &mut Contexts, prev: &mut usize, bit: u8) {
        self.encode(contexts, *prev, bit);

        let next = (*prev << 1) | usize::from(bit);
        *prev = if *prev < 256 {
            next
        } else {
            (next & 0x1FF) | 0x100
        };
    }

    /// Encode a symbol ID with the IAID procedure (Annex A.3).
    pub fn encode_symbol_id(&mut self, contexts: &mut Contexts, code_len: u32, value: u32) {
        let mut prev = 1_usize;

        for i in (0..code_len).rev() {
            let bit = ((value >> i) & 1) as u8;
            self.encode(contexts, prev, bit);
            prev = (prev << 1) | usize::from(bit);
        }
    }

    /// FLUSH, followed by the 0xFF 0xAC end marker.
    pub fn finish(mut self) -> Vec<u8> {
        let temp = self.c + self.a;
        self.c |= 0xFFFF;
        if self.c >= temp {
            self.c -= 0x8000;
        }

        self.c <<= self.ct;
        self.byte_out();
        self.c <<= self.ct;
        self.byte_out();

        let mut data = self.out.split_off(1);
        if data.last() == Some(&0xFF) {
            data.pop();
        }
        data.extend([0xFF, 0xAC]);

        data
    }

    fn renormalize(&mut self) {
        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.ct == 0 {
                self.byte_out();
            }

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    fn byte_out(&mut self) {
        let last = self.out.len() - 1;

        if self.out[last] == 0xFF {
            self.emit(20);
        } else if self.c < 0x8000000 {
            self.emit(19);
        } else {
            self.out[last] += 1;

            if self.out[last] == 0xFF {
                self.c &= 0x7FFFFFF;
                self.emit(20);
            } else {
                self.emit(19);
            }
        }
    }

    fn emit(&mut self, shift: u32) {
        self.out.push((self.c >> shift) as u8);
        self.c &= (1 << shift) - 1;
        self.ct = 27 - shift;
    }
}

/// Compute the template 0 context of a generic region pixel with the
/// nominal adaptive pixels, in the same bit order as the decoder.
pub fn generic_template0_context(rows: &[Vec<u8>], x: i32, y: i32) -> usize {
    let get = |dx: i32, dy: i32| -> usize {
        let (px, py) = (x + dx, y + dy);
        if px < 0 || py < 0 {
            return 0;
        }
        rows.get(py as usize)
            .and_then(|row| row.get(px as usize))
            .map(|&p| usize::from(p != 0))
            .unwrap_or(0)
    };

    let pixels = [
        (-1, 0),
        (-2, 0),
        (-3, 0),
        (-4, 0),
        (3, -1),
        (2, -1),
        (1, -1),
        (0, -1),
        (-1, -1),
        (-2, -1),
        (-3, -1),
        (2, -2),
        (1, -2),
        (0, -2),
        (-1, -2),
        (-2, -2),
    ];

    pixels
        .iter()
        .enumerate()
        .fold(0, |ctx, (bit, &(dx, dy))| ctx | (get(dx, dy) << bit))
}

/// Arithmetically code a bitmap as a template 0 generic region without
/// typical prediction.
pub fn encode_generic_template0(rows: &[Vec<u8>]) -> Vec<u8> {
    let mut encoder = MqEncoder::new();
    let mut contexts = Contexts::new(16);

    for (y, row) in rows.iter().enumerate() {
        for (x, &pixel) in row.iter().enumerate() {
            let cx = generic_template0_context(rows, x as i32, y as i32);
            encoder.encode(&mut contexts, cx, u8::from(pixel != 0));
        }
    }

    encoder.finish()
}
