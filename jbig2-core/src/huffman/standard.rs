//! The standard Huffman tables (B.5).

use super::{HuffmanTable, LineKind, TableLine};

/// One of the fifteen standard tables, B.1 (`A`) through B.15 (`O`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StandardTable {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
}

impl StandardTable {
    #[cfg(test)]
    pub(crate) const ALL: [Self; 15] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
        Self::I,
        Self::J,
        Self::K,
        Self::L,
        Self::M,
        Self::N,
        Self::O,
    ];

    pub(crate) fn table(self) -> &'static HuffmanTable {
        match self {
            Self::A => &A,
            Self::B => &B,
            Self::C => &C,
            Self::D => &D,
            Self::E => &E,
            Self::F => &F,
            Self::G => &G,
            Self::H => &H,
            Self::I => &I,
            Self::J => &J,
            Self::K => &K,
            Self::L => &L,
            Self::M => &M,
            Self::N => &N,
            Self::O => &O,
        }
    }
}

static A: HuffmanTable = HuffmanTable::from_static(&TABLE_A);
static B: HuffmanTable = HuffmanTable::from_static(&TABLE_B);
static C: HuffmanTable = HuffmanTable::from_static(&TABLE_C);
static D: HuffmanTable = HuffmanTable::from_static(&TABLE_D);
static E: HuffmanTable = HuffmanTable::from_static(&TABLE_E);
static F: HuffmanTable = HuffmanTable::from_static(&TABLE_F);
static G: HuffmanTable = HuffmanTable::from_static(&TABLE_G);
static H: HuffmanTable = HuffmanTable::from_static(&TABLE_H);
static I: HuffmanTable = HuffmanTable::from_static(&TABLE_I);
static J: HuffmanTable = HuffmanTable::from_static(&TABLE_J);
static K: HuffmanTable = HuffmanTable::from_static(&TABLE_K);
static L: HuffmanTable = HuffmanTable::from_static(&TABLE_L);
static M: HuffmanTable = HuffmanTable::from_static(&TABLE_M);
static N: HuffmanTable = HuffmanTable::from_static(&TABLE_N);
static O: HuffmanTable = HuffmanTable::from_static(&TABLE_O);

const S: LineKind = LineKind::Standard;
const NEG: LineKind = LineKind::Negative;
const OOB: LineKind = LineKind::OutOfBand;

const fn line(value: i32, prefix_len: u8, range_len: u8, prefix: u32, kind: LineKind) -> TableLine {
    TableLine::with_prefix(value, prefix_len, range_len, prefix, kind)
}

// The lines are sorted by prefix length, and every prefix is given
// literally. The lower range lines use a 32-bit offset that is subtracted.

static TABLE_A: [TableLine; 4] = [
    line(0, 1, 4, 0b0, S),
    line(16, 2, 8, 0b10, S),
    line(272, 3, 16, 0b110, S),
    line(65808, 3, 32, 0b111, S),
];

static TABLE_B: [TableLine; 7] = [
    line(0, 1, 0, 0b0, S),
    line(1, 2, 0, 0b10, S),
    line(2, 3, 0, 0b110, S),
    line(3, 4, 3, 0b1110, S),
    line(11, 5, 6, 0b11110, S),
    line(0, 6, 0, 0b111111, OOB),
    line(75, 6, 32, 0b111110, S),
];

static TABLE_C: [TableLine; 9] = [
    line(0, 1, 0, 0b0, S),
    line(1, 2, 0, 0b10, S),
    line(2, 3, 0, 0b110, S),
    line(3, 4, 3, 0b1110, S),
    line(11, 5, 6, 0b11110, S),
    line(0, 6, 0, 0b111110, OOB),
    line(75, 7, 32, 0b1111110, S),
    line(-257, 8, 32, 0b11111111, NEG),
    line(-256, 8, 8, 0b11111110, S),
];

static TABLE_D: [TableLine; 6] = [
    line(1, 1, 0, 0b0, S),
    line(2, 2, 0, 0b10, S),
    line(3, 3, 0, 0b110, S),
    line(4, 4, 3, 0b1110, S),
    line(12, 5, 6, 0b11110, S),
    line(76, 5, 32, 0b11111, S),
];

static TABLE_E: [TableLine; 8] = [
    line(1, 1, 0, 0b0, S),
    line(2, 2, 0, 0b10, S),
    line(3, 3, 0, 0b110, S),
    line(4, 4, 3, 0b1110, S),
    line(12, 5, 6, 0b11110, S),
    line(76, 6, 32, 0b111110, S),
    line(-256, 7, 32, 0b1111111, NEG),
    line(-255, 7, 8, 0b1111110, S),
];

static TABLE_F: [TableLine; 14] = [
    line(0, 2, 7, 0b00, S),
    line(128, 3, 7, 0b010, S),
    line(256, 3, 8, 0b011, S),
    line(-1024, 4, 9, 0b1000, S),
    line(-512, 4, 8, 0b1001, S),
    line(-256, 4, 7, 0b1010, S),
    line(-32, 4, 5, 0b1011, S),
    line(512, 4, 9, 0b1100, S),
    line(1024, 4, 10, 0b1101, S),
    line(-2048, 5, 10, 0b11100, S),
    line(-128, 5, 6, 0b11101, S),
    line(-64, 5, 5, 0b11110, S),
    line(-2049, 6, 32, 0b111110, NEG),
    line(2048, 6, 32, 0b111111, S),
];

static TABLE_G: [TableLine; 15] = [
    line(-512, 3, 8, 0b000, S),
    line(256, 3, 8, 0b001, S),
    line(512, 3, 9, 0b010, S),
    line(1024, 3, 10, 0b011, S),
    line(-1024, 4, 9, 0b1000, S),
    line(-256, 4, 7, 0b1001, S),
    line(-32, 4, 5, 0b1010, S),
    line(0, 4, 5, 0b1011, S),
    line(128, 4, 7, 0b1100, S),
    line(-1025, 5, 32, 0b11110, NEG),
    line(-128, 5, 6, 0b11010, S),
    line(-64, 5, 5, 0b11011, S),
    line(32, 5, 5, 0b11100, S),
    line(64, 5, 6, 0b11101, S),
    line(2048, 5, 32, 0b11111, S),
];

static TABLE_H: [TableLine; 21] = [
    line(0, 2, 1, 0b00, S),
    line(0, 2, 0, 0b01, OOB),
    line(4, 3, 4, 0b100, S),
    line(-1, 4, 0, 0b1010, S),
    line(22, 4, 4, 0b1011, S),
    line(38, 4, 5, 0b1100, S),
    line(2, 5, 0, 0b11010, S),
    line(70, 5, 6, 0b11011, S),
    line(134, 5, 7, 0b11100, S),
    line(3, 6, 0, 0b111010, S),
    line(20, 6, 1, 0b111011, S),
    line(262, 6, 7, 0b111100, S),
    line(646, 6, 10, 0b111101, S),
    line(-2, 7, 0, 0b1111100, S),
    line(390, 7, 8, 0b1111101, S),
    line(-15, 8, 3, 0b11111100, S),
    line(-5, 8, 1, 0b11111101, S),
    line(-16, 9, 32, 0b111111110, NEG),
    line(-7, 9, 1, 0b111111100, S),
    line(-3, 9, 0, 0b111111101, S),
    line(1670, 9, 32, 0b111111111, S),
];

static TABLE_I: [TableLine; 22] = [
    line(0, 2, 0, 0b00, OOB),
    line(-1, 3, 1, 0b010, S),
    line(1, 3, 1, 0b011, S),
    line(7, 3, 5, 0b100, S),
    line(-3, 4, 1, 0b1010, S),
    line(43, 4, 5, 0b1011, S),
    line(75, 4, 6, 0b1100, S),
    line(3, 5, 1, 0b11010, S),
    line(139, 5, 7, 0b11011, S),
    line(267, 5, 8, 0b11100, S),
    line(5, 6, 1, 0b111010, S),
    line(39, 6, 2, 0b111011, S),
    line(523, 6, 8, 0b111100, S),
    line(1291, 6, 11, 0b111101, S),
    line(-5, 7, 1, 0b1111100, S),
    line(779, 7, 9, 0b1111101, S),
    line(-31, 8, 4, 0b11111100, S),
    line(-11, 8, 2, 0b11111101, S),
    line(-32, 9, 32, 0b111111110, NEG),
    line(-15, 9, 2, 0b111111100, S),
    line(-7, 9, 1, 0b111111101, S),
    line(3339, 9, 32, 0b111111111, S),
];

static TABLE_J: [TableLine; 21] = [
    line(-2, 2, 2, 0b00, S),
    line(0, 2, 0, 0b10, OOB),
    line(6, 2, 6, 0b01, S),
    line(-3, 5, 0, 0b11000, S),
    line(2, 5, 0, 0b11001, S),
    line(70, 5, 5, 0b11010, S),
    line(3, 6, 0, 0b110110, S),
    line(102, 6, 5, 0b110111, S),
    line(134, 6, 6, 0b111000, S),
    line(198, 6, 7, 0b111001, S),
    line(326, 6, 8, 0b111010, S),
    line(582, 6, 9, 0b111011, S),
    line(1094, 6, 10, 0b111100, S),
    line(-21, 7, 4, 0b1111010, S),
    line(-4, 7, 0, 0b1111011, S),
    line(4, 7, 0, 0b1111100, S),
    line(2118, 7, 11, 0b1111101, S),
    line(-22, 8, 32, 0b11111110, NEG),
    line(-5, 8, 0, 0b11111100, S),
    line(5, 8, 0, 0b11111101, S),
    line(4166, 8, 32, 0b11111111, S),
];

static TABLE_K: [TableLine; 13] = [
    line(1, 1, 0, 0b0, S),
    line(2, 2, 1, 0b10, S),
    line(4, 4, 0, 0b1100, S),
    line(5, 4, 1, 0b1101, S),
    line(7, 5, 1, 0b11100, S),
    line(9, 5, 2, 0b11101, S),
    line(13, 6, 2, 0b111100, S),
    line(17, 7, 2, 0b1111010, S),
    line(21, 7, 3, 0b1111011, S),
    line(29, 7, 4, 0b1111100, S),
    line(45, 7, 5, 0b1111101, S),
    line(77, 7, 6, 0b1111110, S),
    line(141, 7, 32, 0b1111111, S),
];

static TABLE_L: [TableLine; 13] = [
    line(1, 1, 0, 0b0, S),
    line(2, 2, 0, 0b10, S),
    line(3, 3, 1, 0b110, S),
    line(5, 5, 0, 0b11100, S),
    line(6, 5, 1, 0b11101, S),
    line(8, 6, 1, 0b111100, S),
    line(10, 7, 0, 0b1111010, S),
    line(11, 7, 1, 0b1111011, S),
    line(13, 7, 2, 0b1111100, S),
    line(17, 7, 3, 0b1111101, S),
    line(25, 7, 4, 0b1111110, S),
    line(41, 8, 5, 0b11111110, S),
    line(73, 8, 32, 0b11111111, S),
];

static TABLE_M: [TableLine; 13] = [
    line(1, 1, 0, 0b0, S),
    line(2, 3, 0, 0b100, S),
    line(7, 3, 3, 0b101, S),
    line(3, 4, 0, 0b1100, S),
    line(5, 4, 1, 0b1101, S),
    line(4, 5, 0, 0b11100, S),
    line(15, 6, 1, 0b111010, S),
    line(17, 6, 2, 0b111011, S),
    line(21, 6, 3, 0b111100, S),
    line(29, 6, 4, 0b111101, S),
    line(45, 6, 5, 0b111110, S),
    line(77, 7, 6, 0b1111110, S),
    line(141, 7, 32, 0b1111111, S),
];

static TABLE_N: [TableLine; 5] = [
    line(0, 1, 0, 0b0, S),
    line(-2, 3, 0, 0b100, S),
    line(-1, 3, 0, 0b101, S),
    line(1, 3, 0, 0b110, S),
    line(2, 3, 0, 0b111, S),
];

static TABLE_O: [TableLine; 13] = [
    line(0, 1, 0, 0b0, S),
    line(-1, 3, 0, 0b100, S),
    line(1, 3, 0, 0b101, S),
    line(-2, 4, 0, 0b1100, S),
    line(2, 4, 0, 0b1101, S),
    line(-4, 5, 1, 0b11100, S),
    line(3, 5, 1, 0b11101, S),
    line(-8, 6, 2, 0b111100, S),
    line(5, 6, 2, 0b111101, S),
    line(-25, 7, 32, 0b1111110, NEG),
    line(-24, 7, 4, 0b1111100, S),
    line(9, 7, 4, 0b1111101, S),
    line(25, 7, 32, 0b1111111, S),
];
