//! Builders for segment streams used by the integration tests.

#![allow(dead_code)]

pub mod mq;

use mq::{Contexts, MqEncoder, encode_generic_template0};

/// The nominal adaptive pixels of generic template 0.
pub const NOMINAL_AT: [u8; 8] = [3, 0xFF, 0xFD, 0xFF, 2, 0xFE, 0xFE, 0xFE];

pub const OR: u8 = 0;
pub const XOR: u8 = 2;
pub const REPLACE: u8 = 4;

/// A segment with a one byte page association and one byte referred-to
/// segment numbers. `length` overrides the data length field.
pub fn segment_with_length(
    number: u32,
    code: u8,
    referred: &[u32],
    length: u32,
    data: &[u8],
) -> Vec<u8> {
    assert!(referred.len() <= 4 && number <= 256);

    let mut out = Vec::new();
    out.extend(number.to_be_bytes());
    out.push(code);
    out.push((referred.len() as u8) << 5);
    out.extend(referred.iter().map(|&r| r as u8));
    out.push(1);
    out.extend(length.to_be_bytes());
    out.extend(data);
    out
}

pub fn segment(number: u32, code: u8, referred: &[u32], data: &[u8]) -> Vec<u8> {
    segment_with_length(number, code, referred, data.len() as u32, data)
}

/// A page information segment. Bit 2 of `flags` is the default pixel.
pub fn page_information(number: u32, width: u32, height: u32, flags: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(width.to_be_bytes());
    data.extend(height.to_be_bytes());
    data.extend([0; 8]);
    data.push(flags);
    data.extend([0, 0]);
    segment(number, 48, &[], &data)
}

pub fn region_info(width: u32, height: u32, x: u32, y: u32, operator: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(width.to_be_bytes());
    data.extend(height.to_be_bytes());
    data.extend(x.to_be_bytes());
    data.extend(y.to_be_bytes());
    data.push(operator);
    data
}

/// The data of an arithmetically coded template 0 generic region.
pub fn generic_region(rows: &[Vec<u8>], x: u32, y: u32, operator: u8) -> Vec<u8> {
    let mut data = region_info(rows[0].len() as u32, rows.len() as u32, x, y, operator);
    data.push(0x00);
    data.extend(NOMINAL_AT);
    data.extend(encode_generic_template0(rows));
    data
}

/// The data of a template 1 refinement region with typical prediction,
/// whose reference is empty. Only the SLTP bits are coded.
pub fn empty_refinement(width: u32, height: u32, x: u32, y: u32, operator: u8) -> Vec<u8> {
    let mut data = region_info(width, height, x, y, operator);
    data.push(0x03);

    let mut encoder = MqEncoder::new();
    let mut contexts = Contexts::new(10);
    for row in 0..height {
        encoder.encode(&mut contexts, 0x0008, u8::from(row == 0));
    }
    data.extend(encoder.finish());
    data
}

/// A Huffman coded symbol dictionary with a single uncompressed 2 x 2
/// symbol of set pixels.
pub fn square_dictionary(number: u32) -> Vec<u8> {
    let data = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0xB7, 0xE0, 0xC0, 0xC0, 0x00,
        0x40,
    ];
    segment(number, 0, &[], &data)
}

/// A Huffman coded 4 x 4 text region that places one symbol of the
/// referred-to dictionary at its top left corner.
pub fn single_symbol_text_region(number: u32, dictionary: u32) -> Vec<u8> {
    let mut data = region_info(4, 4, 0, 0, REPLACE);
    data.extend(0x0011_u16.to_be_bytes());
    data.extend(0_u16.to_be_bytes());
    data.extend(1_u32.to_be_bytes());
    data.push(0x01);
    data.extend([0; 17]);
    data.extend([0x00, 0x04]);
    segment(number, 6, &[dictionary], &data)
}

/// A 4 x 4 generic region showing a diagonal.
pub fn diagonal() -> Vec<Vec<u8>> {
    (0..4)
        .map(|y| (0..4).map(|x| u8::from(x == y)).collect())
        .collect()
}

/// The pixels of a decoded image as rows of 0 and 1.
pub fn pixels(image: &jbig2_core::PackedImage) -> Vec<Vec<u8>> {
    (0..image.height)
        .map(|y| {
            (0..image.width)
                .map(|x| u8::from(image.pixel(x, y)))
                .collect()
        })
        .collect()
}

/// A standalone file header for a single page file.
pub fn file_header(sequential: bool) -> Vec<u8> {
    let mut data = vec![0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];
    data.push(u8::from(sequential));
    data.extend(1_u32.to_be_bytes());
    data
}
