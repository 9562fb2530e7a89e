//! Bit-level access to MMR coded data.

use crate::tables::{BLACK_RUNS, CodeTable, MAX_CODE_LEN, MODES, Mode, WHITE_RUNS};
use crate::{DecodeError, Result};

#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    bit_offset: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_offset: 0,
        }
    }

    #[inline]
    pub(crate) fn read_bit(&mut self) -> Result<u32> {
        let byte = *self
            .data
            .get(self.bit_offset >> 3)
            .ok_or(DecodeError::UnexpectedEof)?;
        let shift = 7 - (self.bit_offset & 7);
        self.bit_offset += 1;

        Ok(u32::from(byte >> shift) & 1)
    }

    pub(crate) fn read_bits(&mut self, count: u32) -> Result<u32> {
        let mut value = 0;

        for _ in 0..count {
            value = (value << 1) | self.read_bit()?;
        }

        Ok(value)
    }

    pub(crate) fn peek_bits(&self, count: u32) -> Result<u32> {
        self.clone().read_bits(count)
    }

    pub(crate) fn align(&mut self) {
        self.bit_offset = self.bit_offset.next_multiple_of(8);
    }

    pub(crate) fn byte_pos(&self) -> usize {
        self.bit_offset.div_ceil(8)
    }

    fn read_code<T: Copy>(&mut self, table: &CodeTable<T>) -> Result<T> {
        let mut code = 0;

        for len in 1..=MAX_CODE_LEN {
            code = (code << 1) | self.read_bit()?;

            if let Some(value) = table.get(len, code) {
                return Ok(value);
            }
        }

        Err(DecodeError::InvalidCode)
    }

    pub(crate) fn read_mode(&mut self) -> Result<Mode> {
        self.read_code(&MODES)
    }

    /// Read a complete run: any number of make-up codes followed by one
    /// terminating code.
    pub(crate) fn read_run(&mut self, white: bool) -> Result<usize> {
        let table = if white { &*WHITE_RUNS } else { &*BLACK_RUNS };
        let mut total = 0_usize;

        loop {
            let len = self.read_code(table)?;
            total = total
                .checked_add(usize::from(len))
                .ok_or(DecodeError::Overflow)?;

            if len < 64 {
                return Ok(total);
            }
        }
    }
}
