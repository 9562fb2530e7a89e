//! A big-endian cursor over segment data.

/// Reads bits and big-endian integers from a byte slice.
///
/// Every read that would go past the end of the data returns `None` and
/// leaves the cursor where it was. Callers turn that into
/// [`ParseError::UnexpectedEof`].
///
/// [`ParseError::UnexpectedEof`]: crate::error::ParseError::UnexpectedEof
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    /// Offset of the next bit to read, counted from the first byte.
    bit_offset: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_offset: 0,
        }
    }

    /// Discard the remaining bits of a partially read byte.
    #[inline]
    pub(crate) fn align(&mut self) {
        self.bit_offset = self.bit_offset.next_multiple_of(8);
    }

    #[inline]
    pub(crate) fn at_end(&self) -> bool {
        self.byte_offset() >= self.data.len()
    }

    /// Everything from the current byte to the end of the data.
    #[inline]
    pub(crate) fn tail(&self) -> &'a [u8] {
        self.data.get(self.byte_offset()..).unwrap_or_default()
    }

    /// The number of bytes consumed so far. A partially read byte counts as
    /// consumed.
    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.bit_offset.div_ceil(8)
    }

    pub(crate) fn skip_to_end(&mut self) {
        self.bit_offset = self.data.len() * 8;
    }

    /// Take the next `len` bytes. The reader must be byte-aligned.
    #[inline]
    pub(crate) fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.bit_offset += len * 8;

        Some(bytes)
    }

    /// Split off a reader over the next `len` bytes, or over all remaining
    /// bytes if `len` is `None`.
    pub(crate) fn read_substream(&mut self, len: Option<usize>) -> Option<Self> {
        let len = len.unwrap_or_else(|| self.tail().len());

        self.read_bytes(len).map(Reader::new)
    }

    #[inline]
    pub(crate) fn skip_bytes(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// The next `len` bytes, without consuming them. The reader must be
    /// byte-aligned.
    #[inline]
    pub(crate) fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        debug_assert_eq!(self.bit_offset % 8, 0, "reader is not byte-aligned");

        let start = self.byte_offset();
        self.data.get(start..start.checked_add(len)?)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.read_bytes(N)?.try_into().ok()
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[b]| b)
    }

    #[inline]
    pub(crate) fn read_i8(&mut self) -> Option<i8> {
        self.read_array().map(i8::from_be_bytes)
    }

    #[inline]
    pub(crate) fn read_u16(&mut self) -> Option<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    #[inline]
    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    #[inline]
    pub(crate) fn read_i32(&mut self) -> Option<i32> {
        self.read_array().map(i32::from_be_bytes)
    }

    #[inline]
    pub(crate) fn read_bit(&mut self) -> Option<u8> {
        self.read_bits(1).map(|bit| bit as u8)
    }

    /// Read `count` bits (at most 32), most significant bit first.
    #[inline]
    pub(crate) fn read_bits(&mut self, count: u8) -> Option<u32> {
        debug_assert!(count <= 32);

        let count = usize::from(count);
        if self.bit_offset + count > self.data.len() * 8 {
            return None;
        }

        let mut value = 0_u64;
        let mut done = 0;

        while done < count {
            let byte = self.data[self.byte_offset()];
            let used = self.bit_offset % 8;
            let take = (8 - used).min(count - done);
            let bits = (byte >> (8 - used - take)) & (0xFF >> (8 - take));

            value = (value << take) | u64::from(bits);
            self.bit_offset += take;
            done += take;
        }

        Some(value as u32)
    }

    #[inline]
    fn byte_offset(&self) -> usize {
        self.bit_offset / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_bit_and_byte_reads() {
        let data = [0b1011_0110, 0x12, 0x34, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut reader = Reader::new(&data);

        assert_eq!(reader.read_bit(), Some(1));
        assert_eq!(reader.read_bits(3), Some(0b011));
        assert_eq!(reader.position(), 1);
        reader.align();
        assert_eq!(reader.read_u16(), Some(0x1234));
        assert_eq!(reader.read_i32(), Some(-2));
        assert!(reader.at_end());
        assert_eq!(reader.read_byte(), None);
    }

    #[test]
    fn bits_across_bytes() {
        let data = [0x0F, 0xF0, 0xAA, 0x55, 0x01];
        let mut reader = Reader::new(&data);

        assert_eq!(reader.read_bits(4), Some(0x0));
        assert_eq!(reader.read_bits(8), Some(0xFF));
        assert_eq!(reader.read_bits(28), Some(0x0AA5501));
        assert_eq!(reader.read_bits(1), None);
    }

    #[test]
    fn failed_reads_keep_the_position() {
        let data = [0xAB, 0xCD];
        let mut reader = Reader::new(&data);

        assert_eq!(reader.read_bits(3), Some(0b101));
        assert_eq!(reader.read_bits(14), None);
        assert_eq!(reader.read_bits(13), Some(0b0_1011_1100_1101));
        assert!(reader.at_end());
    }

    #[test]
    fn substreams() {
        let data = [1, 2, 3, 4, 5];
        let mut reader = Reader::new(&data);

        let mut sub = reader.read_substream(Some(2)).unwrap();
        assert_eq!(sub.read_u16(), Some(0x0102));
        assert_eq!(sub.read_byte(), None);

        assert_eq!(reader.read_i8(), Some(3));
        assert!(reader.read_substream(Some(3)).is_none());

        let rest = reader.read_substream(None).unwrap();
        assert_eq!(rest.tail(), &[4, 5]);
        assert!(reader.at_end());
        assert_eq!(reader.read_substream(None).map(|r| r.tail().len()), Some(0));
    }
}
