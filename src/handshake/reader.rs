//! Bounds-checked cursor over untrusted handshake bytes.

use crate::handshake::ParseError;

/// Reads big-endian integers and slices, failing instead of panicking when
/// the input runs out.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_consumed(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], ParseError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(ParseError::Truncated {
                field,
                needed: len,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self, field: &'static str) -> Result<u8, ParseError> {
        Ok(self.take(field, 1)?[0])
    }

    pub(crate) fn read_u16(&mut self, field: &'static str) -> Result<u16, ParseError> {
        let b = self.take(field, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u24(&mut self, field: &'static str) -> Result<u32, ParseError> {
        let b = self.take(field, 3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub(crate) fn read_slice(
        &mut self,
        field: &'static str,
        len: usize,
    ) -> Result<&'a [u8], ParseError> {
        self.take(field, len)
    }

    pub(crate) fn read_array<const N: usize>(
        &mut self,
        field: &'static str,
    ) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut r = Reader::new(&data);

        assert_eq!(r.read_u8("a").unwrap(), 0x01);
        assert_eq!(r.read_u16("b").unwrap(), 0x0203);
        assert_eq!(r.read_u24("c").unwrap(), 0x040506);
        assert_eq!(r.read_array::<2>("d").unwrap(), [0x07, 0x08]);
        assert!(r.is_consumed());
    }

    #[test]
    fn test_underrun_is_error() {
        let data = [0x00, 0x05, 0xaa];
        let mut r = Reader::new(&data);

        let len = r.read_u16("len").unwrap() as usize;
        let err = r.read_slice("body", len).unwrap_err();
        assert_eq!(
            err,
            ParseError::Truncated {
                field: "body",
                needed: 5,
                remaining: 1
            }
        );
        // A failed read consumes nothing
        assert_eq!(r.remaining(), 1);
        assert!(r.read_u16("next").is_err());
        assert_eq!(r.read_u8("last").unwrap(), 0xaa);
    }

    #[test]
    fn test_empty_input() {
        let mut r = Reader::new(&[]);
        assert!(r.is_consumed());
        assert!(r.read_u8("x").is_err());
        assert!(r.read_u24("x").is_err());
        assert!(r.read_array::<32>("x").is_err());
        assert!(r.read_slice("x", 0).unwrap().is_empty());
    }
}
