use crate::error::{Result, WireError};

/// Bounds-checked little-endian read cursor over a borrowed buffer.
///
/// Every read either succeeds in full and advances, or fails with
/// [`WireError::OutOfBounds`] and leaves the cursor where it was. No implicit
/// alignment is performed; callers skip padding explicitly.
#[derive(Debug, Clone)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    /// Create a cursor at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn check(&self, size: usize) -> Result<usize> {
        match self.pos.checked_add(size) {
            Some(end) if end <= self.buf.len() => Ok(end),
            _ => Err(WireError::OutOfBounds {
                offset: self.pos,
                requested: size,
                length: self.buf.len(),
            }),
        }
    }

    /// Return the next `size` bytes and advance past them.
    pub fn read_fixed(&mut self, size: usize) -> Result<&'a [u8]> {
        let end = self.check(size)?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Advance past `size` bytes without returning them.
    pub fn skip(&mut self, size: usize) -> Result<()> {
        self.pos = self.check(size)?;
        Ok(())
    }

    /// Skip to the next multiple of `align` relative to the buffer start.
    /// An `align` of 0 or 1 never moves the cursor.
    pub fn align_to(&mut self, align: usize) -> Result<()> {
        self.skip(pad_to(self.pos, align))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_fixed(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Current offset from the buffer start.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True when the cursor sits at the end of the buffer.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }
}

fn pad_to(len: usize, align: usize) -> usize {
    if align == 0 {
        return 0;
    }
    (align - len % align) % align
}

/// Zero bytes needed to bring `len` up to a multiple of 8.
pub fn pad8(len: usize) -> usize {
    pad_to(len, 8)
}

/// Read a little-endian `u32` at `offset` inside `bytes`, if it fits.
pub fn u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset.checked_add(4)?)?;
    let mut out = [0u8; 4];
    out.copy_from_slice(field);
    Some(u32::from_le_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fixed_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut un = Unpacker::new(&data);
        assert_eq!(un.read_fixed(2).unwrap(), &[1, 2]);
        assert_eq!(un.position(), 2);
        assert_eq!(un.remaining(), 3);
    }

    #[test]
    fn test_read_past_end_leaves_cursor() {
        let data = [0u8; 6];
        let mut un = Unpacker::new(&data);
        un.skip(4).unwrap();
        let err = un.read_fixed(4).unwrap_err();
        assert_eq!(
            err,
            WireError::OutOfBounds {
                offset: 4,
                requested: 4,
                length: 6
            }
        );
        assert_eq!(un.position(), 4);
        assert!(un.skip(3).is_err());
        assert_eq!(un.position(), 4);
    }

    #[test]
    fn test_skip_overflow_is_out_of_bounds() {
        let data = [0u8; 8];
        let mut un = Unpacker::new(&data);
        un.skip(1).unwrap();
        assert!(matches!(un.skip(usize::MAX), Err(WireError::OutOfBounds { .. })));
        assert_eq!(un.position(), 1);
    }

    #[test]
    fn test_little_endian_reads() {
        let mut data = Vec::new();
        data.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        data.extend_from_slice(&7u64.to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());
        let mut un = Unpacker::new(&data);
        assert_eq!(un.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(un.read_u64().unwrap(), 7);
        assert_eq!(un.read_f32().unwrap(), 1.5);
        assert!(un.is_exhausted());
    }

    #[test]
    fn test_no_implicit_alignment() {
        let data = [0u8; 16];
        let mut un = Unpacker::new(&data);
        un.read_fixed(3).unwrap();
        assert_eq!(un.position(), 3);
        un.align_to(8).unwrap();
        assert_eq!(un.position(), 8);
        un.align_to(8).unwrap();
        assert_eq!(un.position(), 8);
        un.read_fixed(1).unwrap();
        un.align_to(0).unwrap();
        assert_eq!(un.position(), 9);
    }

    #[test]
    fn test_padding_formula() {
        assert_eq!(pad8(0), 0);
        assert_eq!(pad8(5), 3);
        assert_eq!(pad8(8), 0);
        assert_eq!(pad8(12), 4);
    }

    #[test]
    fn test_u32_at() {
        let header = [0u8, 0, 0, 0, 9, 0, 0, 0];
        assert_eq!(u32_at(&header, 4), Some(9));
        assert_eq!(u32_at(&header, 6), None);
    }
}
