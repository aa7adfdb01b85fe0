// stream.rs - bounds-checked little-endian cursor and lump record codec

use crate::error::{BspError, BspResult};
use crate::q_shared::Vec3;

// ============================================================
// Reader
// ============================================================

/// Little-endian cursor over a byte buffer. Every read is bounds
/// checked; running off the end is an error, never a panic.
pub struct BspReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BspReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BspReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn seek(&mut self, pos: usize) -> BspResult<()> {
        if pos > self.data.len() {
            return Err(BspError::UnexpectedEof {
                offset: pos,
                wanted: 0,
                size: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> BspResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(BspError::UnexpectedEof {
                offset: self.pos,
                wanted: n,
                size: self.data.len(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> BspResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i16(&mut self) -> BspResult<i16> {
        let b = self.read_bytes(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u16(&mut self) -> BspResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self) -> BspResult<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> BspResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> BspResult<f32> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_vec3(&mut self) -> BspResult<Vec3> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    pub fn read_i16_vec3(&mut self) -> BspResult<[i16; 3]> {
        Ok([self.read_i16()?, self.read_i16()?, self.read_i16()?])
    }
}

// ============================================================
// Writer helpers
// ============================================================

pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_vec3(out: &mut Vec<u8>, v: &Vec3) {
    put_f32(out, v[0]);
    put_f32(out, v[1]);
    put_f32(out, v[2]);
}

pub fn put_i16_vec3(out: &mut Vec<u8>, v: &[i16; 3]) {
    put_i16(out, v[0]);
    put_i16(out, v[1]);
    put_i16(out, v[2]);
}

/// Pad with zero bytes until the buffer length is a multiple of 4.
/// Lump starts and the BSPX directory are always 4-aligned.
pub fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

// ============================================================
// Lump record codec
// ============================================================

/// A fixed-size on-disk record. `DISK_SIZE` is the exact byte stride in
/// the file, independent of the in-memory layout.
pub trait LumpRecord: Sized {
    const DISK_SIZE: usize;

    fn read(r: &mut BspReader) -> BspResult<Self>;
    fn write(&self, out: &mut Vec<u8>);
}

/// Parse a whole lump into records, rejecting funny sizes.
pub fn parse_records<T: LumpRecord>(lump: &'static str, bytes: &[u8]) -> BspResult<Vec<T>> {
    if !bytes.len().is_multiple_of(T::DISK_SIZE) {
        return Err(BspError::LumpSizeMismatch {
            lump,
            length: bytes.len(),
            record_size: T::DISK_SIZE,
        });
    }
    let count = bytes.len() / T::DISK_SIZE;
    let mut r = BspReader::new(bytes);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(T::read(&mut r)?);
    }
    Ok(out)
}

/// Serialize records back to their on-disk form.
pub fn write_records<T: LumpRecord>(items: &[T], out: &mut Vec<u8>) {
    for item in items {
        item.write(out);
    }
}

impl LumpRecord for u16 {
    const DISK_SIZE: usize = 2;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        r.read_u16()
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, *self);
    }
}

impl LumpRecord for u32 {
    const DISK_SIZE: usize = 4;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        r.read_u32()
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u32(out, *self);
    }
}

impl LumpRecord for i32 {
    const DISK_SIZE: usize = 4;

    fn read(r: &mut BspReader) -> BspResult<Self> {
        r.read_i32()
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_i32(out, *self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_basics() {
        let data = [0x01, 0x00, 0xff, 0xff, 0x00, 0x00, 0x80, 0x3f];
        let mut r = BspReader::new(&data);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert_eq!(r.read_i16().unwrap(), -1);
        assert_eq!(r.read_f32().unwrap(), 1.0);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_eof() {
        let data = [0x01, 0x02];
        let mut r = BspReader::new(&data);
        let err = r.read_i32().unwrap_err();
        assert!(matches!(err, BspError::UnexpectedEof { wanted: 4, .. }));
        // failed read consumes nothing
        assert_eq!(r.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn test_reader_seek() {
        let data = [0u8; 16];
        let mut r = BspReader::new(&data);
        r.seek(12).unwrap();
        assert_eq!(r.remaining(), 4);
        assert!(r.seek(17).is_err());
    }

    #[test]
    fn test_align4() {
        let mut buf = vec![1u8, 2, 3];
        align4(&mut buf);
        assert_eq!(buf.len(), 4);
        align4(&mut buf);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_parse_records_funny_size() {
        let bytes = [0u8; 6];
        let err = parse_records::<u32>("surfedges", &bytes).unwrap_err();
        assert!(matches!(
            err,
            BspError::LumpSizeMismatch {
                lump: "surfedges",
                length: 6,
                record_size: 4,
            }
        ));
    }

    #[test]
    fn test_primitive_records() {
        let items: Vec<u16> = vec![3, 65535, 0];
        let mut buf = Vec::new();
        write_records(&items, &mut buf);
        assert_eq!(buf.len(), 6);
        let back = parse_records::<u16>("marksurfaces", &buf).unwrap();
        assert_eq!(back, items);
    }
}
