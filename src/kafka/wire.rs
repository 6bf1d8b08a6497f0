//! Byte-level cursors shared by every Kafka request/response pair
//! (§4.3.1), patterned after the classic SimpleConsumer wire layer.

use crate::error::{Error, Result};

pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// `i16`-length-prefixed string; `None` is written as length `-1`.
    pub fn write_string(&mut self, s: &str) {
        self.write_i16(s.len() as i16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// `i32`-length-prefixed byte array; `None` is written as length `-1`.
    pub fn write_bytes(&mut self, bytes: Option<&[u8]>) {
        match bytes {
            Some(b) => {
                self.write_i32(b.len() as i32);
                self.buf.extend_from_slice(b);
            }
            None => self.write_i32(-1),
        }
    }

    pub fn write_array_len(&mut self, len: usize) {
        self.write_i32(len as i32);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Protocol(format!(
                "unexpected end of buffer: wanted {n} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        let arr: [u8; 8] = b.try_into().expect("slice of len 8");
        Ok(i64::from_be_bytes(arr))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_i32()? as u32)
    }

    /// `i16`-length-prefixed string; a negative length is an empty string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i16()?;
        if len < 0 {
            return Ok(String::new());
        }
        let bytes = self.take(len as usize)?;
        Ok(String::from_utf8_lossy(bytes).to_string())
    }

    /// `i32`-length-prefixed byte array; a negative length is `None`.
    pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }

    pub fn read_array_len(&mut self) -> Result<i32> {
        self.read_i32()
    }

    pub fn take_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives() {
        let mut w = ByteWriter::new();
        w.write_i16(7);
        w.write_i32(-42);
        w.write_i64(9_000_000_000);
        w.write_string("topic");
        w.write_bytes(Some(b"value"));
        w.write_bytes(None);
        let bytes = w.into_vec();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_i16().unwrap(), 7);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert_eq!(r.read_i64().unwrap(), 9_000_000_000);
        assert_eq!(r.read_string().unwrap(), "topic");
        assert_eq!(r.read_bytes().unwrap(), Some(b"value".to_vec()));
        assert_eq!(r.read_bytes().unwrap(), None);
    }

    #[test]
    fn truncated_buffer_is_protocol_error() {
        let mut r = ByteReader::new(&[0, 1]);
        assert!(matches!(r.read_i32(), Err(Error::Protocol(_))));
    }
}
