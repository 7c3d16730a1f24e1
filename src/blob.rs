use crate::{*, error::*};

// The wire format `send.blob`/`recv.blob` exchange. There is no cross-language compatibility
// requirement here (this crate talks only to itself through these files), so rather than pull
// in a pickle-compatible or serde-based dependency this is a small length-prefixed binary
// encoding: a flat sequence of fixed-width or length-prefixed primitives, read back in the
// same order they were written.

pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Writer {
        Writer {buf: Vec::new()}
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(v as u8)
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.write_u32(v.len() as u32);
        self.buf.extend_from_slice(v);
        self
    }

    pub fn write_str(&mut self, v: &str) -> &mut Self {
        self.write_bytes(v.as_bytes());
        self
    }

    pub fn write_opt_str(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            Some(s) => {self.write_bool(true); self.write_str(s);}
            None => {self.write_bool(false);}
        }
        self
    }
}

impl Default for Writer {
    fn default() -> Self { Writer::new() }
}

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader {buf, pos: 0}
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(Error::new(ErrorKind::Protocol, "blob truncated".to_string()));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let n = self.read_u32()? as usize;
        Ok(self.take(n)?.to_vec())
    }

    pub fn read_str(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::Protocol, e.to_string()))
    }

    pub fn read_opt_str(&mut self) -> Result<Option<String>> {
        if self.read_bool()? {
            Ok(Some(self.read_str()?))
        } else {
            Ok(None)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_primitives() {
        let mut w = Writer::new();
        w.write_u8(7).write_u64(0xdead_beef_u64).write_str("hello").write_opt_str(None).write_bool(true);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u64().unwrap(), 0xdead_beef_u64);
        assert_eq!(r.read_str().unwrap(), "hello");
        assert_eq!(r.read_opt_str().unwrap(), None);
        assert!(r.read_bool().unwrap());
        assert!(r.is_empty());
    }

    #[test]
    fn truncated_buffer_is_an_error() {
        let mut r = Reader::new(&[1, 2]);
        assert!(r.read_u64().is_err());
    }
}
