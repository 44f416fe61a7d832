//! Canonical binary codec for ledger objects.
//!
//! Every object has exactly one byte representation. Integers are written
//! big-endian, enumerants as single bytes, hashes and accounts at their
//! fixed width, and variable-length payloads behind a big-endian u32
//! length prefix. Decoding is strict: trailing bytes, short input and
//! unknown enumerants are all rejected.

use crate::error::{LedgerError, Result};

/// Cursor over an input byte slice used by `Canonical::decode`.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(LedgerError::InvalidEncoding(format!(
                "insufficient bytes: need {} have {}",
                n,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    /// Read a u32-length-prefixed byte string
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Fail unless every byte was consumed
    pub fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(LedgerError::InvalidEncoding(format!(
                "{} leftover bytes after decoding",
                self.remaining()
            )));
        }
        Ok(())
    }
}

pub fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Write a u32-length-prefixed byte string
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| {
        LedgerError::InvalidEncoding(format!("payload of {} bytes too long", data.len()))
    })?;
    write_u32(buf, len);
    buf.extend_from_slice(data);
    Ok(())
}

/// A type with a single canonical byte representation.
///
/// `encode` validates the object before writing so an ill-formed object
/// can never reach the wire. `decode` validates after reading.
pub trait Canonical: Sized {
    /// Append the canonical encoding of `self` to `buf`.
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()>;

    /// Read one instance of `Self` from `reader`, leaving any following
    /// bytes unread.
    fn decode(reader: &mut Reader<'_>) -> Result<Self>;

    /// Serialize to a fresh vector.
    fn marshal_binary(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Deserialize from a complete encoding. Leftover bytes are an error.
    fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let value = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    /// Serialize and hex-encode
    fn marshal_hex(&self) -> Result<String> {
        Ok(hex::encode(self.marshal_binary()?))
    }

    /// Hex-decode and deserialize
    fn unmarshal_hex(s: &str) -> Result<Self> {
        let data = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| LedgerError::InvalidEncoding(e.to_string()))?;
        Self::unmarshal_binary(&data)
    }
}
