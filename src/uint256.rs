//! 256-bit unsigned integer with checked arithmetic.
//!
//! All arithmetic fails explicitly instead of wrapping: overflow,
//! underflow and division by zero each produce an `Economic` error.

use crate::codec::{Canonical, Reader};
use crate::constants::BASE_DATASIZE_CONST;
use crate::error::{LedgerError, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

const LIMBS: usize = 8;

/// Uint256 as eight 32-bit limbs, least significant limb first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uint256([u32; LIMBS]);

fn overflow(op: &str) -> LedgerError {
    LedgerError::Economic(format!("uint256 overflow in {}", op))
}

impl Uint256 {
    pub const fn zero() -> Self {
        Uint256([0; LIMBS])
    }

    pub const fn one() -> Self {
        Uint256([1, 0, 0, 0, 0, 0, 0, 0])
    }

    pub const fn two() -> Self {
        Uint256([2, 0, 0, 0, 0, 0, 0, 0])
    }

    pub const fn max() -> Self {
        Uint256([u32::MAX; LIMBS])
    }

    /// Per-record DataStore overhead as a Uint256
    pub const fn base_datasize_const() -> Self {
        Uint256([BASE_DATASIZE_CONST, 0, 0, 0, 0, 0, 0, 0])
    }

    pub const fn from_u32(value: u32) -> Self {
        Uint256([value, 0, 0, 0, 0, 0, 0, 0])
    }

    pub const fn from_u64(value: u64) -> Self {
        Uint256([value as u32, (value >> 32) as u32, 0, 0, 0, 0, 0, 0])
    }

    /// Build from limbs, least significant first
    pub const fn from_words(words: [u32; LIMBS]) -> Self {
        Uint256(words)
    }

    /// Limbs, least significant first
    pub fn to_words(&self) -> [u32; LIMBS] {
        self.0
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u32; LIMBS];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            let mut word = [0u8; 4];
            word.copy_from_slice(chunk);
            limbs[LIMBS - 1 - i] = u32::from_be_bytes(word);
        }
        Uint256(limbs)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..LIMBS {
            out[i * 4..i * 4 + 4].copy_from_slice(&self.0[LIMBS - 1 - i].to_be_bytes());
        }
        out
    }

    /// Parse 1..=32 big-endian bytes, left padding with zeros.
    ///
    /// Encoders that strip leading zero bytes are accepted, the value is
    /// restored to its full 32-byte width.
    pub fn from_be_slice(data: &[u8]) -> Result<Self> {
        if data.is_empty() || data.len() > 32 {
            return Err(LedgerError::InvalidEncoding(format!(
                "uint256 needs 1..=32 bytes, got {}",
                data.len()
            )));
        }
        let mut padded = [0u8; 32];
        padded[32 - data.len()..].copy_from_slice(data);
        Ok(Self::from_be_bytes(padded))
    }

    /// Fixed-width lowercase hex without prefix
    pub fn marshal_string(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    /// Parse up to 64 hex digits, optional `0x` prefix
    pub fn unmarshal_string(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 64 {
            return Err(LedgerError::InvalidEncoding(format!(
                "uint256 hex needs 1..=64 digits, got {}",
                digits.len()
            )));
        }
        let padded = format!("{:0>64}", digits);
        let bytes = hex::decode(padded).map_err(|e| LedgerError::InvalidEncoding(e.to_string()))?;
        Self::from_be_slice(&bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    pub fn to_u64(&self) -> Result<u64> {
        if self.0[2..].iter().any(|&w| w != 0) {
            return Err(overflow("conversion to u64"));
        }
        Ok(((self.0[1] as u64) << 32) | self.0[0] as u64)
    }

    pub fn to_u32(&self) -> Result<u32> {
        if self.0[1..].iter().any(|&w| w != 0) {
            return Err(overflow("conversion to u32"));
        }
        Ok(self.0[0])
    }

    pub fn try_add(&self, other: &Uint256) -> Result<Uint256> {
        let mut out = [0u32; LIMBS];
        let mut carry = 0u64;
        for (i, limb) in out.iter_mut().enumerate() {
            let sum = self.0[i] as u64 + other.0[i] as u64 + carry;
            *limb = sum as u32;
            carry = sum >> 32;
        }
        if carry != 0 {
            return Err(overflow("addition"));
        }
        Ok(Uint256(out))
    }

    fn overflowing_sub(&self, other: &Uint256) -> (Uint256, bool) {
        let mut out = [0u32; LIMBS];
        let mut borrow = false;
        for (i, limb) in out.iter_mut().enumerate() {
            let (d1, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow as u32);
            *limb = d2;
            borrow = b1 || b2;
        }
        (Uint256(out), borrow)
    }

    pub fn try_sub(&self, other: &Uint256) -> Result<Uint256> {
        let (out, borrow) = self.overflowing_sub(other);
        if borrow {
            return Err(LedgerError::Economic("uint256 underflow in subtraction".to_string()));
        }
        Ok(out)
    }

    pub fn try_mul(&self, other: &Uint256) -> Result<Uint256> {
        let mut wide = [0u32; LIMBS * 2];
        for i in 0..LIMBS {
            let mut carry = 0u64;
            for j in 0..LIMBS {
                let cur = wide[i + j] as u64 + self.0[i] as u64 * other.0[j] as u64 + carry;
                wide[i + j] = cur as u32;
                carry = cur >> 32;
            }
            wide[i + LIMBS] = carry as u32;
        }
        if wide[LIMBS..].iter().any(|&w| w != 0) {
            return Err(overflow("multiplication"));
        }
        let mut out = [0u32; LIMBS];
        out.copy_from_slice(&wide[..LIMBS]);
        Ok(Uint256(out))
    }

    fn bit(&self, i: usize) -> bool {
        (self.0[i / 32] >> (i % 32)) & 1 == 1
    }

    fn set_bit(&mut self, i: usize) {
        self.0[i / 32] |= 1 << (i % 32);
    }

    /// Shift left by one, returning the bit shifted out
    fn shl1(&mut self) -> bool {
        let carry = self.0[LIMBS - 1] >> 31 == 1;
        for i in (1..LIMBS).rev() {
            self.0[i] = (self.0[i] << 1) | (self.0[i - 1] >> 31);
        }
        self.0[0] <<= 1;
        carry
    }

    /// Quotient and remainder by binary long division
    pub fn try_div_rem(&self, divisor: &Uint256) -> Result<(Uint256, Uint256)> {
        if divisor.is_zero() {
            return Err(LedgerError::Economic("uint256 division by zero".to_string()));
        }
        if self < divisor {
            return Ok((Uint256::zero(), *self));
        }
        let mut quotient = Uint256::zero();
        let mut rem = Uint256::zero();
        for i in (0..LIMBS * 32).rev() {
            let carry = rem.shl1();
            if self.bit(i) {
                rem.0[0] |= 1;
            }
            // with the carry set the true remainder exceeds 2^256 > divisor
            if carry || rem >= *divisor {
                rem = rem.overflowing_sub(divisor).0;
                quotient.set_bit(i);
            }
        }
        Ok((quotient, rem))
    }

    pub fn try_div(&self, divisor: &Uint256) -> Result<Uint256> {
        Ok(self.try_div_rem(divisor)?.0)
    }

    pub fn try_rem(&self, divisor: &Uint256) -> Result<Uint256> {
        Ok(self.try_div_rem(divisor)?.1)
    }

    fn div_rem_small(&self, divisor: u32) -> (Uint256, u32) {
        let mut out = [0u32; LIMBS];
        let mut rem = 0u64;
        for i in (0..LIMBS).rev() {
            let cur = (rem << 32) | self.0[i] as u64;
            out[i] = (cur / divisor as u64) as u32;
            rem = cur % divisor as u64;
        }
        (Uint256(out), rem as u32)
    }
}

impl From<u32> for Uint256 {
    fn from(value: u32) -> Self {
        Uint256::from_u32(value)
    }
}

impl From<u64> for Uint256 {
    fn from(value: u64) -> Self {
        Uint256::from_u64(value)
    }
}

impl Ord for Uint256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for Uint256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let mut chunks = Vec::new();
        let mut cur = *self;
        while !cur.is_zero() {
            let (q, r) = cur.div_rem_small(1_000_000_000);
            chunks.push(r);
            cur = q;
        }
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
        }
        for chunk in iter {
            write!(f, "{:09}", chunk)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self)
    }
}

impl Canonical for Uint256 {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&self.to_be_bytes());
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Uint256::from_be_bytes(reader.read_array::<32>()?))
    }

    /// Accepts 1..=32 bytes so truncated leading zeros are restored.
    fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        Uint256::from_be_slice(data)
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", self.marshal_string()))
    }
}

struct Uint256Visitor;

impl<'de> Visitor<'de> for Uint256Visitor {
    type Value = Uint256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a hex string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Uint256, E> {
        Ok(Uint256::from_u64(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Uint256, E> {
        Uint256::unmarshal_string(value).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(Uint256Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // ARITHMETIC
    // ============================================================================

    #[test]
    fn test_add_sub() {
        let a = Uint256::from_u64(u64::MAX);
        let b = Uint256::one();
        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.to_words()[2], 1);
        assert_eq!(sum.try_sub(&b).unwrap(), a);
    }

    #[test]
    fn test_add_overflow() {
        assert!(matches!(
            Uint256::max().try_add(&Uint256::one()),
            Err(LedgerError::Economic(_))
        ));
    }

    #[test]
    fn test_sub_underflow() {
        assert!(Uint256::one().try_sub(&Uint256::two()).is_err());
        assert_eq!(Uint256::two().try_sub(&Uint256::two()).unwrap(), Uint256::zero());
    }

    #[test]
    fn test_mul() {
        let a = Uint256::from_u64(1 << 40);
        let b = Uint256::from_u64(1 << 40);
        let p = a.try_mul(&b).unwrap();
        // 2^80
        assert_eq!(p.to_words(), [0, 0, 1 << 16, 0, 0, 0, 0, 0]);
        assert_eq!(Uint256::from(377u32).try_mul(&Uint256::from(5u32)).unwrap(), Uint256::from(1885u32));
    }

    #[test]
    fn test_mul_overflow() {
        assert!(Uint256::max().try_mul(&Uint256::two()).is_err());
        assert_eq!(Uint256::max().try_mul(&Uint256::one()).unwrap(), Uint256::max());
        assert_eq!(Uint256::max().try_mul(&Uint256::zero()).unwrap(), Uint256::zero());
    }

    #[test]
    fn test_div_rem() {
        let a = Uint256::from(1885u32);
        let b = Uint256::from(377u32);
        assert_eq!(a.try_div(&b).unwrap(), Uint256::from(5u32));
        assert_eq!(a.try_rem(&b).unwrap(), Uint256::zero());
        let c = Uint256::from(1886u32);
        assert_eq!(c.try_rem(&b).unwrap(), Uint256::one());
    }

    #[test]
    fn test_div_large_divisor() {
        // divisor above 2^255 exercises the shifted-out carry
        let (q, r) = Uint256::max().try_div_rem(&Uint256::max().try_sub(&Uint256::one()).unwrap()).unwrap();
        assert_eq!(q, Uint256::one());
        assert_eq!(r, Uint256::one());
        let (q, r) = Uint256::max().try_div_rem(&Uint256::max()).unwrap();
        assert_eq!(q, Uint256::one());
        assert!(r.is_zero());
    }

    #[test]
    fn test_div_by_zero() {
        assert!(Uint256::one().try_div(&Uint256::zero()).is_err());
        assert!(Uint256::one().try_rem(&Uint256::zero()).is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Uint256::one() < Uint256::two());
        assert!(Uint256::from_words([0, 0, 0, 0, 0, 0, 0, 1]) > Uint256::from_u64(u64::MAX));
        assert_eq!(Uint256::from(5u32).cmp(&Uint256::from(5u64)), Ordering::Equal);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Uint256::from_u64(123456789012).to_u64().unwrap(), 123456789012);
        assert!(Uint256::from_u64(1 << 40).to_u32().is_err());
        assert!(Uint256::max().to_u64().is_err());
        assert_eq!(Uint256::from(7u32).to_u32().unwrap(), 7);
    }

    // ============================================================================
    // ENCODING
    // ============================================================================

    #[test]
    fn test_binary_round_trip() {
        let v = Uint256::from_words([1, 2, 3, 4, 5, 6, 7, 8]);
        let bytes = v.marshal_binary().unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..4], &[0, 0, 0, 8]);
        assert_eq!(Uint256::unmarshal_binary(&bytes).unwrap(), v);
    }

    #[test]
    fn test_zero_round_trip() {
        let bytes = Uint256::zero().marshal_binary().unwrap();
        assert_eq!(bytes, vec![0u8; 32]);
        assert_eq!(Uint256::unmarshal_binary(&bytes).unwrap(), Uint256::zero());
    }

    #[test]
    fn test_truncated_bytes_restored() {
        let v = Uint256::from(0x0102u32);
        let full = v.marshal_binary().unwrap();
        let v2 = Uint256::unmarshal_binary(&[1, 2]).unwrap();
        assert_eq!(v2, v);
        assert_eq!(v2.marshal_binary().unwrap(), full);
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(Uint256::unmarshal_binary(&[]).is_err());
        assert!(Uint256::unmarshal_binary(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_string_forms() {
        let v = Uint256::from(255u32);
        let s = v.marshal_string();
        assert_eq!(s.len(), 64);
        assert!(s.ends_with("ff"));
        assert_eq!(Uint256::unmarshal_string(&s).unwrap(), v);
        assert_eq!(Uint256::unmarshal_string("0xff").unwrap(), v);
        assert!(Uint256::unmarshal_string("").is_err());
        assert!(Uint256::unmarshal_string("zz").is_err());
    }

    #[test]
    fn test_display_decimal() {
        assert_eq!(Uint256::zero().to_string(), "0");
        assert_eq!(Uint256::from(1885u32).to_string(), "1885");
        assert_eq!(Uint256::from_u64(u64::MAX).to_string(), "18446744073709551615");
        assert_eq!(Uint256::from_u64(1_000_000_000).to_string(), "1000000000");
    }

    #[test]
    fn test_serde_forms() {
        let from_num: Uint256 = serde_json::from_str("42").unwrap();
        let from_hex: Uint256 = serde_json::from_str("\"0x2a\"").unwrap();
        assert_eq!(from_num, Uint256::from(42u32));
        assert_eq!(from_hex, from_num);
        let json = serde_json::to_string(&from_num).unwrap();
        let back: Uint256 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, from_num);
    }
}
