// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed value <-> byte stream encoding used by the port layer.
//!
//! Connectors, buffers and transports only ever see [`ByteData`]. Ports
//! encode once per `write` and decode once per `read` through [`DataCodec`].
//!
//! The format is plain little-endian with `u32` length prefixes for
//! variable-size values. It is a local representation, not a wire standard.

use crate::error::{Error, Result};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable, cheaply clonable serialized record.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteData(Arc<[u8]>);

impl ByteData {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Default for ByteData {
    fn default() -> Self {
        ByteData(Arc::from(Vec::new()))
    }
}

impl Deref for ByteData {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteData {
    fn from(v: Vec<u8>) -> Self {
        ByteData(Arc::from(v))
    }
}

impl From<&[u8]> for ByteData {
    fn from(v: &[u8]) -> Self {
        ByteData(Arc::from(v))
    }
}

impl fmt::Debug for ByteData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 16;
        write!(f, "ByteData({} bytes", self.0.len())?;
        if !self.0.is_empty() {
            let n = self.0.len().min(PREVIEW);
            write!(f, ": {:02x?}", &self.0[..n])?;
            if self.0.len() > PREVIEW {
                f.write_str("..")?;
            }
        }
        f.write_str(")")
    }
}

/// Encoding of a port data type.
///
/// Implement by hand for user structs by encoding fields in order:
///
/// ```
/// use rtm::ser::DataCodec;
///
/// #[derive(Debug, PartialEq)]
/// struct Pose { x: f64, y: f64, label: String }
///
/// impl DataCodec for Pose {
///     fn encode(&self, out: &mut Vec<u8>) {
///         self.x.encode(out);
///         self.y.encode(out);
///         self.label.encode(out);
///     }
///     fn decode(input: &mut &[u8]) -> rtm::Result<Self> {
///         Ok(Pose { x: f64::decode(input)?, y: f64::decode(input)?, label: String::decode(input)? })
///     }
/// }
///
/// let p = Pose { x: 1.0, y: -2.5, label: "dock".into() };
/// assert_eq!(Pose::from_bytes(&p.to_bytes()).unwrap(), p);
/// ```
pub trait DataCodec: Sized + Send + Sync + 'static {
    /// Append the encoded form of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Decode one value from the front of `input`, advancing it.
    fn decode(input: &mut &[u8]) -> Result<Self>;

    fn to_bytes(&self) -> ByteData {
        let mut out = Vec::new();
        self.encode(&mut out);
        ByteData::from(out)
    }

    /// Decode a whole record; trailing bytes are an error.
    fn from_bytes(data: &ByteData) -> Result<Self> {
        let mut input = data.as_slice();
        let value = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(Error::Serialization(format!(
                "{} trailing bytes after value",
                input.len()
            )));
        }
        Ok(value)
    }
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if input.len() < n {
        return Err(Error::Serialization(format!(
            "need {} bytes, {} available",
            n,
            input.len()
        )));
    }
    let (head, tail) = input.split_at(n);
    *input = tail;
    Ok(head)
}

macro_rules! impl_codec_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DataCodec for $ty {
                #[inline]
                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn decode(input: &mut &[u8]) -> Result<Self> {
                    let raw = take(input, std::mem::size_of::<$ty>())?;
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(raw);
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )*
    };
}

impl_codec_le!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl DataCodec for bool {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn decode(input: &mut &[u8]) -> Result<Self> {
        match u8::decode(input)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::Serialization(format!("invalid bool byte {}", other))),
        }
    }
}

fn encode_len(len: usize, out: &mut Vec<u8>) {
    // Records are in-process; lengths beyond u32 are clamped by construction
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    len.encode(out);
}

impl DataCodec for String {
    fn encode(&self, out: &mut Vec<u8>) {
        encode_len(self.len(), out);
        out.extend_from_slice(self.as_bytes());
    }

    fn decode(input: &mut &[u8]) -> Result<Self> {
        let len = u32::decode(input)? as usize;
        let raw = take(input, len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| Error::Serialization(format!("invalid UTF-8: {}", e)))
    }
}

impl<T: DataCodec> DataCodec for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        encode_len(self.len(), out);
        for item in self {
            item.encode(out);
        }
    }

    fn decode(input: &mut &[u8]) -> Result<Self> {
        let len = u32::decode(input)? as usize;
        // Do not trust the prefix for the allocation size
        let mut items = Vec::with_capacity(len.min(input.len()));
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_little_endian() {
        assert_eq!(0x0102_0304u32.to_bytes().as_slice(), &[4, 3, 2, 1]);
        assert_eq!((-2i16).to_bytes().as_slice(), &[0xfe, 0xff]);
        assert_eq!(i64::from_bytes(&(-7i64).to_bytes()).unwrap(), -7);
        assert_eq!(f64::from_bytes(&1.5f64.to_bytes()).unwrap(), 1.5);
    }

    #[test]
    fn test_string_and_vec() {
        let s = String::from("héllo");
        assert_eq!(String::from_bytes(&s.to_bytes()).unwrap(), s);

        let v = vec![3u16, 1, 4, 1, 5];
        assert_eq!(Vec::<u16>::from_bytes(&v.to_bytes()).unwrap(), v);
    }

    #[test]
    fn test_truncated_input() {
        let data = ByteData::from(vec![1u8, 2]);
        assert!(matches!(u32::from_bytes(&data), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let data = ByteData::from(vec![1u8, 0, 0, 0, 9]);
        assert!(u32::from_bytes(&data).is_err());
    }

    #[test]
    fn test_bogus_length_prefix() {
        let data = ByteData::from(vec![0xff, 0xff, 0xff, 0x7f]);
        assert!(Vec::<u64>::from_bytes(&data).is_err());
    }

    #[test]
    fn test_bytedata_debug_preview() {
        let d = ByteData::from(vec![0xab; 20]);
        let s = format!("{:?}", d);
        assert!(s.starts_with("ByteData(20 bytes"));
        assert!(s.contains(".."));
    }
}
