use crate::{ok, AnyResult};
use anyhow::anyhow;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::{
    fmt,
    io::{Read, Write},
};

/// Special trait for reading packed data, always assumed to be little endian.
///
/// Game records are plain fixed-layout structures, so a type implementing this trait is read
/// field by field in declaration order with no implicit padding. Padding present in the source
/// layout has to be spelled out as [`Padding`] fields.
pub trait PackedData: Sized + Clone {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self>;
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult;
}

impl<T: PackedData, const N: usize> PackedData for [T; N] {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let values = (0..N)
            .map(|_| T::read_packed(r))
            .collect::<AnyResult<Vec<T>>>()?;

        values
            .try_into()
            .map_err(|_| anyhow!("array length mismatch"))
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        for value in self {
            value.write_packed(w)?;
        }
        ok()
    }
}

/// Uninterpreted bytes of a record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Padding<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for Padding<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> fmt::Debug for Padding<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Padding<{:#x}>", N)
    }
}

impl<const N: usize> PackedData for Padding<N> {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let mut bytes = [0; N];
        r.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        w.write_all(&self.0)?;
        ok()
    }
}

macro_rules! impl_data {
    ($type:ty, $r:ident, $reader:expr, $w:ident, $self:ident, $writer:expr) => {
        impl PackedData for $type {
            fn read_packed<R: Read>($r: &mut R) -> AnyResult<Self> {
                Ok($reader)
            }

            fn write_packed<W: Write>(&self, $w: &mut W) -> AnyResult {
                let $self = self;
                $writer;
                Ok(())
            }
        }
    };
}

impl_data!(u8, r, r.read_u8()?, w, value, w.write_u8(*value)?);
impl_data!(i8, r, r.read_i8()?, w, value, w.write_i8(*value)?);
impl_data!(
    u16,
    r,
    r.read_u16::<LE>()?,
    w,
    value,
    w.write_u16::<LE>(*value)?
);
impl_data!(
    i16,
    r,
    r.read_i16::<LE>()?,
    w,
    value,
    w.write_i16::<LE>(*value)?
);
impl_data!(
    u32,
    r,
    r.read_u32::<LE>()?,
    w,
    value,
    w.write_u32::<LE>(*value)?
);
impl_data!(
    i32,
    r,
    r.read_i32::<LE>()?,
    w,
    value,
    w.write_i32::<LE>(*value)?
);
impl_data!(
    u64,
    r,
    r.read_u64::<LE>()?,
    w,
    value,
    w.write_u64::<LE>(*value)?
);
impl_data!(
    i64,
    r,
    r.read_i64::<LE>()?,
    w,
    value,
    w.write_i64::<LE>(*value)?
);
impl_data!(
    f32,
    r,
    r.read_f32::<LE>()?,
    w,
    value,
    w.write_f32::<LE>(*value)?
);

/// Trait with a `read_packed` wrapper method for any [`Read`] type, purely for clarity.
pub trait PackedReadExt {
    /// Reads the specified [`PackedData`] type from this stream.
    fn read_packed<T: PackedData>(&mut self) -> AnyResult<T>;
}

impl<T: Read> PackedReadExt for T {
    fn read_packed<R: PackedData>(&mut self) -> AnyResult<R> {
        R::read_packed(self)
    }
}

/// Serializes a [`PackedData`] value into a fresh buffer.
///
/// ## Example
/// ```
/// use worldrip_utils::packed::to_packed_bytes;
/// assert_eq!(to_packed_bytes(&0x0403_0201u32).unwrap(), [1, 2, 3, 4]);
/// ```
pub fn to_packed_bytes<T: PackedData>(value: &T) -> AnyResult<Vec<u8>> {
    let mut result = Vec::new();
    value.write_packed(&mut result)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_read_in_order() {
        let bytes = [1u8, 0, 2, 0, 3, 0];
        let values: [u16; 3] = (&bytes[..]).read_packed().unwrap();
        assert_eq!(values, [1, 2, 3]);
    }

    #[test]
    fn short_input_is_an_error() {
        let bytes = [1u8, 2, 3];
        assert!((&bytes[..]).read_packed::<u32>().is_err());
        assert!((&bytes[..]).read_packed::<[u8; 4]>().is_err());
        assert!((&bytes[..]).read_packed::<Padding<4>>().is_err());
    }

    #[test]
    fn padding_is_skipped_and_zeroed() {
        let bytes = [0xAAu8, 0xBB, 7, 0];
        let mut reader = &bytes[..];
        let padding: Padding<2> = reader.read_packed().unwrap();
        assert_eq!(padding.0, [0xAA, 0xBB]);
        assert_eq!(reader.read_packed::<u16>().unwrap(), 7);

        assert_eq!(to_packed_bytes(&Padding::<3>::default()).unwrap(), [0, 0, 0]);
        assert_eq!(std::mem::size_of::<Padding<0x28>>(), 0x28);
    }
}
