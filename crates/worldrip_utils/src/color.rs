use crate::{ok, packed::PackedData, AnyResult};
use std::io::{Read, Write};

/// 8-bit per channel vertex colour, stored in memory as `r g b a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RGBA8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RGBA8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<[u8; 4]> for RGBA8 {
    #[inline]
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<RGBA8> for [u8; 4] {
    #[inline]
    fn from(value: RGBA8) -> Self {
        [value.r, value.g, value.b, value.a]
    }
}

impl PackedData for RGBA8 {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        Ok(<[u8; 4]>::read_packed(r)?.into())
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        <[u8; 4]>::from(*self).write_packed(w)?;
        ok()
    }
}
