//! Access to the game's memory, as seen by the decoders
//!
//! Acquiring the bytes (attaching to a process, reading dumps) is none of this crate's business.
//! Everything here goes through the [`MemorySource`] trait, and addresses found inside decoded
//! records are plain `u64` handles that only a source knows how to resolve.

use crate::schema::PointerWidth;
use log::warn;
use std::{fs, io, path::Path};
use thiserror::Error;
use worldrip_utils::{packed::PackedData, AsciiDisplay};

/// Longest C string a source is willing to read. Asset names are nowhere near that.
pub const MAX_STRING_LENGTH: usize = 1024;

const STRING_CHUNK: usize = 64;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("null pointer dereferenced while reading {what}")]
    Null { what: &'static str },
    #[error("{len} bytes at {address:#x} are not mapped")]
    Unmapped { address: u64, len: usize },
    #[error("string at {address:#x} isn't terminated within {MAX_STRING_LENGTH} bytes")]
    UnterminatedString { address: u64 },
    #[error("record at {address:#x} is malformed: {reason}")]
    Malformed { address: u64, reason: String },
    #[error("IO error has occurred: {0}")]
    Io(#[from] io::Error),
}

/// The memory/file access collaborator.
///
/// Only [`MemorySource::read_bytes`] is required, every other method is built on top of it.
pub trait MemorySource {
    /// Reads exactly `len` bytes starting at `address`.
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, SourceError>;

    /// Reads a fixed-layout record of `size` bytes.
    fn read_record<T: PackedData>(&self, address: u64, size: usize) -> Result<T, SourceError>
    where
        Self: Sized,
    {
        if address == 0 {
            return Err(SourceError::Null { what: "record" });
        }

        let bytes = self.read_bytes(address, size)?;
        T::read_packed(&mut bytes.as_slice()).map_err(|e| SourceError::Malformed {
            address,
            reason: e.to_string(),
        })
    }

    /// Reads a pointer-sized value, zero extended to 64 bits.
    fn read_pointer(&self, address: u64, width: PointerWidth) -> Result<u64, SourceError> {
        if address == 0 {
            return Err(SourceError::Null { what: "pointer" });
        }

        let bytes = self.read_bytes(address, width.size())?;
        Ok(match width {
            PointerWidth::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
            PointerWidth::U64 => u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        })
    }

    /// Reads a NUL terminated string. Invalid UTF-8 is replaced, not rejected.
    fn read_c_string(&self, address: u64) -> Result<String, SourceError> {
        if address == 0 {
            return Err(SourceError::Null { what: "string" });
        }

        let mut result = Vec::new();
        while result.len() < MAX_STRING_LENGTH {
            let cursor = address + result.len() as u64;
            let chunk = match self.read_bytes(cursor, STRING_CHUNK) {
                Ok(chunk) => chunk,
                // The string may end right before the end of its mapping
                Err(SourceError::Unmapped { .. }) => self.read_bytes(cursor, 1)?,
                Err(e) => return Err(e),
            };

            if let Some(end) = chunk.iter().position(|&b| b == 0) {
                result.extend_from_slice(&chunk[..end]);
                return Ok(match String::from_utf8(result) {
                    Ok(string) => string,
                    Err(e) => {
                        warn!(
                            "String at {address:#x} isn't valid UTF-8: {}",
                            AsciiDisplay(e.as_bytes())
                        );
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                });
            }

            result.extend_from_slice(&chunk);
        }

        Err(SourceError::UnterminatedString { address })
    }
}

impl<T: MemorySource> MemorySource for &T {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, SourceError> {
        (**self).read_bytes(address, len)
    }
}

/// A contiguous block of memory mapped at a base address.
#[derive(Debug, Clone)]
pub struct Region {
    pub base: u64,
    pub bytes: Vec<u8>,
}

impl Region {
    fn slice(&self, address: u64, len: usize) -> Option<&[u8]> {
        let start = address.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        self.bytes.get(start..end)
    }
}

/// [`MemorySource`] backed by resident buffers, for example memory dumps loaded from disk.
///
/// A single read has to fall completely within one region.
///
/// ## Example
/// ```
/// use worldrip_gfx::source::{MemorySource, RegionSource};
///
/// let mut source = RegionSource::new();
/// source.add_region(0x1000, b"zone_gfx\0".to_vec());
/// assert_eq!(source.read_c_string(0x1000).unwrap(), "zone_gfx");
/// assert!(source.read_bytes(0x1004, 16).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegionSource {
    regions: Vec<Region>,
}

impl RegionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&mut self, base: u64, bytes: Vec<u8>) -> &mut Self {
        self.regions.push(Region { base, bytes });
        self
    }

    /// Maps the whole contents of a file at the given base address.
    pub fn add_file(&mut self, base: u64, path: impl AsRef<Path>) -> Result<&mut Self, SourceError> {
        let bytes = fs::read(path)?;
        Ok(self.add_region(base, bytes))
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl MemorySource for RegionSource {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, SourceError> {
        self.regions
            .iter()
            .find_map(|region| region.slice(address, len))
            .map(<[u8]>::to_vec)
            .ok_or(SourceError::Unmapped { address, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RegionSource {
        let mut source = RegionSource::new();
        source
            .add_region(0x100, vec![0x78, 0x56, 0x34, 0x12, 0xEF, 0xCD, 0xAB, 0x90])
            .add_region(0x2000, b"mtl_rock\0".to_vec());
        source
    }

    #[test]
    fn reads_pointers_of_both_widths() {
        let source = source();
        assert_eq!(source.read_pointer(0x100, PointerWidth::U32).unwrap(), 0x12345678);
        assert_eq!(
            source.read_pointer(0x100, PointerWidth::U64).unwrap(),
            0x90ABCDEF12345678
        );
        assert!(matches!(
            source.read_pointer(0x104, PointerWidth::U64),
            Err(SourceError::Unmapped { address: 0x104, len: 8 })
        ));
    }

    #[test]
    fn string_ending_at_region_end() {
        let source = source();
        assert_eq!(source.read_c_string(0x2000).unwrap(), "mtl_rock");
        assert_eq!(source.read_c_string(0x2004).unwrap(), "rock");
    }

    #[test]
    fn unterminated_and_null_strings() {
        let mut source = RegionSource::new();
        source.add_region(0x10, vec![b'a'; 32]);
        assert!(matches!(
            source.read_c_string(0x10),
            Err(SourceError::Unmapped { .. })
        ));
        assert!(matches!(
            source.read_c_string(0),
            Err(SourceError::Null { .. })
        ));

        let mut source = RegionSource::new();
        source.add_region(0x10, vec![b'a'; MAX_STRING_LENGTH + 8]);
        assert!(matches!(
            source.read_c_string(0x10),
            Err(SourceError::UnterminatedString { address: 0x10 })
        ));
    }

    #[test]
    fn records_are_bounds_checked() {
        let source = source();
        let value: [u16; 2] = source.read_record(0x100, 4).unwrap();
        assert_eq!(value, [0x5678, 0x1234]);
        assert!(source.read_record::<[u16; 2]>(0x106, 4).is_err());
    }
}
