use crate::ok;
use std::fmt::{self, Display};

/// Wrapper type for displaying byte buffers that contain all, or mostly all ASCII text, such as
/// asset names pulled out of a memory dump. Any non-ASCII bytes are displayed as `\xNN` where
/// `NN` is their hex code, and `\` is reinterpreted as `\\`.
///
/// ## Example
/// ```
/// # use worldrip_utils::AsciiDisplay;
/// let a = AsciiDisplay(b"mtl_wall");
/// assert_eq!(a.to_string(), "mtl_wall");
///
/// let b = AsciiDisplay(b"a\xABbc\\");
/// assert_eq!(b.to_string(), "a\\xABbc\\\\");
/// ```
pub struct AsciiDisplay<'a>(pub &'a [u8]);

impl<'a> From<&'a [u8]> for AsciiDisplay<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self(value)
    }
}

impl<'a> Display for AsciiDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0 {
            match byte {
                b'\\' => write!(f, "\\\\")?,
                b' ' => write!(f, " ")?,
                _ if byte.is_ascii_graphic() => write!(f, "{}", byte as char)?,
                _ => write!(f, r"\x{byte:02X}")?,
            }
        }
        ok()
    }
}
