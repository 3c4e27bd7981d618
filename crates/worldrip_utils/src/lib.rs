//! Various utilities shared by the worldrip crates

pub mod color;
pub mod packed;

mod ascii_display;
pub use ascii_display::*;

mod result_ext;
pub use result_ext::AnyhowResultExt;

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

/// Aligns the value. Alignment doesn't have to be a power of two.
///
/// ```
/// use worldrip_utils::align;
/// assert_eq!(16, align(10, 8));
/// assert_eq!(12, align(12, 4));
/// ```
pub const fn align(n: u64, a: u64) -> u64 {
    (n + a - 1) / a * a
}

/// Strips everything up to the last path separator (either `/` or `\`) and the extension
/// from an asset path.
///
/// ## Example
/// ```
/// use worldrip_utils::file_stem;
/// assert_eq!(file_stem(r"images\~mtl_wall_col.iwi"), "~mtl_wall_col");
/// assert_eq!(file_stem("a/b/c.d.png"), "c.d");
/// assert_eq!(file_stem("plain"), "plain");
/// ```
pub fn file_stem(path: &str) -> &str {
    let name = match path.rfind(['/', '\\']) {
        Some(separator) => &path[separator + 1..],
        None => path,
    };

    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Returned by `FromStr` implementations of plain identifier enums
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum EnumParseError {
    #[error("invalid input")]
    InvalidInput,
}

/// Generates a match statement that verifies a discriminant value as a single "expression".
///
/// ## Example
/// ```
/// # use worldrip_utils::discriminant_matches;
/// enum Example { Simple, Tupled(u32) }
///
/// let a = Example::Simple;
/// assert!(discriminant_matches!(a, Example::Simple));
///
/// // Tupled variants must match the parameters. Don't name them to not get warnings.
/// let b = Example::Tupled(123);
/// assert!(discriminant_matches!(b, Example::Tupled(_)));
/// ```
#[macro_export]
macro_rules! discriminant_matches {
    ($value:expr, $discriminant:pat) => {
        match $value {
            $discriminant => true,
            _ => false,
        }
    };
}
