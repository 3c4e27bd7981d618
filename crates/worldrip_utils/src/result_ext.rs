use crate::AnyResult;
use anyhow::anyhow;
use std::{error::Error, fmt::Display};

/// Converts library results and options into [`AnyResult`]s carrying a human readable context.
///
/// ## Example
/// ```
/// use worldrip_utils::AnyhowResultExt;
///
/// let missing: Option<u32> = None;
/// let error = missing.otherwise("no surface table").unwrap_err();
/// assert_eq!(error.to_string(), "no surface table");
/// ```
pub trait AnyhowResultExt<T> {
    fn otherwise(self, s: impl Display) -> AnyResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> AnyhowResultExt<T> for Result<T, E> {
    fn otherwise(self, s: impl Display) -> AnyResult<T> {
        self.map_err(|e| anyhow::Error::from(e).context(s.to_string()))
    }
}

impl<T> AnyhowResultExt<T> for Option<T> {
    fn otherwise(self, s: impl Display) -> AnyResult<T> {
        self.ok_or_else(|| anyhow!("{s}"))
    }
}
