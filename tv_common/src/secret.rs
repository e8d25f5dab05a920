use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper that keeps credentials out of logs. `Debug` and `Display` both render as `****`;
/// the inner value is only reachable via [`Secret::reveal`].
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl Secret<String> {
    /// True when no usable credential has been configured.
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}
