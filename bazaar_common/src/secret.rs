use std::fmt;

/// Holds a credential such as the JWT signing key, the payment gateway secret or the webhook secret. Formatting never
/// prints the value, only whether one is set, so a `Secret` can sit in a config struct that gets logged with `{:?}`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T = String>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl<T: AsRef<str>> Secret<T> {
    /// An empty string counts as unset.
    pub fn is_set(&self) -> bool {
        !self.0.as_ref().is_empty()
    }

    fn mask(&self) -> &'static str {
        if self.is_set() {
            "<hidden>"
        } else {
            "<unset>"
        }
    }
}

impl<T: AsRef<str>> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mask())
    }
}

impl<T: AsRef<str>> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mask())
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}
