//! Library configuration.
//!
//! The Unicode string library refuses arguments which are too large to
//! process in reasonable time. The limits default to the ones used by
//! Scribunto and can be overridden from the environment or the command line.

use core::num::ParseIntError;

/// The environment variable which overrides [`Limits::pattern_length`].
pub const PATTERN_LIMIT_VAR: &str = "LUA_UTF8_PATTERN_LIMIT";
/// The environment variable which overrides [`Limits::string_length`].
pub const STRING_LIMIT_VAR: &str = "LUA_UTF8_STRING_LIMIT";

/// A configuration error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A limit was not a valid byte count.
    #[error("invalid value {value:?} for {name}: {err}")]
    InvalidLimit {
        /// The name of the setting.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// The parse failure.
        err: ParseIntError,
    },
}

/// Size limits for arguments of the Unicode string library.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Limits {
    /// The maximum length, in bytes, allowed for pattern strings.
    pub pattern_length: usize,
    /// The maximum length, in bytes, allowed for input strings.
    pub string_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            pattern_length: 10000,
            string_length: 2048 * 1024,
        }
    }
}

impl Limits {
    /// Reads the limits from the environment, using the defaults for any
    /// variable which is not set.
    ///
    /// # Errors
    ///
    /// If a variable is set to something other than a byte count, an
    /// [`Error::InvalidLimit`] is returned.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the limits through the given variable lookup function.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut limits = Self::default();
        if let Some(value) = lookup(PATTERN_LIMIT_VAR) {
            limits.pattern_length = parse_limit(PATTERN_LIMIT_VAR, &value)?;
        }
        if let Some(value) = lookup(STRING_LIMIT_VAR) {
            limits.string_length = parse_limit(STRING_LIMIT_VAR, &value)?;
        }
        Ok(limits)
    }
}

/// Parses a byte count for the setting `name`.
///
/// # Errors
///
/// If `value` is not a non-negative integer, an [`Error::InvalidLimit`] is
/// returned.
pub fn parse_limit(name: &'static str, value: &str) -> Result<usize, Error> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|err| Error::InvalidLimit {
            name,
            value: value.to_string(),
            err,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = Limits::from_lookup(|_| None).unwrap();
        assert_eq!(limits, Limits::default());
        assert_eq!(limits.pattern_length, 10000);
        assert_eq!(limits.string_length, 2_097_152);
    }

    #[test]
    fn overrides() {
        let limits = Limits::from_lookup(|name| match name {
            PATTERN_LIMIT_VAR => Some("12".into()),
            STRING_LIMIT_VAR => Some(" 34 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            limits,
            Limits {
                pattern_length: 12,
                string_length: 34
            }
        );
    }

    #[test]
    fn invalid() {
        let err = Limits::from_lookup(|name| (name == STRING_LIMIT_VAR).then(|| "lots".into()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value \"lots\" for LUA_UTF8_STRING_LIMIT: invalid digit found in string"
        );
        assert!(parse_limit("x", "-1").is_err());
    }
}
