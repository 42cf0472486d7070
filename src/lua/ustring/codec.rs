//! Conversion of arguments and results between Lua values and Rust strings.

use super::engine;
use crate::{config::Limits, lua::prelude::*};
use core::ops::RangeInclusive;
use std::borrow::Cow;

/// A Unicode string library error.
///
/// Every error is raised into Lua as a plain string so that scripts can catch
/// it with `pcall` and inspect the message.
// Clippy: The error fields are self-explanatory.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The function was called with too few or too many arguments.
    #[error("wrong number of arguments to '{func}' (expected {}, got {got})", arity(.expected))]
    ArgumentCount {
        func: &'static str,
        expected: RangeInclusive<usize>,
        got: usize,
    },
    /// An argument had the wrong type.
    #[error("bad argument #{index} to '{func}' ({expected} expected, got {found})")]
    ArgumentType {
        func: &'static str,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    /// An argument had the right type but an unusable value.
    #[error("bad argument #{index} to '{func}' ({reason})")]
    ArgumentValue {
        func: &'static str,
        index: usize,
        reason: String,
    },
    /// The pattern failed to compile.
    #[error("malformed pattern \"{pattern}\": {err}")]
    Pattern { pattern: String, err: engine::Error },
    /// The pattern compiled but matching it failed.
    #[error("error matching pattern \"{pattern}\": {err}")]
    Matching { pattern: String, err: engine::Error },
    /// A gsub replacement template was malformed.
    #[error("invalid replacement string \"{repl}\": {err}")]
    Replacement { repl: String, err: engine::Error },
    /// A gsub table or function produced an unusable replacement.
    #[error("invalid replacement value (a {0})")]
    ReplacementValue(&'static str),
    /// A match cursor attribute which does not exist was read.
    #[error("not a readable MatchCursor member: {0}")]
    UnreadableMember(String),
    /// A match cursor attribute was written.
    #[error("MatchCursor members are read-only")]
    ReadOnly,
    /// A match cursor was used after it was finalised.
    #[error("MatchCursor has been finalized")]
    Finalized,
}

impl Error {
    /// Converts this error into a Lua error carrying the message as a string
    /// value.
    pub fn into_vm<'gc>(self, ctx: Context<'gc>) -> VmError<'gc> {
        self.to_string().into_value(ctx).into()
    }
}

/// Formats an argument count range for error messages.
fn arity(expected: &RangeInclusive<usize>) -> String {
    if expected.start() == expected.end() {
        expected.start().to_string()
    } else {
        format!("{} to {}", expected.start(), expected.end())
    }
}

/// Raises library errors into the VM.
pub(super) trait Raise<'gc, T> {
    /// Converts the error type of this result into a Lua error.
    fn raise(self, ctx: Context<'gc>) -> Result<T, VmError<'gc>>;
}

impl<'gc, T> Raise<'gc, T> for Result<T, Error> {
    #[inline]
    fn raise(self, ctx: Context<'gc>) -> Result<T, VmError<'gc>> {
        self.map_err(|err| err.into_vm(ctx))
    }
}

/// Decodes a Lua string as UTF-8. Malformed sequences are replaced by
/// U+FFFD REPLACEMENT CHARACTER.
#[inline]
pub(super) fn decode<'gc>(s: VmString<'gc>) -> Cow<'gc, str> {
    String::from_utf8_lossy(s.as_bytes())
}

/// Encodes a Rust string as a Lua string.
#[inline]
pub(super) fn encode<'gc>(ctx: Context<'gc>, s: &str) -> VmString<'gc> {
    ctx.intern(s.as_bytes())
}

/// The arguments of one library call, taken off the Lua stack.
pub(super) struct Args<'gc> {
    /// The name of the called function, for error messages.
    func: &'static str,
    /// The argument values.
    values: Vec<Value<'gc>>,
    /// The configured size limits.
    limits: Limits,
}

impl<'gc> Args<'gc> {
    /// Takes all arguments for `func` off the stack, leaving it empty for the
    /// return values.
    ///
    /// # Errors
    ///
    /// If the number of arguments is outside `expected`, an
    /// [`Error::ArgumentCount`] is returned.
    pub fn new(
        func: &'static str,
        stack: &mut Stack<'gc, '_>,
        expected: RangeInclusive<usize>,
        limits: Limits,
    ) -> Result<Self, Error> {
        let got = stack.len();
        if !expected.contains(&got) {
            return Err(Error::ArgumentCount {
                func,
                expected,
                got,
            });
        }

        Ok(Self {
            func,
            values: stack.drain(..).collect(),
            limits,
        })
    }

    /// Returns the raw value of the 0-indexed argument `index`.
    #[inline]
    pub fn value(&self, index: usize) -> Value<'gc> {
        self.values.get(index).copied().unwrap_or(Value::Nil)
    }

    /// Returns the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the 0-indexed argument `index` as a string. Numbers are
    /// converted to strings, as Lua does.
    pub fn string(&self, ctx: Context<'gc>, index: usize) -> Result<VmString<'gc>, Error> {
        let value = self.value(index);
        value
            .into_string(ctx)
            .ok_or_else(|| self.type_error(index, "string", value))
    }

    /// Returns the 0-indexed argument `index` as a decoded subject string,
    /// subject to the string length limit.
    pub fn subject(&self, ctx: Context<'gc>, index: usize) -> Result<Cow<'gc, str>, Error> {
        let s = self.string(ctx, index)?;
        self.check_len(index, s, "string", self.limits.string_length)?;
        Ok(decode(s))
    }

    /// Returns the 0-indexed argument `index` as a decoded pattern string,
    /// subject to the pattern length limit.
    pub fn pattern(&self, ctx: Context<'gc>, index: usize) -> Result<Cow<'gc, str>, Error> {
        let s = self.string(ctx, index)?;
        self.check_len(index, s, "pattern", self.limits.pattern_length)?;
        Ok(decode(s))
    }

    /// Returns the 0-indexed argument `index` as an integer, or `None` if it is
    /// absent or nil. Floats with an exact integer representation and numeric
    /// strings are accepted.
    pub fn opt_integer(&self, index: usize) -> Result<Option<i64>, Error> {
        match self.value(index) {
            Value::Nil => Ok(None),
            Value::Integer(value) => Ok(Some(value)),
            value @ (Value::Number(_) | Value::String(_)) => {
                value.to_integer().map(Some).ok_or_else(|| {
                    if let Value::Number(_) = value {
                        self.value_error(index, "number has no integer representation")
                    } else {
                        self.type_error(index, "number", value)
                    }
                })
            }
            value => Err(self.type_error(index, "number", value)),
        }
    }

    /// Returns the truthiness of the 0-indexed argument `index`, or `None` if
    /// it is absent or nil.
    #[inline]
    pub fn opt_bool(&self, index: usize) -> Option<bool> {
        match self.value(index) {
            Value::Nil => None,
            value => Some(value.to_bool()),
        }
    }

    /// Creates an argument type error for the 0-indexed argument `index`.
    pub fn type_error(&self, index: usize, expected: &'static str, found: Value<'_>) -> Error {
        Error::ArgumentType {
            func: self.func,
            index: index + 1,
            expected,
            found: found.type_name(),
        }
    }

    /// Creates an argument value error for the 0-indexed argument `index`.
    pub fn value_error(&self, index: usize, reason: impl Into<String>) -> Error {
        Error::ArgumentValue {
            func: self.func,
            index: index + 1,
            reason: reason.into(),
        }
    }

    /// Validates that `s` is no longer than `limit` bytes.
    fn check_len(
        &self,
        index: usize,
        s: VmString<'_>,
        what: &str,
        limit: usize,
    ) -> Result<(), Error> {
        if s.as_bytes().len() > limit {
            Err(self.value_error(index, format!("{what} is longer than {limit} bytes")))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            Error::ArgumentCount {
                func: "len",
                expected: 1..=1,
                got: 2
            }
            .to_string(),
            "wrong number of arguments to 'len' (expected 1, got 2)"
        );
        assert_eq!(
            Error::ArgumentCount {
                func: "find",
                expected: 2..=4,
                got: 1
            }
            .to_string(),
            "wrong number of arguments to 'find' (expected 2 to 4, got 1)"
        );
        assert_eq!(
            Error::ArgumentType {
                func: "find",
                index: 2,
                expected: "string",
                found: "nil"
            }
            .to_string(),
            "bad argument #2 to 'find' (string expected, got nil)"
        );
        assert_eq!(
            Error::Pattern {
                pattern: "(".into(),
                err: engine::Error::UnfinishedCapture { pos: 1 }
            }
            .to_string(),
            "malformed pattern \"(\": unfinished capture at 1"
        );
        assert_eq!(
            Error::ReplacementValue("table").to_string(),
            "invalid replacement value (a table)"
        );
    }
}
