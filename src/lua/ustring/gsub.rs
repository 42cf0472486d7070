//! Piecewise text substitution engine.

use super::{
    codec::{Args, Error, Raise as _, decode, encode},
    engine::{self, Capture, MatchRanges, Pattern},
    find::{capture_value, compile},
};
use crate::{config::Limits, lua::prelude::*};
use core::ops::Range;
use piccolo::{Function, MetaMethod, SequenceReturn, async_sequence};

/// A piecewise text substitution engine.
///
/// Allows interruptible iterative replacement of strings by separating the
/// matching and replacing parts.
pub(super) struct Substitution {
    /// The subject string.
    input: String,
    /// The search pattern.
    pattern: Pattern,
    /// The maximum number of replacements, or `None` if unbounded.
    limit: Option<usize>,
    /// The number of matches which have been found.
    count: usize,
    /// The accumulator.
    result: String,
    /// The position where the next match is attempted.
    src: usize,
    /// The end of the input which has already been copied to the result.
    copied: usize,
    /// The end position of the last match.
    last_match: Option<usize>,
    /// The currently matched range awaiting a replacement.
    current: Range<usize>,
    /// Whether no more matches are allowed.
    done: bool,
}

impl Substitution {
    /// Creates a new substitution engine. A negative `limit` means no limit.
    pub fn new(input: String, pattern: Pattern, limit: Option<i64>) -> Self {
        Self {
            input,
            pattern,
            limit: limit.and_then(|limit| usize::try_from(limit).ok()),
            count: 0,
            result: String::new(),
            src: 0,
            copied: 0,
            last_match: None,
            current: 0..0,
            done: false,
        }
    }

    /// The subject string.
    #[inline]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the final string and the number of replacements, consuming the
    /// engine.
    #[must_use]
    pub fn finish(mut self) -> (String, usize) {
        self.result.push_str(&self.input[self.copied..]);
        (self.result, self.count)
    }

    /// Advances to the next match.
    ///
    /// An empty match which ends where the previous match ended is skipped.
    /// An anchored pattern matches at most once.
    ///
    /// # Errors
    ///
    /// If the pattern is too complex to match, an [`engine::Error`] is
    /// returned.
    pub fn next(&mut self) -> Result<Option<MatchRanges>, engine::Error> {
        while !self.done && self.limit.is_none_or(|limit| self.count < limit) {
            if let Some(ranges) = self.pattern.match_at(&self.input, self.src)?
                && Some(ranges.full_match.end) != self.last_match
            {
                self.count += 1;
                self.src = ranges.full_match.end;
                self.last_match = Some(self.src);
                self.current = ranges.full_match.clone();
                self.done = self.pattern.is_anchored();
                return Ok(Some(ranges));
            } else if let Some(c) = self.input[self.src..].chars().next() {
                self.src += c.len_utf8();
            } else {
                self.done = true;
            }

            if self.pattern.is_anchored() {
                self.done = true;
            }
        }

        Ok(None)
    }

    /// Replaces the current match with the given replacement text.
    pub fn replace(&mut self, replacement: &str) {
        let Range { start, end } = self.current.clone();
        self.result.push_str(&self.input[self.copied..start]);
        self.result.push_str(replacement);
        self.copied = end;
    }
}

/// The replacement mode of a substitution, chosen once from the type of the
/// `repl` argument.
enum Replacement<'gc> {
    /// A template string with `%N` capture references.
    Template(String),
    /// A table looked up with the first capture.
    Table(Table<'gc>),
    /// A table whose lookups go through an `__index` function.
    Index(Table<'gc>, Function<'gc>),
    /// A function called with all captures.
    Call(Function<'gc>),
}

impl<'gc> Replacement<'gc> {
    /// Selects the replacement mode for `value`.
    fn new(ctx: Context<'gc>, args: &Args<'gc>, index: usize) -> Result<Self, Error> {
        Ok(match args.value(index) {
            Value::Table(t) => {
                if let Some(Value::Function(f)) = t
                    .metatable()
                    .map(|mt| mt.get_value(ctx, MetaMethod::Index))
                {
                    Self::Index(t, f)
                } else {
                    Self::Table(t)
                }
            }
            Value::Function(f) => Self::Call(f),
            value => match value.into_string(ctx) {
                Some(template) => Self::Template(decode(template).into_owned()),
                None => return Err(args.type_error(index, "string/function/table", value)),
            },
        })
    }
}

/// Finds and replaces matching patterns within a string.
pub(super) fn gsub_lua<'gc>(
    ctx: Context<'gc>,
    mut stack: Stack<'gc, '_>,
    limits: Limits,
) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
    let args = Args::new("gsub", &mut stack, 3..=4, limits).raise(ctx)?;
    let s = args.subject(ctx, 0).raise(ctx)?;
    let pattern = compile(&args.pattern(ctx, 1).raise(ctx)?).raise(ctx)?;
    let repl = Replacement::new(ctx, &args, 2).raise(ctx)?;
    let n = args.opt_integer(3).raise(ctx)?;

    let mut engine = Substitution::new(s.into_owned(), pattern, n);

    match repl {
        Replacement::Template(template) => {
            while let Some(ranges) = next(&mut engine).raise(ctx)? {
                let repl = expand(&template, engine.input(), &ranges).raise(ctx)?;
                engine.replace(&repl);
            }
        }
        Replacement::Table(t) => {
            while let Some(ranges) = next(&mut engine).raise(ctx)? {
                let key = capture_value(ctx, engine.input(), first_capture(ranges));
                repl_value(ctx, &mut engine, lookup(ctx, t, key)).raise(ctx)?;
            }
        }
        Replacement::Index(t, f) => return Ok(gsub_slow(ctx, engine, Some(t), f)),
        Replacement::Call(f) => return Ok(gsub_slow(ctx, engine, None, f)),
    }

    let (value, n) = engine.finish();
    stack.into_back(ctx, (encode(ctx, &value), i64::try_from(n)?));
    Ok(CallbackReturn::Return)
}

/// Advances the engine, naming the pattern in any error.
fn next(engine: &mut Substitution) -> Result<Option<MatchRanges>, Error> {
    engine.next().map_err(|err| Error::Matching {
        pattern: engine.pattern.as_str().to_string(),
        err,
    })
}

/// Returns the capture used as a lookup key: the first capture, or the whole
/// match if the pattern has no captures.
fn first_capture(ranges: MatchRanges) -> Capture {
    ranges
        .into_captures_or_match()
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// The maximum length of an `__index` table chain, as in PUC-Lua.
const MAX_INDEX_CHAIN: usize = 2000;

/// Looks up `key` in `t`, following `__index` tables. `__index` functions are
/// handled by [`gsub_slow`] instead.
fn lookup<'gc>(ctx: Context<'gc>, mut t: Table<'gc>, key: Value<'gc>) -> Value<'gc> {
    for _ in 0..MAX_INDEX_CHAIN {
        let value = t.get_value(ctx, key);
        if !value.is_nil() {
            return value;
        }

        match t.metatable().map(|mt| mt.get_value(ctx, MetaMethod::Index)) {
            Some(Value::Table(next)) => t = next,
            _ => break,
        }
    }

    Value::Nil
}

/// The slow (metacall) version of `string.gsub`.
fn gsub_slow<'gc>(
    ctx: Context<'gc>,
    mut engine: Substitution,
    table: Option<Table<'gc>>,
    f: Function<'gc>,
) -> CallbackReturn<'gc> {
    let s = async_sequence(&ctx, move |locals, mut seq| {
        let table = table.map(|table| locals.stash(&ctx, table));
        let f = locals.stash(&ctx, f);
        async move {
            loop {
                let bottom = seq.try_enter(|ctx, locals, _, mut stack| {
                    let Some(ranges) = next(&mut engine).raise(ctx)? else {
                        return Ok(None);
                    };

                    let bottom = stack.len();
                    if let Some(table) = &table {
                        let table = locals.fetch(table);
                        let mut key = capture_value(ctx, engine.input(), first_capture(ranges));

                        // Raw hits skip the metacall.
                        loop {
                            let value = table.get_value(ctx, key);
                            if value.is_nil() {
                                break;
                            }
                            repl_value(ctx, &mut engine, value).raise(ctx)?;
                            let Some(ranges) = next(&mut engine).raise(ctx)? else {
                                return Ok(None);
                            };
                            key = capture_value(ctx, engine.input(), first_capture(ranges));
                        }

                        stack.into_back(ctx, (table, key));
                    } else {
                        let input = engine.input();
                        stack.extend(
                            ranges
                                .into_captures_or_match()
                                .into_iter()
                                .map(|capture| capture_value(ctx, input, capture)),
                        );
                    }
                    Ok(Some(bottom))
                })?;

                let Some(bottom) = bottom else {
                    break;
                };

                seq.call(&f, bottom).await?;
                seq.try_enter(|ctx, _, _, mut stack| {
                    let value = stack.get(bottom);
                    stack.resize(bottom);
                    repl_value(ctx, &mut engine, value).raise(ctx)
                })?;
            }

            seq.try_enter(|ctx, _, _, mut stack| {
                let (value, n) = engine.finish();
                stack.into_back(ctx, (encode(ctx, &value), i64::try_from(n)?));
                Ok(())
            })?;

            Ok(SequenceReturn::Return)
        }
    });

    CallbackReturn::Sequence(s)
}

/// Replaces a match with a value from a table or function callback.
///
/// The value must be a string or a number. Anything else, including `nil`
/// and `false`, is an error.
fn repl_value<'gc>(
    ctx: Context<'gc>,
    engine: &mut Substitution,
    value: Value<'gc>,
) -> Result<(), Error> {
    let repl = value
        .into_string(ctx)
        .ok_or(Error::ReplacementValue(value.type_name()))?;
    engine.replace(&decode(repl));
    Ok(())
}

/// Expands a replacement template for one match.
///
/// `%0` is the whole match and `%1`–`%9` are captures, where `%1` also stands
/// for the whole match if the pattern has no captures. `%%` is a literal
/// percent sign.
fn expand(template: &str, input: &str, ranges: &MatchRanges) -> Result<String, Error> {
    let whole = || input.get(ranges.full_match.clone()).unwrap_or_default();
    let mut result = String::with_capacity(template.len());
    for (pos, token) in ReplIter(template.chars().enumerate()) {
        let index = match token {
            Ok(ReplToken::Literal(c)) => {
                result.push(c);
                continue;
            }
            Ok(ReplToken::CaptureRef(index)) => usize::from(index),
            Err(err) => {
                return Err(Error::Replacement {
                    repl: template.to_string(),
                    err,
                });
            }
        };

        if index == 0 || (index == 1 && ranges.captures.is_empty()) {
            result.push_str(whole());
        } else {
            match ranges.captures.get(index - 1) {
                Some(Capture::Range(range)) => {
                    result.push_str(input.get(range.clone()).unwrap_or_default());
                }
                Some(Capture::Position(at)) => {
                    let at = super::index::char_index(input, *at) + 1;
                    result.push_str(&at.to_string());
                }
                None => {
                    return Err(Error::Replacement {
                        repl: template.to_string(),
                        err: engine::Error::InvalidCaptureIndex { pos: pos + 1, index },
                    });
                }
            }
        }
    }
    Ok(result)
}

/// A replacement string token (`%N`) used to specify a capture group from the
/// input as the source of the replacement.
///
/// As in PUC-Lua, only capture groups 0–9 can be specified.
enum ReplToken {
    /// A literal character.
    Literal(char),
    /// Use the string captured in group `n` as the replacement.
    CaptureRef(u8),
}

/// Converts the replacement string `repl` into a sequence of [`ReplToken`],
/// each with the 0-indexed codepoint position where it starts.
struct ReplIter<I>(I);

impl<I> Iterator for ReplIter<I>
where
    I: Iterator<Item = (usize, char)>,
{
    type Item = (usize, Result<ReplToken, engine::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(pos, c)| {
            let token = if c == '%'
                && let Some((_, c)) = self.0.next()
            {
                match c {
                    // Clippy: Values are always 0-9
                    #[allow(clippy::cast_possible_truncation)]
                    '0'..='9' => Ok(ReplToken::CaptureRef(c.to_digit(10).unwrap_or(0) as u8)),
                    '%' => Ok(ReplToken::Literal(c)),
                    _ => Err(engine::Error::InvalidReplacement),
                }
            } else {
                Ok(ReplToken::Literal(c))
            };
            (pos, token)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn substitute(input: &str, pattern: &str, repl: &str, limit: Option<i64>) -> (String, usize) {
        let mut engine =
            Substitution::new(input.to_string(), Pattern::compile(pattern).unwrap(), limit);
        while let Some(ranges) = engine.next().unwrap() {
            let repl = expand(repl, engine.input(), &ranges).unwrap();
            engine.replace(&repl);
        }
        engine.finish()
    }

    #[test]
    fn basic() {
        assert_eq!(substitute("a1b2c3", "%d", "#", None), ("a#b#c#".into(), 3));
        assert_eq!(substitute("aaa", "a", "b", Some(2)), ("bba".into(), 2));
        assert_eq!(substitute("hello world", "o", "0", None), ("hell0 w0rld".into(), 2));
        assert_eq!(substitute("日本語", "本", "[%0]", None), ("日[本]語".into(), 1));
    }

    #[test]
    fn limit_boundaries() {
        // "a1b2c3" has three matches.
        assert_eq!(substitute("a1b2c3", "%d", "#", Some(0)), ("a1b2c3".into(), 0));
        assert_eq!(substitute("a1b2c3", "%d", "#", Some(1)), ("a#b2c3".into(), 1));
        assert_eq!(substitute("a1b2c3", "%d", "#", Some(2)), ("a#b#c3".into(), 2));
        assert_eq!(substitute("a1b2c3", "%d", "#", Some(3)), ("a#b#c#".into(), 3));
        assert_eq!(substitute("a1b2c3", "%d", "#", Some(4)), ("a#b#c#".into(), 3));
        assert_eq!(substitute("a1b2c3", "%d", "#", Some(-1)), ("a#b#c#".into(), 3));
    }

    #[test]
    fn empty_matches() {
        assert_eq!(substitute("abc", "", "-", None), ("-a-b-c-".into(), 4));
        assert_eq!(substitute("héllo", "x*", "-", None), ("-h-é-l-l-o-".into(), 6));
        assert_eq!(substitute("abc", "%w*", "x", None), ("x".into(), 1));
        assert_eq!(substitute("", "", "x", None), ("x".into(), 1));
    }

    #[test]
    fn anchored() {
        assert_eq!(substitute("aaa", "^a", "b", None), ("baa".into(), 1));
        assert_eq!(substitute("baa", "^a", "b", None), ("baa".into(), 0));
        assert_eq!(substitute("", "^", "x", None), ("x".into(), 1));
    }

    #[test]
    fn template_captures() {
        assert_eq!(
            substitute("hello world", "(%w+) (%w+)", "%2 %1", None),
            ("world hello".into(), 1)
        );
        assert_eq!(substitute("abc", "%w", "%1%1", None), ("aabbcc".into(), 3));
        assert_eq!(substitute("abc", "b", "%%", None), ("a%c".into(), 1));
        assert_eq!(substitute("aéb", "()é()", "%1-%2", None), ("a2-3b".into(), 1));
        assert_eq!(substitute("abc", "b", "100%", None), ("a100%c".into(), 1));
    }

    #[test]
    fn template_errors() {
        let ranges = Pattern::compile("(b)").unwrap().find("abc", 0).unwrap().unwrap();
        assert_eq!(
            expand("%2", "abc", &ranges).unwrap_err().to_string(),
            "invalid replacement string \"%2\": invalid capture index %2 at 1"
        );
        assert_eq!(
            expand("x%y", "abc", &ranges).unwrap_err().to_string(),
            "invalid replacement string \"x%y\": invalid use of '%' in replacement string"
        );
    }

    #[test]
    fn copies_unmatched_spans() {
        let mut engine =
            Substitution::new("a-b-c".to_string(), Pattern::compile("%a").unwrap(), Some(2));
        while let Some(ranges) = engine.next().unwrap() {
            let repl = engine.input()[ranges.full_match].to_uppercase();
            engine.replace(&repl);
        }
        assert_eq!(engine.finish(), ("A-B-c".into(), 2));
    }
}
