//! Basic string matching functions.

use super::{
    codec::{Args, Error, Raise as _, encode},
    engine::{Capture, MatchRanges, Pattern},
    index,
};
use crate::{config::Limits, lua::prelude::*};
use memchr::memmem;

/// Compiles `pattern`, converting a syntax error into a library error which
/// names the pattern.
pub(super) fn compile(pattern: &str) -> Result<Pattern, Error> {
    Pattern::compile(pattern).map_err(|err| {
        log::trace!("pattern {pattern:?} failed to compile: {err}");
        Error::Pattern {
            pattern: pattern.to_string(),
            err,
        }
    })
}

/// Converts a capture of `input` into a Lua value. Position captures become
/// 1-indexed codepoint positions.
pub(super) fn capture_value<'gc>(ctx: Context<'gc>, input: &str, capture: Capture) -> Value<'gc> {
    match capture {
        Capture::Range(range) => Value::String(encode(ctx, input.get(range).unwrap_or_default())),
        Capture::Position(pos) => Value::Integer(to_lua_index(index::char_index(input, pos))),
    }
}

/// Pushes the captures of a match onto the stack, or the whole match if the
/// pattern has no capture groups.
pub(super) fn push_captures<'gc>(
    ctx: Context<'gc>,
    stack: &mut Stack<'gc, '_>,
    input: &str,
    ranges: MatchRanges,
) {
    stack.extend(
        ranges
            .into_captures_or_match()
            .into_iter()
            .map(|capture| capture_value(ctx, input, capture)),
    );
}

/// Converts a 0-indexed offset into a 1-indexed Lua position.
#[inline]
fn to_lua_index(index: usize) -> i64 {
    i64::try_from(index).map_or(i64::MAX, |index| index + 1)
}

/// Finds a pattern in a string, optionally starting from an index. Returns
/// the 1-indexed start and end positions of the match, plus any captured
/// strings.
pub(super) fn find_lua<'gc>(
    ctx: Context<'gc>,
    mut stack: Stack<'gc, '_>,
    limits: Limits,
) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
    let args = Args::new("find", &mut stack, 2..=4, limits).raise(ctx)?;
    let s = args.subject(ctx, 0).raise(ctx)?;
    let needle = args.pattern(ctx, 1).raise(ctx)?;
    let init = args.opt_integer(2).raise(ctx)?;
    let plain = args.opt_bool(3).unwrap_or(false);

    let pattern = if plain {
        None
    } else {
        Some(compile(&needle).raise(ctx)?)
    };

    let Some(init) = index::init_index(s.chars().count(), init) else {
        stack.push_back(Value::Nil);
        return Ok(CallbackReturn::Return);
    };
    let at = index::byte_offset(&s, init);

    if let Some(pattern) = pattern {
        let found = pattern
            .find(&s, at)
            .map_err(|err| Error::Matching {
                pattern: needle.to_string(),
                err,
            })
            .raise(ctx)?;

        if let Some(ranges) = found {
            let range = index::char_range(&s, ranges.full_match.clone());
            stack.into_back(ctx, (to_lua_index(range.start), to_lua_index(range.end) - 1));
            for capture in ranges.captures {
                stack.push_back(capture_value(ctx, &s, capture));
            }
        } else {
            stack.push_back(Value::Nil);
        }
    } else if let Some(pos) = memmem::find(&s.as_bytes()[at..], needle.as_bytes()) {
        let start = init + s[at..at + pos].chars().count();
        let end = start + needle.chars().count();
        stack.into_back(ctx, (to_lua_index(start), to_lua_index(end) - 1));
    } else {
        stack.push_back(Value::Nil);
    }

    Ok(CallbackReturn::Return)
}

/// Matches a pattern in a string, optionally starting from an index.
/// Returns the matched captures, or the whole match if no capture groups
/// were specified.
pub(super) fn match_lua<'gc>(
    ctx: Context<'gc>,
    mut stack: Stack<'gc, '_>,
    limits: Limits,
) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
    let args = Args::new("match", &mut stack, 2..=3, limits).raise(ctx)?;
    let s = args.subject(ctx, 0).raise(ctx)?;
    let needle = args.pattern(ctx, 1).raise(ctx)?;
    let init = args.opt_integer(2).raise(ctx)?;
    let pattern = compile(&needle).raise(ctx)?;

    if s.is_empty() {
        stack.push_back(Value::Nil);
        return Ok(CallbackReturn::Return);
    }

    let Some(init) = index::init_index(s.chars().count(), init) else {
        stack.push_back(Value::Nil);
        return Ok(CallbackReturn::Return);
    };

    let found = pattern
        .find(&s, index::byte_offset(&s, init))
        .map_err(|err| Error::Matching {
            pattern: needle.to_string(),
            err,
        })
        .raise(ctx)?;

    if let Some(ranges) = found {
        push_captures(ctx, &mut stack, &s, ranges);
    } else {
        stack.push_back(Value::Nil);
    }

    Ok(CallbackReturn::Return)
}
