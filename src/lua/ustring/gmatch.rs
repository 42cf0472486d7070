//! Persistent match cursors for `gmatch`.

use super::{
    codec::{Args, Error, Raise as _, decode, encode},
    engine::{self, MatchRanges, Pattern},
    find::{compile, push_captures},
};
use crate::{config::Limits, lua::prelude::*};
use core::cell::RefCell;
use gc_arena::Gc;
use piccolo::UserData;

/// The name of the match cursor type as seen from Lua.
const TYPE_NAME: &str = "MatchCursor";

/// The progress of a match cursor through its subject string.
struct CursorState {
    /// The subject string.
    input: String,
    /// The search pattern.
    pattern: Pattern,
    /// The position where the next match is attempted.
    src: usize,
    /// The end position of the last match.
    last_match: Option<usize>,
    /// Whether all matches have been returned.
    exhausted: bool,
}

impl CursorState {
    /// Finds the next match after the cursor.
    ///
    /// An anchored pattern only matches at the cursor position, so the first
    /// gap between matches ends the iteration.
    fn next(&mut self) -> Result<Option<MatchRanges>, engine::Error> {
        while !self.exhausted {
            if let Some(ranges) = self.pattern.match_at(&self.input, self.src)?
                && Some(ranges.full_match.end) != self.last_match
            {
                self.src = ranges.full_match.end;
                self.last_match = Some(self.src);
                return Ok(Some(ranges));
            } else if !self.pattern.is_anchored()
                && let Some(c) = self.input[self.src..].chars().next()
            {
                self.src += c.len_utf8();
            } else {
                log::trace!("match cursor for {:?} exhausted", self.pattern.as_str());
                self.exhausted = true;
            }
        }

        Ok(None)
    }
}

/// A stateful search over a fixed subject string, exposed to Lua as userdata.
pub(crate) struct MatchCursor {
    /// The cursor state, or `None` once the cursor has been finalised.
    state: RefCell<Option<CursorState>>,
}

impl MatchCursor {
    /// Creates a new cursor positioned at the start of `input`.
    fn new(input: String, pattern: Pattern) -> Self {
        Self {
            state: RefCell::new(Some(CursorState {
                input,
                pattern,
                src: 0,
                last_match: None,
                exhausted: false,
            })),
        }
    }

    /// Reads the attribute `key`.
    fn attribute(&self, key: &str) -> Result<String, Error> {
        let state = self.state.borrow();
        let state = state.as_ref().ok_or(Error::Finalized)?;
        match key {
            "input" => Ok(state.input.clone()),
            "pattern" => Ok(state.pattern.as_str().to_string()),
            _ => Err(Error::UnreadableMember(key.to_string())),
        }
    }

    /// Advances the cursor and pushes the captures of the next match onto the
    /// stack. Returns false if there are no more matches.
    fn advance<'gc>(&self, ctx: Context<'gc>, stack: &mut Stack<'gc, '_>) -> Result<bool, Error> {
        let mut state = self.state.borrow_mut();
        let state = state.as_mut().ok_or(Error::Finalized)?;
        let ranges = state.next().map_err(|err| Error::Matching {
            pattern: state.pattern.as_str().to_string(),
            err,
        })?;

        Ok(if let Some(ranges) = ranges {
            push_captures(ctx, stack, &state.input, ranges);
            true
        } else {
            false
        })
    }

    /// Releases the subject and pattern. Returns false if the cursor was
    /// already finalised.
    fn finalize(&self) -> bool {
        let released = self.state.borrow_mut().take().is_some();
        if released {
            log::trace!("finalized match cursor");
        }
        released
    }
}

impl Drop for MatchCursor {
    fn drop(&mut self) {
        self.finalize();
    }
}

/// Creates a `gmatch` iterator. Returns only the iterator function, which
/// holds its cursor as an upvalue.
pub(super) fn gmatch_lua<'gc>(
    ctx: Context<'gc>,
    mut stack: Stack<'gc, '_>,
    limits: Limits,
    metatable: Table<'gc>,
) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
    let args = Args::new("gmatch", &mut stack, 2..=2, limits).raise(ctx)?;
    let s = args.subject(ctx, 0).raise(ctx)?;
    let pattern = compile(&args.pattern(ctx, 1).raise(ctx)?).raise(ctx)?;

    let cursor = new_cursor(ctx, s.into_owned(), pattern, metatable);
    stack.push_back(Value::Function(iterator(ctx, cursor).into()));
    Ok(CallbackReturn::Return)
}

/// Creates a match cursor userdata positioned at the start of `input`.
pub(super) fn new_cursor<'gc>(
    ctx: Context<'gc>,
    input: String,
    pattern: Pattern,
    metatable: Table<'gc>,
) -> UserData<'gc> {
    let cursor = UserData::new_static(&ctx, MatchCursor::new(input, pattern));
    cursor.set_metatable(&ctx, Some(metatable));
    cursor
}

/// Creates the iterator function for `cursor`. Each call ignores its
/// arguments and returns the captures of the next match, or `nil` once the
/// cursor is exhausted.
pub(super) fn iterator<'gc>(ctx: Context<'gc>, cursor: UserData<'gc>) -> Callback<'gc> {
    Callback::from_fn_with(&ctx, cursor, |&cursor, ctx, _, mut stack| {
        stack.clear();
        if !downcast(ctx, Value::UserData(cursor))?
            .1
            .advance(ctx, &mut stack)
            .raise(ctx)?
        {
            stack.push_back(Value::Nil);
        }
        Ok(CallbackReturn::Return)
    })
}

/// Creates the metatable shared by all match cursors.
pub(super) fn metatable(ctx: Context<'_>) -> Table<'_> {
    let mt = Table::new(&ctx);

    mt.set_field(ctx, "__name", TYPE_NAME);

    mt.set_field(
        ctx,
        "__index",
        Callback::from_fn(&ctx, |ctx, _, mut stack| {
            let (this, key) = stack.consume::<(Value<'_>, Value<'_>)>(ctx)?;
            let key = key
                .into_string(ctx)
                .map_or_else(|| key.type_name().to_string(), |key| decode(key).into_owned());
            let value = downcast(ctx, this)?.1.attribute(&key).raise(ctx)?;
            stack.replace(ctx, encode(ctx, &value));
            Ok(CallbackReturn::Return)
        }),
    );

    mt.set_field(
        ctx,
        "__newindex",
        Callback::from_fn(&ctx, |ctx, _, _| Err(Error::ReadOnly.into_vm(ctx))),
    );

    mt.set_field(
        ctx,
        "__eq",
        Callback::from_fn(&ctx, |ctx, _, mut stack| {
            let (a, b) = stack.consume::<(Value<'_>, Value<'_>)>(ctx)?;
            let equal = matches!(
                (a, b),
                (Value::UserData(a), Value::UserData(b)) if address(a) == address(b)
            );
            stack.replace(ctx, equal);
            Ok(CallbackReturn::Return)
        }),
    );

    mt.set_field(
        ctx,
        "__tostring",
        Callback::from_fn(&ctx, |ctx, _, mut stack| {
            let (this, _) = downcast(ctx, stack.consume::<Value<'_>>(ctx)?)?;
            stack.replace(ctx, format!("{TYPE_NAME}: {:#x}", address(this)));
            Ok(CallbackReturn::Return)
        }),
    );

    mt.set_field(
        ctx,
        "__gc",
        Callback::from_fn(&ctx, |ctx, _, mut stack| {
            let (_, cursor) = downcast(ctx, stack.consume::<Value<'_>>(ctx)?)?;
            cursor.finalize();
            Ok(CallbackReturn::Return)
        }),
    );

    mt
}

/// Returns the address of a userdata object, which is its identity.
#[inline]
fn address(ud: UserData<'_>) -> usize {
    Gc::as_ptr(ud.into_inner()) as usize
}

/// Converts `value` into a match cursor, also returning the userdata which
/// holds it.
fn downcast<'gc>(
    ctx: Context<'gc>,
    value: Value<'gc>,
) -> Result<(UserData<'gc>, &'gc MatchCursor), VmError<'gc>> {
    if let Value::UserData(ud) = value
        && let Ok(cursor) = ud.downcast_static::<MatchCursor>()
    {
        Ok((ud, cursor))
    } else {
        Err(format!("{TYPE_NAME} expected, got {}", value.type_name())
            .into_value(ctx)
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(input: &str, pattern: &str) -> MatchCursor {
        MatchCursor::new(input.to_string(), Pattern::compile(pattern).unwrap())
    }

    fn collect(cursor: &MatchCursor) -> Vec<String> {
        let mut state = cursor.state.borrow_mut();
        let state = state.as_mut().unwrap();
        let mut matches = vec![];
        while let Some(ranges) = state.next().unwrap() {
            matches.push(state.input[ranges.full_match].to_string());
        }
        matches
    }

    #[test]
    fn iterates_all_matches() {
        assert_eq!(collect(&cursor("a,b,c", "[^,]+")), ["a", "b", "c"]);
        assert_eq!(collect(&cursor("日本 語", "%S+")), ["日本", "語"]);
        assert!(collect(&cursor("abc", "%d")).is_empty());
    }

    #[test]
    fn skips_empty_match_after_match() {
        assert_eq!(collect(&cursor("ab", "%a*")), ["ab"]);
        assert_eq!(collect(&cursor("ab", "")), ["", "", ""]);
    }

    #[test]
    fn anchor_applies_at_cursor() {
        assert_eq!(collect(&cursor("aab", "^a")), ["a", "a"]);
        assert!(collect(&cursor("baa", "^a")).is_empty());
    }

    #[test]
    fn stays_exhausted() {
        let cursor = cursor("a", "a");
        assert_eq!(collect(&cursor), ["a"]);
        assert!(collect(&cursor).is_empty());
    }

    #[test]
    fn attributes_and_finalize() {
        let cursor = cursor("a,b", "[^,]+");
        assert_eq!(collect(&cursor).len(), 2);
        assert_eq!(cursor.attribute("pattern").unwrap(), "[^,]+");
        assert_eq!(cursor.attribute("input").unwrap(), "a,b");
        assert_eq!(
            cursor.attribute("src").unwrap_err().to_string(),
            "not a readable MatchCursor member: src"
        );
        assert!(cursor.finalize());
        assert!(!cursor.finalize());
        assert_eq!(
            cursor.attribute("input").unwrap_err().to_string(),
            "MatchCursor has been finalized"
        );
    }
}
