//! Unicode-aware replacements for the Lua string library.
//!
//! Every replaced function indexes strings by codepoint instead of by byte.
//! The original byte-based functions stay available under the same name
//! prefixed with `_`, and the original `len` is also available as `bytes`.

use crate::{config::Limits, lua::prelude::*};
use codec::{Args, Raise as _, encode};
use core::cell::{Cell, RefCell};
use gc_arena::{Collect, Rootable};
use piccolo::StashedTable;
use property::Property;
use text::Form;

pub use codec::Error;

mod codec;
pub mod engine;
mod find;
mod gmatch;
mod gsub;
pub mod index;
pub mod property;
pub mod text;
#[cfg(test)]
mod tests;

/// The string library functions which are replaced, and the names under which
/// the originals are kept.
const REPLACED: &[(&str, &str)] = &[
    ("char", "_char"),
    ("find", "_find"),
    ("gmatch", "_gmatch"),
    ("gsub", "_gsub"),
    ("len", "_len"),
    ("lower", "_lower"),
    ("match", "_match"),
    ("reverse", "_reverse"),
    ("sub", "_sub"),
    ("upper", "_upper"),
];

/// The Unicode-aware Lua string library.
#[derive(Collect, Default)]
#[collect(require_static)]
pub(crate) struct Utf8Library {
    /// Argument size limits.
    limits: Cell<Limits>,
    /// Cached metatable for match cursors.
    cursor_metatable: RefCell<Option<StashedTable>>,
}

impl Utf8Library {
    /// Returns the metatable for match cursors, creating it on first use.
    fn cursor_metatable<'gc>(&self, ctx: Context<'gc>) -> Table<'gc> {
        if let Some(mt) = self.cursor_metatable.borrow().as_ref() {
            return ctx.fetch(mt);
        }

        let mt = gmatch::metatable(ctx);
        *self.cursor_metatable.borrow_mut() = Some(ctx.stash(mt));
        mt
    }

    /// Creates a string from a sequence of Unicode code points.
    fn r#char<'gc>(
        &self,
        ctx: Context<'gc>,
        mut stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        let args = Args::new("char", &mut stack, 0..=usize::MAX, self.limits.get()).raise(ctx)?;

        let value = (0..args.len())
            .map(|index| {
                let value = args
                    .opt_integer(index)?
                    .ok_or_else(|| args.type_error(index, "number", Value::Nil))?;
                text::to_char(value).ok_or_else(|| args.value_error(index, "value out of range"))
            })
            .collect::<Result<String, _>>()
            .raise(ctx)?;

        stack.replace(ctx, encode(ctx, &value));
        Ok(CallbackReturn::Return)
    }

    /// Returns the code points between 1-indexed `i` and `j`.
    fn codepoint<'gc>(
        &self,
        ctx: Context<'gc>,
        mut stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        let args = Args::new("codepoint", &mut stack, 1..=3, self.limits.get()).raise(ctx)?;
        let s = args.subject(ctx, 0).raise(ctx)?;
        let i = args.opt_integer(1).raise(ctx)?;
        let j = args.opt_integer(2).raise(ctx)?;

        stack.extend(text::codepoints(&s, i, j).map(|c| Value::Integer(c.into())));
        Ok(CallbackReturn::Return)
    }

    /// Finds a pattern in a string.
    fn find<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        find::find_lua(ctx, stack, self.limits.get())
    }

    /// Returns the value of a Unicode character property for each code point
    /// of a string.
    fn get_property<'gc>(
        &self,
        ctx: Context<'gc>,
        mut stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        let args = Args::new("getProperty", &mut stack, 2..=2, self.limits.get()).raise(ctx)?;
        let s = args.subject(ctx, 0).raise(ctx)?;
        let name = codec::decode(args.string(ctx, 1).raise(ctx)?);
        let property = Property::from_name(&name);
        if property.is_none() {
            log::trace!("unknown Unicode property {name:?}");
        }

        stack.extend(s.chars().map(|c| {
            property
                .and_then(|property| property.value_name(c))
                .map_or(Value::Nil, |value| Value::String(encode(ctx, &value)))
        }));
        Ok(CallbackReturn::Return)
    }

    /// Creates an iterator over all matches of a pattern in a string.
    fn gmatch<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        gmatch::gmatch_lua(ctx, stack, self.limits.get(), self.cursor_metatable(ctx))
    }

    /// Finds and replaces matching patterns within a string.
    fn gsub<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        gsub::gsub_lua(ctx, stack, self.limits.get())
    }

    /// Returns the length of the input string in Unicode characters.
    fn len<'gc>(
        &self,
        ctx: Context<'gc>,
        mut stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        let args = Args::new("len", &mut stack, 1..=1, self.limits.get()).raise(ctx)?;
        let s = args.subject(ctx, 0).raise(ctx)?;
        stack.replace(ctx, i64::try_from(text::len(&s))?);
        Ok(CallbackReturn::Return)
    }

    /// Converts a string to lowercase.
    fn lower<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("lower", ctx, stack, text::lower)
    }

    /// Matches a pattern in a string.
    fn r#match<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        find::match_lua(ctx, stack, self.limits.get())
    }

    /// Reverses the code points of a string.
    fn reverse<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("reverse", ctx, stack, text::reverse)
    }

    /// Returns a slice of the given string.
    fn sub<'gc>(
        &self,
        ctx: Context<'gc>,
        mut stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        let args = Args::new("sub", &mut stack, 1..=3, self.limits.get()).raise(ctx)?;
        let s = args.subject(ctx, 0).raise(ctx)?;
        let start = args.opt_integer(1).raise(ctx)?;
        let end = args.opt_integer(2).raise(ctx)?;
        stack.replace(ctx, encode(ctx, text::sub(&s, start, end)));
        Ok(CallbackReturn::Return)
    }

    /// Converts the input string to NFC form.
    fn to_nfc<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("toNFC", ctx, stack, |s| text::normalize(s, Form::Nfc))
    }

    /// Converts the input string to NFD form.
    fn to_nfd<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("toNFD", ctx, stack, |s| text::normalize(s, Form::Nfd))
    }

    /// Converts the input string to NFKC form.
    fn to_nfkc<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("toNFKC", ctx, stack, |s| text::normalize(s, Form::Nfkc))
    }

    /// Converts the input string to NFKD form.
    fn to_nfkd<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("toNFKD", ctx, stack, |s| text::normalize(s, Form::Nfkd))
    }

    /// Converts a string to uppercase.
    fn upper<'gc>(
        &self,
        ctx: Context<'gc>,
        stack: Stack<'gc, '_>,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        self.map("upper", ctx, stack, text::upper)
    }

    /// Applies a string-to-string function to the single string argument of
    /// `func`.
    fn map<'gc>(
        &self,
        func: &'static str,
        ctx: Context<'gc>,
        mut stack: Stack<'gc, '_>,
        f: impl FnOnce(&str) -> String,
    ) -> Result<CallbackReturn<'gc>, VmError<'gc>> {
        let args = Args::new(func, &mut stack, 1..=1, self.limits.get()).raise(ctx)?;
        let s = args.subject(ctx, 0).raise(ctx)?;
        stack.replace(ctx, encode(ctx, &f(&s)));
        Ok(CallbackReturn::Return)
    }
}

/// Installs the Unicode string library over the global `string` table.
///
/// # Errors
///
/// If there is no `string` table, an error is returned.
pub fn load_utf8<'gc>(ctx: Context<'gc>, limits: Limits) -> Result<(), VmError<'gc>> {
    log::debug!("Loading Unicode string library with {limits:?}");

    let string = ctx.get_global::<Table<'_>>("string")?;
    let library = ctx.singleton::<Rootable![Utf8Library]>();
    library.limits.set(limits);

    string.set_field(ctx, "bytes", string.get_value(ctx, "len"));
    for &(name, alias) in REPLACED {
        string.set_field(ctx, alias, string.get_value(ctx, name));
    }

    make_fn(string, "char", ctx, Utf8Library::r#char);
    make_fn(string, "codepoint", ctx, Utf8Library::codepoint);
    make_fn(string, "find", ctx, Utf8Library::find);
    make_fn(string, "getProperty", ctx, Utf8Library::get_property);
    make_fn(string, "gmatch", ctx, Utf8Library::gmatch);
    make_fn(string, "gsub", ctx, Utf8Library::gsub);
    make_fn(string, "len", ctx, Utf8Library::len);
    make_fn(string, "lower", ctx, Utf8Library::lower);
    make_fn(string, "match", ctx, Utf8Library::r#match);
    make_fn(string, "reverse", ctx, Utf8Library::reverse);
    make_fn(string, "sub", ctx, Utf8Library::sub);
    make_fn(string, "toNFC", ctx, Utf8Library::to_nfc);
    make_fn(string, "toNFD", ctx, Utf8Library::to_nfd);
    make_fn(string, "toNFKC", ctx, Utf8Library::to_nfkc);
    make_fn(string, "toNFKD", ctx, Utf8Library::to_nfkd);
    make_fn(string, "upper", ctx, Utf8Library::upper);

    string.set_field(ctx, "gfind", string.get_value(ctx, "gmatch"));

    Ok(())
}

/// Adds a callback to the given table which operates directly on the stack.
fn make_fn<'gc, F>(table: Table<'gc>, name: &'static str, ctx: Context<'gc>, method: F)
where
    F: Fn(&Utf8Library, Context<'gc>, Stack<'gc, '_>) -> Result<CallbackReturn<'gc>, VmError<'gc>>
        + 'static,
{
    let callback = Callback::from_fn(&ctx, move |ctx, _, stack| {
        let this = ctx.singleton::<Rootable![Utf8Library]>();
        method(this, ctx, stack)
    });

    table.set_field(ctx, name, callback);
}
