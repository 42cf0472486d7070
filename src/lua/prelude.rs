//! The Lua prelude.

pub(crate) use piccolo::{
    Callback, CallbackReturn, Context, Error as VmError, IntoValue, Stack, String as VmString,
    Table, Value,
};
