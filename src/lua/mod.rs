//! Lua interpreter support.

use crate::config::Limits;
use piccolo::{Closure, Executor, ExternError, Lua};

mod prelude;
pub mod ustring;

/// Creates a new Lua VM with the base, io and Unicode string libraries
/// installed.
pub fn new_vm(limits: Limits) -> Result<Lua, ExternError> {
    let mut vm = Lua::core();

    vm.try_enter(|ctx| {
        piccolo::stdlib::load_io(ctx);
        ustring::load_utf8(ctx, limits)
    })?;

    Ok(vm)
}

/// Loads `code` as a chunk called `name` and runs it to completion.
pub fn run_script(vm: &mut Lua, name: &str, code: &[u8]) -> Result<(), ExternError> {
    let exec = vm.try_enter(|ctx| {
        let closure = Closure::load(ctx, Some(name), code)?;
        Ok(ctx.stash(Executor::start(ctx, closure.into(), ())))
    })?;

    vm.execute::<()>(&exec)?;

    Ok(())
}
