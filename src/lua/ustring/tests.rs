//! Script tests for the Unicode string library.

// This code is adapted from piccolo. The upstream copyright is:
//
// SPDX-License-Identifier: MIT

use super::{Utf8Library, engine::Pattern, gmatch};
use crate::{
    config::Limits,
    lua::{new_vm, prelude::*, run_script},
};
use gc_arena::Rootable;
use piccolo::{ExternError, io};
use std::{
    fs::{File, read_dir},
    io::{Read, Write, stdout},
};

const BASE_DIR: &str = "./src/lua/ustring/tests";

fn run_lua_code(name: &str, code: &[u8]) -> Result<(), ExternError> {
    let mut lua = new_vm(Limits {
        pattern_length: 64,
        string_length: 1024,
    })?;
    run_script(&mut lua, name, code)
}

fn run_tests(dir: &str) -> bool {
    let _ = writeln!(stdout(), "running all test scripts in {dir:?}");

    let mut file_failed = false;
    for dir in read_dir(dir).expect("could not list dir contents") {
        let path = dir.expect("could not read dir entry").path();
        if let Some(ext) = path.extension()
            && ext == "lua"
        {
            let mut file = io::buffered_read(File::open(&path).unwrap()).unwrap();
            let mut source = Vec::new();
            file.read_to_end(&mut source).unwrap();

            let _ = writeln!(stdout(), "running {path:?}");
            if let Err(err) = run_lua_code(path.to_string_lossy().as_ref(), &source) {
                let _ = writeln!(stdout(), "error encountered running: {err:#}");
                file_failed = true;
            }
        } else {
            let _ = writeln!(stdout(), "skipping file {path:?}");
        }
    }
    file_failed
}

#[test]
fn test_scripts() {
    let mut file_failed = false;
    file_failed |= run_tests(BASE_DIR);
    assert!(!file_failed, "one or more errors occurred");
}

#[test]
fn limits_are_enforced() {
    let mut lua = new_vm(Limits {
        pattern_length: 4,
        string_length: 8,
    })
    .unwrap();
    run_script(
        &mut lua,
        "limits",
        br#"
            assert(string.len("12345678") == 8)
            local ok, err = pcall(string.len, "123456789")
            assert(not ok)
            assert(err == "bad argument #1 to 'len' (string is longer than 8 bytes)", err)
            ok, err = pcall(string.find, "abc", "%a%a%a")
            assert(not ok)
            assert(err == "bad argument #2 to 'find' (pattern is longer than 4 bytes)", err)
        "#,
    )
    .unwrap();
}

#[test]
fn runtime_errors_name_the_pattern() {
    let mut lua = new_vm(Limits::default()).unwrap();
    run_script(
        &mut lua,
        "too_complex",
        br#"
            local subject, pattern = "", ""
            for _ = 1, 600 do
                subject = subject .. "a"
                pattern = pattern .. "a?"
            end

            local expected = 'error matching pattern "' .. pattern .. '": pattern too complex at '
            local function check(what, ok, err)
                assert(not ok, what .. " succeeded")
                assert(string.find(err, expected, 1, true) == 1, what .. ": " .. tostring(err))
            end

            check("find", pcall(string.find, subject, pattern))
            check("match", pcall(string.match, subject, pattern))
            check("gmatch", pcall(string.gmatch(subject, pattern)))
            check("gsub", pcall(string.gsub, subject, pattern, "x"))
        "#,
    )
    .unwrap();
}

#[test]
fn cursor_object() {
    let mut lua = new_vm(Limits::default()).unwrap();
    lua.try_enter(|ctx| {
        let metatable = ctx
            .singleton::<Rootable![Utf8Library]>()
            .cursor_metatable(ctx);
        let pattern = Pattern::compile("[^,]+").unwrap();
        let cursor = gmatch::new_cursor(ctx, "a,b".into(), pattern.clone(), metatable);
        let other = gmatch::new_cursor(ctx, "a,b".into(), pattern, metatable);
        ctx.set_global("cursor", Value::UserData(cursor));
        ctx.set_global("other", Value::UserData(other));
        ctx.set_global(
            "iter",
            Value::Function(gmatch::iterator(ctx, cursor).into()),
        );
        Ok(())
    })
    .unwrap();

    run_script(
        &mut lua,
        "cursor",
        br#"
            assert(iter() == "a")
            assert(cursor.pattern == "[^,]+")
            assert(cursor.input == "a,b")

            local ok, err = pcall(function() return cursor.position end)
            assert(not ok)
            assert(err == "not a readable MatchCursor member: position", err)

            ok, err = pcall(function() cursor.pattern = "x" end)
            assert(not ok)
            assert(err == "MatchCursor members are read-only", err)

            local mt = getmetatable(cursor)
            assert(mt.__name == "MatchCursor")
            assert(string.find(mt.__tostring(cursor), "MatchCursor: 0x", 1, true) == 1)
            assert(mt.__eq(cursor, cursor) == true)
            assert(mt.__eq(cursor, other) == false)
            assert(getmetatable(other) == mt)

            mt.__gc(cursor)
            mt.__gc(cursor)
            ok, err = pcall(iter)
            assert(not ok)
            assert(err == "MatchCursor has been finalized", err)
            ok, err = pcall(function() return cursor.input end)
            assert(err == "MatchCursor has been finalized", err)
            assert(other.input == "a,b")
        "#,
    )
    .unwrap();
}
