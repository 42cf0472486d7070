use lua_utf8::{
    config::{self, Limits},
    lua,
};
use std::{fs, path::PathBuf};

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] <script.lua>\n");
    println!("or, use environment variables:");
    println!("    LUA_UTF8_SCRIPT");
    println!("    {}", config::PATTERN_LIMIT_VAR);
    println!("    {}\n", config::STRING_LIMIT_VAR);
    println!("Options:");
    println!("    --pattern-limit: Maximum pattern length in bytes (default: 10000)");
    println!("    --string-limit: Maximum subject length in bytes (default: 2097152)\n");
    Err(anyhow::Error::msg(err))
}

fn free_arg(
    args: &mut pico_args::Arguments,
    key: &str,
    err: &'static str,
) -> anyhow::Result<String> {
    if let Some(arg) = args.opt_free_from_str::<String>()? {
        Ok(arg)
    } else if let Ok(arg) = std::env::var(key) {
        Ok(arg)
    } else {
        usage(err)
    }
}

fn limit_arg(
    args: &mut pico_args::Arguments,
    key: &'static str,
    var: &'static str,
) -> anyhow::Result<Option<usize>> {
    Ok(args
        .opt_value_from_str::<_, String>(key)?
        .map(|value| config::parse_limit(var, &value))
        .transpose()?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    let pattern_limit = limit_arg(&mut args, "--pattern-limit", config::PATTERN_LIMIT_VAR)?;
    let string_limit = limit_arg(&mut args, "--string-limit", config::STRING_LIMIT_VAR)?;
    let _ = args.contains("--");
    let script = PathBuf::from(free_arg(
        &mut args,
        "LUA_UTF8_SCRIPT",
        "Missing script argument",
    )?);

    if !args.finish().is_empty() {
        return usage("Unknown extra arguments passed");
    }

    let mut limits = Limits::from_env()?;
    if let Some(limit) = pattern_limit {
        limits.pattern_length = limit;
    }
    if let Some(limit) = string_limit {
        limits.string_length = limit;
    }

    let code = fs::read(&script)?;
    log::debug!("Running {} with {limits:?}", script.display());

    let mut vm = lua::new_vm(limits).map_err(|err| anyhow::anyhow!("{err:#}"))?;
    lua::run_script(&mut vm, &script.to_string_lossy(), &code)
        .map_err(|err| anyhow::anyhow!("{err:#}"))
}
