//! Unicode-aware replacements for the Lua string library, addressed by
//! codepoint instead of by byte.

pub mod config;
pub mod lua;
