//! Conversions from 1-based, possibly negative Lua indexes into 0-based
//! codepoint offsets.
//!
//! `sub` and `find` disagree about what happens to an index beyond the end of
//! the string: `sub` clamps it into an empty range, whereas `find` and `match`
//! give up immediately. Each convention has its own function here and callers
//! never do their own index arithmetic.

use core::ops::Range;

/// Converts the `sub`-style 1-indexed inclusive `start` and `end` bounds into
/// a 0-indexed half-open range of codepoints within a string of `len`
/// codepoints.
///
/// Missing bounds default to the whole string. Negative bounds count from the
/// end of the string. The result always satisfies
/// `start <= end && end <= len`.
pub fn sub_range(len: usize, start: Option<i64>, end: Option<i64>) -> Range<usize> {
    let len_i = to_i64(len);
    let start = from_end(start.unwrap_or(1), len_i).clamp(1, len_i + 1);
    let end = from_end(end.unwrap_or(-1), len_i).clamp(0, len_i);

    let start = to_usize(start - 1);
    if end < 1 || to_usize(end) <= start {
        start..start
    } else {
        start..to_usize(end)
    }
}

/// Converts the `find`-style 1-indexed `init` position into a 0-indexed
/// codepoint offset within a string of `len` codepoints.
///
/// Returns `None` when `init` is beyond the end of the string, in which case
/// the search must fail without trying to match.
pub fn init_index(len: usize, init: Option<i64>) -> Option<usize> {
    let len_i = to_i64(len);
    let init = init.unwrap_or(1);
    if init > len_i {
        return None;
    }

    Some(to_usize(from_end(init, len_i).max(1) - 1))
}

/// Converts the `codepoint`-style 1-indexed inclusive `i` and `j` positions
/// into a 0-indexed half-open range of codepoints within a string of `len`
/// codepoints.
///
/// Unlike `sub`, negative positions do not count from the end; anything below
/// 1 is treated as 1. `j` defaults to `i` and is never less than it. Both are
/// clamped to the last codepoint.
pub fn codepoint_range(len: usize, i: Option<i64>, j: Option<i64>) -> Range<usize> {
    if len == 0 {
        return 0..0;
    }

    let len_i = to_i64(len);
    let i = i.unwrap_or(1).clamp(1, len_i);
    let j = j.unwrap_or(i).max(i).min(len_i);
    to_usize(i - 1)..to_usize(j)
}

/// Returns the byte offset of the codepoint at 0-indexed position `index` in
/// `s`, or the length of `s` if `index` is past the end.
#[inline]
pub fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map_or(s.len(), |(pos, _)| pos)
}

/// Returns the 0-indexed codepoint position of the byte offset `pos` in `s`.
#[inline]
pub fn char_index(s: &str, pos: usize) -> usize {
    s.get(..pos).map_or_else(|| s.chars().count(), |s| s.chars().count())
}

/// Converts the byte range `range` of `s` into a 0-indexed range of
/// codepoints.
#[inline]
pub fn char_range(s: &str, range: Range<usize>) -> Range<usize> {
    let start = char_index(s, range.start);
    let count = s.get(range).map_or(0, |s| s.chars().count());
    start..start + count
}

/// Reinterprets a negative 1-based index as counting from the end of a string
/// of `len` codepoints.
#[inline]
fn from_end(value: i64, len: i64) -> i64 {
    if value < 0 {
        value.saturating_add(len + 1)
    } else {
        value
    }
}

/// Converts a length to the Lua integer domain.
#[inline]
fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX - 1)
}

/// Converts an already clamped index back to an offset.
#[inline]
fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_defaults_to_whole_string() {
        assert_eq!(sub_range(5, None, None), 0..5);
        assert_eq!(sub_range(5, Some(1), Some(-1)), 0..5);
        assert_eq!(sub_range(0, None, None), 0..0);
    }

    #[test]
    fn sub_negative_bounds_count_from_end() {
        assert_eq!(sub_range(5, Some(-1), None), 4..5);
        assert_eq!(sub_range(5, Some(-3), Some(-2)), 2..4);
        assert_eq!(sub_range(5, Some(-5), Some(-5)), 0..1);
    }

    #[test]
    fn sub_clamps_out_of_range_bounds() {
        assert_eq!(sub_range(5, Some(-10), None), 0..5);
        assert_eq!(sub_range(5, Some(0), Some(2)), 0..2);
        assert_eq!(sub_range(5, Some(2), Some(100)), 1..5);
        assert_eq!(sub_range(5, Some(6), None), 5..5);
        assert_eq!(sub_range(5, Some(100), Some(200)), 5..5);
        assert_eq!(sub_range(5, Some(1), Some(-10)), 0..0);
        assert_eq!(sub_range(5, Some(i64::MIN), Some(i64::MAX)), 0..5);
    }

    #[test]
    fn sub_reversed_bounds_are_empty() {
        assert_eq!(sub_range(5, Some(3), Some(2)), 2..2);
        assert_eq!(sub_range(5, Some(-1), Some(-2)), 4..4);
        assert_eq!(sub_range(5, Some(3), Some(0)), 2..2);
    }

    #[test]
    fn sub_single_codepoint() {
        assert_eq!(sub_range(5, Some(3), Some(3)), 2..3);
        assert_eq!(sub_range(5, Some(5), Some(5)), 4..5);
        assert_eq!(sub_range(1, Some(1), Some(1)), 0..1);
    }

    #[test]
    fn init_defaults_to_start() {
        assert_eq!(init_index(5, None), Some(0));
        assert_eq!(init_index(5, Some(1)), Some(0));
        assert_eq!(init_index(5, Some(5)), Some(4));
    }

    #[test]
    fn init_past_end_fails() {
        assert_eq!(init_index(5, Some(6)), None);
        assert_eq!(init_index(0, Some(1)), None);
        assert_eq!(init_index(0, None), None);
        assert_eq!(init_index(5, Some(i64::MAX)), None);
    }

    #[test]
    fn init_negative_counts_from_end() {
        assert_eq!(init_index(5, Some(-1)), Some(4));
        assert_eq!(init_index(5, Some(-5)), Some(0));
        assert_eq!(init_index(5, Some(-6)), Some(0));
        assert_eq!(init_index(5, Some(i64::MIN)), Some(0));
    }

    #[test]
    fn init_zero_is_start() {
        assert_eq!(init_index(5, Some(0)), Some(0));
        assert_eq!(init_index(0, Some(0)), Some(0));
    }

    #[test]
    fn codepoint_defaults() {
        assert_eq!(codepoint_range(3, None, None), 0..1);
        assert_eq!(codepoint_range(3, Some(2), None), 1..2);
        assert_eq!(codepoint_range(0, None, None), 0..0);
    }

    #[test]
    fn codepoint_clamps() {
        assert_eq!(codepoint_range(3, Some(0), Some(2)), 0..2);
        assert_eq!(codepoint_range(3, Some(-4), None), 0..1);
        assert_eq!(codepoint_range(3, Some(2), Some(1)), 1..2);
        assert_eq!(codepoint_range(3, Some(1), Some(10)), 0..3);
        assert_eq!(codepoint_range(3, Some(5), None), 2..3);
    }

    #[test]
    fn offsets() {
        let s = "aé日b";
        assert_eq!(byte_offset(s, 0), 0);
        assert_eq!(byte_offset(s, 2), 3);
        assert_eq!(byte_offset(s, 3), 6);
        assert_eq!(byte_offset(s, 4), 7);
        assert_eq!(byte_offset(s, 10), 7);
        assert_eq!(char_index(s, 6), 3);
        assert_eq!(char_index(s, 7), 4);
        assert_eq!(char_range(s, 1..6), 1..3);
        assert_eq!(char_range(s, 7..7), 4..4);
    }
}
