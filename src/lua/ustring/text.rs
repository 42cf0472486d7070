//! Codepoint-based string algorithms.

use super::index;
use unicode_normalization::UnicodeNormalization as _;

/// Returns the number of codepoints in `s`.
#[inline]
pub fn len(s: &str) -> usize {
    s.chars().count()
}

/// Returns `s` with its codepoints in reverse order.
#[inline]
pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

/// Converts `s` to uppercase using the default Unicode case mapping.
#[inline]
pub fn upper(s: &str) -> String {
    s.to_uppercase()
}

/// Converts `s` to lowercase using the default Unicode case mapping.
#[inline]
pub fn lower(s: &str) -> String {
    s.to_lowercase()
}

/// Returns the substring of `s` between the `sub`-style 1-indexed inclusive
/// bounds `start` and `end`.
pub fn sub(s: &str, start: Option<i64>, end: Option<i64>) -> &str {
    let range = index::sub_range(len(s), start, end);
    let start = index::byte_offset(s, range.start);
    let end = start + index::byte_offset(&s[start..], range.len());
    &s[start..end]
}

/// Returns the scalar values of the codepoints of `s` between the 1-indexed
/// inclusive positions `i` and `j`.
pub fn codepoints(s: &str, i: Option<i64>, j: Option<i64>) -> impl Iterator<Item = u32> + '_ {
    let range = index::codepoint_range(len(s), i, j);
    s.chars()
        .skip(range.start)
        .take(range.len())
        .map(u32::from)
}

/// Converts an integer into a codepoint, if it is a Unicode scalar value.
#[inline]
pub fn to_char(value: i64) -> Option<char> {
    u32::try_from(value).ok().and_then(char::from_u32)
}

/// A Unicode normalisation form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Form {
    /// Canonical composition.
    Nfc,
    /// Canonical decomposition.
    Nfd,
    /// Compatibility composition.
    Nfkc,
    /// Compatibility decomposition.
    Nfkd,
}

/// Converts `s` to the normalisation form `form`.
pub fn normalize(s: &str, form: Form) -> String {
    match form {
        Form::Nfc => s.nfc().collect(),
        Form::Nfd => s.nfd().collect(),
        Form::Nfkc => s.nfkc().collect(),
        Form::Nfkd => s.nfkd().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &["", "a", "hello", "ʻOkina", "日本語テキスト", "e\u{301}x", "🙂🙃"];

    #[test]
    fn reverse_keeps_codepoints() {
        assert_eq!(reverse("aé日"), "日éa");
        assert_eq!(reverse("🙂x"), "x🙂");
        for s in SAMPLES {
            assert_eq!(len(&reverse(s)), len(s));
            assert_eq!(reverse(&reverse(s)), *s);
        }
    }

    #[test]
    fn upper_is_idempotent() {
        for s in SAMPLES.iter().copied().chain(["straße", "ǆ"]) {
            let once = upper(s);
            assert_eq!(upper(&once), once);
        }
        assert_eq!(upper("straße"), "STRASSE");
        assert_eq!(lower("ÀÉÎ"), "àéî");
    }

    #[test]
    fn sub_by_codepoint() {
        let s = "aé日b";
        assert_eq!(sub(s, Some(2), Some(3)), "é日");
        assert_eq!(sub(s, Some(-1), None), "b");
        assert_eq!(sub(s, Some(3), Some(2)), "");
        assert_eq!(sub(s, Some(5), None), "");
        for s in SAMPLES {
            assert_eq!(sub(s, Some(1), Some(-1)), *s);
        }
    }

    #[test]
    fn codepoint_positions() {
        assert_eq!(codepoints("A中", Some(1), Some(-1)).count(), 1);
        assert_eq!(codepoints("A中", Some(1), Some(2)).collect::<Vec<_>>(), [65, 0x4E2D]);
        assert_eq!(codepoints("A中", None, None).collect::<Vec<_>>(), [65]);
        assert_eq!(codepoints("", None, None).count(), 0);
    }

    #[test]
    fn chars() {
        assert_eq!(to_char(65), Some('A'));
        assert_eq!(to_char(0x10FFFF), Some('\u{10FFFF}'));
        assert_eq!(to_char(0xD800), None);
        assert_eq!(to_char(0x110000), None);
        assert_eq!(to_char(-1), None);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("e\u{301}", Form::Nfc), "é");
        assert_eq!(normalize("é", Form::Nfd), "e\u{301}");
        assert_eq!(normalize("ﬁ", Form::Nfkc), "fi");
        assert_eq!(normalize("ﬁ", Form::Nfc), "ﬁ");
        assert_eq!(normalize("Å", Form::Nfkd), "A\u{30A}");
    }
}
