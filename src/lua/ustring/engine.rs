//! A Lua-compliant pattern matching engine over Unicode codepoints.

// This code is adapted from PUC-Lua 5.4.8. The upstream copyright is:
//
// SPDX-License-Identifier: MIT
// SPDX-FileCopyright: 1994-2025 Lua.org, PUC-Rio

use std::ops::Range;
use unicode_general_category::{GeneralCategory, get_general_category};

/// A pattern string parsing or matching error.
// Clippy: The error fields are self-explanatory.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum Error {
    /// The pattern caused too much recursion.
    #[error("pattern too complex at {pos}")]
    TooComplex { pos: usize },
    /// The pattern contains more captures than can be stored.
    #[error("too many captures at {pos}")]
    TooManyCaptures { pos: usize },
    /// The pattern closes a capture group which was never opened.
    #[error("invalid pattern capture at {pos}")]
    InvalidPatternCapture { pos: usize },
    /// The pattern contains an incomplete frontier class.
    #[error("missing '[' after '%f' in pattern at {pos}")]
    IncompleteFrontier { pos: usize },
    /// The pattern contains a malformed balance class.
    #[error("malformed pattern (missing arguments to '%b') at {pos}")]
    MissingBalanceArgs { pos: usize },
    /// The pattern refers to a capture which does not exist or is unfinished.
    #[error("invalid capture index %{index} at {pos}")]
    InvalidCaptureIndex { pos: usize, index: usize },
    /// The pattern ends in the middle of a character class.
    #[error("malformed pattern (ends with '%') at {pos}")]
    EndsWithPercent { pos: usize },
    /// The pattern ends in the middle of a character set.
    #[error("malformed pattern (missing ']') at {pos}")]
    EndsWithoutBracket { pos: usize },
    /// The pattern ends in the middle of a capture group.
    #[error("unfinished capture at {pos}")]
    UnfinishedCapture { pos: usize },
    /// A substitution replacement string contains an invalid '%' symbol.
    #[error("invalid use of '%' in replacement string")]
    InvalidReplacement,
}

/// The standard [`Result`](core::result::Result) type used by the pattern
/// matching engine.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The maximum number of allowed capture groups in a pattern.
const LUA_MAXCAPTURES: usize = 32;

/// The maximum amount of recursion allowed through [`next_match`] during
/// pattern matching.
const MAX_RECURSION_DEPTH: usize = 500;

/// A captured group. Ranges are byte offsets into the subject.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Capture {
    /// A substring capture group.
    Range(Range<usize>),
    /// A current string position capture group, `()`.
    Position(usize),
}

impl Default for Capture {
    fn default() -> Self {
        Self::Range(<_>::default())
    }
}

/// The ranged indexes of a matched pattern. These are always 0-indexed byte
/// offsets.
#[derive(Debug, Eq, PartialEq)]
pub struct MatchRanges {
    /// The full range of the matched pattern.
    pub full_match: Range<usize>,
    /// The ranges of each captured group.
    pub captures: Vec<Capture>,
}

impl MatchRanges {
    /// Returns the captures, or the whole match as the only capture when the
    /// pattern has no capture groups.
    #[must_use]
    pub fn into_captures_or_match(self) -> Vec<Capture> {
        if self.captures.is_empty() {
            vec![Capture::Range(self.full_match)]
        } else {
            self.captures
        }
    }
}

/// A syntax-checked pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    /// The pattern text as given by the caller.
    source: String,
    /// Whether the pattern starts with a `^` anchor.
    anchored: bool,
    /// The number of capture groups in the pattern.
    captures: usize,
}

impl Pattern {
    /// Checks the syntax of `source` and creates a new pattern from it.
    ///
    /// # Errors
    ///
    /// If the pattern is malformed, the diagnostic for the first error is
    /// returned.
    pub fn compile(source: &str) -> Result<Self> {
        let anchored = source.starts_with('^');
        let captures = check_syntax(source, usize::from(anchored))?;
        Ok(Self {
            source: source.to_owned(),
            anchored,
            captures,
        })
    }

    /// The original pattern text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The number of capture groups in the pattern.
    #[inline]
    pub fn capture_count(&self) -> usize {
        self.captures
    }

    /// Whether matches must start exactly at the search position.
    #[inline]
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// The pattern without its leading anchor.
    #[inline]
    fn body(&self) -> &str {
        &self.source[usize::from(self.anchored)..]
    }

    /// Finds the first match of the pattern in `input` which starts at or
    /// after the byte offset `start`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooComplex`] if matching recurses too deeply.
    pub fn find(&self, input: &str, start: usize) -> Result<Option<MatchRanges>> {
        for (at, _) in start_scan(input, start) {
            if let found @ Some(_) = self.match_at(input, at)? {
                return Ok(found);
            }

            if self.anchored {
                break;
            }
        }

        Ok(None)
    }

    /// Tries to match the pattern at exactly the byte offset `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooComplex`] if matching recurses too deeply.
    pub fn match_at(&self, input: &str, at: usize) -> Result<Option<MatchRanges>> {
        let pattern = self.body();
        let mut state = State {
            input,
            pattern,
            level: 0,
            depth: MAX_RECURSION_DEPTH,
            captures: <_>::default(),
        };

        let Some(end) = next_match(&mut state, at, 0)? else {
            return Ok(None);
        };

        Ok(Some(MatchRanges {
            full_match: at..end,
            captures: state
                .captures
                .into_iter()
                .take(state.level)
                .map(|capture| Capture::try_from((pattern, capture)))
                .collect::<Result<_, _>>()?,
        }))
    }
}

/// Returns the byte offsets of every character in `input` at or after the byte
/// offset `index`, followed by the end of the input.
fn start_scan(input: &str, index: usize) -> impl Iterator<Item = (usize, char)> {
    input
        .char_indices()
        .skip_while(move |(pos, _)| *pos < index)
        .chain(core::iter::once((input.len(), '\0')))
}

/// The state of a capture slot while checking pattern syntax.
#[derive(Clone, Copy, Eq, PartialEq)]
enum Slot {
    /// The group is still open.
    Open,
    /// The group captures text.
    Text,
    /// The group captures a position.
    Position,
}

/// Walks the whole pattern the same way [`next_match`] would and reports any
/// syntax error. Returns the number of capture groups.
fn check_syntax(pattern: &str, mut p: usize) -> Result<usize> {
    let mut slots = Vec::<Slot>::new();
    let mut open = Vec::<(usize, usize)>::new();

    while let Some(c) = pattern[p..].chars().next() {
        match c {
            '(' => {
                if slots.len() >= LUA_MAXCAPTURES {
                    return Err(Error::TooManyCaptures {
                        pos: char_pos(pattern, p),
                    });
                }
                if pattern[p + 1..].starts_with(')') {
                    slots.push(Slot::Position);
                    p += 2;
                } else {
                    open.push((slots.len(), p));
                    slots.push(Slot::Open);
                    p += 1;
                }
                continue;
            }
            ')' => {
                let Some((level, _)) = open.pop() else {
                    return Err(Error::InvalidPatternCapture {
                        pos: char_pos(pattern, p),
                    });
                };
                slots[level] = Slot::Text;
                p += 1;
                continue;
            }
            '$' if p + 1 == pattern.len() => {
                p += 1;
                continue;
            }
            '%' => match pattern[p + 1..].chars().next() {
                Some('b') => {
                    let mut args = pattern[p + 2..].chars();
                    let (Some(open), Some(close)) = (args.next(), args.next()) else {
                        return Err(Error::MissingBalanceArgs {
                            pos: char_pos(pattern, p + 2),
                        });
                    };
                    p += 2 + open.len_utf8() + close.len_utf8();
                    continue;
                }
                Some('f') => {
                    p += 2;
                    if !pattern[p..].starts_with('[') {
                        return Err(Error::IncompleteFrontier {
                            pos: char_pos(pattern, p),
                        });
                    }
                    p = class_end(pattern, p)?;
                    continue;
                }
                Some(level @ '0'..='9') => {
                    let index = level.to_digit(10).map_or(0, |d| d as usize);
                    if index == 0 || slots.get(index - 1) != Some(&Slot::Text) {
                        return Err(Error::InvalidCaptureIndex {
                            pos: char_pos(pattern, p),
                            index,
                        });
                    }
                    p += 2;
                    continue;
                }
                // A single character class, or a trailing '%' which
                // `class_end` reports.
                _ => {}
            },
            _ => {}
        }

        p = class_end(pattern, p)?;
        if matches!(pattern[p..].chars().next(), Some('?' | '*' | '+' | '-')) {
            p += 1;
        }
    }

    if let Some(&(_, start)) = open.last() {
        return Err(Error::UnfinishedCapture {
            pos: char_pos(pattern, start),
        });
    }

    Ok(slots.len())
}

/// The main pattern matching function.
#[allow(clippy::too_many_lines)]
fn next_match(state: &mut State<'_>, mut s: usize, mut p: usize) -> Result<Option<usize>> {
    if state.depth == 0 {
        return Err(Error::TooComplex {
            pos: state.char_pos(p),
        });
    }

    state.depth -= 1;

    // A loop is used to avoid unnecessary recursion. Because the matching
    // engine tracks recursion explicitly in order to abort pathological cases,
    // it is not enough to rely on the compiler to set up tail calls anyway.
    let s = loop {
        let mut i = state.pattern[p..].chars();
        let Some(c) = i.next() else {
            break Some(s);
        };

        // Special items: captures, anchors, balances, and frontiers
        match c {
            '(' => {
                let (p, is_position) = if i.next() == Some(')') {
                    (p + 2, true)
                } else {
                    (p + 1, false)
                };
                break state.start_capture(s, p, is_position)?;
            }
            ')' => break state.end_capture(s, p + 1)?,
            '$' if p + 1 == state.pattern.len() => {
                break (s == state.input.len()).then_some(s);
            }
            '%' => match i.next() {
                Some('b') => {
                    if let Some((next, len)) = state.match_balance(s, p + 2)? {
                        s = next;
                        p += 2 + len;
                        continue;
                    }
                    break None;
                }
                Some('f') => {
                    p += 2;
                    if i.next() != Some('[') {
                        return Err(Error::IncompleteFrontier {
                            pos: state.char_pos(p),
                        });
                    }
                    let p_after = class_end(state.pattern, p)?;

                    // Lua manual: “The beginning and end of the subject are
                    // handled as if they were the character '\0'.”
                    let prev = state.input[..s].chars().next_back().unwrap_or('\0');
                    let next = state.input[s..].chars().next().unwrap_or('\0');

                    if !state.is_in_set(prev, p, p_after - 1) && state.is_in_set(next, p, p_after - 1)
                    {
                        p = p_after;
                        continue;
                    }

                    break None;
                }
                Some(level @ '0'..='9') => {
                    if let Some(next) = state.match_capture(s, p, level)? {
                        s = next;
                        p += 2;
                        continue;
                    }
                    break None;
                }
                _ => {}
            },
            _ => {}
        }

        // Normal characters and character classes
        let p_after = class_end(state.pattern, p)?;
        let quantifier = state.pattern[p_after..].chars().next();
        if let Some(c_len) = state.is_single_match(s, p, p_after) {
            match quantifier {
                Some('?') => {
                    if let item @ Some(_) = next_match(state, s + c_len, p_after + 1)? {
                        break item;
                    }
                    p = p_after + 1;
                }
                Some('+') => break state.max_expand(s + c_len, p, p_after)?,
                Some('*') => break state.max_expand(s, p, p_after)?,
                Some('-') => break state.min_expand(s, p, p_after)?,
                _ => {
                    s += c_len;
                    p = p_after;
                }
            }
        } else if matches!(quantifier, Some('*' | '?' | '-')) {
            // Zero items is acceptable
            p = p_after + 1;
        } else {
            break None;
        }
    };

    state.depth += 1;
    Ok(s)
}

/// Pattern matching engine state.
///
/// The pattern and input cursors are maintained on the stack in the `p` and
/// `s` variables, respectively.
struct State<'a> {
    /// The input string to match.
    input: &'a str,
    /// The pattern to match, without any leading anchor.
    pattern: &'a str,
    /// Remaining recursion budget of `next_match`.
    depth: usize,
    /// Number of capture groups.
    level: usize,
    /// Intermediate capture group states.
    captures: [CaptureState; LUA_MAXCAPTURES],
}

impl State<'_> {
    /// Returns the 1-indexed character count at the given byte position of
    /// the pattern.
    #[inline]
    fn char_pos(&self, offset: usize) -> usize {
        char_pos(self.pattern, offset)
    }

    /// Matches a pattern balance item. If successful, returns the next position
    /// of the input and the size of the balance characters.
    fn match_balance(&self, s: usize, p: usize) -> Result<Option<(usize, usize)>> {
        let mut i = self.pattern[p..].chars();
        let (Some(open), Some(close)) = (i.next(), i.next()) else {
            return Err(Error::MissingBalanceArgs {
                pos: self.char_pos(p),
            });
        };

        if !self.input[s..].starts_with(open) {
            return Ok(None);
        }

        let mut count = 1;
        let start = s + open.len_utf8();
        for (len, c) in self.input[start..].char_indices() {
            if c == close {
                count -= 1;
                if count == 0 {
                    return Ok(Some((
                        start + len + c.len_utf8(),
                        open.len_utf8() + close.len_utf8(),
                    )));
                }
            } else if c == open {
                count += 1;
            }
        }

        Ok(None)
    }

    /// Matches the capture group at the given level to the input string.
    /// Returns the next position of the input string if successful.
    fn match_capture(&self, s: usize, p: usize, level: char) -> Result<Option<usize>> {
        let range = self.check_capture(p, level)?;
        let end = s + range.len();
        Ok((self.input.as_bytes().get(range.clone()) == self.input.as_bytes().get(s..end))
            .then_some(end))
    }

    /// Takes as many pattern items as possible and then backs off until either
    /// the rest of the pattern matches or there are no more items to give back.
    /// If successful, returns the next position of the input.
    fn max_expand(&mut self, s: usize, p: usize, p_end: usize) -> Result<Option<usize>> {
        let mut i = 0;
        while let Some(c_len) = self.is_single_match(s + i, p, p_end) {
            i += c_len;
        }
        let p_after = p_end + 1;
        loop {
            if let result @ Some(_) = next_match(self, s + i, p_after)? {
                return Ok(result);
            }
            let Some(prev) = self.input[s..s + i].chars().next_back() else {
                return Ok(None);
            };
            i -= prev.len_utf8();
        }
    }

    /// Takes the fewest number of items possible until the rest of the pattern
    /// starts to fail to match. If successful, returns the next position of the
    /// input.
    fn min_expand(&mut self, mut s: usize, p: usize, p_end: usize) -> Result<Option<usize>> {
        let p_after = p_end + 1;
        loop {
            if let result @ Some(_) = next_match(self, s, p_after)? {
                break Ok(result);
            } else if let Some(c_len) = self.is_single_match(s, p, p_end) {
                s += c_len;
            } else {
                break Ok(None);
            }
        }
    }

    /// Starts a new capture group. Completes matching the input and returns its
    /// final position if successful.
    fn start_capture(&mut self, s: usize, p: usize, is_position: bool) -> Result<Option<usize>> {
        if self.level >= LUA_MAXCAPTURES {
            return Err(Error::TooManyCaptures {
                pos: self.char_pos(p),
            });
        }

        self.captures[self.level] = if is_position {
            CaptureState::Finished(Capture::Position(s))
        } else {
            CaptureState::Pending { start: s }
        };

        self.level += 1;

        Ok(next_match(self, s, p)?.or_else(|| {
            self.level -= 1;
            None
        }))
    }

    /// Finalises a new capture group. Completes matching the input and returns
    /// its final position if successful.
    fn end_capture(&mut self, s: usize, p: usize) -> Result<Option<usize>> {
        let level = self.capture_to_close(p)?;
        self.captures[level].finish(self.pattern, s, p)?;

        Ok(next_match(self, s, p)?.or_else(|| {
            self.captures[level].revert();
            None
        }))
    }

    /// Returns the index of the highest pending capture group still needing
    /// finalising.
    fn capture_to_close(&self, p: usize) -> Result<usize> {
        (0..self.level)
            .rev()
            .find(|&level| matches!(self.captures[level], CaptureState::Pending { .. }))
            .ok_or_else(|| Error::InvalidPatternCapture {
                pos: self.char_pos(p),
            })
    }

    /// Ensures the given capture index belongs to a finished capture group and
    /// returns its range if so.
    fn check_capture(&self, p: usize, level: char) -> Result<&Range<usize>> {
        let index = level.to_digit(10).map_or(0, |d| d as usize);
        if let Some(slot) = index.checked_sub(1)
            && slot < self.level
            && let CaptureState::Finished(Capture::Range(range)) = &self.captures[slot]
        {
            Ok(range)
        } else {
            Err(Error::InvalidCaptureIndex {
                index,
                pos: self.char_pos(p),
            })
        }
    }

    /// Checks whether the next input character matches the pattern item at the
    /// given range. Returns the length of the matched character.
    fn is_single_match(&self, s: usize, p_start: usize, p_end: usize) -> Option<usize> {
        let c = self.input[s..].chars().next()?;
        let mut i = self.pattern[p_start..].chars();
        let is_match = match i.next()? {
            '.' => true,
            '%' => i.next().is_some_and(|class| match_class(c, class)),
            '[' => self.is_in_set(c, p_start, p_end - 1),
            lit => lit == c,
        };
        is_match.then_some(c.len_utf8())
    }

    /// Checks whether the given input character matches the character set
    /// at the given range. `p` points to `[` and `p_end` points to `]`.
    fn is_in_set(&self, c: char, p: usize, p_end: usize) -> bool {
        let mut matched = true;
        let mut i = self.pattern[p + 1..p_end].chars().peekable();

        if i.next_if_eq(&'^').is_some() {
            matched = false;
        }

        while let Some(s) = i.next() {
            if s == '%' {
                // %w
                if let Some(class) = i.next()
                    && match_class(c, class)
                {
                    return matched;
                }
            } else if let Some(r) = i.next_if_eq(&'-') {
                if let Some(e) = i.next() {
                    // [a-z]
                    if s <= c && c <= e {
                        return matched;
                    }
                } else if s == c || r == c {
                    // Literal character with terminating -
                    return matched;
                }
            } else if s == c {
                return matched;
            }
        }

        !matched
    }
}

/// Finds the end of a single pattern item. Returns the next position of the
/// pattern, or an error if the pattern ends before the item is complete.
/// `p` points to `[` for a set, `%` for a class, or a plain character.
fn class_end(pattern: &str, mut p: usize) -> Result<usize> {
    let mut i = pattern[p..].chars().peekable();
    let Some(c) = i.next() else {
        return Ok(p);
    };
    p += c.len_utf8();
    Ok(match c {
        '%' => {
            let Some(class) = i.next() else {
                return Err(Error::EndsWithPercent {
                    pos: char_pos(pattern, p),
                });
            };
            p + class.len_utf8()
        }
        '[' => {
            if i.next_if_eq(&'^').is_some() {
                p += 1;
            }

            // The first character of a set is always part of the set, even
            // when it is ']'
            loop {
                let Some(c) = i.next() else {
                    return Err(Error::EndsWithoutBracket {
                        pos: char_pos(pattern, p),
                    });
                };

                p += c.len_utf8();

                if c == '%'
                    && let Some(c) = i.next()
                {
                    p += c.len_utf8();
                }

                if i.peek() == Some(&']') {
                    break;
                }
            }

            p + 1
        }
        _ => p,
    })
}

/// Intermediate state representation of a capture group.
// Clippy: Internal fields are self-documenting.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Clone)]
enum CaptureState {
    /// The capture group is waiting to be closed.
    Pending { start: usize },
    /// The capture group is fully created.
    Finished(Capture),
}

impl CaptureState {
    /// Finalise a ranged capture group.
    fn finish(&mut self, pattern: &str, end: usize, p: usize) -> Result<()> {
        match self {
            CaptureState::Pending { start } => {
                *self = CaptureState::Finished(Capture::Range(*start..end));
                Ok(())
            }
            CaptureState::Finished(..) => Err(Error::InvalidPatternCapture {
                pos: char_pos(pattern, p),
            }),
        }
    }

    /// Roll back a ranged capture group to a pending state.
    fn revert(&mut self) {
        if let CaptureState::Finished(Capture::Range(range)) = self {
            *self = CaptureState::Pending { start: range.start }
        }
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::Finished(<_>::default())
    }
}

impl TryFrom<(&str, CaptureState)> for Capture {
    type Error = Error;

    fn try_from((pattern, value): (&str, CaptureState)) -> Result<Self, Self::Error> {
        match value {
            CaptureState::Pending { start } => Err(Error::UnfinishedCapture {
                pos: char_pos(pattern, start),
            }),
            CaptureState::Finished(capture) => Ok(capture),
        }
    }
}

/// Returns true if the character `c` is in the class named by `class`.
/// Uppercase class letters negate the class.
///
/// The classes are resolved through Unicode general categories, so `%a`
/// matches any letter and `%d` any decimal digit, not only ASCII ones.
fn match_class(c: char, class: char) -> bool {
    let matches = match class.to_ascii_lowercase() {
        'a' => is_alphabetic(c),
        'c' => get_general_category(c) == GeneralCategory::Control,
        'd' => is_decimal(c),
        'g' => is_graphic(c),
        'l' => get_general_category(c) == GeneralCategory::LowercaseLetter,
        'p' => is_punctuation(c),
        's' => c.is_whitespace(),
        'u' => get_general_category(c) == GeneralCategory::UppercaseLetter,
        'w' => is_alphabetic(c) || is_decimal(c),
        'x' => is_hex_digit(c),
        'z' => c == '\0',
        _ => return c == class,
    };
    if class.is_ascii_lowercase() {
        matches
    } else {
        !matches
    }
}

/// Whether `c` is a letter of any kind.
#[inline]
fn is_alphabetic(c: char) -> bool {
    // Clippy: Verbosity is not a useful thing here.
    #[allow(clippy::enum_glob_use)]
    use GeneralCategory::*;
    matches!(
        get_general_category(c),
        LowercaseLetter | ModifierLetter | OtherLetter | TitlecaseLetter | UppercaseLetter
    )
}

/// Whether `c` is a decimal digit in any script.
#[inline]
fn is_decimal(c: char) -> bool {
    get_general_category(c) == GeneralCategory::DecimalNumber
}

/// Whether `c` is a visible character.
#[inline]
fn is_graphic(c: char) -> bool {
    #[allow(clippy::enum_glob_use)]
    use GeneralCategory::*;
    !matches!(
        get_general_category(c),
        Control
            | Format
            | Surrogate
            | Unassigned
            | LineSeparator
            | ParagraphSeparator
            | SpaceSeparator
    )
}

/// Whether `c` is a hexadecimal digit, including the fullwidth forms.
#[inline]
pub(super) fn is_hex_digit(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='F' | 'a'..='f' | '０'..='９' | 'Ａ'..='Ｆ' | 'ａ'..='ｆ')
}

/// Whether `c` is punctuation of any kind.
#[inline]
fn is_punctuation(c: char) -> bool {
    #[allow(clippy::enum_glob_use)]
    use GeneralCategory::*;
    matches!(
        get_general_category(c),
        ClosePunctuation
            | ConnectorPunctuation
            | DashPunctuation
            | FinalPunctuation
            | InitialPunctuation
            | OpenPunctuation
            | OtherPunctuation
    )
}

/// Returns the 1-indexed character count at the given byte position.
#[inline]
fn char_pos(pattern: &str, offset: usize) -> usize {
    pattern[..offset.min(pattern.len())].chars().count() + 1
}
