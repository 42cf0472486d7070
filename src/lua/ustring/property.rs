//! Unicode character property lookup.

use super::engine::is_hex_digit;
use std::borrow::Cow;
use unicode_bidi::{BidiClass, bidi_class};
use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_normalization::{
    IsNormalized, char::canonical_combining_class, is_nfc_quick, is_nfd_quick, is_nfkc_quick,
    is_nfkd_quick,
};
use unicode_script::UnicodeScript as _;

/// A Unicode character property which can be queried by name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Property {
    /// `General_Category` (`gc`).
    GeneralCategory,
    /// `Canonical_Combining_Class` (`ccc`).
    CanonicalCombiningClass,
    /// `Alphabetic` (`Alpha`).
    Alphabetic,
    /// `Lowercase` (`Lower`).
    Lowercase,
    /// `Uppercase` (`Upper`).
    Uppercase,
    /// `White_Space` (`WSpace`, `space`).
    WhiteSpace,
    /// `Hex_Digit` (`Hex`).
    HexDigit,
    /// `ASCII_Hex_Digit` (`AHex`).
    AsciiHexDigit,
    /// `Script` (`sc`).
    Script,
    /// `Bidi_Class` (`bc`).
    BidiClass,
    /// `NFC_Quick_Check` (`NFC_QC`).
    NfcQuickCheck,
    /// `NFD_Quick_Check` (`NFD_QC`).
    NfdQuickCheck,
    /// `NFKC_Quick_Check` (`NFKC_QC`).
    NfkcQuickCheck,
    /// `NFKD_Quick_Check` (`NFKD_QC`).
    NfkdQuickCheck,
}

impl Property {
    /// Finds a property by its long or short name.
    ///
    /// Names are matched loosely: case, `_`, `-`, and spaces are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect::<String>();

        Some(match name.as_str() {
            "generalcategory" | "gc" => Self::GeneralCategory,
            "canonicalcombiningclass" | "ccc" => Self::CanonicalCombiningClass,
            "alphabetic" | "alpha" => Self::Alphabetic,
            "lowercase" | "lower" => Self::Lowercase,
            "uppercase" | "upper" => Self::Uppercase,
            "whitespace" | "wspace" | "space" => Self::WhiteSpace,
            "hexdigit" | "hex" => Self::HexDigit,
            "asciihexdigit" | "ahex" => Self::AsciiHexDigit,
            "script" | "sc" => Self::Script,
            "bidiclass" | "bc" => Self::BidiClass,
            "nfcquickcheck" | "nfcqc" => Self::NfcQuickCheck,
            "nfdquickcheck" | "nfdqc" => Self::NfdQuickCheck,
            "nfkcquickcheck" | "nfkcqc" => Self::NfkcQuickCheck,
            "nfkdquickcheck" | "nfkdqc" => Self::NfkdQuickCheck,
            _ => return None,
        })
    }

    /// Returns the name of the value of this property for the character `c`.
    /// The short value name is used where one exists.
    pub fn value_name(self, c: char) -> Option<Cow<'static, str>> {
        match self {
            Self::GeneralCategory => general_category_name(c).map(Cow::Borrowed),
            Self::CanonicalCombiningClass => combining_class_name(canonical_combining_class(c)),
            Self::Alphabetic => Some(yes_no(c.is_alphabetic())),
            Self::Lowercase => Some(yes_no(c.is_lowercase())),
            Self::Uppercase => Some(yes_no(c.is_uppercase())),
            Self::WhiteSpace => Some(yes_no(c.is_whitespace())),
            Self::HexDigit => Some(yes_no(is_hex_digit(c))),
            Self::AsciiHexDigit => Some(yes_no(c.is_ascii_hexdigit())),
            Self::Script => Some(Cow::Borrowed(c.script().short_name())),
            Self::BidiClass => bidi_class_name(c).map(Cow::Borrowed),
            Self::NfcQuickCheck => Some(quick_check(is_nfc_quick(core::iter::once(c)))),
            Self::NfdQuickCheck => Some(quick_check(is_nfd_quick(core::iter::once(c)))),
            Self::NfkcQuickCheck => Some(quick_check(is_nfkc_quick(core::iter::once(c)))),
            Self::NfkdQuickCheck => Some(quick_check(is_nfkd_quick(core::iter::once(c)))),
        }
    }
}

/// Returns the value name of a normalisation quick check property.
#[inline]
fn quick_check(value: IsNormalized) -> Cow<'static, str> {
    Cow::Borrowed(match value {
        IsNormalized::Yes => "Y",
        IsNormalized::No => "N",
        IsNormalized::Maybe => "M",
    })
}

/// Returns the short name of the bidirectional class of `c`.
fn bidi_class_name(c: char) -> Option<&'static str> {
    // Clippy: Verbosity is not a useful thing here.
    #[allow(clippy::enum_glob_use)]
    use BidiClass::*;
    #[allow(unreachable_patterns)]
    let name = match bidi_class(c) {
        AL => "AL",
        AN => "AN",
        B => "B",
        BN => "BN",
        CS => "CS",
        EN => "EN",
        ES => "ES",
        ET => "ET",
        FSI => "FSI",
        L => "L",
        LRE => "LRE",
        LRI => "LRI",
        LRO => "LRO",
        NSM => "NSM",
        ON => "ON",
        PDF => "PDF",
        PDI => "PDI",
        R => "R",
        RLE => "RLE",
        RLI => "RLI",
        RLO => "RLO",
        S => "S",
        WS => "WS",
        _ => return None,
    };
    Some(name)
}

/// Returns the value name of a binary property.
#[inline]
fn yes_no(value: bool) -> Cow<'static, str> {
    Cow::Borrowed(if value { "Y" } else { "N" })
}

/// Returns the short name of the general category of `c`.
fn general_category_name(c: char) -> Option<&'static str> {
    // Clippy: Verbosity is not a useful thing here.
    #[allow(clippy::enum_glob_use)]
    use GeneralCategory::*;
    // The category enum may grow with new Unicode versions.
    #[allow(unreachable_patterns)]
    let name = match get_general_category(c) {
        UppercaseLetter => "Lu",
        LowercaseLetter => "Ll",
        TitlecaseLetter => "Lt",
        ModifierLetter => "Lm",
        OtherLetter => "Lo",
        NonspacingMark => "Mn",
        SpacingMark => "Mc",
        EnclosingMark => "Me",
        DecimalNumber => "Nd",
        LetterNumber => "Nl",
        OtherNumber => "No",
        ConnectorPunctuation => "Pc",
        DashPunctuation => "Pd",
        OpenPunctuation => "Ps",
        ClosePunctuation => "Pe",
        InitialPunctuation => "Pi",
        FinalPunctuation => "Pf",
        OtherPunctuation => "Po",
        MathSymbol => "Sm",
        CurrencySymbol => "Sc",
        ModifierSymbol => "Sk",
        OtherSymbol => "So",
        SpaceSeparator => "Zs",
        LineSeparator => "Zl",
        ParagraphSeparator => "Zp",
        Control => "Cc",
        Format => "Cf",
        Surrogate => "Cs",
        PrivateUse => "Co",
        Unassigned => "Cn",
        _ => return None,
    };
    Some(name)
}

/// Returns the short name of the canonical combining class `class`. Classes
/// which are only known by number have no name.
fn combining_class_name(class: u8) -> Option<Cow<'static, str>> {
    Some(Cow::Borrowed(match class {
        0 => "NR",
        1 => "OV",
        6 => "HANR",
        7 => "NK",
        8 => "KV",
        9 => "VR",
        10..=36 | 84 | 91 | 103 | 107 | 118 | 122 | 129 | 130 | 132 | 133 => {
            return Some(Cow::Owned(format!("CCC{class}")));
        }
        200 => "ATBL",
        202 => "ATB",
        214 => "ATA",
        216 => "ATAR",
        218 => "BL",
        220 => "B",
        222 => "BR",
        224 => "L",
        226 => "R",
        228 => "AL",
        230 => "A",
        232 => "AR",
        233 => "DB",
        234 => "DA",
        240 => "IS",
        _ => return None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn lookup(name: &str, c: char) -> Option<String> {
        Property::from_name(name)
            .and_then(|property| property.value_name(c))
            .map(Cow::into_owned)
    }

    #[test]
    fn loose_names() {
        assert_eq!(
            Property::from_name("General_Category"),
            Some(Property::GeneralCategory)
        );
        assert_eq!(
            Property::from_name("general-category"),
            Some(Property::GeneralCategory)
        );
        assert_eq!(Property::from_name("GC"), Some(Property::GeneralCategory));
        assert_eq!(Property::from_name("White Space"), Some(Property::WhiteSpace));
        assert_eq!(Property::from_name("AHex"), Some(Property::AsciiHexDigit));
        assert_eq!(Property::from_name("Script"), Some(Property::Script));
        assert_eq!(Property::from_name("NFC_QC"), Some(Property::NfcQuickCheck));
        assert_eq!(Property::from_name("Line_Break"), None);
        assert_eq!(Property::from_name(""), None);
    }

    #[test]
    fn general_category() {
        assert_eq!(lookup("gc", 'A').as_deref(), Some("Lu"));
        assert_eq!(lookup("gc", 'ж').as_deref(), Some("Ll"));
        assert_eq!(lookup("gc", '5').as_deref(), Some("Nd"));
        assert_eq!(lookup("gc", ' ').as_deref(), Some("Zs"));
        assert_eq!(lookup("gc", '\u{301}').as_deref(), Some("Mn"));
        assert_eq!(lookup("gc", '\u{E000}').as_deref(), Some("Co"));
    }

    #[test]
    fn combining_class() {
        assert_eq!(lookup("ccc", 'a').as_deref(), Some("NR"));
        assert_eq!(lookup("ccc", '\u{301}').as_deref(), Some("A"));
        assert_eq!(lookup("ccc", '\u{316}').as_deref(), Some("B"));
        assert_eq!(lookup("ccc", '\u{5B0}').as_deref(), Some("CCC10"));
        assert_eq!(lookup("ccc", '\u{94D}').as_deref(), Some("VR"));
    }

    #[test]
    fn binary_properties() {
        assert_eq!(lookup("Alpha", 'é').as_deref(), Some("Y"));
        assert_eq!(lookup("Alpha", '1').as_deref(), Some("N"));
        assert_eq!(lookup("Lower", 'a').as_deref(), Some("Y"));
        assert_eq!(lookup("Upper", 'a').as_deref(), Some("N"));
        assert_eq!(lookup("space", '\u{3000}').as_deref(), Some("Y"));
        assert_eq!(lookup("Hex", 'Ｆ').as_deref(), Some("Y"));
        assert_eq!(lookup("AHex", 'Ｆ').as_deref(), Some("N"));
        assert_eq!(lookup("AHex", 'f').as_deref(), Some("Y"));
    }

    #[test]
    fn scripts() {
        assert_eq!(lookup("sc", 'a').as_deref(), Some("Latn"));
        assert_eq!(lookup("Script", 'Ж').as_deref(), Some("Cyrl"));
        assert_eq!(lookup("Script", '日').as_deref(), Some("Hani"));
        assert_eq!(lookup("Script", '1').as_deref(), Some("Zyyy"));
        assert_eq!(lookup("Script", '\u{301}').as_deref(), Some("Zinh"));
    }

    #[test]
    fn bidi_classes() {
        assert_eq!(lookup("bc", 'a').as_deref(), Some("L"));
        assert_eq!(lookup("Bidi_Class", 'א').as_deref(), Some("R"));
        assert_eq!(lookup("Bidi_Class", 'ا').as_deref(), Some("AL"));
        assert_eq!(lookup("Bidi_Class", '1').as_deref(), Some("EN"));
        assert_eq!(lookup("Bidi_Class", ' ').as_deref(), Some("WS"));
        assert_eq!(lookup("Bidi_Class", '\u{301}').as_deref(), Some("NSM"));
    }

    #[test]
    fn quick_checks() {
        assert_eq!(lookup("NFC_QC", 'a').as_deref(), Some("Y"));
        assert_eq!(lookup("NFC_QC", '\u{301}').as_deref(), Some("M"));
        assert_eq!(lookup("NFC_QC", '\u{340}').as_deref(), Some("N"));
        assert_eq!(lookup("NFD_QC", 'é').as_deref(), Some("N"));
        assert_eq!(lookup("NFD_QC", 'e').as_deref(), Some("Y"));
        assert_eq!(lookup("NFKC_QC", 'ﬁ').as_deref(), Some("N"));
        assert_eq!(lookup("NFKD_Quick_Check", 'ﬁ').as_deref(), Some("N"));
        assert_eq!(lookup("NFKD_QC", 'f').as_deref(), Some("Y"));
    }
}
