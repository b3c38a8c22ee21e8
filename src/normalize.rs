//! Search-text filters applied before a selection is appended to a lookup URL.
//!
//! Two filters exist besides the identity:
//! - `Diacritics` folds accented vowels to their base letter so resources that
//!   index headwords without accents still match. Eth, thorn and ash have no
//!   ASCII fallback and fold to their Latin-1 percent escapes instead.
//! - `UrlEncode` percent-encodes the text as a URI component and turns double
//!   spaces into encoded newline pairs, which keeps paragraph breaks intact in
//!   machine translation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use thiserror::Error;

/// Which transform a lookup target applies to the selected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    None,
    Diacritics,
    UrlEncode,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown filter: {0}")]
pub struct UnknownFilter(pub String);

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Diacritics => "diacritics",
            FilterKind::UrlEncode => "urlencode",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "none" => Ok(FilterKind::None),
            "diacritics" => Ok(FilterKind::Diacritics),
            "urlencode" => Ok(FilterKind::UrlEncode),
            _ => Err(UnknownFilter(raw.to_string())),
        }
    }
}

/// Produce the fragment appended to a target's URL template.
pub fn normalize(text: &str, filter: FilterKind) -> String {
    match filter {
        FilterKind::None => text.to_string(),
        FilterKind::Diacritics => fold_diacritics(text),
        FilterKind::UrlEncode => encode_preserving_breaks(text),
    }
}

/// Characters left alone by a URI component encoder: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const ENCODED_SPACE_PAIR: &str = "%20%20";
const ENCODED_NEWLINE_PAIR: &str = "%0A%0A";

/// Percent-encode `text` as a URI component, without the space-pair rewrite.
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

fn encode_preserving_breaks(text: &str) -> String {
    encode_component(text).replace(ENCODED_SPACE_PAIR, ENCODED_NEWLINE_PAIR)
}

/// Replace every accented form covered by the rule table with its base.
pub fn fold_diacritics(text: &str) -> String {
    let table = &*FOLD_TABLE;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match table.get(&c) {
            Some(base) => out.push_str(base),
            None => out.push(c),
        }
    }
    out
}

/// One base letter and the characters that fold onto it.
#[derive(Debug, Clone, Copy)]
pub struct DiacriticRule {
    pub base: &'static str,
    pub letters: &'static [char],
}

static FOLD_TABLE: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    for rule in DIACRITIC_RULES {
        for &letter in rule.letters {
            table.insert(letter, rule.base);
        }
    }
    table
});

pub static DIACRITIC_RULES: &[DiacriticRule] = &[
    DiacriticRule {
        base: "A",
        letters: &[
            '\u{0041}', '\u{24B6}', '\u{FF21}', '\u{00C0}', '\u{00C1}', '\u{00C2}', '\u{1EA6}',
            '\u{1EA4}', '\u{1EAA}', '\u{1EA8}', '\u{00C3}', '\u{0100}', '\u{0102}', '\u{1EB0}',
            '\u{1EAE}', '\u{1EB4}', '\u{1EB2}', '\u{0226}', '\u{01E0}', '\u{00C4}', '\u{01DE}',
            '\u{1EA2}', '\u{00C5}', '\u{01FA}', '\u{01CD}', '\u{0200}', '\u{0202}', '\u{1EA0}',
            '\u{1EAC}', '\u{1EB6}', '\u{1E00}', '\u{0104}', '\u{023A}', '\u{2C6F}',
        ],
    },
    DiacriticRule {
        base: "E",
        letters: &[
            '\u{0045}', '\u{24BA}', '\u{FF25}', '\u{00C8}', '\u{00C9}', '\u{00CA}', '\u{1EC0}',
            '\u{1EBE}', '\u{1EC4}', '\u{1EC2}', '\u{1EBC}', '\u{0112}', '\u{1E14}', '\u{1E16}',
            '\u{0114}', '\u{0116}', '\u{00CB}', '\u{1EBA}', '\u{011A}', '\u{0204}', '\u{0206}',
            '\u{1EB8}', '\u{1EC6}', '\u{0228}', '\u{1E1C}', '\u{0118}', '\u{1E18}', '\u{1E1A}',
            '\u{0190}', '\u{018E}',
        ],
    },
    DiacriticRule {
        base: "I",
        letters: &[
            '\u{0049}', '\u{24BE}', '\u{FF29}', '\u{00CC}', '\u{00CD}', '\u{00CE}', '\u{0128}',
            '\u{012A}', '\u{012C}', '\u{0130}', '\u{00CF}', '\u{1E2E}', '\u{1EC8}', '\u{01CF}',
            '\u{0208}', '\u{020A}', '\u{1ECA}', '\u{012E}', '\u{1E2C}', '\u{0197}',
        ],
    },
    DiacriticRule {
        base: "O",
        letters: &[
            '\u{004F}', '\u{24C4}', '\u{FF2F}', '\u{00D2}', '\u{00D3}', '\u{00D4}', '\u{1ED2}',
            '\u{1ED0}', '\u{1ED6}', '\u{1ED4}', '\u{00D5}', '\u{1E4C}', '\u{022C}', '\u{1E4E}',
            '\u{014C}', '\u{1E50}', '\u{1E52}', '\u{014E}', '\u{022E}', '\u{0230}', '\u{00D6}',
            '\u{022A}', '\u{1ECE}', '\u{0150}', '\u{01D1}', '\u{020C}', '\u{020E}', '\u{01A0}',
            '\u{1EDC}', '\u{1EDA}', '\u{1EE0}', '\u{1EDE}', '\u{1EE2}', '\u{1ECC}', '\u{1ED8}',
            '\u{01EA}', '\u{01EC}', '\u{00D8}', '\u{01FE}', '\u{0186}', '\u{019F}', '\u{A74A}',
            '\u{A74C}',
        ],
    },
    DiacriticRule {
        base: "U",
        letters: &[
            '\u{0055}', '\u{24CA}', '\u{FF35}', '\u{00D9}', '\u{00DA}', '\u{00DB}', '\u{0168}',
            '\u{1E78}', '\u{016A}', '\u{1E7A}', '\u{016C}', '\u{00DC}', '\u{01DB}', '\u{01D7}',
            '\u{01D5}', '\u{01D9}', '\u{1EE6}', '\u{016E}', '\u{0170}', '\u{01D3}', '\u{0214}',
            '\u{0216}', '\u{01AF}', '\u{1EEA}', '\u{1EE8}', '\u{1EEE}', '\u{1EEC}', '\u{1EF0}',
            '\u{1EE4}', '\u{1E72}', '\u{0172}', '\u{1E76}', '\u{1E74}', '\u{0244}',
        ],
    },
    DiacriticRule {
        base: "Y",
        letters: &[
            '\u{0059}', '\u{24CE}', '\u{FF39}', '\u{1EF2}', '\u{00DD}', '\u{0176}', '\u{1EF8}',
            '\u{0232}', '\u{1E8E}', '\u{0178}', '\u{1EF6}', '\u{1EF4}', '\u{01B3}', '\u{024E}',
            '\u{1EFE}',
        ],
    },
    DiacriticRule {
        base: "a",
        letters: &[
            '\u{0061}', '\u{24D0}', '\u{FF41}', '\u{1E9A}', '\u{00E0}', '\u{00E1}', '\u{00E2}',
            '\u{1EA7}', '\u{1EA5}', '\u{1EAB}', '\u{1EA9}', '\u{00E3}', '\u{0101}', '\u{0103}',
            '\u{1EB1}', '\u{1EAF}', '\u{1EB5}', '\u{1EB3}', '\u{0227}', '\u{01E1}', '\u{00E4}',
            '\u{01DF}', '\u{1EA3}', '\u{00E5}', '\u{01FB}', '\u{01CE}', '\u{0201}', '\u{0203}',
            '\u{1EA1}', '\u{1EAD}', '\u{1EB7}', '\u{1E01}', '\u{0105}', '\u{2C65}', '\u{0250}',
        ],
    },
    DiacriticRule {
        base: "e",
        letters: &[
            '\u{0065}', '\u{24D4}', '\u{FF45}', '\u{00E8}', '\u{00E9}', '\u{00EA}', '\u{1EC1}',
            '\u{1EBF}', '\u{1EC5}', '\u{1EC3}', '\u{1EBD}', '\u{0113}', '\u{1E15}', '\u{1E17}',
            '\u{0115}', '\u{0117}', '\u{00EB}', '\u{1EBB}', '\u{011B}', '\u{0205}', '\u{0207}',
            '\u{1EB9}', '\u{1EC7}', '\u{0229}', '\u{1E1D}', '\u{0119}', '\u{1E19}', '\u{1E1B}',
            '\u{0247}', '\u{025B}', '\u{01DD}',
        ],
    },
    DiacriticRule {
        base: "i",
        letters: &[
            '\u{0069}', '\u{24D8}', '\u{FF49}', '\u{00EC}', '\u{00ED}', '\u{00EE}', '\u{0129}',
            '\u{012B}', '\u{012D}', '\u{00EF}', '\u{1E2F}', '\u{1EC9}', '\u{01D0}', '\u{0209}',
            '\u{020B}', '\u{1ECB}', '\u{012F}', '\u{1E2D}', '\u{0268}', '\u{0131}',
        ],
    },
    DiacriticRule {
        base: "o",
        letters: &[
            '\u{006F}', '\u{24DE}', '\u{FF4F}', '\u{00F2}', '\u{00F3}', '\u{00F4}', '\u{1ED3}',
            '\u{1ED1}', '\u{1ED7}', '\u{1ED5}', '\u{00F5}', '\u{1E4D}', '\u{022D}', '\u{1E4F}',
            '\u{014D}', '\u{1E51}', '\u{1E53}', '\u{014F}', '\u{022F}', '\u{0231}', '\u{00F6}',
            '\u{022B}', '\u{1ECF}', '\u{0151}', '\u{01D2}', '\u{020D}', '\u{020F}', '\u{01A1}',
            '\u{1EDD}', '\u{1EDB}', '\u{1EE1}', '\u{1EDF}', '\u{1EE3}', '\u{1ECD}', '\u{1ED9}',
            '\u{01EB}', '\u{01ED}', '\u{00F8}', '\u{01FF}', '\u{0254}', '\u{A74B}', '\u{A74D}',
            '\u{0275}',
        ],
    },
    DiacriticRule {
        base: "u",
        letters: &[
            '\u{0075}', '\u{24E4}', '\u{FF55}', '\u{00F9}', '\u{00FA}', '\u{00FB}', '\u{0169}',
            '\u{1E79}', '\u{016B}', '\u{1E7B}', '\u{016D}', '\u{00FC}', '\u{01DC}', '\u{01D8}',
            '\u{01D6}', '\u{01DA}', '\u{1EE7}', '\u{016F}', '\u{0171}', '\u{01D4}', '\u{0215}',
            '\u{0217}', '\u{01B0}', '\u{1EEB}', '\u{1EE9}', '\u{1EEF}', '\u{1EED}', '\u{1EF1}',
            '\u{1EE5}', '\u{1E73}', '\u{0173}', '\u{1E77}', '\u{1E75}', '\u{0289}',
        ],
    },
    DiacriticRule {
        base: "y",
        letters: &[
            '\u{0079}', '\u{24E8}', '\u{FF59}', '\u{1EF3}', '\u{00FD}', '\u{0177}', '\u{1EF9}',
            '\u{0233}', '\u{1E8F}', '\u{00FF}', '\u{1EF7}', '\u{1E99}', '\u{1EF5}', '\u{01B4}',
            '\u{024F}', '\u{1EFF}',
        ],
    },
    // Latin-1 escapes; both cases share one token.
    DiacriticRule {
        base: "%F0",
        letters: &['\u{00F0}', '\u{00D0}'],
    },
    DiacriticRule {
        base: "%FE",
        letters: &['\u{00FE}', '\u{00DE}'],
    },
    DiacriticRule {
        base: "%E6",
        letters: &['\u{00E6}', '\u{00C6}'],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn none_filter_is_identity() {
        for text in ["", "hestur", "Þingvellir  á", "a&b=c"] {
            assert_eq!(normalize(text, FilterKind::None), text);
        }
    }

    #[test]
    fn folds_icelandic_vowels() {
        assert_eq!(normalize("áéíóúý", FilterKind::Diacritics), "aeiouy");
        assert_eq!(normalize("ÁÉÍÓÚÝ", FilterKind::Diacritics), "AEIOUY");
        assert_eq!(normalize("höfuð", FilterKind::Diacritics), "hofu%F0");
    }

    #[test]
    fn folds_thorn_in_both_cases() {
        assert_eq!(
            normalize("Þingvellir", FilterKind::Diacritics),
            "%FEingvellir"
        );
        assert_eq!(normalize("þÞ", FilterKind::Diacritics), "%FE%FE");
        assert_eq!(normalize("Æsir æ", FilterKind::Diacritics), "%E6sir %E6");
        assert_eq!(normalize("Ðð", FilterKind::Diacritics), "%F0%F0");
    }

    #[test]
    fn folding_leaves_unmatched_characters() {
        assert_eq!(
            normalize("Bók 12, ß?", FilterKind::Diacritics),
            "Bok 12, ß?"
        );
        assert_eq!(normalize("", FilterKind::Diacritics), "");
    }

    #[test]
    fn folding_is_idempotent() {
        let text = "Þórður fór í ævintýraferð til Ísafjarðar ǅ ⓐ";
        let once = normalize(text, FilterKind::Diacritics);
        assert_eq!(normalize(&once, FilterKind::Diacritics), once);
    }

    #[test]
    fn rule_letters_are_disjoint() {
        let mut seen = HashSet::new();
        for rule in DIACRITIC_RULES {
            for letter in rule.letters {
                assert!(seen.insert(*letter), "{letter:?} appears twice");
            }
        }
        assert_eq!(FOLD_TABLE.len(), seen.len());
    }

    #[test]
    fn urlencode_matches_component_encoding_for_ascii() {
        assert_eq!(normalize("hestur", FilterKind::UrlEncode), "hestur");
        assert_eq!(
            normalize("a&b=c/d?e#f", FilterKind::UrlEncode),
            "a%26b%3Dc%2Fd%3Fe%23f"
        );
        assert_eq!(
            normalize("-_.!~*'()", FilterKind::UrlEncode),
            "-_.!~*'()"
        );
    }

    #[test]
    fn urlencode_turns_space_pairs_into_newline_pairs() {
        assert_eq!(normalize("a  b", FilterKind::UrlEncode), "a%0A%0Ab");
        assert_eq!(normalize("a b", FilterKind::UrlEncode), "a%20b");
        assert_eq!(normalize("a   b", FilterKind::UrlEncode), "a%0A%0A%20b");
        assert_eq!(normalize("a    b", FilterKind::UrlEncode), "a%0A%0A%0A%0Ab");
    }

    #[test]
    fn encode_component_keeps_space_pairs() {
        assert_eq!(encode_component("a  b"), "a%20%20b");
        assert_eq!(encode_component("Þú"), "%C3%9E%C3%BA");
    }

    #[test]
    fn urlencode_encodes_utf8() {
        assert_eq!(
            normalize("hestar  hér", FilterKind::UrlEncode),
            "hestar%0A%0Ah%C3%A9r"
        );
        assert_eq!(normalize("þ", FilterKind::UrlEncode), "%C3%BE");
    }

    #[test]
    fn filter_names_round_trip_through_strings() {
        for kind in [FilterKind::None, FilterKind::Diacritics, FilterKind::UrlEncode] {
            assert_eq!(kind.to_string().parse::<FilterKind>(), Ok(kind));
        }
        assert_eq!("URLENCODE".parse::<FilterKind>(), Ok(FilterKind::UrlEncode));
        assert!("rot13".parse::<FilterKind>().is_err());
        assert!("".parse::<FilterKind>().is_err());
        assert_eq!(
            serde_json::to_string(&FilterKind::UrlEncode).unwrap(),
            "\"urlencode\""
        );
    }
}
