use crate::regex::{Captures, Regex};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static UNICODE_ESCAPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<U\+([0-9A-Fa-f]+)>").unwrap());

static YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(1[5-9][0-9]{2}|20[0-9]{2})\b").unwrap());

static NUMERIC_ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9A-Fa-f]{1,6})|([0-9]{1,7}));").unwrap());

const HTML_ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    // last, so "&amp;lt;" decodes only one level
    ("&amp;", "&"),
];

/// Converts `<U+03B1>`-style escapes some exports emit into the characters they name.
pub(crate) fn convert_unicode_escapes(input: &str) -> String {
    if !input.contains("<U+") {
        return input.to_string();
    }
    UNICODE_ESCAPE_REGEX
        .replace_all(input, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

/// Decodes numeric character references and the handful of named HTML entities that
/// leak into exported fields. References to invalid code points are left as written.
pub(crate) fn decode_html_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut s = NUMERIC_ENTITY_REGEX
        .replace_all(input, |caps: &Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(decimal)) => decimal.as_str().parse().ok(),
                (None, None) => None,
            };
            code.and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();
    for (entity, replacement) in HTML_ENTITIES {
        s = s.replace(entity, replacement);
    }
    s
}

/// Strips diacritics: "Müller" -> "Muller", "Ångström" -> "Angstrom".
pub(crate) fn fold_accents(input: &str) -> String {
    input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'ø' => 'o',
            'Ø' => 'O',
            'ł' => 'l',
            'Ł' => 'L',
            'đ' => 'd',
            'Đ' => 'D',
            'ı' => 'i',
            _ => c,
        })
        .collect::<String>()
        .replace('ß', "ss")
        .replace('æ', "ae")
        .replace('Æ', "AE")
        .replace('œ', "oe")
        .replace('Œ', "OE")
}

/// Collapse runs of whitespace into a single space and trim the ends.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts the publication year, 0 when no plausible year is present.
pub(crate) fn parse_year(input: &str) -> i32 {
    YEAR_REGEX
        .captures(input)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Value of a lower-case Roman numeral, `None` if `s` is not one.
pub(crate) fn roman_to_number(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut total = 0u32;
    let mut previous = 0u32;
    for c in s.chars().rev() {
        let value = match c.to_ascii_lowercase() {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            'l' => 50,
            'c' => 100,
            'd' => 500,
            'm' => 1000,
            _ => return None,
        };
        if value < previous {
            total = total.checked_sub(value)?;
        } else {
            total += value;
            previous = value;
        }
    }
    (total > 0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_unicode_escapes() {
        assert_eq!(convert_unicode_escapes("2<U+0391>-amino"), "2Α-amino");
        assert_eq!(
            convert_unicode_escapes("Hello <U+03A9>orld <U+03A3>cience"),
            "Hello Ωorld Σcience"
        );
        assert_eq!(convert_unicode_escapes("Normal String"), "Normal String");
        assert_eq!(convert_unicode_escapes(""), "");
        assert_eq!(convert_unicode_escapes("<U+0391><U+0392><U+0393>"), "ΑΒΓ");
    }

    #[test]
    fn test_decode_html_entities() {
        assert_eq!(decode_html_entities("a &lt;b&gt; c"), "a <b> c");
        assert_eq!(decode_html_entities("R&amp;D"), "R&D");
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_html_entities("plain"), "plain");
        assert_eq!(decode_html_entities("&#34;quoted&#39;"), "\"quoted'");
        assert_eq!(decode_html_entities("10.1000&#x2F;abc&#47;def"), "10.1000/abc/def");
        assert_eq!(decode_html_entities("&#xD800;"), "&#xD800;");
        // "&amp;#47;" is one level of escaping, not two
        assert_eq!(decode_html_entities("&amp;#47;"), "&#47;");
    }

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Müller"), "Muller");
        assert_eq!(fold_accents("Études Françaises"), "Etudes Francaises");
        assert_eq!(fold_accents("Søren Łukasz"), "Soren Lukasz");
        assert_eq!(fold_accents("Straße"), "Strasse");
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2020"), 2020);
        assert_eq!(parse_year("2020///"), 2020);
        assert_eq!(parse_year("Published 1998 Mar"), 1998);
        assert_eq!(parse_year(""), 0);
        assert_eq!(parse_year("in press"), 0);
        assert_eq!(parse_year("12345"), 0);
        assert_eq!(parse_year("\u{0662}\u{0660}\u{0662}\u{0660}"), 0);
    }

    #[test]
    fn test_roman_to_number() {
        assert_eq!(roman_to_number("ii"), Some(2));
        assert_eq!(roman_to_number("iv"), Some(4));
        assert_eq!(roman_to_number("xii"), Some(12));
        assert_eq!(roman_to_number("XLII"), Some(42));
        assert_eq!(roman_to_number("s"), None);
        assert_eq!(roman_to_number(""), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a   b \t c "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
    }
}
