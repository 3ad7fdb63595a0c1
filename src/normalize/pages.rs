//! Page field parsing.
//!
//! Exports spread pages over up to three fields and write them in many shapes:
//! `"1234-45"`, `"S12-S14"`, `"ii22-ii33"`, `"e071674"`, `"Article number 123"`,
//! `"12-4, 18-20"`. Comparison only ever uses the leading numeral of the winning field.

use crate::PageFields;
use crate::regex::Regex;
use crate::utils::{collapse_whitespace, roman_to_number};
use std::sync::LazyLock;
use tracing::trace;

static NOISE_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:unsp|article(?:\s+(?:number|no\.?))?)\s*[:#]?\s*").unwrap()
});

/// A separator followed by another page reference.
static MULTI_RANGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;]\s*[A-Za-z]*[0-9]").unwrap());

/// A parsed page field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// First page as written, noise stripped ("S12")
    pub page_start: String,
    /// Right-aligned numeral of the last page, only for genuine ranges
    pub page_end: Option<String>,
    /// Leading numeral of the first page ("12")
    pub page_for_comparison: String,
    /// Human-facing page text with the end page completed ("1234-1245")
    pub pages_output: String,
    /// Field lists more than one page range
    pub multiple_ranges: bool,
}

impl PageInfo {
    /// Whether the field names a range with distinct start and end pages.
    pub fn is_range(&self) -> bool {
        self.page_end.is_some()
    }
}

/// Resolves a record's page fields by precedence: article number, then the secondary
/// field, then the primary field. A lower-precedence field replaces an earlier pick only
/// when it is itself a genuine range.
pub fn parse_pages(fields: &PageFields) -> Option<PageInfo> {
    let mut chosen: Option<PageInfo> = None;
    for raw in [&fields.article_number, &fields.secondary, &fields.primary]
        .into_iter()
        .flatten()
    {
        let Some(info) = parse_page_field(raw) else {
            continue;
        };
        if chosen.is_none() || info.is_range() {
            chosen = Some(info);
        }
    }
    chosen
}

/// Parses one raw page field, `None` when it holds no usable page numeral.
///
/// ```
/// use citedupe::normalize::parse_page_field;
///
/// let info = parse_page_field("1234-45").unwrap();
/// assert_eq!(info.page_for_comparison, "1234");
/// assert_eq!(info.page_end.as_deref(), Some("1245"));
/// assert_eq!(info.pages_output, "1234-1245");
/// ```
pub fn parse_page_field(raw: &str) -> Option<PageInfo> {
    let mut text: String = raw.chars().map(normalize_hyphen).collect();
    text = collapse_whitespace(&text);
    loop {
        let stripped = NOISE_PREFIX_REGEX.replace(&text, "").to_string();
        if stripped == text {
            break;
        }
        text = stripped;
    }
    if text.is_empty() {
        return None;
    }

    let multiple_ranges = MULTI_RANGE_REGEX.is_match(&text);
    let first = text.split([',', ';']).next().unwrap_or_default().trim();
    let (start, end) = match first.split_once('-') {
        Some((start, end)) => (start.trim(), Some(end.trim())),
        None => (first, None),
    };

    let Some(page_for_comparison) = leading_numeral(start) else {
        trace!(pages = raw, "no page numeral found");
        return None;
    };

    let page_end = end
        .and_then(leading_numeral)
        .map(|end| right_align(&page_for_comparison, &end))
        .filter(|end| *end != page_for_comparison);

    let pages_output = if multiple_ranges {
        text.clone()
    } else {
        complete_page_range(first)
    };

    Some(PageInfo {
        page_start: start.to_string(),
        page_end,
        page_for_comparison,
        pages_output,
        multiple_ranges,
    })
}

fn normalize_hyphen(c: char) -> char {
    match c {
        '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}' => '-',
        _ => c,
    }
}

/// Leading numeral of a page, without its letter prefix and leading zeros. A page written
/// wholly in Roman numerals ("xii") resolves to its value.
fn leading_numeral(page: &str) -> Option<String> {
    if let Some(value) = roman_to_number(page) {
        return Some(value.to_string());
    }
    let digits: String = page
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
}

/// "12", "4" -> "14": a shorter end page borrows the start page's leading digits.
fn right_align(start: &str, end: &str) -> String {
    if end.len() < start.len() {
        format!("{}{}", &start[..start.len() - end.len()], end)
    } else {
        end.to_string()
    }
}

/// Rewrites an abbreviated range in full, keeping a shared letter prefix:
/// "R575-82" -> "R575-R582". Anything it cannot read is returned as is.
fn complete_page_range(page_range: &str) -> String {
    let Some((from, to)) = page_range.split_once('-') else {
        return page_range.to_string();
    };
    if to.contains('-') {
        return page_range.to_string();
    }

    let (from_prefix, from_num) = split_prefix_and_number(from.trim());
    let (to_prefix, to_num) = split_prefix_and_number(to.trim());
    if from_prefix != to_prefix && !from_prefix.is_empty() && !to_prefix.is_empty() {
        return page_range.to_string();
    }
    let (Some(from_num), Some(to_num)) = (from_num, to_num) else {
        return page_range.to_string();
    };

    let completed_to = right_align(from_num, to_num);
    if from_num == completed_to {
        return format!("{from_prefix}{from_num}");
    }
    format!("{from_prefix}{from_num}-{from_prefix}{completed_to}")
}

fn split_prefix_and_number(input: &str) -> (&str, Option<&str>) {
    match input.find(|c: char| c.is_ascii_digit()) {
        Some(index) => {
            let number = &input[index..];
            let digits_end = number
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(number.len());
            (&input[..index], Some(&number[..digits_end]))
        }
        None => (input, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("12-4", "12", Some("14"), "12-14")]
    #[case("S12-S14", "12", Some("14"), "S12-S14")]
    #[case("ii22-ii33", "22", Some("33"), "ii22-ii33")]
    #[case("1234-45", "1234", Some("1245"), "1234-1245")]
    #[case("R575-82", "575", Some("582"), "R575-R582")]
    #[case("101-101", "101", None, "101")]
    #[case("e071674", "71674", None, "e071674")]
    #[case("xii", "12", None, "xii")]
    #[case("123\u{2013}125", "123", Some("125"), "123-125")]
    #[case("UNSP e1234", "1234", None, "e1234")]
    #[case("Article number 87", "87", None, "87")]
    #[case("Article no. 87", "87", None, "87")]
    fn test_parse_page_field(
        #[case] input: &str,
        #[case] comparison: &str,
        #[case] end: Option<&str>,
        #[case] output: &str,
    ) {
        let info = parse_page_field(input).unwrap();
        assert_eq!(info.page_for_comparison, comparison);
        assert_eq!(info.page_end.as_deref(), end);
        assert_eq!(info.pages_output, output);
        assert!(!info.multiple_ranges);
    }

    #[test]
    fn test_multiple_ranges() {
        let info = parse_page_field("12-4, 18-20").unwrap();
        assert!(info.multiple_ranges);
        assert_eq!(info.page_for_comparison, "12");
        assert_eq!(info.pages_output, "12-4, 18-20");

        let info = parse_page_field("S12; S18").unwrap();
        assert!(info.multiple_ranges);
        assert_eq!(info.page_for_comparison, "12");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("UNSP")]
    #[case("n/a")]
    #[case("Apr-01")]
    fn test_unusable_page_field(#[case] input: &str) {
        assert_eq!(parse_page_field(input), None);
    }

    #[rstest]
    #[case("12-4")]
    #[case("S12-S14")]
    #[case("1234-45")]
    #[case("UNSP e1234")]
    #[case("12-4, 18-20")]
    fn test_parse_page_field_is_idempotent(#[case] input: &str) {
        let once = parse_page_field(input).unwrap();
        let twice = parse_page_field(&once.pages_output).unwrap();
        assert_eq!(twice.page_for_comparison, once.page_for_comparison);
        assert_eq!(twice.pages_output, once.pages_output);
    }

    #[test]
    fn test_parse_pages_precedence() {
        let fields = PageFields {
            primary: Some("100-110".to_string()),
            secondary: None,
            article_number: Some("e12".to_string()),
        };
        // the primary range overrides the single article number
        assert_eq!(parse_pages(&fields).unwrap().page_for_comparison, "100");

        let fields = PageFields {
            primary: Some("100".to_string()),
            secondary: None,
            article_number: Some("e12".to_string()),
        };
        assert_eq!(parse_pages(&fields).unwrap().page_for_comparison, "12");

        let fields = PageFields {
            primary: Some("100-110".to_string()),
            secondary: Some("5-9".to_string()),
            article_number: None,
        };
        assert_eq!(parse_pages(&fields).unwrap().page_for_comparison, "100");

        assert_eq!(parse_pages(&PageFields::default()), None);
    }

    #[test]
    fn test_complete_page_range() {
        assert_eq!(complete_page_range("1234-45"), "1234-1245");
        assert_eq!(complete_page_range("1234"), "1234");
        assert_eq!(complete_page_range("123-456"), "123-456");
        assert_eq!(complete_page_range("R575-82"), "R575-R582");
        assert_eq!(complete_page_range("12-345"), "12-345");
        assert_eq!(complete_page_range("A94-A95"), "A94-A95");
        assert_eq!(complete_page_range("01-Apr"), "01-Apr");
        assert_eq!(complete_page_range("iii613-iii614"), "iii613-iii614");
        assert_eq!(complete_page_range("101-101"), "101");
    }
}
