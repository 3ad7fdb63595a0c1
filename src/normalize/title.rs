//! Title normalization.
//!
//! A title contributes several comparison variants to its record:
//!
//! - the normalized title
//! - the same string character-reversed, because Jaro-Winkler rewards a shared prefix;
//!   comparing reversed strings moves a difference at the start of the title away from
//!   the weighted prefix
//! - normalized and reversed forms of the main clause and the subtitle when the title
//!   has a `:`, `;` or `?` clause of sufficient length

use crate::regex::Regex;
use crate::utils::{collapse_whitespace, convert_unicode_escapes, decode_html_entities, fold_accents};
use itertools::Itertools;
use std::sync::LazyLock;

/// Minimum normalized length of the clause before a subtitle separator.
const MAIN_CLAUSE_MIN_CHARS: usize = 20;
/// Minimum normalized length of the clause after a subtitle separator.
const SUBTITLE_MIN_CHARS: usize = 40;

static NOTICE_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:reprint of|retracted(?: article)?|retraction(?: note)?|erratum|errata|corrigendum)(?: to)?\s*:\s*",
    )
    .unwrap()
});

static MARKUP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap());

static BRACKET_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());

static PARENTHETICAL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());

static REPLY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^\s*(?:re|reply|comment|correspondence)\s*:|^\s*reply\b|\bin reply\b|\breply to\b|\bresponse to\b|\bauthors?'? (?:reply|response)\b|\bcomments? on\b|\bletter to the editor\b|\breplies\b)",
    )
    .unwrap()
});

static PHASE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bphase[\s-]*(?:[0-4]|iv|i{1,3})[ab]?\b").unwrap());

const GREEK_LETTERS: [(char, &str); 12] = [
    ('α', " alpha "),
    ('β', " beta "),
    ('γ', " gamma "),
    ('δ', " delta "),
    ('ε', " epsilon "),
    ('κ', " kappa "),
    ('λ', " lambda "),
    ('μ', " mu "),
    ('π', " pi "),
    ('σ', " sigma "),
    ('τ', " tau "),
    ('ω', " omega "),
];

const LEADING_ARTICLES: [&str; 3] = ["a", "an", "the"];

/// The comparison forms of a record's titles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleForms {
    /// Normalized, reversed and subtitle variants of every title, without repeats
    pub variants: Vec<String>,
    /// Primary title in its original case, kept only for replies
    pub reply_title: Option<String>,
    pub is_reply: bool,
    pub is_phase_trial: bool,
}

/// Builds the comparison forms for a record's titles; the first title is the primary one.
pub fn title_forms(titles: &[String]) -> TitleForms {
    let primary = titles.iter().map(|t| t.trim()).find(|t| !t.is_empty());
    let is_reply = primary.is_some_and(|t| REPLY_REGEX.is_match(t));
    let is_phase_trial = titles.iter().any(|t| PHASE_REGEX.is_match(t));

    let mut variants = Vec::new();
    for title in titles {
        push_variants(&mut variants, title);
    }

    TitleForms {
        variants: variants.into_iter().unique().collect(),
        reply_title: primary.filter(|_| is_reply).map(str::to_string),
        is_reply,
        is_phase_trial,
    }
}

fn push_variants(variants: &mut Vec<String>, raw: &str) {
    let normalized = normalize_title(raw);
    if normalized.is_empty() {
        tracing::trace!(title = raw, "title is empty after normalization");
        return;
    }
    push_with_reversed(variants, normalized);

    let stripped = strip_notice_prefix(raw);
    if let Some(pos) = stripped.find([':', ';', '?']) {
        let main = normalize_title(&stripped[..pos]);
        let subtitle = normalize_title(&stripped[pos + 1..]);
        if main.chars().count() >= MAIN_CLAUSE_MIN_CHARS {
            push_with_reversed(variants, main);
        }
        if subtitle.chars().count() >= SUBTITLE_MIN_CHARS {
            push_with_reversed(variants, subtitle);
        }
    }
}

fn push_with_reversed(variants: &mut Vec<String>, normalized: String) {
    let reversed = reversed(&normalized);
    variants.push(normalized);
    variants.push(reversed);
}

fn reversed(s: &str) -> String {
    s.chars().rev().collect()
}

/// Normalizes a single title into its canonical comparison form.
///
/// Lower-cased and accent-folded; notice prefixes ("Erratum:", "Retracted:"), markup,
/// non-initial bracketed glosses, parentheticals, punctuation and leading articles are
/// removed. A title made entirely of a bracketed translation keeps its content.
///
/// ```
/// use citedupe::normalize::normalize_title;
///
/// assert_eq!(
///     normalize_title("The <i>in vitro</i> activity of TNF-α (a review)."),
///     "in vitro activity of tnf alpha"
/// );
/// ```
pub fn normalize_title(raw: &str) -> String {
    let text = decode_html_entities(&convert_unicode_escapes(raw));
    let text = strip_notice_prefix(&text);
    let text = MARKUP_REGEX.replace_all(text, " ");
    let text = spell_out_greek(&fold_accents(&text.to_lowercase()));
    let text = text.replace(['\'', '’', '‘', '`', '´'], "");
    let text = text.trim().trim_matches(['"', '“', '”', '«', '»']).trim();

    // "[Translated title]": the whole title is the gloss
    let text = match text.strip_prefix('[') {
        Some(rest) => rest.replacen(']', " ", 1),
        None => text.to_string(),
    };

    let mut stripped = BRACKET_REGEX.replace_all(&text, " ").to_string();
    loop {
        let next = PARENTHETICAL_REGEX.replace_all(&stripped, " ").to_string();
        if next == stripped {
            break;
        }
        stripped = next;
    }

    let mut normalized = strip_punctuation(&stripped);
    if normalized.is_empty() {
        // Nothing outside brackets: keep what was inside them
        normalized = strip_punctuation(&text);
    }
    strip_leading_articles(&normalized)
}

/// Removes a leading "Erratum:"/"Retracted:"/"Reprint of:" marker and, when one was
/// removed, a trailing parenthetical citation pointer such as "(Lancet (2020) 395 497)".
fn strip_notice_prefix(raw: &str) -> &str {
    let Some(m) = NOTICE_PREFIX_REGEX.find(raw) else {
        return raw;
    };
    let rest = raw[m.end()..].trim_end();
    let body = rest.trim_end_matches('.').trim_end();
    match trailing_parenthetical_start(body) {
        Some(start) if body[start..].chars().any(|c| c.is_ascii_digit()) => {
            body[..start].trim_end()
        }
        _ => rest,
    }
}

/// Byte offset of the `(` balancing a trailing `)`, if the string ends with one.
fn trailing_parenthetical_start(s: &str) -> Option<usize> {
    if !s.ends_with(')') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, c) in s.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn spell_out_greek(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match GREEK_LETTERS.iter().find(|(g, _)| *g == c) {
            Some((_, name)) => out.push_str(name),
            None => out.push(c),
        }
    }
    out
}

fn strip_punctuation(s: &str) -> String {
    let spaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&spaced)
}

fn strip_leading_articles(s: &str) -> String {
    let all: Vec<&str> = s.split(' ').collect();
    let mut words = all.as_slice();
    while words.len() > 1 && LEADING_ARTICLES.contains(&words[0]) {
        words = &words[1..];
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("The Effect of Aspirin: A Randomized Trial.", "effect of aspirin a randomized trial")]
    #[case("[Treatment of hypertension in the elderly]", "treatment of hypertension in the elderly")]
    #[case("Hypertension in the elderly [Article in German]", "hypertension in the elderly")]
    #[case("\"Quoted\" title", "quoted title")]
    #[case("Children's health", "childrens health")]
    #[case("Müller cells in the retina", "muller cells in the retina")]
    #[case(
        "Retracted: Vitamin D and COVID-19 (Lancet (2020) 395 (10223) (497-506))",
        "vitamin d and covid 19"
    )]
    #[case("Erratum: Aspirin and stroke.", "aspirin and stroke")]
    #[case("A the an example", "example")]
    #[case("(Only parenthetical)", "only parenthetical")]
    #[case("", "")]
    fn test_normalize_title(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_title(input), expected);
    }

    #[rstest]
    #[case("The Effect of Aspirin: A Randomized Trial.")]
    #[case("[Traitement de l'hypertension] (author's transl)")]
    #[case("Erratum: Title of article (BMJ 2019; 365: l1234)")]
    #[case("<sup>11</sup>C-labelled α-agonists: a review?")]
    fn test_normalize_title_is_idempotent(#[case] input: &str) {
        let once = normalize_title(input);
        assert_eq!(normalize_title(&once), once);
    }

    #[test]
    fn test_markup_and_entities() {
        assert_eq!(
            normalize_title("[&lt;sup&gt;11&lt;/sup&gt;C] benzo"),
            "11 c benzo"
        );
        assert_eq!(normalize_title("<U+03B2>-blockers"), "beta blockers");
    }

    #[test]
    fn test_title_forms_reversed_variant() {
        let forms = title_forms(&["Aspirin and stroke".to_string()]);
        assert_eq!(
            forms.variants,
            vec!["aspirin and stroke".to_string(), "ekorts dna niripsa".to_string()]
        );
        assert!(!forms.is_reply);
        assert_eq!(forms.reply_title, None);
    }

    #[test]
    fn test_title_forms_subtitle_variants() {
        let title = "Aspirin versus placebo in older adults: a randomized controlled trial of cardiovascular prevention";
        let forms = title_forms(&[title.to_string()]);
        assert!(forms.variants.contains(&"aspirin versus placebo in older adults".to_string()));
        assert!(forms.variants.contains(
            &"randomized controlled trial of cardiovascular prevention".to_string()
        ));
        assert!(forms.variants.contains(&reversed("aspirin versus placebo in older adults")));
        assert_eq!(forms.variants.len(), 6);
    }

    #[test]
    fn test_title_forms_short_clauses_are_not_split() {
        let forms = title_forms(&["Stroke: a review".to_string()]);
        assert_eq!(forms.variants.len(), 2);
    }

    #[test]
    fn test_reply_detection() {
        let forms = title_forms(&["Reply to: Aspirin and stroke".to_string()]);
        assert!(forms.is_reply);
        assert_eq!(forms.reply_title.as_deref(), Some("Reply to: Aspirin and stroke"));

        assert!(title_forms(&["Authors' reply".to_string()]).is_reply);
        assert!(title_forms(&["Comment on: statins in the elderly".to_string()]).is_reply);
        assert!(!title_forms(&["Response of tumours to radiotherapy".to_string()]).is_reply);
    }

    #[rstest]
    #[case("A phase II trial of drug X", true)]
    #[case("Phase 3 study of drug Y", true)]
    #[case("Phase IIb dose finding", true)]
    #[case("A phase-1 study", true)]
    #[case("Phases of the moon", false)]
    #[case("The acute phase response", false)]
    fn test_phase_detection(#[case] title: &str, #[case] expected: bool) {
        assert_eq!(title_forms(&[title.to_string()]).is_phase_trial, expected);
    }

    #[test]
    fn test_alternative_titles_contribute_variants() {
        let forms = title_forms(&[
            "Hypertension bei alteren Menschen".to_string(),
            "Hypertension in older people".to_string(),
        ]);
        assert_eq!(forms.variants.len(), 4);
        assert!(forms.variants.contains(&"hypertension in older people".to_string()));
    }
}
