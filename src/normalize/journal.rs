//! Journal name normalization and abbreviation matching.
//!
//! Exports name the same journal in many ways: full title, ISO abbreviation, acronym,
//! or a bilingual "Native title [English title]". A raw journal field is split into
//! every candidate name it contains, and each candidate is normalized on its own.

use crate::regex::Regex;
use crate::utils::{collapse_whitespace, convert_unicode_escapes, decode_html_entities, fold_accents};
use itertools::Itertools;
use std::sync::LazyLock;

static BRACKETED_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").unwrap());

static TRAILING_PARENTHETICAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*\.?\s*$").unwrap());

static SUPPLEMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[.,;\s](?:suppl|supplement|supplementum|supplemento|conference|series|ser)\b.*$")
        .unwrap()
});

/// Words that abbreviations routinely drop.
const FILLER_WORDS: [&str; 22] = [
    "of", "the", "and", "for", "in", "on", "at", "to", "a", "an", "de", "la", "le", "les", "des",
    "du", "der", "die", "das", "und", "fur", "et",
];

/// Abbreviations that are not a prefix of the word they stand for.
const IRREGULAR_ABBREVIATIONS: [(&str, &str); 14] = [
    ("natl", "national"),
    ("intl", "international"),
    ("jpn", "japanese"),
    ("dtsch", "deutsche"),
    ("hlth", "health"),
    ("assn", "association"),
    ("mgmt", "management"),
    ("wkly", "weekly"),
    ("qtly", "quarterly"),
    ("jt", "joint"),
    ("zschr", "zeitschrift"),
    ("ztschr", "zeitschrift"),
    ("geneeskd", "geneeskunde"),
    ("yrbk", "yearbook"),
];

/// British spellings folded onto American ones so abbreviations of either match.
const SPELLING_VARIANTS: [(&str, &str); 9] = [
    ("anaesth", "anesth"),
    ("haem", "hem"),
    ("gynaec", "gynec"),
    ("paed", "ped"),
    ("oesoph", "esoph"),
    ("oedem", "edem"),
    ("tumour", "tumor"),
    ("behaviour", "behavior"),
    ("centre", "center"),
];

/// All normalized candidate names of a record's journal fields, without repeats.
pub fn journal_variants(journals: &[String]) -> Vec<String> {
    journals
        .iter()
        .flat_map(|j| normalize_journal(j))
        .unique()
        .collect()
}

/// Splits one raw journal field into its candidate names and normalizes each.
///
/// ```
/// use citedupe::normalize::normalize_journal;
///
/// assert_eq!(
///     normalize_journal("Zhonghua wai ke za zhi [Chinese journal of surgery]"),
///     vec!["zhonghua wai ke za zhi", "chinese journal of surgery"]
/// );
/// ```
pub fn normalize_journal(raw: &str) -> Vec<String> {
    let text = fold_accents(&decode_html_entities(&convert_unicode_escapes(raw)));

    let mut parts: Vec<String> = BRACKETED_REGEX
        .captures_iter(&text)
        .map(|caps| caps[1].to_string())
        .collect();
    let outside = BRACKETED_REGEX.replace_all(&text, " ");
    let mut candidates: Vec<String> = outside.split(['=', '/']).map(str::to_string).collect();
    candidates.append(&mut parts);

    candidates
        .iter()
        .map(|part| normalize_candidate(part))
        .filter(|s| !s.is_empty())
        .unique()
        .collect()
}

fn normalize_candidate(part: &str) -> String {
    let mut s = part.trim().to_string();
    loop {
        let next = TRAILING_PARENTHETICAL_REGEX.replace(&s, "").to_string();
        if next == s {
            break;
        }
        s = next;
    }
    let s = s.split(':').next().unwrap_or_default();
    let s = SUPPLEMENT_REGEX.replace(s, "");

    let mut s = s.to_lowercase().replace('&', " and ");
    for (british, american) in SPELLING_VARIANTS {
        s = s.replace(british, american);
    }
    let spaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let collapsed = collapse_whitespace(&spaced);
    let mut words: Vec<String> = collapsed
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(expand_irregular)
        .collect();
    while words.len() > 1 && words[0] == "the" {
        words.remove(0);
    }

    // "j a m a" from "J.A.M.A."
    if words.len() > 1 && words.iter().all(|w| w.chars().count() == 1) {
        return words.concat();
    }
    words.join(" ")
}

fn expand_irregular(word: &str) -> String {
    IRREGULAR_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == word)
        .map_or_else(|| word.to_string(), |(_, full)| full.to_string())
}

fn is_filler(word: &str) -> bool {
    FILLER_WORDS.contains(&word)
}

/// Whether `short` abbreviates `long`: every significant word of `short` is a prefix of
/// the corresponding significant word of `long`, in order, with filler words ignored
/// on both sides and no significant word left over.
pub(crate) fn is_abbreviation_of(short: &str, long: &str) -> bool {
    let short_words: Vec<&str> = short.split(' ').filter(|w| !is_filler(w)).collect();
    let long_words: Vec<&str> = long.split(' ').filter(|w| !is_filler(w)).collect();
    if short_words.is_empty() || short_words.len() != long_words.len() {
        return false;
    }
    short_words
        .iter()
        .zip(&long_words)
        .all(|(s, l)| l.starts_with(s))
}

/// Whether `acronym` spells the initials of `long`'s significant words ("bmj" for
/// "british medical journal"). Acronyms of four or more letters may also cover just the
/// leading words ("pnas" for the full Proceedings of the National Academy title).
pub(crate) fn is_acronym_of(acronym: &str, long: &str) -> bool {
    let letters: Vec<char> = acronym.chars().collect();
    if letters.len() < 2 || acronym.contains(' ') || !acronym.chars().all(|c| c.is_alphabetic()) {
        return false;
    }
    let initials: Vec<char> = long
        .split(' ')
        .filter(|w| !is_filler(w))
        .filter_map(|w| w.chars().next())
        .collect();
    if initials.len() < 2 {
        return false;
    }
    if letters.len() == initials.len() {
        return letters == initials;
    }
    letters.len() >= 4 && letters.len() < initials.len() && initials.starts_with(&letters)
}
