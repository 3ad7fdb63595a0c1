//! Author name normalization.
//!
//! Each author is reduced to a "Surname INITIALS" key. Compound surnames are ambiguous:
//! "Cobos Mateos, J. M." may be filed under "Cobos Mateos" in one export and under
//! "Mateos" with "Cobos" folded into the given names in another, so such names also get
//! a transposed key.

use crate::regex::Regex;
use crate::utils::{collapse_whitespace, convert_unicode_escapes, decode_html_entities, fold_accents};
use std::sync::LazyLock;

static SKIP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:anonymous|anon\.?|n/?a|et\.? ?al\.?|\[?no authors? listed\]?)$|\b(?:groups?|consortium|collaborat[a-z]*|investigators?|committee|study|trial|trialists|network|working party|task force|society|association|organi[sz]ation|institute)\b",
    )
    .unwrap()
});

const GENERATIONAL_SUFFIXES: [&str; 5] = ["jr", "sr", "ii", "iii", "iv"];

/// Normalized key of one author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorKey {
    /// "Surname INITIALS"
    pub plain: String,
    /// Key with the last surname token as the surname; only for compound surnames
    pub transposed: Option<String>,
}

/// The comparison forms of a record's author list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorForms {
    pub keys: Vec<String>,
    /// Same length as `keys`; the transposed key where one exists, the plain key otherwise
    pub keys_transposed: Vec<String>,
    /// Whole-list strings: the plain list, then the transposed list when any author needed it.
    /// Empty when no author produced a key.
    pub joined: Vec<String>,
    pub transposition_needed: bool,
    /// Whether the record carried any author text at all, usable or not
    pub has_raw_authors: bool,
}

/// Normalizes a record's author list.
pub fn author_forms(authors: &[String]) -> AuthorForms {
    let has_raw_authors = authors.iter().any(|a| !a.trim().is_empty());
    let keys: Vec<AuthorKey> = authors.iter().filter_map(|a| author_key(a)).collect();
    let transposition_needed = keys.iter().any(|k| k.transposed.is_some());

    let plain: Vec<String> = keys.iter().map(|k| k.plain.clone()).collect();
    let transposed: Vec<String> = keys
        .iter()
        .map(|k| k.transposed.clone().unwrap_or_else(|| k.plain.clone()))
        .collect();

    let mut joined = Vec::new();
    if !plain.is_empty() {
        joined.push(plain.join("; "));
        if transposition_needed {
            joined.push(transposed.join("; "));
        }
    }

    AuthorForms {
        keys: plain,
        keys_transposed: transposed,
        joined,
        transposition_needed,
        has_raw_authors,
    }
}

/// Normalizes one author string, `None` for anonymous and group authors.
///
/// ```
/// use citedupe::normalize::author_key;
///
/// let key = author_key("Cobos Mateos, J. M.").unwrap();
/// assert_eq!(key.plain, "Cobos Mateos JM");
/// assert_eq!(key.transposed.as_deref(), Some("Mateos JMC"));
/// ```
pub fn author_key(raw: &str) -> Option<AuthorKey> {
    let text = collapse_whitespace(&fold_accents(&decode_html_entities(
        &convert_unicode_escapes(raw),
    )));
    if text.is_empty() || SKIP_REGEX.is_match(&text) {
        return None;
    }

    let (surname, given) = split_name(&text);
    let surname = clean_surname(&surname);
    if surname.is_empty() {
        return None;
    }
    let initials = initials_of(&given);

    let transposed = transpose(&surname, &initials);
    Some(AuthorKey {
        plain: join_key(&surname, &initials),
        transposed,
    })
}

/// Splits on the first comma. Without one, a short all-caps trailing token ("Smith JA")
/// is read as initials; otherwise the whole string is the surname.
fn split_name(text: &str) -> (String, String) {
    if let Some((surname, given)) = text.split_once(',') {
        return (surname.trim().to_string(), given.trim().to_string());
    }
    let tokens: Vec<&str> = text.split(' ').collect();
    if let [head @ .., last] = tokens.as_slice() {
        let letters: String = last.chars().filter(|c| *c != '.').collect();
        if !head.is_empty()
            && !letters.is_empty()
            && letters.chars().count() <= 4
            && letters.chars().all(|c| c.is_ascii_uppercase())
        {
            return (head.join(" "), letters);
        }
    }
    (text.to_string(), String::new())
}

fn clean_surname(surname: &str) -> String {
    let kept: String = surname
        .chars()
        .filter(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\''))
        .collect();
    collapse_whitespace(&kept)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn initials_of(given: &str) -> String {
    let mut initials = String::new();
    for piece in given.split([' ', '.', '-']).filter(|p| !p.is_empty()) {
        let letters: Vec<char> = piece.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            continue;
        }
        // "JM" is two initials, "John" is one
        if letters.len() <= 3 && letters.iter().all(|c| c.is_uppercase()) {
            initials.extend(letters);
        } else {
            initials.extend(letters[0].to_uppercase());
        }
    }
    initials
}

fn transpose(surname: &str, initials: &str) -> Option<String> {
    let mut tokens: Vec<&str> = surname.split(' ').collect();
    if tokens.len() < 2 {
        return None;
    }
    if let Some(last) = tokens.last() {
        let bare = last.trim_end_matches('.').to_lowercase();
        if GENERATIONAL_SUFFIXES.contains(&bare.as_str()) {
            tokens.pop();
        }
    }
    let (last, preceding) = tokens.split_last()?;
    let folded: String = preceding
        .iter()
        .filter_map(|t| t.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    Some(join_key(last, &format!("{initials}{folded}")))
}

fn join_key(surname: &str, initials: &str) -> String {
    if initials.is_empty() {
        surname.to_string()
    } else {
        format!("{surname} {initials}")
    }
}
