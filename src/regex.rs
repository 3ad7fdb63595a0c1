//! Re-exports from either `regex` or `regex_lite`, depending on features.
//!
//! Every pattern in the crate sticks to the syntax both engines understand: `(?i)`,
//! `\b`, `\s` and no look-around. Digits and letters are spelled as explicit ASCII
//! ranges (`[0-9]`, `[A-Za-z]`), never `\d` or `\w`, so identifiers, years and page
//! numerals match the same text under both. `\b` and `\s` keep each engine's own
//! definition: Unicode-aware under `regex`, ASCII-only under `regex-lite`.

#[cfg(feature = "lite")]
pub(crate) use regex_lite::{Captures, Regex};
#[cfg(all(feature = "regex", not(feature = "lite")))]
pub(crate) use regex::{Captures, Regex};

#[cfg(not(any(feature = "regex", feature = "lite")))]
compile_error!("citedupe requires the \"regex\" or \"lite\" feature to be enabled");
