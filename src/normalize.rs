//! Field normalization.
//!
//! Pure functions turning raw export fields into the canonical forms the comparator
//! works on. Every function here is total: malformed input degrades to an empty or
//! partial value, never to an error.
//!
//! | Field | Entry point |
//! |-------|-------------|
//! | title | [`title::title_forms`], [`title::normalize_title`] |
//! | journal | [`journal::journal_variants`], [`journal::normalize_journal`] |
//! | author | [`author::author_forms`], [`author::author_key`] |
//! | pages | [`pages::parse_pages`], [`pages::parse_page_field`] |
//! | DOI, ISSN/ISBN | [`identifiers::extract_dois`], [`identifiers::extract_issns`] |
//!
//! All compiled patterns live in immutable statics, so concurrent runs share nothing
//! mutable.

pub mod author;
pub mod identifiers;
pub mod journal;
pub mod pages;
pub mod title;

pub use author::{AuthorForms, AuthorKey, author_forms, author_key};
pub use identifiers::{extract_dois, extract_issns, normalize_doi};
pub use journal::{journal_variants, normalize_journal};
pub use pages::{PageInfo, parse_page_field, parse_pages};
pub use title::{TitleForms, normalize_title, title_forms};
