//! CSV input adapter.
//!
//! Turns a tabular export into [`RawCitation`]s. Columns are matched to citation fields
//! through case-insensitive header aliases; cells of multi-valued fields (authors, DOIs,
//! URLs, ISSNs) are split on `;`. Values are passed on as written: all normalization
//! happens in the deduplicator.
//!
//! # Example
//!
//! ```
//! use citedupe::CsvLoader;
//!
//! let input = "Id,Title,Author,Year\n1,Example Paper,\"Smith, J; Doe, Jane\",2023";
//!
//! let citations = CsvLoader::new().load(input).unwrap();
//! assert_eq!(citations[0].id.as_deref(), Some("1"));
//! assert_eq!(citations[0].authors, vec!["Smith, J", "Doe, Jane"]);
//! ```

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io;
use tracing::debug;

use crate::{RawCitation, Result};

/// Default header aliases for common CSV column names
const DEFAULT_HEADERS: &[(&str, &[&str])] = &[
    ("id", &["id", "citation_id", "record_id", "record number"]),
    ("title", &["title", "article title", "publication title", "ti"]),
    ("authors", &["author", "authors", "creator", "creators", "au"]),
    (
        "journal",
        &[
            "journal",
            "journal title",
            "source title",
            "publication",
            "secondary title",
            "journal abbreviation",
            "alternate title",
            "t2",
            "j2",
        ],
    ),
    ("year", &["year", "publication year", "pub year", "py"]),
    ("pages", &["pages", "page numbers", "page range", "sp"]),
    ("secondary_pages", &["start page", "secondary pages"]),
    ("article_number", &["article number", "article no", "c7"]),
    ("doi", &["doi", "digital object identifier", "do"]),
    ("url", &["url", "link", "web link", "ur"]),
    ("issn", &["issn", "isbn", "issn/isbn", "sn"]),
    ("type", &["type", "reference type", "publication type", "ty"]),
];

/// Configuration for CSV loading with custom header mappings.
///
/// # Examples
///
/// ```
/// use citedupe::csv::CsvConfig;
///
/// let mut config = CsvConfig::new();
/// config.set_header_mapping("title", vec!["Article Name".to_string()]);
/// config.set_delimiter(b';');
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Header aliases per citation field
    header_map: HashMap<String, Vec<String>>,
    delimiter: u8,
    has_header: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvConfig {
    /// Creates a configuration with the default aliases, comma-delimited, with a header row.
    #[must_use]
    pub fn new() -> Self {
        let header_map = DEFAULT_HEADERS
            .iter()
            .map(|(field, aliases)| {
                (
                    field.to_string(),
                    aliases.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self {
            header_map,
            delimiter: b',',
            has_header: true,
        }
    }

    /// Replaces the aliases of a field.
    pub fn set_header_mapping(&mut self, field: &str, aliases: Vec<String>) -> &mut Self {
        self.header_map.insert(field.to_string(), aliases);
        self
    }

    pub fn set_delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Without a header row columns are named `Column1`, `Column2` and so on, which can
    /// be mapped like any other header.
    pub fn set_has_header(&mut self, has_header: bool) -> &mut Self {
        self.has_header = has_header;
        self
    }

    fn field_for_header(&self, header: &str) -> Option<&str> {
        let header = header.trim().to_lowercase();
        self.header_map
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.to_lowercase() == header))
            .map(|(field, _)| field.as_str())
    }
}

/// Loader for CSV citation exports.
///
/// ```
/// use citedupe::csv::{CsvConfig, CsvLoader};
///
/// let mut config = CsvConfig::new();
/// config.set_delimiter(b'\t');
///
/// let loader = CsvLoader::new().with_config(config);
/// let citations = loader.load("ID\tTitle\n7\tExample Paper").unwrap();
/// assert_eq!(citations[0].titles, vec!["Example Paper"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    config: CsvConfig,
}

impl CsvLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CsvConfig::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads every row of `input`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CitationError::InvalidFormat`] for malformed CSV.
    pub fn load(&self, input: &str) -> Result<Vec<RawCitation>> {
        self.load_reader(input.as_bytes())
    }

    /// Loads every row read from `reader`.
    pub fn load_reader<R: io::Read>(&self, reader: R) -> Result<Vec<RawCitation>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(self.config.has_header)
            .from_reader(reader);

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(String::from).collect()
        } else {
            (0..reader.headers()?.len())
                .map(|i| format!("Column{}", i + 1))
                .collect()
        };
        let fields: Vec<Option<&str>> = headers
            .iter()
            .map(|h| self.config.field_for_header(h))
            .collect();
        for (header, _) in headers.iter().zip(&fields).filter(|(_, f)| f.is_none()) {
            debug!(header = header.as_str(), "unmapped CSV column ignored");
        }

        let mut citations = Vec::new();
        for record in reader.records() {
            citations.push(citation_from_record(&fields, &record?));
        }
        debug!(citations = citations.len(), "loaded CSV citations");
        Ok(citations)
    }
}

fn citation_from_record(fields: &[Option<&str>], record: &StringRecord) -> RawCitation {
    let mut citation = RawCitation::default();

    for (field, value) in fields.iter().zip(record.iter()) {
        let value = value.trim();
        let Some(field) = field else { continue };
        if value.is_empty() {
            continue;
        }

        match *field {
            "id" => citation.id = Some(value.to_string()),
            "title" => citation.titles.push(value.to_string()),
            "authors" => citation.authors.extend(split_values(value)),
            "journal" => citation.journals.push(value.to_string()),
            "year" => citation.year = Some(value.to_string()),
            "pages" => citation.pages.primary = Some(value.to_string()),
            "secondary_pages" => citation.pages.secondary = Some(value.to_string()),
            "article_number" => citation.pages.article_number = Some(value.to_string()),
            "doi" | "url" => citation.dois.extend(split_values(value)),
            "issn" => citation.issns.extend(split_values(value)),
            "type" => citation.reference_type = Some(value.to_string()),
            _ => {}
        }
    }
    citation
}

fn split_values(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
