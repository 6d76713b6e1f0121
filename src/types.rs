//! Core data model shared by the builder, the engine and the search client.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One searchable manual page, keyed by `(name, section)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    /// `"<name>.<section>"`; always derived via [`SearchDocument::make_id`].
    pub id: String,
    pub name: String,
    pub section: u32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub content: String,
    pub is_common: bool,
    pub examples: Vec<String>,
}

impl SearchDocument {
    /// Derive the document id from its name and section.
    pub fn make_id(name: &str, section: u32) -> String {
        format!("{}.{}", name, section)
    }

    /// Value of a single-valued field. `Keywords` joins with spaces.
    pub fn field_text(&self, field: Field) -> std::borrow::Cow<'_, str> {
        use std::borrow::Cow;
        match field {
            Field::Name => Cow::Borrowed(&self.name),
            Field::Title => Cow::Borrowed(&self.title),
            Field::Description => Cow::Borrowed(&self.description),
            Field::Category => Cow::Borrowed(&self.category),
            Field::Content => Cow::Borrowed(&self.content),
            Field::Keywords => Cow::Owned(self.keywords.join(" ")),
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// Lightweight listing form used by the category and common-command artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
}

/// Document fields the fuzzy index knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Title,
    Description,
    Category,
    Keywords,
    Content,
}

impl Field {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Title => "title",
            Self::Description => "description",
            Self::Category => "category",
            Self::Keywords => "keywords",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snippets grouped by field name, in match order.
pub type Highlights = BTreeMap<String, Vec<String>>;

/// A document matched by a query, with its relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub document: SearchDocument,
    /// 1.0 is a perfect match, 0.0 the worst.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Highlights>,
}

/// Parameters of one search, mirroring `GET /api/search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub section: Option<u32>,
    pub limit: usize,
    /// Allow the local fuzzy tier when the remote answers with nothing.
    pub fuzzy: bool,
    pub threshold: f64,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into().trim().to_string(),
            section: None,
            limit: 10,
            fuzzy: true,
            threshold: 0.3,
        }
    }

    #[must_use]
    pub const fn section(mut self, section: u32) -> Self {
        self.section = Some(section);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    #[must_use]
    pub const fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Cache key covering every parameter that changes the answer.
    ///
    /// The query is percent-encoded so it cannot spill into the other fields.
    pub fn cache_key(&self) -> String {
        format!(
            "search?q={}&section={}&limit={}&fuzzy={}&threshold={}",
            utf8_percent_encode(&self.query, NON_ALPHANUMERIC),
            self.section.map(|s| s.to_string()).unwrap_or_default(),
            self.limit,
            self.fuzzy,
            self.threshold
        )
    }

    /// Whether a result passes the section post-filter.
    pub fn accepts_section(&self, section: u32) -> bool {
        self.section.is_none_or(|wanted| wanted == section)
    }
}

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Remote,
    /// Local fuzzy fallback; results carry lower confidence.
    Fuzzy,
    /// Nothing could answer the query.
    #[default]
    None,
}

/// The body of `GET /api/search`, plus the tier that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    #[serde(default)]
    pub source: ResultSource,
}

impl SearchResponse {
    pub const fn empty() -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            source: ResultSource::None,
        }
    }

    /// Whether the results came from the degraded local tier.
    pub fn is_fuzzy(&self) -> bool {
        self.source == ResultSource::Fuzzy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    fn doc() -> SearchDocument {
        SearchDocument {
            id: SearchDocument::make_id("ls", 1),
            name: "ls".into(),
            section: 1,
            title: "list directory contents".into(),
            description: "List information about the FILEs".into(),
            category: "file-management".into(),
            keywords: vec!["ls".into(), "list".into()],
            content: "list directory contents".into(),
            is_common: true,
            examples: vec!["ls -la".into()],
        }
    }

    #[test]
    fn test_id_format() {
        check!(SearchDocument::make_id("git-commit", 1) == "git-commit.1");
    }

    #[test]
    fn test_document_json_uses_camel_case() {
        let json = serde_json::to_value(doc()).unwrap();
        check!(json["isCommon"] == true);
        check!(json.get("is_common").is_none());
    }

    #[test]
    fn test_result_flattens_document() {
        let result = SearchResult {
            document: doc(),
            score: 0.9,
            highlights: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        check!(json["id"] == "ls.1");
        check!(json["score"] == 0.9);
        check!(json.get("highlights").is_none());
    }

    #[test]
    fn test_response_without_source_defaults_to_none() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"results": [], "total": 0}"#).unwrap();
        check!(response.source == ResultSource::None);
        check!(!response.is_fuzzy());
    }

    #[test]
    fn test_cache_key_covers_parameters() {
        let base = SearchQuery::new("  ls ");
        check!(base.query == "ls");
        check!(base.cache_key() == "search?q=ls&section=&limit=10&fuzzy=true&threshold=0.3");
        check!(base.clone().section(1).cache_key() != base.cache_key());
        check!(base.clone().limit(5).cache_key() != base.cache_key());
        check!(base.clone().fuzzy(false).cache_key() != base.cache_key());
        check!(base.clone().threshold(0.4).cache_key() != base.cache_key());
    }

    #[test]
    fn test_cache_key_encodes_query() {
        let smuggled = SearchQuery::new("ls&section=1");
        let filtered = SearchQuery::new("ls").section(1);
        check!(smuggled.cache_key() != filtered.cache_key());
        check!(smuggled.cache_key().starts_with("search?q=ls%26section%3D1&section=&"));
    }

    #[test]
    fn test_section_filter() {
        let query = SearchQuery::new("ls").section(1);
        check!(query.accepts_section(1));
        check!(!query.accepts_section(8));
        check!(SearchQuery::new("ls").accepts_section(8));
    }

    #[test]
    fn test_keywords_field_text_joins() {
        check!(doc().field_text(Field::Keywords) == "ls list");
    }
}
