//! Serializable fuzzy-match index.
//!
//! The index stores every searchable field pre-normalized together with its
//! length norm, so loading it at start-up is a plain deserialize rather than a
//! pass over the whole corpus.

use super::tokenize::{normalize, token_count};
use crate::types::{Field, SearchDocument};
use serde::{Deserialize, Serialize};

/// Bumped whenever the on-disk layout changes.
pub(crate) const INDEX_VERSION: u32 = 1;

/// Fields written into the index by the builder.
pub const INDEXED_FIELDS: &[Field] = &[
    Field::Name,
    Field::Title,
    Field::Description,
    Field::Category,
    Field::Keywords,
    Field::Content,
];

/// One normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedValue {
    /// Lowercased text, character-aligned with the original value.
    #[serde(rename = "v")]
    pub text: String,
    /// Field length norm, `1 / sqrt(token count)`.
    #[serde(rename = "n")]
    pub norm: f64,
}

impl IndexedValue {
    fn new(text: &str) -> Self {
        Self {
            text: normalize(text),
            norm: 1.0 / (token_count(text) as f64).sqrt(),
        }
    }
}

/// All indexed values for a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Position of the document in `documents.json`.
    #[serde(rename = "i")]
    pub doc: usize,
    /// One entry per `FuzzyIndex::keys`; multi-valued fields hold several values.
    #[serde(rename = "$")]
    pub values: Vec<Vec<IndexedValue>>,
}

/// The persisted fuzzy index (`fuse-index.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyIndex {
    pub version: u32,
    pub keys: Vec<Field>,
    pub records: Vec<IndexRecord>,
}

impl FuzzyIndex {
    /// Builds the index over `documents`, in order, for [`INDEXED_FIELDS`].
    pub fn build(documents: &[SearchDocument]) -> Self {
        let records = documents
            .iter()
            .enumerate()
            .map(|(doc, document)| IndexRecord {
                doc,
                values: INDEXED_FIELDS
                    .iter()
                    .map(|&field| field_values(document, field))
                    .collect(),
            })
            .collect();

        Self {
            version: INDEX_VERSION,
            keys: INDEXED_FIELDS.to_vec(),
            records,
        }
    }

    /// Column of `field` in each record, if indexed.
    pub fn key_position(&self, field: Field) -> Option<usize> {
        self.keys.iter().position(|&k| k == field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn field_values(document: &SearchDocument, field: Field) -> Vec<IndexedValue> {
    match field {
        Field::Keywords => document
            .keywords
            .iter()
            .map(|keyword| IndexedValue::new(keyword))
            .collect(),
        _ => {
            let text = document.field_text(field);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![IndexedValue::new(&text)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    fn doc(name: &str, title: &str) -> SearchDocument {
        SearchDocument {
            id: SearchDocument::make_id(name, 1),
            name: name.into(),
            section: 1,
            title: title.into(),
            description: String::new(),
            category: "general".into(),
            keywords: vec![name.into(), "extra".into()],
            content: title.into(),
            is_common: false,
            examples: vec![],
        }
    }

    #[test]
    fn test_records_follow_document_order() {
        let index = FuzzyIndex::build(&[doc("ls", "List"), doc("cp", "Copy")]);
        check!(index.len() == 2);
        check!(index.records[1].doc == 1);
        check!(index.keys == INDEXED_FIELDS);
    }

    #[test]
    fn test_values_are_normalized() {
        let index = FuzzyIndex::build(&[doc("LS", "List Directory Contents")]);
        let title = index.key_position(Field::Title).unwrap();
        let value = &index.records[0].values[title][0];
        check!(value.text == "list directory contents");
        check!((value.norm - 1.0 / 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_keywords_are_multi_valued_and_empty_fields_skipped() {
        let index = FuzzyIndex::build(&[doc("ls", "List")]);
        let keywords = index.key_position(Field::Keywords).unwrap();
        let description = index.key_position(Field::Description).unwrap();
        check!(index.records[0].values[keywords].len() == 2);
        check!(index.records[0].values[description].is_empty());
    }

    #[test]
    fn test_round_trips_through_json() {
        let index = FuzzyIndex::build(&[doc("ls", "List")]);
        let json = serde_json::to_string(&index).unwrap();
        check!(json.contains(r#""keys":["name","title","description","category","keywords","content"]"#));
        let restored: FuzzyIndex = serde_json::from_str(&json).unwrap();
        check!(restored == index);
    }
}
