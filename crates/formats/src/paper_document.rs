use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One category membership as written by the classification job.
///
/// Both fields may be missing or `null`; ingestion drops nameless entries
/// and scores a missing score as zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CategoryRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl CategoryRecord {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: Some(name.into()),
            score: Some(score),
        }
    }
}

/// A paper entry as it appears on the wire.
///
/// `doi` and `point` are loosely typed here, `null` included; ingestion
/// decides whether the record is usable so a single bad record does not
/// reject the whole document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default)]
    pub point: Value,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub categories: Vec<CategoryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl PaperRecord {
    /// The DOI, or `""` when the record has none.
    pub fn doi(&self) -> &str {
        self.doi.as_deref().unwrap_or_default()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The embedding document: papers in load order plus optional means.
///
/// Accepts both the wrapped form `{ "papers": [...], "means": [x, y, z] }`
/// and the bare array written by the embedding export job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "DocumentRepr")]
pub struct PaperDocument {
    pub papers: Vec<PaperRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub means: Option<[f64; 3]>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentRepr {
    Wrapped {
        papers: Vec<PaperRecord>,
        #[serde(default)]
        means: Option<[f64; 3]>,
    },
    Bare(Vec<PaperRecord>),
}

impl From<DocumentRepr> for PaperDocument {
    fn from(repr: DocumentRepr) -> Self {
        match repr {
            DocumentRepr::Wrapped { papers, means } => Self { papers, means },
            DocumentRepr::Bare(papers) => Self {
                papers,
                means: None,
            },
        }
    }
}

#[derive(Debug)]
pub enum PaperDocumentError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for PaperDocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperDocumentError::Io(err) => write!(f, "I/O error: {err}"),
            PaperDocumentError::Parse(err) => write!(f, "paper document parse error: {err}"),
        }
    }
}

impl std::error::Error for PaperDocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PaperDocumentError::Io(err) => Some(err),
            PaperDocumentError::Parse(err) => Some(err),
        }
    }
}

impl PaperDocument {
    pub fn from_json_str(payload: &str) -> Result<Self, PaperDocumentError> {
        serde_json::from_str(payload).map_err(PaperDocumentError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PaperDocumentError> {
        let payload = fs::read_to_string(path).map_err(PaperDocumentError::Io)?;
        Self::from_json_str(&payload)
    }

    pub fn to_json_string(&self) -> Result<String, PaperDocumentError> {
        serde_json::to_string_pretty(self).map_err(PaperDocumentError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryRecord, PaperDocument, PaperDocumentError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_wrapped_document_with_means() {
        let doc = PaperDocument::from_json_str(
            r#"{
                "papers": [
                    {"doi": "10.1/a", "point": [1, 2, 3],
                     "categories": [{"name": "treatment", "score": 0.7}],
                     "title": "A", "published_at": "2020-04-01"}
                ],
                "means": [0.5, 0.5, 0.5]
            }"#,
        )
        .expect("parse");

        assert_eq!(doc.means, Some([0.5, 0.5, 0.5]));
        assert_eq!(doc.papers.len(), 1);
        let paper = &doc.papers[0];
        assert_eq!(paper.doi(), "10.1/a");
        assert_eq!(paper.point, json!([1, 2, 3]));
        assert_eq!(
            paper.categories,
            vec![CategoryRecord::new("treatment", 0.7)]
        );
        assert_eq!(paper.title.as_deref(), Some("A"));
        assert_eq!(paper.published_at.as_deref(), Some("2020-04-01"));
    }

    #[test]
    fn parses_bare_export_array() {
        let doc = PaperDocument::from_json_str(
            r#"[{"doi": "x", "point": [0.1, 0.2, 0.3]}, {"doi": "y", "point": [1, 1, 1]}]"#,
        )
        .expect("parse");
        assert_eq!(doc.means, None);
        assert_eq!(
            doc.papers.iter().map(|p| p.doi()).collect::<Vec<_>>(),
            vec!["x", "y"]
        );
        assert!(doc.papers[0].categories.is_empty());
    }

    #[test]
    fn null_fields_stay_inside_their_record() {
        let doc = PaperDocument::from_json_str(
            r#"[
                {"doi": null, "point": [0, 0, 0]},
                {"doi": "x", "point": [1, 1, 1], "categories": null},
                {"doi": "y", "point": [2, 2, 2],
                 "categories": [{"name": null, "score": 0.4}, {"name": "z", "score": null}]}
            ]"#,
        )
        .expect("parse");
        assert_eq!(doc.papers.len(), 3);
        assert_eq!(doc.papers[0].doi, None);
        assert_eq!(doc.papers[0].doi(), "");
        assert!(doc.papers[1].categories.is_empty());
        assert_eq!(
            doc.papers[2].categories,
            vec![
                CategoryRecord {
                    name: None,
                    score: Some(0.4)
                },
                CategoryRecord {
                    name: Some("z".to_string()),
                    score: None
                },
            ]
        );
    }

    #[test]
    fn rejects_non_document_json() {
        let err = PaperDocument::from_json_str(r#"{"rows": []}"#).expect_err("not a document");
        assert!(matches!(err, PaperDocumentError::Parse(_)));
        let err = PaperDocument::load("/nonexistent/embeddings.json").expect_err("missing file");
        assert!(matches!(err, PaperDocumentError::Io(_)));
    }

    #[test]
    fn serializes_back_to_wrapped_form() {
        let doc = PaperDocument::from_json_str(r#"[{"doi": "x", "point": [1, 2, 3]}]"#)
            .expect("parse");
        let text = doc.to_json_string().expect("serialize");
        let again = PaperDocument::from_json_str(&text).expect("reparse");
        assert_eq!(again, doc);
        assert!(text.contains("\"papers\""));
    }
}
