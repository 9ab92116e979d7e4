use foundation::math::Vec3;
use scene::paper::{CategoryScore, Paper, PaperSet};
use serde_json::Value;
use tracing::warn;

use crate::paper_document::{PaperDocument, PaperRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingDoi,
    /// Not exactly three finite numbers.
    MalformedPoint,
    DuplicateDoi,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingDoi => write!(f, "missing doi"),
            SkipReason::MalformedPoint => write!(f, "point is not three finite numbers"),
            SkipReason::DuplicateDoi => write!(f, "duplicate doi"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Position in the source document.
    pub index: usize,
    pub doi: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// A document turned into scene papers.
#[derive(Debug, Clone, Default)]
pub struct LoadedPapers {
    pub papers: PaperSet,
    pub means: Option<Vec3>,
    pub report: IngestReport,
}

/// Converts every usable record, in document order.
///
/// Unusable records are skipped and listed in the report rather than
/// failing the load. Accepted papers keep their relative order, so the
/// index of a paper in the result is its mesh and atlas index.
pub fn ingest_document(doc: &PaperDocument) -> LoadedPapers {
    let mut papers = PaperSet::new();
    let mut report = IngestReport::default();

    for (index, record) in doc.papers.iter().enumerate() {
        let outcome = paper_from_record(record).and_then(|paper| {
            papers
                .push(paper)
                .map(|_| ())
                .map_err(|_| SkipReason::DuplicateDoi)
        });
        match outcome {
            Ok(()) => report.accepted += 1,
            Err(reason) => {
                warn!(index, doi = record.doi(), %reason, "skipping paper record");
                report.skipped.push(SkippedRecord {
                    index,
                    doi: record.doi().to_string(),
                    reason,
                });
            }
        }
    }

    let means = doc
        .means
        .map(Vec3::from_array)
        .filter(|m| m.is_finite());

    LoadedPapers {
        papers,
        means,
        report,
    }
}

fn paper_from_record(record: &PaperRecord) -> Result<Paper, SkipReason> {
    let doi = record.doi();
    if doi.trim().is_empty() {
        return Err(SkipReason::MissingDoi);
    }
    let point = parse_point(&record.point).ok_or(SkipReason::MalformedPoint)?;

    let mut paper = Paper::new(doi, point);
    paper.categories = record
        .categories
        .iter()
        .filter_map(|c| {
            let name = c.name.as_deref()?;
            Some(CategoryScore::new(name, c.score.unwrap_or(0.0)))
        })
        .collect();
    paper.title = record.title.clone();
    paper.published_at = record.published_at.clone();
    Ok(paper)
}

fn parse_point(value: &Value) -> Option<Vec3> {
    let [x, y, z] = value.as_array()?.as_slice() else {
        return None;
    };
    let p = Vec3::new(x.as_f64()?, y.as_f64()?, z.as_f64()?);
    p.is_finite().then_some(p)
}

#[cfg(test)]
mod tests {
    use super::{IngestReport, SkipReason, SkippedRecord, ingest_document};
    use crate::paper_document::PaperDocument;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_document_order_and_fields() {
        let doc = PaperDocument::from_json_str(
            r#"{"papers": [
                {"doi": "b", "point": [1, 2, 3], "title": "B",
                 "categories": [{"name": "x", "score": 0.2}, {"name": "y", "score": 0.9}]},
                {"doi": "a", "point": [4.5, 5, 6]}
            ], "means": [1, 1, 1]}"#,
        )
        .expect("parse");
        let loaded = ingest_document(&doc);

        assert!(loaded.report.is_clean());
        assert_eq!(loaded.papers.len(), 2);
        assert_eq!(loaded.papers.index_of("a"), Some(1));
        let b = loaded.papers.get(0).expect("paper b");
        assert_eq!(b.point, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.dominant_category(), Some("y"));
        assert_eq!(b.title.as_deref(), Some("B"));
        assert_eq!(loaded.means, Some(Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn skips_bad_records_and_reports_them() {
        let doc = PaperDocument::from_json_str(
            r#"[
                {"doi": "ok", "point": [0, 0, 0]},
                {"doi": "short", "point": [0, 0]},
                {"doi": "long", "point": [0, 0, 0, 0]},
                {"doi": "text", "point": ["0", 0, 0]},
                {"doi": "none"},
                {"doi": "", "point": [1, 1, 1]},
                {"doi": "ok", "point": [2, 2, 2]},
                {"doi": "last", "point": [3, 3, 3]}
            ]"#,
        )
        .expect("parse");
        let loaded = ingest_document(&doc);

        let skipped = |index: usize, doi: &str, reason| SkippedRecord {
            index,
            doi: doi.to_string(),
            reason,
        };
        assert_eq!(
            loaded.report,
            IngestReport {
                accepted: 2,
                skipped: vec![
                    skipped(1, "short", SkipReason::MalformedPoint),
                    skipped(2, "long", SkipReason::MalformedPoint),
                    skipped(3, "text", SkipReason::MalformedPoint),
                    skipped(4, "none", SkipReason::MalformedPoint),
                    skipped(5, "", SkipReason::MissingDoi),
                    skipped(6, "ok", SkipReason::DuplicateDoi),
                ],
            }
        );
        // The first "ok" wins and later papers close the gap.
        assert_eq!(loaded.papers.get(0).map(|p| p.point), Some(Vec3::ZERO));
        assert_eq!(loaded.papers.index_of("last"), Some(1));
    }

    #[test]
    fn null_doi_skips_only_that_record() {
        let doc = PaperDocument::from_json_str(
            r#"[
                {"doi": null, "point": [0, 0, 0]},
                {"doi": "kept", "point": [1, 1, 1],
                 "categories": [{"name": null, "score": 0.9}, {"name": "a", "score": null}]}
            ]"#,
        )
        .expect("parse");
        let loaded = ingest_document(&doc);

        assert_eq!(loaded.report.accepted, 1);
        assert_eq!(
            loaded.report.skipped,
            vec![SkippedRecord {
                index: 0,
                doi: String::new(),
                reason: SkipReason::MissingDoi,
            }]
        );
        let kept = loaded.papers.get(0).expect("kept paper");
        assert_eq!(kept.doi, "kept");
        assert_eq!(kept.categories.len(), 1);
        assert_eq!(kept.dominant_category(), Some("a"));
    }

    #[test]
    fn loads_fixture_document() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../apps/viewer_web/assets/embeddings_3d.json");
        let doc = PaperDocument::load(path).expect("load fixture");
        let loaded = ingest_document(&doc);
        assert!(loaded.report.is_clean());
        assert_eq!(loaded.papers.len(), doc.papers.len());
        assert!(loaded.means.is_some());
    }
}
