//! OpenAlex work metadata

use super::WorkId;
use crate::resolver;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open-access summary of a work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAccess {
    pub is_oa: Option<bool>,
    pub oa_status: Option<String>,
    pub oa_url: Option<String>,
    pub any_repository_has_fulltext: Option<bool>,
}

/// A location hosting a copy of the work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OaLocation {
    pub is_oa: Option<bool>,
    pub landing_page_url: Option<String>,
    pub pdf_url: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
}

/// Metadata snapshot for one work
///
/// Only the fields the crawler reads are typed; everything else the API
/// returns (authorships, concepts, counts by year, ...) is kept verbatim in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    /// Identifier as returned by the API (usually the full URL form)
    pub id: String,

    pub title: Option<String>,

    pub display_name: Option<String>,

    pub doi: Option<String>,

    pub cited_by_count: Option<u64>,

    pub publication_year: Option<i32>,

    pub open_access: Option<OpenAccess>,

    pub best_oa_location: Option<OaLocation>,

    #[serde(default)]
    pub referenced_works: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkRecord {
    /// Canonical identifier of this work, if the API id is well formed
    pub fn work_id(&self) -> Option<WorkId> {
        resolver::normalize_work(&self.id).ok()
    }

    /// DOI without its resolver prefix (`10.xxxx/...`)
    pub fn bare_doi(&self) -> Option<&str> {
        let doi = self.doi.as_deref()?.trim();
        let bare = ["https://doi.org/", "http://doi.org/", "doi.org/"]
            .iter()
            .find_map(|prefix| doi.strip_prefix(prefix))
            .unwrap_or(doi);
        (!bare.is_empty()).then_some(bare)
    }

    /// Direct PDF link advertised by OpenAlex, if any
    pub fn pdf_url(&self) -> Option<&str> {
        self.best_oa_location.as_ref()?.pdf_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": "https://openalex.org/W2741809807",
            "doi": "https://doi.org/10.7717/peerj.4375",
            "title": "The state of OA: a large-scale analysis of the prevalence and impact of Open Access articles",
            "display_name": "The state of OA",
            "publication_year": 2018,
            "cited_by_count": 1035,
            "open_access": {"is_oa": true, "oa_status": "gold", "oa_url": "https://peerj.com/articles/4375.pdf", "any_repository_has_fulltext": true},
            "best_oa_location": {"is_oa": true, "landing_page_url": "https://doi.org/10.7717/peerj.4375", "pdf_url": "https://peerj.com/articles/4375.pdf", "license": "cc-by", "version": "publishedVersion"},
            "referenced_works": ["https://openalex.org/W1", "https://openalex.org/W2"],
            "concepts": [{"display_name": "Open access", "level": 2}],
            "authorships": []
        })
    }

    #[test]
    fn test_deserialize_full_record() {
        let work: WorkRecord = serde_json::from_value(sample()).unwrap();
        assert_eq!(work.work_id().unwrap().as_str(), "W2741809807");
        assert_eq!(work.bare_doi(), Some("10.7717/peerj.4375"));
        assert_eq!(work.pdf_url(), Some("https://peerj.com/articles/4375.pdf"));
        assert_eq!(work.cited_by_count, Some(1035));
        assert_eq!(work.open_access.as_ref().and_then(|oa| oa.is_oa), Some(true));
        assert_eq!(work.referenced_works.len(), 2);
        // Untyped fields survive in the passthrough bag
        assert!(work.extra.contains_key("concepts"));
        assert!(work.extra.contains_key("authorships"));
    }

    #[test]
    fn test_minimal_record() {
        let work: WorkRecord = serde_json::from_value(json!({"id": "https://openalex.org/W5"})).unwrap();
        assert_eq!(work.title, None);
        assert_eq!(work.bare_doi(), None);
        assert_eq!(work.pdf_url(), None);
        assert!(work.referenced_works.is_empty());
    }

    #[test]
    fn test_schema_violations_are_rejected() {
        assert!(serde_json::from_value::<WorkRecord>(json!({"title": "no id"})).is_err());
        assert!(serde_json::from_value::<WorkRecord>(json!({"id": 12})).is_err());
        assert!(serde_json::from_value::<WorkRecord>(
            json!({"id": "https://openalex.org/W5", "cited_by_count": "many"})
        )
        .is_err());
    }

    #[test]
    fn test_doi_prefix_variants() {
        let mut work: WorkRecord = serde_json::from_value(json!({"id": "W1"})).unwrap();
        for (doi, bare) in [
            ("https://doi.org/10.1/a", "10.1/a"),
            ("http://doi.org/10.1/b", "10.1/b"),
            ("doi.org/10.1/c", "10.1/c"),
            ("10.1/d", "10.1/d"),
        ] {
            work.doi = Some(doi.to_string());
            assert_eq!(work.bare_doi(), Some(bare));
        }
    }
}
