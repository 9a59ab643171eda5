//! The curated pathway catalog: hand-maintained links to external
//! guidance pages, matched to queries by plain keyword containment.
//!
//! Pathways complement the vector index: they point at living web pages
//! rather than stored documents, so they are curated in a JSON file
//! instead of being indexed. A missing or malformed catalog downgrades
//! to "no pathways" with a warning; it never blocks retrieval.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PATHWAYS_FILE: &str = "pathways.json";

/// One curated external link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pathway {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Lowercase keywords the catalog author chose for this entry.
    pub keywords: Vec<String>,
}

/// In-memory catalog loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct PathwayCatalog {
    pathways: Vec<Pathway>,
}

impl PathwayCatalog {
    /// Load `pathways.json` from `base`. Any failure yields an empty
    /// catalog; the file is optional.
    pub fn load(base: &Path) -> Self {
        let path = base.join(PATHWAYS_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no pathway catalog");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read pathway catalog");
                return Self::default();
            }
        };
        match serde_json::from_slice::<Vec<Pathway>>(&bytes) {
            Ok(pathways) => {
                debug!(count = pathways.len(), "loaded pathway catalog");
                Self { pathways }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed pathway catalog");
                Self::default()
            }
        }
    }

    pub fn from_pathways(pathways: Vec<Pathway>) -> Self {
        Self { pathways }
    }

    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }

    /// Pathways whose keywords appear in the query (case-insensitive
    /// containment), in catalog order, at most `limit`.
    pub fn matches(&self, query: &str, limit: usize) -> Vec<&Pathway> {
        let query = query.to_lowercase();
        self.pathways
            .iter()
            .filter(|p| {
                p.keywords
                    .iter()
                    .any(|k| !k.is_empty() && query.contains(&k.to_lowercase()))
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pathway(title: &str, keywords: &[&str]) -> Pathway {
        Pathway {
            title: title.to_string(),
            url: format!("https://example.test/{title}"),
            description: String::new(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn matches_by_keyword_containment() {
        let catalog = PathwayCatalog::from_pathways(vec![
            pathway("cv-help", &["cv", "resume"]),
            pathway("budgeting", &["money", "budget"]),
            pathway("wellbeing", &["stress"]),
        ]);

        let hits = catalog.matches("How do I improve my CV and manage my BUDGET?", 5);
        let titles: Vec<&str> = hits.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["cv-help", "budgeting"]);
    }

    #[test]
    fn respects_the_limit_in_catalog_order() {
        let catalog = PathwayCatalog::from_pathways(vec![
            pathway("one", &["help"]),
            pathway("two", &["help"]),
            pathway("three", &["help"]),
        ]);
        let titles: Vec<&str> = catalog
            .matches("help", 2)
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["one", "two"]);
    }

    #[test]
    fn missing_or_malformed_catalog_is_empty() {
        let dir = tempdir().unwrap();
        assert!(PathwayCatalog::load(dir.path()).is_empty());

        std::fs::write(dir.path().join(PATHWAYS_FILE), b"{not json").unwrap();
        assert!(PathwayCatalog::load(dir.path()).is_empty());
    }

    #[test]
    fn loads_catalog_from_disk() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(PATHWAYS_FILE),
            r#"[{"title": "Careers portal", "url": "https://example.test/careers",
                 "description": "Jobs board", "keywords": ["job", "career"]}]"#,
        )
        .unwrap();

        let catalog = PathwayCatalog::load(dir.path());
        let hits = catalog.matches("looking for a job", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Careers portal");
    }
}
