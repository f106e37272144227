//! Conflict resolution between divergent stored versions of a document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{DocumentModel, DrawingBlob};

/// How to pick the authoritative model among conflicting versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// The version with the latest modification time wins; the rest are dropped.
    #[default]
    MostRecentWins,
    /// Start from the most recent version and append every drawing from the
    /// other versions that it does not already contain. Drawings are counted,
    /// so a version holding the same drawing twice contributes both copies.
    Union,
}

/// One stored version of the document, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentVersion {
    /// Decoded model of this version.
    pub model: DocumentModel,
    /// Modification time in milliseconds since the epoch.
    pub modified_ms: u64,
}

impl DocumentVersion {
    /// Create a version.
    #[must_use]
    pub fn new(model: DocumentModel, modified_ms: u64) -> Self {
        Self { model, modified_ms }
    }
}

/// Resolve a set of conflicting versions into one model.
///
/// Ties on modification time go to the version listed first. Returns `None`
/// when there are no versions at all.
#[must_use]
pub fn resolve_versions(
    versions: &[DocumentVersion],
    strategy: ConflictStrategy,
) -> Option<DocumentModel> {
    let (winner_idx, winner) = versions
        .iter()
        .enumerate()
        .reduce(|best, candidate| {
            if candidate.1.modified_ms > best.1.modified_ms {
                candidate
            } else {
                best
            }
        })?;

    match strategy {
        ConflictStrategy::MostRecentWins => Some(winner.model.clone()),
        ConflictStrategy::Union => {
            let mut merged = winner.model.clone();
            let mut present: HashMap<DrawingBlob, usize> = HashMap::new();
            for drawing in merged.drawings() {
                *present.entry(drawing.clone()).or_default() += 1;
            }
            for (idx, version) in versions.iter().enumerate() {
                if idx == winner_idx {
                    continue;
                }
                let mut wanted: HashMap<&DrawingBlob, usize> = HashMap::new();
                for drawing in version.model.drawings() {
                    let want = wanted.entry(drawing).or_default();
                    *want += 1;
                    let have = present.entry(drawing.clone()).or_default();
                    if *want > *have {
                        *have += 1;
                        merged.push(drawing.clone());
                    }
                }
            }
            Some(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(tags: &[u8]) -> DocumentModel {
        tags.iter().map(|t| DrawingBlob::new(vec![*t])).collect()
    }

    #[test]
    fn test_most_recent_wins() {
        let versions = vec![
            DocumentVersion::new(model(&[1, 2]), 100),
            DocumentVersion::new(model(&[3]), 300),
            DocumentVersion::new(model(&[4, 5, 6]), 200),
        ];
        let resolved = resolve_versions(&versions, ConflictStrategy::MostRecentWins);
        assert_eq!(resolved, Some(model(&[3])));
    }

    #[test]
    fn test_tie_goes_to_first_listed() {
        let versions = vec![
            DocumentVersion::new(model(&[1]), 100),
            DocumentVersion::new(model(&[2]), 100),
        ];
        let resolved = resolve_versions(&versions, ConflictStrategy::MostRecentWins);
        assert_eq!(resolved, Some(model(&[1])));
    }

    #[test]
    fn test_union_keeps_distinct_drawings() {
        let versions = vec![
            DocumentVersion::new(model(&[1, 2]), 100),
            DocumentVersion::new(model(&[2, 3]), 200),
        ];
        let resolved = resolve_versions(&versions, ConflictStrategy::Union);
        assert_eq!(resolved, Some(model(&[2, 3, 1])));
    }

    #[test]
    fn test_union_keeps_duplicate_copies() {
        let versions = vec![
            DocumentVersion::new(model(&[1]), 200),
            DocumentVersion::new(model(&[2, 2, 1]), 100),
            DocumentVersion::new(model(&[2, 1, 1]), 50),
        ];
        let resolved = resolve_versions(&versions, ConflictStrategy::Union);
        assert_eq!(resolved, Some(model(&[1, 2, 2, 1])));
    }

    #[test]
    fn test_no_versions() {
        assert!(resolve_versions(&[], ConflictStrategy::default()).is_none());
    }
}
