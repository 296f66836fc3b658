//! Turns an untrusted page mapping into one that covers every page.

use crate::{
    error::{Result, SplitError},
    pages::{self, PageSet},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const UNCLASSIFIED_TYPE: &str = "Unclassified Document";
pub const UNCLASSIFIED_NAME: &str = "unclassified_document";
pub const UNCLASSIFIED_REASON: &str = "Pages not classified by the model.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBucket {
    pub document_type: String,
    pub pages: PageSet,
    pub suggested_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DocumentBucket {
    pub fn new(document_type: impl Into<String>, pages: impl IntoIterator<Item = u32>) -> Self {
        Self {
            document_type: document_type.into(),
            pages: pages.into_iter().collect(),
            suggested_name: "document".to_string(),
            reason: None,
        }
    }

    fn unclassified(pages: PageSet) -> Self {
        Self {
            document_type: UNCLASSIFIED_TYPE.to_string(),
            pages,
            suggested_name: UNCLASSIFIED_NAME.to_string(),
            reason: Some(UNCLASSIFIED_REASON.to_string()),
        }
    }
}

/// Pages of `1..=total_pages` that no bucket claims.
pub fn missing_pages(total_pages: u32, buckets: &[DocumentBucket]) -> PageSet {
    let covered = pages::union(buckets.iter().map(|b| &b.pages));
    PageSet::full(total_pages).difference(&covered)
}

/// Returns `candidates` in order, followed by an unclassified bucket holding
/// every page none of them claimed. Overlapping claims are left alone.
pub fn reconcile(total_pages: u32, candidates: Vec<DocumentBucket>) -> Result<Vec<DocumentBucket>> {
    if total_pages == 0 {
        return Err(SplitError::NothingToReconcile);
    }

    let missing = missing_pages(total_pages, &candidates);
    let mut buckets = candidates;
    if !missing.is_empty() {
        warn!(
            "found {} unclassified pages: [{}]",
            missing.len(),
            missing.dash_joined()
        );
        buckets.push(DocumentBucket::unclassified(missing));
    }
    Ok(buckets)
}
