use crate::{pages::PageSet, usage::UsageMetrics, util::slugify};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file written by a split pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub document_type: String,
    pub suggested_name: String,
    /// Pages the artifact was produced for.
    pub pages: PageSet,
    /// Pages physically present in the file; a superset of `pages` when a
    /// non-contiguous bucket was extracted as a span.
    pub written_pages: PageSet,
    pub original_source_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetrics>,
}

impl OutputArtifact {
    pub fn is_multipage(&self) -> bool {
        self.pages.len() > 1
    }
}

/// `<stem>_<type-slug>_<pages>`; page lists longer than `max_listed` are
/// shortened to `<min>-to-<max>`.
pub fn artifact_name(stem: &str, document_type: &str, pages: &PageSet, max_listed: usize) -> String {
    let listed = match pages.span() {
        Some(span) if pages.len() > max_listed => {
            format!("{}-to-{}", span.start_page, span.end_page)
        }
        _ => pages.dash_joined(),
    };
    format!("{stem}_{}_{listed}", slugify(document_type))
}
