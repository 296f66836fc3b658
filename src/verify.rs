//! Coverage check over the files that actually landed on disk.

use crate::{
    artifact::{artifact_name, OutputArtifact},
    extract::{PageExtractor, PageSelector},
    pages::{self, PageSet},
    reconcile::UNCLASSIFIED_TYPE,
    store::SourcePdf,
    usage::UsageMetrics,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const POST_CHECK_TYPE: &str = "Unclassified Document (post-check)";
pub const POST_CHECK_NAME: &str = "unclassified_document_post_check";

#[derive(Debug, Default, Serialize)]
pub struct VerifyReport {
    /// Pages no written artifact covered before the corrective pass.
    pub missing: PageSet,
    pub corrective_path: Option<PathBuf>,
    pub corrective_error: Option<String>,
    /// Pages still uncovered once the pass is over.
    pub residual: PageSet,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Pages of `1..=total_pages` not covered by any artifact.
pub fn uncovered(total_pages: u32, artifacts: &[OutputArtifact]) -> PageSet {
    let written = pages::union(artifacts.iter().map(|a| &a.pages));
    PageSet::full(total_pages).difference(&written)
}

/// Diffs `artifacts` against every page of `source` and, when something is
/// missing, runs one corrective extraction over the gap's span. The new
/// artifact is appended to `artifacts`. Never retries.
pub fn verify_and_correct<X: PageExtractor + ?Sized>(
    extractor: &X,
    source: &SourcePdf,
    artifacts: &mut Vec<OutputArtifact>,
    out_dir: &Path,
    usage: Option<UsageMetrics>,
    max_pages_in_filename: usize,
) -> VerifyReport {
    let missing = uncovered(source.page_count(), artifacts);
    let Some(span) = missing.span() else {
        return VerifyReport::default();
    };

    error!(
        "pages missing after split: [{}]; writing {UNCLASSIFIED_TYPE} post-check file",
        missing.dash_joined()
    );

    let name = artifact_name(
        &source.stem(),
        UNCLASSIFIED_TYPE,
        &missing,
        max_pages_in_filename,
    );
    let mut report = VerifyReport {
        missing: missing.clone(),
        ..Default::default()
    };

    match extractor.extract(source, &PageSelector::Range(span), out_dir, &name) {
        Ok(file) => {
            info!("created (post-check): {}", file.path.display());
            report.corrective_path = Some(file.path.clone());
            artifacts.push(OutputArtifact {
                path: file.path,
                document_type: POST_CHECK_TYPE.to_string(),
                suggested_name: POST_CHECK_NAME.to_string(),
                pages: missing,
                written_pages: file.pages,
                original_source_path: source.path().to_path_buf(),
                usage,
            });
        }
        Err(err) => {
            error!("post-check extraction failed: {err}");
            report.corrective_error = Some(err.to_string());
        }
    }

    report.residual = uncovered(source.page_count(), artifacts);
    report
}
