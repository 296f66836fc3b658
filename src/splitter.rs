use crate::{
    artifact::{artifact_name, OutputArtifact},
    classifier::{Classifier, Confidence},
    config::Config,
    error::{Result, SplitError},
    extract::{PageExtractor, PageSelector},
    reconcile::{self, DocumentBucket},
    store::SourcePdf,
    usage::UsageMetrics,
    verify::{self, VerifyReport},
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// classify -> reconcile -> extract -> verify for one source document.
pub struct Splitter<C: Classifier, X: PageExtractor> {
    cfg: Config,
    classifier: C,
    extractor: X,
}

#[derive(Debug, Serialize)]
pub struct SplitOutcome {
    pub total_pages: u32,
    pub confidence: Confidence,
    pub buckets: Vec<DocumentBucket>,
    pub artifacts: Vec<OutputArtifact>,
    /// Buckets whose extraction failed, one message each.
    pub failures: Vec<String>,
    pub verification: VerifyReport,
    pub usage: Option<UsageMetrics>,
}

impl<C: Classifier, X: PageExtractor> Splitter<C, X> {
    pub fn new(cfg: &Config, classifier: C, extractor: X) -> Self {
        Self {
            cfg: cfg.clone(),
            classifier,
            extractor,
        }
    }

    /// Classifies and reconciles without writing anything.
    pub fn plan(&self, source: &SourcePdf) -> Result<(Vec<DocumentBucket>, Confidence, Option<UsageMetrics>)> {
        let classification = self.classifier.classify(source)?;
        let buckets = reconcile::reconcile(source.page_count(), classification.buckets)?;
        Ok((buckets, classification.confidence, classification.usage))
    }

    /// Splits `input` into `out_dir`, one file per document bucket.
    pub fn split(&self, input: &Path, out_dir: &Path) -> Result<SplitOutcome> {
        let source = SourcePdf::open(input)?;
        if source.page_count() == 0 {
            return Err(SplitError::NothingToReconcile);
        }
        let (buckets, confidence, usage) = self.plan(&source)?;
        debug!(?buckets, "reconciled buckets");

        let max_listed = self.cfg.splitting.max_pages_in_filename;
        let mut artifacts = Vec::new();
        let mut failures = Vec::new();
        let mut used_names = HashSet::new();

        for bucket in &buckets {
            if bucket.pages.is_empty() {
                debug!("skipping empty bucket {:?}", bucket.document_type);
                continue;
            }

            let base = artifact_name(&source.stem(), &bucket.document_type, &bucket.pages, max_listed);
            let name = unique_name(&mut used_names, base);
            let selector = PageSelector::Set(bucket.pages.clone());

            match self.extractor.extract(&source, &selector, out_dir, &name) {
                Ok(file) => {
                    info!("created: {}", file.path.display());
                    artifacts.push(OutputArtifact {
                        path: file.path,
                        document_type: bucket.document_type.clone(),
                        suggested_name: bucket.suggested_name.clone(),
                        pages: bucket.pages.clone(),
                        written_pages: file.pages,
                        original_source_path: source.path().to_path_buf(),
                        usage,
                    });
                }
                Err(err) => {
                    warn!("extracting {:?} failed: {err}", bucket.document_type);
                    failures.push(format!("{}: {err}", bucket.document_type));
                }
            }
        }

        let verification =
            verify::verify_and_correct(&self.extractor, &source, &mut artifacts, out_dir, usage, max_listed);
        if let Some(err) = &verification.corrective_error {
            failures.push(format!("post-check: {err}"));
        }
        if !verification.is_complete() {
            error!(
                "{}: pages [{}] are in no output file",
                input.display(),
                verification.residual.dash_joined()
            );
        }

        Ok(SplitOutcome {
            total_pages: source.page_count(),
            confidence,
            buckets,
            artifacts,
            failures,
            verification,
            usage,
        })
    }
}

/// Two buckets may share a type and page list; keep both files.
fn unique_name(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
