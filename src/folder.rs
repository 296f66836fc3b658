//! The process-folder operation.

use crate::{
    artifact::OutputArtifact,
    classifier::{Classifier, Confidence},
    config::Config,
    error::{Result, SplitError},
    extract::PageExtractor,
    splitter::Splitter,
    store,
    usage::{UsageContext, UsageMetrics, UsageRecord, UsageSink},
    util::{has_extension, hash_file},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub filename: String,
    pub path: PathBuf,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub filename: String,
    pub path: PathBuf,
    pub page_count: u32,
    pub source_sha256: Option<String>,
    pub confidence: Confidence,
    pub artifacts: Vec<OutputArtifact>,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderReport {
    pub folder: PathBuf,
    pub correlation_id: String,
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
    pub errors: Vec<FileError>,
    pub usage: UsageMetrics,
}

/// One line of the caller-facing output list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub original_file_path: PathBuf,
    pub path: PathBuf,
    pub is_multipage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_page: Option<u32>,
}

impl FolderReport {
    /// Produced artifacts first, then skipped files passed through untouched.
    pub fn output_entries(&self) -> Vec<OutputEntry> {
        let mut out = Vec::new();
        for artifact in self.processed.iter().flat_map(|p| &p.artifacts) {
            let span = artifact.pages.span().filter(|_| artifact.is_multipage());
            out.push(OutputEntry {
                original_file_path: artifact.original_source_path.clone(),
                path: artifact.path.clone(),
                is_multipage: artifact.is_multipage(),
                start_page: span.map(|r| r.start_page),
                end_page: span.map(|r| r.end_page),
            });
        }
        for skipped in &self.skipped {
            out.push(OutputEntry {
                original_file_path: skipped.path.clone(),
                path: skipped.path.clone(),
                is_multipage: false,
                start_page: None,
                end_page: None,
            });
        }
        out
    }
}

enum Disposition {
    Skip(SkippedFile),
    Fail(FileError),
    Split(u32),
}

pub struct FolderProcessor<C: Classifier, X: PageExtractor> {
    cfg: Config,
    splitter: Splitter<C, X>,
    sink: Box<dyn UsageSink + Send>,
}

impl<C: Classifier, X: PageExtractor> FolderProcessor<C, X> {
    pub fn new(cfg: &Config, splitter: Splitter<C, X>, sink: Box<dyn UsageSink + Send>) -> Self {
        Self {
            cfg: cfg.clone(),
            splitter,
            sink,
        }
    }

    /// Splits every multi-page PDF in `folder`, writing the pieces next to
    /// their source. Per-file failures are collected; only a missing folder
    /// aborts. Usage is handed to the sink once, at the end.
    pub fn process(&self, folder: &Path, correlation_id: &str) -> Result<FolderReport> {
        if !folder.is_dir() {
            return Err(SplitError::DirectoryMissing(folder.to_path_buf()));
        }

        let mut entries: Vec<PathBuf> = std::fs::read_dir(folder)
            .map_err(|e| SplitError::unreadable(folder, e))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut report = FolderReport {
            folder: folder.to_path_buf(),
            correlation_id: correlation_id.to_string(),
            processed: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            usage: UsageMetrics::default(),
        };

        for path in entries {
            let filename = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let page_count = match self.triage(&path, &filename) {
                Disposition::Skip(s) => {
                    info!("skipping {}: {}", s.filename, s.reason);
                    report.skipped.push(s);
                    continue;
                }
                Disposition::Fail(e) => {
                    warn!("{}: {}", e.filename, e.error);
                    report.errors.push(e);
                    continue;
                }
                Disposition::Split(n) => n,
            };

            info!("processing multi-page PDF: {filename} ({page_count} pages)");
            let source_sha256 = match hash_file(&self.cfg, &path) {
                Ok(h) => Some(h),
                Err(err) => {
                    warn!("hashing {}: {err:#}", path.display());
                    None
                }
            };

            match self.splitter.split(&path, folder) {
                Ok(outcome) => {
                    if let Some(usage) = outcome.usage {
                        report.usage += usage;
                    }
                    report.processed.push(ProcessedFile {
                        filename,
                        path,
                        page_count: outcome.total_pages,
                        source_sha256,
                        confidence: outcome.confidence,
                        artifacts: outcome.artifacts,
                        failures: outcome.failures,
                    });
                }
                Err(err) => {
                    warn!("{filename}: {err}");
                    report.errors.push(FileError {
                        filename,
                        error: err.to_string(),
                    });
                }
            }
        }

        self.sink.record(&UsageRecord::new(
            report.usage,
            UsageContext {
                folder_path: folder.to_path_buf(),
                correlation_id: correlation_id.to_string(),
            },
        ));

        Ok(report)
    }

    fn triage(&self, path: &Path, filename: &str) -> Disposition {
        let skip = |reason: &str, page_count: Option<u32>| {
            Disposition::Skip(SkippedFile {
                filename: filename.to_string(),
                path: path.to_path_buf(),
                reason: reason.to_string(),
                page_count,
            })
        };
        let fail = |error: String| {
            Disposition::Fail(FileError {
                filename: filename.to_string(),
                error,
            })
        };

        let image_exts: Vec<&str> = self.cfg.folder.image_extensions.iter().map(String::as_str).collect();
        if has_extension(path, &image_exts) {
            return skip("image file", None);
        }
        if !has_extension(path, &["pdf"]) {
            return skip("not a PDF or image file", None);
        }

        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.cfg.limits.max_input_file_bytes => {
                return fail(format!("file exceeds max_input_file_bytes: {}", meta.len()));
            }
            Ok(_) => {}
            Err(err) => return fail(format!("stat failed: {err}")),
        }

        let page_count = store::page_count(path);
        if page_count == 0 {
            return fail("could not read PDF or empty PDF".to_string());
        }
        if page_count > self.cfg.limits.max_input_pages {
            return fail(format!("PDF exceeds max_input_pages: {page_count}"));
        }
        if page_count == 1 && self.cfg.folder.skip_single_page {
            return skip("single page PDF", Some(page_count));
        }
        Disposition::Split(page_count)
    }
}
