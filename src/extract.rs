//! Page extraction into new PDF files.
//!
//! Builds the output by cloning the source document, deleting every page
//! that is not wanted and pruning what is left unreferenced. Surviving pages
//! keep their original relative order.

use crate::{
    error::{Result, SplitError},
    pages::{PageRange, PageSet},
    store::SourcePdf,
};
use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelector {
    Range(PageRange),
    Set(PageSet),
}

/// How a non-contiguous `PageSet` is turned into output pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Everything from the lowest to the highest listed page.
    #[default]
    Span,
    /// Only the listed pages.
    Exact,
}

impl SelectionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "span" => Ok(SelectionMode::Span),
            "exact" => Ok(SelectionMode::Exact),
            other => Err(SplitError::Validation(format!(
                "unknown splitting.page_selection: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    pub path: PathBuf,
    /// Pages of the source that ended up in the file.
    pub pages: PageSet,
}

pub trait PageExtractor {
    /// Writes `<out_dir>/<name>.pdf` holding the selected pages of `source`.
    fn extract(
        &self,
        source: &SourcePdf,
        selector: &PageSelector,
        out_dir: &Path,
        name: &str,
    ) -> Result<ExtractedFile>;
}

#[derive(Debug, Clone, Default)]
pub struct LopdfExtractor {
    mode: SelectionMode,
}

impl LopdfExtractor {
    pub fn new(mode: SelectionMode) -> Self {
        Self { mode }
    }

    /// The exact pages to keep, after bounds checks against `total_pages`.
    pub fn resolve(&self, selector: &PageSelector, total_pages: u32) -> Result<PageSet> {
        match selector {
            PageSelector::Range(range) => {
                range.validate(total_pages)?;
                Ok(range.to_set())
            }
            PageSelector::Set(set) => {
                let span = set
                    .span()
                    .ok_or_else(|| SplitError::InvalidRange("no pages selected".into()))?;
                span.validate(total_pages)?;
                Ok(match self.mode {
                    SelectionMode::Span => {
                        if !set.is_contiguous() {
                            debug!("widening pages [{}] to {}..{}", set.dash_joined(), span.start_page, span.end_page);
                        }
                        span.to_set()
                    }
                    SelectionMode::Exact => set.clone(),
                })
            }
        }
    }
}

impl PageExtractor for LopdfExtractor {
    fn extract(
        &self,
        source: &SourcePdf,
        selector: &PageSelector,
        out_dir: &Path,
        name: &str,
    ) -> Result<ExtractedFile> {
        let keep = self.resolve(selector, source.page_count())?;
        let path = out_dir.join(format!("{name}.pdf"));

        let mut doc = source.document().clone();
        let mut to_delete: Vec<u32> = (1..=source.page_count())
            .filter(|p| !keep.contains(*p))
            .collect();

        // Back to front so earlier page numbers stay valid.
        to_delete.reverse();
        doc.delete_pages(&to_delete);
        refresh_page_counts(&mut doc).map_err(|e| SplitError::write(&path, e))?;
        doc.prune_objects();
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| SplitError::write(&path, format!("serialize: {e}")))?;
        std::fs::write(&path, &buffer).map_err(|e| SplitError::write(&path, e))?;

        debug!(
            "wrote {} ({} pages from {})",
            path.display(),
            keep.len(),
            source.path().display()
        );
        Ok(ExtractedFile { path, pages: keep })
    }
}

/// Rewrites `/Count` on every node of the page tree after pages were removed.
fn refresh_page_counts(doc: &mut Document) -> lopdf::Result<()> {
    let root = doc.trailer.get(b"Root")?.as_reference()?;
    let pages = doc.get_dictionary(root)?.get(b"Pages")?.as_reference()?;
    recount(doc, pages, 0)?;
    Ok(())
}

fn recount(doc: &mut Document, node: ObjectId, depth: usize) -> lopdf::Result<i64> {
    // Malformed trees can be cyclic; bail out long before the stack does.
    if depth > 64 {
        return Ok(0);
    }
    let kids: Vec<ObjectId> = {
        let dict = doc.get_dictionary(node)?;
        let is_page = dict
            .get(b"Type")
            .and_then(Object::as_name)
            .map(|n| n == b"Page".as_slice())
            .unwrap_or(false);
        if is_page {
            return Ok(1);
        }
        match dict.get(b"Kids") {
            Ok(kids) => kids
                .as_array()?
                .iter()
                .filter_map(|k| k.as_reference().ok())
                .collect(),
            Err(_) => return Ok(0),
        }
    };

    let mut count = 0;
    for kid in kids {
        count += recount(doc, kid, depth + 1)?;
    }
    doc.get_object_mut(node)?
        .as_dict_mut()?
        .set("Count", Object::Integer(count));
    Ok(count)
}
