//! Read-only access to a source PDF's pages.

use crate::error::{Result, SplitError};
use lopdf::{Document, ObjectId};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Opaque handle to one page of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    pub number: u32, // 1-based
    pub object_id: ObjectId,
}

/// A parsed source document. The page count is fixed for the lifetime of
/// the value; nothing here writes back to `path`.
pub struct SourcePdf {
    path: PathBuf,
    doc: Document,
    page_count: u32,
}

impl SourcePdf {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SplitError::unreadable(path, "file not found"));
        }
        let doc = Document::load(path).map_err(|e| SplitError::unreadable(path, e))?;
        let page_count = doc.get_pages().len() as u32;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn pages(&self) -> Vec<PageHandle> {
        self.doc
            .get_pages()
            .into_iter()
            .map(|(number, object_id)| PageHandle { number, object_id })
            .collect()
    }

    /// File stem used as the prefix of derived artifact names.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }
}

/// Page count of the PDF at `path`; 0 when it cannot be read.
pub fn page_count(path: &Path) -> u32 {
    match SourcePdf::open(path) {
        Ok(src) => src.page_count(),
        Err(err) => {
            warn!("cannot read pdf {}: {err}", path.display());
            0
        }
    }
}
