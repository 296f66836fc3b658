use crate::{
    error::{Result, SplitError},
    extract::{PageExtractor, PageSelector},
    pages::PageRange,
    store::SourcePdf,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Cuts `start..=end` out of `input` into
/// `<dir>/<stem>_pages_<start>_to_<end>.pdf` next to the source.
pub fn cut<X: PageExtractor + ?Sized>(extractor: &X, input: &Path, start: u32, end: u32) -> Result<PathBuf> {
    if !input.is_file() {
        return Err(SplitError::unreadable(input, "file not found"));
    }
    let source = SourcePdf::open(input)?;
    let out_dir = parent_dir(input);
    let name = format!("{}_pages_{start}_to_{end}", source.stem());

    let file = extractor.extract(&source, &PageSelector::Range(PageRange::new(start, end)), &out_dir, &name)?;
    info!("created cut PDF: {}", file.path.display());
    Ok(file.path)
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
