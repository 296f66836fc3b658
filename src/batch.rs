//! Batch cuts from explicit, named page ranges.
//!
//! Work happens in two phases separated by a barrier: every cut is attempted
//! first, and only then are superseded files deleted. A failed cut therefore
//! never costs the file it was meant to replace.

use crate::{
    cut::parent_dir,
    error::{Result, SplitError},
    extract::{PageExtractor, PageSelector},
    pages::PageRange,
    store::SourcePdf,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_PDF_NAME: &str = "section";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutGroup {
    #[serde(default)]
    pub original_file_path: Option<String>,
    /// Raw items; each one is validated on its own.
    #[serde(default)]
    pub cuts: Vec<Value>,
    #[serde(default)]
    pub old_file_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawCut {
    #[serde(default)]
    original_file_path: Option<Value>,
    #[serde(default)]
    start_page: Option<Value>,
    #[serde(default)]
    end_page: Option<Value>,
    #[serde(default)]
    pdf_name: Option<Value>,
    #[serde(default)]
    is_modify: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutInstruction {
    pub source: PathBuf,
    pub range: PageRange,
    pub pdf_name: String,
    /// Carried through for the caller; the planner does not act on it.
    pub is_modify: bool,
}

impl CutInstruction {
    pub fn output_path(&self) -> PathBuf {
        parent_dir(&self.source).join(format!("{}.pdf", self.output_stem()))
    }

    fn output_stem(&self) -> String {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        format!(
            "{stem}_{}_{}_{}",
            self.pdf_name, self.range.start_page, self.range.end_page
        )
    }
}

/// Flattened batch: one entry per cut, in input order, plus the
/// deduplicated set of files to delete afterwards.
#[derive(Debug)]
pub struct BatchPlan {
    pub items: Vec<Result<CutInstruction>>,
    pub old_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutResult {
    pub index: usize,
    pub path: PathBuf,
    pub instruction: CutInstruction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub split_pdf_array: Vec<PathBuf>,
    pub items: Vec<CutResult>,
    pub errors: Vec<String>,
    pub deleted: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

pub fn plan(groups: &[CutGroup]) -> BatchPlan {
    let mut items = Vec::new();
    let mut old_files = Vec::new();
    let mut seen = HashSet::new();

    for group in groups {
        for raw in &group.cuts {
            items.push(normalize(raw, group.original_file_path.as_deref()));
        }
        for old in &group.old_file_paths {
            let old = old.trim();
            if !old.is_empty() && seen.insert(old.to_string()) {
                old_files.push(PathBuf::from(old));
            }
        }
    }

    BatchPlan { items, old_files }
}

/// Runs every cut, then deletes the superseded files. Never aborts on a
/// single item.
pub fn run<X: PageExtractor + ?Sized>(extractor: &X, groups: &[CutGroup]) -> BatchOutcome {
    let plan = plan(groups);
    let mut outcome = BatchOutcome::default();

    for (index, item) in plan.items.into_iter().enumerate() {
        let result = item.and_then(|ins| {
            let path = execute(extractor, &ins)?;
            Ok((ins, path))
        });
        match result {
            Ok((instruction, path)) => {
                info!("cut {} -> {}", instruction.source.display(), path.display());
                outcome.split_pdf_array.push(path.clone());
                outcome.items.push(CutResult {
                    index,
                    path,
                    instruction,
                });
            }
            Err(err) => {
                warn!("cut item {index} failed: {err}");
                outcome.errors.push(format!("item {index}: {err}"));
            }
        }
    }

    // Barrier: all extraction attempts are finished past this point.
    let produced: HashSet<PathBuf> = outcome.split_pdf_array.iter().map(|p| canonical(p)).collect();
    let mut deleted = Vec::new();
    let mut warnings = Vec::new();
    for old in &plan.old_files {
        if produced.contains(&canonical(old)) {
            warnings.push(format!("not deleting {}: written by this batch", old.display()));
            continue;
        }
        match std::fs::remove_file(old) {
            Ok(()) => {
                info!("deleted superseded file {}", old.display());
                deleted.push(old.clone());
            }
            Err(err) => {
                warn!("deleting {}: {err}", old.display());
                warnings.push(format!("failed to delete {}: {err}", old.display()));
            }
        }
    }
    outcome.deleted = deleted;
    outcome.warnings = warnings;
    outcome
}

/// Resolved form used to compare paths; the raw path when it cannot be resolved.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn execute<X: PageExtractor + ?Sized>(extractor: &X, ins: &CutInstruction) -> Result<PathBuf> {
    let source = SourcePdf::open(&ins.source)?;
    let out_dir = parent_dir(&ins.source);
    let file = extractor.extract(
        &source,
        &PageSelector::Range(ins.range),
        &out_dir,
        &ins.output_stem(),
    )?;
    Ok(file.path)
}

fn normalize(raw: &Value, group_source: Option<&str>) -> Result<CutInstruction> {
    let cut: RawCut = serde_json::from_value(raw.clone())
        .map_err(|e| SplitError::Validation(format!("malformed cut item {raw}: {e}")))?;

    let source = match &cut.original_file_path {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        None | Some(Value::Null) | Some(Value::String(_)) => group_source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SplitError::Validation(format!("missing original_file_path in item: {raw}")))?,
        Some(other) => {
            return Err(SplitError::Validation(format!(
                "original_file_path must be a string, got {other}"
            )));
        }
    };

    let start_page = page_number(cut.start_page.as_ref(), "start_page", raw)?;
    let end_page = page_number(cut.end_page.as_ref(), "end_page", raw)?;

    let pdf_name = match &cut.pdf_name {
        None | Some(Value::Null) => DEFAULT_PDF_NAME.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(other) => {
            return Err(SplitError::Validation(format!("invalid pdf_name {other} in item: {raw}")));
        }
    };
    if pdf_name.contains(['/', '\\']) || pdf_name == ".." {
        return Err(SplitError::Validation(format!(
            "pdf_name must be a plain file name: {pdf_name}"
        )));
    }

    let is_modify = flag(cut.is_modify.as_ref())?;

    let source = PathBuf::from(source);
    if !source.is_file() {
        return Err(SplitError::unreadable(&source, "original file not found"));
    }

    Ok(CutInstruction {
        source,
        range: PageRange::new(start_page, end_page),
        pdf_name,
        is_modify,
    })
}

/// Integer, or a string holding one.
fn page_number(v: Option<&Value>, field: &str, raw: &Value) -> Result<u32> {
    let parsed = match v {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SplitError::Validation(format!("missing or invalid {field} in item: {raw}")))
}

/// `true`/`false` as a boolean or a case-insensitive string; absent is false.
pub fn flag(v: Option<&Value>) -> Result<bool> {
    match v {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => Ok(s.trim().eq_ignore_ascii_case("true")),
        Some(other) => Err(SplitError::Validation(format!("is_modify must be a boolean, got {other}"))),
    }
}
