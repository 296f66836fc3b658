use crate::folder::{FileError, FolderReport, OutputEntry};
use serde::{Deserialize, Serialize};

/// What a caller of the process-folder operation gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessResponse {
    Success {
        status_code: String,
        output_files: Vec<OutputEntry>,
        input_tokens: u64,
        output_tokens: u64,
        total_tokens: u64,
        #[serde(default)]
        errors: Vec<FileError>,
    },
    Error {
        status_code: String,
        error: String,
    },
}

impl ProcessResponse {
    pub fn success(report: &FolderReport) -> Self {
        ProcessResponse::Success {
            status_code: "200".into(),
            output_files: report.output_entries(),
            input_tokens: report.usage.input_tokens,
            output_tokens: report.usage.output_tokens,
            total_tokens: report.usage.total_tokens,
            errors: report.errors.clone(),
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        ProcessResponse::Error {
            status_code: "500".into(),
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResponse::Success { .. })
    }
}
