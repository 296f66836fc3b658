//! Strict parsing of the model's reply.
//!
//! The reply is free text that should contain one JSON object. Everything
//! between the first `{` and the last `}` must deserialize cleanly and every
//! page must fall inside the document, otherwise the whole reply is rejected.

use crate::{
    error::{Result, SplitError},
    pages::PageSet,
    reconcile::DocumentBucket,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierReply {
    pub documents: Vec<CandidateDocument>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub analysis_confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub document_type: String,
    pub page_numbers: Vec<u32>,
    #[serde(default)]
    pub suggested_filename: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(match raw.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("high") => Confidence::High,
            Some(s) if s.eq_ignore_ascii_case("medium") => Confidence::Medium,
            Some(s) if s.eq_ignore_ascii_case("low") => Confidence::Low,
            _ => Confidence::Unknown,
        })
    }
}

impl ClassifierReply {
    /// Candidate buckets in reply order.
    pub fn into_buckets(self) -> Vec<DocumentBucket> {
        self.documents
            .into_iter()
            .map(|d| DocumentBucket {
                pages: d.page_numbers.into_iter().collect(),
                suggested_name: d
                    .suggested_filename
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "document".to_string()),
                document_type: d.document_type,
                reason: d.reason,
            })
            .collect()
    }
}

/// Parses `text` as a reply for a document with `total_pages` pages.
pub fn parse_reply(text: &str, total_pages: u32) -> Result<ClassifierReply> {
    let start = text
        .find('{')
        .ok_or_else(|| SplitError::Classification("no JSON object in reply".into()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| SplitError::Classification("no JSON object in reply".into()))?;

    let reply: ClassifierReply = serde_json::from_str(&text[start..=end])
        .map_err(|e| SplitError::Classification(format!("malformed reply: {e}")))?;

    for doc in &reply.documents {
        let pages: PageSet = doc.page_numbers.iter().copied().collect();
        if pages.min() == Some(0) || pages.max().is_some_and(|p| p > total_pages) {
            return Err(SplitError::Classification(format!(
                "document {:?} lists pages outside 1..={total_pages}: {:?}",
                doc.document_type, doc.page_numbers
            )));
        }
    }

    if let Some(claimed) = reply.total_pages {
        if claimed != total_pages {
            warn!("model reported {claimed} pages, document has {total_pages}");
        }
    }

    Ok(reply)
}
