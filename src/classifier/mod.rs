pub mod command;
pub mod prompt;
pub mod reply;

use crate::{error::Result, store::SourcePdf};

pub use command::CommandClassifier;
pub use reply::{parse_reply, CandidateDocument, ClassifierReply, Confidence};

use crate::{reconcile::DocumentBucket, usage::UsageMetrics};

/// Result of one analysis pass over a source document.
#[derive(Debug, Clone)]
pub struct Classification {
    pub buckets: Vec<DocumentBucket>,
    pub confidence: Confidence,
    pub usage: Option<UsageMetrics>,
}

/// Boundary to the document-understanding service. Implementations return
/// whatever the model claims; nothing downstream trusts it for coverage.
pub trait Classifier {
    fn classify(&self, source: &SourcePdf) -> Result<Classification>;
}
