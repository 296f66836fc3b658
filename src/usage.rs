//! Token usage for one analysis pass and the sink it ends up in.

use crate::{config::Config, util::now_rfc3339};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::ops::AddAssign;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl AddAssign for UsageMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageContext {
    pub folder_path: PathBuf,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(flatten)]
    pub metrics: UsageMetrics,
    pub context: UsageContext,
    pub recorded_at: String,
}

impl UsageRecord {
    pub fn new(metrics: UsageMetrics, context: UsageContext) -> Self {
        Self {
            metrics,
            context,
            recorded_at: now_rfc3339(),
        }
    }
}

/// Fire-and-forget destination for usage records. Implementations log
/// their own failures; callers never see them.
pub trait UsageSink {
    fn record(&self, record: &UsageRecord);
}

pub struct NullUsageSink;

impl UsageSink for NullUsageSink {
    fn record(&self, _record: &UsageRecord) {}
}

/// Appends one JSON object per line.
pub struct JsonlUsageSink {
    path: PathBuf,
}

impl JsonlUsageSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, record: &UsageRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        f.write_all(&line)
    }
}

impl UsageSink for JsonlUsageSink {
    fn record(&self, record: &UsageRecord) {
        match self.append(record) {
            Ok(()) => info!(
                "usage stored: input={} output={} total={}",
                record.metrics.input_tokens, record.metrics.output_tokens, record.metrics.total_tokens
            ),
            Err(err) => error!("storing usage in {}: {err}", self.path.display()),
        }
    }
}

pub fn sink_from_config(cfg: &Config) -> Box<dyn UsageSink + Send> {
    if cfg.usage.enabled && !cfg.usage.sink_path.is_empty() {
        Box::new(JsonlUsageSink::new(&cfg.usage.sink_path))
    } else {
        Box::new(NullUsageSink)
    }
}
