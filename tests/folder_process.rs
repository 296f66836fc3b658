mod common;

use common::{bucket, make_pdf, FixedClassifier};
use docsplit::{
    config::Config,
    extract::LopdfExtractor,
    folder::FolderProcessor,
    report::ProcessResponse,
    splitter::Splitter,
    usage::{JsonlUsageSink, NullUsageSink, UsageRecord, UsageSink},
    SplitError,
};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct MemorySink(Arc<Mutex<Vec<UsageRecord>>>);

impl UsageSink for MemorySink {
    fn record(&self, record: &UsageRecord) {
        self.0.lock().unwrap().push(record.clone());
    }
}

fn processor(classifier: FixedClassifier, sink: Box<dyn UsageSink + Send>) -> FolderProcessor<FixedClassifier, LopdfExtractor> {
    let cfg = Config::default();
    FolderProcessor::new(&cfg, Splitter::new(&cfg, classifier, LopdfExtractor::default()), sink)
}

#[test]
fn sorts_files_into_processed_skipped_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    make_pdf(dir.path(), "bundle.pdf", 6);
    make_pdf(dir.path(), "single.pdf", 1);
    std::fs::write(dir.path().join("photo.JPG"), b"\xff\xd8").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    std::fs::write(dir.path().join("broken.pdf"), b"%PDF-garbage").unwrap();

    let sink = MemorySink::default();
    let proc = processor(
        FixedClassifier::new(vec![bucket("Invoice", &[1, 2]), bucket("Receipt", &[3, 4])]),
        Box::new(sink.clone()),
    );

    let report = proc.process(dir.path(), "1700000000").unwrap();

    assert_eq!(report.processed.len(), 1);
    let bundle = &report.processed[0];
    assert_eq!(bundle.filename, "bundle.pdf");
    assert_eq!(bundle.page_count, 6);
    assert_eq!(bundle.artifacts.len(), 3);
    assert!(bundle.source_sha256.is_some());

    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(skipped, vec!["notes.txt", "photo.JPG", "single.pdf"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].filename, "broken.pdf");

    let records = sink.0.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metrics.total_tokens, 120);
    assert_eq!(records[0].context.correlation_id, "1700000000");
}

#[test]
fn output_entries_describe_artifacts_then_pass_throughs() {
    let dir = tempfile::tempdir().unwrap();
    make_pdf(dir.path(), "bundle.pdf", 4);
    let single = make_pdf(dir.path(), "single.pdf", 1);

    let proc = processor(
        FixedClassifier::new(vec![bucket("Passport", &[1]), bucket("Statement", &[2, 3, 4])]),
        Box::new(NullUsageSink),
    );
    let report = proc.process(dir.path(), "t").unwrap();
    let entries = report.output_entries();

    assert_eq!(entries.len(), 3);
    assert!(!entries[0].is_multipage);
    assert_eq!(entries[0].start_page, None);
    assert!(entries[1].is_multipage);
    assert_eq!((entries[1].start_page, entries[1].end_page), (Some(2), Some(4)));
    assert_eq!(entries[2].path, single);
    assert_eq!(entries[2].original_file_path, single);

    match ProcessResponse::success(&report) {
        ProcessResponse::Success { status_code, total_tokens, output_files, .. } => {
            assert_eq!(status_code, "200");
            assert_eq!(total_tokens, 120);
            assert_eq!(output_files.len(), 3);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn usage_is_summed_across_files() {
    let dir = tempfile::tempdir().unwrap();
    make_pdf(dir.path(), "one.pdf", 2);
    make_pdf(dir.path(), "two.pdf", 3);

    let proc = processor(FixedClassifier::new(vec![]), Box::new(NullUsageSink));
    let report = proc.process(dir.path(), "t").unwrap();

    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.usage.input_tokens, 200);
    assert_eq!(report.usage.total_tokens, 240);
}

#[test]
fn missing_folder_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let proc = processor(FixedClassifier::new(vec![]), Box::new(NullUsageSink));
    let err = proc.process(&dir.path().join("absent"), "t").unwrap_err();
    assert!(matches!(err, SplitError::DirectoryMissing(_)));
}

#[test]
fn jsonl_sink_appends_lines() {
    let dir = tempfile::tempdir().unwrap();
    make_pdf(dir.path(), "bundle.pdf", 2);
    let log = tempfile::tempdir().unwrap();
    let sink_path = log.path().join("usage.jsonl");

    let proc = processor(FixedClassifier::new(vec![]), Box::new(JsonlUsageSink::new(&sink_path)));
    proc.process(dir.path(), "a").unwrap();
    proc.process(dir.path(), "b").unwrap();

    let raw = std::fs::read_to_string(&sink_path).unwrap();
    let lines: Vec<serde_json::Value> = raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["context"]["correlation_id"], "b");
    assert!(lines[0]["input_tokens"].is_u64());
}

#[test]
fn sink_failure_is_not_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    make_pdf(dir.path(), "bundle.pdf", 2);
    let sink = JsonlUsageSink::new(dir.path().join("no-such-dir").join("usage.jsonl"));
    let proc = processor(FixedClassifier::new(vec![]), Box::new(sink));
    assert!(proc.process(dir.path(), "t").is_ok());
}
