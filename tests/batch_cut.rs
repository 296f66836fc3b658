mod common;

use common::{make_pdf, page_markers};
use docsplit::{
    batch::{self, flag, CutGroup},
    extract::LopdfExtractor,
};
use serde_json::json;
use std::path::Path;

fn groups(value: serde_json::Value) -> Vec<CutGroup> {
    serde_json::from_value(value).unwrap()
}

fn p(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn bad_item_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 5);
    let missing = dir.path().join("missing.pdf");

    let request = groups(json!([{
        "original_file_path": p(&a),
        "cuts": [
            {"start_page": 1, "end_page": 2, "pdf_name": "intro", "is_modify": false},
            {"original_file_path": p(&missing), "start_page": 1, "end_page": 1, "pdf_name": "ghost"},
            {"start_page": "3", "end_page": "5", "pdf_name": "rest", "is_modify": "TRUE"}
        ],
        "old_file_paths": []
    }]));

    let outcome = batch::run(&LopdfExtractor::default(), &request);

    assert_eq!(outcome.split_pdf_array.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("item 1:"));
    assert!(outcome.errors[0].contains("missing.pdf"));

    assert_eq!(outcome.split_pdf_array[0], dir.path().join("a_intro_1_2.pdf"));
    assert_eq!(outcome.split_pdf_array[1], dir.path().join("a_rest_3_5.pdf"));
    assert_eq!(page_markers(&outcome.split_pdf_array[1]), vec![3, 4, 5]);
    assert!(!outcome.items[0].instruction.is_modify);
    assert!(outcome.items[1].instruction.is_modify);
}

#[test]
fn validation_errors_are_per_item() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 3);

    let request = groups(json!([{
        "original_file_path": p(&a),
        "cuts": [
            {"end_page": 2, "pdf_name": "no-start"},
            {"start_page": 2, "end_page": 9, "pdf_name": "too-far"},
            {"start_page": "x", "end_page": 2},
            {"start_page": 1, "end_page": 1, "pdf_name": "../escape"},
            "not an object",
            {"start_page": 1, "end_page": 3}
        ]
    }]));

    let outcome = batch::run(&LopdfExtractor::default(), &request);

    assert_eq!(outcome.errors.len(), 5);
    assert!(outcome.errors[1].contains("invalid page range"));
    assert_eq!(outcome.split_pdf_array, vec![dir.path().join("a_section_1_3.pdf")]);
}

#[test]
fn old_files_are_deleted_after_all_cuts_and_only_once() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 4);
    let b = make_pdf(dir.path(), "b.pdf", 4);
    let stale = make_pdf(dir.path(), "stale.pdf", 1);

    // Group one deletes b.pdf, which group two still cuts from.
    let request = groups(json!([
        {
            "original_file_path": p(&a),
            "cuts": [{"start_page": 1, "end_page": 2, "pdf_name": "first"}],
            "old_file_paths": [p(&b), p(&stale)]
        },
        {
            "original_file_path": p(&b),
            "cuts": [{"start_page": 3, "end_page": 4, "pdf_name": "second"}],
            "old_file_paths": [p(&stale)]
        }
    ]));

    let outcome = batch::run(&LopdfExtractor::default(), &request);

    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert_eq!(outcome.split_pdf_array.len(), 2);
    assert_eq!(page_markers(&dir.path().join("b_second_3_4.pdf")), vec![3, 4]);
    assert_eq!(outcome.deleted, vec![b.clone(), stale.clone()]);
    assert!(outcome.warnings.is_empty());
    assert!(!b.exists());
    assert!(!stale.exists());
    assert!(a.exists());
}

#[test]
fn deletion_failures_are_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 2);
    let produced = dir.path().join("a_all_1_2.pdf");

    let request = groups(json!([{
        "original_file_path": p(&a),
        "cuts": [{"start_page": 1, "end_page": 2, "pdf_name": "all"}],
        "old_file_paths": [p(&dir.path().join("gone.pdf")), p(&produced)]
    }]));

    let outcome = batch::run(&LopdfExtractor::default(), &request);

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.warnings.len(), 2);
    assert!(outcome.deleted.is_empty());
    assert!(produced.exists());
}

#[test]
fn plan_flattens_and_dedupes() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 2);
    let request = groups(json!([
        {"original_file_path": p(&a), "cuts": [{"start_page": 1, "end_page": 1}], "old_file_paths": ["x.pdf", "y.pdf"]},
        {"original_file_path": p(&a), "cuts": [{"start_page": 2, "end_page": 2}], "old_file_paths": ["y.pdf", "x.pdf"]}
    ]));

    let plan = batch::plan(&request);
    assert_eq!(plan.items.len(), 2);
    assert!(plan.items.iter().all(|i| i.is_ok()));
    assert_eq!(plan.old_files.len(), 2);
}

#[test]
fn is_modify_accepts_bools_and_strings() {
    assert!(flag(Some(&json!(true))).unwrap());
    assert!(flag(Some(&json!("True"))).unwrap());
    assert!(!flag(Some(&json!("false"))).unwrap());
    assert!(!flag(Some(&json!("nope"))).unwrap());
    assert!(!flag(None).unwrap());
    assert!(flag(Some(&json!([1]))).is_err());
}

#[test]
fn own_output_is_kept_when_named_through_another_path() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 2);
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let produced = dir.path().join("a_all_1_2.pdf");
    let detour = dir.path().join("sub").join("..").join("a_all_1_2.pdf");

    let request = groups(json!([{
        "original_file_path": p(&a),
        "cuts": [{"start_page": 1, "end_page": 2, "pdf_name": "all"}],
        "old_file_paths": [p(&detour)]
    }]));

    let outcome = batch::run(&LopdfExtractor::default(), &request);

    assert_eq!(outcome.split_pdf_array, vec![produced.clone()]);
    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(produced.exists());
}

#[test]
fn blank_item_source_falls_back_to_group() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_pdf(dir.path(), "a.pdf", 2);

    let request = groups(json!([
        {
            "original_file_path": p(&a),
            "cuts": [{"original_file_path": "   ", "start_page": 1, "end_page": 1, "pdf_name": "one"}]
        },
        {
            "cuts": [{"original_file_path": "", "start_page": 1, "end_page": 1}]
        }
    ]));

    let outcome = batch::run(&LopdfExtractor::default(), &request);

    assert_eq!(outcome.split_pdf_array, vec![dir.path().join("a_one_1_1.pdf")]);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("missing original_file_path"));
}
