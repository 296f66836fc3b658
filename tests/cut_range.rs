mod common;

use common::{make_pdf, page_markers};
use docsplit::{cut::cut, extract::LopdfExtractor, SplitError};

#[test]
fn cut_writes_next_to_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = make_pdf(dir.path(), "scan.pdf", 8);

    let out = cut(&LopdfExtractor::default(), &input, 3, 5).unwrap();

    assert_eq!(out, dir.path().join("scan_pages_3_to_5.pdf"));
    assert_eq!(page_markers(&out), vec![3, 4, 5]);
}

#[test]
fn cut_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = make_pdf(dir.path(), "scan.pdf", 4);
    let ex = LopdfExtractor::default();

    assert!(matches!(cut(&ex, &input, 0, 2), Err(SplitError::InvalidRange(_))));
    assert!(matches!(cut(&ex, &input, 3, 2), Err(SplitError::InvalidRange(_))));
    assert!(matches!(cut(&ex, &input, 1, 5), Err(SplitError::InvalidRange(_))));
    assert!(matches!(
        cut(&ex, &dir.path().join("nope.pdf"), 1, 1),
        Err(SplitError::SourceUnreadable { .. })
    ));
}
