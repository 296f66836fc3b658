#![allow(dead_code)]

use docsplit::{
    classifier::{Classification, Classifier, Confidence},
    error::Result,
    extract::{ExtractedFile, LopdfExtractor, PageExtractor, PageSelector},
    pages::PageSet,
    reconcile::DocumentBucket,
    store::SourcePdf,
    usage::UsageMetrics,
};
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

/// Writes an `n`-page PDF whose page `i` draws the text `Page i`.
pub fn make_pdf(dir: &Path, name: &str, num_pages: u32) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Page {}", i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Source page numbers drawn on each page of the PDF at `path`, in order.
pub fn page_markers(path: &Path) -> Vec<u32> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let content = doc.get_page_content(*id).unwrap();
            let text = String::from_utf8_lossy(&content);
            let start = text.find("(Page ").expect("page marker") + "(Page ".len();
            let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap()
        })
        .collect()
}

pub fn bucket(document_type: &str, pages: &[u32]) -> DocumentBucket {
    DocumentBucket::new(document_type, pages.iter().copied())
}

pub fn set(pages: &[u32]) -> PageSet {
    pages.iter().copied().collect()
}

/// Classifier that always answers with the same buckets.
#[derive(Clone)]
pub struct FixedClassifier {
    pub buckets: Vec<DocumentBucket>,
    pub usage: Option<UsageMetrics>,
}

impl FixedClassifier {
    pub fn new(buckets: Vec<DocumentBucket>) -> Self {
        Self {
            buckets,
            usage: Some(UsageMetrics {
                input_tokens: 100,
                output_tokens: 20,
                total_tokens: 120,
            }),
        }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, _source: &SourcePdf) -> Result<Classification> {
        Ok(Classification {
            buckets: self.buckets.clone(),
            confidence: Confidence::High,
            usage: self.usage,
        })
    }
}

/// Extractor that fails for one exact page-set selector and otherwise
/// delegates to lopdf.
pub struct FailingExtractor {
    pub inner: LopdfExtractor,
    pub fail_on: PageSet,
}

impl PageExtractor for FailingExtractor {
    fn extract(
        &self,
        source: &SourcePdf,
        selector: &PageSelector,
        out_dir: &Path,
        name: &str,
    ) -> Result<ExtractedFile> {
        if let PageSelector::Set(pages) = selector {
            if *pages == self.fail_on {
                return Err(docsplit::SplitError::write(out_dir.join(name), "disk full"));
            }
        }
        self.inner.extract(source, selector, out_dir, name)
    }
}
