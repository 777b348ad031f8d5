//! Normalizer behavior across source kinds, using files on disk and a
//! stand-in PDF backend.

use std::io::{Cursor, Write};
use std::sync::Arc;

use plagcheck_core::{BackendError, PdfBackend};
use plagcheck_ingest::{DocumentFormat, DocumentSource, Normalizer};

/// Treats the PDF bytes as UTF-8 with pages separated by form feeds.
struct FormFeedPdf;

impl PdfBackend for FormFeedPdf {
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        Ok(text.split('\u{c}').map(String::from).collect())
    }
}

fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>")
            }
        })
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn text_file_is_merged_and_segmented() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("essay.txt");
    std::fs::write(
        &path,
        "Semantic overlap is measured with\nsentence embeddings.\n\nShort heading\nAnother line.\n",
    )
    .unwrap();

    let doc = Normalizer::new()
        .load(&DocumentSource::Path(path.clone()))
        .await;
    assert_eq!(doc.name, "essay.txt");
    assert_eq!(
        doc.sentences,
        vec![
            "Semantic overlap is measured with sentence embeddings.",
            "Short heading Another line.",
        ]
    );
    assert_eq!(doc.raw_lines.len(), 5);
}

#[tokio::test]
async fn docx_paragraphs_become_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("submission.docx");
    std::fs::write(
        &path,
        docx_bytes(&["First paragraph ends here.", "", "Second paragraph."]),
    )
    .unwrap();

    let normalizer = Normalizer::new();
    let source = DocumentSource::Path(path);
    assert_eq!(normalizer.raw_lines(&source).await.len(), 3);
    assert_eq!(
        normalizer.normalize(&source).await,
        vec!["First paragraph ends here.", "Second paragraph."]
    );
}

#[tokio::test]
async fn pdf_bytes_use_the_configured_backend() {
    let source = DocumentSource::Bytes {
        name: "paper.pdf".into(),
        data: b"Page one text.\n\x0cPage two\ncontinues here.\n".to_vec(),
        format: DocumentFormat::Pdf,
    };
    let doc = Normalizer::new()
        .with_pdf_backend(Arc::new(FormFeedPdf))
        .load(&source)
        .await;
    assert_eq!(doc.name, "paper.pdf");
    assert_eq!(
        doc.sentences,
        vec!["Page one text.", "Page two continues here."]
    );
}

#[tokio::test]
async fn unreadable_sources_yield_empty_documents() {
    let dir = tempfile::tempdir().unwrap();
    let normalizer = Normalizer::new();

    let missing = DocumentSource::Path(dir.path().join("missing.txt"));
    assert!(normalizer.normalize(&missing).await.is_empty());

    let corrupt = DocumentSource::Bytes {
        name: "broken.docx".into(),
        data: b"not a zip archive".to_vec(),
        format: DocumentFormat::Docx,
    };
    let doc = normalizer.load(&corrupt).await;
    assert!(doc.is_empty());
    assert!(doc.raw_lines.is_empty());
}

#[tokio::test]
async fn load_body_drops_trailing_bibliography() {
    let source = DocumentSource::Bytes {
        name: "sub.txt".into(),
        data: b"My argument is original.\nReferences\n[1] Someone. A paper. 2020.\n".to_vec(),
        format: DocumentFormat::Text,
    };
    let normalizer = Normalizer::new();

    let body = normalizer.load_body(&source).await;
    assert_eq!(body.sentences, vec!["My argument is original."]);
    assert_eq!(body.raw_lines.len(), 3);

    let full = normalizer.load(&source).await;
    assert_eq!(
        full.sentences,
        vec!["My argument is original.", "References [1] Someone. A paper. 2020."]
    );
}
