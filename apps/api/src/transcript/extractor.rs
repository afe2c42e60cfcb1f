//! Transcript PDF → plain text.
//!
//! Bounded on every axis: file size is checked before anything is parsed,
//! only the first `MAX_PAGES` pages are decoded, and the joined text is cut
//! to `MAX_TEXT_CHARS`. Image-only PDFs come back nearly empty and are
//! rejected.

use bytes::Bytes;
use lopdf::Document;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_PAGES: usize = 10;
pub const MAX_TEXT_CHARS: usize = 12_000;
/// Anything shorter is treated as a scanned or image-based PDF.
pub const MIN_USABLE_CHARS: usize = 100;

const PAGE_SEPARATOR: &str = "\n";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Please upload a PDF file.")]
    NotPdf,

    #[error("File too large (max 10MB).")]
    TooLarge { bytes: usize },

    #[error("Failed to read PDF. Make sure it's a valid, text-based PDF.")]
    Unreadable(String),

    #[error("Could not extract text. PDF may be scanned/image-based.")]
    InsufficientText { chars: usize },
}

/// Progress notification emitted after each page is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: usize,
    pub of: usize,
}

#[derive(Debug)]
pub struct PageText {
    pub progress: PageProgress,
    pub text: String,
}

/// Rejects anything that is not a `.pdf` of at most 10 MB. Runs before any
/// parsing or network work.
pub fn check_upload(file_name: &str, size: usize) -> Result<(), ExtractionError> {
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(ExtractionError::NotPdf);
    }
    if size > MAX_FILE_BYTES {
        return Err(ExtractionError::TooLarge { bytes: size });
    }
    Ok(())
}

/// Extracts usable transcript text from an uploaded PDF.
///
/// `on_progress` fires as each page finishes decoding.
pub async fn extract_transcript_text(
    file_name: &str,
    data: Bytes,
    mut on_progress: impl FnMut(PageProgress),
) -> Result<String, ExtractionError> {
    check_upload(file_name, data.len())?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    // lopdf is CPU-bound and panics on some malformed inputs; a panic
    // surfaces here as a JoinError.
    let reader = tokio::task::spawn_blocking(move || {
        read_pages(&data, MAX_PAGES, |page| {
            // Receiver only goes away if the upload request was dropped.
            let _ = tx.send(page);
        })
    });

    let mut text = String::new();
    while let Some(page) = rx.recv().await {
        text.push_str(page.text.trim_end());
        text.push_str(PAGE_SEPARATOR);
        on_progress(page.progress);
    }

    let total_pages = reader
        .await
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))??;
    info!(
        "Read {} of {} page(s) from {}",
        total_pages.min(MAX_PAGES),
        total_pages,
        file_name
    );

    let text = truncate_chars(&text, MAX_TEXT_CHARS);
    let chars = text.trim().chars().count();
    if chars < MIN_USABLE_CHARS {
        return Err(ExtractionError::InsufficientText { chars });
    }
    Ok(text.to_string())
}

/// Decodes pages in document order, stopping after `limit`, and hands each
/// one to `emit` as soon as it is read. Returns the document's page count.
pub fn read_pages(
    data: &[u8],
    limit: usize,
    mut emit: impl FnMut(PageText),
) -> Result<usize, ExtractionError> {
    let doc = Document::load_mem(data).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;
    let pages = doc.get_pages();
    let total = pages.len();
    let of = total.min(limit);

    for (idx, page_number) in pages.into_keys().take(limit).enumerate() {
        let text = doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractionError::Unreadable(format!("page {page_number}: {e}")))?;
        emit(PageText {
            progress: PageProgress { page: idx + 1, of },
            text,
        });
    }

    Ok(total)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => {
            debug!("Truncating extracted text to {max} characters");
            &text[..byte_idx]
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a PDF with one text line per page.
    fn make_test_pdf(page_texts: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = format!("BT /F1 10 Tf 40 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    const TRANSCRIPT_LINE: &str =
        "MATH 1A Calculus I 5.0 A Fall 2023 EWRT 1A Composition 5.0 B Fall 2023 PHYS 4A Mechanics 6.0 B+ Winter 2024";

    #[test]
    fn test_check_upload_rejects_non_pdf() {
        assert!(matches!(
            check_upload("transcript.docx", 1024),
            Err(ExtractionError::NotPdf)
        ));
    }

    #[test]
    fn test_check_upload_accepts_uppercase_extension() {
        assert!(check_upload("TRANSCRIPT.PDF", 1024).is_ok());
    }

    #[test]
    fn test_check_upload_rejects_oversized_file() {
        let err = check_upload("t.pdf", MAX_FILE_BYTES + 1).unwrap_err();
        assert!(matches!(err, ExtractionError::TooLarge { .. }));
        assert!(check_upload("t.pdf", MAX_FILE_BYTES).is_ok());
    }

    #[tokio::test]
    async fn test_non_pdf_rejected_before_parsing() {
        let mut calls = 0;
        let err = extract_transcript_text("notes.txt", Bytes::from_static(b"%PDF-1.4"), |_| {
            calls += 1
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractionError::NotPdf));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_oversized_rejected_before_parsing() {
        let data = Bytes::from(vec![0u8; MAX_FILE_BYTES + 1]);
        let mut calls = 0;
        let err = extract_transcript_text("big.pdf", data, |_| calls += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::TooLarge { .. }));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_unreadable() {
        let err = extract_transcript_text("t.pdf", Bytes::from_static(b"not a pdf"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }

    #[tokio::test]
    async fn test_extracts_text_from_digital_pdf() {
        let pdf = make_test_pdf(&[TRANSCRIPT_LINE, TRANSCRIPT_LINE]);
        let mut seen = Vec::new();
        let text = extract_transcript_text("t.pdf", Bytes::from(pdf), |p| seen.push(p))
            .await
            .unwrap();
        assert!(text.contains("MATH"), "got: {text}");
        assert!(!seen.is_empty());
        assert_eq!(seen.last().map(|p| p.page), seen.last().map(|p| p.of));
    }

    #[tokio::test]
    async fn test_nearly_empty_pdf_is_insufficient_text() {
        let pdf = make_test_pdf(&["Hi"]);
        let err = extract_transcript_text("scan.pdf", Bytes::from(pdf), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InsufficientText { .. }));
    }

    fn numbered_pages(count: usize) -> Vec<String> {
        (1..=count)
            .map(|i| format!("Page {i:02} {TRANSCRIPT_LINE}"))
            .collect()
    }

    #[test]
    fn test_read_pages_stops_at_limit() {
        let texts = numbered_pages(12);
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let pdf = make_test_pdf(&refs);

        let mut read = Vec::new();
        let total = read_pages(&pdf, MAX_PAGES, |p| read.push(p)).unwrap();

        assert_eq!(total, 12);
        assert_eq!(read.len(), MAX_PAGES);
        assert_eq!(read[0].progress, PageProgress { page: 1, of: 10 });
        assert_eq!(read[9].progress, PageProgress { page: 10, of: 10 });
        assert!(read[9].text.contains("Page 10"));
        assert!(read.iter().all(|p| !p.text.contains("Page 11")));
    }

    #[tokio::test]
    async fn test_twelve_page_pdf_reports_ten_pages() {
        let texts = numbered_pages(12);
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let pdf = make_test_pdf(&refs);

        let mut progress = Vec::new();
        let text = extract_transcript_text("t.pdf", Bytes::from(pdf), |p| progress.push(p))
            .await
            .unwrap();

        assert_eq!(progress.len(), MAX_PAGES);
        assert_eq!(
            progress.iter().map(|p| p.page).collect::<Vec<_>>(),
            (1..=10).collect::<Vec<_>>()
        );
        assert!(text.contains("Page 01"));
        assert!(!text.contains("Page 11"));
        assert!(!text.contains("Page 12"));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "é".repeat(MAX_TEXT_CHARS + 50);
        let cut = truncate_chars(&text, MAX_TEXT_CHARS);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS);
        assert_eq!(truncate_chars("short", MAX_TEXT_CHARS), "short");
    }
}
