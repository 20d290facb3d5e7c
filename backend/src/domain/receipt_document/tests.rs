//! Tests for the streaming receipt renderer.

use async_trait::async_trait;
use rstest::rstest;

use super::*;
use crate::domain::ports::VecDocumentSink;
use crate::test_support::sample_record;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

async fn render_order_1() -> (Vec<u8>, RenderSummary) {
    let mut sink = VecDocumentSink::default();
    let summary = ReceiptDocument::default()
        .render(&sample_record("ORDER_1"), &mut sink)
        .await
        .expect("render succeeds");
    (sink.into_bytes(), summary)
}

/// Sink that accepts a fixed number of chunks and then reports closure.
struct ClosingSink {
    accept: usize,
    attempts: usize,
}

#[async_trait]
impl DocumentSink for ClosingSink {
    async fn write_chunk(&mut self, _chunk: Vec<u8>) -> Result<(), DocumentSinkError> {
        self.attempts += 1;
        if self.attempts > self.accept {
            Err(DocumentSinkError::closed())
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn receipt_contains_record_fields() {
    let (bytes, _) = render_order_1().await;
    let text = String::from_utf8_lossy(&bytes);

    for expected in [
        "(Payment Receipt) Tj",
        "(Order ID: ORDER_1) Tj",
        "(Payment Type: card) Tj",
        "(Trip Name: Kandy Tour) Tj",
        "(Amount: USD 150.00) Tj",
        "(Name: A B) Tj",
        "(Email: a@b.com) Tj",
        "(Phone: 555) Tj",
        "(Date: 8/18/2025) Tj",
    ] {
        assert!(text.contains(expected), "missing {expected}");
    }
}

#[tokio::test]
async fn document_is_framed_as_pdf() {
    let (bytes, summary) = render_order_1().await;

    assert!(bytes.starts_with(b"%PDF-1.4\n"));
    assert!(bytes.ends_with(b"%%EOF\n"));
    assert_eq!(summary.bytes_written, bytes.len() as u64);
    assert!(summary.chunks > OBJECT_COUNT, "one chunk per object or line");
}

#[tokio::test]
async fn title_uses_bold_font_at_twenty_points() {
    let (bytes, _) = render_order_1().await;
    let text = String::from_utf8_lossy(&bytes);

    let title = text
        .lines()
        .find(|line| line.contains("(Payment Receipt)"))
        .expect("title line");
    assert!(title.starts_with("/F2 20 Tf "), "{title}");
}

#[tokio::test]
async fn xref_offsets_point_at_objects() {
    let (bytes, _) = render_order_1().await;

    let marker = rfind(&bytes, b"startxref\n").expect("startxref");
    let tail = std::str::from_utf8(&bytes[marker + b"startxref\n".len()..]).expect("ascii tail");
    let xref_offset: usize = tail
        .lines()
        .next()
        .expect("offset line")
        .parse()
        .expect("numeric offset");
    assert!(bytes[xref_offset..].starts_with(b"xref\n0 8\n"));

    let table = std::str::from_utf8(&bytes[xref_offset..marker]).expect("ascii xref");
    let entries: Vec<&str> = table.lines().skip(3).take(OBJECT_COUNT).collect();
    assert_eq!(entries.len(), OBJECT_COUNT);
    for (index, entry) in entries.iter().enumerate() {
        let offset: usize = entry[..10].parse().expect("entry offset");
        let header = format!("{} 0 obj\n", index + 1);
        assert!(
            bytes[offset..].starts_with(header.as_bytes()),
            "object {} not at {offset}",
            index + 1
        );
    }
}

#[tokio::test]
async fn trailing_length_object_matches_stream() {
    let (bytes, _) = render_order_1().await;

    let start = find(&bytes, b"stream\n").expect("stream start") + b"stream\n".len();
    let end = find(&bytes, b"endstream\n").expect("stream end");
    let length_object = find(&bytes, b"7 0 obj\n").expect("length object") + b"7 0 obj\n".len();
    let declared = std::str::from_utf8(&bytes[length_object..])
        .expect("ascii tail")
        .lines()
        .next()
        .expect("length line")
        .parse::<usize>()
        .expect("numeric length");

    assert_eq!(declared, end - start);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(9)]
#[tokio::test]
async fn closed_sink_stops_rendering(#[case] accept: usize) {
    let mut sink = ClosingSink {
        accept,
        attempts: 0,
    };

    let outcome = ReceiptDocument::default()
        .render(&sample_record("ORDER_1"), &mut sink)
        .await;

    assert_eq!(outcome, Err(RenderError::SinkClosed));
    assert_eq!(sink.attempts, accept + 1);
}

#[rstest]
#[case("Kandy Tour", "Kandy Tour")]
#[case("a (b) c", "a \\(b\\) c")]
#[case("back\\slash", "back\\\\slash")]
#[case("Café", "Caf\\351")]
#[case("東京", "??")]
#[case("tab\there", "tab?here")]
fn escapes_pdf_literal_text(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(escape_pdf_text(raw), expected);
}

#[test]
fn prepared_receipt_names_attachment_after_order() {
    let prepared = PreparedReceipt::new(sample_record("ORDER_42"), ReceiptDocument::default());
    assert_eq!(prepared.filename(), "receipt_ORDER_42.pdf");
    assert_eq!(prepared.order_id().as_str(), "ORDER_42");
}

#[rstest]
#[case(214.35, "214.35")]
#[case(720.0, "720")]
#[case(0.5, "0.50")]
fn numbers_print_compactly(#[case] value: f64, #[case] expected: &str) {
    assert_eq!(Number(value).to_string(), expected);
}

/// Sink that keeps every chunk separately.
#[derive(Default)]
struct ChunkSink {
    chunks: Vec<Vec<u8>>,
}

#[async_trait]
impl DocumentSink for ChunkSink {
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> Result<(), DocumentSinkError> {
        self.chunks.push(chunk);
        Ok(())
    }
}

#[tokio::test]
async fn content_stream_is_written_one_line_per_chunk() {
    let record = sample_record("ORDER_1");
    let document = ReceiptDocument::default();
    let mut sink = ChunkSink::default();

    document.render(&record, &mut sink).await.expect("render succeeds");

    let expected: Vec<Vec<u8>> = document
        .content_lines(&record)
        .map(String::into_bytes)
        .collect();
    let start = sink
        .chunks
        .iter()
        .position(|chunk| chunk.ends_with(b"stream\n"))
        .expect("stream header chunk")
        + 1;
    let streamed = sink.chunks.get(start..start + expected.len()).expect("content chunks");
    assert_eq!(streamed, expected.as_slice());
    assert_eq!(
        sink.chunks.get(start + expected.len()).map(Vec::as_slice),
        Some(&b"endstream\nendobj\n"[..])
    );
}

#[test]
fn content_lines_open_with_the_title_before_any_field() {
    let record = sample_record("ORDER_1");
    let mut lines = ReceiptDocument::default().content_lines(&record);

    assert_eq!(lines.next().as_deref(), Some("BT\n"));
    assert!(lines.next().is_some_and(|line| line.contains("(Payment Receipt) Tj")));
    let rest: Vec<String> = lines.collect();
    assert_eq!(rest.len(), 3 + receipt_fields(&record, DateStyle::default()).len() + 1);
    assert_eq!(rest.last().map(String::as_str), Some("ET\n"));
}
