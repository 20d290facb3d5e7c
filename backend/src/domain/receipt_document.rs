//! Streaming receipt document renderer.
//!
//! Writes a single-page PDF straight into a [`DocumentSink`], one object or
//! content line per chunk. The content stream's `/Length` is an indirect
//! object written after the stream, so the renderer never has to hold the
//! whole page in memory to measure it. All state lives in the render call.

use std::fmt;
use std::iter;

use tracing::debug;

use super::ports::{DocumentSink, DocumentSinkError};
use super::receipt::{DateStyle, RECEIPT_TITLE, receipt_fields};
use super::{OrderId, PaymentRecord};

const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN_LEFT: f64 = 72.0;
const TITLE_SIZE: f64 = 20.0;
const BODY_SIZE: f64 = 12.0;
const BODY_LEADING: f64 = 18.0;
// Average Helvetica-Bold glyph advance as a fraction of the font size.
const BOLD_AVERAGE_ADVANCE: f64 = 0.611;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const PAGE_ID: usize = 3;
const REGULAR_FONT_ID: usize = 4;
const BOLD_FONT_ID: usize = 5;
const CONTENT_ID: usize = 6;
const LENGTH_ID: usize = 7;
const OBJECT_COUNT: usize = 7;

/// Errors raised while rendering a receipt document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The consumer stopped reading; rendering was abandoned.
    #[error("document sink closed before the receipt was complete")]
    SinkClosed,
}

impl From<DocumentSinkError> for RenderError {
    fn from(err: DocumentSinkError) -> Self {
        match err {
            DocumentSinkError::Closed => Self::SinkClosed,
        }
    }
}

/// Totals reported after a successful render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub bytes_written: u64,
    pub chunks: usize,
}

/// Receipt PDF layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptDocument {
    date_style: DateStyle,
}

impl ReceiptDocument {
    pub fn new(date_style: DateStyle) -> Self {
        Self { date_style }
    }

    /// Render the receipt for `record` into `sink`.
    ///
    /// Stops at the first sink failure without writing anything further.
    pub async fn render<S>(
        &self,
        record: &PaymentRecord,
        sink: &mut S,
    ) -> Result<RenderSummary, RenderError>
    where
        S: DocumentSink + ?Sized,
    {
        let mut pdf = PdfWriter::new(sink);
        pdf.emit(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec()).await?;

        pdf.object(
            CATALOG_ID,
            format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
        )
        .await?;
        pdf.object(
            PAGES_ID,
            format!("<< /Type /Pages /Kids [{PAGE_ID} 0 R] /Count 1 >>"),
        )
        .await?;
        pdf.object(
            PAGE_ID,
            format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 {REGULAR_FONT_ID} 0 R /F2 {BOLD_FONT_ID} 0 R >> >> \
                 /Contents {CONTENT_ID} 0 R >>"
            ),
        )
        .await?;
        pdf.object(REGULAR_FONT_ID, font_dictionary("Helvetica")).await?;
        pdf.object(BOLD_FONT_ID, font_dictionary("Helvetica-Bold"))
            .await?;

        pdf.begin_object(CONTENT_ID);
        pdf.emit(
            format!("{CONTENT_ID} 0 obj\n<< /Length {LENGTH_ID} 0 R >>\nstream\n").into_bytes(),
        )
        .await?;
        let mut stream_length = 0_u64;
        for line in self.content_lines(record) {
            stream_length += pdf.emit(line.into_bytes()).await?;
        }
        pdf.emit(b"endstream\nendobj\n".to_vec()).await?;
        pdf.object(LENGTH_ID, stream_length.to_string()).await?;

        let summary = pdf.finish().await?;
        debug!(
            order_id = %record.order_id(),
            bytes = summary.bytes_written,
            chunks = summary.chunks,
            "receipt document rendered"
        );
        Ok(summary)
    }

    /// Content stream operators, formatted one line at a time as they are
    /// pulled.
    fn content_lines(self, record: &PaymentRecord) -> impl Iterator<Item = String> + '_ {
        let date_style = self.date_style;
        let title_width = RECEIPT_TITLE.chars().count() as f64 * TITLE_SIZE * BOLD_AVERAGE_ADVANCE;
        let title_x = ((PAGE_WIDTH - title_width) / 2.0).max(MARGIN_LEFT);
        let title_y = PAGE_HEIGHT - MARGIN_LEFT;

        iter::once_with(|| "BT\n".to_owned())
            .chain(iter::once_with(move || {
                format!(
                    "/F2 {TITLE_SIZE} Tf {} {} Td ({}) Tj\n",
                    Number(title_x),
                    Number(title_y),
                    escape_pdf_text(RECEIPT_TITLE)
                )
            }))
            .chain(iter::once_with(|| "ET\n".to_owned()))
            .chain(iter::once_with(|| "BT\n".to_owned()))
            .chain(iter::once_with(move || {
                format!(
                    "/F1 {BODY_SIZE} Tf {BODY_LEADING} TL {MARGIN_LEFT} {} Td\n",
                    Number(title_y - 2.0 * TITLE_SIZE - BODY_LEADING)
                )
            }))
            .chain(
                iter::once_with(move || receipt_fields(record, date_style))
                    .flatten()
                    .map(|field| format!("({}) Tj T*\n", escape_pdf_text(&field.to_string()))),
            )
            .chain(iter::once_with(|| "ET\n".to_owned()))
    }
}

/// A record paired with the layout that will render it.
///
/// Returned by the receipt command once the record has been found, so the
/// inbound adapter can commit to a response before any bytes are produced.
#[derive(Debug, Clone)]
pub struct PreparedReceipt {
    record: PaymentRecord,
    document: ReceiptDocument,
}

impl PreparedReceipt {
    pub fn new(record: PaymentRecord, document: ReceiptDocument) -> Self {
        Self { record, document }
    }

    pub fn order_id(&self) -> &OrderId {
        self.record.order_id()
    }

    /// Attachment filename, `receipt_{orderId}.pdf`.
    pub fn filename(&self) -> String {
        format!("receipt_{}.pdf", self.record.order_id())
    }

    pub async fn render<S>(&self, sink: &mut S) -> Result<RenderSummary, RenderError>
    where
        S: DocumentSink + ?Sized,
    {
        self.document.render(&self.record, sink).await
    }
}

fn font_dictionary(base_font: &str) -> String {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} /Encoding /WinAnsiEncoding >>")
}

/// Escape text for a PDF literal string.
///
/// Latin-1 characters become octal escapes (WinAnsi agrees with Latin-1 in
/// that range); anything the standard fonts cannot show becomes `?`.
pub(crate) fn escape_pdf_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            '\u{a0}'..='\u{ff}' => escaped.push_str(&format!("\\{:03o}", c as u32)),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Coordinates printed without a trailing `.0` or float noise.
struct Number(f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = (self.0 * 100.0).round() / 100.0;
        if rounded.fract() == 0.0 {
            write!(f, "{}", rounded as i64)
        } else {
            write!(f, "{rounded:.2}")
        }
    }
}

struct PdfWriter<'a, S: ?Sized> {
    sink: &'a mut S,
    offset: u64,
    chunks: usize,
    object_offsets: [u64; OBJECT_COUNT],
}

impl<'a, S> PdfWriter<'a, S>
where
    S: DocumentSink + ?Sized,
{
    fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            offset: 0,
            chunks: 0,
            object_offsets: [0; OBJECT_COUNT],
        }
    }

    /// Send one chunk, returning its length.
    async fn emit(&mut self, chunk: Vec<u8>) -> Result<u64, RenderError> {
        let len = chunk.len() as u64;
        self.sink.write_chunk(chunk).await?;
        self.offset += len;
        self.chunks += 1;
        Ok(len)
    }

    fn begin_object(&mut self, id: usize) {
        if let Some(slot) = self.object_offsets.get_mut(id - 1) {
            *slot = self.offset;
        }
    }

    async fn object(&mut self, id: usize, body: String) -> Result<(), RenderError> {
        self.begin_object(id);
        self.emit(format!("{id} 0 obj\n{body}\nendobj\n").into_bytes())
            .await?;
        Ok(())
    }

    async fn finish(mut self) -> Result<RenderSummary, RenderError> {
        let xref_offset = self.offset;
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", OBJECT_COUNT + 1);
        for offset in self.object_offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        self.emit(xref.into_bytes()).await?;
        self.emit(
            format!(
                "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
                OBJECT_COUNT + 1
            )
            .into_bytes(),
        )
        .await?;
        Ok(RenderSummary {
            bytes_written: self.offset,
            chunks: self.chunks,
        })
    }
}

#[cfg(test)]
mod tests;
