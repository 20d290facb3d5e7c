//! After-payment API handlers.
//!
//! ```text
//! GET  /api/after-payments/{orderId}
//! POST /api/after-payments/{orderId}/email-receipt   (X-CSRF-Token)
//! GET  /api/after-payments/{orderId}/download-receipt
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use tracing::{debug, error, info};

use crate::domain::after_payment_service::PAYMENT_NOT_FOUND;
use crate::domain::{Error, OrderId, TraceId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::csrf::presented_csrf_token;
use crate::inbound::http::dto::{ActionResponse, PaymentRecordDto};
use crate::inbound::http::receipt_stream::{
    ChannelSink, RECEIPT_CHANNEL_CAPACITY, ReceiptFrame, body_stream,
};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Message returned when rendering fails before any bytes were sent.
pub const PDF_FAILURE: &str = "Failed to generate PDF";
/// Message returned after the relay accepts a receipt email.
pub const EMAIL_SENT: &str = "Email sent";

/// An order id that fails validation cannot name a record.
fn parse_order_id(raw: &str) -> Result<OrderId, Error> {
    OrderId::new(raw).map_err(|err| {
        debug!(error = %err, "rejected malformed order id");
        Error::not_found(PAYMENT_NOT_FOUND)
    })
}

/// Fetch the payment record for an order.
#[utoipa::path(
    get,
    path = "/api/after-payments/{orderId}",
    params(("orderId" = String, Path, description = "Order identifier")),
    responses(
        (status = 200, description = "Payment record", body = PaymentRecordDto),
        (status = 404, description = "Payment not found", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["after-payments"],
    operation_id = "getBooking"
)]
#[get("/after-payments/{order_id}")]
pub async fn get_booking(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PaymentRecordDto>> {
    let order_id = parse_order_id(&path.into_inner())?;
    let record = state.bookings.get_booking(&order_id).await?;
    Ok(web::Json(PaymentRecordDto::from(&record)))
}

/// Email the receipt to the customer on record.
///
/// Requires the session cookie and a matching `X-CSRF-Token` header. A
/// second request for the same order while one is in flight gets 409.
#[utoipa::path(
    post,
    path = "/api/after-payments/{orderId}/email-receipt",
    params(
        ("orderId" = String, Path, description = "Order identifier"),
        ("X-CSRF-Token" = String, Header, description = "Token from GET /api/payments/csrf-token")
    ),
    responses(
        (status = 200, description = "Email accepted by the relay", body = ActionResponse),
        (status = 403, description = "Invalid CSRF token", body = ErrorSchema),
        (status = 404, description = "Payment not found", body = ErrorSchema),
        (status = 409, description = "Email already being sent", body = ErrorSchema),
        (status = 500, description = "Failed to send email", body = ErrorSchema)
    ),
    tags = ["after-payments"],
    operation_id = "emailReceipt",
    security(("SessionCookie" = []))
)]
#[post("/after-payments/{order_id}/email-receipt")]
pub async fn email_receipt(
    state: web::Data<HttpState>,
    session: SessionContext,
    req: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<web::Json<ActionResponse>> {
    let session_id = session.session_id()?;
    state
        .csrf
        .validate(session_id.as_ref(), presented_csrf_token(&req))
        .await?;

    let order_id = parse_order_id(&path.into_inner())?;
    state.receipts.email_receipt(&order_id).await.map_err(|err| {
        error!(%order_id, error = %err, "receipt email failed");
        err
    })?;
    info!(%order_id, "receipt email sent");
    Ok(web::Json(ActionResponse::ok(EMAIL_SENT)))
}

/// Stream the receipt PDF as an attachment.
///
/// The record is looked up before the response starts, so a missing record
/// or store failure still gets a JSON error. Once the first chunk is out the
/// status is committed; a later failure aborts the body instead of ending it.
#[utoipa::path(
    get,
    path = "/api/after-payments/{orderId}/download-receipt",
    params(("orderId" = String, Path, description = "Order identifier")),
    responses(
        (
            status = 200,
            description = "Receipt PDF",
            content_type = "application/pdf",
            body = Vec<u8>,
            headers(("Content-Disposition" = String, description = "attachment; filename=receipt_{orderId}.pdf"))
        ),
        (status = 404, description = "Payment not found", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["after-payments"],
    operation_id = "downloadReceipt"
)]
#[get("/after-payments/{order_id}/download-receipt")]
pub async fn download_receipt(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let order_id = parse_order_id(&path.into_inner())?;
    let prepared = state.receipts.prepare_receipt(&order_id).await?;
    let disposition = format!("attachment; filename={}", prepared.filename());

    let (mut sink, mut receiver) = ChannelSink::bounded(RECEIPT_CHANNEL_CAPACITY);
    let render_order_id = order_id.clone();
    tokio::spawn(TraceId::propagate(async move {
        match prepared.render(&mut sink).await {
            Ok(summary) => {
                debug!(
                    order_id = %render_order_id,
                    bytes = summary.bytes_written,
                    chunks = summary.chunks,
                    "receipt rendered"
                );
                sink.complete().await;
            }
            Err(err) => {
                info!(order_id = %render_order_id, error = %err, "receipt stream abandoned");
                sink.fail(err).await;
            }
        }
    }));

    let first = match receiver.recv().await {
        Some(ReceiptFrame::Chunk(first)) => first,
        Some(ReceiptFrame::Failed(err)) => {
            error!(%order_id, error = %err, "receipt rendering failed before any output");
            return Err(Error::internal(PDF_FAILURE));
        }
        Some(ReceiptFrame::Complete) | None => {
            error!(%order_id, "receipt renderer stopped before producing output");
            return Err(Error::internal(PDF_FAILURE));
        }
    };

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((header::CONTENT_DISPOSITION, disposition))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .streaming(body_stream(first, receiver)))
}
