//! Client port for the after-payment HTTP API, plus a reqwest adapter.
//!
//! The adapter keeps a cookie store so the session cookie issued with the
//! CSRF token is replayed on later calls, the way a browser would.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::Error as ApiError;
use crate::inbound::http::csrf::CSRF_HEADER;
use crate::inbound::http::dto::{ActionResponse, CsrfTokenResponse, PaymentRecordDto};

/// Errors raised by [`AfterPaymentsApi`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        details: Option<String>,
    },
    /// The request could not be sent or timed out.
    #[error("request failed: {message}")]
    Transport { message: String },
    /// The response body was not what the endpoint promises.
    #[error("unexpected response body: {message}")]
    Decode { message: String },
}

/// A downloaded receipt and the name to save it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedReceipt {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Calls the page makes against the after-payment API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AfterPaymentsApi: Send + Sync {
    /// `GET /api/payments/csrf-token`.
    async fn fetch_csrf_token(&self) -> Result<String, ClientError>;

    /// `GET /api/after-payments/{orderId}`.
    async fn get_booking(&self, order_id: &str) -> Result<PaymentRecordDto, ClientError>;

    /// `POST /api/after-payments/{orderId}/email-receipt`.
    async fn email_receipt(
        &self,
        order_id: &str,
        csrf_token: &str,
    ) -> Result<ActionResponse, ClientError>;

    /// `GET /api/after-payments/{orderId}/download-receipt`.
    async fn download_receipt(&self, order_id: &str) -> Result<DownloadedReceipt, ClientError>;

    /// `POST /api/logout`.
    async fn logout(&self) -> Result<(), ClientError>;
}

/// [`AfterPaymentsApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct ReqwestAfterPaymentsApi {
    client: Client,
    base_url: Url,
}

impl ReqwestAfterPaymentsApi {
    /// Build a client for the API mounted under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Transport {
                message: format!("invalid request URL: {err}"),
            })
    }
}

fn transport(err: &reqwest::Error) -> ClientError {
    ClientError::Transport {
        message: err.to_string(),
    }
}

/// Turn an error response into [`ClientError::Status`], keeping the
/// server's message when the body is the usual error JSON.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "after-payments API returned an error");
    Err(match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => ClientError::Status {
            status: status.as_u16(),
            message: api_error.message().to_owned(),
            details: api_error.details().map(str::to_owned),
        },
        Err(_) => ClientError::Status {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned(),
            details: None,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|err| ClientError::Decode {
            message: err.to_string(),
        })
}

/// Filename from `Content-Disposition: attachment; filename=...`.
fn attachment_filename(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (key, name) = part.trim().split_once('=')?;
        (key.eq_ignore_ascii_case("filename"))
            .then(|| name.trim().trim_matches('"').to_owned())
            .filter(|name| !name.is_empty())
    })
}

#[async_trait]
impl AfterPaymentsApi for ReqwestAfterPaymentsApi {
    async fn fetch_csrf_token(&self) -> Result<String, ClientError> {
        let response = self
            .client
            .get(self.url("api/payments/csrf-token")?)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        let body: CsrfTokenResponse = decode(response).await?;
        Ok(body.csrf_token)
    }

    async fn get_booking(&self, order_id: &str) -> Result<PaymentRecordDto, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("api/after-payments/{order_id}"))?)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        decode(response).await
    }

    async fn email_receipt(
        &self,
        order_id: &str,
        csrf_token: &str,
    ) -> Result<ActionResponse, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("api/after-payments/{order_id}/email-receipt"))?)
            .header(CSRF_HEADER, csrf_token)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        decode(response).await
    }

    async fn download_receipt(&self, order_id: &str) -> Result<DownloadedReceipt, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("api/after-payments/{order_id}/download-receipt"))?)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        let response = check_status(response).await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| format!("receipt_{order_id}.pdf"));
        let bytes = response.bytes().await.map_err(|err| transport(&err))?;
        Ok(DownloadedReceipt {
            filename,
            bytes: bytes.to_vec(),
        })
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("api/logout")?)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        check_status(response).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare("attachment; filename=receipt_ORDER_1.pdf", Some("receipt_ORDER_1.pdf"))]
    #[case::quoted("attachment; filename=\"receipt_ORDER_1.pdf\"", Some("receipt_ORDER_1.pdf"))]
    #[case::missing("attachment", None)]
    #[case::empty("attachment; filename=", None)]
    fn parses_attachment_filename(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(attachment_filename(header).as_deref(), expected);
    }

    #[rstest]
    fn joins_paths_under_the_base_url() {
        let api = ReqwestAfterPaymentsApi::new(
            Url::parse("https://tours.example.com/").expect("base url"),
            Duration::from_secs(5),
        )
        .expect("client builds");

        let url = api.url("api/after-payments/ORDER_1").expect("joined url");

        assert_eq!(
            url.as_str(),
            "https://tours.example.com/api/after-payments/ORDER_1"
        );
    }
}
