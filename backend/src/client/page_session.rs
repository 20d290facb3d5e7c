//! Lifecycle of the after-payment page's session.
//!
//! ```text
//! Uninitialized --enter()--> CsrfReady --booking loaded--> ActionEnabled
//!        \                       \                              /
//!         '--------------- leave() / drop ----------------> TornDown
//! ```
//!
//! Actions fail closed: nothing that changes server state is sent before a
//! CSRF token exists, and nothing at all is sent after teardown. Teardown
//! runs on a detached task so navigating away never waits for it.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::api::{AfterPaymentsApi, ClientError, DownloadedReceipt};
use super::context::{ClientSessionContext, TeardownPlan, plan_teardown};
use super::storage::{PageStorage, apply_plan};
use crate::inbound::http::dto::{ActionResponse, PaymentRecordDto};

/// Where the page is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Uninitialized,
    CsrfReady,
    ActionEnabled,
    TornDown,
}

/// Errors returned by [`PageSession`] actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageSessionError {
    /// The action needs a CSRF token and a loaded booking.
    #[error("action is disabled until the page session is ready")]
    ActionDisabled,
    /// The page has left; its session is gone.
    #[error("page session has been torn down")]
    TornDown,
    #[error(transparent)]
    Api(#[from] ClientError),
}

/// Client-side session for one order's after-payment page.
pub struct PageSession {
    order_id: String,
    api: Arc<dyn AfterPaymentsApi>,
    storage: Arc<dyn PageStorage>,
    context: ClientSessionContext,
    state: PageState,
    csrf_token: Option<Zeroizing<String>>,
}

impl PageSession {
    pub fn new(
        order_id: impl Into<String>,
        api: Arc<dyn AfterPaymentsApi>,
        storage: Arc<dyn PageStorage>,
        context: ClientSessionContext,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            api,
            storage,
            context,
            state: PageState::Uninitialized,
            csrf_token: None,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Record more client-side state for teardown to remove.
    pub fn context_mut(&mut self) -> &mut ClientSessionContext {
        &mut self.context
    }

    fn ensure_live(&self) -> Result<(), PageSessionError> {
        if self.state == PageState::TornDown {
            return Err(PageSessionError::TornDown);
        }
        Ok(())
    }

    /// Fetch a CSRF token, then the booking.
    ///
    /// A failed booking fetch leaves the page in `CsrfReady` with actions
    /// still disabled.
    pub async fn enter(&mut self) -> Result<PaymentRecordDto, PageSessionError> {
        self.ensure_live()?;
        let token = self.api.fetch_csrf_token().await?;
        self.csrf_token = Some(Zeroizing::new(token));
        self.state = PageState::CsrfReady;

        let booking = self.api.get_booking(&self.order_id).await?;
        self.state = PageState::ActionEnabled;
        debug!(order_id = %self.order_id, "after-payment page ready");
        Ok(booking)
    }

    /// Ask the server to email the receipt.
    pub async fn email_receipt(&self) -> Result<ActionResponse, PageSessionError> {
        match self.state {
            PageState::TornDown => return Err(PageSessionError::TornDown),
            PageState::Uninitialized | PageState::CsrfReady => {
                return Err(PageSessionError::ActionDisabled);
            }
            PageState::ActionEnabled => {}
        }
        let Some(token) = self.csrf_token.as_ref() else {
            return Err(PageSessionError::ActionDisabled);
        };
        Ok(self.api.email_receipt(&self.order_id, token).await?)
    }

    /// Download the receipt, named `receipt_{orderId}.pdf`.
    pub async fn download_receipt(&self) -> Result<DownloadedReceipt, PageSessionError> {
        self.ensure_live()?;
        Ok(self.api.download_receipt(&self.order_id).await?)
    }

    /// Leave the page. Returns the teardown task, if one was started.
    ///
    /// Calling this again, or dropping the session afterwards, does nothing.
    pub fn leave(&mut self) -> Option<JoinHandle<()>> {
        if self.state == PageState::TornDown {
            return None;
        }
        self.state = PageState::TornDown;
        self.csrf_token = None;

        let plan = plan_teardown(&self.context);
        let storage = Arc::clone(&self.storage);
        let api = Arc::clone(&self.api);
        match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(run_teardown(plan, storage, api))),
            Err(_) => {
                apply_plan(&plan, storage.as_ref());
                warn!(
                    order_id = %self.order_id,
                    "no async runtime; client state cleared but server session left to expire"
                );
                None
            }
        }
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        drop(self.leave());
    }
}

async fn run_teardown(
    plan: TeardownPlan,
    storage: Arc<dyn PageStorage>,
    api: Arc<dyn AfterPaymentsApi>,
) {
    apply_plan(&plan, storage.as_ref());
    match api.logout().await {
        Ok(()) => info!("after-payment session torn down"),
        Err(error) => warn!(%error, "logout request failed"),
    }
}
