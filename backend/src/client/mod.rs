//! Client half of the after-payment page.
//!
//! [`PageSession`] drives the page lifecycle against an [`AfterPaymentsApi`]
//! and removes everything the page stored once the user leaves.

pub mod api;
pub mod context;
pub mod page_session;
pub mod storage;

pub use api::{AfterPaymentsApi, ClientError, DownloadedReceipt, ReqwestAfterPaymentsApi};
pub use context::{ClientCookie, ClientSessionContext, StorageArea, TeardownPlan, plan_teardown};
pub use page_session::{PageSession, PageSessionError, PageState};
pub use storage::{MemoryPageStorage, PageStorage};
