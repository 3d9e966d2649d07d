//! Client for the remote data platform.
//!
//! [`Platform`] is the seam every domain operation goes through. The
//! production implementation is [`HttpPlatform`]; tests script responses
//! through `MockPlatform` (enabled by the `testing` feature).

pub mod error;
pub mod http;

use async_trait::async_trait;
use zainmart_types::{
    ActionRequest, ActionResponse, AttachmentLocator, Credentials, Entry, EntryLocator,
    ProgressTicket, QueryRequest, QueryResponse, RecordRequest, Scope, Submission, Upload,
};

pub use error::PlatformError;
pub use http::HttpPlatform;

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    async fn query(&self, query: QueryRequest, scope: Scope) -> Result<QueryResponse, PlatformError>;

    async fn request(&self, action: ActionRequest) -> Result<ActionResponse, PlatformError>;

    /// Moves a workflow ticket along `action`.
    async fn progress_ticket(&self, ticket: ProgressTicket) -> Result<ActionResponse, PlatformError>;

    async fn retrieve_entry(&self, locator: EntryLocator, scope: Scope) -> Result<Entry, PlatformError>;

    /// Authenticates and keeps the issued access token for later calls.
    async fn login(&self, credentials: Credentials) -> Result<ActionResponse, PlatformError>;

    async fn logout(&self) -> Result<(), PlatformError>;

    async fn get_profile(&self) -> Result<ActionResponse, PlatformError>;

    async fn otp_request(&self, email: String) -> Result<ActionResponse, PlatformError>;

    /// Whether `value` is still free for the user property `prop`.
    async fn check_existing(&self, prop: String, value: String) -> Result<bool, PlatformError>;

    async fn create_user(&self, record: RecordRequest) -> Result<ActionResponse, PlatformError>;

    async fn update_user(&self, record: RecordRequest) -> Result<ActionResponse, PlatformError>;

    async fn submit(&self, submission: Submission) -> Result<ActionResponse, PlatformError>;

    async fn upload_with_payload(&self, upload: Upload) -> Result<ActionResponse, PlatformError>;

    fn attachment_url(&self, locator: AttachmentLocator) -> String;
}
