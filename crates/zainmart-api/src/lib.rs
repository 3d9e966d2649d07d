//! Domain operations of the ZainMart client.
//!
//! Every operation is a thin composition over [`Platform`]: shape a query or
//! action, make one call (occasionally a short fixed sequence), check the
//! status and post-process the records. Most operations report failure as an
//! empty/`None`/`false` result and log it; the session flows return
//! [`ServiceError`] instead.

pub mod admin;
pub mod catalog;
pub mod catalog_tree;
pub mod comments;
pub mod config;
pub mod entities;
pub mod error;
pub mod listing;
pub mod messages;
pub mod notifications;
pub mod orders;
pub mod profile;
pub mod reports;
pub mod session;
pub mod spaces;
pub mod surveys;
pub mod validation;
pub mod variations;

use std::sync::Arc;

use tracing::{error, warn};

use zainmart_platform::Platform;
use zainmart_types::{ActionRequest, ActionResponse, Entry, EntryLocator, QueryRequest, QueryResponse, Record, Scope};

pub use config::SiteConfig;
pub use error::ServiceError;
pub use session::Session;

/// Handle to the platform shared by every domain operation.
#[derive(Clone)]
pub struct Client {
    platform: Arc<dyn Platform>,
    locale: String,
}

impl Client {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            locale: SiteConfig::default().default_language,
        }
    }

    /// Locale given to sessions opened by this client.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    // -- Sentinel-style call helpers --

    /// Runs a query, yielding `None` on transport failure or a failed status.
    pub(crate) async fn query_ok(&self, query: QueryRequest, scope: Scope) -> Option<QueryResponse> {
        let space = query.space_name.clone();
        match self.platform.query(query, scope).await {
            Ok(resp) if resp.is_success() => Some(resp),
            Ok(resp) => {
                warn!(space = %space, error = ?resp.error_message(), "Query rejected");
                None
            }
            Err(e) => {
                error!(space = %space, "Query failed: {}", e);
                None
            }
        }
    }

    /// Records of a query, empty on any failure.
    pub(crate) async fn query_records(&self, query: QueryRequest, scope: Scope) -> Vec<Record> {
        self.query_ok(query, scope)
            .await
            .map(|resp| resp.records)
            .unwrap_or_default()
    }

    pub(crate) async fn query_first(&self, query: QueryRequest, scope: Scope) -> Option<Record> {
        self.query_ok(query, scope).await?.into_first()
    }

    /// Sends an action, yielding `None` on transport failure or a failed status.
    pub(crate) async fn act(&self, action: ActionRequest) -> Option<ActionResponse> {
        let space = action.space_name.clone();
        let request_type = action.request_type;
        match self.platform.request(action).await {
            Ok(resp) if resp.is_success() => Some(resp),
            Ok(resp) => {
                warn!(space = %space, ?request_type, error = ?resp.error_message(), "Request rejected");
                None
            }
            Err(e) => {
                error!(space = %space, ?request_type, "Request failed: {}", e);
                None
            }
        }
    }

    pub(crate) async fn act_ok(&self, action: ActionRequest) -> bool {
        self.act(action).await.is_some()
    }

    /// Shortname of the first record the action touched.
    pub(crate) async fn act_shortname(&self, action: ActionRequest) -> Option<String> {
        self.act(action).await?.into_first().map(|r| r.shortname)
    }

    pub(crate) async fn entry(&self, locator: EntryLocator, scope: Scope) -> Option<Entry> {
        let shortname = locator.shortname.clone();
        match self.platform.retrieve_entry(locator, scope).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(shortname = %shortname, "Error retrieving entry: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use serde_json::Value;
    use zainmart_platform::MockPlatform;
    use zainmart_types::{ApiResponse, Record, ResourceType};

    use crate::Client;

    pub fn client(mock: MockPlatform) -> Client {
        Client::new(Arc::new(mock))
    }

    pub fn ok(records: Vec<Record>) -> ApiResponse {
        ApiResponse::success(records)
    }

    pub fn created(shortname: &str) -> ApiResponse {
        ApiResponse::success(vec![Record::new(ResourceType::Content, shortname, "/")])
    }

    pub fn content(shortname: &str, body: Value) -> Record {
        Record::new(ResourceType::Content, shortname, "/").with_body(body)
    }
}
