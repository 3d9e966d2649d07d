use serde_json::json;

use zainmart_types::{ActionRequest, QueryRequest, Record, RecordRequest, RequestType, ResourceType, Scope, SortType};

use crate::Client;

const NOTIFICATIONS_SPACE: &str = "personal";

fn notifications_subpath(user: &str) -> String {
    format!("people/{}/notifications", user)
}

impl Client {
    /// Newest first (notification shortnames sort by time).
    pub async fn fetch_notifications(&self, user: &str) -> Vec<Record> {
        let query = QueryRequest::search(NOTIFICATIONS_SPACE, notifications_subpath(user))
            .page(100, 0)
            .sorted("shortname", SortType::Descending)
            .matching("")
            .with_payload(true);
        self.query_records(query, Scope::Managed).await
    }

    pub async fn mark_notification(&self, user: &str, shortname: &str, read: bool) -> bool {
        let is_read = if read { "yes" } else { "no" };
        let record = RecordRequest::new(ResourceType::Content, shortname, notifications_subpath(user)).attributes(json!({
            "payload": {
                "schema_shortname": null,
                "body": { "is_read": is_read },
            },
        }));
        self.act_ok(ActionRequest::single(NOTIFICATIONS_SPACE, RequestType::Update, record)).await
    }

    pub async fn delete_notification(&self, user: &str, shortname: &str) -> bool {
        let record = RecordRequest::new(ResourceType::Content, shortname, notifications_subpath(user));
        self.act_ok(ActionRequest::single(NOTIFICATIONS_SPACE, RequestType::Delete, record)).await
    }

    pub async fn delete_notifications(&self, user: &str, shortnames: &[String]) -> bool {
        let subpath = notifications_subpath(user);
        let records = shortnames
            .iter()
            .map(|s| RecordRequest::new(ResourceType::Content, s.as_str(), subpath.as_str()))
            .collect();
        self.act_ok(ActionRequest::new(NOTIFICATIONS_SPACE, RequestType::Delete, records)).await
    }
}
