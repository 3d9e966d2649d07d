//! Abuse reports, stored as workflow tickets in the `Report` space.

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::{error, warn};

use zainmart_types::models::{NewReport, ReportAction, ReportBody, ReportReply, ReportStatus};
use zainmart_types::{
    ActionRequest, Entry, ProgressTicket, QueryRequest, Record, RecordRequest, RequestType, ResourceType, Scope,
    SortType,
};

use crate::Client;

pub const REPORT_SPACE: &str = "Report";
const REPORT_SCHEMA: &str = "report";
const REPORT_WORKFLOW: &str = "report_workflow";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Text stored for a reply, with the moderation action appended.
pub fn reply_text(reply: &str, action: Option<ReportAction>) -> String {
    match action {
        Some(action) => format!("{} [Action taken: {}]", reply, action.as_str()),
        None => reply.to_string(),
    }
}

impl Client {
    pub async fn create_report(&self, report: &NewReport) -> bool {
        let body = ReportBody {
            title: report.title.clone(),
            description: report.description.clone(),
            reported_entry: Some(report.reported_entry.clone()),
            reported_entry_title: Some(report.reported_entry_title.clone()),
            reported_space: Some(report.space_name.clone()),
            reported_subpath: Some(report.subpath.clone()),
            report_type: Some(report.report_type.clone()),
            created_at: Some(now_iso()),
            ..Default::default()
        };
        let status = report.status.as_deref().unwrap_or("pending");
        let record = RecordRequest::new(ResourceType::Ticket, "auto", "/reports").attributes(json!({
            "is_active": true,
            "displayname": { "en": report.title, "ar": report.title, "ku": report.title },
            "tags": [report.report_type, status],
            "workflow_shortname": REPORT_WORKFLOW,
            "payload": {
                "content_type": "json",
                "schema_shortname": REPORT_SCHEMA,
                "body": body,
            },
        }));
        self.act_shortname(ActionRequest::single(REPORT_SPACE, RequestType::Create, record))
            .await
            .is_some()
    }

    /// Reports newest first, optionally narrowed to one status tag.
    pub async fn get_reports(&self, status: Option<&str>, limit: u32, offset: u32) -> Vec<Record> {
        let search = match status {
            Some(status) => format!("@resource_type:ticket AND @tags:{}", status),
            None => "@resource_type:ticket".to_string(),
        };
        let query = QueryRequest::search(REPORT_SPACE, "/reports")
            .matching(search)
            .sorted("created_at", SortType::Descending)
            .page(limit, offset)
            .exact(false)
            .with_payload(true)
            .with_attachments(true);
        self.query_records(query, Scope::Managed).await
    }

    pub async fn get_report_details(&self, shortname: &str) -> Option<Entry> {
        self.get_entity(shortname, REPORT_SPACE, "/reports", ResourceType::Ticket, Scope::Managed, true, true)
            .await
    }

    /// Appends the admin's reply (if any), rewrites the status tag, then moves
    /// the ticket along the workflow action named after the new status.
    pub async fn update_report_status(&self, shortname: &str, status: ReportStatus, admin: &str, reply: Option<&str>) -> bool {
        let Some(report) = self.get_report_details(shortname).await else {
            return false;
        };
        let Some(mut body) = report.decode_body::<ReportBody>() else {
            warn!(shortname, "Report has no readable body");
            return false;
        };
        if let Some(reply) = reply.filter(|r| !r.is_empty()) {
            body.replies.push(ReportReply {
                timestamp: now_iso(),
                admin_shortname: admin.to_string(),
                reply: reply.to_string(),
                action: status.reply_action().to_string(),
            });
        }
        body.updated_at = Some(now_iso());

        let category = report.meta.tags.first().map(String::as_str).unwrap_or("general");
        let record = RecordRequest::new(ResourceType::Ticket, shortname, "reports").attributes(json!({
            "is_active": true,
            "tags": [category, status.as_str()],
            "payload": { "content_type": "json", "body": body },
        }));
        if !self.act_ok(ActionRequest::single(REPORT_SPACE, RequestType::Update, record)).await {
            return false;
        }

        let ticket = ProgressTicket {
            space_name: REPORT_SPACE.to_string(),
            subpath: "reports".to_string(),
            shortname: shortname.to_string(),
            action: status.as_str().to_string(),
        };
        match self.platform.progress_ticket(ticket).await {
            Ok(resp) => resp.is_success(),
            Err(e) => {
                error!(shortname, "Error progressing report: {}", e);
                false
            }
        }
    }

    /// Replies to a report. Any moderation action resolves it; `DeleteEntry`
    /// also deactivates the reported entry when it can be found.
    pub async fn reply_to_report(&self, shortname: &str, admin: &str, reply: &str, action: Option<ReportAction>) -> bool {
        let status = if action.is_some() { ReportStatus::Resolved } else { ReportStatus::Pending };
        let text = reply_text(reply, action);

        let target = self
            .get_report_details(shortname)
            .await
            .and_then(|r| r.decode_body::<ReportBody>())
            .and_then(|b| match (b.reported_entry, b.reported_space, b.reported_subpath) {
                (Some(entry), Some(space), Some(subpath)) if !entry.is_empty() => Some((entry, space, subpath)),
                _ => None,
            });

        match target {
            None => warn!(shortname, "No reported entry found in report details"),
            Some((entry, space, subpath)) if action == Some(ReportAction::DeleteEntry) => {
                let mut found = None;
                for resource_type in [ResourceType::Content, ResourceType::Ticket, ResourceType::Media] {
                    if self
                        .get_entity(&entry, &space, &subpath, resource_type, Scope::Managed, false, false)
                        .await
                        .is_some()
                    {
                        found = Some(resource_type);
                        break;
                    }
                }
                match found {
                    Some(resource_type) => {
                        let deactivated = self
                            .update_dmart_entity(&entry, &space, &subpath, resource_type, json!({ "is_active": false }), false)
                            .await;
                        if deactivated.is_none() {
                            error!(entry = %entry, "Error deactivating reported entry");
                        }
                    }
                    None => warn!(entry = %entry, "Could not retrieve reported entity"),
                }
            }
            Some(_) => {}
        }

        self.update_report_status(shortname, status, admin, Some(&text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, created, ok};
    use std::sync::{Arc, Mutex};
    use zainmart_platform::{MockPlatform, PlatformError};
    use zainmart_types::{Body, Payload};

    fn report_entry(body: serde_json::Value) -> Entry {
        let mut entry = Entry {
            shortname: "rep1".into(),
            ..Default::default()
        };
        entry.meta.tags = vec!["spam".into(), "pending".into()];
        entry.meta.payload = Some(Payload {
            body: Some(Body::from(body)),
            ..Default::default()
        });
        entry
    }

    fn reported() -> serde_json::Value {
        json!({
            "title": "Fake listing",
            "description": "x",
            "reported_entry": "p1",
            "reported_space": "zainmart",
            "reported_subpath": "products",
            "replies": [{ "timestamp": "t", "admin_shortname": "a", "reply": "seen", "action": "Replied" }],
        })
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(reply_text("done", Some(ReportAction::WarnUser)), "done [Action taken: warn_user]");
        assert_eq!(reply_text("looking", None), "looking");
    }

    #[tokio::test]
    async fn test_create_report_shape() {
        let mut mock = MockPlatform::new();
        mock.expect_request()
            .withf(|a| {
                let attrs = &a.records[0].attributes;
                a.space_name == "Report"
                    && a.records[0].resource_type == ResourceType::Ticket
                    && attrs["tags"] == json!(["spam", "pending"])
                    && attrs["workflow_shortname"] == "report_workflow"
                    && attrs["payload"]["body"]["reported_space"] == "zainmart"
                    && attrs["payload"]["body"]["replies"] == json!([])
            })
            .return_once(|_| Ok(created("rep1")));
        let report = NewReport {
            title: "Fake listing".into(),
            description: "x".into(),
            reported_entry: "p1".into(),
            reported_entry_title: "Phone".into(),
            space_name: "zainmart".into(),
            subpath: "products".into(),
            report_type: "spam".into(),
            status: None,
        };
        assert!(client(mock).create_report(&report).await);
    }

    #[tokio::test]
    async fn test_status_filter_search() {
        let mut mock = MockPlatform::new();
        mock.expect_query()
            .withf(|q, _| q.search.as_deref() == Some("@resource_type:ticket AND @tags:Resolved"))
            .return_once(|_, _| Ok(ok(Vec::new())));
        assert!(client(mock).get_reports(Some("Resolved"), 100, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_appends_reply_then_progresses() {
        let mut mock = MockPlatform::new();
        mock.expect_retrieve_entry().return_once(|_, _| Ok(report_entry(reported())));
        mock.expect_request()
            .withf(|a| {
                let attrs = &a.records[0].attributes;
                let replies = &attrs["payload"]["body"]["replies"];
                a.records[0].subpath == "reports"
                    && attrs["tags"] == json!(["spam", "Canceled"])
                    && replies.as_array().map(Vec::len) == Some(2)
                    && replies[1]["action"] == "Canceled"
                    && replies[1]["admin_shortname"] == "admin"
            })
            .return_once(|_| Ok(ok(Vec::new())));
        mock.expect_progress_ticket()
            .withf(|t| t.action == "Canceled" && t.subpath == "reports" && t.shortname == "rep1")
            .return_once(|_| Ok(ok(Vec::new())));
        assert!(client(mock).update_report_status("rep1", ReportStatus::Canceled, "admin", Some("duplicate")).await);
    }

    #[tokio::test]
    async fn test_failed_update_skips_progress() {
        let mut mock = MockPlatform::new();
        mock.expect_retrieve_entry().return_once(|_, _| Ok(report_entry(reported())));
        mock.expect_request()
            .return_once(|_| Err(PlatformError::Api { status: 500, message: "down".into() }));
        mock.expect_progress_ticket().never();
        assert!(!client(mock).update_report_status("rep1", ReportStatus::Resolved, "admin", None).await);
    }

    #[tokio::test]
    async fn test_delete_entry_action_deactivates_reported_entry() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let mut mock = MockPlatform::new();
        mock.expect_retrieve_entry().returning(|locator, _| match (locator.space_name.as_str(), locator.resource_type) {
            ("Report", _) => Ok(report_entry(reported())),
            (_, ResourceType::Content) => Err(PlatformError::Api { status: 404, message: "missing".into() }),
            (_, ResourceType::Ticket) => Ok(Entry { shortname: "p1".into(), ..Default::default() }),
            _ => Err(PlatformError::Api { status: 404, message: "missing".into() }),
        });
        let seen = updates.clone();
        mock.expect_request().times(2).returning(move |a| {
            seen.lock().unwrap().push(a.clone());
            Ok(created(&a.records[0].shortname))
        });
        mock.expect_progress_ticket()
            .withf(|t| t.action == "Resolved")
            .return_once(|_| Ok(ok(Vec::new())));

        assert!(client(mock).reply_to_report("rep1", "admin", "removed", Some(ReportAction::DeleteEntry)).await);

        let updates = updates.lock().unwrap();
        assert_eq!(updates[0].space_name, "zainmart");
        assert_eq!(updates[0].records[0].resource_type, ResourceType::Ticket);
        assert_eq!(updates[0].records[0].attributes, json!({ "is_active": false }));
        let reply = &updates[1].records[0].attributes["payload"]["body"]["replies"][1];
        assert_eq!(reply["reply"], "removed [Action taken: delete_entry]");
        assert_eq!(reply["action"], "Resolved");
    }

    #[tokio::test]
    async fn test_plain_reply_keeps_report_pending() {
        let mut mock = MockPlatform::new();
        mock.expect_retrieve_entry()
            .times(2)
            .returning(|_, _| Ok(report_entry(json!({ "title": "t", "description": "d" }))));
        mock.expect_request()
            .withf(|a| a.records[0].attributes["tags"][1] == "Pending")
            .return_once(|_| Ok(ok(Vec::new())));
        mock.expect_progress_ticket()
            .withf(|t| t.action == "Pending")
            .return_once(|_| Ok(ok(Vec::new())));
        assert!(client(mock).reply_to_report("rep1", "admin", "checking", None).await);
    }
}
