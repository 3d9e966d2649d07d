use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use zainmart_types::{
    ActionRequest, ActionResponse, ApiResponse, AttachmentLocator, Credentials, Entry,
    EntryLocator, ProgressTicket, QueryRequest, QueryResponse, RecordRequest, Scope, Submission,
    Upload,
};

use crate::{Platform, PlatformError};

/// Platform client over HTTP. Holds the access token issued by `login`.
pub struct HttpPlatform {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpPlatform {
    pub fn new(base_url: &str) -> Result<Self, PlatformError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PlatformError::Url(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            ..self
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_raw(&self, builder: RequestBuilder) -> Result<String, PlatformError> {
        let resp = self.authed(builder).await.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let message = error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            warn!("Platform call failed ({}): {}", status, message);
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(text)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<ApiResponse, PlatformError> {
        let text = self.send_raw(builder).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pulls `error.message` out of a platform error envelope, falling back to
/// the raw body when it is not JSON.
fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(_) => {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

/// Subpath as a URL path segment: no surrounding slashes, `__root__` when empty.
pub fn subpath_segment(subpath: &str) -> &str {
    let trimmed = subpath.trim_matches('/');
    if trimmed.is_empty() { "__root__" } else { trimmed }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn query(&self, query: QueryRequest, scope: Scope) -> Result<QueryResponse, PlatformError> {
        debug!(space = %query.space_name, subpath = %query.subpath, "query");
        let builder = self.client.post(self.url(&format!("{}/query", scope))).json(&query);
        self.send(builder).await
    }

    async fn request(&self, action: ActionRequest) -> Result<ActionResponse, PlatformError> {
        debug!(space = %action.space_name, records = action.records.len(), "request");
        let builder = self.client.post(self.url("managed/request")).json(&action);
        self.send(builder).await
    }

    async fn progress_ticket(&self, ticket: ProgressTicket) -> Result<ActionResponse, PlatformError> {
        let path = format!(
            "managed/progress-ticket/{}/{}/{}/{}",
            ticket.space_name,
            subpath_segment(&ticket.subpath),
            ticket.shortname,
            ticket.action
        );
        let builder = self.client.put(self.url(&path)).json(&json!({}));
        self.send(builder).await
    }

    async fn retrieve_entry(&self, locator: EntryLocator, scope: Scope) -> Result<Entry, PlatformError> {
        let path = format!(
            "{}/entry/{}/{}/{}/{}",
            scope,
            locator.resource_type,
            locator.space_name,
            subpath_segment(&locator.subpath),
            locator.shortname
        );
        let builder = self.client.get(self.url(&path)).query(&[
            ("retrieve_json_payload", locator.retrieve_json_payload),
            ("retrieve_attachments", locator.retrieve_attachments),
            ("validate_schema", locator.validate_schema),
        ]);
        let text = self.send_raw(builder).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn login(&self, credentials: Credentials) -> Result<ActionResponse, PlatformError> {
        let builder = self.client.post(self.url("user/login")).json(&credentials.to_json());
        let response = self.send(builder).await?;
        let token = response
            .records
            .first()
            .and_then(|r| r.attributes.extra_str("access_token"))
            .map(str::to_string);
        match token {
            Some(token) if response.is_success() => *self.token.write().await = Some(token),
            _ => warn!("Login response carried no access token"),
        }
        Ok(response)
    }

    async fn logout(&self) -> Result<(), PlatformError> {
        let result = self.send_raw(self.client.post(self.url("user/logout")).json(&json!({}))).await;
        *self.token.write().await = None;
        result.map(|_| ())
    }

    async fn get_profile(&self) -> Result<ActionResponse, PlatformError> {
        self.send(self.client.get(self.url("user/profile"))).await
    }

    async fn otp_request(&self, email: String) -> Result<ActionResponse, PlatformError> {
        let builder = self.client.post(self.url("user/otp-request")).json(&json!({ "email": email }));
        self.send(builder).await
    }

    async fn check_existing(&self, prop: String, value: String) -> Result<bool, PlatformError> {
        let builder = self.client.get(self.url("user/check-existing")).query(&[(prop, value)]);
        let response = self.send(builder).await?;
        Ok(response
            .attributes
            .as_ref()
            .and_then(|a| a.extra.get("unique"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn create_user(&self, record: RecordRequest) -> Result<ActionResponse, PlatformError> {
        self.send(self.client.post(self.url("user/create")).json(&record)).await
    }

    async fn update_user(&self, record: RecordRequest) -> Result<ActionResponse, PlatformError> {
        self.send(self.client.post(self.url("user/profile")).json(&record)).await
    }

    async fn submit(&self, submission: Submission) -> Result<ActionResponse, PlatformError> {
        let path = format!(
            "public/submit/{}/{}/{}/{}",
            submission.space_name,
            submission.resource_type,
            submission.schema_shortname,
            subpath_segment(&submission.subpath)
        );
        self.send(self.client.post(self.url(&path)).json(&submission.body)).await
    }

    async fn upload_with_payload(&self, upload: Upload) -> Result<ActionResponse, PlatformError> {
        let record = json!({
            "resource_type": upload.resource_type,
            "subpath": upload.subpath,
            "shortname": upload.shortname,
            "attributes": upload.attributes.unwrap_or_else(|| json!({ "is_active": true })),
        });
        let record_part = Part::bytes(serde_json::to_vec(&record)?)
            .file_name("record.json")
            .mime_str("application/json")?;
        let file_part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = Form::new()
            .text("space_name", upload.space_name)
            .part("request_record", record_part)
            .part("payload_file", file_part);
        let builder = self.client.post(self.url("managed/resource_with_payload")).multipart(form);
        self.send(builder).await
    }

    fn attachment_url(&self, locator: AttachmentLocator) -> String {
        let ext = locator.ext.map(|e| format!(".{}", e)).unwrap_or_default();
        format!(
            "{}/{}/payload/{}/{}/{}/{}/{}{}",
            self.base_url,
            locator.scope,
            locator.resource_type,
            locator.space_name,
            subpath_segment(&locator.subpath),
            locator.parent_shortname,
            locator.shortname,
            ext
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use zainmart_types::{RequestType, ResourceType};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn bearer(headers: &HeaderMap) -> String {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    }

    async fn stub_login(Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["shortname"], "alice");
        Json(json!({
            "status": "success",
            "records": [{
                "resource_type": "user",
                "shortname": "alice",
                "subpath": "users",
                "attributes": {"access_token": "tok-1", "roles": ["zm_seller"]}
            }]
        }))
    }

    async fn stub_query(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "status": "success",
            "records": [{
                "resource_type": "content",
                "shortname": body["space_name"],
                "subpath": body["subpath"],
                "attributes": {"owner_shortname": bearer(&headers)}
            }],
            "attributes": {"total": 1, "returned": 1}
        }))
    }

    async fn stub_request() -> (StatusCode, Json<Value>) {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "failed", "error": {"type": "request", "code": 400, "message": "Shortname taken"}})),
        )
    }

    async fn stub_entry(
        Path((rt, space, rest)): Path<(String, String, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        Json(json!({
            "shortname": rest,
            "is_active": true,
            "tags": [rt, space],
            "payload": {"content_type": "json", "body": {"attachments_flag": params.get("retrieve_attachments")}}
        }))
    }

    async fn stub_check(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let unique = params.get("email").map(|e| e != "taken@zain.iq").unwrap_or(false);
        Json(json!({"status": "success", "attributes": {"unique": unique}}))
    }

    async fn stub_router() -> String {
        let router = Router::new()
            .route("/user/login", post(stub_login))
            .route("/user/logout", post(|| async { Json(json!({"status": "success"})) }))
            .route("/user/check-existing", get(stub_check))
            .route("/managed/query", post(stub_query))
            .route("/public/query", post(stub_query))
            .route("/managed/request", post(stub_request))
            .route("/managed/entry/{rt}/{space}/{*rest}", get(stub_entry));
        spawn(router).await
    }

    #[tokio::test]
    async fn test_login_stores_token_and_sends_bearer() {
        let base = stub_router().await;
        let platform = HttpPlatform::new(&base).unwrap();

        let resp = platform.login(Credentials::shortname("alice", "pw")).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(platform.token().await.as_deref(), Some("tok-1"));

        let resp = platform
            .query(QueryRequest::search("messages", "messages"), Scope::Managed)
            .await
            .unwrap();
        assert_eq!(resp.records[0].shortname, "messages");
        assert_eq!(resp.records[0].attributes.owner_shortname.as_deref(), Some("Bearer tok-1"));
        assert_eq!(resp.total(), Some(1));

        platform.logout().await.unwrap();
        assert!(platform.token().await.is_none());
    }

    #[tokio::test]
    async fn test_error_envelope_becomes_api_error() {
        let base = stub_router().await;
        let platform = HttpPlatform::new(&base).unwrap();
        let action = ActionRequest::single(
            "zainmart",
            RequestType::Create,
            RecordRequest::new(ResourceType::Content, "auto", "/products"),
        );
        let err = platform.request(action).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.server_message(), Some("Shortname taken"));
    }

    #[tokio::test]
    async fn test_retrieve_entry_path_and_flags() {
        let base = stub_router().await;
        let platform = HttpPlatform::new(&base).unwrap();
        let locator = EntryLocator::new(ResourceType::Content, "messages", "/groups", "g1").with_attachments(true);
        let entry = platform.retrieve_entry(locator, Scope::Managed).await.unwrap();
        assert_eq!(entry.shortname, "groups/g1");
        assert_eq!(entry.meta.tags, vec!["content", "messages"]);
        assert_eq!(entry.body().and_then(|b| b.str_field("attachments_flag")).as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_check_existing_reads_unique_flag() {
        let base = stub_router().await;
        let platform = HttpPlatform::new(&base).unwrap();
        assert!(platform.check_existing("email".into(), "new@zain.iq".into()).await.unwrap());
        assert!(!platform.check_existing("email".into(), "taken@zain.iq".into()).await.unwrap());
    }

    #[test]
    fn test_attachment_url_layout() {
        let platform = HttpPlatform::new("https://api.dmart.cc/").unwrap();
        let url = platform.attachment_url(AttachmentLocator {
            resource_type: ResourceType::Media,
            space_name: "personal".into(),
            subpath: "people/alice/protected/".into(),
            parent_shortname: "avatar".into(),
            shortname: "pic.png".into(),
            ext: None,
            scope: Scope::Public,
        });
        assert_eq!(url, "https://api.dmart.cc/public/payload/media/personal/people/alice/protected/avatar/pic.png");
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(matches!(HttpPlatform::new("api.dmart.cc"), Err(PlatformError::Url(_))));
    }

    #[test]
    fn test_subpath_segment() {
        assert_eq!(subpath_segment("/"), "__root__");
        assert_eq!(subpath_segment("/orders/acme/"), "orders/acme");
    }
}
