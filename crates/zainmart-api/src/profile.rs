use serde_json::{Value, json};
use tracing::error;

use zainmart_types::{
    AttachmentLocator, Body, QueryRequest, QueryType, Record, RecordRequest, ResourceType, Scope,
    SortType, Text, Upload,
};

use crate::Client;

/// Fields written by [`Client::update_profile`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub shortname: String,
    pub displayname: Option<Text>,
    pub description: Option<Text>,
    pub email: Option<String>,
    pub payload: Option<Value>,
}

/// An image or document picked by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn avatar_subpath(shortname: &str) -> String {
    format!("people/{}/protected/avatar", shortname)
}

impl Client {
    pub async fn get_profile(&self) -> Option<Record> {
        match self.platform().get_profile().await {
            Ok(resp) => resp.into_first(),
            Err(e) => {
                error!("Failed to load profile: {}", e);
                None
            }
        }
    }

    /// URL of the user's avatar image, if one was uploaded.
    pub async fn get_avatar_url(&self, shortname: &str) -> Option<String> {
        let query = QueryRequest::new(QueryType::Attachments, "personal", avatar_subpath(shortname))
            .matching("@resource_type:media")
            .sorted("shortname", SortType::Ascending)
            .page(1, 0)
            .with_payload(false);
        let record = self.query_first(query, Scope::Public).await?;
        let file = match record.body()? {
            Body::Raw(name) => name.clone(),
            Body::Json(Value::String(name)) => name.clone(),
            Body::Json(_) => return None,
        };

        Some(self.platform().attachment_url(AttachmentLocator {
            resource_type: ResourceType::Media,
            space_name: "personal".into(),
            subpath: format!("people/{}/protected/", shortname),
            parent_shortname: "avatar".into(),
            shortname: file,
            ext: None,
            scope: Scope::Public,
        }))
    }

    pub async fn set_avatar(&self, shortname: &str, file: FileUpload) -> bool {
        let upload = Upload {
            space_name: "personal".into(),
            subpath: avatar_subpath(shortname),
            shortname: "avatar".into(),
            resource_type: ResourceType::Media,
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
            attributes: None,
        };
        match self.platform().upload_with_payload(upload).await {
            Ok(resp) => resp.is_success() && !resp.records.is_empty(),
            Err(e) => {
                error!(user = shortname, "Avatar upload failed: {}", e);
                false
            }
        }
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> bool {
        let record = RecordRequest::new(ResourceType::User, update.shortname, "users").attributes(json!({
            "displayname": update.displayname,
            "description": update.description,
            "email": update.email,
            "payload": update.payload,
        }));
        self.update_user(record).await
    }

    pub async fn update_password(&self, shortname: &str, password: &str) -> bool {
        let record = RecordRequest::new(ResourceType::User, shortname, "users")
            .attributes(json!({ "password": password }));
        self.update_user(record).await
    }

    async fn update_user(&self, record: RecordRequest) -> bool {
        let shortname = record.shortname.clone();
        match self.platform().update_user(record).await {
            Ok(resp) => resp.is_success(),
            Err(e) => {
                error!(user = %shortname, "User update failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, ok};
    use zainmart_platform::{MockPlatform, PlatformError};

    #[tokio::test]
    async fn test_avatar_url_uses_payload_file_name() {
        let mut mock = MockPlatform::new();
        mock.expect_query()
            .withf(|q, scope| {
                q.query_type == QueryType::Attachments
                    && q.subpath == "people/alice/protected/avatar"
                    && q.limit == Some(1)
                    && *scope == Scope::Public
            })
            .return_once(|_, _| {
                Ok(ok(vec![Record::new(ResourceType::Media, "avatar", "/").with_body(json!("me.png"))]))
            });
        mock.expect_attachment_url()
            .withf(|l| l.parent_shortname == "avatar" && l.shortname == "me.png" && l.subpath == "people/alice/protected/")
            .return_const("https://x/avatar/me.png".to_string());

        let url = client(mock).get_avatar_url("alice").await;
        assert_eq!(url.as_deref(), Some("https://x/avatar/me.png"));
    }

    #[tokio::test]
    async fn test_no_avatar() {
        let mut mock = MockPlatform::new();
        mock.expect_query().return_once(|_, _| Ok(ok(Vec::new())));
        assert!(client(mock).get_avatar_url("alice").await.is_none());
    }

    #[tokio::test]
    async fn test_set_avatar_needs_a_record_back() {
        let mut mock = MockPlatform::new();
        mock.expect_upload_with_payload()
            .withf(|u| u.shortname == "avatar" && u.space_name == "personal")
            .return_once(|_| Ok(ok(Vec::new())));
        let file = FileUpload { file_name: "me.png".into(), content_type: "image/png".into(), bytes: vec![1, 2] };
        assert!(!client(mock).set_avatar("alice", file).await);
    }

    #[tokio::test]
    async fn test_update_password_degrades_to_false() {
        let mut mock = MockPlatform::new();
        mock.expect_update_user()
            .withf(|r| r.subpath == "users" && r.attributes["password"] == "n3w")
            .return_once(|_| Err(PlatformError::Api { status: 403, message: "denied".into() }));
        assert!(!client(mock).update_password("alice", "n3w").await);
    }
}
