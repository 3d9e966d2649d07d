//! Administration: roles and permissions, users, storefront settings
//! (collections, regions, payment methods, widgets) and the contact inbox.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, warn};

use zainmart_types::models::{ConfigItem, RegionKind};
use zainmart_types::{ActionRequest, QueryRequest, Record, RecordRequest, RequestType, ResourceType, Scope, SortType, Translation};

use crate::profile::FileUpload;
use crate::Client;

pub const DEFAULT_ROLE_KEY: &str = "default_user_role";

const CONFIG_SPACE: &str = "applications";
const CONFIG_SUBPATH: &str = "public";
const CONFIG_SHORTNAME: &str = "web_config";

const COLLECTIONS: &str = "/settings/collections";
const REGIONS: &str = "/settings/regions";
const PAYMENT_METHODS: &str = "/settings/payment_methods";
const WIDGETS: &str = "/settings/widgets";

/// Workflow and schema a record is bound to. Only written when both are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowBinding {
    pub workflow_shortname: String,
    pub schema_shortname: String,
}

fn bind_workflow(attributes: &mut Value, binding: Option<&WorkflowBinding>) {
    if let Some(b) = binding.filter(|b| !b.workflow_shortname.is_empty() && !b.schema_shortname.is_empty()) {
        attributes["workflow_shortname"] = json!(b.workflow_shortname);
        attributes["schema_shortname"] = json!(b.schema_shortname);
    }
}

fn to_attributes<T: Serialize>(draft: &T, binding: Option<&WorkflowBinding>) -> Value {
    let mut attributes = serde_json::to_value(draft).unwrap_or_else(|_| Value::Object(Map::new()));
    bind_workflow(&mut attributes, binding);
    attributes
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDraft {
    #[serde(skip)]
    pub shortname: Option<String>,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub relationships: Vec<Value>,
    pub permissions: Vec<String>,
    pub displayname: Translation,
    pub description: Translation,
    pub slug: Option<String>,
}

impl Default for RoleDraft {
    fn default() -> Self {
        Self {
            shortname: None,
            is_active: true,
            tags: Vec::new(),
            relationships: Vec::new(),
            permissions: Vec::new(),
            displayname: Translation::default(),
            description: Translation::default(),
            slug: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionDraft {
    #[serde(skip)]
    pub shortname: Option<String>,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub relationships: Vec<Value>,
    pub acl: Vec<Value>,
    pub subpaths: Map<String, Value>,
    pub resource_types: Vec<String>,
    pub actions: Vec<String>,
    pub conditions: Vec<String>,
    pub restricted_fields: Vec<String>,
    pub allowed_fields_values: Map<String, Value>,
    pub attachments: Map<String, Value>,
    pub slug: Option<String>,
}

impl Default for PermissionDraft {
    fn default() -> Self {
        Self {
            shortname: None,
            is_active: true,
            tags: Vec::new(),
            relationships: Vec::new(),
            acl: Vec::new(),
            subpaths: Map::new(),
            resource_types: Vec::new(),
            actions: Vec::new(),
            conditions: Vec::new(),
            restricted_fields: Vec::new(),
            allowed_fields_values: Map::new(),
            attachments: Map::new(),
            slug: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDraft {
    pub shortname: Option<String>,
    pub displayname: Translation,
    pub description: Translation,
    pub is_active: bool,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionDraft {
    pub shortname: String,
    pub is_active: bool,
    pub kind: RegionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMethodDraft {
    pub shortname: String,
    pub displayname: Translation,
    pub description: Translation,
    pub is_active: bool,
    pub order: i64,
}

fn draft_shortname(shortname: &Option<String>) -> &str {
    shortname.as_deref().filter(|s| !s.is_empty()).unwrap_or("auto")
}

fn collection_attributes(draft: &CollectionDraft) -> Value {
    json!({
        "displayname": draft.displayname,
        "description": draft.description,
        "is_active": draft.is_active,
        "payload": { "content_type": "json", "body": { "items": draft.items } },
    })
}

fn region_attributes(draft: &RegionDraft) -> Value {
    json!({
        "is_active": draft.is_active,
        "payload": { "content_type": "json", "body": draft.kind },
    })
}

/// Payment methods keep their whole definition nested inside the body.
fn payment_method_attributes(draft: &PaymentMethodDraft) -> Value {
    json!({
        "payload": {
            "content_type": "json",
            "body": {
                "shortname": draft.shortname,
                "displayname": draft.displayname,
                "description": draft.description,
                "is_active": draft.is_active,
                "payload": { "content_type": "json", "body": { "order": draft.order } },
            },
        },
    })
}

/// Sets `key` in the config list, replacing the first entry with that key or
/// appending a new one.
pub fn upsert_config_item(items: &mut Vec<ConfigItem>, key: &str, value: Value) {
    match items.iter_mut().find(|item| item.key == key) {
        Some(item) => item.value = value,
        None => items.push(ConfigItem { key: key.to_string(), value }),
    }
}

fn users_listing(search: String, limit: u32, offset: u32) -> QueryRequest {
    QueryRequest::search("management", "users")
        .matching(search)
        .sorted("shortname", SortType::Ascending)
        .page(limit, offset)
        .exact(false)
        .with_payload(true)
}

impl Client {
    // -- Roles & permissions --

    pub async fn create_role(
        &self,
        role: &RoleDraft,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        workflow: Option<&WorkflowBinding>,
    ) -> Option<String> {
        let record = RecordRequest::new(resource_type, draft_shortname(&role.shortname), subpath)
            .attributes(to_attributes(role, workflow));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
    }

    pub async fn update_role(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        role: &RoleDraft,
        workflow: Option<&WorkflowBinding>,
    ) -> Option<String> {
        let record = RecordRequest::new(resource_type, shortname, subpath).attributes(to_attributes(role, workflow));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    pub async fn create_permission(
        &self,
        permission: &PermissionDraft,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        workflow: Option<&WorkflowBinding>,
    ) -> Option<String> {
        let record = RecordRequest::new(resource_type, draft_shortname(&permission.shortname), subpath)
            .attributes(to_attributes(permission, workflow));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
    }

    pub async fn update_permission(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        permission: &PermissionDraft,
        workflow: Option<&WorkflowBinding>,
    ) -> Option<String> {
        let record = RecordRequest::new(resource_type, shortname, subpath).attributes(to_attributes(permission, workflow));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    /// Stores the role new users receive in the public web config, creating
    /// the config when it does not exist yet.
    pub async fn set_default_user_role(&self, role: &str) -> bool {
        let existing = self
            .get_entity(CONFIG_SHORTNAME, CONFIG_SPACE, CONFIG_SUBPATH, ResourceType::Content, Scope::Managed, true, false)
            .await;

        let Some(config) = existing else {
            let record = RecordRequest::new(ResourceType::Content, CONFIG_SHORTNAME, CONFIG_SUBPATH).attributes(json!({
                "is_active": true,
                "tags": ["config", "user_role"],
                "payload": {
                    "content_type": "json",
                    "body": { "items": [ConfigItem { key: DEFAULT_ROLE_KEY.to_string(), value: json!(role) }] },
                },
            }));
            return self
                .act_shortname(ActionRequest::single(CONFIG_SPACE, RequestType::Create, record))
                .await
                .is_some();
        };

        let mut items: Vec<ConfigItem> = config
            .body()
            .and_then(|b| b.field("items"))
            .and_then(|items| serde_json::from_value(items).ok())
            .unwrap_or_default();
        upsert_config_item(&mut items, DEFAULT_ROLE_KEY, json!(role));

        let attributes = json!({ "payload": { "content_type": "json", "body": { "items": items } } });
        self.update_dmart_entity(CONFIG_SHORTNAME, CONFIG_SPACE, CONFIG_SUBPATH, ResourceType::Content, attributes, true)
            .await
            .is_some()
    }

    // -- Users --

    pub async fn get_all_users(&self, limit: u32, offset: u32) -> Vec<Record> {
        self.query_records(users_listing("@resource_type:user".to_string(), limit, offset), Scope::Managed)
            .await
    }

    pub async fn filter_users_by_role(&self, role: &str, limit: u32, offset: u32) -> Vec<Record> {
        let search = format!("@resource_type:user @roles:{}", role);
        self.query_records(users_listing(search, limit, offset), Scope::Managed)
            .await
    }

    /// Replaces the user's role list.
    pub async fn update_user_roles(&self, user: &str, roles: &[String]) -> bool {
        let record = RecordRequest::new(ResourceType::User, user, "users").attributes(json!({ "roles": roles }));
        self.act_ok(ActionRequest::single("management", RequestType::Update, record))
            .await
    }

    // -- Storefront settings --

    pub async fn create_collection(&self, space_name: &str, collection: &CollectionDraft) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, draft_shortname(&collection.shortname), COLLECTIONS)
            .attributes(collection_attributes(collection));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
    }

    pub async fn update_collection(&self, space_name: &str, collection: &CollectionDraft) -> Option<String> {
        let Some(shortname) = collection.shortname.as_deref().filter(|s| !s.is_empty()) else {
            warn!("Collection update without a shortname");
            return None;
        };
        let record = RecordRequest::new(ResourceType::Content, shortname, COLLECTIONS)
            .attributes(collection_attributes(collection));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    pub async fn create_region(&self, space_name: &str, region: &RegionDraft) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, region.shortname.as_str(), REGIONS).attributes(region_attributes(region));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
    }

    pub async fn update_region(&self, space_name: &str, region: &RegionDraft) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, region.shortname.as_str(), REGIONS).attributes(region_attributes(region));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    pub async fn create_payment_method(&self, space_name: &str, method: &PaymentMethodDraft) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, method.shortname.as_str(), PAYMENT_METHODS)
            .attributes(payment_method_attributes(method));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
    }

    pub async fn update_payment_method(&self, space_name: &str, method: &PaymentMethodDraft) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, method.shortname.as_str(), PAYMENT_METHODS)
            .attributes(payment_method_attributes(method));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    pub async fn get_widgets(&self, space_name: &str) -> Vec<Record> {
        let query = QueryRequest::search(space_name, WIDGETS)
            .matching("@resource_type:content")
            .sorted("shortname", SortType::Ascending)
            .page(10, 0)
            .exact(true)
            .with_payload(true)
            .with_attachments(true);
        self.query_records(query, Scope::Managed).await
    }

    pub async fn update_widget(&self, space_name: &str, widget: &str, items: &[Value]) -> bool {
        let record = RecordRequest::new(ResourceType::Content, widget, WIDGETS).attributes(json!({
            "payload": { "content_type": "json", "body": { "items": items } },
        }));
        self.act_ok(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    /// Attaches media to a widget; unsupported files count as a failed upload.
    pub async fn upload_widget_media(&self, space_name: &str, widget: &str, file: FileUpload) -> bool {
        match self.attach_attachment(widget, space_name, WIDGETS, file).await {
            Ok(done) => done,
            Err(e) => {
                error!(widget, "Error uploading widget media: {}", e);
                false
            }
        }
    }

    // -- Contact inbox --

    pub async fn fetch_contact_messages(&self) -> Vec<Record> {
        let query = QueryRequest::search(CONFIG_SPACE, "contacts")
            .matching("")
            .sorted("created_at", SortType::Descending)
            .exact(true)
            .with_payload(true)
            .with_attachments(true);
        self.query_records(query, Scope::Managed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, created, ok};
    use zainmart_platform::{MockPlatform, PlatformError};
    use zainmart_types::{Body, Entry, Payload};

    fn config_entry(body: Value) -> Entry {
        let mut entry = Entry {
            shortname: "web_config".into(),
            ..Default::default()
        };
        entry.meta.payload = Some(Payload {
            body: Some(Body::from(body)),
            ..Default::default()
        });
        entry
    }

    #[test]
    fn test_upsert_config_item() {
        let mut items = vec![
            ConfigItem { key: "theme".into(), value: json!("dark") },
            ConfigItem { key: DEFAULT_ROLE_KEY.into(), value: json!("buyer") },
        ];
        upsert_config_item(&mut items, DEFAULT_ROLE_KEY, json!("zm_seller"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].value, "zm_seller");
        upsert_config_item(&mut items, "currency", json!("IQD"));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_workflow_binding_needs_both_names() {
        let role = RoleDraft::default();
        let half = WorkflowBinding {
            workflow_shortname: "approval".into(),
            schema_shortname: String::new(),
        };
        let attrs = to_attributes(&role, Some(&half));
        assert!(attrs.get("workflow_shortname").is_none());
        assert_eq!(attrs["is_active"], true);
        assert!(attrs.get("shortname").is_none());

        let full = WorkflowBinding {
            workflow_shortname: "approval".into(),
            schema_shortname: "role_schema".into(),
        };
        let attrs = to_attributes(&role, Some(&full));
        assert_eq!(attrs["workflow_shortname"], "approval");
        assert_eq!(attrs["schema_shortname"], "role_schema");
    }

    #[tokio::test]
    async fn test_default_role_updates_existing_config() {
        let mut mock = MockPlatform::new();
        mock.expect_retrieve_entry()
            .withf(|l, _| l.shortname == "web_config" && l.subpath == "public")
            .return_once(|_, _| {
                Ok(config_entry(json!({ "items": [
                    { "key": "theme", "value": "dark" },
                    { "key": "default_user_role", "value": "buyer" },
                ] })))
            });
        mock.expect_request()
            .withf(|a| {
                a.request_type == RequestType::Replace
                    && a.records[0].attributes["payload"]["body"]["items"]
                        == json!([{ "key": "theme", "value": "dark" }, { "key": "default_user_role", "value": "zm_seller" }])
            })
            .return_once(|_| Ok(created("web_config")));
        assert!(client(mock).set_default_user_role("zm_seller").await);
    }

    #[tokio::test]
    async fn test_default_role_creates_missing_config() {
        let mut mock = MockPlatform::new();
        mock.expect_retrieve_entry()
            .return_once(|_, _| Err(PlatformError::Api { status: 404, message: "missing".into() }));
        mock.expect_request()
            .withf(|a| {
                let r = &a.records[0];
                a.request_type == RequestType::Create
                    && r.shortname == "web_config"
                    && r.subpath == "public"
                    && r.attributes["payload"]["body"]["items"][0] == json!({ "key": "default_user_role", "value": "buyer" })
            })
            .return_once(|_| Ok(created("web_config")));
        assert!(client(mock).set_default_user_role("buyer").await);
    }

    #[tokio::test]
    async fn test_filter_users_by_role() {
        let mut mock = MockPlatform::new();
        mock.expect_query()
            .withf(|q, _| q.subpath == "users" && q.search.as_deref() == Some("@resource_type:user @roles:zm_seller"))
            .return_once(|_, _| Ok(ok(vec![Record::new(ResourceType::User, "shop1", "users")])));
        assert_eq!(client(mock).filter_users_by_role("zm_seller", 100, 0).await.len(), 1);
    }

    #[tokio::test]
    async fn test_region_body_by_kind() {
        let mut mock = MockPlatform::new();
        mock.expect_request()
            .withf(|a| {
                a.records[0].subpath == "/settings/regions"
                    && a.records[0].attributes["payload"]["body"]
                        == json!({ "region_type": "single_collection", "collection_shortname": "summer" })
            })
            .return_once(|_| Ok(created("home_top")));
        let region = RegionDraft {
            shortname: "home_top".into(),
            is_active: true,
            kind: RegionKind::SingleCollection {
                collection_shortname: "summer".into(),
            },
        };
        assert_eq!(client(mock).create_region("zainmart", &region).await.as_deref(), Some("home_top"));
    }

    #[tokio::test]
    async fn test_payment_method_nests_definition() {
        let mut mock = MockPlatform::new();
        mock.expect_request()
            .withf(|a| {
                let body = &a.records[0].attributes["payload"]["body"];
                body["shortname"] == "zain_cash" && body["payload"]["body"]["order"] == 2
            })
            .return_once(|_| Ok(created("zain_cash")));
        let method = PaymentMethodDraft {
            shortname: "zain_cash".into(),
            displayname: Translation::uniform("ZainCash"),
            description: Translation::default(),
            is_active: true,
            order: 2,
        };
        assert!(client(mock).create_payment_method("zainmart", &method).await.is_some());
    }

    #[tokio::test]
    async fn test_update_collection_requires_shortname() {
        let collection = CollectionDraft {
            shortname: None,
            displayname: Translation::default(),
            description: Translation::default(),
            is_active: true,
            items: Vec::new(),
        };
        assert!(client(MockPlatform::new()).update_collection("zainmart", &collection).await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_widget_media_fails() {
        let file = FileUpload {
            file_name: "notes.exe".into(),
            content_type: "application/x-msdownload".into(),
            bytes: vec![0, 1],
        };
        assert!(!client(MockPlatform::new()).upload_widget_media("zainmart", "banner", file).await);
    }
}
