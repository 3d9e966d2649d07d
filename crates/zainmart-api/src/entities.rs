use futures_util::future::try_join_all;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use zainmart_types::{
    ActionRequest, Entry, EntryLocator, QueryRequest, QueryType, Record, RecordRequest,
    RequestType, ResourceType, Scope, SortType, Translation, Upload,
};

use crate::profile::FileUpload;
use crate::{Client, ServiceError, Session};

const FAN_OUT_FALLBACK: &str = "Loading entries failed. Please try again.";

/// Spaces that never hold a caller's own listings.
const PERSONAL_HIDDEN_SPACES: [&str; 3] = ["messages", "poll", "surveys"];

/// Content of a create/update form for a generic entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDraft {
    pub shortname: Option<String>,
    pub displayname: Translation,
    pub description: Translation,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub body: Value,
    pub content_type: Option<String>,
    pub workflow_shortname: Option<String>,
    pub schema_shortname: Option<String>,
}

impl Default for EntityDraft {
    fn default() -> Self {
        Self {
            shortname: None,
            displayname: Translation::default(),
            description: Translation::default(),
            is_active: true,
            tags: Vec::new(),
            body: Value::Null,
            content_type: None,
            workflow_shortname: None,
            schema_shortname: None,
        }
    }
}

impl EntityDraft {
    fn shortname(&self) -> &str {
        self.shortname.as_deref().filter(|s| !s.is_empty()).unwrap_or("auto")
    }

    /// `attach_workflow` decides whether workflow and schema are written.
    fn attributes(&self, content_type: &str, attach_workflow: bool) -> Value {
        let mut payload = json!({
            "content_type": self.content_type.as_deref().unwrap_or(content_type),
            "body": self.body,
        });
        let mut attributes = json!({
            "displayname": bilingual(&self.displayname),
            "description": trilingual(&self.description),
            "is_active": self.is_active,
            "relationships": [],
            "tags": self.tags,
        });
        if attach_workflow {
            attributes["workflow_shortname"] = json!(self.workflow_shortname);
            payload["schema_shortname"] = json!(self.schema_shortname);
        }
        attributes["payload"] = payload;
        attributes
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FolderDraft {
    pub shortname: Option<String>,
    pub displayname: Translation,
    pub description: Translation,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellerAccount {
    pub shortname: Option<String>,
    pub email: String,
    pub password: String,
    pub description: String,
    pub role: String,
}

/// A folder every seller gets under the main space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerFolder {
    pub shortname: &'static str,
    pub subpath: String,
    pub icon: &'static str,
    pub displayname: Translation,
}

pub(crate) fn bilingual(t: &Translation) -> Value {
    json!({
        "en": t.en.as_deref().unwrap_or(""),
        "ar": t.ar.as_deref().unwrap_or(""),
    })
}

pub(crate) fn trilingual(t: &Translation) -> Value {
    json!({
        "en": t.en.as_deref().unwrap_or(""),
        "ar": t.ar.as_deref().unwrap_or(""),
        "ku": t.ku.as_deref().unwrap_or(""),
    })
}

/// Maps a MIME type to the payload content type and resource type an
/// attachment is stored as.
pub fn attachment_kind(mime: &str) -> Option<(&'static str, ResourceType)> {
    let (major, minor) = mime.split_once('/')?;
    match (major, minor) {
        ("image", _) => Some(("image", ResourceType::Media)),
        ("audio", _) => Some(("audio", ResourceType::Media)),
        ("video", _) => Some(("video", ResourceType::Media)),
        ("application", "pdf") => Some(("pdf", ResourceType::Media)),
        ("application", "json") => Some(("json", ResourceType::Json)),
        ("text", "csv") => Some(("csv", ResourceType::Csv)),
        ("text", "markdown") => Some(("markdown", ResourceType::Media)),
        ("text", _) => Some(("text", ResourceType::Media)),
        _ => None,
    }
}

/// Folders created for a new seller, one per seller-owned collection.
pub fn seller_folders(seller: &str) -> Vec<SellerFolder> {
    let folder = |shortname: &'static str, icon: &'static str, en: &str, ar: &str, ku: Option<&str>| SellerFolder {
        shortname,
        subpath: format!("/{}/{}", shortname, seller),
        icon,
        displayname: Translation {
            en: Some(en.to_string()),
            ar: Some(ar.to_string()),
            ku: ku.map(str::to_string),
        },
    };
    vec![
        folder("available_products", "ShoppingBagSolid", "Available Products", "المنتجات المتاحة", None),
        folder("discounts", "BadgeCheckSolid", "Discounts", "الخصومات", None),
        folder("orders", "ClipboardListSolid", "Orders", "الطلبات", None),
        folder("coupons", "TicketSolid", "Coupons", "الكوبونات", None),
        folder("warranties", "ShieldCheckSolid", "Warranties", "الضمانات", None),
        folder(
            "shipping",
            "TruckSolid",
            "Shipping & Service",
            "الشحن والخدمة",
            Some("گەیاندن و خزمەتگوزاری"),
        ),
    ]
}

impl Client {
    /// Queries every space concurrently and concatenates the records in
    /// space order. A single failing space fails the whole listing.
    pub(crate) async fn fan_out<F>(&self, spaces: Vec<String>, scope: Scope, query_for: F) -> Result<Vec<Record>, ServiceError>
    where
        F: Fn(String) -> QueryRequest,
    {
        let calls = spaces.into_iter().map(|space| {
            let query = query_for(space);
            async move {
                let resp = self
                    .platform()
                    .query(query, scope)
                    .await
                    .map_err(|e| ServiceError::from_platform(e, FAN_OUT_FALLBACK))?;
                Ok::<_, ServiceError>(resp.records)
            }
        });
        let per_space = try_join_all(calls).await?;
        Ok(per_space.into_iter().flatten().collect())
    }

    pub async fn get_entities(&self, search: &str) -> Result<Vec<Record>, ServiceError> {
        let spaces = self.try_space_names(false, Scope::Managed, &[]).await?;
        self.fan_out(spaces, Scope::Managed, |space| {
            QueryRequest::subpath(space, "/")
                .exact(false)
                .sorted("shortname", SortType::Ascending)
                .matching(search)
                .with_payload(true)
                .with_attachments(true)
        })
        .await
    }

    /// Everything the caller owns outside the messaging and survey spaces.
    pub async fn get_my_entities(&self, session: &Session) -> Result<Vec<Record>, ServiceError> {
        let spaces = self
            .try_space_names(false, Scope::Managed, &PERSONAL_HIDDEN_SPACES)
            .await?;
        let search = format!("@owner_shortname:{}", session.shortname);
        self.fan_out(spaces, Scope::Managed, |space| {
            QueryRequest::subpath(space, "/")
                .exact(false)
                .sorted("created_at", SortType::Ascending)
                .matching(search.as_str())
                .with_payload(true)
                .with_attachments(true)
        })
        .await
    }

    pub async fn get_entity(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        scope: Scope,
        retrieve_json_payload: bool,
        retrieve_attachments: bool,
    ) -> Option<Entry> {
        let locator = EntryLocator::new(resource_type, space_name, subpath, shortname)
            .with_payload(retrieve_json_payload)
            .with_attachments(retrieve_attachments);
        self.entry(locator, scope).await
    }

    /// Creates an entity and returns its (possibly generated) shortname.
    pub async fn create_entity(
        &self,
        draft: &EntityDraft,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
    ) -> Option<String> {
        let attach_workflow = draft.workflow_shortname.is_some() || draft.schema_shortname.is_some();
        let record = RecordRequest::new(resource_type, draft.shortname(), subpath)
            .attributes(draft.attributes("json", attach_workflow));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record)).await
    }

    pub async fn create_folder(&self, space_name: &str, subpath: &str, folder: &FolderDraft, edit: bool) -> Option<String> {
        let shortname = folder.shortname.as_deref().filter(|s| !s.is_empty()).unwrap_or("auto");
        let record = RecordRequest::new(ResourceType::Folder, shortname, subpath).attributes(json!({
            "displayname": folder.displayname,
            "description": folder.description,
            "payload": { "body": folder.content, "content_type": "json" },
            "is_active": true,
        }));
        let request_type = if edit { RequestType::Update } else { RequestType::Create };
        self.act_shortname(ActionRequest::single(space_name, request_type, record)).await
    }

    /// Creates the standard folders of a seller. Returns how many were created.
    pub async fn create_seller_folders(&self, space_name: &str, seller: &str) -> usize {
        let mut created = 0;
        for folder in seller_folders(seller) {
            let draft = FolderDraft {
                shortname: Some(folder.shortname.to_string()),
                displayname: folder.displayname,
                description: Translation::default(),
                content: json!({ "icon": folder.icon }),
            };
            if self.create_folder(space_name, &folder.subpath, &draft, false).await.is_some() {
                created += 1;
            } else {
                warn!(seller, folder = folder.shortname, "Seller folder not created");
            }
        }
        created
    }

    pub async fn create_seller(&self, seller: &SellerAccount) -> Option<String> {
        let shortname = seller.shortname.as_deref().filter(|s| !s.is_empty()).unwrap_or("auto");
        let record = RecordRequest::new(ResourceType::User, shortname, "users").attributes(json!({
            "email": seller.email,
            "displayname": { "en": "", "ar": "" },
            "password": seller.password,
            "description": { "en": seller.description },
            "roles": [seller.role],
            "payload": { "content_type": "json", "body": "" },
        }));
        self.act_shortname(ActionRequest::single("management", RequestType::Create, record)).await
    }

    /// Partial update. Workflow and schema are only written when both are set.
    pub async fn update_entity(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        draft: &EntityDraft,
    ) -> Option<String> {
        let attach_workflow = draft.workflow_shortname.is_some() && draft.schema_shortname.is_some();
        let record = RecordRequest::new(resource_type, shortname, subpath)
            .attributes(draft.attributes("html", attach_workflow));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record)).await
    }

    /// Full replacement; the stored description is not rewritten.
    pub async fn replace_entity(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        draft: &EntityDraft,
    ) -> Option<String> {
        let attach_workflow = draft.workflow_shortname.is_some() && draft.schema_shortname.is_some();
        let mut attributes = draft.attributes("html", attach_workflow);
        if let Some(map) = attributes.as_object_mut() {
            map.remove("description");
            map.insert("displayname".into(), json!(draft.displayname));
        }
        let record = RecordRequest::new(resource_type, shortname, subpath).attributes(attributes);
        self.act_shortname(ActionRequest::single(space_name, RequestType::Replace, record)).await
    }

    /// Writes raw attributes with an update or a replace.
    pub async fn update_dmart_entity(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        resource_type: ResourceType,
        attributes: Value,
        replace: bool,
    ) -> Option<String> {
        let request_type = if replace { RequestType::Replace } else { RequestType::Update };
        let record = RecordRequest::new(resource_type, shortname, subpath).attributes(attributes);
        self.act_shortname(ActionRequest::single(space_name, request_type, record)).await
    }

    pub async fn delete_entity(&self, shortname: &str, space_name: &str, subpath: &str, resource_type: ResourceType) -> bool {
        let record = RecordRequest::new(resource_type, shortname, subpath);
        self.act_shortname(ActionRequest::single(space_name, RequestType::Delete, record))
            .await
            .is_some()
    }

    /// Uploads a file as a new attachment of the entity.
    pub async fn attach_attachment(
        &self,
        shortname: &str,
        space_name: &str,
        subpath: &str,
        file: FileUpload,
    ) -> Result<bool, ServiceError> {
        let Some((content_type, resource_type)) = attachment_kind(&file.content_type) else {
            return Err(ServiceError::Rejected(format!("Unsupported file type: {}", file.content_type)));
        };
        debug!(shortname, space_name, content_type, "Uploading attachment");
        let upload = Upload {
            space_name: space_name.to_string(),
            subpath: format!("{}/{}", subpath.trim_end_matches('/'), shortname),
            shortname: "auto".into(),
            resource_type,
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
            attributes: Some(json!({ "payload": { "content_type": content_type, "body": {} } })),
        };
        match self.platform().upload_with_payload(upload).await {
            Ok(resp) => Ok(resp.is_success() && !resp.records.is_empty()),
            Err(e) => {
                warn!(shortname, "Attachment upload failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Per-type attachment counters of an entity.
    pub async fn get_entity_attachments_count(&self, shortname: &str, space_name: &str, subpath: &str) -> Vec<Record> {
        let query = QueryRequest::new(
            QueryType::AttachmentsAggregation,
            space_name,
            format!("{}/{}", subpath.trim_end_matches('/'), shortname),
        )
        .page(100, 0)
        .sorted("shortname", SortType::Ascending)
        .matching("")
        .with_payload(true)
        .with_attachments(true);
        self.query_records(query, Scope::Public).await
    }

    /// Creates a bare named item from the admin panel.
    pub async fn create_item(&self, name: &str, resource_type: ResourceType, space_name: &str, subpath: &str) -> bool {
        let record = RecordRequest::new(resource_type, "auto", subpath).attributes(json!({
            "is_active": true,
            "displayname": { "en": name, "ar": name },
            "description": { "en": "Created via admin panel", "ar": "تم إنشاؤه عبر لوحة الإدارة" },
        }));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
            .is_some()
    }

    pub async fn delete_item(&self, shortname: &str, resource_type: ResourceType, subpath: &str, space_name: &str) -> bool {
        let subpath = if subpath.is_empty() { "/" } else { subpath };
        let record = RecordRequest::new(resource_type, shortname, subpath);
        self.act_ok(ActionRequest::single(space_name, RequestType::Delete, record)).await
    }
}
