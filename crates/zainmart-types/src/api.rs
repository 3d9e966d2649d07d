use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::body::{Body, Text};

// -- Enumerations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Managed,
    Public,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Managed => "managed",
            Scope::Public => "public",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Search,
    Subpath,
    Events,
    History,
    Tags,
    Spaces,
    Counters,
    Reports,
    Aggregation,
    Attachments,
    AttachmentsAggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Create,
    Update,
    Replace,
    Delete,
    Move,
    UpdateAcl,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    User,
    Group,
    Folder,
    Schema,
    Content,
    Acl,
    Comment,
    Reaction,
    Media,
    Locator,
    Relationship,
    Alteration,
    History,
    Space,
    Permission,
    Role,
    Ticket,
    Json,
    Post,
    PluginWrapper,
    Notification,
    Csv,
    Jsonl,
    Sqlite,
    Parquet,
    #[serde(other)]
    Other,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::User => "user",
            ResourceType::Group => "group",
            ResourceType::Folder => "folder",
            ResourceType::Schema => "schema",
            ResourceType::Content => "content",
            ResourceType::Acl => "acl",
            ResourceType::Comment => "comment",
            ResourceType::Reaction => "reaction",
            ResourceType::Media => "media",
            ResourceType::Locator => "locator",
            ResourceType::Relationship => "relationship",
            ResourceType::Alteration => "alteration",
            ResourceType::History => "history",
            ResourceType::Space => "space",
            ResourceType::Permission => "permission",
            ResourceType::Role => "role",
            ResourceType::Ticket => "ticket",
            ResourceType::Json => "json",
            ResourceType::Post => "post",
            ResourceType::PluginWrapper => "plugin_wrapper",
            ResourceType::Notification => "notification",
            ResourceType::Csv => "csv",
            ResourceType::Jsonl => "jsonl",
            ResourceType::Sqlite => "sqlite",
            ResourceType::Parquet => "parquet",
            ResourceType::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Json,
    Text,
    Markdown,
    Html,
    Image,
    Pdf,
    Audio,
    Video,
    Csv,
    #[serde(other)]
    Other,
}

// -- Query --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub space_name: String,
    pub subpath: String,
    pub filter_shortnames: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_types: Vec<ResourceType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_schema_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_subpath: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<SortType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieve_json_payload: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieve_attachments: Option<bool>,
}

impl QueryRequest {
    pub fn new(query_type: QueryType, space_name: impl Into<String>, subpath: impl Into<String>) -> Self {
        Self {
            query_type,
            space_name: space_name.into(),
            subpath: subpath.into(),
            filter_shortnames: Vec::new(),
            filter_types: Vec::new(),
            filter_schema_names: Vec::new(),
            search: None,
            exact_subpath: None,
            sort_by: None,
            sort_type: None,
            limit: None,
            offset: None,
            retrieve_json_payload: None,
            retrieve_attachments: None,
        }
    }

    pub fn search(space_name: impl Into<String>, subpath: impl Into<String>) -> Self {
        Self::new(QueryType::Search, space_name, subpath)
    }

    pub fn subpath(space_name: impl Into<String>, subpath: impl Into<String>) -> Self {
        Self::new(QueryType::Subpath, space_name, subpath)
    }

    pub fn matching(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn sorted(mut self, sort_by: impl Into<String>, sort_type: SortType) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_type = Some(sort_type);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn exact(mut self, exact_subpath: bool) -> Self {
        self.exact_subpath = Some(exact_subpath);
        self
    }

    pub fn with_payload(mut self, retrieve: bool) -> Self {
        self.retrieve_json_payload = Some(retrieve);
        self
    }

    pub fn with_attachments(mut self, retrieve: bool) -> Self {
        self.retrieve_attachments = Some(retrieve);
        self
    }

    pub fn shortnames(mut self, shortnames: Vec<String>) -> Self {
        self.filter_shortnames = shortnames;
        self
    }

    pub fn types(mut self, types: Vec<ResourceType>) -> Self {
        self.filter_types = types;
        self
    }

    pub fn schemas(mut self, schemas: Vec<String>) -> Self {
        self.filter_schema_names = schemas;
        self
    }
}

// -- Action --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordRequest {
    pub resource_type: ResourceType,
    pub shortname: String,
    pub subpath: String,
    pub attributes: Value,
}

impl RecordRequest {
    pub fn new(resource_type: ResourceType, shortname: impl Into<String>, subpath: impl Into<String>) -> Self {
        Self {
            resource_type,
            shortname: shortname.into(),
            subpath: subpath.into(),
            attributes: Value::Object(Map::new()),
        }
    }

    pub fn attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub space_name: String,
    pub request_type: RequestType,
    pub records: Vec<RecordRequest>,
}

impl ActionRequest {
    pub fn new(space_name: impl Into<String>, request_type: RequestType, records: Vec<RecordRequest>) -> Self {
        Self {
            space_name: space_name.into(),
            request_type,
            records,
        }
    }

    pub fn single(space_name: impl Into<String>, request_type: RequestType, record: RecordRequest) -> Self {
        Self::new(space_name, request_type, vec![record])
    }
}

// -- Responses --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    #[serde(alias = "error")]
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub info: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseAttributes {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub returned: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Envelope returned by query, action and user endpoints alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: Status,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<ResponseAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

pub type QueryResponse = ApiResponse;
pub type ActionResponse = ApiResponse;

impl ApiResponse {
    pub fn success(records: Vec<Record>) -> Self {
        Self {
            status: Status::Success,
            records,
            attributes: None,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            records: Vec::new(),
            attributes: None,
            error: Some(ApiErrorBody {
                message: Some(message.into()),
                ..Default::default()
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Records of a successful response, empty otherwise.
    pub fn into_records(self) -> Vec<Record> {
        if self.is_success() { self.records } else { Vec::new() }
    }

    /// The first record of a successful, non-empty response.
    pub fn into_first(self) -> Option<Record> {
        if self.is_success() {
            self.records.into_iter().next()
        } else {
            None
        }
    }

    pub fn first_shortname(&self) -> Option<&str> {
        if !self.is_success() {
            return None;
        }
        self.records.first().map(|r| r.shortname.as_str())
    }

    pub fn total(&self) -> Option<u64> {
        self.attributes.as_ref().and_then(|a| a.total)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }
}

// -- Records --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_shortname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayname: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Text>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_shortname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attachments: HashMap<String, Vec<Record>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordAttributes {
    pub fn body(&self) -> Option<&Body> {
        self.payload.as_ref().and_then(|p| p.body.as_ref())
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub resource_type: ResourceType,
    pub shortname: String,
    #[serde(default)]
    pub subpath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub attributes: RecordAttributes,
}

impl Record {
    pub fn new(resource_type: ResourceType, shortname: impl Into<String>, subpath: impl Into<String>) -> Self {
        Self {
            resource_type,
            shortname: shortname.into(),
            subpath: subpath.into(),
            uuid: None,
            attributes: RecordAttributes::default(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        let payload = self.attributes.payload.get_or_insert_with(Payload::default);
        payload.body = Some(body.into());
        self
    }

    pub fn created_at(mut self, created_at: impl Into<String>) -> Self {
        self.attributes.created_at = Some(created_at.into());
        self
    }

    pub fn body(&self) -> Option<&Body> {
        self.attributes.body()
    }

    pub fn decode_body<T: DeserializeOwned>(&self) -> Option<T> {
        self.body()?.decode()
    }

    pub fn display_name(&self, locale: &str) -> Option<&str> {
        self.attributes.displayname.as_ref()?.resolve(locale)
    }
}

/// A single entry as returned by the entry endpoint: the metadata sits at the
/// top level instead of under `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub shortname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(flatten)]
    pub meta: RecordAttributes,
}

impl Entry {
    pub fn body(&self) -> Option<&Body> {
        self.meta.body()
    }

    pub fn decode_body<T: DeserializeOwned>(&self) -> Option<T> {
        self.body()?.decode()
    }
}

// -- Platform call parameters --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressTicket {
    pub space_name: String,
    pub subpath: String,
    pub shortname: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryLocator {
    pub resource_type: ResourceType,
    pub space_name: String,
    pub subpath: String,
    pub shortname: String,
    pub retrieve_json_payload: bool,
    pub retrieve_attachments: bool,
    pub validate_schema: bool,
}

impl EntryLocator {
    pub fn new(
        resource_type: ResourceType,
        space_name: impl Into<String>,
        subpath: impl Into<String>,
        shortname: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            space_name: space_name.into(),
            subpath: subpath.into(),
            shortname: shortname.into(),
            retrieve_json_payload: true,
            retrieve_attachments: false,
            validate_schema: true,
        }
    }

    pub fn with_attachments(mut self, retrieve: bool) -> Self {
        self.retrieve_attachments = retrieve;
        self
    }

    pub fn with_payload(mut self, retrieve: bool) -> Self {
        self.retrieve_json_payload = retrieve;
        self
    }
}

/// Login identifier. Exactly one of the fields is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginId {
    Shortname(String),
    Email(String),
    Msisdn(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: LoginId,
    pub password: String,
}

impl Credentials {
    pub fn shortname(shortname: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: LoginId::Shortname(shortname.into()),
            password: password.into(),
        }
    }

    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: LoginId::Email(email.into()),
            password: password.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        let (key, value) = match &self.id {
            LoginId::Shortname(v) => ("shortname", v),
            LoginId::Email(v) => ("email", v),
            LoginId::Msisdn(v) => ("msisdn", v),
        };
        let mut map = Map::new();
        map.insert(key.to_string(), Value::String(value.clone()));
        map.insert("password".to_string(), Value::String(self.password.clone()));
        Value::Object(map)
    }
}

/// Public form submission (contact form, anonymous reports).
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub space_name: String,
    pub resource_type: ResourceType,
    pub schema_shortname: String,
    pub subpath: String,
    pub body: Value,
}

/// Multipart upload of a resource together with its payload file.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub space_name: String,
    pub subpath: String,
    pub shortname: String,
    pub resource_type: ResourceType,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub attributes: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentLocator {
    pub resource_type: ResourceType,
    pub space_name: String,
    pub subpath: String,
    pub parent_shortname: String,
    pub shortname: String,
    pub ext: Option<String>,
    pub scope: Scope,
}

// -- Timestamps --

/// Parses a platform timestamp. The platform emits RFC 3339 for some
/// endpoints and naive ISO-8601 (implicitly UTC) for others.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
