use serde_json::{Value, json};
use tracing::{debug, error};

use zainmart_types::{
    ActionRequest, QueryRequest, QueryType, Record, RecordRequest, RequestType, ResourceType,
    Scope, SortType, Translation,
};

use crate::{Client, ServiceError};

const DEFAULT_ORDINAL: i64 = 9999;
const SPACES_FALLBACK: &str = "Loading spaces failed. Please try again.";

fn ordinal(space: &Record) -> i64 {
    space
        .attributes
        .extra
        .get("ordinal")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_ORDINAL)
}

/// Drops hidden spaces (unless `ignore_filter`) and orders the rest by
/// ordinal. Spaces without an ordinal get 9999 and keep their relative order.
pub fn arrange_spaces(mut spaces: Vec<Record>, ignore_filter: bool, hidden: &[&str]) -> Vec<Record> {
    if !ignore_filter {
        spaces.retain(|space| {
            !space.attributes.flag("hide_space")
                && !hidden.iter().any(|h| space.shortname.contains(h))
                && !space.shortname.contains("applications")
        });
    }
    for space in &mut spaces {
        let value = ordinal(space);
        space.attributes.extra.insert("ordinal".into(), json!(value));
    }
    spaces.sort_by_key(ordinal);
    spaces
}

fn hidden_folders<'a>(spaces: &'a [Record], space_name: &str) -> Vec<&'a str> {
    spaces
        .iter()
        .find(|s| s.shortname == space_name)
        .and_then(|s| s.attributes.extra.get("hide_folders"))
        .and_then(Value::as_array)
        .map(|folders| folders.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

struct WalkFrame {
    path: Option<String>,
    folders: Vec<String>,
    next: usize,
}

impl Client {
    pub(crate) async fn try_spaces(&self, ignore_filter: bool, scope: Scope, hidden: &[&str]) -> Result<Vec<Record>, ServiceError> {
        let query = QueryRequest::new(QueryType::Spaces, "management", "/")
            .matching("-shortname:management")
            .limit(100);
        let resp = self
            .platform()
            .query(query, scope)
            .await
            .map_err(|e| ServiceError::from_platform(e, SPACES_FALLBACK))?;
        if !resp.is_success() {
            return Err(ServiceError::from_response(&resp, SPACES_FALLBACK));
        }
        Ok(arrange_spaces(resp.records, ignore_filter, hidden))
    }

    pub(crate) async fn try_space_names(&self, ignore_filter: bool, scope: Scope, hidden: &[&str]) -> Result<Vec<String>, ServiceError> {
        let spaces = self.try_spaces(ignore_filter, scope, hidden).await?;
        Ok(spaces.into_iter().map(|s| s.shortname).collect())
    }

    pub async fn get_spaces(&self, ignore_filter: bool, scope: Scope, hidden: &[&str]) -> Vec<Record> {
        match self.try_spaces(ignore_filter, scope, hidden).await {
            Ok(spaces) => spaces,
            Err(e) => {
                error!("Failed to list spaces: {}", e);
                Vec::new()
            }
        }
    }

    /// Everything under `subpath`. Public listings hide schema definitions.
    pub async fn get_space_contents(
        &self,
        space_name: &str,
        subpath: &str,
        scope: Scope,
        limit: u32,
        offset: u32,
        exact_subpath: bool,
    ) -> Vec<Record> {
        let search = if scope == Scope::Public { "-@shortname:schema" } else { "" };
        let query = QueryRequest::search(space_name, subpath)
            .matching(search)
            .page(limit, offset)
            .sorted("shortname", SortType::Ascending)
            .with_payload(true)
            .with_attachments(true)
            .exact(exact_subpath);
        self.query_records(query, scope).await
    }

    pub async fn get_space_folders(&self, space_name: &str, subpath: &str, scope: Scope, limit: u32, offset: u32) -> Vec<Record> {
        let query = QueryRequest::search(space_name, subpath)
            .matching("-@shortname:schema")
            .page(limit, offset)
            .sorted("shortname", SortType::Ascending)
            .with_payload(true)
            .with_attachments(true)
            .exact(false)
            .types(vec![ResourceType::Folder]);
        self.query_records(query, scope).await
    }

    pub async fn get_space_schema(&self, space_name: &str, subpath: &str, scope: Scope, limit: u32, offset: u32) -> Vec<Record> {
        let query = QueryRequest::search(space_name, subpath)
            .matching("")
            .page(limit, offset)
            .sorted("shortname", SortType::Ascending)
            .with_payload(true)
            .with_attachments(true)
            .exact(false);
        self.query_records(query, scope).await
    }

    /// Entries carrying any of `tags`; all entries when `tags` is empty.
    pub async fn get_space_contents_by_tags(
        &self,
        space_name: &str,
        subpath: &str,
        scope: Scope,
        limit: u32,
        offset: u32,
        tags: &[String],
    ) -> Vec<Record> {
        let search = if tags.is_empty() {
            String::new()
        } else {
            format!("@tags:{}", tags.join(" OR "))
        };
        let query = QueryRequest::search(space_name, subpath)
            .matching(search)
            .page(limit, offset)
            .sorted("shortname", SortType::Ascending)
            .with_payload(true)
            .with_attachments(true)
            .exact(false);
        self.query_records(query, scope).await
    }

    pub async fn get_space_tags(&self, space_name: &str) -> Vec<Record> {
        let query = QueryRequest::new(QueryType::Tags, space_name, "/")
            .matching("")
            .page(10, 0)
            .with_payload(true)
            .with_attachments(true)
            .exact(false);
        self.query_records(query, Scope::Public).await
    }

    /// Recently updated entries other than the one being viewed.
    pub async fn get_related_contents(
        &self,
        space_name: &str,
        subpath: &str,
        scope: Scope,
        exclude_shortname: &str,
        limit: u32,
        offset: u32,
    ) -> Vec<Record> {
        let query = QueryRequest::search(space_name, subpath)
            .matching(format!("-@shortname:{}", exclude_shortname))
            .page(limit, offset)
            .sorted("updated_at", SortType::Descending)
            .with_payload(true)
            .with_attachments(false)
            .exact(false);
        self.query_records(query, scope).await
    }

    /// Direct children of `subpath`, without the folders the space hides,
    /// sorted by shortname ignoring case.
    pub async fn get_children(
        &self,
        space_name: &str,
        subpath: &str,
        limit: u32,
        offset: u32,
        restrict_types: Vec<ResourceType>,
        spaces: Option<&[Record]>,
    ) -> Vec<Record> {
        let query = QueryRequest::search(space_name, subpath)
            .types(restrict_types)
            .exact(true)
            .matching("")
            .page(limit, offset);
        let mut children = self.query_records(query, Scope::Managed).await;

        if let Some(spaces) = spaces {
            let hidden = hidden_folders(spaces, space_name);
            if !hidden.is_empty() {
                children.retain(|c| !hidden.contains(&c.shortname.as_str()));
            }
        }
        children.sort_by_cached_key(|c| c.shortname.to_lowercase());
        children
    }

    /// Every folder path below `base`, deepest first within each branch.
    pub async fn get_descendant_subpaths(&self, space_name: &str, base: &str) -> Vec<String> {
        let mut subpaths = Vec::new();
        let root = self.child_folders(space_name, base).await;
        let mut stack = vec![WalkFrame { path: None, folders: root, next: 0 }];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.folders.len() {
                let parent = frame.path.as_deref().unwrap_or(base).trim_end_matches('/');
                let path = format!("{}/{}", parent, frame.folders[frame.next]);
                frame.next += 1;
                let folders = self.child_folders(space_name, &path).await;
                stack.push(WalkFrame { path: Some(path), folders, next: 0 });
                continue;
            }
            if let Some(WalkFrame { path: Some(path), .. }) = stack.pop() {
                subpaths.push(path);
            }
        }
        debug!(space_name, base, found = subpaths.len(), "Walked subpaths");
        subpaths
    }

    async fn child_folders(&self, space_name: &str, subpath: &str) -> Vec<String> {
        self.get_children(space_name, subpath, 20, 0, Vec::new(), None)
            .await
            .into_iter()
            .filter(|c| c.resource_type == ResourceType::Folder)
            .map(|c| c.shortname)
            .collect()
    }

    pub async fn create_space(&self, shortname: &str, displayname: &Translation, description: &Translation) -> bool {
        let shortname = shortname.trim();
        let record = RecordRequest::new(ResourceType::Space, shortname, "/").attributes(json!({
            "is_active": true,
            "displayname": displayname,
            "description": description,
        }));
        self.act_ok(ActionRequest::single(shortname, RequestType::Create, record)).await
    }

    pub async fn delete_space(&self, shortname: &str) -> bool {
        let record = RecordRequest::new(ResourceType::Space, shortname, "/");
        self.act_ok(ActionRequest::single(shortname, RequestType::Delete, record)).await
    }

    pub async fn edit_space(&self, shortname: &str, attributes: Value) -> bool {
        let record = RecordRequest::new(ResourceType::Space, shortname, "/").attributes(attributes);
        self.act_ok(ActionRequest::single(shortname, RequestType::Replace, record)).await
    }

    pub async fn fetch_workflows(&self, space_name: &str) -> Vec<Record> {
        let query = QueryRequest::search(space_name, "/workflows").matching("");
        self.query_records(query, Scope::Managed).await
    }
}
