use std::collections::HashSet;

use serde_json::json;

use zainmart_types::{ActionRequest, QueryRequest, QueryType, Record, RecordRequest, RequestType, ResourceType, Scope, SortType};

use crate::Client;

fn comment_record(subpath: String, state: &str, body: &str, parent_comment_id: Option<&str>) -> RecordRequest {
    RecordRequest::new(ResourceType::Comment, "auto", subpath).attributes(json!({
        "is_active": true,
        "payload": {
            "content_type": "json",
            "body": {
                "state": state,
                "body": body,
                "parent_comment_id": parent_comment_id.filter(|p| !p.is_empty()),
            },
        },
    }))
}

/// Shortnames of every comment below `parent_id`, depth first, in the order
/// the comments appear in `comments`.
pub fn find_all_child_comments(parent_id: &str, comments: &[Record]) -> Vec<String> {
    let parent_of: Vec<Option<String>> = comments
        .iter()
        .map(|c| c.body().and_then(|b| b.str_field("parent_comment_id")))
        .collect();
    let children_of = |id: &str| -> Vec<usize> {
        (0..comments.len())
            .filter(|&i| parent_of[i].as_deref() == Some(id))
            .collect()
    };

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<usize> = children_of(parent_id).into_iter().rev().collect();
    while let Some(i) = stack.pop() {
        let shortname = &comments[i].shortname;
        // reply chains written by hand can loop back on themselves
        if !seen.insert(shortname.as_str()) {
            continue;
        }
        found.push(shortname.clone());
        stack.extend(children_of(shortname.as_str()).into_iter().rev());
    }
    found
}

impl Client {
    pub async fn create_comment(
        &self,
        space_name: &str,
        subpath: &str,
        shortname: &str,
        comment: &str,
        parent_comment_id: Option<&str>,
    ) -> bool {
        let record = comment_record(format!("{}/{}", subpath, shortname), "commented", comment, parent_comment_id);
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
            .is_some()
    }

    /// Comment on an order ticket; `state` is usually `commented`.
    pub async fn create_order_comment(
        &self,
        space_name: &str,
        seller: &str,
        order: &str,
        comment: &str,
        state: &str,
        parent_comment_id: Option<&str>,
    ) -> bool {
        let record = comment_record(format!("orders/{}/{}", seller, order), state, comment, parent_comment_id);
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
            .is_some()
    }

    pub async fn delete_comment(&self, comment: &str, space_name: &str, subpath: &str, entry: &str) -> bool {
        let record = RecordRequest::new(ResourceType::Comment, comment, format!("{}/{}", subpath, entry));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Delete, record))
            .await
            .is_some()
    }

    /// Deletes several comments of one entry in a single request.
    pub async fn delete_comments(&self, comments: &[String], space_name: &str, subpath: &str, entry: &str) -> bool {
        if comments.is_empty() {
            return true;
        }
        let records = comments
            .iter()
            .map(|c| RecordRequest::new(ResourceType::Comment, c.as_str(), format!("{}/{}", subpath, entry)))
            .collect();
        self.act_ok(ActionRequest::new(space_name, RequestType::Delete, records)).await
    }

    pub async fn create_reaction(&self, shortname: &str, space_name: &str, subpath: &str) -> bool {
        let record = RecordRequest::new(ResourceType::Reaction, "auto", format!("{}/{}", subpath, shortname)).attributes(json!({
            "is_active": true,
            "payload": {
                "content_type": "json",
                "body": { "state": "commented", "body": { "type": "like" } },
            },
        }));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
            .is_some()
    }

    /// Deletes a reaction or comment; `entry` is the full subpath of the
    /// entry it hangs off.
    pub async fn delete_reaction(&self, resource_type: ResourceType, entry: &str, shortname: &str, space_name: &str) -> bool {
        let record = RecordRequest::new(resource_type, shortname, entry);
        self.act_shortname(ActionRequest::single(space_name, RequestType::Delete, record))
            .await
            .is_some()
    }

    /// Shortname of the reaction `user` left on the entry, if any.
    pub async fn find_user_reaction(&self, user: &str, entry: &str, space_name: &str, subpath: &str) -> Option<String> {
        let query = QueryRequest::new(QueryType::Attachments, space_name, format!("{}/{}", subpath, entry))
            .page(100, 0)
            .sorted("shortname", SortType::Ascending)
            .matching(format!("@owner_shortname:{} @resource_type:reaction", user))
            .with_payload(true);
        self.query_first(query, Scope::Managed).await.map(|r| r.shortname)
    }

    /// Records a reply under a contact message.
    pub async fn mark_message_as_replied(&self, space_name: &str, subpath: &str, parent: &str, reply: &str) -> bool {
        let subpath = format!("{}/{}", subpath, parent).replace("//", "/");
        let record = RecordRequest::new(ResourceType::Comment, "auto", subpath).attributes(json!({
            "is_active": true,
            "payload": {
                "content_type": "json",
                "body": { "state": "replied", "body": reply },
            },
        }));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
            .is_some()
    }
}
