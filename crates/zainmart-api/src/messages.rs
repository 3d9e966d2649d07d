//! Direct and group messaging over the `messages` space.
//!
//! Messages are immutable content records under `messages/messages`; groups
//! live under `messages/groups`. Conversations are never stored: they are
//! rebuilt from the most recent [`CONVERSATION_WINDOW`] messages on every call,
//! so partners whose last message falls outside that window are not listed.
//!
//! Group membership edits are read-modify-write with no version check. Two
//! concurrent edits of the same group race and the last write wins.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use zainmart_types::models::{GroupBody, GroupUpdate, MessageBody, MessageType, MessageView};
use zainmart_types::{
    ActionRequest, Entry, QueryRequest, Record, RecordRequest, RequestType, ResourceType, Scope, SortType,
    parse_timestamp,
};

use crate::Client;

pub const MESSAGES_SPACE: &str = "messages";
pub const CONVERSATION_WINDOW: u32 = 1000;

const MESSAGES_SUBPATH: &str = "messages";
const GROUPS_SUBPATH: &str = "/groups";
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `msg_{unix millis}_{7 random base36 chars}`.
pub fn new_message_shortname() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("msg_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Everyone `user` exchanged a direct message with, in order of first
/// appearance in `messages`.
pub fn conversation_partners(messages: &[Record], user: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut partners = Vec::new();
    for record in messages {
        let Some(body) = record.decode_body::<MessageBody>() else {
            continue;
        };
        if let Some(partner) = body.partner_of(user) {
            if seen.insert(partner.to_string()) {
                partners.push(partner.to_string());
            }
        }
    }
    partners
}

/// The newest message per partner of `user`. A message replaces the one held
/// for its partner only when both timestamps parse and it is strictly newer;
/// partners keep the position of their first message.
pub fn latest_per_partner(messages: Vec<Record>, user: &str) -> Vec<Record> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<Record> = Vec::new();
    for record in messages {
        let Some(partner) = record
            .decode_body::<MessageBody>()
            .and_then(|b| b.partner_of(user).map(str::to_string))
        else {
            continue;
        };
        match index.get(&partner) {
            None => {
                index.insert(partner, latest.len());
                latest.push(record);
            }
            Some(&i) => {
                let newer = match (record.attributes.created(), latest[i].attributes.created()) {
                    (Some(candidate), Some(held)) => candidate > held,
                    _ => false,
                };
                if newer {
                    latest[i] = record;
                }
            }
        }
    }
    latest
}

/// Flattens a stored message for display. Records without a readable body
/// yield `None`.
pub fn message_view(record: &Record) -> Option<MessageView> {
    let body = record.decode_body::<MessageBody>()?;
    let timestamp = record
        .attributes
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    let id = record.shortname.clone();
    Some(match (body.message_type, body.group_id) {
        (Some(MessageType::GroupMessage), Some(group_id)) => MessageView::Group {
            id,
            sender: body.sender,
            group_id,
            content: body.content,
            timestamp,
        },
        _ => MessageView::Direct {
            id,
            sender: body.sender,
            receiver: body.receiver,
            content: body.content,
            timestamp,
        },
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub participants: Vec<String>,
    pub created_by: String,
}

fn message_log(sort: SortType, limit: u32, offset: u32) -> QueryRequest {
    QueryRequest::search(MESSAGES_SPACE, MESSAGES_SUBPATH)
        .matching("")
        .sorted("created_at", sort)
        .page(limit, offset)
        .exact(true)
        .with_payload(true)
        .with_attachments(true)
}

fn message_filter(record: &Record, keep: impl Fn(&MessageBody) -> bool) -> bool {
    record.decode_body::<MessageBody>().is_some_and(|b| keep(&b))
}

impl Client {
    /// Stores a direct message and returns its shortname.
    pub async fn create_message(&self, message: &MessageBody) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, new_message_shortname(), MESSAGES_SUBPATH).attributes(json!({
            "is_active": true,
            "relationships": [],
            "tags": [],
            "payload": { "content_type": "json", "body": message },
        }));
        self.act_shortname(ActionRequest::single(MESSAGES_SPACE, RequestType::Create, record))
            .await
    }

    /// One representative (newest) message per conversation partner.
    pub async fn get_user_conversations(&self, user: &str) -> Vec<Record> {
        let messages = self
            .query_records(message_log(SortType::Ascending, CONVERSATION_WINDOW, 0), Scope::Managed)
            .await;
        latest_per_partner(messages, user)
    }

    pub async fn get_conversation_partners(&self, user: &str) -> Vec<String> {
        let messages = self
            .query_records(message_log(SortType::Descending, CONVERSATION_WINDOW, 0), Scope::Managed)
            .await;
        conversation_partners(&messages, user)
    }

    /// A page of the message log narrowed to the two users. The page is taken
    /// before narrowing, so it can hold fewer than `limit` messages.
    pub async fn get_messages_between_users(&self, user: &str, other: &str, limit: u32, offset: u32) -> Vec<Record> {
        self.query_records(message_log(SortType::Descending, limit, offset), Scope::Managed)
            .await
            .into_iter()
            .filter(|r| message_filter(r, |b| b.is_between(user, other)))
            .collect()
    }

    pub async fn get_message_by_shortname(&self, shortname: &str) -> Option<MessageView> {
        let query = message_log(SortType::Descending, 1, 0).shortnames(vec![shortname.to_string()]);
        let record = self.query_first(query, Scope::Managed).await?;
        let view = message_view(&record);
        if view.is_none() {
            warn!(shortname, "Message has no readable body");
        }
        view
    }

    /// Users of `management/users` by shortname; all users when `shortnames`
    /// is empty.
    pub async fn get_users_by_shortnames(&self, shortnames: &[String]) -> Vec<Record> {
        let query = QueryRequest::search("management", "users")
            .matching("")
            .sorted("shortname", SortType::Ascending)
            .page(shortnames.len() as u32, 0)
            .exact(true)
            .with_payload(true)
            .with_attachments(false)
            .shortnames(shortnames.to_vec());
        self.query_records(query, Scope::Managed).await
    }

    // -- Groups --

    pub async fn create_group(&self, group: &NewGroup) -> Option<String> {
        let mut attributes = json!({
            "displayname": { "en": group.name },
            "is_active": true,
            "payload": {
                "content_type": "json",
                "body": GroupBody::new(group.participants.clone(), &group.created_by),
            },
        });
        if let Some(description) = &group.description {
            attributes["description"] = json!({ "en": description });
        }
        let record = RecordRequest::new(ResourceType::Content, "auto", GROUPS_SUBPATH).attributes(attributes);
        self.act_shortname(ActionRequest::single(MESSAGES_SPACE, RequestType::Create, record))
            .await
    }

    pub async fn get_group_details(&self, shortname: &str) -> Option<Entry> {
        self.get_entity(shortname, MESSAGES_SPACE, GROUPS_SUBPATH, ResourceType::Content, Scope::Managed, true, false)
            .await
    }

    pub async fn update_group(&self, shortname: &str, update: GroupUpdate) -> bool {
        match self.get_group_details(shortname).await {
            Some(group) => self.write_group(shortname, &group, update).await,
            None => false,
        }
    }

    /// Groups `user` participates in, newest first.
    pub async fn get_user_groups(&self, user: &str) -> Vec<Record> {
        let query = QueryRequest::search(MESSAGES_SPACE, GROUPS_SUBPATH)
            .matching("")
            .sorted("created_at", SortType::Descending)
            .page(100, 0)
            .exact(false)
            .with_payload(true)
            .with_attachments(false);
        self.query_records(query, Scope::Managed)
            .await
            .into_iter()
            .filter(|r| r.decode_body::<GroupBody>().is_some_and(|g| g.has_participant(user)))
            .collect()
    }

    pub async fn create_group_message(&self, group_id: &str, sender: &str, content: &str) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, "auto", "/messages").attributes(json!({
            "is_active": true,
            "payload": { "content_type": "json", "body": MessageBody::group(sender, group_id, content) },
        }));
        self.act_shortname(ActionRequest::single(MESSAGES_SPACE, RequestType::Create, record))
            .await
    }

    /// A page of the message log narrowed to one group.
    pub async fn get_group_messages(&self, group_id: &str, limit: u32, offset: u32) -> Vec<Record> {
        self.query_records(message_log(SortType::Descending, limit, offset), Scope::Managed)
            .await
            .into_iter()
            .filter(|r| message_filter(r, |b| b.group_id.as_deref() == Some(group_id)))
            .collect()
    }

    /// True when the user is (now) a participant.
    pub async fn add_user_to_group(&self, shortname: &str, user: &str) -> bool {
        let Some(group) = self.get_group_details(shortname).await else {
            return false;
        };
        let mut body = group.decode_body::<GroupBody>().unwrap_or_default();
        if !body.add_participant(user) {
            return true;
        }
        let update = GroupUpdate {
            participants: Some(body.participants),
            ..Default::default()
        };
        self.write_group(shortname, &group, update).await
    }

    pub async fn remove_user_from_group(&self, shortname: &str, user: &str) -> bool {
        let Some(group) = self.get_group_details(shortname).await else {
            return false;
        };
        let mut body = group.decode_body::<GroupBody>().unwrap_or_default();
        body.remove_participant(user);
        let update = GroupUpdate {
            participants: Some(body.participants),
            admin_ids: Some(body.admin_ids),
            ..Default::default()
        };
        self.write_group(shortname, &group, update).await
    }

    pub async fn make_user_group_admin(&self, shortname: &str, user: &str) -> bool {
        let Some(group) = self.get_group_details(shortname).await else {
            return false;
        };
        let mut body = group.decode_body::<GroupBody>().unwrap_or_default();
        if !body.promote(user) {
            return true;
        }
        let update = GroupUpdate {
            admin_ids: Some(body.admin_ids),
            ..Default::default()
        };
        self.write_group(shortname, &group, update).await
    }

    /// Writes `update` over the group as it was read. Unknown body fields
    /// are carried over untouched.
    async fn write_group(&self, shortname: &str, group: &Entry, update: GroupUpdate) -> bool {
        let mut body = group.decode_body::<GroupBody>().unwrap_or_default();
        if let Some(participants) = update.participants {
            body.participants = participants;
        }
        if let Some(admin_ids) = update.admin_ids {
            body.admin_ids = admin_ids;
        }
        let displayname = match update.name {
            Some(name) => json!({ "en": name }),
            None => json!(group.meta.displayname),
        };
        let description = match update.description {
            Some(description) => json!({ "en": description }),
            None => json!(group.meta.description),
        };
        let record = RecordRequest::new(ResourceType::Content, shortname, GROUPS_SUBPATH).attributes(json!({
            "displayname": displayname,
            "description": description,
            "payload": { "content_type": "json", "body": body },
        }));
        self.act_ok(ActionRequest::single(MESSAGES_SPACE, RequestType::Update, record))
            .await
    }
}
