//! Surveys, polls and message templates.

use serde::Serialize;
use serde_json::{Value, json};

use zainmart_types::{ActionRequest, QueryRequest, Record, RecordRequest, RequestType, ResourceType, Scope, SortType, Text};

use crate::{Client, Session};

const SURVEYS_SPACE: &str = "surveys";

/// Paging and visibility of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub scope: Scope,
    pub limit: u32,
    pub offset: u32,
    pub exact_subpath: bool,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            scope: Scope::Managed,
            limit: 100,
            offset: 0,
            exact_subpath: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Template {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateUpdate {
    pub is_active: bool,
    pub displayname: Option<Text>,
    pub tags: Vec<String>,
    pub template: Template,
}

fn listing_query(space_name: &str, subpath: &str, search: &str, listing: &Listing) -> QueryRequest {
    QueryRequest::search(space_name, subpath)
        .matching(search)
        .sorted("shortname", SortType::Ascending)
        .page(listing.limit, listing.offset)
        .exact(listing.exact_subpath)
        .with_payload(true)
        .with_attachments(true)
}

impl Client {
    /// Templates under `/templates` (usually in `applications`).
    pub async fn get_templates(&self, space_name: &str, listing: &Listing) -> Vec<Record> {
        let query = listing_query(space_name, "/templates", "-@shortname:schema", listing);
        self.query_records(query, listing.scope).await
    }

    /// Polls under `/polls` (usually in `poll`).
    pub async fn get_polls(&self, space_name: &str, listing: &Listing) -> Vec<Record> {
        let query = listing_query(space_name, "/polls", "-@shortname:schema", listing);
        self.query_records(query, listing.scope).await
    }

    pub async fn get_surveys(&self, space_name: &str, listing: &Listing) -> Vec<Record> {
        let query = listing_query(space_name, "/surveys", "@resource_type:content", listing);
        self.query_records(query, listing.scope).await
    }

    pub async fn create_template(&self, space_name: &str, subpath: &str, shortname: &str, template: &Template) -> bool {
        let record = RecordRequest::new(ResourceType::Content, "auto", format!("{}/{}", subpath, shortname)).attributes(json!({
            "is_active": true,
            "payload": { "content_type": "json", "body": template },
        }));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Create, record))
            .await
            .is_some()
    }

    pub async fn update_template(&self, shortname: &str, space_name: &str, subpath: &str, update: &TemplateUpdate) -> Option<String> {
        let record = RecordRequest::new(ResourceType::Content, shortname, subpath).attributes(json!({
            "is_active": update.is_active,
            "displayname": update.displayname,
            "relationships": [],
            "tags": update.tags,
            "payload": { "content_type": "json", "body": update.template },
        }));
        self.act_shortname(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    pub async fn delete_template(&self, shortname: &str, space_name: &str, subpath: &str) -> bool {
        let record = RecordRequest::new(ResourceType::Content, shortname, subpath);
        self.act_shortname(ActionRequest::single(space_name, RequestType::Delete, record))
            .await
            .is_some()
    }

    /// Writes the voter list of one poll candidate. The first vote creates the
    /// candidate record, later ones replace it.
    pub async fn user_vote(&self, poll: &str, candidate: &str, voters: &[String], replace: bool) -> bool {
        let request_type = if replace { RequestType::Replace } else { RequestType::Create };
        let record = RecordRequest::new(ResourceType::Json, candidate, format!("polls/{}", poll)).attributes(json!({
            "is_active": true,
            "payload": { "content_type": "json", "body": { "voters": voters } },
        }));
        self.act_shortname(ActionRequest::single("poll", request_type, record))
            .await
            .is_some()
    }

    /// Stores the caller's answers, updating their earlier response if any.
    pub async fn submit_survey_response(&self, session: &Session, survey: &str, responses: Value) -> bool {
        let existing = self.get_user_survey_response_record(session, survey).await;
        let (request_type, shortname) = match &existing {
            Some(record) => (RequestType::Update, record.shortname.as_str()),
            None => (RequestType::Create, "auto"),
        };
        let record = RecordRequest::new(ResourceType::Json, shortname, format!("surveys/{}", survey)).attributes(json!({
            "is_active": true,
            "owner_shortname": session.shortname,
            "payload": { "content_type": "json", "body": responses },
        }));
        self.act_shortname(ActionRequest::single(SURVEYS_SPACE, request_type, record))
            .await
            .is_some()
    }

    /// The caller's response record among the survey's json attachments.
    pub async fn get_user_survey_response_record(&self, session: &Session, survey: &str) -> Option<Record> {
        let entry = self
            .get_entity(survey, SURVEYS_SPACE, "surveys", ResourceType::Content, Scope::Managed, true, true)
            .await?;
        entry
            .meta
            .attachments
            .get("json")?
            .iter()
            .find(|a| a.attributes.owner_shortname.as_deref() == Some(session.shortname.as_str()))
            .cloned()
    }

    pub async fn has_user_responded_to_survey(&self, session: &Session, survey: &str) -> bool {
        self.get_user_survey_response_record(session, survey).await.is_some()
    }

    /// The body of the caller's response.
    pub async fn get_user_survey_responses(&self, session: &Session, survey: &str) -> Option<Value> {
        let record = self.get_user_survey_response_record(session, survey).await?;
        record.body()?.value().map(|v| v.into_owned())
    }

    pub async fn get_all_survey_responses(&self) -> Vec<Record> {
        let query = QueryRequest::search(SURVEYS_SPACE, "/surveys")
            .matching("@resource_type:json")
            .sorted("created_at", SortType::Descending)
            .page(1000, 0)
            .exact(false)
            .with_payload(true)
            .with_attachments(true);
        self.query_records(query, Scope::Managed).await
    }

    /// Surveys the caller owns, newest first.
    pub async fn get_user_surveys(&self, session: &Session) -> Vec<Record> {
        let query = QueryRequest::search(SURVEYS_SPACE, "/surveys")
            .matching(format!("@owner_shortname:{}", session.shortname))
            .sorted("created_at", SortType::Descending)
            .page(100, 0)
            .exact(false)
            .with_payload(true)
            .with_attachments(true);
        self.query_records(query, Scope::Managed).await
    }
}
