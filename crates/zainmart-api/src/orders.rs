//! Seller orders (workflow tickets under `orders/{seller}`), combined orders
//! and payments.

use serde_json::{Map, Value, json};
use tracing::{error, warn};

use zainmart_types::models::OrderFilter;
use zainmart_types::{
    ActionRequest, Entry, ProgressTicket, QueryRequest, Record, RecordRequest, RequestType, ResourceType, Scope,
    SortType,
};

use crate::Client;

/// Quotes values containing whitespace (escaping inner quotes) so the
/// platform's search language reads them as one term.
pub fn format_search_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.chars().any(char::is_whitespace) {
        format!("\"{}\"", trimmed.replace('"', "\\\""))
    } else {
        trimmed.to_string()
    }
}

/// Search expression for a seller's order listing. Blank filters are skipped.
pub fn order_search(filter: &OrderFilter) -> String {
    let mut parts = vec!["@resource_type:ticket".to_string()];
    let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(format_search_value);

    if let Some(state) = present(&filter.state) {
        parts.push(format!("@state:{}", state));
    }
    if let Some(status) = present(&filter.payment_status) {
        parts.push(format!("@payload.body.payment_status:{}", status));
    }
    if let Some(phone) = present(&filter.phone) {
        parts.push(format!("@payload.body.user.phone:{}", phone));
    }
    if let Some(governorate) = present(&filter.governorate) {
        parts.push(format!("@payload.body.user.state:{}", governorate));
    }
    if let Some(text) = present(&filter.text) {
        parts.push(text);
    }
    parts.join(" ")
}

fn orders_subpath(seller: &str) -> String {
    format!("orders/{}", seller)
}

fn listing(space_name: &str, subpath: &str, search: String, limit: u32, offset: u32) -> QueryRequest {
    QueryRequest::search(space_name, subpath)
        .matching(search)
        .page(limit, offset)
        .sorted("created_at", SortType::Descending)
        .with_payload(true)
        .with_attachments(false)
}

/// `extra` laid over the top level of `body`.
fn merged(body: Value, extra: Map<String, Value>) -> Value {
    let mut merged = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    merged.extend(extra);
    Value::Object(merged)
}

fn current_body(order: &Entry) -> Value {
    order
        .body()
        .and_then(|b| b.value())
        .map(|v| v.into_owned())
        .unwrap_or_else(|| Value::Object(Map::new()))
}

impl Client {
    pub async fn get_seller_orders(&self, space_name: &str, seller: &str, filter: &OrderFilter, limit: u32, offset: u32) -> Vec<Record> {
        let query = listing(space_name, &orders_subpath(seller), order_search(filter), limit, offset);
        self.query_records(query, Scope::Managed).await
    }

    pub async fn get_order_details(&self, space_name: &str, seller: &str, order: &str, attachments: bool) -> Option<Entry> {
        self.get_entity(order, space_name, &orders_subpath(seller), ResourceType::Ticket, Scope::Managed, true, attachments)
            .await
    }

    /// Sets the ticket state directly, merging `extra` into the order body.
    pub async fn update_order_state(
        &self,
        space_name: &str,
        seller: &str,
        order: &str,
        state: &str,
        extra: Map<String, Value>,
    ) -> bool {
        let Some(current) = self.get_order_details(space_name, seller, order, false).await else {
            return false;
        };
        let record = RecordRequest::new(ResourceType::Ticket, order, orders_subpath(seller)).attributes(json!({
            "state": state,
            "payload": { "content_type": "json", "body": merged(current_body(&current), extra) },
        }));
        self.act_ok(ActionRequest::single(space_name, RequestType::Update, record))
            .await
    }

    /// Moves the order along `action`. A non-empty `extra` is merged into the
    /// body first; a failed merge aborts the transition.
    pub async fn progress_order_ticket(
        &self,
        space_name: &str,
        seller: &str,
        order: &str,
        action: &str,
        extra: Map<String, Value>,
    ) -> bool {
        if !extra.is_empty() {
            let Some(current) = self.get_order_details(space_name, seller, order, false).await else {
                return false;
            };
            let record = RecordRequest::new(ResourceType::Ticket, order, orders_subpath(seller)).attributes(json!({
                "payload": { "content_type": "json", "body": merged(current_body(&current), extra) },
            }));
            if !self.act_ok(ActionRequest::single(space_name, RequestType::Update, record)).await {
                return false;
            }
        }

        let ticket = ProgressTicket {
            space_name: space_name.to_string(),
            subpath: orders_subpath(seller),
            shortname: order.to_string(),
            action: action.to_string(),
        };
        match self.platform.progress_ticket(ticket).await {
            Ok(resp) if resp.is_success() => true,
            Ok(resp) => {
                warn!(order, action, error = ?resp.error_message(), "Order transition rejected");
                false
            }
            Err(e) => {
                error!(order, action, "Error progressing order ticket: {}", e);
                false
            }
        }
    }

    pub async fn get_combined_orders(&self, space_name: &str, user: Option<&str>, limit: u32, offset: u32) -> Vec<Record> {
        let search = match user {
            Some(user) => format!("@resource_type:content @owner_shortname:{}", user),
            None => "@resource_type:content".to_string(),
        };
        self.query_records(listing(space_name, "combined_orders", search, limit, offset), Scope::Managed)
            .await
    }

    pub async fn get_combined_order_details(&self, space_name: &str, shortname: &str) -> Option<Entry> {
        self.get_entity(shortname, space_name, "/combined_orders", ResourceType::Content, Scope::Managed, true, false)
            .await
    }

    pub async fn get_payments(&self, space_name: &str, status: Option<&str>, limit: u32, offset: u32) -> Vec<Record> {
        let search = match status {
            Some(status) => format!("@resource_type:content @payload.body.status:{}", status),
            None => "@resource_type:content".to_string(),
        };
        self.query_records(listing(space_name, "payments", search, limit, offset), Scope::Managed)
            .await
    }

    pub async fn get_payment_by_combined_order(&self, space_name: &str, combined_order: &str) -> Option<Record> {
        let search = format!("@resource_type:content @payload.body.combined_order_shortname:{}", combined_order);
        self.query_first(listing(space_name, "payments", search, 1, 0), Scope::Managed)
            .await
    }

    /// Orders of every seller (admin view).
    pub async fn get_all_orders(&self, space_name: &str, state: Option<&str>, limit: u32, offset: u32) -> Vec<Record> {
        let search = match state {
            Some(state) => format!("@resource_type:ticket @state:{}", state),
            None => "@resource_type:ticket".to_string(),
        };
        self.query_records(listing(space_name, "orders", search, limit, offset), Scope::Managed)
            .await
    }
}
