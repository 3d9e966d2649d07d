use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// -- Messaging --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    GroupMessage,
    #[serde(other)]
    Other,
}

/// Body of a message document in the `messages` space. Direct messages carry
/// `receiver`; group messages carry `groupId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, rename = "groupId", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "messageType", alias = "message_type", skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
}

impl MessageBody {
    pub fn direct(sender: &str, receiver: &str, content: &str) -> Self {
        Self {
            sender: Some(sender.to_string()),
            receiver: Some(receiver.to_string()),
            group_id: None,
            content: Some(content.to_string()),
            message_type: Some(MessageType::Text),
        }
    }

    pub fn group(sender: &str, group_id: &str, content: &str) -> Self {
        Self {
            sender: Some(sender.to_string()),
            receiver: None,
            group_id: Some(group_id.to_string()),
            content: Some(content.to_string()),
            message_type: Some(MessageType::GroupMessage),
        }
    }

    /// The other party of a direct message, if `user` took part in it.
    pub fn partner_of(&self, user: &str) -> Option<&str> {
        let sender = self.sender.as_deref();
        let receiver = self.receiver.as_deref();
        if sender == Some(user) {
            receiver.filter(|r| !r.is_empty())
        } else if receiver == Some(user) {
            sender.filter(|s| !s.is_empty())
        } else {
            None
        }
    }

    pub fn is_between(&self, a: &str, b: &str) -> bool {
        let (s, r) = (self.sender.as_deref(), self.receiver.as_deref());
        (s == Some(a) && r == Some(b)) || (s == Some(b) && r == Some(a))
    }
}

/// A message flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageView {
    Direct {
        id: String,
        sender: Option<String>,
        receiver: Option<String>,
        content: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Group {
        id: String,
        sender: Option<String>,
        group_id: String,
        content: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

/// Body of a group document under `messages:/groups`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBody {
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, rename = "adminIds")]
    pub admin_ids: Vec<String>,
    #[serde(default, rename = "createdBy", skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, rename = "groupType", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroupBody {
    pub fn new(participants: Vec<String>, created_by: &str) -> Self {
        Self {
            participants,
            admin_ids: vec![created_by.to_string()],
            created_by: Some(created_by.to_string()),
            group_type: Some("group_chat".to_string()),
            extra: Map::new(),
        }
    }

    /// Returns false when the user was already a participant.
    pub fn add_participant(&mut self, user: &str) -> bool {
        if self.participants.iter().any(|p| p == user) {
            return false;
        }
        self.participants.push(user.to_string());
        true
    }

    /// Drops the user from both participants and admins.
    pub fn remove_participant(&mut self, user: &str) {
        self.participants.retain(|p| p != user);
        self.admin_ids.retain(|a| a != user);
    }

    /// Returns false when the user was already an admin.
    pub fn promote(&mut self, user: &str) -> bool {
        if self.admin_ids.iter().any(|a| a == user) {
            return false;
        }
        self.admin_ids.push(user.to_string());
        true
    }

    pub fn has_participant(&self, user: &str) -> bool {
        self.participants.iter().any(|p| p == user)
    }
}

/// Partial update of a group. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub participants: Option<Vec<String>>,
    pub admin_ids: Option<Vec<String>>,
}

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Resolved,
    Canceled,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Resolved => "Resolved",
            ReportStatus::Canceled => "Canceled",
        }
    }

    /// Action recorded on a reply that accompanies this status.
    pub fn reply_action(self) -> &'static str {
        match self {
            ReportStatus::Resolved => "Resolved",
            ReportStatus::Canceled => "Canceled",
            ReportStatus::Pending => "Replied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    DeleteEntry,
    WarnUser,
    NoAction,
}

impl ReportAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportAction::DeleteEntry => "delete_entry",
            ReportAction::WarnUser => "warn_user",
            ReportAction::NoAction => "no_action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportReply {
    pub timestamp: String,
    pub admin_shortname: String,
    pub reply: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reported_entry: Option<String>,
    #[serde(default)]
    pub reported_entry_title: Option<String>,
    #[serde(default)]
    pub reported_space: Option<String>,
    #[serde(default)]
    pub reported_subpath: Option<String>,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub replies: Vec<ReportReply>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub reported_entry: String,
    pub reported_entry_title: String,
    pub space_name: String,
    pub subpath: String,
    pub report_type: String,
    pub status: Option<String>,
}

// -- Orders & payments --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItemOption {
    pub key: String,
    pub variation_shortname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    pub sku: String,
    pub options: Vec<OrderItemOption>,
    pub discount: Option<Discount>,
    pub quantity: u32,
    pub subtotal: f64,
    pub variant_key: String,
    pub item_subtotal: f64,
    pub brand_shortname: String,
    pub price_at_purchase: f64,
    pub product_shortname: String,
    pub available_shortname: String,
    pub commission_category: String,
    pub main_category_shortname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    pub state: String,
    pub address: String,
    pub shortname: String,
    pub displayname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderShipping {
    pub key: String,
    pub max: f64,
    pub min: f64,
    pub cost: f64,
    pub minimum_retail: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderCoupon {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_shipping: bool,
    pub discount_type: String,
    pub discount_value: f64,
    pub discount_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_shortname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_body: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPayload {
    pub info: String,
    pub user: OrderUser,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<OrderCoupon>,
    pub services: Vec<Value>,
    pub shipping: OrderShipping,
    pub is_active: bool,
    pub order_code: String,
    pub order_from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,
    pub payment_type: String,
    pub tracking_code: String,
    pub payment_status: String,
    pub combined_order_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedOrderPayload {
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<OrderCoupon>,
    pub is_active: bool,
    pub created_at: String,
    pub order_from: String,
    pub payment_type: String,
    pub total_amount: f64,
    pub payment_status: String,
    pub user_shortname: String,
    pub combined_order_id: i64,
    pub orders_shortnames: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentPayload {
    pub amount: f64,
    pub status: String,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub transaction_id: String,
    pub payment_provider: String,
    pub payment_response: Value,
    pub combined_order_shortname: String,
}

/// Filters accepted by the seller order listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub state: Option<String>,
    pub payment_status: Option<String>,
    pub phone: Option<String>,
    pub governorate: Option<String>,
    pub text: Option<String>,
}

// -- Admin configuration --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "region_type", rename_all = "snake_case")]
pub enum RegionKind {
    Collections { collections: Vec<String> },
    SingleCollection { collection_shortname: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_body_accepts_both_type_spellings() {
        let a: MessageBody = serde_json::from_value(json!({"sender": "a", "groupId": "g", "messageType": "group_message"})).unwrap();
        let b: MessageBody = serde_json::from_value(json!({"sender": "a", "receiver": "b", "message_type": "text"})).unwrap();
        assert_eq!(a.message_type, Some(MessageType::GroupMessage));
        assert_eq!(a.group_id.as_deref(), Some("g"));
        assert_eq!(b.message_type, Some(MessageType::Text));
    }

    #[test]
    fn test_partner_of() {
        let m = MessageBody::direct("a", "b", "hi");
        assert_eq!(m.partner_of("a"), Some("b"));
        assert_eq!(m.partner_of("b"), Some("a"));
        assert_eq!(m.partner_of("c"), None);
        assert!(m.is_between("b", "a"));
    }

    #[test]
    fn test_group_membership_helpers() {
        let mut g = GroupBody::new(vec!["owner".into()], "owner");
        assert!(g.add_participant("bob"));
        assert!(!g.add_participant("bob"));
        assert!(g.promote("bob"));
        g.remove_participant("bob");
        assert_eq!(g.participants, vec!["owner"]);
        assert_eq!(g.admin_ids, vec!["owner"]);
    }

    #[test]
    fn test_group_body_keeps_unknown_fields() {
        let g: GroupBody = serde_json::from_value(json!({"participants": ["a"], "topic": "x"})).unwrap();
        let back = serde_json::to_value(&g).unwrap();
        assert_eq!(back["topic"], "x");
        assert_eq!(back["adminIds"], json!([]));
    }

    #[test]
    fn test_region_kind_shapes() {
        let r = RegionKind::SingleCollection { collection_shortname: "summer".into() };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"region_type": "single_collection", "collection_shortname": "summer"})
        );
    }

    #[test]
    fn test_order_payload_tolerates_missing_fields() {
        let o: OrderPayload = serde_json::from_value(json!({"order_code": "Z-1", "user": {"phone": "0770"}})).unwrap();
        assert_eq!(o.order_code, "Z-1");
        assert_eq!(o.user.phone, "0770");
        assert!(o.items.is_empty());
    }
}
