//! Category and specification helpers over catalog records.

use serde_json::{Map, Value};

use zainmart_types::{Body, Payload, Record};

use crate::listing::localized_display_name;

pub const ECOMMERCE_SCHEMA: &str = "ecommerce_entity";

/// The entity's content document: the `content` member of its body when
/// present, else the body itself, else an empty object.
pub fn entity_content(entity: &Record) -> Value {
    entity
        .body()
        .map(Body::content)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Payload for a catalog entity. The body is stored JSON-encoded.
pub fn build_entity_payload(content: &Value) -> Payload {
    Payload {
        schema_shortname: Some(ECOMMERCE_SCHEMA.to_string()),
        body: Some(Body::Raw(content.to_string())),
        ..Default::default()
    }
}

pub fn category_parent_id(category: &Record) -> Option<String> {
    entity_content(category)
        .get("parent_category_shortname")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn is_parent_category(category: &Record) -> bool {
    category_parent_id(category).is_none()
}

/// Display name of the parent; the id itself when the parent is unknown.
pub fn parent_category_name(parent_id: Option<&str>, categories: &[Record], locale: &str) -> Option<String> {
    let parent_id = parent_id?;
    Some(match categories.iter().find(|c| c.shortname == parent_id) {
        Some(parent) => localized_display_name(parent, locale, &parent.shortname),
        None => parent_id.to_string(),
    })
}

pub fn sub_categories<'a>(parent_id: &str, categories: &'a [Record]) -> Vec<&'a Record> {
    categories
        .iter()
        .filter(|c| category_parent_id(c).as_deref() == Some(parent_id))
        .collect()
}

pub fn count_sub_categories(parent_id: &str, categories: &[Record]) -> usize {
    sub_categories(parent_id, categories).len()
}

/// `all` and `root` both select top-level categories; anything else selects
/// the children of that parent.
pub fn filter_categories_by_parent<'a>(categories: &'a [Record], parent_filter: &str) -> Vec<&'a Record> {
    match parent_filter {
        "all" | "root" => categories.iter().filter(|c| is_parent_category(c)).collect(),
        parent => sub_categories(parent, categories),
    }
}

fn body_value(record: &Record) -> Option<Value> {
    record.body()?.value().map(|v| v.into_owned())
}

pub fn specification_product(specification: &Record) -> Option<String> {
    body_value(specification)?
        .get("product")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn specification_attributes(specification: &Record) -> Map<String, Value> {
    match body_value(specification).and_then(|b| b.get("attributes").cloned()) {
        Some(Value::Object(attributes)) => attributes,
        _ => Map::new(),
    }
}

pub fn filter_specifications_by_product<'a>(specifications: &'a [Record], product: &str) -> Vec<&'a Record> {
    if product == "all" {
        return specifications.iter().collect();
    }
    specifications
        .iter()
        .filter(|s| specification_product(s).as_deref() == Some(product))
        .collect()
}

/// Display name of a product; the shortname when it is unknown.
pub fn product_name(product_id: &str, products: &[Record], locale: &str) -> String {
    match products.iter().find(|p| p.shortname == product_id) {
        Some(product) => localized_display_name(product, locale, &product.shortname),
        None => product_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zainmart_types::{ResourceType, Text, Translation};

    fn category(shortname: &str, body: Value) -> Record {
        Record::new(ResourceType::Content, shortname, "categories").with_body(body)
    }

    fn tree() -> Vec<Record> {
        let mut phones = category("phones", json!({"content": {"parent_category_shortname": null}}));
        phones.attributes.displayname = Some(Text::from(Translation { en: Some("Phones".into()), ..Default::default() }));
        vec![
            phones,
            category("android", json!(r#"{"content": {"parent_category_shortname": "phones"}}"#)),
            category("ios", json!({"parent_category_shortname": "phones"})),
            category("tv", json!({})),
            category("oled", json!({"content": {"parent_category_shortname": "tv"}})),
        ]
    }

    fn names(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.shortname.clone()).collect()
    }

    #[test]
    fn test_parent_id_reads_both_body_encodings() {
        let categories = tree();
        assert_eq!(category_parent_id(&categories[1]).as_deref(), Some("phones"));
        assert_eq!(category_parent_id(&categories[2]).as_deref(), Some("phones"));
        assert!(is_parent_category(&categories[0]));
        assert!(is_parent_category(&Record::new(ResourceType::Content, "bare", "/")));
    }

    #[test]
    fn test_tree_queries() {
        let categories = tree();
        assert_eq!(names(&sub_categories("phones", &categories)), vec!["android", "ios"]);
        assert_eq!(count_sub_categories("tv", &categories), 1);
        assert_eq!(names(&filter_categories_by_parent(&categories, "root")), vec!["phones", "tv"]);
        assert_eq!(names(&filter_categories_by_parent(&categories, "tv")), vec!["oled"]);
    }

    #[test]
    fn test_parent_category_name() {
        let categories = tree();
        assert_eq!(parent_category_name(Some("phones"), &categories, "ar").as_deref(), Some("Phones"));
        assert_eq!(parent_category_name(Some("tv"), &categories, "en").as_deref(), Some("tv"));
        assert_eq!(parent_category_name(Some("gone"), &categories, "en").as_deref(), Some("gone"));
        assert_eq!(parent_category_name(None, &categories, "en"), None);
    }

    #[test]
    fn test_specification_helpers() {
        let specs = vec![
            category("s1", json!({"product": "iphone", "attributes": {"ram": "8GB"}})),
            category("s2", json!(r#"{"product": "galaxy"}"#)),
        ];
        assert_eq!(specification_product(&specs[1]).as_deref(), Some("galaxy"));
        assert_eq!(specification_attributes(&specs[0])["ram"], "8GB");
        assert!(specification_attributes(&specs[1]).is_empty());
        assert_eq!(names(&filter_specifications_by_product(&specs, "iphone")), vec!["s1"]);
        assert_eq!(filter_specifications_by_product(&specs, "all").len(), 2);
    }

    #[test]
    fn test_entity_payload_is_string_encoded() {
        let payload = build_entity_payload(&json!({"name": "x"}));
        assert_eq!(payload.schema_shortname.as_deref(), Some("ecommerce_entity"));
        assert_eq!(payload.body, Some(Body::Raw(r#"{"name":"x"}"#.into())));
        let entity = category("e", json!({"content": {"name": "x"}}));
        assert_eq!(entity_content(&entity), json!({"name": "x"}));
        assert_eq!(entity_content(&Record::new(ResourceType::Content, "e", "/")), json!({}));
    }
}
