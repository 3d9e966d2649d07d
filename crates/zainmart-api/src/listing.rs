//! Search, sort and label helpers used by list views.

use std::cmp::Ordering;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use zainmart_types::Record;

use crate::catalog_tree::entity_content;

const NO_DESCRIPTION: &str = "No description available";

/// Unambiguous characters for generated keys (no 0/O, 1/l/I).
const KEY_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

/// Display name in `locale` (falling back across locales), then the
/// shortname, then `fallback`.
pub fn localized_display_name(item: &Record, locale: &str, fallback: &str) -> String {
    item.display_name(locale)
        .or_else(|| Some(item.shortname.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

pub fn localized_description(item: &Record, locale: &str) -> String {
    item.attributes
        .description
        .as_ref()
        .and_then(|d| d.resolve(locale))
        .unwrap_or(NO_DESCRIPTION)
        .to_string()
}

/// Case-insensitive containment. An empty query or text always matches.
pub fn matches_search(text: &str, query: &str) -> bool {
    if query.is_empty() || text.is_empty() {
        return true;
    }
    text.to_lowercase().contains(&query.to_lowercase())
}

/// Items whose display name, description or shortname match `query`.
pub fn filter_by_search<'a>(items: &'a [Record], query: &str, locale: &str) -> Vec<&'a Record> {
    if query.trim().is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            matches_search(&localized_display_name(item, locale, "Untitled"), query)
                || matches_search(&localized_description(item, locale), query)
                || matches_search(&item.shortname, query)
        })
        .collect()
}

/// Seller listing filter: text over name and shortname, then an optional
/// category (`all` disables it) matched against `category_id`.
pub fn filter_items<'a>(items: &'a [Record], search: &str, category: &str, locale: &str) -> Vec<&'a Record> {
    let needle = search.trim().to_lowercase();
    items
        .iter()
        .filter(|item| {
            needle.is_empty()
                || localized_display_name(item, locale, "Untitled").to_lowercase().contains(&needle)
                || item.shortname.to_lowercase().contains(&needle)
        })
        .filter(|item| {
            category == "all"
                || (item.body().is_some()
                    && entity_content(item).get("category_id").and_then(Value::as_str) == Some(category))
        })
        .collect()
}

pub fn filter_products_by_search<'a>(products: &'a [Record], search: &str, locale: &str) -> Vec<&'a Record> {
    filter_items(products, search, "all", locale)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Created,
    Updated,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

fn timestamp_millis(value: Option<&str>) -> i64 {
    value
        .and_then(zainmart_types::parse_timestamp)
        .map(|t| t.timestamp_millis())
        .unwrap_or(0)
}

/// Stable sort. Missing timestamps sort as the epoch.
pub fn sort_items(items: &[Record], field: SortField, order: SortOrder, locale: &str) -> Vec<Record> {
    let mut sorted = items.to_vec();
    let compare = |a: &Record, b: &Record| -> Ordering {
        match field {
            SortField::Name => localized_display_name(a, locale, "Untitled")
                .to_lowercase()
                .cmp(&localized_display_name(b, locale, "Untitled").to_lowercase()),
            SortField::Created => timestamp_millis(a.attributes.created_at.as_deref())
                .cmp(&timestamp_millis(b.attributes.created_at.as_deref())),
            SortField::Updated => timestamp_millis(a.attributes.updated_at.as_deref())
                .cmp(&timestamp_millis(b.attributes.updated_at.as_deref())),
            SortField::Owner => {
                let owner = |r: &Record| r.attributes.owner_shortname.as_deref().unwrap_or("").to_lowercase();
                owner(a).cmp(&owner(b))
            }
        }
    };
    match order {
        SortOrder::Asc => sorted.sort_by(compare),
        SortOrder::Desc => sorted.sort_by(|a, b| compare(b, a)),
    }
    sorted
}

pub fn generate_key(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| KEY_CHARS[rng.random_range(0..KEY_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zainmart_types::{ResourceType, Text, Translation};

    fn item(shortname: &str, name: Option<&str>) -> Record {
        let mut record = Record::new(ResourceType::Content, shortname, "/");
        record.attributes.displayname = name.map(|n| Text::Plain(n.to_string()));
        record
    }

    fn names(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.shortname.clone()).collect()
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut localized = item("p1", None);
        localized.attributes.displayname = Some(Text::from(Translation { ar: Some("هاتف".into()), ..Default::default() }));
        assert_eq!(localized_display_name(&localized, "en", "Untitled"), "هاتف");
        assert_eq!(localized_display_name(&item("p2", None), "en", "Untitled"), "p2");
        assert_eq!(localized_display_name(&item("", Some("")), "en", "Untitled"), "Untitled");
        assert_eq!(localized_description(&item("p2", None), "en"), "No description available");
    }

    #[test]
    fn test_filter_by_search_looks_at_name_and_shortname() {
        let items = vec![item("iphone_15", Some("iPhone 15")), item("galaxy", Some("Galaxy S24")), item("pixel", None)];
        assert_eq!(names(&filter_by_search(&items, "GALAXY", "en")), vec!["galaxy"]);
        assert_eq!(names(&filter_by_search(&items, "pix", "en")), vec!["pixel"]);
        assert_eq!(filter_by_search(&items, "  ", "en").len(), 3);
    }

    #[test]
    fn test_filter_items_by_category() {
        let items = vec![
            item("a", Some("Alpha")).with_body(json!({"content": {"category_id": "phones"}})),
            item("b", Some("Beta")).with_body(json!({"category_id": "tv"})),
            item("c", Some("Alpha two")),
        ];
        assert_eq!(names(&filter_items(&items, "alpha", "all", "en")), vec!["a", "c"]);
        assert_eq!(names(&filter_items(&items, "", "tv", "en")), vec!["b"]);
        assert_eq!(names(&filter_products_by_search(&items, "beta", "en")), vec!["b"]);
    }

    #[test]
    fn test_sort_items() {
        let items = vec![
            item("b", Some("banana")).created_at("2024-05-01T10:00:00"),
            item("a", Some("Apple")).created_at("2024-06-01T10:00:00+00:00"),
            item("c", Some("cherry")),
        ];
        let by_name: Vec<_> = sort_items(&items, SortField::Name, SortOrder::Asc, "en").into_iter().map(|r| r.shortname).collect();
        assert_eq!(by_name, vec!["a", "b", "c"]);
        let newest: Vec<_> = sort_items(&items, SortField::Created, SortOrder::Desc, "en").into_iter().map(|r| r.shortname).collect();
        assert_eq!(newest, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_generate_key() {
        let key = generate_key(26);
        assert_eq!(key.len(), 26);
        assert!(key.bytes().all(|b| KEY_CHARS.contains(&b)));
    }
}
