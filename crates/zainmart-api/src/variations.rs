//! Product variations (colors, storages) and specification combinations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use zainmart_types::models::{Discount, OrderItemOption};
use zainmart_types::{Record, Text};

/// One selectable option of a variation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariationOption {
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    /// Hex code for colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options listed in a variation record's body. Malformed entries are skipped.
pub fn variation_options(variation: &Record) -> Vec<VariationOption> {
    let Some(Value::Array(options)) = variation.body().and_then(|b| b.field("options")) else {
        return Vec::new();
    };
    options
        .into_iter()
        .filter_map(|o| serde_json::from_value(o).ok())
        .collect()
}

pub fn option_name(option: &VariationOption, locale: &str) -> String {
    option
        .name
        .as_ref()
        .and_then(|n| n.resolve(locale))
        .unwrap_or("Unnamed")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Color,
    Storage,
}

impl VariantKind {
    /// Shortname of the variation record the kind is defined by.
    pub fn variation_shortname(self) -> &'static str {
        match self {
            VariantKind::Color => "colors",
            VariantKind::Storage => "storages",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            VariantKind::Color => "color",
            VariantKind::Storage => "storage",
        }
    }
}

/// Variation values a product has chosen, e.g. `colors: [red, blue]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedVariation {
    pub variation_shortname: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: VariantKind,
    pub shortname: String,
    pub name: Option<Text>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    pub qty: u32,
    pub retail_price: f64,
    pub sku: String,
    pub discount: Discount,
}

fn no_discount() -> Discount {
    Discount { kind: "amount".into(), value: 0.0 }
}

/// Builds editable variants for the values a product selected, colors first.
pub fn load_product_variations(variation_records: &[Record], selected: &[SelectedVariation]) -> Vec<ProductVariant> {
    let mut variants = Vec::new();
    for kind in [VariantKind::Color, VariantKind::Storage] {
        let shortname = kind.variation_shortname();
        let Some(choice) = selected.iter().find(|s| s.variation_shortname == shortname) else {
            continue;
        };
        let options = variation_records
            .iter()
            .find(|r| r.shortname == shortname)
            .map(variation_options)
            .unwrap_or_default();

        for option in options {
            if !choice.values.contains(&option.key) {
                continue;
            }
            variants.push(ProductVariant {
                shortname: format!("{}_{}", kind.prefix(), option.key),
                hex: if kind == VariantKind::Color { option.value } else { None },
                key: option.key,
                kind,
                name: option.name,
                qty: 0,
                retail_price: 0.0,
                sku: String::new(),
                discount: no_discount(),
            });
        }
    }
    variants
}

// -- Specification combinations --

/// A specification value together with the specification record it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecChoice {
    pub value: String,
    #[serde(rename = "originalSpec")]
    pub source_spec: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationGroup {
    pub attribute_name: String,
    pub specifications: Vec<SpecChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Combination {
    /// Shortnames of the constituent specifications joined with `_`.
    pub id: String,
    pub specifications: Vec<Record>,
    pub display_name: String,
    pub attributes: Vec<SpecChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRow {
    pub price: String,
    pub stock: String,
    pub sku: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Combinations {
    pub combinations: Vec<Combination>,
    pub prices: BTreeMap<String, PriceRow>,
}

/// Every ordered pick of one element per set; the last set varies fastest.
/// No sets yields a single empty pick, any empty set yields none.
pub fn cartesian_product<T: Clone, S: AsRef<[T]>>(sets: &[S]) -> Vec<Vec<T>> {
    if sets.iter().any(|s| s.as_ref().is_empty()) {
        return Vec::new();
    }
    let total = sets.iter().map(|s| s.as_ref().len()).product();
    let mut out = Vec::with_capacity(total);
    let mut cursor = vec![0usize; sets.len()];

    loop {
        out.push(
            cursor
                .iter()
                .zip(sets)
                .map(|(&i, set)| set.as_ref()[i].clone())
                .collect(),
        );
        let mut pos = sets.len();
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < sets[pos].as_ref().len() {
                break;
            }
            cursor[pos] = 0;
        }
    }
}

/// All specification combinations plus a price table holding the existing
/// rows and an empty row for each new combination.
pub fn generate_combinations(groups: &[SpecificationGroup], existing: &BTreeMap<String, PriceRow>) -> Combinations {
    if groups.is_empty() {
        return Combinations::default();
    }
    let sets: Vec<&[SpecChoice]> = groups.iter().map(|g| g.specifications.as_slice()).collect();
    let mut prices = existing.clone();

    let combinations = cartesian_product::<SpecChoice, _>(&sets)
        .into_iter()
        .map(|picked| {
            let specifications: Vec<Record> = picked.iter().map(|c| c.source_spec.clone()).collect();
            let id = specifications
                .iter()
                .map(|s| s.shortname.as_str())
                .collect::<Vec<_>>()
                .join("_");
            let display_name = picked
                .iter()
                .map(|c| c.value.as_str())
                .collect::<Vec<_>>()
                .join(" - ");
            prices.entry(id.clone()).or_default();
            Combination {
                id,
                specifications,
                display_name,
                attributes: picked,
            }
        })
        .collect();

    Combinations { combinations, prices }
}

// -- Submission --

fn is_priced(variant: &ProductVariant, selected: &[String]) -> bool {
    selected.contains(&variant.key) && variant.retail_price > 0.0
}

pub fn validate_variants(variants: &[ProductVariant], selected: &[String]) -> Result<(), &'static str> {
    if variants.iter().any(|v| is_priced(v, selected)) {
        Ok(())
    } else {
        Err("Please add price for at least one variation")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedVariant {
    pub key: String,
    pub qty: u32,
    pub sku: String,
    pub retail_price: f64,
    pub discount: Discount,
    pub options: Vec<OrderItemOption>,
}

/// Selected, priced variants in the shape the product record stores.
pub fn prepare_variants_for_submission(variants: &[ProductVariant], selected: &[String]) -> Vec<PreparedVariant> {
    variants
        .iter()
        .filter(|v| is_priced(v, selected))
        .map(|v| PreparedVariant {
            key: v.key.clone(),
            qty: v.qty,
            sku: v.sku.clone(),
            retail_price: v.retail_price,
            discount: v.discount.clone(),
            options: vec![OrderItemOption {
                key: v.key.clone(),
                variation_shortname: v.kind.variation_shortname().to_string(),
            }],
        })
        .collect()
}

/// Products listing `category` among their categories or as main category.
pub fn filter_products_by_category<'a>(products: &'a [Record], category: &str) -> Vec<&'a Record> {
    products
        .iter()
        .filter(|p| {
            let Some(body) = p.body().and_then(|b| b.value()) else {
                return false;
            };
            let listed = body
                .get("categories_shortnames")
                .and_then(Value::as_array)
                .is_some_and(|c| c.iter().any(|v| v.as_str() == Some(category)));
            listed || body.get("main_category_shortname").and_then(Value::as_str) == Some(category)
        })
        .collect()
}
