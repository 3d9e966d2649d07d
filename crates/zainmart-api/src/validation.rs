//! Form validation and input normalization.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // at least one dot with text on both sides of some dot
    domain
        .match_indices('.')
        .any(|(i, _)| i > 0 && i + 1 < domain.len())
}

pub fn is_valid_password(password: &str, min_length: usize) -> bool {
    password.chars().count() >= min_length
}

pub fn is_valid_shortname(shortname: &str) -> bool {
    !shortname.is_empty()
        && shortname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Lowercases and collapses every run of characters outside `[a-z0-9]`
/// into a single underscore, with none at either end.
pub fn generate_shortname(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    out
}

pub fn sanitize_input(input: &str) -> String {
    input.trim().chars().filter(|c| *c != '<' && *c != '>').collect()
}

/// Key/value pairs as a JSON object. Blank keys are skipped.
pub fn format_custom_attributes(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), Value::String(value.clone())))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SellerForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
    pub age: Option<String>,
}

pub fn validate_seller_form(form: &SellerForm) -> ValidationResult {
    let mut errors = BTreeMap::new();
    let mut fail = |field: &str, message: &str| {
        errors.insert(field.to_string(), message.to_string());
    };

    if form.email.trim().is_empty() {
        fail("email", "Email is required");
    } else if !is_valid_email(form.email.trim()) {
        fail("email", "Invalid email format");
    }

    if form.password.is_empty() {
        fail("password", "Password is required");
    } else if !is_valid_password(&form.password, MIN_PASSWORD_LENGTH) {
        fail("password", "Password must be at least 6 characters");
    }

    if form.confirm_password.is_empty() {
        fail("confirm_password", "Please confirm password");
    } else if form.password != form.confirm_password {
        fail("confirm_password", "Passwords do not match");
    }

    if form.gender.trim().is_empty() {
        fail("gender", "Gender is required");
    }

    if let Some(age) = form.age.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        match age.parse::<u32>() {
            Ok(n) if n <= 150 => {}
            _ => fail("age", "Please enter a valid age"),
        }
    }

    ValidationResult::from_errors(errors)
}

/// A category needs a display name in at least one language.
pub fn validate_category_form(name_en: &str, name_ar: &str, name_ku: &str) -> ValidationResult {
    let mut errors = BTreeMap::new();
    if [name_en, name_ar, name_ku].iter().all(|n| n.trim().is_empty()) {
        errors.insert("displayname".to_string(), "Display name is required".to_string());
    }
    ValidationResult::from_errors(errors)
}

pub fn validate_specification_form(product: &str, attributes: &[(String, String)]) -> ValidationResult {
    let mut errors = BTreeMap::new();
    if product.trim().is_empty() {
        errors.insert("product".to_string(), "Product is required".to_string());
    }
    if format_custom_attributes(attributes).is_empty() {
        errors.insert("attributes".to_string(), "At least one attribute is required".to_string());
    }
    ValidationResult::from_errors(errors)
}

/// Colors additionally need the color value itself.
pub fn validate_option_form(name_en: &str, name_ar: &str, value: &str, variation: &str) -> ValidationResult {
    let mut errors = BTreeMap::new();
    if name_en.trim().is_empty() && name_ar.trim().is_empty() {
        errors.insert("name".to_string(), "At least one option name is required".to_string());
    }
    if variation == "colors" && value.trim().is_empty() {
        errors.insert("value".to_string(), "Color value is required".to_string());
    }
    ValidationResult::from_errors(errors)
}
