use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// -- Payload bodies --

/// A payload body as the platform stores it.
///
/// Documents written by older clients hold the body as a JSON-encoded
/// string, newer ones as a structured object. Everything that reads a body
/// goes through [`Body::value`] or [`Body::decode`] so both encodings are
/// handled in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    Raw(String),
    Json(Value),
}

impl Body {
    /// The body as structured JSON. A raw string that does not parse yields `None`.
    pub fn value(&self) -> Option<Cow<'_, Value>> {
        match self {
            Body::Json(value) => Some(Cow::Borrowed(value)),
            Body::Raw(raw) => serde_json::from_str(raw).ok().map(Cow::Owned),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.value()?;
        serde_json::from_value(value.into_owned()).ok()
    }

    /// The `content` member when present, otherwise the whole body.
    /// Unparseable bodies come back as an empty object.
    pub fn content(&self) -> Value {
        match self.value() {
            Some(value) => match value.get("content") {
                Some(content) if !is_falsy(content) => content.clone(),
                _ => value.into_owned(),
            },
            None => Value::Object(Map::new()),
        }
    }

    /// Looks up a top-level member of a structured body.
    pub fn field(&self, key: &str) -> Option<Value> {
        self.value()?.get(key).cloned()
    }

    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.field(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Body::Raw(s),
            other => Body::Json(other),
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

// -- Localized text --

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ku: Option<String>,
}

impl Translation {
    pub fn uniform(text: &str) -> Self {
        Self {
            en: Some(text.to_string()),
            ar: Some(text.to_string()),
            ku: Some(text.to_string()),
        }
    }

    /// The text for `locale`, if present and non-empty.
    pub fn get(&self, locale: &str) -> Option<&str> {
        let text = match locale {
            "en" => self.en.as_deref(),
            "ar" => self.ar.as_deref(),
            "ku" => self.ku.as_deref(),
            _ => None,
        };
        text.filter(|t| !t.is_empty())
    }

    /// The text for `locale`, falling back to en, ar, then ku.
    pub fn resolve(&self, locale: &str) -> Option<&str> {
        self.get(locale)
            .or_else(|| self.get("en"))
            .or_else(|| self.get("ar"))
            .or_else(|| self.get("ku"))
    }

    pub fn is_empty(&self) -> bool {
        self.resolve("en").is_none()
    }
}

/// Display text that is either a plain string or a per-locale translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Localized(Translation),
}

impl Text {
    pub fn resolve(&self, locale: &str) -> Option<&str> {
        match self {
            Text::Plain(s) if !s.is_empty() => Some(s),
            Text::Plain(_) => None,
            Text::Localized(t) => t.resolve(locale),
        }
    }
}

impl From<Translation> for Text {
    fn from(t: Translation) -> Self {
        Text::Localized(t)
    }
}
